use rust_decimal::Decimal;

/// USD per million tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPrice {
    pub input_per_million: Decimal,
    pub output_per_million: Decimal,
}

const SONNET: ModelPrice = ModelPrice {
    input_per_million: Decimal::from_parts(3, 0, 0, false, 0),
    output_per_million: Decimal::from_parts(15, 0, 0, false, 0),
};
const HAIKU: ModelPrice = ModelPrice {
    input_per_million: Decimal::from_parts(80, 0, 0, false, 2),
    output_per_million: Decimal::from_parts(4, 0, 0, false, 0),
};
const OPUS: ModelPrice = ModelPrice {
    input_per_million: Decimal::from_parts(15, 0, 0, false, 0),
    output_per_million: Decimal::from_parts(75, 0, 0, false, 0),
};

/// Price class by model family. Unknown models are billed as Sonnet.
pub fn price_for(model: &str) -> ModelPrice {
    let model = model.to_ascii_lowercase();
    if model.contains("haiku") {
        HAIKU
    } else if model.contains("opus") {
        OPUS
    } else {
        SONNET
    }
}

/// Cost of one call, rounded to 6 decimal places.
pub fn cost_usd(model: &str, input_tokens: u32, output_tokens: u32) -> Decimal {
    let price = price_for(model);
    let total = Decimal::from(input_tokens) * price.input_per_million
        + Decimal::from(output_tokens) * price.output_per_million;
    (total / Decimal::from(1_000_000u32)).round_dp(6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sonnet_cost_for_two_calls() {
        let first = cost_usd("claude-sonnet-4-20250514", 100, 50);
        let second = cost_usd("claude-sonnet-4-20250514", 200, 150);
        assert_eq!(first, Decimal::new(105, 5));
        assert_eq!(first + second, Decimal::new(39, 4));
    }

    #[test]
    fn model_families() {
        assert_eq!(price_for("claude-3-5-haiku-latest"), HAIKU);
        assert_eq!(price_for("claude-opus-4-1"), OPUS);
        assert_eq!(price_for("something-new"), SONNET);
    }

    #[test]
    fn rounds_to_six_places() {
        // 1 haiku input token = 0.0000008
        assert_eq!(cost_usd("claude-3-haiku", 1, 0), Decimal::new(1, 6));
    }
}
