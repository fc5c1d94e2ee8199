/// Shared types used across the codebase

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Beta spending ceiling per user, in USD
pub const BETA_LIMIT_USD: Decimal = Decimal::from_parts(500, 0, 0, false, 2);

/// Serde adapter for USD amounts.
///
/// Postgres `numeric` arrives as a JSON number (or a string from some drivers); it is
/// parsed through its decimal text so no binary float rounding leaks into sums.
/// Amounts go back out as plain JSON numbers for the browser client.
pub mod money {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.to_f64().unwrap_or(0.0))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse(raw: &Value) -> Result<Decimal, String> {
        match raw {
            Value::Null => Ok(Decimal::ZERO),
            Value::Number(n) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .map_err(|e| format!("invalid amount {}: {}", n, e)),
            Value::String(s) => Decimal::from_str(s).map_err(|e| format!("invalid amount {}: {}", s, e)),
            other => Err(format!("invalid amount {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize, Deserialize)]
    struct Amount {
        #[serde(with = "money")]
        cost: Decimal,
    }

    #[test]
    fn beta_limit_is_five_dollars() {
        assert_eq!(BETA_LIMIT_USD, Decimal::new(5, 0));
    }

    #[test]
    fn parses_numbers_strings_and_null() {
        let a: Amount = serde_json::from_value(json!({ "cost": 0.0039 })).unwrap();
        assert_eq!(a.cost, Decimal::new(39, 4));
        let b: Amount = serde_json::from_value(json!({ "cost": "1.25" })).unwrap();
        assert_eq!(b.cost, Decimal::new(125, 2));
        let c: Amount = serde_json::from_value(json!({ "cost": null })).unwrap();
        assert_eq!(c.cost, Decimal::ZERO);
    }

    #[test]
    fn serializes_as_number() {
        let out = serde_json::to_value(Amount { cost: Decimal::new(39, 4) }).unwrap();
        assert_eq!(out, json!({ "cost": 0.0039 }));
    }
}
