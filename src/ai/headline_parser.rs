use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub formula: String,
    pub headline: String,
}

pub const DEFAULT_FORMULA: &str = "General";
const MAX_HEADLINE_CHARS: usize = 200;

/// `BENEFIT-DRIVEN:` or `1. HOW-TO: inline headline`
static FORMULA_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+[.)]\s*)?([A-Z][A-Z0-9 /&'+()-]*[A-Z0-9)])\s*:\s*(.*)$").expect("Invalid regex")
});
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[-*•–]|\d+[.)])\s+(.+)$").expect("Invalid regex"));
static MARKDOWN_WRAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}\s*|\*\*|__").expect("Invalid regex"));
static NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(here are|here's|here is|sure|certainly|below are|i've|i have|these headlines)\b",
        r"^(\[[ xX]?\]|[✓✔☐☑✅])",
        r"(?i)^(note|tip|formulas? used|remember)\s*:",
        r"(?i)^headlines?\s*:?$",
        r"^[-=_*~]{3,}$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid regex"))
    .collect()
});

fn is_noise(line: &str) -> bool {
    NOISE.iter().any(|re| re.is_match(line))
}

fn clean(text: &str) -> String {
    text.trim()
        .trim_matches(|c| matches!(c, '"' | '“' | '”' | '\''))
        .trim()
        .to_string()
}

/// Turns free-form model output into formula/headline pairs.
///
/// Accepts formula-labeled groups, bullets, numbered lists and bare lines. Preamble and
/// checklist lines are skipped, exact duplicates dropped, and order preserved.
pub fn parse_headlines(raw: &str) -> Vec<Headline> {
    let mut formula = DEFAULT_FORMULA.to_string();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for line in raw.lines() {
        let line = MARKDOWN_WRAP.replace_all(line.trim(), "");
        let line = line.trim();
        if line.is_empty() || is_noise(line) {
            continue;
        }

        let text = if let Some(caps) = FORMULA_LABEL.captures(line) {
            formula = caps[1].trim().to_string();
            clean(&caps[2])
        } else if let Some(caps) = BULLET.captures(line) {
            clean(&caps[1])
        } else {
            clean(line)
        };

        if text.is_empty() || is_noise(&text) || text.chars().count() > MAX_HEADLINE_CHARS {
            continue;
        }
        if seen.insert(text.clone()) {
            out.push(Headline {
                formula: formula.clone(),
                headline: text,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &str) -> Vec<(String, String)> {
        parse_headlines(raw)
            .into_iter()
            .map(|h| (h.formula, h.headline))
            .collect()
    }

    #[test]
    fn labeled_bullet_blocks() {
        let raw = "BENEFIT-DRIVEN:\n- Stop Losing Clients\n\nHOW-TO:\n- Close More Deals";
        assert_eq!(
            pairs(raw),
            vec![
                ("BENEFIT-DRIVEN".to_string(), "Stop Losing Clients".to_string()),
                ("HOW-TO".to_string(), "Close More Deals".to_string()),
            ]
        );
    }

    #[test]
    fn skips_preamble_and_checklists() {
        let raw = "Here are 3 headlines for you:\n\n**QUESTION:**\n1. \"Still Chasing Invoices?\"\n✓ Uses curiosity\n[ ] Checked length\nNote: tweak as needed\n---";
        assert_eq!(
            pairs(raw),
            vec![("QUESTION".to_string(), "Still Chasing Invoices?".to_string())]
        );
    }

    #[test]
    fn inline_label_and_bare_lines() {
        let raw = "URGENCY: Only 3 Seats Left\nA Bare Headline\n### NUMBER/LIST:\n* 7 Ways To Win";
        assert_eq!(
            pairs(raw),
            vec![
                ("URGENCY".to_string(), "Only 3 Seats Left".to_string()),
                ("URGENCY".to_string(), "A Bare Headline".to_string()),
                ("NUMBER/LIST".to_string(), "7 Ways To Win".to_string()),
            ]
        );
    }

    #[test]
    fn bare_lines_default_formula_and_dedupe() {
        let raw = "Grow Faster Today\n- Grow Faster Today\nGrow faster today";
        let parsed = parse_headlines(raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].formula, DEFAULT_FORMULA);
        assert_eq!(parsed[1].headline, "Grow faster today");
    }

    #[test]
    fn overlong_lines_are_ignored() {
        let raw = format!("- {}\n- Short One", "x".repeat(201));
        assert_eq!(parse_headlines(&raw).len(), 1);
    }
}
