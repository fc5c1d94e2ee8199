use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_where::WhereNode;
use super::types::{FilterOp, FilterOrderInfo, FilterWhereInfo, SortDirection};

/// Evaluates parsed filters against JSON rows, with the same semantics the SQL generator has.
pub struct FilterMatch;

impl FilterMatch {
    pub fn matches(node: &WhereNode, row: &Map<String, Value>) -> Result<bool, FilterError> {
        match node {
            WhereNode::Field(info) => Self::matches_field(info, row),
            WhereNode::And(nodes) => {
                for n in nodes {
                    if !Self::matches(n, row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            WhereNode::Or(nodes) => {
                for n in nodes {
                    if Self::matches(n, row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            WhereNode::Not(inner) => Ok(!Self::matches(inner, row)?),
        }
    }

    fn matches_field(info: &FilterWhereInfo, row: &Map<String, Value>) -> Result<bool, FilterError> {
        let actual = row.get(&info.column).unwrap_or(&Value::Null);
        let data = &info.data;

        Ok(match info.operator {
            FilterOp::Eq => {
                if data.is_null() {
                    actual.is_null()
                } else {
                    !actual.is_null() && values_equal(actual, data)
                }
            }
            FilterOp::Ne => {
                if data.is_null() {
                    !actual.is_null()
                } else {
                    // SQL three-valued logic: NULL <> x is not true
                    !actual.is_null() && !values_equal(actual, data)
                }
            }
            FilterOp::Gt => compare(actual, data) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(compare(actual, data), Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => compare(actual, data) == Some(Ordering::Less),
            FilterOp::Lte => matches!(compare(actual, data), Some(Ordering::Less | Ordering::Equal)),
            FilterOp::Like | FilterOp::ILike => {
                let pattern = data
                    .as_str()
                    .ok_or_else(|| FilterError::InvalidOperatorData("LIKE requires a string pattern".to_string()))?;
                match value_as_text(actual) {
                    Some(text) => like_regex(pattern, info.operator == FilterOp::ILike)?.is_match(&text),
                    None => false,
                }
            }
            FilterOp::In | FilterOp::NIn => {
                let candidates = as_list(data);
                if actual.is_null() {
                    false
                } else {
                    let found = candidates.iter().any(|c| values_equal(actual, c));
                    if info.operator == FilterOp::In { found } else { !found }
                }
            }
            FilterOp::Any => {
                let wanted = as_list(data);
                match actual {
                    Value::Array(items) => wanted.iter().any(|w| items.iter().any(|i| values_equal(i, w))),
                    _ => false,
                }
            }
            FilterOp::All => {
                let wanted = as_list(data);
                match actual {
                    Value::Array(items) => wanted.iter().all(|w| items.iter().any(|i| values_equal(i, w))),
                    _ => false,
                }
            }
            FilterOp::Null => match data {
                Value::Bool(false) => !actual.is_null(),
                _ => actual.is_null(),
            },
        })
    }

    /// Sorts rows like Postgres does: NULLS LAST for ascending, NULLS FIRST for descending.
    pub fn sort(rows: &mut [Map<String, Value>], order: &[FilterOrderInfo]) {
        if order.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for info in order {
                let left = a.get(&info.column).unwrap_or(&Value::Null);
                let right = b.get(&info.column).unwrap_or(&Value::Null);
                let ordering = match (left.is_null(), right.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => compare(left, right).unwrap_or(Ordering::Equal),
                };
                let ordering = match info.sort {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}

fn as_list(data: &Value) -> Vec<Value> {
    match data {
        Value::Array(values) => values.clone(),
        other => vec![other.clone()],
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::String(b)) => {
            a == b || matches!((parse_timestamp(a), parse_timestamp(b)), (Some(x), Some(y)) if x == y)
        }
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => match (parse_timestamp(a), parse_timestamp(b)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => Some(a.cmp(b)),
        },
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    // Cheap guard so ordinary strings don't pay for a parse attempt
    if value.len() < 20 || value.as_bytes().get(4) != Some(&b'-') {
        return None;
    }
    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc))
}

fn like_regex(pattern: &str, case_insensitive: bool) -> Result<Regex, FilterError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    if case_insensitive {
        expr.push_str("(?i)");
    }
    expr.push('^');
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            // Postgres' default LIKE escape character
            '\\' => {
                if let Some(literal) = chars.next() {
                    expr.push_str(&regex::escape(&literal.to_string()));
                }
            }
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    // (?s) so '%' spans newlines in long content columns
    Regex::new(&format!("(?s){}", expr)).map_err(|e| FilterError::InvalidOperatorData(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_order::FilterOrder;
    use crate::filter::filter_where::FilterWhere;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn check(filter: Value, target: Value) -> bool {
        let node = FilterWhere::parse(&filter).unwrap();
        FilterMatch::matches(&node, &row(target)).unwrap()
    }

    #[test]
    fn equality_and_null() {
        assert!(check(json!({ "name": "Hero" }), json!({ "name": "Hero" })));
        assert!(!check(json!({ "name": "Hero" }), json!({ "name": null })));
        assert!(check(json!({ "folder_id": null }), json!({ "name": "x" })));
        assert!(check(json!({ "version": 2 }), json!({ "version": 2.0 })));
    }

    #[test]
    fn ilike_spans_case_and_newlines() {
        let filter = json!({ "content": { "$ilike": "%close more%" } });
        assert!(check(filter.clone(), json!({ "content": "Line one\nClose More deals" })));
        assert!(!check(filter, json!({ "content": "nothing here" })));
    }

    #[test]
    fn like_escapes_regex_metacharacters() {
        assert!(check(json!({ "name": { "$like": "a.b%" } }), json!({ "name": "a.bc" })));
        assert!(!check(json!({ "name": { "$like": "a.b%" } }), json!({ "name": "axbc" })));
    }

    #[test]
    fn array_any_and_or_not() {
        let tagged = json!({ "tags": ["cta", "email"], "name": "x" });
        assert!(check(json!({ "tags": { "$any": ["cta"] } }), tagged.clone()));
        assert!(!check(json!({ "tags": { "$all": ["cta", "web"] } }), tagged.clone()));
        assert!(check(json!({ "$or": [{ "name": "y" }, { "name": "x" }] }), tagged.clone()));
        assert!(check(json!({ "$not": { "name": "y" } }), tagged));
    }

    #[test]
    fn timestamps_compare_chronologically() {
        let earlier = json!({ "at": "2024-05-01T10:00:00Z" });
        assert!(check(json!({ "at": { "$lt": "2024-05-01T10:00:00.5+00:00" } }), earlier));
    }

    #[test]
    fn sorts_with_nulls_last_ascending() {
        let mut rows = vec![
            row(json!({ "version": 3 })),
            row(json!({ "version": null })),
            row(json!({ "version": 1 })),
        ];
        let order = FilterOrder::validate_and_parse(&json!("version asc")).unwrap();
        FilterMatch::sort(&mut rows, &order);
        assert_eq!(rows[0]["version"], json!(1));
        assert_eq!(rows[1]["version"], json!(3));
        assert!(rows[2]["version"].is_null());
    }
}
