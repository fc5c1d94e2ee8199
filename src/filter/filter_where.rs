use serde_json::Value;

use super::error::FilterError;
use super::types::{validate_column_name, FilterOp, FilterWhereInfo};

/// Parsed form of a JSON where clause, shared by the SQL generator and the in-memory matcher.
#[derive(Debug, Clone)]
pub enum WhereNode {
    Field(FilterWhereInfo),
    And(Vec<WhereNode>),
    Or(Vec<WhereNode>),
    Not(Box<WhereNode>),
}

pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Generates a SQL predicate whose placeholders start after `starting_param_index`.
    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let node = Self::parse(where_data)?;
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build(&node)?;
        Ok((sql, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        Self::parse(where_data).map(|_| ())
    }

    pub fn parse(where_data: &Value) -> Result<WhereNode, FilterError> {
        match where_data {
            Value::Null => Ok(WhereNode::And(vec![])),
            Value::Object(obj) => {
                let mut nodes = Vec::with_capacity(obj.len());
                for (key, value) in obj {
                    if key.starts_with('$') {
                        nodes.push(Self::parse_logical_operator(key, value)?);
                    } else {
                        nodes.extend(Self::parse_field_condition(key, value)?);
                    }
                }
                Ok(if nodes.len() == 1 { nodes.remove(0) } else { WhereNode::And(nodes) })
            }
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn parse_logical_operator(op: &str, value: &Value) -> Result<WhereNode, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let nodes = arr.iter().map(Self::parse).collect::<Result<Vec<_>, _>>()?;
                Ok(if op == "$and" { WhereNode::And(nodes) } else { WhereNode::Or(nodes) })
            }
            "$not" => Ok(WhereNode::Not(Box::new(Self::parse(value)?))),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<WhereNode>, FilterError> {
        validate_column_name(field)?;
        match value {
            Value::Object(obj) if obj.keys().all(|k| k.starts_with('$')) && !obj.is_empty() => {
                let mut nodes = Vec::with_capacity(obj.len());
                for (op_key, op_val) in obj {
                    let operator = FilterOp::parse(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    nodes.push(WhereNode::Field(FilterWhereInfo {
                        column: field.to_string(),
                        operator,
                        data: op_val.clone(),
                    }));
                }
                Ok(nodes)
            }
            // Implicit equality: { field: value }
            _ => Ok(vec![WhereNode::Field(FilterWhereInfo {
                column: field.to_string(),
                operator: FilterOp::Eq,
                data: value.clone(),
            })]),
        }
    }

    fn build(&mut self, node: &WhereNode) -> Result<String, FilterError> {
        match node {
            WhereNode::Field(info) => self.build_sql_condition(info),
            WhereNode::And(nodes) | WhereNode::Or(nodes) => {
                if nodes.is_empty() {
                    return Ok(if matches!(node, WhereNode::And(_)) { "1=1" } else { "1=0" }.to_string());
                }
                let joiner = if matches!(node, WhereNode::And(_)) { " AND " } else { " OR " };
                let parts = nodes
                    .iter()
                    .map(|n| self.build(n).map(|sql| format!("({})", sql)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(parts.join(joiner))
            }
            WhereNode::Not(inner) => Ok(format!("NOT ({})", self.build(inner)?)),
        }
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", condition.column);
        let data = &condition.data;
        Ok(match condition.operator {
            FilterOp::Eq => {
                if data.is_null() {
                    format!("{} IS NULL", quoted_column)
                } else {
                    format!("{} = {}", Self::typed(&quoted_column, data), self.param(data.clone()))
                }
            }
            FilterOp::Ne => {
                if data.is_null() {
                    format!("{} IS NOT NULL", quoted_column)
                } else {
                    format!("{} <> {}", Self::typed(&quoted_column, data), self.param(data.clone()))
                }
            }
            FilterOp::Gt => format!("{} > {}", Self::typed(&quoted_column, data), self.param(data.clone())),
            FilterOp::Gte => format!("{} >= {}", Self::typed(&quoted_column, data), self.param(data.clone())),
            FilterOp::Lt => format!("{} < {}", Self::typed(&quoted_column, data), self.param(data.clone())),
            FilterOp::Lte => format!("{} <= {}", Self::typed(&quoted_column, data), self.param(data.clone())),
            FilterOp::Like => format!("{}::text LIKE {}", quoted_column, self.param(data.clone())),
            FilterOp::ILike => format!("{}::text ILIKE {}", quoted_column, self.param(data.clone())),
            FilterOp::In | FilterOp::NIn => {
                let negate = condition.operator == FilterOp::NIn;
                let values = match data {
                    Value::Array(values) => values.clone(),
                    other => vec![other.clone()],
                };
                if values.is_empty() {
                    return Ok(if negate { "1=1" } else { "1=0" }.to_string());
                }
                let column = Self::typed(&quoted_column, &values[0]);
                let params: Vec<String> = values.into_iter().map(|v| self.param(v)).collect();
                format!("{} {}IN ({})", column, if negate { "NOT " } else { "" }, params.join(", "))
            }
            FilterOp::Any | FilterOp::All => {
                let values = match data {
                    Value::Array(values) => values.clone(),
                    other => vec![other.clone()],
                };
                if values.is_empty() {
                    return Ok(if condition.operator == FilterOp::Any { "1=0" } else { "1=1" }.to_string());
                }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v)).collect();
                let op = if condition.operator == FilterOp::Any { "&&" } else { "@>" };
                format!("{} {} ARRAY[{}]::text[]", quoted_column, op, params.join(", "))
            }
            FilterOp::Null => match data {
                Value::Bool(false) => format!("{} IS NOT NULL", quoted_column),
                _ => format!("{} IS NULL", quoted_column),
            },
        })
    }

    /// String parameters are bound as TEXT, so uuid and timestamp columns are compared as text.
    fn typed(quoted_column: &str, data: &Value) -> String {
        if data.is_string() {
            format!("{}::text", quoted_column)
        } else {
            quoted_column.to_string()
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn implicit_equality_uses_text_cast_for_strings() {
        let (sql, params) = FilterWhere::generate(&json!({ "id": "abc" }), 0).unwrap();
        assert_eq!(sql, "\"id\"::text = $1");
        assert_eq!(params, vec![json!("abc")]);
    }

    #[test]
    fn numbering_continues_from_starting_index() {
        let filter = json!({ "$and": [{ "user_id": "u" }, { "version": { "$gt": 1 } }] });
        let (sql, params) = FilterWhere::generate(&filter, 1).unwrap();
        assert_eq!(sql, "(\"user_id\"::text = $2) AND (\"version\" > $3)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn or_and_null_conditions() {
        let filter = json!({
            "$or": [
                { "name": { "$ilike": "%hero%" } },
                { "description": { "$ilike": "%hero%" } }
            ],
            "folder_id": null
        });
        let (sql, params) = FilterWhere::generate(&filter, 0).unwrap();
        assert_eq!(
            sql,
            "((\"name\"::text ILIKE $1) OR (\"description\"::text ILIKE $2)) AND (\"folder_id\" IS NULL)"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn array_membership() {
        let (sql, _) = FilterWhere::generate(&json!({ "tags": { "$any": ["cta"] } }), 0).unwrap();
        assert_eq!(sql, "\"tags\" && ARRAY[$1]::text[]");

        let (sql, params) = FilterWhere::generate(&json!({ "id": { "$in": [] } }), 0).unwrap();
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn rejects_unknown_operator_and_bad_column() {
        assert!(FilterWhere::validate(&json!({ "id": { "$regex": "x" } })).is_err());
        assert!(FilterWhere::validate(&json!({ "bad column": 1 })).is_err());
        assert!(FilterWhere::validate(&json!(["not", "an", "object"])).is_err());
    }
}
