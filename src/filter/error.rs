use thiserror::Error;

/// A filter document that cannot be compiled. Always the caller's fault, so these surface as 400s.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid relation: {0}")]
    InvalidRelation(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Invalid filter: {0}")]
    InvalidWhereClause(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid operand: {0}")]
    InvalidOperatorData(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),
}
