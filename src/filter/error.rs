use thiserror::Error;

/// A where/order/paging request the filter cannot turn into a query.
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("'{0}' is not a usable table or column name")]
    Identifier(String),

    #[error("conditions must be a JSON object")]
    NotAnObject,

    #[error("unknown operator {0}")]
    UnknownOperator(String),

    #[error("{op} takes {expected}")]
    Operand { op: String, expected: &'static str },

    #[error("{0} cannot be negative")]
    NegativeWindow(&'static str),
}

impl FilterError {
    pub(crate) fn operand(op: &str, expected: &'static str) -> Self {
        FilterError::Operand { op: op.to_string(), expected }
    }
}
