use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::FilterError;

/// A list/find request as handed to a store.
///
/// `where_clause` is a JSON condition object: `{ "field": value }` for
/// equality, `{ "field": { "$op": value } }` for operators, and
/// `$and`/`$or`/`$not` for composition. Top-level keys are ANDed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    pub where_clause: Option<Value>,
    pub order: Option<Value>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    In,
    Between,
}

impl Op {
    pub fn parse(key: &str) -> Result<Self, FilterError> {
        let op = match key {
            "$eq" => Op::Eq,
            "$ne" | "$neq" => Op::Ne,
            "$gt" => Op::Gt,
            "$gte" => Op::Gte,
            "$lt" => Op::Lt,
            "$lte" => Op::Lte,
            "$like" => Op::Like,
            "$ilike" => Op::ILike,
            "$in" => Op::In,
            "$between" => Op::Between,
            other => return Err(FilterError::UnknownOperator(other.to_string())),
        };
        Ok(op)
    }
}

/// One `column op operand` test.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Op,
    pub operand: Value,
}

impl Condition {
    /// `{field: value}` is equality; `{field: {$gt: 1, $lt: 5}}` yields one
    /// condition per operator.
    pub fn expand(field: &str, value: &Value) -> Result<Vec<Condition>, FilterError> {
        let column = identifier(field)?.to_string();
        let Value::Object(ops) = value else {
            return Ok(vec![Condition { column, op: Op::Eq, operand: value.clone() }]);
        };
        ops.iter()
            .map(|(key, operand)| {
                Ok(Condition {
                    column: column.clone(),
                    op: Op::parse(key)?,
                    operand: operand.clone(),
                })
            })
            .collect()
    }
}

/// Placeholder casts per column. Parameters are bound as text or numbers,
/// so uuid and date columns need `$n::uuid` style casts to compare.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnCasts(&'static [(&'static str, &'static str)]);

impl ColumnCasts {
    pub const fn new(casts: &'static [(&'static str, &'static str)]) -> Self {
        Self(casts)
    }

    pub fn lookup(&self, column: &str) -> Option<&'static str> {
        self.0.iter().find(|(name, _)| *name == column).map(|(_, cast)| *cast)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

/// Rendered SQL with its positional parameters.
#[derive(Debug, Clone)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`; anything else could escape the quoting.
pub(crate) fn identifier(name: &str) -> Result<&str, FilterError> {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(FilterError::Identifier(name.to_string()))
    }
}
