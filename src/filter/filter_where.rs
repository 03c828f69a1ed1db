use serde_json::Value;

use super::error::FilterError;
use super::types::{ColumnCasts, Condition, Op, SqlFragment};

/// Renders a where-clause object into a Postgres predicate.
///
/// Every operand becomes a `$n` placeholder; `n` follows the order values
/// are pushed, so nested groups number their parameters in reading order.
pub struct SqlWriter<'a> {
    casts: &'a ColumnCasts,
    params: Vec<Value>,
}

impl<'a> SqlWriter<'a> {
    pub fn new(casts: &'a ColumnCasts) -> Self {
        Self { casts, params: Vec::new() }
    }

    pub fn predicate(mut self, conditions: &Value) -> Result<SqlFragment, FilterError> {
        let sql = self.group(conditions)?;
        Ok(SqlFragment { sql, params: self.params })
    }

    fn group(&mut self, conditions: &Value) -> Result<String, FilterError> {
        let object = match conditions {
            Value::Null => return Ok("TRUE".to_string()),
            Value::Object(object) => object,
            _ => return Err(FilterError::NotAnObject),
        };

        let mut terms = Vec::with_capacity(object.len());
        for (key, value) in object {
            match key.as_str() {
                "$and" => terms.push(self.junction(key, value, " AND ", "TRUE")?),
                "$or" => terms.push(self.junction(key, value, " OR ", "FALSE")?),
                "$not" => terms.push(format!("NOT ({})", self.group(value)?)),
                op if op.starts_with('$') => return Err(FilterError::UnknownOperator(op.to_string())),
                field => {
                    for condition in Condition::expand(field, value)? {
                        terms.push(self.condition(&condition)?);
                    }
                }
            }
        }

        Ok(match terms.len() {
            0 => "TRUE".to_string(),
            _ => terms.join(" AND "),
        })
    }

    fn junction(&mut self, op: &str, value: &Value, joiner: &str, when_empty: &str) -> Result<String, FilterError> {
        let branches = value
            .as_array()
            .ok_or_else(|| FilterError::operand(op, "an array of condition objects"))?;
        if branches.is_empty() {
            return Ok(when_empty.to_string());
        }
        let mut parts = Vec::with_capacity(branches.len());
        for branch in branches {
            parts.push(format!("({})", self.group(branch)?));
        }
        Ok(format!("({})", parts.join(joiner)))
    }

    fn condition(&mut self, condition: &Condition) -> Result<String, FilterError> {
        let column = format!("\"{}\"", condition.column);
        let name = condition.column.as_str();
        let operand = &condition.operand;

        let sql = match condition.op {
            Op::Eq if operand.is_null() => format!("{} IS NULL", column),
            Op::Eq => format!("{} = {}", column, self.bind(name, operand)),
            Op::Ne if operand.is_null() => format!("{} IS NOT NULL", column),
            Op::Ne => format!("{} <> {}", column, self.bind(name, operand)),
            Op::Gt => format!("{} > {}", column, self.bind(name, operand)),
            Op::Gte => format!("{} >= {}", column, self.bind(name, operand)),
            Op::Lt => format!("{} < {}", column, self.bind(name, operand)),
            Op::Lte => format!("{} <= {}", column, self.bind(name, operand)),
            Op::Like => format!("{}::text LIKE {}", column, self.push(operand)),
            Op::ILike => format!("{}::text ILIKE {}", column, self.push(operand)),
            Op::In => match operand {
                Value::Array(values) if values.is_empty() => "FALSE".to_string(),
                Value::Array(values) => {
                    let list: Vec<String> = values.iter().map(|v| self.bind(name, v)).collect();
                    format!("{} IN ({})", column, list.join(", "))
                }
                single => format!("{} = {}", column, self.bind(name, single)),
            },
            Op::Between => match operand.as_array().map(Vec::as_slice) {
                Some([low, high]) => {
                    let low = self.bind(name, low);
                    let high = self.bind(name, high);
                    format!("{} BETWEEN {} AND {}", column, low, high)
                }
                _ => return Err(FilterError::operand("$between", "a [low, high] pair")),
            },
        };
        Ok(sql)
    }

    /// Placeholder with the column's cast, if it has one.
    fn bind(&mut self, column: &str, value: &Value) -> String {
        let placeholder = self.push(value);
        match self.casts.lookup(column) {
            Some(cast) => format!("{}::{}", placeholder, cast),
            None => placeholder,
        }
    }

    fn push(&mut self, value: &Value) -> String {
        self.params.push(value.clone());
        format!("${}", self.params.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(conditions: Value, casts: ColumnCasts) -> Result<SqlFragment, FilterError> {
        SqlWriter::new(&casts).predicate(&conditions)
    }

    #[test]
    fn equality_shorthand_uses_casts() {
        let out = render(json!({ "id": "abc", "tenant_id": 7 }), ColumnCasts::new(&[("id", "uuid")])).unwrap();
        assert_eq!(out.sql, "\"id\" = $1::uuid AND \"tenant_id\" = $2");
        assert_eq!(out.params, vec![json!("abc"), json!(7)]);
    }

    #[test]
    fn client_search_numbers_placeholders_in_order() {
        let out = render(
            json!({
                "tenant_id": 1,
                "$or": [ { "name": { "$ilike": "%a%" } }, { "email": { "$ilike": "%b%" } } ]
            }),
            ColumnCasts::default(),
        )
        .unwrap();
        assert_eq!(
            out.sql,
            "((\"name\"::text ILIKE $1) OR (\"email\"::text ILIKE $2)) AND \"tenant_id\" = $3"
        );
        assert_eq!(out.params, vec![json!("%a%"), json!("%b%"), json!(1)]);
    }

    #[test]
    fn null_means_is_null() {
        let out = render(json!({ "tenant_id": null }), ColumnCasts::default()).unwrap();
        assert_eq!(out.sql, "\"tenant_id\" IS NULL");
        assert!(out.params.is_empty());
    }

    #[test]
    fn empty_in_matches_nothing() {
        let out = render(json!({ "status": { "$in": [] } }), ColumnCasts::default()).unwrap();
        assert_eq!(out.sql, "FALSE");
    }

    #[test]
    fn unsafe_names_and_unknown_operators_fail() {
        assert_eq!(
            render(json!({ "name; drop": 1 }), ColumnCasts::default()).unwrap_err(),
            FilterError::Identifier("name; drop".into())
        );
        assert_eq!(
            render(json!({ "name": { "$regex": "x" } }), ColumnCasts::default()).unwrap_err(),
            FilterError::UnknownOperator("$regex".into())
        );
        assert!(render(json!({ "total": { "$between": [1] } }), ColumnCasts::default()).is_err());
    }
}
