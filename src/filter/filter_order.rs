use serde_json::Value;

use super::error::FilterError;
use super::types::{identifier, SortKey};

/// Sort keys from any of `"a desc, b"`, `["a desc", "b"]` or `{"a": "desc"}`.
pub fn parse_order(order: &Value) -> Result<Vec<SortKey>, FilterError> {
    let mut keys = Vec::new();
    match order {
        Value::String(text) => keys.extend(parse_list(text)),
        Value::Array(items) => {
            for text in items.iter().filter_map(Value::as_str) {
                keys.extend(parse_list(text));
            }
        }
        Value::Object(columns) => {
            for (column, direction) in columns {
                keys.push(SortKey {
                    column: column.clone(),
                    descending: is_descending(direction.as_str()),
                });
            }
        }
        _ => {}
    }

    for key in &keys {
        identifier(&key.column)?;
    }
    Ok(keys)
}

fn parse_list(text: &str) -> impl Iterator<Item = SortKey> + '_ {
    text.split(',').filter_map(|item| {
        let mut words = item.split_whitespace();
        let column = words.next()?;
        Some(SortKey {
            column: column.to_string(),
            descending: is_descending(words.next()),
        })
    })
}

fn is_descending(direction: Option<&str>) -> bool {
    direction.is_some_and(|d| d.eq_ignore_ascii_case("desc"))
}

/// `ORDER BY ...`, or nothing when there are no keys.
pub fn order_by(keys: &[SortKey]) -> String {
    if keys.is_empty() {
        return String::new();
    }
    let columns: Vec<String> = keys
        .iter()
        .map(|key| format!("\"{}\" {}", key.column, if key.descending { "DESC" } else { "ASC" }))
        .collect();
    format!("ORDER BY {}", columns.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_list_defaults_to_ascending() {
        let keys = parse_order(&json!("created_at desc, name")).unwrap();
        assert_eq!(
            keys,
            vec![
                SortKey { column: "created_at".into(), descending: true },
                SortKey { column: "name".into(), descending: false },
            ]
        );
        assert_eq!(order_by(&keys), "ORDER BY \"created_at\" DESC, \"name\" ASC");
    }

    #[test]
    fn object_form() {
        let keys = parse_order(&json!({ "created_at": "DESC" })).unwrap();
        assert!(keys[0].descending);
    }

    #[test]
    fn quoted_column_is_rejected() {
        assert!(parse_order(&json!("name\"; drop table x")).is_err());
    }
}
