use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::types::{Condition, Op, SortKey};

/// Row types the in-memory store can filter. Column names are the same
/// snake_case names the SQL tables use.
pub trait FilterTarget {
    fn field(&self, column: &str) -> Value;
}

pub fn matches<T: FilterTarget>(where_data: &Value, row: &T) -> Result<bool, FilterError> {
    let obj = match where_data {
        Value::Null => return Ok(true),
        Value::Object(obj) => obj,
        _ => return Err(FilterError::NotAnObject),
    };

    for (key, value) in obj {
        let ok = match key.as_str() {
            "$and" => {
                for v in as_array(key, value)? {
                    if !matches(v, row)? {
                        return Ok(false);
                    }
                }
                true
            }
            "$or" => {
                let mut any = false;
                for v in as_array(key, value)? {
                    if matches(v, row)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$not" => !matches(value, row)?,
            k if k.starts_with('$') => return Err(FilterError::UnknownOperator(k.to_string())),
            field => {
                let actual = row.field(field);
                for condition in Condition::expand(field, value)? {
                    if !compare(condition.op, &actual, &condition.operand)? {
                        return Ok(false);
                    }
                }
                true
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

pub fn sort<T: FilterTarget>(rows: &mut [T], order: &[SortKey]) {
    if order.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for key in order {
            let ord = cmp_values(&a.field(&key.column), &b.field(&key.column));
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn as_array<'v>(op: &str, value: &'v Value) -> Result<&'v Vec<Value>, FilterError> {
    value
        .as_array()
        .ok_or_else(|| FilterError::operand(op, "an array of condition objects"))
}

fn compare(op: Op, actual: &Value, expected: &Value) -> Result<bool, FilterError> {
    Ok(match op {
        Op::Eq => values_eq(actual, expected),
        Op::Ne => !values_eq(actual, expected),
        Op::Gt => !actual.is_null() && cmp_values(actual, expected) == Ordering::Greater,
        Op::Gte => !actual.is_null() && cmp_values(actual, expected) != Ordering::Less,
        Op::Lt => !actual.is_null() && cmp_values(actual, expected) == Ordering::Less,
        Op::Lte => !actual.is_null() && cmp_values(actual, expected) != Ordering::Greater,
        Op::Like => like(actual, expected, false),
        Op::ILike => like(actual, expected, true),
        Op::In => match expected {
            Value::Array(values) => values.iter().any(|v| values_eq(actual, v)),
            other => values_eq(actual, other),
        },
        Op::Between => match expected.as_array().map(Vec::as_slice) {
            Some([low, high]) => {
                !actual.is_null()
                    && cmp_values(actual, low) != Ordering::Less
                    && cmp_values(actual, high) != Ordering::Greater
            }
            _ => return Err(FilterError::operand("$between", "a [low, high] pair")),
        },
    })
}

fn values_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        // NULLS LAST, as Postgres does for ascending order
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn like(actual: &Value, pattern: &Value, case_insensitive: bool) -> bool {
    let (Some(text), Some(pattern)) = (as_text(actual), pattern.as_str()) else {
        return false;
    };
    if case_insensitive {
        like_match(&text.to_lowercase(), &pattern.to_lowercase())
    } else {
        like_match(&text, pattern)
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum LikeToken {
    AnyRun,
    AnyOne,
    Literal(char),
}

/// Backslash escapes the next character, as in Postgres' default `ESCAPE '\'`.
fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::AnyRun,
            '_' => LikeToken::AnyOne,
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            other => LikeToken::Literal(other),
        });
    }
    tokens
}

/// SQL LIKE: `%` matches any run, `_` matches one character.
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern = like_tokens(pattern);
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        let step = match pattern.get(p) {
            Some(LikeToken::AnyOne) => true,
            Some(LikeToken::Literal(c)) => *c == text[t],
            _ => false,
        };
        if step {
            t += 1;
            p += 1;
        } else if pattern.get(p) == Some(&LikeToken::AnyRun) {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((bp, bt)) = backtrack {
            p = bp + 1;
            t = bt + 1;
            backtrack = Some((bp, bt + 1));
        } else {
            return false;
        }
    }
    while pattern.get(p) == Some(&LikeToken::AnyRun) {
        p += 1;
    }
    p == pattern.len()
}
