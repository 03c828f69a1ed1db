use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// One field-level complaint in a `ValidationFailed` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProblem {
    pub field: String,
    pub message: String,
}

impl FieldProblem {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

const EMAIL_LOCAL_MAX: usize = 64;

/// `local@domain.tld`, no whitespace, one `@`, a dot inside the domain.
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > EMAIL_LOCAL_MAX || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty() && !domain.starts_with('.') && !domain.contains("..")
}

/// Collects problems so a payload reports every bad field at once.
#[derive(Debug, Default)]
pub struct Validator {
    problems: Vec<FieldProblem>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.problems.push(FieldProblem::new(field, message));
    }

    /// Present and non-blank after trimming.
    pub fn required<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.add(field, format!("{field} is required"));
                None
            }
        }
    }

    /// Blank is allowed only when `value` is `None`.
    pub fn non_blank(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if v.trim().is_empty() {
                self.add(field, format!("{field} cannot be empty"));
            }
        }
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !is_valid_email(v.trim()) {
                self.add(field, "Invalid email");
            }
        }
    }

    pub fn min_len(&mut self, field: &str, value: Option<&str>, min: usize) {
        if let Some(v) = value {
            if v.chars().count() < min {
                self.add(field, format!("{field} must be at least {min} characters"));
            }
        }
    }

    pub fn positive_int(&mut self, field: &str, value: Option<i64>) {
        if let Some(v) = value {
            if v <= 0 {
                self.add(field, format!("{field} must be a positive integer"));
            }
        }
    }

    pub fn non_negative(&mut self, field: &str, value: Option<Decimal>) {
        if let Some(v) = value {
            if v < Decimal::ZERO {
                self.add(field, format!("{field} must be non-negative"));
            }
        }
    }

    pub fn max_int(&mut self, field: &str, value: Option<i64>, max: i64) {
        if let Some(v) = value {
            if v > max {
                self.add(field, format!("{field} must be at most {max}"));
            }
        }
    }

    pub fn max_decimal(&mut self, field: &str, value: Option<Decimal>, max: Decimal) {
        if let Some(v) = value {
            if v > max {
                self.add(field, format!("{field} must be at most {max}"));
            }
        }
    }

    pub fn into_problems(self) -> Vec<FieldProblem> {
        self.problems
    }

    /// `Ok(())` when clean, otherwise `ValidationFailed` with every problem.
    pub fn finish(self) -> Result<(), ApiError> {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_failed(self.problems))
        }
    }
}
