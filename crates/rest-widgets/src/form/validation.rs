//! Validation for form fields.
//!
//! Every field gets the constraints its descriptor declares (required,
//! bounds, lengths, the format implied by its kind) followed by any
//! explicit validators. Only the first failure per field is reported.

use super::array::validate_rows;
use super::{Field, FormData, InputKind, Value};
use regex::Regex;
use std::sync::LazyLock;

/// Validator for form fields.
#[derive(Clone)]
pub enum Validator {
    /// Field is required
    Required,
    /// Minimum length for strings, or item count for lists
    MinLength(usize),
    /// Maximum length for strings, or item count for lists
    MaxLength(usize),
    /// Regular expression pattern
    Regex(Regex),
    /// Minimum numeric value
    Min(f64),
    /// Maximum numeric value
    Max(f64),
    /// `local@domain.tld`
    Email,
    /// `http://` or `https://` URL
    Url,
    /// Digits with optional `+`, spaces, dashes and parentheses
    Tel,
    /// Custom validation function
    Custom(fn(&Value) -> Result<(), String>),
    /// Cross-field validation (has access to all form data)
    CrossField(fn(&Value, &FormData) -> Result<(), String>),
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required => write!(f, "Required"),
            Self::MinLength(n) => write!(f, "MinLength({})", n),
            Self::MaxLength(n) => write!(f, "MaxLength({})", n),
            Self::Regex(r) => write!(f, "Regex({})", r.as_str()),
            Self::Min(n) => write!(f, "Min({})", n),
            Self::Max(n) => write!(f, "Max({})", n),
            Self::Email => write!(f, "Email"),
            Self::Url => write!(f, "Url"),
            Self::Tel => write!(f, "Tel"),
            Self::Custom(_) => write!(f, "Custom(fn)"),
            Self::CrossField(_) => write!(f, "CrossField(fn)"),
        }
    }
}

fn length(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        Value::List(l) => l.len(),
        Value::Rows(rows) => rows.len(),
        _ => 0,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[A-Za-z]{2,}$").expect("email pattern")
});

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://\S+$").expect("url pattern"));

static TEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9 ()\-]*[0-9][0-9 ()\-]*$").expect("tel pattern")
});

fn is_email(s: &str) -> bool {
    EMAIL_REGEX.is_match(s)
}

fn is_url(s: &str) -> bool {
    URL_REGEX.is_match(s)
}

fn is_tel(s: &str) -> bool {
    TEL_REGEX.is_match(s)
}

/// Apply a text check to a string value, or to every item of a list.
fn check_text(value: &Value, ok: fn(&str) -> bool, message: &str) -> Result<(), String> {
    let valid = match value {
        Value::String(s) => s.is_empty() || ok(s),
        Value::List(items) => items.iter().all(|item| ok(item)),
        _ => true,
    };
    if valid {
        Ok(())
    } else {
        Err(message.to_string())
    }
}

impl Validator {
    /// Create a regex validator from a pattern string.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Regex(Regex::new(pattern)?))
    }

    /// Create a custom validator.
    pub fn custom(f: fn(&Value) -> Result<(), String>) -> Self {
        Self::Custom(f)
    }

    /// Create a cross-field validator.
    pub fn cross_field(f: fn(&Value, &FormData) -> Result<(), String>) -> Self {
        Self::CrossField(f)
    }

    /// Validate a value.
    pub fn validate(&self, value: &Value, form_data: &FormData) -> Result<(), String> {
        match self {
            Self::Required => {
                if value.is_empty() {
                    Err("This field is required".into())
                } else {
                    Ok(())
                }
            }
            Self::MinLength(min) => {
                if !value.is_empty() && length(value) < *min {
                    Err(format!("Must be at least {} characters", min))
                } else {
                    Ok(())
                }
            }
            Self::MaxLength(max) => {
                if length(value) > *max {
                    Err(format!("Must be at most {} characters", max))
                } else {
                    Ok(())
                }
            }
            Self::Regex(regex) => match value {
                Value::String(s) if !s.is_empty() && !regex.is_match(s) => {
                    Err("Invalid format".into())
                }
                _ => Ok(()),
            },
            Self::Min(min) => match number(value) {
                Some(n) if n < *min => Err(format!("Must be at least {}", min)),
                _ => Ok(()),
            },
            Self::Max(max) => match number(value) {
                Some(n) if n > *max => Err(format!("Must be at most {}", max)),
                _ => Ok(()),
            },
            Self::Email => check_text(value, is_email, "Invalid email address"),
            Self::Url => check_text(value, is_url, "Invalid URL"),
            Self::Tel => check_text(value, is_tel, "Invalid phone number"),
            Self::Custom(f) => f(value),
            Self::CrossField(f) => f(value, form_data),
        }
    }

    /// Constraints declared by a field descriptor, in checking order.
    pub fn for_field<D>(field: &Field<D>) -> Vec<Validator> {
        let mut validators = Vec::new();
        if field.required {
            validators.push(Self::Required);
        }
        match field.kind {
            InputKind::Email => validators.push(Self::Email),
            InputKind::Url => validators.push(Self::Url),
            InputKind::Tel => validators.push(Self::Tel),
            InputKind::Number => validators.push(Self::custom(|v| match v {
                Value::String(s) if !s.trim().is_empty() && s.trim().parse::<f64>().is_err() => {
                    Err("Must be a number".into())
                }
                _ => Ok(()),
            })),
            _ => {}
        }
        if let Some(min) = field.min {
            validators.push(Self::Min(min));
        }
        if let Some(max) = field.max {
            validators.push(Self::Max(max));
        }
        if let Some(len) = field.min_length {
            validators.push(Self::MinLength(len));
        }
        if let Some(len) = field.max_length {
            validators.push(Self::MaxLength(len));
        }
        validators.extend(field.validators.iter().cloned());
        validators
    }
}

/// First failure of `field` given the whole form, if any.
///
/// Read-only and disabled fields are not validated.
pub fn validate_field<D>(field: &Field<D>, data: &FormData) -> Option<String> {
    let key = field.key.as_ref()?;
    if field.read_only || field.disabled {
        return None;
    }
    let value = data.get(key).cloned().unwrap_or_default();
    let failure = Validator::for_field(field)
        .iter()
        .find_map(|validator| validator.validate(&value, data).err());
    match (failure, &value) {
        (None, Value::Rows(rows)) => validate_rows(&field.item_fields, rows),
        (failure, _) => failure,
    }
}
