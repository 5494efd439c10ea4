//! Editable field values and their conversion to and from record fields.

use super::InputKind;
use serde_json::Value as Json;
use std::collections::HashMap;

/// Value type for form fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Empty/null value
    #[default]
    None,
    /// String value
    String(String),
    /// Numeric value
    Number(f64),
    /// Boolean value
    Bool(bool),
    /// List of values (tags, checked options, file paths)
    List(Vec<String>),
    /// Rows of a repeated sub-record
    Rows(Vec<FormData>),
}

/// Form data - field key to value.
pub type FormData = HashMap<String, Value>;

impl Value {
    /// Get as string, or empty string if not a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::String(s) => s,
            _ => "",
        }
    }

    /// Items of a list value; a non-empty string counts as one item.
    pub fn items(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.clone(),
            Self::String(s) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Check if the value is empty/none.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(s) => s.is_empty(),
            Self::List(l) => l.is_empty(),
            Self::Rows(rows) => rows.iter().all(row_is_blank),
            _ => false,
        }
    }

    /// Text shown in an input.
    pub fn display(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::String(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Bool(b) => b.to_string(),
            Self::List(l) => l.join(", "),
            Self::Rows(rows) => format!("{} rows", rows.len()),
        }
    }

    /// Read a record field for an input of `kind`.
    pub fn from_json(value: &Json, kind: InputKind, multiple: bool) -> Self {
        match value {
            Json::Null => {
                if multiple {
                    Self::List(Vec::new())
                } else {
                    Self::None
                }
            }
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) if matches!(kind, InputKind::Number | InputKind::Range) => {
                n.as_f64().map(Self::Number).unwrap_or_default()
            }
            Json::Number(n) => Self::String(n.to_string()),
            Json::String(s) if multiple => {
                Self::List(if s.is_empty() { Vec::new() } else { vec![s.clone()] })
            }
            Json::String(s) => Self::String(s.clone()),
            Json::Array(items) => Self::List(items.iter().map(scalar_text).collect()),
            Json::Object(_) => Self::String(value.to_string()),
        }
    }

    /// Write back as a record field for an input of `kind`.
    ///
    /// Number inputs emit JSON numbers when the text parses; empty text
    /// becomes `null`.
    pub fn to_json(&self, kind: InputKind) -> Json {
        match self {
            Self::None => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) => number_json(*n),
            Self::String(s) if matches!(kind, InputKind::Number | InputKind::Range) => {
                text_number(s)
            }
            Self::String(s) => Json::String(s.clone()),
            Self::List(items) => Json::Array(
                items
                    .iter()
                    .map(|item| Self::String(item.clone()).to_json(kind))
                    .collect(),
            ),
            Self::Rows(rows) => Json::Array(
                rows.iter()
                    .map(|row| {
                        Json::Object(
                            row.iter()
                                .filter(|(_, v)| !matches!(v, Self::None))
                                .map(|(k, v)| (k.clone(), v.to_json(InputKind::Text)))
                                .collect(),
                        )
                    })
                    .collect(),
            ),
        }
    }

    /// Write back as a record field, keeping the JSON type the field held
    /// when the record was loaded. A number or bool shown in a text input
    /// goes back as a number or bool.
    ///
    /// `None` leaves the field out of the record: a blank value is only
    /// sent as `null` to clear a field that held something.
    pub fn to_field(&self, kind: InputKind, origin: Option<&Json>) -> Option<Json> {
        let origin = origin.filter(|o| !o.is_null());
        let json = match (self, origin) {
            (Self::String(s), Some(Json::Number(_))) => text_number(s),
            (Self::String(s), Some(Json::Bool(_))) => match s.trim() {
                "true" => Json::Bool(true),
                "false" => Json::Bool(false),
                _ => Json::String(s.clone()),
            },
            (Self::List(items), Some(Json::Array(held)))
                if held.first().is_some_and(Json::is_number) =>
            {
                Json::Array(items.iter().map(|item| text_number(item)).collect())
            }
            _ => self.to_json(kind),
        };
        match json {
            Json::Null if origin.is_none() => None,
            json => Some(json),
        }
    }
}

/// A number when the text parses as one; empty text is `null`.
fn text_number(text: &str) -> Json {
    match text.trim() {
        "" => Json::Null,
        trimmed => trimmed
            .parse::<f64>()
            .map(number_json)
            .unwrap_or_else(|_| Json::String(text.to_string())),
    }
}

/// Whether every value of a row is empty.
pub fn row_is_blank(row: &FormData) -> bool {
    row.values().all(Value::is_empty)
}

fn scalar_text(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn number_json(n: f64) -> Json {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Json::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Json::Number)
            .unwrap_or(Json::Null)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}
