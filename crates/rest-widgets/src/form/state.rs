//! State management for ResourceForm.

use super::{Field, FormData, Value};
use std::collections::HashMap;

/// State for ResourceForm widget.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    /// Current field values
    pub values: FormData,
    /// Validation errors (field key -> error message)
    pub errors: HashMap<String, String>,
    /// Currently focused field key
    pub focused_field: Option<String>,
    /// Uncommitted tag text per tag field
    pub drafts: HashMap<String, String>,
    /// Highlighted option per option field
    pub option_cursor: HashMap<String, usize>,
    /// Row and sub-field per array field
    pub item_cursor: HashMap<String, (usize, usize)>,
    /// Whether validation has run since the last reset
    pub validated: bool,
    /// Edit-slot generation the values were derived from
    pub(crate) source: Option<u64>,
}

fn focusable<D>(fields: &[Field<D>]) -> Vec<&str> {
    fields
        .iter()
        .filter(|f| !f.disabled && !f.read_only)
        .filter_map(|f| f.key.as_deref())
        .collect()
}

impl FormState {
    /// Create a new empty form state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create form state with initial values.
    pub fn with_values(values: FormData) -> Self {
        Self {
            values,
            ..Default::default()
        }
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Set a field value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        self.values.insert(field.clone(), value.into());
        // Clear error when value changes
        self.errors.remove(&field);
    }

    /// Check if a field has an error.
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Get error for a field.
    pub fn get_error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(|s| s.as_str())
    }

    /// Focus a specific field.
    pub fn focus(&mut self, field: impl Into<String>) {
        self.focused_field = Some(field.into());
    }

    /// Focus the next editable field.
    pub fn focus_next<D>(&mut self, fields: &[Field<D>]) {
        let keys = focusable(fields);
        if keys.is_empty() {
            return;
        }

        let current_idx = self
            .focused_field
            .as_deref()
            .and_then(|name| keys.iter().position(|k| *k == name));

        let next_idx = match current_idx {
            Some(idx) => (idx + 1) % keys.len(),
            None => 0,
        };

        self.focused_field = Some(keys[next_idx].to_string());
    }

    /// Focus the previous editable field.
    pub fn focus_previous<D>(&mut self, fields: &[Field<D>]) {
        let keys = focusable(fields);
        if keys.is_empty() {
            return;
        }

        let current_idx = self
            .focused_field
            .as_deref()
            .and_then(|name| keys.iter().position(|k| *k == name));

        let prev_idx = match current_idx {
            Some(0) | None => keys.len() - 1,
            Some(idx) => idx - 1,
        };

        self.focused_field = Some(keys[prev_idx].to_string());
    }

    /// Check if form is valid (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Reset with new initial values.
    pub fn reset_with(&mut self, values: FormData) {
        self.values = values;
        self.errors.clear();
        self.drafts.clear();
        self.option_cursor.clear();
        self.item_cursor.clear();
        self.validated = false;
    }
}
