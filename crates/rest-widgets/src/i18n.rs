//! Text lookup for widget chrome (buttons, status lines, prompts).

use crate::error::{WidgetError, WidgetResult};
use std::collections::HashMap;

/// Keys the widgets look up.
pub mod keys {
    pub const LOAD_MORE: &str = "load_more";
    pub const NO_MORE: &str = "no_more";
    pub const LOADING: &str = "loading";
    pub const CREATE: &str = "create";
    pub const CREATE_X: &str = "create_x";
    pub const EDIT: &str = "edit";
    pub const VIEW: &str = "view";
    pub const DELETE: &str = "delete";
    pub const SUBMIT: &str = "submit";
    pub const CANCEL: &str = "cancel";
    pub const TOTAL_X_ROWS: &str = "total_x_rows";
    pub const SURE_TO_DELETE_X: &str = "sure_to_delete_x";
}

/// Synchronous, pure text lookup.
pub trait Translator: Send + Sync {
    /// Look up `key`, substituting `{name}` placeholders from `args`.
    fn t(&self, key: &str, args: &[(&str, &str)]) -> String;
}

/// Template catalog for one locale.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    templates: HashMap<String, String>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// English catalog with every key the widgets use.
    pub fn en_us() -> Self {
        Self::new()
            .entry(keys::LOAD_MORE, "Load more")
            .entry(keys::NO_MORE, "No more")
            .entry(keys::LOADING, "Loading...")
            .entry(keys::CREATE, "Create")
            .entry(keys::CREATE_X, "Create \"{label}\"")
            .entry(keys::EDIT, "Edit")
            .entry(keys::VIEW, "View")
            .entry(keys::DELETE, "Delete")
            .entry(keys::SUBMIT, "Submit")
            .entry(keys::CANCEL, "Cancel")
            .entry(keys::TOTAL_X_ROWS, "Total {totalCount} rows")
            .entry(keys::SURE_TO_DELETE_X, "Are you sure to delete {keys}?")
    }

    /// Add or replace a template.
    pub fn entry(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(key.into(), template.into());
        self
    }

    /// Parse a flat TOML table of `key = "template"` pairs.
    pub fn from_toml_str(content: &str) -> WidgetResult<Self> {
        let table: toml::Table = toml::from_str(content)?;
        let mut templates = HashMap::new();
        for (key, value) in table {
            match value {
                toml::Value::String(s) => {
                    templates.insert(key, s);
                }
                other => {
                    return Err(WidgetError::Config(format!(
                        "catalog entry '{key}' must be a string, found {}",
                        other.type_str()
                    )))
                }
            }
        }
        Ok(Self { templates })
    }

    /// Overlay another catalog; its entries win.
    pub fn merge(mut self, other: Catalog) -> Self {
        self.templates.extend(other.templates);
        self
    }
}

impl Translator for Catalog {
    fn t(&self, key: &str, args: &[(&str, &str)]) -> String {
        let Some(template) = self.templates.get(key) else {
            return key.to_string();
        };
        args.iter().fold(template.clone(), |text, (name, value)| {
            text.replace(&format!("{{{name}}}"), value)
        })
    }
}
