//! Error types for stores and widgets.

use thiserror::Error;

use crate::store::IdType;

/// Errors raised by a [`PagedStore`](crate::PagedStore) or its backend.
///
/// `Clone` so the most recent failure can sit in
/// [`StoreState::last_error`](crate::StoreState::last_error).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Network or transport failure.
    #[error("request failed: {0}")]
    Request(String),

    /// No record with this key.
    #[error("record not found: {0}")]
    NotFound(IdType),

    /// A record could not be converted to or from its field form.
    #[error("invalid record: {0}")]
    Decode(String),

    /// The backend does not implement this operation.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by widget setup (configuration, catalogs).
#[derive(Debug, Error)]
pub enum WidgetError {
    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML error.
    #[error("TOML error: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for WidgetError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e.to_string())
    }
}

/// Result type for widget setup.
pub type WidgetResult<T> = Result<T, WidgetError>;
