//! Timing and paging configuration shared by the list-driven widgets.

use crate::error::{WidgetError, WidgetResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Paging and debounce settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConfig {
    /// Rows requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Coalescing window for boundary-triggered "load more".
    #[serde(default = "default_load_more_debounce")]
    pub load_more_debounce_ms: u64,
    /// Coalescing window for table page changes.
    #[serde(default = "default_page_debounce")]
    pub page_debounce_ms: u64,
    /// Coalescing window for search keystrokes.
    #[serde(default = "default_search_debounce")]
    pub search_debounce_ms: u64,
    /// Distance in cells from an edge at which the edge counts as touched.
    #[serde(default = "default_edge_margin")]
    pub edge_margin: u16,
}

fn default_page_size() -> usize {
    10
}

fn default_load_more_debounce() -> u64 {
    300
}

fn default_page_debounce() -> u64 {
    300
}

fn default_search_debounce() -> u64 {
    1000
}

fn default_edge_margin() -> u16 {
    2
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            load_more_debounce_ms: default_load_more_debounce(),
            page_debounce_ms: default_page_debounce(),
            search_debounce_ms: default_search_debounce(),
            edge_margin: default_edge_margin(),
        }
    }
}

impl ListConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(content: &str) -> WidgetResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file.
    pub fn load(path: &Path) -> WidgetResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from the default location, falling back to defaults.
    pub fn load_default() -> WidgetResult<Self> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    /// Get default config path.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rest-widgets")
            .map(|d| d.config_dir().join("lists.toml"))
    }

    fn validate(&self) -> WidgetResult<()> {
        if self.page_size == 0 {
            return Err(WidgetError::Config("page_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Load-more coalescing window.
    pub fn load_more_window(&self) -> Duration {
        Duration::from_millis(self.load_more_debounce_ms)
    }

    /// Page-change coalescing window.
    pub fn page_window(&self) -> Duration {
        Duration::from_millis(self.page_debounce_ms)
    }

    /// Search coalescing window.
    pub fn search_window(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ListConfig::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.search_window(), Duration::from_secs(1));
        assert_eq!(config.load_more_window(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ListConfig::from_toml_str("page_size = 25\n").unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.page_debounce_ms, 300);
        assert_eq!(config.edge_margin, 2);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = ListConfig::from_toml_str("page_size = 0").unwrap_err();
        assert!(matches!(err, WidgetError::Config(_)));
    }
}
