use anyhow::Result;
use directories::ProjectDirs;
use rest_widgets::ListConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::models::Bookmark;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default = "default_bookmarks")]
    pub bookmarks: Vec<Bookmark>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Environment variable holding a personal access token
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Query of the topic feed
    #[serde(default = "default_feed_query")]
    pub feed_query: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_env: default_token_env(),
            feed_query: default_feed_query(),
        }
    }
}

impl GitHubConfig {
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_feed_query() -> String {
    "rust".to_string()
}

fn default_bookmarks() -> Vec<Bookmark> {
    vec![Bookmark::new(1, "ratatui"), Bookmark::new(2, "tokio")]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            list: ListConfig::default(),
            github: GitHubConfig::default(),
            bookmarks: default_bookmarks(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            Self::from_toml_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.list.page_size == 0 {
            anyhow::bail!("list.page_size must be at least 1");
        }
        Ok(config)
    }

    fn dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "topic-browser")
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::dirs()?.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        Ok(Self::dirs()?.data_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.list, ListConfig::default());
        assert_eq!(config.github.feed_query, "rust");
        assert_eq!(config.bookmarks.len(), 2);
    }

    #[test]
    fn test_nested_sections() {
        let config = Config::from_toml_str(
            r#"
            bookmarks = []

            [list]
            page_size = 25
            search_debounce_ms = 400

            [github]
            feed_query = "terminal"
            "#,
        )
        .unwrap();
        assert_eq!(config.list.page_size, 25);
        assert_eq!(config.list.search_debounce_ms, 400);
        assert_eq!(config.list.load_more_debounce_ms, 300);
        assert_eq!(config.github.feed_query, "terminal");
        assert_eq!(config.github.token_env, "GITHUB_TOKEN");
        assert!(config.bookmarks.is_empty());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(Config::from_toml_str("[list]\npage_size = 0").is_err());
    }
}
