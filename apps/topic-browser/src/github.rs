//! GitHub topic search as a page [`Backend`].

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use rest_widgets::{Backend, Filter, Page, StoreError, StoreResult};
use serde::Deserialize;
use tracing::debug;

use crate::config::GitHubConfig;
use crate::models::Topic;

/// The search API serves at most this many results per query.
const SEARCH_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total_count: usize,
    #[serde(default)]
    items: Vec<Topic>,
}

pub struct GitHubTopics {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
    default_query: String,
}

impl GitHubTopics {
    pub fn new(config: &GitHubConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("topic-browser/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token(),
            default_query: config.feed_query.clone(),
        })
    }

    /// Search text for `filter`: its `name` criterion, else the feed query.
    fn query(&self, filter: &Filter) -> String {
        filter
            .get("name")
            .and_then(|value| value.as_str())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(&self.default_query)
            .to_string()
    }
}

fn request_error(e: reqwest::Error) -> StoreError {
    StoreError::Request(e.to_string())
}

#[async_trait]
impl Backend for GitHubTopics {
    type Item = Topic;

    async fn load_page(
        &self,
        page_index: usize,
        page_size: usize,
        filter: &Filter,
    ) -> StoreResult<Page<Topic>> {
        let q = self.query(filter);
        let page = page_index.to_string();
        let per_page = page_size.to_string();
        debug!(q = %q, page_index, page_size, "searching topics");

        let mut request = self
            .client
            .get(format!("{}/search/topics", self.api_url))
            .query(&[("q", q.as_str()), ("page", page.as_str()), ("per_page", per_page.as_str())])
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(request_error)?;
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(Page::new(body.items, body.total_count.min(SEARCH_LIMIT)))
    }
}
