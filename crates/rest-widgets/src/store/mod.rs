//! Paged resource stores.
//!
//! Widgets consume a [`PagedStore`]: paged retrieval into a deduplicated
//! accumulated cache, loading counters, and a single "current item" slot for
//! editing. [`ListModel`] implements the contract over any [`Backend`] that
//! knows how to fetch one page and perform CRUD calls.
//!
//! # Observing state
//!
//! Every mutation goes through a `tokio::sync::watch` channel, so a view can
//! either read [`PagedStore::state`] at render time or hold a receiver from
//! [`PagedStore::subscribe`] and redraw when it changes.
//!
//! # Concurrency convention
//!
//! `downloading` is an advisory lock. Every call site that can trigger a
//! fetch checks `downloading < 1` first, or waits for
//! [`PagedStore::wait_idle`]. Nothing enforces this structurally.

mod memory;
mod model;

pub use memory::{BackendCall, MemoryBackend};
pub use model::{Backend, ListModel, Page};

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;
use tokio::sync::watch;

/// Identity of a record, taken from its index-key field.
pub type IdType = String;

/// A plain field-keyed record: the edit slot and the form submission shape.
pub type Fields = serde_json::Map<String, Value>;

/// Data a store can hold.
pub trait Record: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Record for T where T: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Convert a record to its field map.
pub fn to_fields<D: Serialize>(record: &D) -> StoreResult<Fields> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Decode(format!(
            "record must serialize to an object, got {other}"
        ))),
    }
}

/// Build a record from a field map.
pub fn from_fields<D: DeserializeOwned>(fields: Fields) -> StoreResult<D> {
    Ok(serde_json::from_value(Value::Object(fields))?)
}

/// Read one field of a record; `Null` when absent.
pub fn field_of<D: Serialize>(record: &D, key: &str) -> Value {
    match serde_json::to_value(record) {
        Ok(Value::Object(mut map)) => map.remove(key).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Stringify an identity value. Empty strings and non-scalars have no identity.
pub fn id_of(value: &Value) -> Option<IdType> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Field-to-criterion mapping. Empty means unfiltered.
///
/// Compared by value: supplying an equal filter is not a change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter(BTreeMap<String, Value>);

impl Filter {
    /// Create an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a criterion.
    pub fn with(mut self, key: impl Into<String>, criterion: impl Into<Value>) -> Self {
        self.0.insert(key.into(), criterion.into());
        self
    }

    /// Criterion for one field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether there are no criteria.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over criteria.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Whether `fields` satisfies every criterion.
    ///
    /// Strings match case-insensitively by substring, arrays match if any
    /// element matches, everything else by equality.
    pub fn matches(&self, fields: &Fields) -> bool {
        self.0.iter().all(|(key, criterion)| {
            fields
                .get(key)
                .is_some_and(|value| criterion_matches(criterion, value))
        })
    }
}

fn criterion_matches(criterion: &Value, value: &Value) -> bool {
    match (criterion, value) {
        (_, Value::Array(items)) => items.iter().any(|item| criterion_matches(criterion, item)),
        (Value::String(needle), Value::String(haystack)) => haystack
            .to_lowercase()
            .contains(&needle.to_lowercase()),
        (criterion, value) => criterion == value,
    }
}

/// Observable state of a paged store.
#[derive(Debug, Clone)]
pub struct StoreState<D> {
    /// Field that identifies a record.
    pub index_key: String,
    /// Pages fetched under the current filter, by page index minus one.
    /// Pages never fetched are empty.
    pub page_list: Vec<Vec<D>>,
    /// Deduplicated union of `page_list`, in page order.
    pub all_items: Vec<D>,
    /// Items of the most recently fetched page.
    pub current_page: Vec<D>,
    /// One-based index of the most recently fetched page; 0 before any fetch.
    pub page_index: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub total_count: usize,
    /// In-flight fetches.
    pub downloading: usize,
    /// In-flight create/update/delete calls.
    pub uploading: usize,
    /// Set once the last page has been seen.
    pub no_more: bool,
    /// Edit slot; empty when no edit is in progress.
    pub current_one: Fields,
    /// Filter the accumulated pages belong to.
    pub filter: Filter,
    /// Bumped by every list reset; responses from an older session are dropped.
    pub session: u64,
    /// Bumped whenever the edit slot is cleared or replaced.
    pub edit_session: u64,
    /// Most recent failure, cleared by the next successful fetch.
    pub last_error: Option<StoreError>,
}

impl<D: Record> StoreState<D> {
    /// Fresh state.
    pub fn new(index_key: impl Into<String>, page_size: usize) -> Self {
        Self {
            index_key: index_key.into(),
            page_list: Vec::new(),
            all_items: Vec::new(),
            current_page: Vec::new(),
            page_index: 0,
            page_size: page_size.max(1),
            page_count: 0,
            total_count: 0,
            downloading: 0,
            uploading: 0,
            no_more: false,
            current_one: Fields::new(),
            filter: Filter::default(),
            session: 0,
            edit_session: 0,
            last_error: None,
        }
    }

    /// Identity of a record.
    pub fn key_of(&self, record: &D) -> Option<IdType> {
        id_of(&field_of(record, &self.index_key))
    }

    /// Identity of the record in the edit slot, if it has one.
    pub fn current_id(&self) -> Option<IdType> {
        self.current_one.get(&self.index_key).and_then(id_of)
    }

    /// Whether an edit or create is in progress.
    pub fn is_editing(&self) -> bool {
        !self.current_one.is_empty()
    }

    /// Whether any request is in flight.
    pub fn is_busy(&self) -> bool {
        self.downloading > 0 || self.uploading > 0
    }

    /// Drop accumulated pages and start a new session.
    pub fn reset_list(&mut self) {
        self.page_list.clear();
        self.all_items.clear();
        self.current_page.clear();
        self.page_index = 0;
        self.page_count = 0;
        self.total_count = 0;
        self.no_more = false;
        self.session += 1;
    }

    /// Recompute `all_items` from `page_list`, keeping the first occurrence of
    /// each key. Records without a key are always kept.
    pub fn rebuild_all_items(&mut self) {
        let mut seen = HashSet::new();
        let mut all = Vec::new();
        for record in self.page_list.iter().flatten() {
            if let Some(key) = self.key_of(record) {
                if !seen.insert(key) {
                    continue;
                }
            }
            all.push(record.clone());
        }
        self.all_items = all;
    }

    /// Recompute `page_count` from `total_count`.
    pub fn update_page_count(&mut self) {
        self.page_count = page_count(self.total_count, self.page_size);
    }
}

/// `ceil(total / size)`, with a zero size treated as one.
pub fn page_count(total: usize, size: usize) -> usize {
    total.div_ceil(size.max(1))
}

/// A paged resource store.
#[async_trait]
pub trait PagedStore: Send + Sync + 'static {
    /// Record type.
    type Item: Record;

    /// Read the current state. Do not hold the guard across an `.await`.
    fn state(&self) -> watch::Ref<'_, StoreState<Self::Item>>;

    /// Receive a notification after every mutation.
    fn subscribe(&self) -> watch::Receiver<StoreState<Self::Item>>;

    /// Fetch one page and merge it into the accumulated cache.
    ///
    /// `None` arguments keep the current filter, request the page after the
    /// current one, and keep the current page size. A filter that differs
    /// from the current one resets the accumulation first.
    async fn get_list(
        &self,
        filter: Option<Filter>,
        page_index: Option<usize>,
        page_size: Option<usize>,
    ) -> StoreResult<()>;

    /// Load one record into the edit slot.
    async fn get_one(&self, id: &IdType) -> StoreResult<()>;

    /// Update the record `id`, or create one when `id` is `None`.
    async fn update_one(&self, data: Fields, id: Option<IdType>) -> StoreResult<Self::Item>;

    /// Delete one record.
    async fn delete_one(&self, id: &IdType) -> StoreResult<()>;

    /// Seed the cache without a network round-trip.
    async fn restore_list(&self, all_items: Vec<Self::Item>, filter: Filter) -> StoreResult<()>;

    /// Reset the list, the filter and the edit slot.
    fn clear(&self);

    /// Reset the list only.
    fn clear_list(&self);

    /// Empty the edit slot.
    fn clear_current(&self);

    /// Replace the edit slot.
    fn set_current(&self, fields: Fields);

    /// Resolve once no fetch is in flight.
    async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        if rx.wait_for(|state| state.downloading == 0).await.is_err() {
            tracing::debug!("store dropped while waiting for idle");
        }
    }
}
