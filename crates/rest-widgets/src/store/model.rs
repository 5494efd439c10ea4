//! [`ListModel`]: the [`PagedStore`] adapter over a page-fetching [`Backend`].

use super::{
    field_of, id_of, to_fields, Fields, Filter, IdType, PagedStore, Record, StoreState,
};
use crate::config::ListConfig;
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

/// One page as returned by a backend.
#[derive(Debug, Clone)]
pub struct Page<D> {
    pub items: Vec<D>,
    /// Total number of matching records, when the backend knows it.
    pub total_count: Option<usize>,
}

impl<D> Page<D> {
    /// A page with a known total.
    pub fn new(items: Vec<D>, total_count: usize) -> Self {
        Self {
            items,
            total_count: Some(total_count),
        }
    }

    /// A page from a backend that cannot count.
    pub fn open_ended(items: Vec<D>) -> Self {
        Self {
            items,
            total_count: None,
        }
    }
}

/// Network half of a store: one call per request, no caching.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    type Item: Record;

    /// Fetch page `page_index` (one-based) of records matching `filter`.
    async fn load_page(
        &self,
        page_index: usize,
        page_size: usize,
        filter: &Filter,
    ) -> StoreResult<Page<Self::Item>>;

    async fn load_one(&self, _id: &IdType) -> StoreResult<Self::Item> {
        Err(StoreError::Unsupported("load_one"))
    }

    /// Update `id` with `data`, or create a record when `id` is `None`.
    async fn save_one(&self, _data: Fields, _id: Option<&IdType>) -> StoreResult<Self::Item> {
        Err(StoreError::Unsupported("save_one"))
    }

    async fn remove_one(&self, _id: &IdType) -> StoreResult<()> {
        Err(StoreError::Unsupported("remove_one"))
    }
}

#[derive(Debug, Clone, Copy)]
enum Counter {
    Downloading,
    Uploading,
}

impl Counter {
    fn of<D>(self, state: &mut StoreState<D>) -> &mut usize {
        match self {
            Self::Downloading => &mut state.downloading,
            Self::Uploading => &mut state.uploading,
        }
    }
}

/// Holds one unit of a loading counter; released on drop, whatever the
/// outcome of the request it covers.
struct Busy<'a, D: Record> {
    state: &'a watch::Sender<StoreState<D>>,
    counter: Counter,
}

impl<'a, D: Record> Busy<'a, D> {
    /// Increment `counter` and run `prepare` in the same state update.
    fn enter<R: Default>(
        state: &'a watch::Sender<StoreState<D>>,
        counter: Counter,
        prepare: impl FnOnce(&mut StoreState<D>) -> R,
    ) -> (Self, R) {
        let mut prepared = R::default();
        state.send_modify(|s| {
            *counter.of(s) += 1;
            prepared = prepare(s);
        });
        (Self { state, counter }, prepared)
    }
}

impl<D: Record> Drop for Busy<'_, D> {
    fn drop(&mut self) {
        let counter = self.counter;
        self.state.send_modify(|s| {
            let value = counter.of(s);
            *value = value.saturating_sub(1);
        });
    }
}

/// A [`PagedStore`] that keeps its state in a watch channel and delegates
/// requests to a [`Backend`].
pub struct ListModel<B: Backend> {
    backend: B,
    state: watch::Sender<StoreState<B::Item>>,
}

impl<B: Backend> ListModel<B> {
    /// Create a store identified by `index_key` with the default page size.
    pub fn new(backend: B, index_key: impl Into<String>) -> Self {
        Self::with_config(backend, index_key, &ListConfig::default())
    }

    /// Create a store using the page size from `config`.
    pub fn with_config(backend: B, index_key: impl Into<String>, config: &ListConfig) -> Self {
        let (state, _) = watch::channel(StoreState::new(index_key, config.page_size));
        Self { backend, state }
    }

    /// Set the page size used when a fetch does not name one.
    pub fn page_size(self, page_size: usize) -> Self {
        self.state.send_modify(|s| s.page_size = page_size.max(1));
        self
    }

    /// The backend this store delegates to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn fail(&self, operation: &'static str, error: StoreError) -> StoreError {
        debug!(operation, %error, "store request failed");
        self.state
            .send_modify(|s| s.last_error = Some(error.clone()));
        error
    }
}

/// Merge one fetched page into the accumulated state.
fn apply_page<D: Record>(s: &mut StoreState<D>, index: usize, size: usize, page: Page<D>) {
    let got = page.items.len();
    if s.page_list.len() < index {
        s.page_list.resize_with(index, Vec::new);
    }
    s.page_list[index - 1] = page.items.clone();
    s.current_page = page.items;
    s.page_index = index;

    match page.total_count {
        Some(total) => {
            s.total_count = total;
            s.update_page_count();
            s.no_more = got < size || index >= s.page_count;
        }
        None => {
            s.no_more = got < size;
            s.total_count = s.total_count.max((index - 1) * size + got);
            let known = if s.no_more { index } else { index + 1 };
            s.page_count = s.page_count.max(known);
        }
    }
    s.rebuild_all_items();
}

/// Replace a saved record wherever it appears, or prepend a created one.
fn patch_saved<D: Record>(s: &mut StoreState<D>, saved: D, created: bool) {
    let key = s.key_of(&saved);
    let mut found = false;

    if let Some(key) = &key {
        let index_key = s.index_key.clone();
        for record in s.page_list.iter_mut().flatten().chain(s.current_page.iter_mut()) {
            if id_of(&field_of(record, &index_key)).as_ref() == Some(key) {
                *record = saved.clone();
                found = true;
            }
        }
    }

    if !found && created {
        if s.page_list.is_empty() {
            s.page_list.push(Vec::new());
        }
        s.page_list[0].insert(0, saved.clone());
        if s.page_index <= 1 {
            s.current_page.insert(0, saved);
        }
        s.total_count += 1;
        s.update_page_count();
    }
    s.rebuild_all_items();
}

fn remove_deleted<D: Record>(s: &mut StoreState<D>, id: &IdType) {
    let index_key = s.index_key.clone();
    let keep = |record: &D| id_of(&field_of(record, &index_key)).as_ref() != Some(id);

    for page in &mut s.page_list {
        page.retain(keep);
    }
    s.current_page.retain(keep);
    s.rebuild_all_items();
    s.total_count = s.total_count.saturating_sub(1);
    s.update_page_count();

    if s.current_id().as_ref() == Some(id) {
        s.current_one.clear();
        s.edit_session += 1;
    }
}

#[async_trait]
impl<B: Backend> PagedStore for ListModel<B> {
    type Item = B::Item;

    fn state(&self) -> watch::Ref<'_, StoreState<B::Item>> {
        self.state.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<StoreState<B::Item>> {
        self.state.subscribe()
    }

    async fn get_list(
        &self,
        filter: Option<Filter>,
        page_index: Option<usize>,
        page_size: Option<usize>,
    ) -> StoreResult<()> {
        let (_busy, (session, filter, index, size)) =
            Busy::enter(&self.state, Counter::Downloading, |s| {
                if let Some(filter) = filter {
                    if filter != s.filter {
                        s.filter = filter;
                        s.reset_list();
                    }
                }
                if let Some(size) = page_size.filter(|&n| n > 0) {
                    if size != s.page_size {
                        s.page_size = size;
                        s.reset_list();
                    }
                }
                let index = page_index.unwrap_or(s.page_index + 1).max(1);
                (s.session, s.filter.clone(), index, s.page_size)
            });

        debug!(page_index = index, page_size = size, session, "fetching page");
        let page = match self.backend.load_page(index, size, &filter).await {
            Ok(page) => page,
            Err(e) => return Err(self.fail("get_list", e)),
        };

        let applied = self.state.send_if_modified(|s| {
            if s.session != session {
                return false;
            }
            apply_page(s, index, size, page);
            s.last_error = None;
            true
        });
        if !applied {
            debug!(page_index = index, session, "stale page dropped");
        }
        Ok(())
    }

    async fn get_one(&self, id: &IdType) -> StoreResult<()> {
        let (_busy, edit_session) =
            Busy::enter(&self.state, Counter::Downloading, |s| s.edit_session);

        let record = match self.backend.load_one(id).await {
            Ok(record) => record,
            Err(e) => return Err(self.fail("get_one", e)),
        };
        let fields = to_fields(&record)?;

        let applied = self.state.send_if_modified(|s| {
            if s.edit_session != edit_session {
                return false;
            }
            s.current_one = fields;
            s.edit_session += 1;
            true
        });
        if !applied {
            debug!(id = %id, "edit slot changed while loading, record dropped");
        }
        Ok(())
    }

    async fn update_one(&self, mut data: Fields, id: Option<IdType>) -> StoreResult<B::Item> {
        let (_busy, index_key) =
            Busy::enter(&self.state, Counter::Uploading, |s| s.index_key.clone());

        if id.is_none() && data.get(&index_key).and_then(id_of).is_none() {
            data.remove(&index_key);
        }

        let saved = match self.backend.save_one(data, id.as_ref()).await {
            Ok(saved) => saved,
            Err(e) => return Err(self.fail("update_one", e)),
        };
        debug!(id = ?id, created = id.is_none(), "record saved");

        let patched = saved.clone();
        self.state
            .send_modify(|s| patch_saved(s, patched, id.is_none()));
        Ok(saved)
    }

    async fn delete_one(&self, id: &IdType) -> StoreResult<()> {
        let (_busy, ()) = Busy::enter(&self.state, Counter::Uploading, |_| ());

        if let Err(e) = self.backend.remove_one(id).await {
            return Err(self.fail("delete_one", e));
        }
        debug!(id = %id, "record deleted");

        self.state.send_modify(|s| remove_deleted(s, id));
        Ok(())
    }

    async fn restore_list(&self, all_items: Vec<B::Item>, filter: Filter) -> StoreResult<()> {
        let count = all_items.len();
        let restored = self.state.send_if_modified(|s| {
            if s.downloading > 0 {
                return false;
            }
            s.filter = filter;
            s.reset_list();
            s.page_list = all_items
                .chunks(s.page_size)
                .map(|chunk| chunk.to_vec())
                .collect();
            s.page_index = s.page_list.len();
            s.current_page = s.page_list.last().cloned().unwrap_or_default();
            s.total_count = count;
            s.update_page_count();
            s.rebuild_all_items();
            true
        });
        if !restored {
            debug!(count, "restore skipped, a fetch is in flight");
        }
        Ok(())
    }

    fn clear(&self) {
        self.state.send_modify(|s| {
            s.reset_list();
            s.filter = Filter::default();
            s.current_one.clear();
            s.edit_session += 1;
            s.last_error = None;
        });
    }

    fn clear_list(&self) {
        self.state.send_modify(|s| s.reset_list());
    }

    fn clear_current(&self) {
        self.state.send_modify(|s| {
            s.current_one.clear();
            s.edit_session += 1;
        });
    }

    fn set_current(&self, fields: Fields) {
        self.state.send_modify(|s| {
            s.current_one = fields;
            s.edit_session += 1;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Topic {
        id: u32,
        name: String,
    }

    fn topics(n: u32) -> Vec<Topic> {
        (1..=n)
            .map(|id| Topic {
                id,
                name: format!("topic-{id}"),
            })
            .collect()
    }

    fn model(n: u32, page_size: usize) -> ListModel<MemoryBackend<Topic>> {
        let backend = MemoryBackend::with_records("id", topics(n)).unwrap();
        ListModel::new(backend, "id").page_size(page_size)
    }

    fn ids(items: &[Topic]) -> Vec<u32> {
        items.iter().map(|t| t.id).collect()
    }

    #[tokio::test]
    async fn test_sequential_pages_accumulate() {
        let store = model(25, 10);

        store.get_list(None, None, None).await.unwrap();
        store.get_list(None, None, None).await.unwrap();

        let state = store.state();
        assert_eq!(state.page_index, 2);
        assert_eq!(state.total_count, 25);
        assert_eq!(state.page_count, 3);
        assert_eq!(ids(&state.all_items), (1..=20).collect::<Vec<_>>());
        assert_eq!(ids(&state.current_page), (11..=20).collect::<Vec<_>>());
        assert!(!state.no_more);
    }

    #[tokio::test]
    async fn test_short_page_sets_no_more() {
        let store = model(25, 10);
        store.get_list(None, Some(3), None).await.unwrap();

        let state = store.state();
        assert_eq!(state.current_page.len(), 5);
        assert!(state.no_more);
    }

    #[tokio::test]
    async fn test_last_full_page_sets_no_more() {
        let store = model(20, 10);
        store.get_list(None, Some(2), None).await.unwrap();
        assert!(store.state().no_more);
    }

    #[tokio::test]
    async fn test_new_filter_resets_accumulation() {
        let store = model(25, 10);
        store.get_list(None, None, None).await.unwrap();
        let session = store.state().session;

        store
            .get_list(Some(Filter::new().with("name", "topic-2")), None, None)
            .await
            .unwrap();

        let state = store.state();
        assert!(state.session > session);
        assert_eq!(state.page_index, 1);
        // topic-2, topic-20..25
        assert_eq!(state.total_count, 7);
        assert!(state.all_items.iter().all(|t| t.name.contains("topic-2")));
    }

    #[tokio::test]
    async fn test_equal_filter_keeps_accumulation() {
        let store = model(25, 10);
        let filter = Filter::new().with("name", "topic");
        store.get_list(Some(filter.clone()), None, None).await.unwrap();
        store.get_list(Some(filter), None, None).await.unwrap();

        assert_eq!(store.state().all_items.len(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counter_released_on_failure() {
        let store = model(5, 10);
        store
            .backend()
            .fail_next_load(StoreError::Request("offline".into()));

        let err = store.get_list(None, None, None).await.unwrap_err();
        assert_eq!(err, StoreError::Request("offline".into()));

        let state = store.state();
        assert_eq!(state.downloading, 0);
        assert_eq!(state.last_error, Some(err));
    }

    #[tokio::test(start_paused = true)]
    async fn test_downloading_visible_while_in_flight() {
        let backend = MemoryBackend::with_records("id", topics(5))
            .unwrap()
            .latency(Duration::from_millis(100));
        let store = Arc::new(ListModel::new(backend, "id"));

        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.get_list(None, None, None).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.state().downloading, 1);

        task.await.unwrap().unwrap();
        assert_eq!(store.state().downloading, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_page_dropped_after_clear() {
        let backend = MemoryBackend::with_records("id", topics(5))
            .unwrap()
            .latency(Duration::from_millis(100));
        let store = Arc::new(ListModel::new(backend, "id"));

        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.get_list(None, None, None).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.clear_list();

        task.await.unwrap().unwrap();
        let state = store.state();
        assert!(state.all_items.is_empty());
        assert_eq!(state.page_index, 0);
    }

    #[tokio::test]
    async fn test_restore_list_chunks_into_pages() {
        let store = model(0, 2);
        store
            .restore_list(topics(5), Filter::new().with("name", "topic"))
            .await
            .unwrap();

        let state = store.state();
        assert_eq!(state.page_list.len(), 3);
        assert_eq!(state.page_index, 3);
        assert_eq!(state.all_items.len(), 5);
        assert_eq!(state.filter, Filter::new().with("name", "topic"));
    }

    #[tokio::test]
    async fn test_get_one_fills_edit_slot() {
        let store = model(3, 10);
        store.get_one(&"2".to_string()).await.unwrap();

        let state = store.state();
        assert_eq!(state.current_id(), Some("2".into()));
        assert_eq!(state.current_one.get("name"), Some(&json!("topic-2")));
    }

    #[tokio::test]
    async fn test_create_prepends_and_counts() {
        let store = model(3, 10);
        store.get_list(None, None, None).await.unwrap();

        let mut data = Fields::new();
        data.insert("id".into(), json!(""));
        data.insert("name".into(), json!("fresh"));
        let saved = store.update_one(data, None).await.unwrap();

        assert_eq!(saved.id, 4);
        let state = store.state();
        assert_eq!(state.total_count, 4);
        assert_eq!(state.all_items[0].name, "fresh");
        assert_eq!(state.uploading, 0);
    }

    #[tokio::test]
    async fn test_update_replaces_in_place() {
        let store = model(3, 10);
        store.get_list(None, None, None).await.unwrap();

        let mut data = Fields::new();
        data.insert("name".into(), json!("renamed"));
        store.update_one(data, Some("2".into())).await.unwrap();

        let state = store.state();
        assert_eq!(state.total_count, 3);
        assert_eq!(state.all_items[1].name, "renamed");
    }

    #[tokio::test]
    async fn test_delete_removes_and_clears_edit_slot() {
        let store = model(3, 10);
        store.get_list(None, None, None).await.unwrap();
        store.get_one(&"2".to_string()).await.unwrap();

        store.delete_one(&"2".to_string()).await.unwrap();

        let state = store.state();
        assert_eq!(ids(&state.all_items), vec![1, 3]);
        assert_eq!(state.total_count, 2);
        assert!(!state.is_editing());
    }

    #[test]
    fn test_open_ended_backend_tracks_count() {
        let mut s = StoreState::<Topic>::new("id", 10);
        apply_page(&mut s, 1, 10, Page::open_ended(topics(10)));
        assert_eq!(s.page_count, 2);
        assert!(!s.no_more);

        apply_page(&mut s, 2, 10, Page::open_ended(topics(3)));
        assert_eq!(s.page_count, 2);
        assert_eq!(s.total_count, 13);
        assert!(s.no_more);
    }

    #[tokio::test]
    async fn test_clear_resets_filter_and_edit_slot() {
        let store = model(3, 10);
        store
            .get_list(Some(Filter::new().with("name", "1")), None, None)
            .await
            .unwrap();
        store.set_current(to_fields(&topics(1)[0]).unwrap());

        store.clear();

        let state = store.state();
        assert!(state.filter.is_empty());
        assert!(state.all_items.is_empty());
        assert!(!state.is_editing());
    }
}
