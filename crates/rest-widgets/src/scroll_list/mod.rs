//! ScrollList - infinite list that pages a store in as its bottom edge
//! comes into view.
//!
//! # Example
//!
//! ```ignore
//! use rest_widgets::{ListModel, MemoryBackend, ScrollList, ScrollListView};
//!
//! let store = Arc::new(ListModel::new(MemoryBackend::new("id"), "id"));
//! let list = ScrollList::new(Arc::clone(&store));
//! list.mount();
//!
//! // every frame
//! let view = ScrollListView::new(&list, |topic: &Topic, _| Line::from(topic.name.clone()));
//! frame.render_stateful_widget(view, area, &mut state);
//! ```

mod state;
mod view;

pub use state::{ListAction, ScrollListState};
pub use view::ScrollListView;

use crate::boundary::{EdgePosition, ScrollBoundary, Scrollport};
use crate::config::ListConfig;
use crate::debounce::Debouncer;
use crate::error::StoreResult;
use crate::i18n::{keys, Translator};
use crate::store::{Filter, PagedStore};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Where a [`ScrollList`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    /// Not booted.
    Idle,
    /// First load in progress.
    Booting,
    /// Has data; more may exist.
    Loaded,
    /// The store reported the last page.
    Exhausted,
    /// A follow-up page is in flight.
    LoadingMore,
}

struct Core<S: PagedStore> {
    store: Arc<S>,
    filter: Mutex<Filter>,
    default_data: Vec<S::Item>,
    boundary: Mutex<ScrollBoundary>,
    debouncer: Debouncer,
    /// Serializes boots.
    gate: tokio::sync::Mutex<()>,
    booting: AtomicBool,
    /// Filter of the running or most recent boot.
    boot_filter: Mutex<Option<Filter>>,
    completed_boots: AtomicU64,
    mounted: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the booting flag when a boot ends, however it ends.
struct BootFlag<'a>(&'a AtomicBool);

impl Drop for BootFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Infinite list over a [`PagedStore`].
///
/// Cheap to clone; clones drive the same list.
pub struct ScrollList<S: PagedStore> {
    core: Arc<Core<S>>,
}

impl<S: PagedStore> Clone for ScrollList<S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<S: PagedStore> ScrollList<S> {
    /// Create a list with the default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self::builder(store).build()
    }

    /// Start building a list.
    pub fn builder(store: Arc<S>) -> ScrollListBuilder<S> {
        ScrollListBuilder {
            store,
            filter: Filter::default(),
            default_data: Vec::new(),
            config: ListConfig::default(),
        }
    }

    /// The store this list drives.
    pub fn store(&self) -> &Arc<S> {
        &self.core.store
    }

    /// Filter used by the next boot.
    pub fn filter(&self) -> Filter {
        lock(&self.core.filter).clone()
    }

    /// Replace the filter. Takes effect at the next [`boot`](Self::boot).
    pub fn set_filter(&self, filter: Filter) {
        *lock(&self.core.filter) = filter;
    }

    pub fn is_mounted(&self) -> bool {
        self.core.mounted.load(Ordering::SeqCst)
    }

    /// Start watching the bottom edge and boot in the background.
    pub fn mount(&self) -> JoinHandle<StoreResult<()>> {
        self.core.mounted.store(true, Ordering::SeqCst);
        lock(&self.core.boundary).mount();

        let list = self.clone();
        tokio::spawn(async move {
            let result = list.boot().await;
            if let Err(e) = &result {
                warn!(error = %e, "list boot failed");
            }
            result
        })
    }

    /// Stop watching, drop any pending load-more and clear the store.
    ///
    /// Requests already in flight still resolve; their pages are dropped
    /// because the clear starts a new store session.
    pub fn unmount(&self) {
        self.core.mounted.store(false, Ordering::SeqCst);
        self.core.debouncer.cancel();
        lock(&self.core.boundary).unmount();
        self.core.store.clear();
    }

    /// Reset the store and load the first page under the current filter.
    ///
    /// Waits for any outstanding fetch first. A boot issued while another
    /// boot with the same filter is running joins it instead of fetching
    /// again.
    pub async fn boot(&self) -> StoreResult<()> {
        let core = &self.core;
        let filter = self.filter();

        let seen = core.completed_boots.load(Ordering::SeqCst);
        let joining = core.booting.load(Ordering::SeqCst)
            && lock(&core.boot_filter).as_ref() == Some(&filter);

        let _gate = core.gate.lock().await;
        if joining && core.completed_boots.load(Ordering::SeqCst) > seen {
            debug!("boot coalesced with the one in flight");
            return Ok(());
        }

        core.booting.store(true, Ordering::SeqCst);
        let _flag = BootFlag(&core.booting);
        *lock(&core.boot_filter) = Some(filter.clone());

        let store = &core.store;
        store.wait_idle().await;
        store.clear();
        if !core.default_data.is_empty() {
            store
                .restore_list(core.default_data.clone(), filter.clone())
                .await?;
        }

        // a partial last page of default data is fetched again in full
        let next_page = {
            let state = store.state();
            state.all_items.len() / state.page_size + 1
        };
        debug!(next_page, "booting list");
        let result = store.get_list(Some(filter), Some(next_page), None).await;

        core.completed_boots.fetch_add(1, Ordering::SeqCst);
        result
    }

    /// Ask for the next page because `edge` came into view.
    ///
    /// Only the bottom edge loads. Calls within the debounce window collapse
    /// into one; when it fires, nothing happens if a fetch is in flight, a
    /// boot is running or the store has no more pages.
    pub fn load_more(&self, edge: EdgePosition) {
        if edge != EdgePosition::Bottom {
            return;
        }

        let core = Arc::clone(&self.core);
        self.core.debouncer.call(async move {
            let (downloading, no_more) = {
                let state = core.store.state();
                (state.downloading, state.no_more)
            };
            if downloading > 0 || no_more || core.booting.load(Ordering::SeqCst) {
                debug!(downloading, no_more, "load more skipped");
                return;
            }
            if let Err(e) = core.store.get_list(None, None, None).await {
                warn!(error = %e, "load more failed");
            }
        });
    }

    /// Feed the latest scroll geometry; loads more when the bottom edge
    /// is touched.
    pub fn on_scroll(&self, port: &Scrollport) {
        let touched = lock(&self.core.boundary).observe(port);
        for edge in touched {
            self.load_more(edge);
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ListPhase {
        if self.core.booting.load(Ordering::SeqCst) {
            return ListPhase::Booting;
        }
        let state = self.core.store.state();
        if state.downloading > 0 {
            ListPhase::LoadingMore
        } else if state.no_more {
            ListPhase::Exhausted
        } else if state.page_index > 0 {
            ListPhase::Loaded
        } else {
            ListPhase::Idle
        }
    }

    /// Trailing status line.
    pub fn footer(&self, t: &dyn Translator) -> String {
        let state = self.core.store.state();
        if state.downloading > 0 {
            t.t(keys::LOADING, &[])
        } else if state.no_more || state.all_items.is_empty() {
            t.t(keys::NO_MORE, &[])
        } else {
            t.t(keys::LOAD_MORE, &[])
        }
    }
}

/// Builder for [`ScrollList`].
pub struct ScrollListBuilder<S: PagedStore> {
    store: Arc<S>,
    filter: Filter,
    default_data: Vec<S::Item>,
    config: ListConfig,
}

impl<S: PagedStore> ScrollListBuilder<S> {
    /// Initial filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Items shown before the first page arrives. Each boot restores them
    /// and continues paging after them.
    pub fn default_data(mut self, items: Vec<S::Item>) -> Self {
        self.default_data = items;
        self
    }

    /// Debounce window and edge margin.
    pub fn config(mut self, config: ListConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> ScrollList<S> {
        let boundary = ScrollBoundary::new()
            .edges([EdgePosition::Bottom])
            .margin(self.config.edge_margin);

        ScrollList {
            core: Arc::new(Core {
                store: self.store,
                filter: Mutex::new(self.filter),
                default_data: self.default_data,
                boundary: Mutex::new(boundary),
                debouncer: Debouncer::new(self.config.load_more_window()),
                gate: tokio::sync::Mutex::new(()),
                booting: AtomicBool::new(false),
                boot_filter: Mutex::new(None),
                completed_boots: AtomicU64::new(0),
                mounted: AtomicBool::new(false),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Catalog;
    use crate::store::{ListModel, MemoryBackend};
    use ratatui::layout::{Position, Size};
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: u32,
        label: String,
    }

    fn items(range: std::ops::RangeInclusive<u32>) -> Vec<Item> {
        range
            .map(|id| Item {
                id,
                label: format!("item {id}"),
            })
            .collect()
    }

    fn list(n: u32) -> ScrollList<ListModel<MemoryBackend<Item>>> {
        let backend = MemoryBackend::with_records("id", items(1..=n))
            .unwrap()
            .latency(Duration::from_millis(50));
        let store = Arc::new(ListModel::new(backend, "id").page_size(5));
        ScrollList::new(store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_boot_loads_first_page() {
        let list = list(12);
        assert_eq!(list.phase(), ListPhase::Idle);

        list.boot().await.unwrap();

        let state = list.store().state();
        assert_eq!(state.all_items.len(), 5);
        assert_eq!(state.page_index, 1);
        drop(state);
        assert_eq!(list.phase(), ListPhase::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_more_only_on_bottom() {
        let list = list(12);
        list.boot().await.unwrap();

        list.load_more(EdgePosition::Top);
        list.load_more(EdgePosition::Right);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(list.store().backend().load_count(), 1);

        list.load_more(EdgePosition::Bottom);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(list.store().backend().load_count(), 2);
        assert_eq!(list.store().state().all_items.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_data_is_continued() {
        let backend = MemoryBackend::with_records("id", items(1..=12)).unwrap();
        let store = Arc::new(ListModel::new(backend, "id").page_size(5));
        let list = ScrollList::builder(Arc::clone(&store))
            .default_data(items(1..=5))
            .build();

        list.boot().await.unwrap();

        let state = store.state();
        assert_eq!(state.page_index, 2);
        assert_eq!(state.all_items.len(), 10);
        drop(state);
        assert_eq!(
            store.backend().calls()[0],
            crate::store::BackendCall::Load {
                page_index: 2,
                page_size: 5,
                filter: Filter::new()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_default_page_is_refetched() {
        let backend = MemoryBackend::with_records("id", items(1..=12)).unwrap();
        let store = Arc::new(ListModel::new(backend, "id").page_size(5));
        let list = ScrollList::builder(Arc::clone(&store))
            .default_data(items(1..=7))
            .build();

        list.boot().await.unwrap();

        assert_eq!(
            store.backend().calls(),
            vec![crate::store::BackendCall::Load {
                page_index: 2,
                page_size: 5,
                filter: Filter::new()
            }]
        );
        let state = store.state();
        assert_eq!(state.page_index, 2);
        let ids: Vec<u32> = state.all_items.iter().map(|item| item.id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_boot_waits_for_outstanding_fetch() {
        let list = list(12);
        let store = Arc::clone(list.store());

        let stray = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.get_list(None, Some(2), None).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        list.boot().await.unwrap();
        stray.await.unwrap().unwrap();

        // the stray page landed before the reset, never after
        let state = store.state();
        assert_eq!(state.page_index, 1);
        assert_eq!(state.all_items, items(1..=5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_footer_text() {
        let t = Catalog::en_us();
        let list = list(7);
        assert_eq!(list.footer(&t), "No more");

        list.boot().await.unwrap();
        assert_eq!(list.footer(&t), "Load more");

        list.store().get_list(None, None, None).await.unwrap();
        assert_eq!(list.footer(&t), "No more");
        assert_eq!(list.phase(), ListPhase::Exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_to_bottom_loads_more() {
        let list = list(12);
        list.mount().await.unwrap().unwrap();

        // 5 items plus footer in a 10 row viewport: bottom in view
        list.on_scroll(&Scrollport::new(
            Size::new(20, 6),
            Size::new(20, 10),
            Position::ORIGIN,
        ));
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(list.store().state().all_items.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_clears_and_cancels() {
        let list = list(12);
        list.boot().await.unwrap();

        list.load_more(EdgePosition::Bottom);
        list.unmount();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(list.store().backend().load_count(), 1);
        assert!(list.store().state().all_items.is_empty());
        assert!(!list.is_mounted());
    }
}
