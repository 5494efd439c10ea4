//! In-memory [`Backend`] for local collections and tests.

use super::{from_fields, id_of, to_fields, Fields, Filter, IdType, Page, Record};
use crate::error::{StoreError, StoreResult};
use crate::store::Backend;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A request received by a [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Load {
        page_index: usize,
        page_size: usize,
        filter: Filter,
    },
    LoadOne(IdType),
    Save(Option<IdType>),
    Remove(IdType),
}

#[derive(Debug, Default)]
struct Faults {
    next_load: Option<StoreError>,
    deletes: HashSet<IdType>,
}

/// Records held in memory, with optional latency and injected failures.
///
/// Every request is appended to a journal that tests can inspect.
pub struct MemoryBackend<D> {
    index_key: String,
    records: Mutex<Vec<Fields>>,
    latency: Duration,
    scripted: Mutex<VecDeque<Duration>>,
    faults: Mutex<Faults>,
    journal: Mutex<Vec<BackendCall>>,
    _marker: PhantomData<fn() -> D>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<D: Record> MemoryBackend<D> {
    /// Create an empty backend identified by `index_key`.
    pub fn new(index_key: impl Into<String>) -> Self {
        Self {
            index_key: index_key.into(),
            records: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            scripted: Mutex::new(VecDeque::new()),
            faults: Mutex::new(Faults::default()),
            journal: Mutex::new(Vec::new()),
            _marker: PhantomData,
        }
    }

    /// Create a backend holding `records`, in order.
    pub fn with_records(
        index_key: impl Into<String>,
        records: impl IntoIterator<Item = D>,
    ) -> StoreResult<Self> {
        let backend = Self::new(index_key);
        let fields = records
            .into_iter()
            .map(|r| to_fields(&r))
            .collect::<StoreResult<Vec<_>>>()?;
        *lock(&backend.records) = fields;
        Ok(backend)
    }

    /// Delay every request by `latency`.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Delay the next page loads by these durations, in order. Later loads
    /// fall back to the fixed latency.
    pub fn script_delays(self, delays: impl IntoIterator<Item = Duration>) -> Self {
        lock(&self.scripted).extend(delays);
        self
    }

    /// Fail the next page load with `error`.
    pub fn fail_next_load(&self, error: StoreError) {
        lock(&self.faults).next_load = Some(error);
    }

    /// Fail every delete of `id`.
    pub fn fail_on_delete(&self, id: impl Into<IdType>) {
        lock(&self.faults).deletes.insert(id.into());
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.journal).clone()
    }

    /// Number of page loads received so far.
    pub fn load_count(&self) -> usize {
        lock(&self.journal)
            .iter()
            .filter(|c| matches!(c, BackendCall::Load { .. }))
            .count()
    }

    /// Current records, in order.
    pub fn records(&self) -> StoreResult<Vec<D>> {
        lock(&self.records).iter().cloned().map(from_fields).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, call: BackendCall) {
        lock(&self.journal).push(call);
    }

    async fn wait(&self, scripted: bool) {
        let delay = if scripted {
            lock(&self.scripted).pop_front().unwrap_or(self.latency)
        } else {
            self.latency
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn id_of(&self, fields: &Fields) -> Option<IdType> {
        fields.get(&self.index_key).and_then(id_of)
    }

    /// Next identity: one past the largest numeric id, numeric when the
    /// existing ids are.
    fn next_id(&self, records: &[Fields]) -> Value {
        let ids: Vec<&Value> = records
            .iter()
            .filter_map(|r| r.get(&self.index_key))
            .collect();
        let numeric = ids.iter().all(|v| v.is_number());
        let next = ids
            .iter()
            .filter_map(|v| match v {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.parse::<u64>().ok(),
                _ => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        if numeric {
            Value::from(next)
        } else {
            Value::from(next.to_string())
        }
    }
}

#[async_trait]
impl<D: Record> Backend for MemoryBackend<D> {
    type Item = D;

    async fn load_page(
        &self,
        page_index: usize,
        page_size: usize,
        filter: &Filter,
    ) -> StoreResult<Page<D>> {
        self.record(BackendCall::Load {
            page_index,
            page_size,
            filter: filter.clone(),
        });
        self.wait(true).await;

        if let Some(error) = lock(&self.faults).next_load.take() {
            return Err(error);
        }

        let matched: Vec<Fields> = lock(&self.records)
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        let total = matched.len();
        let items = matched
            .into_iter()
            .skip(page_index.saturating_sub(1) * page_size)
            .take(page_size)
            .map(from_fields)
            .collect::<StoreResult<Vec<D>>>()?;

        Ok(Page::new(items, total))
    }

    async fn load_one(&self, id: &IdType) -> StoreResult<D> {
        self.record(BackendCall::LoadOne(id.clone()));
        self.wait(false).await;

        let found = lock(&self.records)
            .iter()
            .find(|r| self.id_of(r).as_ref() == Some(id))
            .cloned();
        match found {
            Some(fields) => from_fields(fields),
            None => Err(StoreError::NotFound(id.clone())),
        }
    }

    async fn save_one(&self, data: Fields, id: Option<&IdType>) -> StoreResult<D> {
        self.record(BackendCall::Save(id.cloned()));
        self.wait(false).await;

        let mut records = lock(&self.records);
        match id {
            Some(id) => {
                let Some(existing) = records.iter_mut().find(|r| self.id_of(r).as_ref() == Some(id))
                else {
                    return Err(StoreError::NotFound(id.clone()));
                };
                let mut merged = existing.clone();
                for (key, value) in data {
                    if key != self.index_key {
                        merged.insert(key, value);
                    }
                }
                let saved: D = from_fields(merged.clone())?;
                *existing = merged;
                Ok(saved)
            }
            None => {
                let mut created = data;
                if self.id_of(&created).is_none() {
                    let next = self.next_id(&records);
                    created.insert(self.index_key.clone(), next);
                }
                let saved: D = from_fields(created.clone())?;
                records.insert(0, created);
                Ok(saved)
            }
        }
    }

    async fn remove_one(&self, id: &IdType) -> StoreResult<()> {
        self.record(BackendCall::Remove(id.clone()));
        self.wait(false).await;

        if lock(&self.faults).deletes.contains(id) {
            return Err(StoreError::Request(format!("delete of {id} rejected")));
        }

        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|r| self.id_of(r).as_ref() != Some(id));
        if records.len() == before {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Bookmark {
        id: String,
        title: String,
    }

    fn bookmark(id: &str, title: &str) -> Bookmark {
        Bookmark {
            id: id.into(),
            title: title.into(),
        }
    }

    fn backend() -> MemoryBackend<Bookmark> {
        MemoryBackend::with_records(
            "id",
            vec![
                bookmark("a", "Rust"),
                bookmark("b", "Ratatui"),
                bookmark("c", "Tokio"),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_paging_and_filter() {
        let backend = backend();

        let page = backend.load_page(2, 2, &Filter::new()).await.unwrap();
        assert_eq!(page.items, vec![bookmark("c", "Tokio")]);
        assert_eq!(page.total_count, Some(3));

        let page = backend
            .load_page(1, 10, &Filter::new().with("title", "RA"))
            .await
            .unwrap();
        assert_eq!(page.items, vec![bookmark("b", "Ratatui")]);
    }

    #[tokio::test]
    async fn test_save_assigns_string_ids() {
        let backend = backend();
        let mut data = Fields::new();
        data.insert("title".into(), json!("Serde"));

        let saved = backend.save_one(data, None).await.unwrap();
        // existing ids are non-numeric strings
        assert_eq!(saved.id, "1");
        assert_eq!(backend.len(), 4);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let backend = backend();
        let mut data = Fields::new();
        data.insert("title".into(), json!("Rust 2024"));
        data.insert("id".into(), json!("zzz"));

        let saved = backend.save_one(data, Some(&"a".into())).await.unwrap();
        assert_eq!(saved, bookmark("a", "Rust 2024"));
    }

    #[tokio::test]
    async fn test_missing_records() {
        let backend = backend();
        assert_eq!(
            backend.load_one(&"zzz".into()).await.unwrap_err(),
            StoreError::NotFound("zzz".into())
        );
        assert!(backend.remove_one(&"zzz".into()).await.is_err());
    }

    #[tokio::test]
    async fn test_faults_and_journal() {
        let backend = backend();
        backend.fail_on_delete("b");

        assert!(backend.remove_one(&"b".into()).await.is_err());
        backend.remove_one(&"a".into()).await.unwrap();
        assert_eq!(backend.len(), 2);
        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::Remove("b".into()),
                BackendCall::Remove("a".into())
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_delays() {
        let backend = backend()
            .script_delays([Duration::from_secs(3)])
            .latency(Duration::from_millis(100));

        let start = tokio::time::Instant::now();
        backend.load_page(1, 10, &Filter::new()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(3));

        let start = tokio::time::Instant::now();
        backend.load_page(1, 10, &Filter::new()).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
