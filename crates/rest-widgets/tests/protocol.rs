//! End-to-end checks of the paging, selection, search and form protocols,
//! driven through the public API against an in-memory backend.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rest_widgets::store::BackendCall;
use rest_widgets::{
    ComboboxState, EdgePosition, Field, FormState, IdType, InputKind, ListModel, MemoryBackend,
    PagedStore, ResourceForm, ResourceTable, ScrollList, SearchableCombobox, SubmitOutcome,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Repo {
    id: u32,
    name: String,
    #[serde(default)]
    topics: Vec<String>,
}

type Store = ListModel<MemoryBackend<Repo>>;

fn repos(names: impl IntoIterator<Item = String>) -> Vec<Repo> {
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| Repo {
            id: i as u32 + 1,
            name,
            topics: Vec::new(),
        })
        .collect()
}

fn store_of(records: Vec<Repo>, latency: Duration) -> Arc<Store> {
    let backend = MemoryBackend::with_records("id", records)
        .unwrap()
        .latency(latency);
    Arc::new(ListModel::new(backend, "id"))
}

fn numbered(n: u32) -> Arc<Store> {
    store_of(
        repos((1..=n).map(|i| format!("repo-{i}"))),
        Duration::from_millis(100),
    )
}

fn ids(store: &Store) -> Vec<u32> {
    store.state().all_items.iter().map(|r| r.id).collect()
}

fn keys(range: std::ops::RangeInclusive<u32>) -> Vec<IdType> {
    range.map(|i| i.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn concurrent_boots_fetch_once() {
    let store = numbered(30);
    let list = ScrollList::new(Arc::clone(&store));

    let (first, second) = tokio::join!(list.boot(), list.boot());
    first.unwrap();
    second.unwrap();

    assert_eq!(store.backend().load_count(), 1);
    assert_eq!(ids(&store), (1..=10).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn sequential_loads_accumulate_in_order() {
    let store = numbered(50);
    let list = ScrollList::new(Arc::clone(&store));
    list.boot().await.unwrap();

    for _ in 0..3 {
        list.load_more(EdgePosition::Bottom);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    let state = store.state();
    assert_eq!(state.page_index, 4);
    assert_eq!(state.all_items.len(), 40);
    let concatenated: Vec<Repo> = state.page_list.iter().flatten().cloned().collect();
    assert_eq!(state.all_items, concatenated);
    assert_eq!(ids(&store), (1..=40).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn short_page_exhausts_the_list() {
    let store = numbered(15);
    let list = ScrollList::new(Arc::clone(&store));
    list.boot().await.unwrap();

    list.load_more(EdgePosition::Bottom);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(store.state().no_more);
    assert_eq!(store.state().all_items.len(), 15);

    list.load_more(EdgePosition::Bottom);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(store.backend().load_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn rapid_load_more_calls_fetch_once() {
    let store = numbered(50);
    let list = ScrollList::new(Arc::clone(&store));
    list.boot().await.unwrap();

    for _ in 0..5 {
        list.load_more(EdgePosition::Bottom);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(store.backend().load_count(), 2);
    assert_eq!(store.state().all_items.len(), 20);
}

#[tokio::test(start_paused = true)]
async fn select_all_covers_the_current_page_only() {
    let table = ResourceTable::new(numbered(50), vec![Field::new("id"), Field::new("name")])
        .on_check(|_| {});
    table.mount().await.unwrap();
    assert_eq!(table.store().state().total_count, 50);

    table.change_page(table.pager().next().unwrap());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(table.pager().page_index, 2);

    table.toggle_check_all();
    assert_eq!(table.checked_keys(), keys(11..=20));
}

#[tokio::test(start_paused = true)]
async fn bulk_delete_stops_at_the_first_failure() {
    let table = ResourceTable::new(numbered(5), vec![Field::new("name")]).deletable(true);
    table.mount().await.unwrap();
    table.store().backend().fail_on_delete("2");

    let result = table
        .delete_list(&keys(1..=3), &|_: &str| true)
        .await;

    assert!(result.is_err());
    assert_eq!(
        table.store().backend().calls()[1..],
        [BackendCall::Remove("1".into()), BackendCall::Remove("2".into())]
    );
    assert_eq!(ids(table.store()), [2, 3, 4, 5]);
}

#[tokio::test(start_paused = true)]
async fn search_shows_only_the_latest_query() {
    let names = ["alpha", "alpine", "beta", "xenon", "xylophone", "yak", "yarn", "yellow"];
    let store = store_of(
        repos(names.iter().map(|s| s.to_string())),
        Duration::from_millis(1500),
    );
    let picker = SearchableCombobox::new(Arc::clone(&store), "name", "id").multiple(true);
    let mut state = ComboboxState::new();
    let type_key = |picker: &SearchableCombobox<Store>, state: &mut ComboboxState, code| {
        picker.handle_key(KeyEvent::new(code, KeyModifiers::NONE), state);
    };

    type_key(&picker, &mut state, KeyCode::Char('x'));
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(picker.is_open());

    // "x" is still in flight when "y" fires
    type_key(&picker, &mut state, KeyCode::Backspace);
    type_key(&picker, &mut state, KeyCode::Char('y'));
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let names: Vec<String> = store.state().all_items.iter().map(|r| r.name.clone()).collect();
        assert!(
            names.iter().all(|n| n.contains('y')),
            "stale results visible: {names:?}"
        );
    }
    assert_eq!(store.state().all_items.len(), 4);
}

fn form_fields() -> Vec<Field<Repo>> {
    vec![
        Field::new("id").kind(InputKind::Number).read_only(true),
        Field::new("name").required(true),
        Field::new("topics").multiple(true),
    ]
}

#[tokio::test(start_paused = true)]
async fn form_creates_without_id_and_updates_with_one() {
    let store = numbered(50);

    let create = ResourceForm::new(Arc::clone(&store), form_fields());
    let mut state = FormState::new();
    create.sync(&mut state);
    state.set("name", "fresh");
    create.submit(&state.values).await.unwrap();

    let update = ResourceForm::new(Arc::clone(&store), form_fields()).id("42");
    update.mount().await.unwrap();
    let mut state = FormState::new();
    update.sync(&mut state);
    state.set("name", "renamed");
    update.submit(&state.values).await.unwrap();

    assert_eq!(
        store.backend().calls(),
        [
            BackendCall::Save(None),
            BackendCall::LoadOne("42".into()),
            BackendCall::Save(Some("42".into())),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn submitted_values_read_back_unchanged() {
    let store = numbered(3);
    let form = ResourceForm::new(Arc::clone(&store), form_fields());
    let mut state = FormState::new();
    form.sync(&mut state);
    state.set("name", "round-trip");
    state.set(
        "topics",
        rest_widgets::Value::List(vec!["tui".into(), "rest".into()]),
    );

    let SubmitOutcome::Saved(saved) = form.submit(&state.values).await.unwrap() else {
        panic!("valid values should save");
    };
    store.get_one(&saved.id.to_string()).await.unwrap();

    let loaded = form.values_from(&store.state().current_one);
    for key in ["name", "topics"] {
        assert_eq!(loaded.get(key), state.values.get(key), "field {key}");
    }
}

#[tokio::test(start_paused = true)]
async fn unchanged_record_saves_through_untyped_fields() {
    let store = numbered(3);
    let form = ResourceForm::new(
        Arc::clone(&store),
        vec![Field::new("id"), Field::new("name"), Field::new("topics")],
    )
    .id("2");
    form.mount().await.unwrap();
    let mut state = FormState::new();
    form.sync(&mut state);

    let SubmitOutcome::Saved(saved) = form.submit(&state.values).await.unwrap() else {
        panic!("unchanged values should save");
    };
    assert_eq!(
        saved,
        Repo {
            id: 2,
            name: "repo-2".into(),
            topics: Vec::new(),
        }
    );
}
