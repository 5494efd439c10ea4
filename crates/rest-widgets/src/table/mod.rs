//! ResourceTable - one page of a [`PagedStore`] as a table, with checked
//! rows, bulk delete and an editor form in a modal.
//!
//! # Example
//!
//! ```ignore
//! use rest_widgets::{Column, InputKind, ResourceTable, TableState};
//!
//! let table = ResourceTable::new(Arc::clone(&store), vec![
//!     Column::new("id").width(ColumnWidth::Fixed(6)),
//!     Column::new("name").label("Name"),
//!     Column::new("homepage").kind(InputKind::Url),
//! ])
//! .editable(true)
//! .deletable(true)
//! .on_check(|keys| tracing::info!(?keys, "checked"));
//! table.mount().await?;
//!
//! // every frame
//! frame.render_stateful_widget(&table, area, &mut state);
//! ```

mod cell;
mod column;
mod selection;
mod state;

pub use cell::{CellContent, PARAGRAPH_LIMIT};
pub use column::{calculate_column_widths, table_columns, truncate_with_ellipsis, TableColumn};
pub use selection::{CheckedKeys, HeadCheck};
pub use state::TableState;

use crate::config::ListConfig;
use crate::debounce::Debouncer;
use crate::error::StoreResult;
use crate::form::{Field, FormAction, ResourceForm};
use crate::i18n::{keys, Catalog, Translator};
use crate::pager::{PageRequest, Pager, PagerView};
use crate::store::{field_of, id_of, to_fields, Fields, Filter, IdType, PagedStore};
use crate::uploader::FileModel;

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, StatefulWidget, Widget};
use serde_json::Value as Json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Called with every checked key after the set changes.
pub type CheckHandler = Arc<dyn Fn(&[IdType]) + Send + Sync>;

/// Asks the user before a bulk delete.
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

#[async_trait]
impl<F> Confirmation for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    async fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// What a key press asks of the table's owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableAction {
    /// Cursor moved
    Moved,
    /// A page change was scheduled
    PageChange(PageRequest),
    /// The checked set changed
    Checked,
    /// The editor opened on a row
    Edit,
    /// The editor opened on a new record
    Create,
    /// Run [`ResourceTable::delete_list`] on these keys
    Delete(Vec<IdType>),
    /// A key handled by the open editor
    Form(FormAction),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Table over the current page of a store.
pub struct ResourceTable<S: PagedStore> {
    store: Arc<S>,
    fields: Vec<Field<S::Item>>,
    filter: Arc<Mutex<Filter>>,
    checked: Mutex<CheckedKeys>,
    on_check: Option<CheckHandler>,
    editable: bool,
    deletable: bool,
    uploader: Option<Arc<FileModel>>,
    translator: Arc<dyn Translator>,
    debouncer: Debouncer,
    editor: Mutex<Option<Arc<ResourceForm<S>>>>,
    block: Option<Block<'static>>,
}

impl<S: PagedStore> ResourceTable<S> {
    /// Create a table over `columns`.
    pub fn new(store: Arc<S>, columns: Vec<Field<S::Item>>) -> Self {
        Self {
            store,
            fields: columns,
            filter: Arc::new(Mutex::new(Filter::default())),
            checked: Mutex::new(CheckedKeys::new()),
            on_check: None,
            editable: false,
            deletable: false,
            uploader: None,
            translator: Arc::new(Catalog::en_us()),
            debouncer: Debouncer::new(ListConfig::default().page_window()),
            editor: Mutex::new(None),
            block: None,
        }
    }

    /// Filter every fetch uses.
    pub fn filter(self, filter: Filter) -> Self {
        *lock(&self.filter) = filter;
        self
    }

    /// Show check boxes and report the checked set to `f`.
    pub fn on_check(mut self, f: impl Fn(&[IdType]) + Send + Sync + 'static) -> Self {
        self.on_check = Some(Arc::new(f));
        self
    }

    /// Offer create and edit.
    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    /// Offer delete.
    pub fn deletable(mut self, deletable: bool) -> Self {
        self.deletable = deletable;
        self
    }

    /// Upload file fields in the editor through `uploader`.
    pub fn uploader(mut self, uploader: Arc<FileModel>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    /// Page-change coalescing window.
    pub fn config(mut self, config: &ListConfig) -> Self {
        self.debouncer = Debouncer::new(config.page_window());
        self
    }

    pub fn block(mut self, block: Block<'static>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn columns(&self) -> &[Field<S::Item>] {
        &self.fields
    }

    /// Replace the filter. Takes effect at the next fetch.
    pub fn set_filter(&self, filter: Filter) {
        *lock(&self.filter) = filter;
    }

    /// Clear the store and fetch the first page.
    pub async fn mount(&self) -> StoreResult<()> {
        let filter = lock(&self.filter).clone();
        self.store.clear();
        self.store.get_list(Some(filter), Some(1), None).await
    }

    /// Show another page.
    ///
    /// Requests within the coalescing window collapse into the last one;
    /// when it fires, nothing happens if a fetch is already in flight.
    pub fn change_page(&self, request: PageRequest) {
        let store = Arc::clone(&self.store);
        let filter = Arc::clone(&self.filter);
        self.debouncer.call(async move {
            let downloading = store.state().downloading;
            if downloading > 0 {
                debug!(downloading, page_index = request.page_index, "page change skipped");
                return;
            }
            let filter = lock(&filter).clone();
            if let Err(e) = store
                .get_list(Some(filter), Some(request.page_index), Some(request.page_size))
                .await
            {
                warn!(error = %e, page_index = request.page_index, "page change failed");
            }
        });
    }

    /// Pager position of the store.
    pub fn pager(&self) -> Pager {
        let state = self.store.state();
        Pager {
            page_index: state.page_index.max(1),
            page_size: state.page_size,
            page_count: state.page_count,
            total_count: state.total_count,
        }
    }

    /// Keys of the current page, in order.
    pub fn page_keys(&self) -> Vec<IdType> {
        let state = self.store.state();
        state
            .current_page
            .iter()
            .filter_map(|row| state.key_of(row))
            .collect()
    }

    /// Checked keys, current page first.
    pub fn checked_keys(&self) -> Vec<IdType> {
        lock(&self.checked).ordered(&self.page_keys())
    }

    pub fn is_checked(&self, key: &str) -> bool {
        lock(&self.checked).contains(key)
    }

    /// Head check box over the current page.
    pub fn head_check(&self) -> HeadCheck {
        lock(&self.checked).head(&self.page_keys())
    }

    fn notify_checked(&self) {
        if let Some(on_check) = &self.on_check {
            on_check(&self.checked_keys());
        }
    }

    /// Flip one row's check.
    pub fn toggle_check(&self, key: &str) {
        lock(&self.checked).toggle(key);
        self.notify_checked();
    }

    /// Uncheck everything, or when nothing is checked, check every row of
    /// the current page.
    pub fn toggle_check_all(&self) {
        let page = self.page_keys();
        lock(&self.checked).toggle_all(&page);
        self.notify_checked();
    }

    /// Delete `keys` one at a time after confirmation.
    ///
    /// Returns `Ok(false)` when declined. The first failure stops the
    /// batch: keys before it are deleted, the rest are not attempted.
    pub async fn delete_list(&self, keys: &[IdType], confirm: &dyn Confirmation) -> StoreResult<bool> {
        if keys.is_empty() {
            return Ok(false);
        }
        let message = self
            .translator
            .t(keys::SURE_TO_DELETE_X, &[("keys", &keys.join(", "))]);
        if !confirm.confirm(&message).await {
            debug!(count = keys.len(), "delete declined");
            return Ok(false);
        }

        let mut result = Ok(true);
        let mut unchecked = false;
        for key in keys {
            if let Err(e) = self.store.delete_one(key).await {
                warn!(error = %e, key = %key, "delete stopped");
                result = Err(e);
                break;
            }
            unchecked |= lock(&self.checked).remove(key);
        }
        if unchecked {
            self.notify_checked();
        }
        result
    }

    /// Open the editor on `row`.
    pub fn edit(&self, row: &S::Item) -> StoreResult<()> {
        let fields = to_fields(row)?;
        *lock(&self.editor) = None;
        self.store.set_current(fields);
        Ok(())
    }

    /// Open the editor on a new record.
    pub fn create(&self) {
        let index_key = self.store.state().index_key.clone();
        let mut fields = Fields::new();
        fields.insert(index_key, Json::String(String::new()));
        *lock(&self.editor) = None;
        self.store.set_current(fields);
    }

    /// Close the editor.
    pub fn close_editor(&self) {
        *lock(&self.editor) = None;
        self.store.clear_current();
    }

    pub fn is_editing(&self) -> bool {
        self.store.state().is_editing()
    }

    /// Form for the open edit, built on first use. An existing record is
    /// reloaded in the background.
    pub fn editor(&self) -> Option<Arc<ResourceForm<S>>> {
        let (editing, id) = {
            let state = self.store.state();
            (state.is_editing(), state.current_id())
        };
        let mut slot = lock(&self.editor);
        if !editing {
            *slot = None;
            return None;
        }
        if let Some(form) = slot.as_ref().filter(|form| form.target() == id.as_ref()) {
            return Some(Arc::clone(form));
        }

        let form = Arc::new(self.build_editor(id));
        if form.target().is_some() {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    let loading = Arc::clone(&form);
                    runtime.spawn(async move {
                        if let Err(e) = loading.mount().await {
                            warn!(error = %e, "editor failed to load record");
                        }
                    });
                }
                Err(_) => warn!("editor cannot load record, no tokio runtime"),
            }
        }
        *slot = Some(Arc::clone(&form));
        Some(form)
    }

    fn build_editor(&self, id: Option<IdType>) -> ResourceForm<S> {
        let fields = self
            .fields
            .iter()
            .filter(|field| field.key.is_some() || field.render_input.is_some())
            .map(|field| {
                let field = field.clone();
                if self.editable {
                    field
                } else {
                    field.read_only(true)
                }
            })
            .collect();

        let mut form = ResourceForm::new(Arc::clone(&self.store), fields)
            .translator(Arc::clone(&self.translator));
        if let Some(id) = id {
            form = form.id(id);
        }
        if let Some(uploader) = &self.uploader {
            form = form.uploader(Arc::clone(uploader));
        }
        form
    }

    fn operate_buttons(&self) -> Option<Vec<String>> {
        if !self.editable && !self.deletable {
            return None;
        }
        let open = if self.editable { keys::EDIT } else { keys::VIEW };
        let mut buttons = vec![format!("[{}]", self.translator.t(open, &[]))];
        if self.deletable {
            buttons.push(format!("[{}]", self.translator.t(keys::DELETE, &[])));
        }
        Some(buttons)
    }

    fn has_head(&self) -> bool {
        self.on_check.is_some()
            || self
                .fields
                .iter()
                .any(|f| f.key.is_some() || f.label.is_some() || f.render_label.is_some())
    }

    fn has_foot(&self) -> bool {
        self.fields.iter().any(|f| f.render_foot.is_some())
    }

    /// Handle a key event.
    pub fn handle_key(&self, key: KeyEvent, state: &mut TableState) -> Option<TableAction> {
        if self.is_editing() {
            let form = self.editor()?;
            return form.handle_key(key, &mut state.form).map(TableAction::Form);
        }

        let rows = self.store.state().current_page.clone();
        let row = state.cursor.and_then(|i| rows.get(i));
        let row_key = row.and_then(|r| self.store.state().key_of(r));
        let pager = self.pager();

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                state.move_by(-1, rows.len());
                Some(TableAction::Moved)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                state.move_by(1, rows.len());
                Some(TableAction::Moved)
            }
            KeyCode::Left | KeyCode::PageUp | KeyCode::Right | KeyCode::PageDown
            | KeyCode::Home | KeyCode::End => {
                let request = match key.code {
                    KeyCode::Left | KeyCode::PageUp => pager.prev(),
                    KeyCode::Right | KeyCode::PageDown => pager.next(),
                    KeyCode::Home => pager.first(),
                    _ => pager.last(),
                }?;
                self.change_page(request);
                Some(TableAction::PageChange(request))
            }
            KeyCode::Char(' ') if self.on_check.is_some() => {
                self.toggle_check(&row_key?);
                Some(TableAction::Checked)
            }
            KeyCode::Char('a') if self.on_check.is_some() => {
                self.toggle_check_all();
                Some(TableAction::Checked)
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Err(e) = self.edit(row?) {
                    warn!(error = %e, "row cannot be edited");
                    return None;
                }
                Some(TableAction::Edit)
            }
            KeyCode::Char('n') if self.editable => {
                self.create();
                Some(TableAction::Create)
            }
            KeyCode::Char('d') if self.deletable => {
                let checked = self.checked_keys();
                let keys = if checked.is_empty() {
                    vec![row_key?]
                } else {
                    checked
                };
                Some(TableAction::Delete(keys))
            }
            _ => None,
        }
    }

    fn render_toolbar(&self, area: Rect, buf: &mut Buffer) {
        PagerView::new(self.pager())
            .translator(self.translator.as_ref())
            .render(area, buf);

        let mut spans = Vec::new();
        if self.deletable {
            let style = if lock(&self.checked).is_empty() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Red)
            };
            spans.push(Span::styled(
                format!("[{}]", self.translator.t(keys::DELETE, &[])),
                style,
            ));
        }
        if self.editable {
            if !spans.is_empty() {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(
                format!("[{}]", self.translator.t(keys::CREATE, &[])),
                Style::default().fg(Color::Green),
            ));
        }
        let buttons = Line::from(spans);
        let width = buttons.width() as u16;
        if width > 0 && width < area.width {
            buf.set_line(area.right() - width, area.y, &buttons, width);
        }
    }

    fn render_editor(&self, area: Rect, buf: &mut Buffer, state: &mut TableState) {
        let Some(form) = self.editor() else {
            return;
        };
        let modal = modal_area(area);
        Clear.render(modal, buf);

        let title = match form.target() {
            Some(id) => format!(" ID: {id} "),
            None => format!(" {} ", self.translator.t(keys::CREATE, &[])),
        };
        let block = Block::bordered()
            .title(title)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(modal);
        block.render(modal, buf);
        StatefulWidget::render(form.as_ref(), inner, buf, &mut state.form);
    }
}

/// Centered area covering most of `area`.
fn modal_area(area: Rect) -> Rect {
    let width = (area.width * 4 / 5).max(area.width.min(30));
    let height = (area.height * 4 / 5).max(area.height.min(8));
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

impl<S: PagedStore> StatefulWidget for &ResourceTable<S> {
    type State = TableState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        // Render block if present
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        if inner.width < 10 || inner.height < 3 {
            return;
        }

        self.render_toolbar(Rect { height: 1, ..inner }, buf);

        let (rows, loading, editing, index_key) = {
            let store = self.store.state();
            (
                store.current_page.clone(),
                store.downloading > 0,
                store.is_editing(),
                store.index_key.clone(),
            )
        };
        let buttons = self.operate_buttons();
        let operate_width = buttons
            .as_ref()
            .map(|b| b.iter().map(String::len).sum::<usize>() + b.len() - 1);
        let columns = table_columns(
            &self.fields,
            self.on_check.is_some(),
            operate_width.map(|w| w as u16),
        );
        let widths: Vec<_> = columns.iter().map(TableColumn::width).collect();
        let column_widths = calculate_column_widths(&widths, inner.width as usize);

        let mut top = inner.y + 1;
        let mut bottom = inner.bottom();

        // Header row
        if self.has_head() {
            let head = self.head_check();
            let mut x = inner.x;
            for (column, &width) in columns.iter().zip(&column_widths) {
                let line = match column {
                    TableColumn::Check => Line::from(head.mark()),
                    TableColumn::Data(field) => field.label_line(),
                    TableColumn::Operate(_) => Line::default(),
                };
                let line = line.patch_style(Style::default().add_modifier(Modifier::BOLD));
                buf.set_line(x, top, &line, width);
                x += width + 1;
            }
            top += 1;
        }

        // Footer row
        if self.has_foot() && bottom > top {
            bottom -= 1;
            let mut x = inner.x;
            for (column, &width) in columns.iter().zip(&column_widths) {
                if let TableColumn::Data(field) = column {
                    if let Some(foot) = &field.render_foot {
                        let style = Style::default().add_modifier(Modifier::ITALIC);
                        buf.set_string(x, bottom, truncate_with_ellipsis(foot, width as usize), style);
                    }
                }
                x += width + 1;
            }
        }

        let visible_height = usize::from(bottom.saturating_sub(top));
        state.visible_rows = visible_height;

        if !editing && loading {
            let text = self.translator.t(keys::LOADING, &[]);
            Line::styled(text, Style::default().fg(Color::DarkGray))
                .centered()
                .render(Rect::new(inner.x, top, inner.width, 1), buf);
        } else if rows.is_empty() {
            let msg = "No data";
            let x = inner.x + (inner.width.saturating_sub(msg.len() as u16)) / 2;
            buf.set_string(x, top, msg, Style::default().fg(Color::DarkGray));
        } else {
            state.clamp(rows.len());
            if let Some(cursor) = state.cursor {
                state.scroll_to(cursor, visible_height);
            }

            let checked = lock(&self.checked).clone();
            for row_offset in 0..visible_height {
                let index = state.scroll_offset + row_offset;
                let Some(row) = rows.get(index) else {
                    break;
                };
                let y = top + row_offset as u16;
                let key = id_of(&field_of(row, &index_key));

                let row_style = if state.cursor == Some(index) {
                    Style::default().bg(Color::Blue).fg(Color::White)
                } else if row_offset % 2 == 0 {
                    Style::default()
                } else {
                    Style::default().bg(Color::Rgb(30, 30, 30))
                };
                buf.set_style(Rect::new(inner.x, y, inner.width, 1), row_style);

                let mut x = inner.x;
                for (column, &width) in columns.iter().zip(&column_widths) {
                    let line = match column {
                        TableColumn::Check => {
                            let on = key.as_deref().is_some_and(|k| checked.contains(k));
                            Line::from(if on { "[x]" } else { "[ ]" })
                        }
                        TableColumn::Data(field) => match (&field.render_body, &field.key) {
                            (Some(render), _) => render(row),
                            (None, Some(key)) => {
                                CellContent::for_field(field, &field_of(row, key)).line(width as usize)
                            }
                            (None, None) => Line::default(),
                        },
                        TableColumn::Operate(_) => {
                            Line::from(buttons.as_ref().map(|b| b.join(" ")).unwrap_or_default())
                        }
                    };
                    buf.set_line(x, y, &line, width);
                    x += width + 1;
                }
            }
        }

        if editing {
            self.render_editor(inner, buf, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::ColumnWidth;
    use crate::store::{BackendCall, ListModel, MemoryBackend};
    use crossterm::event::KeyModifiers;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Repo {
        id: u32,
        name: String,
    }

    type Store = ListModel<MemoryBackend<Repo>>;

    fn store(n: u32) -> Arc<Store> {
        let records: Vec<Repo> = (1..=n)
            .map(|id| Repo {
                id,
                name: format!("repo-{id}"),
            })
            .collect();
        let backend = MemoryBackend::with_records("id", records)
            .unwrap()
            .latency(Duration::from_millis(100));
        Arc::new(ListModel::new(backend, "id"))
    }

    fn columns() -> Vec<Field<Repo>> {
        vec![
            Field::new("id").width(ColumnWidth::Fixed(4)),
            Field::new("name"),
        ]
    }

    fn table(n: u32) -> ResourceTable<Store> {
        ResourceTable::new(store(n), columns())
            .editable(true)
            .deletable(true)
            .on_check(|_| {})
    }

    fn ids(keys: &[&str]) -> Vec<IdType> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    fn render(table: &ResourceTable<Store>, state: &mut TableState) -> Buffer {
        let area = Rect::new(0, 0, 60, 16);
        let mut buf = Buffer::empty(area);
        table.render(area, &mut buf, state);
        buf
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_loads_first_page() {
        let table = table(50);
        table.mount().await.unwrap();

        assert_eq!(table.page_keys(), ids(&["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]));
        assert_eq!(table.pager().page_count, 5);
        assert_eq!(
            table.store().backend().calls(),
            vec![BackendCall::Load {
                page_index: 1,
                page_size: 10,
                filter: Filter::new()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_all_is_page_scoped() {
        let table = table(50);
        table.mount().await.unwrap();
        table.change_page(table.pager().next().unwrap());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(table.store().state().page_index, 2);

        table.toggle_check_all();
        let checked = table.checked_keys();
        assert_eq!(checked.len(), 10);
        assert_eq!(checked.first().map(String::as_str), Some("11"));
        assert_eq!(table.head_check(), HeadCheck::Checked);

        table.toggle_check_all();
        assert!(table.checked_keys().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_changes_coalesce() {
        let table = table(50);
        table.mount().await.unwrap();

        for page in 2..=4 {
            table.change_page(PageRequest {
                page_index: page,
                page_size: 10,
            });
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(table.store().backend().load_count(), 2);
        assert_eq!(table.store().state().page_index, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_change_skipped_while_fetching() {
        let config = ListConfig {
            page_debounce_ms: 50,
            ..ListConfig::default()
        };
        let table = table(50).config(&config);
        table.mount().await.unwrap();

        let store = Arc::clone(table.store());
        let slow = tokio::spawn(async move { store.get_list(None, Some(2), None).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        // fires while page 2 is still in flight
        table.change_page(PageRequest {
            page_index: 5,
            page_size: 10,
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        slow.await.unwrap().unwrap();

        assert_eq!(table.store().backend().load_count(), 2);
        assert_eq!(table.store().state().page_index, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_is_sequential_and_stops_on_failure() {
        let table = table(5);
        table.mount().await.unwrap();
        table.store().backend().fail_on_delete("2");
        table.toggle_check("1");
        table.toggle_check("3");

        let confirm = |_: &str| true;
        let result = table.delete_list(&ids(&["1", "2", "3"]), &confirm).await;

        assert!(result.is_err());
        let calls = table.store().backend().calls();
        assert_eq!(
            calls[1..],
            [BackendCall::Remove("1".into()), BackendCall::Remove("2".into())]
        );
        let left: Vec<u32> = table
            .store()
            .backend()
            .records()
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(left, vec![2, 3, 4, 5]);
        assert_eq!(table.checked_keys(), ids(&["3"]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_declined_delete_issues_nothing() {
        let table = table(5);
        table.mount().await.unwrap();

        let asked = Mutex::new(String::new());
        let confirm = |message: &str| {
            *asked.lock().unwrap() = message.to_string();
            false
        };
        let deleted = table.delete_list(&ids(&["1", "2"]), &confirm).await.unwrap();

        assert!(!deleted);
        assert_eq!(*asked.lock().unwrap(), "Are you sure to delete 1, 2?");
        assert_eq!(table.store().backend().calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_create_and_close() {
        let table = table(5);
        table.mount().await.unwrap();
        assert!(table.editor().is_none());

        let third = table.store().state().current_page[2].clone();
        table.edit(&third).unwrap();
        let form = table.editor().unwrap();
        assert_eq!(form.target().map(String::as_str), Some("3"));
        assert!(Arc::ptr_eq(&form, &table.editor().unwrap()));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(form.is_ready());
        assert!(table
            .store()
            .backend()
            .calls()
            .contains(&BackendCall::LoadOne("3".into())));

        table.create();
        let form = table.editor().unwrap();
        assert_eq!(form.target(), None);

        table.close_editor();
        assert!(!table.is_editing());
        assert!(table.editor().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys() {
        let table = table(30);
        table.mount().await.unwrap();
        let mut state = TableState::new();
        render(&table, &mut state);

        assert_eq!(table.handle_key(key(KeyCode::Down), &mut state), Some(TableAction::Moved));
        assert_eq!(table.handle_key(key(KeyCode::Char(' ')), &mut state), Some(TableAction::Checked));
        assert_eq!(table.checked_keys(), ids(&["2"]));

        assert_eq!(
            table.handle_key(key(KeyCode::Char('d')), &mut state),
            Some(TableAction::Delete(ids(&["2"])))
        );
        assert_eq!(
            table.handle_key(key(KeyCode::Right), &mut state),
            Some(TableAction::PageChange(PageRequest {
                page_index: 2,
                page_size: 10
            }))
        );
        // no page before the first
        assert_eq!(table.handle_key(key(KeyCode::Left), &mut state), None);

        assert_eq!(table.handle_key(key(KeyCode::Char('n')), &mut state), Some(TableAction::Create));
        assert!(table.is_editing());
        assert_eq!(
            table.handle_key(key(KeyCode::Esc), &mut state),
            Some(TableAction::Form(FormAction::Reset))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_rows() {
        let table = table(50);
        table.mount().await.unwrap();
        let mut state = TableState::new();
        let buf = render(&table, &mut state);

        let toolbar = row(&buf, 0);
        assert!(toolbar.contains("Total 50 rows"));
        assert!(toolbar.ends_with("[Delete] [Create]"));
        assert!(row(&buf, 1).starts_with("[ ] id   name"));
        assert!(row(&buf, 2).starts_with("[ ] 1    repo-1"));
        assert!(row(&buf, 2).ends_with("[Edit] [Delete]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_loading_row_and_modal() {
        let table = Arc::new(table(50));
        let mounting = tokio::spawn({
            let table = Arc::clone(&table);
            async move { table.mount().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut state = TableState::new();
        let buf = render(&table, &mut state);
        assert_eq!(row(&buf, 2).trim(), "Loading...");
        mounting.await.unwrap().unwrap();

        let first = table.store().state().current_page[0].clone();
        table.edit(&first).unwrap();
        render(&table, &mut state);
        tokio::time::sleep(Duration::from_millis(200)).await;

        let buf = render(&table, &mut state);
        assert!((0..16).any(|y| row(&buf, y).contains("ID: 1")));
        assert!((0..16).any(|y| row(&buf, y).contains("repo-1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_plain_table_has_no_check_or_operate_columns() {
        let table = ResourceTable::new(store(3), columns());
        table.mount().await.unwrap();
        let mut state = TableState::new();
        let buf = render(&table, &mut state);

        assert!(row(&buf, 1).starts_with("id   name"));
        assert_eq!(row(&buf, 2), "1    repo-1");
        assert_eq!(table.handle_key(key(KeyCode::Char(' ')), &mut state), None);
        assert_eq!(table.handle_key(key(KeyCode::Char('d')), &mut state), None);
    }
}
