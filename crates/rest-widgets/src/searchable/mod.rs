//! SearchableCombobox - chosen options as badges, a query input, and an
//! overlay [`ScrollList`] of remote matches.
//!
//! Keystrokes are coalesced into one search per quiet second. The first
//! search after the overlay was hidden only opens it (the overlay's own boot
//! fetches); later searches refetch page one under the new filter. An empty
//! query hides the overlay and clears the results.
//!
//! # Example
//!
//! ```ignore
//! use rest_widgets::{ComboboxState, SearchableCombobox};
//!
//! let picker = SearchableCombobox::new(Arc::clone(&topics), "name", "name")
//!     .multiple(true)
//!     .placeholder("search topics");
//! let mut state = ComboboxState::new();
//!
//! if let Some(action) = picker.handle_key(key, &mut state) { /* ... */ }
//! frame.render_stateful_widget(&picker, area, &mut state);
//! ```

use crate::badge_input::chips;
use crate::config::ListConfig;
use crate::debounce::Debouncer;
use crate::error::StoreResult;
use crate::form::{Field, FormData, ResourceForm, SubmitOutcome};
use crate::i18n::{keys, Catalog, Translator};
use crate::input::Controlled;
use crate::scroll_list::{ListAction, ScrollList, ScrollListState, ScrollListView};
use crate::store::{field_of, Fields, Filter, PagedStore};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, StatefulWidget};
use serde_json::Value as Json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// A chosen option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionData {
    pub label: String,
    pub value: String,
}

impl OptionData {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// State for [`SearchableCombobox`].
#[derive(Debug, Clone, Default)]
pub struct ComboboxState {
    /// Text typed since the last selection
    pub query: String,
    pub selected: Controlled<Vec<OptionData>>,
    /// Cursor in the overlay
    pub overlay: ScrollListState,
}

impl ComboboxState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `options` chosen.
    pub fn with_selected(options: Vec<OptionData>) -> Self {
        Self {
            selected: Controlled::new(options),
            ..Self::default()
        }
    }

    pub fn options(&self) -> &[OptionData] {
        self.selected.value()
    }

    /// The submitted form of the value: a JSON array of option values.
    pub fn form_value(&self) -> Json {
        Json::from(
            self.options()
                .iter()
                .map(|o| o.value.clone())
                .collect::<Vec<_>>(),
        )
    }

    /// `required` is met by at least one chosen option.
    pub fn is_satisfied(&self, required: bool) -> bool {
        !required || !self.options().is_empty()
    }
}

/// What a key press asks of the combobox's owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComboAction {
    /// The query changed; a search is scheduled
    Edited,
    /// The overlay cursor moved
    Moved,
    Added(OptionData),
    Removed(OptionData),
    /// The overlay was dismissed
    Closed,
    /// Open the creation form with [`SearchableCombobox::open_creator`]
    Create,
}

#[derive(Debug, Default)]
struct Search {
    filter: Filter,
    open: bool,
    /// Bumped by every search that fires and by dismissal
    generation: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn text_of(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}

/// Combobox over a searchable store.
pub struct SearchableCombobox<S: PagedStore> {
    list: ScrollList<S>,
    label_key: String,
    value_key: String,
    multiple: bool,
    creator: Option<Vec<Field<S::Item>>>,
    placeholder: Option<String>,
    translator: Arc<dyn Translator>,
    debouncer: Debouncer,
    search: Arc<Mutex<Search>>,
}

impl<S: PagedStore> SearchableCombobox<S> {
    /// Search `store` by `label_key`; chosen options keep `value_key`.
    pub fn new(store: Arc<S>, label_key: impl Into<String>, value_key: impl Into<String>) -> Self {
        let config = ListConfig::default();
        Self {
            list: ScrollList::builder(store).config(config.clone()).build(),
            label_key: label_key.into(),
            value_key: value_key.into(),
            multiple: false,
            creator: None,
            placeholder: None,
            translator: Arc::new(Catalog::en_us()),
            debouncer: Debouncer::new(config.search_window()),
            search: Arc::new(Mutex::new(Search::default())),
        }
    }

    /// Keep the overlay open after a selection.
    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    /// Offer to create a record when the query matches nothing.
    pub fn creator(mut self, fields: Vec<Field<S::Item>>) -> Self {
        self.creator = Some(fields);
        self
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(text.into());
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    /// Search window, and the overlay's paging settings.
    pub fn config(mut self, config: &ListConfig) -> Self {
        let store = Arc::clone(self.list.store());
        self.list = ScrollList::builder(store).config(config.clone()).build();
        self.debouncer = Debouncer::new(config.search_window());
        self
    }

    pub fn store(&self) -> &Arc<S> {
        self.list.store()
    }

    /// The overlay list.
    pub fn list(&self) -> &ScrollList<S> {
        &self.list
    }

    pub fn is_open(&self) -> bool {
        lock(&self.search).open
    }

    /// Filter of the last search that fired.
    pub fn filter(&self) -> Filter {
        lock(&self.search).filter.clone()
    }

    /// Option for a record.
    pub fn option_of(&self, record: &S::Item) -> OptionData {
        OptionData {
            label: text_of(&field_of(record, &self.label_key)),
            value: text_of(&field_of(record, &self.value_key)),
        }
    }

    /// Schedule a search for `query`, replacing any not yet fired.
    pub fn search(&self, query: &str) {
        let query = query.trim().to_string();
        let list = self.list.clone();
        let search = Arc::clone(&self.search);
        let label_key = self.label_key.clone();

        self.debouncer.call(async move {
            let filter = if query.is_empty() {
                Filter::new()
            } else {
                Filter::new().with(label_key, query.clone())
            };
            let (generation, was_open) = {
                let mut s = lock(&search);
                s.generation += 1;
                s.filter = filter.clone();
                let was_open = s.open;
                s.open = !query.is_empty();
                (s.generation, was_open)
            };
            let store = list.store();

            if query.is_empty() {
                debug!(was_open, "search cleared");
                let idle = store.state().downloading < 1;
                if was_open {
                    list.unmount();
                } else if idle {
                    store.clear_list();
                }
                return;
            }

            list.set_filter(filter.clone());
            if !was_open {
                debug!(query = %query, "search opened overlay");
                // the overlay's boot fetches page one
                drop(list.mount());
                return;
            }

            let downloading = store.state().downloading;
            if downloading > 0 {
                // drop the older results now, fetch once they have landed
                store.clear_list();
                store.wait_idle().await;
            }
            let current = lock(&search).generation;
            if current != generation {
                debug!(query = %query, "search superseded");
                return;
            }
            debug!(query = %query, "searching");
            if let Err(e) = store.get_list(Some(filter), Some(1), None).await {
                warn!(error = %e, query = %query, "search failed");
            }
        });
    }

    /// Hide the overlay and drop its results.
    pub fn close(&self) {
        self.debouncer.cancel();
        {
            let mut s = lock(&self.search);
            s.open = false;
            s.filter = Filter::new();
            s.generation += 1;
        }
        self.list.unmount();
    }

    /// Focus left the input. Closes the overlay unless focus moved into it.
    pub fn on_blur(&self, focus_inside: bool) {
        if !focus_inside && self.is_open() {
            debug!("combobox lost focus");
            self.close();
        }
    }

    /// Choose an option. Already chosen values are ignored. Without
    /// `multiple` the overlay closes.
    pub fn add(&self, state: &mut ComboboxState, option: OptionData) -> bool {
        if state.options().iter().any(|o| o.value == option.value) {
            return false;
        }
        state.selected.update(|options| options.push(option));
        if !self.multiple {
            self.close();
        }
        true
    }

    /// Remove the chosen option at `index`.
    pub fn delete(&self, state: &mut ComboboxState, index: usize) -> Option<OptionData> {
        let removed = state.options().get(index).cloned()?;
        state.selected.update(|options| {
            options.remove(index);
        });
        Some(removed)
    }

    /// Whether `query` can become a new record: creation fields are set and
    /// no loaded item carries the query as its label.
    pub fn can_create(&self, query: &str) -> bool {
        let query = query.trim();
        if self.creator.is_none() || query.is_empty() {
            return false;
        }
        let state = self.store().state();
        !state.all_items.iter().any(|item| {
            text_of(&field_of(item, &self.label_key)).eq_ignore_ascii_case(query)
        })
    }

    /// Creation form seeded with `query` as the label.
    pub fn open_creator(&self, query: &str) -> Option<ResourceForm<S>> {
        if !self.can_create(query) {
            return None;
        }
        let fields = self.creator.clone()?;
        let mut seed = Fields::new();
        seed.insert(self.label_key.clone(), Json::String(query.trim().to_string()));
        self.store().set_current(seed);

        Some(ResourceForm::new(Arc::clone(self.store()), fields).translator(Arc::clone(&self.translator)))
    }

    /// Submit the creation form. A saved record is chosen and the overlay
    /// closes.
    pub async fn submit_creator(
        &self,
        form: &ResourceForm<S>,
        data: &FormData,
        state: &mut ComboboxState,
    ) -> StoreResult<SubmitOutcome<S::Item>> {
        let outcome = form.submit(data).await?;
        if let SubmitOutcome::Saved(record) = &outcome {
            let option = self.option_of(record);
            self.add(state, option);
            self.close();
        }
        Ok(outcome)
    }

    /// Handle a key event.
    pub fn handle_key(&self, key: KeyEvent, state: &mut ComboboxState) -> Option<ComboAction> {
        let open = self.is_open();
        match key.code {
            KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.can_create(&state.query).then_some(ComboAction::Create)
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                state.query.push(c);
                self.search(&state.query);
                Some(ComboAction::Edited)
            }
            KeyCode::Backspace => {
                if state.query.pop().is_some() {
                    self.search(&state.query);
                    return Some(ComboAction::Edited);
                }
                let last = state.options().len().checked_sub(1)?;
                self.delete(state, last).map(ComboAction::Removed)
            }
            KeyCode::Up | KeyCode::Down | KeyCode::PageUp | KeyCode::PageDown if open => self
                .list
                .handle_key(key, &mut state.overlay)
                .map(|_| ComboAction::Moved),
            KeyCode::Enter if open => {
                let Some(ListAction::Activated(index)) = self.list.handle_key(key, &mut state.overlay)
                else {
                    return None;
                };
                let item = self.store().state().all_items.get(index).cloned()?;
                let option = self.option_of(&item);
                self.add(state, option.clone()).then_some(ComboAction::Added(option))
            }
            KeyCode::Esc if open => {
                self.close();
                Some(ComboAction::Closed)
            }
            _ => None,
        }
    }

    fn input_line(&self, state: &ComboboxState) -> Line<'static> {
        let labels: Vec<String> = state.options().iter().map(|o| o.label.clone()).collect();
        let mut spans = chips(&labels, Style::default().fg(Color::Black).bg(Color::Cyan));
        if state.query.is_empty() {
            if let Some(placeholder) = &self.placeholder {
                spans.push(Span::styled(
                    placeholder.clone(),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        } else {
            spans.push(Span::raw(state.query.clone()));
        }
        spans.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
        Line::from(spans)
    }
}

impl<S: PagedStore> StatefulWidget for &SearchableCombobox<S> {
    type State = ComboboxState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        buf.set_line(area.x, area.y, &self.input_line(state), area.width);

        if !self.is_open() || area.height < 3 {
            return;
        }
        let mut overlay = Rect {
            y: area.y + 1,
            height: area.height - 1,
            ..area
        };

        if self.can_create(&state.query) {
            let label = state.query.trim().to_string();
            let offer = self.translator.t(keys::CREATE_X, &[("label", &label)]);
            overlay.height -= 1;
            buf.set_stringn(
                overlay.x,
                overlay.bottom(),
                format!("+ {offer}"),
                usize::from(overlay.width),
                Style::default().fg(Color::Green),
            );
        }

        let label_key = &self.label_key;
        let view = ScrollListView::new(&self.list, |item: &S::Item, _selected: bool| {
            Line::from(text_of(&field_of(item, label_key)))
        })
        .translator(self.translator.as_ref())
        .block(Block::default().borders(Borders::LEFT).border_style(Style::default().fg(Color::DarkGray)));
        view.render(overlay, buf, &mut state.overlay);
    }
}
