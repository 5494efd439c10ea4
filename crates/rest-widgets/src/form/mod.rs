//! ResourceForm - edits the current record of a [`PagedStore`].
//!
//! The form's values are derived from the store's edit slot every time the
//! slot is replaced, so a form never edits values captured before the record
//! finished loading. Submitting validates locally, then creates (no id) or
//! updates (with id) through the store and clears the edit slot.
//!
//! # Example
//!
//! ```ignore
//! use rest_widgets::{Field, FormState, InputKind, ResourceForm};
//!
//! let form = ResourceForm::new(Arc::clone(&store), vec![
//!     Field::new("name").label("Name").required(true),
//!     Field::new("homepage").kind(InputKind::Url),
//!     Field::new("tags").multiple(true),
//! ])
//! .id("42");
//! form.mount().await?;
//!
//! // every frame
//! frame.render_stateful_widget(&form, area, &mut state);
//! ```

mod array;
mod field;
mod range;
mod state;
mod validation;
mod value;

pub use field::{
    BodyRenderer, Column, ColumnWidth, Field, InputKind, InputRenderer, InputWidget,
    LabelRenderer, RangeIcon, SelectOption,
};
pub use range::RangeScale;
pub use state::FormState;
pub use validation::{validate_field, Validator};
pub use value::{FormData, Value};

use crate::badge_input::{accepts_char, chips, commit_tag};
use crate::error::StoreResult;
use crate::i18n::{keys, Catalog, Translator};
use crate::store::{Fields, IdType, PagedStore};
use crate::uploader::{preview_line, upload_key, uploader_line, FileModel, UploadAction, UploaderEvent};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, StatefulWidget, Widget};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

pub type SubmitHandler<D> = Arc<dyn Fn(&D) + Send + Sync>;
pub type ResetHandler = Arc<dyn Fn(&FormData) + Send + Sync>;

/// Result of a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome<D> {
    /// Validation failed; nothing was sent. Field key -> message.
    Invalid(HashMap<String, String>),
    /// The record as returned by the store.
    Saved(D),
}

/// What a key press asks of the form's owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    /// Focus or cursor moved
    Moved,
    /// A value changed
    Edited,
    /// Validate with [`ResourceForm::check`], then [`ResourceForm::submit`]
    Submit,
    /// Call [`ResourceForm::reset`]
    Reset,
    /// Run a file change through [`ResourceForm::upload`]
    Upload { key: String, action: UploadAction },
}

/// Form bound to a store's edit slot.
pub struct ResourceForm<S: PagedStore> {
    store: Arc<S>,
    id: Option<IdType>,
    fields: Vec<Field<S::Item>>,
    uploader: Option<Arc<FileModel>>,
    on_submit: Option<SubmitHandler<S::Item>>,
    on_reset: Option<ResetHandler>,
    translator: Arc<dyn Translator>,
    block: Option<Block<'static>>,
    field_ready: AtomicBool,
}

impl<S: PagedStore> ResourceForm<S> {
    /// Create a form over `fields`. Without an id it creates a record.
    pub fn new(store: Arc<S>, fields: Vec<Field<S::Item>>) -> Self {
        Self {
            store,
            id: None,
            fields,
            uploader: None,
            on_submit: None,
            on_reset: None,
            translator: Arc::new(Catalog::en_us()),
            block: None,
            field_ready: AtomicBool::new(true),
        }
    }

    /// Edit the record `id`. Fields stay disabled until [`mount`](Self::mount)
    /// has loaded it.
    pub fn id(mut self, id: impl Into<IdType>) -> Self {
        self.id = Some(id.into());
        self.field_ready = AtomicBool::new(false);
        self
    }

    /// Upload file fields through `uploader`; without one they are shown
    /// read-only.
    pub fn uploader(mut self, uploader: Arc<FileModel>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Called with the saved record after a successful submission.
    pub fn on_submit(mut self, f: impl Fn(&S::Item) + Send + Sync + 'static) -> Self {
        self.on_submit = Some(Arc::new(f));
        self
    }

    /// Called with the raw form values on reset.
    pub fn on_reset(mut self, f: impl Fn(&FormData) + Send + Sync + 'static) -> Self {
        self.on_reset = Some(Arc::new(f));
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn block(mut self, block: Block<'static>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Record being edited; `None` when creating.
    pub fn target(&self) -> Option<&IdType> {
        self.id.as_ref()
    }

    pub fn fields(&self) -> &[Field<S::Item>] {
        &self.fields
    }

    /// Whether fields accept input.
    pub fn is_ready(&self) -> bool {
        self.field_ready.load(Ordering::SeqCst)
    }

    /// Load the record being edited, if any.
    pub async fn mount(&self) -> StoreResult<()> {
        let Some(id) = &self.id else {
            return Ok(());
        };
        self.field_ready.store(false, Ordering::SeqCst);
        let result = self.store.get_one(id).await;
        self.field_ready.store(true, Ordering::SeqCst);
        result
    }

    /// Whether the form only displays: every field is read-only or disabled.
    pub fn read_only(&self) -> bool {
        self.fields.iter().all(|f| f.read_only || f.disabled)
    }

    /// Whether the store is busy, which disables submit and cancel.
    pub fn loading(&self) -> bool {
        self.store.state().is_busy()
    }

    /// Whether validation feedback comes from field messages rather than
    /// the built-in texts.
    pub fn explicit_feedback(&self) -> bool {
        self.fields.iter().any(Field::has_feedback)
    }

    /// Form values for a record's fields.
    pub fn values_from(&self, record: &Fields) -> FormData {
        self.fields
            .iter()
            .filter_map(|field| {
                let key = field.key.as_ref()?;
                let json = record.get(key).unwrap_or(&Json::Null);
                let value = if field.is_array() {
                    Value::Rows(array::rows_from_json(&field.item_fields, json))
                } else {
                    Value::from_json(json, field.kind, field.is_list())
                };
                Some((key.clone(), value))
            })
            .collect()
    }

    /// Plain record from form values. Disabled and unbound fields are left
    /// out, as are blank fields the edit slot holds no value for. Each
    /// field keeps the JSON type it had in the edit slot.
    pub fn to_record(&self, data: &FormData) -> Fields {
        let origin = self.store.state().current_one.clone();
        let mut record = Fields::new();
        for field in &self.fields {
            let Some(key) = &field.key else {
                continue;
            };
            if field.disabled {
                continue;
            }
            if field.is_array() {
                let rows: &[FormData] = match data.get(key) {
                    Some(Value::Rows(rows)) => rows.as_slice(),
                    _ => &[],
                };
                let json = array::rows_to_json(&field.item_fields, rows, origin.get(key));
                record.insert(key.clone(), json);
                continue;
            }
            // a field that held an array stays one
            let list = field.is_list() || matches!(origin.get(key), Some(Json::Array(_)));
            let value = match data.get(key).cloned().unwrap_or_default() {
                Value::List(items) if !list => {
                    items.into_iter().next().map(Value::String).unwrap_or_default()
                }
                Value::String(s) if list => Value::List(Value::String(s).items()),
                value => value,
            };
            if let Some(json) = value.to_field(field.kind, origin.get(key)) {
                record.insert(key.clone(), json);
            }
        }
        record
    }

    /// Re-derive values when the edit slot has been replaced since the
    /// last call. Call before reading `state`.
    pub fn sync(&self, state: &mut FormState) {
        let (session, values) = {
            let store = self.store.state();
            if state.source == Some(store.edit_session) {
                return;
            }
            (store.edit_session, self.values_from(&store.current_one))
        };
        state.reset_with(values);
        state.source = Some(session);
        if state.focused_field.is_none() {
            state.focus_next(&self.fields);
        }
    }

    /// Validate all fields. Field key -> first failure.
    pub fn validate(&self, data: &FormData) -> HashMap<String, String> {
        self.fields
            .iter()
            .filter_map(|field| {
                let key = field.key.clone()?;
                validate_field(field, data).map(|message| (key, message))
            })
            .collect()
    }

    /// Validate the form's values, recording errors in `state`. Returns the
    /// values to submit when they pass.
    pub fn check(&self, state: &mut FormState) -> Option<FormData> {
        let errors = self.validate(&state.values);
        state.validated = true;
        state.errors = errors;
        state.is_valid().then(|| state.values.clone())
    }

    /// Validate and save `data`, then clear the edit slot.
    ///
    /// Creates when the form has no id, updates otherwise. Invalid data is
    /// reported without any store call.
    pub async fn submit(&self, data: &FormData) -> StoreResult<SubmitOutcome<S::Item>> {
        let errors = self.validate(data);
        if !errors.is_empty() {
            debug!(fields = errors.len(), "submission blocked by validation");
            return Ok(SubmitOutcome::Invalid(errors));
        }

        let saved = self
            .store
            .update_one(self.to_record(data), self.id.clone())
            .await?;
        if let Some(on_submit) = &self.on_submit {
            on_submit(&saved);
        }
        self.store.clear_current();
        Ok(SubmitOutcome::Saved(saved))
    }

    /// Clear the edit slot and hand the raw values to the reset handler.
    pub fn reset(&self, state: &FormState) {
        self.store.clear_current();
        if let Some(on_reset) = &self.on_reset {
            on_reset(&state.values);
        }
    }

    /// Apply a file change to the field `key`.
    pub async fn upload(&self, state: &mut FormState, key: &str, action: UploadAction) -> StoreResult<()> {
        let Some(uploader) = &self.uploader else {
            return Ok(());
        };
        let files = state.get(key).map(Value::items).unwrap_or_default();
        let files = uploader.apply(&files, action).await?;
        state.set(key, Value::List(files));
        Ok(())
    }

    fn focused<'a>(&'a self, state: &FormState) -> Option<&'a Field<S::Item>> {
        let name = state.focused_field.as_deref()?;
        self.fields.iter().find(|f| f.key.as_deref() == Some(name))
    }

    /// Handle a key event.
    pub fn handle_key(&self, key: KeyEvent, state: &mut FormState) -> Option<FormAction> {
        if !self.is_ready() {
            return None;
        }

        match key.code {
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return (!self.read_only() && !self.loading()).then_some(FormAction::Submit);
            }
            KeyCode::Esc => return (!self.loading()).then_some(FormAction::Reset),
            KeyCode::Tab => {
                state.focus_next(&self.fields);
                return Some(FormAction::Moved);
            }
            KeyCode::BackTab => {
                state.focus_previous(&self.fields);
                return Some(FormAction::Moved);
            }
            _ => {}
        }

        let field = self.focused(state)?;
        if field.read_only || field.disabled {
            return None;
        }
        let name = field.key.clone()?;

        match field.input_widget(self.uploader.is_some()) {
            InputWidget::Custom | InputWidget::Preview => None,
            InputWidget::Upload => {
                let files = state.get(&name).map(Value::items).unwrap_or_default();
                let draft = state.drafts.entry(name.clone()).or_default();
                let cursor = state.option_cursor.entry(name.clone()).or_default();
                match upload_key(key, &files, draft, cursor, field.multiple)? {
                    UploaderEvent::Edited => Some(FormAction::Edited),
                    UploaderEvent::Request(action) => Some(FormAction::Upload { key: name, action }),
                }
            }
            InputWidget::CheckGroup => option_key(field, &name, key, state),
            InputWidget::Select if field.is_list() => option_key(field, &name, key, state),
            InputWidget::Select => select_key(field, &name, key, state),
            InputWidget::TagInput => tag_key(field, &name, key, state),
            InputWidget::Range => range::range_key(field, &name, key, state),
            InputWidget::Array => array::array_key(field, &name, key, state),
            InputWidget::TextArea | InputWidget::HtmlEditor => text_key(field, &name, key, state, true),
            InputWidget::Input if field.kind == InputKind::Checkbox => match key.code {
                KeyCode::Char(' ') | KeyCode::Enter => {
                    let checked = matches!(state.get(&name), Some(Value::Bool(true)));
                    state.set(name, !checked);
                    Some(FormAction::Edited)
                }
                _ => None,
            },
            InputWidget::Input if key.code == KeyCode::Enter => {
                state.focus_next(&self.fields);
                Some(FormAction::Moved)
            }
            InputWidget::Input => text_key(field, &name, key, state, false),
        }
    }

    fn input_lines(&self, field: &Field<S::Item>, state: &FormState, focused: bool, current: &Fields) -> Vec<Line<'static>> {
        let key = field.key.as_deref().unwrap_or_default();
        let value = state.get(key).cloned().unwrap_or_default();
        let draft = state.drafts.get(key).map(String::as_str).unwrap_or_default();
        let cursor = state.option_cursor.get(key).copied().unwrap_or(0);
        let caret = || Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK));
        let placeholder = |line: &mut Line<'static>| {
            if let Some(text) = &field.placeholder {
                line.push_span(Span::styled(text.clone(), Style::default().fg(Color::DarkGray)));
            }
        };

        match field.input_widget(self.uploader.is_some()) {
            InputWidget::Custom => match &field.render_input {
                Some(render) => vec![render(current, &value)],
                None => Vec::new(),
            },
            InputWidget::Upload => vec![uploader_line(
                &value.items(),
                draft,
                focused.then_some(cursor),
                field.multiple,
                field.accept.as_deref(),
            )],
            InputWidget::Preview => vec![preview_line(&value.items())],
            InputWidget::Range => vec![range::range_line(field, &value)],
            InputWidget::Array => {
                let cursor = state.item_cursor.get(key).copied().unwrap_or_default();
                array::array_lines(field, &value, focused.then_some(cursor))
            }
            InputWidget::CheckGroup => vec![option_line(field, &value, focused.then_some(cursor))],
            InputWidget::Select if field.is_list() => {
                vec![option_line(field, &value, focused.then_some(cursor))]
            }
            InputWidget::Select => {
                let text = match value.as_str() {
                    "" => field.placeholder.clone().unwrap_or_default(),
                    selected => field.option_text(selected).to_string(),
                };
                vec![Line::from(format!("\u{2039} {text} \u{203a}"))]
            }
            InputWidget::TagInput => {
                let mut line = Line::from(chips(&value.items(), Style::default().fg(Color::Black).bg(Color::Gray)));
                if draft.is_empty() && value.is_empty() {
                    placeholder(&mut line);
                } else {
                    line.push_span(Span::raw(draft.to_string()));
                }
                if focused {
                    line.push_span(caret());
                }
                vec![line]
            }
            InputWidget::TextArea | InputWidget::HtmlEditor => {
                let text = value.display();
                let rows = usize::from(field.rows.max(if field.kind == InputKind::LongText { 3 } else { 1 }));
                let mut lines: Vec<Line<'static>> = text.split('\n').map(|l| Line::from(l.to_string())).collect();
                if text.is_empty() {
                    lines = vec![Line::default()];
                    placeholder(&mut lines[0]);
                }
                // keep the end of the text, where the caret is, in view
                let skip = lines.len().saturating_sub(rows);
                let mut lines: Vec<_> = lines.into_iter().skip(skip).collect();
                if focused {
                    if let Some(last) = lines.last_mut() {
                        last.push_span(caret());
                    }
                }
                lines.resize(rows, Line::default());
                lines
            }
            InputWidget::Input => {
                let mut line = match (&field.kind, &value) {
                    (InputKind::Checkbox, Value::Bool(true)) => Line::from("[x]"),
                    (InputKind::Checkbox, _) => Line::from("[ ]"),
                    (InputKind::Password, v) => Line::from("\u{2022}".repeat(v.display().chars().count())),
                    (_, v) => Line::from(v.display()),
                };
                if value.is_empty() && field.kind != InputKind::Checkbox {
                    placeholder(&mut line);
                }
                if focused && field.kind != InputKind::Checkbox {
                    line.push_span(caret());
                }
                vec![line]
            }
        }
    }
}

fn text_key(field: &Field<impl Sized>, name: &str, key: KeyEvent, state: &mut FormState, multiline: bool) -> Option<FormAction> {
    let mut text = state.get(name).map(Value::display).unwrap_or_default();
    match key.code {
        KeyCode::Char(c) if accepts_char(field.kind, c) => text.push(c),
        KeyCode::Backspace => {
            text.pop()?;
        }
        KeyCode::Enter if multiline => text.push('\n'),
        _ => return None,
    }
    state.set(name, text);
    Some(FormAction::Edited)
}

fn tag_key(field: &Field<impl Sized>, name: &str, key: KeyEvent, state: &mut FormState) -> Option<FormAction> {
    let mut tags = state.get(name).map(Value::items).unwrap_or_default();
    let draft = state.drafts.entry(name.to_string()).or_default();
    match key.code {
        KeyCode::Enter => {
            if !commit_tag(&mut tags, draft) {
                return None;
            }
        }
        KeyCode::Backspace => {
            if draft.pop().is_some() {
                return Some(FormAction::Edited);
            }
            tags.pop()?;
        }
        KeyCode::Char(c) if accepts_char(field.kind, c) => {
            draft.push(c);
            return Some(FormAction::Edited);
        }
        _ => return None,
    }
    state.set(name, Value::List(tags));
    Some(FormAction::Edited)
}

fn option_key(field: &Field<impl Sized>, name: &str, key: KeyEvent, state: &mut FormState) -> Option<FormAction> {
    let last = field.options.len().checked_sub(1)?;
    let cursor = state.option_cursor.get(name).copied().unwrap_or(0).min(last);
    match key.code {
        KeyCode::Up | KeyCode::Left => {
            state.option_cursor.insert(name.to_string(), cursor.saturating_sub(1));
            Some(FormAction::Moved)
        }
        KeyCode::Down | KeyCode::Right => {
            state.option_cursor.insert(name.to_string(), (cursor + 1).min(last));
            Some(FormAction::Moved)
        }
        KeyCode::Char(' ') | KeyCode::Enter => {
            let option = &field.options[cursor];
            if option.disabled {
                return None;
            }
            let value = if field.is_list() {
                let mut items = state.get(name).map(Value::items).unwrap_or_default();
                match items.iter().position(|v| *v == option.value) {
                    Some(pos) => {
                        items.remove(pos);
                    }
                    None => items.push(option.value.clone()),
                }
                Value::List(items)
            } else {
                Value::String(option.value.clone())
            };
            state.set(name, value);
            Some(FormAction::Edited)
        }
        _ => None,
    }
}

/// Single select: Left/Right step through the enabled options.
fn select_key(field: &Field<impl Sized>, name: &str, key: KeyEvent, state: &mut FormState) -> Option<FormAction> {
    let enabled: Vec<&SelectOption> = field.options.iter().filter(|o| !o.disabled).collect();
    if enabled.is_empty() {
        return None;
    }
    let current = state.get(name).map(|v| v.as_str().to_string()).unwrap_or_default();
    let position = enabled.iter().position(|o| o.value == current);
    let next = match (key.code, position) {
        (KeyCode::Left | KeyCode::Up, Some(i)) => i.saturating_sub(1),
        (KeyCode::Right | KeyCode::Down, Some(i)) => (i + 1).min(enabled.len() - 1),
        (KeyCode::Left | KeyCode::Up | KeyCode::Right | KeyCode::Down, None) => 0,
        _ => return None,
    };
    state.set(name, enabled[next].value.clone());
    Some(FormAction::Edited)
}

fn option_line(field: &Field<impl Sized>, value: &Value, cursor: Option<usize>) -> Line<'static> {
    let chosen = value.items();
    let list = field.is_list();
    let mut spans = Vec::new();
    for (i, option) in field.options.iter().enumerate() {
        let checked = chosen.contains(&option.value);
        let mark = match (list, checked) {
            (true, true) => "[x]",
            (true, false) => "[ ]",
            (false, true) => "(\u{2022})",
            (false, false) => "( )",
        };
        let mut style = Style::default();
        if option.disabled {
            style = style.fg(Color::DarkGray);
        }
        if cursor == Some(i) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(format!("{mark} {}", option.text()), style));
    }
    Line::from(spans)
}

impl<S: PagedStore> StatefulWidget for &ResourceForm<S> {
    type State = FormState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let inner = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };
        if inner.width < 10 || inner.height < 1 {
            return;
        }

        if !self.is_ready() {
            let style = Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC);
            Line::styled(self.translator.t(keys::LOADING, &[]), style)
                .centered()
                .render(Rect { height: 1, ..inner }, buf);
            return;
        }
        self.sync(state);

        let read_only = self.read_only();
        let bottom = inner.bottom().saturating_sub(if read_only { 0 } else { 2 });
        let label_width = 15u16.min(inner.width / 3);
        let input_x = inner.x + label_width + 1;
        let input_width = inner.width.saturating_sub(label_width + 1);
        let current = self.store.state().current_one.clone();
        let explicit = self.explicit_feedback();
        let mut y = inner.y;

        for field in &self.fields {
            if y >= bottom {
                break;
            }
            let key = field.key.as_deref();
            let focused = key.is_some() && state.focused_field.as_deref() == key;
            let error = key.and_then(|k| state.get_error(k));

            // Label
            if key.is_some() || field.label.is_some() || field.render_label.is_some() {
                let mut label = field.label_line();
                if field.required {
                    label.push_span(Span::styled("*", Style::default().fg(Color::Red)));
                }
                if error.is_some() {
                    label = label.patch_style(Style::default().fg(Color::Red));
                }
                buf.set_line(inner.x, y, &label, label_width);
            }

            // Input
            let input_style = if focused {
                Style::default().bg(Color::DarkGray)
            } else if field.disabled || field.read_only {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            let lines = self.input_lines(field, state, focused, &current);
            for line in lines.iter().take(usize::from(bottom - y).max(1)) {
                buf.set_style(Rect::new(input_x, y, input_width, 1), input_style);
                buf.set_line(input_x, y, line, input_width);
                y += 1;
            }
            if lines.is_empty() {
                y += 1;
            }

            // Feedback
            let feedback = match error {
                Some(error) => {
                    let text = field.invalid_message.as_deref().filter(|_| explicit).unwrap_or(error);
                    Some((text, Style::default().fg(Color::Red)))
                }
                None if explicit && state.validated => field
                    .valid_message
                    .as_deref()
                    .map(|text| (text, Style::default().fg(Color::Green))),
                None => None,
            };
            if let Some((text, style)) = feedback {
                if y < bottom {
                    buf.set_stringn(input_x, y, text, usize::from(input_width), style);
                    y += 1;
                }
            }
        }

        if !read_only {
            let style = if self.loading() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            let footer = Line::from(vec![
                Span::styled(format!("[ {} ]", self.translator.t(keys::SUBMIT, &[])), style),
                Span::raw("  "),
                Span::styled(
                    format!("[ {} ]", self.translator.t(keys::CANCEL, &[])),
                    style.fg(if self.loading() { Color::DarkGray } else { Color::Red }),
                ),
            ]);
            footer.centered().render(
                Rect {
                    y: inner.bottom() - 1,
                    height: 1,
                    ..inner
                },
                buf,
            );
        }
    }
}
