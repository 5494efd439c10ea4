//! Field descriptors shared by ResourceForm inputs and ResourceTable columns.

use super::{Validator, Value};
use crate::store::Fields;

use ratatui::text::{Line, Span};
use std::fmt;
use std::sync::Arc;

/// Input kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
    #[default]
    Text,
    Number,
    Email,
    Url,
    Tel,
    Date,
    Password,
    File,
    /// Multi-line text
    LongText,
    Radio,
    Checkbox,
    /// Stepped slider, or a row of icons when the field has one
    Range,
}

/// One choice of a select, radio or checkbox field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: Option<String>,
    pub disabled: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
            disabled: false,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Text shown for this option.
    pub fn text(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }
}

/// How wide a column is laid out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnWidth {
    /// Fixed width in characters
    Fixed(u16),
    /// Percentage of available width
    Percentage(f32),
    /// Flexible width with relative weight
    Flex(u16),
}

impl Default for ColumnWidth {
    fn default() -> Self {
        Self::Flex(1)
    }
}

/// Which input a form renders for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputWidget {
    /// Caller-supplied renderer
    Custom,
    /// File uploader
    Upload,
    /// Read-only file list
    Preview,
    /// Radio or checkbox group
    CheckGroup,
    /// Rich text editor
    HtmlEditor,
    /// Free-form tags
    TagInput,
    /// Slider or icon rating
    Range,
    /// Repeated sub-records
    Array,
    TextArea,
    Select,
    Input,
}

pub type LabelRenderer = Arc<dyn Fn(&str) -> Line<'static> + Send + Sync>;
pub type BodyRenderer<D> = Arc<dyn Fn(&D) -> Line<'static> + Send + Sync>;
pub type InputRenderer = Arc<dyn Fn(&Fields, &Value) -> Line<'static> + Send + Sync>;
/// Icon for one step of a range: receives how much of that step is filled,
/// from `0` to the step size.
pub type RangeIcon = Arc<dyn Fn(f64) -> Span<'static> + Send + Sync>;

/// Declarative description of one record field.
///
/// A field without a key binds no data: as a column it shows only what its
/// renderers produce; in a form it renders only through `render_input`.
pub struct Field<D> {
    /// Record field this descriptor binds to
    pub key: Option<String>,
    pub kind: InputKind,
    /// Static label (form) or head (table)
    pub label: Option<String>,
    pub render_label: Option<LabelRenderer>,
    pub render_body: Option<BodyRenderer<D>>,
    pub render_foot: Option<String>,
    pub render_input: Option<InputRenderer>,
    pub required: bool,
    pub read_only: bool,
    pub disabled: bool,
    pub multiple: bool,
    pub options: Vec<SelectOption>,
    /// Accepted file types
    pub accept: Option<String>,
    pub placeholder: Option<String>,
    /// Visible rows of a text input
    pub rows: u16,
    pub rich_text: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Increment of a range or number input
    pub step: Option<f64>,
    pub icon: Option<RangeIcon>,
    /// Fields of each row of a repeated sub-record
    pub item_fields: Vec<Field<Fields>>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub validators: Vec<Validator>,
    /// Feedback shown when the value passes validation
    pub valid_message: Option<String>,
    /// Feedback shown when the value fails validation
    pub invalid_message: Option<String>,
    pub width: ColumnWidth,
}

/// Table columns use the same descriptor; their label is the head.
pub type Column<D> = Field<D>;

impl<D> Clone for Field<D> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            kind: self.kind,
            label: self.label.clone(),
            render_label: self.render_label.clone(),
            render_body: self.render_body.clone(),
            render_foot: self.render_foot.clone(),
            render_input: self.render_input.clone(),
            required: self.required,
            read_only: self.read_only,
            disabled: self.disabled,
            multiple: self.multiple,
            options: self.options.clone(),
            accept: self.accept.clone(),
            placeholder: self.placeholder.clone(),
            rows: self.rows,
            rich_text: self.rich_text,
            min: self.min,
            max: self.max,
            step: self.step,
            icon: self.icon.clone(),
            item_fields: self.item_fields.clone(),
            min_length: self.min_length,
            max_length: self.max_length,
            validators: self.validators.clone(),
            valid_message: self.valid_message.clone(),
            invalid_message: self.invalid_message.clone(),
            width: self.width,
        }
    }
}

impl<D> fmt::Debug for Field<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("required", &self.required)
            .field("multiple", &self.multiple)
            .field("options", &self.options)
            .field("item_fields", &self.item_fields)
            .finish_non_exhaustive()
    }
}

impl<D> Field<D> {
    /// Create a field bound to `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::unbound()
        }
    }

    /// Create a field bound to no data.
    pub fn unbound() -> Self {
        Self {
            key: None,
            kind: InputKind::Text,
            label: None,
            render_label: None,
            render_body: None,
            render_foot: None,
            render_input: None,
            required: false,
            read_only: false,
            disabled: false,
            multiple: false,
            options: Vec::new(),
            accept: None,
            placeholder: None,
            rows: 1,
            rich_text: false,
            min: None,
            max: None,
            step: None,
            icon: None,
            item_fields: Vec::new(),
            min_length: None,
            max_length: None,
            validators: Vec::new(),
            valid_message: None,
            invalid_message: None,
            width: ColumnWidth::default(),
        }
    }

    pub fn kind(mut self, kind: InputKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Render the label (or column head) from the key.
    pub fn render_label(mut self, f: impl Fn(&str) -> Line<'static> + Send + Sync + 'static) -> Self {
        self.render_label = Some(Arc::new(f));
        self
    }

    /// Alias of [`render_label`](Self::render_label) for columns.
    pub fn render_head(self, f: impl Fn(&str) -> Line<'static> + Send + Sync + 'static) -> Self {
        self.render_label(f)
    }

    /// Render a table cell from the whole record.
    pub fn render_body(mut self, f: impl Fn(&D) -> Line<'static> + Send + Sync + 'static) -> Self {
        self.render_body = Some(Arc::new(f));
        self
    }

    /// Footer cell text.
    pub fn render_foot(mut self, text: impl Into<String>) -> Self {
        self.render_foot = Some(text.into());
        self
    }

    /// Render the form input from the edit slot and the current value.
    pub fn render_input(
        mut self,
        f: impl Fn(&Fields, &Value) -> Line<'static> + Send + Sync + 'static,
    ) -> Self {
        self.render_input = Some(Arc::new(f));
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn options(mut self, options: impl IntoIterator<Item = SelectOption>) -> Self {
        self.options = options.into_iter().collect();
        self
    }

    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(text.into());
        self
    }

    pub fn rows(mut self, rows: u16) -> Self {
        self.rows = rows.max(1);
        self
    }

    pub fn rich_text(mut self, rich_text: bool) -> Self {
        self.rich_text = rich_text;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Draw a range as a row of icons, one per step.
    pub fn icon(mut self, f: impl Fn(f64) -> Span<'static> + Send + Sync + 'static) -> Self {
        self.icon = Some(Arc::new(f));
        self
    }

    /// Edit a list of sub-records, each row made of `fields`. At least one
    /// row is always shown.
    pub fn items(mut self, fields: Vec<Field<Fields>>) -> Self {
        self.item_fields = fields;
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Add a validator.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn valid_message(mut self, message: impl Into<String>) -> Self {
        self.valid_message = Some(message.into());
        self
    }

    pub fn invalid_message(mut self, message: impl Into<String>) -> Self {
        self.invalid_message = Some(message.into());
        self
    }

    pub fn width(mut self, width: ColumnWidth) -> Self {
        self.width = width;
        self
    }

    /// Label text: the static label, else the key.
    pub fn title(&self) -> String {
        self.label
            .clone()
            .or_else(|| self.key.clone())
            .unwrap_or_default()
    }

    /// Label line, using the custom renderer when there is one.
    pub fn label_line(&self) -> Line<'static> {
        match &self.render_label {
            Some(render) => render(self.key.as_deref().unwrap_or_default()),
            None => Line::from(self.title()),
        }
    }

    /// Text of an option value, or the value itself.
    pub fn option_text<'a>(&'a self, value: &'a str) -> &'a str {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(SelectOption::text)
            .unwrap_or(value)
    }

    /// Whether the field edits repeated sub-records.
    pub fn is_array(&self) -> bool {
        !self.item_fields.is_empty()
    }

    /// Whether the field holds several values.
    pub fn is_list(&self) -> bool {
        self.multiple || (self.kind == InputKind::Checkbox && !self.options.is_empty())
    }

    /// Whether the field declares explicit validation feedback.
    pub fn has_feedback(&self) -> bool {
        self.valid_message.is_some() || self.invalid_message.is_some()
    }

    /// Input a form renders for this field.
    pub fn input_widget(&self, has_uploader: bool) -> InputWidget {
        if self.render_input.is_some() {
            InputWidget::Custom
        } else if self.is_array() {
            InputWidget::Array
        } else if self.kind == InputKind::File {
            if has_uploader && !self.read_only {
                InputWidget::Upload
            } else {
                InputWidget::Preview
            }
        } else if matches!(self.kind, InputKind::Radio | InputKind::Checkbox)
            && !self.options.is_empty()
        {
            InputWidget::CheckGroup
        } else if self.kind == InputKind::Range {
            InputWidget::Range
        } else if self.rich_text {
            InputWidget::HtmlEditor
        } else if self.multiple && self.options.is_empty() {
            InputWidget::TagInput
        } else if self.rows > 1 || self.kind == InputKind::LongText {
            InputWidget::TextArea
        } else if !self.options.is_empty() {
            InputWidget::Select
        } else {
            InputWidget::Input
        }
    }
}
