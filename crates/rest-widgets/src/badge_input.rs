//! BadgeInput - free-form tag entry.
//!
//! Typing fills a draft, Enter turns the draft into a tag and Backspace on an
//! empty draft removes the last tag. The value serializes as a JSON array.

use crate::form::InputKind;
use crate::input::Controlled;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, StatefulWidget, Widget};
use serde_json::Value as Json;

/// Input kinds a tag input accepts.
pub const TAG_KINDS: [InputKind; 5] = [
    InputKind::Text,
    InputKind::Number,
    InputKind::Tel,
    InputKind::Email,
    InputKind::Url,
];

/// Whether `kind` can be edited as tags.
pub fn accepts(kind: InputKind) -> bool {
    TAG_KINDS.contains(&kind)
}

/// Whether `c` may be typed into an input of `kind`.
pub fn accepts_char(kind: InputKind, c: char) -> bool {
    match kind {
        InputKind::Number => c.is_ascii_digit() || matches!(c, '.' | '-'),
        _ => !c.is_control(),
    }
}

/// Move a non-empty draft into `tags`. Returns whether a tag was added.
pub fn commit_tag(tags: &mut Vec<String>, draft: &mut String) -> bool {
    let text = draft.trim().to_string();
    draft.clear();
    if text.is_empty() {
        return false;
    }
    tags.push(text);
    true
}

/// Chip spans for `tags`, each closed with a delete mark.
pub fn chips(tags: &[String], style: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::with_capacity(tags.len() * 2);
    for tag in tags {
        spans.push(Span::styled(format!("[{tag} \u{00d7}]"), style));
        spans.push(Span::raw(" "));
    }
    spans
}

/// State for [`BadgeInput`].
#[derive(Debug, Clone, Default)]
pub struct BadgeInputState {
    pub tags: Controlled<Vec<String>>,
    /// Text not yet committed
    pub draft: String,
}

impl BadgeInputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `tags` as the default value.
    pub fn with_tags(tags: Vec<String>) -> Self {
        Self {
            tags: Controlled::new(tags),
            draft: String::new(),
        }
    }

    pub fn value(&self) -> &[String] {
        self.tags.value()
    }

    /// Commit the draft.
    pub fn commit(&mut self) -> bool {
        let mut draft = std::mem::take(&mut self.draft);
        let mut tags = self.tags.value().clone();
        if !commit_tag(&mut tags, &mut draft) {
            return false;
        }
        self.tags.set(tags);
        true
    }

    /// Delete the last draft character, or the last tag if the draft is empty.
    pub fn backspace(&mut self) {
        if self.draft.pop().is_none() && !self.tags.value().is_empty() {
            self.tags.update(|tags| {
                tags.pop();
            });
        }
    }

    /// Remove the tag at `index`.
    pub fn delete(&mut self, index: usize) {
        if index < self.tags.value().len() {
            self.tags.update(|tags| {
                tags.remove(index);
            });
        }
    }

    /// The submitted form of the value.
    pub fn form_value(&self) -> Json {
        Json::from(self.tags.value().clone())
    }

    /// `required` is met by at least one tag.
    pub fn is_satisfied(&self, required: bool) -> bool {
        !required || !self.tags.value().is_empty()
    }
}

/// Tag input widget.
#[derive(Debug, Clone)]
pub struct BadgeInput<'a> {
    kind: InputKind,
    placeholder: Option<String>,
    block: Option<Block<'a>>,
    badge_style: Style,
    focused: bool,
}

impl Default for BadgeInput<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> BadgeInput<'a> {
    pub fn new() -> Self {
        Self {
            kind: InputKind::Text,
            placeholder: None,
            block: None,
            badge_style: Style::default().fg(Color::Black).bg(Color::Gray),
            focused: false,
        }
    }

    /// Kind of each tag. Kinds outside [`TAG_KINDS`] fall back to text.
    pub fn kind(mut self, kind: InputKind) -> Self {
        self.kind = if accepts(kind) { kind } else { InputKind::Text };
        self
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(text.into());
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn badge_style(mut self, style: Style) -> Self {
        self.badge_style = style;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Handle a key event. Returns whether the value or draft changed.
    pub fn handle_key(&self, key: KeyEvent, state: &mut BadgeInputState) -> bool {
        match key.code {
            KeyCode::Enter => state.commit(),
            KeyCode::Backspace => {
                state.backspace();
                true
            }
            KeyCode::Char(c) if accepts_char(self.kind, c) => {
                state.draft.push(c);
                true
            }
            _ => false,
        }
    }

    /// The widget's single line.
    pub fn line(&self, tags: &[String], draft: &str) -> Line<'static> {
        let mut spans = chips(tags, self.badge_style);
        if draft.is_empty() && tags.is_empty() {
            if let Some(placeholder) = &self.placeholder {
                spans.push(Span::styled(
                    placeholder.clone(),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        } else {
            spans.push(Span::raw(draft.to_string()));
        }
        if self.focused {
            spans.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
        }
        Line::from(spans)
    }
}

impl StatefulWidget for BadgeInput<'_> {
    type State = BadgeInputState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let inner = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };
        if inner.width == 0 || inner.height == 0 {
            return;
        }
        self.line(state.value(), &state.draft).render(inner, buf);
    }
}
