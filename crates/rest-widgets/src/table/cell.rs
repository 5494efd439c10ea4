//! Cell content for ResourceTable.

use super::truncate_with_ellipsis;
use crate::form::{Field, InputKind};
use crate::uploader::preview_line;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use serde_json::Value as Json;
use std::fmt;

/// Characters of long text shown before a cell is cut off.
pub const PARAGRAPH_LIMIT: usize = 50;

/// Content that can be displayed in a table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellContent {
    Empty,
    /// Plain text
    Text(String),
    /// Link with its target (`https:`, `mailto:`, `tel:`)
    Link { label: String, target: String },
    /// File URIs
    Files(Vec<String>),
    /// Values, or option labels
    Badges(Vec<String>),
    /// Long text, cut off at [`PARAGRAPH_LIMIT`]
    Paragraph(String),
}

fn scalar_text(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}

impl CellContent {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn link(label: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Link {
            label: label.into(),
            target: target.into(),
        }
    }

    /// Default content for `value` under the field's input kind.
    pub fn for_field<D>(field: &Field<D>, value: &Json) -> Self {
        let items: Vec<String> = match value {
            Json::Array(items) => items.iter().map(scalar_text).collect(),
            other => {
                let text = scalar_text(other);
                if text.is_empty() {
                    return Self::Empty;
                }
                vec![text]
            }
        };
        if items.is_empty() {
            return Self::Empty;
        }

        if field.kind == InputKind::File {
            return Self::Files(items);
        }
        if value.is_array() || field.is_list() || !field.options.is_empty() {
            return Self::Badges(
                items
                    .iter()
                    .map(|item| field.option_text(item).to_string())
                    .collect(),
            );
        }

        let text = items.concat();
        match field.kind {
            InputKind::Url => Self::link(text.clone(), text),
            InputKind::Email => Self::link(text.clone(), format!("mailto:{text}")),
            InputKind::Tel => Self::link(text.clone(), format!("tel:{text}")),
            InputKind::LongText => Self::Paragraph(text),
            _ => Self::Text(text),
        }
    }

    /// Where a link points.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Link { target, .. } => Some(target),
            _ => None,
        }
    }

    /// The cell as one line of at most `width` columns.
    pub fn line(&self, width: usize) -> Line<'static> {
        match self {
            Self::Empty => Line::default(),
            Self::Text(s) => Line::from(truncate_with_ellipsis(s, width)),
            Self::Link { label, .. } => Line::styled(
                truncate_with_ellipsis(label, width),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::UNDERLINED),
            ),
            Self::Files(files) => preview_line(files),
            Self::Badges(labels) => {
                let style = Style::default().fg(Color::Black).bg(Color::Gray);
                let mut spans = Vec::with_capacity(labels.len() * 2);
                for (i, label) in labels.iter().enumerate() {
                    if i > 0 {
                        spans.push(Span::raw(" "));
                    }
                    spans.push(Span::styled(label.clone(), style));
                }
                Line::from(spans)
            }
            Self::Paragraph(s) => {
                Line::from(truncate_with_ellipsis(s, width.min(PARAGRAPH_LIMIT)))
            }
        }
    }
}

impl fmt::Display for CellContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) | Self::Paragraph(s) => write!(f, "{s}"),
            Self::Link { label, .. } => write!(f, "{label}"),
            Self::Files(items) | Self::Badges(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

impl From<String> for CellContent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for CellContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::SelectOption;
    use serde_json::json;

    type F = Field<()>;

    #[test]
    fn test_default_renderers_by_kind() {
        let url = F::new("home").kind(InputKind::Url);
        assert_eq!(
            CellContent::for_field(&url, &json!("https://ratatui.rs")).target(),
            Some("https://ratatui.rs")
        );

        let email = F::new("mail").kind(InputKind::Email);
        assert_eq!(
            CellContent::for_field(&email, &json!("a@b.c")),
            CellContent::link("a@b.c", "mailto:a@b.c")
        );

        let tel = F::new("phone").kind(InputKind::Tel);
        assert_eq!(
            CellContent::for_field(&tel, &json!("555")).target(),
            Some("tel:555")
        );

        let files = F::new("logo").kind(InputKind::File);
        assert_eq!(
            CellContent::for_field(&files, &json!(["/a/b.png"])),
            CellContent::Files(vec!["/a/b.png".into()])
        );

        assert_eq!(CellContent::for_field(&F::new("n"), &json!(7)), CellContent::text("7"));
        assert_eq!(CellContent::for_field(&F::new("n"), &json!(null)), CellContent::Empty);
        assert_eq!(CellContent::for_field(&F::new("n"), &json!("")), CellContent::Empty);
    }

    #[test]
    fn test_badges_use_option_labels() {
        let field = F::new("kind").options([
            SelectOption::new("lib").label("Library"),
            SelectOption::new("bin").label("Binary"),
        ]);
        assert_eq!(
            CellContent::for_field(&field, &json!("lib")),
            CellContent::Badges(vec!["Library".into()])
        );

        let tags = F::new("tags").multiple(true);
        let cell = CellContent::for_field(&tags, &json!(["cli", "tui"]));
        assert_eq!(cell.to_string(), "cli, tui");
        assert_eq!(cell.line(40).spans.len(), 3);
    }

    #[test]
    fn test_paragraph_is_cut_off() {
        let field = F::new("about").kind(InputKind::LongText);
        let cell = CellContent::for_field(&field, &json!("x".repeat(80)));

        let text = cell.line(200).to_string();
        assert_eq!(text.chars().count(), PARAGRAPH_LIMIT);
        assert!(text.ends_with("..."));
        assert_eq!(cell.line(10).to_string(), "xxxxxxx...");
    }
}
