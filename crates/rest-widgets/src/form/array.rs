//! Repeated sub-record fields.
//!
//! The value is a list of rows, each edited with the same sub-fields. At
//! least one row is always present; blank rows are not sent.

use super::value::row_is_blank;
use super::{validate_field, Field, FormAction, FormData, FormState, Value};
use crate::badge_input::accepts_char;
use crate::store::Fields;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use serde_json::Value as Json;

fn keyed(fields: &[Field<Fields>]) -> impl Iterator<Item = &Field<Fields>> {
    fields.iter().filter(|f| f.key.is_some())
}

fn editable(fields: &[Field<Fields>]) -> Vec<&Field<Fields>> {
    keyed(fields).filter(|f| !f.read_only && !f.disabled).collect()
}

fn row_from_json(fields: &[Field<Fields>], item: &Json) -> FormData {
    keyed(fields)
        .filter_map(|field| {
            let key = field.key.as_ref()?;
            let json = item.get(key).unwrap_or(&Json::Null);
            Some((key.clone(), Value::from_json(json, field.kind, field.is_list())))
        })
        .collect()
}

/// A row with every sub-field unset.
pub fn blank_row(fields: &[Field<Fields>]) -> FormData {
    row_from_json(fields, &Json::Null)
}

/// Rows of a record field; one blank row when it holds none.
pub fn rows_from_json(fields: &[Field<Fields>], value: &Json) -> Vec<FormData> {
    let mut rows: Vec<FormData> = match value {
        Json::Array(items) => items.iter().map(|item| row_from_json(fields, item)).collect(),
        _ => Vec::new(),
    };
    if rows.is_empty() {
        rows.push(blank_row(fields));
    }
    rows
}

/// Record value of `rows`, leaving blank rows out. Each sub-field keeps the
/// JSON type it held in the loaded row at the same position.
pub fn rows_to_json(fields: &[Field<Fields>], rows: &[FormData], origin: Option<&Json>) -> Json {
    let held = origin.and_then(Json::as_array);
    let records = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| !row_is_blank(row))
        .map(|(i, row)| {
            let loaded = held.and_then(|h| h.get(i));
            let mut record = Fields::new();
            for field in keyed(fields).filter(|f| !f.disabled) {
                let Some(key) = &field.key else {
                    continue;
                };
                let value = row.get(key).cloned().unwrap_or_default();
                if let Some(json) = value.to_field(field.kind, loaded.and_then(|l| l.get(key))) {
                    record.insert(key.clone(), json);
                }
            }
            Json::Object(record)
        })
        .collect();
    Json::Array(records)
}

/// First failure among the filled rows, naming the row.
pub fn validate_rows(fields: &[Field<Fields>], rows: &[FormData]) -> Option<String> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| !row_is_blank(row))
        .find_map(|(i, row)| {
            fields
                .iter()
                .find_map(|field| validate_field(field, row))
                .map(|message| format!("Row {}: {message}", i + 1))
        })
}

fn rows_of(fields: &[Field<Fields>], value: Option<&Value>) -> Vec<FormData> {
    match value {
        Some(Value::Rows(rows)) if !rows.is_empty() => rows.clone(),
        _ => vec![blank_row(fields)],
    }
}

/// Up/Down pick a row and Left/Right a sub-field. Insert appends a row;
/// Delete removes the current one unless it is the last. Other keys edit
/// the sub-field as text.
pub(crate) fn array_key<D>(
    field: &Field<D>,
    name: &str,
    key: KeyEvent,
    state: &mut FormState,
) -> Option<FormAction> {
    let fields = &field.item_fields;
    let columns = editable(fields);
    let mut rows = rows_of(fields, state.get(name));
    let (row, column) = state.item_cursor.get(name).copied().unwrap_or_default();
    let row = row.min(rows.len() - 1);
    let column = column.min(columns.len().saturating_sub(1));

    let (cursor, action) = match key.code {
        KeyCode::Up => ((row.saturating_sub(1), column), FormAction::Moved),
        KeyCode::Down => (((row + 1).min(rows.len() - 1), column), FormAction::Moved),
        KeyCode::Left => ((row, column.saturating_sub(1)), FormAction::Moved),
        KeyCode::Right => ((row, (column + 1).min(columns.len().saturating_sub(1))), FormAction::Moved),
        KeyCode::Insert => {
            rows.push(blank_row(fields));
            ((rows.len() - 1, column), FormAction::Edited)
        }
        KeyCode::Delete => {
            if rows.len() < 2 {
                return None;
            }
            rows.remove(row);
            ((row.min(rows.len() - 1), column), FormAction::Edited)
        }
        code => {
            let sub = columns.get(column)?;
            let sub_key = sub.key.as_deref()?;
            let mut text = rows[row].get(sub_key).map(Value::display).unwrap_or_default();
            match code {
                KeyCode::Char(c) if accepts_char(sub.kind, c) => text.push(c),
                KeyCode::Backspace => {
                    text.pop()?;
                }
                _ => return None,
            }
            rows[row].insert(sub_key.to_string(), Value::String(text));
            ((row, column), FormAction::Edited)
        }
    };

    state.item_cursor.insert(name.to_string(), cursor);
    if action == FormAction::Edited {
        state.set(name, Value::Rows(rows));
    }
    Some(action)
}

pub(crate) fn array_lines<D>(
    field: &Field<D>,
    value: &Value,
    cursor: Option<(usize, usize)>,
) -> Vec<Line<'static>> {
    let fields = &field.item_fields;
    let rows = rows_of(fields, Some(value));
    let removable = rows.len() > 1;

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let mut spans = Vec::new();
            let mut column = 0;
            for (j, sub) in keyed(fields).enumerate() {
                if j > 0 {
                    spans.push(Span::raw("  "));
                }
                spans.push(Span::styled(
                    format!("{}: ", sub.title()),
                    Style::default().fg(Color::DarkGray),
                ));
                let key = sub.key.as_deref().unwrap_or_default();
                let text = row.get(key).map(Value::display).unwrap_or_default();
                let is_column = !sub.read_only && !sub.disabled;
                if is_column && cursor == Some((i, column)) {
                    spans.push(Span::styled(text, Style::default().add_modifier(Modifier::REVERSED)));
                    spans.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
                } else {
                    spans.push(Span::raw(text));
                }
                if is_column {
                    column += 1;
                }
            }
            spans.push(Span::styled(" [+]", Style::default().fg(Color::Yellow)));
            let minus = if removable { Color::Red } else { Color::DarkGray };
            spans.push(Span::styled(" [-]", Style::default().fg(minus)));
            Line::from(spans)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::InputKind;
    use crossterm::event::KeyModifiers;
    use serde_json::json;

    fn link_fields() -> Vec<Field<Fields>> {
        vec![
            Field::new("title").required(true),
            Field::new("url").kind(InputKind::Url),
        ]
    }

    fn links() -> Field<()> {
        Field::new("links").items(link_fields())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(state: &mut FormState, text: &str) {
        for c in text.chars() {
            array_key(&links(), "links", key(KeyCode::Char(c)), state);
        }
    }

    fn row(pairs: &[(&str, &str)]) -> FormData {
        pairs.iter().map(|(k, v)| (k.to_string(), Value::from(*v))).collect()
    }

    #[test]
    fn test_empty_value_keeps_one_row() {
        let rows = rows_from_json(&link_fields(), &Json::Null);
        assert_eq!(rows.len(), 1);
        assert!(row_is_blank(&rows[0]));

        let rows = rows_from_json(&link_fields(), &json!([{ "title": "docs" }, { "title": "repo" }]));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("title"), Some(&Value::from("repo")));
    }

    #[test]
    fn test_blank_rows_are_not_sent() {
        let rows = vec![row(&[("title", "docs"), ("url", "")]), blank_row(&link_fields())];
        assert_eq!(
            rows_to_json(&link_fields(), &rows, None),
            json!([{ "title": "docs", "url": "" }])
        );
    }

    #[test]
    fn test_rows_keep_loaded_types() {
        let fields = vec![Field::new("name"), Field::new("weight")];
        let loaded = json!([{ "name": "a", "weight": 3 }]);
        let rows = rows_from_json(&fields, &loaded);
        assert_eq!(rows_to_json(&fields, &rows, Some(&loaded)), loaded);
    }

    #[test]
    fn test_add_edit_and_remove_rows() {
        let mut state = FormState::new();
        type_text(&mut state, "docs");
        let mut first = row(&[("title", "docs")]);
        first.insert("url".into(), Value::None);
        assert_eq!(state.get("links"), Some(&Value::Rows(vec![first])));

        // the last row cannot be removed
        assert_eq!(array_key(&links(), "links", key(KeyCode::Delete), &mut state), None);

        array_key(&links(), "links", key(KeyCode::Insert), &mut state);
        type_text(&mut state, "repo");
        array_key(&links(), "links", key(KeyCode::Right), &mut state);
        type_text(&mut state, "https://github.com");

        let Some(Value::Rows(rows)) = state.get("links") else {
            panic!("rows expected");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], row(&[("title", "repo"), ("url", "https://github.com")]));

        array_key(&links(), "links", key(KeyCode::Up), &mut state);
        array_key(&links(), "links", key(KeyCode::Delete), &mut state);
        let Some(Value::Rows(rows)) = state.get("links") else {
            panic!("rows expected");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("title"), Some(&Value::from("repo")));
    }

    #[test]
    fn test_rows_are_validated() {
        let rows = vec![
            row(&[("title", "docs"), ("url", "https://docs.rs")]),
            row(&[("title", ""), ("url", "nope")]),
        ];
        assert_eq!(
            validate_rows(&link_fields(), &rows).as_deref(),
            Some("Row 2: This field is required")
        );
        assert_eq!(validate_rows(&link_fields(), &rows[..1]), None);
    }

    #[test]
    fn test_lines() {
        let value = Value::Rows(vec![row(&[("title", "docs"), ("url", "")])]);
        let lines = array_lines(&links(), &value, Some((0, 0)));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].to_string(), "title: docs_  url:  [+] [-]");
    }
}
