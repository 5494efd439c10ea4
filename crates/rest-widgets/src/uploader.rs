//! File lists: an upload model over a transport, and an uploader input that
//! edits a field's list of file URIs.

use crate::error::StoreResult;
use crate::input::Controlled;

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, StatefulWidget, Widget};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Where uploaded files go.
#[async_trait]
pub trait FileTransport: Send + Sync + 'static {
    /// Store the local file at `path`; returns the URI it is reachable at.
    async fn upload(&self, path: &str) -> StoreResult<String>;

    /// Remove a stored file.
    async fn delete(&self, uri: &str) -> StoreResult<()>;
}

/// Transport that keeps files where they are: the URI is the path.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFiles;

#[async_trait]
impl FileTransport for LocalFiles {
    async fn upload(&self, path: &str) -> StoreResult<String> {
        Ok(path.to_string())
    }

    async fn delete(&self, _uri: &str) -> StoreResult<()> {
        Ok(())
    }
}

/// Last path segment of a file URI.
pub fn file_name(uri: &str) -> &str {
    let trimmed = uri.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Read-only chips for a list of files.
pub fn preview_line(files: &[String]) -> Line<'static> {
    let style = Style::default().fg(Color::Cyan);
    let mut spans = Vec::new();
    for (i, file) in files.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(format!("[{}]", file_name(file)), style));
    }
    Line::from(spans)
}

/// Ordered, duplicate-free list of uploaded files.
pub struct FileModel {
    transport: Arc<dyn FileTransport>,
    files: Mutex<Vec<String>>,
}

impl std::fmt::Debug for FileModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileModel")
            .field("files", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl FileModel {
    pub fn new(transport: impl FileTransport) -> Self {
        Self {
            transport: Arc::new(transport),
            files: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn files(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Adopt an input's current value.
    pub fn set_files(&self, files: Vec<String>) {
        *self.lock() = files;
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Upload `path` and append its URI unless already listed.
    pub async fn upload(&self, path: &str) -> StoreResult<String> {
        let uri = self.transport.upload(path).await?;
        let mut files = self.lock();
        if !files.contains(&uri) {
            files.push(uri.clone());
        }
        debug!(%uri, "file uploaded");
        Ok(uri)
    }

    /// Delete `uri` remotely, then drop it from the list.
    pub async fn delete(&self, uri: &str) -> StoreResult<()> {
        self.transport.delete(uri).await?;
        self.lock().retain(|file| file != uri);
        Ok(())
    }

    /// Drop the file at `source` onto `target`.
    ///
    /// Moving forward places the source right after the target; moving
    /// backward places it right before, with the target following it and the
    /// files in between shifted after both.
    pub fn move_file(&self, source: usize, target: usize) {
        let mut files = self.lock();
        if source == target || source >= files.len() || target >= files.len() {
            return;
        }
        let front = source.min(target);
        let back = source.max(target);
        let source_file = files[source].clone();
        let target_file = files[target].clone();

        let mut moved = Vec::with_capacity(files.len());
        moved.extend_from_slice(&files[..front]);
        if source < target {
            moved.extend_from_slice(&files[front + 1..back]);
            moved.push(target_file);
            moved.push(source_file);
        } else {
            moved.push(source_file);
            moved.push(target_file);
            moved.extend_from_slice(&files[front + 1..back]);
        }
        moved.extend_from_slice(&files[back + 1..]);
        *files = moved;
    }

    /// Run `action` against `files` and return the resulting list.
    pub async fn apply(&self, files: &[String], action: UploadAction) -> StoreResult<Vec<String>> {
        self.set_files(files.to_vec());
        match action {
            UploadAction::Change { old, path } => {
                if let Some(old) = old {
                    self.delete(&old).await?;
                }
                if let Some(path) = path {
                    self.upload(&path).await?;
                }
            }
            UploadAction::Move { source, target } => self.move_file(source, target),
        }
        Ok(self.files())
    }
}

/// A file list edit that needs the [`FileModel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadAction {
    /// Delete `old` and/or upload `path`
    Change {
        old: Option<String>,
        path: Option<String>,
    },
    Move { source: usize, target: usize },
}

/// Result of a key press in an uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploaderEvent {
    /// Only the draft or cursor changed
    Edited,
    Request(UploadAction),
}

/// Shared key handling for file list inputs.
///
/// Typing fills the path draft and Enter uploads it (replacing the file in
/// single mode). Backspace on an empty draft or Delete removes the file
/// under the cursor, Left/Right move the cursor and Shift+Left/Right move
/// the file.
pub fn upload_key(
    key: KeyEvent,
    files: &[String],
    draft: &mut String,
    cursor: &mut usize,
    multiple: bool,
) -> Option<UploaderEvent> {
    let last = files.len().saturating_sub(1);
    *cursor = (*cursor).min(last);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    match key.code {
        KeyCode::Enter => {
            if draft.trim().is_empty() {
                return None;
            }
            let path = std::mem::take(draft).trim().to_string();
            let old = if multiple { None } else { files.first().cloned() };
            Some(UploaderEvent::Request(UploadAction::Change {
                old,
                path: Some(path),
            }))
        }
        KeyCode::Backspace if !draft.is_empty() => {
            draft.pop();
            Some(UploaderEvent::Edited)
        }
        KeyCode::Backspace | KeyCode::Delete => files.get(*cursor).map(|file| {
            UploaderEvent::Request(UploadAction::Change {
                old: Some(file.clone()),
                path: None,
            })
        }),
        KeyCode::Left if shift && *cursor > 0 => {
            let source = *cursor;
            *cursor -= 1;
            Some(UploaderEvent::Request(UploadAction::Move {
                source,
                target: source - 1,
            }))
        }
        KeyCode::Right if shift && *cursor < last => {
            let source = *cursor;
            *cursor += 1;
            Some(UploaderEvent::Request(UploadAction::Move {
                source,
                target: source + 1,
            }))
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
            Some(UploaderEvent::Edited)
        }
        KeyCode::Right => {
            *cursor = (*cursor + 1).min(last);
            Some(UploaderEvent::Edited)
        }
        KeyCode::Char(c) => {
            draft.push(c);
            Some(UploaderEvent::Edited)
        }
        _ => None,
    }
}

/// Uploader line: file chips with the cursor, then the path draft when
/// another file may be added.
pub fn uploader_line(
    files: &[String],
    draft: &str,
    cursor: Option<usize>,
    multiple: bool,
    hint: Option<&str>,
) -> Line<'static> {
    let chip = Style::default().fg(Color::Cyan);
    let mut spans = Vec::new();
    for (i, file) in files.iter().enumerate() {
        let style = if cursor == Some(i) {
            chip.bg(Color::DarkGray)
        } else {
            chip
        };
        spans.push(Span::styled(format!("[{}]", file_name(file)), style));
        spans.push(Span::raw(" "));
    }
    if multiple || files.is_empty() {
        spans.push(Span::raw("+ "));
        if draft.is_empty() {
            if let Some(hint) = hint {
                spans.push(Span::styled(
                    hint.to_string(),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        } else {
            spans.push(Span::raw(draft.to_string()));
        }
    }
    Line::from(spans)
}

/// State for [`FileUploader`].
#[derive(Debug, Clone, Default)]
pub struct FileUploaderState {
    pub files: Controlled<Vec<String>>,
    pub draft: String,
    pub cursor: usize,
}

impl FileUploaderState {
    pub fn new(files: Vec<String>) -> Self {
        Self {
            files: Controlled::new(files),
            ..Default::default()
        }
    }

    /// Run `action` through `model` and take the resulting list.
    pub async fn apply(&mut self, model: &FileModel, action: UploadAction) -> StoreResult<()> {
        let files = model.apply(self.files.value(), action).await?;
        self.cursor = self.cursor.min(files.len().saturating_sub(1));
        self.files.set(files);
        Ok(())
    }
}

/// File list input.
#[derive(Debug, Clone, Default)]
pub struct FileUploader<'a> {
    multiple: bool,
    accept: Option<String>,
    block: Option<Block<'a>>,
    focused: bool,
}

impl<'a> FileUploader<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    /// Accepted file types, shown as the draft hint.
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Handle a key event.
    pub fn handle_key(&self, key: KeyEvent, state: &mut FileUploaderState) -> Option<UploaderEvent> {
        let files = state.files.value().clone();
        upload_key(key, &files, &mut state.draft, &mut state.cursor, self.multiple)
    }
}

impl StatefulWidget for FileUploader<'_> {
    type State = FileUploaderState;

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
        let cursor = self.focused.then_some(state.cursor);
        uploader_line(
            state.files.value(),
            &state.draft,
            cursor,
            self.multiple,
            self.accept.as_deref(),
        )
        .render(inner, buf);
    }
}
