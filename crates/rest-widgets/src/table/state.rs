//! State management for ResourceTable.

use crate::form::FormState;

/// State for ResourceTable widget.
#[derive(Debug, Clone, Default)]
pub struct TableState {
    /// Row under the cursor, on the current page
    pub cursor: Option<usize>,
    /// Scroll offset (first visible row)
    pub scroll_offset: usize,
    /// State of the editor form while one is open
    pub form: FormState,
    /// Number of visible rows (set during render)
    pub(crate) visible_rows: usize,
}

impl TableState {
    /// Create a new empty table state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<usize> {
        self.cursor
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.cursor = index;
    }

    /// Move the cursor by `delta` rows within `len`.
    pub fn move_by(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.cursor = None;
            return;
        }
        let current = self.cursor.unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1) as usize;
        self.cursor = Some(next);
        if self.visible_rows > 0 {
            self.scroll_to(next, self.visible_rows);
        }
    }

    /// Keep the cursor on a page of `len` rows.
    pub fn clamp(&mut self, len: usize) {
        self.cursor = match self.cursor {
            _ if len == 0 => None,
            Some(row) => Some(row.min(len - 1)),
            None => Some(0),
        };
        if self.scroll_offset >= len {
            self.scroll_offset = 0;
        }
    }

    /// Scroll to make a row visible.
    pub fn scroll_to(&mut self, row: usize, visible_height: usize) {
        if row < self.scroll_offset {
            self.scroll_offset = row;
        } else if visible_height > 0 && row >= self.scroll_offset + visible_height {
            self.scroll_offset = row.saturating_sub(visible_height - 1);
        }
    }
}
