//! Cursor and scroll state for ScrollListView.

/// Result of a key handled by a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    /// The cursor moved.
    Moved,
    /// Enter on the row at this index.
    Activated(usize),
}

/// State for ScrollListView.
#[derive(Debug, Clone, Default)]
pub struct ScrollListState {
    /// First visible row
    pub offset: usize,
    /// Row under the cursor
    pub selected: Option<usize>,
    /// Number of visible rows (set during render)
    pub(crate) viewport_height: usize,
}

impl ScrollListState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.selected = index;
    }

    /// Move the cursor by `delta` rows within `len` rows.
    pub fn move_by(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.selected = None;
            return;
        }
        let current = self.selected.unwrap_or(0);
        let next = if delta < 0 {
            current.saturating_sub(delta.unsigned_abs())
        } else if self.selected.is_none() {
            0
        } else {
            (current + delta as usize).min(len - 1)
        };
        self.selected = Some(next);
        self.scroll_to(next);
    }

    pub fn select_first(&mut self, len: usize) {
        if len > 0 {
            self.selected = Some(0);
            self.offset = 0;
        }
    }

    pub fn select_last(&mut self, len: usize) {
        if len > 0 {
            self.selected = Some(len - 1);
            self.scroll_to(len - 1);
        }
    }

    /// Page size for PageUp/PageDown.
    pub fn page(&self) -> isize {
        self.viewport_height.max(1) as isize
    }

    /// Scroll so `row` is visible.
    pub fn scroll_to(&mut self, row: usize) {
        let height = self.viewport_height.max(1);
        if row < self.offset {
            self.offset = row;
        } else if row >= self.offset + height {
            self.offset = row + 1 - height;
        }
    }

    /// Keep the cursor and offset inside `len` rows shown `height` at a time.
    pub(crate) fn clamp(&mut self, len: usize, height: usize) {
        self.viewport_height = height;
        self.selected = match self.selected {
            Some(_) if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => None,
        };
        // the footer is one row past the items
        self.offset = self.offset.min((len + 1).saturating_sub(height));
        if let Some(i) = self.selected {
            self.scroll_to(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_and_scroll() {
        let mut state = ScrollListState::new();
        state.viewport_height = 3;

        state.move_by(1, 10);
        assert_eq!(state.selected(), Some(0));

        state.move_by(4, 10);
        assert_eq!(state.selected(), Some(4));
        assert_eq!(state.offset, 2);

        state.move_by(-10, 10);
        assert_eq!(state.selected(), Some(0));
        assert_eq!(state.offset, 0);

        state.select_last(10);
        assert_eq!(state.selected(), Some(9));
        assert_eq!(state.offset, 7);
    }

    #[test]
    fn test_clamp_after_shrink() {
        let mut state = ScrollListState::new();
        state.selected = Some(8);
        state.offset = 6;

        state.clamp(3, 5);
        assert_eq!(state.selected(), Some(2));
        assert_eq!(state.offset, 0);

        state.clamp(0, 5);
        assert_eq!(state.selected(), None);
    }
}
