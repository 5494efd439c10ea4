use super::{ListAction, ScrollList, ScrollListState};
use crate::boundary::Scrollport;
use crate::i18n::{Catalog, Translator};
use crate::store::PagedStore;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect, Size};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, StatefulWidget, Widget};

/// Renders a [`ScrollList`]'s accumulated items followed by its status line.
///
/// Rendering reports the scroll geometry back to the list, which is what
/// triggers loading the next page.
pub struct ScrollListView<'a, S: PagedStore, F> {
    list: &'a ScrollList<S>,
    render_item: F,
    translator: Option<&'a dyn Translator>,
    block: Option<Block<'a>>,
    highlight_style: Style,
}

impl<'a, S, F> ScrollListView<'a, S, F>
where
    S: PagedStore,
    F: Fn(&S::Item, bool) -> Line<'static>,
{
    /// `render_item` gets each item and whether it is under the cursor.
    pub fn new(list: &'a ScrollList<S>, render_item: F) -> Self {
        Self {
            list,
            render_item,
            translator: None,
            block: None,
            highlight_style: Style::default().bg(Color::Blue).fg(Color::White),
        }
    }

    pub fn translator(mut self, translator: &'a dyn Translator) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn highlight_style(mut self, style: Style) -> Self {
        self.highlight_style = style;
        self
    }
}

impl<S, F> StatefulWidget for ScrollListView<'_, S, F>
where
    S: PagedStore,
    F: Fn(&S::Item, bool) -> Line<'static>,
{
    type State = ScrollListState;

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

        let items = self.list.store().state().all_items.clone();
        let footer = match self.translator {
            Some(t) => self.list.footer(t),
            None => self.list.footer(&Catalog::en_us()),
        };

        let height = inner.height as usize;
        state.clamp(items.len(), height);

        for row in 0..height {
            let index = state.offset + row;
            let y = inner.y + row as u16;
            let line_area = Rect::new(inner.x, y, inner.width, 1);

            if let Some(item) = items.get(index) {
                let selected = state.selected == Some(index);
                let line = (self.render_item)(item, selected);
                if selected {
                    buf.set_style(line_area, self.highlight_style);
                }
                buf.set_line(inner.x, y, &line, inner.width);
            } else if index == items.len() {
                let style = Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC);
                Line::styled(footer.clone(), style)
                    .centered()
                    .render(line_area, buf);
            } else {
                break;
            }
        }

        let content_rows = u16::try_from(items.len() + 1).unwrap_or(u16::MAX);
        let offset = u16::try_from(state.offset).unwrap_or(u16::MAX);
        self.list.on_scroll(&Scrollport::new(
            Size::new(inner.width, content_rows),
            Size::new(inner.width, inner.height),
            Position::new(0, offset),
        ));
    }
}

impl<S: PagedStore> ScrollList<S> {
    /// Handle a key event.
    pub fn handle_key(&self, key: KeyEvent, state: &mut ScrollListState) -> Option<ListAction> {
        let len = self.store().state().all_items.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => state.move_by(-1, len),
            KeyCode::Down | KeyCode::Char('j') => state.move_by(1, len),
            KeyCode::PageUp => state.move_by(-state.page(), len),
            KeyCode::PageDown => state.move_by(state.page(), len),
            KeyCode::Home => state.select_first(len),
            KeyCode::End => state.select_last(len),
            KeyCode::Enter => return state.selected.map(ListAction::Activated),
            _ => return None,
        }
        Some(ListAction::Moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ListModel, MemoryBackend};
    use crossterm::event::KeyModifiers;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Item {
        id: u32,
        label: String,
    }

    fn list(n: u32) -> ScrollList<ListModel<MemoryBackend<Item>>> {
        let records = (1..=n).map(|id| Item {
            id,
            label: format!("item {id}"),
        });
        let backend = MemoryBackend::with_records("id", records).unwrap();
        ScrollList::new(Arc::new(ListModel::new(backend, "id").page_size(5)))
    }

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test(start_paused = true)]
    async fn test_renders_items_and_footer() {
        let list = list(7);
        list.boot().await.unwrap();

        let area = Rect::new(0, 0, 20, 8);
        let mut buf = Buffer::empty(area);
        let mut state = ScrollListState::new();
        ScrollListView::new(&list, |item: &Item, _| Line::from(item.label.clone()))
            .render(area, &mut buf, &mut state);

        assert_eq!(row(&buf, 0), "item 1");
        assert_eq!(row(&buf, 4), "item 5");
        assert_eq!(row(&buf, 5).trim(), "Load more");
        assert_eq!(row(&buf, 6), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_at_bottom_pages_in() {
        let list = list(7);
        list.mount().await.unwrap().unwrap();

        let area = Rect::new(0, 0, 20, 8);
        let mut buf = Buffer::empty(area);
        let mut state = ScrollListState::new();
        ScrollListView::new(&list, |item: &Item, _| Line::from(item.label.clone()))
            .render(area, &mut buf, &mut state);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(list.store().state().all_items.len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys() {
        let list = list(7);
        list.boot().await.unwrap();
        let mut state = ScrollListState::new();

        assert_eq!(list.handle_key(key(KeyCode::Enter), &mut state), None);
        assert_eq!(
            list.handle_key(key(KeyCode::Down), &mut state),
            Some(ListAction::Moved)
        );
        list.handle_key(key(KeyCode::End), &mut state);
        assert_eq!(
            list.handle_key(key(KeyCode::Enter), &mut state),
            Some(ListAction::Activated(4))
        );
        assert_eq!(list.handle_key(key(KeyCode::Char('x')), &mut state), None);
    }
}
