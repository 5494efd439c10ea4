//! Page navigation: ellipsis window, page bounds and a pager widget.

use crate::i18n::{keys, Translator};
use crate::store::page_count;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;
use std::ops::Range;

/// One slot of a pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerItem {
    Page { index: usize, active: bool },
    Ellipsis,
}

/// A request to show a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_index: usize,
    pub page_size: usize,
}

/// Pager slots for `page_index` of `page_count`:
/// `1 … i-1 [i] i+1 … n`, with the ellipses and neighbours present only
/// where they hide or show distinct pages.
pub fn pager_items(page_index: usize, page_count: usize) -> Vec<PagerItem> {
    let i = page_index;
    let n = page_count;
    let page = |index| PagerItem::Page {
        index,
        active: false,
    };
    let mut items = Vec::with_capacity(7);

    if i > 1 {
        items.push(page(1));
    }
    if i > 3 {
        items.push(PagerItem::Ellipsis);
    }
    if i > 2 {
        items.push(page(i - 1));
    }
    items.push(PagerItem::Page {
        index: i,
        active: true,
    });
    if n > i + 1 {
        items.push(page(i + 1));
    }
    if n > i + 2 {
        items.push(PagerItem::Ellipsis);
    }
    if i < n {
        items.push(page(n));
    }
    items
}

/// Item range of page `page_index` (one-based) in a collection of `total`.
pub fn page_bounds(page_index: usize, page_size: usize, total: usize) -> Range<usize> {
    let start = page_index.saturating_sub(1).saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);
    start..end
}

/// Pager position over a paged collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub page_index: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub total_count: usize,
}

impl Pager {
    pub fn new(page_index: usize, page_size: usize, total_count: usize) -> Self {
        Self {
            page_index,
            page_size,
            page_count: page_count(total_count, page_size),
            total_count,
        }
    }

    pub fn items(&self) -> Vec<PagerItem> {
        pager_items(self.page_index, self.page_count)
    }

    /// Request for page `index`, or `None` when it is out of range or
    /// already shown.
    pub fn go_to(&self, index: usize) -> Option<PageRequest> {
        let last = self.page_count.max(1);
        (index >= 1 && index <= last && index != self.page_index).then_some(PageRequest {
            page_index: index,
            page_size: self.page_size,
        })
    }

    pub fn next(&self) -> Option<PageRequest> {
        self.go_to(self.page_index + 1)
    }

    pub fn prev(&self) -> Option<PageRequest> {
        self.go_to(self.page_index.saturating_sub(1))
    }

    pub fn first(&self) -> Option<PageRequest> {
        self.go_to(1)
    }

    pub fn last(&self) -> Option<PageRequest> {
        self.go_to(self.page_count)
    }

    /// Request page one with a new size.
    pub fn resize(&self, page_size: usize) -> Option<PageRequest> {
        (page_size > 0 && page_size != self.page_size).then_some(PageRequest {
            page_index: 1,
            page_size,
        })
    }
}

/// One-line pager with an optional "total x rows" caption.
pub struct PagerView<'a> {
    pager: Pager,
    translator: Option<&'a dyn Translator>,
    style: Style,
    active_style: Style,
}

impl<'a> PagerView<'a> {
    pub fn new(pager: Pager) -> Self {
        Self {
            pager,
            translator: None,
            style: Style::default(),
            active_style: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        }
    }

    /// Show the total row count after the pages.
    pub fn translator(mut self, translator: &'a dyn Translator) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn active_style(mut self, style: Style) -> Self {
        self.active_style = style;
        self
    }

    fn line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        for item in self.pager.items() {
            match item {
                PagerItem::Page {
                    index,
                    active: true,
                } => spans.push(Span::styled(format!("[{index}]"), self.active_style)),
                PagerItem::Page { index, .. } => {
                    spans.push(Span::styled(format!(" {index} "), self.style))
                }
                PagerItem::Ellipsis => spans.push(Span::styled(" \u{2026} ", self.style)),
            }
        }
        if let Some(t) = self.translator {
            if self.pager.total_count > 0 {
                let total = self.pager.total_count.to_string();
                spans.push(Span::raw("  "));
                spans.push(Span::styled(
                    t.t(keys::TOTAL_X_ROWS, &[("totalCount", &total)]),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
        Line::from(spans)
    }
}

impl Widget for PagerView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        self.line().render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Catalog;
    use proptest::prelude::*;

    fn indices(items: &[PagerItem]) -> Vec<Option<usize>> {
        items
            .iter()
            .map(|item| match item {
                PagerItem::Page { index, .. } => Some(*index),
                PagerItem::Ellipsis => None,
            })
            .collect()
    }

    #[test]
    fn test_pager_window() {
        assert_eq!(indices(&pager_items(1, 1)), vec![Some(1)]);
        assert_eq!(
            indices(&pager_items(1, 5)),
            vec![Some(1), Some(2), None, Some(5)]
        );
        assert_eq!(
            indices(&pager_items(5, 10)),
            vec![Some(1), None, Some(4), Some(5), Some(6), None, Some(10)]
        );
        assert_eq!(
            indices(&pager_items(10, 10)),
            vec![Some(1), None, Some(9), Some(10)]
        );
        assert_eq!(indices(&pager_items(2, 3)), vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_navigation() {
        let pager = Pager::new(2, 10, 50);
        assert_eq!(pager.page_count, 5);
        assert_eq!(
            pager.next(),
            Some(PageRequest {
                page_index: 3,
                page_size: 10
            })
        );
        assert_eq!(pager.go_to(2), None);
        assert_eq!(pager.go_to(6), None);
        assert_eq!(pager.go_to(0), None);
        assert_eq!(Pager::new(5, 10, 50).next(), None);
        assert_eq!(pager.resize(20).map(|r| r.page_index), Some(1));
    }

    #[test]
    fn test_view_with_total() {
        let t = Catalog::en_us();
        let area = Rect::new(0, 0, 40, 1);
        let mut buf = Buffer::empty(area);
        PagerView::new(Pager::new(1, 10, 25))
            .translator(&t)
            .render(area, &mut buf);

        let text: String = (0..40).map(|x| buf[(x, 0)].symbol()).collect();
        assert_eq!(text.trim_end(), "[1] 2  3   Total 25 rows");
    }

    proptest! {
        #[test]
        fn prop_exactly_one_active_page(count in 1usize..200, offset in 0usize..200) {
            let index = offset % count + 1;
            let items = pager_items(index, count);
            let active: Vec<_> = items
                .iter()
                .filter(|item| matches!(item, PagerItem::Page { active: true, .. }))
                .collect();
            prop_assert_eq!(active.len(), 1);
            prop_assert!(items.len() <= 7);

            let pages: Vec<usize> = indices(&items).into_iter().flatten().collect();
            prop_assert!(pages.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(pages.first().copied(), Some(1));
            prop_assert_eq!(pages.last().copied(), Some(count));
        }

        #[test]
        fn prop_bounds_partition_the_collection(total in 0usize..500, size in 1usize..50) {
            let count = page_count(total, size);
            let mut covered = 0;
            for index in 1..=count {
                let range = page_bounds(index, size, total);
                prop_assert_eq!(range.start, covered);
                prop_assert!(range.len() <= size);
                prop_assert!(!range.is_empty());
                covered = range.end;
            }
            prop_assert_eq!(covered, total);
            prop_assert!(page_bounds(count + 1, size, total).is_empty());
        }
    }
}
