//! Edge detection for scrolled content.
//!
//! A [`ScrollBoundary`] watches the four edges of some content inside a
//! scrollport and reports an edge the first time it comes within
//! `margin` cells of the visible area. It reports again only after the edge
//! has left and re-entered.

use ratatui::layout::{Position, Size};
use std::collections::HashSet;
use std::fmt;

/// One edge of the watched content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgePosition {
    Top,
    Right,
    Bottom,
    Left,
}

impl EdgePosition {
    /// All four edges.
    pub const ALL: [EdgePosition; 4] = [Self::Top, Self::Right, Self::Bottom, Self::Left];
}

/// How a container treats content larger than itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Auto,
    Scroll,
}

impl Overflow {
    /// Whether a container with this overflow scrolls its content.
    pub fn scrolls(self) -> bool {
        matches!(self, Self::Auto | Self::Scroll)
    }
}

/// An ancestor container of the watched content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollFrame {
    pub overflow: Overflow,
    pub viewport: Size,
    pub offset: Position,
}

/// Content size, visible area and scroll offset, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scrollport {
    pub content: Size,
    pub viewport: Size,
    pub offset: Position,
}

impl Scrollport {
    pub fn new(content: Size, viewport: Size, offset: Position) -> Self {
        Self {
            content,
            viewport,
            offset,
        }
    }

    /// Scrollport for `content` given its ancestors, innermost first.
    ///
    /// The nearest ancestor that scrolls is the intersection root. Without
    /// one the whole screen is, unscrolled.
    pub fn resolve(content: Size, ancestors: &[ScrollFrame], screen: Size) -> Self {
        match ancestors.iter().find(|frame| frame.overflow.scrolls()) {
            Some(frame) => Self::new(content, frame.viewport, frame.offset),
            None => Self::new(content, screen, Position::ORIGIN),
        }
    }

    /// Whether `edge` of the content lies within `margin` cells of the
    /// visible area.
    pub fn touches(&self, edge: EdgePosition, margin: u16) -> bool {
        let margin = u32::from(margin);
        let (x, y) = (u32::from(self.offset.x), u32::from(self.offset.y));
        match edge {
            EdgePosition::Top => y <= margin,
            EdgePosition::Left => x <= margin,
            EdgePosition::Bottom => {
                y + u32::from(self.viewport.height) + margin >= u32::from(self.content.height)
            }
            EdgePosition::Right => {
                x + u32::from(self.viewport.width) + margin >= u32::from(self.content.width)
            }
        }
    }
}

type TouchHandler = Box<dyn Fn(EdgePosition) + Send + Sync>;

/// Reports edges entering the visible area, once per entry.
pub struct ScrollBoundary {
    edges: Vec<EdgePosition>,
    margin: u16,
    touching: HashSet<EdgePosition>,
    on_touch: Option<TouchHandler>,
    mounted: bool,
}

impl fmt::Debug for ScrollBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollBoundary")
            .field("edges", &self.edges)
            .field("margin", &self.margin)
            .field("touching", &self.touching)
            .field("mounted", &self.mounted)
            .finish()
    }
}

impl Default for ScrollBoundary {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollBoundary {
    /// Watch all four edges with a two-cell margin.
    pub fn new() -> Self {
        Self {
            edges: EdgePosition::ALL.to_vec(),
            margin: 2,
            touching: HashSet::new(),
            on_touch: None,
            mounted: false,
        }
    }

    /// Watch only these edges.
    pub fn edges(mut self, edges: impl IntoIterator<Item = EdgePosition>) -> Self {
        self.edges = edges.into_iter().collect();
        self
    }

    /// Distance in cells at which an edge counts as touched.
    pub fn margin(mut self, margin: u16) -> Self {
        self.margin = margin;
        self
    }

    /// Call `f` for every touch, in addition to returning it from
    /// [`observe`](Self::observe).
    pub fn on_touch(mut self, f: impl Fn(EdgePosition) + Send + Sync + 'static) -> Self {
        self.on_touch = Some(Box::new(f));
        self
    }

    /// Start watching. Every watched edge starts armed.
    pub fn mount(&mut self) {
        self.mounted = true;
        self.touching.clear();
    }

    /// Stop watching and release the touch handler.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.touching.clear();
        self.on_touch = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Feed the latest scroll geometry; returns the edges that were touched
    /// by this change.
    pub fn observe(&mut self, port: &Scrollport) -> Vec<EdgePosition> {
        if !self.mounted {
            return Vec::new();
        }

        let mut fired = Vec::new();
        for &edge in &self.edges {
            if port.touches(edge, self.margin) {
                if self.touching.insert(edge) {
                    fired.push(edge);
                }
            } else {
                self.touching.remove(&edge);
            }
        }

        if let Some(handler) = &self.on_touch {
            for &edge in &fired {
                handler(edge);
            }
        }
        fired
    }
}
