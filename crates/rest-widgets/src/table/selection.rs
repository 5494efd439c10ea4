//! Checked rows of a ResourceTable.

use crate::store::IdType;
use std::collections::HashSet;

/// State of the head check box over the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadCheck {
    Unchecked,
    /// Some, but not all, rows of the page are checked
    Partial,
    Checked,
}

impl HeadCheck {
    pub fn mark(self) -> &'static str {
        match self {
            Self::Unchecked => "[ ]",
            Self::Partial => "[-]",
            Self::Checked => "[x]",
        }
    }
}

/// Set of checked record keys.
///
/// Paging does not touch the set; only user actions change it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckedKeys(HashSet<IdType>);

impl CheckedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flip one key. Returns whether it is now checked.
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.0.remove(key) {
            false
        } else {
            self.0.insert(key.to_string());
            true
        }
    }

    /// Clear a non-empty set; otherwise check every key of `page`.
    pub fn toggle_all(&mut self, page: &[IdType]) {
        if self.0.is_empty() {
            self.0.extend(page.iter().cloned());
        } else {
            self.0.clear();
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.0.remove(key)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Checked keys: those on `page` in page order, then the rest sorted.
    pub fn ordered(&self, page: &[IdType]) -> Vec<IdType> {
        let mut keys: Vec<IdType> = page.iter().filter(|k| self.contains(k)).cloned().collect();
        let mut rest: Vec<IdType> = self
            .0
            .iter()
            .filter(|k| !page.contains(k))
            .cloned()
            .collect();
        rest.sort();
        keys.extend(rest);
        keys
    }

    /// Head check box for `page`.
    pub fn head(&self, page: &[IdType]) -> HeadCheck {
        let on_page = page.iter().filter(|k| self.contains(k)).count();
        if !page.is_empty() && on_page == page.len() {
            HeadCheck::Checked
        } else if on_page > 0 {
            HeadCheck::Partial
        } else {
            HeadCheck::Unchecked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(ids: &[&str]) -> Vec<IdType> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_toggle() {
        let mut checked = CheckedKeys::new();
        assert!(checked.toggle("a"));
        assert!(checked.contains("a"));
        assert!(!checked.toggle("a"));
        assert!(checked.is_empty());
    }

    #[test]
    fn test_toggle_all_scoped_to_page() {
        let page = keys(&["11", "12", "13"]);
        let mut checked = CheckedKeys::new();

        checked.toggle_all(&page);
        assert_eq!(checked.len(), 3);
        assert_eq!(checked.head(&page), HeadCheck::Checked);

        checked.toggle_all(&page);
        assert!(checked.is_empty());

        // a non-empty set is cleared, not extended
        checked.toggle("1");
        checked.toggle_all(&page);
        assert!(checked.is_empty());
    }

    #[test]
    fn test_head_states() {
        let page = keys(&["a", "b"]);
        let mut checked = CheckedKeys::new();
        assert_eq!(checked.head(&page), HeadCheck::Unchecked);
        assert_eq!(checked.head(&[]), HeadCheck::Unchecked);

        checked.toggle("b");
        assert_eq!(checked.head(&page), HeadCheck::Partial);
        assert_eq!(HeadCheck::Partial.mark(), "[-]");
    }

    #[test]
    fn test_ordered() {
        let mut checked = CheckedKeys::new();
        for key in ["z", "c", "a", "x"] {
            checked.toggle(key);
        }
        assert_eq!(checked.ordered(&keys(&["c", "b", "a"])), keys(&["c", "a", "x", "z"]));
    }
}
