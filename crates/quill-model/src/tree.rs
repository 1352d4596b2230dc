//! Ordered parent/child structure of a novel.

use indexmap::IndexMap;

use crate::id::{CH_ROOT, CR_ROOT, IT_ROOT, LC_ROOT, PL_ROOT, PN_ROOT};

/// Ordered adjacency over element IDs.
///
/// Roots for the six element families are present from the start; chapters
/// and plot lines additionally act as parents of their section and plot
/// point IDs.
#[derive(Clone, Debug)]
pub struct NovelTree {
    children: IndexMap<String, Vec<String>>,
}

impl NovelTree {
    pub fn new() -> Self {
        let mut children = IndexMap::new();
        for root in [CH_ROOT, PL_ROOT, CR_ROOT, LC_ROOT, IT_ROOT, PN_ROOT] {
            children.insert(root.to_string(), Vec::new());
        }
        Self { children }
    }

    /// Append `child` under `parent`, keeping insertion order.
    pub fn append(&mut self, parent: &str, child: impl Into<String>) {
        self.children
            .entry(parent.to_string())
            .or_default()
            .push(child.into());
    }

    /// Drop all children of `parent`. The parent entry itself stays.
    pub fn delete_children(&mut self, parent: &str) {
        if let Some(entries) = self.children.get_mut(parent) {
            entries.clear();
        }
    }

    /// The ordered children of `parent`; empty for unknown parents.
    pub fn children(&self, parent: &str) -> &[String] {
        self.children
            .get(parent)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl Default for NovelTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let mut tree = NovelTree::new();
        tree.append(CH_ROOT, "ch2");
        tree.append(CH_ROOT, "ch1");
        tree.append("ch2", "sc1");
        assert_eq!(tree.children(CH_ROOT), ["ch2", "ch1"]);
        assert_eq!(tree.children("ch2"), ["sc1"]);
        assert!(tree.children("ch9").is_empty());
    }

    #[test]
    fn delete_children_keeps_parent() {
        let mut tree = NovelTree::new();
        tree.append(LC_ROOT, "lc1");
        tree.delete_children(LC_ROOT);
        assert!(tree.children(LC_ROOT).is_empty());
    }
}
