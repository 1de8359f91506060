//! Document outline (table of contents) tree.

use serde::{Deserialize, Serialize};

use crate::engine::{OutlineEntry, OutlineGraph};

/// One node of a table-of-contents tree.
///
/// The root returned by [`Document::outline`](crate::Document::outline) is a
/// synthetic node with an empty title; the document's top-level entries are
/// its children. Each node owns its children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    title: String,
    link: Option<String>,
    is_open: bool,
    children: Vec<Outline>,
}

impl Outline {
    /// Create an empty node, used as the synthetic root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node with a title and optional link.
    pub fn with_title(title: impl Into<String>, link: Option<String>) -> Self {
        Self {
            title: title.into(),
            link,
            ..Self::default()
        }
    }

    /// Copy title and link from an engine outline entry.
    pub fn from_entry(entry: &OutlineEntry) -> Self {
        Self {
            title: entry.title.clone().unwrap_or_default(),
            link: entry.uri.clone(),
            is_open: entry.is_open,
            children: Vec::new(),
        }
    }

    /// Build a tree from an engine graph, under a synthetic root.
    pub fn from_graph(graph: &OutlineGraph) -> Self {
        let mut root = Outline::new();
        root.is_open = true;
        convert_siblings(graph, graph.first, &mut root);
        root
    }

    /// Append a child, taking ownership of it.
    pub fn append_child(&mut self, child: Outline) {
        self.children.push(child);
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Link target as a URI. Internal targets look like `#page=3`.
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    /// Whether the entry is shown expanded.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn children(&self) -> &[Outline] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Zero-based page index for `#page=N` links.
    pub fn page_target(&self) -> Option<usize> {
        let link = self.link.as_deref()?;
        let number: usize = link.strip_prefix("#page=")?.split('&').next()?.parse().ok()?;
        number.checked_sub(1)
    }

    /// Number of nodes below this one.
    pub fn total_items(&self) -> usize {
        self.children.iter().map(|c| 1 + c.total_items()).sum()
    }

    /// Levels of nesting below this node; 0 for a leaf.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.depth())
            .max()
            .unwrap_or(0)
    }

    /// Pre-order walk of all descendants with their level (top level is 0).
    pub fn iter(&self) -> OutlineIter<'_> {
        OutlineIter {
            stack: self.children.iter().rev().map(|c| (0, c)).collect(),
        }
    }
}

/// Pre-order iterator returned by [`Outline::iter`].
pub struct OutlineIter<'a> {
    stack: Vec<(usize, &'a Outline)>,
}

impl<'a> Iterator for OutlineIter<'a> {
    type Item = (usize, &'a Outline);

    fn next(&mut self) -> Option<Self::Item> {
        let (level, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|c| (level + 1, c)));
        Some((level, node))
    }
}

fn convert_siblings(graph: &OutlineGraph, first: Option<usize>, parent: &mut Outline) {
    for (_, entry) in graph.siblings(first) {
        let mut child = Outline::from_entry(entry);
        convert_siblings(graph, entry.down, &mut child);
        parent.append_child(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, next: Option<usize>, down: Option<usize>) -> OutlineEntry {
        OutlineEntry {
            title: Some(title.to_string()),
            uri: None,
            is_open: false,
            next,
            down,
        }
    }

    #[test]
    fn test_from_graph_keeps_order_and_nesting() {
        // Part 1 -> [1.1 -> [1.1.1], 1.2], Part 2
        let graph = OutlineGraph {
            entries: vec![
                entry("Part 1", Some(4), Some(1)),
                entry("1.1", Some(3), Some(2)),
                entry("1.1.1", None, None),
                entry("1.2", None, None),
                entry("Part 2", None, None),
            ],
            first: Some(0),
        };

        let root = Outline::from_graph(&graph);
        assert_eq!(root.title(), "");
        assert_eq!(root.total_items(), 5);
        assert_eq!(root.depth(), 3);

        let walk: Vec<_> = root.iter().map(|(l, o)| (l, o.title().to_string())).collect();
        assert_eq!(
            walk,
            vec![
                (0, "Part 1".to_string()),
                (1, "1.1".to_string()),
                (2, "1.1.1".to_string()),
                (1, "1.2".to_string()),
                (0, "Part 2".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_title_becomes_empty() {
        let node = Outline::from_entry(&OutlineEntry {
            title: None,
            uri: Some("https://example.com".to_string()),
            ..Default::default()
        });
        assert_eq!(node.title(), "");
        assert_eq!(node.link(), Some("https://example.com"));
        assert_eq!(node.page_target(), None);
    }

    #[test]
    fn test_page_target() {
        let node = Outline::with_title("Intro", Some("#page=3".to_string()));
        assert_eq!(node.page_target(), Some(2));

        let node = Outline::with_title("Zoomed", Some("#page=1&zoom=100".to_string()));
        assert_eq!(node.page_target(), Some(0));

        let node = Outline::with_title("Bad", Some("#page=0".to_string()));
        assert_eq!(node.page_target(), None);
    }

    #[test]
    fn test_append_child() {
        let mut root = Outline::new();
        let mut chapter = Outline::with_title("Chapter 1", None);
        chapter.append_child(Outline::with_title("Section 1.1", None));
        root.append_child(chapter);

        assert_eq!(root.children().len(), 1);
        assert_eq!(root.children()[0].children()[0].title(), "Section 1.1");
        assert_eq!(root.total_items(), 2);
    }

    #[test]
    fn test_serializes_to_json() {
        let mut root = Outline::new();
        root.append_child(Outline::with_title("A", Some("#page=1".to_string())));
        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["children"][0]["title"], "A");
        assert_eq!(json["children"][0]["link"], "#page=1");
    }
}
