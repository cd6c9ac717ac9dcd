use serde::{Deserialize, Serialize};

use crate::model::Node;
use crate::transform::Mappable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub from: usize,
    pub to: usize,
}

impl SelectionRange {
    pub fn new(from: usize, to: usize) -> Self {
        Self {
            from: from.min(to),
            to: from.max(to),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

/// What the user has selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Selection {
    /// A text range; a cursor when `anchor == head`.
    Text { anchor: usize, head: usize },
    /// A single node spanning `from..to`.
    Node { from: usize, to: usize },
    /// Several ranges at once. Unlike a cursor, an all-empty set of ranges
    /// selects nothing.
    Ranges { ranges: Vec<SelectionRange> },
}

impl Default for Selection {
    fn default() -> Self {
        Selection::cursor(0)
    }
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Selection::Text {
            anchor: pos,
            head: pos,
        }
    }

    pub fn text(anchor: usize, head: usize) -> Self {
        Selection::Text { anchor, head }
    }

    /// Select the node starting at `pos`.
    pub fn node(doc: &Node, pos: usize) -> Option<Self> {
        let node = doc.node_at(pos).filter(|node| !node.is_text())?;
        Some(Selection::Node {
            from: pos,
            to: pos + node.node_size(),
        })
    }

    pub fn multi(ranges: Vec<SelectionRange>) -> Self {
        Selection::Ranges { ranges }
    }

    /// Selected ranges, in document order.
    pub fn ranges(&self) -> Vec<SelectionRange> {
        match self {
            Selection::Text { anchor, head } => vec![SelectionRange::new(*anchor, *head)],
            Selection::Node { from, to } => vec![SelectionRange::new(*from, *to)],
            Selection::Ranges { ranges } => {
                let mut sorted = ranges.clone();
                sorted.sort_by_key(|range| range.from);
                sorted
            }
        }
    }

    pub fn from(&self) -> usize {
        self.ranges().iter().map(|r| r.from).min().unwrap_or(0)
    }

    pub fn to(&self) -> usize {
        self.ranges().iter().map(|r| r.to).max().unwrap_or(0)
    }

    /// The cursor position, when the selection is a collapsed text
    /// selection.
    pub fn cursor_pos(&self) -> Option<usize> {
        match self {
            Selection::Text { anchor, head } if anchor == head => Some(*head),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges().iter().all(SelectionRange::is_empty)
    }

    /// Map through a change, landing on `doc`, the document after it.
    pub fn map(&self, doc: &Node, mapping: &impl Mappable) -> Selection {
        match self {
            Selection::Text { anchor, head } => {
                let head = mapping.map(*head, 1);
                if !in_textblock(doc, head) {
                    return Selection::near(doc, head);
                }
                let anchor = mapping.map(*anchor, 1);
                if in_textblock(doc, anchor) {
                    Selection::text(anchor, head)
                } else {
                    Selection::cursor(head)
                }
            }
            Selection::Node { from, .. } => {
                let mapped = mapping.map_result(*from, 1);
                if mapped.deleted {
                    return Selection::near(doc, mapped.pos);
                }
                Selection::node(doc, mapped.pos).unwrap_or_else(|| Selection::near(doc, mapped.pos))
            }
            Selection::Ranges { ranges } => Selection::multi(
                ranges
                    .iter()
                    .map(|range| {
                        let from = mapping.map(range.from, 1);
                        let to = mapping.map(range.to, -1);
                        SelectionRange::new(from, to.max(from))
                    })
                    .collect(),
            ),
        }
    }

    /// A cursor in the textblock nearest to `pos`, preferring one at or
    /// after it.
    pub fn near(doc: &Node, pos: usize) -> Selection {
        let pos = pos.min(doc.content_size());
        if in_textblock(doc, pos) {
            return Selection::cursor(pos);
        }
        let mut after = None;
        let mut before = None;
        doc.descendants(|node, node_pos| {
            if after.is_some() {
                return false;
            }
            if node.is_textblock() {
                let start = node_pos + 1;
                if start >= pos {
                    after = Some(start);
                } else {
                    before = Some(start + node.content_size());
                }
                return false;
            }
            true
        });
        Selection::cursor(after.or(before).unwrap_or(pos))
    }

    /// A cursor at the start of the document's first textblock.
    pub fn at_start(doc: &Node) -> Selection {
        Selection::near(doc, 0)
    }
}

fn in_textblock(doc: &Node, pos: usize) -> bool {
    doc.resolve(pos)
        .map(|rp| rp.parent().is_textblock())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::{doc, image, p, text};
    use crate::transform::StepMap;
    use pretty_assertions::assert_eq;

    #[test]
    fn ranges_are_normalized() {
        let sel = Selection::text(5, 2);
        assert_eq!(sel.ranges(), vec![SelectionRange { from: 2, to: 5 }]);
        assert_eq!((sel.from(), sel.to()), (2, 5));
        assert_eq!(sel.cursor_pos(), None);
    }

    #[test]
    fn empty_ranges_are_not_a_cursor() {
        let sel = Selection::multi(vec![SelectionRange::new(3, 3)]);
        assert!(sel.is_empty());
        assert_eq!(sel.cursor_pos(), None);
    }

    #[test]
    fn node_selection_spans_node() {
        let d = doc(vec![p(vec![text("a"), image("i1", "x")])]);
        assert_eq!(
            Selection::node(&d, 2),
            Some(Selection::Node { from: 2, to: 3 })
        );
        assert_eq!(Selection::node(&d, 1), None);
    }

    #[test]
    fn cursor_maps_after_insertion() {
        let d = doc(vec![p(vec![text("xxabc")])]);
        let sel = Selection::cursor(3).map(&d, &StepMap::new(1, 0, 2));
        assert_eq!(sel, Selection::cursor(5));
    }

    #[test]
    fn near_finds_following_textblock() {
        let d = doc(vec![p(vec![text("a")]), p(vec![text("b")])]);
        assert_eq!(Selection::near(&d, 3), Selection::cursor(4));
        assert_eq!(Selection::near(&d, 6), Selection::cursor(5));
        assert_eq!(Selection::at_start(&d), Selection::cursor(1));
    }
}
