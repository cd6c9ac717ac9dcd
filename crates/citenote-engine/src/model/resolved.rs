use crate::error::TransformError;

use super::{Mark, Node};

#[derive(Debug, Clone)]
struct Level {
    node: Node,
    index: usize,
    /// Offset of the child at `index` within `node`'s content
    offset: usize,
    /// Absolute position where `node`'s content starts
    start: usize,
}

/// A position resolved against a document: the chain of ancestors
/// containing it and the child index at each level.
#[derive(Debug, Clone)]
pub struct ResolvedPos {
    pos: usize,
    levels: Vec<Level>,
    parent_offset: usize,
}

impl ResolvedPos {
    pub(crate) fn resolve(doc: &Node, pos: usize) -> Result<Self, TransformError> {
        if pos > doc.content_size() {
            return Err(TransformError::PositionOutOfRange {
                pos,
                size: doc.content_size(),
            });
        }
        let mut levels = Vec::new();
        let mut node = doc.clone();
        let mut start = 0;
        let mut parent_offset = pos;
        loop {
            let (index, offset) = node.content().find_index(parent_offset)?;
            let rem = parent_offset - offset;
            levels.push(Level {
                node: node.clone(),
                index,
                offset,
                start,
            });
            if rem == 0 {
                break;
            }
            let child = node.child(index).clone();
            if child.is_leaf() {
                break;
            }
            start += offset + 1;
            parent_offset = rem - 1;
            node = child;
        }
        Ok(Self {
            pos,
            levels,
            parent_offset,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Number of ancestors above the innermost parent; the document is 0.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn node(&self, depth: usize) -> &Node {
        &self.levels[depth].node
    }

    pub fn parent(&self) -> &Node {
        self.node(self.depth())
    }

    pub fn doc(&self) -> &Node {
        self.node(0)
    }

    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// Index into the ancestor at `depth`.
    pub fn index(&self, depth: usize) -> usize {
        self.levels[depth].index
    }

    pub fn index_after(&self, depth: usize) -> usize {
        let at_boundary = depth == self.depth() && self.text_offset() == 0;
        self.index(depth) + if at_boundary { 0 } else { 1 }
    }

    /// Position where the content of the ancestor at `depth` starts.
    pub fn start(&self, depth: usize) -> usize {
        self.levels[depth].start
    }

    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position before the ancestor at `depth`. `depth + 1` past the
    /// innermost parent means this position itself.
    pub fn before(&self, depth: usize) -> usize {
        if depth == self.depth() + 1 {
            return self.pos;
        }
        self.start(depth).saturating_sub(1)
    }

    pub fn after(&self, depth: usize) -> usize {
        if depth == self.depth() + 1 {
            return self.pos;
        }
        self.before(depth) + self.node(depth).node_size()
    }

    /// Offset into the text node the position points into, 0 on a
    /// boundary.
    pub fn text_offset(&self) -> usize {
        let last = &self.levels[self.depth()];
        self.parent_offset - last.offset
    }

    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.maybe_child(index)?;
        let offset = self.text_offset();
        if offset > 0 {
            Some(child.cut(offset, child.node_size()))
        } else {
            Some(child.clone())
        }
    }

    pub fn node_before(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let offset = self.text_offset();
        if offset > 0 {
            return Some(parent.child(index).cut(0, offset));
        }
        if index == 0 {
            None
        } else {
            parent.maybe_child(index - 1).cloned()
        }
    }

    /// Marks that text inserted here would carry.
    pub fn marks(&self) -> Vec<Mark> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if parent.content_size() == 0 {
            return Vec::new();
        }
        if self.text_offset() > 0 {
            return parent.child(index).marks().to_vec();
        }
        let before = index.checked_sub(1).and_then(|i| parent.maybe_child(i));
        let after = parent.maybe_child(index);
        let (main, other) = match (before, after) {
            (Some(before), after) => (before, after),
            (None, Some(after)) => (after, None),
            (None, None) => return Vec::new(),
        };
        main.marks()
            .iter()
            .filter(|mark| {
                mark.mark_type.is_inclusive()
                    || other.is_some_and(|other| mark.is_in_set(other.marks()))
            })
            .cloned()
            .collect()
    }

    /// Deepest depth whose node contains both this position and `pos`.
    pub fn shared_depth(&self, pos: usize) -> usize {
        (0..=self.depth())
            .rev()
            .find(|&d| self.start(d) <= pos && self.end(d) >= pos)
            .unwrap_or(0)
    }

    /// Innermost ancestor depth for which `pred` holds.
    pub fn find_ancestor(&self, pred: impl Fn(&Node) -> bool) -> Option<usize> {
        (0..=self.depth()).rev().find(|&d| pred(self.node(d)))
    }

    /// The range of sibling blocks around this position and `other`, at the
    /// innermost depth whose node passes `pred`.
    pub fn block_range(&self, other: &ResolvedPos, pred: impl Fn(&Node) -> bool) -> Option<NodeRange> {
        if other.pos < self.pos {
            return other.block_range(self, pred);
        }
        let skip = if self.parent().is_textblock() || self.pos == other.pos {
            1
        } else {
            0
        };
        let top = self.depth().checked_sub(skip)?;
        (0..=top)
            .rev()
            .find(|&d| other.pos <= self.end(d) && pred(self.node(d)))
            .map(|depth| NodeRange {
                depth,
                start: self.before(depth + 1),
                end: other.after(depth + 1),
                start_index: self.index(depth),
                end_index: other.index_after(depth),
                parent: self.node(depth).clone(),
            })
    }
}

/// A flat run of siblings inside `parent`.
#[derive(Debug, Clone)]
pub struct NodeRange {
    pub depth: usize,
    /// Position before the first sibling
    pub start: usize,
    /// Position after the last sibling
    pub end: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub parent: Node,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeType;
    use crate::model::build::{bold, doc, li, p, text, ul};
    use pretty_assertions::assert_eq;

    fn list_doc() -> Node {
        // 0 ul 1 li 2 p 3 "ab" 5 /p 6 /li 7 li 8 p 9 "cd" 11 /p 12 /li 13 /ul 14
        doc(vec![ul(vec![
            li(vec![p(vec![text("ab")])]),
            li(vec![p(vec![text("cd")])]),
        ])])
    }

    #[test]
    fn resolves_into_nested_text() {
        let d = list_doc();
        let rp = d.resolve(10).unwrap();
        assert_eq!(rp.depth(), 3);
        assert_eq!(rp.parent().node_type(), NodeType::Paragraph);
        assert_eq!(rp.start(3), 9);
        assert_eq!(rp.end(3), 11);
        assert_eq!(rp.before(1), 0);
        assert_eq!(rp.after(2), 13);
        assert_eq!(rp.index(1), 1);
        assert_eq!(rp.text_offset(), 1);
    }

    #[test]
    fn boundary_positions() {
        let d = list_doc();
        let rp = d.resolve(7).unwrap();
        assert_eq!(rp.depth(), 1);
        assert_eq!(rp.index(1), 1);
        assert_eq!(rp.node_before().map(|n| n.node_type()), Some(NodeType::ListItem));
        assert!(d.resolve(15).is_err());
    }

    #[test]
    fn block_range_within_list() {
        let d = list_doc();
        let from = d.resolve(3).unwrap();
        let to = d.resolve(10).unwrap();
        let range = from.block_range(&to, |_| true).unwrap();
        assert_eq!(range.parent.node_type(), NodeType::BulletList);
        assert_eq!((range.start, range.end), (1, 13));
        assert_eq!((range.start_index, range.end_index), (0, 2));
    }

    #[test]
    fn block_range_for_cursor_is_the_textblock() {
        let d = list_doc();
        let at = d.resolve(3).unwrap();
        let range = at.block_range(&at, |_| true).unwrap();
        assert_eq!(range.parent.node_type(), NodeType::ListItem);
        assert_eq!((range.start, range.end), (2, 6));
    }

    #[test]
    fn marks_continue_from_preceding_text() {
        let d = doc(vec![p(vec![bold("ab"), text("cd")])]);
        let rp = d.resolve(3).unwrap();
        assert_eq!(rp.marks().len(), 1);
        let rp = d.resolve(5).unwrap();
        assert!(rp.marks().is_empty());
    }

    #[test]
    fn shared_depth_of_siblings() {
        let d = list_doc();
        let rp = d.resolve(3).unwrap();
        assert_eq!(rp.shared_depth(10), 1);
        assert_eq!(rp.shared_depth(4), 3);
    }
}
