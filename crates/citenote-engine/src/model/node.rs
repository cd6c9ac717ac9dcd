use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TransformError;

use super::{Attrs, Fragment, Mark, MarkType, NodeType, ResolvedPos};

#[derive(PartialEq)]
struct NodeData {
    node_type: NodeType,
    attrs: Attrs,
    content: Fragment,
    text: Option<String>,
    marks: Vec<Mark>,
    size: usize,
}

/// An immutable document node.
///
/// Cloning is cheap; unchanged subtrees are shared between document
/// versions and every edit rebuilds only the path to the changed node.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "NodeRepr", into = "NodeRepr")]
pub struct Node(Arc<NodeData>);

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl Node {
    pub fn new(node_type: NodeType, attrs: Attrs, content: impl Into<Fragment>) -> Self {
        Self::with_parts(node_type, attrs, content.into(), Vec::new())
    }

    pub fn new_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        let text = text.into();
        let size = text.chars().count();
        Node(Arc::new(NodeData {
            node_type: NodeType::Text,
            attrs: Attrs::default(),
            content: Fragment::empty(),
            text: Some(text),
            marks,
            size,
        }))
    }

    pub fn leaf(node_type: NodeType, attrs: Attrs) -> Self {
        Self::new(node_type, attrs, Fragment::empty())
    }

    fn with_parts(node_type: NodeType, attrs: Attrs, content: Fragment, marks: Vec<Mark>) -> Self {
        let size = if node_type.is_leaf() {
            1
        } else {
            content.size() + 2
        };
        Node(Arc::new(NodeData {
            node_type,
            attrs,
            content,
            text: None,
            marks,
            size,
        }))
    }

    pub fn node_type(&self) -> NodeType {
        self.0.node_type
    }

    pub fn attrs(&self) -> &Attrs {
        &self.0.attrs
    }

    pub fn content(&self) -> &Fragment {
        &self.0.content
    }

    pub fn text(&self) -> Option<&str> {
        self.0.text.as_deref()
    }

    pub fn marks(&self) -> &[Mark] {
        &self.0.marks
    }

    pub fn is_text(&self) -> bool {
        self.0.node_type == NodeType::Text
    }

    pub fn is_leaf(&self) -> bool {
        self.0.node_type.is_leaf()
    }

    pub fn is_inline(&self) -> bool {
        self.0.node_type.is_inline()
    }

    pub fn is_block(&self) -> bool {
        self.0.node_type.is_block()
    }

    pub fn is_textblock(&self) -> bool {
        self.0.node_type.is_textblock()
    }

    /// Size of the node in positions.
    pub fn node_size(&self) -> usize {
        self.0.size
    }

    pub fn content_size(&self) -> usize {
        self.0.content.size()
    }

    pub fn child_count(&self) -> usize {
        self.0.content.child_count()
    }

    pub fn child(&self, index: usize) -> &Node {
        self.0.content.child(index)
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.0.content.maybe_child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.0.content.first_child()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.0.content.last_child()
    }

    /// Copy with a different type and attribute record, keeping content.
    pub fn with_markup(&self, node_type: NodeType, attrs: Attrs) -> Node {
        if self.is_text() {
            return self.clone();
        }
        Self::with_parts(node_type, attrs, self.0.content.clone(), self.0.marks.clone())
    }

    pub fn with_content(&self, content: Fragment) -> Node {
        if self.is_text() {
            return self.clone();
        }
        Self::with_parts(
            self.node_type(),
            self.0.attrs.clone(),
            content,
            self.0.marks.clone(),
        )
    }

    pub fn with_marks(&self, marks: Vec<Mark>) -> Node {
        if let Some(text) = self.text() {
            return Node::new_text(text, marks);
        }
        Self::with_parts(
            self.node_type(),
            self.0.attrs.clone(),
            self.0.content.clone(),
            marks,
        )
    }

    /// The part of this node between two offsets into its content, or into
    /// its text for text nodes.
    pub fn cut(&self, from: usize, to: usize) -> Node {
        if let Some(text) = self.text() {
            if from == 0 && to >= self.node_size() {
                return self.clone();
            }
            let piece: String = text.chars().skip(from).take(to.saturating_sub(from)).collect();
            return Node::new_text(piece, self.0.marks.clone());
        }
        if self.is_leaf() || (from == 0 && to >= self.content_size()) {
            return self.clone();
        }
        self.with_content(self.0.content.cut(from, to))
    }

    /// Calls `f` with every descendant and its position relative to the
    /// start of this node's content. Returning `false` skips children.
    pub fn descendants<F>(&self, mut f: F)
    where
        F: FnMut(&Node, usize) -> bool,
    {
        self.0.content.nodes_between(0, self.content_size(), &mut f, 0);
    }

    /// Calls `f` with every descendant overlapping `from..to`.
    pub fn nodes_between<F>(&self, from: usize, to: usize, mut f: F)
    where
        F: FnMut(&Node, usize) -> bool,
    {
        self.0.content.nodes_between(from, to, &mut f, 0);
    }

    /// All text in the node, without separators.
    pub fn text_content(&self) -> String {
        if let Some(text) = self.text() {
            return text.to_string();
        }
        let mut out = String::new();
        self.descendants(|node, _| {
            if let Some(text) = node.text() {
                out.push_str(text);
            }
            true
        });
        out
    }

    /// Whether every markable inline node between the positions carries a
    /// mark of `mark_type`. False when the range holds no such node.
    pub fn range_fully_marked(&self, from: usize, to: usize, mark_type: MarkType) -> bool {
        let mut any = false;
        let mut all = true;
        if to > from {
            self.nodes_between(from, to, |node, _| {
                if node.is_textblock() && !node.node_type().allows_marks() {
                    return false;
                }
                if node.is_inline() {
                    any = true;
                    if mark_type.is_in_set(node.marks()).is_none() {
                        all = false;
                    }
                }
                all
            });
        }
        any && all
    }

    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, TransformError> {
        ResolvedPos::resolve(self, pos)
    }

    /// The node starting at `pos`, if any.
    pub fn node_at(&self, mut pos: usize) -> Option<&Node> {
        let mut node = self;
        loop {
            let (index, offset) = node.content().find_index(pos).ok()?;
            let child = node.maybe_child(index)?;
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    /// Replace the content between two positions sharing a parent with
    /// `slice`, rebuilding the path up to this node.
    pub fn replace(&self, from: usize, to: usize, slice: &Fragment) -> Result<Node, TransformError> {
        if to < from {
            return Err(TransformError::MismatchedParents { from, to });
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = rfrom.depth();
        if rto.depth() != depth || rfrom.start(depth) != rto.start(depth) {
            return Err(TransformError::MismatchedParents { from, to });
        }

        let parent = rfrom.parent();
        let start = rfrom.start(depth);
        let content = parent
            .content()
            .cut(0, from - start)
            .append(slice)
            .append(&parent.content().cut(to - start, parent.content_size()));
        if !parent.node_type().valid_content(&content) {
            return Err(TransformError::InvalidContent {
                parent: parent.node_type(),
            });
        }

        let mut node = parent.with_content(content);
        for d in (0..depth).rev() {
            let ancestor = rfrom.node(d);
            node = ancestor.with_content(ancestor.content().replace_child(rfrom.index(d), node));
        }
        Ok(node)
    }

    /// Rebuild every markable inline node overlapping `from..to` through
    /// `f`, splitting text nodes at the range edges.
    pub(crate) fn map_inline<F>(&self, from: usize, to: usize, f: &F) -> Node
    where
        F: Fn(&Node) -> Node,
    {
        self.with_content(map_inline_content(self, 0, from, to, f))
    }
}

fn map_inline_content<F>(parent: &Node, base: usize, from: usize, to: usize, f: &F) -> Fragment
where
    F: Fn(&Node) -> Node,
{
    let mut out = Vec::with_capacity(parent.child_count());
    let mut pos = base;
    for child in parent.content() {
        let end = pos + child.node_size();
        if end <= from || pos >= to {
            out.push(child.clone());
        } else if child.is_inline() {
            if !parent.node_type().allows_marks() {
                out.push(child.clone());
            } else if child.is_text() {
                let start = from.saturating_sub(pos);
                let stop = (to - pos).min(child.node_size());
                if start > 0 {
                    out.push(child.cut(0, start));
                }
                out.push(f(&child.cut(start, stop)));
                if stop < child.node_size() {
                    out.push(child.cut(stop, child.node_size()));
                }
            } else {
                out.push(f(child));
            }
        } else if child.is_leaf() {
            out.push(child.clone());
        } else {
            out.push(child.with_content(map_inline_content(child, pos + 1, from, to, f)));
        }
        pos = end;
    }
    Fragment::from_nodes(out)
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(text) = self.text() {
            for mark in self.marks() {
                write!(f, "{:?}(", mark.mark_type)?;
            }
            write!(f, "{text:?}")?;
            for _ in self.marks() {
                write!(f, ")")?;
            }
            return Ok(());
        }
        write!(f, "{:?}", self.node_type())?;
        if !self.attrs().is_default() {
            write!(f, "{:?}", self.attrs())?;
        }
        if self.child_count() > 0 {
            write!(f, "(")?;
            for (i, child) in self.content().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{child:?}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Serialized shape of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeRepr {
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default, skip_serializing_if = "Attrs::is_default")]
    attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    marks: Vec<Mark>,
}

impl From<Node> for NodeRepr {
    fn from(node: Node) -> Self {
        NodeRepr {
            node_type: node.node_type(),
            attrs: node.attrs().clone(),
            content: node.content().to_vec(),
            text: node.text().map(str::to_owned),
            marks: node.marks().to_vec(),
        }
    }
}

impl TryFrom<NodeRepr> for Node {
    type Error = TransformError;

    fn try_from(repr: NodeRepr) -> Result<Self, Self::Error> {
        if repr.node_type == NodeType::Text {
            let text = repr.text.ok_or(TransformError::MissingText)?;
            return Ok(Node::new_text(text, repr.marks));
        }
        let content = Fragment::from_nodes(repr.content);
        if !repr.node_type.valid_content(&content) {
            return Err(TransformError::InvalidContent {
                parent: repr.node_type,
            });
        }
        Ok(Node::with_parts(repr.node_type, repr.attrs, content, repr.marks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::{bold, doc, image, li, p, text, ul};
    use pretty_assertions::assert_eq;

    #[test]
    fn sizes_follow_position_model() {
        let d = doc(vec![p(vec![text("abc"), image("i1", "data:")])]);
        assert_eq!(d.child(0).node_size(), 6);
        assert_eq!(d.content_size(), 6);
    }

    #[test]
    fn descendants_report_positions() {
        let d = doc(vec![p(vec![text("ab")]), p(vec![image("i1", "x")])]);
        let mut seen = Vec::new();
        d.descendants(|node, pos| {
            seen.push((node.node_type(), pos));
            true
        });
        assert_eq!(
            seen,
            vec![
                (NodeType::Paragraph, 0),
                (NodeType::Text, 1),
                (NodeType::Paragraph, 4),
                (NodeType::Image, 5),
            ]
        );
    }

    #[test]
    fn node_at_finds_leaf_and_block() {
        let d = doc(vec![p(vec![text("ab")]), p(vec![image("i1", "x")])]);
        assert_eq!(d.node_at(4).map(Node::node_type), Some(NodeType::Paragraph));
        assert_eq!(d.node_at(5).map(Node::node_type), Some(NodeType::Image));
        assert_eq!(d.node_at(9), None);
    }

    #[test]
    fn replace_inside_text() {
        let d = doc(vec![p(vec![text("hello")])]);
        let out = d.replace(2, 4, &Fragment::from(vec![text("EY")])).unwrap();
        assert_eq!(out.text_content(), "hEYlo");
    }

    #[test]
    fn replace_across_parents_is_rejected() {
        let d = doc(vec![p(vec![text("one")]), p(vec![text("two")])]);
        assert_eq!(
            d.replace(2, 7, &Fragment::empty()),
            Err(TransformError::MismatchedParents { from: 2, to: 7 })
        );
    }

    #[test]
    fn replace_rejects_invalid_content() {
        let d = doc(vec![ul(vec![li(vec![p(vec![text("a")])])])]);
        let result = d.replace(1, 1, &Fragment::from(vec![p(vec![])]));
        assert_eq!(
            result,
            Err(TransformError::InvalidContent {
                parent: NodeType::BulletList
            })
        );
    }

    #[test]
    fn unchanged_siblings_are_shared() {
        let d = doc(vec![p(vec![text("one")]), p(vec![text("two")])]);
        let out = d.replace(1, 1, &Fragment::from(vec![text("X")])).unwrap();
        assert!(Arc::ptr_eq(&d.child(1).0, &out.child(1).0));
    }

    #[test]
    fn mark_queries() {
        let d = doc(vec![p(vec![bold("ab"), text("cd")])]);
        assert!(!d.range_fully_marked(1, 5, MarkType::Strong));
        assert!(d.range_fully_marked(1, 3, MarkType::Strong));
        assert!(!d.range_fully_marked(3, 5, MarkType::Strong));
    }

    #[test]
    fn json_round_trip_through_serde() {
        let d = doc(vec![p(vec![bold("ab"), image("i1", "data:x")])]);
        let json = serde_json::to_string(&d).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn text_nodes_require_text() {
        let result: Result<Node, _> = serde_json::from_str(r#"{"type":"text"}"#);
        assert!(result.is_err());
    }
}
