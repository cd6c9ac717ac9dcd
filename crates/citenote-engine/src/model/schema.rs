use serde::{Deserialize, Serialize};

use super::Fragment;

/// Node types known to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Doc,
    Paragraph,
    Heading,
    Blockquote,
    BulletList,
    OrderedList,
    ListItem,
    CodeBlock,
    Image,
    Citation,
    Text,
    HardBreak,
}

/// Attribute capabilities a node type may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Supports the `align` attribute
    Align,
    /// Supports the `dir` attribute
    Dir,
    /// Supports the `indent` attribute
    Indent,
    /// Carries a stable `node_id` for external correlation
    NodeId,
}

/// What a node type may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentExpr {
    /// Block nodes
    Blocks,
    /// Inline nodes (text, images, citations, breaks), marks allowed
    Inline,
    /// Unmarked text only
    PlainText,
    /// One or more list items
    ListItems,
    /// A paragraph followed by any blocks
    ItemBlocks,
    /// Leaf
    Empty,
}

/// Static description of a node type.
#[derive(Debug, Clone, Copy)]
pub struct NodeSpec {
    pub content: ContentExpr,
    pub inline: bool,
    pub capabilities: &'static [Capability],
}

const NONE: &[Capability] = &[];
const BLOCK_TEXT: &[Capability] = &[Capability::Align, Capability::Dir, Capability::Indent];
const DIR_ONLY: &[Capability] = &[Capability::Dir];
const NODE_ID: &[Capability] = &[Capability::NodeId];

impl NodeType {
    pub fn spec(self) -> NodeSpec {
        use ContentExpr::*;
        let (content, inline, capabilities) = match self {
            NodeType::Doc => (Blocks, false, NONE),
            NodeType::Paragraph | NodeType::Heading => (Inline, false, BLOCK_TEXT),
            NodeType::Blockquote => (Blocks, false, DIR_ONLY),
            NodeType::BulletList | NodeType::OrderedList => (ListItems, false, DIR_ONLY),
            NodeType::ListItem => (ItemBlocks, false, DIR_ONLY),
            NodeType::CodeBlock => (PlainText, false, NONE),
            NodeType::Image | NodeType::Citation => (Empty, true, NODE_ID),
            NodeType::Text | NodeType::HardBreak => (Empty, true, NONE),
        };
        NodeSpec {
            content,
            inline,
            capabilities,
        }
    }

    pub fn supports(self, capability: Capability) -> bool {
        self.spec().capabilities.contains(&capability)
    }

    pub fn is_inline(self) -> bool {
        self.spec().inline
    }

    pub fn is_block(self) -> bool {
        !self.is_inline() && self != NodeType::Doc
    }

    /// Blocks whose children are inline content.
    pub fn is_textblock(self) -> bool {
        matches!(self.spec().content, ContentExpr::Inline | ContentExpr::PlainText)
    }

    pub fn is_leaf(self) -> bool {
        self.spec().content == ContentExpr::Empty
    }

    pub fn is_list(self) -> bool {
        matches!(self, NodeType::BulletList | NodeType::OrderedList)
    }

    pub fn allows_marks(self) -> bool {
        self.spec().content == ContentExpr::Inline
    }

    /// Whether a single child of type `child` may appear in this node.
    pub fn accepts(self, child: NodeType) -> bool {
        match self.spec().content {
            ContentExpr::Blocks | ContentExpr::ItemBlocks => {
                child.is_block() && child != NodeType::ListItem
            }
            ContentExpr::Inline => child.is_inline(),
            ContentExpr::PlainText => child == NodeType::Text,
            ContentExpr::ListItems => child == NodeType::ListItem,
            ContentExpr::Empty => false,
        }
    }

    /// Whether `content` is a valid complete content sequence for this type.
    pub fn valid_content(self, content: &Fragment) -> bool {
        if !content.iter().all(|child| self.accepts(child.node_type())) {
            return false;
        }
        match self.spec().content {
            ContentExpr::ListItems => content.child_count() > 0,
            ContentExpr::ItemBlocks => content
                .first_child()
                .is_some_and(|first| first.node_type() == NodeType::Paragraph),
            ContentExpr::PlainText => content.iter().all(|child| child.marks().is_empty()),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::{image, li, p, text};
    use rstest::rstest;

    #[rstest]
    #[case(NodeType::Paragraph, Capability::Align, true)]
    #[case(NodeType::Heading, Capability::Indent, true)]
    #[case(NodeType::BulletList, Capability::Align, false)]
    #[case(NodeType::BulletList, Capability::Dir, true)]
    #[case(NodeType::CodeBlock, Capability::Align, false)]
    #[case(NodeType::Image, Capability::NodeId, true)]
    #[case(NodeType::Citation, Capability::NodeId, true)]
    #[case(NodeType::Text, Capability::Dir, false)]
    fn capability_table(
        #[case] node_type: NodeType,
        #[case] capability: Capability,
        #[case] expected: bool,
    ) {
        assert_eq!(node_type.supports(capability), expected);
    }

    #[test]
    fn list_item_requires_leading_paragraph() {
        let ok = Fragment::from(vec![p(vec![text("a")])]);
        assert!(NodeType::ListItem.valid_content(&ok));
        assert!(!NodeType::ListItem.valid_content(&Fragment::empty()));
    }

    #[test]
    fn lists_only_hold_items() {
        let items = Fragment::from(vec![li(vec![p(vec![text("a")])])]);
        assert!(NodeType::BulletList.valid_content(&items));
        assert!(NodeType::OrderedList.valid_content(&items));
        let loose = Fragment::from(vec![p(vec![text("a")])]);
        assert!(!NodeType::BulletList.valid_content(&loose));
    }

    #[test]
    fn code_block_rejects_inline_leaves() {
        let content = Fragment::from(vec![image("img-1", "data:")]);
        assert!(!NodeType::CodeBlock.valid_content(&content));
        assert!(NodeType::Paragraph.valid_content(&content));
    }
}
