//! Shorthand constructors for documents, used by tests and the CLI's
//! fixtures.

use super::{Attrs, Citation, Mark, MarkType, Node, NodeType};

pub fn doc(content: Vec<Node>) -> Node {
    Node::new(NodeType::Doc, Attrs::default(), content)
}

pub fn p(content: Vec<Node>) -> Node {
    Node::new(NodeType::Paragraph, Attrs::default(), content)
}

pub fn h(level: u8, content: Vec<Node>) -> Node {
    let attrs = Attrs {
        level: Some(level),
        ..Attrs::default()
    };
    Node::new(NodeType::Heading, attrs, content)
}

pub fn blockquote(content: Vec<Node>) -> Node {
    Node::new(NodeType::Blockquote, Attrs::default(), content)
}

pub fn ul(items: Vec<Node>) -> Node {
    Node::new(NodeType::BulletList, Attrs::default(), items)
}

pub fn ol(items: Vec<Node>) -> Node {
    Node::new(NodeType::OrderedList, Attrs::default(), items)
}

pub fn li(content: Vec<Node>) -> Node {
    Node::new(NodeType::ListItem, Attrs::default(), content)
}

pub fn code_block(code: &str) -> Node {
    Node::new(NodeType::CodeBlock, Attrs::default(), vec![text(code)])
}

pub fn text(value: &str) -> Node {
    Node::new_text(value, Vec::new())
}

pub fn marked(value: &str, marks: &[MarkType]) -> Node {
    let set = marks
        .iter()
        .fold(Vec::new(), |set, mark_type| Mark::new(*mark_type).add_to_set(&set));
    Node::new_text(value, set)
}

pub fn bold(value: &str) -> Node {
    marked(value, &[MarkType::Strong])
}

pub fn hard_break() -> Node {
    Node::leaf(NodeType::HardBreak, Attrs::default())
}

/// An image with transient data, as inserted before import.
pub fn image(node_id: &str, src: &str) -> Node {
    let attrs = Attrs {
        src: Some(src.to_string()),
        ..Attrs::with_node_id(node_id)
    };
    Node::leaf(NodeType::Image, attrs)
}

/// An image already stored as an attachment.
pub fn stored_image(node_id: &str, attachment_key: &str) -> Node {
    let attrs = Attrs {
        attachment_key: Some(attachment_key.to_string()),
        ..Attrs::with_node_id(node_id)
    };
    Node::leaf(NodeType::Image, attrs)
}

pub fn citation(node_id: &str, citation: Citation) -> Node {
    let attrs = Attrs {
        citation: Some(citation),
        ..Attrs::with_node_id(node_id)
    };
    Node::leaf(NodeType::Citation, attrs)
}
