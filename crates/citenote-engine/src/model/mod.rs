//! Immutable document tree.
//!
//! Nodes are shared between document versions. An edit produces a new root
//! that reuses every subtree it did not touch, so holding on to an old
//! document costs only the rebuilt path.
//!
//! Positions count tokens in document order: each character of text is one
//! position, leaf nodes take one, and every other node takes its content
//! size plus two for its open and close tokens. Position 0 is the start of
//! the document's content.

mod attrs;
pub mod build;
mod fragment;
mod mark;
mod node;
mod resolved;
mod schema;

pub use attrs::{
    Align, AnnotationPosition, Attrs, Citation, CitationItem, MAX_INDENT, SavedAnnotation,
    TextDir,
};
pub use fragment::Fragment;
pub use mark::{Mark, MarkAttrs, MarkType};
pub use node::Node;
pub use resolved::{NodeRange, ResolvedPos};
pub use schema::{Capability, ContentExpr, NodeSpec, NodeType};
