use crate::model::NodeType;

/// Failures of the low-level transform primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("Position {pos} out of range for content of size {size}")]
    PositionOutOfRange { pos: usize, size: usize },
    #[error("Positions {from} and {to} do not share a parent")]
    MismatchedParents { from: usize, to: usize },
    #[error("No node at position {0}")]
    NoNodeAt(usize),
    #[error("Invalid content for {parent:?}")]
    InvalidContent { parent: NodeType },
    #[error("Text node without text")]
    MissingText,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    #[error("Transaction was built against a different document")]
    StaleTransaction,
}
