//! Editor state: a document plus the selection and stored marks.

mod selection;

pub use selection::{Selection, SelectionRange};

use serde::{Deserialize, Serialize};

use crate::error::EditorError;
use crate::model::{Mark, Node};
use crate::transform::Transaction;

/// One immutable version of the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    pub doc: Node,
    pub selection: Selection,
    /// Marks the next typed text gets, overriding those at the cursor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_marks: Option<Vec<Mark>>,
}

impl EditorState {
    pub fn new(doc: Node) -> Self {
        let selection = Selection::at_start(&doc);
        Self {
            doc,
            selection,
            stored_marks: None,
        }
    }

    pub fn with_selection(doc: Node, selection: Selection) -> Self {
        Self {
            doc,
            selection,
            stored_marks: None,
        }
    }

    /// Start a transaction against this state.
    pub fn tr(&self) -> Transaction {
        Transaction::new(
            self.doc.clone(),
            self.selection.clone(),
            self.stored_marks.clone(),
        )
    }

    /// The state after `tr`, which must have been started from this
    /// state's document.
    pub fn apply(&self, tr: &Transaction) -> Result<EditorState, EditorError> {
        if tr.before() != &self.doc {
            return Err(EditorError::StaleTransaction);
        }
        Ok(EditorState {
            doc: tr.doc().clone(),
            selection: tr.selection().clone(),
            stored_marks: tr.stored_marks().map(<[Mark]>::to_vec),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::{doc, p, text};
    use pretty_assertions::assert_eq;

    #[test]
    fn apply_carries_doc_and_selection() {
        let state = EditorState::new(doc(vec![p(vec![text("ab")])]));
        assert_eq!(state.selection, Selection::cursor(1));
        let mut tr = state.tr();
        tr.insert_text(1, "x").unwrap();
        let next = state.apply(&tr).unwrap();
        assert_eq!(next.doc.text_content(), "xab");
        assert_eq!(next.selection, Selection::cursor(2));
    }

    #[test]
    fn stale_transactions_are_rejected() {
        let state = EditorState::new(doc(vec![p(vec![text("ab")])]));
        let mut tr = state.tr();
        tr.insert_text(1, "x").unwrap();
        let next = state.apply(&tr).unwrap();
        assert_eq!(next.apply(&tr), Err(EditorError::StaleTransaction));
    }
}
