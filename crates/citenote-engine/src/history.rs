//! Undo history.
//!
//! Each event holds the inverted steps of one dispatched batch: the root
//! transaction and everything plugins appended for it. Transactions tagged
//! with [`MetaKey::AddToHistory`] `false` are not recorded; the stored
//! events are rebased over them instead so a later undo still hits the
//! right positions.

use log::{debug, warn};

use crate::state::{EditorState, Selection};
use crate::transform::{Mappable, MetaKey, Step, Transaction};

/// Events kept per stack before the oldest is dropped.
pub const MAX_DEPTH: usize = 100;

#[derive(Debug, Clone)]
struct HistoryEvent {
    /// Inverted steps in the order the original steps were applied
    steps: Vec<Step>,
    selection_before: Selection,
}

/// Which stack a batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    User,
    Undo,
    Redo,
}

#[derive(Debug, Clone, Default)]
pub struct History {
    done: Vec<HistoryEvent>,
    undone: Vec<HistoryEvent>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn undo_depth(&self) -> usize {
        self.done.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.undone.len()
    }

    pub fn clear(&mut self) {
        self.done.clear();
        self.undone.clear();
    }

    /// Record a finished batch that started from `before`.
    pub(crate) fn record(&mut self, transactions: &[Transaction], before: &EditorState, origin: Origin) {
        let mut event = HistoryEvent {
            steps: Vec::new(),
            selection_before: before.selection.clone(),
        };
        for tr in transactions.iter().filter(|tr| tr.doc_changed()) {
            if tr.get_meta(MetaKey::AddToHistory) == Some(false) {
                self.rebase(tr, &mut event);
                continue;
            }
            for (step, doc) in tr.steps().iter().zip(tr.docs()) {
                match step.invert(doc) {
                    Ok(inverted) => event.steps.push(inverted),
                    Err(err) => warn!("Dropping history step that cannot be inverted: {err}"),
                }
            }
        }
        if event.steps.is_empty() {
            return;
        }
        let stack = match origin {
            Origin::Undo => &mut self.undone,
            Origin::User => {
                self.undone.clear();
                &mut self.done
            }
            Origin::Redo => &mut self.done,
        };
        stack.push(event);
        if stack.len() > MAX_DEPTH {
            stack.remove(0);
        }
        debug!(
            "History recorded {origin:?} event, {} undo / {} redo",
            self.done.len(),
            self.undone.len()
        );
    }

    fn rebase(&mut self, tr: &Transaction, current: &mut HistoryEvent) {
        let mapping = tr.mapping();
        let events = self
            .done
            .iter_mut()
            .chain(self.undone.iter_mut())
            .chain(std::iter::once(current));
        for event in events {
            event.steps = event
                .steps
                .iter()
                .filter_map(|step| step.map(mapping))
                .collect();
            event.selection_before = match &event.selection_before {
                Selection::Text { anchor, head } => {
                    Selection::text(mapping.map(*anchor, 1), mapping.map(*head, 1))
                }
                other => other.clone(),
            };
        }
        self.done.retain(|event| !event.steps.is_empty());
        self.undone.retain(|event| !event.steps.is_empty());
    }

    /// Build the transaction reverting the most recent event on the undo
    /// (or, with `redo`, the redo) stack, taking the event off the stack.
    pub(crate) fn pop(&mut self, state: &EditorState, redo: bool) -> Option<Transaction> {
        let stack = if redo { &mut self.undone } else { &mut self.done };
        let event = stack.pop()?;
        let mut tr = state.tr();
        for step in event.steps.iter().rev() {
            if let Err(err) = tr.step(step.clone()) {
                warn!("History event no longer applies: {err}");
                return None;
            }
        }
        let size = tr.doc().content_size();
        let selection = match event.selection_before {
            Selection::Text { anchor, head } if anchor.max(head) <= size => {
                Selection::text(anchor, head)
            }
            other => Selection::near(tr.doc(), other.from()),
        };
        tr.set_selection(selection);
        tr.set_meta(MetaKey::History, true);
        Some(tr)
    }
}
