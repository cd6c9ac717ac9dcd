//! The transaction pipeline.
//!
//! [`Editor::dispatch`] applies a root transaction and then gives every
//! plugin a chance to append a follow-up transaction. Each plugin sees the
//! transactions it has not seen yet together with the state before them,
//! so a plugin that appends in one round still gets to react to what later
//! plugins appended. Rounds repeat until nobody appends. The whole batch
//! is then recorded in history as one event.
//!
//! Plugins never get a handle on the editor; they can only return a
//! transaction, which keeps the pipeline free of re-entrant dispatch.

use log::{debug, warn};

use crate::commands::Command;
use crate::error::EditorError;
use crate::history::{History, Origin};
use crate::state::EditorState;
use crate::transform::{MetaKey, Transaction};

/// Rounds of appending after which the pipeline gives up on plugins that
/// keep reacting to each other.
const MAX_APPEND_ROUNDS: usize = 16;

/// An observer of committed transactions.
pub trait Plugin {
    fn name(&self) -> &str;

    /// Called with the transactions this plugin has not seen, the state
    /// before them and the state after them. May return one transaction,
    /// built from `new_state`, to append to the batch.
    fn append_transaction(
        &mut self,
        transactions: &[Transaction],
        old_state: &EditorState,
        new_state: &EditorState,
    ) -> Option<Transaction>;

    /// Forget everything observed so far, e.g. when a new document is
    /// loaded.
    fn reset(&mut self) {}
}

pub struct Editor {
    state: EditorState,
    plugins: Vec<Box<dyn Plugin>>,
    history: History,
}

impl Editor {
    pub fn new(state: EditorState) -> Self {
        Self {
            state,
            plugins: Vec::new(),
            history: History::new(),
        }
    }

    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Replace the state outright, clearing history and plugin memory.
    pub fn set_state(&mut self, state: EditorState) {
        self.state = state;
        self.history.clear();
        for plugin in &mut self.plugins {
            plugin.reset();
        }
    }

    /// Run `command` against the current state and dispatch whatever it
    /// produces.
    pub fn exec(&mut self, command: &dyn Command) -> bool {
        let mut pending: Vec<Transaction> = Vec::new();
        let mut collect = |tr: Transaction| pending.push(tr);
        let applied = command.run(&self.state, Some(&mut collect));
        for tr in pending {
            if let Err(err) = self.dispatch(tr) {
                warn!("Dropping transaction from command: {err}");
            }
        }
        applied
    }

    /// Whether `command` applies, without changing anything.
    pub fn can_exec(&self, command: &dyn Command) -> bool {
        command.run(&self.state, None)
    }

    pub fn dispatch(&mut self, tr: Transaction) -> Result<(), EditorError> {
        self.dispatch_with(tr, Origin::User)
    }

    pub fn undo(&mut self) -> bool {
        self.step_history(false)
    }

    pub fn redo(&mut self) -> bool {
        self.step_history(true)
    }

    fn step_history(&mut self, redo: bool) -> bool {
        let Some(tr) = self.history.pop(&self.state, redo) else {
            return false;
        };
        let origin = if redo { Origin::Redo } else { Origin::Undo };
        match self.dispatch_with(tr, origin) {
            Ok(()) => true,
            Err(err) => {
                warn!("History transaction failed: {err}");
                false
            }
        }
    }

    fn dispatch_with(&mut self, root: Transaction, origin: Origin) -> Result<(), EditorError> {
        let mut new_state = self.state.apply(&root)?;
        let mut transactions = vec![root];
        let mut seen: Vec<(usize, EditorState)> =
            vec![(0, self.state.clone()); self.plugins.len()];

        for round in 0.. {
            if round == MAX_APPEND_ROUNDS {
                warn!("Plugins still appending after {MAX_APPEND_ROUNDS} rounds, stopping");
                break;
            }
            let mut appended_any = false;
            for (plugin, (seen_count, seen_state)) in self.plugins.iter_mut().zip(seen.iter_mut()) {
                if *seen_count < transactions.len() {
                    let appended = plugin.append_transaction(
                        &transactions[*seen_count..],
                        seen_state,
                        &new_state,
                    );
                    if let Some(mut tr) = appended {
                        match new_state.apply(&tr) {
                            Ok(next) => {
                                debug!(
                                    "Plugin {} appended a transaction with {} steps",
                                    plugin.name(),
                                    tr.steps().len()
                                );
                                tr.set_meta(MetaKey::AppendedTransaction, true);
                                transactions.push(tr);
                                new_state = next;
                                appended_any = true;
                            }
                            Err(err) => {
                                warn!("Ignoring transaction from plugin {}: {err}", plugin.name())
                            }
                        }
                    }
                }
                *seen_count = transactions.len();
                *seen_state = new_state.clone();
            }
            if !appended_any {
                break;
            }
        }

        self.history.record(&transactions, &self.state, origin);
        self.state = new_state;
        Ok(())
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plugins: Vec<&str> = self.plugins.iter().map(|p| p.name()).collect();
        f.debug_struct("Editor")
            .field("state", &self.state)
            .field("plugins", &plugins)
            .field("history", &self.history)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{IndentDirection, change_indent};
    use crate::model::build::{doc, p, text};
    use crate::state::Selection;
    use pretty_assertions::assert_eq;

    /// Appends `!` after every user edit.
    struct Echo;

    impl Plugin for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn append_transaction(
            &mut self,
            transactions: &[Transaction],
            _old_state: &EditorState,
            new_state: &EditorState,
        ) -> Option<Transaction> {
            let user_edit = transactions.iter().any(|tr| {
                tr.doc_changed()
                    && tr.get_meta(MetaKey::AppendedTransaction).is_none()
                    && tr.get_meta(MetaKey::History).is_none()
            });
            if !user_edit {
                return None;
            }
            let mut tr = new_state.tr();
            let end = new_state.doc.content_size() - 1;
            tr.insert_text(end, "!").ok()?;
            Some(tr)
        }
    }

    fn editor() -> Editor {
        let state = EditorState::with_selection(doc(vec![p(vec![text("hi")])]), Selection::cursor(3));
        Editor::new(state).with_plugin(Echo)
    }

    #[test]
    fn appended_transactions_join_the_batch() {
        let mut editor = editor();
        let mut tr = editor.state().tr();
        tr.insert_text(3, "?").unwrap();
        editor.dispatch(tr).unwrap();
        assert_eq!(editor.state().doc.text_content(), "hi?!");
        assert_eq!(editor.history().undo_depth(), 1);
    }

    #[test]
    fn undo_reverts_whole_batch() {
        let mut editor = editor();
        let mut tr = editor.state().tr();
        tr.insert_text(3, "?").unwrap();
        editor.dispatch(tr).unwrap();
        assert!(editor.undo());
        assert_eq!(editor.state().doc.text_content(), "hi");
        assert!(editor.redo());
        assert_eq!(editor.state().doc.text_content(), "hi?!");
        assert!(!editor.redo());
    }

    #[test]
    fn stale_transaction_is_rejected() {
        let mut editor = editor();
        let mut tr = editor.state().tr();
        tr.insert_text(3, "?").unwrap();
        let stale = tr.clone();
        editor.dispatch(tr).unwrap();
        assert_eq!(editor.dispatch(stale), Err(EditorError::StaleTransaction));
    }

    #[test]
    fn plugins_see_each_batch_once() {
        let mut editor = editor();
        let mut tr = editor.state().tr();
        tr.insert_text(3, "?").unwrap();
        editor.dispatch(tr).unwrap();
        let mut tr = editor.state().tr();
        tr.set_selection(Selection::cursor(1));
        editor.dispatch(tr).unwrap();
        assert_eq!(editor.state().doc.text_content(), "hi?!");
        assert_eq!(editor.state().selection, Selection::cursor(1));
    }

    #[test]
    fn can_exec_leaves_state_alone() {
        let editor = editor();
        let before = editor.state().clone();
        assert!(editor.can_exec(&change_indent(IndentDirection::Indent)));
        assert!(!editor.can_exec(&change_indent(IndentDirection::Outdent)));
        assert_eq!(editor.state(), &before);
        assert_eq!(editor.history().undo_depth(), 0);
    }

    #[test]
    fn undo_with_empty_history_is_inapplicable() {
        let mut editor = editor();
        assert!(!editor.undo());
    }
}
