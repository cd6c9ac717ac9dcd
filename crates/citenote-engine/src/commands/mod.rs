//! Editing commands.
//!
//! A command inspects an [`EditorState`] and reports whether it applies.
//! When given a dispatch callback it also builds the transaction for the
//! edit and hands it over; without one it is a dry run, used for example to
//! grey out toolbar buttons. Commands never fail: anything they cannot do
//! is reported as `false`.
//!
//! ```
//! use citenote_engine::commands::{Command, toggle_mark};
//! use citenote_engine::model::MarkType;
//! use citenote_engine::model::build::{doc, p, text};
//! use citenote_engine::state::{EditorState, Selection};
//!
//! let state = EditorState::with_selection(doc(vec![p(vec![text("abc")])]), Selection::text(1, 3));
//! let bold = toggle_mark(MarkType::Strong, Default::default(), false);
//! assert!(bold.run(&state, None));
//! ```

mod annotations;
mod formatting;
mod lists;

pub use annotations::{
    Annotation, AnnotationEntry, ImportEnv, attach_imported_image, build_annotation_fragment,
    insert_annotations_and_citations, set_citation,
};
pub use formatting::{IndentDirection, change_indent, toggle_alignment, toggle_dir, toggle_mark};
pub use lists::{lift_list_item, sink_list_item, toggle_list, wrap_in_list};

use crate::model::{Attrs, Node};
use crate::state::EditorState;
use crate::transform::Transaction;

/// Receives the transaction a command built.
pub type Dispatch<'a> = Option<&'a mut dyn FnMut(Transaction)>;

pub trait Command {
    fn run(&self, state: &EditorState, dispatch: Dispatch<'_>) -> bool;
}

impl<F> Command for F
where
    F: Fn(&EditorState, Dispatch<'_>) -> bool,
{
    fn run(&self, state: &EditorState, dispatch: Dispatch<'_>) -> bool {
        self(state, dispatch)
    }
}

/// Borrow a dispatch handle again for a nested command.
pub(crate) fn reborrow<'b>(dispatch: &'b mut Dispatch<'_>) -> Dispatch<'b> {
    match dispatch {
        Some(inner) => {
            let inner: &'b mut dyn FnMut(Transaction) = &mut **inner;
            Some(inner)
        }
        None => None,
    }
}

/// Try `commands` in order, stopping at the first that applies.
pub fn chain_commands(
    commands: Vec<Box<dyn Command>>,
) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    move |state: &EditorState, mut dispatch: Dispatch<'_>| {
        commands
            .iter()
            .any(|command| command.run(state, reborrow(&mut dispatch)))
    }
}

/// Whether any node in the selection has attributes matching `predicate`.
pub fn has_attr(state: &EditorState, predicate: impl Fn(&Attrs) -> bool) -> bool {
    let mut found = false;
    state
        .doc
        .nodes_between(state.selection.from(), state.selection.to(), |node, _| {
            if predicate(node.attrs()) {
                found = true;
            }
            !found
        });
    found
}

/// Calls `f` with every node overlapping the selection ranges, each node
/// once.
pub(crate) fn selected_nodes(state: &EditorState, mut f: impl FnMut(&Node, usize)) {
    let mut last = None;
    for range in state.selection.ranges() {
        state.doc.nodes_between(range.from, range.to, |node, pos| {
            if last.is_none_or(|last| pos > last) {
                f(node, pos);
                last = Some(pos);
            }
            true
        });
    }
}

/// Log a transform failure inside a command and report it inapplicable.
pub(crate) fn rejected(command: &str, err: crate::error::TransformError) -> bool {
    log::warn!("{command}: {err}");
    false
}

/// Run `command` and apply every transaction it dispatched.
#[cfg(test)]
pub(crate) fn apply_command(state: &EditorState, command: impl Command) -> (bool, EditorState) {
    let mut dispatched: Vec<Transaction> = Vec::new();
    let mut collect = |tr: Transaction| dispatched.push(tr);
    let applied = command.run(state, Some(&mut collect));
    let next = dispatched
        .iter()
        .fold(state.clone(), |state, tr| state.apply(tr).unwrap());
    (applied, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Align;
    use crate::model::build::{doc, p, text};
    use crate::state::Selection;

    fn aligned(align: Align) -> Node {
        Node::new(
            crate::model::NodeType::Paragraph,
            Attrs {
                align: Some(align),
                ..Attrs::default()
            },
            vec![text("b")],
        )
    }

    #[test]
    fn has_attr_checks_selected_nodes() {
        let d = doc(vec![p(vec![text("a")]), aligned(Align::Center)]);
        let state = EditorState::with_selection(d, Selection::text(1, 5));
        assert!(has_attr(&state, |attrs| attrs.align == Some(Align::Center)));
        let state = EditorState::with_selection(state.doc.clone(), Selection::cursor(1));
        assert!(!has_attr(&state, |attrs| attrs.align == Some(Align::Center)));
    }

    #[test]
    fn chain_stops_at_first_applicable() {
        let never = |_: &EditorState, _: Dispatch<'_>| false;
        let always = |_: &EditorState, dispatch: Dispatch<'_>| {
            if let Some(dispatch) = dispatch {
                dispatch(Transaction::new(
                    doc(vec![p(vec![])]),
                    Selection::cursor(1),
                    None,
                ));
            }
            true
        };
        let chained = chain_commands(vec![Box::new(never), Box::new(always), Box::new(always)]);
        let state = EditorState::new(doc(vec![p(vec![])]));
        let mut count = 0;
        let mut dispatch = |_tr: Transaction| count += 1;
        assert!(chained.run(&state, Some(&mut dispatch)));
        assert_eq!(count, 1);
        assert!(!chain_commands(vec![Box::new(never)]).run(&state, None));
    }
}
