use crate::model::{Align, Attrs, Capability, MAX_INDENT, MarkAttrs, MarkType, NodeType, TextDir};
use crate::state::EditorState;

use super::{Dispatch, lift_list_item, rejected, selected_nodes, sink_list_item};

/// Literal indent inserted into code blocks.
const CODE_INDENT: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentDirection {
    Indent,
    Outdent,
}

/// Indent or outdent the top-level block at the end of the selection.
///
/// Paragraphs and headings step their `indent` attribute within
/// `0..=MAX_INDENT`. Lists nest or un-nest the selected items and always
/// consume the keystroke. Code blocks get two literal spaces at the
/// selection start.
// TODO: verify behavior for right-to-left blocks, where indent should
// probably mirror.
pub fn change_indent(direction: IndentDirection) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    move |state: &EditorState, dispatch: Dispatch<'_>| {
        let Ok(rp) = state.doc.resolve(state.selection.to()) else {
            return false;
        };
        if rp.depth() < 1 {
            return false;
        }
        let block = rp.node(1);
        match block.node_type() {
            NodeType::Paragraph | NodeType::Heading => {
                let indent = block.attrs().indent;
                let indent = match direction {
                    IndentDirection::Indent if indent < MAX_INDENT => indent + 1,
                    IndentDirection::Outdent if indent > 0 => indent - 1,
                    _ => return false,
                };
                if let Some(dispatch) = dispatch {
                    let mut tr = state.tr();
                    if let Err(err) = tr.update_attrs(rp.before(1), |attrs| Attrs {
                        indent,
                        ..attrs.clone()
                    }) {
                        return rejected("change_indent", err);
                    }
                    dispatch(tr);
                }
                true
            }
            NodeType::BulletList | NodeType::OrderedList => {
                match direction {
                    IndentDirection::Indent => sink_list_item(NodeType::ListItem)(state, dispatch),
                    IndentDirection::Outdent => lift_list_item(NodeType::ListItem)(state, dispatch),
                };
                true
            }
            NodeType::CodeBlock => {
                if let Some(dispatch) = dispatch {
                    let mut tr = state.tr();
                    if let Err(err) = tr.insert_text(state.selection.from(), CODE_INDENT) {
                        return rejected("change_indent", err);
                    }
                    dispatch(tr);
                }
                true
            }
            _ => false,
        }
    }
}

/// Set `align` on every alignable block in the selection, or clear it when
/// the first such block already has it.
pub fn toggle_alignment(align: Align) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    move |state: &EditorState, dispatch: Dispatch<'_>| {
        let mut targets = Vec::new();
        selected_nodes(state, |node, pos| {
            if node.node_type().supports(Capability::Align) {
                targets.push((pos, node.attrs().align));
            }
        });
        let Some(&(_, first)) = targets.first() else {
            return false;
        };
        let value = if first == Some(align) { None } else { Some(align) };
        if let Some(dispatch) = dispatch {
            let mut tr = state.tr();
            for (pos, _) in targets {
                if let Err(err) = tr.update_attrs(pos, |attrs| Attrs {
                    align: value,
                    ..attrs.clone()
                }) {
                    return rejected("toggle_alignment", err);
                }
            }
            dispatch(tr);
        }
        true
    }
}

/// Like [`toggle_alignment`] for text direction, except that the new
/// attributes hold only `dir`; everything else on the block is reset.
pub fn toggle_dir(dir: TextDir) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    move |state: &EditorState, dispatch: Dispatch<'_>| {
        let mut targets = Vec::new();
        selected_nodes(state, |node, pos| {
            if node.node_type().supports(Capability::Dir) {
                targets.push((pos, node.attrs().dir));
            }
        });
        let Some(&(_, first)) = targets.first() else {
            return false;
        };
        let value = if first == Some(dir) { None } else { Some(dir) };
        if let Some(dispatch) = dispatch {
            let mut tr = state.tr();
            for (pos, _) in targets {
                if let Err(err) = tr.update_attrs(pos, |_| Attrs {
                    dir: value,
                    ..Attrs::default()
                }) {
                    return rejected("toggle_dir", err);
                }
            }
            dispatch(tr);
        }
        true
    }
}

/// Toggle a mark on the selection, or in the stored marks at a cursor.
///
/// Over ranges the mark is removed everywhere when any range already
/// carries it throughout, and added everywhere otherwise. `force` always
/// adds.
pub fn toggle_mark(
    mark_type: MarkType,
    attrs: MarkAttrs,
    force: bool,
) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    move |state: &EditorState, dispatch: Dispatch<'_>| {
        let cursor = state.selection.cursor_pos();
        if cursor.is_none() && state.selection.is_empty() {
            return false;
        }
        let Some(dispatch) = dispatch else {
            return true;
        };
        let mut tr = state.tr();
        if let Some(pos) = cursor {
            let current = state.stored_marks.clone().unwrap_or_else(|| {
                state
                    .doc
                    .resolve(pos)
                    .map(|rp| rp.marks())
                    .unwrap_or_default()
            });
            if !force && mark_type.is_in_set(&current).is_some() {
                tr.remove_stored_mark(mark_type);
            } else {
                tr.add_stored_mark(mark_type.create(attrs.clone()));
            }
        } else {
            let ranges = state.selection.ranges();
            let has = ranges
                .iter()
                .any(|range| state.doc.range_fully_marked(range.from, range.to, mark_type));
            for range in &ranges {
                let result = if has && !force {
                    tr.remove_mark(range.from, range.to, mark_type)
                } else {
                    tr.add_mark(range.from, range.to, mark_type.create(attrs.clone()))
                };
                if let Err(err) = result {
                    return rejected("toggle_mark", err);
                }
            }
            tr.scroll_into_view();
        }
        dispatch(tr);
        true
    }
}
