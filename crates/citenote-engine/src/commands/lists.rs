use std::ops::Range;

use crate::model::{Attrs, Fragment, Node, NodeRange, NodeType, ResolvedPos};
use crate::state::EditorState;

use super::{Dispatch, rejected};

/// The block range around the selection whose parent passes `pred`, with
/// the selection start resolved.
fn selected_range(
    state: &EditorState,
    pred: impl Fn(&Node) -> bool,
) -> Option<(ResolvedPos, NodeRange)> {
    let rfrom = state.doc.resolve(state.selection.from()).ok()?;
    let rto = state.doc.resolve(state.selection.to()).ok()?;
    let range = rfrom.block_range(&rto, pred)?;
    Some((rfrom, range))
}

fn holds_items(item_type: NodeType) -> impl Fn(&Node) -> bool {
    move |node: &Node| node.first_child().is_some_and(|child| child.node_type() == item_type)
}

fn children(node: &Node, indices: Range<usize>) -> Vec<Node> {
    indices.map(|index| node.child(index).clone()).collect()
}

/// Replace `from..to` with `nodes` and hand the transaction to `dispatch`.
fn commit(
    command: &str,
    state: &EditorState,
    dispatch: Dispatch<'_>,
    from: usize,
    to: usize,
    nodes: Vec<Node>,
) -> bool {
    if let Some(dispatch) = dispatch {
        let mut tr = state.tr();
        if let Err(err) = tr.replace_blocks(from, to, nodes) {
            return rejected(command, err);
        }
        tr.scroll_into_view();
        dispatch(tr);
    }
    true
}

/// Nest the selected list items into the item before them.
pub fn sink_list_item(item_type: NodeType) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    move |state: &EditorState, dispatch: Dispatch<'_>| {
        let Some((_, range)) = selected_range(state, holds_items(item_type)) else {
            return false;
        };
        if range.start_index == 0 {
            return false;
        }
        let list = &range.parent;
        let prev = list.child(range.start_index - 1);
        let items = children(list, range.start_index..range.end_index);
        let sunk = match prev.last_child() {
            Some(nested) if nested.node_type() == list.node_type() => {
                let nested = nested.with_content(nested.content().append(&Fragment::from_nodes(items)));
                prev.with_content(prev.content().replace_child(prev.child_count() - 1, nested))
            }
            _ => {
                let nested = Node::new(list.node_type(), Attrs::default(), items);
                prev.with_content(prev.content().append(&Fragment::from(nested)))
            }
        };
        let from = range.start - prev.node_size();
        commit("sink_list_item", state, dispatch, from, range.end, vec![sunk])
    }
}

/// Move the selected list items one level out: into the enclosing list
/// when nested, otherwise out of the list altogether.
pub fn lift_list_item(item_type: NodeType) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    move |state: &EditorState, dispatch: Dispatch<'_>| {
        let Some((rfrom, range)) = selected_range(state, holds_items(item_type)) else {
            return false;
        };
        let nested = range
            .depth
            .checked_sub(1)
            .is_some_and(|depth| rfrom.node(depth).node_type() == item_type);
        let (from, to, nodes) = if nested {
            lift_to_outer_list(&rfrom, &range)
        } else {
            lift_out_of_list(&rfrom, &range)
        };
        commit("lift_list_item", state, dispatch, from, to, nodes)
    }
}

/// Split the outer item around the lifted items. Items after the range,
/// and whatever followed the nested list, move into the last lifted item.
fn lift_to_outer_list(rfrom: &ResolvedPos, range: &NodeRange) -> (usize, usize, Vec<Node>) {
    let list = &range.parent;
    let item_depth = range.depth - 1;
    let outer = rfrom.node(item_depth);
    let list_index = rfrom.index(item_depth);

    let mut kept = children(outer, 0..list_index);
    if range.start_index > 0 {
        kept.push(list.with_content(Fragment::from_nodes(children(list, 0..range.start_index))));
    }
    let mut tail = Vec::new();
    if range.end_index < list.child_count() {
        let after = children(list, range.end_index..list.child_count());
        tail.push(list.with_content(Fragment::from_nodes(after)));
    }
    tail.extend(children(outer, list_index + 1..outer.child_count()));

    let mut nodes = vec![outer.with_content(Fragment::from_nodes(kept))];
    let mut lifted = children(list, range.start_index..range.end_index);
    if let Some(last) = lifted.last_mut() {
        if !tail.is_empty() {
            *last = last.with_content(last.content().append(&Fragment::from_nodes(tail)));
        }
    }
    nodes.extend(lifted);
    (rfrom.before(item_depth), rfrom.after(item_depth), nodes)
}

/// Unwrap the lifted items into plain blocks, splitting the list around
/// them.
fn lift_out_of_list(rfrom: &ResolvedPos, range: &NodeRange) -> (usize, usize, Vec<Node>) {
    let list = &range.parent;
    let mut nodes = Vec::new();
    if range.start_index > 0 {
        nodes.push(list.with_content(Fragment::from_nodes(children(list, 0..range.start_index))));
    }
    for index in range.start_index..range.end_index {
        nodes.extend(list.child(index).content().iter().cloned());
    }
    if range.end_index < list.child_count() {
        let after = children(list, range.end_index..list.child_count());
        nodes.push(list.with_content(Fragment::from_nodes(after)));
    }
    (rfrom.before(range.depth), rfrom.after(range.depth), nodes)
}

/// Wrap the selected blocks in a new list, one item per paragraph.
///
/// Other blocks join the item before them; a range starting with one
/// cannot be wrapped.
pub fn wrap_in_list(list_type: NodeType) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    move |state: &EditorState, dispatch: Dispatch<'_>| {
        let Some((rfrom, range)) = selected_range(state, |_| true) else {
            return false;
        };
        let mut items: Vec<Node> = Vec::new();
        for block in children(&range.parent, range.start_index..range.end_index) {
            if block.node_type() == NodeType::Paragraph {
                items.push(Node::new(NodeType::ListItem, Attrs::default(), vec![block]));
            } else if let Some(item) = items.last_mut() {
                *item = item.with_content(item.content().append(&Fragment::from(block)));
            } else {
                return false;
            }
        }
        if items.is_empty() {
            return false;
        }
        let list = Node::new(list_type, Attrs::default(), items);

        let parent = &range.parent;
        let start = rfrom.start(range.depth);
        let content = parent
            .content()
            .cut(0, range.start - start)
            .append(&Fragment::from(list.clone()))
            .append(&parent.content().cut(range.end - start, parent.content_size()));
        if !parent.node_type().valid_content(&content) {
            return false;
        }
        commit("wrap_in_list", state, dispatch, range.start, range.end, vec![list])
    }
}

/// Toggle between `list_type` and plain blocks.
///
/// Inside a list of the same type the selected items are lifted; inside a
/// list of another type the list is retyped in place, keeping only its
/// direction. Anywhere else the blocks are wrapped.
pub fn toggle_list(
    list_type: NodeType,
    item_type: NodeType,
) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    move |state: &EditorState, dispatch: Dispatch<'_>| {
        let Some((rfrom, range)) = selected_range(state, |_| true) else {
            return false;
        };
        let list_depth = rfrom.find_ancestor(|node| node.node_type().is_list());
        if let Some(depth) = list_depth.filter(|&d| range.depth >= 1 && range.depth <= d + 1) {
            let list = rfrom.node(depth);
            if list.node_type() == list_type {
                return lift_list_item(item_type)(state, dispatch);
            }
            if list_type.valid_content(list.content()) {
                if let Some(dispatch) = dispatch {
                    let mut tr = state.tr();
                    let attrs = Attrs {
                        dir: list.attrs().dir,
                        ..Attrs::default()
                    };
                    if let Err(err) = tr.set_node_markup(rfrom.before(depth), list_type, attrs) {
                        return rejected("toggle_list", err);
                    }
                    dispatch(tr);
                }
                return true;
            }
        }
        wrap_in_list(list_type)(state, dispatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Command, apply_command};
    use crate::model::TextDir;
    use crate::model::build::{doc, h, li, ol, p, text, ul};
    use crate::state::Selection;
    use pretty_assertions::assert_eq;

    fn item(value: &str) -> Node {
        li(vec![p(vec![text(value)])])
    }

    #[test]
    fn sink_nests_into_previous_item() {
        let d = doc(vec![ul(vec![item("a"), item("b")])]);
        let state = EditorState::with_selection(d, Selection::cursor(8));
        let (applied, next) = apply_command(&state, sink_list_item(NodeType::ListItem));
        assert!(applied);
        assert_eq!(
            next.doc,
            doc(vec![ul(vec![li(vec![p(vec![text("a")]), ul(vec![item("b")])])])])
        );
        assert_eq!(next.selection, Selection::cursor(8));
    }

    #[test]
    fn sink_joins_existing_nested_list() {
        let d = doc(vec![ul(vec![
            li(vec![p(vec![text("a")]), ul(vec![item("b")])]),
            item("c"),
        ])]);
        let c = d.content_size() - 4;
        let state = EditorState::with_selection(d, Selection::cursor(c));
        let (_, next) = apply_command(&state, sink_list_item(NodeType::ListItem));
        assert_eq!(
            next.doc,
            doc(vec![ul(vec![li(vec![
                p(vec![text("a")]),
                ul(vec![item("b"), item("c")]),
            ])])])
        );
    }

    #[test]
    fn first_item_cannot_sink() {
        let d = doc(vec![ul(vec![item("a"), item("b")])]);
        let state = EditorState::with_selection(d, Selection::cursor(3));
        assert!(!sink_list_item(NodeType::ListItem).run(&state, None));
    }

    #[test]
    fn lift_splits_top_level_list() {
        let d = doc(vec![ul(vec![item("a"), item("b"), item("c")])]);
        let state = EditorState::with_selection(d, Selection::cursor(8));
        let (applied, next) = apply_command(&state, lift_list_item(NodeType::ListItem));
        assert!(applied);
        assert_eq!(
            next.doc,
            doc(vec![
                ul(vec![item("a")]),
                p(vec![text("b")]),
                ul(vec![item("c")]),
            ])
        );
        assert_eq!(next.doc.resolve(next.selection.from()).unwrap().parent().text_content(), "b");
    }

    #[test]
    fn lift_nested_item_to_outer_list() {
        let d = doc(vec![ul(vec![li(vec![
            p(vec![text("a")]),
            ul(vec![item("b"), item("c")]),
        ])])]);
        let state = EditorState::with_selection(d, Selection::cursor(8));
        let (_, next) = apply_command(&state, lift_list_item(NodeType::ListItem));
        assert_eq!(
            next.doc,
            doc(vec![ul(vec![
                item("a"),
                li(vec![p(vec![text("b")]), ul(vec![item("c")])]),
            ])])
        );
    }

    #[test]
    fn sink_then_lift_restores_list() {
        let d = doc(vec![ul(vec![item("a"), item("b")])]);
        let state = EditorState::with_selection(d.clone(), Selection::cursor(8));
        let (_, sunk) = apply_command(&state, sink_list_item(NodeType::ListItem));
        let (_, lifted) = apply_command(&sunk, lift_list_item(NodeType::ListItem));
        assert_eq!(lifted.doc, d);
    }

    #[test]
    fn wrap_paragraphs_in_list() {
        let d = doc(vec![p(vec![text("a")]), p(vec![text("b")])]);
        let state = EditorState::with_selection(d, Selection::text(1, 4));
        let (applied, next) = apply_command(&state, wrap_in_list(NodeType::BulletList));
        assert!(applied);
        assert_eq!(next.doc, doc(vec![ul(vec![item("a"), item("b")])]));
    }

    #[test]
    fn wrap_attaches_other_blocks_to_previous_item() {
        let d = doc(vec![p(vec![text("a")]), h(2, vec![text("b")])]);
        let state = EditorState::with_selection(d, Selection::text(1, 4));
        let (_, next) = apply_command(&state, wrap_in_list(NodeType::OrderedList));
        assert_eq!(
            next.doc,
            doc(vec![ol(vec![li(vec![p(vec![text("a")]), h(2, vec![text("b")])])])])
        );
    }

    #[test]
    fn heading_alone_cannot_be_wrapped() {
        let state = EditorState::with_selection(doc(vec![h(1, vec![text("t")])]), Selection::cursor(1));
        assert!(!wrap_in_list(NodeType::BulletList).run(&state, None));
    }

    #[test]
    fn toggle_same_list_lifts() {
        let d = doc(vec![ul(vec![item("a")])]);
        let state = EditorState::with_selection(d, Selection::cursor(3));
        let toggle = toggle_list(NodeType::BulletList, NodeType::ListItem);
        let (applied, next) = apply_command(&state, &toggle);
        assert!(applied);
        assert_eq!(next.doc, doc(vec![p(vec![text("a")])]));
        let (_, again) = apply_command(&next, &toggle);
        assert_eq!(again.doc, doc(vec![ul(vec![item("a")])]));
    }

    #[test]
    fn toggle_other_list_retypes_and_applies() {
        let list = Node::new(
            NodeType::BulletList,
            Attrs {
                dir: Some(TextDir::Rtl),
                ..Attrs::default()
            },
            vec![item("a")],
        );
        let state = EditorState::with_selection(doc(vec![list]), Selection::cursor(3));
        let (applied, next) =
            apply_command(&state, toggle_list(NodeType::OrderedList, NodeType::ListItem));
        assert!(applied);
        let retyped = next.doc.child(0);
        assert_eq!(retyped.node_type(), NodeType::OrderedList);
        assert_eq!(retyped.attrs().dir, Some(TextDir::Rtl));
        assert_eq!(retyped.child(0), &item("a"));
    }
}
