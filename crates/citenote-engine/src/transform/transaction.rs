use std::collections::BTreeMap;

use crate::error::TransformError;
use crate::model::{Attrs, Fragment, Mark, MarkType, Node, NodeType};
use crate::state::Selection;

use super::mapping::Mapping;
use super::step::Step;

/// Metadata keys a transaction can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetaKey {
    /// Inserted content may contain images that still need importing
    ImportImages,
    /// `false` keeps the transaction out of undo history
    AddToHistory,
    /// Set on transactions appended by plugins
    AppendedTransaction,
    ScrollIntoView,
    /// Set on undo and redo transactions
    History,
}

/// A batch of steps built against one document, plus the selection and
/// stored marks that go with the result.
#[derive(Debug, Clone)]
pub struct Transaction {
    before: Node,
    doc: Node,
    steps: Vec<Step>,
    docs: Vec<Node>,
    mapping: Mapping,
    selection: Selection,
    selection_set: bool,
    stored_marks: Option<Vec<Mark>>,
    stored_marks_set: bool,
    meta: BTreeMap<MetaKey, bool>,
}

impl Transaction {
    pub fn new(doc: Node, selection: Selection, stored_marks: Option<Vec<Mark>>) -> Self {
        Self {
            before: doc.clone(),
            doc,
            steps: Vec::new(),
            docs: Vec::new(),
            mapping: Mapping::new(),
            selection,
            selection_set: false,
            stored_marks,
            stored_marks_set: false,
            meta: BTreeMap::new(),
        }
    }

    /// Document the transaction started from.
    pub fn before(&self) -> &Node {
        &self.before
    }

    /// Document after all steps so far.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Document each step was applied to.
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_set(&self) -> bool {
        self.selection_set
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn stored_marks_set(&self) -> bool {
        self.stored_marks_set
    }

    pub fn set_meta(&mut self, key: MetaKey, value: bool) -> &mut Self {
        self.meta.insert(key, value);
        self
    }

    pub fn get_meta(&self, key: MetaKey) -> Option<bool> {
        self.meta.get(&key).copied()
    }

    pub fn scroll_into_view(&mut self) -> &mut Self {
        self.set_meta(MetaKey::ScrollIntoView, true)
    }

    /// Apply a step, mapping the selection and dropping stored marks.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, TransformError> {
        let doc = step.apply(&self.doc)?;
        let map = step.get_map();
        self.selection = self.selection.map(&doc, &map);
        self.mapping.push(map);
        self.docs.push(std::mem::replace(&mut self.doc, doc));
        self.steps.push(step);
        if !self.stored_marks_set {
            self.stored_marks = None;
        }
        Ok(self)
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = selection;
        self.selection_set = true;
        self
    }

    pub fn set_stored_marks(&mut self, marks: Option<Vec<Mark>>) -> &mut Self {
        self.stored_marks = marks;
        self.stored_marks_set = true;
        self
    }

    /// Marks that text typed at the cursor would get.
    fn current_marks(&self) -> Vec<Mark> {
        if let Some(marks) = &self.stored_marks {
            return marks.clone();
        }
        self.doc
            .resolve(self.selection.to())
            .map(|rp| rp.marks())
            .unwrap_or_default()
    }

    pub fn add_stored_mark(&mut self, mark: Mark) -> &mut Self {
        let marks = mark.add_to_set(&self.current_marks());
        self.set_stored_marks(Some(marks))
    }

    pub fn remove_stored_mark(&mut self, mark_type: MarkType) -> &mut Self {
        let marks = mark_type.remove_from_set(&self.current_marks());
        self.set_stored_marks(Some(marks))
    }

    pub fn set_node_markup(
        &mut self,
        pos: usize,
        node_type: NodeType,
        attrs: Attrs,
    ) -> Result<&mut Self, TransformError> {
        self.step(Step::SetNodeMarkup {
            pos,
            node_type,
            attrs,
        })
    }

    /// Rewrite the attributes of the node at `pos` from its current ones.
    pub fn update_attrs(
        &mut self,
        pos: usize,
        f: impl FnOnce(&Attrs) -> Attrs,
    ) -> Result<&mut Self, TransformError> {
        let node = self
            .doc
            .node_at(pos)
            .filter(|node| !node.is_text())
            .ok_or(TransformError::NoNodeAt(pos))?;
        let node_type = node.node_type();
        let attrs = f(node.attrs());
        self.set_node_markup(pos, node_type, attrs)
    }

    /// Replace `from..to` with `slice`.
    ///
    /// Positions in different textblocks are handled by joining the
    /// textblock at `from` with the remainder of the one at `to`.
    pub fn replace(
        &mut self,
        from: usize,
        to: usize,
        slice: Fragment,
    ) -> Result<&mut Self, TransformError> {
        let rfrom = self.doc.resolve(from)?;
        let rto = self.doc.resolve(to)?;
        let depth = rfrom.depth();
        if rto.depth() == depth && rfrom.start(depth) == rto.start(depth) {
            if from == to && slice.is_empty() {
                return Ok(self);
            }
            return self.step(Step::replace(from, to, slice));
        }

        if !rfrom.parent().is_textblock()
            || !rto.parent().is_textblock()
            || !slice.iter().all(Node::is_inline)
        {
            return Err(TransformError::MismatchedParents { from, to });
        }
        let shared = rfrom.shared_depth(to);
        let left = rfrom
            .node(shared + 1)
            .cut(0, from - rfrom.start(shared + 1));
        let left = append_inline(&left, &slice);
        let right_node = rto.node(shared + 1);
        let right = right_node.cut(to - rto.start(shared + 1), right_node.content_size());
        let joined = join_blocks(left, right);
        self.step(Step::replace(
            rfrom.before(shared + 1),
            rto.after(shared + 1),
            Fragment::from_nodes(joined),
        ))
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        self.replace(from, to, Fragment::empty())
    }

    /// Insert `content` at `pos`. Inline content the parent there cannot
    /// hold is fitted as described at [`Transaction::fit_inline`].
    pub fn insert(&mut self, pos: usize, content: Fragment) -> Result<&mut Self, TransformError> {
        let fitted = self.fit_inline(pos, pos, content)?;
        self.replace(fitted.from, fitted.to, fitted.content)
    }

    /// Insert plain text at `pos`, carrying the marks current there.
    pub fn insert_text(&mut self, pos: usize, text: &str) -> Result<&mut Self, TransformError> {
        let allows_marks = self
            .doc
            .resolve(pos)?
            .parent()
            .node_type()
            .allows_marks();
        let marks = if allows_marks {
            self.current_marks()
        } else {
            Vec::new()
        };
        self.insert(pos, Fragment::from(Node::new_text(text, marks)))
    }

    /// Replace the selection with `content` and put the cursor after it.
    pub fn replace_selection_with(&mut self, content: Fragment) -> Result<&mut Self, TransformError> {
        let ranges = self.selection.ranges();
        let Some(first) = ranges.first().copied() else {
            return Ok(self);
        };
        for range in ranges.iter().skip(1).rev() {
            self.delete(range.from, range.to)?;
        }
        let fitted = self.fit_inline(first.from, first.to, content)?;
        self.replace(fitted.from, fitted.to, fitted.content)?;
        let selection = Selection::near(&self.doc, fitted.content_end);
        Ok(self.set_selection(selection))
    }

    /// Place inline `content` at `from..to`.
    ///
    /// Where the parent takes the content it goes in as is. Among blocks it
    /// is wrapped in a paragraph, or a list item holding one, replacing the
    /// range. Inside a textblock that rejects it, such as a code block, it
    /// becomes a paragraph after that block and the range is left alone.
    fn fit_inline(
        &self,
        from: usize,
        to: usize,
        content: Fragment,
    ) -> Result<Fitted, TransformError> {
        let rfrom = self.doc.resolve(from)?;
        let parent = rfrom.parent().node_type();
        let inline = !content.is_empty() && content.iter().all(Node::is_inline);
        if !inline || parent.valid_content(&content) {
            let content_end = from + content.size();
            return Ok(Fitted {
                from,
                to,
                content,
                content_end,
            });
        }
        let size = content.size();
        let paragraph = Node::new(NodeType::Paragraph, Attrs::default(), content);
        if parent.is_textblock() {
            let after = rfrom.after(rfrom.depth());
            return Ok(Fitted {
                from: after,
                to: after,
                content: Fragment::from(paragraph),
                content_end: after + 1 + size,
            });
        }
        let (wrapped, open) = if parent.accepts(NodeType::Paragraph) {
            (paragraph, 1)
        } else if parent.accepts(NodeType::ListItem) {
            let item = Node::new(
                NodeType::ListItem,
                Attrs::default(),
                Fragment::from(paragraph),
            );
            (item, 2)
        } else {
            return Err(TransformError::InvalidContent { parent });
        };
        Ok(Fitted {
            from,
            to,
            content: Fragment::from(wrapped),
            content_end: from + open + size,
        })
    }

    /// Add `mark` to all markable inline content in `from..to`.
    ///
    /// Content that already carries the mark is left alone and marks of the
    /// same type with other attributes are removed first, so every emitted
    /// step changes exactly the content it covers.
    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<&mut Self, TransformError> {
        let mut removed: Vec<(usize, usize, Mark)> = Vec::new();
        let mut added: Vec<(usize, usize)> = Vec::new();
        for (start, end, node) in self.inline_segments(from, to) {
            if mark.is_in_set(node.marks()) {
                continue;
            }
            if let Some(existing) = mark.mark_type.is_in_set(node.marks()) {
                push_segment(&mut removed, start, end, existing.clone());
            }
            match added.last_mut() {
                Some(last) if last.1 == start => last.1 = end,
                _ => added.push((start, end)),
            }
        }
        for (from, to, mark) in removed {
            self.step(Step::RemoveMark { from, to, mark })?;
        }
        for (from, to) in added {
            self.step(Step::AddMark {
                from,
                to,
                mark: mark.clone(),
            })?;
        }
        Ok(self)
    }

    /// Remove marks of `mark_type` from `from..to`.
    pub fn remove_mark(
        &mut self,
        from: usize,
        to: usize,
        mark_type: MarkType,
    ) -> Result<&mut Self, TransformError> {
        let mut removed: Vec<(usize, usize, Mark)> = Vec::new();
        for (start, end, node) in self.inline_segments(from, to) {
            if let Some(existing) = mark_type.is_in_set(node.marks()) {
                push_segment(&mut removed, start, end, existing.clone());
            }
        }
        for (from, to, mark) in removed {
            self.step(Step::RemoveMark { from, to, mark })?;
        }
        Ok(self)
    }

    /// Markable inline nodes overlapping `from..to`, clipped to the range.
    fn inline_segments(&self, from: usize, to: usize) -> Vec<(usize, usize, Node)> {
        let mut segments = Vec::new();
        if to <= from {
            return segments;
        }
        self.doc.nodes_between(from, to, |node, pos| {
            if node.is_textblock() && !node.node_type().allows_marks() {
                return false;
            }
            if node.is_inline() {
                let start = pos.max(from);
                let end = (pos + node.node_size()).min(to);
                if end > start {
                    segments.push((start, end, node.clone()));
                }
            }
            true
        });
        segments
    }

    /// Replace the sibling blocks in `from..to` with `nodes`, keeping the
    /// selection on the same text by counting textblocks.
    pub(crate) fn replace_blocks(
        &mut self,
        from: usize,
        to: usize,
        nodes: Vec<Node>,
    ) -> Result<&mut Self, TransformError> {
        let rp = self.doc.resolve(from)?;
        let start = rp.start(rp.depth());
        let old = rp.parent().content().cut(from - start, to - start);
        let new = Fragment::from_nodes(nodes);
        let remap = |pos: usize| {
            old.textblock_coords(from, pos)
                .and_then(|(ordinal, offset)| new.pos_in_textblock(from, ordinal, offset))
        };
        let selection = match self.selection.clone() {
            Selection::Text { anchor, head } => remap(anchor)
                .zip(remap(head))
                .map(|(anchor, head)| Selection::text(anchor, head)),
            _ => None,
        };
        self.step(Step::replace(from, to, new))?;
        if let Some(selection) = selection {
            self.set_selection(selection);
        }
        Ok(self)
    }
}

/// Inline content placed by [`Transaction::fit_inline`].
struct Fitted {
    from: usize,
    to: usize,
    content: Fragment,
    /// Position right after the inline content once inserted
    content_end: usize,
}

fn push_segment(segments: &mut Vec<(usize, usize, Mark)>, start: usize, end: usize, mark: Mark) {
    match segments.last_mut() {
        Some(last) if last.1 == start && last.2 == mark => last.1 = end,
        _ => segments.push((start, end, mark)),
    }
}

/// Append inline content to the last textblock inside `node`.
fn append_inline(node: &Node, slice: &Fragment) -> Node {
    if slice.is_empty() {
        return node.clone();
    }
    if node.is_textblock() {
        return node.with_content(node.content().append(slice));
    }
    match node.last_child() {
        Some(last) => {
            let index = node.child_count() - 1;
            node.with_content(node.content().replace_child(index, append_inline(last, slice)))
        }
        None => node.clone(),
    }
}

/// Join two sibling block shells, merging the last textblock of `left`
/// with the first textblock of `right`.
fn join_blocks(left: Node, right: Node) -> Vec<Node> {
    if left.is_textblock() {
        if right.is_textblock() {
            return vec![left.with_content(left.content().append(right.content()))];
        }
        let Some(first) = right.first_child().cloned() else {
            return vec![left];
        };
        let mut out = join_blocks(left, first);
        let rest = right.content().cut(right.child(0).node_size(), right.content_size());
        if !rest.is_empty() {
            if right.node_type().valid_content(&rest) {
                out.push(right.with_content(rest));
            } else {
                out.extend(rest.iter().cloned());
            }
        }
        return out;
    }
    let Some(last) = left.last_child().cloned() else {
        return vec![left, right];
    };
    let mut content = left.content().to_vec();
    content.pop();
    content.extend(join_blocks(last, right));
    let content = Fragment::from_nodes(content);
    if left.node_type().valid_content(&content) {
        vec![left.with_content(content)]
    } else {
        content.to_vec()
    }
}
