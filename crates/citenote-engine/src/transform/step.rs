use crate::error::TransformError;
use crate::model::{Attrs, Fragment, Mark, Node, NodeType};

use super::mapping::{Mappable, StepMap};

/// An atomic, invertible document edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace `from..to`, which must share a parent, with `slice`.
    Replace {
        from: usize,
        to: usize,
        slice: Vec<Node>,
    },
    /// Change the type and attributes of the node at `pos`.
    SetNodeMarkup {
        pos: usize,
        node_type: NodeType,
        attrs: Attrs,
    },
    AddMark { from: usize, to: usize, mark: Mark },
    RemoveMark { from: usize, to: usize, mark: Mark },
}

impl Step {
    pub fn replace(from: usize, to: usize, slice: Fragment) -> Self {
        Step::Replace {
            from,
            to,
            slice: slice.to_vec(),
        }
    }

    pub fn apply(&self, doc: &Node) -> Result<Node, TransformError> {
        match self {
            Step::Replace { from, to, slice } => {
                doc.replace(*from, *to, &Fragment::from_nodes(slice.iter().cloned()))
            }
            Step::SetNodeMarkup {
                pos,
                node_type,
                attrs,
            } => {
                let node = doc
                    .node_at(*pos)
                    .filter(|node| !node.is_text())
                    .ok_or(TransformError::NoNodeAt(*pos))?;
                if !node_type.valid_content(node.content()) {
                    return Err(TransformError::InvalidContent { parent: *node_type });
                }
                let updated = node.with_markup(*node_type, attrs.clone());
                doc.replace(*pos, pos + node.node_size(), &Fragment::from(updated))
            }
            Step::AddMark { from, to, mark } => {
                check_range(doc, *from, *to)?;
                Ok(doc.map_inline(*from, *to, &|node: &Node| {
                    node.with_marks(mark.add_to_set(node.marks()))
                }))
            }
            Step::RemoveMark { from, to, mark } => {
                check_range(doc, *from, *to)?;
                Ok(doc.map_inline(*from, *to, &|node: &Node| {
                    let marks = node.marks().iter().filter(|m| *m != mark).cloned().collect();
                    node.with_marks(marks)
                }))
            }
        }
    }

    /// The step that undoes this one, given the document it was applied to.
    pub fn invert(&self, doc: &Node) -> Result<Step, TransformError> {
        Ok(match self {
            Step::Replace { from, to, slice } => {
                let rp = doc.resolve(*from)?;
                let start = rp.start(rp.depth());
                let removed = rp.parent().content().cut(from - start, to - start);
                let inserted: usize = slice.iter().map(Node::node_size).sum();
                Step::replace(*from, from + inserted, removed)
            }
            Step::SetNodeMarkup { pos, .. } => {
                let node = doc.node_at(*pos).ok_or(TransformError::NoNodeAt(*pos))?;
                Step::SetNodeMarkup {
                    pos: *pos,
                    node_type: node.node_type(),
                    attrs: node.attrs().clone(),
                }
            }
            Step::AddMark { from, to, mark } => Step::RemoveMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            },
            Step::RemoveMark { from, to, mark } => Step::AddMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            },
        })
    }

    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace { from, to, slice } => {
                StepMap::new(*from, to - from, slice.iter().map(Node::node_size).sum())
            }
            _ => StepMap::identity(),
        }
    }

    /// This step rebased over `mapping`, or `None` when the content it
    /// targets was deleted.
    pub fn map(&self, mapping: &impl Mappable) -> Option<Step> {
        match self {
            Step::Replace { from, to, slice } => {
                let start = mapping.map_result(*from, 1);
                let end = mapping.map_result(*to, -1);
                if start.deleted && end.deleted && to > from {
                    return None;
                }
                Some(Step::Replace {
                    from: start.pos,
                    to: end.pos.max(start.pos),
                    slice: slice.clone(),
                })
            }
            Step::SetNodeMarkup {
                pos,
                node_type,
                attrs,
            } => {
                let mapped = mapping.map_result(*pos, 1);
                (!mapped.deleted).then(|| Step::SetNodeMarkup {
                    pos: mapped.pos,
                    node_type: *node_type,
                    attrs: attrs.clone(),
                })
            }
            Step::AddMark { from, to, mark } | Step::RemoveMark { from, to, mark } => {
                let start = mapping.map(*from, 1);
                let end = mapping.map(*to, -1);
                if start >= end {
                    return None;
                }
                Some(match self {
                    Step::AddMark { .. } => Step::AddMark {
                        from: start,
                        to: end,
                        mark: mark.clone(),
                    },
                    _ => Step::RemoveMark {
                        from: start,
                        to: end,
                        mark: mark.clone(),
                    },
                })
            }
        }
    }
}

fn check_range(doc: &Node, from: usize, to: usize) -> Result<(), TransformError> {
    let size = doc.content_size();
    if from > to || to > size {
        return Err(TransformError::PositionOutOfRange { pos: to, size });
    }
    Ok(())
}
