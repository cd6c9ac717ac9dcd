use crate::error::TransformError;

use super::Node;

/// An ordered sequence of child nodes.
///
/// Construction normalizes inline content: empty text nodes are dropped and
/// adjacent text nodes carrying the same marks are merged, so two fragments
/// describing the same content compare equal.
#[derive(Clone, Default, PartialEq)]
pub struct Fragment {
    nodes: Vec<Node>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut out: Vec<Node> = Vec::new();
        for node in nodes {
            if node.is_text() && node.node_size() == 0 {
                continue;
            }
            if let Some(last) = out.last_mut()
                && last.is_text()
                && node.is_text()
                && last.marks() == node.marks()
            {
                let merged = format!("{}{}", last.text().unwrap_or(""), node.text().unwrap_or(""));
                *last = Node::new_text(merged, last.marks().to_vec());
                continue;
            }
            out.push(node);
        }
        let size = out.iter().map(Node::node_size).sum();
        Self { nodes: out, size }
    }

    /// Total size of the content in positions.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn child(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn to_vec(&self) -> Vec<Node> {
        self.nodes.clone()
    }

    /// Index of the child at `pos` and the offset where that child starts.
    ///
    /// A position on the boundary after a child resolves to the next index.
    pub fn find_index(&self, pos: usize) -> Result<(usize, usize), TransformError> {
        if pos == 0 {
            return Ok((0, 0));
        }
        if pos == self.size {
            return Ok((self.nodes.len(), self.size));
        }
        if pos > self.size {
            return Err(TransformError::PositionOutOfRange {
                pos,
                size: self.size,
            });
        }
        let mut cur = 0;
        for (index, child) in self.nodes.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos {
                    return Ok((index + 1, end));
                }
                return Ok((index, cur));
            }
            cur = end;
        }
        Err(TransformError::PositionOutOfRange {
            pos,
            size: self.size,
        })
    }

    /// The content between two positions, cutting partially covered nodes.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to >= self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        if to > from {
            let mut pos = 0;
            for child in &self.nodes {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let piece = if pos < from || end > to {
                        if child.is_text() {
                            child.cut(from.saturating_sub(pos), (to - pos).min(child.node_size()))
                        } else {
                            child.cut(
                                from.saturating_sub(pos + 1),
                                (to.saturating_sub(pos + 1)).min(child.content_size()),
                            )
                        }
                    } else {
                        child.clone()
                    };
                    result.push(piece);
                }
                pos = end;
            }
        }
        Fragment::from_nodes(result)
    }

    pub fn append(&self, other: &Fragment) -> Fragment {
        Fragment::from_nodes(self.nodes.iter().chain(other.nodes.iter()).cloned())
    }

    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let mut nodes = self.nodes.clone();
        nodes[index] = node;
        Fragment::from_nodes(nodes)
    }

    /// Calls `f` for every node overlapping `from..to` with its absolute
    /// position. Returning `false` skips the node's children.
    pub fn nodes_between<F>(&self, from: usize, to: usize, f: &mut F, node_start: usize)
    where
        F: FnMut(&Node, usize) -> bool,
    {
        let mut pos = 0;
        for child in &self.nodes {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos) && child.content_size() > 0 {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    (to.saturating_sub(start)).min(child.content_size()),
                    f,
                    node_start + start,
                );
            }
            pos = end;
        }
    }

    /// Position of the `ordinal`-th textblock's content start plus `offset`.
    pub(crate) fn pos_in_textblock(&self, base: usize, ordinal: usize, offset: usize) -> Option<usize> {
        let mut seen = 0;
        let mut found = None;
        self.nodes_between(
            0,
            self.size,
            &mut |node, pos| {
                if found.is_some() {
                    return false;
                }
                if node.is_textblock() {
                    if seen == ordinal {
                        found = Some(base + pos + 1 + offset.min(node.content_size()));
                    }
                    seen += 1;
                    return false;
                }
                true
            },
            0,
        );
        found
    }

    /// The textblock containing `pos` (absolute, fragment starting at
    /// `base`) as an ordinal among this fragment's textblocks, plus the
    /// offset into its content.
    pub(crate) fn textblock_coords(&self, base: usize, pos: usize) -> Option<(usize, usize)> {
        let mut seen = 0;
        let mut found = None;
        self.nodes_between(
            0,
            self.size,
            &mut |node, node_pos| {
                if found.is_some() {
                    return false;
                }
                if node.is_textblock() {
                    let start = base + node_pos + 1;
                    let end = start + node.content_size();
                    if pos >= start && pos <= end {
                        found = Some((seen, pos - start));
                    }
                    seen += 1;
                    return false;
                }
                true
            },
            0,
        );
        found
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Fragment::from_nodes(nodes)
    }
}

impl From<Node> for Fragment {
    fn from(node: Node) -> Self {
        Fragment::from_nodes([node])
    }
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl std::fmt::Debug for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.nodes.iter()).finish()
    }
}
