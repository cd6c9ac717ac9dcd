//! Inserting annotations and citations, and filling in data that arrives
//! for them later.

use serde::{Deserialize, Serialize};

use crate::ids::IdGenerator;
use crate::markup::MarkupParser;
use crate::model::{
    AnnotationPosition, Attrs, Citation, Fragment, MarkAttrs, MarkType, Node, NodeType,
    SavedAnnotation,
};
use crate::state::EditorState;
use crate::transform::MetaKey;

use super::{Dispatch, rejected};

/// CSS pixels per PDF point.
const CSS_UNITS: f64 = 96.0 / 72.0;

/// Scale applied to image annotations unless configured otherwise.
pub const DEFAULT_IMAGE_SCALE: f64 = 1.25;

/// An annotation as handed over by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub uri: String,
    #[serde(default)]
    pub position: AnnotationPosition,
    /// Image data for image annotations, usually a data URL
    #[serde(default)]
    pub image: Option<String>,
    /// Markup
    #[serde(default)]
    pub comment: Option<String>,
    /// Markup
    #[serde(default)]
    pub text: Option<String>,
}

impl Annotation {
    fn saved(&self) -> SavedAnnotation {
        SavedAnnotation {
            uri: self.uri.clone(),
            position: self.position.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationEntry {
    #[serde(default)]
    pub annotation: Option<Annotation>,
    #[serde(default)]
    pub citation: Option<Citation>,
}

/// Services the insertion command needs from its host.
#[derive(Clone, Copy)]
pub struct ImportEnv<'a> {
    pub markup: &'a dyn MarkupParser,
    pub ids: &'a dyn IdGenerator,
    pub image_scale: f64,
}

impl<'a> ImportEnv<'a> {
    pub fn new(markup: &'a dyn MarkupParser, ids: &'a dyn IdGenerator) -> Self {
        Self {
            markup,
            ids,
            image_scale: DEFAULT_IMAGE_SCALE,
        }
    }

    pub fn with_image_scale(self, image_scale: f64) -> Self {
        Self {
            image_scale,
            ..self
        }
    }
}

/// Inline content for a list of entries.
///
/// Per annotation: the image, then the comment directly after it, then the
/// quoted text as a highlight with a space before it when anything precedes
/// it. A space follows each annotation once there is content. Per entry the
/// citation comes last. Anything empty or malformed is left out.
pub fn build_annotation_fragment(entries: &[AnnotationEntry], env: &ImportEnv<'_>) -> Fragment {
    let space = || Node::new_text(" ", Vec::new());
    let mut nodes = Vec::new();
    for entry in entries {
        if let Some(annotation) = &entry.annotation {
            if let Some(image) = annotation_image(annotation, env) {
                nodes.push(image);
            }
            if let Some(comment) = non_empty(&annotation.comment) {
                nodes.extend(env.markup.parse(comment, true).iter().cloned());
            }
            if let Some(text) = non_empty(&annotation.text) {
                let quoted = highlight(annotation, env.markup.parse(text, true));
                if !quoted.is_empty() && !nodes.is_empty() {
                    nodes.push(space());
                }
                nodes.extend(quoted);
            }
            if !nodes.is_empty() {
                nodes.push(space());
            }
        }
        if let Some(citation) = &entry.citation {
            let attrs = Attrs {
                citation: Some(citation.clone()),
                ..Attrs::with_node_id(env.ids.next_id())
            };
            nodes.push(Node::leaf(NodeType::Citation, attrs));
        }
    }
    Fragment::from_nodes(nodes)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

/// Image node sized from the first rectangle of the annotation.
fn annotation_image(annotation: &Annotation, env: &ImportEnv<'_>) -> Option<Node> {
    let src = non_empty(&annotation.image)?;
    let [x1, y1, x2, y2] = *annotation.position.rects.first()?;
    let rect_width = x2 - x1;
    let rect_height = y2 - y1;
    if rect_width <= 0.0 || rect_height < 0.0 {
        return None;
    }
    let width = (rect_width * CSS_UNITS * env.image_scale).round();
    let height = (rect_height * width / rect_width).round();
    let attrs = Attrs {
        src: Some(src.to_string()),
        width: Some(width as u32),
        height: Some(height as u32),
        annotation: Some(annotation.saved()),
        ..Attrs::with_node_id(env.ids.next_id())
    };
    Some(Node::leaf(NodeType::Image, attrs))
}

/// `“text”` with every node carrying a highlight that points back at the
/// annotation.
fn highlight(annotation: &Annotation, content: Fragment) -> Vec<Node> {
    if content.is_empty() {
        return Vec::new();
    }
    let mark = MarkType::Highlight.create(MarkAttrs {
        annotation: Some(annotation.saved()),
        ..MarkAttrs::default()
    });
    let mut nodes = vec![Node::new_text("“", Vec::new())];
    nodes.extend(content.iter().cloned());
    nodes.push(Node::new_text("”", Vec::new()));
    nodes
        .into_iter()
        .map(|node| {
            let marks = mark.add_to_set(node.marks());
            node.with_marks(marks)
        })
        .collect()
}

/// Insert the content for `entries` at `pos`, or in place of the
/// selection. The transaction is tagged for image import.
pub fn insert_annotations_and_citations<'a>(
    entries: Vec<AnnotationEntry>,
    pos: Option<usize>,
    env: ImportEnv<'a>,
) -> impl Fn(&EditorState, Dispatch<'_>) -> bool + 'a {
    move |state: &EditorState, dispatch: Dispatch<'_>| {
        let fragment = build_annotation_fragment(&entries, &env);
        if fragment.is_empty() {
            return false;
        }
        let Some(dispatch) = dispatch else {
            return true;
        };
        let mut tr = state.tr();
        let inserted = match pos {
            Some(pos) => tr.insert(pos, fragment).map(|_| ()),
            None => tr.replace_selection_with(fragment).map(|_| ()),
        };
        if let Err(err) = inserted {
            return rejected("insert_annotations_and_citations", err);
        }
        tr.set_meta(MetaKey::ImportImages, true);
        dispatch(tr);
        true
    }
}

/// Position of the first node, in document order, whose `node_id` is
/// `node_id`.
fn find_node_id(doc: &Node, node_id: &str) -> Option<usize> {
    let mut found = None;
    doc.descendants(|node, pos| {
        if found.is_some() {
            return false;
        }
        if node.attrs().node_id.as_deref() == Some(node_id) {
            found = Some(pos);
            return false;
        }
        true
    });
    found
}

/// Store a resolved citation on the citation node with `node_id`.
pub fn set_citation(
    node_id: String,
    citation: Citation,
) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    move |state: &EditorState, dispatch: Dispatch<'_>| {
        let Some(pos) = find_node_id(&state.doc, &node_id) else {
            return false;
        };
        if let Some(dispatch) = dispatch {
            let mut tr = state.tr();
            if let Err(err) = tr.update_attrs(pos, |attrs| Attrs {
                citation: Some(citation.clone()),
                ..attrs.clone()
            }) {
                return rejected("set_citation", err);
            }
            dispatch(tr);
        }
        true
    }
}

/// Record that the image with `node_id` now lives in the attachment store
/// under `attachment_key`, dropping its transient data. Not undoable.
pub fn attach_imported_image(
    node_id: String,
    attachment_key: String,
) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    move |state: &EditorState, dispatch: Dispatch<'_>| {
        let Some(pos) = find_node_id(&state.doc, &node_id) else {
            return false;
        };
        if let Some(dispatch) = dispatch {
            let mut tr = state.tr();
            if let Err(err) = tr.update_attrs(pos, |attrs| Attrs {
                src: None,
                attachment_key: Some(attachment_key.clone()),
                ..attrs.clone()
            }) {
                return rejected("attach_imported_image", err);
            }
            tr.set_meta(MetaKey::AddToHistory, false);
            dispatch(tr);
        }
        true
    }
}
