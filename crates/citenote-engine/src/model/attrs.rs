use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Largest value the `indent` attribute may take.
pub const MAX_INDENT: u8 = 6;

/// Block alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
    Justify,
}

/// Text direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDir {
    Ltr,
    Rtl,
}

/// Where an annotation lives in its source attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationPosition {
    #[serde(default)]
    pub page_index: u32,
    /// `[x1, y1, x2, y2]` rectangles in PDF points
    #[serde(default)]
    pub rects: Vec<[f64; 4]>,
}

/// The part of an annotation kept in the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAnnotation {
    pub uri: String,
    #[serde(default)]
    pub position: AnnotationPosition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationItem {
    pub uris: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Citation payload carried by citation nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub citation_items: Vec<CitationItem>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

fn is_zero(value: &u8) -> bool {
    *value == 0
}

/// Node attributes.
///
/// One record serves every node type; which fields are meaningful for a
/// type is declared by its capabilities and content in
/// [`NodeType::spec`](super::NodeType::spec). Unset fields hold the type
/// default, so replacing a record with `Attrs { dir, ..Default::default() }`
/// resets everything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Attrs {
    #[serde(skip_serializing_if = "is_zero")]
    pub indent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<TextDir>,
    /// Heading level, 1 when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    /// Ordered list start number, 1 when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Transient image data (usually a data URL), never persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<SavedAnnotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
}

impl Attrs {
    pub fn is_default(&self) -> bool {
        *self == Attrs::default()
    }

    pub fn with_node_id(node_id: impl Into<String>) -> Self {
        Self {
            node_id: Some(node_id.into()),
            ..Self::default()
        }
    }

    pub fn heading_level(&self) -> u8 {
        self.level.unwrap_or(1)
    }
}
