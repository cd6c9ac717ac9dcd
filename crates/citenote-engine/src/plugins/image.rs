//! Keeps an external attachment store in step with the images in the
//! document.
//!
//! After each batch that changed the document the plugin
//!
//! - reports the attachment keys of all images, in document order, when
//!   they differ from what it reported last;
//! - applies natural dimensions the host measured since the last batch;
//! - hands images inserted by an import over to the host and clears their
//!   transient `src`.
//!
//! The last two edit the document, so they go out as one appended
//! transaction.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::editor::Plugin;
use crate::model::{Attrs, Node, NodeType};
use crate::state::EditorState;
use crate::transform::{Mappable, MetaKey, Step, Transaction};

/// An image whose data the host should store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageImport {
    pub node_id: String,
    pub src: String,
}

/// The side of the attachment store the plugin talks to.
pub trait ImageHost {
    /// The attachment keys now referenced by the document.
    fn sync_attachment_keys(&mut self, keys: &[String]);

    /// Store these images. The host later reports each stored image back
    /// with [`attach_imported_image`](crate::commands::attach_imported_image).
    fn import_images(&mut self, images: &[ImageImport]);

    /// Natural `(width, height)` measured per `node_id` since the last call.
    fn take_pending_dimensions(&mut self) -> HashMap<String, (u32, u32)>;
}

impl<H: ImageHost> ImageHost for Rc<RefCell<H>> {
    fn sync_attachment_keys(&mut self, keys: &[String]) {
        self.borrow_mut().sync_attachment_keys(keys);
    }

    fn import_images(&mut self, images: &[ImageImport]) {
        self.borrow_mut().import_images(images);
    }

    fn take_pending_dimensions(&mut self) -> HashMap<String, (u32, u32)> {
        self.borrow_mut().take_pending_dimensions()
    }
}

/// Natural image dimensions waiting to be written into the document.
#[derive(Debug, Clone, Default)]
pub struct DimensionsStore {
    pending: HashMap<String, (u32, u32)>,
}

impl DimensionsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node_id: impl Into<String>, width: u32, height: u32) {
        self.pending.insert(node_id.into(), (width, height));
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Everything pending, leaving the store empty.
    pub fn take(&mut self) -> HashMap<String, (u32, u32)> {
        std::mem::take(&mut self.pending)
    }
}

pub struct ImageSyncPlugin<H> {
    host: H,
    /// Keys reported after the last batch that changed the document
    observed: Option<Vec<String>>,
}

impl<H: ImageHost> ImageSyncPlugin<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            observed: None,
        }
    }

    pub fn observed(&self) -> Option<&[String]> {
        self.observed.as_deref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn sync_keys(&mut self, doc: &Node) {
        let mut keys = Vec::new();
        doc.descendants(|node, _| {
            if node.node_type() == NodeType::Image {
                if let Some(key) = &node.attrs().attachment_key {
                    keys.push(key.clone());
                }
            }
            true
        });
        if self.observed.as_ref() != Some(&keys) {
            debug!("Attachment keys changed: {keys:?}");
            self.host.sync_attachment_keys(&keys);
            self.observed = Some(keys);
        }
    }

    fn apply_dimensions(&mut self, doc: &Node, tr: &mut Transaction) {
        let pending = self.host.take_pending_dimensions();
        if pending.is_empty() {
            return;
        }
        for (pos, node) in images_between(doc, 0, doc.content_size()) {
            let dimensions = node.attrs().node_id.as_ref().and_then(|id| pending.get(id));
            let Some(&(width, height)) = dimensions else {
                continue;
            };
            let updated = tr.update_attrs(pos, |attrs| Attrs {
                natural_width: Some(width),
                natural_height: Some(height),
                ..attrs.clone()
            });
            if let Err(err) = updated {
                warn!("Cannot set image dimensions at {pos}: {err}");
            }
        }
    }

    /// Collect images inserted by import-tagged transactions that have not
    /// been stored yet, clearing their `src` in `tr`. Images without a
    /// `node_id` cannot be reported; their data is dropped all the same.
    fn collect_imports(
        transactions: &[Transaction],
        doc: &Node,
        tr: &mut Transaction,
    ) -> Vec<ImageImport> {
        let mut seen = BTreeSet::new();
        let mut imports = Vec::new();
        for (index, imported) in transactions.iter().enumerate() {
            if imported.get_meta(MetaKey::ImportImages) != Some(true) {
                continue;
            }
            for (step_index, step) in imported.steps().iter().enumerate() {
                let Step::Replace { slice, .. } = step else {
                    continue;
                };
                if slice.is_empty() {
                    continue;
                }
                let Some((start, end)) = step.get_map().changed_range() else {
                    continue;
                };
                let mut rest = imported.mapping().slice(step_index + 1);
                for later in &transactions[index + 1..] {
                    rest.append(later.mapping());
                }
                let from = rest.map(start, 1);
                let to = rest.map(end, -1);
                if to <= from {
                    continue;
                }
                for (pos, node) in images_between(doc, from, to) {
                    let attrs = node.attrs();
                    let (Some(src), None) = (&attrs.src, &attrs.attachment_key) else {
                        continue;
                    };
                    if !seen.insert(pos) {
                        continue;
                    }
                    match &attrs.node_id {
                        Some(node_id) => imports.push(ImageImport {
                            node_id: node_id.clone(),
                            src: src.clone(),
                        }),
                        None => {
                            warn!("Dropping data of image at {pos}: no node_id to import it under")
                        }
                    }
                    if let Err(err) = tr.update_attrs(pos, |attrs| Attrs {
                        src: None,
                        ..attrs.clone()
                    }) {
                        warn!("Cannot clear imported image at {pos}: {err}");
                    }
                }
            }
        }
        imports
    }
}

fn images_between(doc: &Node, from: usize, to: usize) -> Vec<(usize, Node)> {
    let mut images = Vec::new();
    doc.nodes_between(from, to, |node, pos| {
        if node.node_type() == NodeType::Image {
            images.push((pos, node.clone()));
        }
        true
    });
    images
}

impl<H: ImageHost> Plugin for ImageSyncPlugin<H> {
    fn name(&self) -> &str {
        "image-sync"
    }

    fn append_transaction(
        &mut self,
        transactions: &[Transaction],
        _old_state: &EditorState,
        new_state: &EditorState,
    ) -> Option<Transaction> {
        if !transactions.iter().any(Transaction::doc_changed) {
            return None;
        }
        let doc = &new_state.doc;
        self.sync_keys(doc);

        let mut tr = new_state.tr();
        self.apply_dimensions(doc, &mut tr);
        let imports = Self::collect_imports(transactions, doc, &mut tr);
        if !imports.is_empty() {
            debug!("Importing {} images", imports.len());
            self.host.import_images(&imports);
        }
        tr.doc_changed().then_some(tr)
    }

    fn reset(&mut self) {
        self.observed = None;
    }
}
