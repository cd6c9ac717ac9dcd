//! Plugins for the [`Editor`](crate::editor::Editor) pipeline.

mod image;

pub use image::{DimensionsStore, ImageHost, ImageImport, ImageSyncPlugin};
