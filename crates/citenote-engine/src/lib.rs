//! # citenote-engine
//!
//! Editing core for rich notes that quote annotations and cite sources.
//!
//! - [`model`]: the immutable document tree and its schema
//! - [`transform`]: steps, position mapping and transactions
//! - [`state`]: document, selection and stored marks
//! - [`commands`]: editing operations with dry-run support
//! - [`editor`]: the dispatch pipeline with plugins and undo history
//! - [`plugins`]: keeping an attachment store in step with the document
//!
//! ```
//! use citenote_engine::commands::{IndentDirection, change_indent};
//! use citenote_engine::model::build::{doc, p, text};
//! use citenote_engine::{Editor, EditorState, Selection};
//!
//! let state = EditorState::with_selection(doc(vec![p(vec![text("note")])]), Selection::cursor(1));
//! let mut editor = Editor::new(state);
//! assert!(editor.exec(&change_indent(IndentDirection::Indent)));
//! assert_eq!(editor.state().doc.child(0).attrs().indent, 1);
//! assert!(editor.undo());
//! assert_eq!(editor.state().doc.child(0).attrs().indent, 0);
//! ```

pub mod commands;
pub mod editor;
pub mod error;
pub mod history;
pub mod ids;
pub mod markup;
pub mod model;
pub mod plugins;
pub mod state;
pub mod transform;

pub use commands::{Command, Dispatch};
pub use editor::{Editor, Plugin};
pub use error::{EditorError, TransformError};
pub use state::{EditorState, Selection};
pub use transform::Transaction;
