//! # citenote-markup
//!
//! Reads the small HTML subset found in annotation comments and highlighted
//! text into blocks of styled runs. The engine turns those runs into
//! document content.
//!
//! Two stages:
//! - [`lexer`] splits the markup into tags, entities and text using Logos
//! - [`reader`] tracks open styles and block boundaries to build [`Block`]s
//!
//! ```
//! use citenote_markup::{parse, Run, Style};
//!
//! let blocks = parse("<b>Bold</b> claim", true);
//! assert_eq!(blocks.len(), 1);
//! assert_eq!(
//!     blocks[0].runs[0],
//!     Run::Text { text: "Bold".into(), styles: vec![Style::Bold] }
//! );
//! ```

pub mod lexer;
pub mod reader;

pub use reader::{Block, BlockKind, Run, Style, parse};
