//! PEG-driven Markdown parser core.
//!
//! `mdpeg` converts Markdown source text into an abstract syntax tree. The
//! grammar is a Parsing Expression Grammar evaluated by a backtracking,
//! memoizing engine; parsing runs in three passes over the same buffer:
//! link definitions first, footnote definitions second, then the document
//! itself, so references resolve no matter where they are defined. All
//! nodes live in a row-based arena owned by the returned [`Document`].
//!
//! The classic Markdown rules are always on; Smart punctuation, footnotes,
//! strikethrough, definition lists and the HTML/style filters are gated by
//! [`Extensions`] flags.
//!
//! ```
//! let doc = mdpeg::parse("# Hello\n\nSome *text*.\n").unwrap();
//! assert_eq!(doc.node(doc.root).kind, mdpeg::NodeKind::List);
//! assert!(doc.text_content().contains("Hello"));
//! ```

pub mod arena;
pub mod ast;
pub mod config;
pub mod error;
pub mod input;
pub mod parser;
pub mod references;

pub use arena::{Arena, NodeId};
pub use ast::{LinkData, Node, NodeKind};
pub use config::Extensions;
pub use error::{MarkdownError, Result};
pub use parser::{Document, Parser};
pub use references::{LinkDef, NoteDef, NoteRegistry, ReferenceRegistry};

/// Parses `source` as classic Markdown (no extensions).
///
/// Always returns a root LIST node, possibly with no children; the error
/// paths cover internal invariants only, never bad input.
pub fn parse(source: &str) -> Result<Document> {
    Parser::with_defaults(source).parse()
}

/// Parses `source` with the given extension flags.
///
/// ```
/// use mdpeg::Extensions;
///
/// let doc = mdpeg::parse_with("~~old~~\n", Extensions::none().strike(true)).unwrap();
/// assert!(doc.text_content().contains("old"));
/// ```
pub fn parse_with(source: &str, extensions: Extensions) -> Result<Document> {
    Parser::new(source, extensions).parse()
}
