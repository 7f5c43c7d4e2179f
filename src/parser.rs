//! Driver: three ordered passes over one buffer.
//!
//! Pass 1 collects link definitions, pass 2 footnote definitions, pass 3
//! builds the tree. The cursor rewinds between passes while the arena and
//! both registries persist; the memo table is committed away after each
//! pass. After the document pass, RAW text held by container nodes is split
//! on the `0x01` separator and reparsed through the same grammar until no
//! RAW remains.

pub(crate) mod engine;

mod block;
mod extensions;
mod html;
mod inline;
mod scan;

#[cfg(test)]
mod tests;

use log::debug;

use crate::arena::{Arena, NodeId};
use crate::ast::{self, Node, NodeKind};
use crate::config::Extensions;
use crate::error::{MarkdownError, Result};
use crate::references::{NoteRegistry, ReferenceRegistry};

use engine::{Engine, ParseState};

/// Owns the shared state for one parse.
pub struct Parser {
    state: ParseState,
    source: String,
}

impl Parser {
    /// Prepares a parse of `source` with the given extension flags. The
    /// flags are immutable for the lifetime of the parse.
    pub fn new(source: &str, extensions: Extensions) -> Self {
        // The grammar closes paragraphs and headings on blank lines; the
        // appended newlines guarantee a blank line at end of input.
        Parser {
            state: ParseState::new(extensions),
            source: format!("{}\n\n", source),
        }
    }

    /// Classic Markdown, no extensions.
    pub fn with_defaults(source: &str) -> Self {
        Self::new(source, Extensions::default())
    }

    /// Runs the References, Notes and Document passes and returns the tree
    /// with both registries. Always produces a root LIST for well-behaved
    /// grammars; the error paths are internal invariants only.
    pub fn parse(mut self) -> Result<Document> {
        let root = {
            let mut engine = Engine::new(&mut self.state, &self.source);
            engine.references_pass();
            engine.commit();
            engine.rewind();
            if engine.ext().notes {
                engine.notes_pass();
                engine.commit();
                engine.rewind();
            }
            debug!("document pass");
            let root = engine.document();
            if !engine.at_end() {
                return Err(MarkdownError::Parse {
                    position: engine.pos(),
                    message: "grammar failed to consume the document".to_string(),
                });
            }
            engine.commit();
            root
        };
        process_raw_chain(&mut self.state, Some(root));
        if let Some(err) = self.state.fatal.take() {
            return Err(err);
        }
        let ParseState {
            arena,
            references,
            notes,
            ..
        } = self.state;
        Ok(Document {
            root,
            arena,
            references,
            notes,
        })
    }

    /// Parses a single leading block instead of the whole document. The
    /// registries are still populated from the full buffer first, so
    /// references inside the block resolve.
    pub fn parse_block(mut self) -> Result<Document> {
        let root = {
            let mut engine = Engine::new(&mut self.state, &self.source);
            engine.references_pass();
            engine.commit();
            engine.rewind();
            if engine.ext().notes {
                engine.notes_pass();
                engine.commit();
                engine.rewind();
            }
            let head = match engine.docblock() {
                Some(b) => engine.cons(b, None),
                None => None,
            };
            engine.commit();
            engine.mk_list(NodeKind::List, head)
        };
        process_raw_chain(&mut self.state, Some(root));
        if let Some(err) = self.state.fatal.take() {
            return Err(err);
        }
        let ParseState {
            arena,
            references,
            notes,
            ..
        } = self.state;
        Ok(Document {
            root,
            arena,
            references,
            notes,
        })
    }
}

/// Result of a parse: the root node, the arena every node lives in, and the
/// two registries built by the early passes.
pub struct Document {
    pub root: NodeId,
    pub arena: Arena,
    pub references: ReferenceRegistry,
    pub notes: NoteRegistry,
}

impl Document {
    pub fn node(&self, id: NodeId) -> &Node {
        self.arena.get(id)
    }

    /// Children of `id` in source order.
    pub fn children(&self, id: NodeId) -> ast::ChainIter<'_> {
        ast::chain(&self.arena, self.arena.get(id).child)
    }

    /// Top-level blocks.
    pub fn root_children(&self) -> ast::ChainIter<'_> {
        self.children(self.root)
    }

    /// Concatenated text slots in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.arena, self.arena.get(self.root).child, &mut out);
        out
    }
}

fn collect_text(arena: &Arena, head: Option<NodeId>, out: &mut String) {
    let mut cur = head;
    while let Some(id) = cur {
        let node = arena.get(id);
        out.push_str(&node.text);
        if let Some(link) = &node.link {
            collect_text(arena, link.label, out);
        }
        collect_text(arena, node.child, out);
        cur = node.next;
    }
}

/// Walks the tree converting RAW holders into parsed block chains. RAW
/// nodes become transparent LIST nodes in place; blockquotes, list items
/// and definition data keep their kind and gain real children.
fn process_raw_chain(state: &mut ParseState, head: Option<NodeId>) {
    let mut cur = head;
    while let Some(id) = cur {
        match state.arena.get(id).kind {
            NodeKind::Raw => {
                let text = std::mem::take(&mut state.arena.get_mut(id).text);
                let parsed = parse_raw_chunks(state, &text);
                let node = state.arena.get_mut(id);
                node.kind = NodeKind::List;
                node.child = parsed;
            }
            NodeKind::BlockQuote | NodeKind::ListItem | NodeKind::DefData => {
                let text = std::mem::take(&mut state.arena.get_mut(id).text);
                if !text.is_empty() {
                    let parsed = parse_raw_chunks(state, &text);
                    state.arena.get_mut(id).child = parsed;
                }
            }
            _ => {}
        }
        let node = state.arena.get(id);
        let (child, next) = (node.child, node.next);
        process_raw_chain(state, child);
        cur = next;
    }
}

/// `0x01` marks boundaries between blocks that met without a blank line;
/// each segment parses as its own block list.
fn parse_raw_chunks(state: &mut ParseState, text: &str) -> Option<NodeId> {
    let mut out = None;
    for chunk in text.split('\u{1}') {
        let root = {
            let mut engine = Engine::new(&mut *state, chunk);
            engine.document()
        };
        let children = state.arena.get(root).child;
        out = append_chain(&mut state.arena, out, children);
    }
    out
}

fn append_chain(arena: &mut Arena, a: Option<NodeId>, b: Option<NodeId>) -> Option<NodeId> {
    match a {
        None => b,
        Some(head) => {
            let mut tail = head;
            while let Some(next) = arena.get(tail).next {
                tail = next;
            }
            arena.get_mut(tail).next = b;
            Some(head)
        }
    }
}
