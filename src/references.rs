//! Link and footnote definition registries.
//!
//! Pass 1 fills the link registry, pass 2 the note registry; pass 3 only
//! reads them. Link lookup scans in insertion order and returns the first
//! entry whose stored label matches the probe structurally, so behaviour on
//! duplicate labels is first-definition-wins.

use crate::arena::{Arena, NodeId};
use crate::ast::NodeKind;
use crate::error::{MarkdownError, Result};

/// One link definition: `[label]: url "title"`.
#[derive(Debug, Clone)]
pub struct LinkDef {
    /// In-order inline chain of the defining label.
    pub label: Option<NodeId>,
    pub url: String,
    pub title: String,
}

/// Insertion-ordered store of link definitions.
#[derive(Debug, Default)]
pub struct ReferenceRegistry {
    entries: Vec<LinkDef>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a definition discovered by the references pass.
    pub fn record(&mut self, label: Option<NodeId>, url: &str, title: &str) {
        self.entries.push(LinkDef {
            label,
            url: url.to_string(),
            title: title.to_string(),
        });
    }

    /// First entry whose label matches `label` structurally.
    ///
    /// The url and title are returned by value so the caller can keep
    /// allocating nodes while holding the result.
    pub fn find(
        &self,
        arena: &Arena,
        label: Option<NodeId>,
    ) -> Result<Option<(String, String)>> {
        for entry in &self.entries {
            if match_inlines(arena, entry.label, label)? {
                return Ok(Some((entry.url.clone(), entry.title.clone())));
            }
        }
        Ok(None)
    }

    pub fn entries(&self) -> &[LinkDef] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One footnote definition: `[^key]: body`.
#[derive(Debug, Clone)]
pub struct NoteDef {
    pub key: String,
    /// In-order chain of the definition body (RAW until the post-pass).
    pub body: Option<NodeId>,
}

/// String-keyed store of footnote definitions.
#[derive(Debug, Default)]
pub struct NoteRegistry {
    entries: Vec<NoteDef>,
}

impl NoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a definition discovered by the notes pass.
    pub fn record(&mut self, key: &str, body: Option<NodeId>) {
        self.entries.push(NoteDef {
            key: key.to_string(),
            body,
        });
    }

    /// Body chain of the first definition for `key`.
    pub fn find(&self, key: &str) -> Option<Option<NodeId>> {
        self.entries
            .iter()
            .find(|n| n.key == key)
            .map(|n| n.body)
    }

    pub fn entries(&self) -> &[NoteDef] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Case-insensitive structural comparison of two inline chains.
///
/// Chains are equal when corresponding nodes match pairwise and both chains
/// exhaust together. Kind-only kinds compare by tag, text kinds by ASCII
/// case-folded bytes, container kinds by recursion; links and images never
/// match. Meeting any other kind is a structural error.
pub fn match_inlines(arena: &Arena, a: Option<NodeId>, b: Option<NodeId>) -> Result<bool> {
    let mut left = a;
    let mut right = b;
    while let (Some(l), Some(r)) = (left, right) {
        let ln = arena.get(l);
        let rn = arena.get(r);
        if ln.kind != rn.kind {
            return Ok(false);
        }
        match ln.kind {
            NodeKind::Space
            | NodeKind::Linebreak
            | NodeKind::Ellipsis
            | NodeKind::Emdash
            | NodeKind::Endash
            | NodeKind::Apostrophe => {}
            NodeKind::Code | NodeKind::Str | NodeKind::Html => {
                if !ln.text.eq_ignore_ascii_case(&rn.text) {
                    return Ok(false);
                }
            }
            NodeKind::Emph
            | NodeKind::Strong
            | NodeKind::List
            | NodeKind::SingleQuoted
            | NodeKind::DoubleQuoted => {
                if !match_inlines(arena, ln.child, rn.child)? {
                    return Ok(false);
                }
            }
            NodeKind::Link | NodeKind::Image => return Ok(false),
            kind => return Err(MarkdownError::Structural { kind }),
        }
        left = ln.next;
        right = rn.next;
    }
    Ok(left.is_none() && right.is_none())
}
