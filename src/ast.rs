//! AST node model and constructors.
//!
//! The tree has a single node type: a `kind` tag plus an inline text slot,
//! an optional link payload, and first-child / next-sibling handles into the
//! arena. Semantic actions build sibling chains head-first (a cons-list);
//! [`reverse`] restores source order before a chain is exposed as children.

use crate::arena::{Arena, NodeId};

/// Closed set of node kinds.
///
/// `H1..=H6` are numerically contiguous so a heading level maps onto a kind
/// by offset; see [`NodeKind::heading`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    List,
    Raw,
    Space,
    Linebreak,
    Ellipsis,
    Emdash,
    Endash,
    Apostrophe,
    SingleQuoted,
    DoubleQuoted,
    Str,
    Link,
    Image,
    Code,
    Html,
    Emph,
    Strong,
    Strike,
    Plain,
    Para,
    ListItem,
    BulletList,
    OrderedList,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    BlockQuote,
    Verbatim,
    HtmlBlock,
    HRule,
    Reference,
    Note,
    DefinitionList,
    DefTitle,
    DefData,
}

impl NodeKind {
    /// Heading kind for `level` (clamped to 1..=6).
    pub fn heading(level: u8) -> NodeKind {
        match level {
            0 | 1 => NodeKind::H1,
            2 => NodeKind::H2,
            3 => NodeKind::H3,
            4 => NodeKind::H4,
            5 => NodeKind::H5,
            _ => NodeKind::H6,
        }
    }

    /// Heading level of this kind, if it is one of `H1..=H6`.
    pub fn heading_level(self) -> Option<u8> {
        match self {
            NodeKind::H1 => Some(1),
            NodeKind::H2 => Some(2),
            NodeKind::H3 => Some(3),
            NodeKind::H4 => Some(4),
            NodeKind::H5 => Some(5),
            NodeKind::H6 => Some(6),
            _ => None,
        }
    }
}

/// Link payload carried by LINK, IMAGE and REFERENCE nodes.
#[derive(Debug, Clone, Default)]
pub struct LinkData {
    /// In-order chain of inline nodes making up the label.
    pub label: Option<NodeId>,
    pub url: String,
    pub title: String,
}

/// The sole AST entity.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Inline text slot (STR, CODE, HTML, HTMLBLOCK, VERBATIM, RAW).
    pub text: String,
    pub link: Option<LinkData>,
    /// First child.
    pub child: Option<NodeId>,
    /// Next sibling.
    pub next: Option<NodeId>,
}

impl Node {
    /// Fresh node with only `kind` set.
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            text: String::new(),
            link: None,
            child: None,
            next: None,
        }
    }
}

/// Fresh node with only `kind` set.
pub fn elem(arena: &mut Arena, kind: NodeKind) -> NodeId {
    arena.alloc_kind(kind)
}

/// STR node holding `s`.
pub fn string(arena: &mut Arena, s: &str) -> NodeId {
    text_elem(arena, NodeKind::Str, s)
}

/// Node of `kind` holding `s` in its text slot.
pub fn text_elem(arena: &mut Arena, kind: NodeKind, s: &str) -> NodeId {
    let mut node = Node::new(kind);
    node.text.push_str(s);
    arena.alloc(node)
}

/// Node of `kind` whose children are `reverse(head)`.
pub fn list(arena: &mut Arena, kind: NodeKind, head: Option<NodeId>) -> NodeId {
    let children = reverse(arena, head);
    let id = arena.alloc_kind(kind);
    arena.get_mut(id).child = children;
    id
}

/// STR node concatenating the text of `reverse(head)`, with an optional
/// trailing line feed.
pub fn string_from_list(arena: &mut Arena, head: Option<NodeId>, newline: bool) -> NodeId {
    let mut text = String::new();
    let mut cur = reverse(arena, head);
    while let Some(id) = cur {
        let node = arena.get(id);
        text.push_str(&node.text);
        cur = node.next;
    }
    if newline {
        text.push('\n');
    }
    text_elem(arena, NodeKind::Str, &text)
}

/// LINK node with its payload attached. `label` is an in-order chain.
pub fn link(arena: &mut Arena, label: Option<NodeId>, url: &str, title: &str) -> NodeId {
    let id = arena.alloc_kind(NodeKind::Link);
    arena.get_mut(id).link = Some(LinkData {
        label,
        url: url.to_string(),
        title: title.to_string(),
    });
    id
}

/// Prepends `new` to the chain starting at `head` and returns the new head.
pub fn cons(arena: &mut Arena, new: NodeId, head: Option<NodeId>) -> Option<NodeId> {
    arena.get_mut(new).next = head;
    Some(new)
}

/// Iterative in-place reversal of the `next` chain; returns the new head.
pub fn reverse(arena: &mut Arena, head: Option<NodeId>) -> Option<NodeId> {
    let mut prev = None;
    let mut cur = head;
    while let Some(id) = cur {
        let node = arena.get_mut(id);
        cur = node.next;
        node.next = prev;
        prev = Some(id);
    }
    prev
}

/// Deep copy of the chain starting at `head` into the same arena.
///
/// Used when a footnote body from the registry is spliced into the tree: the
/// registry keeps its own chain, the tree gets a fresh one.
pub fn clone_chain(arena: &mut Arena, head: Option<NodeId>) -> Option<NodeId> {
    let mut out = None;
    let mut cur = head;
    while let Some(id) = cur {
        let node = arena.get(id);
        cur = node.next;
        let mut copy = Node::new(node.kind);
        copy.text = node.text.clone();
        let (child, payload) = (node.child, node.link.clone());
        copy.child = clone_chain(arena, child);
        copy.link = payload.map(|l| LinkData {
            label: clone_chain(arena, l.label),
            url: l.url,
            title: l.title,
        });
        let copy_id = arena.alloc(copy);
        out = cons(arena, copy_id, out);
    }
    reverse(arena, out)
}

/// Iterator over a sibling chain, starting at `head`.
pub fn chain(arena: &Arena, head: Option<NodeId>) -> ChainIter<'_> {
    ChainIter { arena, cur: head }
}

/// See [`chain`].
pub struct ChainIter<'a> {
    arena: &'a Arena,
    cur: Option<NodeId>,
}

impl Iterator for ChainIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.cur?;
        self.cur = self.arena.get(id).next;
        Some(id)
    }
}
