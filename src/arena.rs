//! Row-based arena for AST nodes.
//!
//! Every node produced during a parse is allocated here and addressed by a
//! [`NodeId`]. Rows have a fixed capacity; growing the arena appends a new
//! row, so nodes that were already allocated never move. Nothing is freed
//! individually: [`Arena::reset`] drops all rows in one step between parses.

use crate::ast::{Node, NodeKind};

/// Nodes per row. A row is allocated up front and never reallocated.
const ROW_SIZE: usize = 256;

/// Handle to a node inside an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Bulk allocator for [`Node`]s.
#[derive(Debug, Default)]
pub struct Arena {
    rows: Vec<Vec<Node>>,
}

impl Arena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes allocated so far.
    pub fn len(&self) -> usize {
        match self.rows.last() {
            Some(last) => (self.rows.len() - 1) * ROW_SIZE + last.len(),
            None => 0,
        }
    }

    /// True if no node has been allocated.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Allocates `node` and returns its handle. O(1) amortised.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = self.len();
        match self.rows.last_mut() {
            Some(row) if row.len() < ROW_SIZE => row.push(node),
            _ => {
                let mut row = Vec::with_capacity(ROW_SIZE);
                row.push(node);
                self.rows.push(row);
            }
        }
        NodeId(id as u32)
    }

    /// Allocates a zero-initialised node carrying only `kind`.
    pub fn alloc_kind(&mut self, kind: NodeKind) -> NodeId {
        self.alloc(Node::new(kind))
    }

    /// Shared access to a node.
    pub fn get(&self, id: NodeId) -> &Node {
        let idx = id.index();
        &self.rows[idx / ROW_SIZE][idx % ROW_SIZE]
    }

    /// Mutable access to a node.
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        let idx = id.index();
        &mut self.rows[idx / ROW_SIZE][idx % ROW_SIZE]
    }

    /// True if `id` was produced by this arena.
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.len()
    }

    /// Releases every row. Outstanding [`NodeId`]s become invalid.
    pub fn reset(&mut self) {
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_distinct_stable_handles() {
        let mut arena = Arena::new();
        let a = arena.alloc_kind(NodeKind::Str);
        let b = arena.alloc_kind(NodeKind::Para);
        assert_ne!(a, b);
        assert_eq!(arena.get(a).kind, NodeKind::Str);
        assert_eq!(arena.get(b).kind, NodeKind::Para);
    }

    #[test]
    fn grows_past_a_row_without_moving_nodes() {
        let mut arena = Arena::new();
        let first = arena.alloc_kind(NodeKind::Str);
        arena.get_mut(first).text.push_str("anchor");
        for _ in 0..2 * ROW_SIZE {
            arena.alloc_kind(NodeKind::Space);
        }
        assert!(arena.len() > 2 * ROW_SIZE);
        assert_eq!(arena.get(first).text, "anchor");
    }

    #[test]
    fn reset_releases_everything() {
        let mut arena = Arena::new();
        for _ in 0..10 {
            arena.alloc_kind(NodeKind::Str);
        }
        arena.reset();
        assert_eq!(arena.len(), 0);
        assert!(arena.is_empty());
    }
}
