//! The per-slot bookkeeping record that wires a node into the tree.

use crate::node_idx::NodeIdx;
use serde::{Deserialize, Serialize};

/// Structural state of one arena slot.  A record carries no user data; the
/// value lives in the co-indexed slot of the arena's value store.  Every link
/// uses [`NodeIdx::ROOT`] to mean "none".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub(crate) struct Node {
    pub parent: NodeIdx,
    pub first_child: NodeIdx,
    pub prev_sibling: NodeIdx,
    pub next_sibling: NodeIdx,
    pub depth: u32,
    pub valid: bool,
}

impl Node {
    /// A slot that has never been handed out, or whose node has been erased.
    pub fn vacant() -> Self {
        Self {
            parent: NodeIdx::ROOT,
            first_child: NodeIdx::ROOT,
            prev_sibling: NodeIdx::ROOT,
            next_sibling: NodeIdx::ROOT,
            depth: 0,
            valid: false,
        }
    }

    /// The sentinel root record: always valid, no parent, no siblings,
    /// depth 0.
    pub fn root() -> Self {
        Self {
            valid: true,
            ..Self::vacant()
        }
    }
}
