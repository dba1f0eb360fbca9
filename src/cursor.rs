//! Resumable traversal cursors.
//!
//! Every cursor implements the same single-step contract: `advance` takes the
//! id the cursor returned last ([`NodeIdx::ROOT`] to start) and produces the
//! next id in its order, or the root sentinel once the traversal is
//! exhausted.  No cursor ever emits the root itself.  Each cursor owns its
//! own pending-work queue, so any number of them can walk one tree at the
//! same time.  Cursors cache ids between calls without observing edits;
//! mutating the tree's structure mid-traversal is caller error and yields
//! unspecified traversal results.

use crate::{node_idx::NodeIdx, tree::Tree};
use std::collections::VecDeque;

/// Selects the strategy a [`Cursor`] steps through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Order {
    BreadthFirst,
    #[default]
    PreOrder,
    InOrder,
    PostOrder,
    Unordered,
}

/// A traversal state machine over one [`Tree`], tagged by [`Order`].
#[derive(Clone, Debug)]
pub enum Cursor {
    BreadthFirst(BreadthFirst),
    PreOrder(PreOrder),
    InOrder(InOrder),
    PostOrder(PostOrder),
    Unordered(Unordered),
}

impl Cursor {
    pub fn new(order: Order) -> Self {
        match order {
            Order::BreadthFirst => Self::BreadthFirst(BreadthFirst::default()),
            Order::PreOrder => Self::PreOrder(PreOrder::default()),
            Order::InOrder => Self::InOrder(InOrder::default()),
            Order::PostOrder => Self::PostOrder(PostOrder::default()),
            Order::Unordered => Self::Unordered(Unordered),
        }
    }

    /// Step once: `at` is the id this cursor returned last (the root to
    /// start a traversal), the result is the next id in order, or the root
    /// sentinel on exhaustion.  Passing the root again after exhaustion
    /// restarts the traversal.
    pub fn advance<D>(&mut self, tree: &Tree<D>, at: NodeIdx) -> NodeIdx {
        match self {
            Self::BreadthFirst(cursor) => cursor.advance(tree, at),
            Self::PreOrder(cursor) => cursor.advance(tree, at),
            Self::InOrder(cursor) => cursor.advance(tree, at),
            Self::PostOrder(cursor) => cursor.advance(tree, at),
            Self::Unordered(cursor) => cursor.advance(tree, at),
        }
    }
}

/// Sibling-interleaved breadth-first order.
///
/// On every visit the current node's next sibling goes to the back of the
/// pending queue and its first child to the front.  The front placement puts
/// a node's children ahead of siblings queued earlier, so levels interleave
/// instead of coming out in strict level order.  Downstream consumers depend
/// on this exact push discipline; it is part of the contract, not an
/// approximation of textbook breadth-first search.
#[derive(Clone, Debug, Default)]
pub struct BreadthFirst {
    pending: VecDeque<NodeIdx>,
}

impl BreadthFirst {
    pub fn advance<D>(&mut self, tree: &Tree<D>, at: NodeIdx) -> NodeIdx {
        let sibling = tree.next_sibling_of(at);
        if !sibling.is_root() {
            self.pending.push_back(sibling);
        }
        let child = tree.first_child_of(at);
        if !child.is_root() {
            self.pending.push_front(child);
        }
        self.pending.pop_front().unwrap_or(NodeIdx::ROOT)
    }
}

/// Depth-first order visiting a node before its subtree; a node's sibling
/// chain resumes only after its own subtree completes.
#[derive(Clone, Debug, Default)]
pub struct PreOrder {
    pending: VecDeque<NodeIdx>,
}

impl PreOrder {
    pub fn advance<D>(&mut self, tree: &Tree<D>, at: NodeIdx) -> NodeIdx {
        let sibling = tree.next_sibling_of(at);
        if !sibling.is_root() {
            self.pending.push_front(sibling);
        }
        let child = tree.first_child_of(at);
        if !child.is_root() {
            self.pending.push_front(child);
        }
        self.pending.pop_front().unwrap_or(NodeIdx::ROOT)
    }
}

/// Left-most-descendant order: seeded by descending first-child links from
/// the starting node, then stepping to the left-most descendant of the next
/// sibling, or up to the parent once the siblings are exhausted.  Climbing
/// back to the root ends the traversal.  Handing the cursor the root id
/// resets it, even mid-flight.
#[derive(Clone, Debug, Default)]
pub struct InOrder {
    pending: VecDeque<NodeIdx>,
}

impl InOrder {
    pub fn advance<D>(&mut self, tree: &Tree<D>, at: NodeIdx) -> NodeIdx {
        if at.is_root() {
            self.pending.clear();
        }
        if self.pending.is_empty() {
            self.pending.push_back(tree.left_most_of(at));
        }
        let next = self.pending.pop_front().unwrap_or(NodeIdx::ROOT);
        if next.is_root() {
            return NodeIdx::ROOT;
        }
        let sibling = tree.next_sibling_of(next);
        self.pending.push_back(if sibling.is_root() {
            tree.parent_of(next)
        } else {
            tree.left_most_of(sibling)
        });
        next
    }
}

/// Left-most-descendant order like [`InOrder`], but the cursor only re-seeds
/// once its queue has drained; handing it the root mid-flight does not reset
/// it.
#[derive(Clone, Debug, Default)]
pub struct PostOrder {
    pending: VecDeque<NodeIdx>,
}

impl PostOrder {
    pub fn advance<D>(&mut self, tree: &Tree<D>, at: NodeIdx) -> NodeIdx {
        if self.pending.is_empty() {
            self.pending.push_back(tree.left_most_of(at));
        }
        let next = self.pending.pop_front().unwrap_or(NodeIdx::ROOT);
        if next.is_root() {
            return NodeIdx::ROOT;
        }
        let sibling = tree.next_sibling_of(next);
        self.pending.push_back(if sibling.is_root() {
            tree.parent_of(next)
        } else {
            tree.left_most_of(sibling)
        });
        next
    }
}

/// Validity scan over the arena slots, ignoring structure entirely: yields
/// every live non-root id in increasing slot order.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unordered;

impl Unordered {
    pub fn advance<D>(&mut self, tree: &Tree<D>, at: NodeIdx) -> NodeIdx {
        let mut idx = at + 1;
        while idx.0 < tree.capacity() {
            if tree.is_valid(idx) {
                return idx;
            }
            idx = idx + 1;
        }
        NodeIdx::ROOT
    }
}

/// Iterator adapter driving one [`Cursor`] over a borrowed tree.
#[derive(Clone, Debug)]
pub struct Nodes<'a, D> {
    tree: &'a Tree<D>,
    cursor: Cursor,
    at: NodeIdx,
    done: bool,
}

impl<'a, D> Nodes<'a, D> {
    pub(crate) fn new(tree: &'a Tree<D>, order: Order, start: NodeIdx) -> Self {
        Self {
            tree,
            cursor: Cursor::new(order),
            at: start,
            done: false,
        }
    }
}

impl<D> Iterator for Nodes<'_, D> {
    type Item = NodeIdx;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = self.cursor.advance(self.tree, self.at);
        if next.is_root() {
            self.done = true;
            return None;
        }
        self.at = next;
        Some(next)
    }
}

impl<D> std::iter::FusedIterator for Nodes<'_, D> {}
