//!

use crate::{
    arena::Arena,
    cursor::{Cursor, Nodes, Order},
    error::{TreeError, TreeResult},
    node::Node,
    node_count::NodeCount,
    node_idx::NodeIdx,
};
use itertools::Itertools;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::iter::successors;
use std::ops::ControlFlow;
use tracing::trace;

/// An ordered tree of `D` values with stable ids and recycled slots.
///
/// Structure lives in a flat arena of link records; nodes never own one
/// another, and a [`NodeIdx`] is a bare index with no ownership semantics.
/// The root (id 0) always exists, carries no value and parents every
/// top-level node, which makes the container double as a forest.
///
/// All editing is single-writer and synchronous; the borrow checker enforces
/// that rule in-process, and callers coordinate anything beyond it.
///
/// The editing operations report bad ids through [`TreeError`]; the O(1)
/// navigation accessors index the arena directly and panic on ids past it.
#[derive(Clone, Debug)]
pub struct Tree<D> {
    arena: Arena<D>,
}

impl<D> Default for Tree<D> {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

impl<D> Tree<D> {
    pub const ROOT_IDX: NodeIdx = NodeIdx::ROOT;

    /// A tree whose arena holds nothing but the root slot.
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            arena: Arena::with_capacity(cap),
        }
    }

    #[inline]
    /// Get the logical size, which is defined as `physical size - garbage size`
    /// i.e. the number of live nodes in `self`, the root included.
    pub fn logical_size(&self) -> NodeCount {
        self.arena.logical_size()
    }

    #[inline]
    /// Get the physical size, which is defined as the number of arena slots
    /// handed out so far, whether they are garbage or not.
    pub fn physical_size(&self) -> NodeCount {
        self.arena.physical_size()
    }

    /// Get the garbage size i.e. the number of reclaimed ids awaiting reuse.
    #[inline]
    pub fn garbage_size(&self) -> NodeCount {
        self.arena.garbage_size()
    }

    /// Number of materialized arena slots, vacant ones included.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    // Navigation ----------------------------------------------------------

    /// Get the parent of a node; the root sentinel for the root itself. O(1)
    #[inline(always)]
    pub fn parent_of(&self, idx: NodeIdx) -> NodeIdx {
        self.arena[idx].parent
    }

    /// Get the first child of a node, or the root sentinel. O(1)
    #[inline(always)]
    pub fn first_child_of(&self, idx: NodeIdx) -> NodeIdx {
        self.arena[idx].first_child
    }

    /// Get the previous sibling of a node, or the root sentinel. O(1)
    #[inline(always)]
    pub fn prev_sibling_of(&self, idx: NodeIdx) -> NodeIdx {
        self.arena[idx].prev_sibling
    }

    /// Get the next sibling of a node, or the root sentinel. O(1)
    #[inline(always)]
    pub fn next_sibling_of(&self, idx: NodeIdx) -> NodeIdx {
        self.arena[idx].next_sibling
    }

    /// Distance from the root; the root sits at depth 0. O(1)
    #[inline(always)]
    pub fn depth_of(&self, idx: NodeIdx) -> u32 {
        self.arena[idx].depth
    }

    /// Descend first-child links from `idx` to the bottom of the left-most
    /// path; `idx` itself when it has no children.
    pub fn left_most_of(&self, idx: NodeIdx) -> NodeIdx {
        let mut current = idx;
        loop {
            let child = self.first_child_of(current);
            if child.is_root() {
                return current;
            }
            current = child;
        }
    }

    /// Whether `idx` addresses a live node.  Total: ids past the arena are
    /// simply not valid.
    #[inline]
    pub fn is_valid(&self, idx: NodeIdx) -> bool {
        self.arena.is_valid(idx)
    }

    /// Iterate over the children of `idx` in sibling order.
    pub fn children_of(&self, idx: NodeIdx) -> impl Iterator<Item = NodeIdx> + '_ {
        successors(
            Some(self.first_child_of(idx)).filter(|child| !child.is_root()),
            move |&child| Some(self.next_sibling_of(child)).filter(|next| !next.is_root()),
        )
    }

    /// Iterate over the ancestors of `idx`, nearest first, ending with the
    /// root.
    pub fn ancestors_of(&self, idx: NodeIdx) -> impl Iterator<Item = NodeIdx> + '_ {
        successors(
            (!idx.is_root()).then(|| self.parent_of(idx)),
            move |&ancestor| (!ancestor.is_root()).then(|| self.parent_of(ancestor)),
        )
    }

    // Value access --------------------------------------------------------

    /// Shared access to the value stored at `idx`; `None` for the root
    /// sentinel, vacant slots and ids past the arena.
    #[inline]
    pub fn get(&self, idx: NodeIdx) -> Option<&D> {
        self.arena.value(idx)
    }

    /// Exclusive access to the value stored at `idx`.
    #[inline]
    pub fn get_mut(&mut self, idx: NodeIdx) -> Option<&mut D> {
        self.arena.value_mut(idx)
    }

    // Structural editing --------------------------------------------------

    /// The id the next [`Self::add_node`] call will return, without mutating
    /// anything; lets a caller build a self-referencing value up front.
    #[inline]
    pub fn next_idx(&self) -> NodeIdx {
        self.arena.next_idx()
    }

    /// Insert `data` as a child of `parent_idx` and return the new node's id.
    ///
    /// `before_idx` selects the insertion point among the existing children:
    /// an existing child of `parent_idx` means "immediately before that
    /// sibling", while `None` (or the root sentinel) appends after the
    /// current last child.  Passing anything else as `before_idx` is caller
    /// error.  The returned id stays valid and stable until the node is
    /// erased, whether the slot was recycled or freshly grown.
    pub fn add_node(
        &mut self,
        data: D,
        parent_idx: NodeIdx,
        before_idx: impl Into<Option<NodeIdx>>,
    ) -> TreeResult<NodeIdx> {
        let before_idx = before_idx.into().unwrap_or(NodeIdx::ROOT);
        self.arena.check_idx(parent_idx)?;
        self.arena.check_idx(before_idx)?;
        if !self.arena.is_valid(parent_idx) {
            return Err(TreeError::InvalidParent { idx: parent_idx });
        }
        debug_assert!(
            before_idx.is_root()
                || (self.arena.is_valid(before_idx)
                    && self.arena[before_idx].parent == parent_idx),
            "insertion point {before_idx} is not a child of {parent_idx}",
        );

        let idx = self.arena.allocate(data);

        // Resolve the append sentinel to the tail of the sibling chain.
        let (prev, next) = if before_idx.is_root() {
            let tail = self.children_of(parent_idx).last().unwrap_or(NodeIdx::ROOT);
            (tail, NodeIdx::ROOT)
        } else {
            (self.arena[before_idx].prev_sibling, before_idx)
        };

        if !prev.is_root() {
            self.arena[prev].next_sibling = idx;
        }
        if !next.is_root() {
            self.arena[next].prev_sibling = idx;
        }
        if prev.is_root() {
            // The new node heads the sibling list, whether the parent had no
            // children or the insertion point was the previous head.
            self.arena[parent_idx].first_child = idx;
        }

        let depth = self.arena[parent_idx].depth + 1;
        self.arena[idx] = Node {
            parent: parent_idx,
            first_child: NodeIdx::ROOT,
            prev_sibling: prev,
            next_sibling: next,
            depth,
            valid: true,
        };
        trace!(%idx, %parent_idx, depth, "added node");
        Ok(idx)
    }

    #[must_use]
    /// Erase the node at `node_idx` together with its entire subtree, drop
    /// the affected values and queue the ids for reuse in the order they are
    /// reclaimed.  Erasing the root is a no-op by contract, as is erasing an
    /// id whose slot is already vacant; either way every reclaimed id enters
    /// the free queue exactly once.
    pub fn rm_node(&mut self, node_idx: NodeIdx) -> TreeResult<()> {
        if node_idx.is_root() {
            return Ok(());
        }
        self.arena.check_idx(node_idx)?;
        if !self.arena.is_valid(node_idx) {
            return Ok(());
        }

        let record = self.arena[node_idx];
        if !record.prev_sibling.is_root() {
            self.arena[record.prev_sibling].next_sibling = record.next_sibling;
        }
        if !record.next_sibling.is_root() {
            self.arena[record.next_sibling].prev_sibling = record.prev_sibling;
        }
        if self.arena[record.parent].first_child == node_idx {
            self.arena[record.parent].first_child = record.next_sibling;
        }
        self.arena.release(node_idx);

        // The subtree is discarded as a unit, so descendants are reclaimed
        // without repairing their sibling lists node by node.
        let mut worklist = VecDeque::new();
        if !record.first_child.is_root() {
            worklist.push_back(record.first_child);
        }
        while let Some(descendant) = worklist.pop_front() {
            let descendant_record = self.arena[descendant];
            if !descendant_record.next_sibling.is_root() {
                worklist.push_back(descendant_record.next_sibling);
            }
            if !descendant_record.first_child.is_root() {
                worklist.push_back(descendant_record.first_child);
            }
            self.arena.release(descendant);
        }
        trace!(%node_idx, "erased subtree");
        Ok(())
    }

    /// Exchange the records of `a` and `b`, so the two ids trade tree
    /// positions while keeping their values: children and sibling slots
    /// travel with the position, not with the id.  Either parent's first
    /// child is repointed if it referred to the node that moved.  A no-op
    /// when the ids are equal or either is the root.  Swapping a node with
    /// one of its own ancestors is caller error.
    pub fn swap_nodes(&mut self, a: NodeIdx, b: NodeIdx) -> TreeResult<()> {
        self.arena.check_idx(a)?;
        self.arena.check_idx(b)?;
        if a == b || a.is_root() || b.is_root() {
            return Ok(());
        }
        debug_assert!(self.arena.is_valid(a) && self.arena.is_valid(b));
        debug_assert!(
            self.ancestors_of(a).all(|ancestor| ancestor != b)
                && self.ancestors_of(b).all(|ancestor| ancestor != a),
            "swapping {a} with its relative {b}",
        );

        self.arena.swap_records(a, b);

        // An adjacent-sibling swap leaves each record pointing at itself
        // where it used to point at the other node.
        for (idx, other) in [(a, b), (b, a)] {
            let record = &mut self.arena[idx];
            if record.prev_sibling == idx {
                record.prev_sibling = other;
            }
            if record.next_sibling == idx {
                record.next_sibling = other;
            }
        }

        for (idx, other) in [(a, b), (b, a)] {
            let record = self.arena[idx];
            if !record.prev_sibling.is_root() {
                self.arena[record.prev_sibling].next_sibling = idx;
            }
            if !record.next_sibling.is_root() {
                self.arena[record.next_sibling].prev_sibling = idx;
            }
            if self.arena[record.parent].first_child == other {
                self.arena[record.parent].first_child = idx;
            }
            let mut child = record.first_child;
            while !child.is_root() {
                self.arena[child].parent = idx;
                child = self.arena[child].next_sibling;
            }
        }
        trace!(%a, %b, "swapped nodes");
        Ok(())
    }

    /// Drop every value, forget every node and shrink the arena back to the
    /// lone root slot.  Ids handed out before the clear must not be reused.
    pub fn clear(&mut self) {
        self.arena.clear();
        trace!("cleared tree");
    }

    // Traversal -----------------------------------------------------------

    /// Walk the tree in the sibling-interleaved breadth-first order,
    /// beginning after `start`; pass the root for the whole tree.  Like
    /// every cursor-backed iterator, a non-root `start` continues into the
    /// starting node's following siblings.
    #[inline]
    pub fn breadth_first(&self, start: NodeIdx) -> Nodes<'_, D> {
        Nodes::new(self, Order::BreadthFirst, start)
    }

    /// Walk the tree in pre-order, beginning after `start`.
    #[inline]
    pub fn pre_order(&self, start: NodeIdx) -> Nodes<'_, D> {
        Nodes::new(self, Order::PreOrder, start)
    }

    /// Walk the tree in the left-most-climb order, seeded at `start`.
    #[inline]
    pub fn in_order(&self, start: NodeIdx) -> Nodes<'_, D> {
        Nodes::new(self, Order::InOrder, start)
    }

    /// Walk the tree bottom-up, seeded at `start`.
    #[inline]
    pub fn post_order(&self, start: NodeIdx) -> Nodes<'_, D> {
        Nodes::new(self, Order::PostOrder, start)
    }

    /// Scan every live non-root node in arena-slot order, ignoring the tree
    /// structure.
    #[inline]
    pub fn unordered(&self) -> Nodes<'_, D> {
        Nodes::new(self, Order::Unordered, NodeIdx::ROOT)
    }

    /// Drive `visitor` over the whole tree in `order`, handing it the value
    /// and id of every visited node until the cursor is exhausted or the
    /// visitor breaks.  Editing the tree's structure while the traversal
    /// runs is unsupported.
    pub fn traverse<V>(&self, order: Order, mut visitor: V)
    where
        V: FnMut(&D, NodeIdx) -> ControlFlow<()>,
    {
        let mut cursor = Cursor::new(order);
        let mut at = NodeIdx::ROOT;
        loop {
            at = cursor.advance(self, at);
            let Some(value) = self.get(at) else { return };
            if visitor(value, at).is_break() {
                return;
            }
        }
    }

    /// [`Self::traverse`] with exclusive access to the values.  Only the
    /// values may be touched; the structure must stay as it is.
    pub fn traverse_mut<V>(&mut self, order: Order, mut visitor: V)
    where
        V: FnMut(&mut D, NodeIdx) -> ControlFlow<()>,
    {
        let mut cursor = Cursor::new(order);
        let mut at = NodeIdx::ROOT;
        loop {
            at = cursor.advance(self, at);
            let Some(value) = self.get_mut(at) else { return };
            if visitor(value, at).is_break() {
                return;
            }
        }
    }
}

impl<D> std::ops::Index<NodeIdx> for Tree<D> {
    type Output = D;

    fn index(&self, idx: NodeIdx) -> &Self::Output {
        match self.get(idx) {
            Some(value) => value,
            None => panic!("no value stored for node {idx}"),
        }
    }
}

impl<D> std::ops::IndexMut<NodeIdx> for Tree<D> {
    fn index_mut(&mut self, idx: NodeIdx) -> &mut Self::Output {
        match self.get_mut(idx) {
            Some(value) => value,
            None => panic!("no value stored for node {idx}"),
        }
    }
}

impl<D> PartialEq<Self> for Tree<D>
where
    D: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        // NOTE: Logical comparison: garbage slots are excluded and two trees
        //       with different slot layouts compare equal as long as their
        //       pre-order structure and values line up.
        if self.logical_size() != other.logical_size() {
            return false;
        }
        let mut map = HashMap::new();
        map.insert(NodeIdx::ROOT, NodeIdx::ROOT);
        let self_iter = self.pre_order(NodeIdx::ROOT);
        let other_iter = other.pre_order(NodeIdx::ROOT);
        for (sidx, oidx) in self_iter.zip_eq(other_iter) {
            if map.get(&self.parent_of(sidx)) != Some(&other.parent_of(oidx)) {
                return false;
            }
            if self.get(sidx) != other.get(oidx) {
                return false;
            }
            map.insert(sidx, oidx);
        }
        true
    }
}

impl<D> Eq for Tree<D> where D: Eq {}

impl<D> fmt::Display for Tree<D>
where
    D: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for idx in self.pre_order(NodeIdx::ROOT) {
            for _ in 1..self.depth_of(idx) {
                write!(f, "| ")?;
            }
            match self.get(idx) {
                Some(value) => writeln!(f, "{idx} {value}")?,
                None => writeln!(f, "{idx}")?,
            }
        }
        Ok(())
    }
}

// Manual impl to serialize a `Tree<D>` with no more than a `Serialize` bound.
#[rustfmt::skip]
impl<D> Serialize for Tree<D>
where
    D: Serialize,
{
    fn serialize<S: Serializer>(
        &self,
        serializer: S
    ) -> std::result::Result<S::Ok, S::Error> {
        const NUM_FIELDS: usize = 1;
        let mut state = serializer.serialize_struct("Tree", NUM_FIELDS)?;
        state.serialize_field("arena", &self.arena)?;
        state.end()
    }
}

// Manual impl to deserialize a `Tree<D>` with no more than a `Deserialize`
// bound.
#[rustfmt::skip]
impl<'de, D> Deserialize<'de> for Tree<D>
where
    D: Deserialize<'de>,
{
    fn deserialize<DE: Deserializer<'de>>(
        d: DE
    ) -> std::result::Result<Self, DE::Error> {
        #[derive(serde::Deserialize)]
        #[serde(field_identifier, rename_all = "lowercase")]
        enum Field {
            Arena
        }

        struct TreeVisitor<D>(std::marker::PhantomData<D>);

        impl<'de, D> Visitor<'de> for TreeVisitor<D>
        where
            D: Deserialize<'de>,
        {
            type Value = Tree<D>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("struct Tree<D>")
            }

            fn visit_seq<V>(
                self,
                mut seq: V
            ) -> std::result::Result<Self::Value, V::Error>
            where
                V: SeqAccess<'de>,
            {
                let arena = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                Ok(Tree { arena })
            }

            fn visit_map<A>(
                self,
                mut map: A
            ) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut arena = None;
                while let Some(key) = map.next_key()? {
                    match key {
                        Field::Arena if arena.is_some() => {
                            return Err(de::Error::duplicate_field("arena"));
                        }
                        Field::Arena => { arena = Some(map.next_value()?); }
                    }
                }
                Ok(Tree {
                    arena: arena.ok_or_else(|| de::Error::missing_field("arena"))?,
                })
            }
        }

        d.deserialize_struct("Tree", &["arena"], TreeVisitor(std::marker::PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    struct Fixture {
        tree: Tree<&'static str>,
        a: NodeIdx,
        b: NodeIdx,
        c: NodeIdx,
        d: NodeIdx,
        e: NodeIdx,
        f: NodeIdx,
    }

    // root ── a ── c ── f
    //      │     └ d
    //      └ b ── e
    fn make_fixture() -> TreeResult<Fixture> {
        let mut tree = Tree::default();
        let a = tree.add_node("a", Tree::<&str>::ROOT_IDX, None)?;
        let b = tree.add_node("b", Tree::<&str>::ROOT_IDX, None)?;
        let c = tree.add_node("c", a, None)?;
        let d = tree.add_node("d", a, None)?;
        let e = tree.add_node("e", b, None)?;
        let f = tree.add_node("f", c, None)?;
        Ok(Fixture { tree, a, b, c, d, e, f })
    }

    #[test]
    fn append_places_nodes_at_the_chain_tail() -> TreeResult<()> {
        let Fixture { tree, a, b, c, d, e, f } = make_fixture()?;
        assert_eq!(tree.children_of(NodeIdx::ROOT).collect_vec(), vec![a, b]);
        assert_eq!(tree.children_of(a).collect_vec(), vec![c, d]);

        // Appending d did not disturb the head of a's sibling list.
        assert_eq!(tree.first_child_of(a), c);
        assert_eq!(tree.prev_sibling_of(c), NodeIdx::ROOT);
        assert_eq!(tree.next_sibling_of(c), d);
        assert_eq!(tree.prev_sibling_of(d), c);
        assert_eq!(tree.next_sibling_of(d), NodeIdx::ROOT);

        assert_eq!(tree.depth_of(NodeIdx::ROOT), 0);
        assert_eq!(tree.depth_of(a), 1);
        assert_eq!(tree.depth_of(c), 2);
        assert_eq!(tree.depth_of(f), 3);
        assert_eq!(tree.parent_of(e), b);
        assert_eq!(tree.left_most_of(NodeIdx::ROOT), f);
        Ok(())
    }

    #[test]
    fn insert_before_splices_ahead_of_the_sibling() -> TreeResult<()> {
        let Fixture { mut tree, a, c, d, .. } = make_fixture()?;

        // Before the head: the new node becomes the first child.
        let g = tree.add_node("g", a, c)?;
        assert_eq!(tree.first_child_of(a), g);
        assert_eq!(tree.children_of(a).collect_vec(), vec![g, c, d]);
        assert_eq!(tree.prev_sibling_of(c), g);
        assert_eq!(tree.next_sibling_of(g), c);
        assert_eq!(tree.prev_sibling_of(g), NodeIdx::ROOT);

        // Before a middle sibling.
        let h = tree.add_node("h", a, d)?;
        assert_eq!(tree.children_of(a).collect_vec(), vec![g, c, h, d]);
        assert_eq!(tree.next_sibling_of(c), h);
        assert_eq!(tree.prev_sibling_of(d), h);
        Ok(())
    }

    #[test_log::test]
    fn next_idx_previews_the_insertion() {
        let mut tree: Tree<u32> = Tree::default();
        assert_eq!(tree.next_idx(), NodeIdx::from(1));
        let first = tree.add_node(0, NodeIdx::ROOT, None).unwrap();
        assert_eq!(first, NodeIdx::from(1));

        tree.rm_node(first).unwrap();
        assert_eq!(tree.next_idx(), first);
        assert_eq!(tree.add_node(1, NodeIdx::ROOT, None).unwrap(), first);
    }

    #[test]
    fn erase_recycles_the_subtree_in_fifo_order() -> TreeResult<()> {
        let Fixture { mut tree, a, b, c, d, e, f } = make_fixture()?;
        let capacity = tree.capacity();

        tree.rm_node(a)?;
        assert_eq!(tree.unordered().collect_vec(), vec![b, e]);
        for idx in [a, c, d, f] {
            assert!(!tree.is_valid(idx));
            assert_eq!(tree.get(idx), None);
        }
        assert_eq!(tree.children_of(NodeIdx::ROOT).collect_vec(), vec![b]);
        assert_eq!(tree.prev_sibling_of(b), NodeIdx::ROOT);

        // Ids are recycled, not reclaimed as space.
        assert_eq!(tree.capacity(), capacity);
        assert_eq!(*tree.garbage_size(), 4);

        // The erased node first, then its descendants in worklist order.
        for expected in [a, c, d, f] {
            assert_eq!(tree.next_idx(), expected);
            assert_eq!(tree.add_node("recycled", NodeIdx::ROOT, None)?, expected);
        }
        Ok(())
    }

    #[test]
    fn erase_two_branch_tree_frees_ids_in_fifo_order() -> TreeResult<()> {
        // root ── a ── c
        //      └ b
        let mut tree: Tree<&str> = Tree::default();
        let a = tree.add_node("a", NodeIdx::ROOT, None)?;
        let b = tree.add_node("b", NodeIdx::ROOT, None)?;
        let c = tree.add_node("c", a, None)?;

        tree.rm_node(a)?;
        assert_eq!(tree.unordered().collect_vec(), vec![b]);
        assert_eq!(tree.add_node("x", NodeIdx::ROOT, None)?, a);
        assert_eq!(tree.add_node("y", NodeIdx::ROOT, None)?, c);
        Ok(())
    }

    #[test_log::test]
    fn erase_of_a_middle_sibling_patches_the_chain() {
        let Fixture { mut tree, a, c, d, f, .. } = make_fixture().unwrap();
        tree.rm_node(c).unwrap();

        assert_eq!(tree.first_child_of(a), d);
        assert_eq!(tree.prev_sibling_of(d), NodeIdx::ROOT);
        assert_eq!(tree.children_of(a).collect_vec(), vec![d]);
        // c's subtree went with it.
        assert!(!tree.is_valid(f));
    }

    #[test]
    fn erase_of_the_root_is_a_noop() -> TreeResult<()> {
        let Fixture { mut tree, .. } = make_fixture()?;
        let before = tree.logical_size();
        tree.rm_node(NodeIdx::ROOT)?;
        assert_eq!(tree.logical_size(), before);
        assert!(tree.is_valid(NodeIdx::ROOT));
        Ok(())
    }

    #[test]
    fn erase_of_a_vacant_slot_is_a_noop() -> TreeResult<()> {
        let Fixture { mut tree, d, .. } = make_fixture()?;
        tree.rm_node(d)?;
        let garbage = tree.garbage_size();
        // A second erase must not enqueue the id twice.
        tree.rm_node(d)?;
        assert_eq!(tree.garbage_size(), garbage);
        Ok(())
    }

    #[test]
    fn swap_of_adjacent_siblings_trades_positions() -> TreeResult<()> {
        let Fixture { mut tree, a, c, d, f, .. } = make_fixture()?;
        let live = tree.logical_size();

        tree.swap_nodes(c, d)?;
        assert_eq!(tree.first_child_of(a), d);
        assert_eq!(tree.children_of(a).collect_vec(), vec![d, c]);
        assert_eq!(tree.prev_sibling_of(c), d);
        assert_eq!(tree.next_sibling_of(d), c);

        // Children travel with the position, values stay with the id.
        assert_eq!(tree.first_child_of(d), f);
        assert_eq!(tree.parent_of(f), d);
        assert_eq!(tree.first_child_of(c), NodeIdx::ROOT);
        assert_eq!(tree[c], "c");
        assert_eq!(tree[d], "d");
        assert_eq!(tree.logical_size(), live);
        Ok(())
    }

    #[test]
    fn swap_across_parents_hands_over_both_positions() -> TreeResult<()> {
        let Fixture { mut tree, a, b, c, d, e, f } = make_fixture()?;

        tree.swap_nodes(c, e)?;
        assert_eq!(tree.children_of(a).collect_vec(), vec![e, d]);
        assert_eq!(tree.children_of(b).collect_vec(), vec![c]);
        assert_eq!(tree.first_child_of(a), e);
        assert_eq!(tree.first_child_of(b), c);
        assert_eq!(tree.parent_of(c), b);
        assert_eq!(tree.parent_of(e), a);
        assert_eq!(tree.first_child_of(e), f);
        assert_eq!(tree.parent_of(f), e);
        assert_eq!(tree[c], "c");
        assert_eq!(tree[e], "e");

        // Depths traded with the records; both subtrees stayed consistent.
        for idx in tree.unordered().collect_vec() {
            assert_eq!(tree.depth_of(idx), tree.depth_of(tree.parent_of(idx)) + 1);
        }
        Ok(())
    }

    #[test]
    fn swap_degenerate_cases_are_noops() -> TreeResult<()> {
        let Fixture { mut tree, a, c, .. } = make_fixture()?;
        let snapshot = tree.clone();
        tree.swap_nodes(a, a)?;
        tree.swap_nodes(NodeIdx::ROOT, a)?;
        tree.swap_nodes(c, NodeIdx::ROOT)?;
        assert_eq!(tree, snapshot);
        Ok(())
    }

    #[test]
    fn out_of_range_ids_are_rejected() {
        let Fixture { mut tree, a, .. } = make_fixture().unwrap();
        let bogus = NodeIdx::from(9999);

        assert!(matches!(
            tree.add_node("x", bogus, None),
            Err(TreeError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            tree.add_node("x", a, bogus),
            Err(TreeError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            tree.rm_node(bogus),
            Err(TreeError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            tree.swap_nodes(a, bogus),
            Err(TreeError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn vacant_parents_are_rejected() -> TreeResult<()> {
        let Fixture { mut tree, d, .. } = make_fixture()?;
        tree.rm_node(d)?;
        assert_eq!(
            tree.add_node("orphan", d, None),
            Err(TreeError::InvalidParent { idx: d })
        );
        Ok(())
    }

    #[test]
    fn clear_resets_to_the_lone_root() -> TreeResult<()> {
        let Fixture { mut tree, d, .. } = make_fixture()?;
        tree.rm_node(d)?;

        tree.clear();
        assert_eq!(*tree.logical_size(), 1);
        assert_eq!(*tree.garbage_size(), 0);
        assert_eq!(tree.capacity(), 1);
        assert_eq!(tree.unordered().count(), 0);
        assert_eq!(tree.first_child_of(NodeIdx::ROOT), NodeIdx::ROOT);

        // Insertion starts over from the first non-root slot.
        assert_eq!(tree.next_idx(), NodeIdx::from(1));
        let fresh = tree.add_node("fresh", NodeIdx::ROOT, None)?;
        assert_eq!(fresh, NodeIdx::from(1));
        Ok(())
    }

    #[test]
    fn traverse_feeds_values_in_pre_order() -> TreeResult<()> {
        let Fixture { tree, a, b, c, d, e, f } = make_fixture()?;
        let mut seen = vec![];
        tree.traverse(Order::PreOrder, |value, idx| {
            seen.push((idx, *value));
            ControlFlow::Continue(())
        });
        assert_eq!(
            seen,
            vec![(a, "a"), (c, "c"), (f, "f"), (d, "d"), (b, "b"), (e, "e")]
        );
        Ok(())
    }

    #[test]
    fn traverse_stops_when_the_visitor_breaks() -> TreeResult<()> {
        let Fixture { tree, a, c, .. } = make_fixture()?;
        let mut seen = vec![];
        tree.traverse(Order::PreOrder, |_, idx| {
            seen.push(idx);
            if seen.len() == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(seen, vec![a, c]);
        Ok(())
    }

    #[test]
    fn traverse_mut_may_rewrite_values() -> TreeResult<()> {
        let mut tree: Tree<String> = Tree::default();
        let a = tree.add_node("a".to_string(), NodeIdx::ROOT, None)?;
        let b = tree.add_node("b".to_string(), a, None)?;

        tree.traverse_mut(Order::PostOrder, |value, _| {
            value.make_ascii_uppercase();
            ControlFlow::Continue(())
        });
        assert_eq!(tree[a], "A");
        assert_eq!(tree[b], "B");
        Ok(())
    }

    #[test]
    fn logical_equality_ignores_slot_layout() -> TreeResult<()> {
        let mut lhs: Tree<&str> = Tree::default();
        lhs.add_node("a", NodeIdx::ROOT, None)?;
        lhs.add_node("b", NodeIdx::ROOT, None)?;

        // Same logical tree reached through an erased detour: the slot
        // numbering differs, the structure does not.
        let mut rhs: Tree<&str> = Tree::default();
        let detour = rhs.add_node("detour", NodeIdx::ROOT, None)?;
        rhs.add_node("a", NodeIdx::ROOT, None)?;
        rhs.add_node("b", NodeIdx::ROOT, None)?;
        rhs.rm_node(detour)?;

        assert_eq!(lhs, rhs);

        rhs.add_node("c", NodeIdx::ROOT, None)?;
        assert_ne!(lhs, rhs);
        Ok(())
    }

    #[test]
    fn display_indents_by_depth() -> TreeResult<()> {
        let Fixture { tree, .. } = make_fixture()?;
        let expected = "\
1 a
| 3 c
| | 6 f
| 4 d
2 b
| 5 e
";
        assert_eq!(tree.to_string(), expected);
        Ok(())
    }

    #[test]
    fn serde_round_trip_preserves_structure_and_garbage() -> TreeResult<()> {
        let mut tree: Tree<String> = Tree::default();
        let a = tree.add_node("a".to_string(), NodeIdx::ROOT, None)?;
        let b = tree.add_node("b".to_string(), NodeIdx::ROOT, None)?;
        tree.add_node("c".to_string(), a, None)?;
        tree.rm_node(b)?;

        let json = serde_json::to_string(&tree).expect("serializes");
        let parsed: Tree<String> = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(parsed, tree);
        // The free queue came along too, so allocation picks up where the
        // original left off.
        assert_eq!(parsed.next_idx(), tree.next_idx());
        Ok(())
    }
}
