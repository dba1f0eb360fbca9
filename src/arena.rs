//! This module deals with arena allocation and slot recycling.

use crate::{
    error::{TreeError, TreeResult},
    node::Node,
    node_count::NodeCount,
    node_idx::NodeIdx,
};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::VecDeque;
use std::fmt;
use tracing::trace;

/// The first growth materializes this many slots; every growth after that
/// doubles the slot count.
const MIN_CAPACITY: usize = 10;

/// Index-addressed store of node records and their co-indexed value slots.
///
/// `records` and `values` always have the same length, the capacity.  Slots
/// in `len..capacity` are vacant and have never been handed out; slots below
/// `len` are either live or sitting in the `garbage` queue waiting to be
/// recycled.  Slot 0 is the sentinel root: always valid, never carrying a
/// value.
#[derive(Clone, Debug)]
pub(crate) struct Arena<D> {
    records: Vec<Node>,
    values: Vec<Option<D>>,
    len: usize,
    garbage: VecDeque<NodeIdx>,
}

impl<D> Default for Arena<D> {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

impl<D> Arena<D> {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        let mut records = Vec::with_capacity(cap);
        records.push(Node::root());
        records.resize_with(cap, Node::vacant);
        let mut values = Vec::with_capacity(cap);
        values.resize_with(cap, || None);
        Self {
            records,
            values,
            len: 1,
            garbage: VecDeque::new(),
        }
    }

    /// Number of materialized slots, vacant ones included.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Get the logical size, which is defined as `physical size - garbage size`
    /// i.e. the number of handed-out, non-garbage nodes in `self`.
    #[inline]
    pub fn logical_size(&self) -> NodeCount {
        self.physical_size() - self.garbage_size()
    }

    /// Get the physical size, which is defined as the number of slots handed
    /// out so far, whether they are garbage or not.  The root counts.
    #[inline]
    pub fn physical_size(&self) -> NodeCount {
        NodeCount::from(self.len)
    }

    /// Get the garbage size i.e. the number of reclaimed ids waiting for
    /// reuse.
    #[inline]
    pub fn garbage_size(&self) -> NodeCount {
        NodeCount::from(self.garbage.len())
    }

    #[inline]
    pub fn check_idx(&self, idx: NodeIdx) -> TreeResult<()> {
        if idx.0 < self.records.len() {
            Ok(())
        } else {
            Err(TreeError::IndexOutOfRange {
                idx,
                capacity: self.records.len(),
            })
        }
    }

    /// Whether `idx` addresses a live node.  Total: ids past the arena are
    /// simply not valid.
    #[inline]
    pub fn is_valid(&self, idx: NodeIdx) -> bool {
        self.records.get(idx.0).is_some_and(|record| record.valid)
    }

    /// The id the next [`Self::allocate`] call will hand out, without
    /// mutating any state.
    #[inline]
    pub fn next_idx(&self) -> NodeIdx {
        self.garbage.front().copied().unwrap_or(NodeIdx(self.len))
    }

    /// Recycle a garbage slot if there is one, else hand out a fresh slot,
    /// growing the arena when it is exhausted.  In either case the record is
    /// freshly initialized and `value` moves into the value slot; wiring the
    /// node into the tree is the caller's business.
    pub fn allocate(&mut self, value: D) -> NodeIdx {
        let idx = match self.garbage.pop_front() {
            Some(idx) => idx,
            None => {
                if self.len == self.records.len() {
                    self.grow();
                }
                self.len += 1;
                NodeIdx(self.len - 1)
            }
        };
        self.records[idx.0] = Node {
            valid: true,
            ..Node::vacant()
        };
        self.values[idx.0] = Some(value);
        idx
    }

    /// Drop the value stored in `idx`, clear the slot's validity and enqueue
    /// the id for reuse.  The released record's links are left untouched;
    /// the caller decides how much of the surrounding sibling list to repair.
    pub fn release(&mut self, idx: NodeIdx) {
        self.values[idx.0] = None;
        self.records[idx.0].valid = false;
        self.garbage.push_back(idx);
    }

    fn grow(&mut self) {
        let target = (self.records.len() * 2).max(MIN_CAPACITY);
        trace!(from = self.records.len(), to = target, "growing arena");
        self.records.resize_with(target, Node::vacant);
        self.values.resize_with(target, || None);
    }

    #[inline]
    pub fn value(&self, idx: NodeIdx) -> Option<&D> {
        self.values.get(idx.0).and_then(|slot| slot.as_ref())
    }

    #[inline]
    pub fn value_mut(&mut self, idx: NodeIdx) -> Option<&mut D> {
        self.values.get_mut(idx.0).and_then(|slot| slot.as_mut())
    }

    /// Exchange the records of two slots; values stay where they are.
    #[inline]
    pub fn swap_records(&mut self, a: NodeIdx, b: NodeIdx) {
        self.records.swap(a.0, b.0);
    }

    /// Drop every value, forget every handed-out slot and shrink back to the
    /// lone root slot.  The only operation that ever shrinks the arena.
    pub fn clear(&mut self) {
        self.records.truncate(1);
        self.records[0] = Node::root();
        self.values.truncate(1);
        self.values[0] = None;
        self.len = 1;
        self.garbage.clear();
    }
}

impl<D> std::ops::Index<NodeIdx> for Arena<D> {
    type Output = Node;

    fn index(&self, idx: NodeIdx) -> &Self::Output {
        &self.records[idx.0]
    }
}

impl<D> std::ops::IndexMut<NodeIdx> for Arena<D> {
    fn index_mut(&mut self, idx: NodeIdx) -> &mut Self::Output {
        &mut self.records[idx.0]
    }
}

const ARENA_FIELDS: &[&str] = &["records", "values", "len", "garbage"];

impl<D> Serialize for Arena<D>
where
    D: Serialize,
{
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Arena", ARENA_FIELDS.len())?;
        state.serialize_field("records", &self.records)?;
        state.serialize_field("values", &self.values)?;
        state.serialize_field("len", &self.len)?;
        state.serialize_field("garbage", &self.garbage)?;
        state.end()
    }
}

#[rustfmt::skip]
impl<'de, D> Deserialize<'de> for Arena<D>
where
    D: Deserialize<'de>,
{
    fn deserialize<DE: Deserializer<'de>>(
        d: DE
    ) -> std::result::Result<Self, DE::Error> {
        #[derive(serde::Deserialize)]
        #[serde(field_identifier, rename_all = "lowercase")]
        enum Field {
            Records,
            Values,
            Len,
            Garbage,
        }

        struct ArenaVisitor<D>(std::marker::PhantomData<D>);

        impl<'de, D> Visitor<'de> for ArenaVisitor<D>
        where
            D: Deserialize<'de>,
        {
            type Value = Arena<D>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("struct Arena<D>")
            }

            fn visit_seq<V>(
                self,
                mut seq: V
            ) -> std::result::Result<Self::Value, V::Error>
            where
                V: SeqAccess<'de>,
            {
                let records = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let values = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let len = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                let garbage = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(3, &self))?;
                Ok(Arena { records, values, len, garbage })
            }

            fn visit_map<A>(
                self,
                mut map: A
            ) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut records = None;
                let mut values = None;
                let mut len = None;
                let mut garbage = None;
                while let Some(key) = map.next_key()? {
                    match key {
                        Field::Records if records.is_some() => {
                            return Err(de::Error::duplicate_field("records"));
                        }
                        Field::Records => { records = Some(map.next_value()?); }
                        Field::Values if values.is_some() => {
                            return Err(de::Error::duplicate_field("values"));
                        }
                        Field::Values => { values = Some(map.next_value()?); }
                        Field::Len if len.is_some() => {
                            return Err(de::Error::duplicate_field("len"));
                        }
                        Field::Len => { len = Some(map.next_value()?); }
                        Field::Garbage if garbage.is_some() => {
                            return Err(de::Error::duplicate_field("garbage"));
                        }
                        Field::Garbage => { garbage = Some(map.next_value()?); }
                    }
                }
                Ok(Arena {
                    records: records.ok_or_else(|| de::Error::missing_field("records"))?,
                    values: values.ok_or_else(|| de::Error::missing_field("values"))?,
                    len: len.ok_or_else(|| de::Error::missing_field("len"))?,
                    garbage: garbage.ok_or_else(|| de::Error::missing_field("garbage"))?,
                })
            }
        }

        d.deserialize_struct("Arena", ARENA_FIELDS, ArenaVisitor(std::marker::PhantomData))
    }
}
