//! This crate defines a low-level and cache-friendly ordered tree
//! datastructure with stable node ids, slot recycling through a FIFO free
//! queue, and resumable traversal cursors.  It can be newtyped for
//! higher-level trees.
#![forbid(unsafe_code)]

mod arena;
pub mod cursor;
pub mod error;
mod node;
pub mod node_count;
pub mod node_idx;
pub mod tree;

#[rustfmt::skip]
pub use crate::{
    cursor::{Cursor, Nodes, Order},
    error::{TreeError, TreeResult},
    node_count::NodeCount,
    node_idx::NodeIdx,
    tree::Tree,
};
