use crate::node_idx::NodeIdx;
use serde::{Deserialize, Serialize};

pub type TreeResult<T> = Result<T, TreeError>;

#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    displaydoc::Display,
    thiserror::Error,
)]
pub enum TreeError {
    /// Node id {idx} is out of range for an arena of {capacity} slots.
    IndexOutOfRange { idx: NodeIdx, capacity: usize },
    /// Node {idx} is vacant and cannot adopt a new child.
    InvalidParent { idx: NodeIdx },
}
