//! Stable, copyable node handles.

#[rustfmt::skip]
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Deserialize,
    serde::Serialize,
    derive_more::From
)]
pub struct NodeIdx(pub(crate) usize);

impl NodeIdx {
    /// Id 0 is the sentinel root.  It doubles as the "no node" answer of the
    /// navigation accessors and the exhaustion signal of every cursor.
    pub const ROOT: Self = Self(0);

    #[inline(always)]
    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl std::fmt::Debug for NodeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "NodeIdx({})", self.0)
    }
}

impl std::fmt::Display for NodeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add<usize> for NodeIdx {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: usize) -> Self {
        Self(self.0 + rhs)
    }
}

impl std::ops::Sub<usize> for NodeIdx {
    type Output = Self;

    #[inline(always)]
    fn sub(self, rhs: usize) -> Self {
        Self(self.0 - rhs)
    }
}
