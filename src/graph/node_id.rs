use std::num::NonZero;

/// ID of a node in a [`Graph`](crate::Graph).
///
/// This is used to identify both value and operator nodes.
#[derive(Copy, Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(NonZero<u32>);

impl NodeId {
    /// Largest value that can be used as a node ID.
    pub const MAX: u32 = u32::MAX - 1;

    /// Return the underlying u32 value of the ID.
    pub fn as_u32(self) -> u32 {
        self.0.get() - 1
    }

    /// Return the underlying ID value as a usize, for slice indexing.
    pub fn as_usize(self) -> usize {
        self.as_u32() as usize
    }

    /// Construct a node ID from a u32 value.
    ///
    /// Panics if the value exceeds [`NodeId::MAX`].
    pub fn from_u32(value: u32) -> NodeId {
        assert!(value <= Self::MAX, "node ID {} exceeds maximum", value);

        // Values are stored offset by one, reserving zero as a niche so that
        // `Option<NodeId>` is the same size as `NodeId`.
        NodeId(NonZero::<u32>::MIN.saturating_add(value))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_u32().fmt(f)
    }
}

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({})", self.as_u32())
    }
}
