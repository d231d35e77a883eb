//! # Block Side Module
//!
//! Identifies the six faces of a cube-shaped block. The numeric values are
//! used to index per-side tables such as the texture atlas offsets.

/// One of the six faces of a block.
///
/// The axis convention matches the mesh generator: `Front` faces −z,
/// `Back` faces +z, `Left` faces −x and `Right` faces +x.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockSide {
    /// The +y face.
    Top,
    /// The −y face.
    Bottom,
    /// The −z face.
    Front,
    /// The +z face.
    Back,
    /// The −x face.
    Left,
    /// The +x face.
    Right,
}

impl BlockSide {
    /// All six sides in index order, handy for per-side iteration.
    pub const ALL: [BlockSide; 6] = [
        BlockSide::Top,
        BlockSide::Bottom,
        BlockSide::Front,
        BlockSide::Back,
        BlockSide::Left,
        BlockSide::Right,
    ];
}
