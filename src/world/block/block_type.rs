//! # Block Type Module
//!
//! This module defines the block types known to the engine. Types are stored
//! in chunk voxel arrays as plain `u8` identifiers; the `FromPrimitive`
//! derive provides the conversion back from the stored integer, which is
//! also what the chunk codec relies on.

use num_derive::FromPrimitive;

use super::BlockId;

/// Enumerates all block types in the voxel world.
///
/// The discriminant of each variant is the identifier written into chunk
/// voxel storage, so the order here is part of the on-disk format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u8)]
pub enum BlockType {
    /// Air: invisible, translucent, never tessellated.
    Air,

    /// Plain stone.
    Stone,

    /// Dirt, the filler below grass.
    Dirt,

    /// Grass-covered dirt.
    Grass,

    /// Sand, used for beaches below the water line.
    Sand,

    /// Tree trunk.
    Wood,

    /// Tree canopy. Translucent so light filters through.
    Leaves,

    /// Transparent glass block.
    Glass,

    /// Water. Rendered lowered and alpha-blended in its own pass.
    Water,

    /// Lava. Rendered lowered in its own pass and emits block light.
    Lava,

    /// A torch, the canonical block light source.
    Torch,

    /// Tall grass, rendered as crossed billboard quads.
    TallGrass,

    /// Cactus, rendered with inset side faces.
    Cactus,
}

impl BlockType {
    /// Converts a stored block identifier back to a `BlockType`.
    ///
    /// Unknown identifiers (for example from a newer save file) decay to
    /// `Air` rather than failing, matching the forgiving accessor policy
    /// used throughout the chunk storage.
    pub fn from_id(id: BlockId) -> Self {
        num::FromPrimitive::from_u8(id).unwrap_or(BlockType::Air)
    }

    /// The stored identifier for this block type.
    pub fn id(self) -> BlockId {
        self as BlockId
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trips_through_from_id() {
        for ty in [
            BlockType::Air,
            BlockType::Stone,
            BlockType::Water,
            BlockType::Cactus,
        ] {
            assert_eq!(BlockType::from_id(ty.id()), ty);
        }
    }

    #[test]
    fn unknown_id_decays_to_air() {
        assert_eq!(BlockType::from_id(200), BlockType::Air);
    }
}
