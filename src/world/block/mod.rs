//! # Block Module
//!
//! Block types, faces and the static property table the rest of the engine
//! consults. Voxel storage never holds property data itself, only the `u8`
//! identifier; everything the light engine and the mesh generator need to
//! know about a block is looked up here.

pub mod block_side;
pub mod block_type;

pub use block_side::BlockSide;
pub use block_type::BlockType;

/// The integer type blocks are stored as inside chunk voxel arrays.
pub type BlockId = u8;

/// Width of one tile in the texture atlas, in normalized UV units.
pub const ATLAS_TILE: f32 = 0.0625;

/// How a block is turned into geometry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockForm {
    /// A regular face-culled cube.
    Normal,
    /// Two crossed quads, always emitted regardless of neighbors.
    Billboard,
    /// A cube whose uncovered vertices are dropped by a quarter block
    /// (water and lava surfaces).
    Lowered,
    /// A cube with side faces inset towards the center.
    Cactus,
}

/// Static, per-type block properties.
///
/// Consulted (not owned) by the light engine and the mesh generator. The
/// atlas offsets are indexed by [`BlockSide`] order: top, bottom, front,
/// back, left, right.
pub struct BlockProperties {
    /// Geometry class of the block.
    pub form: BlockForm,
    /// Whether light propagates through this block.
    pub translucent: bool,
    /// Whether the block is skipped entirely during meshing.
    pub invisible: bool,
    /// Whether the block contributes to per-vertex ambient occlusion.
    pub casts_shadows: bool,
    /// When set, faces adjacent to this block are always emitted.
    pub disable_tessellation: bool,
    /// Block-light emission in [0, 15]; 0 for non-sources.
    pub luminance: u8,
    /// Per-side texture atlas offsets.
    pub atlas: [[f32; 2]; 6],
    /// Vertex tint applied to every face.
    pub color: [f32; 4],
}

const fn tile(x: u8, y: u8) -> [f32; 2] {
    [x as f32 * ATLAS_TILE, y as f32 * ATLAS_TILE]
}

const fn uniform(t: [f32; 2]) -> [[f32; 2]; 6] {
    [t, t, t, t, t, t]
}

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

impl BlockProperties {
    const fn solid(atlas: [[f32; 2]; 6]) -> Self {
        BlockProperties {
            form: BlockForm::Normal,
            translucent: false,
            invisible: false,
            casts_shadows: true,
            disable_tessellation: false,
            luminance: 0,
            atlas,
            color: WHITE,
        }
    }

    /// Looks up the properties for a stored block identifier.
    ///
    /// Unknown identifiers resolve to air, so stale or corrupt voxel data
    /// degrades to empty space instead of failing.
    pub fn of(id: BlockId) -> &'static BlockProperties {
        BLOCK_PROPERTIES.get(&id).unwrap_or(&AIR_PROPERTIES)
    }
}

static AIR_PROPERTIES: BlockProperties = BlockProperties {
    form: BlockForm::Normal,
    translucent: true,
    invisible: true,
    casts_shadows: false,
    disable_tessellation: false,
    luminance: 0,
    atlas: uniform(tile(0, 0)),
    color: WHITE,
};

/// The property table, keyed by stored block identifier.
static BLOCK_PROPERTIES: phf::Map<u8, BlockProperties> = phf::phf_map! {
    0u8 => BlockProperties {
        form: BlockForm::Normal,
        translucent: true,
        invisible: true,
        casts_shadows: false,
        disable_tessellation: false,
        luminance: 0,
        atlas: uniform(tile(0, 0)),
        color: WHITE,
    },
    1u8 => BlockProperties::solid(uniform(tile(1, 0))),
    2u8 => BlockProperties::solid(uniform(tile(2, 0))),
    3u8 => BlockProperties {
        // Grass: green top, dirt bottom, grass-on-dirt sides.
        atlas: [
            tile(0, 0),
            tile(2, 0),
            tile(3, 0),
            tile(3, 0),
            tile(3, 0),
            tile(3, 0),
        ],
        ..BlockProperties::solid(uniform(tile(3, 0)))
    },
    4u8 => BlockProperties::solid(uniform(tile(2, 1))),
    5u8 => BlockProperties {
        atlas: [
            tile(5, 1),
            tile(5, 1),
            tile(4, 1),
            tile(4, 1),
            tile(4, 1),
            tile(4, 1),
        ],
        ..BlockProperties::solid(uniform(tile(4, 1)))
    },
    6u8 => BlockProperties {
        translucent: true,
        ..BlockProperties::solid(uniform(tile(6, 1)))
    },
    7u8 => BlockProperties {
        translucent: true,
        casts_shadows: false,
        ..BlockProperties::solid(uniform(tile(7, 1)))
    },
    8u8 => BlockProperties {
        form: BlockForm::Lowered,
        translucent: true,
        casts_shadows: false,
        disable_tessellation: true,
        ..BlockProperties::solid(uniform(tile(15, 12)))
    },
    9u8 => BlockProperties {
        form: BlockForm::Lowered,
        translucent: true,
        casts_shadows: false,
        disable_tessellation: true,
        luminance: 15,
        ..BlockProperties::solid(uniform(tile(15, 15)))
    },
    10u8 => BlockProperties {
        form: BlockForm::Billboard,
        translucent: true,
        casts_shadows: false,
        luminance: 14,
        ..BlockProperties::solid(uniform(tile(0, 5)))
    },
    11u8 => BlockProperties {
        form: BlockForm::Billboard,
        translucent: true,
        casts_shadows: false,
        color: [0.6, 0.9, 0.4, 1.0],
        ..BlockProperties::solid(uniform(tile(7, 2)))
    },
    12u8 => BlockProperties {
        form: BlockForm::Cactus,
        translucent: true,
        atlas: [
            tile(5, 4),
            tile(7, 4),
            tile(6, 4),
            tile(6, 4),
            tile(6, 4),
            tile(6, 4),
        ],
        ..BlockProperties::solid(uniform(tile(6, 4)))
    },
};
