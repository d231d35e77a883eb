//! # Chunk Module
//!
//! This module provides the `Chunk` struct: one fixed 16x128x16 tile of the
//! world grid, holding the dense voxel array, the two packed light fields
//! and the bookkeeping flags that drive the update pipeline.
//!
//! ## Storage Layout
//!
//! - `blocks`: a dense `Vec<u8>` of block identifiers in row-major order
//!   (x outermost, then y, then z).
//! - `sunlight` / `blocklight`: two independent [`NibbleArray`]s with the
//!   same cell ordering, 4 bits per cell.
//!
//! ## Accessor Policy
//!
//! Accessors never panic. Out-of-range reads return sentinels (air for
//! blocks, full sun / zero block light for the light channels) so the hot
//! per-voxel paths in lighting and meshing stay branch-predictable, and
//! mutation is gated on the `cached` flag so that racing writers cannot
//! touch a chunk that is being evicted.
//!
//! A chunk never holds a reference back to the world that owns it. When a
//! mutation lands on the chunk's X/Z boundary, the mutator reports the
//! affected neighbors as a [`NeighborSet`] and the world facade marks them
//! dirty.

use cgmath::Point2;

use crate::meshing::mesh::{ChunkMeshData, GpuChunkMesh};
use crate::world::block::{BlockId, BlockProperties};

use self::nibble_array::NibbleArray;

pub mod codec;
pub mod nibble_array;

/// Chunk width along the x-axis, in blocks.
pub const CHUNK_DIMENSION_X: i32 = 16;
/// Chunk height along the y-axis, in blocks.
pub const CHUNK_DIMENSION_Y: i32 = 128;
/// Chunk depth along the z-axis, in blocks.
pub const CHUNK_DIMENSION_Z: i32 = 16;
/// Total number of voxel cells in a chunk.
pub const CHUNK_VOLUME: usize =
    (CHUNK_DIMENSION_X * CHUNK_DIMENSION_Y * CHUNK_DIMENSION_Z) as usize;

/// The two independently propagated light fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LightChannel {
    /// Sunlight, seeded top-down from the sky.
    Sun,
    /// Artificial light emitted by light-source blocks.
    Block,
}

impl LightChannel {
    /// The value reported for reads outside chunk bounds: unoccluded sky
    /// for the sun channel, darkness for the block channel.
    pub fn out_of_range_value(self) -> u8 {
        match self {
            LightChannel::Sun => 15,
            LightChannel::Block => 0,
        }
    }
}

/// The eight X/Z neighbor offsets of a chunk, in the fixed order used when
/// loading neighbors and interpreting [`NeighborSet`] bits.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
];

/// A set of neighbor chunks affected by a boundary mutation.
///
/// Bit `i` refers to `NEIGHBOR_OFFSETS[i]`. Returned by the chunk mutators
/// instead of the chunk reaching into the world itself; the world facade
/// turns the set into dirty marks on the resident neighbors.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NeighborSet(u8);

impl NeighborSet {
    /// The empty set, reported for interior mutations and no-ops.
    pub fn empty() -> Self {
        NeighborSet(0)
    }

    /// True when no neighbor is affected.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn insert(&mut self, index: usize) {
        self.0 |= 1 << index;
    }

    /// Iterates the affected neighbor offsets in registration order.
    pub fn offsets(self) -> impl Iterator<Item = (i32, i32)> {
        NEIGHBOR_OFFSETS
            .into_iter()
            .enumerate()
            .filter(move |(i, _)| self.0 & (1 << i) != 0)
            .map(|(_, offset)| offset)
    }
}

/// Maps an integer onto the non-negative range for the pairing function.
fn map_to_positive(v: i32) -> u64 {
    if v >= 0 {
        2 * v as u64
    } else {
        (-2i64 * v as i64 - 1) as u64
    }
}

/// Derives the cache key for a chunk position via the cantor pairing
/// function over the sign-folded coordinates.
pub fn chunk_id(position: Point2<i32>) -> u64 {
    let k1 = map_to_positive(position.x);
    let k2 = map_to_positive(position.y);
    (k1 + k2) * (k1 + k2 + 1) / 2 + k2
}

/// Renders an integer in base 36 the way the save paths expect: lowercase
/// digits, with a leading `-` for negative values.
pub fn to_base36(v: i32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut n = (v as i64).unsigned_abs();
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    if v < 0 {
        out.push(b'-');
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// One 16x128x16 tile of the voxel world.
pub struct Chunk {
    pub(crate) position: Point2<i32>,
    pub(crate) blocks: Vec<BlockId>,
    pub(crate) sunlight: NibbleArray,
    pub(crate) blocklight: NibbleArray,

    dirty: bool,
    light_dirty: bool,
    fresh: bool,
    cached: bool,
    visible: bool,

    pending_mesh: Option<ChunkMeshData>,
    active_mesh: Option<GpuChunkMesh>,
}

impl Chunk {
    /// Creates a fresh, all-air chunk at the given chunk coordinates.
    ///
    /// Fresh chunks are dirty and light-dirty by construction; the update
    /// pipeline generates their terrain before anything else touches them.
    pub fn new(position: Point2<i32>) -> Self {
        Chunk {
            position,
            blocks: vec![0; CHUNK_VOLUME],
            sunlight: NibbleArray::new(CHUNK_VOLUME),
            blocklight: NibbleArray::new(CHUNK_VOLUME),
            dirty: true,
            light_dirty: true,
            fresh: true,
            cached: false,
            visible: false,
            pending_mesh: None,
            active_mesh: None,
        }
    }

    /// The chunk's position on the chunk grid.
    pub fn position(&self) -> Point2<i32> {
        self.position
    }

    /// The cache key derived from the chunk position.
    pub fn id(&self) -> u64 {
        chunk_id(self.position)
    }

    fn in_bounds(x: i32, y: i32, z: i32) -> bool {
        (0..CHUNK_DIMENSION_X).contains(&x)
            && (0..CHUNK_DIMENSION_Y).contains(&y)
            && (0..CHUNK_DIMENSION_Z).contains(&z)
    }

    fn index(x: i32, y: i32, z: i32) -> usize {
        ((x * CHUNK_DIMENSION_Y + y) * CHUNK_DIMENSION_Z + z) as usize
    }

    /// Returns the block at a chunk-local position, or air when the
    /// position lies outside the chunk.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> BlockId {
        if !Self::in_bounds(x, y, z) {
            return 0;
        }
        self.blocks[Self::index(x, y, z)]
    }

    /// Sets the block at a chunk-local position.
    ///
    /// A no-op unless the chunk is `cached`. On an actual change the chunk
    /// becomes dirty and the returned set names the neighbor chunks that
    /// share the mutated boundary cell.
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, id: BlockId) -> NeighborSet {
        if !self.cached || !Self::in_bounds(x, y, z) {
            return NeighborSet::empty();
        }
        let idx = Self::index(x, y, z);
        if self.blocks[idx] == id {
            return NeighborSet::empty();
        }
        self.blocks[idx] = id;
        self.dirty = true;
        self.boundary_neighbors(x, z)
    }

    /// Returns the light intensity at a chunk-local position, or the
    /// channel's out-of-range sentinel.
    pub fn get_light(&self, x: i32, y: i32, z: i32, channel: LightChannel) -> u8 {
        if !Self::in_bounds(x, y, z) {
            return channel.out_of_range_value();
        }
        let idx = Self::index(x, y, z);
        match channel {
            LightChannel::Sun => self.sunlight.get(idx),
            LightChannel::Block => self.blocklight.get(idx),
        }
    }

    /// Sets the light intensity at a chunk-local position, with the same
    /// cached gate and neighbor reporting as [`Chunk::set_block`].
    pub fn set_light(&mut self, x: i32, y: i32, z: i32, value: u8, channel: LightChannel) -> NeighborSet {
        if !self.cached || !Self::in_bounds(x, y, z) {
            return NeighborSet::empty();
        }
        let idx = Self::index(x, y, z);
        let field = match channel {
            LightChannel::Sun => &mut self.sunlight,
            LightChannel::Block => &mut self.blocklight,
        };
        if field.get(idx) == value {
            return NeighborSet::empty();
        }
        field.set(idx, value);
        self.dirty = true;
        self.boundary_neighbors(x, z)
    }

    /// Writes a block directly, bypassing the cached gate and the dirty
    /// bookkeeping. Used by terrain generation, which owns the chunk
    /// exclusively and sets the flags once at the end.
    pub(crate) fn set_block_raw(&mut self, x: i32, y: i32, z: i32, id: BlockId) {
        if Self::in_bounds(x, y, z) {
            self.blocks[Self::index(x, y, z)] = id;
        }
    }

    /// Writes the sun channel directly, bypassing the cached gate and the
    /// dirty bookkeeping. Used by the initial sunlight seeding, which runs
    /// before the chunk is published.
    pub(crate) fn set_sunlight_raw(&mut self, x: i32, y: i32, z: i32, value: u8) {
        if Self::in_bounds(x, y, z) {
            self.sunlight.set(Self::index(x, y, z), value);
        }
    }

    /// True when every cell above `y` in this column is translucent.
    pub fn can_see_sky(&self, x: i32, y: i32, z: i32) -> bool {
        for yy in (y + 1)..CHUNK_DIMENSION_Y {
            if !BlockProperties::of(self.get_block(x, yy, z)).translucent {
                return false;
            }
        }
        true
    }

    /// Which neighbor chunks touch the column at chunk-local `(x, z)`:
    /// the four edges and four corners of the X/Z footprint.
    pub fn boundary_neighbors(&self, x: i32, z: i32) -> NeighborSet {
        let mut set = NeighborSet::empty();
        if x == CHUNK_DIMENSION_X - 1 {
            set.insert(0);
        }
        if x == 0 {
            set.insert(1);
        }
        if z == CHUNK_DIMENSION_Z - 1 {
            set.insert(2);
        }
        if z == 0 {
            set.insert(3);
        }
        if x == CHUNK_DIMENSION_X - 1 && z == CHUNK_DIMENSION_Z - 1 {
            set.insert(4);
        }
        if x == 0 && z == 0 {
            set.insert(5);
        }
        if x == 0 && z == CHUNK_DIMENSION_Z - 1 {
            set.insert(6);
        }
        if x == CHUNK_DIMENSION_X - 1 && z == 0 {
            set.insert(7);
        }
        set
    }

    /// World x-coordinate of the chunk-local x column.
    pub fn block_world_x(&self, x: i32) -> i32 {
        self.position.x * CHUNK_DIMENSION_X + x
    }

    /// World z-coordinate of the chunk-local z column.
    pub fn block_world_z(&self, z: i32) -> i32 {
        self.position.y * CHUNK_DIMENSION_Z + z
    }

    /// Squared horizontal distance from the chunk origin to a world-space
    /// reference point, used to order eviction candidates.
    pub fn distance2_to(&self, point: Point2<f64>) -> f64 {
        let dx = (self.position.x * CHUNK_DIMENSION_X) as f64 - point.x;
        let dz = (self.position.y * CHUNK_DIMENSION_Z) as f64 - point.y;
        dx * dx + dz * dz
    }

    /// Save directory for this chunk relative to the world save root.
    pub fn save_dir(&self) -> String {
        format!("{}/{}", to_base36(self.position.x), to_base36(self.position.y))
    }

    /// Save file name for this chunk.
    pub fn save_file_name(&self) -> String {
        format!(
            "bc_{}.{}",
            to_base36(self.position.x),
            to_base36(self.position.y)
        )
    }

    /// Voxel data changed since the last mesh build.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks or clears the mesh-stale flag.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Light field requires recomputation before meshing is valid.
    pub fn is_light_dirty(&self) -> bool {
        self.light_dirty
    }

    /// Marks or clears the light-stale flag.
    pub fn set_light_dirty(&mut self, light_dirty: bool) {
        self.light_dirty = light_dirty;
    }

    /// Terrain has never been generated for this chunk.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Clears (or re-sets) the fresh flag.
    pub fn set_fresh(&mut self, fresh: bool) {
        self.fresh = fresh;
    }

    /// Resident and mutation-eligible.
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    /// Admits or bars the chunk from mutation.
    pub fn set_cached(&mut self, cached: bool) {
        self.cached = cached;
    }

    /// Currently part of the renderer's visible set.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Updates the renderer-visible flag.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Stores a freshly generated mesh, replacing any not-yet-swapped one.
    pub fn set_pending_mesh(&mut self, mesh: ChunkMeshData) {
        self.pending_mesh = Some(mesh);
    }

    /// True when a generated mesh is waiting to be uploaded and swapped.
    pub fn has_pending_mesh(&self) -> bool {
        self.pending_mesh.is_some()
    }

    /// Takes the pending mesh out of its slot, if any.
    pub fn take_pending_mesh(&mut self) -> Option<ChunkMeshData> {
        self.pending_mesh.take()
    }

    /// Installs a freshly uploaded mesh, returning the one it replaces so
    /// the caller can queue its GPU resources for disposal.
    pub fn replace_active_mesh(&mut self, mesh: GpuChunkMesh) -> Option<GpuChunkMesh> {
        self.active_mesh.replace(mesh)
    }

    /// True once an uploaded mesh is installed.
    pub fn has_active_mesh(&self) -> bool {
        self.active_mesh.is_some()
    }

    /// Strips both mesh slots for eviction. The pending CPU-side mesh is
    /// dropped on the spot; the active mesh is handed back so its GPU
    /// buffers can be released on the rendering thread.
    pub fn take_meshes_for_disposal(&mut self) -> Option<GpuChunkMesh> {
        self.pending_mesh = None;
        self.active_mesh.take()
    }
}
