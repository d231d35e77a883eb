//! # World Provider
//!
//! The facade the rest of the engine talks to. It owns the chunk cache,
//! the generator stack and the config, and exposes block and light access
//! keyed by absolute world coordinates; chunk residency and local
//! coordinate translation happen behind it.
//!
//! Block edits route through [`WorldProvider::set_block`], which keeps the
//! two light fields consistent: the sunlight column above the edit is
//! recomputed and the block-light contribution of the placed or removed
//! block is spread or unspread.
//!
//! No chunk guard is ever held across a call that can take another chunk's
//! lock; every method scopes its guards tightly.

use std::collections::HashSet;
use std::time::Instant;

use cgmath::Point2;
use log::debug;

use crate::config::WorldConfig;
use crate::world::block::{BlockId, BlockProperties};
use crate::world::cache::ChunkCache;
use crate::world::chunk::{
    chunk_id, LightChannel, NeighborSet, CHUNK_DIMENSION_X, CHUNK_DIMENSION_Y, CHUNK_DIMENSION_Z,
    NEIGHBOR_OFFSETS,
};
use crate::world::generator::{ChunkGenerator, FloraGenerator, TerrainGenerator};
use crate::world::lighting::generate_sunlight;
use crate::world::ChunkHandle;

/// Owns the world state and serves world-coordinate access to it.
pub struct WorldProvider {
    cache: ChunkCache,
    generators: Vec<(String, Box<dyn ChunkGenerator>)>,
    config: WorldConfig,
}

impl WorldProvider {
    /// Creates a world with the standard generator stack (terrain, then
    /// flora) seeded from the config.
    pub fn new(config: WorldConfig) -> Self {
        let generators: Vec<(String, Box<dyn ChunkGenerator>)> = vec![
            (
                "terrain".to_string(),
                Box::new(TerrainGenerator::new(config.seed)),
            ),
            (
                "flora".to_string(),
                Box::new(FloraGenerator::new(config.seed)),
            ),
        ];
        Self::with_generators(config, generators)
    }

    /// Creates a world with an explicit generator stack. Generators run in
    /// the given order on every fresh chunk.
    pub fn with_generators(
        config: WorldConfig,
        generators: Vec<(String, Box<dyn ChunkGenerator>)>,
    ) -> Self {
        let cache = ChunkCache::new(config.cache_capacity(), config.save_path.clone().into());
        WorldProvider {
            cache,
            generators,
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The chunk cache backing this world.
    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    /// The chunk at the given chunk-grid position, made resident if
    /// necessary.
    pub fn chunk_at(&self, position: Point2<i32>) -> ChunkHandle {
        self.cache.load_or_create(position)
    }

    /// The chunk containing the world column `(x, z)`.
    pub fn chunk_containing(&self, x: i32, z: i32) -> ChunkHandle {
        self.chunk_at(Point2::new(
            x.div_euclid(CHUNK_DIMENSION_X),
            z.div_euclid(CHUNK_DIMENSION_Z),
        ))
    }

    /// The eight chunks around a chunk position, made resident if
    /// necessary.
    pub fn neighbor_chunks(&self, position: Point2<i32>) -> Vec<ChunkHandle> {
        NEIGHBOR_OFFSETS
            .iter()
            .map(|(dx, dz)| self.chunk_at(Point2::new(position.x + dx, position.y + dz)))
            .collect()
    }

    /// The block at a world position. Positions above or below the world
    /// read as air.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> BlockId {
        if !(0..CHUNK_DIMENSION_Y).contains(&y) {
            return 0;
        }
        let chunk = self.chunk_containing(x, z);
        let guard = chunk.get();
        guard.get_block(x.rem_euclid(CHUNK_DIMENSION_X), y, z.rem_euclid(CHUNK_DIMENSION_Z))
    }

    /// The light intensity at a world position. Above and below the world
    /// the sky is unoccluded: full sun, no block light.
    pub fn get_light(&self, x: i32, y: i32, z: i32, channel: LightChannel) -> u8 {
        if !(0..CHUNK_DIMENSION_Y).contains(&y) {
            return channel.out_of_range_value();
        }
        let chunk = self.chunk_containing(x, z);
        let guard = chunk.get();
        guard.get_light(
            x.rem_euclid(CHUNK_DIMENSION_X),
            y,
            z.rem_euclid(CHUNK_DIMENSION_Z),
            channel,
        )
    }

    /// Sets the light intensity at a world position and marks the chunks
    /// sharing that cell's boundary dirty.
    pub fn set_light(&self, x: i32, y: i32, z: i32, value: u8, channel: LightChannel) {
        if !(0..CHUNK_DIMENSION_Y).contains(&y) {
            return;
        }
        let chunk = self.chunk_containing(x, z);
        let (position, neighbors) = {
            let mut guard = chunk.get_mut();
            let neighbors = guard.set_light(
                x.rem_euclid(CHUNK_DIMENSION_X),
                y,
                z.rem_euclid(CHUNK_DIMENSION_Z),
                value,
                channel,
            );
            (guard.position(), neighbors)
        };
        self.mark_neighbors_dirty(position, neighbors);
    }

    /// Sets the block at a world position.
    ///
    /// With `update_light` set, both light fields are brought back in
    /// sync: the sunlight column is recomputed, and the block light either
    /// spreads the new block's luminance or unspreads what the removed
    /// block used to receive.
    pub fn set_block(&self, x: i32, y: i32, z: i32, id: BlockId, update_light: bool) {
        if !(0..CHUNK_DIMENSION_Y).contains(&y) {
            return;
        }
        let chunk = self.chunk_containing(x, z);
        let local_x = x.rem_euclid(CHUNK_DIMENSION_X);
        let local_z = z.rem_euclid(CHUNK_DIMENSION_Z);

        let (position, old_block, neighbors) = {
            let mut guard = chunk.get_mut();
            let old_block = guard.get_block(local_x, y, local_z);
            if old_block == id {
                return;
            }
            let neighbors = guard.set_block(local_x, y, local_z, id);
            (guard.position(), old_block, neighbors)
        };
        self.mark_neighbors_dirty(position, neighbors);

        if !update_light {
            return;
        }

        self.refresh_sunlight_column(x, z, true, true);

        let prev_block_light = self.get_light(x, y, z, LightChannel::Block);
        let current_block_light = if old_block == 0 && id != 0 {
            // A block was placed: it contributes its own luminance.
            let luminance = BlockProperties::of(id).luminance;
            self.set_light(x, y, z, luminance, LightChannel::Block);
            luminance
        } else {
            // A block was removed (or replaced): rebuild the cell's value
            // from its neighbors.
            self.set_light(x, y, z, 0, LightChannel::Block);
            self.refresh_light_at(x, y, z, LightChannel::Block);
            self.get_light(x, y, z, LightChannel::Block)
        };

        if current_block_light > prev_block_light {
            self.spread_light(x, y, z, current_block_light, LightChannel::Block);
        } else if current_block_light < prev_block_light {
            self.unspread_light(x, y, z, prev_block_light, LightChannel::Block);
        }
    }

    /// Marks the resident chunks named by a boundary mutation dirty.
    /// Non-resident neighbors are left alone; they rebuild their mesh
    /// from current data whenever they become resident again.
    fn mark_neighbors_dirty(&self, position: Point2<i32>, neighbors: NeighborSet) {
        for (dx, dz) in neighbors.offsets() {
            let id = chunk_id(Point2::new(position.x + dx, position.y + dz));
            if let Some(handle) = self.cache.handle(id) {
                handle.get_mut().set_dirty(true);
            }
        }
    }

    /// Runs the generator stack on a fresh chunk and seeds its sunlight.
    /// Non-fresh chunks are left untouched.
    pub fn generate_chunk(&self, chunk: &ChunkHandle) {
        let mut guard = chunk.get_mut();
        if !guard.is_fresh() {
            return;
        }

        let started = Instant::now();
        for (name, generator) in &self.generators {
            generator.generate(&mut guard);
            debug!(
                "generator {name} finished for chunk ({}, {})",
                guard.position().x,
                guard.position().y
            );
        }
        generate_sunlight(&mut guard);

        guard.set_fresh(false);
        guard.set_dirty(true);
        guard.set_light_dirty(true);
        debug!(
            "chunk ({}, {}) generated in {:?}",
            guard.position().x,
            guard.position().y,
            started.elapsed()
        );
    }

    /// True when a freshly generated mesh for the chunk at `position` may
    /// replace the active one.
    ///
    /// Swapping next to a visible neighbor that still has stale voxel or
    /// light data would show a mismatched seam for a frame, so the swap
    /// waits until those neighbors have caught up.
    pub fn neighbors_allow_swap(&self, position: Point2<i32>) -> bool {
        for (dx, dz) in NEIGHBOR_OFFSETS {
            let id = chunk_id(Point2::new(position.x + dx, position.y + dz));
            if let Some(handle) = self.cache.handle(id) {
                let guard = handle.get();
                if guard.is_visible() && (guard.is_dirty() || guard.is_light_dirty()) {
                    return false;
                }
            }
        }
        true
    }

    /// Uploads the chunk's pending mesh and installs it as the active one.
    ///
    /// Returns false without touching anything when there is no pending
    /// mesh or a visible neighbor is still stale. The replaced mesh goes
    /// to the disposal queue. Must be called on the render thread.
    pub fn try_swap_pending(&self, chunk: &ChunkHandle, device: &wgpu::Device) -> bool {
        let position = chunk.get().position();
        if !self.neighbors_allow_swap(position) {
            return false;
        }

        let Some(data) = chunk.get_mut().take_pending_mesh() else {
            return false;
        };
        let uploaded = crate::meshing::mesh::GpuChunkMesh::upload(device, &data);

        if let Some(retired) = chunk.get_mut().replace_active_mesh(uploaded) {
            self.cache.queue_disposal(retired);
        }
        true
    }

    /// Evicts far-away chunks until the cache fits its capacity, pinning
    /// those with updates in flight.
    pub fn free_cache_space(&self, center: Point2<f64>, in_flight: &HashSet<u64>) {
        self.cache.free_cache_space(center, in_flight);
    }

    /// Saves every resident chunk. Called on shutdown.
    pub fn flush(&self) {
        self.cache.flush_to_disk();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::block::BlockType;
    use crate::world::test_support::{empty_world, temp_save_dir};

    #[test]
    fn world_coordinates_map_into_negative_chunks() {
        let (world, _dir) = empty_world();
        world.set_block(-5, 10, -20, BlockType::Stone.id(), false);

        assert_eq!(world.get_block(-5, 10, -20), BlockType::Stone.id());
        assert!(world
            .cache()
            .handle(chunk_id(Point2::new(-1, -2)))
            .is_some());
    }

    #[test]
    fn out_of_range_heights_read_as_air_and_sky() {
        let (world, _dir) = empty_world();
        assert_eq!(world.get_block(0, -1, 0), 0);
        assert_eq!(world.get_block(0, CHUNK_DIMENSION_Y, 0), 0);
        assert_eq!(world.get_light(0, -1, 0, LightChannel::Sun), 15);
        assert_eq!(world.get_light(0, CHUNK_DIMENSION_Y, 0, LightChannel::Block), 0);
    }

    #[test]
    fn boundary_edits_mark_resident_neighbors_dirty() {
        let (world, _dir) = empty_world();
        let chunk = world.chunk_at(Point2::new(0, 0));
        let neighbor = world.chunk_at(Point2::new(1, 0));
        chunk.get_mut().set_dirty(false);
        neighbor.get_mut().set_dirty(false);

        world.set_block(15, 10, 8, BlockType::Stone.id(), false);

        assert!(chunk.get().is_dirty());
        assert!(neighbor.get().is_dirty());
    }

    #[test]
    fn generate_chunk_runs_once_and_seeds_light() {
        let dir = temp_save_dir();
        let config = crate::config::WorldConfig {
            save_path: dir.0.to_string_lossy().into_owned(),
            seed: 7,
            ..Default::default()
        };
        let world = WorldProvider::new(config);

        let chunk = world.chunk_at(Point2::new(0, 0));
        world.generate_chunk(&chunk);

        {
            let guard = chunk.get();
            assert!(!guard.is_fresh());
            assert!(guard.is_dirty());
            assert!(guard.is_light_dirty());
            assert_eq!(guard.get_block(0, 0, 0), BlockType::Stone.id());
            assert_eq!(
                guard.get_light(0, CHUNK_DIMENSION_Y - 1, 0, LightChannel::Sun),
                15
            );
        }

        // Running again must not regenerate over edits.
        world.set_block(3, 100, 3, BlockType::Glass.id(), false);
        world.generate_chunk(&chunk);
        assert_eq!(world.get_block(3, 100, 3), BlockType::Glass.id());
    }

    #[test]
    fn placing_a_torch_spreads_its_light() {
        let (world, _dir) = empty_world();
        let chunk = world.chunk_at(Point2::new(0, 0));
        world.generate_chunk(&chunk);

        world.set_block(8, 64, 8, BlockType::Torch.id(), true);

        let luminance = BlockProperties::of(BlockType::Torch.id()).luminance;
        assert_eq!(world.get_light(8, 64, 8, LightChannel::Block), luminance);
        assert_eq!(
            world.get_light(9, 64, 8, LightChannel::Block),
            luminance - 1
        );
        // A billboard does not shade the column below it.
        assert_eq!(world.get_light(8, 63, 8, LightChannel::Sun), 15);
    }

    #[test]
    fn removing_a_torch_unspreads_its_light() {
        let (world, _dir) = empty_world();
        let chunk = world.chunk_at(Point2::new(0, 0));
        world.generate_chunk(&chunk);

        world.set_block(8, 64, 8, BlockType::Torch.id(), true);
        world.set_block(8, 64, 8, BlockType::Air.id(), true);

        assert_eq!(world.get_light(8, 64, 8, LightChannel::Block), 0);
        assert_eq!(world.get_light(9, 64, 8, LightChannel::Block), 0);
        assert_eq!(world.get_light(8, 70, 8, LightChannel::Block), 0);
    }

    #[test]
    fn placing_a_block_shades_the_column_below() {
        let (world, _dir) = empty_world();
        let chunk = world.chunk_at(Point2::new(0, 0));
        world.generate_chunk(&chunk);

        world.set_block(8, 64, 8, BlockType::Stone.id(), true);

        assert_eq!(world.get_light(8, 64, 8, LightChannel::Sun), 0);
        // The cell below is no longer sunlit directly, but the open
        // neighbor columns feed it.
        assert_eq!(world.get_light(8, 63, 8, LightChannel::Sun), 14);
        // Above the new block nothing changes.
        assert_eq!(world.get_light(8, 65, 8, LightChannel::Sun), 15);
    }

    #[test]
    fn swap_gate_blocks_on_stale_visible_neighbors() {
        let (world, _dir) = empty_world();
        let chunk = world.chunk_at(Point2::new(0, 0));
        let neighbor = world.chunk_at(Point2::new(1, 0));
        world.generate_chunk(&chunk);
        world.generate_chunk(&neighbor);

        // Neighbor is stale but not visible: swapping is fine.
        assert!(world.neighbors_allow_swap(Point2::new(0, 0)));

        neighbor.get_mut().set_visible(true);
        assert!(!world.neighbors_allow_swap(Point2::new(0, 0)));

        {
            let mut guard = neighbor.get_mut();
            guard.set_dirty(false);
            guard.set_light_dirty(false);
        }
        assert!(world.neighbors_allow_swap(Point2::new(0, 0)));
    }
}
