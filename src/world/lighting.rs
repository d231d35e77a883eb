//! # Light Propagation
//!
//! Flood-fill propagation for the two light channels. All routines here
//! work on absolute world coordinates and run on explicit frontier queues,
//! so propagation crosses chunk boundaries through the world facade
//! without recursing and without any chunk holding a reference to its
//! neighbors.
//!
//! Light attenuates by one per step through translucent cells. Removing
//! light is a two-phase job: a darkening pass clears every cell the old
//! source could have reached, collecting the brighter cells found at the
//! frontier, and a refill pass re-spreads from those cells so unrelated
//! sources reclaim the darkened region.

use std::collections::VecDeque;

use crate::world::block::{BlockForm, BlockProperties};
use crate::world::chunk::{Chunk, LightChannel, CHUNK_DIMENSION_X, CHUNK_DIMENSION_Y, CHUNK_DIMENSION_Z};
use crate::world::{ChunkHandle, WorldProvider};

/// Maximum light intensity.
pub const MAX_LIGHT: u8 = 15;

/// True when a column cell blocks sunlight from the cells below it.
fn blocks_sunlight(props: &BlockProperties) -> bool {
    !props.translucent && props.form != BlockForm::Billboard
}

/// Seeds the sun channel of a freshly generated chunk.
///
/// Scans every column top-down: cells above the first sun-blocking block
/// receive full intensity if light passes through them, everything at or
/// below it stays dark. Runs before the chunk is published, so it writes
/// the light field directly without touching the dirty flags.
pub fn generate_sunlight(chunk: &mut Chunk) {
    for x in 0..CHUNK_DIMENSION_X {
        for z in 0..CHUNK_DIMENSION_Z {
            let mut covered = false;
            for y in (0..CHUNK_DIMENSION_Y).rev() {
                let props = BlockProperties::of(chunk.get_block(x, y, z));
                if blocks_sunlight(props) {
                    covered = true;
                }
                let value = if !covered { MAX_LIGHT } else { 0 };
                chunk.set_sunlight_raw(x, y, z, value);
            }
        }
    }
}

/// One queued cell of a propagation frontier.
struct Frontier {
    x: i32,
    y: i32,
    z: i32,
    depth: u8,
}

const NEIGHBORS: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

impl WorldProvider {
    /// Spreads light outward from a cell holding `value`.
    ///
    /// Every reachable translucent cell within `value` steps is raised to
    /// `value` minus its distance from the origin, unless it is already at
    /// least that bright.
    pub fn spread_light(&self, x: i32, y: i32, z: i32, value: u8, channel: LightChannel) {
        let mut queue = VecDeque::new();
        queue.push_back(Frontier { x, y, z, depth: 0 });

        while let Some(cell) = queue.pop_front() {
            if cell.depth > value {
                continue;
            }
            let new_value = value - cell.depth;
            // A cell can be queued twice along different paths; the later,
            // deeper visit must not lower what the first one wrote.
            if cell.depth > 0 && self.get_light(cell.x, cell.y, cell.z, channel) >= new_value {
                continue;
            }
            self.set_light(cell.x, cell.y, cell.z, new_value, channel);

            for (dx, dy, dz) in NEIGHBORS {
                let (nx, ny, nz) = (cell.x + dx, cell.y + dy, cell.z + dz);
                if !(0..CHUNK_DIMENSION_Y).contains(&ny) {
                    continue;
                }
                let neighbor_value = self.get_light(nx, ny, nz, channel);
                let translucent = BlockProperties::of(self.get_block(nx, ny, nz)).translucent;
                if neighbor_value + 1 < new_value && translucent {
                    queue.push_back(Frontier {
                        x: nx,
                        y: ny,
                        z: nz,
                        depth: cell.depth + 1,
                    });
                }
            }
        }
    }

    /// Removes the light that a now-dimmed source at the given cell used
    /// to contribute.
    ///
    /// The darkening pass clears every cell the old `value` could have
    /// reached; cells at the frontier that are as bright or brighter belong
    /// to other sources and are re-spread afterwards so the darkened region
    /// is refilled from them.
    pub fn unspread_light(&self, x: i32, y: i32, z: i32, value: u8, channel: LightChannel) {
        let mut bright_spots = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back((x, y, z, value));

        while let Some((cx, cy, cz, cval)) = queue.pop_front() {
            self.set_light(cx, cy, cz, 0, channel);
            if cval == 0 {
                continue;
            }

            for (dx, dy, dz) in NEIGHBORS {
                let (nx, ny, nz) = (cx + dx, cy + dy, cz + dz);
                if !(0..CHUNK_DIMENSION_Y).contains(&ny) {
                    continue;
                }
                let neighbor_value = self.get_light(nx, ny, nz, channel);
                let translucent = BlockProperties::of(self.get_block(nx, ny, nz)).translucent;
                if neighbor_value < cval && neighbor_value > 0 && translucent {
                    queue.push_back((nx, ny, nz, cval - 1));
                } else if neighbor_value >= cval {
                    bright_spots.push((nx, ny, nz));
                }
            }
        }

        for (bx, by, bz) in bright_spots {
            let current = self.get_light(bx, by, bz, channel);
            self.spread_light(bx, by, bz, current, channel);
        }
    }

    /// Recomputes the light value of one cell from its six neighbors.
    ///
    /// Opaque cells are forced dark. Translucent cells take the brightest
    /// neighbor minus one, unless they are already brighter than that.
    pub fn refresh_light_at(&self, x: i32, y: i32, z: i32, channel: LightChannel) {
        if !BlockProperties::of(self.get_block(x, y, z)).translucent {
            self.set_light(x, y, z, 0, channel);
            return;
        }

        let current = self.get_light(x, y, z, channel);
        let brightest = NEIGHBORS
            .iter()
            .map(|(dx, dy, dz)| self.get_light(x + dx, y + dy, z + dz, channel))
            .max()
            .unwrap_or(0);
        let refreshed = brightest.saturating_sub(1);
        self.set_light(x, y, z, current.max(refreshed), channel);
    }

    /// Recomputes the sunlight of the world column at `(x, z)` after a
    /// block edit.
    ///
    /// Walks the column top-down re-deriving the covered state. When
    /// `refresh` is set, covered cells pull light back in from their
    /// neighbors; when `spread` is set, cells whose value changed propagate
    /// the difference outward (or unspread it when the column darkened).
    pub fn refresh_sunlight_column(&self, x: i32, z: i32, spread: bool, refresh: bool) {
        let chunk = self.chunk_containing(x, z);
        let local_x = x.rem_euclid(CHUNK_DIMENSION_X);
        let local_z = z.rem_euclid(CHUNK_DIMENSION_Z);

        let mut covered = false;
        for y in (0..CHUNK_DIMENSION_Y).rev() {
            let old_value;
            {
                let mut guard = chunk.get_mut();
                let props = BlockProperties::of(guard.get_block(local_x, y, local_z));
                if blocks_sunlight(props) {
                    covered = true;
                }
                old_value = guard.get_light(local_x, y, local_z, LightChannel::Sun);
                let direct = if !covered { MAX_LIGHT } else { 0 };
                guard.set_sunlight_raw(local_x, y, local_z, direct);
            }

            if covered && refresh {
                self.refresh_light_at(x, y, z, LightChannel::Sun);
            }

            let new_value = self.get_light(x, y, z, LightChannel::Sun);
            if spread && old_value > new_value {
                self.unspread_light(x, y, z, old_value, LightChannel::Sun);
            } else if spread && old_value < new_value {
                self.spread_light(x, y, z, new_value, LightChannel::Sun);
            }
        }
    }

    /// Spreads the seeded sunlight of a chunk into its surroundings and
    /// clears the chunk's light-dirty flag.
    ///
    /// Fresh chunks are skipped; their light is seeded during generation.
    /// The seed set is collected under a single read lock and the guard is
    /// dropped before propagation starts, since propagation re-enters the
    /// chunk through the world facade.
    pub fn update_light(&self, chunk: &ChunkHandle) {
        let mut seeds = Vec::new();
        {
            let guard = chunk.get();
            if guard.is_fresh() {
                return;
            }
            for x in 0..CHUNK_DIMENSION_X {
                for z in 0..CHUNK_DIMENSION_Z {
                    for y in 0..CHUNK_DIMENSION_Y {
                        let value = guard.get_light(x, y, z, LightChannel::Sun);
                        if value > 0
                            && BlockProperties::of(guard.get_block(x, y, z)).translucent
                        {
                            seeds.push((
                                guard.block_world_x(x),
                                y,
                                guard.block_world_z(z),
                                value,
                            ));
                        }
                    }
                }
            }
        }

        for (x, y, z, value) in seeds {
            self.spread_light(x, y, z, value, LightChannel::Sun);
        }

        chunk.get_mut().set_light_dirty(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::block::BlockType;
    use crate::world::test_support::empty_world;
    use cgmath::Point2;

    #[test]
    fn sunlight_fills_open_columns() {
        let mut chunk = Chunk::new(Point2::new(0, 0));
        generate_sunlight(&mut chunk);
        for y in [0, 64, 127] {
            assert_eq!(chunk.get_light(5, y, 5, LightChannel::Sun), MAX_LIGHT);
        }
    }

    #[test]
    fn sunlight_stops_below_cover() {
        let mut chunk = Chunk::new(Point2::new(0, 0));
        chunk.set_cached(true);
        for x in 0..CHUNK_DIMENSION_X {
            for z in 0..CHUNK_DIMENSION_Z {
                chunk.set_block(x, 80, z, BlockType::Stone.id());
            }
        }
        generate_sunlight(&mut chunk);

        assert_eq!(chunk.get_light(4, 81, 4, LightChannel::Sun), MAX_LIGHT);
        assert_eq!(chunk.get_light(4, 80, 4, LightChannel::Sun), 0);
        assert_eq!(chunk.get_light(4, 40, 4, LightChannel::Sun), 0);
    }

    #[test]
    fn billboards_do_not_block_sunlight() {
        let mut chunk = Chunk::new(Point2::new(0, 0));
        chunk.set_cached(true);
        chunk.set_block(3, 90, 3, BlockType::TallGrass.id());
        generate_sunlight(&mut chunk);

        assert_eq!(chunk.get_light(3, 90, 3, LightChannel::Sun), MAX_LIGHT);
        assert_eq!(chunk.get_light(3, 50, 3, LightChannel::Sun), MAX_LIGHT);
    }

    #[test]
    fn spread_attenuates_with_distance() {
        let (world, _dir) = empty_world();
        world.chunk_containing(8, 8);

        world.spread_light(8, 64, 8, 12, LightChannel::Block);

        assert_eq!(world.get_light(8, 64, 8, LightChannel::Block), 12);
        assert_eq!(world.get_light(11, 64, 8, LightChannel::Block), 9);
        assert_eq!(world.get_light(8, 64, 13, LightChannel::Block), 7);
        assert_eq!(world.get_light(8, 70, 8, LightChannel::Block), 6);
        // Out of range of the source.
        assert_eq!(world.get_light(8, 64, 8 + 13, LightChannel::Block), 0);
    }

    #[test]
    fn spread_crosses_chunk_boundaries() {
        let (world, _dir) = empty_world();
        world.spread_light(15, 64, 8, 10, LightChannel::Block);
        // Two steps over the seam into the +x neighbor chunk.
        assert_eq!(world.get_light(17, 64, 8, LightChannel::Block), 8);
    }

    #[test]
    fn unspread_clears_and_refills_from_other_sources() {
        let (world, _dir) = empty_world();
        world.chunk_containing(8, 8);

        world.spread_light(8, 64, 8, 10, LightChannel::Block);
        world.spread_light(14, 64, 8, 10, LightChannel::Block);

        world.unspread_light(8, 64, 8, 10, LightChannel::Block);

        // The removed source's own cell only keeps what the surviving
        // source provides.
        assert_eq!(world.get_light(14, 64, 8, LightChannel::Block), 10);
        assert_eq!(world.get_light(8, 64, 8, LightChannel::Block), 4);
        assert_eq!(world.get_light(13, 64, 8, LightChannel::Block), 9);
    }

    #[test]
    fn unspread_then_respread_restores_the_field() {
        let (world, _dir) = empty_world();
        world.spread_light(8, 64, 8, 12, LightChannel::Block);

        let region = || {
            let mut values = Vec::new();
            for x in -5..22 {
                for z in -5..22 {
                    for y in 51..78 {
                        values.push(world.get_light(x, y, z, LightChannel::Block));
                    }
                }
            }
            values
        };

        let lit = region();
        assert!(lit.iter().any(|&v| v > 0));

        // With no other source, the darkening pass clears everything.
        world.unspread_light(8, 64, 8, 12, LightChannel::Block);
        assert!(region().iter().all(|&v| v == 0));

        world.spread_light(8, 64, 8, 12, LightChannel::Block);
        assert_eq!(region(), lit);
    }

    #[test]
    fn refresh_pulls_light_from_brightest_neighbor() {
        let (world, _dir) = empty_world();
        world.chunk_containing(8, 8);

        world.set_light(8, 64, 8, 9, LightChannel::Block);
        world.refresh_light_at(9, 64, 8, LightChannel::Block);
        assert_eq!(world.get_light(9, 64, 8, LightChannel::Block), 8);

        // An already brighter cell is left alone.
        world.set_light(7, 64, 8, 12, LightChannel::Block);
        world.refresh_light_at(7, 64, 8, LightChannel::Block);
        assert_eq!(world.get_light(7, 64, 8, LightChannel::Block), 12);
    }
}
