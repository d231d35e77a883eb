//! # Terrain Generation
//!
//! Chunk generators fill the voxel array of a fresh chunk. The world runs
//! its registered generators in order, so later generators (flora) can
//! decorate what earlier ones (terrain) produced.
//!
//! Generation must be a pure function of the world seed and the chunk
//! position: the cache regenerates evicted-and-lost chunks from scratch
//! and the result has to match what was there before.

use noise::{NoiseFn, Perlin};

use super::block::BlockType;
use super::chunk::{chunk_id, Chunk, CHUNK_DIMENSION_X, CHUNK_DIMENSION_Y, CHUNK_DIMENSION_Z};

/// Scaling factor applied to world coordinates when sampling terrain noise.
const TERRAIN_NOISE_SCALE: f64 = 0.01;
/// Mean terrain height in blocks.
const TERRAIN_BASE_HEIGHT: f64 = 48.0;
/// Peak-to-mean terrain height variation in blocks.
const TERRAIN_AMPLITUDE: f64 = 24.0;
/// Water fills air cells up to this height.
const SEA_LEVEL: i32 = 40;
/// One in this many grass columns sprouts tall grass.
const FLORA_SPARSENESS: u32 = 16;

/// Fills the voxel array of a freshly created chunk.
///
/// Implementations write blocks directly; light seeding and dirty flag
/// handling happen in the world after all generators have run.
pub trait ChunkGenerator: Send + Sync {
    /// Writes this generator's blocks into the chunk.
    fn generate(&self, chunk: &mut Chunk);
}

/// Heightfield terrain from 2D Perlin noise: stone core, dirt cover,
/// grass or sand on top and water up to the sea level.
pub struct TerrainGenerator {
    noise: Perlin,
}

impl TerrainGenerator {
    /// Creates a terrain generator for the given world seed.
    pub fn new(seed: u32) -> Self {
        TerrainGenerator {
            noise: Perlin::new(seed),
        }
    }

    fn surface_height(&self, world_x: i32, world_z: i32) -> i32 {
        let sample = self.noise.get([
            world_x as f64 * TERRAIN_NOISE_SCALE,
            world_z as f64 * TERRAIN_NOISE_SCALE,
        ]);
        let height = TERRAIN_BASE_HEIGHT + sample * TERRAIN_AMPLITUDE;
        (height as i32).clamp(1, CHUNK_DIMENSION_Y - 1)
    }
}

impl ChunkGenerator for TerrainGenerator {
    fn generate(&self, chunk: &mut Chunk) {
        for x in 0..CHUNK_DIMENSION_X {
            for z in 0..CHUNK_DIMENSION_Z {
                let surface =
                    self.surface_height(chunk.block_world_x(x), chunk.block_world_z(z));

                for y in 0..CHUNK_DIMENSION_Y {
                    let block = if y == 0 {
                        // Bedrock floor so light and water never fall out
                        // of the world.
                        BlockType::Stone
                    } else if y < surface - 3 {
                        BlockType::Stone
                    } else if y < surface {
                        BlockType::Dirt
                    } else if y == surface {
                        if y <= SEA_LEVEL {
                            BlockType::Sand
                        } else {
                            BlockType::Grass
                        }
                    } else if y <= SEA_LEVEL {
                        BlockType::Water
                    } else {
                        continue;
                    };
                    chunk.set_block_raw(x, y, z, block.id());
                }
            }
        }
    }
}

/// Sprinkles tall grass on top of grass blocks.
pub struct FloraGenerator {
    seed: u64,
}

impl FloraGenerator {
    /// Creates a flora generator for the given world seed.
    pub fn new(seed: u32) -> Self {
        FloraGenerator { seed: seed as u64 }
    }
}

impl ChunkGenerator for FloraGenerator {
    fn generate(&self, chunk: &mut Chunk) {
        // Seeded per chunk so regeneration reproduces the same flora.
        let mut rng = fastrand::Rng::with_seed(self.seed ^ chunk_id(chunk.position()));

        for x in 0..CHUNK_DIMENSION_X {
            for z in 0..CHUNK_DIMENSION_Z {
                if rng.u32(0..FLORA_SPARSENESS) != 0 {
                    continue;
                }
                for y in (1..CHUNK_DIMENSION_Y - 1).rev() {
                    let block = chunk.get_block(x, y, z);
                    if block == BlockType::Grass.id() {
                        chunk.set_block_raw(x, y + 1, z, BlockType::TallGrass.id());
                        break;
                    }
                    if block != BlockType::Air.id() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point2;

    #[test]
    fn terrain_is_deterministic_per_seed() {
        let gen = TerrainGenerator::new(7);
        let mut a = Chunk::new(Point2::new(2, -1));
        let mut b = Chunk::new(Point2::new(2, -1));
        gen.generate(&mut a);
        gen.generate(&mut b);
        for x in 0..CHUNK_DIMENSION_X {
            for y in 0..CHUNK_DIMENSION_Y {
                for z in 0..CHUNK_DIMENSION_Z {
                    assert_eq!(a.get_block(x, y, z), b.get_block(x, y, z));
                }
            }
        }
    }

    #[test]
    fn terrain_columns_are_well_formed() {
        let gen = TerrainGenerator::new(7);
        let mut chunk = Chunk::new(Point2::new(0, 0));
        gen.generate(&mut chunk);

        for x in 0..CHUNK_DIMENSION_X {
            for z in 0..CHUNK_DIMENSION_Z {
                assert_eq!(chunk.get_block(x, 0, z), BlockType::Stone.id());

                // No floating water: every water cell sits at or below
                // sea level.
                for y in (SEA_LEVEL + 1)..CHUNK_DIMENSION_Y {
                    assert_ne!(chunk.get_block(x, y, z), BlockType::Water.id());
                }

                // The top of the column is air.
                assert_eq!(chunk.get_block(x, CHUNK_DIMENSION_Y - 1, z), 0);
            }
        }
    }

    #[test]
    fn flora_only_grows_on_grass() {
        let terrain = TerrainGenerator::new(7);
        let flora = FloraGenerator::new(7);
        let mut chunk = Chunk::new(Point2::new(0, 0));
        terrain.generate(&mut chunk);
        flora.generate(&mut chunk);

        for x in 0..CHUNK_DIMENSION_X {
            for y in 1..CHUNK_DIMENSION_Y {
                for z in 0..CHUNK_DIMENSION_Z {
                    if chunk.get_block(x, y, z) == BlockType::TallGrass.id() {
                        assert_eq!(chunk.get_block(x, y - 1, z), BlockType::Grass.id());
                    }
                }
            }
        }
    }
}
