//! # Meshing Module
//!
//! Turns chunk voxel data into render-ready geometry. The generator runs
//! on worker threads: it snapshots the chunk's voxel array under a short
//! read lock, then walks every cell emitting faces into per-phase buckets.
//! Neighbor, light and occlusion lookups go through the world facade so
//! faces on chunk seams see the adjacent chunks.
//!
//! Face culling follows the classic rules: a cube face is emitted only
//! when the neighboring cell lets it be seen (air, billboards, translucent
//! blocks seen from opaque ones). Water and lava surfaces are lowered by a
//! quarter block where uncovered, and cactus sides are inset towards the
//! block center.
//!
//! Per-vertex lighting samples the eight cells touching the vertex for
//! both light channels, averaging the non-zero samples; ambient occlusion
//! darkens vertices under shadow-casting blocks.

pub mod mesh;
pub mod vertex;

use crate::config::WorldConfig;
use crate::world::block::{BlockForm, BlockId, BlockProperties, BlockSide, BlockType, ATLAS_TILE};
use crate::world::chunk::{LightChannel, CHUNK_DIMENSION_X, CHUNK_DIMENSION_Y, CHUNK_DIMENSION_Z};
use crate::world::{ChunkHandle, WorldProvider};

use mesh::{ChunkMeshData, RenderPhase};
use vertex::ChunkVertex;

/// One cube face: corner offsets around the block center, the outward
/// normal and the side used for atlas lookup.
struct FaceTemplate {
    points: [[f32; 3]; 4],
    norm: [f32; 3],
    side: BlockSide,
}

const FACE_TOP: FaceTemplate = FaceTemplate {
    points: [
        [-0.5, 0.5, 0.5],
        [0.5, 0.5, 0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
    ],
    norm: [0.0, 1.0, 0.0],
    side: BlockSide::Top,
};

const FACE_FRONT: FaceTemplate = FaceTemplate {
    points: [
        [-0.5, 0.5, -0.5],
        [0.5, 0.5, -0.5],
        [0.5, -0.5, -0.5],
        [-0.5, -0.5, -0.5],
    ],
    norm: [0.0, 0.0, -1.0],
    side: BlockSide::Front,
};

const FACE_BACK: FaceTemplate = FaceTemplate {
    points: [
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
    ],
    norm: [0.0, 0.0, 1.0],
    side: BlockSide::Back,
};

const FACE_LEFT: FaceTemplate = FaceTemplate {
    points: [
        [-0.5, -0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [-0.5, 0.5, 0.5],
        [-0.5, 0.5, -0.5],
    ],
    norm: [-1.0, 0.0, 0.0],
    side: BlockSide::Left,
};

const FACE_RIGHT: FaceTemplate = FaceTemplate {
    points: [
        [0.5, 0.5, -0.5],
        [0.5, 0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, -0.5, -0.5],
    ],
    norm: [1.0, 0.0, 0.0],
    side: BlockSide::Right,
};

const FACE_BOTTOM: FaceTemplate = FaceTemplate {
    points: [
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, -0.5, 0.5],
        [-0.5, -0.5, 0.5],
    ],
    norm: [0.0, -1.0, 0.0],
    side: BlockSide::Bottom,
};

/// Generates the mesh for one chunk.
///
/// The chunk's voxel array is snapshotted under a read lock and the guard
/// dropped before any world lookups, since those re-enter chunk locks.
///
/// # Arguments
/// * `world` - The world the chunk and its neighbors live in
/// * `chunk` - The chunk to mesh
///
/// # Returns
/// CPU-side mesh data, bucketed by render phase
pub fn generate_mesh(world: &WorldProvider, chunk: &ChunkHandle) -> ChunkMeshData {
    let (position, blocks) = {
        let guard = chunk.get();
        (guard.position(), guard.blocks.clone())
    };

    let mut mesh = ChunkMeshData::default();
    let config = world.config();

    for y in 0..CHUNK_DIMENSION_Y {
        for x in 0..CHUNK_DIMENSION_X {
            for z in 0..CHUNK_DIMENSION_Z {
                let index = ((x * CHUNK_DIMENSION_Y + y) * CHUNK_DIMENSION_Z + z) as usize;
                let id = blocks[index];
                let props = BlockProperties::of(id);
                if props.invisible {
                    continue;
                }

                let world_x = position.x * CHUNK_DIMENSION_X + x;
                let world_z = position.y * CHUNK_DIMENSION_Z + z;

                if props.form == BlockForm::Billboard {
                    emit_billboard(&mut mesh, world, config, id, world_x, y, world_z);
                } else {
                    emit_block(&mut mesh, world, config, id, world_x, y, world_z);
                }
            }
        }
    }

    mesh
}

/// True when a face of `current` bordering `neighbor_id` must be drawn.
fn is_side_visible(neighbor_id: BlockId, current: &BlockProperties) -> bool {
    let neighbor = BlockProperties::of(neighbor_id);
    neighbor_id == 0
        || current.disable_tessellation
        || neighbor.form == BlockForm::Billboard
        || (neighbor.translucent && !current.translucent)
        || (neighbor.form == BlockForm::Lowered && current.form != BlockForm::Lowered)
}

fn emit_block(
    mesh: &mut ChunkMeshData,
    world: &WorldProvider,
    config: &WorldConfig,
    id: BlockId,
    x: i32,
    y: i32,
    z: i32,
) {
    let props = BlockProperties::of(id);

    let mut draw_top = is_side_visible(world.get_block(x, y + 1, z), props);
    let mut draw_front = is_side_visible(world.get_block(x, y, z - 1), props);
    let mut draw_back = is_side_visible(world.get_block(x, y, z + 1), props);
    let mut draw_left = is_side_visible(world.get_block(x - 1, y, z), props);
    let mut draw_right = is_side_visible(world.get_block(x + 1, y, z), props);
    // Nothing below the world can see the bottom of the lowest layer.
    let draw_bottom = y > 0 && is_side_visible(world.get_block(x, y - 1, z), props);

    if props.form == BlockForm::Lowered {
        // A lowered surface leaves a visible lip against full-height
        // neighbors, so extra faces come into play.
        if BlockProperties::of(world.get_block(x, y + 1, z)).form != BlockForm::Lowered {
            draw_top = true;
        }
        draw_front = draw_front || is_side_visible(world.get_block(x, y - 1, z - 1), props);
        draw_back = draw_back || is_side_visible(world.get_block(x, y - 1, z + 1), props);
        draw_left = draw_left || is_side_visible(world.get_block(x - 1, y - 1, z), props);
        draw_right = draw_right || is_side_visible(world.get_block(x + 1, y - 1, z), props);
    }

    let phase = match BlockType::from_id(id) {
        BlockType::Water => RenderPhase::Water,
        BlockType::Lava => RenderPhase::Lava,
        _ if props.translucent => RenderPhase::BillboardAndTranslucent,
        _ => RenderPhase::Opaque,
    };

    let faces = [
        (draw_top, &FACE_TOP),
        (draw_front, &FACE_FRONT),
        (draw_back, &FACE_BACK),
        (draw_left, &FACE_LEFT),
        (draw_right, &FACE_RIGHT),
        (draw_bottom, &FACE_BOTTOM),
    ];

    for (draw, face) in faces {
        if !draw {
            continue;
        }

        let mut points = face.points;
        match props.form {
            BlockForm::Cactus => inset_cactus_side(&mut points, face.norm),
            BlockForm::Lowered => {
                let below = world.get_block(x, y - 1, z);
                let lower_bottom =
                    below == 0 || BlockProperties::of(below).form == BlockForm::Lowered;
                lower_block_side(&mut points, face.norm, lower_bottom);
            }
            _ => {}
        }

        let uvs = face_uvs(face.norm, props.atlas[face.side as usize]);
        let quad = build_quad(world, config, [x, y, z], points, uvs, props.color);
        mesh.bucket_mut(phase).push_quad(quad);
    }
}

fn emit_billboard(
    mesh: &mut ChunkMeshData,
    world: &WorldProvider,
    config: &WorldConfig,
    id: BlockId,
    x: i32,
    y: i32,
    z: i32,
) {
    let props = BlockProperties::of(id);
    let uvs = face_uvs([0.0, 0.0, 1.0], props.atlas[BlockSide::Front as usize]);

    let first = [
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, 0.5],
    ];
    let second = [
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, -0.5],
    ];

    for points in [first, second] {
        let quad = build_quad(world, config, [x, y, z], points, uvs, props.color);
        mesh.bucket_mut(RenderPhase::Billboard).push_quad(quad);
    }
}

/// Shifts a cactus side towards the block center along its normal.
fn inset_cactus_side(points: &mut [[f32; 3]; 4], norm: [f32; 3]) {
    for p in points.iter_mut() {
        if norm[0] != 0.0 {
            p[0] -= 0.0625 * norm[0];
        } else if norm[2] != 0.0 {
            p[2] -= 0.0625 * norm[2];
        }
    }
}

/// Drops the uncovered corners of a lowered (fluid surface) block by a
/// quarter block. `lower_bottom` is set when the cell below is fluid or
/// air, so the side faces taper all the way down.
fn lower_block_side(points: &mut [[f32; 3]; 4], norm: [f32; 3], lower_bottom: bool) {
    let lower = |points: &mut [[f32; 3]; 4], which: [usize; 2]| {
        for i in which {
            points[i][1] -= 0.25;
        }
    };

    if norm[0] == 1.0 {
        lower(points, [0, 1]);
        if lower_bottom {
            lower(points, [2, 3]);
        }
    } else if norm[0] == -1.0 || norm[2] == 1.0 {
        lower(points, [2, 3]);
        if lower_bottom {
            lower(points, [0, 1]);
        }
    } else if norm[2] == -1.0 {
        lower(points, [0, 1]);
        if lower_bottom {
            lower(points, [2, 3]);
        }
    } else if norm[1] == 1.0 {
        lower(points, [0, 1]);
        lower(points, [2, 3]);
    } else if norm[1] == -1.0 && lower_bottom {
        lower(points, [0, 1]);
        lower(points, [2, 3]);
    }
}

/// Texture coordinates for a face, rotated to match the orientation of
/// the plane.
fn face_uvs(norm: [f32; 3], offset: [f32; 2]) -> [[f32; 2]; 4] {
    let [u, v] = offset;
    if norm[2] == 1.0 || norm[0] == -1.0 {
        [
            [u, v + ATLAS_TILE],
            [u + ATLAS_TILE, v + ATLAS_TILE],
            [u + ATLAS_TILE, v],
            [u, v],
        ]
    } else {
        [
            [u, v],
            [u + ATLAS_TILE, v],
            [u + ATLAS_TILE, v + ATLAS_TILE],
            [u, v + ATLAS_TILE],
        ]
    }
}

fn build_quad(
    world: &WorldProvider,
    config: &WorldConfig,
    block: [i32; 3],
    points: [[f32; 3]; 4],
    uvs: [[f32; 2]; 4],
    color: [f32; 4],
) -> [ChunkVertex; 4] {
    let mut quad = [ChunkVertex {
        position: [0.0; 3],
        atlas_uv: [0.0; 2],
        light: [0.0; 3],
        color,
    }; 4];

    for (i, point) in points.into_iter().enumerate() {
        let position = [
            block[0] as f32 + point[0],
            block[1] as f32 + point[1],
            block[2] as f32 + point[2],
        ];
        quad[i] = ChunkVertex {
            position,
            atlas_uv: uvs[i],
            light: [
                light_for_vertex(world, position, LightChannel::Sun),
                light_for_vertex(world, position, LightChannel::Block),
                occlusion_for_vertex(world, config, position),
            ],
            color,
        };
    }

    quad
}

/// The eight world cells whose corners meet at a vertex position.
fn corner_cells(position: [f32; 3]) -> [(i32, i32, i32); 8] {
    let lo = |v: f32| (v - 0.5).floor() as i32;
    let hi = |v: f32| (v + 0.5).floor() as i32;
    let [x, y, z] = position;
    [
        (hi(x), hi(y), hi(z)),
        (hi(x), hi(y), lo(z)),
        (lo(x), hi(y), lo(z)),
        (lo(x), hi(y), hi(z)),
        (hi(x), lo(y), hi(z)),
        (hi(x), lo(y), lo(z)),
        (lo(x), lo(y), lo(z)),
        (lo(x), lo(y), hi(z)),
    ]
}

/// Averages the non-zero light samples around a vertex, normalized to
/// [0, 1]. Fully dark surroundings yield zero.
fn light_for_vertex(world: &WorldProvider, position: [f32; 3], channel: LightChannel) -> f32 {
    let mut sum = 0.0f32;
    let mut counted = 0u32;
    for (x, y, z) in corner_cells(position) {
        let sample = world.get_light(x, y, z, channel) as f32 / 15.0;
        if sample > 0.0 {
            sum += sample;
            counted += 1;
        }
    }
    if counted == 0 {
        0.0
    } else {
        sum / counted as f32
    }
}

/// Ambient occlusion factor for a vertex, from the four cells above it.
fn occlusion_for_vertex(world: &WorldProvider, config: &WorldConfig, position: [f32; 3]) -> f32 {
    let mut result = 1.0f32;
    for (x, y, z) in &corner_cells(position)[..4] {
        let props = BlockProperties::of(world.get_block(*x, *y, *z));
        if props.casts_shadows {
            if props.form == BlockForm::Billboard {
                result -= config.occlusion_intensity_billboards;
            } else {
                result -= config.occlusion_intensity_default;
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::empty_world;
    use cgmath::Point2;

    #[test]
    fn lone_cube_has_six_faces() {
        let (world, _dir) = empty_world();
        world.set_block(8, 64, 8, BlockType::Stone.id(), false);

        let chunk = world.chunk_at(Point2::new(0, 0));
        let mesh = generate_mesh(&world, &chunk);

        let opaque = mesh.bucket(RenderPhase::Opaque);
        assert_eq!(opaque.vertices.len(), 24);
        assert_eq!(opaque.indices.len(), 36);
        for phase in [
            RenderPhase::BillboardAndTranslucent,
            RenderPhase::Billboard,
            RenderPhase::Water,
            RenderPhase::Lava,
        ] {
            assert!(mesh.bucket(phase).is_empty());
        }
    }

    #[test]
    fn touching_faces_are_culled() {
        let (world, _dir) = empty_world();
        // A plus shape: the center cube is fully enclosed, each arm loses
        // the face it shares with the center.
        world.set_block(8, 64, 8, BlockType::Stone.id(), false);
        for (dx, dy, dz) in [(1, 0, 0), (-1, 0, 0), (0, 1, 0), (0, -1, 0), (0, 0, 1), (0, 0, -1)] {
            world.set_block(8 + dx, 64 + dy, 8 + dz, BlockType::Stone.id(), false);
        }

        let chunk = world.chunk_at(Point2::new(0, 0));
        let mesh = generate_mesh(&world, &chunk);

        let opaque = mesh.bucket(RenderPhase::Opaque);
        assert_eq!(opaque.vertices.len(), 6 * 5 * 4);
        assert_eq!(opaque.indices.len(), 6 * 5 * 6);
    }

    #[test]
    fn bottom_of_world_is_not_meshed() {
        let (world, _dir) = empty_world();
        world.set_block(8, 0, 8, BlockType::Stone.id(), false);

        let chunk = world.chunk_at(Point2::new(0, 0));
        let mesh = generate_mesh(&world, &chunk);

        // Five faces instead of six.
        assert_eq!(mesh.bucket(RenderPhase::Opaque).vertices.len(), 20);
    }

    #[test]
    fn water_and_billboards_land_in_their_phases() {
        let (world, _dir) = empty_world();
        world.set_block(4, 50, 4, BlockType::Water.id(), false);
        world.set_block(10, 50, 10, BlockType::TallGrass.id(), false);
        world.set_block(12, 50, 12, BlockType::Glass.id(), false);

        let chunk = world.chunk_at(Point2::new(0, 0));
        let mesh = generate_mesh(&world, &chunk);

        assert!(!mesh.bucket(RenderPhase::Water).is_empty());
        assert!(!mesh.bucket(RenderPhase::BillboardAndTranslucent).is_empty());
        // Two crossed quads for the billboard.
        assert_eq!(mesh.bucket(RenderPhase::Billboard).vertices.len(), 8);
        assert!(mesh.bucket(RenderPhase::Lava).is_empty());
    }

    #[test]
    fn water_surface_is_lowered() {
        let (world, _dir) = empty_world();
        world.set_block(4, 50, 4, BlockType::Stone.id(), false);
        world.set_block(4, 51, 4, BlockType::Water.id(), false);

        let chunk = world.chunk_at(Point2::new(0, 0));
        let mesh = generate_mesh(&world, &chunk);

        let water = mesh.bucket(RenderPhase::Water);
        let top = water
            .vertices
            .iter()
            .map(|v| v.position[1])
            .fold(f32::MIN, f32::max);
        assert!((top - 51.25).abs() < 1e-6);
    }

    #[test]
    fn neighbor_chunk_blocks_cull_seam_faces() {
        let (world, _dir) = empty_world();
        world.set_block(15, 64, 8, BlockType::Stone.id(), false);
        world.set_block(16, 64, 8, BlockType::Stone.id(), false);

        let chunk = world.chunk_at(Point2::new(0, 0));
        let mesh = generate_mesh(&world, &chunk);

        // Only the block at x = 15 belongs to this chunk, and its +x face
        // is hidden by the block across the seam.
        assert_eq!(mesh.bucket(RenderPhase::Opaque).vertices.len(), 20);
    }

    #[test]
    fn sunlit_top_faces_carry_light() {
        let (world, _dir) = empty_world();
        world.set_block(8, 64, 8, BlockType::Stone.id(), false);
        // Light the cells around the cube the way an open sky would.
        for y in 60..70 {
            for x in 4..13 {
                for z in 4..13 {
                    world.set_light(x, y, z, 15, LightChannel::Sun);
                }
            }
        }

        let chunk = world.chunk_at(Point2::new(0, 0));
        let mesh = generate_mesh(&world, &chunk);

        let opaque = mesh.bucket(RenderPhase::Opaque);
        let lit = opaque
            .vertices
            .iter()
            .filter(|v| (v.light[0] - 1.0).abs() < 1e-6)
            .count();
        assert!(lit > 0, "expected fully sunlit vertices");
    }
}
