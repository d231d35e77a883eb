//! Vertex data structures and layouts for chunk rendering.
//!
//! One vertex format serves every render phase; phases differ only in the
//! pipeline they are drawn with, not in their vertex layout.

/// A vertex of a chunk mesh.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes)
/// - Atlas UV: [f32; 2] (8 bytes)
/// - Light: [f32; 3] (12 bytes; sunlight, block light, occlusion)
/// - Color: [f32; 4] (16 bytes)
///
/// Total size: 48 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ChunkVertex {
    /// Position in world space.
    pub position: [f32; 3],
    /// Texture coordinates into the block atlas.
    pub atlas_uv: [f32; 2],
    /// Normalized sunlight, block light and occlusion factors.
    pub light: [f32; 3],
    /// Per-vertex tint, including alpha for translucent phases.
    pub color: [f32; 4],
}

impl ChunkVertex {
    /// Returns the vertex buffer layout description for the shader pipeline.
    ///
    /// # Shader Attributes
    /// - `location = 0`: position (vec3<f32>)
    /// - `location = 1`: atlas_uv (vec2<f32>)
    /// - `location = 2`: light (vec3<f32>)
    /// - `location = 3`: color (vec4<f32>)
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ChunkVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}
