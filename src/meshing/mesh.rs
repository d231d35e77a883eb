//! Mesh containers for chunk geometry.
//!
//! A generated chunk mesh is split into render phases so the renderer can
//! draw each one with the right pipeline and pass ordering: opaque
//! geometry first, then the alpha-tested and blended phases, with water
//! and lava in passes of their own.

use wgpu::util::DeviceExt;

use super::vertex::ChunkVertex;

/// The draw phases a chunk mesh is bucketed into, in draw order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderPhase {
    /// Face-culled opaque geometry.
    Opaque,
    /// Translucent cube faces mixed with billboards behind them.
    BillboardAndTranslucent,
    /// Pure billboard geometry.
    Billboard,
    /// Water surfaces, alpha-blended.
    Water,
    /// Lava surfaces.
    Lava,
}

impl RenderPhase {
    /// All phases in draw order.
    pub const ALL: [RenderPhase; 5] = [
        RenderPhase::Opaque,
        RenderPhase::BillboardAndTranslucent,
        RenderPhase::Billboard,
        RenderPhase::Water,
        RenderPhase::Lava,
    ];

    /// Index of this phase inside a bucket array.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Vertex and index data for one render phase of one chunk.
#[derive(Default)]
pub struct MeshBucket {
    /// Vertex data for this phase.
    pub vertices: Vec<ChunkVertex>,
    /// Triangle indices into `vertices`.
    pub indices: Vec<u32>,
}

impl MeshBucket {
    /// True when the bucket holds no geometry.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Appends a quad as two triangles.
    ///
    /// Vertices must arrive in winding order; the generated indices fan
    /// out from the first corner.
    pub fn push_quad(&mut self, quad: [ChunkVertex; 4]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&quad);
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
}

/// CPU-side mesh data for one chunk, produced by the mesh generator on a
/// worker thread and uploaded later on the render thread.
#[derive(Default)]
pub struct ChunkMeshData {
    buckets: [MeshBucket; 5],
}

impl ChunkMeshData {
    /// The bucket for a render phase.
    pub fn bucket(&self, phase: RenderPhase) -> &MeshBucket {
        &self.buckets[phase.index()]
    }

    /// Mutable access to the bucket for a render phase.
    pub fn bucket_mut(&mut self, phase: RenderPhase) -> &mut MeshBucket {
        &mut self.buckets[phase.index()]
    }

    /// True when no phase holds any geometry.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(MeshBucket::is_empty)
    }
}

/// GPU buffers for one render phase of a chunk.
pub struct GpuMeshBucket {
    /// The uploaded vertex buffer.
    pub vertex_buffer: wgpu::Buffer,
    /// The uploaded index buffer.
    pub index_buffer: wgpu::Buffer,
    /// Number of indices to draw.
    pub index_count: u32,
}

/// Uploaded chunk geometry, one optional buffer pair per phase.
///
/// Dropping GPU buffers is only safe on the thread driving the device, so
/// retired meshes travel through the cache's disposal queue instead of
/// being dropped wherever a swap or eviction happens.
pub struct GpuChunkMesh {
    buckets: [Option<GpuMeshBucket>; 5],
}

impl GpuChunkMesh {
    /// Uploads mesh data into device buffers. Empty phases get no buffers.
    ///
    /// # Arguments
    /// * `device` - The device to create buffers on
    /// * `data` - The CPU-side mesh to upload
    ///
    /// # Returns
    /// A new `GpuChunkMesh` holding the created buffers
    pub fn upload(device: &wgpu::Device, data: &ChunkMeshData) -> Self {
        let buckets = RenderPhase::ALL.map(|phase| {
            let bucket = data.bucket(phase);
            if bucket.is_empty() {
                return None;
            }
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("CHUNK VERTEX BUFFER"),
                contents: bytemuck::cast_slice(&bucket.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("CHUNK INDEX BUFFER"),
                contents: bytemuck::cast_slice(&bucket.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            Some(GpuMeshBucket {
                vertex_buffer,
                index_buffer,
                index_count: bucket.indices.len() as u32,
            })
        });
        GpuChunkMesh { buckets }
    }

    /// The uploaded buffers for a phase, if that phase had geometry.
    pub fn bucket(&self, phase: RenderPhase) -> Option<&GpuMeshBucket> {
        self.buckets[phase.index()].as_ref()
    }
}
