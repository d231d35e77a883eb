//! # Chunk Cache
//!
//! Keeps the resident set of chunks, backed by per-chunk save files on
//! disk. Lookups either return the resident handle, revive the chunk from
//! its save file, or create a fresh one for the generators to fill.
//!
//! When the resident set outgrows its capacity, the chunks farthest from
//! the player are saved and dropped. Chunks with updates in flight are
//! never evicted; the scheduler's in-flight set is passed in so the two
//! cannot race.
//!
//! GPU buffers owned by evicted chunks cannot be dropped on a worker
//! thread, so they are parked in a disposal queue that the render thread
//! drains once per frame.
//!
//! Lock order: the cache map lock is always taken before any chunk lock.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use cgmath::Point2;
use log::{error, warn};

use crate::meshing::mesh::GpuChunkMesh;
use crate::world::chunk::{chunk_id, codec, Chunk};
use crate::world::ChunkHandle;

/// The resident chunk set and its disk backing.
pub struct ChunkCache {
    chunks: Mutex<HashMap<u64, ChunkHandle>>,
    disposal: Mutex<Vec<GpuChunkMesh>>,
    capacity: usize,
    save_root: PathBuf,
}

impl ChunkCache {
    /// Creates a cache bounded at `capacity` resident chunks, saving under
    /// `save_root`.
    pub fn new(capacity: usize, save_root: PathBuf) -> Self {
        ChunkCache {
            chunks: Mutex::new(HashMap::new()),
            disposal: Mutex::new(Vec::new()),
            capacity,
            save_root,
        }
    }

    /// Number of resident chunks.
    pub fn len(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }

    /// True when no chunks are resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The resident handle for a chunk id, if any.
    pub fn handle(&self, id: u64) -> Option<ChunkHandle> {
        self.chunks.lock().unwrap().get(&id).cloned()
    }

    /// Returns the chunk at the given chunk coordinates, making it
    /// resident first if necessary.
    ///
    /// A non-resident chunk is revived from its save file when one exists;
    /// otherwise a fresh chunk is created for the generators. Unreadable
    /// or corrupt save files are logged and treated as absent, so a bad
    /// file costs a regeneration instead of wedging the pipeline.
    pub fn load_or_create(&self, position: Point2<i32>) -> ChunkHandle {
        let id = chunk_id(position);
        let mut chunks = self.chunks.lock().unwrap();
        if let Some(handle) = chunks.get(&id) {
            return handle.clone();
        }

        let chunk = match self.read_from_disk(position) {
            Ok(Some(chunk)) => chunk,
            Ok(None) => Chunk::new(position),
            Err(err) => {
                warn!(
                    "discarding unreadable save for chunk ({}, {}): {err}",
                    position.x, position.y
                );
                Chunk::new(position)
            }
        };

        let handle = ChunkHandle::new(chunk);
        handle.get_mut().set_cached(true);
        chunks.insert(id, handle.clone());
        handle
    }

    fn save_path(&self, chunk: &Chunk) -> PathBuf {
        self.save_root
            .join(chunk.save_dir())
            .join(chunk.save_file_name())
    }

    fn read_from_disk(&self, position: Point2<i32>) -> Result<Option<Chunk>, io::Error> {
        let probe = Chunk::new(position);
        let bytes = match fs::read(self.save_path(&probe)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        codec::decode(position, &bytes)
            .map(Some)
            .map_err(io::Error::other)
    }

    /// Writes one chunk's payload to its save file. Fresh chunks have no
    /// state worth keeping and are skipped.
    fn save_to_disk(&self, chunk: &Chunk) -> io::Result<()> {
        if chunk.is_fresh() {
            return Ok(());
        }
        let path = self.save_path(chunk);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, codec::encode(chunk))
    }

    /// Evicts the chunks farthest from `center` until the cache fits its
    /// capacity again.
    ///
    /// Chunks named in `in_flight` are pinned; a worker is mutating them
    /// right now. Evicted chunks are saved first (a failed save is logged
    /// and the chunk is dropped anyway) and their GPU meshes go to the
    /// disposal queue.
    pub fn free_cache_space(&self, center: Point2<f64>, in_flight: &HashSet<u64>) {
        let mut chunks = self.chunks.lock().unwrap();
        if chunks.len() <= self.capacity {
            return;
        }

        let mut candidates: Vec<(u64, f64)> = chunks
            .iter()
            .filter(|(id, _)| !in_flight.contains(id))
            .map(|(id, handle)| (*id, handle.get().distance2_to(center)))
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        for (id, _) in candidates {
            if chunks.len() <= self.capacity {
                break;
            }
            let Some(handle) = chunks.remove(&id) else {
                continue;
            };

            let mut guard = handle.get_mut();
            if let Err(err) = self.save_to_disk(&guard) {
                error!(
                    "failed to save evicted chunk ({}, {}): {err}",
                    guard.position().x,
                    guard.position().y
                );
            }
            guard.set_cached(false);
            if let Some(mesh) = guard.take_meshes_for_disposal() {
                self.disposal.lock().unwrap().push(mesh);
            }
        }
    }

    /// Saves every resident, non-fresh chunk. Called on shutdown.
    pub fn flush_to_disk(&self) {
        let handles: Vec<ChunkHandle> = self.chunks.lock().unwrap().values().cloned().collect();
        for handle in handles {
            let guard = handle.get();
            if let Err(err) = self.save_to_disk(&guard) {
                error!(
                    "failed to save chunk ({}, {}): {err}",
                    guard.position().x,
                    guard.position().y
                );
            }
        }
    }

    /// Parks a retired GPU mesh until the render thread can release it.
    pub fn queue_disposal(&self, mesh: GpuChunkMesh) {
        self.disposal.lock().unwrap().push(mesh);
    }

    /// Takes every queued mesh for disposal. Must be called on the thread
    /// driving the GPU device; dropping the returned meshes releases their
    /// buffers.
    pub fn dispose_pending(&self) -> Vec<GpuChunkMesh> {
        std::mem::take(&mut self.disposal.lock().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::block::BlockType;
    use crate::world::test_support::temp_save_dir;

    #[test]
    fn load_or_create_returns_the_resident_handle() {
        let dir = temp_save_dir();
        let cache = ChunkCache::new(8, dir.0.clone());

        let a = cache.load_or_create(Point2::new(1, 2));
        let b = cache.load_or_create(Point2::new(1, 2));
        assert!(std::sync::Arc::ptr_eq(&a.resource, &b.resource));
        assert_eq!(cache.len(), 1);
        assert!(a.get().is_cached());
    }

    #[test]
    fn chunks_survive_a_cache_restart() {
        let dir = temp_save_dir();
        {
            let cache = ChunkCache::new(8, dir.0.clone());
            let handle = cache.load_or_create(Point2::new(4, -2));
            {
                let mut guard = handle.get_mut();
                guard.set_block(3, 10, 3, BlockType::Stone.id());
                guard.set_fresh(false);
            }
            cache.flush_to_disk();
        }

        let cache = ChunkCache::new(8, dir.0.clone());
        let handle = cache.load_or_create(Point2::new(4, -2));
        let guard = handle.get();
        assert_eq!(guard.get_block(3, 10, 3), BlockType::Stone.id());
        assert!(!guard.is_fresh());
    }

    #[test]
    fn fresh_chunks_are_not_written() {
        let dir = temp_save_dir();
        let cache = ChunkCache::new(8, dir.0.clone());
        cache.load_or_create(Point2::new(0, 0));
        cache.flush_to_disk();
        assert!(!dir.0.exists());
    }

    #[test]
    fn eviction_keeps_the_nearest_chunks() {
        let dir = temp_save_dir();
        let cache = ChunkCache::new(4, dir.0.clone());
        for x in 0..3 {
            for z in 0..3 {
                cache.load_or_create(Point2::new(x, z));
            }
        }
        assert_eq!(cache.len(), 9);

        cache.free_cache_space(Point2::new(0.0, 0.0), &HashSet::new());
        assert_eq!(cache.len(), 4);
        // The origin chunk is closest to the center and must survive.
        assert!(cache.handle(chunk_id(Point2::new(0, 0))).is_some());
        // The far corner goes first.
        assert!(cache.handle(chunk_id(Point2::new(2, 2))).is_none());
    }

    #[test]
    fn in_flight_chunks_are_never_evicted() {
        let dir = temp_save_dir();
        let cache = ChunkCache::new(1, dir.0.clone());
        for x in 0..3 {
            cache.load_or_create(Point2::new(x, 0));
        }

        let pinned = chunk_id(Point2::new(2, 0));
        let mut in_flight = HashSet::new();
        in_flight.insert(pinned);

        cache.free_cache_space(Point2::new(0.0, 0.0), &in_flight);
        assert!(cache.handle(pinned).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicted_chunks_lose_their_cached_flag() {
        let dir = temp_save_dir();
        let cache = ChunkCache::new(1, dir.0.clone());
        let near = cache.load_or_create(Point2::new(0, 0));
        let far = cache.load_or_create(Point2::new(10, 10));

        cache.free_cache_space(Point2::new(0.0, 0.0), &HashSet::new());
        assert!(near.get().is_cached());
        assert!(!far.get().is_cached());
    }
}
