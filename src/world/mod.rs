//! # World Module
//!
//! Everything that owns voxel state: block definitions, chunk storage and
//! serialization, light propagation, terrain generation, the chunk cache
//! and the [`WorldProvider`] facade that ties them together behind
//! world-space coordinates.

pub mod block;
pub mod cache;
pub mod chunk;
pub mod generator;
pub mod lighting;
pub mod provider;

use crate::core::MtResource;
use chunk::Chunk;

pub use provider::WorldProvider;

/// A shared, lockable reference to one resident chunk.
///
/// Handles are cloned freely between the cache, the update workers and the
/// render path; the chunk itself is only reachable through the lock.
pub type ChunkHandle = MtResource<Chunk>;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use super::WorldProvider;
    use crate::config::WorldConfig;

    /// A throwaway save directory, removed on drop.
    pub struct TempSaveDir(pub PathBuf);

    impl Drop for TempSaveDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    pub fn temp_save_dir() -> TempSaveDir {
        let path = std::env::temp_dir().join(format!(
            "voxel-world-test-{}-{:x}",
            std::process::id(),
            fastrand::u64(..)
        ));
        TempSaveDir(path)
    }

    /// A world with no terrain generators; its chunks come up all air.
    pub fn empty_world() -> (WorldProvider, TempSaveDir) {
        let dir = temp_save_dir();
        let config = WorldConfig {
            save_path: dir.0.to_string_lossy().into_owned(),
            worker_threads: 1,
            ..WorldConfig::default()
        };
        (WorldProvider::with_generators(config, Vec::new()), dir)
    }
}
