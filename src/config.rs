//! # World Configuration
//!
//! Runtime-tunable settings for the world: view distance, worker counts,
//! occlusion intensities and the save location. Loaded from a JSON file
//! when one exists; every field falls back to its default, so a partial
//! config file is valid.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Extra cache slots beyond the view-distance square, so chunks just
/// outside the visible ring survive small player movements.
pub const CACHE_HEADROOM: usize = 64;

/// Tunable world settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Visible world radius, in chunks per axis.
    pub view_distance: u32,
    /// Number of background chunk update workers.
    pub worker_threads: usize,
    /// Upper bound on chunk updates running concurrently.
    pub max_updates_in_flight: usize,
    /// Ambient occlusion contribution of a regular shadow-casting block.
    pub occlusion_intensity_default: f32,
    /// Ambient occlusion contribution of a billboard block.
    pub occlusion_intensity_billboards: f32,
    /// World seed driving terrain and flora generation.
    pub seed: u32,
    /// Directory chunk save files are written under.
    pub save_path: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            view_distance: 16,
            worker_threads: 4,
            max_updates_in_flight: 8,
            occlusion_intensity_default: 0.25,
            occlusion_intensity_billboards: 0.125,
            seed: 0,
            save_path: "SAVED_WORLDS".to_string(),
        }
    }
}

impl WorldConfig {
    /// Number of chunks the cache keeps resident: the visible square plus
    /// headroom.
    pub fn cache_capacity(&self) -> usize {
        (self.view_distance as usize).pow(2) + CACHE_HEADROOM
    }

    /// Loads a config from a JSON file.
    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(io::Error::other)
    }

    /// Writes the config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let contents = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(path, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_covers_view_square_plus_headroom() {
        let config = WorldConfig {
            view_distance: 16,
            ..WorldConfig::default()
        };
        assert_eq!(config.cache_capacity(), 256 + CACHE_HEADROOM);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: WorldConfig = serde_json::from_str(r#"{"view_distance": 8}"#).unwrap();
        assert_eq!(config.view_distance, 8);
        assert_eq!(config.worker_threads, WorldConfig::default().worker_threads);
        assert_eq!(config.save_path, WorldConfig::default().save_path);
    }

    #[test]
    fn save_load_round_trips() {
        let path = std::env::temp_dir().join(format!(
            "voxel-world-config-{}-{:x}.json",
            std::process::id(),
            fastrand::u64(..)
        ));
        let config = WorldConfig {
            view_distance: 12,
            seed: 99,
            ..WorldConfig::default()
        };
        config.save(&path).unwrap();
        let loaded = WorldConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.view_distance, 12);
        assert_eq!(loaded.seed, 99);
    }
}
