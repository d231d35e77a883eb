#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! A chunked voxel world engine: block storage, flood-fill lighting, mesh
//! generation and a background update pipeline, designed to sit under a
//! WGPU renderer.
//!
//! ## Key Modules
//!
//! * `world` - Chunk storage, block definitions, lighting, terrain
//!   generation and the cache with its disk backing
//! * `meshing` - Turns chunk voxel data into per-phase render geometry
//! * `scheduler` - The worker pool running the chunk update pipeline
//! * `config` - Runtime-tunable world settings
//!
//! ## Architecture
//!
//! The [`world::WorldProvider`] facade owns everything and serves block
//! and light access by absolute world coordinates. Chunks never reference
//! each other or the world; cross-chunk effects (light crossing a seam, a
//! boundary edit dirtying a neighbor's mesh) are routed through the
//! facade. Background workers run the generate/light/mesh pipeline and
//! the render thread swaps finished meshes in when the neighborhood is
//! consistent.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cgmath::Point2;
//! use voxel_world::config::WorldConfig;
//! use voxel_world::scheduler::ChunkUpdateScheduler;
//! use voxel_world::world::WorldProvider;
//!
//! voxel_world::init_logging();
//!
//! let config = WorldConfig::default();
//! let mut scheduler =
//!     ChunkUpdateScheduler::new(config.worker_threads, config.max_updates_in_flight);
//! let world = Arc::new(WorldProvider::new(config));
//!
//! // Each frame: request the chunks around the player...
//! let chunk = world.chunk_at(Point2::new(0, 0));
//! scheduler.queue_update(chunk, world.clone(), false);
//!
//! // ...collect finished updates and keep the cache bounded.
//! scheduler.process_completed();
//! world.free_cache_space(Point2::new(0.0, 0.0), scheduler.in_flight_ids());
//! ```

pub mod config;
pub mod core;
pub mod meshing;
pub mod scheduler;
pub mod world;

use log::info;

/// Initializes stdout logging, filtered through `RUST_LOG`.
pub fn init_logging() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");
}
