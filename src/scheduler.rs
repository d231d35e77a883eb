//! # Chunk Update Scheduler
//!
//! Runs the chunk update pipeline on a pool of background workers. Each
//! worker owns a dedicated channel pair; tasks are handed out round-robin
//! and results are drained back on the driving thread once per frame.
//!
//! ## Update Pipeline
//!
//! A queued chunk runs through, in order:
//! 1. Terrain generation for the chunk and its eight neighbors, so every
//!    cross-chunk lookup below sees real data.
//! 2. Light propagation, when the chunk's light field is stale.
//! 3. Mesh generation, once the voxel data is dirty and the light field
//!    is clean. The result lands in the chunk's pending-mesh slot; the
//!    render thread swaps it in later.
//!
//! ## Backpressure and Dedup
//!
//! At most `max_in_flight` chunks are in the pipeline at once; extra
//! requests are rejected and the caller retries on a later frame. A chunk
//! already in flight is never queued twice. The in-flight set doubles as
//! the eviction pin set for the cache.

use std::collections::HashSet;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::error;

use crate::meshing::generate_mesh;
use crate::world::{ChunkHandle, WorldProvider};

/// One chunk update to run on a worker.
struct UpdateTask {
    chunk: ChunkHandle,
    world: Arc<WorldProvider>,
}

impl UpdateTask {
    /// Runs the full update pipeline for the chunk.
    fn run(self) -> UpdateResult {
        let started = Instant::now();
        let (chunk_id, position) = {
            let guard = self.chunk.get();
            (guard.id(), guard.position())
        };

        self.world.generate_chunk(&self.chunk);
        for neighbor in self.world.neighbor_chunks(position) {
            self.world.generate_chunk(&neighbor);
        }

        if self.chunk.get().is_light_dirty() {
            self.world.update_light(&self.chunk);
        }

        let wants_mesh = {
            let guard = self.chunk.get();
            guard.is_dirty() && !guard.is_light_dirty() && !guard.is_fresh()
        };
        if wants_mesh {
            let mesh = generate_mesh(&self.world, &self.chunk);
            let mut guard = self.chunk.get_mut();
            guard.set_pending_mesh(mesh);
            guard.set_dirty(false);
        }

        UpdateResult {
            chunk_id,
            duration: started.elapsed(),
        }
    }
}

/// The outcome of one finished chunk update.
pub struct UpdateResult {
    /// Cache id of the updated chunk.
    pub chunk_id: u64,
    /// Wall time the pipeline took on the worker.
    pub duration: Duration,
}

/// A communication channel between the driving thread and one worker.
struct WorkerChannel {
    task_sender: Sender<UpdateTask>,
    result_receiver: Receiver<UpdateResult>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// Running totals over completed chunk updates.
#[derive(Clone, Debug, Default)]
pub struct SchedulerStats {
    /// Chunks that completed the pipeline since startup.
    pub chunks_processed: u64,
    /// Smoothed per-chunk pipeline duration.
    pub average_update: Duration,
}

/// Distributes chunk updates across a worker pool.
pub struct ChunkUpdateScheduler {
    channels: Vec<WorkerChannel>,
    in_flight: HashSet<u64>,
    current_channel: usize,
    max_in_flight: usize,
    stats: SchedulerStats,
}

impl ChunkUpdateScheduler {
    /// Creates a scheduler with `num_workers` worker threads and a global
    /// in-flight cap of `max_in_flight` chunks.
    pub fn new(num_workers: usize, max_in_flight: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        for _ in 0..num_workers {
            let (task_tx, task_rx) = channel::<UpdateTask>();
            let (result_tx, result_rx) = channel::<UpdateResult>();

            let worker = thread::spawn(move || {
                while let Ok(task) = task_rx.recv() {
                    let _ = result_tx.send(task.run());
                }
            });

            channels.push(WorkerChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                _worker: worker,
            });
        }

        ChunkUpdateScheduler {
            channels,
            in_flight: HashSet::new(),
            current_channel: 0,
            max_in_flight,
            stats: SchedulerStats::default(),
        }
    }

    /// Queues a chunk for the update pipeline.
    ///
    /// Duplicates of an in-flight chunk are always rejected. When the
    /// in-flight cap is reached, further chunks are rejected unless
    /// `force` is set; forced updates are for player edits, which must
    /// not wait behind bulk terrain loading.
    ///
    /// # Returns
    /// True when the chunk was handed to a worker.
    pub fn queue_update(
        &mut self,
        chunk: ChunkHandle,
        world: Arc<WorldProvider>,
        force: bool,
    ) -> bool {
        let chunk_id = chunk.get().id();
        if self.in_flight.contains(&chunk_id) {
            return false;
        }
        if !force && self.in_flight.len() >= self.max_in_flight {
            return false;
        }
        if self.channels.is_empty() {
            return false;
        }

        let index = self.current_channel;
        self.current_channel = (self.current_channel + 1) % self.channels.len();

        match self.channels[index].task_sender.send(UpdateTask { chunk, world }) {
            Ok(()) => {
                self.channels[index].num_tasks_in_flight += 1;
                self.in_flight.insert(chunk_id);
                true
            }
            Err(_) => {
                error!("chunk update worker {index} is gone, dropping update");
                false
            }
        }
    }

    /// Drains every finished update, releasing the in-flight slots and
    /// folding durations into the stats. Called once per frame.
    pub fn process_completed(&mut self) -> Vec<UpdateResult> {
        let mut results = Vec::new();
        for channel in &mut self.channels {
            while let Ok(result) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight -= 1;
                self.in_flight.remove(&result.chunk_id);
                self.stats.chunks_processed += 1;
                self.stats.average_update = (self.stats.average_update + result.duration) / 2;
                results.push(result);
            }
        }
        results
    }

    /// The chunks currently in the pipeline. Passed to the cache as its
    /// eviction pin set.
    pub fn in_flight_ids(&self) -> &HashSet<u64> {
        &self.in_flight
    }

    /// Number of chunks currently in the pipeline.
    pub fn num_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Running totals over completed updates.
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::empty_world;
    use cgmath::Point2;

    fn drain_until(
        scheduler: &mut ChunkUpdateScheduler,
        count: usize,
    ) -> Vec<UpdateResult> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut results = Vec::new();
        while results.len() < count && Instant::now() < deadline {
            results.extend(scheduler.process_completed());
            thread::sleep(Duration::from_millis(5));
        }
        results
    }

    #[test]
    fn duplicate_updates_are_rejected() {
        let (world, _dir) = empty_world();
        let world = Arc::new(world);
        let mut scheduler = ChunkUpdateScheduler::new(1, 8);

        let chunk = world.chunk_at(Point2::new(0, 0));
        assert!(scheduler.queue_update(chunk.clone(), world.clone(), false));
        assert!(!scheduler.queue_update(chunk, world, false));
        assert_eq!(scheduler.num_in_flight(), 1);

        drain_until(&mut scheduler, 1);
    }

    #[test]
    fn in_flight_cap_applies_unless_forced() {
        let (world, _dir) = empty_world();
        let world = Arc::new(world);
        let mut scheduler = ChunkUpdateScheduler::new(1, 1);

        let first = world.chunk_at(Point2::new(0, 0));
        let second = world.chunk_at(Point2::new(5, 5));
        let third = world.chunk_at(Point2::new(9, 9));

        assert!(scheduler.queue_update(first, world.clone(), false));
        // The slot is only released by process_completed, so the cap
        // holds no matter how fast the worker is.
        assert!(!scheduler.queue_update(second, world.clone(), false));
        assert!(scheduler.queue_update(third, world.clone(), true));

        drain_until(&mut scheduler, 2);
        assert_eq!(scheduler.num_in_flight(), 0);
    }

    #[test]
    fn pipeline_generates_lights_and_meshes() {
        let (world, _dir) = empty_world();
        let world = Arc::new(world);
        let mut scheduler = ChunkUpdateScheduler::new(1, 8);

        let chunk = world.chunk_at(Point2::new(0, 0));
        assert!(scheduler.queue_update(chunk.clone(), world.clone(), false));

        let results = drain_until(&mut scheduler, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, chunk.get().id());

        let guard = chunk.get();
        assert!(!guard.is_fresh());
        assert!(!guard.is_light_dirty());
        assert!(!guard.is_dirty());
        assert!(guard.has_pending_mesh());

        assert_eq!(scheduler.stats().chunks_processed, 1);
        assert!(scheduler.in_flight_ids().is_empty());
    }
}
