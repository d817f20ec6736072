//! # Mesh Worker Pool
//!
//! Background threads that turn dirty chunks into CPU meshes.
//!
//! The main thread pushes `(distance, chunk)` jobs onto a shared min-heap
//! guarded by a mutex and condition variable; workers pop the nearest chunk,
//! snapshot it, build the mesh, and hand the result back through an upload
//! queue the main thread drains under its per-frame budget.
//!
//! The `is_meshing` flag is the handoff token: the main thread sets it
//! before enqueueing and clears it after upload, so a chunk is never queued
//! twice and never evicted mid-build. Workers clear it themselves only on
//! the failure paths (stale job, timeout, build panic), which re-opens the
//! chunk for a later retry.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::core::MtResource;
use crate::engine_state::voxels::chunk::Chunk;

use super::chunk_mesh::{build_mesh, MeshData, MeshInput};

/// Upper bound on queued jobs; the per-frame scan stops enqueueing above it.
pub const MESH_QUEUE_LIMIT: usize = 10;

/// New jobs the per-frame scan may enqueue.
pub const MESH_ENQUEUES_PER_FRAME: usize = 8;

/// A build running longer than this is logged and retried later.
const MESH_BUILD_TIMEOUT: Duration = Duration::from_millis(500);

/// A meshing request, ordered nearest-first.
pub struct MeshJob {
    pub distance: f32,
    pub chunk: MtResource<Chunk>,
}

impl PartialEq for MeshJob {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for MeshJob {}

impl Ord for MeshJob {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the smallest distance pops
        // first. total_cmp keeps NaN from poisoning the heap order.
        other.distance.total_cmp(&self.distance)
    }
}

impl PartialOrd for MeshJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A finished CPU mesh waiting for its GPU upload on the main thread.
pub struct BuiltMesh {
    pub chunk: MtResource<Chunk>,
    pub data: MeshData,
}

struct JobQueue {
    heap: BinaryHeap<MeshJob>,
    stop: bool,
}

struct PoolShared {
    queue: Mutex<JobQueue>,
    available: Condvar,
    uploads: Mutex<VecDeque<BuiltMesh>>,
}

/// The worker thread pool plus its shared queues.
pub struct MeshWorkerPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl MeshWorkerPool {
    /// Spawns `worker_count` mesh workers.
    pub fn new(worker_count: usize) -> Self {
        let shared = Arc::new(PoolShared {
            queue: Mutex::new(JobQueue {
                heap: BinaryHeap::new(),
                stop: false,
            }),
            available: Condvar::new(),
            uploads: Mutex::new(VecDeque::new()),
        });

        log::info!("starting {worker_count} mesh worker threads");
        let workers = (0..worker_count.max(1))
            .map(|i| {
                let shared = shared.clone();
                thread::Builder::new()
                    .name(format!("mesh-worker-{i}"))
                    .spawn(move || worker_loop(shared))
                    .expect("failed to spawn mesh worker")
            })
            .collect();

        Self { shared, workers }
    }

    /// Number of jobs currently waiting for a worker.
    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().unwrap().heap.len()
    }

    /// Pushes a job; the caller must already have set `is_meshing`.
    pub fn enqueue(&self, job: MeshJob) {
        self.shared.queue.lock().unwrap().heap.push(job);
        self.shared.available.notify_one();
    }

    /// Takes one finished mesh, if any is ready for upload.
    pub fn pop_finished(&self) -> Option<BuiltMesh> {
        self.shared.uploads.lock().unwrap().pop_front()
    }
}

impl Drop for MeshWorkerPool {
    fn drop(&mut self) {
        self.shared.queue.lock().unwrap().stop = true;
        self.shared.available.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: Arc<PoolShared>) {
    loop {
        let job = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(job) = queue.heap.pop() {
                    break job;
                }
                if queue.stop {
                    return;
                }
                queue = shared.available.wait(queue).unwrap();
            }
        };

        // The chunk may have been meshed or cleaned while queued.
        if !job.chunk.get().needs_mesh_rebuild() {
            job.chunk.get_mut().is_meshing = false;
            continue;
        }

        let input = MeshInput::capture(&job.chunk);
        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| build_mesh(&input)));
        let elapsed = started.elapsed();

        let position = job.chunk.get().position;
        let data = match result {
            Ok(data) => data,
            Err(_) => {
                log::error!(
                    "mesh build panicked for chunk ({}, {}, {}); will retry",
                    position.x,
                    position.y,
                    position.z
                );
                job.chunk.get_mut().is_meshing = false;
                continue;
            }
        };

        if elapsed > MESH_BUILD_TIMEOUT {
            // Leave the chunk dirty so a later frame re-queues it.
            log::warn!(
                "mesh build timed out ({:.0}ms) for chunk ({}, {}, {})",
                elapsed.as_secs_f32() * 1000.0,
                position.x,
                position.y,
                position.z
            );
            job.chunk.get_mut().is_meshing = false;
            continue;
        }
        if elapsed.as_millis() > 50 {
            log::debug!(
                "slow mesh build: {:.1}ms for chunk ({}, {}, {})",
                elapsed.as_secs_f32() * 1000.0,
                position.x,
                position.y,
                position.z
            );
        }

        {
            let mut chunk = job.chunk.get_mut();
            // An edit that landed mid-build bumps the version; leave the
            // chunk dirty in that case so it gets rebuilt.
            if chunk.version == input.version {
                chunk.is_mesh_dirty = false;
            }
            chunk.is_mesh_built = true;
        }

        shared.uploads.lock().unwrap().push_back(BuiltMesh {
            chunk: job.chunk,
            data,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point3;

    fn wait_for<T>(mut poll: impl FnMut() -> Option<T>) -> T {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(value) = poll() {
                return value;
            }
            assert!(Instant::now() < deadline, "timed out waiting for worker");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_jobs_pop_nearest_first() {
        let mut heap = BinaryHeap::new();
        for distance in [5.0, 1.0, 3.0] {
            heap.push(MeshJob {
                distance,
                chunk: MtResource::new(Chunk::new(Point3::new(0, 0, 0))),
            });
        }
        assert_eq!(heap.pop().unwrap().distance, 1.0);
        assert_eq!(heap.pop().unwrap().distance, 3.0);
        assert_eq!(heap.pop().unwrap().distance, 5.0);
    }

    #[test]
    fn test_worker_builds_and_queues_upload() {
        let pool = MeshWorkerPool::new(1);
        let chunk = MtResource::new(Chunk::new(Point3::new(0, 1, 0)));
        chunk.get_mut().generate(12345);

        chunk.get_mut().is_meshing = true;
        pool.enqueue(MeshJob {
            distance: 0.0,
            chunk: chunk.clone(),
        });

        let built = wait_for(|| pool.pop_finished());
        assert!(built.chunk.ptr_eq(&chunk));
        assert!(!chunk.get().is_mesh_dirty);
        assert!(chunk.get().is_mesh_built);
        // The handoff token stays set until the main thread uploads.
        assert!(chunk.get().is_meshing);
    }

    #[test]
    fn test_worker_skips_clean_chunks() {
        let pool = MeshWorkerPool::new(1);
        let chunk = MtResource::new(Chunk::new(Point3::new(0, 0, 0)));
        {
            let mut guard = chunk.get_mut();
            guard.is_mesh_built = true;
            guard.is_mesh_dirty = false;
            guard.is_meshing = true;
        }

        pool.enqueue(MeshJob {
            distance: 0.0,
            chunk: chunk.clone(),
        });

        wait_for(|| (!chunk.get().is_meshing).then_some(()));
        assert!(pool.pop_finished().is_none());
    }
}
