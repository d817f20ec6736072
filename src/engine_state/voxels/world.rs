//! # World Module
//!
//! The sparse, chunked voxel store and its streaming logic. The world owns
//! every live chunk through a thread-safe handle, keeps the cyclic neighbor
//! graph consistent with weak back-references, and loads/unloads chunks
//! around a moving center position.
//!
//! Streaming is budgeted: a scan only runs when the center chunk changes, at
//! most two chunks generate per frame (nearest first), and chunks unload
//! only once they drift past the load radius plus a hysteresis margin so a
//! viewpoint oscillating near the boundary never thrashes.

use std::collections::{HashMap, VecDeque};

use cgmath::Point3;

use crate::core::MtResource;

use super::chunk::{Chunk, CHUNK_HEIGHT, CHUNK_SIZE};
use super::block::{Voxel, VoxelId};
use super::direction::Direction;

/// Highest chunk-grid y that will ever be created; the world ceiling sits at
/// `(MAX_CHUNK_Y + 1) * CHUNK_HEIGHT` blocks.
pub const MAX_CHUNK_Y: i32 = 7;

/// Chunks generated per frame from the load queue.
const CHUNK_LOADS_PER_FRAME: usize = 2;

/// Extra distance past the load radius a chunk must reach before unloading.
const UNLOAD_HYSTERESIS: f32 = 1.5;

/// Vertical distances count for a quarter in the streaming metric, matching
/// the flat shape of the playable space.
const VERTICAL_DISTANCE_WEIGHT: f32 = 0.25;

/// The keyed store of live chunks plus streaming state.
pub struct World {
    chunks: HashMap<Point3<i32>, MtResource<Chunk>>,
    world_seed: u32,
    render_distance: i32,
    last_center_chunk: Option<Point3<i32>>,
    chunks_to_load: VecDeque<Point3<i32>>,
    chunks_to_unload: Vec<Point3<i32>>,
}

impl World {
    /// Creates an empty world for a seed and streaming radius.
    pub fn new(seed: u32, render_distance: i32) -> Self {
        Self {
            chunks: HashMap::new(),
            world_seed: seed,
            render_distance: render_distance.max(1),
            last_center_chunk: None,
            chunks_to_load: VecDeque::new(),
            chunks_to_unload: Vec::new(),
        }
    }

    /// The world seed.
    pub fn seed(&self) -> u32 {
        self.world_seed
    }

    /// The streaming radius in chunk units.
    pub fn render_distance(&self) -> i32 {
        self.render_distance
    }

    /// Changes the streaming radius and forces a rescan on the next update.
    pub fn set_render_distance(&mut self, distance: i32) {
        self.render_distance = distance.max(1);
        self.last_center_chunk = None;
    }

    /// Number of chunks currently loaded.
    pub fn loaded_chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// All loaded chunks, keyed by chunk position.
    pub fn chunks(&self) -> &HashMap<Point3<i32>, MtResource<Chunk>> {
        &self.chunks
    }

    /// Advances streaming for a new center position.
    ///
    /// Rescans the desired set when the center chunk changed, then services
    /// the load queue (bounded) and the unload queue (fully, except chunks
    /// currently meshing, which stay queued).
    pub fn update(&mut self, center: Point3<f32>) {
        self.scan_around(center);
        self.process_load_queue();
        self.process_unload_queue();
    }

    fn scan_around(&mut self, center: Point3<f32>) {
        let center_chunk = Self::world_to_chunk_f(center);
        if self.last_center_chunk == Some(center_chunk) {
            return;
        }
        self.last_center_chunk = Some(center_chunk);

        // Desired chunks come back sorted nearest-first, which makes the
        // load queue a priority order for free.
        self.chunks_to_load.clear();
        for position in self.chunks_in_range(center_chunk, self.render_distance) {
            if !self.chunks.contains_key(&position) {
                self.chunks_to_load.push_back(position);
            }
        }

        let unload_radius = self.render_distance as f32 + UNLOAD_HYSTERESIS;
        for position in self.chunks.keys() {
            if Self::weighted_distance(*position, center_chunk) > unload_radius
                && !self.chunks_to_unload.contains(position)
            {
                self.chunks_to_unload.push(*position);
            }
        }
    }

    /// All chunk positions within the weighted radius of `center`, nearest
    /// first. The vertical range is clamped to `[0, MAX_CHUNK_Y]`.
    fn chunks_in_range(&self, center: Point3<i32>, range: i32) -> Vec<Point3<i32>> {
        let mut in_range = Vec::new();
        let y_min = (center.y - 2).max(0);
        let y_max = (center.y + 2).min(MAX_CHUNK_Y);

        for x in (center.x - range)..=(center.x + range) {
            for y in y_min..=y_max {
                for z in (center.z - range)..=(center.z + range) {
                    let position = Point3::new(x, y, z);
                    let distance = Self::weighted_distance(position, center);
                    if distance <= range as f32 {
                        in_range.push((distance, position));
                    }
                }
            }
        }

        in_range.sort_by(|a, b| a.0.total_cmp(&b.0));
        in_range.into_iter().map(|(_, position)| position).collect()
    }

    /// Streaming distance metric: Euclidean with vertical differences
    /// weighted down.
    fn weighted_distance(a: Point3<i32>, b: Point3<i32>) -> f32 {
        let dx = (a.x - b.x) as f32;
        let dy = (a.y - b.y) as f32;
        let dz = (a.z - b.z) as f32;
        (dx * dx + dy * dy * VERTICAL_DISTANCE_WEIGHT + dz * dz).sqrt()
    }

    fn process_load_queue(&mut self) {
        for _ in 0..CHUNK_LOADS_PER_FRAME {
            let Some(position) = self.chunks_to_load.pop_front() else {
                break;
            };
            if !self.chunks.contains_key(&position) {
                self.get_or_create_chunk(position);
            }
        }
    }

    fn process_unload_queue(&mut self) {
        let pending = std::mem::take(&mut self.chunks_to_unload);
        for position in pending {
            if !self.unload_chunk(position) {
                // Still meshing; retry on a later frame.
                self.chunks_to_unload.push(position);
            }
        }
    }

    /// The chunk at a chunk-grid position, if loaded.
    pub fn chunk(&self, position: Point3<i32>) -> Option<MtResource<Chunk>> {
        self.chunks.get(&position).cloned()
    }

    /// Fetches the chunk at a position, creating, generating and linking it
    /// if it does not exist yet.
    pub fn get_or_create_chunk(&mut self, position: Point3<i32>) -> MtResource<Chunk> {
        if let Some(chunk) = self.chunks.get(&position) {
            return chunk.clone();
        }

        let chunk = MtResource::new(Chunk::new(position));
        chunk.get_mut().generate(self.world_seed);
        self.chunks.insert(position, chunk.clone());
        self.link_neighbors(position, &chunk);
        chunk
    }

    /// Removes a chunk, clearing every reciprocal neighbor pointer first.
    ///
    /// Returns `false` (and leaves the chunk loaded) if a mesh worker is
    /// currently reading it.
    fn unload_chunk(&mut self, position: Point3<i32>) -> bool {
        let Some(chunk) = self.chunks.get(&position) else {
            return true;
        };
        if chunk.get().is_meshing {
            return false;
        }

        let chunk = self.chunks.remove(&position).unwrap();
        let mut guard = chunk.get_mut();
        for direction in Direction::all() {
            if let Some(neighbor) = guard.neighbor(direction) {
                neighbor.get_mut().set_neighbor(direction.opposite(), None);
            }
            guard.set_neighbor(direction, None);
        }
        true
    }

    /// Installs reciprocal neighbor references between a chunk and every
    /// already-loaded neighbor.
    fn link_neighbors(&self, position: Point3<i32>, chunk: &MtResource<Chunk>) {
        for direction in Direction::all() {
            let neighbor_position = position + direction.offset();
            let Some(neighbor) = self.chunks.get(&neighbor_position) else {
                continue;
            };
            chunk
                .get_mut()
                .set_neighbor(direction, Some(neighbor.downgrade()));
            neighbor
                .get_mut()
                .set_neighbor(direction.opposite(), Some(chunk.downgrade()));
        }
    }

    /// Chunk-grid position containing a world block position (flooring
    /// division, correct for negative coordinates).
    pub fn world_to_chunk(position: Point3<i32>) -> Point3<i32> {
        Point3::new(
            position.x.div_euclid(CHUNK_SIZE),
            position.y.div_euclid(CHUNK_HEIGHT),
            position.z.div_euclid(CHUNK_SIZE),
        )
    }

    /// Chunk-grid position containing a world-space point.
    pub fn world_to_chunk_f(position: Point3<f32>) -> Point3<i32> {
        Self::world_to_chunk(Point3::new(
            position.x.floor() as i32,
            position.y.floor() as i32,
            position.z.floor() as i32,
        ))
    }

    /// Local coordinates of a world block position within its chunk.
    pub fn world_to_local(position: Point3<i32>) -> Point3<i32> {
        Point3::new(
            position.x.rem_euclid(CHUNK_SIZE),
            position.y.rem_euclid(CHUNK_HEIGHT),
            position.z.rem_euclid(CHUNK_SIZE),
        )
    }

    /// World block position of a chunk's minimum corner.
    pub fn chunk_to_world(position: Point3<i32>) -> Point3<i32> {
        Point3::new(
            position.x * CHUNK_SIZE,
            position.y * CHUNK_HEIGHT,
            position.z * CHUNK_SIZE,
        )
    }

    /// The block at a world position; unloaded regions read as `Air`.
    pub fn voxel(&self, position: Point3<i32>) -> VoxelId {
        let Some(chunk) = self.chunks.get(&Self::world_to_chunk(position)) else {
            return Voxel::Air.id();
        };
        let local = Self::world_to_local(position);
        chunk.get().voxel(local.x, local.y, local.z)
    }

    /// Writes a block at a world position, creating and generating the
    /// containing chunk if necessary.
    pub fn set_voxel(&mut self, position: Point3<i32>, voxel: VoxelId) {
        let chunk = self.get_or_create_chunk(Self::world_to_chunk(position));
        let local = Self::world_to_local(position);
        chunk.get_mut().set_voxel(local.x, local.y, local.z, voxel);
    }
}
