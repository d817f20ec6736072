//! # Chunk Module
//!
//! A chunk is a dense `16x64x16` block of voxels at a fixed grid position.
//! Besides the voxel array it carries the state flags that drive the meshing
//! pipeline, weak back-references to its six axis neighbors, and cached
//! terrain heights for a one-block apron so the mesher can predict what an
//! unloaded neighbor would contain.

use std::sync::Arc;
use std::time::Instant;

use cgmath::Point3;

use crate::core::{MtResource, WeakResource};
use crate::engine_state::meshing::GpuMesh;

use super::block::{Voxel, VoxelId};
use super::direction::Direction;
use super::terrain::TerrainGenerator;

/// Horizontal chunk dimension in blocks.
pub const CHUNK_SIZE: i32 = 16;
/// Vertical chunk dimension in blocks.
pub const CHUNK_HEIGHT: i32 = 64;
/// Total number of blocks in a chunk.
pub const CHUNK_VOLUME: usize = (CHUNK_SIZE * CHUNK_HEIGHT * CHUNK_SIZE) as usize;

/// Side length of the extended height cache: the chunk plus a one-block
/// apron on each horizontal side.
pub(crate) const EXTENDED_SIZE: usize = CHUNK_SIZE as usize + 2;

/// Fallback terrain height used before a chunk has generated its height
/// cache.
const DEFAULT_TERRAIN_HEIGHT: i32 = CHUNK_HEIGHT;

/// A `16x64x16` block of voxels plus the bookkeeping the streaming and
/// meshing pipelines need.
pub struct Chunk {
    /// Position in chunk coordinates (not block coordinates).
    pub position: Point3<i32>,
    /// Monotonic edit counter, incremented whenever a cell changes.
    pub version: u64,
    /// The world seed used at generation time.
    pub generation_seed: u32,

    /// Terrain has been filled in.
    pub is_generated: bool,
    /// Edited since generation.
    pub is_dirty: bool,
    /// The mesh no longer matches the voxel data.
    pub is_mesh_dirty: bool,
    /// Scheduled on or being processed by a mesh worker.
    pub is_meshing: bool,
    /// A mesh build has completed at least once (even if it was empty).
    pub is_mesh_built: bool,

    /// GPU mesh for this chunk, if one has been uploaded. `None` also covers
    /// meshes that built empty.
    pub mesh: Option<Arc<GpuMesh>>,

    /// Dense voxel storage, indexed `(x * HEIGHT + y) * SIZE + z`.
    voxels: Vec<VoxelId>,
    /// Weak back-references to the six axis neighbors.
    neighbors: [Option<WeakResource<Chunk>>; 6],
    /// Ground height per local column, filled during generation.
    column_heights: Vec<i32>,
    /// Terrain heights for local `(x, z)` in `[-1, SIZE]`, filled before the
    /// voxel pass so apron lookups never re-run the noise pipeline.
    extended_heights: Vec<i32>,
    has_extended_heights: bool,
}

impl Chunk {
    /// Creates an empty (all-air), ungenerated chunk.
    pub fn new(position: Point3<i32>) -> Self {
        Self {
            position,
            version: 0,
            generation_seed: 0,
            is_generated: false,
            is_dirty: false,
            is_mesh_dirty: false,
            is_meshing: false,
            is_mesh_built: false,
            mesh: None,
            voxels: vec![Voxel::Air.id(); CHUNK_VOLUME],
            neighbors: std::array::from_fn(|_| None),
            column_heights: vec![0; (CHUNK_SIZE * CHUNK_SIZE) as usize],
            extended_heights: vec![0; EXTENDED_SIZE * EXTENDED_SIZE],
            has_extended_heights: false,
        }
    }

    #[inline]
    fn index(x: i32, y: i32, z: i32) -> usize {
        ((x * CHUNK_HEIGHT + y) * CHUNK_SIZE + z) as usize
    }

    /// Whether local coordinates fall inside the chunk.
    pub fn in_bounds(x: i32, y: i32, z: i32) -> bool {
        x >= 0 && x < CHUNK_SIZE && y >= 0 && y < CHUNK_HEIGHT && z >= 0 && z < CHUNK_SIZE
    }

    /// World-space block coordinates of this chunk's minimum corner.
    pub fn world_origin(&self) -> Point3<i32> {
        Point3::new(
            self.position.x * CHUNK_SIZE,
            self.position.y * CHUNK_HEIGHT,
            self.position.z * CHUNK_SIZE,
        )
    }

    /// The raw voxel array, in `(x * HEIGHT + y) * SIZE + z` order.
    pub fn voxels(&self) -> &[VoxelId] {
        &self.voxels
    }

    /// The block at local coordinates, or `Air` when out of bounds.
    pub fn voxel(&self, x: i32, y: i32, z: i32) -> VoxelId {
        if !Self::in_bounds(x, y, z) {
            return Voxel::Air.id();
        }
        self.voxels[Self::index(x, y, z)]
    }

    /// Overwrites the block at local coordinates.
    ///
    /// A change bumps `version`, marks the chunk dirty and mesh-dirty, and
    /// marks any loaded neighbor mesh-dirty when the cell sits on the shared
    /// boundary. Out-of-bounds writes and no-op writes are ignored.
    pub fn set_voxel(&mut self, x: i32, y: i32, z: i32, voxel: VoxelId) {
        if !Self::in_bounds(x, y, z) {
            return;
        }
        let index = Self::index(x, y, z);
        if self.voxels[index] == voxel {
            return;
        }

        self.voxels[index] = voxel;
        self.version += 1;
        self.is_dirty = true;
        self.is_mesh_dirty = true;

        for direction in Self::boundary_directions(x, y, z) {
            if let Some(neighbor) = self.neighbor(direction) {
                neighbor.get_mut().is_mesh_dirty = true;
            }
        }
    }

    /// The directions whose neighbor shares a face with this cell.
    fn boundary_directions(x: i32, y: i32, z: i32) -> impl Iterator<Item = Direction> {
        let mut directions = [None; 3];
        if x == 0 {
            directions[0] = Some(Direction::Left);
        } else if x == CHUNK_SIZE - 1 {
            directions[0] = Some(Direction::Right);
        }
        if y == 0 {
            directions[1] = Some(Direction::Bottom);
        } else if y == CHUNK_HEIGHT - 1 {
            directions[1] = Some(Direction::Top);
        }
        if z == 0 {
            directions[2] = Some(Direction::Back);
        } else if z == CHUNK_SIZE - 1 {
            directions[2] = Some(Direction::Front);
        }
        directions.into_iter().flatten()
    }

    /// Resolves a block in the permitted extended range `[-1, SIZE]` /
    /// `[-1, HEIGHT]`.
    ///
    /// In-bounds queries read local storage. One-cell-out queries delegate to
    /// the loaded neighbor with wrapped coordinates, or fall back to the
    /// terrain prediction from the extended height cache. Queries beyond the
    /// apron return `Stone`, a deep-underground default the mesher never
    /// exposes.
    pub fn voxel_safe(&self, x: i32, y: i32, z: i32) -> VoxelId {
        if Self::in_bounds(x, y, z) {
            return self.voxels[Self::index(x, y, z)];
        }
        if x < -1 || x > CHUNK_SIZE || y < -1 || y > CHUNK_HEIGHT || z < -1 || z > CHUNK_SIZE {
            return Voxel::Stone.id();
        }

        let (direction, wrapped) = if x == -1 {
            (Direction::Left, Point3::new(CHUNK_SIZE - 1, y, z))
        } else if x == CHUNK_SIZE {
            (Direction::Right, Point3::new(0, y, z))
        } else if y == -1 {
            (Direction::Bottom, Point3::new(x, CHUNK_HEIGHT - 1, z))
        } else if y == CHUNK_HEIGHT {
            (Direction::Top, Point3::new(x, 0, z))
        } else if z == -1 {
            (Direction::Back, Point3::new(x, y, CHUNK_SIZE - 1))
        } else {
            (Direction::Front, Point3::new(x, y, 0))
        };

        if Self::in_bounds(wrapped.x, wrapped.y, wrapped.z) {
            if let Some(neighbor) = self.neighbor(direction) {
                return neighbor.get().voxel(wrapped.x, wrapped.y, wrapped.z);
            }
        }

        self.predicted_voxel(x, y, z)
    }

    /// What terrain generation would place at extended-local coordinates,
    /// answered from the cached apron heights.
    pub fn predicted_voxel(&self, x: i32, y: i32, z: i32) -> VoxelId {
        if Self::in_bounds(x, y, z) {
            return self.voxels[Self::index(x, y, z)];
        }
        let height = self.cached_terrain_height(x, z);
        let world_y = self.position.y * CHUNK_HEIGHT + y;
        TerrainGenerator::voxel_for_height(height, world_y)
    }

    /// Cached terrain height for local `(x, z)` in `[-1, SIZE]`.
    pub fn cached_terrain_height(&self, x: i32, z: i32) -> i32 {
        debug_assert!((-1..=CHUNK_SIZE).contains(&x) && (-1..=CHUNK_SIZE).contains(&z));
        if !self.has_extended_heights {
            return DEFAULT_TERRAIN_HEIGHT;
        }
        let cache_x = (x + 1) as usize;
        let cache_z = (z + 1) as usize;
        self.extended_heights[cache_x * EXTENDED_SIZE + cache_z]
    }

    /// The extended height cache, row-major over `[-1, SIZE]` in x then z.
    pub fn extended_heights(&self) -> &[i32] {
        &self.extended_heights
    }

    /// Ground height recorded for a local column during generation.
    pub fn column_height(&self, x: i32, z: i32) -> i32 {
        debug_assert!((0..CHUNK_SIZE).contains(&x) && (0..CHUNK_SIZE).contains(&z));
        self.column_heights[(x * CHUNK_SIZE + z) as usize]
    }

    /// Fills the chunk from the terrain function. Idempotent: a generated
    /// chunk is left untouched.
    pub fn generate(&mut self, seed: u32) {
        if self.is_generated {
            return;
        }
        let started = Instant::now();

        self.generation_seed = seed;
        let terrain = TerrainGenerator::new(seed);
        self.fill_extended_heights(&terrain);

        let world_y_base = self.position.y * CHUNK_HEIGHT;
        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                let height = self.cached_terrain_height(x, z);
                self.column_heights[(x * CHUNK_SIZE + z) as usize] = height;
                for y in 0..CHUNK_HEIGHT {
                    self.voxels[Self::index(x, y, z)] =
                        TerrainGenerator::voxel_for_height(height, world_y_base + y);
                }
            }
        }

        self.version += 1;
        self.is_generated = true;
        self.is_dirty = false;
        self.is_mesh_dirty = true;
        self.is_meshing = false;

        let elapsed = started.elapsed();
        if elapsed.as_millis() > 5 {
            log::debug!(
                "slow generation for chunk ({}, {}, {}): {:.2}ms",
                self.position.x,
                self.position.y,
                self.position.z,
                elapsed.as_secs_f32() * 1000.0
            );
        }
    }

    /// Computes terrain heights for the chunk columns plus the one-block
    /// apron, ahead of the voxel fill.
    fn fill_extended_heights(&mut self, terrain: &TerrainGenerator) {
        let origin = self.world_origin();
        for x in -1..=CHUNK_SIZE {
            for z in -1..=CHUNK_SIZE {
                let height = terrain.column_height(origin.x + x, origin.z + z);
                let cache_x = (x + 1) as usize;
                let cache_z = (z + 1) as usize;
                self.extended_heights[cache_x * EXTENDED_SIZE + cache_z] = height;
            }
        }
        self.has_extended_heights = true;
    }

    /// Installs (or clears) the back-reference to an axis neighbor.
    pub fn set_neighbor(&mut self, direction: Direction, neighbor: Option<WeakResource<Chunk>>) {
        self.neighbors[direction.index()] = neighbor;
    }

    /// The neighbor in `direction`, if it is still loaded.
    pub fn neighbor(&self, direction: Direction) -> Option<MtResource<Chunk>> {
        self.neighbors[direction.index()]
            .as_ref()
            .and_then(|weak| weak.upgrade())
    }

    /// Whether the meshing pipeline owes this chunk a rebuild.
    pub fn needs_mesh_rebuild(&self) -> bool {
        self.is_mesh_dirty || !self.is_mesh_built
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::terrain::WATER_LEVEL;

    fn linked_pair() -> (MtResource<Chunk>, MtResource<Chunk>) {
        let a = MtResource::new(Chunk::new(Point3::new(0, 0, 0)));
        let b = MtResource::new(Chunk::new(Point3::new(1, 0, 0)));
        a.get_mut().set_neighbor(Direction::Right, Some(b.downgrade()));
        b.get_mut().set_neighbor(Direction::Left, Some(a.downgrade()));
        (a, b)
    }

    #[test]
    fn test_index_order() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        chunk.set_voxel(2, 3, 4, Voxel::Iron.id());
        let index = (2 * CHUNK_HEIGHT + 3) * CHUNK_SIZE + 4;
        assert_eq!(chunk.voxels()[index as usize], Voxel::Iron.id());
    }

    #[test]
    fn test_out_of_bounds_reads_are_air() {
        let chunk = Chunk::new(Point3::new(0, 0, 0));
        assert_eq!(chunk.voxel(-1, 0, 0), Voxel::Air.id());
        assert_eq!(chunk.voxel(0, CHUNK_HEIGHT, 0), Voxel::Air.id());
        assert_eq!(chunk.voxel(0, 0, CHUNK_SIZE), Voxel::Air.id());
    }

    #[test]
    fn test_set_voxel_bumps_version_once() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        chunk.set_voxel(1, 1, 1, Voxel::Stone.id());
        assert_eq!(chunk.version, 1);
        assert!(chunk.is_dirty);
        assert!(chunk.is_mesh_dirty);
        // Writing the same value again must not count as an edit.
        chunk.set_voxel(1, 1, 1, Voxel::Stone.id());
        assert_eq!(chunk.version, 1);
    }

    #[test]
    fn test_generate_is_idempotent() {
        let mut chunk = Chunk::new(Point3::new(0, 1, 0));
        chunk.generate(777);
        let voxels = chunk.voxels().to_vec();
        let version = chunk.version;
        chunk.generate(777);
        assert_eq!(chunk.voxels(), &voxels[..]);
        assert_eq!(chunk.version, version);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let mut a = Chunk::new(Point3::new(3, 1, -2));
        let mut b = Chunk::new(Point3::new(3, 1, -2));
        a.generate(12345);
        b.generate(12345);
        assert_eq!(a.voxels(), b.voxels());
        assert_eq!(a.extended_heights(), b.extended_heights());
    }

    #[test]
    fn test_generated_column_layers() {
        // Find the chunk that contains the surface of column (0, 0) for the
        // reference seed and check the stone/dirt/grass stack around it.
        let seed = 12345;
        let terrain = TerrainGenerator::new(seed);
        let height = terrain.column_height(0, 0);
        let chunk_y = (height - 1).div_euclid(CHUNK_HEIGHT);

        let mut chunk = Chunk::new(Point3::new(0, chunk_y, 0));
        chunk.generate(seed);
        assert_eq!(chunk.column_height(0, 0), height);

        let base = chunk_y * CHUNK_HEIGHT;
        let local = |world_y: i32| world_y - base;

        let grass_y = local(height - 1);
        assert_eq!(chunk.voxel(0, grass_y, 0), Voxel::Grass.id());
        if grass_y >= 1 {
            assert_eq!(chunk.voxel(0, grass_y - 1, 0), Voxel::Dirt.id());
        }
        if grass_y >= 3 {
            assert_eq!(chunk.voxel(0, grass_y - 3, 0), Voxel::Stone.id());
        }
        if grass_y + 1 < CHUNK_HEIGHT {
            let above = base + grass_y + 1;
            let expected = if above <= WATER_LEVEL {
                Voxel::Water.id()
            } else {
                Voxel::Air.id()
            };
            assert_eq!(chunk.voxel(0, grass_y + 1, 0), expected);
        }
    }

    #[test]
    fn test_boundary_edit_marks_neighbor() {
        let (a, b) = linked_pair();
        a.get_mut().set_voxel(CHUNK_SIZE - 1, 10, 5, Voxel::Stone.id());
        a.get_mut().is_mesh_dirty = false;
        b.get_mut().is_mesh_dirty = false;

        a.get_mut().set_voxel(CHUNK_SIZE - 1, 10, 5, Voxel::Air.id());
        assert!(a.get().is_mesh_dirty);
        assert!(b.get().is_mesh_dirty);
    }

    #[test]
    fn test_interior_edit_leaves_neighbor_clean() {
        let (a, b) = linked_pair();
        a.get_mut().set_voxel(5, 10, 5, Voxel::Stone.id());
        assert!(a.get().is_mesh_dirty);
        assert!(!b.get().is_mesh_dirty);
    }

    #[test]
    fn test_voxel_safe_delegates_to_neighbor() {
        let (a, b) = linked_pair();
        b.get_mut().set_voxel(0, 10, 5, Voxel::Iron.id());
        assert_eq!(a.get().voxel_safe(CHUNK_SIZE, 10, 5), Voxel::Iron.id());
    }

    #[test]
    fn test_voxel_safe_predicts_missing_neighbor() {
        let seed = 4242;
        let mut chunk = Chunk::new(Point3::new(0, 1, 0));
        chunk.generate(seed);

        // With no neighbor linked, apron queries must agree with the terrain
        // function at the corresponding world coordinate.
        let terrain = TerrainGenerator::new(seed);
        for y in [0, 20, CHUNK_HEIGHT - 1] {
            let world_y = CHUNK_HEIGHT + y;
            assert_eq!(
                chunk.voxel_safe(-1, y, 3),
                terrain.voxel_at(-1, world_y, 3),
                "prediction mismatch at y={y}"
            );
            assert_eq!(
                chunk.voxel_safe(7, y, CHUNK_SIZE),
                terrain.voxel_at(7, world_y, CHUNK_SIZE)
            );
        }
    }

    #[test]
    fn test_voxel_safe_beyond_apron_is_stone() {
        let chunk = Chunk::new(Point3::new(0, 0, 0));
        assert_eq!(chunk.voxel_safe(-2, 0, 0), Voxel::Stone.id());
        assert_eq!(chunk.voxel_safe(0, CHUNK_HEIGHT + 1, 0), Voxel::Stone.id());
        assert_eq!(chunk.voxel_safe(0, 0, CHUNK_SIZE + 1), Voxel::Stone.id());
    }

    #[test]
    fn test_neighbor_reference_does_not_keep_chunk_alive() {
        let (a, b) = linked_pair();
        drop(b);
        assert!(a.get().neighbor(Direction::Right).is_none());
    }

    #[test]
    fn test_version_counts_only_real_changes() {
        let mut rng = fastrand::Rng::with_seed(0xc0ffee);
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        let mut expected_version = 0;

        for _ in 0..500 {
            let x = rng.i32(0..CHUNK_SIZE);
            let y = rng.i32(0..CHUNK_HEIGHT);
            let z = rng.i32(0..CHUNK_SIZE);
            let voxel = rng.u16(0..3);

            if chunk.voxel(x, y, z) != voxel {
                expected_version += 1;
            }
            chunk.set_voxel(x, y, z, voxel);
            assert_eq!(chunk.version, expected_version);
        }
    }
}
