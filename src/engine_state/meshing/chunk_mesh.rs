//! # Chunk Mesh Builder
//!
//! Turns one chunk's voxels into an indexed triangle mesh containing only
//! the faces between a solid block and a transparent (or absent) block.
//!
//! Builds run on worker threads against a [`MeshInput`] snapshot captured
//! up front, so a build never holds chunk locks while it works and never
//! observes a half-applied edit. Cross-chunk face culling uses the captured
//! boundary planes of loaded neighbors, or the chunk's extended terrain
//! heights to predict what an unloaded neighbor would contain.

use cgmath::Point3;

use crate::core::MtResource;
use crate::engine_state::voxels::block::{self, Voxel, VoxelId};
use crate::engine_state::voxels::chunk::{Chunk, CHUNK_HEIGHT, CHUNK_SIZE, CHUNK_VOLUME};
use crate::engine_state::voxels::direction::Direction;
use crate::engine_state::voxels::terrain::TerrainGenerator;

use super::vertex::VoxelVertex;

/// Per-direction quad corners, relative to the cell center, wound
/// counter-clockwise when viewed from outside the cube.
/// Indexed by [`Direction`] discriminant.
const FACE_VERTICES: [[[f32; 3]; 4]; 6] = [
    // Front (+Z)
    [
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
    ],
    // Back (-Z)
    [
        [0.5, -0.5, -0.5],
        [-0.5, -0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [0.5, 0.5, -0.5],
    ],
    // Right (+X)
    [
        [0.5, -0.5, 0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [0.5, 0.5, 0.5],
    ],
    // Left (-X)
    [
        [-0.5, -0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [-0.5, 0.5, 0.5],
        [-0.5, 0.5, -0.5],
    ],
    // Top (+Y)
    [
        [-0.5, 0.5, 0.5],
        [0.5, 0.5, 0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
    ],
    // Bottom (-Y)
    [
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, -0.5, 0.5],
        [-0.5, -0.5, 0.5],
    ],
];

/// Texture coordinates for the four face corners.
const FACE_TEX_COORDS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// CPU-side mesh buffers produced by a build.
#[derive(Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<VoxelVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of quads in the mesh.
    pub fn face_count(&self) -> usize {
        self.indices.len() / 6
    }
}

/// GPU-side mesh buffers owned by a chunk after upload.
///
/// Creation and destruction happen on the main thread, which owns the GPU
/// queue; the handles themselves are freed by `wgpu` when dropped.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl GpuMesh {
    /// Uploads CPU mesh buffers to the GPU. Must run on the thread that owns
    /// the GPU queue.
    pub fn upload(device: &wgpu::Device, data: &MeshData) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Chunk Vertex Buffer"),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Chunk Index Buffer"),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            vertex_count: data.vertices.len() as u32,
            index_count: data.indices.len() as u32,
        }
    }
}

/// A read-only snapshot of everything a mesh build needs.
///
/// Captured under short per-chunk read locks (never more than one at a
/// time): the chunk's voxels and extended heights, plus the facing boundary
/// plane of every loaded neighbor. Workers then mesh entirely from the
/// snapshot. `version` lets the worker detect edits that landed mid-build.
pub struct MeshInput {
    position: Point3<i32>,
    pub version: u64,
    voxels: Vec<VoxelId>,
    extended_heights: Vec<i32>,
    neighbor_planes: [Option<Vec<VoxelId>>; 6],
}

impl MeshInput {
    /// Captures a snapshot of `chunk` and its neighbors' boundary planes.
    pub fn capture(chunk: &MtResource<Chunk>) -> Self {
        let (position, version, voxels, extended_heights, neighbors) = {
            let guard = chunk.get();
            (
                guard.position,
                guard.version,
                guard.voxels().to_vec(),
                guard.extended_heights().to_vec(),
                Direction::all().map(|direction| guard.neighbor(direction)),
            )
        };

        let neighbor_planes = std::array::from_fn(|i| {
            neighbors[i]
                .as_ref()
                .map(|neighbor| copy_boundary_plane(&neighbor.get(), Direction::from_index(i)))
        });

        Self {
            position,
            version,
            voxels,
            extended_heights,
            neighbor_planes,
        }
    }

    /// Builds a snapshot for a lone chunk (no neighbors). Used by tests and
    /// by builds scheduled before any neighbor is loaded.
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            position: chunk.position,
            version: chunk.version,
            voxels: chunk.voxels().to_vec(),
            extended_heights: chunk.extended_heights().to_vec(),
            neighbor_planes: std::array::from_fn(|_| None),
        }
    }

    #[inline]
    fn voxel(&self, x: i32, y: i32, z: i32) -> VoxelId {
        self.voxels[((x * CHUNK_HEIGHT + y) * CHUNK_SIZE + z) as usize]
    }

    /// The block at extended-local coordinates, resolved against the
    /// snapshot: local cells, captured neighbor planes, terrain prediction,
    /// or `Stone` beyond the one-cell apron.
    pub fn voxel_safe(&self, x: i32, y: i32, z: i32) -> VoxelId {
        if Chunk::in_bounds(x, y, z) {
            return self.voxel(x, y, z);
        }
        if x < -1 || x > CHUNK_SIZE || y < -1 || y > CHUNK_HEIGHT || z < -1 || z > CHUNK_SIZE {
            return Voxel::Stone.id();
        }

        let direction = if x == -1 {
            Direction::Left
        } else if x == CHUNK_SIZE {
            Direction::Right
        } else if y == -1 {
            Direction::Bottom
        } else if y == CHUNK_HEIGHT {
            Direction::Top
        } else if z == -1 {
            Direction::Back
        } else {
            Direction::Front
        };

        if let Some(plane) = &self.neighbor_planes[direction.index()] {
            if let Some(index) = plane_index(direction, x, y, z) {
                return plane[index];
            }
        }

        self.predicted_voxel(x, y, z)
    }

    /// Terrain prediction from the extended height cache.
    fn predicted_voxel(&self, x: i32, y: i32, z: i32) -> VoxelId {
        let extended = CHUNK_SIZE as usize + 2;
        let cache_index = ((x + 1) as usize) * extended + (z + 1) as usize;
        let height = self.extended_heights[cache_index];
        let world_y = self.position.y * CHUNK_HEIGHT + y;
        TerrainGenerator::voxel_for_height(height, world_y)
    }
}

/// Extracts the plane of `neighbor` that faces back toward the chunk whose
/// `direction` neighbor it is.
fn copy_boundary_plane(neighbor: &Chunk, direction: Direction) -> Vec<VoxelId> {
    match direction {
        Direction::Front => plane_xy(neighbor, 0),
        Direction::Back => plane_xy(neighbor, CHUNK_SIZE - 1),
        Direction::Right => plane_yz(neighbor, 0),
        Direction::Left => plane_yz(neighbor, CHUNK_SIZE - 1),
        Direction::Top => plane_xz(neighbor, 0),
        Direction::Bottom => plane_xz(neighbor, CHUNK_HEIGHT - 1),
    }
}

fn plane_xy(chunk: &Chunk, z: i32) -> Vec<VoxelId> {
    let mut plane = Vec::with_capacity((CHUNK_SIZE * CHUNK_HEIGHT) as usize);
    for x in 0..CHUNK_SIZE {
        for y in 0..CHUNK_HEIGHT {
            plane.push(chunk.voxel(x, y, z));
        }
    }
    plane
}

fn plane_yz(chunk: &Chunk, x: i32) -> Vec<VoxelId> {
    let mut plane = Vec::with_capacity((CHUNK_HEIGHT * CHUNK_SIZE) as usize);
    for y in 0..CHUNK_HEIGHT {
        for z in 0..CHUNK_SIZE {
            plane.push(chunk.voxel(x, y, z));
        }
    }
    plane
}

fn plane_xz(chunk: &Chunk, y: i32) -> Vec<VoxelId> {
    let mut plane = Vec::with_capacity((CHUNK_SIZE * CHUNK_SIZE) as usize);
    for x in 0..CHUNK_SIZE {
        for z in 0..CHUNK_SIZE {
            plane.push(chunk.voxel(x, y, z));
        }
    }
    plane
}

/// Index into a captured boundary plane for an extended-local query, using
/// the two coordinates that stay in range.
fn plane_index(direction: Direction, x: i32, y: i32, z: i32) -> Option<usize> {
    let index = match direction {
        Direction::Front | Direction::Back => {
            if !(0..CHUNK_SIZE).contains(&x) || !(0..CHUNK_HEIGHT).contains(&y) {
                return None;
            }
            x * CHUNK_HEIGHT + y
        }
        Direction::Right | Direction::Left => {
            if !(0..CHUNK_HEIGHT).contains(&y) || !(0..CHUNK_SIZE).contains(&z) {
                return None;
            }
            y * CHUNK_SIZE + z
        }
        Direction::Top | Direction::Bottom => {
            if !(0..CHUNK_SIZE).contains(&x) || !(0..CHUNK_SIZE).contains(&z) {
                return None;
            }
            x * CHUNK_SIZE + z
        }
    };
    Some(index as usize)
}

/// Whether a face of `current` against `neighbor` is part of the mesh.
///
/// Water only ever faces air, so coastlines render the recessed water edge
/// instead of z-fighting with the shore. Other transparent blocks suppress
/// faces between cells of the same kind. Opaque blocks face anything
/// transparent.
pub fn should_render_face(current: VoxelId, neighbor: VoxelId) -> bool {
    if current == Voxel::Water.id() {
        return neighbor == Voxel::Air.id();
    }
    if !block::is_transparent(current) {
        return block::is_transparent(neighbor);
    }
    current != neighbor
}

/// Builds the chunk mesh from a snapshot.
///
/// Emitted positions are in chunk-local space; the renderer supplies the
/// per-chunk translation through the model matrix.
pub fn build_mesh(input: &MeshInput) -> MeshData {
    let solid_count = input
        .voxels
        .iter()
        .filter(|&&voxel| voxel != Voxel::Air.id())
        .count();

    let estimated_vertices = (solid_count * 24).min(CHUNK_VOLUME / 4);
    let mut mesh = MeshData {
        vertices: Vec::with_capacity(estimated_vertices),
        indices: Vec::with_capacity(estimated_vertices * 3 / 2),
    };

    for x in 0..CHUNK_SIZE {
        for y in 0..CHUNK_HEIGHT {
            for z in 0..CHUNK_SIZE {
                let voxel = input.voxel(x, y, z);
                if voxel == Voxel::Air.id() {
                    continue;
                }

                for direction in Direction::all() {
                    let offset = direction.offset();
                    let neighbor = input.voxel_safe(x + offset.x, y + offset.y, z + offset.z);
                    if should_render_face(voxel, neighbor) {
                        add_face(&mut mesh, x, y, z, direction, voxel);
                    }
                }
            }
        }
    }

    mesh
}

fn add_face(mesh: &mut MeshData, x: i32, y: i32, z: i32, direction: Direction, voxel: VoxelId) {
    let info = block::voxel_info(voxel);
    let texture_id = match direction {
        Direction::Top => info.texture_top,
        Direction::Bottom => info.texture_bottom,
        _ => info.texture_sides,
    };

    let base = mesh.vertices.len() as u32;
    let corners = &FACE_VERTICES[direction.index()];
    let normal = direction.normal();

    for (corner, tex_coords) in corners.iter().zip(FACE_TEX_COORDS.iter()) {
        mesh.vertices.push(VoxelVertex {
            position: [
                x as f32 + corner[0] + 0.5,
                y as f32 + corner[1] + 0.5,
                z as f32 + corner[2] + 0.5,
            ],
            normal,
            tex_coords: *tex_coords,
            texture_id,
            debug_flag: 0.0,
        });
    }

    mesh.indices
        .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An ungenerated chunk predicts solid terrain outside its borders
    /// (default apron height), so tests place geometry in the interior
    /// unless they are exercising the border paths on purpose.
    fn empty_input(edit: impl FnOnce(&mut Chunk)) -> MeshInput {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        edit(&mut chunk);
        MeshInput::from_chunk(&chunk)
    }

    #[test]
    fn test_lone_cube_has_six_faces() {
        let input = empty_input(|chunk| chunk.set_voxel(8, 30, 8, Voxel::Stone.id()));
        let mesh = build_mesh(&input);
        assert_eq!(mesh.face_count(), 6);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
    }

    #[test]
    fn test_adjacent_cubes_cull_shared_faces() {
        let input = empty_input(|chunk| {
            chunk.set_voxel(8, 30, 8, Voxel::Stone.id());
            chunk.set_voxel(9, 30, 8, Voxel::Stone.id());
        });
        let mesh = build_mesh(&input);
        assert_eq!(mesh.face_count(), 10);
    }

    #[test]
    fn test_glass_pair_drops_internal_faces() {
        let input = empty_input(|chunk| {
            chunk.set_voxel(8, 30, 8, Voxel::Glass.id());
            chunk.set_voxel(9, 30, 8, Voxel::Glass.id());
        });
        let mesh = build_mesh(&input);
        assert_eq!(mesh.face_count(), 10);
    }

    #[test]
    fn test_opaque_and_glass_both_face_each_other() {
        let input = empty_input(|chunk| {
            chunk.set_voxel(8, 30, 8, Voxel::Stone.id());
            chunk.set_voxel(9, 30, 8, Voxel::Glass.id());
        });
        let mesh = build_mesh(&input);
        // Stone renders all six faces (glass is transparent); glass renders
        // five outward faces plus the one against the stone.
        assert_eq!(mesh.face_count(), 12);
    }

    #[test]
    fn test_water_plate_face_counts() {
        let input = empty_input(|chunk| {
            for x in 6..9 {
                for z in 6..9 {
                    chunk.set_voxel(x, 55, z, Voxel::Water.id());
                }
            }
        });
        let mesh = build_mesh(&input);
        // 9 top + 9 bottom + 12 perimeter faces, none between water cells.
        assert_eq!(mesh.face_count(), 30);
    }

    #[test]
    fn test_water_never_faces_solids() {
        let input = empty_input(|chunk| {
            chunk.set_voxel(8, 54, 8, Voxel::Stone.id());
            chunk.set_voxel(8, 55, 8, Voxel::Water.id());
        });
        let mesh = build_mesh(&input);
        // Water: top + four sides, no bottom face against the stone.
        // Stone: all six faces (water above it is transparent).
        assert_eq!(mesh.face_count(), 11);
        // And no water face may point down at the stone.
        let water_id = block::voxel_info(Voxel::Water.id()).texture_sides;
        for quad in mesh.vertices.chunks(4) {
            if quad[0].texture_id == water_id && quad[0].normal == [0.0, -1.0, 0.0] {
                panic!("water emitted a face against a solid block");
            }
        }
    }

    #[test]
    fn test_face_rule_table() {
        let air = Voxel::Air.id();
        let stone = Voxel::Stone.id();
        let water = Voxel::Water.id();
        let glass = Voxel::Glass.id();
        let leaves = Voxel::Leaves.id();

        // Water: air only.
        assert!(should_render_face(water, air));
        assert!(!should_render_face(water, water));
        assert!(!should_render_face(water, stone));
        assert!(!should_render_face(water, glass));

        // Opaque: anything transparent.
        assert!(should_render_face(stone, air));
        assert!(should_render_face(stone, water));
        assert!(should_render_face(stone, glass));
        assert!(should_render_face(stone, leaves));
        assert!(!should_render_face(stone, stone));
        assert!(!should_render_face(stone, Voxel::Iron.id()));

        // Other transparent: everything but itself.
        assert!(should_render_face(glass, air));
        assert!(should_render_face(glass, stone));
        assert!(should_render_face(glass, leaves));
        assert!(!should_render_face(glass, glass));
        assert!(!should_render_face(leaves, leaves));
    }

    #[test]
    fn test_canonical_face_offsets() {
        // The quad corner tables are a rendering contract; pin them down.
        assert_eq!(
            FACE_VERTICES[Direction::Front.index()],
            [
                [-0.5, -0.5, 0.5],
                [0.5, -0.5, 0.5],
                [0.5, 0.5, 0.5],
                [-0.5, 0.5, 0.5]
            ]
        );
        assert_eq!(
            FACE_VERTICES[Direction::Top.index()],
            [
                [-0.5, 0.5, 0.5],
                [0.5, 0.5, 0.5],
                [0.5, 0.5, -0.5],
                [-0.5, 0.5, -0.5]
            ]
        );
        for direction in Direction::all() {
            let normal = direction.normal();
            for corner in &FACE_VERTICES[direction.index()] {
                // Every corner of a face lies on the half-unit plane its
                // normal points at.
                let along_normal =
                    corner[0] * normal[0] + corner[1] * normal[1] + corner[2] * normal[2];
                assert_eq!(along_normal, 0.5);
            }
        }
    }

    #[test]
    fn test_index_pattern_per_face() {
        let input = empty_input(|chunk| chunk.set_voxel(8, 30, 8, Voxel::Stone.id()));
        let mesh = build_mesh(&input);
        for (face, indices) in mesh.indices.chunks(6).enumerate() {
            let base = (face * 4) as u32;
            assert_eq!(
                indices,
                [base, base + 1, base + 2, base + 2, base + 3, base]
            );
        }
    }

    #[test]
    fn test_grass_selects_per_face_textures() {
        let input = empty_input(|chunk| chunk.set_voxel(8, 30, 8, Voxel::Grass.id()));
        let mesh = build_mesh(&input);
        let info = block::voxel_info(Voxel::Grass.id());
        for quad in mesh.vertices.chunks(4) {
            let expected = match quad[0].normal {
                [0.0, 1.0, 0.0] => info.texture_top,
                [0.0, -1.0, 0.0] => info.texture_bottom,
                _ => info.texture_sides,
            };
            assert_eq!(quad[0].texture_id, expected);
        }
    }

    #[test]
    fn test_neighbor_plane_culls_border_faces() {
        let a = MtResource::new(Chunk::new(Point3::new(0, 0, 0)));
        a.get_mut().set_voxel(CHUNK_SIZE - 1, 30, 5, Voxel::Stone.id());

        // Without a neighbor the apron predicts solid terrain at y=30, so
        // the +X face is culled.
        let alone = build_mesh(&MeshInput::capture(&a));
        assert_eq!(alone.face_count(), 5);

        // An empty linked neighbor exposes that face.
        let b = MtResource::new(Chunk::new(Point3::new(1, 0, 0)));
        a.get_mut()
            .set_neighbor(Direction::Right, Some(b.downgrade()));
        let linked = build_mesh(&MeshInput::capture(&a));
        assert_eq!(linked.face_count(), 6);

        // A solid cell in the neighbor's boundary plane culls it again.
        b.get_mut().set_voxel(0, 30, 5, Voxel::Stone.id());
        let occluded = build_mesh(&MeshInput::capture(&a));
        assert_eq!(occluded.face_count(), 5);
    }

    #[test]
    fn test_generated_chunk_mesh_is_watertight_inside() {
        // A fully generated chunk deep underground is all stone; interior
        // faces must vanish and the apron prediction (also stone) must cull
        // every border face.
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        chunk.generate(12345);
        let min_height = chunk.extended_heights().iter().copied().min().unwrap();
        if min_height < CHUNK_HEIGHT + 4 {
            // Terrain dips into this chunk for this seed; the invariant
            // below only holds for a fully buried chunk.
            return;
        }
        let mesh = build_mesh(&MeshInput::from_chunk(&chunk));
        assert_eq!(mesh.face_count(), 0);
    }
}
