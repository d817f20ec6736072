//! # Block Module
//!
//! Defines the voxel identifier type, the canonical block set, and the static
//! properties table that drives meshing and rendering decisions.

use num_derive::FromPrimitive;

/// The compact integer type voxels are stored as inside chunks.
pub type VoxelId = u16;

/// Every block kind the engine knows about.
///
/// The discriminants are the on-wire [`VoxelId`] values; `FromPrimitive`
/// provides the reverse conversion for data read back out of chunk storage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum Voxel {
    Air = 0,
    Stone = 1,
    Dirt = 2,
    Grass = 3,
    Cobblestone = 4,
    Wood = 5,
    Leaves = 6,
    Sand = 7,
    Water = 8,
    Glass = 9,
    Iron = 10,
}

/// Number of entries in the block table.
pub const VOXEL_COUNT: usize = 11;

impl Voxel {
    /// The compact storage representation of this block.
    pub fn id(self) -> VoxelId {
        self as VoxelId
    }

    /// Recovers a block from its storage representation. Unknown identifiers
    /// decay to `Air`.
    pub fn from_id(id: VoxelId) -> Self {
        num::FromPrimitive::from_u16(id).unwrap_or(Voxel::Air)
    }
}

/// Static properties for one block kind.
///
/// `texture_*` name tile indices in the block atlas; they are floats because
/// they travel to the GPU inside the vertex stream.
pub struct VoxelInfo {
    pub name: &'static str,
    pub is_solid: bool,
    pub is_transparent: bool,
    pub texture_top: f32,
    pub texture_bottom: f32,
    pub texture_sides: f32,
}

/// The block properties table, indexed by [`VoxelId`].
///
/// Texture indices 10..=41 are reserved for the animated water frames, which
/// is why `Glass` and `Iron` sit past them.
pub static VOXEL_INFO: [VoxelInfo; VOXEL_COUNT] = [
    VoxelInfo { name: "Air", is_solid: false, is_transparent: true, texture_top: 0.0, texture_bottom: 0.0, texture_sides: 0.0 },
    VoxelInfo { name: "Stone", is_solid: true, is_transparent: false, texture_top: 1.0, texture_bottom: 1.0, texture_sides: 1.0 },
    VoxelInfo { name: "Dirt", is_solid: true, is_transparent: false, texture_top: 2.0, texture_bottom: 2.0, texture_sides: 2.0 },
    VoxelInfo { name: "Grass", is_solid: true, is_transparent: false, texture_top: 3.0, texture_bottom: 2.0, texture_sides: 4.0 },
    VoxelInfo { name: "Cobblestone", is_solid: true, is_transparent: false, texture_top: 5.0, texture_bottom: 5.0, texture_sides: 5.0 },
    VoxelInfo { name: "Wood", is_solid: true, is_transparent: false, texture_top: 6.0, texture_bottom: 6.0, texture_sides: 7.0 },
    VoxelInfo { name: "Leaves", is_solid: true, is_transparent: true, texture_top: 8.0, texture_bottom: 8.0, texture_sides: 8.0 },
    VoxelInfo { name: "Sand", is_solid: true, is_transparent: false, texture_top: 9.0, texture_bottom: 9.0, texture_sides: 9.0 },
    VoxelInfo { name: "Water", is_solid: false, is_transparent: true, texture_top: 10.0, texture_bottom: 10.0, texture_sides: 10.0 },
    VoxelInfo { name: "Glass", is_solid: true, is_transparent: true, texture_top: 42.0, texture_bottom: 42.0, texture_sides: 42.0 },
    VoxelInfo { name: "Iron", is_solid: true, is_transparent: false, texture_top: 43.0, texture_bottom: 43.0, texture_sides: 43.0 },
];

/// Looks up the properties for a voxel identifier.
///
/// Out-of-range identifiers map to the `Air` entry so corrupted data can
/// never index past the table.
pub fn voxel_info(id: VoxelId) -> &'static VoxelInfo {
    VOXEL_INFO
        .get(id as usize)
        .unwrap_or(&VOXEL_INFO[Voxel::Air as usize])
}

/// Whether the voxel occupies its full cube.
pub fn is_solid(id: VoxelId) -> bool {
    (id as usize) < VOXEL_COUNT && VOXEL_INFO[id as usize].is_solid
}

/// Whether fragments behind the voxel may show through.
pub fn is_transparent(id: VoxelId) -> bool {
    (id as usize) >= VOXEL_COUNT || VOXEL_INFO[id as usize].is_transparent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip() {
        for id in 0..VOXEL_COUNT as VoxelId {
            assert_eq!(Voxel::from_id(id).id(), id);
        }
        assert_eq!(Voxel::from_id(999), Voxel::Air);
    }

    #[test]
    fn test_solidity_table() {
        assert!(!is_solid(Voxel::Air.id()));
        assert!(!is_solid(Voxel::Water.id()));
        assert!(is_solid(Voxel::Stone.id()));
        assert!(is_solid(Voxel::Leaves.id()));
        assert!(is_solid(Voxel::Glass.id()));
    }

    #[test]
    fn test_transparency_table() {
        assert!(is_transparent(Voxel::Air.id()));
        assert!(is_transparent(Voxel::Water.id()));
        assert!(is_transparent(Voxel::Leaves.id()));
        assert!(is_transparent(Voxel::Glass.id()));
        assert!(!is_transparent(Voxel::Stone.id()));
        assert!(!is_transparent(Voxel::Iron.id()));
        // Unknown ids are treated as transparent, matching the lookup rule
        // for out-of-range data.
        assert!(is_transparent(999));
    }

    #[test]
    fn test_grass_uses_distinct_face_textures() {
        let grass = voxel_info(Voxel::Grass.id());
        assert_eq!(grass.texture_top, 3.0);
        assert_eq!(grass.texture_bottom, 2.0);
        assert_eq!(grass.texture_sides, 4.0);
    }
}
