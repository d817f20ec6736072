//! # Terrain Generation
//!
//! Pure, seed-driven mapping from world coordinates to column heights and
//! block kinds. The generator holds no mutable state, so chunks can be
//! generated on any thread in any order with identical results.

use super::block::{Voxel, VoxelId};
use super::noise::{Spline, SplinePoint, VoxelNoise};

/// World height at and below which open columns fill with water.
pub const WATER_LEVEL: i32 = 55;

/// Horizontal scale applied to world coordinates before sampling the noise
/// fields.
const NOISE_SCALE: f32 = 0.005;

/// Erosion threshold below which the peaks-and-valleys field contributes
/// mountains.
const MOUNTAIN_EROSION_CUTOFF: f32 = 0.3;

/// Deterministic terrain function for one world seed.
pub struct TerrainGenerator {
    noise: VoxelNoise,
    continental_spline: Spline,
    erosion_spline: Spline,
}

impl TerrainGenerator {
    /// Creates the terrain function for a seed.
    pub fn new(seed: u32) -> Self {
        let continental_spline = Spline::new(vec![
            SplinePoint { input: -1.0, output: 30.0 },
            SplinePoint { input: -0.5, output: 50.0 },
            SplinePoint { input: 0.0, output: 80.0 },
            SplinePoint { input: 0.3, output: 100.0 },
            SplinePoint { input: 0.6, output: 130.0 },
            SplinePoint { input: 1.0, output: 160.0 },
        ]);
        let erosion_spline = Spline::new(vec![
            SplinePoint { input: -1.0, output: 0.0 },
            SplinePoint { input: 0.0, output: 10.0 },
            SplinePoint { input: 0.5, output: 25.0 },
            SplinePoint { input: 1.0, output: 40.0 },
        ]);

        Self {
            noise: VoxelNoise::new(seed),
            continental_spline,
            erosion_spline,
        }
    }

    /// The seed this generator was built from.
    pub fn seed(&self) -> u32 {
        self.noise.seed()
    }

    /// Ground height of the column at `(world_x, world_z)`.
    pub fn column_height(&self, world_x: i32, world_z: i32) -> i32 {
        let nx = world_x as f32 * NOISE_SCALE;
        let nz = world_z as f32 * NOISE_SCALE;

        let continentalness = self.noise.continentalness(nx, nz).clamp(-1.0, 1.0);
        let erosion = self.noise.erosion(nx, nz).clamp(-1.0, 1.0);
        // Peaks-and-valleys only matters below the erosion cutoff; skip the
        // extra field evaluation elsewhere.
        let peaks = if erosion < MOUNTAIN_EROSION_CUTOFF {
            self.noise.peaks_and_valleys(nx, nz).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        self.height_from_fields(continentalness, erosion, peaks)
    }

    /// Combines already-sampled field values into a column height.
    ///
    /// Split out from [`Self::column_height`] so the spline pipeline can be
    /// exercised with exact field values: all-zero fields must produce
    /// `80 - 10 = 70`.
    pub fn height_from_fields(&self, continentalness: f32, erosion: f32, peaks: f32) -> i32 {
        let base_height = self.continental_spline.evaluate(continentalness);
        let erosion_effect = self.erosion_spline.evaluate(erosion);
        let mut height = base_height - erosion_effect;

        if erosion < MOUNTAIN_EROSION_CUTOFF {
            let mountain = (peaks - erosion).max(0.0);
            // m * m * sqrt(m) approximates m^2.5 without a pow() call.
            height += mountain * mountain * mountain.sqrt() * 50.0;
        }

        height.floor() as i32
    }

    /// Block occupying `(world_x, world_y, world_z)`.
    pub fn voxel_at(&self, world_x: i32, world_y: i32, world_z: i32) -> VoxelId {
        Self::voxel_for_height(self.column_height(world_x, world_z), world_y)
    }

    /// The block rule: given a column height, which block sits at `world_y`.
    pub fn voxel_for_height(height: i32, world_y: i32) -> VoxelId {
        if world_y < height - 3 {
            Voxel::Stone.id()
        } else if world_y < height - 1 {
            Voxel::Dirt.id()
        } else if world_y < height {
            Voxel::Grass.id()
        } else if world_y <= WATER_LEVEL {
            Voxel::Water.id()
        } else {
            Voxel::Air.id()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_column_height() {
        // With all noise fields at zero the splines alone decide the height:
        // continental(0) - erosion(0) = 80 - 10 = 70.
        let terrain = TerrainGenerator::new(0);
        assert_eq!(terrain.height_from_fields(0.0, 0.0, 0.0), 70);
    }

    #[test]
    fn test_spline_endpoints() {
        let terrain = TerrainGenerator::new(0);
        // Lowest continents, no erosion relief: 30 - 0, plus the full
        // mountain term for p = 1, e = -1: m = 2, 2*2*sqrt(2)*50.
        let mountain = 2.0f32 * 2.0 * 2.0f32.sqrt() * 50.0;
        assert_eq!(
            terrain.height_from_fields(-1.0, -1.0, 1.0),
            (30.0 + mountain).floor() as i32
        );
        // Highest continents, max erosion: 160 - 40, no mountain term.
        assert_eq!(terrain.height_from_fields(1.0, 1.0, 1.0), 120);
    }

    #[test]
    fn test_mountain_term_gated_by_erosion() {
        let terrain = TerrainGenerator::new(0);
        // At the cutoff the peaks value must not contribute.
        let at_cutoff = terrain.height_from_fields(0.0, 0.3, 1.0);
        let without_peaks = terrain.height_from_fields(0.0, 0.3, 0.0);
        assert_eq!(at_cutoff, without_peaks);
        // Just below the cutoff it must.
        let below_cutoff = terrain.height_from_fields(0.0, 0.29, 1.0);
        assert!(below_cutoff > terrain.height_from_fields(0.0, 0.29, 0.0));
    }

    #[test]
    fn test_block_rule_layers() {
        let height = 60;
        assert_eq!(TerrainGenerator::voxel_for_height(height, 40), Voxel::Stone.id());
        assert_eq!(TerrainGenerator::voxel_for_height(height, 56), Voxel::Stone.id());
        assert_eq!(TerrainGenerator::voxel_for_height(height, 57), Voxel::Dirt.id());
        assert_eq!(TerrainGenerator::voxel_for_height(height, 58), Voxel::Dirt.id());
        assert_eq!(TerrainGenerator::voxel_for_height(height, 59), Voxel::Grass.id());
        assert_eq!(TerrainGenerator::voxel_for_height(height, 60), Voxel::Air.id());
    }

    #[test]
    fn test_block_rule_water_fills_to_water_level() {
        let height = 40;
        assert_eq!(TerrainGenerator::voxel_for_height(height, 40), Voxel::Water.id());
        assert_eq!(
            TerrainGenerator::voxel_for_height(height, WATER_LEVEL),
            Voxel::Water.id()
        );
        assert_eq!(
            TerrainGenerator::voxel_for_height(height, WATER_LEVEL + 1),
            Voxel::Air.id()
        );
    }

    #[test]
    fn test_determinism_across_instances() {
        let a = TerrainGenerator::new(9001);
        let b = TerrainGenerator::new(9001);
        for x in [-64, -1, 0, 17, 512] {
            for z in [-32, 0, 5, 1000] {
                assert_eq!(a.column_height(x, z), b.column_height(x, z));
            }
        }
    }

    #[test]
    fn test_seed_changes_terrain() {
        let a = TerrainGenerator::new(1);
        let b = TerrainGenerator::new(2);
        let samples: Vec<(i32, i32)> =
            (0..8).map(|i| (i * 137, i * 71 - 200)).collect();
        assert!(samples
            .iter()
            .any(|&(x, z)| a.column_height(x, z) != b.column_height(x, z)));
    }
}
