//! # Noise Module
//!
//! Seeded deterministic noise fields and the spline type used by terrain
//! generation.
//!
//! Three named fractal fields shape the terrain: continentalness (large,
//! smooth land masses), erosion (how much material is carved away), and
//! peaks-and-valleys (mountain detail). All fields are pure functions of the
//! seed and the sample coordinates, so terrain can be evaluated from any
//! thread in any order and always agree.

use noise::{Fbm, MultiFractal, NoiseFn, Simplex};

/// One knot of a piecewise-linear spline.
#[derive(Clone, Copy, Debug)]
pub struct SplinePoint {
    /// Noise value.
    pub input: f32,
    /// Terrain height contribution.
    pub output: f32,
}

/// A piecewise-linear 1D function over sorted knots.
///
/// Evaluation clamps to the first/last output outside the knot range and
/// linearly interpolates between the two bracketing knots inside it.
#[derive(Clone, Debug)]
pub struct Spline {
    points: Vec<SplinePoint>,
}

impl Spline {
    /// Builds a spline from knots sorted by ascending input.
    ///
    /// # Panics
    /// Panics if fewer than two knots are supplied or the inputs are not
    /// strictly increasing.
    pub fn new(points: Vec<SplinePoint>) -> Self {
        assert!(points.len() >= 2, "spline needs at least two knots");
        assert!(
            points.windows(2).all(|w| w[0].input < w[1].input),
            "spline knots must be strictly increasing"
        );
        Self { points }
    }

    /// Evaluates the spline at `t`.
    pub fn evaluate(&self, t: f32) -> f32 {
        let first = self.points.first().unwrap();
        let last = self.points.last().unwrap();
        if t <= first.input {
            return first.output;
        }
        if t >= last.input {
            return last.output;
        }

        for window in self.points.windows(2) {
            let (a, b) = (window[0], window[1]);
            if t >= a.input && t <= b.input {
                let local_t = (t - a.input) / (b.input - a.input);
                return a.output + local_t * (b.output - a.output);
            }
        }
        unreachable!("spline input {t} not bracketed by sorted knots");
    }
}

/// Seeded noise generator bundling the base Simplex sampler, a general
/// fractal, and the three named terrain fields.
pub struct VoxelNoise {
    seed: u32,
    simplex: Simplex,
    fractal: Fbm<Simplex>,
    continental: Fbm<Simplex>,
    erosion: Fbm<Simplex>,
    peaks_and_valleys: Fbm<Simplex>,
}

impl VoxelNoise {
    /// Creates the noise fields for a world seed.
    pub fn new(seed: u32) -> Self {
        let fractal = Fbm::<Simplex>::new(seed)
            .set_octaves(4)
            .set_lacunarity(2.0)
            .set_persistence(0.5);

        // Large, smooth features.
        let continental = Fbm::<Simplex>::new(seed)
            .set_octaves(3)
            .set_lacunarity(1.5)
            .set_persistence(0.5);

        // Smaller, rougher features.
        let erosion = Fbm::<Simplex>::new(seed)
            .set_octaves(4)
            .set_lacunarity(2.0)
            .set_persistence(0.5);

        // Medium scale mountain detail.
        let peaks_and_valleys = Fbm::<Simplex>::new(seed)
            .set_octaves(4)
            .set_lacunarity(2.0)
            .set_persistence(0.5);

        Self {
            seed,
            simplex: Simplex::new(seed),
            fractal,
            continental,
            erosion,
            peaks_and_valleys,
        }
    }

    /// The seed these fields were built from.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Base Simplex noise in `[-1, 1]`.
    pub fn sample_2d(&self, x: f32, y: f32) -> f32 {
        self.simplex.get([x as f64, y as f64]) as f32
    }

    /// Base 3D Simplex noise in `[-1, 1]`.
    pub fn sample_3d(&self, x: f32, y: f32, z: f32) -> f32 {
        self.simplex.get([x as f64, y as f64, z as f64]) as f32
    }

    /// Four-octave fractal noise over the 2D Simplex field.
    pub fn fractal_2d(&self, x: f32, y: f32) -> f32 {
        self.fractal.get([x as f64, y as f64]) as f32
    }

    /// Four-octave fractal noise over the 3D Simplex field.
    pub fn fractal_3d(&self, x: f32, y: f32, z: f32) -> f32 {
        self.fractal.get([x as f64, y as f64, z as f64]) as f32
    }

    /// Continentalness field: 3 octaves, lacunarity 1.5, gain 0.5.
    pub fn continentalness(&self, x: f32, y: f32) -> f32 {
        self.continental.get([x as f64, y as f64]) as f32
    }

    /// Erosion field: 4 octaves, lacunarity 2.0, gain 0.5.
    pub fn erosion(&self, x: f32, y: f32) -> f32 {
        self.erosion.get([x as f64, y as f64]) as f32
    }

    /// Peaks-and-valleys field: 4 octaves, lacunarity 2.0, gain 0.5.
    pub fn peaks_and_valleys(&self, x: f32, y: f32) -> f32 {
        self.peaks_and_valleys.get([x as f64, y as f64]) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_spline() -> Spline {
        Spline::new(vec![
            SplinePoint { input: -1.0, output: 0.0 },
            SplinePoint { input: 0.0, output: 10.0 },
            SplinePoint { input: 1.0, output: 40.0 },
        ])
    }

    #[test]
    fn test_spline_clamps_outside_range() {
        let spline = test_spline();
        assert_eq!(spline.evaluate(-5.0), 0.0);
        assert_eq!(spline.evaluate(-1.0), 0.0);
        assert_eq!(spline.evaluate(1.0), 40.0);
        assert_eq!(spline.evaluate(7.0), 40.0);
    }

    #[test]
    fn test_spline_interpolates_between_knots() {
        let spline = test_spline();
        assert_eq!(spline.evaluate(0.0), 10.0);
        assert!((spline.evaluate(-0.5) - 5.0).abs() < 1e-6);
        assert!((spline.evaluate(0.5) - 25.0).abs() < 1e-6);
    }

    #[test]
    #[should_panic]
    fn test_spline_rejects_unsorted_knots() {
        Spline::new(vec![
            SplinePoint { input: 1.0, output: 0.0 },
            SplinePoint { input: 0.0, output: 1.0 },
        ]);
    }

    #[test]
    fn test_same_seed_same_samples() {
        let a = VoxelNoise::new(42);
        let b = VoxelNoise::new(42);
        for &(x, y) in &[(0.0, 0.0), (0.37, -1.2), (100.5, 8.25), (-55.0, 55.0)] {
            assert_eq!(a.sample_2d(x, y), b.sample_2d(x, y));
            assert_eq!(a.continentalness(x, y), b.continentalness(x, y));
            assert_eq!(a.erosion(x, y), b.erosion(x, y));
            assert_eq!(a.peaks_and_valleys(x, y), b.peaks_and_valleys(x, y));
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let a = VoxelNoise::new(1);
        let b = VoxelNoise::new(2);
        // A handful of samples; at least one must differ.
        let samples = [(0.3, 0.7), (5.5, -2.25), (-10.0, 4.0)];
        assert!(samples
            .iter()
            .any(|&(x, y)| a.continentalness(x, y) != b.continentalness(x, y)));
    }

    #[test]
    fn test_evaluation_order_does_not_matter() {
        let noise = VoxelNoise::new(7);
        let forward: Vec<f32> = (0..16).map(|i| noise.fractal_2d(i as f32 * 0.1, 0.0)).collect();
        let backward: Vec<f32> = (0..16)
            .rev()
            .map(|i| noise.fractal_2d(i as f32 * 0.1, 0.0))
            .collect();
        let backward_reversed: Vec<f32> = backward.into_iter().rev().collect();
        assert_eq!(forward, backward_reversed);
    }
}
