//! Engine configuration.
//!
//! All options can be overridden from the environment so the engine can be
//! tuned without a rebuild:
//!
//! * `CUBEWORLD_SEED` - world seed (u32)
//! * `CUBEWORLD_RENDER_DISTANCE` - streaming radius in chunk units
//! * `CUBEWORLD_WORKERS` - mesh worker thread count
//! * `CUBEWORLD_WATER_FPS` - water animation rate in frames per second

use std::str::FromStr;

/// Runtime configuration for the engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Seed driving all terrain noise fields.
    pub world_seed: u32,
    /// Streaming radius in chunk units.
    pub render_distance: i32,
    /// Number of background mesh worker threads.
    pub worker_threads: usize,
    /// Water animation rate, in atlas frames per second.
    pub water_frames_per_second: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_seed: 12345,
            render_distance: 8,
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            water_frames_per_second: 16.0,
        }
    }
}

impl EngineConfig {
    /// Builds a configuration from the defaults plus any environment
    /// overrides.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            world_seed: env_or("CUBEWORLD_SEED", defaults.world_seed),
            render_distance: env_or("CUBEWORLD_RENDER_DISTANCE", defaults.render_distance)
                .max(1),
            worker_threads: env_or("CUBEWORLD_WORKERS", defaults.worker_threads).max(1),
            water_frames_per_second: env_or(
                "CUBEWORLD_WATER_FPS",
                defaults.water_frames_per_second,
            ),
        }
    }
}

fn env_or<T: FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            log::warn!("ignoring unparsable {name}={value:?}");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.world_seed, 12345);
        assert_eq!(config.render_distance, 8);
        assert!(config.worker_threads >= 1);
        assert_eq!(config.water_frames_per_second, 16.0);
    }
}
