//! # Voxels Module
//!
//! Everything that defines the world's contents: the block table, axis
//! directions, deterministic noise and terrain generation, chunk storage,
//! and the streaming world store.

pub mod block;
pub mod chunk;
pub mod direction;
pub mod noise;
pub mod terrain;
pub mod world;

pub use block::{Voxel, VoxelId};
pub use chunk::{Chunk, CHUNK_HEIGHT, CHUNK_SIZE, CHUNK_VOLUME};
pub use direction::Direction;
pub use terrain::{TerrainGenerator, WATER_LEVEL};
pub use world::{World, MAX_CHUNK_Y};
