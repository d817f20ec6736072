//! # Meshing Module
//!
//! The background mesh pipeline: the vertex format, the snapshot-based mesh
//! builder, and the worker pool that feeds the main thread's GPU uploads.

pub mod chunk_mesh;
pub mod vertex;
pub mod worker_pool;

pub use chunk_mesh::{build_mesh, GpuMesh, MeshData, MeshInput};
pub use vertex::VoxelVertex;
pub use worker_pool::{
    BuiltMesh, MeshJob, MeshWorkerPool, MESH_ENQUEUES_PER_FRAME, MESH_QUEUE_LIMIT,
};
