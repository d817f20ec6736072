//! Error types for engine initialization and resource acquisition.

use thiserror::Error;

/// Errors that can occur while bringing the engine up.
///
/// Initialization failures are fatal and surface to the caller of
/// [`crate::run`]; steady-state failures (mesh timeouts, stale builds) are
/// logged and retried instead of being reported through this type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("window error: {0}")]
    Window(String),

    #[error("texture atlas error: {0}")]
    Atlas(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG decode error: {0}")]
    Png(#[from] png::DecodingError),
}
