//! Error types for the jelly simulation.
//!
//! Initialization errors disable the instance. Steady-state ticking never
//! returns an error; it degrades for that tick and logs instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JellyError {
    /// The mesh source produced no vertices.
    #[error("mesh source has no vertices")]
    EmptyMesh,

    /// The mesh source could not provide its rest vertices.
    #[error("mesh source unreadable: {0}")]
    SourceUnreadable(String),

    /// The render collaborator has nothing to draw into.
    #[error("no renderable surface available")]
    NoRenderSurface,

    /// A vertex buffer of the wrong length was offered to a fixed-size store.
    #[error("vertex count mismatch: expected {expected}, got {actual}")]
    VertexCountMismatch { expected: usize, actual: usize },

    /// The integration job terminated without returning its buffers.
    #[error("integration job lost before join")]
    JobLost,

    /// The operation needs an initialized instance.
    #[error("simulation not initialized")]
    NotInitialized,

    #[error("simulation already torn down")]
    Disposed,

    #[error("config I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("config JSON: {0}")]
    Json(#[from] serde_json::Error),
}
