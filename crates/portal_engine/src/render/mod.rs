//! # Rendering System
//!
//! Immediate-mode graphics abstraction for the portal renderer.
//!
//! ## Architecture
//!
//! - **Backend trait**: [`GraphicsBackend`], the fixed-function surface the
//!   scene traversal is written against
//! - **Pipeline state**: stencil, depth, color and blend state shared by all
//!   backends
//! - **Backends**: a CPU rasterizer ([`SoftwareBackend`]) that produces real
//!   pixels, and a [`RecordingBackend`] that logs every call for inspection
//! - **Resources**: [`Mesh`] geometry with flat per-face colors

use thiserror::Error;

pub mod backend;
pub mod mesh;
pub mod recording;
pub mod software;
pub mod state;

pub use backend::{BackendResult, GraphicsBackend, MatrixScope, MatrixStack, MAX_MATRIX_STACK_DEPTH};
pub use mesh::{Mesh, Vertex, CUBE_FACE_COLORS};
pub use recording::{BackendCommand, RecordingBackend};
pub use software::{RasterStats, SoftwareBackend};
pub use state::{BlendFactor, ClearFlags, PipelineState, StencilFunc, StencilOp, StencilState};

/// Rendering system errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The graphics context went away; nothing drawn after this is kept
    #[error("Graphics context lost: {0}")]
    ContextLost(String),

    /// A push would exceed the backend's matrix stack
    #[error("Matrix stack overflow at depth {0}")]
    MatrixStackOverflow(usize),

    /// Geometry handed to the backend is malformed
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// A draw call failed inside the backend
    ///
    /// Aborts the current frame. The next frame starts from a full reset, so
    /// there is no partial-frame recovery.
    #[error("Draw failed: {0}")]
    DrawFailed(String),
}
