//! Drawable capability

use crate::render::backend::{BackendResult, GraphicsBackend};

/// Something that can render its geometry into the current graphics state
///
/// A drawable knows nothing about the scene. It draws in model space under
/// whatever matrix and masking state the caller has set up on `backend`.
pub trait Drawable {
    /// Emit the geometry
    fn draw(&self, backend: &mut dyn GraphicsBackend) -> BackendResult<()>;

    /// Short name for log output
    fn label(&self) -> &str {
        "drawable"
    }
}
