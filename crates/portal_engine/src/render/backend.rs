//! # Render Backend Abstraction
//!
//! This module defines the immediate-mode graphics interface the portal
//! traversal is written against. It mirrors the fixed-function model: a
//! modelview matrix stack, buffer clears, stencil/depth/color write control
//! and indexed triangle draws under the current matrix.
//!
//! ## Design Goals
//!
//! - **API Agnostic**: the scene graph never names a concrete backend
//! - **Stateful**: backends own their pipeline state and matrix stack
//! - **Error Propagation**: anything that can lose the context returns
//!   [`BackendResult`]; pure state setters cannot fail

use std::ops::{Deref, DerefMut};

use crate::foundation::math::Mat4;
use crate::render::mesh::Vertex;
use crate::render::state::{BlendFactor, ClearFlags, PipelineState, StencilFunc, StencilOp};
use crate::render::RenderError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Deepest modelview stack a backend accepts
pub const MAX_MATRIX_STACK_DEPTH: usize = 64;

/// # Graphics Backend Trait
///
/// Defines the interface that all graphics backends must implement.
///
/// ## Implementation Notes
///
/// Vertices handed to [`GraphicsBackend::draw_indexed`] are in model space;
/// the backend composes them with the top of the matrix stack and its
/// projection. Stencil, depth and blend behaviour must follow
/// [`PipelineState`] exactly so the masking protocol is backend independent.
pub trait GraphicsBackend {
    /// Framebuffer dimensions as (width, height) in pixels
    fn framebuffer_size(&self) -> (u32, u32);

    /// Color used by subsequent color clears
    fn set_clear_color(&mut self, color: [f32; 4]);

    /// Value used by subsequent stencil clears
    fn set_clear_stencil(&mut self, value: u8);

    /// Clear the selected buffers (depth clears to the far plane)
    fn clear(&mut self, buffers: ClearFlags) -> BackendResult<()>;

    /// Replace the projection matrix
    fn set_projection(&mut self, projection: &Mat4);

    /// Drop every pushed matrix and load identity
    fn reset_matrix_stack(&mut self);

    /// Duplicate the top of the modelview stack
    fn push_matrix(&mut self) -> BackendResult<()>;

    /// Discard the top of the modelview stack; the bottom entry is never popped
    fn pop_matrix(&mut self);

    /// Replace the top of the modelview stack
    fn load_matrix(&mut self, matrix: &Mat4);

    /// Post-multiply the top of the modelview stack
    fn mult_matrix(&mut self, matrix: &Mat4);

    /// Top of the modelview stack
    fn current_matrix(&self) -> Mat4;

    /// Number of entries on the modelview stack (1 when nothing is pushed)
    fn matrix_stack_depth(&self) -> usize;

    /// Stencil comparison function, reference value and read mask
    fn stencil_func(&mut self, func: StencilFunc, reference: u8, mask: u8);

    /// Stencil updates for stencil-fail, depth-fail and depth-pass
    fn stencil_op(&mut self, stencil_fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp);

    /// Bits of the stencil buffer that updates may write
    fn stencil_mask(&mut self, mask: u8);

    /// Enable or disable depth buffer writes
    fn depth_mask(&mut self, enabled: bool);

    /// Enable or disable color buffer writes
    fn color_mask(&mut self, enabled: bool);

    /// Source and destination blend factors
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);

    /// Current raster state
    fn pipeline_state(&self) -> PipelineState;

    /// Draw indexed triangles under the current matrix and pipeline state
    fn draw_indexed(&mut self, vertices: &[Vertex], indices: &[u32]) -> BackendResult<()>;
}

/// Modelview stack shared by the backends in this crate
#[derive(Debug, Clone)]
pub struct MatrixStack {
    stack: Vec<Mat4>,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixStack {
    /// Stack holding only identity
    pub fn new() -> Self {
        Self {
            stack: vec![Mat4::identity()],
        }
    }

    /// Back to a single identity entry
    pub fn reset(&mut self) {
        self.stack.clear();
        self.stack.push(Mat4::identity());
    }

    /// Duplicate the top entry
    pub fn push(&mut self) -> BackendResult<()> {
        if self.stack.len() >= MAX_MATRIX_STACK_DEPTH {
            return Err(RenderError::MatrixStackOverflow(self.stack.len()));
        }
        let top = self.top();
        self.stack.push(top);
        Ok(())
    }

    /// Discard the top entry, keeping the bottom one
    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        } else {
            log::warn!("Matrix stack underflow ignored");
        }
    }

    /// Replace the top entry
    pub fn load(&mut self, matrix: &Mat4) {
        if let Some(top) = self.stack.last_mut() {
            *top = *matrix;
        }
    }

    /// Post-multiply the top entry
    pub fn mult(&mut self, matrix: &Mat4) {
        if let Some(top) = self.stack.last_mut() {
            *top *= matrix;
        }
    }

    /// Current top entry
    pub fn top(&self) -> Mat4 {
        self.stack.last().copied().unwrap_or_else(Mat4::identity)
    }

    /// Number of entries
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Pushed modelview matrix that is popped again when the scope ends
///
/// The pop happens on every exit path, including `?` returns out of the
/// scope, so callers cannot leave the stack unbalanced.
pub struct MatrixScope<'a> {
    backend: &'a mut dyn GraphicsBackend,
}

impl<'a> MatrixScope<'a> {
    /// Push the current matrix and open a scope over `backend`
    pub fn push(backend: &'a mut dyn GraphicsBackend) -> BackendResult<Self> {
        backend.push_matrix()?;
        Ok(Self { backend })
    }
}

impl<'a> Deref for MatrixScope<'a> {
    type Target = dyn GraphicsBackend + 'a;

    fn deref(&self) -> &Self::Target {
        self.backend
    }
}

impl<'a> DerefMut for MatrixScope<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.backend
    }
}

impl Drop for MatrixScope<'_> {
    fn drop(&mut self) {
        self.backend.pop_matrix();
    }
}
