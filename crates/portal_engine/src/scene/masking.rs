//! Stencil masking protocol
//!
//! Recursion level `n` is stored in the stencil buffer as `255 - n`. The
//! frame starts with every pixel at 255 (level 0) and a read-only stencil.
//! A portal decrements the stencil under its silhouette, narrows the test to
//! its own level while the destination scene is drawn, and then replaces the
//! footprint with the outer level again while laying down the portal's depth.
//!
//! Every step here is a plain state change. Ordering lives in the traversal.

use crate::render::backend::{BackendResult, GraphicsBackend};
use crate::render::state::{BlendFactor, ClearFlags, StencilFunc, StencilOp};

/// Stencil value of the outermost level
pub const STENCIL_CLEAR: u8 = 255;

/// Stencil reference for recursion level `depth`
pub fn stencil_reference(depth: u32) -> u8 {
    u8::try_from(depth).map_or(0, |depth| STENCIL_CLEAR - depth)
}

/// Clear every buffer and put the pipeline in its top-level state
///
/// Also restores the write enables and blend factors, since an abandoned
/// frame may have stopped halfway through a silhouette. Clears are masked by
/// the stencil write mask, which the previous frame left at zero.
pub fn reset_frame(backend: &mut dyn GraphicsBackend, clear_color: [f32; 4]) -> BackendResult<()> {
    backend.set_clear_color(clear_color);
    backend.set_clear_stencil(STENCIL_CLEAR);
    backend.stencil_mask(0xFF);
    backend.depth_mask(true);
    backend.color_mask(true);
    backend.blend_func(BlendFactor::One, BlendFactor::Zero);
    backend.clear(ClearFlags::all())?;

    backend.stencil_func(StencilFunc::GreaterEqual, STENCIL_CLEAR, 0xFF);
    backend.stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Replace);
    backend.stencil_mask(0x00);
    Ok(())
}

/// Prepare to paint a black silhouette one level deeper, without touching depth
pub fn begin_silhouette(backend: &mut dyn GraphicsBackend) {
    backend.stencil_mask(0xFF);
    backend.stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Decrement);
    backend.depth_mask(false);
    backend.blend_func(BlendFactor::Zero, BlendFactor::Zero);
}

/// Back to the default write state after a silhouette
pub fn end_silhouette(backend: &mut dyn GraphicsBackend) {
    backend.blend_func(BlendFactor::One, BlendFactor::Zero);
    backend.depth_mask(true);
    backend.stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Replace);
    backend.stencil_mask(0x00);
}

/// Only pass pixels at recursion level `depth` or deeper
pub fn restrict_to_level(backend: &mut dyn GraphicsBackend, depth: u32) {
    backend.stencil_func(StencilFunc::GreaterEqual, stencil_reference(depth), 0xFF);
}

/// Prepare to seal a portal footprint: stencil and depth writes, no color
pub fn begin_cap(backend: &mut dyn GraphicsBackend) {
    backend.stencil_mask(0xFF);
    backend.color_mask(false);
}

/// Back to the default write state after a cap
pub fn end_cap(backend: &mut dyn GraphicsBackend) {
    backend.color_mask(true);
    backend.stencil_mask(0x00);
}
