//! Recording backend
//!
//! Headless [`GraphicsBackend`] that rasterizes nothing. Every call is
//! appended to a command log, the matrix stack and pipeline state are tracked
//! for real, and a failure can be injected on a chosen draw call. Used to
//! inspect the exact masking sequence a traversal emits and to exercise the
//! abandoned-frame path.

use crate::foundation::math::Mat4;
use crate::render::backend::{BackendResult, GraphicsBackend, MatrixStack};
use crate::render::mesh::Vertex;
use crate::render::state::{BlendFactor, ClearFlags, PipelineState, StencilFunc, StencilOp};
use crate::render::RenderError;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// `set_clear_color`
    SetClearColor([f32; 4]),
    /// `set_clear_stencil`
    SetClearStencil(u8),
    /// `clear`
    Clear(ClearFlags),
    /// `set_projection`
    SetProjection(Mat4),
    /// `reset_matrix_stack`
    ResetMatrixStack,
    /// `push_matrix`
    PushMatrix,
    /// `pop_matrix`
    PopMatrix,
    /// `load_matrix`
    LoadMatrix(Mat4),
    /// `mult_matrix`
    MultMatrix(Mat4),
    /// `stencil_func`
    StencilFunc {
        /// Comparison
        func: StencilFunc,
        /// Reference value
        reference: u8,
        /// Read mask
        mask: u8,
    },
    /// `stencil_op`
    StencilOp {
        /// Stencil-fail update
        stencil_fail: StencilOp,
        /// Depth-fail update
        depth_fail: StencilOp,
        /// Depth-pass update
        depth_pass: StencilOp,
    },
    /// `stencil_mask`
    StencilMask(u8),
    /// `depth_mask`
    DepthMask(bool),
    /// `color_mask`
    ColorMask(bool),
    /// `blend_func`
    BlendFunc(BlendFactor, BlendFactor),
    /// `draw_indexed`, with the state it ran under
    Draw {
        /// Modelview matrix at the time of the call
        matrix: Mat4,
        /// Pipeline state at the time of the call
        state: PipelineState,
        /// Triangles submitted
        triangles: usize,
    },
}

/// Backend that records calls instead of drawing
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    width: u32,
    height: u32,
    commands: Vec<BackendCommand>,
    matrices: MatrixStack,
    state: PipelineState,
    draw_calls: usize,
    failure: Option<(usize, RenderError)>,
}

impl RecordingBackend {
    /// Create a recorder that reports a `width` x `height` framebuffer
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
            matrices: MatrixStack::new(),
            state: PipelineState::default(),
            draw_calls: 0,
            failure: None,
        }
    }

    /// Make the `nth` draw call (1-based, counted over the recorder's lifetime) fail
    pub fn fail_on_draw(&mut self, nth: usize) {
        self.failure = Some((nth, RenderError::DrawFailed(format!("injected failure on draw {nth}"))));
    }

    /// Make the `nth` draw call report a lost context instead
    pub fn lose_context_on_draw(&mut self, nth: usize) {
        self.failure = Some((nth, RenderError::ContextLost(format!("context lost on draw {nth}"))));
    }

    /// Recorded calls, oldest first
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Forget recorded calls; state and draw count are kept
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Draw calls attempted so far, including a failed one
    pub fn draw_count(&self) -> usize {
        self.draw_calls
    }

    /// Matrices of every recorded draw, in order
    pub fn draw_matrices(&self) -> Vec<Mat4> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                BackendCommand::Draw { matrix, .. } => Some(*matrix),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, command: BackendCommand) {
        self.commands.push(command);
    }
}

impl GraphicsBackend for RecordingBackend {
    fn framebuffer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        self.record(BackendCommand::SetClearColor(color));
    }

    fn set_clear_stencil(&mut self, value: u8) {
        self.record(BackendCommand::SetClearStencil(value));
    }

    fn clear(&mut self, buffers: ClearFlags) -> BackendResult<()> {
        self.record(BackendCommand::Clear(buffers));
        Ok(())
    }

    fn set_projection(&mut self, projection: &Mat4) {
        self.record(BackendCommand::SetProjection(*projection));
    }

    fn reset_matrix_stack(&mut self) {
        self.matrices.reset();
        self.record(BackendCommand::ResetMatrixStack);
    }

    fn push_matrix(&mut self) -> BackendResult<()> {
        self.matrices.push()?;
        self.record(BackendCommand::PushMatrix);
        Ok(())
    }

    fn pop_matrix(&mut self) {
        self.matrices.pop();
        self.record(BackendCommand::PopMatrix);
    }

    fn load_matrix(&mut self, matrix: &Mat4) {
        self.matrices.load(matrix);
        self.record(BackendCommand::LoadMatrix(*matrix));
    }

    fn mult_matrix(&mut self, matrix: &Mat4) {
        self.matrices.mult(matrix);
        self.record(BackendCommand::MultMatrix(*matrix));
    }

    fn current_matrix(&self) -> Mat4 {
        self.matrices.top()
    }

    fn matrix_stack_depth(&self) -> usize {
        self.matrices.depth()
    }

    fn stencil_func(&mut self, func: StencilFunc, reference: u8, mask: u8) {
        self.state.stencil.func = func;
        self.state.stencil.reference = reference;
        self.state.stencil.read_mask = mask;
        self.record(BackendCommand::StencilFunc { func, reference, mask });
    }

    fn stencil_op(&mut self, stencil_fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp) {
        self.state.stencil.stencil_fail = stencil_fail;
        self.state.stencil.depth_fail = depth_fail;
        self.state.stencil.depth_pass = depth_pass;
        self.record(BackendCommand::StencilOp {
            stencil_fail,
            depth_fail,
            depth_pass,
        });
    }

    fn stencil_mask(&mut self, mask: u8) {
        self.state.stencil.write_mask = mask;
        self.record(BackendCommand::StencilMask(mask));
    }

    fn depth_mask(&mut self, enabled: bool) {
        self.state.depth_write = enabled;
        self.record(BackendCommand::DepthMask(enabled));
    }

    fn color_mask(&mut self, enabled: bool) {
        self.state.color_write = enabled;
        self.record(BackendCommand::ColorMask(enabled));
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.state.blend_src = src;
        self.state.blend_dst = dst;
        self.record(BackendCommand::BlendFunc(src, dst));
    }

    fn pipeline_state(&self) -> PipelineState {
        self.state
    }

    fn draw_indexed(&mut self, _vertices: &[Vertex], indices: &[u32]) -> BackendResult<()> {
        self.draw_calls += 1;
        if let Some((_, error)) = self.failure.as_ref().filter(|(nth, _)| *nth == self.draw_calls) {
            log::debug!("Injected failure on draw call {}: {}", self.draw_calls, error);
            return Err(error.clone());
        }
        self.record(BackendCommand::Draw {
            matrix: self.matrices.top(),
            state: self.state,
            triangles: indices.len() / 3,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::mesh::Mesh;
    use crate::scene::Drawable;

    #[test]
    fn test_records_state_with_each_draw() {
        let mut backend = RecordingBackend::new(8, 8);
        backend.color_mask(false);
        Mesh::unit_square([1.0; 3]).draw(&mut backend).unwrap();

        assert_eq!(backend.draw_count(), 1);
        match backend.commands().last() {
            Some(BackendCommand::Draw { state, triangles, .. }) => {
                assert!(!state.color_write);
                assert_eq!(*triangles, 2);
            }
            other => panic!("expected a draw, got {other:?}"),
        }
    }

    #[test]
    fn test_injected_failure_hits_only_the_nth_draw() {
        let mut backend = RecordingBackend::new(8, 8);
        backend.fail_on_draw(2);
        let square = Mesh::unit_square([1.0; 3]);

        assert!(square.draw(&mut backend).is_ok());
        assert!(matches!(square.draw(&mut backend), Err(RenderError::DrawFailed(_))));
        assert!(square.draw(&mut backend).is_ok());
        assert_eq!(backend.draw_count(), 3);
        assert_eq!(backend.draw_matrices().len(), 2);
    }
}
