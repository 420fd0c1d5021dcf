//! Scene Renderer - drives one frame of portal rendering
//!
//! Resets the framebuffer and the masking protocol, loads the camera, draws
//! the top-level list and then ticks the animator. A failed draw abandons
//! the frame; the next one starts from a full reset.

use thiserror::Error;

use crate::core::config::{ApplicationConfig, CameraConfig, PortalConfig, RendererConfig};
use crate::foundation::collections::ListKey;
use crate::foundation::math::Mat4;
use crate::render::backend::GraphicsBackend;
use crate::render::RenderError;
use crate::scene::animation::Animator;
use crate::scene::masking;
use crate::scene::scene_graph::Scene;
use crate::scene::traversal::{draw_list, FrameStats, TraversalContext};

/// Frame-level failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// The backend failed while drawing
    #[error("Frame abandoned: {0}")]
    Render(#[from] RenderError),

    /// The list to draw does not exist
    #[error("Top-level scene list {0:?} does not exist")]
    MissingList(ListKey),
}

/// Per-frame settings
#[derive(Debug, Clone)]
pub struct SceneRendererConfig {
    /// Recursion limit for portals
    pub max_portal_depth: u32,

    /// Color the frame is cleared to
    pub clear_color: [f32; 4],
}

impl Default for SceneRendererConfig {
    fn default() -> Self {
        Self::from_parts(&PortalConfig::default(), &RendererConfig::default())
    }
}

impl SceneRendererConfig {
    /// Pick the renderer settings out of the portal and renderer sections
    pub fn from_parts(portal: &PortalConfig, renderer: &RendererConfig) -> Self {
        Self {
            max_portal_depth: portal.max_depth,
            clear_color: renderer.clear_color,
        }
    }
}

/// Frame driver for a portal scene
pub struct SceneRenderer {
    config: SceneRendererConfig,
    camera: CameraConfig,
    view: Mat4,
    frame_count: u64,
}

impl SceneRenderer {
    /// Create a renderer with an explicit camera
    pub fn new(config: SceneRendererConfig, camera: CameraConfig) -> Self {
        let view = camera.view_matrix();
        Self {
            config,
            camera,
            view,
            frame_count: 0,
        }
    }

    /// Create a renderer from the application configuration
    pub fn from_config(config: &ApplicationConfig) -> Self {
        Self::new(
            SceneRendererConfig::from_parts(&config.portal, &config.renderer),
            config.camera.clone(),
        )
    }

    /// Current camera view matrix
    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    /// Override the camera view matrix
    pub fn set_view(&mut self, view: Mat4) {
        self.view = view;
    }

    /// Portal recursion limit
    pub fn max_portal_depth(&self) -> u32 {
        self.config.max_portal_depth
    }

    /// Change the portal recursion limit
    pub fn set_max_portal_depth(&mut self, depth: u32) {
        self.config.max_portal_depth = depth;
    }

    /// Frames started so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Draw one frame of `top` without advancing any animation
    pub fn draw_frame(
        &mut self,
        scene: &Scene,
        top: ListKey,
        backend: &mut dyn GraphicsBackend,
    ) -> Result<FrameStats, FrameError> {
        self.frame_count += 1;
        log::trace!("Begin frame {}", self.frame_count);

        if scene.list(top).is_none() {
            return Err(FrameError::MissingList(top));
        }

        masking::reset_frame(backend, self.config.clear_color)?;

        let (width, height) = backend.framebuffer_size();
        let aspect = if height == 0 { 1.0 } else { width as f32 / height as f32 };
        backend.set_projection(&self.camera.projection_matrix(aspect));
        backend.reset_matrix_stack();
        backend.load_matrix(&self.view);

        let mut ctx = TraversalContext::new(self.config.max_portal_depth);
        draw_list(scene, top, backend, &mut ctx)?;

        let stats = ctx.into_stats();
        log::debug!("Frame {} stats: {:?}", self.frame_count, stats);
        Ok(stats)
    }

    /// Draw one frame, then tick `animator` whether or not the draw succeeded
    pub fn render_frame(
        &mut self,
        scene: &mut Scene,
        top: ListKey,
        backend: &mut dyn GraphicsBackend,
        animator: &mut dyn Animator,
    ) -> Result<FrameStats, FrameError> {
        let result = self.draw_frame(scene, top, backend);
        animator.advance(scene);
        result
    }
}
