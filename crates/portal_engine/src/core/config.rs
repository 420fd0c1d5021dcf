//! # Unified Configuration System
//!
//! All tunable values of the portal renderer in one place: recursion limits,
//! camera, framebuffer, animation and engine-level settings. Every struct is
//! serde-serializable and carries builder-style setters and defaults that
//! reproduce the reference scene.
//!
//! ## Configuration Categories
//!
//! - **Portal Config**: recursion depth limit
//! - **Camera Config**: eye, target, field of view, clip range
//! - **Renderer Config**: framebuffer size, clear values, face culling
//! - **Animation Config**: tick step and oscillation parameters
//! - **Engine Config**: logging and frame count for the headless driver

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::render::MAX_MATRIX_STACK_DEPTH;

/// Default number of nested portal look-throughs per frame
pub const DEFAULT_MAX_PORTAL_DEPTH: u32 = 2;

/// Deepest nesting a frame can hold
///
/// Every look-through keeps one modelview entry pushed, the bottom entry is
/// never popped and the innermost node draw needs one more.
#[allow(clippy::cast_possible_truncation)]
pub const MAX_PORTAL_DEPTH: u32 = (MAX_MATRIX_STACK_DEPTH - 2) as u32;

/// # Portal Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Maximum nesting of portal look-throughs; 0 draws every portal flat
    pub max_depth: u32,
}

impl PortalConfig {
    /// Create a portal configuration with the default depth
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_PORTAL_DEPTH,
        }
    }

    /// Set the recursion limit
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Validate the configuration
    ///
    /// Nesting levels are encoded as `255 - depth` in an 8-bit stencil buffer,
    /// and each level holds a modelview stack entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth > 255 {
            return Err(ConfigError::Invalid(format!(
                "portal max_depth {} does not fit an 8-bit stencil buffer",
                self.max_depth
            )));
        }
        if self.max_depth > MAX_PORTAL_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "portal max_depth {} exceeds the matrix stack limit of {}",
                self.max_depth, MAX_PORTAL_DEPTH
            )));
        }
        Ok(())
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Camera Configuration
///
/// Perspective camera looking from `eye` at `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Eye position in world space
    pub eye: [f32; 3],
    /// Point the camera looks at
    pub target: [f32; 3],
    /// Up direction
    pub up: [f32; 3],
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
}

impl CameraConfig {
    /// Create the reference camera: 70 units out on +Z, looking at the origin
    pub fn new() -> Self {
        Self {
            eye: [0.0, 0.0, 70.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov_y_degrees: 30.0,
            near: 20.0,
            far: 120.0,
        }
    }

    /// Set eye and target
    pub fn with_eye_target(mut self, eye: [f32; 3], target: [f32; 3]) -> Self {
        self.eye = eye;
        self.target = target;
        self
    }

    /// Set the clip range
    pub fn with_clip_range(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Set the vertical field of view
    pub fn with_fov_y_degrees(mut self, fov: f32) -> Self {
        self.fov_y_degrees = fov;
        self
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(Vec3::from(self.eye), Vec3::from(self.target), Vec3::from(self.up))
    }

    /// View-to-clip matrix for the given aspect ratio
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective(utils::deg_to_rad(self.fov_y_degrees), aspect, self.near, self.far)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(ConfigError::Invalid(format!(
                "clip range must satisfy 0 < near < far, got {}..{}",
                self.near, self.far
            )));
        }
        if !(self.fov_y_degrees > 0.0 && self.fov_y_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "fov_y_degrees must be in (0, 180), got {}",
                self.fov_y_degrees
            )));
        }
        if Vec3::from(self.eye) == Vec3::from(self.target) {
            return Err(ConfigError::Invalid("camera eye and target coincide".to_string()));
        }
        Ok(())
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Renderer Configuration
///
/// Framebuffer and per-frame reset values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Framebuffer width in pixels
    pub width: u32,
    /// Framebuffer height in pixels
    pub height: u32,
    /// RGBA color the color buffer is cleared to
    pub clear_color: [f32; 4],
    /// Skip triangles facing away from the camera
    pub cull_back_faces: bool,
}

impl RendererConfig {
    /// Create a renderer configuration with the default framebuffer
    pub fn new() -> Self {
        Self {
            width: 320,
            height: 160,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            cull_back_faces: true,
        }
    }

    /// Set framebuffer size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the clear color
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Enable or disable back-face culling
    pub fn with_back_face_culling(mut self, enabled: bool) -> Self {
        self.cull_back_faces = enabled;
        self
    }

    /// Width over height
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid("framebuffer size must be non-zero".to_string()));
        }
        if self.width > 8192 || self.height > 8192 {
            return Err(ConfigError::Invalid(format!(
                "framebuffer {}x{} exceeds 8192x8192",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Animation Configuration
///
/// The animation target oscillates along world Z: each tick advances time by
/// `step`, time wraps to zero at `period`, and Z is `base + amplitude * time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Time added per tick
    pub step: f32,
    /// Time at which the animation wraps back to zero
    pub period: f32,
    /// Z coordinate at time zero
    pub base: f32,
    /// Z distance travelled per unit of time
    pub amplitude: f32,
    /// Interval between ticks in milliseconds, for drivers that pace themselves
    pub tick_interval_ms: u64,
}

impl AnimationConfig {
    /// Create the reference animation
    pub fn new() -> Self {
        Self {
            step: 0.01,
            period: 3.0,
            base: 3.0,
            amplitude: 2.0,
            tick_interval_ms: 10,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step > 0.0 && self.period > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "animation step and period must be positive, got {} and {}",
                self.step, self.period
            )));
        }
        Ok(())
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Engine Configuration
///
/// Settings for the frame driver loop itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Number of frames the headless driver renders before exiting
    pub frame_count: u32,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            frame_count: 120,
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the number of frames to render
    pub fn with_frame_count(mut self, frames: u32) -> Self {
        self.frame_count = frames;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all subsystems.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Engine loop configuration
    #[serde(default)]
    pub engine: EngineConfig,
    /// Portal recursion configuration
    #[serde(default)]
    pub portal: PortalConfig,
    /// Camera configuration
    #[serde(default)]
    pub camera: CameraConfig,
    /// Framebuffer configuration
    #[serde(default)]
    pub renderer: RendererConfig,
    /// Animation configuration
    #[serde(default)]
    pub animation: AnimationConfig,
}

impl ApplicationConfig {
    /// Create a new application configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the portal configuration
    pub fn with_portal(mut self, portal: PortalConfig) -> Self {
        self.portal = portal;
        self
    }

    /// Replace the camera configuration
    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    /// Replace the renderer configuration
    pub fn with_renderer(mut self, renderer: RendererConfig) -> Self {
        self.renderer = renderer;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.portal.validate()?;
        self.camera.validate()?;
        self.renderer.validate()?;
        self.animation.validate()?;
        Ok(())
    }
}

impl Config for ApplicationConfig {}
