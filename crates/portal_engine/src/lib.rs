//! # Portal Engine
//!
//! Recursive portal rendering with nothing but framebuffer masking: no
//! auxiliary render targets, only stencil, depth and color write control.
//!
//! ## Features
//!
//! - **Portal Scene Graph**: arena-backed nodes, one-way portal links validated by shape
//! - **Recursive Traversal**: view substitution through linked portals, bounded by depth
//! - **Stencil Masking**: each look-through is clipped to its portal's silhouette
//! - **Backends**: a CPU rasterizer with real buffers, and a recording backend
//! - **Configuration**: TOML/RON config files for camera, framebuffer and animation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use portal_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::default();
//!     let mut scene = Scene::new();
//!     let demo = build_demo_scene(&mut scene)?;
//!
//!     let mut renderer = SceneRenderer::from_config(&config);
//!     let mut backend = SoftwareBackend::new(config.renderer.width, config.renderer.height);
//!     let mut animator = OscillatingTranslation::new(demo.cube, &config.animation);
//!
//!     let stats = renderer.render_frame(&mut scene, demo.list, &mut backend, &mut animator)?;
//!     println!("{} portal look-throughs", stats.portal_recursions);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;

pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::Config,
        core::config::{AnimationConfig, ApplicationConfig, CameraConfig, PortalConfig, RendererConfig},
        foundation::{
            collections::{ListKey, MeshKey, NodeKey},
            math::{Mat4, Transform, Vec3},
        },
        render::{GraphicsBackend, Mesh, RecordingBackend, RenderError, SoftwareBackend},
        scene::{
            build_demo_scene, Animator, Drawable, FrameError, FrameStats, LinkError, OscillatingTranslation, Scene,
            SceneRenderer,
        },
    };
}
