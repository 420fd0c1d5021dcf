//! Portal scene management
//!
//! Scene graph, recursive traversal and the frame driver. Following the
//! stencil portal technique: a portal paints its silhouette into the stencil
//! buffer one level deeper, the linked destination's scene is drawn through
//! it under a substituted view, and the footprint is sealed again at the
//! portal plane.
//!
//! ## Architecture
//!
//! ```text
//! SceneRenderer (frame reset, camera, animator tick)
//!      ↓
//! traversal::draw_list (plain nodes, portals, recursion state)
//!      ↓
//! masking (stencil/depth/color state per step)
//!      ↓
//! GraphicsBackend
//! ```

mod animation;
mod demo;
mod drawable;
mod scene_graph;
mod scene_renderer;

pub mod masking;
pub mod traversal;

#[cfg(test)]
mod tests;

pub use animation::{Animator, AxisRotation, OscillatingTranslation, Still};
pub use demo::{build_demo_scene, portal1_transform, portal2_transform, DemoError, DemoScene, SQUARE_COLOR};
pub use drawable::Drawable;
pub use scene_graph::{LinkError, NodeKind, PortalLink, Scene, SceneError, SceneNode};
pub use scene_renderer::{FrameError, SceneRenderer, SceneRendererConfig};
pub use traversal::{draw_list, draw_node, FrameStats, TraversalContext};
