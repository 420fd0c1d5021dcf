//! Recursive scene traversal
//!
//! Draws node lists under the current modelview matrix. Plain nodes and
//! flat portals push their transform, draw, and pop. A linked portal below
//! the depth limit instead re-renders its destination's whole list through a
//! substituted view, clipped to its own silhouette by the stencil protocol in
//! [`masking`](super::masking).
//!
//! Recursion state is a [`TraversalContext`] passed by `&mut` through every
//! call. It is saved before each recursive step and restored afterwards,
//! also when the step fails.

use crate::foundation::collections::{ListKey, NodeKey};
use crate::foundation::math::{format_matrix, portal_view, Mat4};
use crate::render::backend::{BackendResult, GraphicsBackend, MatrixScope};
use crate::scene::masking;
use crate::scene::scene_graph::{NodeKind, PortalLink, Scene, SceneNode};

/// Counters for one frame's traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Geometry draws of plain nodes and flat portals
    pub node_draws: u32,
    /// Portals that recursed into their destination's list
    pub portal_recursions: u32,
    /// Portals drawn as flat surfaces (depth limit, unlinked, singular)
    pub flat_portals: u32,
    /// Portals skipped because they were the destination being looked out of
    pub suppressed_portals: u32,
    /// Deepest recursion level entered
    pub max_depth_reached: u32,
}

/// Frame-scoped recursion state
#[derive(Debug, Clone)]
pub struct TraversalContext {
    depth: u32,
    suppressed: Option<NodeKey>,
    max_depth: u32,
    stats: FrameStats,
}

/// Recursion state saved across one portal step
#[derive(Debug, Clone, Copy)]
struct SavedLevel {
    depth: u32,
    suppressed: Option<NodeKey>,
}

impl TraversalContext {
    /// Top-level context with the given recursion limit
    pub fn new(max_depth: u32) -> Self {
        Self {
            depth: 0,
            suppressed: None,
            max_depth,
            stats: FrameStats::default(),
        }
    }

    /// Context already inside a portal, as seen while drawing its destination's list
    #[cfg(test)]
    pub(crate) fn at_level(max_depth: u32, depth: u32, suppressed: NodeKey) -> Self {
        Self {
            depth,
            suppressed: Some(suppressed),
            ..Self::new(max_depth)
        }
    }

    /// Current recursion level, 0 at the top
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Portal that must not be drawn at this level
    pub fn suppressed(&self) -> Option<NodeKey> {
        self.suppressed
    }

    /// Recursion limit
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Counters so far
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Consume the context, keeping its counters
    pub fn into_stats(self) -> FrameStats {
        self.stats
    }

    fn enter(&mut self, destination: NodeKey) -> SavedLevel {
        let saved = SavedLevel {
            depth: self.depth,
            suppressed: self.suppressed,
        };
        self.depth += 1;
        self.suppressed = Some(destination);
        self.stats.portal_recursions += 1;
        self.stats.max_depth_reached = self.stats.max_depth_reached.max(self.depth);
        saved
    }

    fn restore(&mut self, saved: SavedLevel) {
        self.depth = saved.depth;
        self.suppressed = saved.suppressed;
    }
}

/// Draw every node of `list` in insertion order
///
/// A key that no longer resolves draws nothing.
pub fn draw_list(
    scene: &Scene,
    list: ListKey,
    backend: &mut dyn GraphicsBackend,
    ctx: &mut TraversalContext,
) -> BackendResult<()> {
    let Some(nodes) = scene.list(list) else {
        log::warn!("Skipping missing scene list {:?}", list);
        return Ok(());
    };
    for &node in nodes {
        draw_node(scene, node, backend, ctx)?;
    }
    Ok(())
}

/// Draw one node, recursing through portals
pub fn draw_node(
    scene: &Scene,
    key: NodeKey,
    backend: &mut dyn GraphicsBackend,
    ctx: &mut TraversalContext,
) -> BackendResult<()> {
    let Some(node) = scene.node(key) else {
        log::warn!("Skipping missing node {:?}", key);
        return Ok(());
    };
    match node.kind() {
        NodeKind::Plain => {
            ctx.stats.node_draws += 1;
            draw_geometry(scene, node, backend)
        }
        NodeKind::Portal(link) => draw_portal(scene, key, node, link, backend, ctx),
    }
}

/// Push the node's transform, draw its drawable, pop
fn draw_geometry(scene: &Scene, node: &SceneNode, backend: &mut dyn GraphicsBackend) -> BackendResult<()> {
    let Some(drawable) = scene.mesh(node.mesh()) else {
        log::warn!("Node refers to missing mesh {:?}", node.mesh());
        return Ok(());
    };
    let mut scope = MatrixScope::push(backend)?;
    scope.mult_matrix(node.transform());
    drawable.draw(&mut *scope)
}

fn draw_flat(
    scene: &Scene,
    node: &SceneNode,
    backend: &mut dyn GraphicsBackend,
    ctx: &mut TraversalContext,
) -> BackendResult<()> {
    ctx.stats.flat_portals += 1;
    ctx.stats.node_draws += 1;
    draw_geometry(scene, node, backend)
}

fn draw_portal(
    scene: &Scene,
    key: NodeKey,
    node: &SceneNode,
    link: &PortalLink,
    backend: &mut dyn GraphicsBackend,
    ctx: &mut TraversalContext,
) -> BackendResult<()> {
    if ctx.suppressed == Some(key) {
        log::trace!("Portal {:?} suppressed at depth {}", key, ctx.depth);
        ctx.stats.suppressed_portals += 1;
        return Ok(());
    }

    if ctx.depth >= ctx.max_depth {
        log::trace!("Portal {:?} flat at depth limit {}", key, ctx.max_depth);
        return draw_flat(scene, node, backend, ctx);
    }

    let Some((destination_key, destination)) = link
        .destination
        .and_then(|d| scene.node(d).map(|node| (d, node)))
    else {
        log::trace!("Portal {:?} unlinked, drawing flat", key);
        return draw_flat(scene, node, backend, ctx);
    };
    let Some(destination_scene) = destination.portal_link().map(|l| l.scene) else {
        log::warn!("Portal {:?} leads to non-portal {:?}", key, destination_key);
        return draw_flat(scene, node, backend, ctx);
    };

    let Some(view) = portal_view(&backend.current_matrix(), node.transform(), destination.transform()) else {
        log::warn!("Portal {:?} destination transform is singular, drawing flat", key);
        return draw_flat(scene, node, backend, ctx);
    };
    log::trace!(
        "Portal {:?} -> {:?} at depth {}, view:\n{}",
        key,
        destination_key,
        ctx.depth,
        format_matrix(&view)
    );

    // Silhouette, one level deeper
    masking::begin_silhouette(backend);
    let silhouette = draw_geometry(scene, node, backend);
    masking::end_silhouette(backend);
    silhouette?;

    let saved = ctx.enter(destination_key);
    masking::restrict_to_level(backend, ctx.depth);
    let result = draw_through(scene, destination_scene, &view, backend, ctx);
    ctx.restore(saved);
    result?;
    masking::restrict_to_level(backend, ctx.depth);

    // Cap: seal the footprint at the portal plane
    masking::begin_cap(backend);
    let cap = draw_geometry(scene, node, backend);
    masking::end_cap(backend);
    cap
}

fn draw_through(
    scene: &Scene,
    list: ListKey,
    view: &Mat4,
    backend: &mut dyn GraphicsBackend,
    ctx: &mut TraversalContext,
) -> BackendResult<()> {
    let mut scope = MatrixScope::push(backend)?;
    scope.load_matrix(view);
    draw_list(scene, list, &mut *scope, ctx)
}
