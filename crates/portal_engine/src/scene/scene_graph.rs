//! Portal scene graph
//!
//! A [`Scene`] owns three arenas: drawables, nodes and ordered node lists.
//! Nodes are either plain geometry or portals. A portal stores the key of
//! the list it belongs to and, once linked, the key of its destination
//! portal; it never borrows either, so removing a list can never leave a
//! dangling reference behind, only a key that no longer resolves.

use thiserror::Error;

use crate::foundation::collections::{ListKey, MeshKey, NodeKey, SlotMap};
use crate::foundation::math::Mat4;
use crate::scene::Drawable;

/// Portal linking failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// A key does not resolve to a node
    #[error("Portal {0:?} does not exist")]
    MissingPortal(NodeKey),

    /// A node on either side of the link is not a portal
    #[error("Node {0:?} is not a portal")]
    NotAPortal(NodeKey),

    /// Portal and destination draw different shapes
    #[error("Portal {portal:?} and destination {destination:?} use different meshes")]
    ShapeMismatch {
        /// Portal being linked
        portal: NodeKey,
        /// Requested destination
        destination: NodeKey,
    },
}

/// Scene construction failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    /// List key does not resolve
    #[error("Scene list {0:?} does not exist")]
    MissingList(ListKey),

    /// Mesh key does not resolve
    #[error("Mesh {0:?} does not exist")]
    MissingMesh(MeshKey),

    /// Node key does not resolve
    #[error("Node {0:?} does not exist")]
    MissingNode(NodeKey),
}

/// Where a portal leads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalLink {
    /// Linked destination portal; `None` draws the portal as a flat surface
    pub destination: Option<NodeKey>,

    /// List this portal belongs to, drawn in full when looking through a portal
    /// that has this one as its destination
    pub scene: ListKey,
}

/// Node variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Ordinary geometry
    Plain,
    /// Window into the scene around another portal
    Portal(PortalLink),
}

/// Drawable paired with a model-to-world transform
#[derive(Debug, Clone)]
pub struct SceneNode {
    transform: Mat4,
    mesh: MeshKey,
    kind: NodeKind,
}

impl SceneNode {
    /// Model-to-world transform
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// Replace the model-to-world transform
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    /// Drawable this node renders
    pub fn mesh(&self) -> MeshKey {
        self.mesh
    }

    /// Plain or portal
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Whether this node is a portal
    pub fn is_portal(&self) -> bool {
        matches!(self.kind, NodeKind::Portal(_))
    }

    /// Portal link, if this node is a portal
    pub fn portal_link(&self) -> Option<&PortalLink> {
        match &self.kind {
            NodeKind::Portal(link) => Some(link),
            NodeKind::Plain => None,
        }
    }

    /// Linked destination, if this node is a linked portal
    pub fn destination(&self) -> Option<NodeKey> {
        self.portal_link().and_then(|link| link.destination)
    }
}

/// Arena-backed scene of drawables, nodes and ordered lists
#[derive(Default)]
pub struct Scene {
    meshes: SlotMap<MeshKey, Box<dyn Drawable>>,
    nodes: SlotMap<NodeKey, SceneNode>,
    lists: SlotMap<ListKey, Vec<NodeKey>>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a drawable
    ///
    /// Nodes created with the same key share the drawable, which is what
    /// makes two portals "the same shape".
    pub fn add_mesh(&mut self, drawable: impl Drawable + 'static) -> MeshKey {
        self.meshes.insert(Box::new(drawable))
    }

    /// Drawable stored under `key`
    pub fn mesh(&self, key: MeshKey) -> Option<&dyn Drawable> {
        self.meshes.get(key).map(|drawable| drawable.as_ref())
    }

    /// Create an empty node list
    pub fn create_list(&mut self) -> ListKey {
        self.lists.insert(Vec::new())
    }

    /// Append a plain node to `list`
    pub fn add_node(&mut self, list: ListKey, mesh: MeshKey, transform: Mat4) -> Result<NodeKey, SceneError> {
        self.insert_node(list, mesh, transform, NodeKind::Plain)
    }

    /// Append an unlinked portal to `list`
    pub fn add_portal(&mut self, list: ListKey, mesh: MeshKey, transform: Mat4) -> Result<NodeKey, SceneError> {
        let link = PortalLink {
            destination: None,
            scene: list,
        };
        self.insert_node(list, mesh, transform, NodeKind::Portal(link))
    }

    fn insert_node(
        &mut self,
        list: ListKey,
        mesh: MeshKey,
        transform: Mat4,
        kind: NodeKind,
    ) -> Result<NodeKey, SceneError> {
        if !self.meshes.contains_key(mesh) {
            return Err(SceneError::MissingMesh(mesh));
        }
        if !self.lists.contains_key(list) {
            return Err(SceneError::MissingList(list));
        }
        let key = self.nodes.insert(SceneNode { transform, mesh, kind });
        if let Some(nodes) = self.lists.get_mut(list) {
            nodes.push(key);
        }
        Ok(key)
    }

    /// Node stored under `key`
    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    /// Mutable node stored under `key`
    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut SceneNode> {
        self.nodes.get_mut(key)
    }

    /// Replace a node's transform
    pub fn set_transform(&mut self, key: NodeKey, transform: Mat4) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(key).ok_or(SceneError::MissingNode(key))?;
        node.set_transform(transform);
        Ok(())
    }

    /// Nodes of `list` in insertion order
    pub fn list(&self, key: ListKey) -> Option<&[NodeKey]> {
        self.lists.get(key).map(Vec::as_slice)
    }

    /// Point `portal` at `destination`
    ///
    /// Both nodes must be portals drawing the same mesh. Links are one-way
    /// and a portal may be linked to itself. On failure the current
    /// destination is left untouched.
    pub fn set_destination(&mut self, portal: NodeKey, destination: NodeKey) -> Result<(), LinkError> {
        let result = self.check_link(portal, destination);
        match result {
            Ok(()) => {
                if let Some(NodeKind::Portal(link)) = self.nodes.get_mut(portal).map(|node| &mut node.kind) {
                    link.destination = Some(destination);
                }
                log::debug!("Linked portal {:?} -> {:?}", portal, destination);
            }
            Err(ref e) => log::warn!("Portal link rejected: {}", e),
        }
        result
    }

    /// Link two portals to each other
    ///
    /// Both directions are validated before either changes, so a failure
    /// leaves both portals as they were.
    pub fn link_pair(&mut self, a: NodeKey, b: NodeKey) -> Result<(), LinkError> {
        if let Err(e) = self.check_link(a, b).and_then(|()| self.check_link(b, a)) {
            log::warn!("Portal pair link rejected: {}", e);
            return Err(e);
        }
        self.set_destination(a, b)?;
        self.set_destination(b, a)
    }

    fn check_link(&self, portal: NodeKey, destination: NodeKey) -> Result<(), LinkError> {
        let source = self.nodes.get(portal).ok_or(LinkError::MissingPortal(portal))?;
        let target = self.nodes.get(destination).ok_or(LinkError::MissingPortal(destination))?;
        if !source.is_portal() {
            return Err(LinkError::NotAPortal(portal));
        }
        if !target.is_portal() {
            return Err(LinkError::NotAPortal(destination));
        }
        if source.mesh != target.mesh {
            return Err(LinkError::ShapeMismatch { portal, destination });
        }
        Ok(())
    }

    /// Delete a list together with every node in it
    ///
    /// Portals elsewhere that led into a removed portal become unlinked, and
    /// drawables used by the removed nodes and by no surviving node are
    /// dropped. Drawables never attached to the list are kept.
    pub fn remove_list(&mut self, key: ListKey) -> Result<(), SceneError> {
        let removed = self.lists.remove(key).ok_or(SceneError::MissingList(key))?;
        let mut candidates: Vec<MeshKey> = Vec::new();
        for node in &removed {
            if let Some(node) = self.nodes.remove(*node) {
                if !candidates.contains(&node.mesh) {
                    candidates.push(node.mesh);
                }
            }
        }

        let mut unlinked = 0;
        for (_, node) in self.nodes.iter_mut() {
            if let NodeKind::Portal(link) = &mut node.kind {
                if link.destination.is_some_and(|d| removed.contains(&d)) {
                    link.destination = None;
                    unlinked += 1;
                }
            }
        }

        // Only drawables the removed nodes used are candidates for release
        let mut released = 0;
        for mesh in candidates {
            if !self.nodes.values().any(|node| node.mesh == mesh) && self.meshes.remove(mesh).is_some() {
                released += 1;
            }
        }

        log::debug!(
            "Removed list {:?}: {} nodes, {} meshes released, {} portals unlinked",
            key,
            removed.len(),
            released,
            unlinked
        );
        Ok(())
    }

    /// Drawables currently owned
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Nodes currently owned
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Lists currently owned
    pub fn list_count(&self) -> usize {
        self.lists.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Mesh;

    fn scene_with_square() -> (Scene, ListKey, MeshKey) {
        let mut scene = Scene::new();
        let list = scene.create_list();
        let square = scene.add_mesh(Mesh::unit_square([1.0; 3]));
        (scene, list, square)
    }

    #[test]
    fn test_nodes_keep_insertion_order() {
        let (mut scene, list, square) = scene_with_square();
        let a = scene.add_node(list, square, Mat4::identity()).unwrap();
        let b = scene.add_portal(list, square, Mat4::identity()).unwrap();
        let c = scene.add_node(list, square, Mat4::identity()).unwrap();

        assert_eq!(scene.list(list), Some(&[a, b, c][..]));
        assert_eq!(scene.node(b).and_then(|n| n.portal_link()).map(|l| l.scene), Some(list));
        assert!(!scene.node(a).unwrap().is_portal());
    }

    #[test]
    fn test_add_node_checks_keys() {
        let (mut scene, list, square) = scene_with_square();
        let other = scene.create_list();
        scene.remove_list(other).unwrap();
        assert_eq!(
            scene.add_node(other, square, Mat4::identity()),
            Err(SceneError::MissingList(other))
        );

        let cube = scene.add_mesh(Mesh::unit_cube());
        let node = scene.add_node(list, cube, Mat4::identity()).unwrap();
        let doomed = scene.create_list();
        let lonely = scene.add_mesh(Mesh::unit_cube());
        scene.add_node(doomed, lonely, Mat4::identity()).unwrap();
        scene.remove_list(doomed).unwrap();
        assert_eq!(
            scene.add_node(list, lonely, Mat4::identity()),
            Err(SceneError::MissingMesh(lonely))
        );
        assert!(scene.set_transform(node, Mat4::new_scaling(2.0)).is_ok());
    }

    #[test]
    fn test_link_same_shape_succeeds() {
        let (mut scene, list, square) = scene_with_square();
        let a = scene.add_portal(list, square, Mat4::identity()).unwrap();
        let b = scene.add_portal(list, square, Mat4::identity()).unwrap();

        assert!(scene.set_destination(a, b).is_ok());
        assert_eq!(scene.node(a).unwrap().destination(), Some(b));
        // One-way
        assert_eq!(scene.node(b).unwrap().destination(), None);
    }

    #[test]
    fn test_failed_link_leaves_destination_unchanged() {
        let (mut scene, list, square) = scene_with_square();
        let cube = scene.add_mesh(Mesh::unit_cube());
        let a = scene.add_portal(list, square, Mat4::identity()).unwrap();
        let b = scene.add_portal(list, square, Mat4::identity()).unwrap();
        let boxy = scene.add_portal(list, cube, Mat4::identity()).unwrap();
        let plain = scene.add_node(list, square, Mat4::identity()).unwrap();
        scene.set_destination(a, b).unwrap();

        assert_eq!(
            scene.set_destination(a, boxy),
            Err(LinkError::ShapeMismatch {
                portal: a,
                destination: boxy
            })
        );
        assert_eq!(scene.set_destination(a, plain), Err(LinkError::NotAPortal(plain)));
        assert_eq!(scene.set_destination(plain, a), Err(LinkError::NotAPortal(plain)));

        let scratch = scene.create_list();
        let gone = scene.add_portal(scratch, square, Mat4::identity()).unwrap();
        scene.remove_list(scratch).unwrap();
        assert_eq!(scene.set_destination(a, gone), Err(LinkError::MissingPortal(gone)));

        assert_eq!(scene.node(a).unwrap().destination(), Some(b));
    }

    #[test]
    fn test_link_pair_is_all_or_nothing() {
        let (mut scene, list, square) = scene_with_square();
        let cube = scene.add_mesh(Mesh::unit_cube());
        let a = scene.add_portal(list, square, Mat4::identity()).unwrap();
        let b = scene.add_portal(list, square, Mat4::identity()).unwrap();
        let c = scene.add_portal(list, cube, Mat4::identity()).unwrap();

        assert!(scene.link_pair(a, c).is_err());
        assert_eq!(scene.node(a).unwrap().destination(), None);
        assert_eq!(scene.node(c).unwrap().destination(), None);

        scene.link_pair(a, b).unwrap();
        assert_eq!(scene.node(a).unwrap().destination(), Some(b));
        assert_eq!(scene.node(b).unwrap().destination(), Some(a));
    }

    #[test]
    fn test_remove_list_unlinks_portals_into_it() {
        let (mut scene, home, square) = scene_with_square();
        let away = scene.create_list();
        let a = scene.add_portal(home, square, Mat4::identity()).unwrap();
        let b = scene.add_portal(away, square, Mat4::identity()).unwrap();
        scene.link_pair(a, b).unwrap();

        scene.remove_list(away).unwrap();
        assert!(scene.node(b).is_none());
        assert_eq!(scene.node(a).unwrap().destination(), None);
        // Square is still used by `a`
        assert_eq!(scene.mesh_count(), 1);
        assert_eq!(scene.node_count(), 1);
        assert_eq!(scene.list_count(), 1);
        assert_eq!(scene.remove_list(away), Err(SceneError::MissingList(away)));
    }

    #[test]
    fn test_remove_list_keeps_unattached_meshes() {
        let (mut scene, list, square) = scene_with_square();
        let reserved = scene.add_mesh(Mesh::unit_cube());
        let scratch = scene.create_list();
        scene.add_node(scratch, square, Mat4::identity()).unwrap();

        scene.remove_list(scratch).unwrap();
        // Square was only used by the removed node
        assert!(scene.mesh(square).is_none());
        assert!(scene.mesh(reserved).is_some());
        assert!(scene.add_node(list, reserved, Mat4::identity()).is_ok());

        let empty = scene.create_list();
        scene.remove_list(empty).unwrap();
        assert_eq!(scene.mesh_count(), 1);
    }
}
