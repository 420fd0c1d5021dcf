//! Demo scene
//!
//! A ground square, a floating cube and two linked portals, all in one
//! list. Looking into either portal shows the scene as seen from behind the
//! other one.

use crate::foundation::collections::{ListKey, NodeKey};
use crate::foundation::math::{constants::QUARTER_PI, constants::HALF_PI, Mat4, Transform, Vec3};
use crate::render::Mesh;
use crate::scene::scene_graph::{LinkError, Scene, SceneError};

/// Color of the ground and the portal surfaces
pub const SQUARE_COLOR: [f32; 3] = [0.8, 0.8, 0.8];

/// Handles into a scene built by [`build_demo_scene`]
#[derive(Debug, Clone, Copy)]
pub struct DemoScene {
    /// The one top-level list
    pub list: ListKey,
    /// 20 x 20 ground square
    pub ground: NodeKey,
    /// Animated cube
    pub cube: NodeKey,
    /// Portal above and right of the cube
    pub portal1: NodeKey,
    /// Portal standing up beside the cube
    pub portal2: NodeKey,
}

/// Errors while assembling the demo
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoError {
    /// Adding a node failed
    #[error(transparent)]
    Scene(#[from] SceneError),
    /// Linking the portals failed
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Transform of the first portal: tilted 45 degrees about X
pub fn portal1_transform() -> Mat4 {
    Transform::from_position(Vec3::new(5.0, 2.0, 3.0))
        .rotated(Vec3::x(), QUARTER_PI)
        .scaled(Vec3::new(3.0, 3.0, 1.0))
        .to_matrix()
}

/// Transform of the second portal: quarter turn about Y, then about Z
pub fn portal2_transform() -> Mat4 {
    Transform::from_position(Vec3::new(-5.5, -3.0, 5.0))
        .rotated(Vec3::y(), HALF_PI)
        .rotated(Vec3::z(), HALF_PI)
        .scaled(Vec3::new(3.0, 3.0, 1.0))
        .to_matrix()
}

/// Populate `scene` with the demo content and link the two portals
pub fn build_demo_scene(scene: &mut Scene) -> Result<DemoScene, DemoError> {
    let square = scene.add_mesh(Mesh::unit_square(SQUARE_COLOR));
    let cube_mesh = scene.add_mesh(Mesh::unit_cube());
    let list = scene.create_list();

    let ground = scene.add_node(list, square, Mat4::new_nonuniform_scaling(&Vec3::new(20.0, 20.0, 1.0)))?;
    let cube = scene.add_node(
        list,
        cube_mesh,
        Mat4::new_translation(&Vec3::new(-2.0, -3.0, 5.0)) * Mat4::new_scaling(2.0),
    )?;
    let portal1 = scene.add_portal(list, square, portal1_transform())?;
    let portal2 = scene.add_portal(list, square, portal2_transform())?;
    scene.link_pair(portal1, portal2)?;

    log::info!("Demo scene built: {} nodes, {} meshes", scene.node_count(), scene.mesh_count());
    Ok(DemoScene {
        list,
        ground,
        cube,
        portal1,
        portal2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_demo_scene_layout() {
        let mut scene = Scene::new();
        let demo = build_demo_scene(&mut scene).unwrap();

        assert_eq!(scene.list(demo.list), Some(&[demo.ground, demo.cube, demo.portal1, demo.portal2][..]));
        assert_eq!(scene.mesh_count(), 2);
        assert_eq!(scene.node(demo.portal1).unwrap().destination(), Some(demo.portal2));
        assert_eq!(scene.node(demo.portal2).unwrap().destination(), Some(demo.portal1));
    }

    #[test]
    fn test_portal2_faces_along_x() {
        // Rotating Y then Z sends the square's normal (+Z) to +X
        let normal = portal2_transform().transform_vector(&Vec3::z()).normalize();
        assert_relative_eq!(normal, Vec3::x(), epsilon = 1e-5);
    }
}
