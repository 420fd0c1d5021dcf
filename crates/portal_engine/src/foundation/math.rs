//! Math utilities and types
//!
//! Provides the fundamental math types for the portal renderer. Matrices are
//! nalgebra `Matrix4<f32>` with the usual column-major meaning: column `i` is
//! the world-space direction of local axis `i`, column 3 is the origin.

use std::fmt::Write as _;

pub use nalgebra::{
    Vector3, Vector4,
    Matrix4,
    Quaternion,
    Unit,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
///
/// Composes as translate * rotate * scale, which is the order scene content
/// is authored in.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Append a rotation of `angle` radians about `axis`, applied after the current rotation
    pub fn rotated(mut self, axis: Vec3, angle: f32) -> Self {
        let rotation = Quat::from_axis_angle(&Unit::new_normalize(axis), angle);
        self.rotation *= rotation;
        self
    }

    /// Replace the scale factors
    pub fn scaled(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Pi / 4
    pub const QUARTER_PI: f32 = PI * 0.25;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a rotation matrix around the X axis
    fn rotation_x(angle: f32) -> Mat4;

    /// Create a rotation matrix around the Y axis
    fn rotation_y(angle: f32) -> Mat4;

    /// Create a rotation matrix around the Z axis
    fn rotation_z(angle: f32) -> Mat4;

    /// Create an OpenGL-style perspective projection (clip z in [-w, w])
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// The fixed "about face" applied when looking through a portal
    ///
    /// Scale by (-1, 1, -1): a half turn about Y, not a mirror, so rays that
    /// enter the +Z side of one portal leave the +Z side of the other.
    fn portal_flip() -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn rotation_x(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::x_axis(), angle)
    }

    fn rotation_y(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::y_axis(), angle)
    }

    fn rotation_z(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::z_axis(), angle)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn portal_flip() -> Mat4 {
        Mat4::new_nonuniform_scaling(&Vec3::new(-1.0, 1.0, -1.0))
    }
}

/// View used to render the scene behind a destination portal
///
/// `current_view * portal * flip * inverse(destination)` places the virtual
/// camera behind `destination`, looking back out through it. Returns `None`
/// when the destination transform is singular.
pub fn portal_view(current_view: &Mat4, portal: &Mat4, destination: &Mat4) -> Option<Mat4> {
    let destination_inverse = destination.try_inverse()?;
    Some(current_view * portal * Mat4::portal_flip() * destination_inverse)
}

/// Format a matrix row by row, fixed precision, for trace logging
pub fn format_matrix(matrix: &Mat4) -> String {
    let mut out = String::new();
    for row in 0..4 {
        for col in 0..4 {
            let _ = write!(out, "{:>10.5} ", matrix[(row, col)]);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    fn sample_pair() -> (Mat4, Mat4) {
        let t1 = Transform::from_position(Vec3::new(5.0, 2.0, 3.0))
            .rotated(Vec3::x(), constants::QUARTER_PI)
            .scaled(Vec3::new(3.0, 3.0, 1.0))
            .to_matrix();
        let t2 = Transform::from_position(Vec3::new(-5.5, -3.0, 5.0))
            .rotated(Vec3::y(), constants::HALF_PI)
            .rotated(Vec3::z(), constants::HALF_PI)
            .scaled(Vec3::new(3.0, 3.0, 1.0))
            .to_matrix();
        (t1, t2)
    }

    #[test]
    fn test_transform_composes_translate_rotate_scale() {
        let matrix = Transform::from_position(Vec3::new(1.0, 2.0, 3.0))
            .rotated(Vec3::z(), constants::HALF_PI)
            .scaled(Vec3::new(2.0, 2.0, 2.0))
            .to_matrix();

        // Local +X is scaled by 2 then turned onto +Y, then moved
        let p = matrix.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(1.0, 4.0, 3.0), epsilon = EPSILON);
    }

    #[test]
    fn test_portal_flip_is_half_turn_not_mirror() {
        let flip = Mat4::portal_flip();
        assert_relative_eq!(flip.determinant(), 1.0, epsilon = EPSILON);
        assert_relative_eq!(flip, Mat4::rotation_y(constants::PI), epsilon = EPSILON);
    }

    #[test]
    fn test_portal_view_matches_formula_with_identity_view() {
        let (t1, t2) = sample_pair();
        let view = portal_view(&Mat4::identity(), &t1, &t2).expect("invertible");

        let expected = t1 * Mat4::new_nonuniform_scaling(&Vec3::new(-1.0, 1.0, -1.0))
            * t2.try_inverse().expect("invertible");
        assert_relative_eq!(view, expected, epsilon = EPSILON);
    }

    #[test]
    fn test_portal_view_maps_destination_front_behind_source() {
        let (t1, t2) = sample_pair();
        let view = portal_view(&Mat4::identity(), &t1, &t2).expect("invertible");

        // A point one unit in front of the destination (+Z local)...
        let in_front_of_destination = t2.transform_point(&Point3::new(0.0, 0.0, 1.0));
        let seen = view.transform_point(&in_front_of_destination);

        // ...is seen one unit behind the source portal (-Z local)
        let behind_source = t1.transform_point(&Point3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(seen, behind_source, epsilon = 1e-4);

        // Portal centers coincide
        let center = view.transform_point(&t2.transform_point(&Point3::origin()));
        assert_relative_eq!(center, t1.transform_point(&Point3::origin()), epsilon = 1e-4);
    }

    #[test]
    fn test_portal_view_rejects_singular_destination() {
        let (t1, _) = sample_pair();
        let flat = Mat4::new_nonuniform_scaling(&Vec3::new(1.0, 1.0, 0.0));
        assert!(portal_view(&Mat4::identity(), &t1, &flat).is_none());
    }

    #[test]
    fn test_look_at_puts_target_on_negative_z() {
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 70.0), Vec3::zeros(), Vec3::y());
        let target = view.transform_point(&Point3::origin());
        assert_relative_eq!(target, Point3::new(0.0, 0.0, -70.0), epsilon = 1e-4);
    }

    #[test]
    fn test_format_matrix_is_row_major() {
        let matrix = Mat4::new_translation(&Vec3::new(7.0, 0.0, 0.0));
        let text = format_matrix(&matrix);
        let first_row: Vec<&str> = text.lines().next().expect("row").split_whitespace().collect();
        assert_eq!(first_row, vec!["1.00000", "0.00000", "0.00000", "7.00000"]);
        assert_eq!(text.lines().count(), 4);
    }
}
