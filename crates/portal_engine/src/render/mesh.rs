//! Mesh representation for scene geometry
//!
//! Indexed triangle lists with a flat color per vertex. Meshes are the
//! concrete [`Drawable`] of the engine: drawing one hands its buffers to the
//! backend under whatever matrix and masking state the caller set up.

use crate::foundation::math::{constants::HALF_PI, Mat4, Mat4Ext, Point3, Vec3};
use crate::render::backend::{BackendResult, GraphicsBackend};
use crate::render::RenderError;
use crate::scene::Drawable;

/// Face colors of the unit cube: +X, -Z, -X, +Z, -Y, +Y
pub const CUBE_FACE_COLORS: [[f32; 3]; 6] = [
    [0.6, 0.0, 0.6],
    [0.0, 1.0, 1.0],
    [1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.45, 0.0],
    [0.95, 0.95, 0.0],
];

/// Vertex with position and color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],

    /// RGB color in [0, 1]
    pub color: [f32; 3],
}

impl Vertex {
    /// Create a vertex
    pub const fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, color }
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    name: String,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Create a mesh, checking that indices form whole in-range triangles
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self, RenderError> {
        let name = name.into();
        if indices.len() % 3 != 0 {
            return Err(RenderError::InvalidMesh(format!(
                "'{}': index count {} is not a multiple of 3",
                name,
                indices.len()
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(RenderError::InvalidMesh(format!(
                "'{}': index {} out of range for {} vertices",
                name,
                bad,
                vertices.len()
            )));
        }
        Ok(Self { name, vertices, indices })
    }

    /// Square with corners at (±1, ±1, 0), front face toward +Z
    pub fn unit_square(color: [f32; 3]) -> Self {
        let vertices = square_corners()
            .iter()
            .map(|p| Vertex::new([p.x, p.y, p.z], color))
            .collect();
        Self {
            name: "unit_square".to_string(),
            vertices,
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    /// Cube with corners at (±1, ±1, ±1), one color per face, faces pointing out
    pub fn unit_cube() -> Self {
        Self::unit_cube_with_colors(CUBE_FACE_COLORS)
    }

    /// Cube with the given per-face colors (+X, -Z, -X, +Z, -Y, +Y)
    pub fn unit_cube_with_colors(colors: [[f32; 3]; 6]) -> Self {
        let push_out = Mat4::new_translation(&Vec3::new(0.0, 0.0, 1.0));
        let mut faces = Vec::with_capacity(6);
        for i in 1..=4u8 {
            faces.push(Mat4::rotation_y(HALF_PI * f32::from(i)) * push_out);
        }
        faces.push(Mat4::rotation_x(HALF_PI) * push_out);
        faces.push(Mat4::rotation_x(-HALF_PI) * push_out);

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (face, color) in faces.iter().zip(colors) {
            let base = vertices.len() as u32;
            for corner in square_corners() {
                let p = face.transform_point(&corner);
                vertices.push(Vertex::new([p.x, p.y, p.z], color));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self {
            name: "unit_cube".to_string(),
            vertices,
            indices,
        }
    }

    /// Mesh name, used in logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vertex data
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Index data, three per triangle
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

impl Drawable for Mesh {
    fn draw(&self, backend: &mut dyn GraphicsBackend) -> BackendResult<()> {
        backend.draw_indexed(&self.vertices, &self.indices)
    }

    fn label(&self) -> &str {
        &self.name
    }
}

fn square_corners() -> [Point3; 4] {
    [
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(-1.0, 1.0, 0.0),
        Point3::new(-1.0, -1.0, 0.0),
        Point3::new(1.0, -1.0, 0.0),
    ]
}
