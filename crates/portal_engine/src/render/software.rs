//! Software rasterizer backend
//!
//! A CPU implementation of [`GraphicsBackend`] with real color, depth and
//! stencil buffers. Fragments go through the fixed-function order: stencil
//! test, depth test (less-than), stencil update, depth write, blended color
//! write. Triangles are clipped against the near plane, optionally culled by
//! winding, flat shaded, and rasterized with edge functions and a tie-break rule so that a
//! pixel on an edge shared by two triangles is covered exactly once. That last
//! property matters here: a portal silhouette decrements the stencil, and a
//! double-covered diagonal would push those pixels two levels deep.

use crate::foundation::math::{Mat4, Vec4};
use crate::render::backend::{BackendResult, GraphicsBackend, MatrixStack};
use crate::render::mesh::Vertex;
use crate::render::state::{BlendFactor, ClearFlags, PipelineState, StencilFunc, StencilOp};
use crate::render::RenderError;

#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    position: Vec4,
    color: [f32; 3],
}

impl ClipVertex {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            position: self.position + (other.position - self.position) * t,
            color: self.color,
        }
    }

    /// Signed distance to the near plane in clip space; inside when >= 0
    fn near_distance(&self) -> f32 {
        self.position.z + self.position.w
    }
}

#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    z: f32,
}

/// Counters for the work done since the last [`SoftwareBackend::reset_stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterStats {
    /// `draw_indexed` calls
    pub draw_calls: u64,
    /// Triangles handed to the rasterizer after clipping
    pub triangles: u64,
    /// Triangles skipped by back-face culling
    pub culled: u64,
    /// Fragments that passed both stencil and depth tests
    pub fragments_passed: u64,
}

/// CPU rasterizer with color, depth and stencil buffers
pub struct SoftwareBackend {
    width: u32,
    height: u32,
    color: Vec<[f32; 4]>,
    depth: Vec<f32>,
    stencil: Vec<u8>,
    clear_color: [f32; 4],
    clear_stencil: u8,
    projection: Mat4,
    matrices: MatrixStack,
    state: PipelineState,
    cull_back_faces: bool,
    stats: RasterStats,
}

impl SoftwareBackend {
    /// Create a backend with a `width` x `height` framebuffer
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![[0.0; 4]; len],
            depth: vec![1.0; len],
            stencil: vec![0; len],
            clear_color: [0.0; 4],
            clear_stencil: 0,
            projection: Mat4::identity(),
            matrices: MatrixStack::new(),
            state: PipelineState::default(),
            cull_back_faces: true,
            stats: RasterStats::default(),
        }
    }

    /// Enable or disable back-face culling (counter-clockwise is front)
    pub fn set_back_face_culling(&mut self, enabled: bool) {
        self.cull_back_faces = enabled;
    }

    /// Work counters
    pub fn stats(&self) -> RasterStats {
        self.stats
    }

    /// Zero the work counters
    pub fn reset_stats(&mut self) {
        self.stats = RasterStats::default();
    }

    /// Color at pixel (x, y), origin top-left
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        self.index(x, y).map(|i| self.color[i])
    }

    /// Stencil value at pixel (x, y)
    pub fn stencil_at(&self, x: u32, y: u32) -> Option<u8> {
        self.index(x, y).map(|i| self.stencil[i])
    }

    /// Window-space depth at pixel (x, y), 0 near and 1 far
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        self.index(x, y).map(|i| self.depth[i])
    }

    /// Color buffer as tightly packed RGBA8, rows top to bottom
    pub fn to_rgba8(&self) -> Vec<u8> {
        let pixels: Vec<[u8; 4]> = self
            .color
            .iter()
            .map(|c| c.map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect();
        bytemuck::cast_slice(&pixels).to_vec()
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    fn clip_near(triangle: [ClipVertex; 3]) -> Vec<ClipVertex> {
        let mut out = Vec::with_capacity(4);
        for i in 0..3 {
            let current = triangle[i];
            let next = triangle[(i + 1) % 3];
            let dc = current.near_distance();
            let dn = next.near_distance();
            if dc >= 0.0 {
                out.push(current);
            }
            if (dc >= 0.0) != (dn >= 0.0) {
                out.push(current.lerp(&next, dc / (dc - dn)));
            }
        }
        out
    }

    fn to_screen(&self, v: &ClipVertex) -> ScreenVertex {
        let inv_w = 1.0 / v.position.w;
        let ndc_x = v.position.x * inv_w;
        let ndc_y = v.position.y * inv_w;
        let ndc_z = v.position.z * inv_w;
        ScreenVertex {
            x: (ndc_x + 1.0) * 0.5 * self.width as f32,
            y: (1.0 - ndc_y) * 0.5 * self.height as f32,
            z: (ndc_z + 1.0) * 0.5,
        }
    }

    /// Flat-shaded: the whole triangle takes `color`
    fn rasterize(&mut self, a: ScreenVertex, b: ScreenVertex, c: ScreenVertex, color: [f32; 4]) {
        // Screen y points down, so counter-clockwise in NDC is negative here
        let area = edge(&a, &b, c.x, c.y);
        if area == 0.0 || !area.is_finite() {
            return;
        }
        let front_facing = area < 0.0;
        if self.cull_back_faces && !front_facing {
            self.stats.culled += 1;
            return;
        }
        let (b, c, area) = if area < 0.0 { (c, b, -area) } else { (b, c, area) };
        self.stats.triangles += 1;

        let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as u32;
        let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as u32;
        let max_x = (a.x.max(b.x).max(c.x).ceil() as i64).min(i64::from(self.width) - 1);
        let max_y = (a.y.max(b.y).max(c.y).ceil() as i64).min(i64::from(self.height) - 1);
        if max_x < 0 || max_y < 0 {
            return;
        }

        let owns_bc = owns_edge(&b, &c);
        let owns_ca = owns_edge(&c, &a);
        let owns_ab = owns_edge(&a, &b);

        for py in min_y..=max_y as u32 {
            for px in min_x..=max_x as u32 {
                let sx = px as f32 + 0.5;
                let sy = py as f32 + 0.5;
                let w0 = edge(&b, &c, sx, sy);
                let w1 = edge(&c, &a, sx, sy);
                let w2 = edge(&a, &b, sx, sy);
                if !covers(w0, owns_bc) || !covers(w1, owns_ca) || !covers(w2, owns_ab) {
                    continue;
                }

                let (l0, l1, l2) = (w0 / area, w1 / area, w2 / area);
                let z = l0 * a.z + l1 * b.z + l2 * c.z;
                if !(0.0..=1.0).contains(&z) {
                    continue;
                }
                let index = py as usize * self.width as usize + px as usize;
                self.shade_fragment(index, z, color);
            }
        }
    }

    fn shade_fragment(&mut self, index: usize, z: f32, color: [f32; 4]) {
        let stencil = self.state.stencil;
        let stored = self.stencil[index];

        if !stencil.test(stored) {
            self.stencil[index] = stencil.update(stencil.stencil_fail, stored);
            return;
        }
        if z >= self.depth[index] {
            self.stencil[index] = stencil.update(stencil.depth_fail, stored);
            return;
        }

        self.stats.fragments_passed += 1;
        self.stencil[index] = stencil.update(stencil.depth_pass, stored);
        if self.state.depth_write {
            self.depth[index] = z;
        }
        if self.state.color_write {
            self.color[index] = self.state.blend(color, self.color[index]);
        }
    }
}

/// Twice the signed area of (a, b, p)
fn edge(a: &ScreenVertex, b: &ScreenVertex, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// Tie-break for pixel centers exactly on an edge; opposite directions disagree
fn owns_edge(from: &ScreenVertex, to: &ScreenVertex) -> bool {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    dy > 0.0 || (dy == 0.0 && dx < 0.0)
}

fn covers(weight: f32, owned: bool) -> bool {
    weight > 0.0 || (weight == 0.0 && owned)
}

impl GraphicsBackend for SoftwareBackend {
    fn framebuffer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    fn set_clear_stencil(&mut self, value: u8) {
        self.clear_stencil = value;
    }

    fn clear(&mut self, buffers: ClearFlags) -> BackendResult<()> {
        // Clears obey the write enables and the stencil write mask
        if buffers.contains(ClearFlags::COLOR) && self.state.color_write {
            self.color.fill(self.clear_color);
        }
        if buffers.contains(ClearFlags::DEPTH) && self.state.depth_write {
            self.depth.fill(1.0);
        }
        if buffers.contains(ClearFlags::STENCIL) {
            let mask = self.state.stencil.write_mask;
            let value = self.clear_stencil & mask;
            for stencil in &mut self.stencil {
                *stencil = (*stencil & !mask) | value;
            }
        }
        Ok(())
    }

    fn set_projection(&mut self, projection: &Mat4) {
        self.projection = *projection;
    }

    fn reset_matrix_stack(&mut self) {
        self.matrices.reset();
    }

    fn push_matrix(&mut self) -> BackendResult<()> {
        self.matrices.push()
    }

    fn pop_matrix(&mut self) {
        self.matrices.pop();
    }

    fn load_matrix(&mut self, matrix: &Mat4) {
        self.matrices.load(matrix);
    }

    fn mult_matrix(&mut self, matrix: &Mat4) {
        self.matrices.mult(matrix);
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
    }

    fn stencil_op(&mut self, stencil_fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp) {
        self.state.stencil.stencil_fail = stencil_fail;
        self.state.stencil.depth_fail = depth_fail;
        self.state.stencil.depth_pass = depth_pass;
    }

    fn stencil_mask(&mut self, mask: u8) {
        self.state.stencil.write_mask = mask;
    }

    fn depth_mask(&mut self, enabled: bool) {
        self.state.depth_write = enabled;
    }

    fn color_mask(&mut self, enabled: bool) {
        self.state.color_write = enabled;
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.state.blend_src = src;
        self.state.blend_dst = dst;
    }

    fn pipeline_state(&self) -> PipelineState {
        self.state
    }

    fn draw_indexed(&mut self, vertices: &[Vertex], indices: &[u32]) -> BackendResult<()> {
        if indices.len() % 3 != 0 {
            return Err(RenderError::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        self.stats.draw_calls += 1;

        let mvp = self.projection * self.matrices.top();
        let clip: Vec<ClipVertex> = vertices
            .iter()
            .map(|v| ClipVertex {
                position: mvp * Vec4::new(v.position[0], v.position[1], v.position[2], 1.0),
                color: v.color,
            })
            .collect();

        let fetch = |i: u32| {
            clip.get(i as usize).copied().ok_or_else(|| {
                RenderError::InvalidMesh(format!("index {} out of range for {} vertices", i, clip.len()))
            })
        };

        for triangle in indices.chunks_exact(3) {
            let corners = [fetch(triangle[0])?, fetch(triangle[1])?, fetch(triangle[2])?];
            let [r, g, b] = corners[0].color;

            let polygon = Self::clip_near(corners);
            if polygon.len() < 3 {
                continue;
            }
            let screen: Vec<ScreenVertex> = polygon.iter().map(|v| self.to_screen(v)).collect();
            for i in 1..screen.len() - 1 {
                self.rasterize(screen[0], screen[i], screen[i + 1], [r, g, b, 1.0]);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::mesh::Mesh;
    use crate::scene::Drawable;

    const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

    /// Orthographic-ish setup: identity projection maps the unit square to the full viewport
    fn backend(size: u32) -> SoftwareBackend {
        let mut backend = SoftwareBackend::new(size, size);
        backend.set_clear_stencil(255);
        backend.clear(ClearFlags::all()).unwrap();
        backend
    }

    #[test]
    fn test_shared_diagonal_is_covered_once() {
        let mut backend = backend(16);
        backend.stencil_func(StencilFunc::Always, 0, 0xFF);
        backend.stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Decrement);
        backend.depth_mask(false);
        backend.load_matrix(&Mat4::new_scaling(0.5));

        Mesh::unit_square(WHITE).draw(&mut backend).unwrap();

        for y in 0..16 {
            for x in 0..16 {
                let stencil = backend.stencil_at(x, y).unwrap();
                assert!(stencil == 254 || stencil == 255, "pixel ({x},{y}) stencil {stencil}");
            }
        }
        assert_eq!(backend.stencil_at(8, 8), Some(254));
        assert_eq!(backend.stencil_at(0, 0), Some(255));
    }

    #[test]
    fn test_stencil_test_rejects_color() {
        let mut backend = backend(8);
        backend.stencil_func(StencilFunc::GreaterEqual, 254, 0xFF);
        Mesh::unit_square(WHITE).draw(&mut backend).unwrap();

        // Stencil everywhere is 255 and 254 >= 255 fails
        assert_eq!(backend.pixel(4, 4), Some([0.0; 4]));
        assert_eq!(backend.stats().fragments_passed, 0);
    }

    #[test]
    fn test_depth_test_keeps_nearest() {
        let mut backend = backend(8);
        backend.stencil_func(StencilFunc::Always, 0, 0xFF);

        let far = Mesh::unit_square([1.0, 0.0, 0.0]);
        let near = Mesh::unit_square([0.0, 1.0, 0.0]);

        backend.load_matrix(&Mat4::new_translation(&Vec3::new(0.0, 0.0, -0.5)));
        near.draw(&mut backend).unwrap();
        backend.load_matrix(&Mat4::new_translation(&Vec3::new(0.0, 0.0, 0.5)));
        far.draw(&mut backend).unwrap();

        assert_eq!(backend.pixel(4, 4), Some([0.0, 1.0, 0.0, 1.0]));
    }

    #[test]
    fn test_back_faces_are_culled() {
        let mut backend = backend(8);
        backend.stencil_func(StencilFunc::Always, 0, 0xFF);
        backend.load_matrix(&Mat4::new_nonuniform_scaling(&Vec3::new(-1.0, 1.0, 1.0)));
        Mesh::unit_square(WHITE).draw(&mut backend).unwrap();
        assert_eq!(backend.stats().culled, 2);
        assert_eq!(backend.pixel(4, 4), Some([0.0; 4]));

        backend.set_back_face_culling(false);
        Mesh::unit_square(WHITE).draw(&mut backend).unwrap();
        assert_eq!(backend.pixel(4, 4), Some([1.0, 1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_color_mask_and_blend() {
        let mut backend = backend(8);
        backend.set_clear_color([0.5, 0.5, 0.5, 1.0]);
        backend.clear(ClearFlags::COLOR).unwrap();
        backend.stencil_func(StencilFunc::Always, 0, 0xFF);

        backend.color_mask(false);
        Mesh::unit_square(WHITE).draw(&mut backend).unwrap();
        assert_eq!(backend.pixel(4, 4), Some([0.5, 0.5, 0.5, 1.0]));

        backend.clear(ClearFlags::DEPTH).unwrap();
        backend.color_mask(true);
        backend.blend_func(BlendFactor::Zero, BlendFactor::Zero);
        Mesh::unit_square(WHITE).draw(&mut backend).unwrap();
        assert_eq!(backend.pixel(4, 4), Some([0.0; 4]));
    }

    #[test]
    fn test_clear_respects_write_masks() {
        let mut backend = backend(4);
        backend.set_clear_stencil(0x00);
        backend.set_clear_color([1.0; 4]);
        backend.stencil_mask(0xF0);
        backend.color_mask(false);
        backend.clear(ClearFlags::all()).unwrap();

        // Only the high nibble of 0xFF was cleared
        assert_eq!(backend.stencil_at(1, 1), Some(0x0F));
        assert_eq!(backend.pixel(1, 1), Some([0.0; 4]));

        backend.stencil_mask(0x00);
        backend.set_clear_stencil(0xFF);
        backend.clear(ClearFlags::STENCIL).unwrap();
        assert_eq!(backend.stencil_at(1, 1), Some(0x0F));
    }

    #[test]
    fn test_geometry_behind_near_plane_is_clipped() {
        let mut backend = backend(8);
        backend.stencil_func(StencilFunc::Always, 0, 0xFF);
        // Entirely at z = -2 in clip space with w = 1: outside the near plane
        backend.load_matrix(&Mat4::new_translation(&Vec3::new(0.0, 0.0, -2.0)));
        Mesh::unit_square(WHITE).draw(&mut backend).unwrap();
        assert_eq!(backend.stats().triangles, 0);
        assert_eq!(backend.pixel(4, 4), Some([0.0; 4]));
    }

    #[test]
    fn test_rgba8_export() {
        let mut backend = SoftwareBackend::new(2, 1);
        backend.set_clear_color([1.0, 0.0, 0.5, 1.0]);
        backend.clear(ClearFlags::COLOR).unwrap();
        assert_eq!(backend.to_rgba8(), vec![255, 0, 128, 255, 255, 0, 128, 255]);
    }
}
