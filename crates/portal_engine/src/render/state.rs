//! Fixed-function pipeline state
//!
//! The subset of raster state the masking protocol toggles: stencil test and
//! update, depth and color write enables, and the two blend factors needed to
//! paint a silhouette. Per-fragment semantics follow the classic GL model and
//! are implemented here so every backend agrees on them.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Buffers affected by a clear
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        /// Color buffer
        const COLOR = 0b001;
        /// Depth buffer
        const DEPTH = 0b010;
        /// Stencil buffer
        const STENCIL = 0b100;
    }
}

/// Stencil comparison, evaluated as `(reference & mask) <op> (stored & mask)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StencilFunc {
    /// Never passes
    Never,
    /// Passes if reference < stored
    Less,
    /// Passes if reference <= stored
    LessEqual,
    /// Passes if reference > stored
    Greater,
    /// Passes if reference >= stored
    GreaterEqual,
    /// Passes if reference == stored
    Equal,
    /// Passes if reference != stored
    NotEqual,
    /// Always passes
    Always,
}

impl StencilFunc {
    /// Evaluate the comparison for one stored stencil value
    pub fn passes(self, reference: u8, mask: u8, stored: u8) -> bool {
        let reference = reference & mask;
        let stored = stored & mask;
        match self {
            Self::Never => false,
            Self::Less => reference < stored,
            Self::LessEqual => reference <= stored,
            Self::Greater => reference > stored,
            Self::GreaterEqual => reference >= stored,
            Self::Equal => reference == stored,
            Self::NotEqual => reference != stored,
            Self::Always => true,
        }
    }
}

/// Stencil update applied after the stencil and depth tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StencilOp {
    /// Leave the stored value
    Keep,
    /// Store zero
    Zero,
    /// Store the reference value
    Replace,
    /// Add one, saturating at 255
    Increment,
    /// Subtract one, saturating at 0
    Decrement,
    /// Bitwise invert
    Invert,
}

impl StencilOp {
    /// New value before the write mask is applied
    pub fn apply(self, stored: u8, reference: u8) -> u8 {
        match self {
            Self::Keep => stored,
            Self::Zero => 0,
            Self::Replace => reference,
            Self::Increment => stored.saturating_add(1),
            Self::Decrement => stored.saturating_sub(1),
            Self::Invert => !stored,
        }
    }
}

/// Blend factor; only the two the renderer needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    /// Multiply by zero
    Zero,
    /// Multiply by one
    One,
}

impl BlendFactor {
    fn weight(self) -> f32 {
        match self {
            Self::Zero => 0.0,
            Self::One => 1.0,
        }
    }
}

/// Stencil test and update configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilState {
    /// Comparison function
    pub func: StencilFunc,
    /// Reference value
    pub reference: u8,
    /// Mask applied to both sides of the comparison
    pub read_mask: u8,
    /// Bits that updates may modify
    pub write_mask: u8,
    /// Update when the stencil test fails
    pub stencil_fail: StencilOp,
    /// Update when the stencil test passes but the depth test fails
    pub depth_fail: StencilOp,
    /// Update when both tests pass
    pub depth_pass: StencilOp,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            func: StencilFunc::Always,
            reference: 0,
            read_mask: 0xFF,
            write_mask: 0xFF,
            stencil_fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            depth_pass: StencilOp::Keep,
        }
    }
}

impl StencilState {
    /// Whether a fragment over `stored` passes the stencil test
    pub fn test(&self, stored: u8) -> bool {
        self.func.passes(self.reference, self.read_mask, stored)
    }

    /// Apply `op` to `stored`, honouring the write mask
    pub fn update(&self, op: StencilOp, stored: u8) -> u8 {
        let value = op.apply(stored, self.reference);
        (stored & !self.write_mask) | (value & self.write_mask)
    }
}

/// Everything that decides what a fragment does to the framebuffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineState {
    /// Stencil configuration
    pub stencil: StencilState,
    /// Depth buffer writes enabled
    pub depth_write: bool,
    /// Color buffer writes enabled
    pub color_write: bool,
    /// Source blend factor
    pub blend_src: BlendFactor,
    /// Destination blend factor
    pub blend_dst: BlendFactor,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            stencil: StencilState::default(),
            depth_write: true,
            color_write: true,
            blend_src: BlendFactor::One,
            blend_dst: BlendFactor::Zero,
        }
    }
}

impl PipelineState {
    /// Blend a source color over a destination color
    pub fn blend(&self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        let s = self.blend_src.weight();
        let d = self.blend_dst.weight();
        [
            src[0] * s + dst[0] * d,
            src[1] * s + dst[1] * d,
            src[2] * s + dst[2] * d,
            src[3] * s + dst[3] * d,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greater_equal_selects_deeper_levels() {
        // Level n is stored as 255 - n; a scope at level 1 admits levels >= 1
        let func = StencilFunc::GreaterEqual;
        assert!(func.passes(254, 0xFF, 254));
        assert!(func.passes(254, 0xFF, 253));
        assert!(!func.passes(254, 0xFF, 255));
        // The outermost reference admits everything
        assert!(func.passes(255, 0xFF, 0));
    }

    #[test]
    fn test_stencil_ops_saturate() {
        assert_eq!(StencilOp::Decrement.apply(0, 9), 0);
        assert_eq!(StencilOp::Increment.apply(255, 9), 255);
        assert_eq!(StencilOp::Replace.apply(17, 9), 9);
        assert_eq!(StencilOp::Invert.apply(0x0F, 9), 0xF0);
    }

    #[test]
    fn test_write_mask_limits_update() {
        let read_only = StencilState {
            write_mask: 0x00,
            reference: 200,
            ..StencilState::default()
        };
        assert_eq!(read_only.update(StencilOp::Replace, 255), 255);

        let low_bits = StencilState {
            write_mask: 0x0F,
            reference: 0xAB,
            ..StencilState::default()
        };
        assert_eq!(low_bits.update(StencilOp::Replace, 0xF0), 0xFB);
    }

    #[test]
    fn test_zero_zero_blend_paints_black() {
        let state = PipelineState {
            blend_src: BlendFactor::Zero,
            blend_dst: BlendFactor::Zero,
            ..PipelineState::default()
        };
        assert_eq!(state.blend([1.0, 0.5, 0.2, 1.0], [0.3, 0.3, 0.3, 1.0]), [0.0; 4]);
        assert_eq!(PipelineState::default().blend([1.0, 0.5, 0.2, 1.0], [0.3; 4]), [1.0, 0.5, 0.2, 1.0]);
    }
}
