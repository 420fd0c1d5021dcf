//! Per-tick scene animation
//!
//! An [`Animator`] is ticked once per frame, after drawing, and mutates the
//! transform of one designated node. Scene mutation never happens during a
//! traversal.

use crate::core::config::AnimationConfig;
use crate::foundation::collections::NodeKey;
use crate::foundation::math::{Mat4, Quat, Unit, Vec3};
use crate::scene::scene_graph::Scene;

/// Advances animation state once per tick
pub trait Animator {
    /// Apply one tick to `scene`
    fn advance(&mut self, scene: &mut Scene);
}

/// Animator that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct Still;

impl Animator for Still {
    fn advance(&mut self, _scene: &mut Scene) {}
}

/// Slides a node's world Z back and forth
///
/// Time advances by `step` each tick and wraps to zero once it reaches
/// `period`; the node's Z translation is then `base + amplitude * time`.
#[derive(Debug, Clone)]
pub struct OscillatingTranslation {
    target: NodeKey,
    time: f32,
    step: f32,
    period: f32,
    base: f32,
    amplitude: f32,
}

impl OscillatingTranslation {
    /// Animate `target` with the configured step and oscillation
    pub fn new(target: NodeKey, config: &AnimationConfig) -> Self {
        Self {
            target,
            time: 0.0,
            step: config.step,
            period: config.period,
            base: config.base,
            amplitude: config.amplitude,
        }
    }

    /// Animation time after the last tick
    pub fn time(&self) -> f32 {
        self.time
    }
}

impl Animator for OscillatingTranslation {
    fn advance(&mut self, scene: &mut Scene) {
        self.time += self.step;
        if self.time >= self.period {
            self.time = 0.0;
        }
        match scene.node_mut(self.target) {
            Some(node) => {
                let mut transform = *node.transform();
                transform[(2, 3)] = self.base + self.amplitude * self.time;
                node.set_transform(transform);
            }
            None => log::trace!("Animation target {:?} is gone", self.target),
        }
    }
}

/// Spins a node about a fixed model-space axis
#[derive(Debug, Clone)]
pub struct AxisRotation {
    target: NodeKey,
    step: Mat4,
}

impl AxisRotation {
    /// Rotate `target` by `radians_per_tick` about `axis` every tick
    pub fn new(target: NodeKey, axis: Vec3, radians_per_tick: f32) -> Self {
        let rotation = Quat::from_axis_angle(&Unit::new_normalize(axis), radians_per_tick);
        Self {
            target,
            step: rotation.to_homogeneous(),
        }
    }
}

impl Animator for AxisRotation {
    fn advance(&mut self, scene: &mut Scene) {
        if let Some(node) = scene.node_mut(self.target) {
            let transform = node.transform() * self.step;
            node.set_transform(transform);
        }
    }
}
