use crate::animation::node::{NodeKey, NodeKind, NodeTree};
use crate::scene::pose::SkeletalPose;

/// How a [`BlendNode`] aligns the playback of its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SynchronizationMode {
    /// Every child plays at its own speed.
    #[default]
    None,
    /// Children are time-scaled so that they all start and end their
    /// cycle together, over a weight-averaged virtual duration.
    FirstFrame,
}

/// Weighted accumulation of every child.
///
/// Each child is blended with `base_weight * weight[i]` into the same output
/// pose; the weights are not renormalized unless
/// [`BlendNode::normalize_weights`] is called.
#[derive(Debug, Clone)]
pub struct BlendNode {
    children: Vec<NodeKey>,
    weights: Vec<f32>,
    pub sync_mode: SynchronizationMode,
    pub speed: f32,
    pub(crate) virtual_position: f32,
}

impl BlendNode {
    #[must_use]
    pub fn new(children: Vec<NodeKey>, weights: Vec<f32>, sync_mode: SynchronizationMode) -> Self {
        assert_eq!(
            children.len(),
            weights.len(),
            "blend node needs one weight per child"
        );
        Self {
            children,
            weights,
            sync_mode,
            speed: 1.0,
            virtual_position: 0.0,
        }
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[inline]
    #[must_use]
    pub fn node_weight(&self, index: usize) -> f32 {
        self.weights[index]
    }

    pub fn set_node_weight(&mut self, index: usize, weight: f32) {
        self.weights[index] = weight;
    }

    /// Rescales the weights so they sum to 1. Leaves all-zero weights alone.
    pub fn normalize_weights(&mut self) {
        normalize(&mut self.weights);
    }
}

pub(crate) fn normalize(weights: &mut [f32]) {
    let total: f32 = weights.iter().sum();
    if total > 0.0 {
        for weight in weights {
            *weight /= total;
        }
    }
}

impl NodeTree {
    #[must_use]
    pub fn blend_mut(&mut self, key: NodeKey) -> Option<&mut BlendNode> {
        match self.kind_mut(key) {
            NodeKind::Blend(n) => Some(n),
            _ => None,
        }
    }

    /// Weight-averaged duration of the active, positively weighted children.
    fn virtual_duration(&self, node: &BlendNode) -> f32 {
        let (mut weighted, mut total) = (0.0, 0.0);
        for (&child, &weight) in node.children.iter().zip(&node.weights) {
            if weight > 0.0 && self.is_active(child) {
                weighted += weight * self.duration(child);
                total += weight;
            }
        }
        if total > 0.0 { weighted / total } else { 0.0 }
    }

    pub(super) fn blend_duration(&self, key: NodeKey) -> f32 {
        let Some(node) = self.blend(key) else {
            return 0.0;
        };
        match node.sync_mode {
            SynchronizationMode::FirstFrame => self.virtual_duration(node),
            SynchronizationMode::None => node
                .children
                .iter()
                .map(|&c| self.duration(c))
                .fold(0.0_f32, f32::max),
        }
    }

    pub(super) fn blend_position(&self, key: NodeKey) -> f32 {
        let Some(node) = self.blend(key) else {
            return 0.0;
        };
        match node.sync_mode {
            SynchronizationMode::FirstFrame => node.virtual_position,
            SynchronizationMode::None => node
                .children
                .iter()
                .map(|&c| self.playback_position(c))
                .fold(0.0_f32, f32::max),
        }
    }

    pub(super) fn blend_set_position(&mut self, key: NodeKey, time: f32) {
        let Some(node) = self.blend(key) else {
            return;
        };
        let children = node.children.clone();

        if node.sync_mode == SynchronizationMode::None {
            for child in children {
                self.set_position_node(child, time);
            }
            return;
        }

        let virtual_duration = self.virtual_duration(node);
        let phase = if virtual_duration > 0.0 {
            time / virtual_duration
        } else {
            0.0
        };
        for child in children {
            let child_time = phase * self.duration(child);
            self.set_position_node(child, child_time);
        }
        if let Some(node) = self.blend_mut(key) {
            node.virtual_position = time;
        }
    }

    pub(super) fn blend_tick(&mut self, key: NodeKey, dt: f32) {
        let Some(node) = self.blend(key) else {
            return;
        };
        let dt = dt * node.speed;
        let children = node.children.clone();

        let virtual_duration = match node.sync_mode {
            SynchronizationMode::None => 0.0,
            SynchronizationMode::FirstFrame => self.virtual_duration(node),
        };

        if virtual_duration <= 0.0 {
            for child in children {
                self.tick_node(child, dt);
            }
            return;
        }

        for child in children {
            let duration = self.duration(child);
            let child_dt = if duration > 0.0 {
                dt * duration / virtual_duration
            } else {
                dt
            };
            self.tick_node(child, child_dt);
        }

        if let Some(node) = self.blend_mut(key) {
            node.virtual_position = (node.virtual_position + dt).rem_euclid(virtual_duration);
        }
    }

    pub(super) fn blend_blend_state(&self, key: NodeKey, pose: &mut SkeletalPose, base_weight: f32) {
        let Some(node) = self.blend(key) else {
            return;
        };
        for (&child, &weight) in node.children.iter().zip(&node.weights) {
            // A zero weight must leave the accumulated pose untouched
            if weight > 0.0 {
                self.blend_state(child, pose, base_weight * weight);
            }
        }
    }
}
