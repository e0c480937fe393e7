use crate::animation::node::{NodeKey, NodeKind, NodeTree};
use crate::scene::pose::SkeletalPose;

/// Layers its children by priority: all children play, and they are blended
/// from the lowest to the highest priority so higher layers overwrite the
/// bones they animate.
#[derive(Debug, Clone)]
pub struct PriorityNode {
    children: Vec<NodeKey>,
    priorities: Vec<u32>,
    /// Child indices sorted by ascending priority (stable).
    order: Vec<usize>,
    pub speed: f32,
}

impl PriorityNode {
    #[must_use]
    pub fn new(children: Vec<NodeKey>, priorities: Vec<u32>) -> Self {
        assert_eq!(
            children.len(),
            priorities.len(),
            "priority node needs one priority per child"
        );
        let mut node = Self {
            children,
            priorities,
            order: Vec::new(),
            speed: 1.0,
        };
        node.rebuild_order();
        node
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn node_priority(&self, index: usize) -> u32 {
        self.priorities[index]
    }

    pub fn set_node_priority(&mut self, index: usize, priority: u32) {
        self.priorities[index] = priority;
        self.rebuild_order();
    }

    /// Child indices in evaluation order.
    #[inline]
    #[must_use]
    pub fn evaluation_order(&self) -> &[usize] {
        &self.order
    }

    fn rebuild_order(&mut self) {
        self.order = (0..self.children.len()).collect();
        let priorities = &self.priorities;
        self.order.sort_by_key(|&i| priorities[i]);
    }
}

impl NodeTree {
    #[must_use]
    pub fn priority_mut(&mut self, key: NodeKey) -> Option<&mut PriorityNode> {
        match self.kind_mut(key) {
            NodeKind::Priority(n) => Some(n),
            _ => None,
        }
    }

    pub(super) fn priority_blend_state(&self, key: NodeKey, pose: &mut SkeletalPose, weight: f32) {
        let Some(node) = self.priority(key) else {
            return;
        };
        for &index in &node.order {
            self.blend_state(node.children[index], pose, weight);
        }
    }
}
