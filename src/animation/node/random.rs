use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use crate::animation::node::{AnimationEvent, NodeKey, NodeKind, NodeTree};

/// Plays one child at a time, chosen at random with per-child probabilities.
///
/// With automatic switching enabled a new child is drawn each time the
/// current one finishes.
#[derive(Debug)]
pub struct RandomNode {
    children: Vec<NodeKey>,
    probabilities: Vec<f32>,
    /// Running sum of `probabilities`; the last entry is their total.
    cumulative: Vec<f32>,
    automatic_switch: bool,
    current: Option<usize>,
    playing: bool,
    rng: StdRng,
    pub speed: f32,
}

impl RandomNode {
    #[must_use]
    pub fn new(
        children: Vec<NodeKey>,
        probabilities: Vec<f32>,
        automatic_switch: bool,
        seed: u64,
    ) -> Self {
        assert_eq!(
            children.len(),
            probabilities.len(),
            "random node needs one probability per child"
        );
        let mut node = Self {
            children,
            probabilities,
            cumulative: Vec::new(),
            automatic_switch,
            current: None,
            playing: false,
            rng: StdRng::seed_from_u64(seed),
            speed: 1.0,
        };
        node.rebuild_cumulative();
        node.current = node.pick();
        node
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn cumulative_probabilities(&self) -> &[f32] {
        &self.cumulative
    }

    #[inline]
    #[must_use]
    pub fn node_probability(&self, index: usize) -> f32 {
        self.probabilities[index]
    }

    /// Negative probabilities are treated as zero.
    pub fn set_node_probability(&mut self, index: usize, probability: f32) {
        self.probabilities[index] = probability;
        self.rebuild_cumulative();
    }

    #[inline]
    #[must_use]
    pub fn automatic_switch(&self) -> bool {
        self.automatic_switch
    }

    pub fn set_automatic_switch(&mut self, automatic_switch: bool) {
        self.automatic_switch = automatic_switch;
    }

    #[inline]
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    #[inline]
    #[must_use]
    pub fn current_node(&self) -> Option<NodeKey> {
        self.current.map(|i| self.children[i])
    }

    /// Draws a child index.
    ///
    /// A child with zero probability is never drawn unless every probability
    /// is zero, in which case the draw is uniform.
    pub fn pick(&mut self) -> Option<usize> {
        let len = self.children.len();
        if len == 0 {
            return None;
        }

        let total = self.cumulative[len - 1];
        if total <= 0.0 {
            return Some(self.rng.random_range(0..len));
        }

        let r = self.rng.random_range(0.0..total);
        let index = self.cumulative.partition_point(|&c| c <= r);
        Some(index.min(len - 1))
    }

    fn rebuild_cumulative(&mut self) {
        let mut sum = 0.0;
        self.cumulative = self
            .probabilities
            .iter()
            .map(|&p| {
                sum += p.max(0.0);
                sum
            })
            .collect();
    }
}

impl NodeTree {
    #[must_use]
    pub fn random_mut(&mut self, key: NodeKey) -> Option<&mut RandomNode> {
        match self.kind_mut(key) {
            NodeKind::Random(n) => Some(n),
            _ => None,
        }
    }

    /// Draws a new current child. If the node is playing, the previous child
    /// is stopped and the new one restarted from the beginning.
    pub fn switch_random(&mut self, key: NodeKey) {
        self.random_switch(key);
        self.flush_events();
    }

    pub(super) fn random_play(&mut self, key: NodeKey) {
        let Some(node) = self.random_mut(key) else {
            return;
        };
        node.playing = true;
        if let Some(child) = node.current_node() {
            self.play_node(child);
        }
    }

    pub(super) fn random_stop(&mut self, key: NodeKey) {
        let Some(node) = self.random_mut(key) else {
            return;
        };
        node.playing = false;
        if let Some(child) = node.current_node() {
            self.stop_node(child);
        }
    }

    fn random_switch(&mut self, key: NodeKey) {
        let Some(node) = self.random_mut(key) else {
            return;
        };
        let previous = node.current_node();
        let playing = node.playing;
        node.current = node.pick();
        let next = node.current_node();
        log::trace!("Random node switched to child {:?}", node.current);

        if playing {
            if let Some(previous) = previous {
                self.stop_node(previous);
            }
            if let Some(next) = next {
                self.reset_node(next);
                self.play_node(next);
            }
        }
        self.emit(key, AnimationEvent::DurationChanged);
    }

    pub(super) fn random_child_event(&mut self, parent: NodeKey, child: NodeKey, event: AnimationEvent) {
        let Some(node) = self.random(parent) else {
            return;
        };
        if node.current_node() != Some(child) {
            return;
        }
        let automatic_switch = node.automatic_switch;
        match event {
            AnimationEvent::Finished if automatic_switch => self.random_switch(parent),
            AnimationEvent::PlayStateChanged(_) => self.refresh_play_state(parent),
            _ => self.emit(parent, event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn keys(n: usize) -> Vec<NodeKey> {
        let mut map: SlotMap<NodeKey, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_cumulative_table_is_monotonic() {
        let node = RandomNode::new(keys(4), vec![0.5, 0.0, 1.5, 2.0], false, 7);
        let table = node.cumulative_probabilities();
        assert!(table.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*table.last().unwrap(), 4.0);
    }

    #[test]
    fn test_zero_probability_never_picked() {
        let mut node = RandomNode::new(keys(3), vec![1.0, 0.0, 1.0], false, 3);
        for _ in 0..1000 {
            assert_ne!(node.pick(), Some(1));
        }
    }

    #[test]
    fn test_all_zero_falls_back_to_uniform() {
        let mut node = RandomNode::new(keys(3), vec![0.0; 3], false, 11);
        let mut seen = [false; 3];
        for _ in 0..300 {
            seen[node.pick().unwrap()] = true;
        }
        assert_eq!(seen, [true; 3]);
    }

    #[test]
    fn test_empty_node_picks_nothing() {
        let mut node = RandomNode::new(Vec::new(), Vec::new(), true, 0);
        assert_eq!(node.pick(), None);
        assert_eq!(node.current_node(), None);
    }
}
