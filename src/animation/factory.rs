//! Animation Node Factories
//!
//! Factories are the authored, immutable description of a blend tree. They
//! live in an [`AnimationPacketFactory`](crate::animation::AnimationPacketFactory)
//! and reference each other by [`NodeFactoryKey`]; every
//! `create_instance` call turns them into a fresh set of live nodes.

use rustc_hash::FxHashMap;
use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::animation::node::{StateId, SynchronizationMode};
use crate::animation::node::blend;

new_key_type! {
    /// Handle to a node factory inside a packet factory.
    pub struct NodeFactoryKey;
}

#[derive(Debug, Clone)]
pub struct NodeFactory {
    pub(crate) name: String,
    pub(crate) kind: NodeFactoryKind,
}

impl NodeFactory {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &NodeFactoryKind {
        &self.kind
    }

    /// Every factory this one instantiates as a child or transition.
    #[must_use]
    pub fn children(&self) -> SmallVec<[NodeFactoryKey; 8]> {
        match &self.kind {
            NodeFactoryKind::Clip(_) => SmallVec::new(),
            NodeFactoryKind::Blend(f) => f.nodes.iter().copied().collect(),
            NodeFactoryKind::Priority(f) => f.nodes.iter().copied().collect(),
            NodeFactoryKind::Random(f) => f.nodes.iter().copied().collect(),
            NodeFactoryKind::Fsm(f) => f
                .states
                .iter()
                .filter_map(|s| s.node)
                .chain(f.transitions.values().filter_map(|t| t.node))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeFactoryKind {
    Clip(ClipNodeFactory),
    Blend(BlendNodeFactory),
    Priority(PriorityNodeFactory),
    Random(RandomNodeFactory),
    Fsm(FsmNodeFactory),
}

// ============================================================================
// Clip
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ClipNodeFactory {
    /// Clip to play. Falls back to the node's own name when unset.
    pub animation: Option<String>,
    pub cyclic: bool,
    pub playback_speed: f32,
    /// `play` rewinds to the start.
    pub automatic_reset: bool,
    /// Reaching the end stops playback.
    pub automatic_stop: bool,
}

impl Default for ClipNodeFactory {
    fn default() -> Self {
        Self {
            animation: None,
            cyclic: false,
            playback_speed: 1.0,
            automatic_reset: false,
            automatic_stop: true,
        }
    }
}

impl ClipNodeFactory {
    pub fn set_animation(&mut self, name: &str) {
        self.animation = Some(name.to_string());
    }
}

// ============================================================================
// Blend
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlendNodeFactory {
    nodes: Vec<NodeFactoryKey>,
    weights: Vec<f32>,
    pub sync_mode: SynchronizationMode,
}

impl BlendNodeFactory {
    pub fn add_node(&mut self, node: NodeFactoryKey, weight: f32) {
        self.nodes.push(node);
        self.weights.push(weight);
    }

    pub fn set_node_weight(&mut self, index: usize, weight: f32) {
        self.weights[index] = weight;
    }

    #[must_use]
    pub fn node_weight(&self, index: usize) -> f32 {
        self.weights[index]
    }

    pub fn normalize_weights(&mut self) {
        blend::normalize(&mut self.weights);
    }

    #[must_use]
    pub fn node(&self, index: usize) -> NodeFactoryKey {
        self.nodes[index]
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn remove_node(&mut self, index: usize) {
        self.nodes.remove(index);
        self.weights.remove(index);
    }

    pub fn clear_nodes(&mut self) {
        self.nodes.clear();
        self.weights.clear();
    }

    pub(crate) fn weights(&self) -> &[f32] {
        &self.weights
    }
}

// ============================================================================
// Priority
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityNodeFactory {
    nodes: Vec<NodeFactoryKey>,
    priorities: Vec<u32>,
}

impl PriorityNodeFactory {
    pub fn add_node(&mut self, node: NodeFactoryKey, priority: u32) {
        self.nodes.push(node);
        self.priorities.push(priority);
    }

    pub fn set_node_priority(&mut self, index: usize, priority: u32) {
        self.priorities[index] = priority;
    }

    #[must_use]
    pub fn node_priority(&self, index: usize) -> u32 {
        self.priorities[index]
    }

    #[must_use]
    pub fn node(&self, index: usize) -> NodeFactoryKey {
        self.nodes[index]
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn remove_node(&mut self, index: usize) {
        self.nodes.remove(index);
        self.priorities.remove(index);
    }

    pub fn clear_nodes(&mut self) {
        self.nodes.clear();
        self.priorities.clear();
    }

    pub(crate) fn priorities(&self) -> &[u32] {
        &self.priorities
    }
}

// ============================================================================
// Random
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RandomNodeFactory {
    nodes: Vec<NodeFactoryKey>,
    probabilities: Vec<f32>,
    /// Draw a new child whenever the current one finishes.
    pub automatic_switch: bool,
    /// Seed of the selection sequence, mixed with the per-instance seed.
    pub seed: u64,
}

impl RandomNodeFactory {
    pub fn add_node(&mut self, node: NodeFactoryKey, probability: f32) {
        self.nodes.push(node);
        self.probabilities.push(probability);
    }

    pub fn set_node_probability(&mut self, index: usize, probability: f32) {
        self.probabilities[index] = probability;
    }

    #[must_use]
    pub fn node_probability(&self, index: usize) -> f32 {
        self.probabilities[index]
    }

    #[must_use]
    pub fn node(&self, index: usize) -> NodeFactoryKey {
        self.nodes[index]
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn remove_node(&mut self, index: usize) {
        self.nodes.remove(index);
        self.probabilities.remove(index);
    }

    pub fn clear_nodes(&mut self) {
        self.nodes.clear();
        self.probabilities.clear();
    }

    pub(crate) fn probabilities(&self) -> &[f32] {
        &self.probabilities
    }
}

// ============================================================================
// Finite state machine
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FsmStateFactory {
    pub name: String,
    pub node: Option<NodeFactoryKey>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FsmTransitionFactory {
    pub node: Option<NodeFactoryKey>,
    pub fade_out: f32,
    pub fade_in: f32,
    pub automatic: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FsmNodeFactory {
    states: Vec<FsmStateFactory>,
    transitions: FxHashMap<(StateId, StateId), FsmTransitionFactory>,
    start_state: StateId,
}

impl FsmNodeFactory {
    /// Appends a state and returns its id.
    pub fn add_state(&mut self, name: &str, node: Option<NodeFactoryKey>) -> StateId {
        self.states.push(FsmStateFactory {
            name: name.to_string(),
            node,
        });
        (self.states.len() - 1) as StateId
    }

    pub fn set_state_node(&mut self, state: StateId, node: Option<NodeFactoryKey>) {
        self.states[state as usize].node = node;
    }

    #[must_use]
    pub fn state_node(&self, state: StateId) -> Option<NodeFactoryKey> {
        self.states[state as usize].node
    }

    pub fn set_state_name(&mut self, state: StateId, name: &str) {
        self.states[state as usize].name = name.to_string();
    }

    #[must_use]
    pub fn state_name(&self, state: StateId) -> &str {
        &self.states[state as usize].name
    }

    #[must_use]
    pub fn find_state(&self, name: &str) -> Option<StateId> {
        self.states
            .iter()
            .position(|s| s.name == name)
            .map(|i| i as StateId)
    }

    pub fn set_start_state(&mut self, state: StateId) {
        self.start_state = state;
    }

    #[must_use]
    pub fn start_state(&self) -> StateId {
        self.start_state
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn clear_states(&mut self) {
        self.states.clear();
        self.transitions.clear();
        self.start_state = 0;
    }

    /// Plays `node` between `from` and `to` whenever the machine switches
    /// from the one to the other.
    pub fn set_state_transition(&mut self, from: StateId, to: StateId, node: Option<NodeFactoryKey>) {
        self.transitions.entry((from, to)).or_default().node = node;
    }

    pub fn set_transition_crossfade(&mut self, from: StateId, to: StateId, fade_out: f32, fade_in: f32) {
        let transition = self.transitions.entry((from, to)).or_default();
        transition.fade_out = fade_out.max(0.0);
        transition.fade_in = fade_in.max(0.0);
    }

    pub fn set_automatic_transition(&mut self, from: StateId, to: StateId, automatic: bool) {
        self.transitions.entry((from, to)).or_default().automatic = automatic;
    }

    #[must_use]
    pub fn transition(&self, from: StateId, to: StateId) -> Option<&FsmTransitionFactory> {
        self.transitions.get(&(from, to))
    }

    pub(crate) fn states(&self) -> &[FsmStateFactory] {
        &self.states
    }

    pub(crate) fn transitions(&self) -> impl Iterator<Item = (&(StateId, StateId), &FsmTransitionFactory)> {
        self.transitions.iter()
    }
}
