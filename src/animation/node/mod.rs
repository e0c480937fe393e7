//! Animation Node Tree
//!
//! A blend tree is a graph of animation nodes owned by one [`NodeTree`]
//! arena. Leaves play keyframe clips; composites combine their children:
//!
//! - [`BlendNode`]: weighted accumulation of every child
//! - [`FsmNode`]: exactly one named state (child) plays at a time
//! - [`PriorityNode`]: children applied lowest to highest priority, so
//!   higher priorities overwrite lower ones
//! - [`RandomNode`]: one child at a time, chosen by probability
//!
//! Nodes are addressed by [`NodeKey`]. A node may be the child of several
//! composites (the packet instantiates each named node once), so the arena
//! rather than any single parent owns it.
//!
//! # Events
//!
//! Nodes raise [`AnimationEvent`]s while they are played, stopped or ticked.
//! Events are queued and dispatched once the public operation that caused
//! them returns: each event is delivered to the node's own callbacks and
//! then to its parents, which may react (automatic switches, state machine
//! transitions) and raise events of their own.

pub mod blend;
pub mod callback;
pub mod clip_node;
pub mod fsm;
pub mod priority;
pub mod random;

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::scene::pose::SkeletalPose;

pub use blend::{BlendNode, SynchronizationMode};
pub use callback::{AnimationCallback, AnimationEvent, CallbackId};
pub use clip_node::ClipNode;
pub use fsm::{FsmNode, StateId};
pub use priority::PriorityNode;
pub use random::RandomNode;

use callback::CallbackList;

new_key_type! {
    /// Handle to a live node inside a [`NodeTree`].
    pub struct NodeKey;
}

pub(crate) type ChildList = SmallVec<[NodeKey; 8]>;

/// The concrete behaviour of a node.
#[derive(Debug)]
pub enum NodeKind {
    Clip(ClipNode),
    Blend(BlendNode),
    Fsm(FsmNode),
    Priority(PriorityNode),
    Random(RandomNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeTag {
    Clip,
    Blend,
    Fsm,
    Priority,
    Random,
}

impl NodeKind {
    fn tag(&self) -> NodeTag {
        match self {
            Self::Clip(_) => NodeTag::Clip,
            Self::Blend(_) => NodeTag::Blend,
            Self::Fsm(_) => NodeTag::Fsm,
            Self::Priority(_) => NodeTag::Priority,
            Self::Random(_) => NodeTag::Random,
        }
    }

    /// Every node this node references, state machine transitions included.
    pub(crate) fn children(&self) -> ChildList {
        match self {
            Self::Clip(_) => ChildList::new(),
            Self::Blend(n) => n.children().iter().copied().collect(),
            Self::Priority(n) => n.children().iter().copied().collect(),
            Self::Random(n) => n.children().iter().copied().collect(),
            Self::Fsm(n) => n.referenced_nodes(),
        }
    }
}

/// A node in the arena: its behaviour plus the bookkeeping shared by all kinds.
#[derive(Debug)]
pub struct AnimNode {
    name: String,
    parents: SmallVec<[NodeKey; 2]>,
    callbacks: CallbackList,
    /// Last play state reported by a composite through `PlayStateChanged`.
    reported_active: bool,
    kind: NodeKind,
}

impl AnimNode {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    #[must_use]
    pub fn parents(&self) -> &[NodeKey] {
        &self.parents
    }

    #[inline]
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }
}

/// Arena owning every live node of one packet instance.
#[derive(Debug, Default)]
pub struct NodeTree {
    nodes: SlotMap<NodeKey, AnimNode>,
    names: FxHashMap<String, NodeKey>,
    pending: VecDeque<(NodeKey, AnimationEvent)>,
    next_callback_id: u64,
}

impl NodeTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and links it as parent of every node it references.
    pub(crate) fn insert(&mut self, name: &str, kind: NodeKind) -> NodeKey {
        let children = kind.children();
        let key = self.nodes.insert(AnimNode {
            name: name.to_string(),
            parents: SmallVec::new(),
            callbacks: CallbackList::default(),
            reported_active: false,
            kind,
        });

        for child in children {
            let parents = &mut self.nodes[child].parents;
            if !parents.contains(&key) {
                parents.push(key);
            }
        }

        self.names.insert(name.to_string(), key);
        key
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    #[inline]
    #[must_use]
    pub fn node(&self, key: NodeKey) -> &AnimNode {
        &self.nodes[key]
    }

    /// Looks a node up by name anywhere in the arena.
    #[must_use]
    pub fn node_by_name(&self, name: &str) -> Option<NodeKey> {
        self.names.get(name).copied()
    }

    /// Searches `key` and its descendants for a node called `name`.
    #[must_use]
    pub fn find_node(&self, key: NodeKey, name: &str) -> Option<NodeKey> {
        let node = &self.nodes[key];
        if node.name == name {
            return Some(key);
        }
        node.kind
            .children()
            .into_iter()
            .find_map(|child| self.find_node(child, name))
    }

    #[must_use]
    pub fn children(&self, key: NodeKey) -> ChildList {
        self.nodes[key].kind.children()
    }

    #[must_use]
    pub fn clip(&self, key: NodeKey) -> Option<&ClipNode> {
        match &self.nodes[key].kind {
            NodeKind::Clip(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn blend(&self, key: NodeKey) -> Option<&BlendNode> {
        match &self.nodes[key].kind {
            NodeKind::Blend(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn fsm(&self, key: NodeKey) -> Option<&FsmNode> {
        match &self.nodes[key].kind {
            NodeKind::Fsm(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn priority(&self, key: NodeKey) -> Option<&PriorityNode> {
        match &self.nodes[key].kind {
            NodeKind::Priority(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn random(&self, key: NodeKey) -> Option<&RandomNode> {
        match &self.nodes[key].kind {
            NodeKind::Random(n) => Some(n),
            _ => None,
        }
    }

    // ========================================================================
    // Callbacks
    // ========================================================================

    pub fn add_animation_callback(
        &mut self,
        key: NodeKey,
        callback: impl AnimationCallback + 'static,
    ) -> CallbackId {
        let id = CallbackId(self.next_callback_id);
        self.next_callback_id += 1;
        self.nodes[key].callbacks.push(id, Box::new(callback));
        id
    }

    /// Returns `false` if the callback was not registered on `key`.
    pub fn remove_animation_callback(&mut self, key: NodeKey, id: CallbackId) -> bool {
        self.nodes[key].callbacks.remove(id)
    }

    // ========================================================================
    // Playback control
    // ========================================================================

    pub fn play(&mut self, key: NodeKey) {
        self.play_node(key);
        self.flush_events();
    }

    pub fn stop(&mut self, key: NodeKey) {
        self.stop_node(key);
        self.flush_events();
    }

    /// Rewinds the node (and its subtree) to the start and restores the
    /// configured playback speed of every clip. Play state is unchanged.
    pub fn reset(&mut self, key: NodeKey) {
        self.reset_node(key);
        self.flush_events();
    }

    pub fn set_playback_position(&mut self, key: NodeKey, time: f32) {
        self.set_position_node(key, time);
        self.flush_events();
    }

    #[must_use]
    pub fn playback_position(&self, key: NodeKey) -> f32 {
        match &self.nodes[key].kind {
            NodeKind::Clip(n) => n.playback_position(),
            NodeKind::Blend(_) => self.blend_position(key),
            NodeKind::Fsm(n) => n.active_child().map_or(0.0, |c| self.playback_position(c)),
            NodeKind::Random(n) => n.current_node().map_or(0.0, |c| self.playback_position(c)),
            NodeKind::Priority(n) => self.max_over(n.children(), Self::playback_position),
        }
    }

    #[must_use]
    pub fn duration(&self, key: NodeKey) -> f32 {
        match &self.nodes[key].kind {
            NodeKind::Clip(n) => n.duration(),
            NodeKind::Blend(_) => self.blend_duration(key),
            NodeKind::Fsm(n) => n.active_child().map_or(0.0, |c| self.duration(c)),
            NodeKind::Random(n) => n.current_node().map_or(0.0, |c| self.duration(c)),
            NodeKind::Priority(n) => self.max_over(n.children(), Self::duration),
        }
    }

    pub fn set_playback_speed(&mut self, key: NodeKey, speed: f32) {
        match &mut self.nodes[key].kind {
            NodeKind::Clip(n) => n.set_playback_speed(speed),
            NodeKind::Blend(n) => n.speed = speed,
            NodeKind::Fsm(n) => n.speed = speed,
            NodeKind::Priority(n) => n.speed = speed,
            NodeKind::Random(n) => n.speed = speed,
        }
    }

    #[must_use]
    pub fn playback_speed(&self, key: NodeKey) -> f32 {
        match &self.nodes[key].kind {
            NodeKind::Clip(n) => n.playback_speed(),
            NodeKind::Blend(n) => n.speed,
            NodeKind::Fsm(n) => n.speed,
            NodeKind::Priority(n) => n.speed,
            NodeKind::Random(n) => n.speed,
        }
    }

    #[must_use]
    pub fn is_active(&self, key: NodeKey) -> bool {
        match &self.nodes[key].kind {
            NodeKind::Clip(n) => n.is_active(),
            NodeKind::Blend(n) => n.children().iter().any(|&c| self.is_active(c)),
            NodeKind::Priority(n) => n.children().iter().any(|&c| self.is_active(c)),
            NodeKind::Fsm(n) => n.active_child().is_some_and(|c| self.is_active(c)),
            NodeKind::Random(n) => n.current_node().is_some_and(|c| self.is_active(c)),
        }
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Advances the node and its subtree by `dt` seconds.
    pub fn tick_animation(&mut self, key: NodeKey, dt: f32) {
        self.tick_node(key, dt);
        self.flush_events();
    }

    /// Blends the node's current pose into `pose` with `weight`.
    pub fn blend_state(&self, key: NodeKey, pose: &mut SkeletalPose, weight: f32) {
        match &self.nodes[key].kind {
            NodeKind::Clip(n) => n.blend_state(pose, weight),
            NodeKind::Blend(_) => self.blend_blend_state(key, pose, weight),
            NodeKind::Fsm(_) => self.fsm_blend_state(key, pose, weight),
            NodeKind::Priority(_) => self.priority_blend_state(key, pose, weight),
            NodeKind::Random(n) => {
                if let Some(child) = n.current_node() {
                    self.blend_state(child, pose, weight);
                }
            }
        }
    }

    // ========================================================================
    // Internal dispatch (events are queued, not flushed)
    // ========================================================================

    fn tag(&self, key: NodeKey) -> NodeTag {
        self.nodes[key].kind.tag()
    }

    pub(crate) fn kind_mut(&mut self, key: NodeKey) -> &mut NodeKind {
        &mut self.nodes[key].kind
    }

    pub(crate) fn emit(&mut self, key: NodeKey, event: AnimationEvent) {
        self.pending.push_back((key, event));
    }

    pub(crate) fn play_node(&mut self, key: NodeKey) {
        match self.tag(key) {
            NodeTag::Clip => {
                if let NodeKind::Clip(n) = self.kind_mut(key)
                    && let Some(event) = n.play()
                {
                    self.emit(key, event);
                }
            }
            NodeTag::Blend | NodeTag::Priority => {
                for child in self.children(key) {
                    self.play_node(child);
                }
            }
            NodeTag::Fsm => self.fsm_play(key),
            NodeTag::Random => self.random_play(key),
        }
    }

    pub(crate) fn stop_node(&mut self, key: NodeKey) {
        match self.tag(key) {
            NodeTag::Clip => {
                if let NodeKind::Clip(n) = self.kind_mut(key)
                    && let Some(event) = n.stop()
                {
                    self.emit(key, event);
                }
            }
            NodeTag::Blend | NodeTag::Priority => {
                for child in self.children(key) {
                    self.stop_node(child);
                }
            }
            NodeTag::Fsm => self.fsm_stop(key),
            NodeTag::Random => self.random_stop(key),
        }
    }

    pub(crate) fn reset_node(&mut self, key: NodeKey) {
        match self.tag(key) {
            NodeTag::Clip => {
                if let NodeKind::Clip(n) = self.kind_mut(key) {
                    n.reset();
                }
            }
            NodeTag::Blend => {
                if let NodeKind::Blend(n) = self.kind_mut(key) {
                    n.virtual_position = 0.0;
                }
                for child in self.children(key) {
                    self.reset_node(child);
                }
            }
            NodeTag::Priority | NodeTag::Random => {
                for child in self.children(key) {
                    self.reset_node(child);
                }
            }
            NodeTag::Fsm => self.fsm_reset(key),
        }
    }

    pub(crate) fn set_position_node(&mut self, key: NodeKey, time: f32) {
        match self.tag(key) {
            NodeTag::Clip => {
                if let NodeKind::Clip(n) = self.kind_mut(key) {
                    n.set_playback_position(time);
                }
            }
            NodeTag::Blend => self.blend_set_position(key, time),
            NodeTag::Priority => {
                for child in self.children(key) {
                    self.set_position_node(child, time);
                }
            }
            NodeTag::Fsm => {
                if let Some(child) = self.fsm(key).and_then(FsmNode::active_child) {
                    self.set_position_node(child, time);
                }
            }
            NodeTag::Random => {
                if let Some(child) = self.random(key).and_then(RandomNode::current_node) {
                    self.set_position_node(child, time);
                }
            }
        }
    }

    pub(crate) fn tick_node(&mut self, key: NodeKey, dt: f32) {
        match self.tag(key) {
            NodeTag::Clip => {
                if let NodeKind::Clip(n) = self.kind_mut(key) {
                    let events = n.tick(dt);
                    for event in events {
                        self.emit(key, event);
                    }
                }
            }
            NodeTag::Blend => self.blend_tick(key, dt),
            NodeTag::Fsm => self.fsm_tick(key, dt),
            NodeTag::Priority => {
                let dt = dt * self.playback_speed(key);
                for child in self.children(key) {
                    self.tick_node(child, dt);
                }
            }
            NodeTag::Random => {
                let dt = dt * self.playback_speed(key);
                if let Some(child) = self.random(key).and_then(RandomNode::current_node) {
                    self.tick_node(child, dt);
                }
            }
        }
    }

    fn max_over(&self, children: &[NodeKey], f: impl Fn(&Self, NodeKey) -> f32) -> f32 {
        children
            .iter()
            .map(|&c| f(self, c))
            .fold(0.0_f32, f32::max)
    }

    // ========================================================================
    // Event propagation
    // ========================================================================

    /// Re-evaluates a composite's play state and reports it if it flipped.
    pub(crate) fn refresh_play_state(&mut self, key: NodeKey) {
        let active = self.is_active(key);
        let node = &mut self.nodes[key];
        if node.reported_active != active {
            node.reported_active = active;
            self.emit(key, AnimationEvent::PlayStateChanged(active));
        }
    }

    fn flush_events(&mut self) {
        while let Some((key, event)) = self.pending.pop_front() {
            let node = &mut self.nodes[key];
            node.callbacks.notify(key, event);
            let parents = node.parents.clone();
            for parent in parents {
                self.handle_child_event(parent, key, event);
            }
        }
    }

    fn handle_child_event(&mut self, parent: NodeKey, child: NodeKey, event: AnimationEvent) {
        match self.tag(parent) {
            NodeTag::Blend | NodeTag::Priority => match event {
                AnimationEvent::PlayStateChanged(_) => self.refresh_play_state(parent),
                AnimationEvent::Finished => {
                    // Only the child that ends the composite's run reports for it
                    if !self.is_active(parent) && self.nodes[parent].reported_active {
                        self.emit(parent, AnimationEvent::Finished);
                    }
                }
                AnimationEvent::Cycled | AnimationEvent::DurationChanged => {
                    self.emit(parent, event);
                }
            },
            NodeTag::Fsm => self.fsm_child_event(parent, child, event),
            NodeTag::Random => self.random_child_event(parent, child, event),
            NodeTag::Clip => {}
        }
    }
}
