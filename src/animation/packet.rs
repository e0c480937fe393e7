//! Animation Packets
//!
//! [`AnimationPacketFactory`] is the shared template of a character's
//! animation setup: a registry of keyframe clips plus a graph of node
//! factories with one root. [`AnimationPacketFactory::create_instance`]
//! builds an [`AnimationPacket`], the live node tree owned by a single
//! skeleton instance.
//!
//! Instantiation is idempotent per node: a factory referenced by several
//! composites becomes one live node with several parents, so they share its
//! playback state.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::animation::clip::AnimationClip;
use crate::animation::factory::{
    BlendNodeFactory, ClipNodeFactory, FsmNodeFactory, NodeFactory, NodeFactoryKey,
    NodeFactoryKind, PriorityNodeFactory, RandomNodeFactory,
};
use crate::animation::node::{
    BlendNode, ClipNode, FsmNode, NodeKey, NodeKind, NodeTree, PriorityNode, RandomNode,
};
use crate::animation::node::fsm::{FsmState, FsmTransition};
use crate::errors::{Result, SkeletonError};
use crate::scene::pose::SkeletalPose;

#[derive(Debug, Clone, Default)]
pub struct AnimationPacketFactory {
    animations: Vec<Arc<AnimationClip>>,
    animation_names: FxHashMap<String, usize>,
    nodes: SlotMap<NodeFactoryKey, NodeFactory>,
    node_names: FxHashMap<String, NodeFactoryKey>,
    root: Option<NodeFactoryKey>,
}

impl AnimationPacketFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Clip registry
    // ========================================================================

    /// Registers an empty clip and returns it for keyframe authoring.
    pub fn create_animation(&mut self, name: &str) -> Result<&mut AnimationClip> {
        if self.animation_names.contains_key(name) {
            return Err(SkeletonError::DuplicateName(name.to_string()));
        }
        let index = self.animations.len();
        self.animations.push(Arc::new(AnimationClip::new(name)));
        self.animation_names.insert(name.to_string(), index);
        log::debug!("Animation '{name}' created");
        Ok(Arc::make_mut(&mut self.animations[index]))
    }

    #[must_use]
    pub fn find_animation(&self, name: &str) -> Option<&AnimationClip> {
        self.animation_names
            .get(name)
            .map(|&i| self.animations[i].as_ref())
    }

    /// Mutable access to a clip. Live instances keep the data they were
    /// created with.
    pub fn animation_mut(&mut self, name: &str) -> Option<&mut AnimationClip> {
        let index = *self.animation_names.get(name)?;
        Some(Arc::make_mut(&mut self.animations[index]))
    }

    #[must_use]
    pub fn animation(&self, index: usize) -> &AnimationClip {
        &self.animations[index]
    }

    #[must_use]
    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    pub fn remove_animation(&mut self, name: &str) -> bool {
        let Some(index) = self.animation_names.remove(name) else {
            return false;
        };
        self.animations.remove(index);
        for slot in self.animation_names.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        true
    }

    pub fn clear_animations(&mut self) {
        self.animations.clear();
        self.animation_names.clear();
    }

    // ========================================================================
    // Node factories
    // ========================================================================

    pub fn set_animation_root(&mut self, root: NodeFactoryKey) {
        self.root = Some(root);
    }

    #[must_use]
    pub fn animation_root(&self) -> Option<NodeFactoryKey> {
        self.root
    }

    pub fn create_clip_node(&mut self, name: &str) -> Result<NodeFactoryKey> {
        self.add_node(name, NodeFactoryKind::Clip(ClipNodeFactory::default()))
    }

    pub fn create_blend_node(&mut self, name: &str) -> Result<NodeFactoryKey> {
        self.add_node(name, NodeFactoryKind::Blend(BlendNodeFactory::default()))
    }

    pub fn create_priority_node(&mut self, name: &str) -> Result<NodeFactoryKey> {
        self.add_node(name, NodeFactoryKind::Priority(PriorityNodeFactory::default()))
    }

    pub fn create_random_node(&mut self, name: &str) -> Result<NodeFactoryKey> {
        self.add_node(name, NodeFactoryKind::Random(RandomNodeFactory::default()))
    }

    pub fn create_fsm_node(&mut self, name: &str) -> Result<NodeFactoryKey> {
        self.add_node(name, NodeFactoryKind::Fsm(FsmNodeFactory::default()))
    }

    #[must_use]
    pub fn find_node(&self, name: &str) -> Option<NodeFactoryKey> {
        self.node_names.get(name).copied()
    }

    #[must_use]
    pub fn node(&self, key: NodeFactoryKey) -> Option<&NodeFactory> {
        self.nodes.get(key)
    }

    pub fn clip_node_mut(&mut self, key: NodeFactoryKey) -> Option<&mut ClipNodeFactory> {
        match &mut self.nodes.get_mut(key)?.kind {
            NodeFactoryKind::Clip(f) => Some(f),
            _ => None,
        }
    }

    pub fn blend_node_mut(&mut self, key: NodeFactoryKey) -> Option<&mut BlendNodeFactory> {
        match &mut self.nodes.get_mut(key)?.kind {
            NodeFactoryKind::Blend(f) => Some(f),
            _ => None,
        }
    }

    pub fn priority_node_mut(&mut self, key: NodeFactoryKey) -> Option<&mut PriorityNodeFactory> {
        match &mut self.nodes.get_mut(key)?.kind {
            NodeFactoryKind::Priority(f) => Some(f),
            _ => None,
        }
    }

    pub fn random_node_mut(&mut self, key: NodeFactoryKey) -> Option<&mut RandomNodeFactory> {
        match &mut self.nodes.get_mut(key)?.kind {
            NodeFactoryKind::Random(f) => Some(f),
            _ => None,
        }
    }

    pub fn fsm_node_mut(&mut self, key: NodeFactoryKey) -> Option<&mut FsmNodeFactory> {
        match &mut self.nodes.get_mut(key)?.kind {
            NodeFactoryKind::Fsm(f) => Some(f),
            _ => None,
        }
    }

    fn add_node(&mut self, name: &str, kind: NodeFactoryKind) -> Result<NodeFactoryKey> {
        if self.node_names.contains_key(name) {
            return Err(SkeletonError::DuplicateName(name.to_string()));
        }
        let key = self.nodes.insert(NodeFactory {
            name: name.to_string(),
            kind,
        });
        self.node_names.insert(name.to_string(), key);
        Ok(key)
    }

    // ========================================================================
    // Instantiation
    // ========================================================================

    /// Builds a live node tree from the root factory.
    pub fn create_instance(&self) -> Result<AnimationPacket> {
        self.create_instance_with_seed(0)
    }

    /// Like [`create_instance`](Self::create_instance), with `seed` mixed
    /// into every random node's selection sequence.
    pub fn create_instance_with_seed(&self, seed: u64) -> Result<AnimationPacket> {
        let root = self.root.ok_or(SkeletonError::MissingRoot)?;
        let mut builder = InstanceBuilder {
            factory: self,
            tree: NodeTree::new(),
            live: FxHashMap::default(),
            stack: Vec::new(),
            seed,
        };
        let root = builder.instantiate(root)?;
        log::debug!(
            "Animation packet instantiated: {} nodes, root '{}'",
            builder.tree.len(),
            builder.tree.node(root).name()
        );
        Ok(AnimationPacket {
            tree: builder.tree,
            root,
        })
    }

    fn factory(&self, key: NodeFactoryKey) -> Result<&NodeFactory> {
        self.nodes
            .get(key)
            .ok_or_else(|| SkeletonError::NodeNotFound(format!("{key:?}")))
    }

    fn clip_for(&self, node: &NodeFactory, factory: &ClipNodeFactory) -> Result<Arc<AnimationClip>> {
        let name = factory.animation.as_deref().unwrap_or(&node.name);
        self.animation_names
            .get(name)
            .map(|&i| Arc::clone(&self.animations[i]))
            .ok_or_else(|| {
                log::warn!("Clip node '{}' refers to missing animation '{name}'", node.name);
                SkeletonError::AnimationNotFound(name.to_string())
            })
    }
}

struct InstanceBuilder<'a> {
    factory: &'a AnimationPacketFactory,
    tree: NodeTree,
    live: FxHashMap<NodeFactoryKey, NodeKey>,
    /// Factories currently being instantiated, for cycle detection.
    stack: Vec<NodeFactoryKey>,
    seed: u64,
}

impl InstanceBuilder<'_> {
    fn instantiate(&mut self, key: NodeFactoryKey) -> Result<NodeKey> {
        if let Some(&live) = self.live.get(&key) {
            return Ok(live);
        }
        let node = self.factory.factory(key)?;
        if self.stack.contains(&key) {
            return Err(SkeletonError::RecursiveNode(node.name.clone()));
        }

        self.stack.push(key);
        let kind = self.build_kind(node)?;
        self.stack.pop();

        let live = self.tree.insert(&node.name, kind);
        self.live.insert(key, live);
        Ok(live)
    }

    fn instantiate_all(&mut self, keys: &[NodeFactoryKey]) -> Result<Vec<NodeKey>> {
        keys.iter().map(|&k| self.instantiate(k)).collect()
    }

    fn build_kind(&mut self, node: &NodeFactory) -> Result<NodeKind> {
        let kind = match &node.kind {
            NodeFactoryKind::Clip(f) => {
                let clip = self.factory.clip_for(node, f)?;
                NodeKind::Clip(
                    ClipNode::new(clip, f.cyclic, f.playback_speed)
                        .with_automatic_reset(f.automatic_reset)
                        .with_automatic_stop(f.automatic_stop),
                )
            }
            NodeFactoryKind::Blend(f) => {
                let keys: Vec<_> = (0..f.node_count()).map(|i| f.node(i)).collect();
                let children = self.instantiate_all(&keys)?;
                NodeKind::Blend(BlendNode::new(children, f.weights().to_vec(), f.sync_mode))
            }
            NodeFactoryKind::Priority(f) => {
                let keys: Vec<_> = (0..f.node_count()).map(|i| f.node(i)).collect();
                let children = self.instantiate_all(&keys)?;
                NodeKind::Priority(PriorityNode::new(children, f.priorities().to_vec()))
            }
            NodeFactoryKind::Random(f) => {
                let keys: Vec<_> = (0..f.node_count()).map(|i| f.node(i)).collect();
                let children = self.instantiate_all(&keys)?;
                NodeKind::Random(RandomNode::new(
                    children,
                    f.probabilities().to_vec(),
                    f.automatic_switch,
                    f.seed ^ self.seed,
                ))
            }
            NodeFactoryKind::Fsm(f) => {
                let mut states = Vec::with_capacity(f.state_count());
                for state in f.states() {
                    let node = state.node.map(|k| self.instantiate(k)).transpose()?;
                    states.push(FsmState {
                        name: state.name.clone(),
                        node,
                    });
                }
                let mut transitions = FxHashMap::default();
                for (&ids, t) in f.transitions() {
                    let node = t.node.map(|k| self.instantiate(k)).transpose()?;
                    transitions.insert(
                        ids,
                        FsmTransition {
                            node,
                            fade_out: t.fade_out,
                            fade_in: t.fade_in,
                            automatic: t.automatic,
                        },
                    );
                }
                NodeKind::Fsm(FsmNode::new(states, transitions, f.start_state()))
            }
        };
        Ok(kind)
    }
}

/// Live blend tree of one skeleton instance.
#[derive(Debug)]
pub struct AnimationPacket {
    tree: NodeTree,
    root: NodeKey,
}

impl AnimationPacket {
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeKey {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    #[inline]
    pub fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    /// Searches the tree below the root for a node called `name`.
    #[must_use]
    pub fn find_node(&self, name: &str) -> Option<NodeKey> {
        self.tree.find_node(self.root, name)
    }

    pub fn play(&mut self) {
        self.tree.play(self.root);
    }

    pub fn stop(&mut self) {
        self.tree.stop(self.root);
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.tree.is_active(self.root)
    }

    pub fn tick(&mut self, dt: f32) {
        self.tree.tick_animation(self.root, dt);
    }

    pub fn blend_state(&self, pose: &mut SkeletalPose, weight: f32) {
        self.tree.blend_state(self.root, pose, weight);
    }
}
