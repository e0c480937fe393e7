use rustc_hash::FxHashMap;

use crate::animation::node::{AnimationEvent, ChildList, NodeKey, NodeKind, NodeTree};
use crate::errors::{Result, SkeletonError};
use crate::scene::pose::SkeletalPose;

/// Identifier of a state within an [`FsmNode`].
pub type StateId = u32;

#[derive(Debug, Clone, PartialEq)]
pub struct FsmState {
    pub name: String,
    pub node: Option<NodeKey>,
}

/// How the machine moves from one state to another.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FsmTransition {
    /// Node played in between the two states; the switch completes when it finishes.
    pub node: Option<NodeKey>,
    /// Seconds the old state keeps contributing while fading out.
    pub fade_out: f32,
    /// Seconds over which the new state fades in.
    pub fade_in: f32,
    /// Take this transition as soon as the source state finishes.
    pub automatic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RunningTransition {
    Node { node: NodeKey },
    Crossfade {
        from: Option<NodeKey>,
        fade_out: f32,
        fade_in: f32,
        elapsed: f32,
    },
}

/// Finite state machine: exactly one state is current and only its node
/// plays and contributes to the pose.
#[derive(Debug, Clone)]
pub struct FsmNode {
    states: Vec<FsmState>,
    transitions: FxHashMap<(StateId, StateId), FsmTransition>,
    start_state: StateId,
    current: StateId,
    playing: bool,
    running: Option<RunningTransition>,
    pub speed: f32,
}

impl FsmNode {
    #[must_use]
    pub fn new(
        states: Vec<FsmState>,
        transitions: FxHashMap<(StateId, StateId), FsmTransition>,
        start_state: StateId,
    ) -> Self {
        Self {
            states,
            transitions,
            start_state,
            current: start_state,
            playing: false,
            running: None,
            speed: 1.0,
        }
    }

    #[inline]
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[inline]
    #[must_use]
    pub fn current_state(&self) -> StateId {
        self.current
    }

    #[inline]
    #[must_use]
    pub fn start_state(&self) -> StateId {
        self.start_state
    }

    #[must_use]
    pub fn state_name(&self, state: StateId) -> Option<&str> {
        self.state(state).map(|s| s.name.as_str())
    }

    #[must_use]
    pub fn state_node(&self, state: StateId) -> Option<NodeKey> {
        self.state(state).and_then(|s| s.node)
    }

    #[must_use]
    pub fn find_state(&self, name: &str) -> Option<StateId> {
        self.states
            .iter()
            .position(|s| s.name == name)
            .map(|i| i as StateId)
    }

    #[must_use]
    pub fn transition(&self, from: StateId, to: StateId) -> Option<&FsmTransition> {
        self.transitions.get(&(from, to))
    }

    /// A transition node or crossfade is in progress.
    #[inline]
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.running.is_some()
    }

    /// The node currently driving the machine: the transition node while
    /// one runs, else the current state's node.
    #[must_use]
    pub fn active_child(&self) -> Option<NodeKey> {
        match self.running {
            Some(RunningTransition::Node { node }) => Some(node),
            _ => self.state_node(self.current),
        }
    }

    pub(crate) fn referenced_nodes(&self) -> ChildList {
        let mut nodes: ChildList = self.states.iter().filter_map(|s| s.node).collect();
        for transition in self.transitions.values() {
            if let Some(node) = transition.node
                && !nodes.contains(&node)
            {
                nodes.push(node);
            }
        }
        nodes
    }

    fn state(&self, state: StateId) -> Option<&FsmState> {
        self.states.get(state as usize)
    }

    /// Lowest-numbered target of an automatic transition out of `from`.
    fn automatic_target(&self, from: StateId) -> Option<StateId> {
        self.transitions
            .iter()
            .filter(|((source, _), t)| *source == from && t.automatic)
            .map(|((_, target), _)| *target)
            .min()
    }
}

impl NodeTree {
    #[must_use]
    pub fn fsm_mut(&mut self, key: NodeKey) -> Option<&mut FsmNode> {
        match self.kind_mut(key) {
            NodeKind::Fsm(n) => Some(n),
            _ => None,
        }
    }

    /// Makes `state` current. While the machine plays, the old state's node
    /// is stopped and the new one started, going through the configured
    /// transition node or crossfade if there is one.
    pub fn switch_to_state(&mut self, key: NodeKey, state: StateId) -> Result<()> {
        let fsm = self
            .fsm(key)
            .ok_or_else(|| SkeletonError::NodeNotFound(self.node(key).name().to_string()))?;
        if state as usize >= fsm.state_count() {
            return Err(SkeletonError::InvalidState(state));
        }
        self.fsm_switch(key, state);
        self.flush_events();
        Ok(())
    }

    fn fsm_switch(&mut self, key: NodeKey, to: StateId) {
        self.fsm_cancel_transition(key);
        let Some(fsm) = self.fsm_mut(key) else {
            return;
        };
        let from = fsm.current;
        if from == to {
            return;
        }

        let old_node = fsm.state_node(from);
        let new_node = fsm.state_node(to);
        let transition = fsm.transition(from, to).copied().unwrap_or_default();
        let playing = fsm.playing;
        fsm.current = to;
        log::debug!("State machine switched from state {from} to {to}");

        if playing {
            if let Some(node) = transition.node {
                if let Some(old) = old_node {
                    self.stop_node(old);
                }
                self.reset_node(node);
                self.play_node(node);
                if let Some(fsm) = self.fsm_mut(key) {
                    fsm.running = Some(RunningTransition::Node { node });
                }
            } else if transition.fade_out > 0.0 || transition.fade_in > 0.0 {
                if let Some(new) = new_node {
                    self.play_node(new);
                }
                if let Some(fsm) = self.fsm_mut(key) {
                    fsm.running = Some(RunningTransition::Crossfade {
                        from: old_node.filter(|&old| Some(old) != new_node),
                        fade_out: transition.fade_out,
                        fade_in: transition.fade_in,
                        elapsed: 0.0,
                    });
                }
            } else {
                if let Some(old) = old_node.filter(|&old| Some(old) != new_node) {
                    self.stop_node(old);
                }
                if let Some(new) = new_node {
                    self.play_node(new);
                }
            }
        }

        self.emit(key, AnimationEvent::DurationChanged);
    }

    /// Ends a running transition immediately, leaving the target state playing.
    fn fsm_cancel_transition(&mut self, key: NodeKey) {
        let Some(fsm) = self.fsm_mut(key) else {
            return;
        };
        let Some(running) = fsm.running.take() else {
            return;
        };
        let target = fsm.state_node(fsm.current);
        let playing = fsm.playing;

        match running {
            RunningTransition::Node { node } => {
                self.stop_node(node);
                if playing && let Some(target) = target {
                    self.play_node(target);
                }
            }
            RunningTransition::Crossfade { from, .. } => {
                if let Some(from) = from {
                    self.stop_node(from);
                }
            }
        }
    }

    pub(super) fn fsm_play(&mut self, key: NodeKey) {
        let Some(fsm) = self.fsm_mut(key) else {
            return;
        };
        fsm.playing = true;
        if let Some(child) = fsm.active_child() {
            self.play_node(child);
        }
    }

    pub(super) fn fsm_stop(&mut self, key: NodeKey) {
        let Some(fsm) = self.fsm_mut(key) else {
            return;
        };
        fsm.playing = false;
        let child = fsm.active_child();
        if let Some(RunningTransition::Crossfade { from, .. }) = fsm.running {
            fsm.running = None;
            if let Some(from) = from {
                self.stop_node(from);
            }
        }
        if let Some(child) = child {
            self.stop_node(child);
        }
    }

    pub(super) fn fsm_reset(&mut self, key: NodeKey) {
        self.fsm_cancel_transition(key);
        for child in self.children(key) {
            self.reset_node(child);
        }
    }

    pub(super) fn fsm_tick(&mut self, key: NodeKey, dt: f32) {
        let Some(fsm) = self.fsm_mut(key) else {
            return;
        };
        let dt = dt * fsm.speed;
        let child = fsm.active_child();

        let mut fading = None;
        if let Some(RunningTransition::Crossfade {
            from,
            fade_out,
            fade_in,
            elapsed,
        }) = &mut fsm.running
        {
            *elapsed += dt;
            fading = Some((*from, *elapsed >= (*fade_out).max(*fade_in)));
        }
        if let Some((_, true)) = fading {
            fsm.running = None;
        }

        if let Some((from, done)) = fading
            && let Some(from) = from
        {
            if done {
                self.stop_node(from);
            } else {
                self.tick_node(from, dt);
            }
        }
        if let Some(child) = child {
            self.tick_node(child, dt);
        }
    }

    pub(super) fn fsm_blend_state(&self, key: NodeKey, pose: &mut SkeletalPose, weight: f32) {
        let Some(fsm) = self.fsm(key) else {
            return;
        };
        let Some(RunningTransition::Crossfade {
            from,
            fade_out,
            fade_in,
            elapsed,
        }) = fsm.running
        else {
            if let Some(child) = fsm.active_child() {
                self.blend_state(child, pose, weight);
            }
            return;
        };

        if let Some(from) = from
            && fade_out > 0.0
        {
            let out = 1.0 - (elapsed / fade_out).min(1.0);
            if out > 0.0 {
                self.blend_state(from, pose, weight * out);
            }
        }
        if let Some(child) = fsm.active_child() {
            let fade = if fade_in > 0.0 {
                (elapsed / fade_in).min(1.0)
            } else {
                1.0
            };
            if fade > 0.0 {
                self.blend_state(child, pose, weight * fade);
            }
        }
    }

    pub(super) fn fsm_child_event(&mut self, parent: NodeKey, child: NodeKey, event: AnimationEvent) {
        let Some(fsm) = self.fsm(parent) else {
            return;
        };
        if fsm.active_child() != Some(child) {
            return;
        }
        let in_transition = matches!(fsm.running, Some(RunningTransition::Node { .. }));
        let automatic = fsm.automatic_target(fsm.current);

        match event {
            AnimationEvent::Finished if in_transition => {
                self.fsm_cancel_transition(parent);
                self.emit(parent, AnimationEvent::DurationChanged);
            }
            AnimationEvent::Finished => match automatic {
                Some(target) => self.fsm_switch(parent, target),
                None => self.emit(parent, AnimationEvent::Finished),
            },
            AnimationEvent::PlayStateChanged(_) => self.refresh_play_state(parent),
            AnimationEvent::Cycled | AnimationEvent::DurationChanged => self.emit(parent, event),
        }
    }
}
