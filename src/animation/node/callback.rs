use std::fmt;

use crate::animation::node::NodeKey;

/// Notifications raised by animation nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationEvent {
    /// A non-cyclic node reached its end.
    Finished,
    /// A cyclic node wrapped around.
    Cycled,
    /// The node started (`true`) or stopped (`false`) playing.
    PlayStateChanged(bool),
    /// The node's duration may have changed (e.g. a different child was selected).
    DurationChanged,
}

/// Receives [`AnimationEvent`]s for the node it is registered on.
///
/// Implemented for any `FnMut(NodeKey, AnimationEvent) + Send` closure.
pub trait AnimationCallback: Send {
    fn on_event(&mut self, node: NodeKey, event: AnimationEvent);
}

impl<F> AnimationCallback for F
where
    F: FnMut(NodeKey, AnimationEvent) + Send,
{
    fn on_event(&mut self, node: NodeKey, event: AnimationEvent) {
        self(node, event);
    }
}

/// Handle returned by `add_animation_callback`, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub(crate) u64);

#[derive(Default)]
pub(crate) struct CallbackList {
    entries: Vec<(CallbackId, Box<dyn AnimationCallback>)>,
}

impl CallbackList {
    pub(crate) fn push(&mut self, id: CallbackId, callback: Box<dyn AnimationCallback>) {
        self.entries.push((id, callback));
    }

    pub(crate) fn remove(&mut self, id: CallbackId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn notify(&mut self, node: NodeKey, event: AnimationEvent) {
        for (_, callback) in &mut self.entries {
            callback.on_event(node, event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for CallbackList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackList")
            .field("count", &self.entries.len())
            .finish()
    }
}
