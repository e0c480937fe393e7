//! Animation Module
//!
//! Keyframe clips and the blend trees that play them:
//! - [`AnimationClip`] / [`KeyframeTrack`]: Sorted per-bone keyframes
//! - [`node`]: Live animation nodes (clip, blend, state machine, priority, random)
//! - [`AnimationPacketFactory`] / [`AnimationPacket`]: Authored setup and its
//!   per-skeleton instantiation

pub mod clip;
pub mod factory;
pub mod node;
pub mod packet;
pub mod playback;
pub mod settings;
pub mod tracks;
pub mod values;

pub use clip::{AnimationClip, ChannelId};
pub use factory::{
    BlendNodeFactory, ClipNodeFactory, FsmNodeFactory, NodeFactory, NodeFactoryKey,
    NodeFactoryKind, PriorityNodeFactory, RandomNodeFactory,
};
pub use node::{
    AnimationCallback, AnimationEvent, CallbackId, NodeKey, NodeKind, NodeTree, StateId,
    SynchronizationMode,
};
pub use packet::{AnimationPacket, AnimationPacketFactory};
pub use playback::{ClipPlaybackCursor, PlaybackStep};
pub use settings::{SkeletonSettings, ZeroNormPolicy};
pub use tracks::{KeyFrame, KeyFramePair, KeyframeTrack};
pub use values::Interpolatable;
