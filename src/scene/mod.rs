//! Skeleton Module
//!
//! Bone hierarchies and the skeleton instances animated from them:
//! - [`BoneTransform`]: Rotation + offset pair and its composition rules
//! - [`BoneHierarchy`]: Template skeleton with a lazily cached absolute pose
//! - [`SkeletonInstance`]: Per-character copy driven by an animation packet
//! - [`SkeletalPose`]: Per-bone pose buffer and state snapshot

pub mod hierarchy;
pub mod pose;
pub mod skeleton;
pub mod transform;

pub use hierarchy::{BoneDefinition, BoneHierarchy, CacheState, SharedHierarchy};
pub use pose::SkeletalPose;
pub use skeleton::SkeletonInstance;
pub use transform::BoneTransform;

/// Index of a bone slot in a [`BoneHierarchy`].
pub type BoneId = usize;
