#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod animation;
pub mod errors;
pub mod scene;
pub mod utils;

pub use animation::{
    AnimationClip, AnimationEvent, AnimationPacket, AnimationPacketFactory, NodeKey, NodeTree,
    SkeletonSettings, ZeroNormPolicy,
};
pub use errors::{Result, SkeletonError};
pub use scene::{BoneHierarchy, BoneId, BoneTransform, SharedHierarchy, SkeletalPose, SkeletonInstance};
pub use utils::{ChangeTracker, topological_sort};
