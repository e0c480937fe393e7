//! Skeleton Instance Settings
//!
//! Per-instance knobs that control how an animation pose is applied to the
//! skeleton.
//!
//! ```rust,ignore
//! use myth_skeleton::animation::{SkeletonSettings, ZeroNormPolicy};
//!
//! let settings = SkeletonSettings {
//!     zero_norm_policy: ZeroNormPolicy::KeepRestPose,
//!     ..Default::default()
//! };
//! let instance = SkeletonInstance::with_settings(&hierarchy, settings);
//! ```

// ---------------------------------------------------------------------------
// ZeroNormPolicy
// ---------------------------------------------------------------------------

/// What to do with a blended rotation whose quaternion norm is exactly zero.
///
/// Opposite rotations blended with equal weights can cancel out. A zero
/// quaternion cannot be normalized and is not a valid rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZeroNormPolicy {
    /// Compose the zero quaternion onto the rest rotation without normalizing.
    #[default]
    ComposeUnnormalized,
    /// Leave the bone's rotation at its rest value for this update.
    KeepRestPose,
}

// ---------------------------------------------------------------------------
// SkeletonSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkeletonSettings {
    pub zero_norm_policy: ZeroNormPolicy,
}
