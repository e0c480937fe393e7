//! Skeletal Pose Buffers
//!
//! [`SkeletalPose`] is the per-bone (rotation, offset) array shared by two
//! consumers:
//!
//! - The animation node tree blends its contributions into a fresh pose
//!   every tick. Bones a node writes to are flagged as *used*; untouched
//!   bones keep the identity value and are ignored when the pose is applied.
//! - Skeleton instances export immutable snapshots of their bone-space,
//!   absolute or bind-space transforms in the same shape for external
//!   consumers such as mesh skinning.

use glam::{Quat, Vec3};

use crate::scene::BoneId;
use crate::scene::transform::BoneTransform;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletalPose {
    rotations: Vec<Quat>,
    offsets: Vec<Vec3>,
    used: Vec<bool>,
}

impl SkeletalPose {
    /// Creates a pose of `bone_count` identity transforms, none marked used.
    #[must_use]
    pub fn new(bone_count: usize) -> Self {
        Self {
            rotations: vec![Quat::IDENTITY; bone_count],
            offsets: vec![Vec3::ZERO; bone_count],
            used: vec![false; bone_count],
        }
    }

    #[inline]
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.rotations.len()
    }

    /// Resizes the buffer and resets every bone to identity / unused.
    pub fn reset(&mut self, bone_count: usize) {
        self.rotations.clear();
        self.rotations.resize(bone_count, Quat::IDENTITY);
        self.offsets.clear();
        self.offsets.resize(bone_count, Vec3::ZERO);
        self.used.clear();
        self.used.resize(bone_count, false);
    }

    #[inline]
    #[must_use]
    pub fn rotation(&self, bone: BoneId) -> Quat {
        self.rotations[bone]
    }

    #[inline]
    #[must_use]
    pub fn offset(&self, bone: BoneId) -> Vec3 {
        self.offsets[bone]
    }

    #[inline]
    #[must_use]
    pub fn transform(&self, bone: BoneId) -> BoneTransform {
        BoneTransform::new(self.rotations[bone], self.offsets[bone])
    }

    #[inline]
    #[must_use]
    pub fn is_bone_used(&self, bone: BoneId) -> bool {
        self.used.get(bone).copied().unwrap_or(false)
    }

    #[inline]
    pub fn set_bone_used(&mut self, bone: BoneId, used: bool) {
        self.used[bone] = used;
    }

    #[inline]
    pub fn set_transform(&mut self, bone: BoneId, transform: BoneTransform) {
        self.rotations[bone] = transform.rotation;
        self.offsets[bone] = transform.offset;
    }

    /// Second-stage weighted blend of one bone:
    /// `rotation = slerp(rotation, sample.rotation, weight)`,
    /// `offset = lerp(offset, sample.offset, weight)`, and the bone is
    /// flagged as used.
    pub fn blend_bone(&mut self, bone: BoneId, sample: BoneTransform, weight: f32) {
        debug_assert!(bone < self.bone_count(), "bone {bone} outside pose");
        let rotation = &mut self.rotations[bone];
        *rotation = rotation.slerp(sample.rotation, weight);
        let offset = &mut self.offsets[bone];
        *offset = offset.lerp(sample.offset, weight);
        self.used[bone] = true;
    }

    /// Iterates `(bone, transform)` over bones flagged as used.
    pub fn used_bones(&self) -> impl Iterator<Item = (BoneId, BoneTransform)> + '_ {
        self.used
            .iter()
            .enumerate()
            .filter(|&(_, &used)| used)
            .map(|(bone, _)| (bone, self.transform(bone)))
    }
}
