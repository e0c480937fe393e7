//! Skeleton Instances
//!
//! A [`SkeletonInstance`] is the per-character runtime copy of a
//! [`BoneHierarchy`]. It starts out in the hierarchy's rest pose and diverges
//! as its animation packet drives it.
//!
//! # Spaces
//!
//! - **Bone space**: each bone relative to its parent.
//! - **Absolute space**: each bone relative to the skeleton root, composed
//!   along the hierarchy's topological order.
//! - **Bind space**: the instance's absolute transform relative to the
//!   hierarchy's rest absolute transform (`rest⁻¹ ∘ animated`). This is what
//!   mesh skinning consumes.
//!
//! Absolute and bind-space transforms are cached and recomputed lazily. The
//! hierarchy's own cache is always refreshed first.
//!
//! # Change detection
//!
//! Consumers poll [`SkeletonInstance::skeleton_state_version`] and re-pull a
//! snapshot (`state_*_space`) when it changes.

use std::sync::{Arc, Weak};

use glam::Quat;
use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};

use crate::animation::packet::{AnimationPacket, AnimationPacketFactory};
use crate::animation::settings::{SkeletonSettings, ZeroNormPolicy};
use crate::errors::Result;
use crate::scene::BoneId;
use crate::scene::hierarchy::{
    BoneDefinition, BoneHierarchy, CacheState, SharedHierarchy, compute_absolute,
};
use crate::scene::pose::SkeletalPose;
use crate::scene::transform::BoneTransform;
use crate::utils::version::ChangeTracker;

#[derive(Debug)]
pub struct SkeletonInstance {
    hierarchy: Weak<RwLock<BoneHierarchy>>,

    // === Core Data ===
    bones: Vec<BoneDefinition>,
    settings: SkeletonSettings,
    packet: Option<AnimationPacket>,

    // === Caches ===
    absolute: Vec<BoneTransform>,
    cache: CacheState,
    bind: Vec<BoneTransform>,
    bind_dirty: bool,
    /// Hierarchy version the bind cache was computed against.
    bind_hierarchy_version: u64,

    // === Runtime Data ===
    version: ChangeTracker,
    pose: SkeletalPose,
}

impl SkeletonInstance {
    #[must_use]
    pub fn new(hierarchy: &SharedHierarchy) -> Self {
        Self::with_settings(hierarchy, SkeletonSettings::default())
    }

    #[must_use]
    pub fn with_settings(hierarchy: &SharedHierarchy, settings: SkeletonSettings) -> Self {
        let mut instance = Self {
            hierarchy: Arc::downgrade(hierarchy),
            bones: Vec::new(),
            settings,
            packet: None,
            absolute: Vec::new(),
            cache: CacheState::StructureDirty,
            bind: Vec::new(),
            bind_dirty: true,
            bind_hierarchy_version: 0,
            version: ChangeTracker::new(),
            pose: SkeletalPose::default(),
        };
        instance.recreate_skeleton();
        log::debug!("Skeleton instance created ({} bone slots)", instance.bones.len());
        instance
    }

    /// The hierarchy this instance was created from, if it is still alive.
    #[must_use]
    pub fn hierarchy(&self) -> Option<SharedHierarchy> {
        self.hierarchy.upgrade()
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &SkeletonSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: SkeletonSettings) {
        self.settings = settings;
    }

    #[inline]
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    #[must_use]
    pub fn has_bone(&self, id: BoneId) -> bool {
        self.bones.get(id).is_some_and(|b| b.created)
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Re-copies the bone array from the hierarchy. Call after structural
    /// edits to the hierarchy.
    pub fn recreate_skeleton(&mut self) {
        let shared = self.shared();
        let hierarchy = shared.read();
        self.bones.clear();
        self.bones.extend_from_slice(hierarchy.bones());
        drop(hierarchy);

        self.cache.mark_structure();
        self.bind.clear();
        self.bind_dirty = true;
        self.version.changed();
    }

    /// Puts every bone back to the hierarchy's current rest transform.
    pub fn reset_skeleton_state(&mut self) {
        let shared = self.shared();
        let hierarchy = shared.read();
        for (bone, rest) in self.bones.iter_mut().zip(hierarchy.bones()) {
            bone.transform = rest.transform;
        }
        drop(hierarchy);

        self.mark_dirty();
        self.version.changed();
    }

    pub fn set_animation_packet(&mut self, packet: Option<AnimationPacket>) {
        self.packet = packet;
    }

    /// Instantiates `factory` and binds the result to this instance.
    pub fn bind_packet(&mut self, factory: &AnimationPacketFactory) -> Result<()> {
        self.packet = Some(factory.create_instance()?);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn animation_packet(&self) -> Option<&AnimationPacket> {
        self.packet.as_ref()
    }

    #[inline]
    pub fn animation_packet_mut(&mut self) -> Option<&mut AnimationPacket> {
        self.packet.as_mut()
    }

    // ========================================================================
    // Animation
    // ========================================================================

    /// Advances the bound animation and applies its pose.
    ///
    /// Does nothing while the packet's root node is inactive. Otherwise every
    /// bone the blended pose marks as used is set to its rest transform with
    /// the animated delta composed on top, and the state version is bumped
    /// once.
    pub fn update_skeleton(&mut self, dt: f32) {
        let Some(packet) = self.packet.as_mut() else {
            return;
        };
        if !packet.is_active() {
            return;
        }

        packet.tick(dt);
        self.pose.reset(self.bones.len());
        packet.blend_state(&mut self.pose, 1.0);

        let shared = self.shared();
        let hierarchy = shared.read();
        let rest_bones = hierarchy.bones();
        let policy = self.settings.zero_norm_policy;

        for (id, delta) in self.pose.used_bones() {
            let (Some(bone), Some(rest)) = (self.bones.get_mut(id), rest_bones.get(id)) else {
                continue;
            };
            if !bone.created {
                continue;
            }
            let rest = rest.transform;

            bone.transform.offset = rest.offset + delta.offset;
            bone.transform.rotation =
                compose_rotation(rest.rotation, delta.rotation, policy).unwrap_or(rest.rotation);
        }
        drop(hierarchy);

        self.mark_dirty();
        self.version.changed();
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    #[must_use]
    pub fn transform_bone_space(&self, id: BoneId) -> BoneTransform {
        self.assert_bone(id);
        self.bones[id].transform
    }

    pub fn set_transform_bone_space(&mut self, id: BoneId, transform: BoneTransform) {
        self.assert_bone(id);
        self.bones[id].transform = transform;
        self.mark_dirty();
        self.version.changed();
    }

    pub fn transform_abs_space(&mut self, id: BoneId) -> BoneTransform {
        self.assert_bone(id);
        self.update_caches();
        self.absolute[id]
    }

    /// Sets a bone's absolute transform by back-solving its bone-space
    /// transform against the parent's current absolute transform.
    pub fn set_transform_abs_space(&mut self, id: BoneId, transform: BoneTransform) {
        self.assert_bone(id);
        self.update_caches();
        self.bones[id].transform = match self.bones[id].parent {
            Some(parent) => self.absolute[parent].relative(&transform),
            None => transform,
        };
        self.mark_dirty();
        self.version.changed();
    }

    /// The bone's animated absolute transform relative to its rest absolute
    /// transform.
    pub fn transform_bind_space(&mut self, id: BoneId) -> BoneTransform {
        self.assert_bone(id);
        self.update_bind_cache();
        self.bind[id]
    }

    // ========================================================================
    // State snapshots
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn skeleton_state_version(&self) -> u64 {
        self.version.version()
    }

    #[must_use]
    pub fn state_bone_space(&self) -> Arc<SkeletalPose> {
        let transforms: Vec<_> = self.bones.iter().map(|b| b.transform).collect();
        Arc::new(self.snapshot(&transforms))
    }

    pub fn state_abs_space(&mut self) -> Arc<SkeletalPose> {
        self.update_caches();
        Arc::new(self.snapshot(&self.absolute))
    }

    pub fn state_bind_space(&mut self) -> Arc<SkeletalPose> {
        self.update_bind_cache();
        Arc::new(self.snapshot(&self.bind))
    }

    fn snapshot(&self, transforms: &[BoneTransform]) -> SkeletalPose {
        let mut pose = SkeletalPose::new(self.bones.len());
        for (id, (bone, transform)) in self.bones.iter().zip(transforms).enumerate() {
            if bone.created {
                pose.set_transform(id, *transform);
                pose.set_bone_used(id, true);
            }
        }
        pose
    }

    // ========================================================================
    // Cache maintenance
    // ========================================================================

    fn mark_dirty(&mut self) {
        self.cache.mark_values();
        self.bind_dirty = true;
    }

    /// Refreshes the hierarchy (if needed), then this instance's absolute cache.
    pub fn update_caches(&mut self) {
        if self.cache == CacheState::Clean {
            return;
        }
        let shared = self.shared();
        let hierarchy = read_fresh(&shared);
        debug_assert_eq!(
            hierarchy.slot_count(),
            self.bones.len(),
            "hierarchy structure changed without recreate_skeleton"
        );
        compute_absolute(&self.bones, hierarchy.cached_bone_order(), &mut self.absolute);
        self.cache = CacheState::Clean;
        self.bind_dirty = true;
    }

    fn update_bind_cache(&mut self) {
        self.update_caches();

        let shared = self.shared();
        let hierarchy = read_fresh(&shared);
        if !self.bind_dirty && self.bind_hierarchy_version == hierarchy.version() {
            return;
        }

        self.bind.clear();
        self.bind.extend(self.absolute.iter().enumerate().map(|(id, animated)| {
            if hierarchy.has_bone(id) {
                hierarchy.cached_transform_abs_space(id).relative(animated)
            } else {
                BoneTransform::IDENTITY
            }
        }));
        self.bind_hierarchy_version = hierarchy.version();
        self.bind_dirty = false;
    }

    fn shared(&self) -> SharedHierarchy {
        match self.hierarchy.upgrade() {
            Some(shared) => shared,
            None => panic!("bone hierarchy dropped while a skeleton instance still uses it"),
        }
    }

    #[inline]
    fn assert_bone(&self, id: BoneId) {
        assert!(self.has_bone(id), "invalid bone id {id}");
    }
}

/// `rest * normalize(delta)`. A zero-norm delta cannot be normalized and is
/// handled per `policy`; `None` means keep the rest rotation.
fn compose_rotation(rest: Quat, delta: Quat, policy: ZeroNormPolicy) -> Option<Quat> {
    let norm = delta.length();
    if norm == 0.0 {
        return match policy {
            ZeroNormPolicy::ComposeUnnormalized => Some(rest * delta),
            ZeroNormPolicy::KeepRestPose => None,
        };
    }
    Some(rest * (delta / norm))
}

/// Read access to the hierarchy with its caches brought up to date.
fn read_fresh(shared: &RwLock<BoneHierarchy>) -> RwLockReadGuard<'_, BoneHierarchy> {
    let guard = shared.upgradable_read();
    if guard.needs_update() {
        let mut writer = RwLockUpgradableReadGuard::upgrade(guard);
        writer.update_caches();
        RwLockWriteGuard::downgrade(writer)
    } else {
        RwLockUpgradableReadGuard::downgrade(guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_rotation_normalizes() {
        let delta = Quat::from_xyzw(0.0, 0.0, 0.0, 2.0);
        let rotation = compose_rotation(Quat::IDENTITY, delta, ZeroNormPolicy::default()).unwrap();
        assert!((rotation.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_norm_policies() {
        let zero = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);
        let composed = compose_rotation(Quat::IDENTITY, zero, ZeroNormPolicy::ComposeUnnormalized);
        assert_eq!(composed.map(Quat::length), Some(0.0));
        assert_eq!(compose_rotation(Quat::IDENTITY, zero, ZeroNormPolicy::KeepRestPose), None);
    }
}
