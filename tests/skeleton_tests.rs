//! Skeleton Instance Tests
//!
//! Tests for:
//! - Applying animated deltas on top of the rest pose
//! - Bind-space transforms relative to the hierarchy's rest pose
//! - State version bookkeeping and snapshots
//! - Attaching and detaching animation packets
//! - Reacting to hierarchy edits

use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};

use myth_skeleton::animation::{AnimationPacketFactory, SkeletonSettings, ZeroNormPolicy};
use myth_skeleton::scene::{BoneHierarchy, BoneTransform, SharedHierarchy, SkeletonInstance};

const EPSILON: f32 = 1e-5;

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn quat_approx(a: Quat, b: Quat) -> bool {
    a.abs_diff_eq(b, EPSILON) || a.abs_diff_eq(-b, EPSILON)
}

/// Root at (0,1,0); bone 1 below it, turned 90° about Z and offset along X.
fn hierarchy() -> SharedHierarchy {
    let mut hierarchy = BoneHierarchy::new();
    let root = hierarchy.create_bone(None);
    let arm = hierarchy.create_bone(Some(root));
    hierarchy.set_transform_bone_space(root, BoneTransform::from_offset(Vec3::Y));
    hierarchy.set_transform_bone_space(
        arm,
        BoneTransform::new(Quat::from_rotation_z(FRAC_PI_2), Vec3::X),
    );
    hierarchy.into_shared()
}

/// Cyclic clip lifting bone 1 by half a unit.
fn lift_factory() -> AnimationPacketFactory {
    let mut factory = AnimationPacketFactory::new();
    let clip = factory.create_animation("lift").unwrap();
    let channel = clip.add_channel(1);
    clip.add_keyframe(channel, 0.0, Quat::IDENTITY, Vec3::new(0.0, 0.5, 0.0));
    clip.add_keyframe(channel, 1.0, Quat::IDENTITY, Vec3::new(0.0, 0.5, 0.0));

    let node = factory.create_clip_node("lift").unwrap();
    factory.clip_node_mut(node).unwrap().cyclic = true;
    factory.set_animation_root(node);
    factory
}

/// Cyclic clip whose rotation keys on bone 1 are the zero quaternion.
fn collapse_factory() -> AnimationPacketFactory {
    let mut factory = AnimationPacketFactory::new();
    let clip = factory.create_animation("collapse").unwrap();
    let channel = clip.add_channel(1);
    let zero = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);
    clip.add_keyframe(channel, 0.0, zero, Vec3::ZERO);
    clip.add_keyframe(channel, 1.0, zero, Vec3::ZERO);
    let node = factory.create_clip_node("collapse").unwrap();
    factory.clip_node_mut(node).unwrap().cyclic = true;
    factory.set_animation_root(node);
    factory
}

fn animated_instance(shared: &SharedHierarchy) -> SkeletonInstance {
    let mut instance = SkeletonInstance::new(shared);
    instance.bind_packet(&lift_factory()).unwrap();
    instance.animation_packet_mut().unwrap().play();
    instance
}

// ============================================================================
// Animation
// ============================================================================

#[test]
fn instance_starts_in_rest_pose() {
    let shared = hierarchy();
    let mut instance = SkeletonInstance::new(&shared);

    assert_eq!(instance.bone_count(), 2);
    assert!(vec3_approx(instance.transform_abs_space(1).offset, Vec3::new(1.0, 1.0, 0.0)));
    let bind = instance.transform_bind_space(1);
    assert!(quat_approx(bind.rotation, Quat::IDENTITY));
    assert!(vec3_approx(bind.offset, Vec3::ZERO));
}

#[test]
fn update_applies_delta_on_rest_pose() {
    let shared = hierarchy();
    let mut instance = animated_instance(&shared);

    instance.update_skeleton(0.1);

    let local = instance.transform_bone_space(1);
    assert!(vec3_approx(local.offset, Vec3::new(1.0, 0.5, 0.0)));
    assert!(quat_approx(local.rotation, Quat::from_rotation_z(FRAC_PI_2)));

    let abs = instance.transform_abs_space(1);
    assert!(vec3_approx(abs.offset, Vec3::new(1.0, 1.5, 0.0)));

    // Rest abs rotation is 90° about Z, so the +Y lift reads as +X in bind space
    let bind = instance.transform_bind_space(1);
    assert!(quat_approx(bind.rotation, Quat::IDENTITY));
    assert!(vec3_approx(bind.offset, Vec3::new(0.5, 0.0, 0.0)));

    // Unanimated bones stay at rest
    assert_eq!(instance.transform_bone_space(0), BoneTransform::from_offset(Vec3::Y));
}

#[test]
fn update_bumps_version_once() {
    let shared = hierarchy();
    let mut instance = animated_instance(&shared);

    let before = instance.skeleton_state_version();
    instance.update_skeleton(0.1);
    assert_eq!(instance.skeleton_state_version(), before + 1);
}

#[test]
fn update_without_active_packet_is_noop() {
    let shared = hierarchy();
    let mut instance = SkeletonInstance::new(&shared);
    let before = instance.skeleton_state_version();
    instance.update_skeleton(0.1);
    assert_eq!(instance.skeleton_state_version(), before);

    // Bound but never played
    instance.bind_packet(&lift_factory()).unwrap();
    instance.update_skeleton(0.1);
    assert_eq!(instance.skeleton_state_version(), before);
    assert_eq!(
        instance.transform_bone_space(1).offset,
        Vec3::X,
        "inactive packet must not touch bones"
    );
}

#[test]
fn detached_packet_stops_driving_bones() {
    let shared = hierarchy();
    let mut instance = animated_instance(&shared);
    instance.update_skeleton(0.1);
    let before = instance.skeleton_state_version();

    assert!(instance.animation_packet().is_some());
    instance.set_animation_packet(None);
    instance.update_skeleton(0.1);
    assert_eq!(instance.skeleton_state_version(), before);
    assert!(instance.animation_packet().is_none());

    // Reattach a freshly created instance of the same packet
    let mut packet = lift_factory().create_instance().unwrap();
    packet.play();
    instance.set_animation_packet(Some(packet));
    instance.update_skeleton(0.1);
    assert_eq!(instance.skeleton_state_version(), before + 1);
}

#[test]
fn zero_delta_rotation_composes_unnormalized_by_default() {
    let shared = hierarchy();
    let mut instance = SkeletonInstance::new(&shared);
    instance.bind_packet(&collapse_factory()).unwrap();
    instance.animation_packet_mut().unwrap().play();
    instance.update_skeleton(0.1);

    // rest * 0 collapses to the zero quaternion
    let rotation = instance.transform_bone_space(1).rotation;
    assert!(rotation.length() < EPSILON);
    assert!(vec3_approx(instance.transform_bone_space(1).offset, Vec3::X));
}

#[test]
fn zero_delta_rotation_keeps_rest_with_policy() {
    let shared = hierarchy();
    let factory = collapse_factory();

    let settings = SkeletonSettings {
        zero_norm_policy: ZeroNormPolicy::KeepRestPose,
    };
    let mut instance = SkeletonInstance::with_settings(&shared, settings);
    instance.bind_packet(&factory).unwrap();
    instance.animation_packet_mut().unwrap().play();
    instance.update_skeleton(0.1);

    assert!(quat_approx(
        instance.transform_bone_space(1).rotation,
        Quat::from_rotation_z(FRAC_PI_2)
    ));
}

// ============================================================================
// Transforms
// ============================================================================

#[test]
fn set_abs_space_back_solves_against_parent() {
    let shared = hierarchy();
    let mut instance = SkeletonInstance::new(&shared);

    let target = BoneTransform::from_offset(Vec3::new(3.0, 0.0, 0.0));
    instance.set_transform_abs_space(1, target);

    let local = instance.transform_bone_space(1);
    assert!(vec3_approx(local.offset, Vec3::new(3.0, -1.0, 0.0)));
    assert!(quat_approx(local.rotation, Quat::IDENTITY));
    assert!(vec3_approx(instance.transform_abs_space(1).offset, target.offset));
}

#[test]
fn instance_edits_leave_hierarchy_untouched() {
    let shared = hierarchy();
    let mut instance = SkeletonInstance::new(&shared);

    instance.set_transform_bone_space(0, BoneTransform::IDENTITY);
    assert_eq!(
        shared.read().transform_bone_space(0),
        BoneTransform::from_offset(Vec3::Y)
    );
}

#[test]
fn hierarchy_edit_refreshes_bind_space() {
    let shared = hierarchy();
    let mut instance = SkeletonInstance::new(&shared);
    assert!(vec3_approx(instance.transform_bind_space(0).offset, Vec3::ZERO));

    shared
        .write()
        .set_transform_bone_space(0, BoneTransform::from_offset(Vec3::new(0.0, 2.0, 0.0)));

    // The instance keeps its own copy at (0,1,0)
    assert!(vec3_approx(
        instance.transform_bind_space(0).offset,
        Vec3::new(0.0, -1.0, 0.0)
    ));
}

// ============================================================================
// Snapshots & Structure
// ============================================================================

#[test]
fn snapshots_match_queries() {
    let shared = hierarchy();
    let mut instance = animated_instance(&shared);
    instance.update_skeleton(0.1);

    let bone = instance.state_bone_space();
    let abs = instance.state_abs_space();
    let bind = instance.state_bind_space();

    assert_eq!(bone.bone_count(), 2);
    assert!(bone.is_bone_used(0) && bone.is_bone_used(1));
    assert_eq!(bone.transform(1), instance.transform_bone_space(1));
    assert!(vec3_approx(abs.offset(1), Vec3::new(1.0, 1.5, 0.0)));
    assert!(vec3_approx(bind.offset(1), Vec3::new(0.5, 0.0, 0.0)));
}

#[test]
fn recreate_picks_up_new_bones() {
    let shared = hierarchy();
    let mut instance = SkeletonInstance::new(&shared);

    let tip = shared.write().create_bone(Some(1));
    assert!(!instance.has_bone(tip));

    instance.recreate_skeleton();
    assert!(instance.has_bone(tip));
    assert_eq!(instance.bone_count(), 3);
    // Identity rest transform under bone 1
    assert!(vec3_approx(instance.transform_abs_space(tip).offset, Vec3::new(1.0, 1.0, 0.0)));
}

#[test]
fn reset_returns_to_rest_pose() {
    let shared = hierarchy();
    let mut instance = animated_instance(&shared);
    instance.update_skeleton(0.1);

    let before = instance.skeleton_state_version();
    instance.reset_skeleton_state();

    assert_ne!(instance.skeleton_state_version(), before);
    assert_eq!(
        instance.transform_bone_space(1),
        shared.read().transform_bone_space(1)
    );
    assert!(vec3_approx(instance.transform_bind_space(1).offset, Vec3::ZERO));
}
