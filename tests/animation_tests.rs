//! Animation Clip Tests
//!
//! Tests for:
//! - Keyframe insertion order and clip duration bookkeeping
//! - Clip sampling (SLERP rotation, lerp offset) and weighted pose blending
//! - Channel and keyframe editing APIs
//! - Bone-space to bind-space frame conversion

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use glam::{Quat, Vec3};

use myth_skeleton::animation::clip::AnimationClip;
use myth_skeleton::scene::{BoneHierarchy, BoneTransform, SkeletalPose};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn quat_approx(a: Quat, b: Quat) -> bool {
    a.abs_diff_eq(b, EPSILON) || a.abs_diff_eq(-b, EPSILON)
}

/// Bone 0: identity at t=0, 90° about Z and offset (1,0,0) at t=1.
fn quarter_turn() -> AnimationClip {
    let mut clip = AnimationClip::new("turn");
    let channel = clip.add_channel(0);
    clip.add_keyframe(channel, 0.0, Quat::IDENTITY, Vec3::ZERO);
    clip.add_keyframe(channel, 1.0, Quat::from_rotation_z(FRAC_PI_2), Vec3::X);
    clip
}

// ============================================================================
// Sampling
// ============================================================================

#[test]
fn clip_midpoint_is_slerp_and_lerp() {
    let clip = quarter_turn();
    let mut pose = SkeletalPose::new(1);
    clip.blend_state(&mut pose, 1.0, 0.5, false);

    assert!(pose.is_bone_used(0));
    let expected = Quat::IDENTITY.slerp(Quat::from_rotation_z(FRAC_PI_2), 0.5);
    assert!(quat_approx(pose.rotation(0), expected));
    assert!(quat_approx(pose.rotation(0), Quat::from_rotation_z(FRAC_PI_4)));
    assert!(vec3_approx(pose.offset(0), Vec3::new(0.5, 0.0, 0.0)));
}

#[test]
fn clip_exact_keyframe_times_hit_endpoints() {
    let clip = quarter_turn();

    let mut pose = SkeletalPose::new(1);
    clip.blend_state(&mut pose, 1.0, 0.0, false);
    assert!(vec3_approx(pose.offset(0), Vec3::ZERO));

    let mut pose = SkeletalPose::new(1);
    clip.blend_state(&mut pose, 1.0, 1.0, false);
    assert!(vec3_approx(pose.offset(0), Vec3::X));
    assert!(quat_approx(pose.rotation(0), Quat::from_rotation_z(FRAC_PI_2)));
}

#[test]
fn clip_past_end_holds_last_pose() {
    let clip = quarter_turn();
    let mut pose = SkeletalPose::new(1);
    clip.blend_state(&mut pose, 1.0, 7.0, false);
    assert!(vec3_approx(pose.offset(0), Vec3::X));
}

#[test]
fn clip_base_weight_blends_with_existing_pose() {
    let clip = quarter_turn();
    let mut pose = SkeletalPose::new(1);
    clip.blend_state(&mut pose, 0.5, 1.0, false);

    assert!(vec3_approx(pose.offset(0), Vec3::new(0.5, 0.0, 0.0)));
    assert!(quat_approx(pose.rotation(0), Quat::from_rotation_z(FRAC_PI_4)));
}

#[test]
fn clip_only_marks_animated_bones() {
    let clip = quarter_turn();
    let mut pose = SkeletalPose::new(3);
    clip.blend_state(&mut pose, 1.0, 0.5, false);
    assert!(pose.is_bone_used(0));
    assert!(!pose.is_bone_used(1));
    assert!(!pose.is_bone_used(2));
    assert_eq!(pose.used_bones().count(), 1);
}

#[test]
fn clip_skips_bones_outside_pose() {
    let mut clip = quarter_turn();
    let channel = clip.add_channel(5);
    clip.add_keyframe(channel, 0.0, Quat::IDENTITY, Vec3::Y);

    let mut pose = SkeletalPose::new(1);
    clip.blend_state(&mut pose, 1.0, 0.5, false);
    assert!(pose.is_bone_used(0));
}

// ============================================================================
// Duration & Keyframes
// ============================================================================

#[test]
fn clip_duration_is_max_keyframe_time() {
    let mut clip = quarter_turn();
    assert!(approx(clip.duration(), 1.0));

    let channel = clip.add_channel(1);
    clip.add_keyframe(channel, 2.5, Quat::IDENTITY, Vec3::ZERO);
    clip.add_keyframe(channel, 0.5, Quat::IDENTITY, Vec3::ZERO);
    assert!(approx(clip.duration(), 2.5));

    clip.remove_channel(channel);
    assert!(approx(clip.duration(), 1.0));
}

#[test]
fn clip_keyframes_stay_sorted() {
    let mut clip = AnimationClip::new("sorted");
    let channel = clip.add_channel(0);
    for time in [0.6, 0.2, 1.0, 0.0, 0.4] {
        clip.add_keyframe(channel, time, Quat::IDENTITY, Vec3::splat(time));
    }

    assert_eq!(clip.keyframe_count(channel), 5);
    let times: Vec<f32> = (0..5).map(|k| clip.keyframe(channel, k).time).collect();
    assert_eq!(times, vec![0.0, 0.2, 0.4, 0.6, 1.0]);
    assert_eq!(clip.keyframe(channel, 2).offset, Vec3::splat(0.4));
}

#[test]
fn add_channel_returns_existing() {
    let mut clip = quarter_turn();
    assert_eq!(clip.add_channel(0), 0);
    assert_eq!(clip.channel_count(), 1);
    assert_eq!(clip.find_channel(0), Some(0));
    assert_eq!(clip.find_channel(3), None);
}

#[test]
fn channel_bone_can_be_retargeted() {
    let mut clip = quarter_turn();
    clip.set_channel_bone(0, 2);
    assert_eq!(clip.channel_bone(0), 2);

    let mut pose = SkeletalPose::new(3);
    clip.blend_state(&mut pose, 1.0, 0.5, false);
    assert!(!pose.is_bone_used(0));
    assert!(pose.is_bone_used(2));
}

#[test]
fn two_keyframes_brackets_time() {
    let clip = quarter_turn();
    let pair = clip.two_keyframes(0, 0.25).unwrap();
    assert!(approx(pair.before.time, 0.0));
    assert!(approx(pair.after.time, 1.0));
    assert!(approx(pair.t, 0.25));
}

#[test]
fn add_or_set_rotation_replaces_existing_frame() {
    let mut clip = quarter_turn();
    let rotation = Quat::from_rotation_x(0.5);
    clip.add_or_set_keyframe_rotation(0, 1.0, rotation);

    assert_eq!(clip.keyframe_count(0), 2);
    let frame = clip.keyframe(0, 1);
    assert_eq!(frame.rotation, rotation);
    assert_eq!(frame.offset, Vec3::X);
}

#[test]
fn add_or_set_offset_inserts_interpolated_rotation() {
    let mut clip = quarter_turn();
    clip.add_or_set_keyframe_offset(0, 0.5, Vec3::Z);

    assert_eq!(clip.keyframe_count(0), 3);
    let frame = clip.keyframe(0, 1);
    assert!(approx(frame.time, 0.5));
    assert_eq!(frame.offset, Vec3::Z);
    assert!(quat_approx(frame.rotation, Quat::from_rotation_z(FRAC_PI_4)));
}

#[test]
fn set_keyframe_overwrites_values() {
    let mut clip = quarter_turn();
    clip.set_keyframe(0, 0, Quat::from_rotation_y(1.0), Vec3::Y);
    let frame = clip.keyframe(0, 0);
    assert_eq!(frame.offset, Vec3::Y);
    assert!(approx(frame.time, 0.0));
    assert_eq!(frame.transform(), BoneTransform::new(Quat::from_rotation_y(1.0), Vec3::Y));
}

// ============================================================================
// Frame Space
// ============================================================================

#[test]
fn convert_frame_space_subtracts_rest_pose() {
    let mut hierarchy = BoneHierarchy::new();
    let bone = hierarchy.create_bone(None);
    let rest = BoneTransform::new(Quat::from_rotation_z(FRAC_PI_2), Vec3::new(0.0, 1.0, 0.0));
    hierarchy.set_transform_bone_space(bone, rest);

    let mut clip = AnimationClip::new("authored");
    let channel = clip.add_channel(bone);
    clip.add_keyframe(channel, 0.0, rest.rotation, rest.offset);
    clip.add_keyframe(channel, 1.0, rest.rotation * Quat::from_rotation_x(0.25), Vec3::new(0.0, 3.0, 0.0));
    clip.set_frames_in_bind_space(false);

    clip.convert_frame_space(&hierarchy);
    assert!(clip.frames_in_bind_space());

    let first = clip.keyframe(channel, 0);
    assert!(quat_approx(first.rotation, Quat::IDENTITY));
    assert!(vec3_approx(first.offset, Vec3::ZERO));

    let second = clip.keyframe(channel, 1);
    assert!(quat_approx(second.rotation, Quat::from_rotation_x(0.25)));
    assert!(vec3_approx(second.offset, Vec3::new(0.0, 2.0, 0.0)));
}

#[test]
fn convert_frame_space_is_noop_in_bind_space() {
    let mut hierarchy = BoneHierarchy::new();
    let bone = hierarchy.create_bone(None);
    hierarchy.set_transform_bone_space(bone, BoneTransform::from_offset(Vec3::ONE));

    let mut clip = quarter_turn();
    let before = clip.clone();
    clip.convert_frame_space(&hierarchy);
    assert_eq!(clip, before);
}
