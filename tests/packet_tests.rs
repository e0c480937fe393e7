//! Animation Packet Tests
//!
//! Tests for:
//! - Clip registry bookkeeping (duplicate names, removal, lookups)
//! - Node factory validation when instantiating
//! - Shared sub-graphs and per-instance independence

use glam::{Quat, Vec3};

use myth_skeleton::animation::{AnimationPacketFactory, NodeFactoryKey};
use myth_skeleton::errors::SkeletonError;
use myth_skeleton::scene::SkeletalPose;

fn add_clip(factory: &mut AnimationPacketFactory, name: &str, offset: Vec3) -> NodeFactoryKey {
    let clip = factory.create_animation(name).unwrap();
    let channel = clip.add_channel(0);
    clip.add_keyframe(channel, 0.0, Quat::IDENTITY, offset);
    clip.add_keyframe(channel, 1.0, Quat::IDENTITY, offset);
    factory.create_clip_node(name).unwrap()
}

// ============================================================================
// Clip Registry
// ============================================================================

#[test]
fn duplicate_names_are_rejected() {
    let mut factory = AnimationPacketFactory::new();
    add_clip(&mut factory, "walk", Vec3::X);

    assert!(matches!(
        factory.create_animation("walk"),
        Err(SkeletonError::DuplicateName(name)) if name == "walk"
    ));
    assert_eq!(
        factory.create_blend_node("walk"),
        Err(SkeletonError::DuplicateName("walk".to_string()))
    );
}

#[test]
fn remove_animation_keeps_other_lookups_valid() {
    let mut factory = AnimationPacketFactory::new();
    for name in ["a", "b", "c"] {
        factory.create_animation(name).unwrap();
    }

    assert!(factory.remove_animation("a"));
    assert!(!factory.remove_animation("a"));
    assert_eq!(factory.animation_count(), 2);
    assert_eq!(factory.find_animation("c").unwrap().name, "c");
    assert_eq!(factory.animation(0).name, "b");
    assert!(factory.find_animation("a").is_none());
}

#[test]
fn clip_node_can_name_another_animation() {
    let mut factory = AnimationPacketFactory::new();
    add_clip(&mut factory, "walk", Vec3::X);
    let alias = factory.create_clip_node("stroll").unwrap();
    factory.clip_node_mut(alias).unwrap().set_animation("walk");
    factory.set_animation_root(alias);

    let mut packet = factory.create_instance().unwrap();
    packet.play();
    let mut pose = SkeletalPose::new(1);
    packet.blend_state(&mut pose, 1.0);
    assert_eq!(pose.offset(0), Vec3::X);
}

// ============================================================================
// Instantiation Errors
// ============================================================================

#[test]
fn instance_without_root_fails() {
    let factory = AnimationPacketFactory::new();
    assert_eq!(factory.create_instance().unwrap_err(), SkeletonError::MissingRoot);
}

#[test]
fn clip_node_without_animation_fails() {
    let mut factory = AnimationPacketFactory::new();
    let orphan = factory.create_clip_node("orphan").unwrap();
    factory.set_animation_root(orphan);

    assert_eq!(
        factory.create_instance().unwrap_err(),
        SkeletonError::AnimationNotFound("orphan".to_string())
    );
}

#[test]
fn self_referencing_graph_fails() {
    let mut factory = AnimationPacketFactory::new();
    let walk = add_clip(&mut factory, "walk", Vec3::X);
    let outer = factory.create_blend_node("outer").unwrap();
    let inner = factory.create_priority_node("inner").unwrap();
    factory.blend_node_mut(outer).unwrap().add_node(inner, 1.0);
    let layers = factory.priority_node_mut(inner).unwrap();
    layers.add_node(walk, 0);
    layers.add_node(outer, 1);
    factory.set_animation_root(outer);

    assert!(matches!(
        factory.create_instance(),
        Err(SkeletonError::RecursiveNode(_))
    ));
}

// ============================================================================
// Instances
// ============================================================================

#[test]
fn shared_factory_becomes_one_live_node() {
    let mut factory = AnimationPacketFactory::new();
    let walk = add_clip(&mut factory, "walk", Vec3::X);
    let left = factory.create_blend_node("left").unwrap();
    let right = factory.create_blend_node("right").unwrap();
    let root = factory.create_blend_node("root").unwrap();
    factory.blend_node_mut(left).unwrap().add_node(walk, 1.0);
    factory.blend_node_mut(right).unwrap().add_node(walk, 1.0);
    let blend = factory.blend_node_mut(root).unwrap();
    blend.add_node(left, 0.5);
    blend.add_node(right, 0.5);
    factory.set_animation_root(root);

    let packet = factory.create_instance().unwrap();
    assert_eq!(packet.tree().len(), 4);
    let walk = packet.find_node("walk").unwrap();
    assert_eq!(packet.tree().node(walk).parents().len(), 2);
}

#[test]
fn shared_leaf_stops_for_every_parent() {
    let mut factory = AnimationPacketFactory::new();
    let walk = add_clip(&mut factory, "walk", Vec3::X);
    let left = factory.create_blend_node("left").unwrap();
    let right = factory.create_blend_node("right").unwrap();
    let root = factory.create_blend_node("root").unwrap();
    factory.blend_node_mut(left).unwrap().add_node(walk, 1.0);
    factory.blend_node_mut(right).unwrap().add_node(walk, 1.0);
    let blend = factory.blend_node_mut(root).unwrap();
    blend.add_node(left, 1.0);
    blend.add_node(right, 1.0);
    factory.set_animation_root(root);

    let mut packet = factory.create_instance().unwrap();
    packet.play();
    let left = packet.find_node("left").unwrap();
    let right = packet.find_node("right").unwrap();
    assert!(packet.tree().is_active(left) && packet.tree().is_active(right));

    let walk = packet.find_node("walk").unwrap();
    packet.tree_mut().stop(walk);
    assert!(!packet.tree().is_active(left));
    assert!(!packet.tree().is_active(right));
    assert!(!packet.is_active());
}

#[test]
fn editing_factory_leaves_existing_instances() {
    let mut factory = AnimationPacketFactory::new();
    let walk = add_clip(&mut factory, "walk", Vec3::X);
    factory.set_animation_root(walk);
    let mut before = factory.create_instance().unwrap();

    let clip = factory.animation_mut("walk").unwrap();
    clip.set_keyframe(0, 0, Quat::IDENTITY, Vec3::Z);
    clip.set_keyframe(0, 1, Quat::IDENTITY, Vec3::Z);
    let mut after = factory.create_instance().unwrap();

    before.play();
    after.play();
    let mut pose = SkeletalPose::new(1);
    before.blend_state(&mut pose, 1.0);
    assert_eq!(pose.offset(0), Vec3::X);

    let mut pose = SkeletalPose::new(1);
    after.blend_state(&mut pose, 1.0);
    assert_eq!(pose.offset(0), Vec3::Z);
}

#[test]
fn instances_play_independently() {
    let mut factory = AnimationPacketFactory::new();
    let walk = add_clip(&mut factory, "walk", Vec3::X);
    factory.clip_node_mut(walk).unwrap().cyclic = true;
    factory.set_animation_root(walk);

    let mut first = factory.create_instance().unwrap();
    let second = factory.create_instance().unwrap();
    first.play();
    first.tick(0.5);

    assert!(first.is_active());
    assert!(!second.is_active());
    assert_eq!(second.tree().playback_position(second.root()), 0.0);
}
