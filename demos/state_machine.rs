use glam::{Quat, Vec3};

use myth_skeleton::animation::{AnimationEvent, AnimationPacketFactory, NodeKey};
use myth_skeleton::errors::Result;
use myth_skeleton::scene::{BoneHierarchy, BoneTransform, SkeletonInstance};

fn main() -> Result<()> {
    env_logger::init();

    // Hip -> knee -> foot
    let mut hierarchy = BoneHierarchy::new();
    let hip = hierarchy.create_bone(None);
    let knee = hierarchy.create_bone(Some(hip));
    let foot = hierarchy.create_bone(Some(knee));
    hierarchy.set_bone_name(hip, "hip");
    hierarchy.set_bone_name(knee, "knee");
    hierarchy.set_bone_name(foot, "foot");
    hierarchy.set_transform_bone_space(hip, BoneTransform::from_offset(Vec3::new(0.0, 1.0, 0.0)));
    hierarchy.set_transform_bone_space(knee, BoneTransform::from_offset(Vec3::new(0.0, -0.5, 0.0)));
    hierarchy.set_transform_bone_space(foot, BoneTransform::from_offset(Vec3::new(0.0, -0.5, 0.0)));
    hierarchy.validate()?;
    let shared = hierarchy.into_shared();

    let mut factory = AnimationPacketFactory::new();

    let idle = factory.create_animation("idle")?;
    let channel = idle.add_channel(hip);
    idle.add_keyframe(channel, 0.0, Quat::IDENTITY, Vec3::ZERO);
    idle.add_keyframe(channel, 1.0, Quat::IDENTITY, Vec3::new(0.0, -0.05, 0.0));
    idle.add_keyframe(channel, 2.0, Quat::IDENTITY, Vec3::ZERO);

    let kick = factory.create_animation("kick")?;
    let channel = kick.add_channel(knee);
    kick.add_keyframe(channel, 0.0, Quat::IDENTITY, Vec3::ZERO);
    kick.add_keyframe(channel, 0.4, Quat::from_rotation_x(-1.2), Vec3::ZERO);
    kick.add_keyframe(channel, 0.8, Quat::IDENTITY, Vec3::ZERO);

    let idle = factory.create_clip_node("idle")?;
    if let Some(clip) = factory.clip_node_mut(idle) {
        clip.cyclic = true;
    }
    let kick = factory.create_clip_node("kick")?;
    if let Some(clip) = factory.clip_node_mut(kick) {
        clip.automatic_reset = true;
    }

    let root = factory.create_fsm_node("character")?;
    if let Some(fsm) = factory.fsm_node_mut(root) {
        let resting = fsm.add_state("idle", Some(idle));
        let kicking = fsm.add_state("kick", Some(kick));
        fsm.set_start_state(resting);
        fsm.set_transition_crossfade(resting, kicking, 0.2, 0.2);
        fsm.set_automatic_transition(kicking, resting, true);
    }
    factory.set_animation_root(root);

    let mut instance = SkeletonInstance::new(&shared);
    instance.bind_packet(&factory)?;

    if let Some(packet) = instance.animation_packet_mut() {
        let fsm = packet.root();
        packet
            .tree_mut()
            .add_animation_callback(fsm, |node: NodeKey, event: AnimationEvent| {
                println!("{node:?}: {event:?}");
            });
        packet.play();
    }

    let mut last_version = instance.skeleton_state_version();
    for frame in 0..180 {
        if frame == 60
            && let Some(packet) = instance.animation_packet_mut()
        {
            let root = packet.root();
            packet.tree_mut().switch_to_state(root, 1)?;
        }

        instance.update_skeleton(1.0 / 60.0);

        if instance.skeleton_state_version() != last_version {
            last_version = instance.skeleton_state_version();
            if frame % 20 == 0 {
                let pose = instance.state_abs_space();
                println!("frame {frame:3}: foot at {:?}", pose.offset(foot));
            }
        }
    }

    Ok(())
}
