use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::{Quat, Vec3};

use myth_skeleton::animation::AnimationPacketFactory;
use myth_skeleton::scene::{BoneHierarchy, BoneTransform, SharedHierarchy, SkeletonInstance};

fn chain(bones: usize) -> SharedHierarchy {
    let mut hierarchy = BoneHierarchy::new();
    let mut parent = None;
    for _ in 0..bones {
        let bone = hierarchy.create_bone(parent);
        hierarchy.set_transform_bone_space(bone, BoneTransform::from_offset(Vec3::Y));
        parent = Some(bone);
    }
    hierarchy.into_shared()
}

/// Two cyclic clips animating every bone, under one blend node.
fn walk_run(bones: usize) -> AnimationPacketFactory {
    let mut factory = AnimationPacketFactory::new();
    for (name, angle) in [("walk", 0.2_f32), ("run", 0.5)] {
        let clip = factory.create_animation(name).unwrap();
        for bone in 0..bones {
            let channel = clip.add_channel(bone);
            for step in 0..=8 {
                let time = step as f32 * 0.125;
                let swing = (time * std::f32::consts::TAU).sin() * angle;
                clip.add_keyframe(channel, time, Quat::from_rotation_x(swing), Vec3::ZERO);
            }
        }
        let node = factory.create_clip_node(name).unwrap();
        factory.clip_node_mut(node).unwrap().cyclic = true;
    }

    let root = factory.create_blend_node("locomotion").unwrap();
    let walk = factory.find_node("walk").unwrap();
    let run = factory.find_node("run").unwrap();
    let blend = factory.blend_node_mut(root).unwrap();
    blend.add_node(walk, 0.7);
    blend.add_node(run, 0.3);
    factory.set_animation_root(root);
    factory
}

fn update_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_skeleton");
    for bones in [16, 64, 256] {
        let shared = chain(bones);
        let factory = walk_run(bones);
        let mut instance = SkeletonInstance::new(&shared);
        instance.bind_packet(&factory).unwrap();
        instance.animation_packet_mut().unwrap().play();

        group.bench_with_input(BenchmarkId::from_parameter(bones), &bones, |b, _| {
            b.iter(|| {
                instance.update_skeleton(black_box(1.0 / 60.0));
                black_box(instance.state_bind_space());
            });
        });
    }
    group.finish();
}

fn instantiate_benchmark(c: &mut Criterion) {
    let factory = walk_run(64);
    c.bench_function("create_instance", |b| {
        b.iter(|| black_box(factory.create_instance().unwrap()));
    });
}

criterion_group!(benches, update_benchmark, instantiate_benchmark);
criterion_main!(benches);
