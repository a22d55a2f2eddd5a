use glam::{Quat, Vec3};
use marionette::animation::{Animator, BoneKeyframe, CameraKeyframe, CameraMotion, CameraState, FixedMotionClip, FixedPoseMotion, Transition};
use marionette::model::{Bone, IkChain, IkLink, ModelDataBuilder, Skinning, Vertex};
use marionette::pose::ModelPose;
use marionette::{DeformBuffer, Model};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // hip -> knee -> ankle, driven by a foot IK target.
    let leg = IkChain::new(2, 40, 2.0)
        .with_link(IkLink::new(1).with_limit(Vec3::new(0.0, 0.0, -3.0), Vec3::new(0.0, 0.0, -0.01)))
        .with_link(IkLink::new(0));

    let data = ModelDataBuilder::new()
        .name("leg")
        .bone(Bone::new("hip", Vec3::new(0.0, 2.0, 0.0)))
        .bone(Bone::new("knee", Vec3::new(0.0, 1.0, 0.0)).with_parent(0))
        .bone(Bone::new("ankle", Vec3::ZERO).with_parent(1))
        .bone(Bone::new("foot IK", Vec3::ZERO).with_ik(leg))
        .vertices((0..=20).map(|i| {
            let y = i as f32 * 0.1;
            let skinning = if y > 1.0 {
                Skinning::Bdef2 { bones: [0, 1], weight: (y - 1.0).min(1.0) }
            } else {
                Skinning::Bdef1 { bone: 1 }
            };
            Vertex::new(Vec3::new(0.1, y, 0.0), Vec3::X, skinning)
        }))
        .build()?;

    println!("Built '{}' with {} bones", data.name(), data.bone_count());

    let mut walk = FixedMotionClip::new("walk", data.bone_count(), data.morph_count()).with_loop(true);
    for (frame, x, y) in [(0, -0.4, 0.0), (15, 0.0, 0.3), (30, 0.4, 0.0), (45, 0.0, 0.0), (60, -0.4, 0.0)] {
        walk.insert_bone_keyframe(3, frame, BoneKeyframe::new(Vec3::new(x, y, 0.0), Quat::IDENTITY));
    }

    let mut idle_pose = ModelPose::new(&data);
    idle_pose.set_local_bone_translation(3, Vec3::new(0.0, 0.2, 0.0));

    let mut animator = Animator::new();
    let idle = animator.add_state(FixedPoseMotion::from_pose(&idle_pose));
    let walking = animator.add_state(walk);
    animator.add_transition(Transition::new(idle, walking, 0.5).with_condition(|_, t| t >= 1.0))?;

    let mut model = Model::new(&data);
    model.add_animator(animator);

    let mut camera = CameraMotion::new();
    camera.insert_keyframe(0, CameraKeyframe::new(CameraState { distance: -8.0, target: Vec3::Y, ..Default::default() }));
    camera.insert_keyframe(90, CameraKeyframe::new(CameraState { distance: -5.0, target: Vec3::Y, ..Default::default() }));

    let mut buffer = DeformBuffer::new(&data);

    for step in 0..=12 {
        let time = step as f32 * 0.25;
        model.update_without_physics(time);
        model.deform(&mut buffer);

        let ankle = model.pose().global_bone_position(2);
        let goal = model.pose().global_bone_position(3);
        let view = camera.sample(time);
        println!(
            "t={time:>5.2}s  ankle=({:+.3}, {:+.3})  goal=({:+.3}, {:+.3})  tip vertex y={:.3}  camera distance={:.2}",
            ankle.x,
            ankle.y,
            goal.x,
            goal.y,
            buffer.vertices()[20].position.y,
            view.distance,
        );
    }

    Ok(())
}
