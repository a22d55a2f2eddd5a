//! Animation system tests
//!
//! Tests for:
//! - InterpolationCurve evaluation (linear, eased, endpoints)
//! - FixedMotionClip sampling (interior, before-first, after-last, looping)
//! - FixedPoseMotion and the Motion enum
//! - CameraMotion sampling
//! - Animator state machine (transitions, crossfade, clock controls)

use std::sync::Arc;

use glam::{Quat, Vec3};
use marionette::animation::{
    Animator, AnimatorPhase, BoneKeyframe, CameraKeyframe, CameraMotion, CameraState, FixedMotionClip,
    FixedPoseMotion, InterpolationCurve, MorphKeyframe, Motion, Projection, Transition,
};
use marionette::errors::MarionetteError;
use marionette::math::Transform;
use marionette::model::{Bone, ModelData, ModelDataBuilder, Morph, MorphKind};
use marionette::pose::ModelPose;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

fn quat_approx(a: Quat, b: Quat) -> bool {
    a.dot(b).abs() > 1.0 - 1e-5
}

fn one_bone_model() -> Arc<ModelData> {
    ModelDataBuilder::new()
        .bone(Bone::new("center", Vec3::ZERO))
        .bone(Bone::new("idle", Vec3::Y))
        .morph(Morph::new("blink", MorphKind::Vertex(Vec::new())))
        .build()
        .unwrap()
}

/// Frame 0 = identity, frame 10 = translation (1, 0, 0), linear curves.
fn two_key_clip(looping: bool) -> FixedMotionClip {
    let mut clip = FixedMotionClip::new("walk", 2, 1).with_loop(looping);
    clip.insert_bone_keyframe(0, 0, BoneKeyframe::new(Vec3::ZERO, Quat::IDENTITY));
    clip.insert_bone_keyframe(0, 10, BoneKeyframe::new(Vec3::X, Quat::IDENTITY));
    clip
}

/// Samples bone 0's translation at `time`.
fn translation_at(clip: &FixedMotionClip, time: f32) -> Vec3 {
    let mut pose = ModelPose::new(&one_bone_model());
    clip.sample(time, &mut pose);
    pose.local_bone_transform(0).translation
}

fn pose_motion(data: &Arc<ModelData>, translation: Vec3) -> FixedPoseMotion {
    let mut pose = ModelPose::new(data);
    pose.set_local_bone_translation(0, translation);
    FixedPoseMotion::from_pose(&pose)
}

// ============================================================================
// InterpolationCurve
// ============================================================================

#[test]
fn curve_linear_is_identity() {
    let curve = InterpolationCurve::LINEAR;
    for i in 0..=100 {
        let x = i as f32 / 100.0;
        let y = curve.evaluate(x);
        assert!(approx(y, x), "Expected {x}, got {y}");
    }
}

#[test]
fn curve_endpoints() {
    let curve = InterpolationCurve::new(0.8, 0.1, 0.2, 0.9);
    assert!(approx(curve.evaluate(0.0), 0.0));
    assert!(approx(curve.evaluate(1.0), 1.0));
}

#[test]
fn curve_is_monotonic() {
    let curve = InterpolationCurve::new(0.6, 0.0, 0.4, 1.0);
    let mut last = 0.0;
    for i in 0..=50 {
        let y = curve.evaluate(i as f32 / 50.0);
        assert!(y >= last - 1e-5, "Curve decreased at step {i}: {y} < {last}");
        last = y;
    }
}

#[test]
fn curve_symmetric_ease_midpoint() {
    let curve = InterpolationCurve::new(0.5, 0.0, 0.5, 1.0);
    assert!(approx(curve.evaluate(0.5), 0.5));
    assert!(curve.evaluate(0.25) < 0.25, "ease-in should lag at the start");
}

#[test]
fn curve_from_bytes() {
    let curve = InterpolationCurve::from_bytes(20, 20, 107, 107);
    assert!(curve.is_linear());
    assert!(approx(curve.evaluate(0.3), 0.3));

    let full = InterpolationCurve::from_bytes(127, 0, 0, 127);
    assert!(approx(full.x1, 1.0));
    assert!(approx(full.y2, 1.0));
}

// ============================================================================
// FixedMotionClip
// ============================================================================

#[test]
fn clip_interior_midpoint() {
    let clip = two_key_clip(false);

    let t = translation_at(&clip, 1.0 / 6.0);
    assert!(vec3_approx(t, Vec3::new(0.5, 0.0, 0.0)), "Expected (0.5, 0, 0), got {t:?}");
}

#[test]
fn clip_duration_and_frame_count() {
    let clip = two_key_clip(false);
    assert_eq!(clip.frame_count(), 10);
    assert!(approx(clip.duration(), 10.0 / 30.0));
}

#[test]
fn clip_single_keyframe_loop_is_constant() {
    let value = Vec3::new(0.25, -1.0, 3.0);
    let mut clip = FixedMotionClip::new("pose", 2, 1).with_loop(true);
    clip.insert_bone_keyframe(0, 0, BoneKeyframe::new(value, Quat::from_rotation_y(0.4)));

    for time in [0.0, 0.01, 0.5, 1.0, 7.3, 100.0] {
        let mut pose = ModelPose::new(&one_bone_model());
        clip.sample(time, &mut pose);
        let local = pose.local_bone_transform(0);
        assert!(vec3_approx(local.translation, value), "time {time}: got {:?}", local.translation);
        assert!(quat_approx(local.rotation, Quat::from_rotation_y(0.4)));
    }
}

#[test]
fn clip_after_last_holds() {
    let clip = two_key_clip(false);
    assert!(vec3_approx(translation_at(&clip, 5.0), Vec3::X));
}

#[test]
fn clip_negative_time_clamps_to_start() {
    let clip = two_key_clip(false);
    assert!(vec3_approx(translation_at(&clip, -1.0), Vec3::ZERO));
}

#[test]
fn clip_looping_wraps() {
    let clip = two_key_clip(true);

    // Frame 15 wraps to frame 5.
    let wrapped = translation_at(&clip, 15.0 / 30.0);
    assert!(vec3_approx(wrapped, Vec3::new(0.5, 0.0, 0.0)), "got {wrapped:?}");
}

#[test]
fn clip_before_first_key_blends_from_identity() {
    let mut clip = FixedMotionClip::new("late start", 2, 1);
    clip.insert_bone_keyframe(0, 10, BoneKeyframe::new(Vec3::new(2.0, 0.0, 0.0), Quat::from_rotation_z(FRAC_PI_2)));
    clip.insert_bone_keyframe(1, 20, BoneKeyframe::new(Vec3::ZERO, Quat::IDENTITY));

    let mut pose = ModelPose::new(&one_bone_model());
    clip.sample(5.0 / 30.0, &mut pose);

    let local = pose.local_bone_transform(0);
    assert!(vec3_approx(local.translation, Vec3::new(1.0, 0.0, 0.0)));
    assert!(quat_approx(local.rotation, Quat::from_rotation_z(FRAC_PI_4)));
}

#[test]
fn clip_rotation_slerps() {
    let mut clip = FixedMotionClip::new("turn", 2, 1);
    clip.insert_bone_keyframe(0, 0, BoneKeyframe::new(Vec3::ZERO, Quat::IDENTITY));
    clip.insert_bone_keyframe(0, 10, BoneKeyframe::new(Vec3::ZERO, Quat::from_rotation_y(FRAC_PI_2)));

    let mut pose = ModelPose::new(&one_bone_model());
    clip.sample(5.0 / 30.0, &mut pose);
    assert!(quat_approx(pose.local_bone_transform(0).rotation, Quat::from_rotation_y(FRAC_PI_4)));
}

#[test]
fn clip_per_axis_curves() {
    let ease = InterpolationCurve::new(0.5, 0.0, 0.5, 1.0);
    let mut clip = FixedMotionClip::new("eased", 2, 1);
    clip.insert_bone_keyframe(
        0,
        0,
        BoneKeyframe::new(Vec3::ZERO, Quat::IDENTITY).with_curves(
            InterpolationCurve::LINEAR,
            ease,
            InterpolationCurve::LINEAR,
            InterpolationCurve::LINEAR,
        ),
    );
    clip.insert_bone_keyframe(0, 10, BoneKeyframe::new(Vec3::ONE, Quat::IDENTITY));

    let t = translation_at(&clip, 2.5 / 30.0);
    assert!(approx(t.x, 0.25));
    assert!(approx(t.y, ease.evaluate(0.25)));
    assert!(t.y < t.x);
}

#[test]
fn clip_unanimated_resolves_to_identity() {
    let clip = two_key_clip(false);
    let mut pose = ModelPose::new(&one_bone_model());
    pose.set_local_bone_transform(1, Transform::from_translation(Vec3::splat(9.0)));
    pose.set_morph_ratio(0, 0.7);

    clip.sample(0.1, &mut pose);

    assert_eq!(*pose.local_bone_transform(1), Transform::IDENTITY);
    assert_eq!(pose.morph_ratio(0), 0.0);
}

#[test]
fn clip_morph_ratio_is_linear() {
    let mut clip = FixedMotionClip::new("blink", 2, 1);
    clip.insert_morph_keyframe(0, 0, MorphKeyframe::new(0.0));
    clip.insert_morph_keyframe(0, 4, MorphKeyframe::new(1.0));
    clip.insert_morph_keyframe(0, 8, MorphKeyframe::new(0.0));

    let mut pose = ModelPose::new(&one_bone_model());
    clip.sample(2.0 / 30.0, &mut pose);
    assert!(approx(pose.morph_ratio(0), 0.5));
    clip.sample(6.0 / 30.0, &mut pose);
    assert!(approx(pose.morph_ratio(0), 0.5));
    clip.sample(4.0 / 30.0, &mut pose);
    assert!(approx(pose.morph_ratio(0), 1.0));
}

// ============================================================================
// Motion
// ============================================================================

#[test]
fn motion_dispatch() {
    let data = one_bone_model();
    let clip: Motion = two_key_clip(false).into();
    let still: Motion = pose_motion(&data, Vec3::Z).into();

    assert!(approx(clip.duration(), 10.0 / 30.0));
    assert_eq!(still.duration(), 0.0);

    let mut pose = ModelPose::new(&data);
    still.sample(42.0, &mut pose);
    assert!(vec3_approx(pose.local_bone_transform(0).translation, Vec3::Z));

    clip.sample(1.0 / 6.0, &mut pose);
    assert!(vec3_approx(pose.local_bone_transform(0).translation, Vec3::new(0.5, 0.0, 0.0)));
}

// ============================================================================
// CameraMotion
// ============================================================================

fn camera_key(distance: f32, target: Vec3, fov_deg: f32, projection: Projection) -> CameraKeyframe {
    CameraKeyframe::new(CameraState {
        distance,
        target,
        rotation: Quat::IDENTITY,
        fov: fov_deg.to_radians(),
        projection,
    })
}

#[test]
fn camera_before_first_key_is_default() {
    let mut motion = CameraMotion::new();
    motion.insert_keyframe(10, camera_key(-20.0, Vec3::Y, 30.0, Projection::Orthographic));

    let state = motion.sample(0.1);
    assert_eq!(state, CameraState::default());
    assert!(approx(state.fov, 45f32.to_radians()));
}

#[test]
fn camera_interior_and_projection_from_left_key() {
    let mut motion = CameraMotion::new();
    motion.insert_keyframe(0, camera_key(-10.0, Vec3::ZERO, 30.0, Projection::Orthographic));
    motion.insert_keyframe(10, camera_key(-20.0, Vec3::new(0.0, 2.0, 0.0), 50.0, Projection::Perspective));

    let state = motion.sample(5.0 / 30.0);
    assert!(approx(state.distance, -15.0));
    assert!(vec3_approx(state.target, Vec3::new(0.0, 1.0, 0.0)));
    assert!(approx(state.fov, 40f32.to_radians()));
    assert_eq!(state.projection, Projection::Orthographic);

    let end = motion.sample(1.0);
    assert_eq!(end.projection, Projection::Perspective);
    assert!(approx(end.distance, -20.0));
}

#[test]
fn camera_empty_track_is_default() {
    let motion = CameraMotion::new();
    assert!(motion.is_empty());
    assert_eq!(motion.sample(3.0), CameraState::default());
}

// ============================================================================
// Animator
// ============================================================================

#[test]
fn animator_idle_leaves_pose_untouched() {
    let data = one_bone_model();
    let mut animator = Animator::new();
    let mut pose = ModelPose::new(&data);
    pose.set_local_bone_translation(0, Vec3::X);

    animator.update(1.0);
    animator.local_pose(1.0, &mut pose);

    assert_eq!(animator.phase(), AnimatorPhase::Idle);
    assert!(animator.is_finished(1.0));
    assert!(vec3_approx(pose.local_bone_transform(0).translation, Vec3::X));
}

#[test]
fn animator_first_state_plays() {
    let data = one_bone_model();
    let mut animator = Animator::new();
    let walk = animator.add_state(two_key_clip(false));

    assert_eq!(animator.current_state(), Some(walk));

    let mut pose = ModelPose::new(&data);
    animator.update(1.0 / 6.0);
    animator.local_pose(1.0 / 6.0, &mut pose);
    assert!(vec3_approx(pose.local_bone_transform(0).translation, Vec3::new(0.5, 0.0, 0.0)));
}

#[test]
fn animator_transition_crossfades_then_commits() {
    let data = one_bone_model();
    let mut animator = Animator::new();
    let a = animator.add_state(pose_motion(&data, Vec3::new(1.0, 0.0, 0.0)));
    let b = animator.add_state(pose_motion(&data, Vec3::new(3.0, 0.0, 0.0)));
    let key = animator.add_transition(Transition::new(a, b, 1.0)).unwrap();

    let mut pose = ModelPose::new(&data);

    // Zero-duration pose: the default condition fires immediately.
    animator.update(0.0);
    assert_eq!(animator.phase(), AnimatorPhase::Transitioning(key));
    animator.local_pose(0.0, &mut pose);
    assert!(vec3_approx(pose.local_bone_transform(0).translation, Vec3::new(1.0, 0.0, 0.0)));

    animator.update(0.5);
    assert!(animator.is_transitioning());
    animator.local_pose(0.5, &mut pose);
    let mid = pose.local_bone_transform(0).translation;
    assert!(vec3_approx(mid, Vec3::new(2.0, 0.0, 0.0)), "Expected (2, 0, 0), got {mid:?}");

    animator.update(1.0);
    assert_eq!(animator.phase(), AnimatorPhase::Playing(b));
    animator.local_pose(1.0, &mut pose);
    assert!(vec3_approx(pose.local_bone_transform(0).translation, Vec3::new(3.0, 0.0, 0.0)));
}

#[test]
fn animator_transition_curve_shapes_blend() {
    let data = one_bone_model();
    let mut animator = Animator::new();
    let a = animator.add_state(pose_motion(&data, Vec3::ZERO));
    let b = animator.add_state(pose_motion(&data, Vec3::new(4.0, 0.0, 0.0)));
    animator
        .add_transition(Transition::new(a, b, 2.0).with_curve(|t| t * t))
        .unwrap();

    let mut pose = ModelPose::new(&data);
    animator.update(0.0);
    animator.update(1.0);
    animator.local_pose(1.0, &mut pose);

    // progress 0.5 -> weight 0.25
    assert!(vec3_approx(pose.local_bone_transform(0).translation, Vec3::new(1.0, 0.0, 0.0)));
}

#[test]
fn animator_custom_condition_and_registration_order() {
    let data = one_bone_model();
    let mut animator = Animator::new();
    let idle = animator.add_state(two_key_clip(true));
    let first = animator.add_state(pose_motion(&data, Vec3::X));
    let second = animator.add_state(pose_motion(&data, Vec3::Y));

    animator
        .add_transition(Transition::new(idle, first, 0.0).with_condition(|_, t| t >= 2.0))
        .unwrap();
    animator
        .add_transition(Transition::new(idle, second, 0.0).with_condition(|_, t| t >= 2.0))
        .unwrap();

    // Looping clip exceeds its duration but the custom conditions wait.
    animator.update(1.0);
    assert_eq!(animator.phase(), AnimatorPhase::Playing(idle));

    animator.update(2.0);
    assert!(animator.is_transitioning());
    assert_eq!(animator.current_state(), Some(first));

    animator.update(2.0);
    assert_eq!(animator.phase(), AnimatorPhase::Playing(first));
}

#[test]
fn animator_rejects_unknown_state() {
    let mut animator = Animator::new();
    let a = animator.add_state(two_key_clip(false));

    let mut other = Animator::new();
    let _ = other.add_state(two_key_clip(false));
    let stray = other.add_state(two_key_clip(false));

    assert_eq!(
        animator.add_transition(Transition::new(a, stray, 1.0)).unwrap_err(),
        MarionetteError::UnknownState
    );
    assert_eq!(animator.play(stray, 0.0).unwrap_err(), MarionetteError::UnknownState);
}

#[test]
fn animator_pause_and_resume() {
    let data = one_bone_model();
    let mut animator = Animator::new();
    animator.add_state(two_key_clip(false));

    let mut pose = ModelPose::new(&data);

    animator.pause(1.0 / 30.0);
    assert!(animator.is_paused());
    animator.local_pose(1.0, &mut pose);
    assert!(vec3_approx(pose.local_bone_transform(0).translation, Vec3::new(0.1, 0.0, 0.0)));

    // One second paused: local time picks up at frame 1 again.
    animator.resume(1.0 + 1.0 / 30.0);
    animator.local_pose(1.0 + 3.0 / 30.0, &mut pose);
    let t = pose.local_bone_transform(0).translation;
    assert!(vec3_approx(t, Vec3::new(0.3, 0.0, 0.0)), "got {t:?}");
}

#[test]
fn animator_finished_and_reset() {
    let data = one_bone_model();
    let mut animator = Animator::new();
    animator.add_state(two_key_clip(false));

    assert!(!animator.is_finished(0.2));
    assert!(animator.is_finished(0.5));

    animator.reset(0.5);
    assert!(!animator.is_finished(0.5));
    assert!(approx(animator.local_time(0.6), 0.1));

    let mut pose = ModelPose::new(&data);
    animator.local_pose(0.5, &mut pose);
    assert!(vec3_approx(pose.local_bone_transform(0).translation, Vec3::ZERO));
}

#[test]
fn animator_play_jumps_without_crossfade() {
    let data = one_bone_model();
    let mut animator = Animator::new();
    let _a = animator.add_state(pose_motion(&data, Vec3::X));
    let b = animator.add_state(pose_motion(&data, Vec3::Z));

    animator.play(b, 3.0).unwrap();
    let mut pose = ModelPose::new(&data);
    animator.local_pose(3.0, &mut pose);

    assert_eq!(animator.phase(), AnimatorPhase::Playing(b));
    assert!(vec3_approx(pose.local_bone_transform(0).translation, Vec3::Z));
}
