//! Pose and solver tests
//!
//! Tests for:
//! - ModelDataBuilder validation and name lookup
//! - ModelPose reset / blend / layering / scaling
//! - Deform order, stages and the before/after-physics split
//! - Bind pose and hierarchy propagation
//! - Group and bone morphs
//! - Rotation / translation inheritance

use std::sync::Arc;

use glam::{Quat, Vec3};
use marionette::errors::MarionetteError;
use marionette::math::Transform;
use marionette::model::{
    Bone, BoneFlags, BoneOffset, GroupOffset, ModelData, ModelDataBuilder, Morph, MorphKind, UvOffset,
};
use marionette::pose::{ModelPose, ModelPoseSolver};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-4
}

fn quat_approx(a: Quat, b: Quat) -> bool {
    a.dot(b).abs() > 1.0 - EPSILON
}

/// root (0,0,0) -> mid (0,1,0) -> tip (0,2,0)
fn chain_model() -> Arc<ModelData> {
    ModelDataBuilder::new()
        .name("chain")
        .bone(Bone::new("root", Vec3::ZERO))
        .bone(Bone::new("mid", Vec3::new(0.0, 1.0, 0.0)).with_parent(0))
        .bone(Bone::new("tip", Vec3::new(0.0, 2.0, 0.0)).with_parent(1))
        .build()
        .unwrap()
}

fn solve(solver: &ModelPoseSolver, pose: &mut ModelPose) {
    solver.solve_before_physics(pose);
    solver.solve_after_physics(pose);
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn builder_rejects_parent_out_of_range() {
    let err = ModelDataBuilder::new()
        .bone(Bone::new("a", Vec3::ZERO).with_parent(5))
        .build()
        .unwrap_err();
    assert!(matches!(err, MarionetteError::IndexOutOfBounds { index: 5, .. }), "got {err:?}");
}

#[test]
fn builder_rejects_self_parent() {
    let err = ModelDataBuilder::new()
        .bone(Bone::new("a", Vec3::ZERO).with_parent(0))
        .build()
        .unwrap_err();
    assert_eq!(err, MarionetteError::DeformOrderViolation { bone: 0, parent: 0 });
}

#[test]
fn builder_deform_order_violation_is_warning_unless_strict() {
    let _ = env_logger::builder().is_test(true).try_init();

    let build = |strict: bool| {
        ModelDataBuilder::new()
            .strict_deform_order(strict)
            .bone(Bone::new("parent", Vec3::ZERO).with_layer(1))
            .bone(Bone::new("child", Vec3::Y).with_parent(0))
            .build()
    };

    assert!(build(false).is_ok());
    assert_eq!(
        build(true).unwrap_err(),
        MarionetteError::DeformOrderViolation { bone: 1, parent: 0 }
    );
}

#[test]
fn builder_rejects_ik_flag_without_chain() {
    let err = ModelDataBuilder::new()
        .bone(Bone::new("ik", Vec3::ZERO).with_flags(BoneFlags::IK))
        .build()
        .unwrap_err();
    assert!(matches!(err, MarionetteError::InvalidIk { bone: 0, .. }));
}

#[test]
fn builder_rejects_self_referencing_group() {
    let err = ModelDataBuilder::new()
        .morph(Morph::new("loop", MorphKind::Group(vec![GroupOffset { morph: 0, ratio: 1.0 }])))
        .build()
        .unwrap_err();
    assert!(matches!(err, MarionetteError::InvalidMorph { index: 0, .. }));
}

#[test]
fn builder_rejects_bad_additional_uv_channel() {
    let err = ModelDataBuilder::new()
        .morph(Morph::new(
            "uv5",
            MorphKind::AdditionalUv {
                channel: 4,
                offsets: vec![UvOffset {
                    vertex: 0,
                    offset: glam::Vec4::ONE,
                }],
            },
        ))
        .build()
        .unwrap_err();
    assert!(matches!(err, MarionetteError::InvalidMorph { index: 0, .. }));
}

#[test]
fn name_lookup() {
    let data = chain_model();
    assert_eq!(data.bone_index("mid"), Some(1));
    assert_eq!(data.bone_index("missing"), None);
    assert_eq!(data.morph_index("anything"), None);
}

// ============================================================================
// ModelPose
// ============================================================================

#[test]
fn pose_sizes_follow_model() {
    let data = chain_model();
    let pose = ModelPose::new(&data);
    assert_eq!(pose.bone_count(), 3);
    assert_eq!(pose.morph_count(), 0);
}

#[test]
fn pose_check_compatible() {
    let a = ModelPose::new(&chain_model());
    let other = ModelDataBuilder::new().bone(Bone::new("only", Vec3::ZERO)).build().unwrap();
    let b = ModelPose::new(&other);

    assert!(a.check_compatible(&a.clone()).is_ok());
    assert_eq!(
        a.check_compatible(&b).unwrap_err(),
        MarionetteError::PoseMismatch {
            what: "bones",
            expected: 3,
            found: 1
        }
    );
}

#[test]
fn reset_local_then_solve_gives_bind_pose() {
    let data = chain_model();
    let solver = ModelPoseSolver::new(&data);
    let mut pose = ModelPose::new(&data);

    pose.set_local_bone_rotation(0, Quat::from_rotation_x(0.7));
    pose.set_local_bone_translation(1, Vec3::new(3.0, 0.0, 0.0));
    solve(&solver, &mut pose);

    pose.reset_local();
    solve(&solver, &mut pose);

    for (i, bone) in data.bones().iter().enumerate() {
        let global = pose.global_bone_transform(i);
        assert!(
            vec3_approx(global.translation, bone.position),
            "bone {i}: expected {:?}, got {:?}",
            bone.position,
            global.translation
        );
        assert!(quat_approx(global.rotation, Quat::IDENTITY));

        let fin = pose.final_bone_transform(i);
        assert!(vec3_approx(fin.translation, Vec3::ZERO));
    }
}

#[test]
fn blend_with_endpoints() {
    let data = chain_model();
    let mut a = ModelPose::new(&data);
    let mut b = ModelPose::new(&data);
    a.set_local_bone_transform(1, Transform::new(Vec3::X, Quat::from_rotation_y(0.3)));
    b.set_local_bone_transform(1, Transform::new(Vec3::Z * 2.0, Quat::from_rotation_x(1.2)));

    let mut at_zero = a.clone();
    at_zero.blend_with(&b, 0.0);
    let mut at_one = a.clone();
    at_one.blend_with(&b, 1.0);

    for i in 0..3 {
        let (z, o) = (at_zero.local_bone_transform(i), at_one.local_bone_transform(i));
        let (sa, sb) = (a.local_bone_transform(i), b.local_bone_transform(i));
        assert!(vec3_approx(z.translation, sa.translation));
        assert!(quat_approx(z.rotation, sa.rotation));
        assert!(vec3_approx(o.translation, sb.translation));
        assert!(quat_approx(o.rotation, sb.rotation));
    }
}

#[test]
fn add_assign_layers_other_outermost() {
    let data = chain_model();
    let mut base = ModelPose::new(&data);
    let mut layer = ModelPose::new(&data);
    base.set_local_bone_transform(0, Transform::new(Vec3::X, Quat::from_rotation_x(FRAC_PI_2)));
    layer.set_local_bone_transform(0, Transform::new(Vec3::Y, Quat::from_rotation_z(FRAC_PI_2)));

    base += &layer;

    let t = base.local_bone_transform(0);
    assert!(vec3_approx(t.translation, Vec3::new(1.0, 1.0, 0.0)));
    let expected = Quat::from_rotation_z(FRAC_PI_2) * Quat::from_rotation_x(FRAC_PI_2);
    assert!(quat_approx(t.rotation, expected));
}

#[test]
fn mul_assign_fades_toward_identity() {
    let data = chain_model();
    let mut pose = ModelPose::new(&data);
    pose.set_local_bone_transform(2, Transform::new(Vec3::new(0.0, 0.0, 4.0), Quat::from_rotation_y(FRAC_PI_2)));

    pose *= 0.5;

    let t = pose.local_bone_transform(2);
    assert!(vec3_approx(t.translation, Vec3::new(0.0, 0.0, 2.0)));
    assert!(quat_approx(t.rotation, Quat::from_rotation_y(FRAC_PI_4)));
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn three_bone_swing() {
    let data = chain_model();
    let solver = ModelPoseSolver::new(&data);
    let mut pose = ModelPose::new(&data);

    pose.set_local_bone_rotation(1, Quat::from_rotation_z(FRAC_PI_2));
    solve(&solver, &mut pose);

    let tip = pose.global_bone_position(2);
    assert!(
        vec3_approx(tip, Vec3::new(-1.0, 1.0, 0.0)),
        "Expected (-1, 1, 0), got {tip:?}"
    );
    assert!(vec3_approx(pose.global_bone_position(1), Vec3::new(0.0, 1.0, 0.0)));
}

#[test]
fn local_translation_is_relative_to_rest() {
    let data = chain_model();
    let solver = ModelPoseSolver::new(&data);
    let mut pose = ModelPose::new(&data);

    pose.set_local_bone_translation(0, Vec3::new(2.0, 0.0, 0.0));
    solve(&solver, &mut pose);

    assert!(vec3_approx(pose.global_bone_position(2), Vec3::new(2.0, 2.0, 0.0)));
    assert!(vec3_approx(pose.final_bone_transform(2).translation, Vec3::new(2.0, 0.0, 0.0)));
}

#[test]
fn final_bone_matrices_match_transforms() {
    let data = chain_model();
    let solver = ModelPoseSolver::new(&data);
    let mut pose = ModelPose::new(&data);
    pose.set_local_bone_rotation(0, Quat::from_rotation_y(0.5));
    solve(&solver, &mut pose);

    let mut matrices = Vec::new();
    pose.final_bone_matrices(&mut matrices);
    assert_eq!(matrices.len(), 3);
    for (i, m) in matrices.iter().enumerate() {
        assert!(m.abs_diff_eq(pose.final_bone_transform(i).to_mat4(), 1e-5));
    }
}

// ============================================================================
// Deform Order
// ============================================================================

fn layered_model() -> Arc<ModelData> {
    ModelDataBuilder::new()
        .bone(Bone::new("root", Vec3::ZERO))
        .bone(Bone::new("late", Vec3::Y).with_parent(0).with_layer(2))
        .bone(Bone::new("early", Vec3::X).with_parent(0))
        .bone(Bone::new("skirt", Vec3::Z).with_parent(2).after_physics())
        .bone(Bone::new("mid", Vec3::NEG_X).with_parent(0).with_layer(1))
        .build()
        .unwrap()
}

#[test]
fn deform_order_is_stable_by_phase_then_layer() {
    let data = layered_model();
    let solver = ModelPoseSolver::new(&data);

    assert_eq!(solver.deform_order(), &[0, 2, 4, 1, 3]);
    assert_eq!(solver.after_physics_start(), 4);
}

#[test]
fn stages_split_on_phase_and_layer() {
    let data = layered_model();
    let solver = ModelPoseSolver::new(&data);
    let stages = solver.stages();

    let summary: Vec<_> = stages.iter().map(|s| (s.range.clone(), s.after_physics, s.layer)).collect();
    assert_eq!(summary, vec![(0..2, false, 0), (2..3, false, 1), (3..4, false, 2), (4..5, true, 0)]);
}

#[test]
fn after_physics_bones_wait_for_second_phase() {
    let data = layered_model();
    let solver = ModelPoseSolver::new(&data);
    let mut pose = ModelPose::new(&data);

    solver.solve_before_physics(&mut pose);
    assert!(vec3_approx(pose.global_bone_position(2), Vec3::X));
    assert!(
        vec3_approx(pose.global_bone_position(3), Vec3::ZERO),
        "after-physics bone must not be resolved yet"
    );

    solver.solve_after_physics(&mut pose);
    assert!(vec3_approx(pose.global_bone_position(3), Vec3::new(0.0, 0.0, 1.0)));
}

#[test]
fn children_are_indexed() {
    let data = layered_model();
    let solver = ModelPoseSolver::new(&data);
    let mut root_children = solver.children(0).to_vec();
    root_children.sort_unstable();
    assert_eq!(root_children, vec![1, 2, 4]);
    assert_eq!(solver.children(2), &[3]);
}

// ============================================================================
// Morphs
// ============================================================================

fn morph_model() -> Arc<ModelData> {
    ModelDataBuilder::new()
        .bone(Bone::new("root", Vec3::ZERO))
        .bone(Bone::new("arm", Vec3::X).with_parent(0))
        .morph(Morph::new(
            "raise",
            MorphKind::Bone(vec![BoneOffset {
                bone: 1,
                translation: Vec3::new(0.0, 2.0, 0.0),
                rotation: Quat::from_rotation_z(FRAC_PI_2),
            }]),
        ))
        .morph(Morph::new(
            "combo",
            MorphKind::Group(vec![
                GroupOffset { morph: 0, ratio: 0.5 },
                GroupOffset { morph: 2, ratio: 1.0 },
            ]),
        ))
        .morph(Morph::new("nested", MorphKind::Group(vec![GroupOffset { morph: 0, ratio: 1.0 }])))
        .build()
        .unwrap()
}

#[test]
fn bone_morph_scales_by_ratio() {
    let data = morph_model();
    let solver = ModelPoseSolver::new(&data);
    let mut pose = ModelPose::new(&data);

    pose.set_morph_ratio(0, 0.5);
    solver.solve_before_physics(&mut pose);

    let local = pose.local_bone_transform(1);
    assert!(vec3_approx(local.translation, Vec3::new(0.0, 1.0, 0.0)));
    assert!(quat_approx(local.rotation, Quat::from_rotation_z(FRAC_PI_4)));
}

#[test]
fn bone_morph_premultiplies_existing_rotation() {
    let data = morph_model();
    let solver = ModelPoseSolver::new(&data);
    let mut pose = ModelPose::new(&data);

    pose.set_local_bone_rotation(1, Quat::from_rotation_x(FRAC_PI_2));
    pose.set_morph_ratio(0, 1.0);
    solver.solve_before_physics(&mut pose);

    let expected = Quat::from_rotation_z(FRAC_PI_2) * Quat::from_rotation_x(FRAC_PI_2);
    assert!(quat_approx(pose.local_bone_transform(1).rotation, expected));
}

#[test]
fn zero_ratio_morph_is_skipped() {
    let data = morph_model();
    let solver = ModelPoseSolver::new(&data);
    let mut pose = ModelPose::new(&data);

    solver.solve_before_physics(&mut pose);
    assert_eq!(*pose.local_bone_transform(1), Transform::IDENTITY);
}

#[test]
fn group_morph_is_one_level_deep() {
    let data = morph_model();
    let solver = ModelPoseSolver::new(&data);
    let mut pose = ModelPose::new(&data);

    pose.set_morph_ratio(1, 1.0);
    solver.solve_before_physics(&mut pose);

    // "combo" feeds 0.5 into "raise"; its reference to the "nested" group is not expanded.
    assert!(approx_eq(pose.morph_ratio(0), 0.5), "got {}", pose.morph_ratio(0));
    assert!(approx_eq(pose.morph_ratio(2), 0.0));
    assert!(quat_approx(pose.local_bone_transform(1).rotation, Quat::from_rotation_z(FRAC_PI_4)));
}

// ============================================================================
// Inheritance
// ============================================================================

#[test]
fn inherit_rotation_and_translation() {
    let data = ModelDataBuilder::new()
        .bone(Bone::new("source", Vec3::ZERO))
        .bone(Bone::new("follower", Vec3::X).with_inherit(0, 0.5, true, true))
        .build()
        .unwrap();
    let solver = ModelPoseSolver::new(&data);
    let mut pose = ModelPose::new(&data);

    pose.set_local_bone_transform(0, Transform::new(Vec3::new(0.0, 2.0, 0.0), Quat::from_rotation_y(FRAC_PI_2)));
    solve(&solver, &mut pose);

    let local = pose.local_bone_transform(1);
    assert!(quat_approx(local.rotation, Quat::from_rotation_y(FRAC_PI_4)));
    assert!(vec3_approx(local.translation, Vec3::new(0.0, 1.0, 0.0)));

    let global = pose.global_bone_transform(1);
    assert!(vec3_approx(global.translation, Vec3::new(1.0, 1.0, 0.0)));
}

#[test]
fn inherit_rotation_only() {
    let data = ModelDataBuilder::new()
        .bone(Bone::new("source", Vec3::ZERO))
        .bone(Bone::new("follower", Vec3::X).with_inherit(0, 1.0, true, false))
        .build()
        .unwrap();
    let solver = ModelPoseSolver::new(&data);
    let mut pose = ModelPose::new(&data);

    pose.set_local_bone_transform(0, Transform::new(Vec3::Y, Quat::from_rotation_x(0.6)));
    solve(&solver, &mut pose);

    let local = pose.local_bone_transform(1);
    assert!(quat_approx(local.rotation, Quat::from_rotation_x(0.6)));
    assert!(vec3_approx(local.translation, Vec3::ZERO));
}

#[test]
fn built_descriptors_are_read_only_views() {
    let data = chain_model();
    assert_eq!(data.name(), "chain");
    assert_eq!(data.bones().len(), 3);
    assert_eq!(data.bones()[2].parent, Some(1));
    assert!(data.morphs().is_empty() && data.vertices().is_empty());
    assert_eq!(data.additional_uv_count(), 0);

    // The only descriptor reachable without the builder is the empty model.
    let empty = Arc::new(ModelData::default());
    let solver = ModelPoseSolver::new(&empty);
    let mut pose = ModelPose::new(&empty);
    solve(&solver, &mut pose);
    assert_eq!(empty.bone_count(), 0);
    assert!(empty.rigid_bodies().is_empty() && empty.joints().is_empty());
}
