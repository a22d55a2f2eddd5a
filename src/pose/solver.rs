//! The deform pipeline.
//!
//! Bones are resolved in a fixed *deform order*: stable-sorted by
//! `(deform_after_physics, deform_layer, index)`. The order is cut into
//! [`DeformStage`]s, one per run of equal `(phase, layer)`. Each stage is
//! processed as:
//!
//! 1. global transform pass over the stage
//! 2. IK chains owned by bones of the stage
//! 3. rotation/translation inheritance for bones of the stage
//! 4. global transform pass again, picking up IK and inheritance changes
//!
//! Before-physics stages run in [`ModelPoseSolver::solve_before_physics`]
//! after group and bone morphs have been folded into the local pose;
//! after-physics stages run in [`ModelPoseSolver::solve_after_physics`] once
//! the physics sync has overwritten the globals of simulated bones.
//!
//! A parent is expected to sort no later than its children. If input data
//! violates this, the child reads whatever global transform its parent held
//! at that moment (the previous stage or frame); the result is undefined and
//! no attempt is made to repair it.

use std::ops::Range;
use std::sync::Arc;

use glam::{Quat, Vec3};
use smallvec::SmallVec;

use crate::math::Transform;
use crate::model::{ModelData, MorphKind};
use crate::physics::{ModelPhysics, PhysicsWorld};
use crate::pose::ModelPose;
use crate::pose::ik::{self, IkOutcome};
use crate::settings::SolverSettings;

/// A contiguous slice of the deform order sharing one phase and layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeformStage {
    /// Positions in the deform order (not bone indices).
    pub range: Range<usize>,
    pub after_physics: bool,
    pub layer: i32,
}

/// Resolves a [`ModelPose`] for one model.
///
/// Stateless across frames apart from the precomputed deform order; one
/// solver may be shared by every pose of the same model.
#[derive(Debug, Clone)]
pub struct ModelPoseSolver {
    data: Arc<ModelData>,
    settings: SolverSettings,

    rest_offsets: Vec<Vec3>,
    children: Vec<SmallVec<[usize; 4]>>,

    deform_order: Vec<usize>,
    after_physics_start: usize,
    stages: Vec<DeformStage>,
}

impl ModelPoseSolver {
    #[must_use]
    pub fn new(data: &Arc<ModelData>) -> Self {
        Self::with_settings(data, SolverSettings::default())
    }

    #[must_use]
    pub fn with_settings(data: &Arc<ModelData>, settings: SolverSettings) -> Self {
        let bones = &data.bones;

        let rest_offsets = (0..bones.len()).map(|i| data.parent_offset(i)).collect();

        let mut children: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); bones.len()];
        for (i, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                children[parent].push(i);
            }
        }

        let mut deform_order: Vec<usize> = (0..bones.len()).collect();
        deform_order.sort_by_key(|&i| (bones[i].deform_after_physics(), bones[i].deform_layer));

        let after_physics_start = deform_order.partition_point(|&i| !bones[i].deform_after_physics());

        let mut stages: Vec<DeformStage> = Vec::new();
        for (pos, &i) in deform_order.iter().enumerate() {
            let (after_physics, layer) = (bones[i].deform_after_physics(), bones[i].deform_layer);
            match stages.last_mut() {
                Some(stage) if stage.after_physics == after_physics && stage.layer == layer => {
                    stage.range.end = pos + 1;
                }
                _ => stages.push(DeformStage {
                    range: pos..pos + 1,
                    after_physics,
                    layer,
                }),
            }
        }

        log::debug!(
            "Deform order for '{}': {} bones, {} stages, after-physics from {}",
            data.name,
            bones.len(),
            stages.len(),
            after_physics_start
        );

        Self {
            data: Arc::clone(data),
            settings,
            rest_offsets,
            children,
            deform_order,
            after_physics_start,
            stages,
        }
    }

    #[inline]
    pub fn model(&self) -> &Arc<ModelData> {
        &self.data
    }

    #[inline]
    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    #[inline]
    pub fn settings_mut(&mut self) -> &mut SolverSettings {
        &mut self.settings
    }

    /// Bone indices in the order they are resolved.
    #[inline]
    pub fn deform_order(&self) -> &[usize] {
        &self.deform_order
    }

    /// First position in [`deform_order`](Self::deform_order) that belongs
    /// to the after-physics phase.
    #[inline]
    pub fn after_physics_start(&self) -> usize {
        self.after_physics_start
    }

    #[inline]
    pub fn stages(&self) -> &[DeformStage] {
        &self.stages
    }

    #[inline]
    pub fn children(&self, bone: usize) -> &[usize] {
        &self.children[bone]
    }

    // ========================================================================
    // Phases
    // ========================================================================

    /// Folds group and bone morphs into the local pose, then resolves every
    /// before-physics stage.
    pub fn solve_before_physics(&self, pose: &mut ModelPose) {
        self.apply_group_morphs(pose);
        self.apply_bone_morphs(pose);

        for stage in self.stages.iter().filter(|s| !s.after_physics) {
            self.solve_stage(pose, stage.range.clone());
        }
    }

    /// Exchanges transforms with the physics world: kinematic bodies receive
    /// the animated bone transforms, simulated bodies are read back into the
    /// pose. Does not step the world.
    pub fn sync_with_physics<W: PhysicsWorld + ?Sized>(
        &self,
        pose: &mut ModelPose,
        physics: &ModelPhysics,
        world: &mut W,
    ) {
        physics.write_kinematic_bodies(pose, world);
        physics.read_dynamic_bodies(self, pose, world);
    }

    /// Resolves the after-physics stages using the physics-updated globals.
    pub fn solve_after_physics(&self, pose: &mut ModelPose) {
        for stage in self.stages.iter().filter(|s| s.after_physics) {
            self.solve_stage(pose, stage.range.clone());
        }
    }

    /// Runs one IK chain in isolation. Returns `None` if `bone` owns no
    /// chain. Globals must be current for the chain's bones.
    pub fn solve_ik_chain(&self, pose: &mut ModelPose, bone: usize) -> Option<IkOutcome> {
        let chain = self.data.bones[bone].ik.as_ref()?;
        Some(ik::solve_chain(self, pose, bone, chain))
    }

    fn solve_stage(&self, pose: &mut ModelPose, range: Range<usize>) {
        self.solve_global_range(pose, range.clone());
        self.solve_ik_range(pose, range.clone());
        self.apply_inheritance(pose, range.clone());
        self.solve_global_range(pose, range);
    }

    // ========================================================================
    // Morphs
    // ========================================================================

    /// Adds `ratio * child_ratio` into every morph a group references. Only
    /// one level deep: group targets of groups are not expanded.
    fn apply_group_morphs(&self, pose: &mut ModelPose) {
        for (i, morph) in self.data.morphs.iter().enumerate() {
            let MorphKind::Group(offsets) = &morph.kind else {
                continue;
            };
            let ratio = pose.morph_ratio(i);
            if ratio == 0.0 {
                continue;
            }
            for offset in offsets {
                if !self.data.morphs[offset.morph].is_group() {
                    *pose.morph_ratio_mut(offset.morph) += ratio * offset.ratio;
                }
            }
        }
    }

    fn apply_bone_morphs(&self, pose: &mut ModelPose) {
        for (i, morph) in self.data.morphs.iter().enumerate() {
            let MorphKind::Bone(offsets) = &morph.kind else {
                continue;
            };
            let ratio = pose.morph_ratio(i);
            if ratio == 0.0 {
                continue;
            }
            for offset in offsets {
                let local = pose.local_bone_transform_mut(offset.bone);
                local.translation += offset.translation * ratio;
                local.rotation = Quat::IDENTITY.slerp(offset.rotation, ratio) * local.rotation;
            }
        }
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// `parent_global * (translate(local.t + rest_offset) * rotate(local.r))`
    #[inline]
    fn resolve_bone(&self, pose: &mut ModelPose, bone: usize) {
        let local = pose.local_bone_transform(bone);
        let local = Transform::new(local.translation + self.rest_offsets[bone], local.rotation);
        pose.global[bone] = match self.data.bones[bone].parent {
            Some(parent) => pose.global[parent] * local,
            None => local,
        };
    }

    fn solve_global_range(&self, pose: &mut ModelPose, range: Range<usize>) {
        for &bone in &self.deform_order[range] {
            self.resolve_bone(pose, bone);
        }
    }

    /// Re-resolves `bone` and its descendants, parents first. Descent stops
    /// below `stop` (the bone itself is still resolved).
    pub(crate) fn update_subtree(&self, pose: &mut ModelPose, bone: usize, stop: Option<usize>) {
        let mut stack: SmallVec<[usize; 32]> = SmallVec::new();
        stack.push(bone);
        while let Some(current) = stack.pop() {
            self.resolve_bone(pose, current);
            if Some(current) != stop {
                stack.extend(self.children[current].iter().copied());
            }
        }
    }

    /// Re-resolves the descendants of `bone`, leaving `bone` itself alone.
    pub(crate) fn update_descendants(&self, pose: &mut ModelPose, bone: usize) {
        for &child in &self.children[bone] {
            self.update_subtree(pose, child, None);
        }
    }

    // ========================================================================
    // IK & inheritance
    // ========================================================================

    fn solve_ik_range(&self, pose: &mut ModelPose, range: Range<usize>) {
        for &bone in &self.deform_order[range] {
            let b = &self.data.bones[bone];
            if !b.is_ik() {
                continue;
            }
            if let Some(chain) = &b.ik {
                ik::solve_chain(self, pose, bone, chain);
            }
        }
    }

    fn apply_inheritance(&self, pose: &mut ModelPose, range: Range<usize>) {
        for &bone in &self.deform_order[range] {
            let b = &self.data.bones[bone];
            let Some(inherit) = b.inherit else {
                continue;
            };
            let source = *pose.local_bone_transform(inherit.parent);
            let local = pose.local_bone_transform_mut(bone);
            if b.inherits_rotation() {
                local.rotation = Quat::IDENTITY.slerp(source.rotation, inherit.weight) * local.rotation;
            }
            if b.inherits_translation() {
                local.translation += source.translation * inherit.weight;
            }
        }
    }
}
