//! Per-frame pose state and the solver that resolves it.
//!
//! # Index Discipline
//!
//! Bone and morph indices handed to [`ModelPose`] come from trusted upstream
//! resolvers (name lookup drops unknown names before they get here). Every
//! accessor uses checked slice indexing: an out-of-range index is a
//! programming error and panics.

pub mod ik;
pub mod solver;

use std::ops::{AddAssign, MulAssign};
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use crate::errors::{MarionetteError, Result};
use crate::math::Transform;
use crate::model::ModelData;

pub use solver::{DeformStage, ModelPoseSolver};

/// Mutable animation state of one model instance.
///
/// Holds local bone transforms and morph ratios written by animators, plus
/// the global bone transforms cached by the last solve pass. Global
/// transforms are only meaningful right after
/// [`ModelPoseSolver::solve_before_physics`] / `solve_after_physics`.
#[derive(Debug, Clone)]
pub struct ModelPose {
    data: Arc<ModelData>,
    local: Vec<Transform>,
    morph_ratios: Vec<f32>,
    pub(crate) global: Vec<Transform>,
}

impl ModelPose {
    #[must_use]
    pub fn new(data: &Arc<ModelData>) -> Self {
        let bones = data.bone_count();
        Self {
            data: Arc::clone(data),
            local: vec![Transform::IDENTITY; bones],
            morph_ratios: vec![0.0; data.morph_count()],
            global: vec![Transform::IDENTITY; bones],
        }
    }

    #[inline]
    pub fn model(&self) -> &Arc<ModelData> {
        &self.data
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.local.len()
    }

    #[inline]
    pub fn morph_count(&self) -> usize {
        self.morph_ratios.len()
    }

    /// Returns an error when `other` was created for a model with a different
    /// bone or morph count.
    pub fn check_compatible(&self, other: &ModelPose) -> Result<()> {
        if other.bone_count() != self.bone_count() {
            return Err(MarionetteError::PoseMismatch {
                what: "bones",
                expected: self.bone_count(),
                found: other.bone_count(),
            });
        }
        if other.morph_count() != self.morph_count() {
            return Err(MarionetteError::PoseMismatch {
                what: "morphs",
                expected: self.morph_count(),
                found: other.morph_count(),
            });
        }
        Ok(())
    }

    /// Resets every local transform to identity and every morph ratio to zero.
    pub fn reset_local(&mut self) {
        self.local.fill(Transform::IDENTITY);
        self.morph_ratios.fill(0.0);
    }

    /// Copies local transforms and morph ratios from `other`, keeping the
    /// allocation. Global transforms are left untouched.
    pub fn copy_local_from(&mut self, other: &ModelPose) {
        self.local.copy_from_slice(&other.local);
        self.morph_ratios.copy_from_slice(&other.morph_ratios);
    }

    // ========================================================================
    // Local state
    // ========================================================================

    #[inline]
    pub fn set_local_bone_transform(&mut self, bone: usize, transform: Transform) {
        self.local[bone] = transform;
    }

    #[inline]
    pub fn set_local_bone_translation(&mut self, bone: usize, translation: Vec3) {
        self.local[bone].translation = translation;
    }

    #[inline]
    pub fn set_local_bone_rotation(&mut self, bone: usize, rotation: Quat) {
        self.local[bone].rotation = rotation;
    }

    #[inline]
    pub fn set_morph_ratio(&mut self, morph: usize, ratio: f32) {
        self.morph_ratios[morph] = ratio;
    }

    #[inline]
    pub fn local_bone_transform(&self, bone: usize) -> &Transform {
        &self.local[bone]
    }

    #[inline]
    pub fn local_bone_transform_mut(&mut self, bone: usize) -> &mut Transform {
        &mut self.local[bone]
    }

    #[inline]
    pub fn morph_ratio(&self, morph: usize) -> f32 {
        self.morph_ratios[morph]
    }

    #[inline]
    pub fn morph_ratio_mut(&mut self, morph: usize) -> &mut f32 {
        &mut self.morph_ratios[morph]
    }

    #[inline]
    pub fn local_transforms(&self) -> &[Transform] {
        &self.local
    }

    #[inline]
    pub fn morph_ratios(&self) -> &[f32] {
        &self.morph_ratios
    }

    // ========================================================================
    // Resolved state
    // ========================================================================

    #[inline]
    pub fn global_bone_transform(&self, bone: usize) -> &Transform {
        &self.global[bone]
    }

    #[inline]
    pub fn global_bone_position(&self, bone: usize) -> Vec3 {
        self.global[bone].translation
    }

    #[inline]
    pub fn global_transforms(&self) -> &[Transform] {
        &self.global
    }

    /// Skinning transform of a bone: the global transform with the bone's
    /// rest position subtracted, i.e. `global * translate(-rest)`.
    #[inline]
    pub fn final_bone_transform(&self, bone: usize) -> Transform {
        self.global[bone] * Transform::from_translation(-self.data.bones[bone].position)
    }

    /// Writes the skinning matrix of every bone into `out` (resized to fit).
    pub fn final_bone_matrices(&self, out: &mut Vec<Mat4>) {
        out.clear();
        out.extend((0..self.bone_count()).map(|i| self.final_bone_transform(i).to_mat4()));
    }

    // ========================================================================
    // Pose arithmetic
    // ========================================================================

    /// Crossfades toward `other`: translations lerp, rotations slerp, morph
    /// ratios lerp. `t = 0` keeps `self`, `t = 1` yields `other`.
    pub fn blend_with(&mut self, other: &ModelPose, t: f32) {
        for (a, b) in self.local.iter_mut().zip(&other.local) {
            *a = a.blend(*b, t);
        }
        for (a, b) in self.morph_ratios.iter_mut().zip(&other.morph_ratios) {
            *a += (*b - *a) * t;
        }
    }
}

/// Layers `other` on top of `self`: translations add, `other`'s rotation is
/// applied outermost, morph ratios add.
impl AddAssign<&ModelPose> for ModelPose {
    fn add_assign(&mut self, other: &ModelPose) {
        for (a, b) in self.local.iter_mut().zip(&other.local) {
            a.translation += b.translation;
            a.rotation = b.rotation * a.rotation;
        }
        for (a, b) in self.morph_ratios.iter_mut().zip(&other.morph_ratios) {
            *a += *b;
        }
    }
}

/// Fades every local transform toward identity and scales morph ratios.
impl MulAssign<f32> for ModelPose {
    fn mul_assign(&mut self, t: f32) {
        for local in &mut self.local {
            *local = local.scale(t);
        }
        for ratio in &mut self.morph_ratios {
            *ratio *= t;
        }
    }
}
