use crate::math::Transform;
use crate::pose::ModelPose;

/// A single static pose. Sampling ignores time; duration is zero.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedPoseMotion {
    local: Vec<Transform>,
    morph_ratios: Vec<f32>,
}

impl FixedPoseMotion {
    #[must_use]
    pub fn new(local: Vec<Transform>, morph_ratios: Vec<f32>) -> Self {
        Self { local, morph_ratios }
    }

    /// Snapshots the local transforms and morph ratios of `pose`.
    #[must_use]
    pub fn from_pose(pose: &ModelPose) -> Self {
        Self::new(pose.local_transforms().to_vec(), pose.morph_ratios().to_vec())
    }

    #[inline]
    pub fn local_transforms(&self) -> &[Transform] {
        &self.local
    }

    #[inline]
    pub fn morph_ratios(&self) -> &[f32] {
        &self.morph_ratios
    }

    /// Overwrites the local state of `pose`. Entries beyond the snapshot's
    /// size are left untouched.
    pub fn sample(&self, pose: &mut ModelPose) {
        for (bone, transform) in self.local.iter().take(pose.bone_count()).enumerate() {
            pose.set_local_bone_transform(bone, *transform);
        }
        for (morph, ratio) in self.morph_ratios.iter().take(pose.morph_count()).enumerate() {
            pose.set_morph_ratio(morph, *ratio);
        }
    }
}
