use std::sync::Arc;

use crate::animation::clip::FixedMotionClip;
use crate::animation::pose_motion::FixedPoseMotion;
use crate::pose::ModelPose;

/// A source of local poses that an [`Animator`](crate::animation::Animator)
/// can play.
///
/// The set of kinds is closed; camera tracks produce a
/// [`CameraState`](crate::animation::CameraState) rather than a pose and are
/// driven directly through [`CameraMotion`](crate::animation::CameraMotion).
#[derive(Debug, Clone)]
pub enum Motion {
    FixedClip(Arc<FixedMotionClip>),
    FixedPose(Arc<FixedPoseMotion>),
}

impl Motion {
    /// Length in seconds. Static poses have zero duration.
    pub fn duration(&self) -> f32 {
        match self {
            Self::FixedClip(clip) => clip.duration(),
            Self::FixedPose(_) => 0.0,
        }
    }

    /// Writes the local pose at `time` (seconds since the motion started).
    pub fn sample(&self, time: f32, pose: &mut ModelPose) {
        match self {
            Self::FixedClip(clip) => clip.sample(time, pose),
            Self::FixedPose(motion) => motion.sample(pose),
        }
    }
}

impl From<FixedMotionClip> for Motion {
    fn from(clip: FixedMotionClip) -> Self {
        Self::FixedClip(Arc::new(clip))
    }
}

impl From<Arc<FixedMotionClip>> for Motion {
    fn from(clip: Arc<FixedMotionClip>) -> Self {
        Self::FixedClip(clip)
    }
}

impl From<FixedPoseMotion> for Motion {
    fn from(motion: FixedPoseMotion) -> Self {
        Self::FixedPose(Arc::new(motion))
    }
}
