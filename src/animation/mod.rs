//! Animation System
//!
//! Motion sources and the state machine that plays them:
//!
//! - [`InterpolationCurve`]: Bézier easing used by every keyframe channel
//! - [`FixedMotionClip`]: keyframed bone/morph clip
//! - [`FixedPoseMotion`]: one static pose
//! - [`Motion`]: closed set of pose-producing sources
//! - [`CameraMotion`]: keyframed camera track producing a [`CameraState`]
//! - [`Animator`]: plays motions and crossfades along transitions
//!
//! Motions write *local* state only. Several animators can drive one model;
//! the model layers their outputs with `ModelPose += ModelPose`.

pub mod animator;
pub mod camera;
pub mod clip;
pub mod curve;
pub mod motion;
pub mod pose_motion;

pub use animator::{
    Animator, AnimatorPhase, StateKey, Transition, TransitionCondition, TransitionCurve, TransitionKey,
};
pub use camera::{CameraKeyframe, CameraMotion, CameraState, Projection};
pub use clip::{BoneKeyframe, DEFAULT_FRAME_RATE, FixedMotionClip, MorphKeyframe};
pub use curve::InterpolationCurve;
pub use motion::Motion;
pub use pose_motion::FixedPoseMotion;
