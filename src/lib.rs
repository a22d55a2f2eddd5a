#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod math;
pub mod model;
pub mod pose;
pub mod physics;
pub mod animation;
pub mod skinning;
pub mod model_instance;
pub mod settings;
pub mod errors;

pub use math::{DualQuat, Transform};
pub use model::{Bone, BoneFlags, IkChain, IkLink, ModelData, ModelDataBuilder, Morph, MorphKind};
pub use pose::{ModelPose, ModelPoseSolver};
pub use pose::ik::IkOutcome;
pub use physics::{MixedBodyPolicy, ModelPhysics, PhysicsWorld, RigidBodyHandle};
pub use animation::{Animator, CameraMotion, FixedMotionClip, FixedPoseMotion, InterpolationCurve, Motion, Transition};
pub use skinning::{DeformBuffer, DeformedVertex};
pub use model_instance::Model;
pub use settings::SolverSettings;
pub use errors::{MarionetteError, Result};
