//! Solver Settings
//!
//! Tunables for the deform pipeline. All fields have sensible defaults, so
//! the usual pattern is struct-update syntax:
//!
//! ```rust,ignore
//! use marionette::settings::SolverSettings;
//! use marionette::physics::MixedBodyPolicy;
//!
//! let settings = SolverSettings {
//!     mixed_body_policy: MixedBodyPolicy::Dynamic,
//!     physics_max_substeps: 4,
//!     ..Default::default()
//! };
//! ```

use crate::physics::MixedBodyPolicy;

/// Configuration shared by [`ModelPoseSolver`](crate::pose::ModelPoseSolver)
/// and [`Model`](crate::model_instance::Model).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    /// Distance under which an IK effector counts as having reached its goal.
    /// Also the minimum rotation-axis length for a link to be rotated.
    pub ik_tolerance: f32,

    /// Maximum number of fixed sub-steps per physics step.
    pub physics_max_substeps: u32,

    /// Fixed simulation time step (seconds).
    pub physics_fixed_time_step: f32,

    /// How rigid bodies of calc type `Mixed` are synchronized.
    pub mixed_body_policy: MixedBodyPolicy,

    /// Vertex count from which skinning fans out across threads. Morph
    /// application always runs sequentially. Only honored with the `parallel`
    /// feature.
    pub parallel_skinning_threshold: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            ik_tolerance: 1e-5,
            physics_max_substeps: 1,
            physics_fixed_time_step: 1.0 / 60.0,
            mixed_body_policy: MixedBodyPolicy::default(),
            parallel_skinning_threshold: 4096,
        }
    }
}
