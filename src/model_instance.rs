//! A live model instance and its per-frame pipeline.
//!
//! ```text
//! reset local ─▶ animators ─▶ solve before physics ─▶ write kinematic bodies
//!                                                              │
//!                                                         world.step
//!                                                              │
//!        skinning ◀── solve after physics ◀── read back simulated bodies
//! ```
//!
//! [`Model::update`] runs the whole chain against a world owned by this
//! model alone. When several models share one world, call
//! [`Model::begin_frame`] on each of them, step the world once, then call
//! [`Model::end_frame`] on each.

use std::sync::Arc;

use crate::animation::Animator;
use crate::model::ModelData;
use crate::physics::{ModelPhysics, PhysicsWorld};
use crate::pose::{ModelPose, ModelPoseSolver};
use crate::settings::SolverSettings;
use crate::skinning::DeformBuffer;

#[derive(Debug)]
pub struct Model {
    data: Arc<ModelData>,
    solver: ModelPoseSolver,
    pose: ModelPose,
    layer: ModelPose,
    animators: Vec<Animator>,
    physics: Option<ModelPhysics>,
}

impl Model {
    #[must_use]
    pub fn new(data: &Arc<ModelData>) -> Self {
        Self::with_settings(data, SolverSettings::default())
    }

    #[must_use]
    pub fn with_settings(data: &Arc<ModelData>, settings: SolverSettings) -> Self {
        let solver = ModelPoseSolver::with_settings(data, settings);
        let mut pose = ModelPose::new(data);
        solver.solve_before_physics(&mut pose);
        solver.solve_after_physics(&mut pose);

        Self {
            data: Arc::clone(data),
            solver,
            layer: pose.clone(),
            pose,
            animators: Vec::new(),
            physics: None,
        }
    }

    #[inline]
    pub fn data(&self) -> &Arc<ModelData> {
        &self.data
    }

    #[inline]
    pub fn pose(&self) -> &ModelPose {
        &self.pose
    }

    #[inline]
    pub fn pose_mut(&mut self) -> &mut ModelPose {
        &mut self.pose
    }

    #[inline]
    pub fn solver(&self) -> &ModelPoseSolver {
        &self.solver
    }

    #[inline]
    pub fn settings(&self) -> &SolverSettings {
        self.solver.settings()
    }

    #[inline]
    pub fn settings_mut(&mut self) -> &mut SolverSettings {
        self.solver.settings_mut()
    }

    // ========================================================================
    // Animators
    // ========================================================================

    /// Adds an animator. The first animator writes the pose; later ones are
    /// layered on top in insertion order.
    pub fn add_animator(&mut self, animator: Animator) -> usize {
        self.animators.push(animator);
        self.animators.len() - 1
    }

    #[inline]
    pub fn animators(&self) -> &[Animator] {
        &self.animators
    }

    #[inline]
    pub fn animator_mut(&mut self, index: usize) -> Option<&mut Animator> {
        self.animators.get_mut(index)
    }

    /// Resets the local pose and lets every animator write into it.
    pub fn animate(&mut self, time: f32) {
        self.pose.reset_local();

        let mut animators = self.animators.iter_mut();
        if let Some(first) = animators.next() {
            first.update(time);
            first.local_pose(time, &mut self.pose);
        }
        for animator in animators {
            animator.update(time);
            self.layer.reset_local();
            animator.local_pose(time, &mut self.layer);
            self.pose += &self.layer;
        }
    }

    // ========================================================================
    // Physics
    // ========================================================================

    /// Creates this model's rigid bodies and joints in `world`, positioned
    /// from the current pose. Replaces any previous binding in the same
    /// world.
    pub fn bind_physics<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        if let Some(previous) = self.physics.take() {
            previous.unbind(world);
        }
        self.physics = Some(ModelPhysics::bind(&self.solver, &self.pose, world));
    }

    pub fn unbind_physics<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        if let Some(physics) = self.physics.take() {
            physics.unbind(world);
        }
    }

    #[inline]
    pub fn physics(&self) -> Option<&ModelPhysics> {
        self.physics.as_ref()
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Animates, solves the before-physics phase and hands kinematic body
    /// transforms to `world`.
    pub fn begin_frame<W: PhysicsWorld + ?Sized>(&mut self, time: f32, world: &mut W) {
        self.animate(time);
        self.solver.solve_before_physics(&mut self.pose);
        if let Some(physics) = &self.physics {
            physics.write_kinematic_bodies(&self.pose, world);
        }
    }

    /// Reads simulated bodies back and solves the after-physics phase.
    pub fn end_frame<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        if let Some(physics) = &self.physics {
            physics.read_dynamic_bodies(&self.solver, &mut self.pose, world);
        }
        self.solver.solve_after_physics(&mut self.pose);
    }

    /// Full frame against a world used by this model only.
    pub fn update<W: PhysicsWorld + ?Sized>(&mut self, time: f32, dt: f32, world: &mut W) {
        self.begin_frame(time, world);
        let settings = self.solver.settings();
        world.step(dt, settings.physics_max_substeps, settings.physics_fixed_time_step);
        self.end_frame(world);
    }

    /// Animates and solves both phases with no physics exchange.
    pub fn update_without_physics(&mut self, time: f32) {
        self.animate(time);
        self.solver.solve_before_physics(&mut self.pose);
        self.solver.solve_after_physics(&mut self.pose);
    }

    /// Applies render morphs and skins the mesh into `buffer`.
    pub fn deform(&self, buffer: &mut DeformBuffer) {
        buffer.update(&self.pose, self.solver.settings());
    }
}
