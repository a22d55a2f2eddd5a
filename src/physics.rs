//! Physics hand-off.
//!
//! The rigid-body simulation itself lives behind the [`PhysicsWorld`] trait.
//! This module only owns the exchange contract between solved bone
//! transforms and simulated bodies:
//!
//! | calc type | direction          | effect                                              |
//! |-----------|--------------------|-----------------------------------------------------|
//! | `Static`  | pose → world       | body follows the animated bone (kinematic)          |
//! | `Dynamic` | world → pose       | bone global transform follows the simulated body    |
//! | `Mixed`   | see [`MixedBodyPolicy`]                                                  |
//!
//! Every body stores a fixed *bone offset*: its rest transform expressed
//! relative to the bone's skinning space, so that
//! `body_world = bone_global * bone_offset`.
//!
//! The world must finish its step between
//! [`ModelPhysics::write_kinematic_bodies`] and
//! [`ModelPhysics::read_dynamic_bodies`]. Sharing one world between models is
//! fine as long as the calls are serialized, which `&mut W` enforces.

use slotmap::new_key_type;

use crate::math::Transform;
use crate::model::{JointDesc, PhysicsCalcType, RigidBodyDesc};
use crate::pose::{ModelPose, ModelPoseSolver};

new_key_type! {
    /// Handle to a rigid body inside a [`PhysicsWorld`].
    pub struct RigidBodyHandle;
    /// Handle to a joint inside a [`PhysicsWorld`].
    pub struct JointHandle;
}

/// External rigid-body engine.
pub trait PhysicsWorld {
    /// Creates a body from its descriptor at the given world transform.
    fn add_rigid_body(&mut self, desc: &RigidBodyDesc, initial: Transform) -> RigidBodyHandle;

    fn remove_rigid_body(&mut self, body: RigidBodyHandle);

    /// Creates a joint between two bodies. Backends without joint support
    /// return `None`.
    fn add_joint(&mut self, _desc: &JointDesc, _a: RigidBodyHandle, _b: RigidBodyHandle) -> Option<JointHandle> {
        None
    }

    fn remove_joint(&mut self, _joint: JointHandle) {}

    /// Drives a kinematic body to `transform` for the next step.
    fn write_kinematic_transform(&mut self, body: RigidBodyHandle, transform: Transform);

    /// Current world transform of a simulated body.
    fn read_dynamic_transform(&self, body: RigidBodyHandle) -> Transform;

    /// Moves a simulated body without treating it as kinematic.
    fn reposition_body(&mut self, body: RigidBodyHandle, transform: Transform) {
        self.write_kinematic_transform(body, transform);
    }

    /// Advances the simulation by `dt` using at most `max_substeps` steps of
    /// `fixed_dt`.
    fn step(&mut self, dt: f32, max_substeps: u32, fixed_dt: f32);
}

/// Synchronization of `PhysicsCalcType::Mixed` bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixedBodyPolicy {
    /// Rotation comes from the simulation, translation stays animated. The
    /// body is pushed back onto the animated position after read-back so it
    /// stays pinned to its bone.
    #[default]
    FollowPhysicsRotation,
    /// Treated exactly like `Dynamic`.
    Dynamic,
}

/// A descriptor body instantiated in a world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundBody {
    pub handle: RigidBodyHandle,
    /// Index into `ModelData::rigid_bodies`.
    pub desc: usize,
    pub bone: usize,
    pub calc_type: PhysicsCalcType,
    /// Body transform relative to the bone's skinning space.
    pub bone_offset: Transform,
}

/// Bodies and joints of one model instance inside a world.
#[derive(Debug, Clone, Default)]
pub struct ModelPhysics {
    bodies: Vec<BoundBody>,
    unattached: Vec<RigidBodyHandle>,
    joints: Vec<JointHandle>,
}

impl ModelPhysics {
    /// Instantiates every rigid body and joint of the model in `world`,
    /// placing bodies according to the pose's current global transforms.
    pub fn bind<W: PhysicsWorld + ?Sized>(solver: &ModelPoseSolver, pose: &ModelPose, world: &mut W) -> Self {
        let data = solver.model();

        let mut deform_position = vec![0; data.bone_count()];
        for (pos, &bone) in solver.deform_order().iter().enumerate() {
            deform_position[bone] = pos;
        }

        let mut bodies = Vec::new();
        let mut unattached = Vec::new();
        let mut handles = Vec::with_capacity(data.rigid_bodies.len());

        for (i, desc) in data.rigid_bodies.iter().enumerate() {
            let rest = desc.rest_transform();
            match desc.bone {
                Some(bone) => {
                    let bone_offset = Transform::new(rest.translation - data.bones[bone].position, rest.rotation);
                    let initial = *pose.global_bone_transform(bone) * bone_offset;
                    let handle = world.add_rigid_body(desc, initial);
                    handles.push(handle);
                    bodies.push(BoundBody {
                        handle,
                        desc: i,
                        bone,
                        calc_type: desc.calc_type,
                        bone_offset,
                    });
                }
                None => {
                    let handle = world.add_rigid_body(desc, rest);
                    handles.push(handle);
                    unattached.push(handle);
                }
            }
        }

        // Parents before children, so read-back propagation never clobbers a
        // descendant that is synchronized later.
        bodies.sort_by_key(|b| deform_position[b.bone]);

        let mut joints = Vec::new();
        for (i, joint) in data.joints.iter().enumerate() {
            let (a, b) = (joint.body_a, joint.body_b);
            if a == b {
                log::warn!("Joint {i} ('{}') connects body {a} to itself, skipped", joint.name);
                continue;
            }
            if data.rigid_bodies[a].effective_mass() == 0.0 && data.rigid_bodies[b].effective_mass() == 0.0 {
                log::debug!("Joint {i} ('{}') connects two kinematic bodies, skipped", joint.name);
                continue;
            }
            if let Some(handle) = world.add_joint(joint, handles[a], handles[b]) {
                joints.push(handle);
            }
        }

        log::debug!(
            "Bound physics for '{}': {} bodies ({} unattached), {} joints",
            data.name,
            bodies.len() + unattached.len(),
            unattached.len(),
            joints.len()
        );

        Self {
            bodies,
            unattached,
            joints,
        }
    }

    /// Removes everything [`bind`](Self::bind) created.
    pub fn unbind<W: PhysicsWorld + ?Sized>(self, world: &mut W) {
        for joint in self.joints {
            world.remove_joint(joint);
        }
        for body in self.bodies.iter().map(|b| b.handle).chain(self.unattached) {
            world.remove_rigid_body(body);
        }
    }

    /// Bone-attached bodies, ordered by their bone's deform position.
    #[inline]
    pub fn bodies(&self) -> &[BoundBody] {
        &self.bodies
    }

    #[inline]
    pub fn joints(&self) -> &[JointHandle] {
        &self.joints
    }

    /// Pushes the animated transform of every `Static` body into the world.
    pub fn write_kinematic_bodies<W: PhysicsWorld + ?Sized>(&self, pose: &ModelPose, world: &mut W) {
        for body in self.bodies.iter().filter(|b| b.calc_type == PhysicsCalcType::Static) {
            let transform = *pose.global_bone_transform(body.bone) * body.bone_offset;
            world.write_kinematic_transform(body.handle, transform);
        }
    }

    /// Reads simulated bodies back into the pose and re-resolves the
    /// descendants of every affected bone.
    pub fn read_dynamic_bodies<W: PhysicsWorld + ?Sized>(
        &self,
        solver: &ModelPoseSolver,
        pose: &mut ModelPose,
        world: &mut W,
    ) {
        let policy = solver.settings().mixed_body_policy;
        for body in &self.bodies {
            match (body.calc_type, policy) {
                (PhysicsCalcType::Static, _) => continue,
                (PhysicsCalcType::Dynamic, _) | (PhysicsCalcType::Mixed, MixedBodyPolicy::Dynamic) => {
                    let simulated = world.read_dynamic_transform(body.handle);
                    pose.global[body.bone] = simulated * body.bone_offset.inverse();
                }
                (PhysicsCalcType::Mixed, MixedBodyPolicy::FollowPhysicsRotation) => {
                    let simulated = world.read_dynamic_transform(body.handle);
                    let global = &mut pose.global[body.bone];
                    global.rotation = (simulated.rotation * body.bone_offset.rotation.inverse()).normalize();
                    let pinned = Transform::new(global.transform_point(body.bone_offset.translation), simulated.rotation);
                    world.reposition_body(body.handle, pinned);
                }
            }
            solver.update_descendants(pose, body.bone);
        }
    }
}
