use glam::{EulerRot, Quat, Vec3};

use crate::math::Transform;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RigidBodyShape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    Capsule { radius: f32, height: f32 },
}

/// Who drives a rigid body's transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PhysicsCalcType {
    /// Kinematic: the body follows the animated bone.
    Static,
    /// The bone follows the simulated body.
    Dynamic,
    /// Simulated rotation, animated position.
    Mixed,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RigidBodyDesc {
    pub name: String,
    pub bone: Option<usize>,
    pub group: u8,
    pub collision_mask: u16,
    pub shape: RigidBodyShape,
    /// Rest position in model space.
    pub position: Vec3,
    /// Rest rotation as Euler angles `(x, y, z)`, applied in Y-X-Z order.
    pub rotation: Vec3,
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub restitution: f32,
    pub friction: f32,
    pub calc_type: PhysicsCalcType,
}

impl RigidBodyDesc {
    #[must_use]
    pub fn new(name: impl Into<String>, bone: Option<usize>, calc_type: PhysicsCalcType) -> Self {
        Self {
            name: name.into(),
            bone,
            group: 0,
            collision_mask: 0xFFFF,
            shape: RigidBodyShape::Sphere { radius: 0.5 },
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            mass: 1.0,
            linear_damping: 0.5,
            angular_damping: 0.5,
            restitution: 0.0,
            friction: 0.5,
            calc_type,
        }
    }

    #[must_use]
    pub fn with_rest(mut self, position: Vec3, rotation: Vec3) -> Self {
        self.position = position;
        self.rotation = rotation;
        self
    }

    /// Rest transform of the body in model space.
    #[must_use]
    pub fn rest_transform(&self) -> Transform {
        let r = self.rotation;
        Transform::new(self.position, Quat::from_euler(EulerRot::YXZ, r.y, r.x, r.z))
    }

    /// Mass handed to the simulation; kinematic bodies are massless.
    #[must_use]
    pub fn effective_mass(&self) -> f32 {
        match self.calc_type {
            PhysicsCalcType::Static => 0.0,
            PhysicsCalcType::Dynamic | PhysicsCalcType::Mixed => self.mass,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JointKind {
    Spring6Dof,
    Generic6Dof,
    PointToPoint,
    ConeTwist,
    Slider,
    Hinge,
}

/// Constraint between two rigid bodies, forwarded untouched to the physics
/// backend.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointDesc {
    pub name: String,
    pub kind: JointKind,
    pub body_a: usize,
    pub body_b: usize,
    pub position: Vec3,
    pub rotation: Vec3,
    pub linear_lower: Vec3,
    pub linear_upper: Vec3,
    pub angular_lower: Vec3,
    pub angular_upper: Vec3,
    pub linear_stiffness: Vec3,
    pub angular_stiffness: Vec3,
}

impl JointDesc {
    /// An unconstrained joint of `kind` at the origin.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: JointKind, body_a: usize, body_b: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            body_a,
            body_b,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            linear_lower: Vec3::ZERO,
            linear_upper: Vec3::ZERO,
            angular_lower: Vec3::ZERO,
            angular_upper: Vec3::ZERO,
            linear_stiffness: Vec3::ZERO,
            angular_stiffness: Vec3::ZERO,
        }
    }
}
