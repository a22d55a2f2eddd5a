use std::ops::{Add, Mul};

use glam::{Quat, Vec3};

use crate::math::Transform;

/// Unit dual quaternion used for QDEF (dual-quaternion) skinning.
///
/// `real` carries the rotation, `dual` encodes the translation as
/// `0.5 * t * real` where `t` is the pure quaternion `(t, 0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualQuat {
    pub real: Quat,
    pub dual: Quat,
}

impl DualQuat {
    pub const IDENTITY: Self = Self {
        real: Quat::IDENTITY,
        dual: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
    };

    /// Additive identity, the starting point of a weighted blend.
    pub const ZERO: Self = Self {
        real: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
        dual: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
    };

    #[must_use]
    pub fn from_transform(transform: &Transform) -> Self {
        let t = transform.translation;
        let real = transform.rotation;
        let dual = Quat::from_xyzw(t.x, t.y, t.z, 0.0) * real * 0.5;
        Self { real, dual }
    }

    /// Divides both parts by the magnitude of the real part.
    ///
    /// A zero real part (e.g. all weights cancelled out) yields identity.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.real.length();
        if len <= f32::EPSILON {
            return Self::IDENTITY;
        }
        let inv = 1.0 / len;
        Self {
            real: self.real * inv,
            dual: self.dual * inv,
        }
    }

    #[must_use]
    pub fn translation(&self) -> Vec3 {
        let t = self.dual * self.real.conjugate() * 2.0;
        Vec3::new(t.x, t.y, t.z)
    }

    /// Converts a normalized dual quaternion back to a rigid transform.
    #[must_use]
    pub fn to_transform(&self) -> Transform {
        Transform::new(self.translation(), self.real)
    }
}

impl Add for DualQuat {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            real: self.real + rhs.real,
            dual: self.dual + rhs.dual,
        }
    }
}

impl Mul<f32> for DualQuat {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self {
            real: self.real * rhs,
            dual: self.dual * rhs,
        }
    }
}
