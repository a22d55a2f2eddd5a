use std::ops::{Mul, MulAssign};

use glam::{Affine3A, EulerRot, Mat4, Quat, Vec3};

/// A rigid transform: translation plus unit quaternion rotation.
///
/// Composition follows the matrix convention used by glam: `parent * child`
/// applies `child` first and then `parent`, which is how a bone's local
/// transform is lifted into its parent's space.
///
/// There is no scale component; every bone transform in a skeleton is rigid,
/// which keeps the inverse exact and deep chains free of drift.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    #[inline]
    #[must_use]
    pub const fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY)
    }

    #[inline]
    #[must_use]
    pub const fn from_rotation(rotation: Quat) -> Self {
        Self::new(Vec3::ZERO, rotation)
    }

    /// Applies `self` first and `next` second (`next` expressed in the frame
    /// `self` maps into). Equivalent to `next * self`.
    #[inline]
    #[must_use]
    pub fn then(self, next: Self) -> Self {
        next * self
    }

    /// Fades the transform toward identity: translation is scaled linearly,
    /// rotation is slerped from identity by `t`.
    #[inline]
    #[must_use]
    pub fn scale(self, t: f32) -> Self {
        Self {
            translation: self.translation * t,
            rotation: Quat::IDENTITY.slerp(self.rotation, t),
        }
    }

    /// Per-component blend: linear translation, spherical rotation.
    #[inline]
    #[must_use]
    pub fn blend(self, other: Self, t: f32) -> Self {
        Self {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation.slerp(other.rotation, t),
        }
    }

    #[inline]
    #[must_use]
    pub fn inverse(self) -> Self {
        let inv_rotation = self.rotation.inverse();
        Self {
            translation: inv_rotation * -self.translation,
            rotation: inv_rotation,
        }
    }

    #[inline]
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    #[inline]
    #[must_use]
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// `translate(translation) * rotate(rotation)`
    #[inline]
    #[must_use]
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    #[inline]
    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_rotation_translation(self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform {
    type Output = Self;

    #[inline]
    fn mul(self, child: Self) -> Self {
        Self {
            translation: self.rotation * child.translation + self.translation,
            rotation: self.rotation * child.rotation,
        }
    }
}

impl MulAssign for Transform {
    #[inline]
    fn mul_assign(&mut self, child: Self) {
        *self = *self * child;
    }
}

impl Mul<Vec3> for Transform {
    type Output = Vec3;

    #[inline]
    fn mul(self, point: Vec3) -> Vec3 {
        self.transform_point(point)
    }
}

/// Clamps a rotation component-wise in Euler space.
///
/// Uses intrinsic Y-X-Z order (`EulerRot::YXZ`); `lower` and `upper` hold the
/// per-axis limits as `(x, y, z)` in radians. This is an approximation of a
/// constrained rotation and may misbehave near gimbal lock (|x| ≈ 90°).
#[must_use]
pub fn clamp_euler(rotation: Quat, lower: Vec3, upper: Vec3) -> Quat {
    let (y, x, z) = rotation.to_euler(EulerRot::YXZ);
    let clamped = Vec3::new(x, y, z).clamp(lower, upper);
    Quat::from_euler(EulerRot::YXZ, clamped.y, clamped.x, clamped.z)
}
