//! Rigid-transform algebra shared by the solver and the skinning pass.

pub mod dual_quat;
pub mod transform;

pub use dual_quat::DualQuat;
pub use transform::{Transform, clamp_euler};
