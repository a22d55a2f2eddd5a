//! Cyclic-coordinate-descent IK.
//!
//! Each iteration walks the chain's links in order, rotating every link so
//! that the link→effector direction swings toward the link→goal direction.
//! The rotation per link and iteration is capped by the chain's
//! `limit_angle`; links with an [`AngleLimit`](crate::model::AngleLimit) are
//! clamped in Y-X-Z Euler space afterwards. After each link the link's
//! subtree is re-resolved so the next link sees the moved effector.
//!
//! A straight chain gives CCD no rotation axis, so on the first iteration of
//! a multi-iteration solve every limited link is pre-bent to the middle of
//! its limits.
//!
//! Non-convergence is not an error: after `loop_count` iterations the pose
//! keeps whatever partial solution was reached.

use glam::{EulerRot, Quat};

use crate::math::clamp_euler;
use crate::model::{AngleLimit, IkChain};
use crate::pose::ModelPose;
use crate::pose::solver::ModelPoseSolver;

/// Result of one chain solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IkOutcome {
    /// Iterations started (1-based; 0 when `loop_count` is 0).
    pub iterations: u32,
    /// Effector ended within tolerance of the goal.
    pub converged: bool,
}

/// Solves `chain`, whose goal is the global position of `goal_bone`.
pub(crate) fn solve_chain(
    solver: &ModelPoseSolver,
    pose: &mut ModelPose,
    goal_bone: usize,
    chain: &IkChain,
) -> IkOutcome {
    let tolerance = solver.settings().ik_tolerance;
    let bones = &solver.model().bones;
    let goal = pose.global_bone_position(goal_bone);

    let mut iterations = 0;
    for iteration in 0..chain.loop_count {
        iterations += 1;

        if iteration == 0 && chain.loop_count > 1 {
            if pose.global_bone_position(chain.effector).distance(goal) < tolerance {
                return IkOutcome {
                    iterations,
                    converged: true,
                };
            }
            for link in &chain.links {
                if let Some(limit) = link.limit {
                    pose.local_bone_transform_mut(link.bone).rotation = limit_midpoint(limit);
                    solver.update_subtree(pose, link.bone, Some(chain.effector));
                }
            }
        }

        for link in &chain.links {
            let effector = pose.global_bone_position(chain.effector);
            if effector.distance(goal) < tolerance {
                return IkOutcome {
                    iterations,
                    converged: true,
                };
            }

            let link_position = pose.global_bone_position(link.bone);
            let to_effector = effector - link_position;
            let to_goal = goal - link_position;

            let cross = to_effector.cross(to_goal);
            let cross_length = cross.length();
            if cross_length < tolerance {
                if let Some(limit) = link.limit {
                    let local = pose.local_bone_transform_mut(link.bone);
                    local.rotation = clamp_euler(local.rotation, limit.lower, limit.upper);
                    solver.update_subtree(pose, link.bone, Some(chain.effector));
                }
                continue;
            }
            let axis = cross / cross_length;

            let angle = cross_length
                .atan2(to_effector.dot(to_goal))
                .clamp(-chain.limit_angle, chain.limit_angle);

            let parent_rotation = bones[link.bone]
                .parent
                .map_or(Quat::IDENTITY, |p| pose.global_bone_transform(p).rotation);
            let local_axis = (parent_rotation.inverse() * axis).normalize();

            let local = pose.local_bone_transform_mut(link.bone);
            let mut rotation = (Quat::from_axis_angle(local_axis, angle) * local.rotation).normalize();
            if let Some(limit) = link.limit {
                rotation = clamp_euler(rotation, limit.lower, limit.upper);
            }
            local.rotation = rotation;

            solver.update_subtree(pose, link.bone, Some(chain.effector));
        }
    }

    let converged = pose.global_bone_position(chain.effector).distance(goal) < tolerance;
    IkOutcome {
        iterations,
        converged,
    }
}

fn limit_midpoint(limit: AngleLimit) -> Quat {
    let mid = (limit.lower + limit.upper) * 0.5;
    Quat::from_euler(EulerRot::YXZ, mid.y, mid.x, mid.z)
}
