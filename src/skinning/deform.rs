//! Per-vertex skinning math.
//!
//! Every function here is pure: it reads the final bone transforms of the
//! frame and one vertex, and returns the deformed position and normal.

use glam::{Mat4, Quat, Vec3};

use crate::math::{DualQuat, Transform};
use crate::model::Skinning;

/// Final (skinning-space) bone state of one frame.
#[derive(Debug, Clone, Copy)]
pub struct BonePalette<'a> {
    pub transforms: &'a [Transform],
    pub matrices: &'a [Mat4],
}

/// Deforms `position` / `normal` (rest pose plus vertex morphs) by the
/// vertex's skinning scheme.
pub fn skin_vertex(skinning: &Skinning, position: Vec3, normal: Vec3, palette: BonePalette<'_>) -> (Vec3, Vec3) {
    match *skinning {
        Skinning::Bdef1 { bone } => {
            let t = &palette.transforms[bone];
            (t.transform_point(position), t.transform_vector(normal))
        }
        Skinning::Bdef2 { bones, weight } => {
            let m = palette.matrices[bones[0]] * weight + palette.matrices[bones[1]] * (1.0 - weight);
            apply_linear(&m, position, normal)
        }
        Skinning::Bdef4 { bones, weights } => {
            let mut m = Mat4::ZERO;
            for (bone, w) in bones.iter().zip(weights) {
                if let Some(bone) = bone {
                    m += palette.matrices[*bone] * w;
                }
            }
            apply_linear(&m, position, normal)
        }
        Skinning::Sdef { bones, weight, c, r0, r1 } => sdef(palette, bones, weight, c, r0, r1, position, normal),
        Skinning::Qdef { bones, weights } => {
            let t = blend_dual_quat(palette.transforms, &bones, &weights);
            (t.transform_point(position), t.transform_vector(normal))
        }
    }
}

#[inline]
fn apply_linear(m: &Mat4, position: Vec3, normal: Vec3) -> (Vec3, Vec3) {
    (m.transform_point3(position), m.transform_vector3(normal).normalize_or_zero())
}

/// Spherical deform. The two bone rotations are slerped and applied around
/// the pivot `c`; the translation part comes from each bone's own transform
/// applied to a corrected pivot, which keeps the joint from collapsing.
fn sdef(
    palette: BonePalette<'_>,
    bones: [usize; 2],
    w0: f32,
    c: Vec3,
    r0: Vec3,
    r1: Vec3,
    position: Vec3,
    normal: Vec3,
) -> (Vec3, Vec3) {
    let w1 = 1.0 - w0;
    let (t0, t1) = (&palette.transforms[bones[0]], &palette.transforms[bones[1]]);

    let rotation: Quat = t0.rotation.slerp(t1.rotation, w1);
    let r = (r0 - r1) * 0.5;

    let p = rotation * (position - c)
        + t0.transform_point(c + r * w1) * w0
        + t1.transform_point(c - r * w0) * w1;
    (p, (rotation * normal).normalize_or_zero())
}

/// Blends up to four bones as dual quaternions. Influences whose rotation
/// lies in the opposite hemisphere of the first influence are negated so the
/// blend takes the short path.
pub fn blend_dual_quat(transforms: &[Transform], bones: &[Option<usize>; 4], weights: &[f32; 4]) -> Transform {
    let mut pivot: Option<Quat> = None;
    let mut sum = DualQuat::ZERO;
    for (bone, &w) in bones.iter().zip(weights) {
        let Some(bone) = *bone else {
            continue;
        };
        let dq = DualQuat::from_transform(&transforms[bone]);
        let reference = *pivot.get_or_insert(dq.real);
        let w = if reference.dot(dq.real) < 0.0 { -w } else { w };
        sum = sum + dq * w;
    }
    sum.normalize().to_transform()
}
