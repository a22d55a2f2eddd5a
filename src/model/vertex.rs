use glam::{Vec2, Vec3, Vec4};

/// Per-vertex bone weighting scheme.
///
/// Weights are trusted as given; BDEF4/QDEF weights are not renormalized.
/// `None` slots in the four-bone schemes mark unused influences.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Skinning {
    Bdef1 {
        bone: usize,
    },
    Bdef2 {
        bones: [usize; 2],
        /// Weight of `bones[0]`; `bones[1]` gets `1 - weight`.
        weight: f32,
    },
    Bdef4 {
        bones: [Option<usize>; 4],
        weights: [f32; 4],
    },
    Sdef {
        bones: [usize; 2],
        weight: f32,
        c: Vec3,
        r0: Vec3,
        r1: Vec3,
    },
    Qdef {
        bones: [Option<usize>; 4],
        weights: [f32; 4],
    },
}

impl Skinning {
    /// Iterates over every bone index this vertex references.
    pub fn bones(&self) -> impl Iterator<Item = usize> + '_ {
        let (fixed, optional): (&[usize], &[Option<usize>]) = match self {
            Self::Bdef1 { bone } => (std::slice::from_ref(bone), &[][..]),
            Self::Bdef2 { bones, .. } | Self::Sdef { bones, .. } => (&bones[..], &[][..]),
            Self::Bdef4 { bones, .. } | Self::Qdef { bones, .. } => (&[][..], &bones[..]),
        };
        fixed.iter().copied().chain(optional.iter().flatten().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub additional_uvs: [Vec4; 4],
    pub skinning: Skinning,
}

impl Vertex {
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3, skinning: Skinning) -> Self {
        Self {
            position,
            normal,
            uv: Vec2::ZERO,
            additional_uvs: [Vec4::ZERO; 4],
            skinning,
        }
    }
}
