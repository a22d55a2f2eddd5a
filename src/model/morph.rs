use glam::{Quat, Vec3, Vec4};

use crate::model::MaterialFactors;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupOffset {
    pub morph: usize,
    pub ratio: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VertexOffset {
    pub vertex: usize,
    pub offset: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneOffset {
    pub bone: usize,
    pub translation: Vec3,
    pub rotation: Quat,
}

/// UV offset; the base UV channel only uses `offset.xy`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UvOffset {
    pub vertex: usize,
    pub offset: Vec4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MaterialOp {
    Multiply,
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterialOffset {
    /// `None` targets every material of the model.
    pub material: Option<usize>,
    pub op: MaterialOp,
    pub factors: MaterialFactors,
}

/// Payload of a morph. A morph owns offsets of exactly one kind.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MorphKind {
    Group(Vec<GroupOffset>),
    Vertex(Vec<VertexOffset>),
    Bone(Vec<BoneOffset>),
    Uv(Vec<UvOffset>),
    /// Offsets into one of the four additional UV channels.
    AdditionalUv { channel: u8, offsets: Vec<UvOffset> },
    Material(Vec<MaterialOffset>),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Morph {
    pub name: String,
    pub kind: MorphKind,
}

impl Morph {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: MorphKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    #[inline]
    pub fn is_group(&self) -> bool {
        matches!(self.kind, MorphKind::Group(_))
    }
}
