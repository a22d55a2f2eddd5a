use bitflags::bitflags;
use glam::Vec3;
use smallvec::SmallVec;

bitflags! {
    /// Per-bone behavior flags, bit-compatible with the usual PMX layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct BoneFlags: u16 {
        const TAIL_IS_BONE         = 0x0001;
        const ALLOW_ROTATION       = 0x0002;
        const ALLOW_TRANSLATION    = 0x0004;
        const VISIBLE              = 0x0008;
        const OPERABLE             = 0x0010;
        const IK                   = 0x0020;
        const LOCAL_INHERIT        = 0x0080;
        const INHERIT_ROTATION     = 0x0100;
        const INHERIT_TRANSLATION  = 0x0200;
        const LIMIT_AXIS           = 0x0400;
        const LOCAL_AXIS           = 0x0800;
        const DEFORM_AFTER_PHYSICS = 0x1000;
        const EXTERNAL_PARENT      = 0x2000;
    }
}

/// Where the visual tip of a bone points. Only used by tooling; the solver
/// ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoneTail {
    #[default]
    None,
    Offset(Vec3),
    Bone(usize),
}

/// Rotation/translation borrowed from another bone's local transform.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneInherit {
    pub parent: usize,
    pub weight: f32,
}

/// Per-axis Euler limits (radians, `(x, y, z)`) for an IK link.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AngleLimit {
    pub lower: Vec3,
    pub upper: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IkLink {
    pub bone: usize,
    pub limit: Option<AngleLimit>,
}

impl IkLink {
    #[must_use]
    pub fn new(bone: usize) -> Self {
        Self { bone, limit: None }
    }

    #[must_use]
    pub fn with_limit(mut self, lower: Vec3, upper: Vec3) -> Self {
        self.limit = Some(AngleLimit { lower, upper });
        self
    }
}

/// CCD chain owned by an IK bone.
///
/// The owning bone's global position is the goal; `effector` is the bone
/// that should reach it. Links are listed from the effector's parent outward
/// to the chain root.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IkChain {
    pub effector: usize,
    pub loop_count: u32,
    /// Maximum rotation per link per iteration (radians).
    pub limit_angle: f32,
    pub links: SmallVec<[IkLink; 4]>,
}

impl IkChain {
    #[must_use]
    pub fn new(effector: usize, loop_count: u32, limit_angle: f32) -> Self {
        Self {
            effector,
            loop_count,
            limit_angle,
            links: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with_link(mut self, link: IkLink) -> Self {
        self.links.push(link);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bone {
    pub name: String,
    /// Rest position in model space.
    pub position: Vec3,
    pub parent: Option<usize>,
    pub deform_layer: i32,
    pub flags: BoneFlags,
    pub tail: BoneTail,
    pub inherit: Option<BoneInherit>,
    pub ik: Option<IkChain>,
}

impl Bone {
    #[must_use]
    pub fn new(name: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: name.into(),
            position,
            parent: None,
            deform_layer: 0,
            flags: BoneFlags::ALLOW_ROTATION | BoneFlags::VISIBLE | BoneFlags::OPERABLE,
            tail: BoneTail::None,
            inherit: None,
            ik: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_layer(mut self, layer: i32) -> Self {
        self.deform_layer = layer;
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: BoneFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn after_physics(self) -> Self {
        self.with_flags(BoneFlags::DEFORM_AFTER_PHYSICS)
    }

    #[must_use]
    pub fn with_ik(mut self, chain: IkChain) -> Self {
        self.flags |= BoneFlags::IK;
        self.ik = Some(chain);
        self
    }

    #[must_use]
    pub fn with_inherit(mut self, parent: usize, weight: f32, rotation: bool, translation: bool) -> Self {
        self.flags.set(BoneFlags::INHERIT_ROTATION, rotation);
        self.flags.set(BoneFlags::INHERIT_TRANSLATION, translation);
        self.inherit = Some(BoneInherit { parent, weight });
        self
    }

    #[inline]
    pub fn is_ik(&self) -> bool {
        self.flags.contains(BoneFlags::IK)
    }

    #[inline]
    pub fn deform_after_physics(&self) -> bool {
        self.flags.contains(BoneFlags::DEFORM_AFTER_PHYSICS)
    }

    #[inline]
    pub fn inherits_rotation(&self) -> bool {
        self.flags.contains(BoneFlags::INHERIT_ROTATION)
    }

    #[inline]
    pub fn inherits_translation(&self) -> bool {
        self.flags.contains(BoneFlags::INHERIT_TRANSLATION)
    }
}
