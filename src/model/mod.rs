//! Immutable model descriptors.
//!
//! A [`ModelData`] is built once at load time, validated, and then shared
//! read-only (behind an `Arc`) by every pose, solver and deform buffer that
//! animates an instance of the model.

mod bone;
mod material;
mod morph;
mod rigid_body;
mod vertex;

use std::sync::Arc;

use rustc_hash::FxHashMap;

pub use bone::{AngleLimit, Bone, BoneFlags, BoneInherit, BoneTail, IkChain, IkLink};
pub use material::{Material, MaterialFactors};
pub use morph::{
    BoneOffset, GroupOffset, MaterialOffset, MaterialOp, Morph, MorphKind, UvOffset, VertexOffset,
};
pub use rigid_body::{JointDesc, JointKind, PhysicsCalcType, RigidBodyDesc, RigidBodyShape};
pub use vertex::{Skinning, Vertex};

use crate::errors::{MarionetteError, Result};

/// Skeleton, morphs, mesh and physics descriptors of one model.
///
/// Only [`ModelDataBuilder::build`] fills one in, so every cross index it
/// holds has been validated. The default value is the empty model.
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub(crate) name: String,
    pub(crate) bones: Vec<Bone>,
    pub(crate) morphs: Vec<Morph>,
    pub(crate) materials: Vec<Material>,
    pub(crate) vertices: Vec<Vertex>,
    /// Number of additional UV channels actually in use (0..=4).
    pub(crate) additional_uv_count: u8,
    pub(crate) rigid_bodies: Vec<RigidBodyDesc>,
    pub(crate) joints: Vec<JointDesc>,

    bone_lookup: FxHashMap<String, usize>,
    morph_lookup: FxHashMap<String, usize>,
}

impl ModelData {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn morphs(&self) -> &[Morph] {
        &self.morphs
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Number of additional UV channels actually in use (0..=4).
    pub fn additional_uv_count(&self) -> u8 {
        self.additional_uv_count
    }

    pub fn rigid_bodies(&self) -> &[RigidBodyDesc] {
        &self.rigid_bodies
    }

    pub fn joints(&self) -> &[JointDesc] {
        &self.joints
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn morph_count(&self) -> usize {
        self.morphs.len()
    }

    /// Resolves a bone name to its index. Duplicate names resolve to the
    /// first bone carrying the name.
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bone_lookup.get(name).copied()
    }

    pub fn morph_index(&self, name: &str) -> Option<usize> {
        self.morph_lookup.get(name).copied()
    }

    /// Rest-pose offset of a bone relative to its parent.
    #[inline]
    pub fn parent_offset(&self, bone: usize) -> glam::Vec3 {
        let b = &self.bones[bone];
        match b.parent {
            Some(p) => b.position - self.bones[p].position,
            None => b.position,
        }
    }
}

/// Assembles and validates a [`ModelData`].
#[derive(Debug, Default)]
pub struct ModelDataBuilder {
    data: ModelData,
    strict_deform_order: bool,
}

impl ModelDataBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.data.name = name.into();
        self
    }

    /// Turns parent-after-child deform order into a hard error instead of a
    /// warning.
    #[must_use]
    pub fn strict_deform_order(mut self, strict: bool) -> Self {
        self.strict_deform_order = strict;
        self
    }

    pub fn add_bone(&mut self, bone: Bone) -> usize {
        self.data.bones.push(bone);
        self.data.bones.len() - 1
    }

    #[must_use]
    pub fn bone(mut self, bone: Bone) -> Self {
        self.add_bone(bone);
        self
    }

    pub fn add_morph(&mut self, morph: Morph) -> usize {
        self.data.morphs.push(morph);
        self.data.morphs.len() - 1
    }

    #[must_use]
    pub fn morph(mut self, morph: Morph) -> Self {
        self.add_morph(morph);
        self
    }

    #[must_use]
    pub fn material(mut self, material: Material) -> Self {
        self.data.materials.push(material);
        self
    }

    #[must_use]
    pub fn vertex(mut self, vertex: Vertex) -> Self {
        self.data.vertices.push(vertex);
        self
    }

    #[must_use]
    pub fn vertices(mut self, vertices: impl IntoIterator<Item = Vertex>) -> Self {
        self.data.vertices.extend(vertices);
        self
    }

    #[must_use]
    pub fn additional_uv_count(mut self, count: u8) -> Self {
        self.data.additional_uv_count = count.min(4);
        self
    }

    #[must_use]
    pub fn rigid_body(mut self, body: RigidBodyDesc) -> Self {
        self.data.rigid_bodies.push(body);
        self
    }

    #[must_use]
    pub fn joint(mut self, joint: JointDesc) -> Self {
        self.data.joints.push(joint);
        self
    }

    /// Validates every cross reference and freezes the descriptor.
    pub fn build(self) -> Result<Arc<ModelData>> {
        let mut data = self.data;

        validate_bones(&data, self.strict_deform_order)?;
        validate_morphs(&data)?;
        validate_vertices(&data)?;
        validate_physics(&data)?;

        let mut bone_lookup = FxHashMap::default();
        for (i, bone) in data.bones.iter().enumerate() {
            bone_lookup.entry(bone.name.clone()).or_insert(i);
        }
        let mut morph_lookup = FxHashMap::default();
        for (i, morph) in data.morphs.iter().enumerate() {
            morph_lookup.entry(morph.name.clone()).or_insert(i);
        }
        data.bone_lookup = bone_lookup;
        data.morph_lookup = morph_lookup;

        log::debug!(
            "Model '{}' built: {} bones, {} morphs, {} vertices, {} rigid bodies",
            data.name,
            data.bones.len(),
            data.morphs.len(),
            data.vertices.len(),
            data.rigid_bodies.len()
        );

        Ok(Arc::new(data))
    }
}

fn check_index(context: &str, index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(MarionetteError::out_of_bounds(context, index))
    }
}

fn validate_bones(data: &ModelData, strict: bool) -> Result<()> {
    let count = data.bones.len();
    for (i, bone) in data.bones.iter().enumerate() {
        if let Some(parent) = bone.parent {
            check_index(&format!("parent of bone {i}"), parent, count)?;
            if parent == i {
                return Err(MarionetteError::DeformOrderViolation { bone: i, parent });
            }

            // Parent must sort no later than the child in deform order.
            let p = &data.bones[parent];
            let parent_key = (p.deform_after_physics(), p.deform_layer, parent);
            let child_key = (bone.deform_after_physics(), bone.deform_layer, i);
            if parent_key > child_key {
                if strict {
                    return Err(MarionetteError::DeformOrderViolation { bone: i, parent });
                }
                log::warn!(
                    "Bone {i} ('{}') deforms before its parent {parent}; it will read a stale parent transform",
                    bone.name
                );
            }
        }

        if let Some(inherit) = bone.inherit {
            check_index(&format!("inherit parent of bone {i}"), inherit.parent, count)?;
        }

        if let BoneTail::Bone(tail) = bone.tail {
            check_index(&format!("tail of bone {i}"), tail, count)?;
        }

        match (&bone.ik, bone.is_ik()) {
            (Some(chain), true) => {
                check_index(&format!("IK effector of bone {i}"), chain.effector, count)?;
                for link in &chain.links {
                    check_index(&format!("IK link of bone {i}"), link.bone, count)?;
                }
                if chain.links.is_empty() {
                    log::warn!("IK bone {i} ('{}') has no links", bone.name);
                }
            }
            (None, true) => {
                return Err(MarionetteError::InvalidIk {
                    bone: i,
                    reason: "IK flag set without a chain".into(),
                });
            }
            (Some(_), false) => {
                return Err(MarionetteError::InvalidIk {
                    bone: i,
                    reason: "chain present without the IK flag".into(),
                });
            }
            (None, false) => {}
        }
    }
    Ok(())
}

fn validate_morphs(data: &ModelData) -> Result<()> {
    let (bones, morphs, vertices, materials) = (
        data.bones.len(),
        data.morphs.len(),
        data.vertices.len(),
        data.materials.len(),
    );

    for (i, morph) in data.morphs.iter().enumerate() {
        let ctx = || format!("morph {i} ('{}')", morph.name);
        match &morph.kind {
            MorphKind::Group(offsets) => {
                for o in offsets {
                    check_index(&ctx(), o.morph, morphs)?;
                    if o.morph == i {
                        return Err(MarionetteError::InvalidMorph {
                            index: i,
                            reason: "group morph references itself".into(),
                        });
                    }
                }
            }
            MorphKind::Vertex(offsets) => {
                for o in offsets {
                    check_index(&ctx(), o.vertex, vertices)?;
                }
            }
            MorphKind::Bone(offsets) => {
                for o in offsets {
                    check_index(&ctx(), o.bone, bones)?;
                }
            }
            MorphKind::Uv(offsets) => {
                for o in offsets {
                    check_index(&ctx(), o.vertex, vertices)?;
                }
            }
            MorphKind::AdditionalUv { channel, offsets } => {
                if *channel >= 4 {
                    return Err(MarionetteError::InvalidMorph {
                        index: i,
                        reason: format!("additional UV channel {channel} out of range"),
                    });
                }
                for o in offsets {
                    check_index(&ctx(), o.vertex, vertices)?;
                }
            }
            MorphKind::Material(offsets) => {
                for o in offsets {
                    if let Some(m) = o.material {
                        check_index(&ctx(), m, materials)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn validate_vertices(data: &ModelData) -> Result<()> {
    let bones = data.bones.len();
    for (i, vertex) in data.vertices.iter().enumerate() {
        for bone in vertex.skinning.bones() {
            check_index(&format!("skinning bone of vertex {i}"), bone, bones)?;
        }
    }
    Ok(())
}

fn validate_physics(data: &ModelData) -> Result<()> {
    let bodies = data.rigid_bodies.len();
    for (i, body) in data.rigid_bodies.iter().enumerate() {
        match body.bone {
            Some(bone) => check_index(&format!("bone of rigid body {i}"), bone, data.bones.len())?,
            None => log::warn!("Rigid body {i} ('{}') is not attached to a bone", body.name),
        }
    }
    for (i, joint) in data.joints.iter().enumerate() {
        check_index(&format!("body A of joint {i}"), joint.body_a, bodies)?;
        check_index(&format!("body B of joint {i}"), joint.body_b, bodies)?;
    }
    Ok(())
}
