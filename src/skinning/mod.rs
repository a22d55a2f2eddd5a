//! CPU Skinning
//!
//! [`DeformBuffer`] holds the render-side state of one model instance: the
//! deformed vertex stream, additional UV channels and the morph-resolved
//! material values. Each frame:
//!
//! 1. [`DeformBuffer::apply_morphs`] resets everything to the rest state and
//!    applies vertex, UV, additional-UV and material morphs using the pose's
//!    morph ratios (group morphs must already have been folded in by the
//!    solver).
//! 2. [`DeformBuffer::skin`] deforms the morphed rest positions with the
//!    pose's final bone transforms.
//!
//! Skinning is a per-vertex map into disjoint output slots. With the
//! `parallel` feature it fans out over rayon once the vertex count reaches
//! the configured threshold.

pub mod deform;

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::math::Transform;
use crate::model::{MaterialFactors, MaterialOp, ModelData, MorphKind};
use crate::pose::ModelPose;
use crate::settings::SolverSettings;

pub use deform::{BonePalette, blend_dual_quat, skin_vertex};

/// One vertex of the deformed stream, laid out for direct GPU upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct DeformedVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

/// Morph-resolved material values: `add + mul * base` for the base colors,
/// plus the raw accumulators for texture factors, which have no base value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialState {
    pub diffuse: Vec4,
    pub specular: Vec3,
    pub specular_power: f32,
    pub ambient: Vec3,
    pub edge_color: Vec4,
    pub edge_size: f32,
    pub add: MaterialFactors,
    pub mul: MaterialFactors,
}

/// Deformed geometry and material state of one model instance.
#[derive(Debug, Clone)]
pub struct DeformBuffer {
    data: Arc<ModelData>,

    morphed_positions: Vec<Vec3>,
    vertices: Vec<DeformedVertex>,
    additional_uvs: Vec<Vec<Vec4>>,
    materials: Vec<MaterialState>,

    bone_transforms: Vec<Transform>,
    bone_matrices: Vec<Mat4>,
}

impl DeformBuffer {
    #[must_use]
    pub fn new(data: &Arc<ModelData>) -> Self {
        let mut buffer = Self {
            data: Arc::clone(data),
            morphed_positions: Vec::with_capacity(data.vertices.len()),
            vertices: Vec::with_capacity(data.vertices.len()),
            additional_uvs: vec![Vec::with_capacity(data.vertices.len()); usize::from(data.additional_uv_count)],
            materials: Vec::with_capacity(data.materials.len()),
            bone_transforms: Vec::with_capacity(data.bone_count()),
            bone_matrices: Vec::with_capacity(data.bone_count()),
        };
        buffer.reset();
        buffer
    }

    #[inline]
    pub fn model(&self) -> &Arc<ModelData> {
        &self.data
    }

    /// Restores rest positions, normals and UVs, and neutral material
    /// accumulators.
    pub fn reset(&mut self) {
        let rest = &self.data.vertices;

        self.morphed_positions.clear();
        self.morphed_positions.extend(rest.iter().map(|v| v.position));

        self.vertices.clear();
        self.vertices.extend(rest.iter().map(|v| DeformedVertex {
            position: v.position,
            normal: v.normal,
            uv: v.uv,
        }));

        for (channel, uvs) in self.additional_uvs.iter_mut().enumerate() {
            uvs.clear();
            uvs.extend(rest.iter().map(|v| v.additional_uvs[channel]));
        }

        self.materials.clear();
        self.materials.extend(self.data.materials.iter().map(|m| MaterialState {
            diffuse: m.diffuse,
            specular: m.specular,
            specular_power: m.specular_power,
            ambient: m.ambient,
            edge_color: m.edge_color,
            edge_size: m.edge_size,
            add: MaterialFactors::ZERO,
            mul: MaterialFactors::ONE,
        }));
    }

    /// Resets to rest and applies every render-side morph at the pose's
    /// current ratios. Group and bone morphs are skipped here.
    pub fn apply_morphs(&mut self, pose: &ModelPose) {
        self.reset();

        let data = Arc::clone(&self.data);
        for (i, morph) in data.morphs.iter().enumerate() {
            let ratio = pose.morph_ratio(i);
            if ratio == 0.0 {
                continue;
            }
            match &morph.kind {
                MorphKind::Group(_) | MorphKind::Bone(_) => {}
                MorphKind::Vertex(offsets) => {
                    for o in offsets {
                        self.morphed_positions[o.vertex] += o.offset * ratio;
                    }
                }
                MorphKind::Uv(offsets) => {
                    for o in offsets {
                        self.vertices[o.vertex].uv += o.offset.truncate().truncate() * ratio;
                    }
                }
                MorphKind::AdditionalUv { channel, offsets } => {
                    // Channels beyond the model's declared count have no storage.
                    let Some(uvs) = self.additional_uvs.get_mut(usize::from(*channel)) else {
                        continue;
                    };
                    for o in offsets {
                        uvs[o.vertex] += o.offset * ratio;
                    }
                }
                MorphKind::Material(offsets) => {
                    for o in offsets {
                        let targets = match o.material {
                            Some(m) => &mut self.materials[m..=m],
                            None => &mut self.materials[..],
                        };
                        for state in targets {
                            match o.op {
                                MaterialOp::Multiply => state.mul.accumulate_mul(&o.factors, ratio),
                                MaterialOp::Add => state.add.accumulate_add(&o.factors, ratio),
                            }
                        }
                    }
                }
            }
        }

        self.resolve_materials();
    }

    /// `final = add + mul * base`, once per frame.
    fn resolve_materials(&mut self) {
        for (state, base) in self.materials.iter_mut().zip(&self.data.materials) {
            let (add, mul) = (&state.add, &state.mul);
            state.diffuse = add.diffuse + mul.diffuse * base.diffuse;
            state.specular = add.specular + mul.specular * base.specular;
            state.specular_power = add.specular_power + mul.specular_power * base.specular_power;
            state.ambient = add.ambient + mul.ambient * base.ambient;
            state.edge_color = add.edge_color + mul.edge_color * base.edge_color;
            state.edge_size = add.edge_size + mul.edge_size * base.edge_size;
        }
    }

    /// Deforms the morphed rest positions with the pose's final bone
    /// transforms. The pose must have been solved.
    pub fn skin(&mut self, pose: &ModelPose, settings: &SolverSettings) {
        self.bone_transforms.clear();
        self.bone_transforms
            .extend((0..pose.bone_count()).map(|i| pose.final_bone_transform(i)));
        pose.final_bone_matrices(&mut self.bone_matrices);

        let palette = BonePalette {
            transforms: &self.bone_transforms,
            matrices: &self.bone_matrices,
        };
        let rest = &self.data.vertices;
        let positions = &self.morphed_positions;

        for_each_vertex(
            &mut self.vertices,
            settings.parallel_skinning_threshold,
            |(i, out): (usize, &mut DeformedVertex)| {
                let (position, normal) = skin_vertex(&rest[i].skinning, positions[i], rest[i].normal, palette);
                out.position = position;
                out.normal = normal;
            },
        );
    }

    /// Morphs followed by skinning.
    pub fn update(&mut self, pose: &ModelPose, settings: &SolverSettings) {
        self.apply_morphs(pose);
        self.skin(pose, settings);
    }

    // ========================================================================
    // Output
    // ========================================================================

    #[inline]
    pub fn vertices(&self) -> &[DeformedVertex] {
        &self.vertices
    }

    /// The vertex stream as raw bytes.
    #[inline]
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Rest positions plus vertex-morph offsets, before skinning.
    #[inline]
    pub fn morphed_positions(&self) -> &[Vec3] {
        &self.morphed_positions
    }

    /// Additional UV channel `channel`; empty if the model does not use it.
    pub fn additional_uvs(&self, channel: usize) -> &[Vec4] {
        self.additional_uvs.get(channel).map_or(&[][..], Vec::as_slice)
    }

    #[inline]
    pub fn materials(&self) -> &[MaterialState] {
        &self.materials
    }

    #[inline]
    pub fn material(&self, index: usize) -> &MaterialState {
        &self.materials[index]
    }
}

#[cfg(feature = "parallel")]
fn for_each_vertex<F>(out: &mut [DeformedVertex], threshold: usize, f: F)
where
    F: Fn((usize, &mut DeformedVertex)) + Sync + Send,
{
    use rayon::prelude::*;

    if out.len() >= threshold {
        out.par_iter_mut().enumerate().for_each(f);
    } else {
        out.iter_mut().enumerate().for_each(f);
    }
}

#[cfg(not(feature = "parallel"))]
fn for_each_vertex<F>(out: &mut [DeformedVertex], _threshold: usize, f: F)
where
    F: Fn((usize, &mut DeformedVertex)),
{
    out.iter_mut().enumerate().for_each(f);
}
