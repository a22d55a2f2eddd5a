use glam::{Vec3, Vec4};

/// Base material values that morphs can modulate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    pub name: String,
    pub diffuse: Vec4,
    pub specular: Vec3,
    pub specular_power: f32,
    pub ambient: Vec3,
    pub edge_color: Vec4,
    pub edge_size: f32,
}

impl Material {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse: Vec4::ONE,
            specular: Vec3::ZERO,
            specular_power: 1.0,
            ambient: Vec3::splat(0.5),
            edge_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            edge_size: 1.0,
        }
    }
}

/// A bundle of material factors, used both as a morph payload and as the
/// per-frame add/multiply accumulators.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterialFactors {
    pub diffuse: Vec4,
    pub specular: Vec3,
    pub specular_power: f32,
    pub ambient: Vec3,
    pub edge_color: Vec4,
    pub edge_size: f32,
    pub texture: Vec4,
    pub sphere_texture: Vec4,
    pub toon_texture: Vec4,
}

impl MaterialFactors {
    /// Neutral element for additive accumulation.
    pub const ZERO: Self = Self::splat(0.0);
    /// Neutral element for multiplicative accumulation.
    pub const ONE: Self = Self::splat(1.0);

    #[must_use]
    pub const fn splat(v: f32) -> Self {
        Self {
            diffuse: Vec4::splat(v),
            specular: Vec3::splat(v),
            specular_power: v,
            ambient: Vec3::splat(v),
            edge_color: Vec4::splat(v),
            edge_size: v,
            texture: Vec4::splat(v),
            sphere_texture: Vec4::splat(v),
            toon_texture: Vec4::splat(v),
        }
    }

    /// `self += ratio * other`
    pub fn accumulate_add(&mut self, other: &Self, ratio: f32) {
        self.diffuse += other.diffuse * ratio;
        self.specular += other.specular * ratio;
        self.specular_power += other.specular_power * ratio;
        self.ambient += other.ambient * ratio;
        self.edge_color += other.edge_color * ratio;
        self.edge_size += other.edge_size * ratio;
        self.texture += other.texture * ratio;
        self.sphere_texture += other.sphere_texture * ratio;
        self.toon_texture += other.toon_texture * ratio;
    }

    /// `self *= mix(1, other, ratio)`
    pub fn accumulate_mul(&mut self, other: &Self, ratio: f32) {
        self.diffuse *= Vec4::ONE.lerp(other.diffuse, ratio);
        self.specular *= Vec3::ONE.lerp(other.specular, ratio);
        self.specular_power *= 1.0 + (other.specular_power - 1.0) * ratio;
        self.ambient *= Vec3::ONE.lerp(other.ambient, ratio);
        self.edge_color *= Vec4::ONE.lerp(other.edge_color, ratio);
        self.edge_size *= 1.0 + (other.edge_size - 1.0) * ratio;
        self.texture *= Vec4::ONE.lerp(other.texture, ratio);
        self.sphere_texture *= Vec4::ONE.lerp(other.sphere_texture, ratio);
        self.toon_texture *= Vec4::ONE.lerp(other.toon_texture, ratio);
    }
}

impl Default for MaterialFactors {
    fn default() -> Self {
        Self::ZERO
    }
}
