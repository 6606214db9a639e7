use glam::Vec3;

use crate::viewer::params::ShadingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceModel {
    /// Base color only, no lighting.
    Unlit,
    /// Diffuse only.
    Lambert,
    /// Diffuse plus Blinn-Phong specular.
    Phong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapBinding {
    None,
    /// The UV grid color map.
    Color,
    /// The environment cube map, used for reflections.
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Front,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub model: SurfaceModel,
    pub color: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    pub flat_shading: bool,
    pub wireframe: bool,
    pub map: MapBinding,
    pub side: Side,
}

const PHONG_SPECULAR: Vec3 = Vec3::splat(0x11 as f32 / 255.0);
const PHONG_SHININESS: f32 = 30.0;

impl Material {
    fn unlit() -> Self {
        Self {
            model: SurfaceModel::Unlit,
            color: Vec3::ONE,
            specular: Vec3::ZERO,
            shininess: 0.0,
            flat_shading: false,
            wireframe: false,
            map: MapBinding::None,
            side: Side::Front,
        }
    }

    fn phong() -> Self {
        Self {
            model: SurfaceModel::Phong,
            specular: PHONG_SPECULAR,
            shininess: PHONG_SHININESS,
            side: Side::Double,
            ..Self::unlit()
        }
    }
}

/// One immutable material per shading mode, built once.
pub struct MaterialRegistry {
    materials: [Material; 6],
}

impl MaterialRegistry {
    pub fn new() -> Self {
        let materials = ShadingMode::ALL.map(|mode| match mode {
            ShadingMode::Wireframe => Material {
                wireframe: true,
                ..Material::unlit()
            },
            ShadingMode::Flat => Material {
                specular: Vec3::ZERO,
                flat_shading: true,
                ..Material::phong()
            },
            ShadingMode::Smooth => Material {
                model: SurfaceModel::Lambert,
                side: Side::Double,
                ..Material::unlit()
            },
            ShadingMode::Glossy => Material::phong(),
            ShadingMode::Textured => Material {
                map: MapBinding::Color,
                ..Material::phong()
            },
            ShadingMode::Reflective => Material {
                map: MapBinding::Environment,
                ..Material::phong()
            },
        });

        Self { materials }
    }

    pub fn get(&self, mode: ShadingMode) -> &Material {
        &self.materials[mode.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShadingMode, &Material)> {
        ShadingMode::ALL.into_iter().zip(self.materials.iter())
    }
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}
