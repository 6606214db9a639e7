use glam::Vec3;

use crate::renderer::camera::OrbitCamera;
use crate::viewer::params::ShadingMode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub intensity: f32,
    /// Points from the scene toward the light.
    pub direction: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    Color(Vec3),
    EnvironmentMap,
}

/// The teapot currently in the scene, wrapping whatever the backend allocated for it.
#[derive(Debug)]
pub struct Mesh<M> {
    pub shading: ShadingMode,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub resource: M,
}

#[derive(Debug)]
pub struct Scene<M> {
    pub ambient: AmbientLight,
    pub light: DirectionalLight,
    pub camera: OrbitCamera,
    flat_color: Vec3,
    background: Background,
    mesh: Option<Mesh<M>>,
}

impl<M> Scene<M> {
    pub fn new(
        ambient: AmbientLight,
        light: DirectionalLight,
        camera: OrbitCamera,
        flat_color: Vec3,
    ) -> Self {
        Self {
            ambient,
            light,
            camera,
            flat_color,
            background: Background::Color(flat_color),
            mesh: None,
        }
    }

    pub fn background(&self) -> Background {
        self.background
    }

    /// The environment map backs only the reflective mode; every other mode
    /// gets the flat color back.
    pub fn derive_background(&mut self, shading: ShadingMode) {
        self.background = match shading {
            ShadingMode::Reflective => Background::EnvironmentMap,
            _ => Background::Color(self.flat_color),
        };
    }

    pub fn mesh(&self) -> Option<&Mesh<M>> {
        self.mesh.as_ref()
    }

    pub fn detach_mesh(&mut self) -> Option<Mesh<M>> {
        self.mesh.take()
    }

    /// Callers detach the previous mesh first.
    pub fn attach_mesh(&mut self, mesh: Mesh<M>) {
        debug_assert!(self.mesh.is_none(), "a teapot is already attached");
        self.mesh = Some(mesh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene<u32> {
        Scene::new(
            AmbientLight { color: Vec3::splat(0.2) },
            DirectionalLight {
                color: Vec3::ONE,
                intensity: 1.0,
                direction: Vec3::Y,
            },
            OrbitCamera::default(),
            Vec3::splat(0.5),
        )
    }

    #[test]
    fn background_follows_shading() {
        let mut scene = scene();
        assert_eq!(scene.background(), Background::Color(Vec3::splat(0.5)));

        scene.derive_background(ShadingMode::Reflective);
        assert_eq!(scene.background(), Background::EnvironmentMap);

        scene.derive_background(ShadingMode::Textured);
        assert_eq!(scene.background(), Background::Color(Vec3::splat(0.5)));
    }

    #[test]
    fn detach_returns_the_owned_mesh() {
        let mut scene = scene();
        scene.attach_mesh(Mesh {
            shading: ShadingMode::Glossy,
            vertex_count: 3,
            triangle_count: 1,
            resource: 7,
        });
        assert_eq!(scene.mesh().map(|m| m.resource), Some(7));
        assert_eq!(scene.detach_mesh().map(|m| m.resource), Some(7));
        assert!(scene.mesh().is_none());
    }
}
