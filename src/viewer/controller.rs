use glam::Vec3;

use crate::config::Config;
use crate::error::Result;
use crate::geometry::{TriangleMesh, generate_teapot};
use crate::renderer::camera::OrbitCamera;
use crate::viewer::material::{Material, MaterialRegistry};
use crate::viewer::params::{ParameterChanged, ParameterRecord, ShadingMode};
use crate::viewer::scene::{AmbientLight, DirectionalLight, Mesh, Scene};

/// What the controller needs from whatever actually draws the scene.
pub trait RenderBackend {
    type Mesh;

    fn upload_mesh(
        &mut self,
        geometry: &TriangleMesh,
        shading: ShadingMode,
        material: &Material,
    ) -> Result<Self::Mesh>;

    fn release_mesh(&mut self, mesh: Self::Mesh);

    fn resize(&mut self, width: u32, height: u32);

    fn draw(&mut self, scene: &Scene<Self::Mesh>) -> Result<()>;
}

/// Owns the parameters, the last applied snapshot and the scene.
///
/// The mesh is rebuilt only when the live parameters differ from the snapshot;
/// camera moves and resizes only redraw.
pub struct ViewerState<M> {
    params: ParameterRecord,
    applied: Option<ParameterRecord>,
    materials: MaterialRegistry,
    scene: Scene<M>,
    teapot_size: f32,
    rebuilds: u64,
}

impl<M> ViewerState<M> {
    pub fn new(params: ParameterRecord, scene: Scene<M>, teapot_size: f32) -> Self {
        Self {
            params,
            applied: None,
            materials: MaterialRegistry::new(),
            scene,
            teapot_size,
            rebuilds: 0,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let params = config.teapot.parameters()?;
        let scene_config = &config.scene;

        let mut camera = OrbitCamera::looking_at(Vec3::from(scene_config.camera_position), Vec3::ZERO);
        camera.fov = scene_config.fov.to_radians();
        camera.set_aspect(config.window.width as f32, config.window.height as f32);

        let scene = Scene::new(
            AmbientLight {
                color: rgb_to_linear(scene_config.ambient),
            },
            DirectionalLight {
                color: rgb_to_linear(scene_config.light_color),
                intensity: scene_config.light_intensity,
                direction: Vec3::from(scene_config.light_position).normalize_or(Vec3::Y),
            },
            camera,
            rgb_to_linear(scene_config.background),
        );

        Ok(Self::new(params, scene, config.teapot.size))
    }

    pub fn params(&self) -> &ParameterRecord {
        &self.params
    }

    pub fn scene(&self) -> &Scene<M> {
        &self.scene
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.scene.camera
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub fn needs_rebuild(&self) -> bool {
        self.applied != Some(self.params)
    }

    /// Applies one panel edit and redraws right away.
    pub fn dispatch<B>(&mut self, change: ParameterChanged, backend: &mut B) -> Result<()>
    where
        B: RenderBackend<Mesh = M>,
    {
        tracing::debug!(?change, "parameter changed");
        self.params.apply(change);
        self.evaluate_and_render(backend)
    }

    pub fn evaluate_and_render<B>(&mut self, backend: &mut B) -> Result<()>
    where
        B: RenderBackend<Mesh = M>,
    {
        if self.needs_rebuild() {
            self.rebuild_mesh(backend)?;
            self.applied = Some(self.params);
        }

        self.scene.derive_background(self.params.shading);
        backend.draw(&self.scene)
    }

    /// Releases the current mesh before building its replacement, so at most
    /// one teapot's buffers are alive at a time. If the build fails the scene
    /// is left empty and the snapshot untouched, so the next evaluation retries.
    pub fn rebuild_mesh<B>(&mut self, backend: &mut B) -> Result<()>
    where
        B: RenderBackend<Mesh = M>,
    {
        if let Some(old) = self.scene.detach_mesh() {
            backend.release_mesh(old.resource);
        }

        let geometry = generate_teapot(self.teapot_size, &self.params.teapot_options());
        if geometry.is_empty() {
            tracing::debug!("every teapot part is excluded, uploading an empty mesh");
        }
        let shading = self.params.shading;
        let material = self.materials.get(shading);
        let resource = backend.upload_mesh(&geometry, shading, material)?;

        self.scene.attach_mesh(Mesh {
            shading,
            vertex_count: geometry.vertex_count(),
            triangle_count: geometry.triangle_count(),
            resource,
        });
        self.rebuilds += 1;

        tracing::debug!(
            tessellation = self.params.tessellation.get(),
            %shading,
            vertices = geometry.vertex_count(),
            triangles = geometry.triangle_count(),
            "rebuilt teapot"
        );
        Ok(())
    }

    /// New viewport size: camera projection and surface follow, the mesh stays.
    pub fn resize<B>(&mut self, width: u32, height: u32, backend: &mut B) -> Result<()>
    where
        B: RenderBackend<Mesh = M>,
    {
        self.apply_viewport(width, height, backend);
        self.evaluate_and_render(backend)
    }

    fn apply_viewport<B>(&mut self, width: u32, height: u32, backend: &mut B)
    where
        B: RenderBackend<Mesh = M>,
    {
        backend.resize(width, height);
        self.scene.camera.set_aspect(width as f32, height as f32);
    }

    /// One redraw request: an optional new viewport plus the panel edits
    /// collected since the last one.
    ///
    /// Edits are dispatched one by one, each drawing once. Without edits the
    /// scene is drawn exactly once, resized or not. If a rebuild fails, the
    /// edits after it are still recorded so the next redraw builds them.
    pub fn redraw<B>(
        &mut self,
        viewport: Option<(u32, u32)>,
        changes: &[ParameterChanged],
        backend: &mut B,
    ) -> Result<()>
    where
        B: RenderBackend<Mesh = M>,
    {
        match (viewport, changes.is_empty()) {
            (Some((width, height)), true) => return self.resize(width, height, backend),
            (Some((width, height)), false) => self.apply_viewport(width, height, backend),
            (None, true) => return self.evaluate_and_render(backend),
            (None, false) => {}
        }

        let mut pending = changes.iter().copied();
        while let Some(change) = pending.next() {
            if let Err(err) = self.dispatch(change, backend) {
                pending.for_each(|rest| self.params.apply(rest));
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn dispose<B>(mut self, backend: &mut B)
    where
        B: RenderBackend<Mesh = M>,
    {
        if let Some(mesh) = self.scene.detach_mesh() {
            backend.release_mesh(mesh.resource);
        }
        tracing::info!(rebuilds = self.rebuilds, "viewer disposed");
    }
}

pub fn rgb_to_linear(hex: u32) -> Vec3 {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    Vec3::new(channel(16), channel(8), channel(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewerError;
    use crate::viewer::params::TessellationLevel;
    use crate::viewer::scene::Background;
    use glam::Vec2;

    const FLAT: Vec3 = Vec3::new(0.4, 0.4, 0.4);

    #[derive(Debug, Clone, Copy)]
    struct Uploaded {
        id: u32,
        shading: ShadingMode,
        wireframe: bool,
        vertex_count: usize,
    }

    #[derive(Debug, Clone, Copy)]
    struct Drawn {
        mesh: Option<u32>,
        background: Background,
        aspect: f32,
    }

    #[derive(Default)]
    struct RecordingBackend {
        next_id: u32,
        uploads: Vec<Uploaded>,
        released: Vec<u32>,
        draws: Vec<Drawn>,
        viewport: Option<(u32, u32)>,
        fail_uploads: bool,
    }

    impl RenderBackend for RecordingBackend {
        type Mesh = u32;

        fn upload_mesh(
            &mut self,
            geometry: &TriangleMesh,
            shading: ShadingMode,
            material: &Material,
        ) -> Result<u32> {
            if self.fail_uploads {
                return Err(ViewerError::MeshUpload("out of memory".into()));
            }
            self.next_id += 1;
            self.uploads.push(Uploaded {
                id: self.next_id,
                shading,
                wireframe: material.wireframe,
                vertex_count: geometry.vertex_count(),
            });
            Ok(self.next_id)
        }

        fn release_mesh(&mut self, mesh: u32) {
            self.released.push(mesh);
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.viewport = Some((width, height));
        }

        fn draw(&mut self, scene: &Scene<u32>) -> Result<()> {
            self.draws.push(Drawn {
                mesh: scene.mesh().map(|m| m.resource),
                background: scene.background(),
                aspect: scene.camera.aspect,
            });
            Ok(())
        }
    }

    fn viewer(params: ParameterRecord) -> ViewerState<u32> {
        let scene = Scene::new(
            AmbientLight { color: Vec3::splat(0.03) },
            DirectionalLight {
                color: Vec3::ONE,
                intensity: 1.0,
                direction: Vec3::new(0.32, 0.39, 0.7).normalize(),
            },
            OrbitCamera::default(),
            FLAT,
        );
        // small size keeps the tests quick; geometry scales linearly
        ViewerState::new(params, scene, 1.0)
    }

    fn low_tess() -> ParameterRecord {
        ParameterRecord {
            tessellation: TessellationLevel::new(4),
            ..ParameterRecord::default()
        }
    }

    #[test]
    fn first_evaluation_builds_once() {
        let mut viewer = viewer(low_tess());
        let mut backend = RecordingBackend::default();

        viewer.evaluate_and_render(&mut backend).unwrap();

        assert_eq!(viewer.rebuild_count(), 1);
        assert_eq!(backend.uploads.len(), 1);
        assert!(backend.released.is_empty());
        assert_eq!(backend.draws.len(), 1);
        assert_eq!(backend.draws[0].mesh, Some(1));
        assert!(!viewer.needs_rebuild());
    }

    #[test]
    fn unchanged_parameters_cause_no_churn() {
        let mut viewer = viewer(low_tess());
        let mut backend = RecordingBackend::default();
        viewer.evaluate_and_render(&mut backend).unwrap();

        for _ in 0..5 {
            viewer.evaluate_and_render(&mut backend).unwrap();
        }

        assert_eq!(viewer.rebuild_count(), 1);
        assert_eq!(backend.uploads.len(), 1);
        assert!(backend.released.is_empty());
        assert_eq!(backend.draws.len(), 6);
        assert!(backend.draws.iter().all(|d| d.mesh == Some(1)));
    }

    #[test]
    fn setting_a_field_to_its_current_value_does_not_rebuild() {
        let mut viewer = viewer(low_tess());
        let mut backend = RecordingBackend::default();
        viewer.evaluate_and_render(&mut backend).unwrap();

        viewer.dispatch(ParameterChanged::Lid(true), &mut backend).unwrap();
        viewer
            .dispatch(ParameterChanged::Shading(ShadingMode::Glossy), &mut backend)
            .unwrap();

        assert_eq!(viewer.rebuild_count(), 1);
        assert_eq!(backend.draws.len(), 3);
    }

    #[test]
    fn each_distinct_edit_rebuilds_and_releases_all_but_the_last() {
        let edits = [
            ParameterChanged::Tessellation(TessellationLevel::new(2)),
            ParameterChanged::Lid(false),
            ParameterChanged::Body(false),
            ParameterChanged::FitLid(true),
            ParameterChanged::OriginalBasis(true),
            ParameterChanged::Shading(ShadingMode::Flat),
            ParameterChanged::Shading(ShadingMode::Textured),
            ParameterChanged::Bottom(false),
        ];
        let mut viewer = viewer(low_tess());
        let mut backend = RecordingBackend::default();

        for edit in edits {
            viewer.dispatch(edit, &mut backend).unwrap();
        }

        let n = edits.len();
        assert_eq!(viewer.rebuild_count(), n as u64);
        assert_eq!(backend.uploads.len(), n);
        assert_eq!(backend.released.len(), n - 1);
        let expected: Vec<u32> = (1..n as u32).collect();
        assert_eq!(backend.released, expected);
        assert_eq!(viewer.scene().mesh().map(|m| m.resource), Some(n as u32));
    }

    #[test]
    fn every_change_rebuilds_immediately() {
        let mut viewer = viewer(low_tess());
        let mut backend = RecordingBackend::default();
        viewer.evaluate_and_render(&mut backend).unwrap();

        viewer.dispatch(ParameterChanged::Lid(false), &mut backend).unwrap();
        viewer.dispatch(ParameterChanged::Lid(true), &mut backend).unwrap();

        // back to the original record, but each edit was applied on its own
        assert_eq!(viewer.rebuild_count(), 3);
        assert_eq!(backend.released, vec![1, 2]);
    }

    #[test]
    fn old_mesh_is_released_before_the_new_one_is_built() {
        let mut viewer = viewer(low_tess());
        let mut backend = RecordingBackend::default();
        viewer.evaluate_and_render(&mut backend).unwrap();

        backend.fail_uploads = true;
        let err = viewer.dispatch(ParameterChanged::Body(false), &mut backend);
        assert!(matches!(err, Err(ViewerError::MeshUpload(_))));
        assert_eq!(backend.released, vec![1]);
        assert!(viewer.scene().mesh().is_none());
        assert!(viewer.needs_rebuild());

        backend.fail_uploads = false;
        viewer.evaluate_and_render(&mut backend).unwrap();
        assert_eq!(viewer.rebuild_count(), 2);
        assert_eq!(viewer.scene().mesh().map(|m| m.resource), Some(2));
        assert!(!viewer.needs_rebuild());
    }

    #[test]
    fn camera_moves_never_rebuild() {
        let mut viewer = viewer(low_tess());
        let mut backend = RecordingBackend::default();
        viewer.evaluate_and_render(&mut backend).unwrap();

        viewer.camera_mut().rotate(Vec2::new(40.0, 12.0));
        viewer.evaluate_and_render(&mut backend).unwrap();
        viewer.camera_mut().pan(Vec2::new(-8.0, 3.0));
        viewer.evaluate_and_render(&mut backend).unwrap();
        viewer.camera_mut().zoom(2.0);
        viewer.evaluate_and_render(&mut backend).unwrap();

        assert_eq!(viewer.rebuild_count(), 1);
        assert!(backend.released.is_empty());
        assert_eq!(backend.draws.len(), 4);
    }

    #[test]
    fn resize_updates_camera_and_viewport_only() {
        let mut viewer = viewer(low_tess());
        let mut backend = RecordingBackend::default();
        viewer.evaluate_and_render(&mut backend).unwrap();

        viewer.resize(1200, 600, &mut backend).unwrap();

        assert_eq!(backend.viewport, Some((1200, 600)));
        assert_eq!(viewer.scene().camera.aspect, 2.0);
        assert_eq!(backend.draws.last().map(|d| d.aspect), Some(2.0));
        assert_eq!(viewer.rebuild_count(), 1);
        assert!(backend.released.is_empty());
    }

    #[test]
    fn reflective_background_is_set_and_cleared() {
        let mut viewer = viewer(low_tess());
        let mut backend = RecordingBackend::default();
        viewer.evaluate_and_render(&mut backend).unwrap();
        assert_eq!(backend.draws[0].background, Background::Color(FLAT));

        viewer
            .dispatch(ParameterChanged::Shading(ShadingMode::Reflective), &mut backend)
            .unwrap();
        assert_eq!(backend.draws[1].background, Background::EnvironmentMap);

        viewer
            .dispatch(ParameterChanged::Shading(ShadingMode::Smooth), &mut backend)
            .unwrap();
        assert_eq!(backend.draws[2].background, Background::Color(FLAT));
    }

    #[test]
    fn switching_defaults_to_wireframe_swaps_only_the_material() {
        let mut viewer = viewer(ParameterRecord::default());
        let mut backend = RecordingBackend::default();
        viewer.evaluate_and_render(&mut backend).unwrap();
        let before = backend.uploads[0];
        assert_eq!(before.shading, ShadingMode::Glossy);

        viewer
            .dispatch(ParameterChanged::Shading(ShadingMode::Wireframe), &mut backend)
            .unwrap();

        assert_eq!(viewer.rebuild_count(), 2);
        let after = backend.uploads[1];
        assert_eq!(after.vertex_count, before.vertex_count);
        assert_eq!(after.shading, ShadingMode::Wireframe);
        assert!(after.wireframe && !before.wireframe);
        assert_eq!(
            viewer.scene().mesh().map(|m| m.shading),
            Some(ShadingMode::Wireframe)
        );
        assert_eq!(backend.draws[1].background, Background::Color(FLAT));
    }

    #[test]
    fn empty_teapot_is_still_a_mesh() {
        let mut viewer = viewer(low_tess());
        let mut backend = RecordingBackend::default();
        for edit in [
            ParameterChanged::Bottom(false),
            ParameterChanged::Lid(false),
            ParameterChanged::Body(false),
        ] {
            viewer.dispatch(edit, &mut backend).unwrap();
        }

        let mesh = viewer.scene().mesh().unwrap();
        assert_eq!(mesh.vertex_count, 0);
        assert_eq!(mesh.triangle_count, 0);
    }

    #[test]
    fn dispose_releases_the_last_mesh() {
        let mut viewer = viewer(low_tess());
        let mut backend = RecordingBackend::default();
        viewer.evaluate_and_render(&mut backend).unwrap();
        viewer.dispatch(ParameterChanged::FitLid(true), &mut backend).unwrap();

        viewer.dispose(&mut backend);
        assert_eq!(backend.released, vec![1, 2]);
    }

    #[test]
    fn from_config_uses_configured_scene() {
        let config = Config::default();
        let viewer: ViewerState<u32> = ViewerState::from_config(&config).unwrap();
        assert_eq!(*viewer.params(), ParameterRecord::default());
        assert_eq!(
            viewer.scene().background(),
            Background::Color(rgb_to_linear(0xAAAAAA))
        );
        assert!(viewer.needs_rebuild());
    }

    #[test]
    fn srgb_conversion_endpoints() {
        assert_eq!(rgb_to_linear(0x000000), Vec3::ZERO);
        assert!((rgb_to_linear(0xFFFFFF) - Vec3::ONE).length() < 1e-6);
        let grey = rgb_to_linear(0x808080);
        assert!(grey.x > 0.2 && grey.x < 0.23);
    }

    #[test]
    fn resize_without_edits_draws_once() {
        let mut viewer = viewer(low_tess());
        let mut backend = RecordingBackend::default();

        viewer.redraw(Some((800, 400)), &[], &mut backend).unwrap();

        assert_eq!(backend.draws.len(), 1);
        assert_eq!(backend.viewport, Some((800, 400)));
        assert_eq!(backend.draws[0].aspect, 2.0);
        assert_eq!(viewer.rebuild_count(), 1);

        viewer.redraw(Some((600, 600)), &[], &mut backend).unwrap();
        assert_eq!(backend.draws.len(), 2);
        assert_eq!(backend.draws[1].aspect, 1.0);
        assert_eq!(viewer.rebuild_count(), 1);
    }

    #[test]
    fn resize_with_edits_draws_once_per_edit() {
        let mut viewer = viewer(low_tess());
        let mut backend = RecordingBackend::default();
        viewer.evaluate_and_render(&mut backend).unwrap();

        let edits = [ParameterChanged::Lid(false), ParameterChanged::FitLid(true)];
        viewer.redraw(Some((1000, 500)), &edits, &mut backend).unwrap();

        assert_eq!(backend.draws.len(), 1 + edits.len());
        assert!(backend.draws[1..].iter().all(|d| d.aspect == 2.0));
        assert_eq!(viewer.rebuild_count(), 3);
    }

    #[test]
    fn failed_rebuild_keeps_the_remaining_edits() {
        let mut viewer = viewer(low_tess());
        let mut backend = RecordingBackend::default();
        viewer.evaluate_and_render(&mut backend).unwrap();

        backend.fail_uploads = true;
        let edits = [
            ParameterChanged::Lid(false),
            ParameterChanged::Shading(ShadingMode::Wireframe),
        ];
        let result = viewer.redraw(None, &edits, &mut backend);

        assert!(matches!(result, Err(ViewerError::MeshUpload(_))));
        assert!(!viewer.params().lid);
        assert_eq!(viewer.params().shading, ShadingMode::Wireframe);
        assert!(viewer.needs_rebuild());
        assert_eq!(backend.draws.len(), 1);

        backend.fail_uploads = false;
        viewer.redraw(None, &[], &mut backend).unwrap();
        let mesh = viewer.scene().mesh().unwrap();
        assert_eq!(mesh.shading, ShadingMode::Wireframe);
        assert!(backend.uploads.last().unwrap().wireframe);
        assert!(!viewer.needs_rebuild());
    }
}
