use std::sync::Arc;

use crate::error::{Result, ViewerError};
use crate::geometry::TriangleMesh;
use crate::renderer::mesh_buffers::{GpuMesh, mesh_vertex_layout};
use crate::renderer::textures::SceneTextures;
use crate::viewer::material::{MapBinding, Material, MaterialRegistry, Side, SurfaceModel};
use crate::viewer::params::ShadingMode;
use crate::viewer::scene::{Background, Scene};
use crate::viewer::RenderBackend;

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub ambient: [f32; 4],
    pub light_dir: [f32; 4],
    /// Color already scaled by intensity.
    pub light_color: [f32; 4],
}

impl FrameUniform {
    pub fn from_scene<M>(scene: &Scene<M>) -> Self {
        let view_proj = scene.camera.view_projection_matrix();
        let light = scene.light.color * scene.light.intensity;
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            camera_pos: scene.camera.position().extend(1.0).to_array(),
            ambient: scene.ambient.color.extend(1.0).to_array(),
            light_dir: scene.light.direction.extend(0.0).to_array(),
            light_color: light.extend(1.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
    pub specular: [f32; 4],
}

impl From<&Material> for MaterialUniform {
    fn from(material: &Material) -> Self {
        Self {
            color: material.color.extend(1.0).to_array(),
            specular: material.specular.extend(material.shininess).to_array(),
        }
    }
}

/// Fragment entry point implementing a material's lighting.
pub fn fragment_entry(material: &Material) -> &'static str {
    match (material.model, material.map) {
        (SurfaceModel::Unlit, _) => "fs_unlit",
        (SurfaceModel::Lambert, _) => "fs_lambert",
        (SurfaceModel::Phong, _) if material.flat_shading => "fs_phong_flat",
        (SurfaceModel::Phong, MapBinding::Color) => "fs_phong_textured",
        (SurfaceModel::Phong, MapBinding::Environment) => "fs_phong_reflective",
        (SurfaceModel::Phong, MapBinding::None) => "fs_phong",
    }
}

pub fn primitive_state(material: &Material) -> wgpu::PrimitiveState {
    if material.wireframe {
        return wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::LineList,
            ..Default::default()
        };
    }
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        cull_mode: match material.side {
            Side::Front => Some(wgpu::Face::Back),
            Side::Double => None,
        },
        ..Default::default()
    }
}

/// egui output to composite on top of the scene.
pub struct Overlay<'a> {
    pub renderer: &'a mut egui_wgpu::Renderer,
    pub paint_jobs: &'a [egui::ClippedPrimitive],
    pub screen: &'a egui_wgpu::ScreenDescriptor,
}

pub struct GpuState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,

    mesh_pipelines: Vec<wgpu::RenderPipeline>,
    skybox_pipeline: wgpu::RenderPipeline,

    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    material_bind_groups: Vec<wgpu::BindGroup>,

    depth_texture: wgpu::TextureView,
}

impl GpuState {
    pub async fn new(window: Arc<winit::window::Window>, vsync: bool) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ViewerError::NoAdapter)?;

        tracing::info!(adapter = ?adapter.get_info().name, "graphics adapter selected");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: present_mode(vsync),
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Teapot Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders.wgsl").into()),
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Frame Bind Group Layout"),
                entries: &[uniform_entry(0)],
            });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let material_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Material Bind Group Layout"),
                entries: &[
                    uniform_entry(0),
                    texture_entry(1, wgpu::TextureViewDimension::D2),
                    sampler_entry(2),
                    texture_entry(3, wgpu::TextureViewDimension::Cube),
                    sampler_entry(4),
                ],
            });

        let textures = SceneTextures::new(&device, &queue);
        let materials = MaterialRegistry::new();

        let material_bind_groups = materials
            .iter()
            .map(|(mode, material)| {
                let uniform = MaterialUniform::from(material);
                let buffer = wgpu::util::DeviceExt::create_buffer_init(
                    &device,
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("Material Uniform Buffer"),
                        contents: bytemuck::cast_slice(&[uniform]),
                        usage: wgpu::BufferUsages::UNIFORM,
                    },
                );
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(mode.name()),
                    layout: &material_bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&textures.color_view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&textures.color_sampler),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: wgpu::BindingResource::TextureView(
                                &textures.environment_view,
                            ),
                        },
                        wgpu::BindGroupEntry {
                            binding: 4,
                            resource: wgpu::BindingResource::Sampler(
                                &textures.environment_sampler,
                            ),
                        },
                    ],
                })
            })
            .collect();

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Teapot Pipeline Layout"),
            bind_group_layouts: &[&frame_bind_group_layout, &material_bind_group_layout],
            push_constant_ranges: &[],
        });

        let mesh_pipelines = materials
            .iter()
            .map(|(mode, material)| {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(mode.name()),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some("vs_mesh"),
                        buffers: &[mesh_vertex_layout()],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some(fragment_entry(material)),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: config.format,
                            blend: Some(wgpu::BlendState::REPLACE),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: primitive_state(material),
                    depth_stencil: Some(depth_state(true, wgpu::CompareFunction::Less)),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
            })
            .collect();

        let skybox_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Skybox Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_skybox"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_skybox"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(depth_state(false, wgpu::CompareFunction::Always)),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let depth_texture = Self::create_depth_texture(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            mesh_pipelines,
            skybox_pipeline,
            frame_buffer,
            frame_bind_group,
            material_bind_groups,
            depth_texture,
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        let size = wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = Self::create_depth_texture(&self.device, &self.config);
        }
    }

    pub fn set_vsync(&mut self, enabled: bool) {
        self.config.present_mode = present_mode(enabled);
        self.surface.configure(&self.device, &self.config);
    }

    /// Uploads inside an out-of-memory error scope so a failed allocation
    /// surfaces as an error instead of a device loss.
    pub fn create_mesh(&self, geometry: &TriangleMesh, material: &Material) -> Result<GpuMesh> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let mesh = GpuMesh::upload(&self.device, geometry, material.wireframe);
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            mesh.destroy();
            return Err(ViewerError::MeshUpload(err.to_string()));
        }
        Ok(mesh)
    }

    pub fn draw_scene(
        &mut self,
        scene: &Scene<GpuMesh>,
        overlay: Option<&mut Overlay<'_>>,
    ) -> Result<()> {
        let output = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated, reconfiguring");
                self.resize(self.size);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface frame timed out, skipping");
                return Ok(());
            }
            Err(e) => return Err(ViewerError::SurfaceFrame(e)),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::cast_slice(&[FrameUniform::from_scene(scene)]),
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.render_scene(scene, &view, &mut encoder);

        if let Some(overlay) = overlay {
            overlay.renderer.update_buffers(
                &self.device,
                &self.queue,
                &mut encoder,
                overlay.paint_jobs,
                overlay.screen,
            );

            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            overlay.renderer.render(
                &mut render_pass.forget_lifetime(),
                overlay.paint_jobs,
                overlay.screen,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        tracing::trace!(background = ?scene.background(), "frame presented");
        Ok(())
    }

    fn render_scene(
        &self,
        scene: &Scene<GpuMesh>,
        view: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
    ) {
        let clear = match scene.background() {
            Background::Color(c) => wgpu::Color {
                r: c.x as f64,
                g: c.y as f64,
                b: c.z as f64,
                a: 1.0,
            },
            Background::EnvironmentMap => wgpu::Color::BLACK,
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

        if scene.background() == Background::EnvironmentMap {
            render_pass.set_pipeline(&self.skybox_pipeline);
            render_pass.set_bind_group(
                1,
                &self.material_bind_groups[ShadingMode::Reflective.index()],
                &[],
            );
            render_pass.draw(0..3, 0..1);
        }

        if let Some(mesh) = scene.mesh() {
            let index = mesh.shading.index();
            render_pass.set_pipeline(&self.mesh_pipelines[index]);
            render_pass.set_bind_group(1, &self.material_bind_groups[index], &[]);
            mesh.resource.draw(&mut render_pass);
        }
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

fn depth_state(write: bool, compare: wgpu::CompareFunction) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: wgpu::TextureFormat::Depth32Float,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// One frame's worth of access to the GPU, handed to the viewer controller.
pub struct Frame<'a> {
    pub gpu: &'a mut GpuState,
    pub overlay: Option<Overlay<'a>>,
}

impl RenderBackend for Frame<'_> {
    type Mesh = GpuMesh;

    fn upload_mesh(
        &mut self,
        geometry: &TriangleMesh,
        _shading: ShadingMode,
        material: &Material,
    ) -> Result<GpuMesh> {
        self.gpu.create_mesh(geometry, material)
    }

    fn release_mesh(&mut self, mesh: GpuMesh) {
        mesh.destroy();
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(winit::dpi::PhysicalSize::new(width, height));
    }

    fn draw(&mut self, scene: &Scene<GpuMesh>) -> Result<()> {
        self.gpu.draw_scene(scene, self.overlay.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::camera::OrbitCamera;
    use crate::viewer::scene::{AmbientLight, DirectionalLight};
    use glam::Vec3;

    #[test]
    fn every_mode_gets_its_own_fragment_stage() {
        let materials = MaterialRegistry::new();
        let entries: Vec<_> = ShadingMode::ALL
            .iter()
            .map(|&mode| fragment_entry(materials.get(mode)))
            .collect();
        assert_eq!(
            entries,
            [
                "fs_unlit",
                "fs_phong_flat",
                "fs_lambert",
                "fs_phong",
                "fs_phong_textured",
                "fs_phong_reflective",
            ]
        );
    }

    #[test]
    fn wireframe_draws_lines_and_others_are_double_sided() {
        let materials = MaterialRegistry::new();
        assert_eq!(
            primitive_state(materials.get(ShadingMode::Wireframe)).topology,
            wgpu::PrimitiveTopology::LineList
        );
        for mode in [ShadingMode::Smooth, ShadingMode::Glossy, ShadingMode::Reflective] {
            let state = primitive_state(materials.get(mode));
            assert_eq!(state.topology, wgpu::PrimitiveTopology::TriangleList);
            assert_eq!(state.cull_mode, None);
        }
    }

    #[test]
    fn frame_uniform_scales_light_by_intensity() {
        let scene: Scene<()> = Scene::new(
            AmbientLight { color: Vec3::splat(0.1) },
            DirectionalLight {
                color: Vec3::new(1.0, 0.5, 0.25),
                intensity: 2.0,
                direction: Vec3::Y,
            },
            OrbitCamera::default(),
            Vec3::ZERO,
        );
        let uniform = FrameUniform::from_scene(&scene);
        assert_eq!(uniform.light_color, [2.0, 1.0, 0.5, 1.0]);
        assert_eq!(uniform.light_dir, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(std::mem::size_of::<FrameUniform>() % 16, 0);
    }

    #[test]
    fn material_uniform_packs_shininess_into_specular() {
        let materials = MaterialRegistry::new();
        let uniform = MaterialUniform::from(materials.get(ShadingMode::Glossy));
        assert_eq!(uniform.specular[3], 30.0);
    }
}
