use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use glam::Vec3;
use lumen_assets::{Handle, HdrImage, MeshData};
use lumen_core::OrbitCamera;
use lumen_window::MainWindow;
use wgpu::{Device, Queue, Surface, SurfaceConfiguration};

use crate::{
    config::{FrameConfig, RenderPath, RenderToggles, RendererSettings},
    error::RenderError,
    global_resources::{FrameUniform, GlobalResources},
    ibl::{IblPrecompute, IblTextures, environment_bind_group, environment_layout},
    light::Light,
    material::{BlinnPhongMaterial, PbrMaterial, material_bind_group_layout},
    mesh::{GpuMesh, ScreenQuad},
    model::Model,
    programs::{
        BlitProgram, BloomProgram, CompositeProgram, ForwardProgram, FxaaProgram, GeometryProgram, GpuProgram,
        GpuProgramRenderContext, LightingProgram, SceneLayouts, SsaoProgram,
        bloom_program::{BLUR_PASSES, BloomDrawData, BloomStage, blur_step},
        forward_program::ForwardDrawData,
        geometry_program::GeometryDrawData,
        lighting_program::{LightingDrawData, LightingInit},
        ssao_program::{SsaoDrawData, SsaoInit, SsaoStage},
    },
    shader::ShaderCache,
    targets::{GBuffer, PostTargets, SceneTarget, ScratchDepth, clear_attachment, clear_depth},
    texture::{TextureHelper, uniform_entry},
};

/// Index of a light in the renderer's fixed light list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LightId(pub usize);

/// Opens a pass with one cleared colour attachment and no depth.
fn post_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(clear_attachment(view))],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

/// Owns the GPU connection, every render target and program, and the scene.
/// `render` encodes a whole frame into one command buffer.
pub struct Renderer {
    pub device: Device,
    pub queue: Queue,
    surface: Surface<'static>,
    config: SurfaceConfiguration,
    settings: RendererSettings,

    global_resources: GlobalResources,
    material_layout: wgpu::BindGroupLayout,
    model_layout: wgpu::BindGroupLayout,
    environment_layout: wgpu::BindGroupLayout,
    environment_sampler: wgpu::Sampler,

    quad: ScreenQuad,
    scratch_depth: ScratchDepth,
    gbuffer: GBuffer,
    scene_target: SceneTarget,
    post: PostTargets,

    forward_program: ForwardProgram,
    geometry_program: GeometryProgram,
    ssao_program: SsaoProgram,
    lighting_program: LightingProgram,
    bloom_program: BloomProgram,
    composite_program: CompositeProgram,
    fxaa_program: FxaaProgram,
    blit_program: BlitProgram,

    ibl_precompute: IblPrecompute,
    ibl: IblTextures,
    environment_group: wgpu::BindGroup,

    camera: OrbitCamera,
    last_blinn_phong: Option<bool>,
    lights: Vec<Light>,
    models: Vec<Model>,
    model_index: HashMap<Handle<Model>, usize>,
}

impl Renderer {
    pub fn new(window: &MainWindow, settings: RendererSettings) -> Result<Self, RenderError> {
        println!(">>> Lumen Renderer: Initializing GPU <<<");

        // 1. Create the Instance (Vulkan/Metal/DX12)
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        // 2. Create Surface. The Arc keeps the window alive as long as the surface.
        let surface = instance.create_surface(window.0.clone())?;

        // 3. Request Adapter (Physical GPU)
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;
        log::info!("adapter: {:?}", adapter.get_info());

        // 4. Request Device. The G-Buffer needs more attachment bytes than the defaults.
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Lumen Device"),
            required_limits: adapter.limits(),
            ..Default::default()
        }))?;

        // 5. Configure the Surface. Composite applies gamma itself, so prefer a linear format.
        let size = window.0.inner_size();
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo, // VSync On
            desired_maximum_frame_latency: 2,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        // 6. Shared layouts
        let global_resources = GlobalResources::new(&device);
        let material_layout = material_bind_group_layout(&device);
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Model Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });
        let environment_layout = environment_layout(&device);
        let environment_sampler = TextureHelper::linear_clamp_sampler(&device, "Environment Sampler");

        // 7. Targets, all at the fixed viewport
        let (width, height) = (settings.width, settings.height);
        let quad = ScreenQuad::new(&device);
        let gbuffer = GBuffer::new(&device, width, height);
        let scene_target = SceneTarget::new(&device, width, height, settings.msaa_samples);
        let post = PostTargets::new(&device, width, height);

        // 8. Programs
        let shaders = ShaderCache::new(settings.shader_dir.clone());
        let scene_ctx = GpuProgramRenderContext {
            device: &device,
            queue: &queue,
            format: TextureHelper::HDR_FORMAT,
            shaders: &shaders,
        };
        let surface_ctx = GpuProgramRenderContext { format, ..scene_ctx };

        let layouts = SceneLayouts {
            global: &global_resources.layout,
            material: &material_layout,
            model: &model_layout,
            environment: &environment_layout,
        };

        let forward_program = ForwardProgram::new(&scene_ctx, (layouts, settings.msaa_samples));
        let geometry_program = GeometryProgram::new(&scene_ctx, layouts);
        let ssao_program = SsaoProgram::new(
            &scene_ctx,
            SsaoInit {
                global_layout: &global_resources.layout,
                gbuffer: &gbuffer,
                targets: &post,
            },
        );
        let lighting_program = LightingProgram::new(
            &scene_ctx,
            LightingInit {
                global_layout: &global_resources.layout,
                environment_layout: &environment_layout,
                gbuffer: &gbuffer,
                targets: &post,
            },
        );
        let bloom_program = BloomProgram::new(&scene_ctx, &post);
        let composite_program = CompositeProgram::new(&scene_ctx, &post);
        let fxaa_program = FxaaProgram::new(&surface_ctx, &post.composite);
        let blit_program = BlitProgram::new(&surface_ctx, &post.composite);
        let ibl_precompute = IblPrecompute::new(&scene_ctx);

        let ibl = IblTextures::placeholders(&device, &queue);
        let environment_group = environment_bind_group(&device, &environment_layout, &ibl, &environment_sampler);

        println!(">>> Lumen Renderer: Pipelines Compiled <<<");

        Ok(Self {
            camera: OrbitCamera::new(width as f32 / height.max(1) as f32, 45.0, 8.0, Vec3::ZERO),
            device,
            queue,
            surface,
            config,
            settings,
            global_resources,
            material_layout,
            model_layout,
            environment_layout,
            environment_sampler,
            quad,
            scratch_depth: ScratchDepth::new(),
            gbuffer,
            scene_target,
            post,
            forward_program,
            geometry_program,
            ssao_program,
            lighting_program,
            bloom_program,
            composite_program,
            fxaa_program,
            blit_program,
            ibl_precompute,
            ibl,
            environment_group,
            last_blinn_phong: None,
            lights: Vec::new(),
            models: Vec::new(),
            model_index: HashMap::new(),
        })
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    /// Reconfigures the swapchain only; internal targets keep their size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    // --- Scene ---

    pub fn upload_mesh(&self, data: &MeshData, label: &str) -> Arc<GpuMesh> {
        Arc::new(GpuMesh::new(&self.device, data, label))
    }

    /// A model with no materials yet; hand it back through [`Renderer::add_model`].
    pub fn new_model(&self, mesh: Arc<GpuMesh>) -> Model {
        Model::new(&self.device, &self.model_layout, mesh)
    }

    pub fn add_model(&mut self, model: Model) -> Handle<Model> {
        let handle = Handle::new();
        self.model_index.insert(handle, self.models.len());
        self.models.push(model);
        handle
    }

    pub fn model_mut(&mut self, handle: Handle<Model>) -> Option<&mut Model> {
        let index = *self.model_index.get(&handle)?;
        self.models.get_mut(index)
    }

    /// Runs `edit` on a model with the queue its material setters need.
    pub fn edit_model<R>(
        &mut self,
        handle: Handle<Model>,
        edit: impl FnOnce(&mut Model, &Queue) -> R,
    ) -> Option<R> {
        let index = *self.model_index.get(&handle)?;
        let model = self.models.get_mut(index)?;
        Some(edit(model, &self.queue))
    }

    pub fn blinn_phong_material(&self, color: Vec3, specular: f32, shininess: f32) -> BlinnPhongMaterial {
        BlinnPhongMaterial::new(&self.device, &self.queue, &self.material_layout, color, specular, shininess)
    }

    pub fn pbr_material(&self, albedo: Vec3, roughness: f32, metalness: f32) -> PbrMaterial {
        PbrMaterial::new(&self.device, &self.queue, &self.material_layout, albedo, roughness, metalness)
    }

    pub fn add_light(&mut self, light: Light) -> LightId {
        self.lights.push(light);
        LightId(self.lights.len() - 1)
    }

    pub fn light(&self, id: LightId) -> Option<&Light> {
        self.lights.get(id.0)
    }

    pub fn light_mut(&mut self, id: LightId) -> Option<&mut Light> {
        self.lights.get_mut(id.0)
    }

    /// Loads an equirectangular HDR image and replaces all four IBL textures.
    /// On failure the previous textures stay bound.
    pub fn set_environment_map(&mut self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        let path = path.as_ref();
        log::info!("loading environment map {}", path.display());

        let image = HdrImage::load(path)?;
        let textures = self
            .ibl_precompute
            .run(&self.device, &self.queue, &image, &mut self.scratch_depth, &self.quad)?;

        self.environment_group = environment_bind_group(
            &self.device,
            &self.environment_layout,
            &textures,
            &self.environment_sampler,
        );
        self.ibl = textures;
        Ok(())
    }

    // --- Frame ---

    fn push_frame_data(&mut self, config: &FrameConfig) {
        if self.camera.is_dirty() || self.last_blinn_phong != Some(config.blinn_phong) {
            let uniform = FrameUniform::new(
                self.camera.compute_view_matrix(),
                self.camera.compute_projection_matrix(),
                config.blinn_phong,
            );
            self.global_resources.update_camera(&self.queue, uniform);
            self.camera.set_dirty(false);
            self.last_blinn_phong = Some(config.blinn_phong);
        }

        self.global_resources.update_lights(&self.queue, &self.lights);

        for model in &mut self.models {
            model.apply_model_matrix(&self.queue);
        }

        self.lighting_program.update(&self.queue, config.ssao, config.ibl);
        self.composite_program.update(&self.queue, config);
    }

    fn encode_deferred(&mut self, encoder: &mut wgpu::CommandEncoder, config: &FrameConfig) {
        if !self.gbuffer.is_complete() {
            // Degraded: nothing to light
            drop(post_pass(encoder, "Deferred Fallback Clear", &self.post.hdr.view));
            return;
        }

        // 1. Geometry
        {
            let depth = self
                .scratch_depth
                .resize(&self.device, self.settings.width, self.settings.height);
            let attachments = self.gbuffer.color_attachments();
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("G-Buffer Pass"),
                color_attachments: &attachments,
                depth_stencil_attachment: Some(clear_depth(depth)),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.geometry_program.record(
                &mut rpass,
                GeometryDrawData {
                    global: &self.global_resources.bind_group,
                    environment: &self.environment_group,
                    models: &self.models,
                    pbr: config.pbr,
                },
            );
        }

        // 2. SSAO + blur
        if config.ssao {
            for (stage, view, label) in [
                (SsaoStage::Occlusion, &self.post.ssao_raw.view, "SSAO Pass"),
                (SsaoStage::Blur, &self.post.ssao_blurred.view, "SSAO Blur Pass"),
            ] {
                let mut rpass = post_pass(encoder, label, view);
                self.ssao_program.record(
                    &mut rpass,
                    SsaoDrawData {
                        global: &self.global_resources.bind_group,
                        quad: &self.quad,
                        stage,
                    },
                );
            }
        }

        // 3. Lighting
        let mut rpass = post_pass(encoder, "Deferred Lighting Pass", &self.post.hdr.view);
        self.lighting_program.record(
            &mut rpass,
            LightingDrawData {
                global: &self.global_resources.bind_group,
                environment: &self.environment_group,
                quad: &self.quad,
                pbr: config.pbr,
            },
        );
    }

    fn encode_forward(&self, encoder: &mut wgpu::CommandEncoder, config: &FrameConfig) {
        let msaa = self.scene_target.sample_count(config.msaa) > 1;
        let (color, depth) = self.scene_target.attachments(&self.post.hdr.view, msaa);

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Forward Pass"),
            color_attachments: &[Some(color)],
            depth_stencil_attachment: Some(clear_depth(depth)),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.forward_program.record(
            &mut rpass,
            ForwardDrawData {
                global: &self.global_resources.bind_group,
                environment: &self.environment_group,
                models: &self.models,
                msaa,
            },
        );
    }

    fn encode_post(&self, encoder: &mut wgpu::CommandEncoder, config: &FrameConfig, surface: &wgpu::TextureView) {
        // 1. Bloom: bright pass then the ping-pong blur
        if config.bloom {
            {
                let mut rpass = post_pass(encoder, "Bloom Bright Pass", &self.post.brightness.view);
                self.bloom_program.record(
                    &mut rpass,
                    BloomDrawData {
                        quad: &self.quad,
                        stage: BloomStage::Bright,
                    },
                );
            }
            for iteration in 0..BLUR_PASSES {
                let output = &self.post.ping_pong[blur_step(iteration).output];
                let mut rpass = post_pass(encoder, "Bloom Blur Pass", &output.view);
                self.bloom_program.record(
                    &mut rpass,
                    BloomDrawData {
                        quad: &self.quad,
                        stage: BloomStage::Blur(iteration),
                    },
                );
            }
        }

        // 2. Composite
        {
            let mut rpass = post_pass(encoder, "Composite Pass", &self.post.composite.view);
            self.composite_program.record(&mut rpass, &self.quad);
        }

        // 3. Onto the surface
        let mut rpass = post_pass(encoder, "Present Pass", surface);
        if config.fxaa {
            self.fxaa_program.record(&mut rpass, &self.quad);
        } else {
            self.blit_program.record(&mut rpass, &self.quad);
        }
    }

    /// Renders and presents one frame with the given switches.
    pub fn render(&mut self, toggles: &RenderToggles, exposure: f32) {
        let config = FrameConfig::snapshot(self.settings.path, *toggles, exposure);

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(err) => {
                log::warn!("skipping frame: {}", err);
                return;
            }
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.push_frame_data(&config);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        match config.path {
            RenderPath::Deferred => self.encode_deferred(&mut encoder, &config),
            RenderPath::Forward => self.encode_forward(&mut encoder, &config),
        }
        self.encode_post(&mut encoder, &config, &view);

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}
