use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::light::{Light, LightUniforms};

/// Per-frame camera data, bound at group 0 by every scene and lighting program.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub inverse_view: [[f32; 4]; 4],
    pub eye: [f32; 3],
    // 1.0 = Blinn-Phong half vector, 0.0 = Phong reflection vector
    pub blinn_phong: f32,
}

impl FrameUniform {
    pub fn new(view: Mat4, projection: Mat4, blinn_phong: bool) -> Self {
        let inverse_view = view.inverse();
        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            inverse_view: inverse_view.to_cols_array_2d(),
            eye: inverse_view.transform_point3(Vec3::ZERO).to_array(),
            blinn_phong: if blinn_phong { 1.0 } else { 0.0 },
        }
    }
}

pub struct GlobalResources {
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    frame_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
}

impl GlobalResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let global_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Global Bind Group Layout"),
            entries: &[
                // --- BINDING 0: Camera matrices ---
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // --- BINDING 1: Light Uniforms ---
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Buffer (Camera)"),
            contents: bytemuck::bytes_of(&FrameUniform::new(Mat4::IDENTITY, Mat4::IDENTITY, true)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let lights_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Data Buffer (Lights)"),
            contents: bytemuck::bytes_of(&LightUniforms::pack(&[])),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Global Bind Group"),
            layout: &global_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            layout: global_layout,
            bind_group,
            frame_buffer,
            lights_buffer,
        }
    }

    pub fn update_camera(&self, queue: &wgpu::Queue, uniform: FrameUniform) {
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    pub fn update_lights(&self, queue: &wgpu::Queue, lights: &[Light]) {
        let uniform = LightUniforms::pack(lights);
        queue.write_buffer(&self.lights_buffer, 0, bytemuck::bytes_of(&uniform));
    }
}
