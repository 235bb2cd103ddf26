//! Named uniform blocks.
//!
//! A [`UniformLayout`] mirrors a WGSL `struct` in the uniform address space so
//! individual fields can be set by name. Every setter writes the CPU shadow copy
//! and immediately pushes the changed bytes to the GPU buffer.

use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformType {
    F32,
    I32,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformType {
    /// (alignment, size) in bytes for the uniform address space
    pub const fn align_size(self) -> (u64, u64) {
        match self {
            UniformType::F32 | UniformType::I32 => (4, 4),
            UniformType::Vec2 => (8, 8),
            UniformType::Vec3 => (16, 12),
            UniformType::Vec4 => (16, 16),
            UniformType::Mat4 => (16, 64),
        }
    }
}

#[derive(Clone, Debug)]
pub struct UniformField {
    pub name: &'static str,
    pub ty: UniformType,
    pub offset: u64,
}

#[derive(Clone, Debug)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    size: u64,
}

const fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

impl UniformLayout {
    /// Lays the fields out in declaration order using WGSL rules.
    pub fn new(fields: &[(&'static str, UniformType)]) -> Self {
        let mut cursor = 0;
        let fields = fields
            .iter()
            .map(|&(name, ty)| {
                let (align, size) = ty.align_size();
                let offset = align_up(cursor, align);
                cursor = offset + size;
                UniformField { name, ty, offset }
            })
            .collect();

        Self {
            fields,
            // Uniform structs round up to 16 bytes
            size: align_up(cursor.max(16), 16),
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn offset_of(&self, name: &str) -> Option<u64> {
        self.field(name).map(|f| f.offset)
    }

    /// Writes `bytes` for `name` into `shadow`, returning the byte offset on success.
    pub fn write(
        &self,
        shadow: &mut [u8],
        name: &str,
        ty: UniformType,
        bytes: &[u8],
    ) -> Option<u64> {
        let field = match self.field(name) {
            Some(field) => field,
            None => {
                log::warn!("uniform '{}' does not exist in this block", name);
                return None;
            }
        };
        if field.ty != ty {
            log::warn!(
                "uniform '{}' is {:?}, refusing to write {:?}",
                name,
                field.ty,
                ty
            );
            return None;
        }
        let start = field.offset as usize;
        shadow[start..start + bytes.len()].copy_from_slice(bytes);
        Some(field.offset)
    }
}

/// A uniform buffer addressed by field name.
pub struct UniformBlock {
    layout: UniformLayout,
    shadow: Vec<u8>,
    buffer: wgpu::Buffer,
}

impl UniformBlock {
    pub fn new(device: &wgpu::Device, label: &str, layout: UniformLayout) -> Self {
        let shadow = vec![0u8; layout.size() as usize];
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: &shadow,
            // COPY_DST so the setters can push into it later
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            layout,
            shadow,
            buffer,
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn shadow(&self) -> &[u8] {
        &self.shadow
    }

    fn push(&mut self, queue: &wgpu::Queue, name: &str, ty: UniformType, bytes: &[u8]) {
        if let Some(offset) = self.layout.write(&mut self.shadow, name, ty, bytes) {
            queue.write_buffer(&self.buffer, offset, bytes);
        }
    }

    pub fn set_f32(&mut self, queue: &wgpu::Queue, name: &str, value: f32) {
        self.push(queue, name, UniformType::F32, bytemuck::bytes_of(&value));
    }

    /// Booleans travel as 0.0 / 1.0 floats, tested with `> 0.5` in shaders.
    pub fn set_flag(&mut self, queue: &wgpu::Queue, name: &str, value: bool) {
        self.set_f32(queue, name, if value { 1.0 } else { 0.0 });
    }

    pub fn set_i32(&mut self, queue: &wgpu::Queue, name: &str, value: i32) {
        self.push(queue, name, UniformType::I32, bytemuck::bytes_of(&value));
    }

    pub fn set_vec2(&mut self, queue: &wgpu::Queue, name: &str, value: [f32; 2]) {
        self.push(queue, name, UniformType::Vec2, bytemuck::cast_slice(&value));
    }

    pub fn set_vec3(&mut self, queue: &wgpu::Queue, name: &str, value: Vec3) {
        self.push(
            queue,
            name,
            UniformType::Vec3,
            bytemuck::cast_slice(&value.to_array()),
        );
    }

    pub fn set_vec4(&mut self, queue: &wgpu::Queue, name: &str, value: Vec4) {
        self.push(
            queue,
            name,
            UniformType::Vec4,
            bytemuck::cast_slice(&value.to_array()),
        );
    }

    pub fn set_mat4(&mut self, queue: &wgpu::Queue, name: &str, value: Mat4) {
        self.push(
            queue,
            name,
            UniformType::Mat4,
            bytemuck::cast_slice(&value.to_cols_array()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec3_followed_by_scalar_packs_tightly() {
        let layout = UniformLayout::new(&[
            ("albedo", UniformType::Vec3),
            ("roughness", UniformType::F32),
            ("emissive_color", UniformType::Vec3),
            ("emissive_strength", UniformType::F32),
            ("metalness", UniformType::F32),
        ]);

        assert_eq!(layout.offset_of("albedo"), Some(0));
        assert_eq!(layout.offset_of("roughness"), Some(12));
        assert_eq!(layout.offset_of("emissive_color"), Some(16));
        assert_eq!(layout.offset_of("emissive_strength"), Some(28));
        assert_eq!(layout.offset_of("metalness"), Some(32));
        assert_eq!(layout.size(), 48);
    }

    #[test]
    fn matrices_and_vectors_align_to_16() {
        let layout = UniformLayout::new(&[
            ("flag", UniformType::F32),
            ("projection", UniformType::Mat4),
            ("noise_scale", UniformType::Vec2),
            ("radius", UniformType::F32),
            ("tint", UniformType::Vec4),
        ]);

        assert_eq!(layout.offset_of("projection"), Some(16));
        assert_eq!(layout.offset_of("noise_scale"), Some(80));
        assert_eq!(layout.offset_of("radius"), Some(88));
        assert_eq!(layout.offset_of("tint"), Some(96));
        assert_eq!(layout.size(), 112);
    }

    #[test]
    fn single_scalar_block_is_16_bytes() {
        let layout = UniformLayout::new(&[("exposure", UniformType::F32)]);
        assert_eq!(layout.size(), 16);
    }

    #[test]
    fn write_updates_shadow_at_offset() {
        let layout = UniformLayout::new(&[
            ("color", UniformType::Vec3),
            ("shininess", UniformType::F32),
        ]);
        let mut shadow = vec![0u8; layout.size() as usize];

        let offset = layout.write(
            &mut shadow,
            "shininess",
            UniformType::F32,
            bytemuck::bytes_of(&64.0f32),
        );
        assert_eq!(offset, Some(12));
        assert_eq!(bytemuck::pod_read_unaligned::<f32>(&shadow[12..16]), 64.0);
    }

    #[test]
    fn unknown_or_mistyped_names_are_ignored() {
        let layout = UniformLayout::new(&[("color", UniformType::Vec3)]);
        let mut shadow = vec![0u8; layout.size() as usize];

        assert!(
            layout
                .write(&mut shadow, "colour", UniformType::Vec3, &[1u8; 12])
                .is_none()
        );
        assert!(
            layout
                .write(&mut shadow, "color", UniformType::F32, &[1u8; 4])
                .is_none()
        );
        assert!(shadow.iter().all(|&b| b == 0));
    }
}
