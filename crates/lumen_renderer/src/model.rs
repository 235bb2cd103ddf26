use std::collections::HashMap;
use std::sync::Arc;

use glam::Mat4;
use lumen_core::ModelTransform;

use crate::material::{Material, MaterialTag};
use crate::mesh::{GpuMesh, model_uniform_layout, normal_matrix};
use crate::uniforms::UniformBlock;

/// A mesh instance: shared geometry, one material per pass, and a transform.
pub struct Model {
    mesh: Arc<GpuMesh>,
    materials: HashMap<MaterialTag, Material>,
    pub transform: ModelTransform,
    uniform: UniformBlock,
    bind_group: wgpu::BindGroup,
}

impl Model {
    pub fn new(device: &wgpu::Device, mesh_layout: &wgpu::BindGroupLayout, mesh: Arc<GpuMesh>) -> Self {
        let uniform = UniformBlock::new(device, "Model Uniform Buffer", model_uniform_layout());

        // We create a handle that tells the shader: "When you ask for Group 2, look at THIS buffer."
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout: mesh_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.buffer().as_entire_binding(),
            }],
        });

        Self {
            mesh,
            materials: HashMap::new(),
            transform: ModelTransform::default(),
            uniform,
            bind_group,
        }
    }

    /// Stores `material` under its tag, replacing any previous one.
    pub fn add_material(&mut self, material: Material) -> &mut Self {
        self.materials.insert(material.tag(), material);
        self
    }

    pub fn material(&self, tag: MaterialTag) -> Option<&Material> {
        self.materials.get(&tag)
    }

    pub fn material_mut(&mut self, tag: MaterialTag) -> Option<&mut Material> {
        self.materials.get_mut(&tag)
    }

    /// The material a pass should draw. PBR frames fall back to the Blinn-Phong
    /// G-Buffer writer for models without a PBR material (skybox, lamps).
    pub fn material_for_pass(&self, tag: MaterialTag) -> Option<&Material> {
        match tag {
            MaterialTag::DeferredPbr => self
                .material(MaterialTag::DeferredPbr)
                .or_else(|| self.material(MaterialTag::Deferred)),
            other => self.material(other),
        }
    }

    pub fn materials_mut(&mut self) -> impl Iterator<Item = &mut Material> {
        self.materials.values_mut()
    }

    pub fn mesh(&self) -> &GpuMesh {
        &self.mesh
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Pushes the model and normal matrices if the transform changed since the
    /// last push. Returns whether anything was written.
    pub fn apply_model_matrix(&mut self, queue: &wgpu::Queue) -> bool {
        match pending_matrices(&mut self.transform) {
            Some((model, normal)) => {
                self.uniform.set_mat4(queue, "model", model);
                self.uniform.set_mat4(queue, "normal_matrix", normal);
                true
            }
            None => false,
        }
    }
}

/// Model and normal matrices to upload, or `None` while the transform is clean.
/// Clears the dirty flag.
pub fn pending_matrices(transform: &mut ModelTransform) -> Option<(Mat4, Mat4)> {
    transform
        .take_dirty_matrix()
        .map(|model| (model, normal_matrix(model)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn new_transform_is_uploaded_once() {
        let mut transform = ModelTransform::default();
        assert!(pending_matrices(&mut transform).is_some());
        assert!(pending_matrices(&mut transform).is_none());
    }

    #[test]
    fn clean_transform_writes_nothing() {
        let mut transform = ModelTransform::from_position(Vec3::new(1.0, 2.0, 3.0));
        pending_matrices(&mut transform);

        // Same values again do not dirty the transform
        transform.set_position(Vec3::new(1.0, 2.0, 3.0));
        transform.set_uniform_scale(1.0);
        assert!(pending_matrices(&mut transform).is_none());
    }

    #[test]
    fn setter_triggers_exactly_one_write() {
        let mut transform = ModelTransform::default();
        pending_matrices(&mut transform);

        transform.set_position(Vec3::new(0.3, -1.65, 0.0));
        let (model, normal) = pending_matrices(&mut transform).unwrap();
        assert_eq!(model.w_axis.truncate(), Vec3::new(0.3, -1.65, 0.0));
        assert_eq!(normal, model.inverse().transpose());
        assert!(pending_matrices(&mut transform).is_none());
    }
}
