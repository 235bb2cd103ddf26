//! Shader program cache.
//!
//! Programs are vertex/fragment module pairs. Modules are compiled once and
//! cached by name, so shared stages (screen quad, unit cube) are only compiled a
//! single time. A failed compile is cached too: the owning pass stays inert for
//! the rest of the process.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::RenderError;

/// One shader stage: a cache name and its embedded WGSL.
#[derive(Clone, Copy, Debug)]
pub struct ShaderStage {
    pub name: &'static str,
    pub source: &'static str,
}

impl ShaderStage {
    pub const fn new(name: &'static str, source: &'static str) -> Self {
        Self { name, source }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ProgramDesc {
    pub label: &'static str,
    pub vertex: ShaderStage,
    pub fragment: ShaderStage,
}

/// A compiled vertex/fragment pair. Entry points are `vs_main` and `fs_main`.
#[derive(Clone, Debug)]
pub struct ShaderProgram {
    pub label: &'static str,
    pub vertex: Arc<wgpu::ShaderModule>,
    pub fragment: Arc<wgpu::ShaderModule>,
}

pub struct ShaderCache {
    override_dir: Option<PathBuf>,
    modules: RefCell<HashMap<&'static str, Option<Arc<wgpu::ShaderModule>>>>,
}

impl ShaderCache {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self {
            override_dir,
            modules: RefCell::new(HashMap::new()),
        }
    }

    /// Compiles (or fetches) both stages. `None` means the program is unusable.
    pub fn program(&self, device: &wgpu::Device, desc: &ProgramDesc) -> Option<ShaderProgram> {
        let vertex = self.module(device, &desc.vertex);
        let fragment = self.module(device, &desc.fragment);

        match (vertex, fragment) {
            (Some(vertex), Some(fragment)) => Some(ShaderProgram {
                label: desc.label,
                vertex,
                fragment,
            }),
            _ => {
                log::error!("program '{}' is unavailable, its pass will be skipped", desc.label);
                None
            }
        }
    }

    fn module(&self, device: &wgpu::Device, stage: &ShaderStage) -> Option<Arc<wgpu::ShaderModule>> {
        if let Some(cached) = self.modules.borrow().get(stage.name) {
            return cached.clone();
        }

        let compiled = resolve_source(self.override_dir.as_deref(), stage)
            .and_then(|source| compile(device, stage.name, source))
            .map(Arc::new);

        let entry = match compiled {
            Ok(module) => Some(module),
            Err(err) => {
                log::error!("{}", err);
                None
            }
        };

        self.modules.borrow_mut().insert(stage.name, entry.clone());
        entry
    }
}

/// Picks `<dir>/<name>.wgsl` when an override directory holds one, else the embedded text.
pub fn resolve_source(
    override_dir: Option<&Path>,
    stage: &ShaderStage,
) -> Result<Cow<'static, str>, RenderError> {
    let Some(dir) = override_dir else {
        return Ok(Cow::Borrowed(stage.source));
    };

    let path = dir.join(format!("{}.wgsl", stage.name));
    if !path.exists() {
        return Ok(Cow::Borrowed(stage.source));
    }

    log::info!("shader '{}' loaded from {}", stage.name, path.display());
    std::fs::read_to_string(&path)
        .map(Cow::Owned)
        .map_err(|source| RenderError::ShaderIo {
            path: path.display().to_string(),
            source,
        })
}

fn compile(
    device: &wgpu::Device,
    name: &str,
    source: Cow<'static, str>,
) -> Result<wgpu::ShaderModule, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(name),
        source: wgpu::ShaderSource::Wgsl(source),
    });

    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(RenderError::ShaderCompile {
            name: name.to_string(),
            message: err.to_string(),
        }),
        None => Ok(module),
    }
}

/// Creates a render pipeline inside a validation scope so a bad layout logs
/// instead of aborting.
pub fn create_render_pipeline(
    device: &wgpu::Device,
    desc: &wgpu::RenderPipelineDescriptor,
) -> Option<wgpu::RenderPipeline> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(desc);

    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => {
            let err = RenderError::Pipeline {
                label: desc.label.unwrap_or("unnamed").to_string(),
                message: err.to_string(),
            };
            log::error!("{}", err);
            None
        }
        None => Some(pipeline),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE: ShaderStage = ShaderStage::new("probe", "// embedded");

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lumen-shaders-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn embedded_source_without_override() {
        let source = resolve_source(None, &STAGE).unwrap();
        assert_eq!(source, "// embedded");
    }

    #[test]
    fn override_file_replaces_embedded() {
        let dir = scratch_dir();
        std::fs::write(dir.join("probe.wgsl"), "// from disk").unwrap();

        let source = resolve_source(Some(&dir), &STAGE).unwrap();
        assert_eq!(source, "// from disk");

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_override_falls_back() {
        let dir = scratch_dir();
        let source = resolve_source(Some(&dir), &STAGE).unwrap();
        assert!(matches!(source, Cow::Borrowed("// embedded")));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn unreadable_override_is_an_error() {
        let dir = scratch_dir();
        // A directory where the file should be cannot be read as text
        std::fs::create_dir_all(dir.join("probe.wgsl")).unwrap();

        let err = resolve_source(Some(&dir), &STAGE).unwrap_err();
        assert!(matches!(err, RenderError::ShaderIo { .. }));

        std::fs::remove_dir_all(dir).ok();
    }
}
