//! Render targets.
//!
//! Every target is sized once from the initial viewport and never resized, with
//! the exception of [`ScratchDepth`], which is the single depth buffer shared by
//! the geometry pass and the IBL sub-renders.

use wgpu::{Device, TextureFormat};

use crate::RenderError;
use crate::texture::{RenderTexture, TextureHelper};

/// G-Buffer attachment formats, in `@location` order.
pub const GBUFFER_FORMATS: [TextureFormat; 5] = [
    TextureFormat::Rgba16Float, // position (xyz) + geometry flag (w)
    TextureFormat::Rgba16Float, // normal (xyz) + shininess (w)
    TextureFormat::Rgba8Unorm,  // albedo (rgb) + specular (a)
    TextureFormat::Rgba16Float, // emissive (rgb) + strength (a)
    TextureFormat::Rg16Float,   // roughness + metalness
];

pub const SSAO_FORMAT: TextureFormat = TextureFormat::R8Unorm;
pub const BRDF_LUT_FORMAT: TextureFormat = TextureFormat::Rg16Float;

/// Per-sample byte cost of a set of simultaneous colour attachments, using the
/// same alignment rules wgpu validates against.
pub fn color_attachment_bytes_per_sample(formats: &[TextureFormat]) -> u32 {
    formats.iter().fold(0, |total, format| {
        let cost = format.target_pixel_byte_cost().unwrap_or(0);
        let align = format.target_component_alignment().unwrap_or(1);
        total.div_ceil(align) * align + cost
    })
}

/// Fails when the device cannot bind `formats` as one set of colour attachments.
pub fn check_attachments(
    limits: &wgpu::Limits,
    label: &str,
    formats: &[TextureFormat],
) -> Result<(), RenderError> {
    if formats.len() as u32 > limits.max_color_attachments {
        return Err(RenderError::IncompleteTarget {
            label: label.to_string(),
            reason: format!(
                "{} attachments, device allows {}",
                formats.len(),
                limits.max_color_attachments
            ),
        });
    }

    let bytes = color_attachment_bytes_per_sample(formats);
    if bytes > limits.max_color_attachment_bytes_per_sample {
        return Err(RenderError::IncompleteTarget {
            label: label.to_string(),
            reason: format!(
                "{} bytes per sample, device allows {}",
                bytes, limits.max_color_attachment_bytes_per_sample
            ),
        });
    }

    Ok(())
}

pub struct GBuffer {
    pub position: RenderTexture,
    pub normal: RenderTexture,
    pub albedo: RenderTexture,
    pub emissive: RenderTexture,
    pub rough_metal: RenderTexture,
    complete: bool,
}

impl GBuffer {
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let complete = match check_attachments(&device.limits(), "G-Buffer", &GBUFFER_FORMATS) {
            Ok(()) => true,
            Err(err) => {
                log::error!("{}; deferred rendering disabled", err);
                false
            }
        };

        let make = |format, label| TextureHelper::create_color_target(device, width, height, format, label);

        Self {
            position: make(GBUFFER_FORMATS[0], "G-Buffer Position"),
            normal: make(GBUFFER_FORMATS[1], "G-Buffer Normal"),
            albedo: make(GBUFFER_FORMATS[2], "G-Buffer Albedo"),
            emissive: make(GBUFFER_FORMATS[3], "G-Buffer Emissive"),
            rough_metal: make(GBUFFER_FORMATS[4], "G-Buffer Roughness/Metalness"),
            complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn views(&self) -> [&wgpu::TextureView; 5] {
        [
            &self.position.view,
            &self.normal.view,
            &self.albedo.view,
            &self.emissive.view,
            &self.rough_metal.view,
        ]
    }

    /// Cleared to zero every frame, so untouched pixels read as background.
    pub fn color_attachments(&self) -> [Option<wgpu::RenderPassColorAttachment<'_>>; 5] {
        self.views().map(|view| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })
        })
    }
}

/// The one shared depth buffer. Call [`ScratchDepth::resize`] right before each
/// pass that attaches it; the storage is only reallocated when the size changes.
#[derive(Default)]
pub struct ScratchDepth {
    depth: Option<RenderTexture>,
}

impl ScratchDepth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.depth.as_ref().map(|d| (d.width(), d.height()))
    }

    pub fn needs_realloc(current: Option<(u32, u32)>, width: u32, height: u32) -> bool {
        current != Some((width.max(1), height.max(1)))
    }

    pub fn resize(&mut self, device: &Device, width: u32, height: u32) -> &wgpu::TextureView {
        if Self::needs_realloc(self.size(), width, height) {
            log::debug!("scratch depth {:?} -> {}x{}", self.size(), width, height);
            self.depth = None;
        }

        let depth = self.depth.get_or_insert_with(|| {
            TextureHelper::create_depth_texture(device, width, height, 1, "Scratch Depth")
        });
        &depth.view
    }
}

/// Forward-path colour and depth. Multisampled rendering resolves into `resolve`;
/// with MSAA off the pass writes `resolve` directly.
pub struct SceneTarget {
    msaa_color: Option<RenderTexture>,
    msaa_depth: Option<RenderTexture>,
    depth: RenderTexture,
    sample_count: u32,
}

impl SceneTarget {
    pub fn new(device: &Device, width: u32, height: u32, sample_count: u32) -> Self {
        let (msaa_color, msaa_depth) = if sample_count > 1 {
            (
                Some(TextureHelper::create_color_target_ms(
                    device,
                    width,
                    height,
                    TextureHelper::HDR_FORMAT,
                    sample_count,
                    "Scene MSAA Color",
                )),
                Some(TextureHelper::create_depth_texture(
                    device,
                    width,
                    height,
                    sample_count,
                    "Scene MSAA Depth",
                )),
            )
        } else {
            (None, None)
        };

        Self {
            msaa_color,
            msaa_depth,
            depth: TextureHelper::create_depth_texture(device, width, height, 1, "Scene Depth"),
            sample_count,
        }
    }

    pub fn sample_count(&self, msaa: bool) -> u32 {
        if msaa && self.msaa_color.is_some() {
            self.sample_count
        } else {
            1
        }
    }

    /// Colour attachment and depth view for this frame.
    pub fn attachments<'a>(
        &'a self,
        resolve: &'a wgpu::TextureView,
        msaa: bool,
    ) -> (wgpu::RenderPassColorAttachment<'a>, &'a wgpu::TextureView) {
        let clear = wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            store: wgpu::StoreOp::Store,
        };

        match (&self.msaa_color, &self.msaa_depth) {
            (Some(color), Some(depth)) if msaa => (
                wgpu::RenderPassColorAttachment {
                    view: &color.view,
                    resolve_target: Some(resolve),
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: clear.load,
                        store: wgpu::StoreOp::Discard,
                    },
                },
                &depth.view,
            ),
            _ => (
                wgpu::RenderPassColorAttachment {
                    view: resolve,
                    resolve_target: None,
                    depth_slice: None,
                    ops: clear,
                },
                &self.depth.view,
            ),
        }
    }
}

/// Post-process textures shared by both render paths.
pub struct PostTargets {
    /// Lit HDR scene: written by deferred lighting or resolved by the forward pass.
    pub hdr: RenderTexture,
    pub brightness: RenderTexture,
    pub ping_pong: [RenderTexture; 2],
    pub ssao_raw: RenderTexture,
    pub ssao_blurred: RenderTexture,
    pub composite: RenderTexture,
}

impl PostTargets {
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let hdr = |label| {
            TextureHelper::create_color_target(device, width, height, TextureHelper::HDR_FORMAT, label)
        };
        let ssao = |label| TextureHelper::create_color_target(device, width, height, SSAO_FORMAT, label);

        Self {
            hdr: hdr("HDR Scene"),
            brightness: hdr("Bloom Brightness"),
            ping_pong: [hdr("Bloom Ping"), hdr("Bloom Pong")],
            ssao_raw: ssao("SSAO Raw"),
            ssao_blurred: ssao("SSAO Blurred"),
            composite: TextureHelper::create_color_target(
                device,
                width,
                height,
                TextureHelper::LDR_FORMAT,
                "Composite",
            ),
        }
    }
}

pub fn clear_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassColorAttachment<'_> {
    wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        depth_slice: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            store: wgpu::StoreOp::Store,
        },
    }
}

pub fn clear_depth(view: &wgpu::TextureView) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0), // Clear to "Far" (1.0)
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gbuffer_needs_36_bytes_per_sample() {
        assert_eq!(color_attachment_bytes_per_sample(&GBUFFER_FORMATS), 36);
    }

    #[test]
    fn default_limits_reject_the_gbuffer() {
        // WebGPU defaults allow 32 bytes
        let err = check_attachments(&wgpu::Limits::default(), "G-Buffer", &GBUFFER_FORMATS);
        assert!(matches!(err, Err(RenderError::IncompleteTarget { .. })));
    }

    #[test]
    fn raised_limits_accept_the_gbuffer() {
        let limits = wgpu::Limits {
            max_color_attachment_bytes_per_sample: 64,
            ..wgpu::Limits::default()
        };
        assert!(check_attachments(&limits, "G-Buffer", &GBUFFER_FORMATS).is_ok());
    }

    #[test]
    fn too_many_attachments_is_incomplete() {
        let limits = wgpu::Limits {
            max_color_attachments: 4,
            max_color_attachment_bytes_per_sample: 64,
            ..wgpu::Limits::default()
        };
        assert!(check_attachments(&limits, "G-Buffer", &GBUFFER_FORMATS).is_err());
    }

    #[test]
    fn scratch_depth_reallocates_only_on_size_change() {
        assert!(ScratchDepth::needs_realloc(None, 32, 32));
        assert!(!ScratchDepth::needs_realloc(Some((32, 32)), 32, 32));
        assert!(ScratchDepth::needs_realloc(Some((128, 128)), 64, 64));
        // zero sizes clamp to 1
        assert!(!ScratchDepth::needs_realloc(Some((1, 1)), 0, 0));
    }
}
