use std::path::PathBuf;

/// Discrete exposure steps cycled by the viewer.
pub const EXPOSURE_VALUES: [f32; 7] = [0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0];
pub const DEFAULT_EXPOSURE_INDEX: usize = 3;

bitflags::bitflags! {
    /// Runtime switches flipped by the host between frames.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RenderToggles: u16 {
        const BLOOM       = 1 << 0;
        const MSAA        = 1 << 1;
        const FXAA        = 1 << 2;
        const BLINN_PHONG = 1 << 3;
        const HDR         = 1 << 4;
        const GAMMA       = 1 << 5;
        const SSAO        = 1 << 6;
        const PBR         = 1 << 7;
        const IBL         = 1 << 8;
    }
}

impl Default for RenderToggles {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderPath {
    #[default]
    Deferred,
    Forward,
}

/// Immutable snapshot of the toggles taken at the start of a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameConfig {
    pub path: RenderPath,
    pub bloom: bool,
    pub msaa: bool,
    pub fxaa: bool,
    pub blinn_phong: bool,
    pub hdr: bool,
    pub gamma: bool,
    pub ssao: bool,
    pub pbr: bool,
    pub ibl: bool,
    pub exposure: f32,
}

impl FrameConfig {
    pub fn snapshot(path: RenderPath, toggles: RenderToggles, exposure: f32) -> Self {
        Self {
            path,
            bloom: toggles.contains(RenderToggles::BLOOM),
            msaa: toggles.contains(RenderToggles::MSAA),
            fxaa: toggles.contains(RenderToggles::FXAA),
            blinn_phong: toggles.contains(RenderToggles::BLINN_PHONG),
            hdr: toggles.contains(RenderToggles::HDR),
            gamma: toggles.contains(RenderToggles::GAMMA),
            ssao: toggles.contains(RenderToggles::SSAO),
            pbr: toggles.contains(RenderToggles::PBR),
            ibl: toggles.contains(RenderToggles::IBL),
            exposure,
        }
    }
}

/// Renderer construction settings.
#[derive(Clone, Debug)]
pub struct RendererSettings {
    /// Fixed viewport of every internal render target.
    pub width: u32,
    pub height: u32,
    pub msaa_samples: u32,
    pub path: RenderPath,
    /// Directory searched for `<name>.wgsl` overrides.
    pub shader_dir: Option<PathBuf>,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            msaa_samples: 4,
            path: RenderPath::Deferred,
            shader_dir: None,
        }
    }
}

/// Index of the exposure after `index`, wrapping at the end of the list.
pub fn next_exposure_index(index: usize) -> usize {
    (index + 1) % EXPOSURE_VALUES.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_exposure_is_one() {
        assert_eq!(EXPOSURE_VALUES[DEFAULT_EXPOSURE_INDEX], 1.0);
    }

    #[test]
    fn exposure_cycle_wraps() {
        assert_eq!(next_exposure_index(3), 4);
        assert_eq!(next_exposure_index(EXPOSURE_VALUES.len() - 1), 0);
    }

    #[test]
    fn snapshot_reads_each_flag() {
        let toggles = RenderToggles::all() - RenderToggles::BLOOM - RenderToggles::IBL;
        let config = FrameConfig::snapshot(RenderPath::Deferred, toggles, 2.0);

        assert!(!config.bloom);
        assert!(!config.ibl);
        assert!(config.ssao && config.pbr && config.fxaa);
        assert_eq!(config.exposure, 2.0);
    }

    #[test]
    fn snapshot_is_detached_from_later_toggles() {
        let mut toggles = RenderToggles::default();
        let config = FrameConfig::snapshot(RenderPath::Forward, toggles, 1.0);
        toggles.toggle(RenderToggles::MSAA);

        assert!(config.msaa);
        assert!(!toggles.contains(RenderToggles::MSAA));
    }
}
