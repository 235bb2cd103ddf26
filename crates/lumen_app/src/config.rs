use std::path::{Path, PathBuf};

use lumen_renderer::{DEFAULT_EXPOSURE_INDEX, EXPOSURE_VALUES, RenderPath, RendererSettings};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid viewer config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathChoice {
    #[default]
    Deferred,
    Forward,
}

impl From<PathChoice> for RenderPath {
    fn from(choice: PathChoice) -> Self {
        match choice {
            PathChoice::Deferred => RenderPath::Deferred,
            PathChoice::Forward => RenderPath::Forward,
        }
    }
}

/// Viewer options, read from an optional JSON file. Missing keys keep their defaults.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub width: u32,
    pub height: u32,
    pub environment_map: PathBuf,
    pub model: PathBuf,
    /// Falls back to a generated sphere when absent.
    pub lamp_mesh: Option<PathBuf>,
    pub exposure_index: usize,
    pub render_path: PathChoice,
    pub shader_dir: Option<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            environment_map: PathBuf::from("assets/images/grand_canyon.hdr"),
            model: PathBuf::from("assets/bunny.obj"),
            lamp_mesh: None,
            exposure_index: DEFAULT_EXPOSURE_INDEX,
            render_path: PathChoice::Deferred,
            shader_dir: None,
        }
    }
}

impl ViewerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(text)?;
        if config.exposure_index >= EXPOSURE_VALUES.len() {
            log::warn!(
                "exposure index {} out of range, using {}",
                config.exposure_index,
                DEFAULT_EXPOSURE_INDEX
            );
            config.exposure_index = DEFAULT_EXPOSURE_INDEX;
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn renderer_settings(&self) -> RendererSettings {
        RendererSettings {
            width: self.width,
            height: self.height,
            path: self.render_path.into(),
            shader_dir: self.shader_dir.clone(),
            ..RendererSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = ViewerConfig::from_json("{}").unwrap();
        assert_eq!(config.width, 1280);
        assert_eq!(config.render_path, PathChoice::Deferred);
        assert_eq!(config.environment_map, PathBuf::from("assets/images/grand_canyon.hdr"));
    }

    #[test]
    fn partial_file_overrides_named_keys() {
        let config = ViewerConfig::from_json(r#"{ "width": 800, "render_path": "forward" }"#).unwrap();
        assert_eq!(config.width, 800);
        assert_eq!(config.height, 720);

        let settings = config.renderer_settings();
        assert_eq!(settings.path, RenderPath::Forward);
        assert_eq!(settings.msaa_samples, 4);
    }

    #[test]
    fn out_of_range_exposure_falls_back() {
        let config = ViewerConfig::from_json(r#"{ "exposure_index": 42 }"#).unwrap();
        assert_eq!(config.exposure_index, DEFAULT_EXPOSURE_INDEX);
    }

    #[test]
    fn unknown_path_is_rejected() {
        assert!(ViewerConfig::from_json(r#"{ "render_path": "raytraced" }"#).is_err());
    }
}
