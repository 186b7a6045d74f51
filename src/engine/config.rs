//! Viewer configuration (RON on disk, defaults in code).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::animation_loop::MotionMode;
use crate::engine::ecs::system::texture_system::TextureLoadMode;
use crate::engine::populate::PanoramaScene;

/// Errors that can occur when loading, saving, or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    ReadError(#[source] std::io::Error),

    #[error("failed to write config: {0}")]
    WriteError(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] ron::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "panorama-viewer".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Image paths resolve against the working directory, then the crate root.
/// `assets/img/` ships placeholder images for every default path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanoramaConfig {
    pub scenes: Vec<PanoramaScene>,
    pub cloud_texture: String,
    pub start_index: usize,
}

impl Default for PanoramaConfig {
    fn default() -> Self {
        Self {
            scenes: PanoramaScene::defaults(),
            cloud_texture: DEFAULT_CLOUD_TEXTURE.to_string(),
            start_index: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountainConfig {
    pub cloud_texture: String,
}

impl Default for MountainConfig {
    fn default() -> Self {
        Self {
            cloud_texture: DEFAULT_CLOUD_TEXTURE.to_string(),
        }
    }
}

pub const DEFAULT_CLOUD_TEXTURE: &str = "assets/img/cloud.png";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub panorama: PanoramaConfig,
    pub mountain: MountainConfig,
    pub motion: MotionMode,
    pub textures: TextureLoadMode,
    /// Placement seed. `None` draws a random seed at startup.
    pub seed: Option<u64>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            panorama: PanoramaConfig::default(),
            mountain: MountainConfig::default(),
            motion: MotionMode::PerFrame,
            textures: TextureLoadMode::Background,
            seed: None,
            log_level: String::new(),
        }
    }
}

impl Config {
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = ron::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_ron_str(&text)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(ConfigError::SerializeError)?;
        std::fs::write(path, text).map_err(ConfigError::WriteError)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self.panorama.scenes.is_empty() {
            return Err(ConfigError::Invalid(
                "panorama.scenes must list at least one scene".to_string(),
            ));
        }
        if self.panorama.start_index >= self.panorama.scenes.len() {
            return Err(ConfigError::Invalid(format!(
                "panorama.start_index {} out of range (have {} scenes)",
                self.panorama.start_index,
                self.panorama.scenes.len()
            )));
        }
        if let MotionMode::Timed { reference_hz } = self.motion {
            if !(reference_hz.is_finite() && reference_hz > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "motion reference_hz must be positive, got {reference_hz}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_four_scenes() {
        let c = Config::default();
        assert_eq!(c.panorama.scenes.len(), 4);
        assert_eq!(c.panorama.scenes[1].rotation_y_deg, 90.0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let c = Config::from_ron_str("(seed: Some(7), motion: Timed(reference_hz: 60.0))").unwrap();
        assert_eq!(c.seed, Some(7));
        assert_eq!(c.motion, MotionMode::Timed { reference_hz: 60.0 });
        assert_eq!(c.window, WindowConfig::default());
        assert_eq!(c.panorama.scenes.len(), 4);
    }

    #[test]
    fn empty_scene_list_is_rejected() {
        let err = Config::from_ron_str("(panorama: (scenes: []))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn bad_syntax_is_a_parse_error() {
        let err = Config::from_ron_str("(seed: ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.ron");

        let mut c = Config::default();
        c.seed = Some(99);
        c.panorama.start_index = 2;
        c.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, c);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_)));
    }
}
