//! Viewer configuration (`teapot-viewer.toml`)
//!
//! Every section and field has a default, so an empty or partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ViewerError};
use crate::viewer::params::{ParameterRecord, ShadingMode, TessellationLevel};

pub const DEFAULT_CONFIG_FILE: &str = "teapot-viewer.toml";
pub const CONFIG_ENV_VAR: &str = "TEAPOT_VIEWER_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub teapot: TeapotConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_true")]
    pub vsync: bool,
}

/// Colors are `0xRRGGBB` in sRGB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default = "default_background")]
    pub background: u32,
    #[serde(default = "default_ambient")]
    pub ambient: u32,
    #[serde(default = "default_light_color")]
    pub light_color: u32,
    #[serde(default = "default_light_intensity")]
    pub light_intensity: f32,
    #[serde(default = "default_light_position")]
    pub light_position: [f32; 3],
    #[serde(default = "default_camera_position")]
    pub camera_position: [f32; 3],
    /// Vertical field of view in degrees.
    #[serde(default = "default_fov")]
    pub fov: f32,
}

/// Initial panel values plus the fixed overall size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeapotConfig {
    #[serde(default = "default_size")]
    pub size: f32,
    #[serde(default = "default_tessellation")]
    pub tessellation: u32,
    #[serde(default = "default_true")]
    pub bottom: bool,
    #[serde(default = "default_true")]
    pub lid: bool,
    #[serde(default = "default_true")]
    pub body: bool,
    #[serde(default)]
    pub fit_lid: bool,
    #[serde(default)]
    pub original_basis: bool,
    #[serde(default)]
    pub shading: ShadingMode,
}

fn default_title() -> String {
    "Teapot Viewer".to_string()
}
fn default_width() -> u32 {
    1600
}
fn default_height() -> u32 {
    900
}
fn default_true() -> bool {
    true
}

fn default_background() -> u32 {
    0xAAAAAA
}
fn default_ambient() -> u32 {
    0x333333
}
fn default_light_color() -> u32 {
    0xFFFFFF
}
fn default_light_intensity() -> f32 {
    1.0
}
fn default_light_position() -> [f32; 3] {
    [0.32, 0.39, 0.7]
}
fn default_camera_position() -> [f32; 3] {
    [-600.0, 550.0, 1300.0]
}
fn default_fov() -> f32 {
    45.0
}

fn default_size() -> f32 {
    300.0
}
fn default_tessellation() -> u32 {
    15
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            width: default_width(),
            height: default_height(),
            vsync: default_true(),
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background: default_background(),
            ambient: default_ambient(),
            light_color: default_light_color(),
            light_intensity: default_light_intensity(),
            light_position: default_light_position(),
            camera_position: default_camera_position(),
            fov: default_fov(),
        }
    }
}

impl Default for TeapotConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            tessellation: default_tessellation(),
            bottom: true,
            lid: true,
            body: true,
            fit_lid: false,
            original_basis: false,
            shading: ShadingMode::default(),
        }
    }
}

impl TeapotConfig {
    /// The starting parameter record; the file is user input, so the level is checked.
    pub fn parameters(&self) -> Result<ParameterRecord> {
        Ok(ParameterRecord {
            tessellation: TessellationLevel::try_new(self.tessellation)?,
            bottom: self.bottom,
            lid: self.lid,
            body: self.body,
            fit_lid: self.fit_lid,
            original_basis: self.original_basis,
            shading: self.shading,
        })
    }
}

impl Config {
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| ViewerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads from an explicit path, which must exist, or from the default
    /// file in the working directory, which may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let config = Self::parse(&text, &path)?;
                tracing::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ViewerError::ConfigIo { path, source }),
        }
    }

    /// First CLI argument, then the environment variable, then the default file.
    pub fn path_from_env() -> Option<PathBuf> {
        std::env::args_os()
            .nth(1)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR))
            .map(PathBuf::from)
    }
}
