// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// Everything the bring-up sequence would otherwise hardcode (window title and
// size, shader paths, validation, clear colour, fence timeout) lives here.
// Missing files and missing keys fall back to defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub shaders: ShaderConfig,
    pub graphics: GraphicsConfig,
    pub debug: DebugConfig,

    /// File this configuration was read from; `None` when defaults were used
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Window settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan Intro".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

/// Compiled SPIR-V shader locations, relative to the working directory
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex: PathBuf::from("shaders/triangle.vert.spv"),
            fragment: PathBuf::from("shaders/triangle.frag.spv"),
        }
    }
}

/// Graphics settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Application name reported to the driver
    pub app_name: String,
    pub clear_color: [f32; 4],
    /// How long a frame may wait on the in-flight fence. Absent means forever.
    pub fence_timeout_ms: Option<u64>,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            app_name: "Hello Triangle".to_string(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            fence_timeout_ms: None,
        }
    }
}

/// Debug settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Overrides the build-profile default (on for debug builds).
    pub validation: Option<bool>,
    pub log_level: String,
    pub log_to_file: bool,
    pub log_file: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation: None,
            log_level: "info".to_string(),
            log_to_file: false,
            log_file: PathBuf::from("vulkan_debug.log"),
        }
    }
}

impl Config {
    /// Load configuration from a specific path.
    ///
    /// A missing file is not an error; a file that exists but does not parse is.
    /// Runs before the logger is initialised and must not log.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.source = Some(path.to_path_buf());

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Whether the validation layer and debug messenger should be set up.
    pub fn validation_enabled(&self) -> bool {
        self.debug.validation.unwrap_or(cfg!(debug_assertions))
    }

    pub fn fence_timeout(&self) -> Option<Duration> {
        self.graphics.fence_timeout_ms.map(Duration::from_millis)
    }

    /// `None` when `debug.log_level` is not a level name
    pub fn log_level(&self) -> Option<log::LevelFilter> {
        self.debug.log_level.parse().ok()
    }
}
