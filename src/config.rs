//! Configuration management for MJPEG-over-HTTP streaming

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete MJPEG-over-HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, rename = "mjpeg-http")]
    pub mjpeg_http: MjpegHttpConfig,
}

/// MJPEG-over-HTTP streaming configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MjpegHttpConfig {
    /// TCP listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Camera frame-buffer queue configuration
    #[serde(default)]
    pub camera: CameraConfig,

    /// Per-session streaming configuration
    #[serde(default)]
    pub stream: StreamConfig,
}

/// TCP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port (bound on all interfaces; 0 = ephemeral)
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Camera frame-buffer queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Frame width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Frame height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Frames per second
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Capacity of one driver segment buffer (bytes)
    #[serde(default = "default_segment_len")]
    pub segment_len: usize,

    /// Number of segment buffers in the driver's pool
    #[serde(default = "default_pool")]
    pub pool: usize,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            segment_len: default_segment_len(),
            pool: default_pool(),
        }
    }
}

/// Per-session streaming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Frame buffer capacity — largest reassembled frame accepted (bytes)
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,

    /// Delay between frames on the wire (milliseconds)
    #[serde(default = "default_frame_delay_ms")]
    pub frame_delay_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_frame_len: default_max_frame_len(),
            frame_delay_ms: default_frame_delay_ms(),
        }
    }
}

impl StreamConfig {
    /// Inter-frame delay as a `Duration`
    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }
}

// Default value functions
fn default_port() -> u16 {
    8080
}
fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    480
}
fn default_fps() -> u32 {
    15
}
fn default_segment_len() -> usize {
    4096
}
fn default_pool() -> usize {
    3
}
fn default_max_frame_len() -> usize {
    40_000
}
fn default_frame_delay_ms() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mjpeg_http: MjpegHttpConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates configuration
    fn validate(&self) -> Result<(), ConfigError> {
        let cfg = &self.mjpeg_http;

        // Validate camera geometry
        if cfg.camera.width == 0 || cfg.camera.height == 0 {
            return Err(ConfigError::Invalid(
                "camera: width and height must be > 0".to_string(),
            ));
        }

        if cfg.camera.width % 8 != 0 || cfg.camera.height % 8 != 0 {
            return Err(ConfigError::Invalid(
                "camera: width and height must be multiples of 8".to_string(),
            ));
        }

        // Validate FPS
        if cfg.camera.fps == 0 || cfg.camera.fps > 120 {
            return Err(ConfigError::Invalid(format!(
                "camera: FPS must be between 1 and 120, got {}",
                cfg.camera.fps
            )));
        }

        // Validate segment geometry
        if cfg.camera.segment_len < 512 {
            return Err(ConfigError::Invalid(format!(
                "camera: segment_len must be at least 512, got {}",
                cfg.camera.segment_len
            )));
        }

        if cfg.camera.pool == 0 || cfg.camera.pool > 64 {
            return Err(ConfigError::Invalid(format!(
                "camera: pool must be between 1 and 64, got {}",
                cfg.camera.pool
            )));
        }

        // Validate frame buffer capacity
        if cfg.stream.max_frame_len < cfg.camera.segment_len {
            return Err(ConfigError::Invalid(format!(
                "stream: max_frame_len ({}) must be at least one segment ({})",
                cfg.stream.max_frame_len, cfg.camera.segment_len
            )));
        }

        if cfg.stream.frame_delay_ms > 1000 {
            return Err(ConfigError::Invalid(format!(
                "stream: frame_delay_ms must be at most 1000, got {}",
                cfg.stream.frame_delay_ms
            )));
        }

        Ok(())
    }

    /// Saves configuration to TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
