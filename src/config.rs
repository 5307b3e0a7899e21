//! Configuration management for CrabPush
//!
//! Holds the push destination and pusher presets, the control channel
//! endpoint and heartbeat, and the template upload endpoint. Loaded from a
//! TOML file, optionally layered with `CRABPUSH__SECTION__KEY` environment
//! overrides.

use crate::errors::PushError;
use crate::pusher::VideoQuality;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrabPushConfig {
    pub push: PushConfig,
    pub channel: ChannelConfig,
    pub upload: UploadConfig,
}

/// Pusher settings applied on every `start()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushConfig {
    /// Signed ingest URL handed to the vendor SDK
    pub destination_url: String,
    /// Element id the SDK renders the local preview into
    pub render_view: String,
    pub video_quality: VideoQuality,
    pub video_fps: u32,
    /// Mute the local preview so the operator does not hear themselves
    pub mute_local_preview: bool,
}

/// Control WebSocket settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub url: String,
    pub heartbeat_interval_ms: u64,
    pub message_log_capacity: usize,
    /// Parse `move` messages into guidance; otherwise log frames verbatim
    pub guidance_enabled: bool,
}

/// Backend upload settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    pub endpoint: String,
    /// Playback URL of the stream the template belongs to
    pub stream_url: String,
    pub max_dimension: u32,
    /// Lossy re-encode quality (0.0-1.0]
    pub jpeg_quality: f32,
    pub request_timeout_ms: u64,
}

impl Default for CrabPushConfig {
    fn default() -> Self {
        Self {
            push: PushConfig {
                destination_url: "webrtc://push.example.com/live/stream".to_string(),
                render_view: "videoContainer".to_string(),
                video_quality: VideoQuality::P480,
                video_fps: 25,
                mute_local_preview: true,
            },
            channel: ChannelConfig {
                url: "wss://push.example.com/ws".to_string(),
                heartbeat_interval_ms: 5000,
                message_log_capacity: 10,
                guidance_enabled: true,
            },
            upload: UploadConfig {
                endpoint: "https://push.example.com/push".to_string(),
                stream_url: "http://play.example.com/live/stream.flv".to_string(),
                max_dimension: 1280,
                jpeg_quality: 0.7,
                request_timeout_ms: 15_000,
            },
        }
    }
}

impl CrabPushConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PushError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| PushError::Config(format!("Failed to read config file: {}", e)))?;

        let config: CrabPushConfig = toml::from_str(&contents)
            .map_err(|e| PushError::Config(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Defaults, then the optional file, then `CRABPUSH__<SECTION>__<KEY>` variables.
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, PushError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        log::debug!("Loading layered configuration from: {}", path_str);

        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| PushError::Config(format!("Failed to seed defaults: {}", e)))?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::File::with_name(&path_str)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix("CRABPUSH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| PushError::Config(format!("Failed to build config: {}", e)))?;

        let config: CrabPushConfig = settings
            .try_deserialize()
            .map_err(|e| PushError::Config(format!("Failed to deserialize config: {}", e)))?;

        config.validate().map_err(PushError::Config)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PushError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    PushError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| PushError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| PushError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabpush.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !self.push.destination_url.contains("://") {
            return Err("Push destination must be a URL".to_string());
        }
        if self.push.render_view.trim().is_empty() {
            return Err("Render view id must not be empty".to_string());
        }
        if self.push.video_fps == 0 || self.push.video_fps > 60 {
            return Err("Video FPS must be between 1 and 60".to_string());
        }

        if !(self.channel.url.starts_with("ws://") || self.channel.url.starts_with("wss://")) {
            return Err("Control channel URL must use ws:// or wss://".to_string());
        }
        if self.channel.heartbeat_interval_ms == 0 {
            return Err("Heartbeat interval must be greater than 0".to_string());
        }
        if self.channel.message_log_capacity == 0 {
            return Err("Message log capacity must be greater than 0".to_string());
        }

        if !(self.upload.endpoint.starts_with("http://")
            || self.upload.endpoint.starts_with("https://"))
        {
            return Err("Upload endpoint must use http:// or https://".to_string());
        }
        if self.upload.max_dimension == 0 {
            return Err("Max dimension must be greater than 0".to_string());
        }
        if !(self.upload.jpeg_quality > 0.0 && self.upload.jpeg_quality <= 1.0) {
            return Err("JPEG quality must be in (0.0, 1.0]".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CrabPushConfig::default();
        assert_eq!(config.channel.heartbeat_interval_ms, 5000);
        assert_eq!(config.channel.message_log_capacity, 10);
        assert_eq!(config.push.video_fps, 25);
        assert_eq!(config.push.video_quality, VideoQuality::P480);
        assert_eq!(config.upload.max_dimension, 1280);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut bad_channel = CrabPushConfig::default();
        bad_channel.channel.url = "https://not-a-socket".to_string();
        assert!(bad_channel.validate().is_err());

        let mut bad_quality = CrabPushConfig::default();
        bad_quality.upload.jpeg_quality = 1.5;
        assert!(bad_quality.validate().is_err());

        let mut bad_fps = CrabPushConfig::default();
        bad_fps.push.video_fps = 0;
        assert!(bad_fps.validate().is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("crabpush.toml");

        let mut config = CrabPushConfig::default();
        config.channel.url = "ws://127.0.0.1:9000/ws".to_string();
        config.save_to_file(&config_path).unwrap();

        let loaded = CrabPushConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_toml_format() {
        let toml_string = toml::to_string_pretty(&CrabPushConfig::default()).unwrap();

        assert!(toml_string.contains("[push]"));
        assert!(toml_string.contains("[channel]"));
        assert!(toml_string.contains("[upload]"));
        assert!(toml_string.contains("video_quality = \"480p\""));
        assert!(toml_string.contains("heartbeat_interval_ms"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = CrabPushConfig::load_from_file("nonexistent_crabpush.toml");
        assert_eq!(result.unwrap().channel.heartbeat_interval_ms, 5000);
    }

    #[test]
    fn test_layered_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("layered.toml");
        fs::write(
            &config_path,
            "[channel]\nurl = \"ws://localhost:7000/ws\"\nheartbeat_interval_ms = 2500\nmessage_log_capacity = 5\nguidance_enabled = false\n",
        )
        .unwrap();

        let config = CrabPushConfig::load_layered(&config_path).unwrap();
        assert_eq!(config.channel.url, "ws://localhost:7000/ws");
        assert_eq!(config.channel.heartbeat_interval_ms, 2500);
        assert!(!config.channel.guidance_enabled);
        assert_eq!(config.push.video_fps, 25);
    }
}
