//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `MOONWALK_*` environment variables.
//! Configuration is read once at startup and never mutated afterwards.

pub mod error;
pub mod selection;


pub use error::ConfigError;
pub use selection::{Selection, SelectionPolicy, list_candidates, resolve_checkpoint, select_file};

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::constants::{DEFAULT_CLIP_LEN, DEFAULT_MAX_UPLOAD_BYTES, UPLOAD_FILENAME};

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `MOONWALK_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `5000`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Accelerator ordinal used when a GPU backend is compiled in. Default: `0`.
    pub device_index: usize,

    /// Clip duration in seconds. Default: `2.0`.
    pub clip_len: f32,

    /// Directory scanned for grounding checkpoints. Default: `./ckpts`.
    pub checkpoint_dir: PathBuf,

    /// Explicit checkpoint file (skips directory resolution).
    pub checkpoint_path: Option<PathBuf>,

    /// Directory scanned by offline extraction. Default: `./footages`.
    pub video_dir: PathBuf,

    /// Directory holding the embedding slots and uploads. Default: `./embeddings`.
    pub embeddings_dir: PathBuf,

    /// CLIP weights directory (`model.safetensors` + `tokenizer.json`).
    /// Unset runs the extractor in stub mode.
    pub clip_model_path: Option<PathBuf>,

    /// ffmpeg executable used for frame sampling. Default: `ffmpeg`.
    pub ffmpeg_path: PathBuf,

    /// Extensions accepted when scanning `video_dir`. Default: `["mp4"]`.
    pub video_extensions: Vec<String>,

    /// Policy applied when several checkpoints or videos match.
    pub selection_policy: SelectionPolicy,

    /// Max accepted upload size in bytes. Default: 1 GiB.
    pub max_upload_bytes: usize,

    /// Also write each query's text embedding to the "txt" slot. Default: `true`.
    pub persist_text: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            device_index: 0,
            clip_len: DEFAULT_CLIP_LEN,
            checkpoint_dir: PathBuf::from("./ckpts"),
            checkpoint_path: None,
            video_dir: PathBuf::from("./footages"),
            embeddings_dir: PathBuf::from("./embeddings"),
            clip_model_path: None,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            video_extensions: vec!["mp4".to_string()],
            selection_policy: SelectionPolicy::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            persist_text: true,
        }
    }
}

impl Config {
    pub const ENV_PORT: &'static str = "MOONWALK_PORT";
    const ENV_BIND_ADDR: &'static str = "MOONWALK_BIND_ADDR";
    const ENV_DEVICE_INDEX: &'static str = "MOONWALK_DEVICE_INDEX";
    const ENV_CLIP_LEN: &'static str = "MOONWALK_CLIP_LEN";
    const ENV_CHECKPOINT_DIR: &'static str = "MOONWALK_CHECKPOINT_DIR";
    const ENV_CHECKPOINT_PATH: &'static str = "MOONWALK_CHECKPOINT_PATH";
    const ENV_VIDEO_DIR: &'static str = "MOONWALK_VIDEO_DIR";
    const ENV_EMBEDDINGS_DIR: &'static str = "MOONWALK_EMBEDDINGS_DIR";
    const ENV_CLIP_MODEL_PATH: &'static str = "MOONWALK_CLIP_MODEL_PATH";
    const ENV_FFMPEG: &'static str = "MOONWALK_FFMPEG";
    const ENV_VIDEO_EXTENSIONS: &'static str = "MOONWALK_VIDEO_EXTENSIONS";
    const ENV_SELECTION_POLICY: &'static str = "MOONWALK_SELECTION_POLICY";
    const ENV_MAX_UPLOAD_BYTES: &'static str = "MOONWALK_MAX_UPLOAD_BYTES";
    const ENV_PERSIST_TEXT: &'static str = "MOONWALK_PERSIST_TEXT";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let device_index =
            Self::parse_number_from_env(Self::ENV_DEVICE_INDEX, defaults.device_index)?;
        let clip_len = Self::parse_clip_len_from_env(defaults.clip_len)?;
        let checkpoint_dir =
            Self::parse_path_from_env(Self::ENV_CHECKPOINT_DIR, defaults.checkpoint_dir);
        let checkpoint_path = Self::parse_optional_path_from_env(Self::ENV_CHECKPOINT_PATH);
        let video_dir = Self::parse_path_from_env(Self::ENV_VIDEO_DIR, defaults.video_dir);
        let embeddings_dir =
            Self::parse_path_from_env(Self::ENV_EMBEDDINGS_DIR, defaults.embeddings_dir);
        let clip_model_path = Self::parse_optional_path_from_env(Self::ENV_CLIP_MODEL_PATH);
        let ffmpeg_path = Self::parse_path_from_env(Self::ENV_FFMPEG, defaults.ffmpeg_path);
        let video_extensions = Self::parse_list_from_env(
            Self::ENV_VIDEO_EXTENSIONS,
            defaults.video_extensions,
        );
        let selection_policy = match env::var(Self::ENV_SELECTION_POLICY) {
            Ok(value) => value.parse()?,
            Err(_) => defaults.selection_policy,
        };
        let max_upload_bytes =
            Self::parse_number_from_env(Self::ENV_MAX_UPLOAD_BYTES, defaults.max_upload_bytes)?;
        let persist_text = Self::parse_bool_from_env(Self::ENV_PERSIST_TEXT, defaults.persist_text);

        Ok(Self {
            port,
            bind_addr,
            device_index,
            clip_len,
            checkpoint_dir,
            checkpoint_path,
            video_dir,
            embeddings_dir,
            clip_model_path,
            ffmpeg_path,
            video_extensions,
            selection_policy,
            max_upload_bytes,
            persist_text,
        })
    }

    /// Validates paths and basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.clip_len.is_finite() && self.clip_len > 0.0) {
            return Err(ConfigError::InvalidClipLen {
                value: self.clip_len.to_string(),
            });
        }

        if self.embeddings_dir.exists() && !self.embeddings_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.embeddings_dir.clone(),
            });
        }

        if let Some(ref path) = self.checkpoint_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        if let Some(ref path) = self.clip_model_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Where an uploaded video is saved before extraction.
    pub fn upload_path(&self) -> PathBuf {
        self.embeddings_dir.join(UPLOAD_FILENAME)
    }

    /// Resolves the grounding checkpoint for this configuration.
    pub fn resolve_checkpoint(&self) -> Result<PathBuf, ConfigError> {
        resolve_checkpoint(
            self.checkpoint_path.as_deref(),
            &self.checkpoint_dir,
            self.selection_policy,
        )
    }

    /// Returns `true` if the extractor will run without model weights.
    pub fn extractor_is_stub(&self) -> bool {
        self.clip_model_path
            .as_deref()
            .is_none_or(|p| p.as_os_str().is_empty())
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_clip_len_from_env(default: f32) -> Result<f32, ConfigError> {
        match env::var(Self::ENV_CLIP_LEN) {
            Ok(value) => match value.trim().parse::<f32>() {
                Ok(clip_len) if clip_len.is_finite() && clip_len > 0.0 => Ok(clip_len),
                _ => Err(ConfigError::InvalidClipLen { value }),
            },
            Err(_) => Ok(default),
        }
    }

    fn parse_number_from_env(name: &'static str, default: usize) -> Result<usize, ConfigError> {
        match env::var(name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { name, value }),
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn parse_list_from_env(var_name: &str, default: Vec<String>) -> Vec<String> {
        let parsed: Vec<String> = env::var(var_name)
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().trim_start_matches('.').to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if parsed.is_empty() { default } else { parsed }
    }

    fn parse_bool_from_env(var_name: &str, default: bool) -> bool {
        match env::var(var_name) {
            Ok(v) => match v.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => default,
            },
            Err(_) => default,
        }
    }
}
