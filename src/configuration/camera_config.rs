use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error_handling::types::ConfigError;

const DEFAULT_CAMERA_URL: &str = "/dev/video98";
const DEFAULT_LOG_FILE: &str = "./ffmpeg.log";
const DEFAULT_CLIPS_DIR: &str = "./clips";

/// Camera-side configuration read from the `key:value` camera file.
///
/// Recognised keys are `camera_url`, `ffmpeg_log_file` and
/// `recording_clips_dir`. Anything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConfig {
    /// Input handed to the recorder (a device path or a URL).
    pub camera_url: String,
    /// File receiving the recorder's diagnostic output.
    pub ffmpeg_log_file: PathBuf,
    /// Root of the recorded clip tree.
    pub recording_clips_dir: PathBuf,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            camera_url: DEFAULT_CAMERA_URL.to_string(),
            ffmpeg_log_file: PathBuf::from(DEFAULT_LOG_FILE),
            recording_clips_dir: PathBuf::from(DEFAULT_CLIPS_DIR),
        }
    }
}

impl CameraConfig {
    /// Loads the camera file, falling back to the built-in defaults as a whole
    /// when the file is unreadable, malformed or incomplete.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(config) => {
                info!("Camera configuration loaded from {}", path.display());
                config
            }
            Err(e) => {
                warn!(
                    "Using default camera configuration ({}): {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parses the `key:value` format.
    ///
    /// Each line is split at its first `:` so values such as URLs keep their
    /// own colons. Blank lines and `#` comments are skipped.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut camera_url = None;
        let mut ffmpeg_log_file = None;
        let mut recording_clips_dir = None;

        for (idx, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| ConfigError::MalformedLine(format!("line {}: {}", idx + 1, raw)))?;
            let value = value.trim();

            match key.trim() {
                "camera_url" => camera_url = Some(value.to_string()),
                "ffmpeg_log_file" => ffmpeg_log_file = Some(PathBuf::from(value)),
                "recording_clips_dir" => recording_clips_dir = Some(PathBuf::from(value)),
                other => debug!("Ignoring unknown camera configuration key: {}", other),
            }
        }

        Ok(Self {
            camera_url: camera_url.ok_or_else(|| ConfigError::MissingKey("camera_url".into()))?,
            ffmpeg_log_file: ffmpeg_log_file
                .ok_or_else(|| ConfigError::MissingKey("ffmpeg_log_file".into()))?,
            recording_clips_dir: recording_clips_dir
                .ok_or_else(|| ConfigError::MissingKey("recording_clips_dir".into()))?,
        })
    }
}
