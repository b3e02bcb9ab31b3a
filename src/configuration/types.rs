use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error_handling::types::ConfigError;

/// Server-level settings, read from an optional TOML file.
///
/// Every field has a default so an empty file (or no file at all) yields a
/// working configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address the HTTP server binds to.
    pub bind_address: String,
    /// Port the HTTP server listens on.
    pub port: u16,
    /// URL of the upstream multipart MJPEG source.
    pub source_url: String,
    /// Directory served under `/`.
    pub static_dir: PathBuf,
    /// Directory whose filesystem is reported by `/statistics`.
    /// Falls back to the clips directory when unset.
    pub statistics_dir: Option<PathBuf>,
    pub connector: ConnectorSettings,
    pub stream: StreamSettings,
    pub recorder: RecorderSettings,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8001,
            source_url: "http://localhost:8080".to_string(),
            static_dir: PathBuf::from("./static"),
            statistics_dir: None,
            connector: ConnectorSettings::default(),
            stream: StreamSettings::default(),
            recorder: RecorderSettings::default(),
        }
    }
}

impl ServerSettings {
    /// Parses settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let settings: ServerSettings = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.source_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "source_url must not be empty".to_string(),
            ));
        }
        for (name, value) in [
            ("connector.initial_backoff_ms", self.connector.initial_backoff_ms),
            ("stream.idle_poll_ms", self.stream.idle_poll_ms),
            ("stream.dedup_poll_ms", self.stream.dedup_poll_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be at least 1",
                    name
                )));
            }
        }
        if self.connector.initial_backoff_ms > self.connector.max_backoff_ms {
            return Err(ConfigError::InvalidValue(format!(
                "connector.initial_backoff_ms ({}) exceeds connector.max_backoff_ms ({})",
                self.connector.initial_backoff_ms, self.connector.max_backoff_ms
            )));
        }
        if self.stream.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "stream.channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.recorder.segment_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "recorder.segment_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tunables of the upstream connector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectorSettings {
    pub connect_timeout_ms: u64,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Largest multipart section accepted from upstream.
    pub max_section_bytes: usize,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
            max_section_bytes: 16 * 1024 * 1024,
        }
    }
}

impl ConnectorSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Timing of the per-client stream loops.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Longest wait while the store holds no frame yet.
    pub idle_poll_ms: u64,
    /// Longest wait after finding the frame already sent.
    pub dedup_poll_ms: u64,
    /// Number of body chunks buffered between a session and its HTTP response.
    pub channel_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            idle_poll_ms: 10,
            dedup_poll_ms: 5,
            channel_capacity: 8,
        }
    }
}

impl StreamSettings {
    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn dedup_poll(&self) -> Duration {
        Duration::from_millis(self.dedup_poll_ms)
    }
}

/// Recording subprocess parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecorderSettings {
    pub program: String,
    pub input_format: String,
    pub framerate: u32,
    pub video_size: String,
    pub video_codec: String,
    pub pixel_format: String,
    pub bitrate: String,
    /// Segment container, also used as the file extension.
    pub container: String,
    pub segment_seconds: u64,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            input_format: "v4l2".to_string(),
            framerate: 30,
            video_size: "1280x720".to_string(),
            video_codec: "h264_v4l2m2m".to_string(),
            pixel_format: "yuv420p".to_string(),
            bitrate: "1M".to_string(),
            container: "mkv".to_string(),
            segment_seconds: 1800,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let settings = ServerSettings::from_toml("").unwrap();
        assert_eq!(settings, ServerSettings::default());
        assert_eq!(settings.port, 8001);
        assert_eq!(settings.stream.idle_poll(), Duration::from_millis(10));
        assert_eq!(settings.stream.dedup_poll(), Duration::from_millis(5));
        assert_eq!(settings.recorder.segment_seconds, 1800);
    }

    #[test]
    fn test_partial_toml_overrides_only_given_fields() {
        let settings = ServerSettings::from_toml(
            r#"
            port = 9000
            source_url = "http://camera.local:8080/stream"

            [recorder]
            container = "mp4"
            "#,
        )
        .unwrap();

        assert_eq!(settings.port, 9000);
        assert_eq!(settings.source_url, "http://camera.local:8080/stream");
        assert_eq!(settings.recorder.container, "mp4");
        assert_eq!(settings.recorder.program, "ffmpeg");
        assert_eq!(settings.bind_address, "0.0.0.0");
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = ServerSettings::from_toml("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlError(_)));
    }

    #[test]
    fn test_inverted_backoff_is_rejected() {
        let err = ServerSettings::from_toml(
            r#"
            [connector]
            initial_backoff_ms = 10000
            max_backoff_ms = 100
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_zero_delays_are_rejected() {
        for (section, key) in [
            ("connector", "initial_backoff_ms"),
            ("stream", "idle_poll_ms"),
            ("stream", "dedup_poll_ms"),
        ] {
            let toml = format!("[{}]\n{} = 0\n", section, key);
            match ServerSettings::from_toml(&toml) {
                Err(ConfigError::InvalidValue(message)) => assert!(message.contains(key)),
                other => panic!("{} = 0 was accepted: {:?}", key, other),
            }
        }
    }
}
