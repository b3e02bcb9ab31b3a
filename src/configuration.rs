//! Runtime configuration.
//!
//! Two sources are combined at startup:
//! - the camera file, a line-oriented `key:value` file naming the camera
//!   source, the recorder log file and the clips directory
//!   ([`camera_config::CameraConfig`]);
//! - the server settings, an optional TOML file plus command-line/environment
//!   overrides ([`types::ServerSettings`], [`config::CliArgs`]).

pub mod camera_config;
pub mod config;
pub mod types;

pub use camera_config::CameraConfig;
pub use config::{CliArgs, Config};
pub use types::{ConnectorSettings, RecorderSettings, ServerSettings, StreamSettings};
