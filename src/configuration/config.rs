use super::camera_config::CameraConfig;
use super::types::ServerSettings;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Command-line arguments.
///
/// Every override is also read from a `CAMRELAY_*` environment variable, the
/// command line taking precedence.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use camrelay::configuration::{CliArgs, Config};
///
/// let args = CliArgs::parse();
/// let config = Config::from_args(&args).unwrap();
/// println!("Relaying {}", config.settings.source_url);
/// ```
#[derive(Parser, Debug, Clone)]
#[command(name = "camrelay")]
#[command(version)]
#[command(about = "MJPEG relay with recording supervision and clip retention")]
pub struct CliArgs {
    /// Camera configuration file (`key:value` lines)
    #[arg(default_value = "camrelay.conf")]
    pub camera_config: PathBuf,

    /// Optional TOML file with server settings
    ///
    /// Missing fields keep their defaults.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Address the HTTP server binds to
    #[arg(long, env = "CAMRELAY_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Port the HTTP server listens on
    #[arg(long, env = "CAMRELAY_PORT")]
    pub port: Option<u16>,

    /// Upstream multipart MJPEG source
    #[arg(long, env = "CAMRELAY_SOURCE_URL")]
    pub source_url: Option<String>,

    /// Directory of static files served under `/`
    #[arg(long, env = "CAMRELAY_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub camera: CameraConfig,
    pub settings: ServerSettings,
}

impl Config {
    /// Resolves the configuration from parsed arguments.
    ///
    /// The settings file, when given, must parse; the camera file falls back to
    /// defaults on any problem.
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut settings = match &args.settings {
            Some(path) => ServerSettings::from_file(path)?,
            None => ServerSettings::default(),
        };

        if let Some(bind_address) = &args.bind_address {
            settings.bind_address = bind_address.clone();
        }
        if let Some(port) = args.port {
            settings.port = port;
        }
        if let Some(source_url) = &args.source_url {
            settings.source_url = source_url.clone();
        }
        if let Some(static_dir) = &args.static_dir {
            settings.static_dir = static_dir.clone();
        }

        let camera = CameraConfig::load_or_default(&args.camera_config);

        Ok(Self { camera, settings })
    }

    /// Directory whose filesystem backs the disk statistics.
    pub fn statistics_dir(&self) -> PathBuf {
        self.settings
            .statistics_dir
            .clone()
            .unwrap_or_else(|| self.camera.recording_clips_dir.clone())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.settings.bind_address.parse().map_err(|_| {
            ConfigError::InvalidValue(format!(
                "bind_address is not an IP address: {}",
                self.settings.bind_address
            ))
        })?;
        Ok(SocketAddr::new(ip, self.settings.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn args_under_test(extra: &[&str]) -> Result<CliArgs, clap::Error> {
        let mut argv = vec!["camrelay"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv)
    }

    #[test]
    #[serial]
    fn test_from_args_defaults() {
        let args = args_under_test(&["/nonexistent/camrelay.conf"]).unwrap();
        let config = Config::from_args(&args).unwrap();

        assert_eq!(config.camera, CameraConfig::default());
        assert_eq!(config.settings, ServerSettings::default());
        assert_eq!(config.statistics_dir(), PathBuf::from("./clips"));
        assert_eq!(
            config.socket_addr().unwrap(),
            "0.0.0.0:8001".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    #[serial]
    fn test_cli_overrides_settings_file() {
        let dir = TempDir::new().unwrap();
        let settings = dir.path().join("settings.toml");
        std::fs::write(&settings, "port = 9100\nsource_url = \"http://a:1\"\n").unwrap();

        let settings_arg = settings.to_string_lossy().to_string();
        let args = args_under_test(&[
            "cam.conf",
            "--settings",
            &settings_arg,
            "--source-url",
            "http://b:2",
            "--bind-address",
            "127.0.0.1",
        ])
        .unwrap();
        let config = Config::from_args(&args).unwrap();

        assert_eq!(config.settings.port, 9100);
        assert_eq!(config.settings.source_url, "http://b:2");
        assert_eq!(
            config.socket_addr().unwrap(),
            "127.0.0.1:9100".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        std::env::set_var("CAMRELAY_PORT", "8123");
        let args = args_under_test(&["cam.conf"]);
        std::env::remove_var("CAMRELAY_PORT");

        let config = Config::from_args(&args.unwrap()).unwrap();
        assert_eq!(config.settings.port, 8123);
    }

    #[test]
    #[serial]
    fn test_unreadable_settings_file_is_an_error() {
        let args = args_under_test(&["cam.conf", "--settings", "/nonexistent/settings.toml"]).unwrap();
        let err = Config::from_args(&args).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    #[serial]
    fn test_bad_bind_address() {
        let args = args_under_test(&["cam.conf", "--bind-address", "localhost"]).unwrap();
        let config = Config::from_args(&args).unwrap();
        assert!(matches!(
            config.socket_addr().unwrap_err(),
            ConfigError::InvalidValue(_)
        ));
    }
}
