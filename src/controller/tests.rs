#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;
    use tokio::sync::oneshot;

    use crate::configuration::camera_config::CameraConfig;
    use crate::configuration::config::Config;
    use crate::configuration::types::ServerSettings;
    use crate::controller::Controller;
    use crate::error_handling::types::{ConfigError, ControllerError, WebError};

    fn config(dir: &TempDir, port: u16) -> Config {
        Config {
            camera: CameraConfig {
                camera_url: "/dev/video-test".to_string(),
                ffmpeg_log_file: dir.path().join("recorder.log"),
                recording_clips_dir: dir.path().join("clips"),
            },
            settings: ServerSettings {
                bind_address: "127.0.0.1".to_string(),
                port,
                // nothing listens on the discard port
                source_url: "http://127.0.0.1:9/stream".to_string(),
                static_dir: dir.path().join("static"),
                ..ServerSettings::default()
            },
        }
    }

    #[test]
    fn test_new_rejects_invalid_bind_address() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, 0);
        config.settings.bind_address = "not-an-address".to_string();

        let err = Controller::new(config).err().unwrap();
        assert!(matches!(
            err,
            ControllerError::ConfigurationError(ConfigError::InvalidValue(_))
        ));
    }

    #[tokio::test]
    async fn test_context_starts_idle() {
        let dir = TempDir::new().unwrap();
        let controller = Controller::new(config(&dir, 0)).unwrap();
        let context = controller.context();

        let statistics = context.statistics().await;
        assert_eq!(statistics.recording_start_time_millis, -1);
        assert!(!statistics.recording);
        assert!(!statistics.upstream_connected);
        assert_eq!(statistics.active_streams, 0);
        assert!(statistics.server_start_time_millis > 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let dir = TempDir::new().unwrap();
        let controller = Controller::new(config(&dir, 0)).unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let running = tokio::spawn(controller.run_until(async {
            let _ = stop_rx.await;
        }));
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop_tx.send(()).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("controller did not stop")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_reports_bind_failure() {
        let dir = TempDir::new().unwrap();
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let controller = Controller::new(config(&dir, port)).unwrap();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            controller.run_until(std::future::pending()),
        )
        .await
        .expect("bind failure was not reported");

        assert!(matches!(
            result,
            Err(ControllerError::WebError(WebError::BindFailed(_)))
        ));
        drop(taken);
    }
}
