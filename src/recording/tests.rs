#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::PathBuf;
    use std::time::Duration;

    use chrono::Local;
    use tempfile::TempDir;

    use crate::configuration::camera_config::CameraConfig;
    use crate::configuration::types::RecorderSettings;
    use crate::error_handling::types::RecordingError;
    use crate::recording::{
        CommandSpec, RecordingState, RecordingSupervisor, StopOutcome, NOT_RECORDING_MILLIS,
    };

    fn supervisor(dir: &TempDir, command: CommandSpec) -> RecordingSupervisor {
        RecordingSupervisor::new(
            command,
            dir.path().join("clips"),
            dir.path().join("logs").join("recorder.log"),
        )
    }

    async fn wait_until_idle(supervisor: &RecordingSupervisor) -> bool {
        for _ in 0..200 {
            if !supervisor.status().await.is_recording() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[test]
    fn test_ffmpeg_arguments_are_deterministic() {
        let camera = CameraConfig {
            camera_url: "/dev/video0".to_string(),
            ffmpeg_log_file: PathBuf::from("/var/log/ffmpeg.log"),
            recording_clips_dir: PathBuf::from("/srv/clips"),
        };
        let settings = RecorderSettings::default();

        let spec = CommandSpec::ffmpeg(&camera, &settings);
        assert_eq!(spec, CommandSpec::ffmpeg(&camera, &settings));
        assert_eq!(spec.program, "ffmpeg");

        let expected: Vec<OsString> = [
            "-nostdin",
            "-f",
            "v4l2",
            "-framerate",
            "30",
            "-video_size",
            "1280x720",
            "-i",
            "/dev/video0",
            "-c:v",
            "h264_v4l2m2m",
            "-pix_fmt",
            "yuv420p",
            "-b:v",
            "1M",
            "-f",
            "segment",
            "-reset_timestamps",
            "1",
            "-segment_time",
            "1800",
            "-segment_format",
            "mkv",
            "-segment_atclocktime",
            "1",
            "-strftime",
            "1",
            "/srv/clips/%Y%m%d/%Y%m%dT%H%M%S.mkv",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        assert_eq!(spec.args, expected);
    }

    #[test]
    fn test_recorder_settings_flow_into_arguments() {
        let camera = CameraConfig::default();
        let settings = RecorderSettings {
            program: "/opt/bin/ffmpeg".to_string(),
            container: "mp4".to_string(),
            segment_seconds: 600,
            ..RecorderSettings::default()
        };

        let spec = CommandSpec::ffmpeg(&camera, &settings);
        let rendered = spec.display();
        assert!(rendered.starts_with("/opt/bin/ffmpeg -nostdin"));
        assert!(rendered.contains("-segment_time 600"));
        assert!(rendered.contains("-segment_format mp4"));
        assert!(rendered.ends_with("%Y%m%dT%H%M%S.mp4"));
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir, CommandSpec::new("sleep", ["30"]));

        assert_eq!(supervisor.stop().await, StopOutcome::NotRecording);
        let status = supervisor.status().await;
        assert_eq!(status.state, RecordingState::Idle);
        assert_eq!(status.pid, None);
        assert_eq!(status.start_time_millis, NOT_RECORDING_MILLIS);
    }

    #[tokio::test]
    async fn test_launch_failure_leaves_supervisor_idle() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(
            &dir,
            CommandSpec::new("/nonexistent/camrelay-recorder", Vec::<String>::new()),
        );

        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, RecordingError::LaunchFailed(_)));

        let status = supervisor.status().await;
        assert!(!status.is_recording());
        assert_eq!(status.start_time_millis, NOT_RECORDING_MILLIS);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir, CommandSpec::new("sleep", ["30"]));

        let started = supervisor.start().await.unwrap();
        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, RecordingError::AlreadyRecording));

        let status = supervisor.status().await;
        assert_eq!(status.state, RecordingState::Recording);
        assert_eq!(status.pid, Some(started.pid));
        assert_eq!(status.start_time_millis, started.start_time_millis);
        assert!(status.start_time_millis > 0);

        assert_eq!(
            supervisor.stop().await,
            StopOutcome::Stopped { pid: started.pid }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_concurrent_starts_launch_once() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir, CommandSpec::new("sleep", ["30"]));

        let (a, b) = tokio::join!(supervisor.start(), supervisor.start());
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);

        supervisor.shutdown().await;
        assert!(!supervisor.status().await.is_recording());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_restart_uses_a_new_process() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir, CommandSpec::new("sleep", ["30"]));

        let first = supervisor.start().await.unwrap();
        assert_eq!(
            supervisor.stop().await,
            StopOutcome::Stopped { pid: first.pid }
        );
        assert_eq!(supervisor.status().await.start_time_millis, NOT_RECORDING_MILLIS);

        let second = supervisor.start().await.unwrap();
        assert_ne!(first.pid, second.pid);
        supervisor.stop().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_creates_todays_folder() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir, CommandSpec::new("sleep", ["30"]));

        supervisor.start().await.unwrap();
        let today = Local::now().format("%Y%m%d").to_string();
        assert!(dir.path().join("clips").join(today).is_dir());
        supervisor.stop().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_on_its_own_returns_to_idle() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir, CommandSpec::new("true", Vec::<String>::new()));

        supervisor.start().await.unwrap();
        assert!(wait_until_idle(&supervisor).await);
        assert_eq!(supervisor.stop().await, StopOutcome::NotRecording);

        // a later start is accepted again
        supervisor.start().await.unwrap();
        assert!(wait_until_idle(&supervisor).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_recorder_stderr_goes_to_log_file() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(
            &dir,
            CommandSpec::new("sh", ["-c", "echo segment-muxer-says-hi >&2"]),
        );

        supervisor.start().await.unwrap();
        assert!(wait_until_idle(&supervisor).await);

        let log = std::fs::read_to_string(dir.path().join("logs").join("recorder.log")).unwrap();
        assert!(log.contains("segment-muxer-says-hi"));
    }
}
