use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use chrono::{Local, Utc};
use log::{debug, error, info, warn};
use tokio::process::Child;
use tokio::sync::{oneshot, Mutex};

use super::command::CommandSpec;
use super::types::{RecordingStarted, RecordingState, RecordingStatus, StopOutcome};
use crate::configuration::camera_config::CameraConfig;
use crate::configuration::types::RecorderSettings;
use crate::error_handling::types::RecordingError;

/// Reply channel handed to the monitor with a kill request.
type KillRequest = oneshot::Sender<std::io::Result<()>>;

struct ActiveRecording {
    generation: u64,
    pid: u32,
    start_time_millis: i64,
    kill_tx: oneshot::Sender<KillRequest>,
}

#[derive(Default)]
struct SupervisorState {
    generation: u64,
    active: Option<ActiveRecording>,
}

/// Owns the lifecycle of the recording subprocess.
///
/// At most one subprocess runs at a time. Start and stop run entirely under
/// one async mutex, so concurrent requests observe a consistent
/// Idle/Recording state. The child itself is owned by a monitor task, which
/// kills it on request or notices when it exits on its own.
pub struct RecordingSupervisor {
    command: CommandSpec,
    clips_dir: PathBuf,
    log_file: PathBuf,
    state: Arc<Mutex<SupervisorState>>,
}

impl RecordingSupervisor {
    pub fn new(command: CommandSpec, clips_dir: PathBuf, log_file: PathBuf) -> Self {
        Self {
            command,
            clips_dir,
            log_file,
            state: Arc::new(Mutex::new(SupervisorState::default())),
        }
    }

    pub fn from_config(camera: &CameraConfig, settings: &RecorderSettings) -> Self {
        Self::new(
            CommandSpec::ffmpeg(camera, settings),
            camera.recording_clips_dir.clone(),
            camera.ffmpeg_log_file.clone(),
        )
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    /// Launches the subprocess if idle.
    pub async fn start(&self) -> Result<RecordingStarted, RecordingError> {
        let mut state = self.state.lock().await;

        if let Some(active) = state.active.as_ref() {
            warn!("Recording already started (pid {})", active.pid);
            return Err(RecordingError::AlreadyRecording);
        }

        self.prepare_directories().await?;

        let mut command = self.command.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(self.stderr_target())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            error!("Unable to launch recorder `{}`: {}", self.command.program, e);
            RecordingError::LaunchFailed(format!("{}: {}", self.command.program, e))
        })?;
        let pid = child.id().ok_or_else(|| {
            RecordingError::LaunchFailed("recorder exited before reporting a pid".to_string())
        })?;

        state.generation += 1;
        let generation = state.generation;
        let start_time_millis = Utc::now().timestamp_millis();
        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(monitor_recording(
            child,
            kill_rx,
            generation,
            pid,
            self.state.clone(),
        ));

        state.active = Some(ActiveRecording {
            generation,
            pid,
            start_time_millis,
            kill_tx,
        });

        info!("Recording started with pid {}", pid);
        debug!("Recorder command: {}", self.command.display());

        Ok(RecordingStarted {
            pid,
            start_time_millis,
        })
    }

    /// Kills the subprocess if recording; always leaves the supervisor idle.
    pub async fn stop(&self) -> StopOutcome {
        let mut state = self.state.lock().await;

        let Some(active) = state.active.take() else {
            info!("Recording not started, nothing to stop");
            return StopOutcome::NotRecording;
        };

        info!("Stopping recording with pid {}", active.pid);
        let (reply_tx, reply_rx) = oneshot::channel();
        if active.kill_tx.send(reply_tx).is_ok() {
            match reply_rx.await {
                Ok(Ok(())) => debug!("Recorder pid {} killed", active.pid),
                Ok(Err(e)) => warn!("Failed to kill recorder pid {}: {}", active.pid, e),
                // the monitor saw the process exit first
                Err(_) => debug!("Recorder pid {} had already exited", active.pid),
            }
        }

        StopOutcome::Stopped { pid: active.pid }
    }

    pub async fn status(&self) -> RecordingStatus {
        let state = self.state.lock().await;
        match state.active.as_ref() {
            Some(active) => RecordingStatus {
                state: RecordingState::Recording,
                pid: Some(active.pid),
                start_time_millis: active.start_time_millis,
            },
            None => RecordingStatus::idle(),
        }
    }

    /// Stops a running recording before the process exits.
    pub async fn shutdown(&self) {
        if let StopOutcome::Stopped { pid } = self.stop().await {
            info!("Recorder pid {} stopped during shutdown", pid);
        }
    }

    async fn prepare_directories(&self) -> Result<(), RecordingError> {
        let today = self.clips_dir.join(Local::now().format("%Y%m%d").to_string());
        tokio::fs::create_dir_all(&today).await.map_err(|e| {
            error!("Unable to create clips folder {}: {}", today.display(), e);
            RecordingError::IoError(e)
        })
    }

    fn stderr_target(&self) -> Stdio {
        match open_log(&self.log_file) {
            Ok(file) => Stdio::from(file),
            Err(e) => {
                warn!(
                    "Unable to open recorder log {}: {}, discarding its output",
                    self.log_file.display(),
                    e
                );
                Stdio::null()
            }
        }
    }
}

fn open_log(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

async fn monitor_recording(
    mut child: Child,
    mut kill_rx: oneshot::Receiver<KillRequest>,
    generation: u64,
    pid: u32,
    state: Arc<Mutex<SupervisorState>>,
) {
    let exit = tokio::select! {
        status = child.wait() => status,
        request = &mut kill_rx => {
            let result = child.kill().await;
            if let Ok(reply) = request {
                let _ = reply.send(result);
            }
            return;
        }
    };
    // drop any pending kill request so a waiting stop() is released
    drop(kill_rx);

    log_exit(pid, exit);

    let mut state = state.lock().await;
    let current = state.active.as_ref().map(|a| a.generation);
    if current == Some(generation) {
        state.active = None;
        info!("Recording state reset to idle after recorder pid {} exited", pid);
    }
}

fn log_exit(pid: u32, exit: std::io::Result<ExitStatus>) {
    match exit {
        Ok(status) if status.success() => info!("Recorder pid {} exited: {}", pid, status),
        Ok(status) => warn!("Recorder pid {} exited unexpectedly: {}", pid, status),
        Err(e) => error!("Unable to wait for recorder pid {}: {}", pid, e),
    }
}
