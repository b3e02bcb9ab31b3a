use serde::Serialize;

/// Start timestamp reported while no recording is running.
pub const NOT_RECORDING_MILLIS: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    Idle,
    Recording,
}

/// Point-in-time view of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingStatus {
    pub state: RecordingState,
    pub pid: Option<u32>,
    /// Unix milliseconds of the launch, or [`NOT_RECORDING_MILLIS`].
    pub start_time_millis: i64,
}

impl RecordingStatus {
    pub fn idle() -> Self {
        Self {
            state: RecordingState::Idle,
            pid: None,
            start_time_millis: NOT_RECORDING_MILLIS,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingStarted {
    pub pid: u32,
    pub start_time_millis: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped { pid: u32 },
    NotRecording,
}
