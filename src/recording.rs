//! Recording subprocess supervision.
//!
//! Recording is delegated to an external encoder (ffmpeg by default) that
//! captures the camera device and writes clock-aligned segments into one
//! folder per day. This module only launches, watches and kills it.
//!
//! Re-exports:
//! - [`RecordingSupervisor`]: the Idle/Recording state machine.
//! - [`CommandSpec`]: the subprocess argument vector.
//! - [`RecordingStatus`], [`RecordingStarted`], [`StopOutcome`]: results.

pub mod command;
pub mod supervisor;
#[cfg(test)]
pub mod tests;
pub mod types;

pub use command::{segment_pattern, CommandSpec};
pub use supervisor::RecordingSupervisor;
pub use types::{
    RecordingStarted, RecordingState, RecordingStatus, StopOutcome, NOT_RECORDING_MILLIS,
};
