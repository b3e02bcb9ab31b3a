use serde::{Deserialize, Serialize};

use crate::recording::RecordingStarted;
use crate::retention::CleanupScope;

/// API error payload
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `POST /record` form.
#[derive(Debug, Deserialize)]
pub struct RecordForm {
    pub action: String,
}

/// `POST /delete` form. `days` is parsed by the handler so that a bad value
/// gets a plain-text answer instead of a generic rejection.
#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub days: String,
    #[serde(default)]
    pub scope: CleanupScope,
}

/// `GET /videos` query; a missing `path` lists the clips root.
#[derive(Debug, Deserialize)]
pub struct VideosQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_start_time_millis: Option<i64>,
}

impl RecordResponse {
    pub fn recording(started: RecordingStarted) -> Self {
        Self {
            status: "recording",
            pid: Some(started.pid),
            recording_start_time_millis: Some(started.start_time_millis),
        }
    }

    pub fn idle() -> Self {
        Self {
            status: "idle",
            pid: None,
            recording_start_time_millis: None,
        }
    }
}
