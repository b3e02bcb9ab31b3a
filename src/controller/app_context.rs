use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use log::warn;

use crate::configuration::config::Config;
use crate::recording::RecordingSupervisor;
use crate::statistics::{DiskSpace, StatisticsResponse};
use crate::streaming::{FrameStore, SourceStats, StreamMultiplexer};

/// Shared state of the running server.
///
/// Built once at startup and handed to every handler and task behind an
/// `Arc`; nothing in here is global.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<FrameStore>,
    pub multiplexer: StreamMultiplexer,
    pub recorder: RecordingSupervisor,
    pub source_stats: Arc<SourceStats>,
    statistics_dir: PathBuf,
    started_at_millis: i64,
}

impl AppContext {
    pub fn new(config: Config, store: Arc<FrameStore>, source_stats: Arc<SourceStats>) -> Self {
        let multiplexer = StreamMultiplexer::new(store.clone(), config.settings.stream.clone());
        let recorder = RecordingSupervisor::from_config(&config.camera, &config.settings.recorder);
        let statistics_dir = config.statistics_dir();

        Self {
            config,
            store,
            multiplexer,
            recorder,
            source_stats,
            statistics_dir,
            started_at_millis: Utc::now().timestamp_millis(),
        }
    }

    pub fn clips_dir(&self) -> &Path {
        &self.config.camera.recording_clips_dir
    }

    pub fn static_dir(&self) -> &Path {
        &self.config.settings.static_dir
    }

    pub fn started_at_millis(&self) -> i64 {
        self.started_at_millis
    }

    pub async fn statistics(&self) -> StatisticsResponse {
        let dir = self.statistics_dir.clone();
        let disk = tokio::task::spawn_blocking(move || DiskSpace::of(&dir))
            .await
            .unwrap_or_else(|e| {
                warn!("Disk statistics task failed: {}", e);
                DiskSpace::default()
            });
        let recording = self.recorder.status().await;

        StatisticsResponse {
            server_start_time_millis: self.started_at_millis,
            recording_start_time_millis: recording.start_time_millis,
            recording: recording.is_recording(),
            upstream_connected: self.source_stats.is_connected(),
            frames_received: self.source_stats.frames_received(),
            active_streams: self.multiplexer.active_sessions(),
            ..StatisticsResponse::with_disk(disk)
        }
    }
}
