use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use log::{debug, info, warn};
use tokio::task::JoinHandle;

use super::frame_store::{Frame, FrameStore};
use super::multipart::{DecodeEvent, MultipartDecoder, BOUNDARY};
use crate::configuration::types::ConnectorSettings;
use crate::error_handling::types::SourceError;

/// Counters describing the upstream link.
#[derive(Debug, Default)]
pub struct SourceStats {
    connected: AtomicBool,
    reconnects: AtomicU64,
    frames_received: AtomicU64,
    sections_skipped: AtomicU64,
}

impl SourceStats {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn sections_skipped(&self) -> u64 {
        self.sections_skipped.load(Ordering::Relaxed)
    }
}

/// Result of one upstream connection.
#[derive(Debug)]
pub struct PumpOutcome {
    pub frames: u64,
    pub reason: SourceError,
}

/// Pulls the upstream MJPEG stream into a [`FrameStore`].
///
/// Runs for the lifetime of the process: every disconnect is followed by a
/// reconnect after an exponential backoff, which is reset once a connection
/// has delivered at least one frame.
pub struct FrameSourceConnector {
    source_url: String,
    store: Arc<FrameStore>,
    settings: ConnectorSettings,
    client: reqwest::Client,
    stats: Arc<SourceStats>,
}

impl FrameSourceConnector {
    pub fn new(
        source_url: impl Into<String>,
        store: Arc<FrameStore>,
        settings: ConnectorSettings,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .build()?;

        Ok(Self {
            source_url: source_url.into(),
            store,
            settings,
            client,
            stats: Arc::new(SourceStats::default()),
        })
    }

    pub fn stats(&self) -> Arc<SourceStats> {
        self.stats.clone()
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        let mut backoff = self.settings.initial_backoff();
        info!("Connecting to frame source {}", self.source_url);

        loop {
            let outcome = match self.connect().await {
                Ok(response) => self.pump(response).await,
                Err(reason) => PumpOutcome { frames: 0, reason },
            };
            self.stats.connected.store(false, Ordering::Relaxed);

            if outcome.frames > 0 {
                backoff = self.settings.initial_backoff();
            }

            warn!(
                "Frame source {} disconnected after {} frames: {}; retrying in {:?}",
                self.source_url, outcome.frames, outcome.reason, backoff
            );

            tokio::time::sleep(backoff).await;
            self.stats.reconnects.fetch_add(1, Ordering::Relaxed);
            backoff = next_backoff(backoff, self.settings.max_backoff());
        }
    }

    async fn connect(&self) -> Result<reqwest::Response, SourceError> {
        let response = self.client.get(&self.source_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::BadStatus(status.as_u16()));
        }

        debug!(
            "Frame source answered {} ({})",
            status,
            response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("no content type")
        );
        self.stats.connected.store(true, Ordering::Relaxed);
        info!("Connected to frame source {}", self.source_url);
        Ok(response)
    }

    /// Decodes one connection until it ends.
    pub async fn pump(&self, response: reqwest::Response) -> PumpOutcome {
        let mut decoder = MultipartDecoder::new(BOUNDARY, self.settings.max_section_bytes);
        let body = response.bytes_stream();
        tokio::pin!(body);
        let mut frames = 0u64;

        let reason = loop {
            let chunk: Bytes = match body.next().await {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => break SourceError::StreamFailed(e.to_string()),
                None => break SourceError::StreamEnded,
            };
            decoder.push(&chunk);

            while let Some(event) = decoder.next_event() {
                match event {
                    DecodeEvent::Frame(data) if data.is_empty() => {
                        debug!("Ignoring empty section from frame source");
                    }
                    DecodeEvent::Frame(data) => {
                        frames += 1;
                        self.stats.frames_received.fetch_add(1, Ordering::Relaxed);
                        self.store.write(Frame::new(data));
                    }
                    DecodeEvent::Skipped(e) => {
                        self.stats.sections_skipped.fetch_add(1, Ordering::Relaxed);
                        warn!("Skipping section from frame source: {}", e);
                    }
                }
            }
        };

        PumpOutcome { frames, reason }
    }
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}
