use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use log::{debug, info, trace};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::frame_store::FrameStore;
use super::multipart::section_header;
use super::sink::{ChannelSink, FrameSink};
use crate::configuration::types::StreamSettings;
use crate::error_handling::types::StreamError;

/// How a stream session ended.
#[derive(Debug)]
pub struct SessionSummary {
    pub id: Uuid,
    pub sections_sent: u64,
    pub reason: StreamError,
}

/// One downstream client.
///
/// The session keeps the fingerprint of the last frame it sent and only
/// transmits when the store holds different content, so a client slower than
/// the producer never receives the same frame twice.
pub struct StreamSession<S> {
    id: Uuid,
    store: Arc<FrameStore>,
    sink: S,
    idle_poll: Duration,
    dedup_poll: Duration,
    last_sent: Option<u64>,
    sections_sent: u64,
}

impl<S: FrameSink> StreamSession<S> {
    pub fn new(store: Arc<FrameStore>, sink: S, settings: &StreamSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            store,
            sink,
            idle_poll: settings.idle_poll(),
            dedup_poll: settings.dedup_poll(),
            last_sent: None,
            sections_sent: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Streams until the sink fails or its client goes away.
    pub async fn run(mut self) -> SessionSummary {
        let mut updates = self.store.subscribe();
        debug!("[{}] stream session started", self.id);

        let reason = loop {
            // mark the version seen before reading, so a write racing with
            // this read still wakes the next wait
            updates.borrow_and_update();

            let frame = match self.store.latest() {
                Some(frame) if !frame.is_empty() => frame,
                _ => {
                    let waited = wait_for_update(&mut updates, self.idle_poll, &self.sink).await;
                    if let Err(e) = waited {
                        break e;
                    }
                    continue;
                }
            };

            if self.last_sent == Some(frame.fingerprint()) {
                let waited = wait_for_update(&mut updates, self.dedup_poll, &self.sink).await;
                if let Err(e) = waited {
                    break e;
                }
                continue;
            }

            let header = section_header(frame.len());
            if let Err(e) = self.sink.send_section(header, frame.data().clone()).await {
                break e;
            }

            self.last_sent = Some(frame.fingerprint());
            self.sections_sent += 1;
            trace!(
                "[{}] sent frame {:016x} ({} bytes)",
                self.id,
                frame.fingerprint(),
                frame.len()
            );
        };

        info!(
            "[{}] stream session ended after {} frames: {}",
            self.id, self.sections_sent, reason
        );

        SessionSummary {
            id: self.id,
            sections_sent: self.sections_sent,
            reason,
        }
    }
}

/// Waits for a store write, at most `max_wait`, ending early if the client
/// has gone.
async fn wait_for_update<S: FrameSink>(
    updates: &mut watch::Receiver<u64>,
    max_wait: Duration,
    sink: &S,
) -> Result<(), StreamError> {
    tokio::select! {
        _ = tokio::time::timeout(max_wait, updates.changed()) => Ok(()),
        _ = sink.closed() => Err(StreamError::ClientGone),
    }
}

/// Spawns and counts stream sessions over one shared store.
pub struct StreamMultiplexer {
    store: Arc<FrameStore>,
    settings: StreamSettings,
    active: Arc<AtomicUsize>,
    opened: AtomicU64,
}

impl StreamMultiplexer {
    pub fn new(store: Arc<FrameStore>, settings: StreamSettings) -> Self {
        Self {
            store,
            settings,
            active: Arc::new(AtomicUsize::new(0)),
            opened: AtomicU64::new(0),
        }
    }

    /// Spawns a session writing to `sink` on its own task.
    pub fn spawn_session<S>(&self, sink: S) -> JoinHandle<SessionSummary>
    where
        S: FrameSink + Sync + 'static,
    {
        let session = StreamSession::new(self.store.clone(), sink, &self.settings);
        let guard = ActiveGuard::new(self.active.clone());
        let total = self.opened.fetch_add(1, Ordering::Relaxed) + 1;

        info!(
            "[{}] stream client connected ({} active, {} total)",
            session.id(),
            guard.count(),
            total
        );

        tokio::spawn(async move {
            let _guard = guard;
            session.run().await
        })
    }

    /// Spawns a session feeding a channel; the receiver becomes the
    /// response body.
    pub fn open_channel_session(
        &self,
    ) -> (
        JoinHandle<SessionSummary>,
        mpsc::Receiver<Result<Bytes, std::io::Error>>,
    ) {
        let (tx, rx) = mpsc::channel(self.settings.channel_capacity);
        let handle = self.spawn_session(ChannelSink::new(tx));
        (handle, rx)
    }

    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn sessions_opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }
}

struct ActiveGuard {
    active: Arc<AtomicUsize>,
    count: usize,
}

impl ActiveGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        let count = active.fetch_add(1, Ordering::Relaxed) + 1;
        Self { active, count }
    }

    fn count(&self) -> usize {
        self.count
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }
}
