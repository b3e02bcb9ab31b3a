//! Live MJPEG relay.
//!
//! A single [`FrameSourceConnector`] pulls the upstream multipart stream and
//! keeps the newest frame in the shared [`FrameStore`]. Every downstream
//! client gets its own [`StreamSession`], spawned through the
//! [`StreamMultiplexer`], which copies the latest frame out of the store and
//! pushes it as one multipart section whenever its fingerprint changes.
//!
//! ```text
//! upstream ──▶ FrameSourceConnector ──▶ FrameStore ──┬──▶ StreamSession ──▶ client
//!                                                    ├──▶ StreamSession ──▶ client
//!                                                    └──▶ ...
//! ```
//!
//! Sessions are independent: a client that stops reading only stalls its own
//! session, and a failed write ends that session alone.

pub mod connector;
pub mod frame_store;
pub mod multipart;
pub mod multiplexer;
pub mod sink;

pub use connector::{FrameSourceConnector, SourceStats};
pub use frame_store::{fingerprint, Frame, FrameStore};
pub use multipart::{DecodeEvent, MultipartDecoder, BOUNDARY};
pub use multiplexer::{SessionSummary, StreamMultiplexer, StreamSession};
pub use sink::{ChannelSink, FrameSink, WriterSink};
