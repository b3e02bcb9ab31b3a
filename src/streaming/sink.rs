//! Outputs a stream session can write multipart sections to.

use std::future::Future;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::multipart::SECTION_TRAILER;
use crate::error_handling::types::StreamError;

/// Destination of one client's multipart sections.
///
/// A section is complete (and visible to the client) once the returned
/// future resolves; any error means the client is gone.
pub trait FrameSink: Send {
    fn send_section(
        &mut self,
        header: Bytes,
        body: Bytes,
    ) -> impl Future<Output = Result<(), StreamError>> + Send;

    /// Resolves once the client is known to be gone without sending to it.
    fn closed(&self) -> impl Future<Output = ()> + Send;
}

/// Feeds a response body through a bounded channel.
///
/// The receiving half is turned into the HTTP body stream; when the client
/// disconnects the body is dropped, `closed` resolves and the next send fails.
pub struct ChannelSink {
    tx: mpsc::Sender<Result<Bytes, std::io::Error>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Result<Bytes, std::io::Error>>) -> Self {
        Self { tx }
    }
}

impl FrameSink for ChannelSink {
    async fn send_section(&mut self, header: Bytes, body: Bytes) -> Result<(), StreamError> {
        for chunk in [header, body, Bytes::from_static(SECTION_TRAILER)] {
            self.tx
                .send(Ok(chunk))
                .await
                .map_err(|_| StreamError::ClientGone)?;
        }
        Ok(())
    }

    fn closed(&self) -> impl Future<Output = ()> + Send {
        self.tx.closed()
    }
}

/// Writes sections straight to an async writer, flushing after each one.
pub struct WriterSink<W> {
    writer: W,
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W> FrameSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_section(&mut self, header: Bytes, body: Bytes) -> Result<(), StreamError> {
        self.writer.write_all(&header).await?;
        self.writer.write_all(&body).await?;
        self.writer.write_all(SECTION_TRAILER).await?;
        self.writer.flush().await?;
        Ok(())
    }

    // a writer only reports a departed peer through a failed write
    fn closed(&self) -> impl Future<Output = ()> + Send {
        std::future::pending()
    }
}
