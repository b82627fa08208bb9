//! HTTP/2 protocol capabilities
//!
//! HTTP/2 responses are streamed: a producer task finalizes headers while
//! the connection task waits on [`ResponseProtocol::wait_headers_end`], and
//! many logical responses share one transport (the multiplexed stream id on
//! the response correlates them).

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;

use super::{ResponseProtocol, ServerStatus};

#[derive(Debug)]
pub struct Http2Protocol {
    headers_end: Notify,
    headers_done: AtomicBool,
}

impl Http2Protocol {
    #[must_use]
    pub fn new() -> Self {
        Self {
            headers_end: Notify::new(),
            headers_done: AtomicBool::new(false),
        }
    }
}

impl Default for Http2Protocol {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseProtocol for Http2Protocol {
    fn body_streamed(&self) -> bool {
        true
    }

    async fn wait_headers_end(&self) {
        let mut notified = std::pin::pin!(self.headers_end.notified());
        // Register before checking the flag so a signal landing in between
        // still wakes us
        notified.as_mut().enable();
        if self.headers_done.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }

    fn signal_headers_end(&self) {
        self.headers_done.store(true, Ordering::Release);
        self.headers_end.notify_waiters();
    }

    fn status_line(&self, status: ServerStatus) -> &'static str {
        match status {
            ServerStatus::Ok => ":status: 200",
            ServerStatus::NotFound => ":status: 404",
            ServerStatus::ServiceUnavailable => ":status: 503",
        }
    }

    async fn send_payload(
        &self,
        payload: &[u8],
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> std::io::Result<usize> {
        writer.write_all(payload).await?;
        writer.flush().await?;
        Ok(payload.len())
    }
}
