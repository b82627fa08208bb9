//! HTTP/1.1 protocol capabilities
//!
//! HTTP/1.1 responses here are fully buffered: headers and body are
//! finalized together, so the header hand-off degenerates to an
//! already-signalled notify and the send path is a single write.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;

use super::{ResponseProtocol, ServerStatus};

#[derive(Debug)]
pub struct Http1Protocol {
    headers_end: Notify,
}

impl Http1Protocol {
    #[must_use]
    pub fn new() -> Self {
        Self {
            headers_end: Notify::new(),
        }
    }
}

impl Default for Http1Protocol {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseProtocol for Http1Protocol {
    fn body_streamed(&self) -> bool {
        false
    }

    async fn wait_headers_end(&self) {
        self.headers_end.notified().await;
    }

    fn signal_headers_end(&self) {
        // notify_one stores a permit, so a late waiter returns immediately
        self.headers_end.notify_one();
    }

    fn status_line(&self, status: ServerStatus) -> &'static str {
        match status {
            ServerStatus::Ok => "HTTP/1.1 200 OK",
            ServerStatus::NotFound => "HTTP/1.1 404 Not Found",
            ServerStatus::ServiceUnavailable => "HTTP/1.1 503 Service Unavailable",
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
