//! Protocol capability seam for responses
//!
//! The accounting core is protocol-agnostic; everything variant-specific
//! (streamed vs buffered bodies, header-finalization hand-off, status-line
//! rendering, the transmit entry point) lives behind [`ResponseProtocol`],
//! selected at response construction. HTTP/1.1 and HTTP/2 implementations
//! are provided here; the connection layer picks one per request.

mod http1;
mod http2;

pub use http1::Http1Protocol;
pub use http2::Http2Protocol;

use async_trait::async_trait;
use tokio::io::AsyncWrite;

/// Server-generated statuses the core drives on its own error paths
///
/// Only the statuses the accounting core itself produces (admission
/// rejection, its own ok/not-found paths) appear here; application statuses
/// are the handler layer's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Ok,
    NotFound,
    ServiceUnavailable,
}

/// Capabilities a protocol variant supplies to the response lifecycle
#[async_trait]
pub trait ResponseProtocol: Send + Sync + std::fmt::Debug {
    /// Whether the body is produced incrementally rather than fully
    /// buffered before sending.
    fn body_streamed(&self) -> bool;

    /// Suspend until another task finalizes the headers.
    ///
    /// Single-writer/single-reader: one producer task calls
    /// [`signal_headers_end`](Self::signal_headers_end), one consumer waits
    /// here. Returns immediately if the signal already fired.
    async fn wait_headers_end(&self);

    /// Signal the waiting task that headers are finalized.
    fn signal_headers_end(&self);

    /// Render the status line for a server-generated status.
    fn status_line(&self, status: ServerStatus) -> &'static str;

    /// Transmit the payload; returns the number of bytes written.
    ///
    /// The writer is whatever transport the connection layer hands in; this
    /// crate never owns sockets.
    async fn send_payload(
        &self,
        payload: &[u8],
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> std::io::Result<usize>;
}
