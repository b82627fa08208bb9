//! Per-request response lifecycle with scope-bound accounting
//!
//! A [`Response`] registers its declared payload size with the shared
//! [`ResponseDataAccounter`] for its whole lifetime. The registration is
//! held by an [`AccountingGuard`] created at construction; its `Drop` fires
//! the matching `stop_request` on every exit path (normal completion, early
//! return, task cancellation, panic unwinding), which makes an accounting
//! leak structurally impossible rather than merely unlikely.
//!
//! The accounted size is reserved/buffered capacity. Wire bytes are tracked
//! separately in `bytes_sent`; the two are deliberately never conflated.

use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWrite;
use tracing::{debug, trace};

use crate::accounting::ResponseDataAccounter;
use crate::protocol::{ResponseProtocol, ServerStatus};
use crate::types::StreamId;

/// Scope-bound start/stop pairing for one response's accounted bytes
///
/// Constructing the guard performs `start_request`; dropping it performs the
/// matching `stop_request`. Exactly one guard exists per response.
#[derive(Debug)]
struct AccountingGuard {
    accounter: Arc<ResponseDataAccounter>,
    size: usize,
    create_time: Instant,
}

impl AccountingGuard {
    fn new(accounter: Arc<ResponseDataAccounter>, size: usize, create_time: Instant) -> Self {
        accounter.start_request(size, create_time);
        Self {
            accounter,
            size,
            create_time,
        }
    }
}

impl Drop for AccountingGuard {
    fn drop(&mut self) {
        self.accounter.stop_request(self.size, self.create_time);
    }
}

/// One in-progress response
///
/// Constructed when a request begins being handled, destroyed when the
/// response has been fully sent, failed, or the request was abandoned.
/// Protocol-specific behavior (streamed bodies, header hand-off, status
/// rendering, the transmit entry point) comes from the [`ResponseProtocol`]
/// chosen at construction.
#[derive(Debug)]
pub struct Response {
    accounter: Arc<ResponseDataAccounter>,
    guard: AccountingGuard,
    protocol: Box<dyn ResponseProtocol>,
    data: Vec<u8>,
    create_time: Instant,
    ready_time: Option<Instant>,
    sent_time: Option<Instant>,
    send_failed_time: Option<Instant>,
    bytes_sent: usize,
    is_ready: bool,
    is_sent: bool,
    stream_id: Option<StreamId>,
}

impl Response {
    /// Create a response accounted at `size` bytes against `accounter`.
    ///
    /// Accounting starts immediately and stops when the response is
    /// dropped, whichever path destroys it.
    #[must_use]
    pub fn new(
        accounter: Arc<ResponseDataAccounter>,
        protocol: Box<dyn ResponseProtocol>,
        size: usize,
    ) -> Self {
        let create_time = Instant::now();
        let guard = AccountingGuard::new(Arc::clone(&accounter), size, create_time);
        trace!(size, "response created, bytes accounted");
        Self {
            accounter,
            guard,
            protocol,
            data: Vec::new(),
            create_time,
            ready_time: None,
            sent_time: None,
            send_failed_time: None,
            bytes_sent: 0,
            is_ready: false,
            is_sent: false,
            stream_id: None,
        }
    }

    /// The core's own admission-rejection response.
    ///
    /// Built when the connection layer refuses new work because
    /// [`ResponseDataAccounter::is_limit_reached`] fired: a ready-to-send
    /// 503 driven through the same protocol seam as application responses.
    #[must_use]
    pub fn service_unavailable(
        accounter: Arc<ResponseDataAccounter>,
        protocol: Box<dyn ResponseProtocol>,
    ) -> Self {
        let body = protocol
            .status_line(ServerStatus::ServiceUnavailable)
            .as_bytes()
            .to_vec();
        debug!(level = accounter.current_level(), "admission rejected, emitting 503");
        let mut response = Self::new(accounter, protocol, body.len());
        response.set_data(body);
        response.set_ready();
        response
    }

    /// Replace the payload buffer.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Borrow the payload buffer.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take ownership of the payload, leaving the response's buffer empty.
    /// Single consumption: a second call returns an empty buffer.
    #[must_use]
    pub fn take_data(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    /// Mark headers/body finalized and available to send.
    pub fn set_ready(&mut self) {
        self.set_ready_at(Instant::now());
    }

    /// [`set_ready`](Self::set_ready) with an injected timestamp for
    /// deterministic tests.
    pub fn set_ready_at(&mut self, now: Instant) {
        self.is_ready = true;
        self.ready_time = Some(now);
        self.protocol.signal_headers_end();
        trace!("response ready");
    }

    /// Record that transmitting the response failed.
    ///
    /// Does not release accounted bytes: the buffer is still held, and the
    /// accounted footprint reflects memory genuinely held, not "logically
    /// done". Release happens only at destruction via the guard.
    pub fn set_send_failed(&mut self, failure_time: Instant) {
        self.send_failed_time = Some(failure_time);
        self.is_sent = false;
        debug!(size = self.guard.size, "response send failed");
    }

    /// Record how many bytes reached the transport and when. Invoked by the
    /// send path once the protocol has written the payload; not part of the
    /// external API.
    pub(crate) fn set_sent(&mut self, bytes_sent: usize, sent_time: Instant) {
        self.bytes_sent = bytes_sent;
        self.sent_time = Some(sent_time);
        self.is_sent = true;
    }

    /// Transmit the payload through the protocol's send entry point.
    ///
    /// For streamed protocols this first waits until the producing task has
    /// finalized the headers. On success records bytes sent; on error
    /// records the failure and propagates it (retry policy is the
    /// connection layer's business).
    pub async fn send(
        &mut self,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> std::io::Result<usize> {
        if self.protocol.body_streamed() {
            self.protocol.wait_headers_end().await;
        }
        let outcome = self.protocol.send_payload(&self.data, writer).await;
        match outcome {
            Ok(written) => {
                self.set_sent(written, Instant::now());
                Ok(written)
            }
            Err(err) => {
                self.set_send_failed(Instant::now());
                Err(err)
            }
        }
    }

    /// Passthrough to the shared accounter's admission signal, so the
    /// connection layer can check backpressure with the response in hand.
    #[must_use]
    pub fn is_limit_reached(&self) -> bool {
        self.accounter.is_limit_reached()
    }

    /// Correlate this response with a multiplexed stream. Set once; later
    /// calls are ignored.
    pub fn set_stream_id(&mut self, stream_id: StreamId) {
        debug_assert!(self.stream_id.is_none(), "stream id set twice");
        if self.stream_id.is_none() {
            self.stream_id = Some(stream_id);
        }
    }

    #[must_use]
    pub fn stream_id(&self) -> Option<StreamId> {
        self.stream_id
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.is_ready
    }

    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.is_sent
    }

    #[must_use]
    pub fn is_send_failed(&self) -> bool {
        self.send_failed_time.is_some()
    }

    /// Wire bytes that reached the transport; independent of the accounted
    /// size.
    #[must_use]
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    /// Declared size this response holds against the accounter.
    #[must_use]
    pub fn accounted_size(&self) -> usize {
        self.guard.size
    }

    #[must_use]
    pub fn create_time(&self) -> Instant {
        self.create_time
    }

    #[must_use]
    pub fn ready_time(&self) -> Option<Instant> {
        self.ready_time
    }

    #[must_use]
    pub fn sent_time(&self) -> Option<Instant> {
        self.sent_time
    }

    /// Whether this response's body is produced incrementally.
    #[must_use]
    pub fn body_streamed(&self) -> bool {
        self.protocol.body_streamed()
    }
}
