//! Message output stream state machine.
//!
//! Turns buffered application bytes into protected payload chunks behind a
//! negotiated header, written to an abstract byte sink.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐ first op ┌───────────────┐ header+flush ┌───────┐ flush* ┌────────┐
//! │ Created │─────────>│ HeaderPending │─────────────>│ Ready │───────>│ Closed │
//! └─────────┘          └───────────────┘              └───────┘        └────────┘
//!                             │                            │
//!                             └──────────┬─────────────────┘
//!                                        ↓
//!               Aborted / TimedOut / Errored (absorbing, from any state)
//! ```
//!
//! The header is transmitted by the first operation that needs readiness;
//! until its write and an explicit sink flush both succeed the stream stays
//! header-pending. The three absorbing flags are checked in a fixed order on
//! every operation: aborted short-circuits silently, a timeout is reported
//! to the caller, and a previously recorded error is re-raised. That order
//! guarantees a caller aborting during header transmission never also sees a
//! stale timeout or error.
//!
//! # Concurrency
//!
//! One logical operation at a time per instance; the abort signal is the
//! only cross-task entry point, carried by a cloneable [`AbortHandle`]. The
//! readiness signal resolves at most one waiter, which matches the
//! one-in-flight-operation discipline; it is not a broadcast.
//!
//! Timeouts are caller-supplied per call and bound the underlying sink
//! operation, not the whole multi-step flush pipeline.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use bytes::BytesMut;
use mantle_crypto::CryptoContext;
use mantle_proto::{CompressionAlgorithm, ErrorHeader, Header, MessageCapabilities, MessageHeader};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Notify,
};
use tracing::{debug, warn};

use crate::{error::MslError, outcome::Outcome, payload::PayloadChunk};

/// Cooperative cancellation handle for one output stream.
///
/// Cloneable and shareable across tasks. Aborting releases the single
/// pending sink operation, if any, and makes every subsequent operation on
/// the stream resolve [`Outcome::Aborted`]. Abort is an operator request,
/// not a failure.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    inner: Arc<AbortState>,
}

#[derive(Debug, Default)]
struct AbortState {
    aborted: AtomicBool,
    notify: Notify,
}

impl AbortHandle {
    /// Mark the stream aborted and release the pending operation.
    pub fn abort(&self) {
        self.inner.aborted.store(true, Ordering::SeqCst);
        // Single-waiter readiness signal; the permit is stored if nothing
        // is waiting yet.
        self.inner.notify.notify_one();
    }

    /// Whether the stream has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if self.is_aborted() {
            return;
        }
        self.inner.notify.notified().await;
    }
}

enum Gate {
    Open,
    Aborted,
    TimedOut,
    Errored(MslError),
}

enum SinkOp<T> {
    Done(std::io::Result<T>),
    TimedOut,
    Aborted,
}

/// Protected message output stream over an abstract byte sink.
///
/// Exactly one header per stream. A data-bearing message header admits
/// payload writes; error and handshake headers do not. Emitted chunks are
/// cached for possible resend until caching is disabled.
pub struct MessageOutputStream<S> {
    sink: S,
    header: Header,
    /// Compression algorithms in the local/remote capability intersection.
    negotiated: Vec<CompressionAlgorithm>,
    compression: Option<CompressionAlgorithm>,
    crypto: Arc<dyn CryptoContext>,
    buffer: BytesMut,
    next_sequence: u64,
    header_sent: bool,
    closed: bool,
    end_of_message_sent: bool,
    timed_out: bool,
    error: Option<MslError>,
    abort: AbortHandle,
    caching: bool,
    chunks: Vec<PayloadChunk>,
    close_destination: bool,
}

impl<S: AsyncWrite + Unpin + Send> MessageOutputStream<S> {
    /// Create a stream for a data-bearing or handshake message.
    ///
    /// The negotiated compression set is the intersection of
    /// `local_capabilities` and the capabilities carried by `header`; the
    /// best algorithm of that set is selected initially. The header is
    /// transmitted by the first operation that needs the stream ready.
    pub fn new(
        sink: S,
        header: MessageHeader,
        crypto: Arc<dyn CryptoContext>,
        local_capabilities: Option<&MessageCapabilities>,
    ) -> Self {
        let negotiated = match (local_capabilities, header.capabilities.as_ref()) {
            (Some(local), Some(remote)) => local.intersect(remote).compression_algorithms,
            _ => Vec::new(),
        };
        let compression = CompressionAlgorithm::preferred(&negotiated);
        Self::with_header(sink, Header::Message(header), crypto, negotiated, compression)
    }

    /// Create a stream for an error message. Error messages carry no
    /// payload chunks; only the header is ever written.
    pub fn error(sink: S, header: ErrorHeader, crypto: Arc<dyn CryptoContext>) -> Self {
        Self::with_header(sink, Header::Error(header), crypto, Vec::new(), None)
    }

    fn with_header(
        sink: S,
        header: Header,
        crypto: Arc<dyn CryptoContext>,
        negotiated: Vec<CompressionAlgorithm>,
        compression: Option<CompressionAlgorithm>,
    ) -> Self {
        Self {
            sink,
            header,
            negotiated,
            compression,
            crypto,
            buffer: BytesMut::new(),
            next_sequence: 1,
            header_sent: false,
            closed: false,
            end_of_message_sent: false,
            timed_out: false,
            error: None,
            abort: AbortHandle::default(),
            caching: true,
            chunks: Vec::new(),
            close_destination: false,
        }
    }

    /// Handle for aborting this stream from another task.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Abort the stream. See [`AbortHandle::abort`].
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Transmit the header if it has not been transmitted yet.
    ///
    /// Construction never performs I/O; this is the explicit way to move
    /// the stream to ready before the first flush.
    pub async fn transmit_header(&mut self, timeout: Duration) -> Result<Outcome<()>, MslError> {
        match self.gate() {
            Gate::Open => {},
            Gate::Aborted => return Ok(Outcome::Aborted),
            Gate::TimedOut => return Ok(Outcome::TimedOut),
            Gate::Errored(err) => return Err(err),
        }
        self.ensure_ready(timeout).await
    }

    /// Buffer application bytes for the next payload chunk.
    ///
    /// Returns the number of bytes accepted. Valid only on a data-bearing
    /// message; error and handshake messages reject payload data.
    ///
    /// # Errors
    ///
    /// [`MslError::IllegalState`] if the stream is closed or the header is
    /// an error or handshake header.
    pub fn write(&mut self, data: &[u8]) -> Result<Outcome<usize>, MslError> {
        match self.gate() {
            Gate::Open => {},
            Gate::Aborted => return Ok(Outcome::Aborted),
            Gate::TimedOut => return Ok(Outcome::TimedOut),
            Gate::Errored(err) => return Err(err),
        }
        if self.closed {
            return Err(MslError::IllegalState("message output stream is closed"));
        }
        match &self.header {
            Header::Error(_) => {
                Err(MslError::IllegalState("cannot write payload data for an error message"))
            },
            Header::Message(header) if header.handshake => {
                Err(MslError::IllegalState("cannot write payload data for a handshake message"))
            },
            Header::Message(_) => {
                self.buffer.extend_from_slice(data);
                Ok(Outcome::Completed(data.len()))
            },
        }
    }

    /// Switch the payload compression algorithm.
    ///
    /// Returns `Completed(false)`, not an error, when the requested
    /// algorithm is outside the negotiated set, leaving the current
    /// algorithm in place. Buffered data is flushed under the old algorithm
    /// before the switch takes effect.
    ///
    /// # Errors
    ///
    /// [`MslError::IllegalState`] on an error message.
    pub async fn set_compression_algorithm(
        &mut self,
        algo: Option<CompressionAlgorithm>,
        timeout: Duration,
    ) -> Result<Outcome<bool>, MslError> {
        match self.gate() {
            Gate::Open => {},
            Gate::Aborted => return Ok(Outcome::Aborted),
            Gate::TimedOut => return Ok(Outcome::TimedOut),
            Gate::Errored(err) => return Err(err),
        }
        if matches!(self.header, Header::Error(_)) {
            return Err(MslError::IllegalState(
                "cannot set compression algorithm on an error message",
            ));
        }
        if self.compression == algo {
            return Ok(Outcome::Completed(true));
        }
        if let Some(requested) = algo {
            if !self.negotiated.contains(&requested) {
                return Ok(Outcome::Completed(false));
            }
        }
        if !self.buffer.is_empty() {
            let flushed = self.flush(timeout).await?;
            if flushed.completed().is_none() {
                return Ok(flushed.map(|()| false));
            }
        }
        self.compression = algo;
        Ok(Outcome::Completed(true))
    }

    /// Emit one payload chunk from the buffered bytes.
    ///
    /// No-op for error and handshake messages, and when nothing is buffered
    /// unless the stream is closing (the close path flushes to force the
    /// end-of-message chunk). Transmits the header first if it is still
    /// pending.
    pub async fn flush(&mut self, timeout: Duration) -> Result<Outcome<()>, MslError> {
        match self.gate() {
            Gate::Open => {},
            Gate::Aborted => return Ok(Outcome::Aborted),
            Gate::TimedOut => return Ok(Outcome::TimedOut),
            Gate::Errored(err) => return Err(err),
        }
        match &self.header {
            // Error and handshake messages never carry payload chunks.
            Header::Error(_) => return Ok(Outcome::Completed(())),
            Header::Message(header) if header.handshake => return Ok(Outcome::Completed(())),
            Header::Message(_) => {},
        }
        if self.end_of_message_sent || (self.buffer.is_empty() && !self.closed) {
            return Ok(Outcome::Completed(()));
        }

        let ready = self.ensure_ready(timeout).await?;
        if ready.completed().is_none() {
            return Ok(ready);
        }

        let message_id = self.header.message_id();
        let sequence_number = self.next_sequence;
        let end_of_message = self.closed;
        let data = self.buffer.split();

        let chunk = PayloadChunk::create(
            sequence_number,
            message_id,
            end_of_message,
            self.compression,
            &data,
            self.crypto.as_ref(),
        );
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => return Err(self.record_error(err)),
        };
        let bytes = match chunk.encode() {
            Ok(bytes) => bytes,
            Err(err) => return Err(self.record_error(err)),
        };

        self.next_sequence += 1;
        if end_of_message {
            self.end_of_message_sent = true;
        }
        if self.caching {
            self.chunks.push(chunk);
        }

        let abort = self.abort.clone();
        let written = guarded(&abort, timeout, self.sink.write_all(&bytes)).await;
        let written = self.settle(written)?;
        if written.completed().is_none() {
            return Ok(written);
        }
        let flushed = guarded(&abort, timeout, self.sink.flush()).await;
        let flushed = self.settle(flushed)?;
        if flushed.completed().is_some() {
            debug!(
                message_id,
                sequence_number,
                end_of_message,
                decoded_bytes = data.len(),
                wire_bytes = bytes.len(),
                "emitted payload chunk"
            );
        }
        Ok(flushed)
    }

    /// Close the stream, emitting the end-of-message chunk.
    ///
    /// Idempotent. Buffered bytes are flushed as a regular chunk first, so
    /// a data-bearing message always ends with exactly one dedicated
    /// end-of-message chunk, empty-data and last. The destination sink is
    /// shut down only when the caller opted in via
    /// [`Self::set_close_destination`], so a multiplexed sink can be
    /// reused.
    pub async fn close(&mut self, timeout: Duration) -> Result<Outcome<()>, MslError> {
        match self.gate() {
            Gate::Open => {},
            Gate::Aborted => return Ok(Outcome::Aborted),
            Gate::TimedOut => return Ok(Outcome::TimedOut),
            Gate::Errored(err) => return Err(err),
        }
        if self.closed {
            return Ok(Outcome::Completed(()));
        }

        let ready = self.ensure_ready(timeout).await?;
        if ready.completed().is_none() {
            return Ok(ready);
        }
        if !self.buffer.is_empty() {
            let flushed = self.flush(timeout).await?;
            if flushed.completed().is_none() {
                return Ok(flushed);
            }
        }
        self.closed = true;
        let flushed = self.flush(timeout).await?;
        if flushed.completed().is_none() {
            return Ok(flushed);
        }

        if self.close_destination {
            let abort = self.abort.clone();
            let shut = guarded(&abort, timeout, self.sink.shutdown()).await;
            let shut = self.settle(shut)?;
            if shut.completed().is_none() {
                return Ok(shut);
            }
        }
        Ok(Outcome::Completed(()))
    }

    /// The message header, if this is not an error stream.
    #[must_use]
    pub fn message_header(&self) -> Option<&MessageHeader> {
        match &self.header {
            Header::Message(header) => Some(header),
            Header::Error(_) => None,
        }
    }

    /// The error header, if this is an error stream.
    #[must_use]
    pub fn error_header(&self) -> Option<&ErrorHeader> {
        match &self.header {
            Header::Error(header) => Some(header),
            Header::Message(_) => None,
        }
    }

    /// Compression algorithm currently in effect.
    #[must_use]
    pub fn compression_algorithm(&self) -> Option<CompressionAlgorithm> {
        self.compression
    }

    /// Chunks emitted so far, retained for resend while caching is on.
    #[must_use]
    pub fn payloads(&self) -> &[PayloadChunk] {
        &self.chunks
    }

    /// Stop retaining emitted chunks and drop those already cached.
    pub fn stop_caching(&mut self) {
        self.caching = false;
        self.chunks.clear();
    }

    /// Opt in or out of shutting down the sink on [`Self::close`].
    pub fn set_close_destination(&mut self, close_destination: bool) {
        self.close_destination = close_destination;
    }

    /// Absorbing-flag check shared by every operation. Order matters:
    /// aborted first, then timed out, then a recorded error.
    fn gate(&self) -> Gate {
        if self.abort.is_aborted() {
            return Gate::Aborted;
        }
        if self.timed_out {
            return Gate::TimedOut;
        }
        if let Some(err) = &self.error {
            return Gate::Errored(err.clone());
        }
        Gate::Open
    }

    async fn ensure_ready(&mut self, timeout: Duration) -> Result<Outcome<()>, MslError> {
        if self.header_sent {
            return Ok(Outcome::Completed(()));
        }
        let bytes = match self.header.encode() {
            Ok(bytes) => bytes,
            Err(err) => return Err(self.record_error(err.into())),
        };

        let abort = self.abort.clone();
        let written = guarded(&abort, timeout, self.sink.write_all(&bytes)).await;
        let written = self.settle(written)?;
        if written.completed().is_none() {
            return Ok(written);
        }
        let flushed = guarded(&abort, timeout, self.sink.flush()).await;
        let flushed = self.settle(flushed)?;
        if flushed.completed().is_some() {
            self.header_sent = true;
            debug!(message_id = self.header.message_id(), "transmitted message header");
        }
        Ok(flushed)
    }

    /// Fold a sink operation result into the stream state: record timeouts
    /// and errors so later operations fail fast instead of retrying
    /// silently.
    fn settle<T>(&mut self, op: SinkOp<T>) -> Result<Outcome<T>, MslError> {
        match op {
            SinkOp::Done(Ok(value)) => Ok(Outcome::Completed(value)),
            SinkOp::Done(Err(err)) => Err(self.record_error(err.into())),
            SinkOp::TimedOut => {
                warn!(message_id = self.header.message_id(), "sink operation timed out");
                self.timed_out = true;
                Ok(Outcome::TimedOut)
            },
            SinkOp::Aborted => Ok(Outcome::Aborted),
        }
    }

    fn record_error(&mut self, err: MslError) -> MslError {
        warn!(message_id = self.header.message_id(), error = %err, "recorded stream error");
        self.error = Some(err.clone());
        err
    }
}

/// Race a sink operation against the caller's timeout and the abort signal.
async fn guarded<T, F>(abort: &AbortHandle, timeout: Duration, op: F) -> SinkOp<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    tokio::select! {
        biased;
        () = abort.wait() => SinkOp::Aborted,
        result = tokio::time::timeout(timeout, op) => match result {
            Ok(done) => SinkOp::Done(done),
            Err(_elapsed) => SinkOp::TimedOut,
        },
    }
}
