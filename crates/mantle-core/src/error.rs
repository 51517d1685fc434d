//! Core error taxonomy.

use std::sync::Arc;

use mantle_crypto::CryptoError;
use mantle_proto::ProtocolError;
use thiserror::Error;

/// Errors surfaced by the protocol core.
///
/// Timeouts and aborts are deliberately absent: they are delivered through
/// [`crate::Outcome`], not as errors, since an abort is a cooperative
/// cancellation and a timeout leaves the retry decision with the caller.
///
/// The type is `Clone` because a stream records its first mid-stream failure
/// and replays it to every later operation until the instance is discarded.
#[derive(Debug, Clone, Error)]
pub enum MslError {
    /// Malformed wire object; unrecoverable for that message.
    #[error("encoding error: {0}")]
    Encoding(#[from] ProtocolError),

    /// Key, algorithm, or signature problem; unrecoverable for that
    /// operation.
    #[error("crypto failure: {0}")]
    Crypto(#[from] CryptoError),

    /// Sink-level write or flush problem, wrapping the underlying cause.
    #[error("i/o failure: {0}")]
    Io(#[source] Arc<std::io::Error>),

    /// Protocol misuse, such as writing to a closed or error-typed stream.
    /// A programmer error, never retried.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),

    /// An X.509 certificate could not be decoded.
    #[error("certificate parse error: {0}")]
    CertificateParse(String),
}

impl From<std::io::Error> for MslError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl MslError {
    /// Wrap any failure as an I/O failure with the original as its cause.
    ///
    /// Payload chunk construction is all-or-nothing; its compression and
    /// crypto failures surface to the stream as I/O failures.
    #[must_use]
    pub fn into_io(self) -> Self {
        match self {
            Self::Io(_) => self,
            other => Self::Io(Arc::new(std::io::Error::other(other))),
        }
    }
}
