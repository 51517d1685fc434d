//! Crypto context error types.

use thiserror::Error;

/// Failures of crypto context operations.
///
/// The variants separate malformed input from key or algorithm problems so
/// callers can tell "this ciphertext is garbage" apart from "this context
/// holds the wrong keys".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Input is structurally invalid (too short, bad framing).
    #[error("malformed input: {0}")]
    Malformed(&'static str),

    /// A signature did not verify against the given data.
    #[error("signature verification failed")]
    SignatureMismatch,

    /// The context's keys or algorithm do not match the input.
    #[error("key or algorithm mismatch during {0}")]
    KeyMismatch(&'static str),

    /// The context does not support the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}
