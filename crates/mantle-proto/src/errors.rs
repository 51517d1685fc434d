//! Protocol error types.

use thiserror::Error;

/// Result type for wire encoding and decoding operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while building, encoding, or decoding wire objects.
///
/// These are unrecoverable for the message that produced them; the caller
/// discards the message rather than retrying. Errors are `Clone` because a
/// message stream records its first failure and replays it to every
/// subsequent operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A required field is absent from the wire object.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A field is present but holds a value outside its allowed range.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// CBOR serialization failed.
    #[error("encode failed: {0}")]
    Encode(String),

    /// CBOR deserialization failed, including missing or mistyped fields.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Payload data exceeds the wire size limit.
    #[error("payload of {0} bytes exceeds limit")]
    PayloadTooLarge(usize),
}
