//! Wire format for the Mantle secure messaging protocol.
//!
//! A message consists of a negotiated header followed by a sequence of
//! protected payload chunks. Headers and chunks are CBOR objects with a
//! fixed field order, so serializing, parsing, and re-serializing any wire
//! object yields byte-identical output. That stability is what lets
//! signatures computed over serialized bytes survive a round trip.
//!
//! This crate holds only the value types and their encoding. Chunk
//! protection (compress, encrypt, sign) and the output state machine live
//! in `mantle-core`; cryptographic contexts live in `mantle-crypto`.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod capabilities;
pub mod errors;
pub mod header;
pub mod payload;

pub use capabilities::{CompressionAlgorithm, EncoderFormat, MessageCapabilities};
pub use errors::{ProtocolError, Result};
pub use header::{ErrorHeader, Header, MessageHeader, MAX_MESSAGE_ID};
pub use payload::{PayloadChunkWire, PayloadEnvelope, MAX_PAYLOAD_SIZE};
