//! Payload chunk wire envelope.
//!
//! A payload chunk crosses the wire as ciphertext plus a signature over that
//! ciphertext. The plaintext under the ciphertext is a [`PayloadEnvelope`]
//! carrying the sequence number, owning message id, end-of-message flag, and
//! the (possibly compressed) application bytes. Because sequencing metadata
//! sits inside the protected envelope, reordering or truncating chunks is
//! detectable by the receiver.

use serde::{Deserialize, Serialize};

use crate::{
    capabilities::CompressionAlgorithm,
    errors::{ProtocolError, Result},
    header::MAX_MESSAGE_ID,
};

/// Payload size limit, preventing memory exhaustion on parse.
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Plaintext payload envelope; this is what gets encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadEnvelope {
    /// Position of this chunk within its message, starting at 1.
    pub sequence_number: u64,
    /// Message id of the owning header.
    pub message_id: u64,
    /// Set on the last chunk of a message, and only on it.
    pub end_of_message: bool,
    /// Algorithm the data was compressed with, if any.
    pub compression: Option<CompressionAlgorithm>,
    /// Application bytes, compressed per `compression`.
    pub data: Vec<u8>,
}

impl PayloadEnvelope {
    /// Create a payload envelope.
    ///
    /// # Errors
    ///
    /// Rejects sequence number 0, out-of-range message ids, and over-limit
    /// data.
    pub fn new(
        sequence_number: u64,
        message_id: u64,
        end_of_message: bool,
        compression: Option<CompressionAlgorithm>,
        data: Vec<u8>,
    ) -> Result<Self> {
        if sequence_number == 0 {
            return Err(ProtocolError::InvalidField {
                field: "sequence_number",
                reason: "sequence numbers start at 1".into(),
            });
        }
        if message_id > MAX_MESSAGE_ID {
            return Err(ProtocolError::InvalidField {
                field: "message_id",
                reason: format!("{message_id} exceeds {MAX_MESSAGE_ID}"),
            });
        }
        if data.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge(data.len()));
        }
        Ok(Self { sequence_number, message_id, end_of_message, compression, data })
    }

    /// Serialize to CBOR bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| ProtocolError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Parse from CBOR bytes, re-validating the wire invariants.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let envelope: Self =
            ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))?;
        Self::new(
            envelope.sequence_number,
            envelope.message_id,
            envelope.end_of_message,
            envelope.compression,
            envelope.data,
        )
    }
}

/// Protected chunk as it crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadChunkWire {
    /// Ciphertext of the CBOR-encoded [`PayloadEnvelope`].
    pub payload: Vec<u8>,
    /// Signature over `payload`.
    pub signature: Vec<u8>,
}

impl PayloadChunkWire {
    /// Serialize to CBOR bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| ProtocolError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Parse from CBOR bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_PAYLOAD_SIZE + 1024 {
            return Err(ProtocolError::PayloadTooLarge(bytes.len()));
        }
        ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}
