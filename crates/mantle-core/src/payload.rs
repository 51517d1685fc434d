//! Payload chunk construction and verification.
//!
//! A chunk is one ordered, protected unit of application bytes. Construction
//! is all-or-nothing: compress, encode the envelope, encrypt, sign, and only
//! then hand back an immutable chunk; a partially protected chunk is never
//! observable.

use mantle_crypto::{CryptoContext, CryptoError};
use mantle_proto::{CompressionAlgorithm, PayloadChunkWire, PayloadEnvelope};

use crate::{compress, error::MslError};

/// One cryptographically protected payload chunk.
///
/// Immutable after creation. Holds both the decoded application bytes and
/// the protected wire form, so cached chunks can be re-sent without
/// re-protecting them.
#[derive(Debug, Clone)]
pub struct PayloadChunk {
    sequence_number: u64,
    message_id: u64,
    end_of_message: bool,
    compression: Option<CompressionAlgorithm>,
    data: Vec<u8>,
    wire: PayloadChunkWire,
}

impl PayloadChunk {
    /// Protect `data` as the chunk `sequence_number` of message `message_id`.
    ///
    /// Compression is attempted when `compression` names an algorithm and
    /// `data` is non-empty, and used only when it actually shrinks the
    /// payload; otherwise the chunk records no compression. The sequencing
    /// metadata is bound inside the encrypted envelope, so reordering or
    /// truncation is detectable by the receiver.
    ///
    /// # Errors
    ///
    /// Compression, encoding, and crypto failures surface as
    /// [`MslError::Io`] wrapping the underlying cause. Construction never
    /// yields a partially protected chunk.
    pub fn create(
        sequence_number: u64,
        message_id: u64,
        end_of_message: bool,
        compression: Option<CompressionAlgorithm>,
        data: &[u8],
        crypto: &dyn CryptoContext,
    ) -> Result<Self, MslError> {
        Self::build(sequence_number, message_id, end_of_message, compression, data, crypto)
            .map_err(MslError::into_io)
    }

    fn build(
        sequence_number: u64,
        message_id: u64,
        end_of_message: bool,
        compression: Option<CompressionAlgorithm>,
        data: &[u8],
        crypto: &dyn CryptoContext,
    ) -> Result<Self, MslError> {
        let (compression, encoded) = match compression {
            Some(algo) if !data.is_empty() => {
                let compressed = compress::compress(algo, data)?;
                if compressed.len() < data.len() {
                    (Some(algo), compressed)
                } else {
                    (None, data.to_vec())
                }
            },
            _ => (None, data.to_vec()),
        };

        let envelope =
            PayloadEnvelope::new(sequence_number, message_id, end_of_message, compression, encoded)?;
        let plaintext = envelope.encode()?;
        let ciphertext = crypto.encrypt(&plaintext)?;
        let signature = crypto.sign(&ciphertext)?;

        Ok(Self {
            sequence_number,
            message_id,
            end_of_message,
            compression,
            data: data.to_vec(),
            wire: PayloadChunkWire { payload: ciphertext, signature },
        })
    }

    /// Verify and open a protected chunk.
    ///
    /// # Errors
    ///
    /// [`MslError::Crypto`] with a signature mismatch if the signature does
    /// not verify, decryption errors from the context, and
    /// [`MslError::Encoding`] if the decrypted envelope is malformed.
    pub fn parse(bytes: &[u8], crypto: &dyn CryptoContext) -> Result<Self, MslError> {
        let wire = PayloadChunkWire::decode(bytes)?;
        Self::from_wire(wire, crypto)
    }

    /// Verify and open an already-decoded wire chunk.
    pub fn from_wire(wire: PayloadChunkWire, crypto: &dyn CryptoContext) -> Result<Self, MslError> {
        if !crypto.verify(&wire.payload, &wire.signature)? {
            return Err(CryptoError::SignatureMismatch.into());
        }
        let plaintext = crypto.decrypt(&wire.payload)?;
        let envelope = PayloadEnvelope::decode(&plaintext)?;
        let data = match envelope.compression {
            Some(algo) => compress::decompress(algo, &envelope.data)?,
            None => envelope.data,
        };

        Ok(Self {
            sequence_number: envelope.sequence_number,
            message_id: envelope.message_id,
            end_of_message: envelope.end_of_message,
            compression: envelope.compression,
            data,
            wire,
        })
    }

    /// Serialize the protected wire form.
    pub fn encode(&self) -> Result<Vec<u8>, MslError> {
        self.wire.encode().map_err(MslError::from)
    }

    /// Position of this chunk within its message, starting at 1.
    #[must_use]
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Message id of the owning header.
    #[must_use]
    pub fn message_id(&self) -> u64 {
        self.message_id
    }

    /// Whether this is the final chunk of its message.
    #[must_use]
    pub fn is_end_of_message(&self) -> bool {
        self.end_of_message
    }

    /// Algorithm the wire data is compressed with, if any.
    #[must_use]
    pub fn compression(&self) -> Option<CompressionAlgorithm> {
        self.compression
    }

    /// Decoded application bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
