//! Message and error headers.
//!
//! Every output stream carries exactly one header. A message header opens a
//! data-bearing or handshake message and is followed by payload chunks; an
//! error header is terminal and carries no payload at all.

use serde::{Deserialize, Serialize};

use crate::{
    capabilities::MessageCapabilities,
    errors::{ProtocolError, Result},
};

/// Largest valid message id.
///
/// Message ids are capped at 2^53 - 1 so peers that hold them in IEEE-754
/// doubles never lose precision.
pub const MAX_MESSAGE_ID: u64 = (1 << 53) - 1;

/// Header of a data-bearing or handshake message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Message id; payload chunks bind to this value.
    pub message_id: u64,
    /// Handshake messages carry no application payload.
    pub handshake: bool,
    /// Capabilities negotiated for this message, if any were exchanged.
    pub capabilities: Option<MessageCapabilities>,
}

impl MessageHeader {
    /// Create a message header.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidField`] if `message_id` exceeds
    /// [`MAX_MESSAGE_ID`].
    pub fn new(
        message_id: u64,
        handshake: bool,
        capabilities: Option<MessageCapabilities>,
    ) -> Result<Self> {
        check_message_id(message_id)?;
        Ok(Self { message_id, handshake, capabilities })
    }
}

/// Header of an error message.
///
/// Error messages never carry payload chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorHeader {
    /// Message id of the exchange this error responds to.
    pub message_id: u64,
    /// Numeric error code.
    pub error_code: u32,
    /// Human-readable error message.
    pub error_message: String,
}

impl ErrorHeader {
    /// Create an error header.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidField`] if `message_id` exceeds
    /// [`MAX_MESSAGE_ID`].
    pub fn new(message_id: u64, error_code: u32, error_message: impl Into<String>) -> Result<Self> {
        check_message_id(message_id)?;
        Ok(Self { message_id, error_code, error_message: error_message.into() })
    }
}

/// Either kind of header. A stream holds exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "header")]
pub enum Header {
    /// Data-bearing or handshake message.
    Message(MessageHeader),
    /// Terminal error message.
    Error(ErrorHeader),
}

impl Header {
    /// Message id carried by either header kind.
    #[must_use]
    pub fn message_id(&self) -> u64 {
        match self {
            Self::Message(header) => header.message_id,
            Self::Error(header) => header.message_id,
        }
    }

    /// Serialize to CBOR bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| ProtocolError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Parse from CBOR bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

fn check_message_id(message_id: u64) -> Result<()> {
    if message_id > MAX_MESSAGE_ID {
        return Err(ProtocolError::InvalidField {
            field: "message_id",
            reason: format!("{message_id} exceeds {MAX_MESSAGE_ID}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CompressionAlgorithm;

    #[test]
    fn header_roundtrip_is_stable() {
        let capabilities = MessageCapabilities::new(
            vec![CompressionAlgorithm::Gzip],
            vec!["en-US".into()],
            vec![crate::EncoderFormat::Cbor],
        );
        let header =
            Header::Message(MessageHeader::new(42, false, Some(capabilities)).unwrap());

        let bytes = header.encode().unwrap();
        let parsed = Header::decode(&bytes).unwrap();
        assert_eq!(parsed, header);

        // Re-encoding the parsed header must be byte-identical.
        assert_eq!(hex::encode(parsed.encode().unwrap()), hex::encode(&bytes));
    }

    #[test]
    fn error_header_roundtrip() {
        let header = Header::Error(ErrorHeader::new(7, 5000, "entity rejected").unwrap());
        let bytes = header.encode().unwrap();
        assert_eq!(Header::decode(&bytes).unwrap(), header);
    }

    #[test]
    fn oversized_message_id_rejected() {
        let err = MessageHeader::new(MAX_MESSAGE_ID + 1, false, None).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidField { field: "message_id", .. }));

        let err = ErrorHeader::new(u64::MAX, 1, "bad").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidField { field: "message_id", .. }));
    }

    #[test]
    fn truncated_header_fails_decode() {
        let header = Header::Error(ErrorHeader::new(7, 5000, "entity rejected").unwrap());
        let bytes = header.encode().unwrap();
        assert!(matches!(Header::decode(&bytes[..bytes.len() - 3]), Err(ProtocolError::Decode(_))));
    }
}
