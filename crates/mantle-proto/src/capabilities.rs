//! Message capabilities and compression negotiation.
//!
//! Each side of an exchange advertises the compression algorithms, languages,
//! and encoder formats it supports. The effective capabilities of a message
//! are the intersection of both sides' advertisements; payload compression
//! uses the best algorithm in that intersection.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Payload compression algorithms, in preference order.
///
/// `Gzip` is preferred over `Lzw` when both are negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum CompressionAlgorithm {
    /// DEFLATE with gzip framing.
    Gzip = 1,
    /// Variable-width LZW over 8-bit symbols.
    Lzw = 2,
}

impl CompressionAlgorithm {
    /// All algorithms in preference order.
    pub const PREFERENCE: [Self; 2] = [Self::Gzip, Self::Lzw];

    /// Best algorithm out of `candidates`, or `None` if the set is empty.
    #[must_use]
    pub fn preferred(candidates: &[Self]) -> Option<Self> {
        Self::PREFERENCE.iter().copied().find(|algo| candidates.contains(algo))
    }
}

/// Encoder formats a party can parse.
///
/// Encoder selection itself happens outside this crate; the format list only
/// rides the capabilities exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum EncoderFormat {
    /// Binary CBOR encoding.
    Cbor = 1,
    /// Text JSON encoding.
    Json = 2,
}

/// Capabilities advertised by one party of a message exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCapabilities {
    /// Supported compression algorithms, most preferred first.
    pub compression_algorithms: Vec<CompressionAlgorithm>,
    /// Supported languages as BCP-47 tags, most preferred first.
    pub languages: Vec<String>,
    /// Supported encoder formats.
    pub encoder_formats: Vec<EncoderFormat>,
}

impl MessageCapabilities {
    /// Create capabilities from the supported sets.
    #[must_use]
    pub fn new(
        compression_algorithms: Vec<CompressionAlgorithm>,
        languages: Vec<String>,
        encoder_formats: Vec<EncoderFormat>,
    ) -> Self {
        Self { compression_algorithms, languages, encoder_formats }
    }

    /// Intersection of two capability sets.
    ///
    /// Order follows `self`, so the local preference order survives
    /// negotiation.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            compression_algorithms: self
                .compression_algorithms
                .iter()
                .copied()
                .filter(|algo| other.compression_algorithms.contains(algo))
                .collect(),
            languages: self
                .languages
                .iter()
                .filter(|lang| other.languages.contains(lang))
                .cloned()
                .collect(),
            encoder_formats: self
                .encoder_formats
                .iter()
                .copied()
                .filter(|fmt| other.encoder_formats.contains(fmt))
                .collect(),
        }
    }

    /// Whether `algo` is in the supported set.
    #[must_use]
    pub fn supports(&self, algo: CompressionAlgorithm) -> bool {
        self.compression_algorithms.contains(&algo)
    }

    /// Best compression algorithm in the supported set.
    #[must_use]
    pub fn preferred_compression(&self) -> Option<CompressionAlgorithm> {
        CompressionAlgorithm::preferred(&self.compression_algorithms)
    }
}
