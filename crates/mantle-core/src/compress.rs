//! Payload compression.
//!
//! Implements the two wire compression algorithms: gzip (flate2) and
//! variable-width LZW over 8-bit symbols (weezl). Callers decide whether to
//! use the compressed form; this module only performs the transforms.
//!
//! Decompressed output is capped at the wire payload limit, so a small
//! hostile chunk cannot amplify past the bound the wire layer enforces on
//! its own bytes.

use std::io::{Read, Write};

use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use mantle_proto::{CompressionAlgorithm, MAX_PAYLOAD_SIZE, ProtocolError};
use weezl::{BitOrder, LzwStatus};

use crate::error::MslError;

const LZW_MIN_CODE_SIZE: u8 = 8;

/// Compress `data` with `algo`.
pub fn compress(algo: CompressionAlgorithm, data: &[u8]) -> Result<Vec<u8>, MslError> {
    match algo {
        CompressionAlgorithm::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            encoder.finish().map_err(MslError::from)
        },
        CompressionAlgorithm::Lzw => weezl::encode::Encoder::new(BitOrder::Msb, LZW_MIN_CODE_SIZE)
            .encode(data)
            .map_err(|e| MslError::from(std::io::Error::other(e))),
    }
}

/// Decompress `data` previously compressed with `algo`.
///
/// # Errors
///
/// Rejects output larger than [`MAX_PAYLOAD_SIZE`] with
/// [`ProtocolError::PayloadTooLarge`], so decompression bombs fail instead
/// of exhausting memory.
pub fn decompress(algo: CompressionAlgorithm, data: &[u8]) -> Result<Vec<u8>, MslError> {
    match algo {
        CompressionAlgorithm::Gzip => {
            let mut decoder = GzDecoder::new(data).take(MAX_PAYLOAD_SIZE as u64 + 1);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out)?;
            check_decompressed_size(out.len())?;
            Ok(out)
        },
        CompressionAlgorithm::Lzw => {
            let mut decoder = weezl::decode::Decoder::new(BitOrder::Msb, LZW_MIN_CODE_SIZE);
            let mut out = Vec::new();
            let mut buf = [0_u8; 8192];
            let mut consumed = 0;
            loop {
                let result = decoder.decode_bytes(&data[consumed..], &mut buf);
                consumed += result.consumed_in;
                out.extend_from_slice(&buf[..result.consumed_out]);
                check_decompressed_size(out.len())?;
                match result.status {
                    Ok(LzwStatus::Done) => break,
                    Ok(LzwStatus::Ok) => {},
                    // End of input without an explicit end code.
                    Ok(LzwStatus::NoProgress) if consumed == data.len() => break,
                    Ok(LzwStatus::NoProgress) => {
                        return Err(MslError::from(std::io::Error::other("lzw stream stalled")));
                    },
                    Err(e) => return Err(MslError::from(std::io::Error::other(e))),
                }
            }
            Ok(out)
        },
    }
}

fn check_decompressed_size(len: usize) -> Result<(), MslError> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge(len).into());
    }
    Ok(())
}
