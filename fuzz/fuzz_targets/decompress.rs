//! Fuzz decompression of arbitrary bytes under both algorithms.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mantle_core::compress::decompress;
use mantle_proto::CompressionAlgorithm;

fuzz_target!(|data: &[u8]| {
    let _ = decompress(CompressionAlgorithm::Gzip, data);
    let _ = decompress(CompressionAlgorithm::Lzw, data);
});
