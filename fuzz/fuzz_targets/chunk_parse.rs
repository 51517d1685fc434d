//! Fuzz payload chunk parsing with arbitrary bytes.
//!
//! The pass-through crypto context accepts any signature, so fuzz input
//! reaches envelope decoding and decompression. Parsing must fail cleanly
//! on malformed input, never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mantle_core::PayloadChunk;
use mantle_crypto::NullCryptoContext;

fuzz_target!(|data: &[u8]| {
    let _ = PayloadChunk::parse(data, &NullCryptoContext);
});
