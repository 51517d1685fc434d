//! Fuzz header decoding with arbitrary bytes.
//!
//! Decoding must reject malformed input with an error, never panic. A
//! successfully decoded header must re-encode and decode to the same value.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mantle_proto::Header;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = Header::decode(data) {
        let bytes = header.encode().unwrap();
        let reparsed = Header::decode(&bytes).unwrap();
        assert_eq!(reparsed, header);
    }
});
