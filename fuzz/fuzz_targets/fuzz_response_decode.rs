//! Fuzz target: `decode_response`
//!
//! Any frame either decodes to a response that re-encodes to a valid
//! frame, or is rejected with a typed error. Never panics.
//!
//! cargo fuzz run fuzz_response_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use linkmux::rpc::codec::encode_frame;
use linkmux::rpc::schema::{decode_response, encode_response};

fuzz_target!(|frame: &[u8]| {
    if let Ok(response) = decode_response(frame) {
        let bytes = encode_response(&response).expect("decoded response must re-encode");
        encode_frame(&bytes).expect("encoded response must not contain the terminator");
        let _ = response.payload_text();
    }
});
