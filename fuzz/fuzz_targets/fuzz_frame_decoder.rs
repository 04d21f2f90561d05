//! Fuzz target: `FrameDecoder::feed`
//!
//! Drives arbitrary byte sequences into the streaming frame decoder, split
//! at a fuzzer-chosen point, and asserts that it never panics and never
//! yields a frame above the cap or containing the terminator.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use linkmux::rpc::codec::{FrameDecoder, TERMINATOR};

const CAP: usize = 64;

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let (head, tail) = rest.split_at(usize::from(split).min(rest.len()));

    let mut decoder = FrameDecoder::new(CAP);
    for chunk in [head, tail] {
        for frame in decoder.feed(chunk) {
            assert!(frame.len() <= CAP, "frame exceeds cap");
            assert!(!frame.contains(&TERMINATOR), "terminator leaked into frame");
        }
    }
    assert!(decoder.pending_len() <= CAP);

    // After a reset the decoder must accept bytes cleanly again.
    decoder.reset();
    assert_eq!(decoder.pending_len(), 0);
    let _ = decoder.feed(data).count();
});
