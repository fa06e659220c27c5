//! Fuzz target for payload normalization.
//!
//! Decoding must terminate and reach a fixed point for any input.

#![no_main]

use bulwark_xss::Normalizer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let normalizer = Normalizer::default();
    let once = normalizer.normalize(data).into_owned();
    let twice = normalizer.normalize(&once);
    assert_eq!(once, twice);
});
