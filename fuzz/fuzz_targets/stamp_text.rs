//! Fuzz target for the `itc:v1:` text form.
//!
//! # Running
//! ```bash
//! cargo +nightly fuzz run stamp_text
//! ```

#![no_main]

use itc_core::clock::{stamp_from_text, stamp_to_text};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(stamp) = stamp_from_text(raw) {
        let text = stamp_to_text(&stamp);
        assert_eq!(stamp_from_text(&text), Ok(stamp));
    }
});
