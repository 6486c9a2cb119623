//! Fuzz target for the stamp wire decoder.
//!
//! Any byte string must decode to a stamp or a `DecodeError`, never panic.
//! Whatever decodes must survive the clock operations and re-encode to
//! bytes that decode to the same stamp.
//!
//! # Running
//! ```bash
//! cargo +nightly fuzz run unmarshal
//! ```

#![no_main]

use itc_core::Stamp;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(mut stamp) = Stamp::unmarshal(data) else {
        return;
    };

    let again = Stamp::unmarshal(&stamp.marshal()).expect("re-encoded stamp decodes");
    assert_eq!(again, stamp);

    let observer = stamp.peek();
    if let Ok(mut other) = stamp.fork() {
        for replica in [&mut stamp, &mut other] {
            let before = replica.clone();
            match replica.event() {
                Ok(()) => assert!(before.leq(replica)),
                Err(_) => assert_eq!(*replica, before),
            }
        }
        stamp.join(other);
    }
    assert!(observer.leq(&stamp));
});
