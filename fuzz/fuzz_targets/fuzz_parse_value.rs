#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        // Any accepted value must be finite
        if let Ok(v) = dayahead::feed::parse_value(text) {
            assert!(v.is_finite());
        }
    }
});
