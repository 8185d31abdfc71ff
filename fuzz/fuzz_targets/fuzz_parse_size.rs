#![no_main]
use libfuzzer_sys::fuzz_target;
use s3_binstore::{format_size, parse_size};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(bytes) = parse_size(text) {
        assert_eq!(parse_size(&format_size(bytes)).unwrap(), bytes);
    }
});
