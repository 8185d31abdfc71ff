#![no_main]
use libfuzzer_sys::fuzz_target;
use s3_binstore::decode_listing;

// Untrusted listing bodies must decode or fail, never panic
fuzz_target!(|data: &[u8]| {
    let Ok(xml) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(listing) = decode_listing(xml) {
        for contents in &listing.contents {
            assert!(!contents.etag.starts_with('"'));
            if let Some(fingerprint) = contents.fingerprint() {
                assert_eq!(fingerprint.as_str(), contents.etag);
            }
        }
    }
});
