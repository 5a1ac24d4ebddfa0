#![no_main]

use libfuzzer_sys::fuzz_target;
use pgp_engine::composed::parse_all_transferable_keys;

// every block of a key ring, skipping broken ones
fuzz_target!(|data: &[u8]| {
    let strict = parse_all_transferable_keys(data.to_vec(), false);
    let lenient = parse_all_transferable_keys(data.to_vec(), true).expect("skipping never fails");

    if let Ok(strict) = strict {
        assert_eq!(strict, lenient);
    }
});
