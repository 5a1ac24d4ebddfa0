#![no_main]

use libfuzzer_sys::fuzz_target;
use pgp_engine::composed::{Deserializable, Message};
use pgp_engine::ser::Serialize;

// anything that parses must serialize, and parse back to the same bytes
fuzz_target!(|data: &[u8]| {
    let Ok(message) = Message::from_bytes(data.to_vec()) else {
        return;
    };
    let serialized = message.to_bytes().expect("serialize");
    assert_eq!(serialized.len(), message.write_len());

    // old style headers come back in the new format, so compare the bytes
    let reparsed = Message::from_bytes(serialized.clone()).expect("failed round trip");
    assert_eq!(reparsed.to_bytes().expect("serialize"), serialized);
});
