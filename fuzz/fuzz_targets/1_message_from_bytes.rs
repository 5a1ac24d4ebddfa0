#![no_main]

use libfuzzer_sys::fuzz_target;
use pgp_engine::composed::{Deserializable, Message};
use pgp_engine::registry::AlgorithmRegistry;

// build message from binary data
fuzz_target!(|data: &[u8]| {
    let Ok(message) = Message::from_bytes(data.to_vec()) else {
        return;
    };
    let registry = AlgorithmRegistry::with_defaults();

    let _ = message.decompress(&registry).value();
    let _ = message.decrypt_with_password(&registry, &"bogus_password".into());
    let _ = message.is_one_pass_signed();
    let _ = message.is_literal();
    let _ = message.signatures();
    // unwraps nested compression up to the nesting limit
    let _ = message.get_content(&registry).value();
});
