#![no_main]

use libfuzzer_sys::fuzz_target;
use pgp_engine::composed::{Deserializable, PublicOrSecret};
use pgp_engine::registry::AlgorithmRegistry;
use pgp_engine::ser::Serialize;
use pgp_engine::types::LockOptions;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// build a key block from binary data
fuzz_target!(|data: &[u8]| {
    let Ok(key) = PublicOrSecret::from_bytes(data.to_vec()) else {
        return;
    };
    let registry = AlgorithmRegistry::with_defaults();
    let _ = key.to_bytes();

    match key {
        PublicOrSecret::Public(key) => {
            let _ = key.fingerprint(&registry);
        }
        PublicOrSecret::Secret(mut key) => {
            let _ = key.public_key();
            let _ = key.unlock(&registry, &"bogus_password".into());

            let mut rng = ChaCha8Rng::seed_from_u64(0);
            let _ = key.lock(&registry, &mut rng, &"pw".into(), &LockOptions::default());
        }
    }
});
