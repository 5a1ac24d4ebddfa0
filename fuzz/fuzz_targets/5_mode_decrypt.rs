#![no_main]

use libfuzzer_sys::fuzz_target;
use pgp_engine::crypto::mode::{Cbc, Cfb, CipherMode, Ctr, Ocfb};
use pgp_engine::crypto::SymmetricKeyAlgorithm;
use pgp_engine::registry::AlgorithmRegistry;

// decrypting arbitrary ciphertext may fail, but must not panic
fuzz_target!(|data: &[u8]| {
    if data.len() < 16 {
        return;
    }
    let (iv, ciphertext) = data.split_at(16);
    let registry = AlgorithmRegistry::with_defaults();
    let cipher = || {
        registry
            .symmetric_cipher(SymmetricKeyAlgorithm::AES128, &[7u8; 16])
            .unwrap()
    };

    if let Ok(cbc) = Cbc::new(cipher()) {
        let _ = cbc.decrypt(ciphertext, iv).value();
    }
    let _ = Cfb::new(cipher()).decrypt(ciphertext, iv).value();
    let _ = Ctr::new(cipher())
        .decrypt(ciphertext, &iv[..usize::from(data[0] % 17)])
        .value();
    let _ = Ocfb::new(cipher(), true).decrypt(ciphertext, iv).value();
    let _ = Ocfb::new(cipher(), false)
        .decrypt_with_prefix(ciphertext, &[])
        .value();
});
