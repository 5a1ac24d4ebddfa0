use rand::{CryptoRng, Rng};
use zeroize::Zeroizing;

use crate::crypto::SymmetricKeyAlgorithm;

/// A decrypted session key together with the cipher it is used with.
#[derive(derive_more::Debug, Clone, PartialEq, Eq)]
pub struct PlainSessionKey {
    sym_alg: SymmetricKeyAlgorithm,
    #[debug("..")]
    key: Zeroizing<Vec<u8>>,
}

impl PlainSessionKey {
    pub fn new(sym_alg: SymmetricKeyAlgorithm, key: Zeroizing<Vec<u8>>) -> Self {
        Self { sym_alg, key }
    }

    /// A fresh random key for `sym_alg`.
    pub fn generate<R: CryptoRng + Rng>(rng: R, sym_alg: SymmetricKeyAlgorithm) -> Self {
        Self {
            sym_alg,
            key: sym_alg.new_session_key(rng),
        }
    }

    pub fn sym_alg(&self) -> SymmetricKeyAlgorithm {
        self.sym_alg
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Returns true if the key length matches the cipher.
    pub fn is_valid(&self) -> bool {
        let size = self.sym_alg.key_size();
        size > 0 && size == self.key.len()
    }
}
