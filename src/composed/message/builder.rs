use derive_builder::Builder;

use crate::crypto::{HashAlgorithm, SymmetricKeyAlgorithm};
use crate::types::DEFAULT_ITER_COUNT;

/// Parameters for encrypting a message to a passphrase or to public keys.
///
/// The S2K settings only apply to passphrases.
///
/// ```
/// use pgp_engine::composed::MessageEncryptionOptionsBuilder;
/// use pgp_engine::crypto::SymmetricKeyAlgorithm;
///
/// let options = MessageEncryptionOptionsBuilder::default()
///     .sym_alg(SymmetricKeyAlgorithm::AES128)
///     .build()
///     .unwrap();
/// assert!(options.integrity_protected());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(error = "crate::errors::Error", validate = "Self::validate"))]
pub struct MessageEncryptionOptions {
    #[builder(default = "SymmetricKeyAlgorithm::AES256")]
    sym_alg: SymmetricKeyAlgorithm,
    /// Use an integrity protected data packet.
    #[builder(default = "true")]
    integrity_protected: bool,
    #[builder(default = "HashAlgorithm::Sha256")]
    s2k_hash: HashAlgorithm,
    /// Coded S2K iteration count.
    #[builder(default = "DEFAULT_ITER_COUNT")]
    s2k_count: u8,
}

impl MessageEncryptionOptionsBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        let sym_alg = self.sym_alg.unwrap_or(SymmetricKeyAlgorithm::AES256);
        if sym_alg.key_size() == 0 {
            return Err(format!("{:?} can not encrypt messages", sym_alg));
        }
        if self.integrity_protected == Some(false) && !sym_alg.is_legacy() {
            return Err(format!(
                "{:?} requires integrity protection, only 64-bit block ciphers may go without",
                sym_alg
            ));
        }
        if let Some(HashAlgorithm::None | HashAlgorithm::Other(_)) = self.s2k_hash {
            return Err("S2K needs a real hash algorithm".into());
        }
        Ok(())
    }
}

impl Default for MessageEncryptionOptions {
    fn default() -> Self {
        MessageEncryptionOptions {
            sym_alg: SymmetricKeyAlgorithm::AES256,
            integrity_protected: true,
            s2k_hash: HashAlgorithm::Sha256,
            s2k_count: DEFAULT_ITER_COUNT,
        }
    }
}

impl MessageEncryptionOptions {
    pub fn sym_alg(&self) -> SymmetricKeyAlgorithm {
        self.sym_alg
    }

    pub fn integrity_protected(&self) -> bool {
        self.integrity_protected
    }

    pub fn s2k_hash(&self) -> HashAlgorithm {
        self.s2k_hash
    }

    pub fn s2k_count(&self) -> u8 {
        self.s2k_count
    }
}
