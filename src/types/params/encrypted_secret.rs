use std::{fmt, io};

use bytes::{Buf, Bytes};
use derive_builder::Builder;
use log::debug;
use rand::{CryptoRng, Rng};
use zeroize::Zeroizing;

use crate::crypto::mode::{Cfb, CipherMode};
use crate::crypto::{checksum, HashAlgorithm, PublicKeyAlgorithm, SymmetricKeyAlgorithm};
use crate::errors::{Error, Result};
use crate::parsing::BufParsing;
use crate::registry::AlgorithmRegistry;
use crate::ser::Serialize;
use crate::types::{PlainSecretParams, StringToKey, DEFAULT_ITER_COUNT};

/// Usage octet: S2K protected, SHA1 check value.
pub const S2K_USAGE_SHA1: u8 = 254;
/// Usage octet: S2K protected, two octet checksum.
pub const S2K_USAGE_CHECKSUM: u8 = 255;

/// How secret key material is protected when locking it.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(error = "crate::errors::Error", validate = "Self::validate"))]
pub struct LockOptions {
    #[builder(default = "SymmetricKeyAlgorithm::AES256")]
    sym_alg: SymmetricKeyAlgorithm,
    #[builder(default = "HashAlgorithm::Sha1")]
    hash_alg: HashAlgorithm,
    /// Coded S2K iteration count.
    #[builder(default = "DEFAULT_ITER_COUNT")]
    count: u8,
}

impl LockOptionsBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(alg) = self.sym_alg {
            if alg.key_size() == 0 {
                return Err(format!("{:?} can not protect keys", alg));
            }
        }
        if let Some(HashAlgorithm::None | HashAlgorithm::Other(_)) = self.hash_alg {
            return Err("S2K needs a real hash algorithm".into());
        }
        Ok(())
    }
}

impl Default for LockOptions {
    fn default() -> Self {
        LockOptions {
            sym_alg: SymmetricKeyAlgorithm::AES256,
            hash_alg: HashAlgorithm::Sha1,
            count: DEFAULT_ITER_COUNT,
        }
    }
}

impl LockOptions {
    pub fn sym_alg(&self) -> SymmetricKeyAlgorithm {
        self.sym_alg
    }

    pub fn hash_alg(&self) -> HashAlgorithm {
        self.hash_alg
    }

    pub fn count(&self) -> u8 {
        self.count
    }
}

/// Passphrase protected secret key material.
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.5.3>
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedSecretParams {
    /// The encrypted MPIs followed by the encrypted check value.
    data: Bytes,
    iv: Bytes,
    encryption_algorithm: SymmetricKeyAlgorithm,
    /// `None` for the legacy form, where the key is the MD5 hash of the passphrase.
    string_to_key: Option<StringToKey>,
    /// The usage octet: 254, 255 or a legacy symmetric algorithm id.
    string_to_key_id: u8,
}

impl EncryptedSecretParams {
    /// Parses everything after a non-zero usage octet.
    pub fn from_buf<B: Buf>(usage: u8, mut i: B) -> Result<Self> {
        debug_assert_ne!(usage, 0, "not encrypted");

        let (encryption_algorithm, string_to_key) = match usage {
            S2K_USAGE_SHA1 | S2K_USAGE_CHECKSUM => {
                let alg = SymmetricKeyAlgorithm::from(i.read_u8()?);
                let s2k = StringToKey::from_buf(&mut i)?;
                (alg, Some(s2k))
            }
            _ => (SymmetricKeyAlgorithm::from(usage), None),
        };

        let iv = if string_to_key.as_ref().is_some_and(StringToKey::is_dummy) {
            Bytes::new()
        } else {
            let block_size = encryption_algorithm.block_size();
            if block_size == 0 {
                unsupported_err!("secret key protected with {:?}", encryption_algorithm);
            }
            i.read_take(block_size)?
        };

        Ok(EncryptedSecretParams {
            data: i.rest(),
            iv,
            encryption_algorithm,
            string_to_key,
            string_to_key_id: usage,
        })
    }

    /// Protects `plain` with a key derived from `passphrase`, using usage 254.
    pub fn encrypt<R: CryptoRng + Rng>(
        registry: &AlgorithmRegistry,
        mut rng: R,
        plain: &PlainSecretParams,
        passphrase: &[u8],
        options: &LockOptions,
    ) -> Result<Self> {
        let alg = options.sym_alg;
        let s2k = StringToKey::new_iterated(&mut rng, options.hash_alg, options.count);
        let key = s2k.derive_key(registry, passphrase, alg.key_size())?;

        let mut iv = vec![0u8; alg.block_size()];
        rng.fill(&mut iv[..]);

        let mut plaintext = plain.to_raw()?;
        let check = checksum::calculate_sha1(&plaintext);
        plaintext.extend_from_slice(&check);

        let cipher = registry.symmetric_cipher(alg, &key)?;
        let data = Cfb::new(cipher).encrypt(&plaintext, &iv).value()?;

        Ok(EncryptedSecretParams {
            data: data.into(),
            iv: iv.into(),
            encryption_algorithm: alg,
            string_to_key: Some(s2k),
            string_to_key_id: S2K_USAGE_SHA1,
        })
    }

    /// Decrypts the key material.
    ///
    /// Fails with `WrongPassphrase` if the check value does not match.
    pub fn decrypt(
        &self,
        registry: &AlgorithmRegistry,
        alg: PublicKeyAlgorithm,
        passphrase: &[u8],
    ) -> Result<PlainSecretParams> {
        let key_size = self.encryption_algorithm.key_size();
        let key = match &self.string_to_key {
            Some(s2k) => s2k.derive_key(registry, passphrase, key_size)?,
            None => StringToKey::Simple {
                hash: HashAlgorithm::Md5,
            }
            .derive_key(registry, passphrase, key_size)?,
        };

        let cipher = registry.symmetric_cipher(self.encryption_algorithm, &key)?;
        let plaintext = Zeroizing::new(Cfb::new(cipher).decrypt(&self.data, &self.iv).value()?);

        let body = if self.string_to_key_id == S2K_USAGE_SHA1 {
            let Some(split) = plaintext.len().checked_sub(20) else {
                return Err(Error::WrongPassphrase);
            };
            let (body, hash) = plaintext.split_at(split);
            if checksum::calculate_sha1(body) != hash {
                debug!("secret key sha1 check failed");
                return Err(Error::WrongPassphrase);
            }
            body
        } else {
            let Some(split) = plaintext.len().checked_sub(2) else {
                return Err(Error::WrongPassphrase);
            };
            let (body, sum) = plaintext.split_at(split);
            if checksum::calculate_simple(body).to_be_bytes() != sum {
                debug!("secret key checksum failed");
                return Err(Error::WrongPassphrase);
            }
            body
        };

        // A wrong passphrase can pass the two octet checksum by chance.
        PlainSecretParams::from_buf(alg, body).map_err(|err| {
            debug!("invalid secret key material: {}", err);
            Error::WrongPassphrase
        })
    }

    /// Secret material stripped from the key (GnuPG dummy S2K).
    pub fn is_dummy(&self) -> bool {
        self.string_to_key.as_ref().is_some_and(StringToKey::is_dummy)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn encryption_algorithm(&self) -> SymmetricKeyAlgorithm {
        self.encryption_algorithm
    }

    pub fn string_to_key(&self) -> Option<&StringToKey> {
        self.string_to_key.as_ref()
    }

    pub fn string_to_key_id(&self) -> u8 {
        self.string_to_key_id
    }
}

impl Serialize for EncryptedSecretParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.string_to_key_id])?;
        if let Some(s2k) = &self.string_to_key {
            writer.write_all(&[self.encryption_algorithm.into()])?;
            s2k.to_writer(writer)?;
        }
        writer.write_all(&self.iv)?;
        writer.write_all(&self.data)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        let s2k_len = self
            .string_to_key
            .as_ref()
            .map(|s2k| 1 + s2k.write_len())
            .unwrap_or_default();
        1 + s2k_len + self.iv.len() + self.data.len()
    }
}

impl fmt::Debug for EncryptedSecretParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedSecretParams")
            .field("data", &hex::encode(&self.data))
            .field("iv", &hex::encode(&self.iv))
            .field("encryption_algorithm", &self.encryption_algorithm)
            .field("string_to_key", &self.string_to_key)
            .field("string_to_key_id", &self.string_to_key_id)
            .finish()
    }
}
