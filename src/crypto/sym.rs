use aes::{Aes128, Aes192, Aes256};
use blowfish::Blowfish;
use camellia::{Camellia128, Camellia192, Camellia256};
use cast5::Cast5;
use cipher::{Block, BlockDecrypt, BlockEncrypt, BlockSizeUser, KeyInit};
use des::TdesEde3;
use idea::Idea;
use num_enum::{FromPrimitive, IntoPrimitive};
use rand::{CryptoRng, Rng};
use twofish::Twofish;
use zeroize::Zeroizing;

use crate::async_result::AsyncResult;
use crate::errors::{Error, Result};
use crate::registry::{Algorithm, Constructor, Key, Registry, SymmetricCipher};

/// Available symmetric key algorithms.
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-9.2>
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, FromPrimitive, IntoPrimitive)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[repr(u8)]
#[non_exhaustive]
pub enum SymmetricKeyAlgorithm {
    /// Plaintext or unencrypted data
    #[cfg_attr(test, proptest(skip))]
    Plaintext = 0,
    /// IDEA
    IDEA = 1,
    /// Triple-DES
    TripleDES = 2,
    /// CAST5
    CAST5 = 3,
    /// Blowfish
    Blowfish = 4,
    // 5 & 6 are reserved for DES/SK
    /// AES with 128-bit key
    AES128 = 7,
    /// AES with 192-bit key
    AES192 = 8,
    /// AES with 256-bit key
    AES256 = 9,
    /// Twofish with 256-bit key
    Twofish = 10,
    /// [Camellia](https://tools.ietf.org/html/rfc5581#section-3) with 128-bit key
    Camellia128 = 11,
    /// [Camellia](https://tools.ietf.org/html/rfc5581#section-3) with 192-bit key
    Camellia192 = 12,
    /// [Camellia](https://tools.ietf.org/html/rfc5581#section-3) with 256-bit key
    Camellia256 = 13,

    #[num_enum(catch_all)]
    Other(#[cfg_attr(test, proptest(strategy = "14u8.."))] u8),
}

#[allow(clippy::derivable_impls)]
impl Default for SymmetricKeyAlgorithm {
    fn default() -> Self {
        Self::AES128
    }
}

impl zeroize::DefaultIsZeroes for SymmetricKeyAlgorithm {}

/// The algorithms registered by [`register_defaults`].
pub const DEFAULT_ALGORITHMS: [SymmetricKeyAlgorithm; 11] = [
    SymmetricKeyAlgorithm::IDEA,
    SymmetricKeyAlgorithm::TripleDES,
    SymmetricKeyAlgorithm::CAST5,
    SymmetricKeyAlgorithm::Blowfish,
    SymmetricKeyAlgorithm::AES128,
    SymmetricKeyAlgorithm::AES192,
    SymmetricKeyAlgorithm::AES256,
    SymmetricKeyAlgorithm::Twofish,
    SymmetricKeyAlgorithm::Camellia128,
    SymmetricKeyAlgorithm::Camellia192,
    SymmetricKeyAlgorithm::Camellia256,
];

impl SymmetricKeyAlgorithm {
    /// The size of a single block in bytes.
    /// Based on <https://github.com/gpg/libgcrypt/blob/master/cipher>
    pub fn block_size(self) -> usize {
        match self {
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::IDEA => 8,
            SymmetricKeyAlgorithm::TripleDES => 8,
            SymmetricKeyAlgorithm::CAST5 => 8,
            SymmetricKeyAlgorithm::Blowfish => 8,
            SymmetricKeyAlgorithm::AES128 => 16,
            SymmetricKeyAlgorithm::AES192 => 16,
            SymmetricKeyAlgorithm::AES256 => 16,
            SymmetricKeyAlgorithm::Twofish => 16,
            SymmetricKeyAlgorithm::Camellia128 => 16,
            SymmetricKeyAlgorithm::Camellia192 => 16,
            SymmetricKeyAlgorithm::Camellia256 => 16,
            SymmetricKeyAlgorithm::Other(_) => 0,
        }
    }

    /// The size of a key in bytes.
    pub const fn key_size(self) -> usize {
        match self {
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::IDEA => 16,
            SymmetricKeyAlgorithm::TripleDES => 24,
            SymmetricKeyAlgorithm::CAST5 => 16,
            SymmetricKeyAlgorithm::Blowfish => 16,
            SymmetricKeyAlgorithm::AES128 => 16,
            SymmetricKeyAlgorithm::AES192 => 24,
            SymmetricKeyAlgorithm::AES256 => 32,
            SymmetricKeyAlgorithm::Twofish => 32,
            SymmetricKeyAlgorithm::Camellia128 => 16,
            SymmetricKeyAlgorithm::Camellia192 => 24,
            SymmetricKeyAlgorithm::Camellia256 => 32,
            SymmetricKeyAlgorithm::Other(_) => 0,
        }
    }

    /// 64-bit block ciphers, the only ones allowed for data without integrity protection.
    pub fn is_legacy(self) -> bool {
        self.block_size() == 8
    }

    /// Generate a new session key.
    pub fn new_session_key<R: Rng + CryptoRng>(self, mut rng: R) -> Zeroizing<Vec<u8>> {
        let mut session_key = Zeroizing::new(vec![0u8; self.key_size()]);
        rng.fill_bytes(&mut session_key);
        session_key
    }
}

/// Adds all built in block ciphers to `registry`.
pub fn register_defaults(registry: &mut Registry<dyn SymmetricCipher, SymmetricKeyAlgorithm>) {
    for alg in DEFAULT_ALGORITHMS {
        registry.add(Constructor::new(alg, build), None);
    }
}

fn build(alg: SymmetricKeyAlgorithm, key: Option<&Key>) -> Result<Box<dyn SymmetricCipher>> {
    match alg {
        SymmetricKeyAlgorithm::Plaintext => {
            bail!("'Plaintext' is not a legal cipher for encrypted data")
        }
        SymmetricKeyAlgorithm::IDEA => boxed(BlockCipher::<Idea>::new(alg), key),
        SymmetricKeyAlgorithm::TripleDES => boxed(BlockCipher::<TdesEde3>::new(alg), key),
        SymmetricKeyAlgorithm::CAST5 => boxed(BlockCipher::<Cast5>::new(alg), key),
        SymmetricKeyAlgorithm::Blowfish => boxed(BlockCipher::<Blowfish>::new(alg), key),
        SymmetricKeyAlgorithm::AES128 => boxed(BlockCipher::<Aes128>::new(alg), key),
        SymmetricKeyAlgorithm::AES192 => boxed(BlockCipher::<Aes192>::new(alg), key),
        SymmetricKeyAlgorithm::AES256 => boxed(BlockCipher::<Aes256>::new(alg), key),
        SymmetricKeyAlgorithm::Twofish => boxed(BlockCipher::<Twofish>::new(alg), key),
        SymmetricKeyAlgorithm::Camellia128 => boxed(BlockCipher::<Camellia128>::new(alg), key),
        SymmetricKeyAlgorithm::Camellia192 => boxed(BlockCipher::<Camellia192>::new(alg), key),
        SymmetricKeyAlgorithm::Camellia256 => boxed(BlockCipher::<Camellia256>::new(alg), key),
        SymmetricKeyAlgorithm::Other(_) => {
            unimplemented_err!("SymmetricKeyAlgorithm {} is unsupported", u8::from(alg))
        }
    }
}

fn boxed<C: SymmetricCipher + 'static>(
    mut cipher: C,
    key: Option<&Key>,
) -> Result<Box<dyn SymmetricCipher>> {
    if let Some(key) = key {
        cipher.set_key(key.clone())?;
    }
    Ok(Box::new(cipher))
}

/// Software block cipher backed by a RustCrypto implementation.
struct BlockCipher<C> {
    alg: SymmetricKeyAlgorithm,
    key: Option<Key>,
    cipher: Option<C>,
}

impl<C> BlockCipher<C> {
    fn new(alg: SymmetricKeyAlgorithm) -> Self {
        Self {
            alg,
            key: None,
            cipher: None,
        }
    }
}

impl<C: KeyInit> Algorithm<SymmetricKeyAlgorithm> for BlockCipher<C> {
    fn algorithm(&self) -> SymmetricKeyAlgorithm {
        self.alg
    }

    fn key_size(&self) -> usize {
        self.alg.key_size()
    }

    fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    fn set_key(&mut self, key: Key) -> Result<()> {
        let Some(raw) = key.as_symmetric() else {
            invalid_args_err!("{:?} needs a symmetric key", self.alg);
        };
        if raw.len() != self.alg.key_size() {
            invalid_args_err!(
                "{:?} needs a key of {} bytes, got {}",
                self.alg,
                self.alg.key_size(),
                raw.len()
            );
        }

        self.cipher = Some(C::new_from_slice(raw)?);
        self.key = Some(key);
        Ok(())
    }
}

impl<C> BlockCipher<C>
where
    C: KeyInit + BlockSizeUser,
{
    fn with_block<F>(&self, block: &[u8], f: F) -> AsyncResult<Vec<u8>>
    where
        F: FnOnce(&C, &mut Block<C>),
    {
        let Some(ref cipher) = self.cipher else {
            return AsyncResult::err(Error::InvalidArguments {
                message: format!("{:?}: no key set", self.alg),
            });
        };
        if block.len() != C::block_size() {
            return AsyncResult::err(Error::InvalidArguments {
                message: format!(
                    "{:?}: expected a block of {} bytes, got {}",
                    self.alg,
                    C::block_size(),
                    block.len()
                ),
            });
        }

        let mut b = Block::<C>::clone_from_slice(block);
        f(cipher, &mut b);
        AsyncResult::ok(b.to_vec())
    }
}

impl<C> SymmetricCipher for BlockCipher<C>
where
    C: KeyInit + BlockEncrypt + BlockDecrypt,
{
    fn block_size(&self) -> usize {
        C::block_size()
    }

    fn encrypt(&self, block: &[u8]) -> AsyncResult<Vec<u8>> {
        self.with_block(block, |c, b| c.encrypt_block(b))
    }

    fn decrypt(&self, block: &[u8]) -> AsyncResult<Vec<u8>> {
        self.with_block(block, |c, b| c.decrypt_block(b))
    }
}
