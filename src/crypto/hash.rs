use std::str::FromStr;

use digest::DynDigest;
use md5::Md5;
use num_enum::{FromPrimitive, IntoPrimitive};
use ripemd::Ripemd160;
use sha1::Sha1;

use crate::errors::{Error, Result};
use crate::registry::{Algorithm, Constructor, Hash, Key, Registry};

/// Available hash algorithms.
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-9.4>
#[derive(
    Debug, PartialEq, Eq, Copy, Clone, FromPrimitive, IntoPrimitive, Hash, derive_more::Display,
)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum HashAlgorithm {
    #[cfg_attr(test, proptest(skip))]
    #[display("NONE")]
    None = 0,
    #[display("MD5")]
    Md5 = 1,
    #[display("SHA1")]
    Sha1 = 2,
    #[display("RIPEMD160")]
    Ripemd160 = 3,

    #[display("SHA256")]
    Sha256 = 8,
    #[display("SHA384")]
    Sha384 = 9,
    #[display("SHA512")]
    Sha512 = 10,
    #[display("SHA224")]
    Sha224 = 11,

    #[num_enum(catch_all)]
    Other(#[cfg_attr(test, proptest(strategy = "12u8.."))] u8),
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        Self::Sha256
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "ripemd160" => Ok(Self::Ripemd160),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            "sha224" => Ok(Self::Sha224),
            _ => bail!("unknown hash"),
        }
    }
}

impl zeroize::DefaultIsZeroes for HashAlgorithm {}

/// The algorithms registered by [`register_defaults`].
pub const DEFAULT_ALGORITHMS: [HashAlgorithm; 7] = [
    HashAlgorithm::Md5,
    HashAlgorithm::Sha1,
    HashAlgorithm::Ripemd160,
    HashAlgorithm::Sha224,
    HashAlgorithm::Sha256,
    HashAlgorithm::Sha384,
    HashAlgorithm::Sha512,
];

impl HashAlgorithm {
    /// Create a new hasher.
    pub fn new_hasher(self) -> Result<Box<dyn DynDigest>> {
        match self {
            HashAlgorithm::Md5 => Ok(Box::<Md5>::default()),
            HashAlgorithm::Sha1 => Ok(Box::<Sha1>::default()),
            HashAlgorithm::Ripemd160 => Ok(Box::<Ripemd160>::default()),
            HashAlgorithm::Sha256 => Ok(Box::<sha2::Sha256>::default()),
            HashAlgorithm::Sha384 => Ok(Box::<sha2::Sha384>::default()),
            HashAlgorithm::Sha512 => Ok(Box::<sha2::Sha512>::default()),
            HashAlgorithm::Sha224 => Ok(Box::<sha2::Sha224>::default()),
            _ => unimplemented_err!("hasher {:?}", self),
        }
    }

    /// Internal block size of the compression function, in bytes.
    pub fn block_size(self) -> Option<usize> {
        match self {
            HashAlgorithm::Md5
            | HashAlgorithm::Sha1
            | HashAlgorithm::Ripemd160
            | HashAlgorithm::Sha224
            | HashAlgorithm::Sha256 => Some(64),
            HashAlgorithm::Sha384 | HashAlgorithm::Sha512 => Some(128),
            HashAlgorithm::None | HashAlgorithm::Other(_) => None,
        }
    }

    /// Returns the expected digest size for the given algorithm.
    pub fn digest_size(self) -> Option<usize> {
        let size = match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Ripemd160 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
            HashAlgorithm::Sha224 => 28,
            HashAlgorithm::None | HashAlgorithm::Other(_) => return None,
        };
        Some(size)
    }
}

/// Adds the built in hashes to `registry`.
pub fn register_defaults(registry: &mut Registry<dyn Hash, HashAlgorithm>) {
    for alg in DEFAULT_ALGORITHMS {
        registry.add(Constructor::new(alg, build), None);
    }
}

fn build(alg: HashAlgorithm, key: Option<&Key>) -> Result<Box<dyn Hash>> {
    if key.is_some() {
        invalid_args_err!("hash {} takes no key", alg);
    }
    let Some(block_size) = alg.block_size() else {
        unimplemented_err!("hasher {:?}", alg);
    };

    Ok(Box::new(SoftwareHash {
        alg,
        block_size,
        digest: alg.new_hasher()?,
    }))
}

struct SoftwareHash {
    alg: HashAlgorithm,
    block_size: usize,
    digest: Box<dyn DynDigest>,
}

impl Algorithm<HashAlgorithm> for SoftwareHash {
    fn algorithm(&self) -> HashAlgorithm {
        self.alg
    }

    fn key_size(&self) -> usize {
        0
    }

    fn key(&self) -> Option<&Key> {
        None
    }

    fn set_key(&mut self, _key: Key) -> Result<()> {
        invalid_args_err!("hash {} takes no key", self.alg)
    }
}

impl Hash for SoftwareHash {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn output_size(&self) -> usize {
        self.digest.output_size()
    }

    fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    fn finalize_reset(&mut self) -> Vec<u8> {
        self.digest.finalize_reset().to_vec()
    }
}

/// Adapter to feed a registry hash from an `io::Write` serializer.
pub(crate) struct WriteHasher<'a>(pub(crate) &'a mut dyn Hash);

impl std::io::Write for WriteHasher<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;

    use super::*;
    use crate::registry::AlgorithmRegistry;

    #[test]
    fn test_known_digests() {
        let registry = AlgorithmRegistry::with_defaults();
        assert_eq!(
            registry.digest(HashAlgorithm::Sha1, b"abc").unwrap(),
            hex!("a9993e364706816aba3e25717850c26c9cd0d89d")
        );
        assert_eq!(
            registry.digest(HashAlgorithm::Md5, b"").unwrap(),
            hex!("d41d8cd98f00b204e9800998ecf8427e")
        );
    }

    #[test]
    fn test_finalize_resets() {
        let registry = AlgorithmRegistry::with_defaults();
        let mut h = registry.hasher(HashAlgorithm::Sha256).unwrap();
        h.update(b"a");
        h.update(b"bc");
        let first = h.finalize_reset();
        assert_eq!(first, h.hash(b"abc"));
        assert_eq!(h.output_size(), 32);
        assert_eq!(h.block_size(), 64);
    }

    #[test]
    fn test_hash_rejects_key() {
        let registry = AlgorithmRegistry::with_defaults();
        let key = Key::symmetric(&[1, 2, 3]);
        assert!(registry.hashes.get(HashAlgorithm::Sha1, Some(&key)).is_err());
    }

    proptest! {
        #[test]
        fn digest_size_matches(alg in prop::sample::select(DEFAULT_ALGORITHMS.to_vec())) {
            let registry = AlgorithmRegistry::with_defaults();
            let out = registry.digest(alg, b"data")?;
            prop_assert_eq!(Some(out.len()), alg.digest_size());
        }
    }
}
