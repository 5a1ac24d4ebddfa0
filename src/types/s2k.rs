use std::io;

use bytes::Buf;
use log::debug;
use rand::{CryptoRng, Rng};
use zeroize::Zeroizing;

use crate::crypto::HashAlgorithm;
use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::registry::AlgorithmRegistry;
use crate::ser::Serialize;

const EXPBIAS: u32 = 6;

/// Coded iteration count used for newly protected keys and messages.
pub const DEFAULT_ITER_COUNT: u8 = 96;

/// String-to-key specifier.
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-3.7>
#[derive(derive_more::Debug, PartialEq, Eq, Clone)]
pub enum StringToKey {
    Simple {
        hash: HashAlgorithm,
    },
    Salted {
        hash: HashAlgorithm,
        #[debug("{}", hex::encode(salt))]
        salt: [u8; 8],
    },
    IteratedAndSalted {
        hash: HashAlgorithm,
        #[debug("{}", hex::encode(salt))]
        salt: [u8; 8],
        /// Coded count, see [`StringToKey::count`].
        count: u8,
    },
    /// GnuPG extension marking a key whose secret part is not present.
    GnuDummy {
        hash: HashAlgorithm,
        /// `GNU` or `E2E`.
        header: [u8; 3],
        mode: u8,
    },
}

impl StringToKey {
    /// Iterated and salted S2K with a fresh random salt.
    pub fn new_iterated<R: CryptoRng + Rng>(rng: &mut R, hash: HashAlgorithm, count: u8) -> Self {
        let mut salt = [0u8; 8];
        rng.fill(&mut salt[..]);

        StringToKey::IteratedAndSalted { hash, salt, count }
    }

    /// Iterated SHA1 with the default count.
    pub fn new_default<R: CryptoRng + Rng>(rng: &mut R) -> Self {
        Self::new_iterated(rng, HashAlgorithm::Sha1, DEFAULT_ITER_COUNT)
    }

    pub fn id(&self) -> u8 {
        match self {
            Self::Simple { .. } => 0,
            Self::Salted { .. } => 1,
            Self::IteratedAndSalted { .. } => 3,
            Self::GnuDummy { .. } => 101,
        }
    }

    pub fn hash_alg(&self) -> HashAlgorithm {
        match self {
            Self::Simple { hash }
            | Self::Salted { hash, .. }
            | Self::IteratedAndSalted { hash, .. }
            | Self::GnuDummy { hash, .. } => *hash,
        }
    }

    pub fn salt(&self) -> Option<&[u8; 8]> {
        match self {
            Self::Salted { salt, .. } | Self::IteratedAndSalted { salt, .. } => Some(salt),
            _ => None,
        }
    }

    /// Decodes the coded count into the number of octets to hash.
    /// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-3.7.1.3>
    pub fn count(&self) -> Option<usize> {
        match self {
            Self::IteratedAndSalted { count, .. } => Some(decode_count(*count)),
            _ => None,
        }
    }

    /// Returns true if this specifier stands in for missing key material.
    pub fn is_dummy(&self) -> bool {
        matches!(self, Self::GnuDummy { .. })
    }

    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let typ = i.read_u8()?;
        let hash = HashAlgorithm::from(i.read_u8()?);

        let s2k = match typ {
            0 => StringToKey::Simple { hash },
            1 => StringToKey::Salted {
                hash,
                salt: i.read_array::<8>()?,
            },
            3 => StringToKey::IteratedAndSalted {
                hash,
                salt: i.read_array::<8>()?,
                count: i.read_u8()?,
            },
            101 => {
                let header = i.read_array::<3>()?;
                if &header != b"GNU" && &header != b"E2E" {
                    bail!("unknown S2K extension {}", hex::encode(header));
                }
                let mode = i.read_u8()?;
                debug!("gnu s2k extension mode {}", mode);
                StringToKey::GnuDummy { hash, header, mode }
            }
            _ => bail!("invalid S2K type {}", typ),
        };

        Ok(s2k)
    }

    /// Derives a key of `key_size` bytes from `passphrase`.
    ///
    /// Runs as many hash contexts as needed to fill the key, context `n`
    /// being preloaded with `n` zero octets.
    pub fn derive_key(
        &self,
        registry: &AlgorithmRegistry,
        passphrase: &[u8],
        key_size: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let mut hasher = registry.hasher(self.hash_alg())?;
        let digest_size = hasher.output_size();
        ensure!(digest_size > 0, "hash without output");
        let rounds = key_size.div_ceil(digest_size);

        let mut key = Zeroizing::new(Vec::with_capacity(rounds * digest_size));
        let zeros = vec![0u8; rounds];

        for round in 0..rounds {
            hasher.update(&zeros[..round]);

            match self {
                Self::Simple { .. } => hasher.update(passphrase),
                Self::Salted { salt, .. } => {
                    hasher.update(salt);
                    hasher.update(passphrase);
                }
                Self::IteratedAndSalted { salt, count, .. } => {
                    let mut data = Zeroizing::new(Vec::with_capacity(salt.len() + passphrase.len()));
                    data.extend_from_slice(salt);
                    data.extend_from_slice(passphrase);

                    // Always hash salt and passphrase at least once.
                    let count = decode_count(*count).max(data.len());
                    for _ in 0..count / data.len() {
                        hasher.update(&data);
                    }
                    hasher.update(&data[..count % data.len()]);
                }
                Self::GnuDummy { .. } => unsupported_err!("GNU dummy S2K can not derive a key"),
            }

            let digest = Zeroizing::new(hasher.finalize_reset());
            key.extend_from_slice(&digest);
        }
        key.truncate(key_size);

        Ok(key)
    }
}

fn decode_count(c: u8) -> usize {
    ((16u32 + u32::from(c & 15)) << (u32::from(c >> 4) + EXPBIAS)) as usize
}

impl Serialize for StringToKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.id(), self.hash_alg().into()])?;

        match self {
            Self::Simple { .. } => {}
            Self::Salted { salt, .. } => writer.write_all(salt)?,
            Self::IteratedAndSalted { salt, count, .. } => {
                writer.write_all(salt)?;
                writer.write_all(&[*count])?;
            }
            Self::GnuDummy { header, mode, .. } => {
                writer.write_all(header)?;
                writer.write_all(&[*mode])?;
            }
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        2 + match self {
            Self::Simple { .. } => 0,
            Self::Salted { .. } => 8,
            Self::IteratedAndSalted { .. } => 9,
            Self::GnuDummy { .. } => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    impl Arbitrary for StringToKey {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            let hash = prop::sample::select(crate::crypto::hash::DEFAULT_ALGORITHMS.to_vec());
            prop_oneof![
                hash.clone().prop_map(|hash| StringToKey::Simple { hash }),
                (hash.clone(), any::<[u8; 8]>())
                    .prop_map(|(hash, salt)| StringToKey::Salted { hash, salt }),
                (hash, any::<[u8; 8]>(), any::<u8>()).prop_map(|(hash, salt, count)| {
                    StringToKey::IteratedAndSalted { hash, salt, count }
                }),
            ]
            .boxed()
        }
    }

    #[test]
    fn test_count() {
        let s2k = StringToKey::IteratedAndSalted {
            hash: HashAlgorithm::Sha1,
            salt: [0; 8],
            count: 96,
        };
        assert_eq!(s2k.count(), Some(65536));
        assert_eq!(decode_count(0), 1024);
        assert_eq!(decode_count(255), 65011712);
    }

    #[test]
    fn test_simple_sha1() {
        let registry = AlgorithmRegistry::with_defaults();
        let s2k = StringToKey::Simple {
            hash: HashAlgorithm::Sha1,
        };
        let key = s2k.derive_key(&registry, b"abc", 20).unwrap();
        assert_eq!(&key[..], hex!("a9993e364706816aba3e25717850c26c9cd0d89d"));
    }

    #[test]
    fn test_multiple_contexts_are_zero_prefixed() {
        let registry = AlgorithmRegistry::with_defaults();
        let s2k = StringToKey::Simple {
            hash: HashAlgorithm::Md5,
        };
        let key = s2k.derive_key(&registry, b"abc", 32).unwrap();
        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], &registry.digest(HashAlgorithm::Md5, b"abc").unwrap()[..]);
        assert_eq!(
            &key[16..],
            &registry.digest(HashAlgorithm::Md5, b"\x00abc").unwrap()[..]
        );
    }

    #[test]
    fn test_iterated_small_count_hashes_once() {
        let registry = AlgorithmRegistry::with_defaults();
        // 1024 octets, larger than salt || passphrase
        let salt = [1u8; 8];
        let long = vec![b'x'; 2000];
        let s2k = StringToKey::IteratedAndSalted {
            hash: HashAlgorithm::Sha256,
            salt,
            count: 0,
        };
        let salted = StringToKey::Salted {
            hash: HashAlgorithm::Sha256,
            salt,
        };
        assert_eq!(
            s2k.derive_key(&registry, &long, 32).unwrap(),
            salted.derive_key(&registry, &long, 32).unwrap()
        );
    }

    #[test]
    fn test_parse_invalid_type() {
        assert!(StringToKey::from_buf(&[2u8, 2][..]).is_err());
        assert!(StringToKey::from_buf(&[101u8, 2, b'X', b'Y', b'Z', 1][..]).is_err());
    }

    #[test]
    fn test_gnu_dummy() {
        let raw = [101u8, 2, b'G', b'N', b'U', 1];
        let s2k = StringToKey::from_buf(&raw[..]).unwrap();
        assert!(s2k.is_dummy());
        assert_eq!(s2k.to_bytes().unwrap(), raw);

        let registry = AlgorithmRegistry::with_defaults();
        assert!(s2k.derive_key(&registry, b"pw", 16).is_err());
    }

    #[test]
    fn test_new_default() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let s2k = StringToKey::new_default(&mut rng);
        assert_eq!(s2k.id(), 3);
        assert_eq!(s2k.hash_alg(), HashAlgorithm::Sha1);
        assert_eq!(s2k.count(), Some(65536));
    }

    proptest! {
        #[test]
        fn write_len(s2k: StringToKey) {
            let buf = s2k.to_bytes()?;
            prop_assert_eq!(buf.len(), s2k.write_len());
        }

        #[test]
        fn packet_roundtrip(s2k: StringToKey) {
            let buf = s2k.to_bytes()?;
            let back = StringToKey::from_buf(&buf[..])?;
            prop_assert_eq!(s2k, back);
        }
    }
}
