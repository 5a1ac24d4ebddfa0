use std::io;
use std::rc::Rc;

use bytes::{Buf, Bytes};
use log::debug;
use rand::{CryptoRng, Rng};

use crate::async_result::AsyncResult;
use crate::crypto::mode::Ocfb;
use crate::crypto::HashAlgorithm;
use crate::errors::{Error, Result};
use crate::packet::{PacketHeader, PacketTrait};
use crate::parsing::BufParsing;
use crate::registry::{AlgorithmRegistry, Hash};
use crate::ser::Serialize;
use crate::types::{PlainSessionKey, Tag};

/// Header of the trailing modification detection code packet: tag 19, length 20.
const MDC_HEADER: [u8; 2] = [0xD3, 0x14];
const MDC_LEN: usize = 20;

/// Sym. Encrypted Integrity Protected Data Packet, version 1
/// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.13>
///
/// The plaintext is followed by a modification detection code packet holding
/// the SHA-1 of everything before it, and the whole is encrypted with
/// OpenPGP CFB without resynchronization.
#[derive(derive_more::Debug, Clone, PartialEq, Eq)]
pub struct SymEncryptedProtectedData {
    packet_header: PacketHeader,
    #[debug("{}", hex::encode(data))]
    data: Bytes,
}

impl SymEncryptedProtectedData {
    /// Parses a `SymEncryptedProtectedData` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_header: PacketHeader, mut input: B) -> Result<Self> {
        ensure_eq!(
            packet_header.tag(),
            Tag::SymEncryptedProtectedData,
            "invalid tag"
        );

        let version = input.read_u8()?;
        if version != 1 {
            unsupported_err!("SymEncryptedProtectedData version {}", version);
        }

        Ok(SymEncryptedProtectedData {
            packet_header,
            data: input.rest(),
        })
    }

    /// Wraps ciphertext, without the version octet.
    pub fn from_encrypted(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let packet_header = PacketHeader::for_body(Tag::SymEncryptedProtectedData, 1 + data.len())?;
        Ok(SymEncryptedProtectedData {
            packet_header,
            data,
        })
    }

    /// Encrypts `plaintext` under `session_key` behind a random prefix.
    pub fn encrypt_with_rng<R: CryptoRng + Rng>(
        rng: &mut R,
        registry: &AlgorithmRegistry,
        session_key: &PlainSessionKey,
        plaintext: &[u8],
    ) -> AsyncResult<Self> {
        let mut prefix = vec![0u8; session_key.sym_alg().block_size()];
        rng.fill(&mut prefix[..]);

        Self::encrypt_with_prefix(registry, session_key, &prefix, plaintext)
    }

    fn encrypt_with_prefix(
        registry: &AlgorithmRegistry,
        session_key: &PlainSessionKey,
        prefix: &[u8],
        plaintext: &[u8],
    ) -> AsyncResult<Self> {
        let prepared = (|| {
            let ocfb = mode(registry, session_key)?;
            let mut hasher = registry.hasher(HashAlgorithm::Sha1)?;

            let mut data = Vec::with_capacity(plaintext.len() + MDC_HEADER.len() + MDC_LEN);
            data.extend_from_slice(plaintext);
            data.extend_from_slice(&MDC_HEADER);

            // the code covers the prefix including its repeated check bytes
            hasher.update(prefix);
            hasher.update(&prefix[prefix.len().saturating_sub(2)..]);
            hasher.update(&data);
            data.extend_from_slice(&hasher.finalize_reset());

            Ok::<_, Error>((ocfb, data))
        })();

        match prepared {
            Ok((ocfb, data)) => ocfb
                .encrypt_with_prefix(prefix, &data, &[])
                .add_callback(Self::from_encrypted),
            Err(err) => AsyncResult::err(err),
        }
    }

    /// Decrypts the packet and checks the modification detection code.
    ///
    /// Fails with [`Error::MdcError`] if the code is missing or does not match.
    pub fn decrypt(
        &self,
        registry: &AlgorithmRegistry,
        session_key: &PlainSessionKey,
    ) -> AsyncResult<Vec<u8>> {
        debug!("decrypting SEIPD packet with {:?}", session_key.sym_alg());
        let prepared = (|| {
            let ocfb = mode(registry, session_key)?;
            let hasher = registry.hasher(HashAlgorithm::Sha1)?;
            Ok::<_, Error>((ocfb, hasher))
        })();
        let (ocfb, hasher) = match prepared {
            Ok(p) => p,
            Err(err) => return AsyncResult::err(err),
        };

        let prefix_len = ocfb.prefix_len();
        ocfb.decrypt_with_prefix(&self.data, &[])
            .add_callback(move |plain| check_mdc(hasher, prefix_len, plain))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

fn mode(registry: &AlgorithmRegistry, session_key: &PlainSessionKey) -> Result<Ocfb> {
    let cipher = registry.symmetric_cipher(session_key.sym_alg(), session_key.key())?;
    Ok(Ocfb::new(Rc::from(cipher), false))
}

/// Verifies and strips the trailing code, then strips the prefix.
fn check_mdc(mut hasher: Box<dyn Hash>, prefix_len: usize, mut plain: Vec<u8>) -> Result<Vec<u8>> {
    if plain.len() < prefix_len + MDC_HEADER.len() + MDC_LEN {
        return Err(Error::MdcError);
    }
    let mdc = plain.split_off(plain.len() - MDC_LEN);
    if plain[plain.len() - MDC_HEADER.len()..] != MDC_HEADER {
        return Err(Error::MdcError);
    }
    if hasher.hash(&plain) != mdc {
        return Err(Error::MdcError);
    }

    plain.truncate(plain.len() - MDC_HEADER.len());
    Ok(plain.split_off(prefix_len))
}

impl Serialize for SymEncryptedProtectedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[0x01])?;
        writer.write_all(&self.data)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + self.data.len()
    }
}

impl PacketTrait for SymEncryptedProtectedData {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::SymmetricKeyAlgorithm;

    fn key() -> PlainSessionKey {
        PlainSessionKey::new(
            SymmetricKeyAlgorithm::AES128,
            hex!("000102030405060708090a0b0c0d0e0f").to_vec().into(),
        )
    }

    #[test]
    fn test_encrypt_decrypt() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let registry = AlgorithmRegistry::with_defaults();

        let packet = SymEncryptedProtectedData::encrypt_with_rng(&mut rng, &registry, &key(), b"hi")
            .value()
            .unwrap();
        // prefix, check bytes, data, mdc packet
        assert_eq!(packet.data().len(), 16 + 2 + 2 + 22);
        assert_eq!(packet.write_len(), 1 + packet.data().len());

        let plain = packet.decrypt(&registry, &key()).value().unwrap();
        assert_eq!(plain, b"hi");
    }

    #[test]
    fn test_tampering_is_detected() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let registry = AlgorithmRegistry::with_defaults();

        let packet =
            SymEncryptedProtectedData::encrypt_with_rng(&mut rng, &registry, &key(), b"hello world")
                .value()
                .unwrap();

        for pos in [0, 17, 20, packet.data().len() - 1] {
            let mut data = packet.data().to_vec();
            data[pos] ^= 0x01;
            let tampered = SymEncryptedProtectedData::from_encrypted(data).unwrap();
            let err = tampered.decrypt(&registry, &key()).value().unwrap_err();
            assert!(matches!(err, Error::MdcError), "position {}: {:?}", pos, err);
        }
    }

    #[test]
    fn test_wrong_key() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let registry = AlgorithmRegistry::with_defaults();
        let packet = SymEncryptedProtectedData::encrypt_with_rng(&mut rng, &registry, &key(), b"hi")
            .value()
            .unwrap();

        let other = PlainSessionKey::new(SymmetricKeyAlgorithm::AES128, vec![7u8; 16].into());
        let err = packet.decrypt(&registry, &other).value().unwrap_err();
        assert!(matches!(err, Error::MdcError));
    }

    #[test]
    fn test_too_short() {
        let registry = AlgorithmRegistry::with_defaults();
        let packet = SymEncryptedProtectedData::from_encrypted(vec![0u8; 20]).unwrap();
        let err = packet.decrypt(&registry, &key()).value().unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_parse_version() {
        let header = PacketHeader::new_fixed(Tag::SymEncryptedProtectedData, 3);
        let packet = SymEncryptedProtectedData::from_buf(header, &[1u8, 0xAA, 0xBB][..]).unwrap();
        assert_eq!(packet.data(), &[0xAA, 0xBB]);
        assert_eq!(packet.to_bytes().unwrap(), vec![1, 0xAA, 0xBB]);

        assert!(SymEncryptedProtectedData::from_buf(header, &[2u8, 0xAA, 0xBB][..]).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn encrypt_decrypt(data: Vec<u8>, seed: u64) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let registry = AlgorithmRegistry::with_defaults();
            let packet = SymEncryptedProtectedData::encrypt_with_rng(&mut rng, &registry, &key(), &data)
                .value()?;
            let plain = packet.decrypt(&registry, &key()).value()?;
            prop_assert_eq!(plain, data);
        }
    }
}
