use std::io;
use std::rc::Rc;

use bytes::{Buf, Bytes};
use log::debug;
use rand::{CryptoRng, Rng};
use zeroize::Zeroizing;

use crate::async_result::AsyncResult;
use crate::crypto::mode::{Cfb, CipherMode};
use crate::crypto::SymmetricKeyAlgorithm;
use crate::errors::{Error, Result};
use crate::packet::{PacketHeader, PacketTrait};
use crate::parsing::BufParsing;
use crate::registry::AlgorithmRegistry;
use crate::ser::Serialize;
use crate::types::{PlainSessionKey, StringToKey, Tag};

/// Symmetric-Key Encrypted Session Key Packet, version 4
/// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.3>
///
/// Without an encrypted session key, the key derived from the passphrase is
/// the session key itself.
#[derive(derive_more::Debug, Clone, PartialEq, Eq)]
pub struct SymKeyEncryptedSessionKey {
    packet_header: PacketHeader,
    sym_algorithm: SymmetricKeyAlgorithm,
    s2k: StringToKey,
    #[debug("{}", hex::encode(encrypted_key))]
    encrypted_key: Bytes,
}

impl SymKeyEncryptedSessionKey {
    /// Parses a `SymKeyEncryptedSessionKey` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_header: PacketHeader, mut i: B) -> Result<Self> {
        ensure_eq!(
            packet_header.tag(),
            Tag::SymKeyEncryptedSessionKey,
            "invalid tag"
        );

        let version = i.read_u8()?;
        if version != 4 {
            unsupported_err!("SKESK version {}", version);
        }
        let sym_algorithm = SymmetricKeyAlgorithm::from(i.read_u8()?);
        let s2k = StringToKey::from_buf(&mut i)?;

        Ok(SymKeyEncryptedSessionKey {
            packet_header,
            sym_algorithm,
            s2k,
            encrypted_key: i.rest(),
        })
    }

    /// A packet without an encrypted session key.
    pub fn new(s2k: StringToKey, sym_algorithm: SymmetricKeyAlgorithm) -> Result<Self> {
        Self::from_parts(s2k, sym_algorithm, Bytes::new())
    }

    fn from_parts(
        s2k: StringToKey,
        sym_algorithm: SymmetricKeyAlgorithm,
        encrypted_key: Bytes,
    ) -> Result<Self> {
        let len = 2 + s2k.write_len() + encrypted_key.len();
        let packet_header = PacketHeader::for_body(Tag::SymKeyEncryptedSessionKey, len)?;

        Ok(SymKeyEncryptedSessionKey {
            packet_header,
            sym_algorithm,
            s2k,
            encrypted_key,
        })
    }

    /// Encrypts `session_key` to `passphrase`.
    ///
    /// The passphrase is stretched with an iterated and salted S2K, the session
    /// key is then encrypted with `sym_algorithm` in CFB mode with a zero IV.
    pub fn encrypt_with_rng<R: CryptoRng + Rng>(
        rng: &mut R,
        registry: &AlgorithmRegistry,
        passphrase: &[u8],
        sym_algorithm: SymmetricKeyAlgorithm,
        session_key: &PlainSessionKey,
    ) -> AsyncResult<Self> {
        let s2k = StringToKey::new_default(rng);

        let prepared = (|| {
            let key = s2k.derive_key(registry, passphrase, sym_algorithm.key_size())?;
            let cipher = registry.symmetric_cipher(sym_algorithm, &key)?;
            Ok::<_, Error>(Cfb::new(Rc::from(cipher)))
        })();
        let cfb = match prepared {
            Ok(cfb) => cfb,
            Err(err) => return AsyncResult::err(err),
        };

        let mut data = Zeroizing::new(Vec::with_capacity(1 + session_key.key().len()));
        data.push(session_key.sym_alg().into());
        data.extend_from_slice(session_key.key());

        let iv = vec![0u8; cfb.block_size()];
        cfb.encrypt(&data, &iv).add_callback(move |encrypted| {
            Self::from_parts(s2k, sym_algorithm, encrypted.into())
        })
    }

    /// Recovers the session key using `passphrase`.
    ///
    /// A decrypted session key with an unknown algorithm or a length that
    /// does not fit the algorithm is reported as [`Error::WrongPassphrase`].
    pub fn decrypt(
        &self,
        registry: &AlgorithmRegistry,
        passphrase: &[u8],
    ) -> AsyncResult<PlainSessionKey> {
        debug!("decrypting SKESK with {:?}", self.sym_algorithm);

        let key = match self
            .s2k
            .derive_key(registry, passphrase, self.sym_algorithm.key_size())
        {
            Ok(key) => key,
            Err(err) => return AsyncResult::err(err),
        };
        if self.encrypted_key.is_empty() {
            return AsyncResult::ok(PlainSessionKey::new(self.sym_algorithm, key));
        }

        let cipher = match registry.symmetric_cipher(self.sym_algorithm, &key) {
            Ok(cipher) => cipher,
            Err(err) => return AsyncResult::err(err),
        };
        let iv = vec![0u8; cipher.block_size()];
        Cfb::new(Rc::from(cipher))
            .decrypt(&self.encrypted_key, &iv)
            .add_callback(|decrypted| {
                let decrypted = Zeroizing::new(decrypted);
                let Some((alg, key)) = decrypted.split_first() else {
                    return Err(Error::WrongPassphrase);
                };
                let session_key =
                    PlainSessionKey::new(SymmetricKeyAlgorithm::from(*alg), key.to_vec().into());
                if !session_key.is_valid() {
                    return Err(Error::WrongPassphrase);
                }
                Ok(session_key)
            })
    }

    pub fn sym_algorithm(&self) -> SymmetricKeyAlgorithm {
        self.sym_algorithm
    }

    pub fn s2k(&self) -> &StringToKey {
        &self.s2k
    }

    pub fn encrypted_key(&self) -> &[u8] {
        &self.encrypted_key
    }
}

impl Serialize for SymKeyEncryptedSessionKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[4, self.sym_algorithm.into()])?;
        self.s2k.to_writer(writer)?;
        writer.write_all(&self.encrypted_key)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        2 + self.s2k.write_len() + self.encrypted_key.len()
    }
}

impl PacketTrait for SymKeyEncryptedSessionKey {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::HashAlgorithm;

    #[test]
    fn test_encrypt_decrypt_session_key() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let registry = AlgorithmRegistry::with_defaults();
        let session_key = PlainSessionKey::generate(&mut rng, SymmetricKeyAlgorithm::AES128);

        let skesk = SymKeyEncryptedSessionKey::encrypt_with_rng(
            &mut rng,
            &registry,
            b"secret",
            SymmetricKeyAlgorithm::AES256,
            &session_key,
        )
        .value()
        .unwrap();
        assert_eq!(skesk.encrypted_key().len(), 1 + 16);

        let bytes = skesk.to_bytes().unwrap();
        let back = SymKeyEncryptedSessionKey::from_buf(*skesk.packet_header(), &bytes[..]).unwrap();
        assert_eq!(back, skesk);

        let decrypted = back.decrypt(&registry, b"secret").value().unwrap();
        assert_eq!(decrypted, session_key);

        let wrong = back.decrypt(&registry, b"not the secret").value();
        assert_ne!(wrong.ok(), Some(session_key));
    }

    #[test]
    fn test_without_encrypted_key() {
        let registry = AlgorithmRegistry::with_defaults();
        let s2k = StringToKey::IteratedAndSalted {
            hash: HashAlgorithm::Sha1,
            salt: [1, 2, 3, 4, 5, 6, 7, 8],
            count: 96,
        };
        let skesk = SymKeyEncryptedSessionKey::new(s2k.clone(), SymmetricKeyAlgorithm::AES128).unwrap();
        assert_eq!(skesk.write_len(), 2 + 11);

        let session_key = skesk.decrypt(&registry, b"pw").value().unwrap();
        assert_eq!(session_key.sym_alg(), SymmetricKeyAlgorithm::AES128);
        assert_eq!(
            session_key.key(),
            s2k.derive_key(&registry, b"pw", 16).unwrap().as_slice()
        );
    }

    #[test]
    fn test_unsupported_version() {
        let header = PacketHeader::new_fixed(Tag::SymKeyEncryptedSessionKey, 4);
        let err = SymKeyEncryptedSessionKey::from_buf(header, &[5u8, 9, 0, 2][..]).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }
}
