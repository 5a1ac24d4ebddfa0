use std::io;

use bytes::{Buf, Bytes};
use log::debug;
use zeroize::Zeroizing;

use crate::async_result::AsyncResult;
use crate::crypto::{checksum, PublicKeyAlgorithm, SymmetricKeyAlgorithm};
use crate::errors::Result;
use crate::packet::{PacketHeader, PacketTrait};
use crate::parsing::BufParsing;
use crate::registry::AlgorithmRegistry;
use crate::ser::Serialize;
use crate::types::mpi::read_mpis;
use crate::types::{KeyDetails, KeyId, PlainSessionKey, SecretKeyTrait, Tag};

/// Public Key Encrypted Session Key Packet, version 3
/// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.1>
///
/// The algorithm specific values are kept as they are on the wire, encrypting
/// and decrypting them is up to the asymmetric cipher registered for
/// `pub_algorithm`. The cipher sees `sym_alg || session key || checksum`.
#[derive(derive_more::Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyEncryptedSessionKey {
    packet_header: PacketHeader,
    id: KeyId,
    pub_algorithm: PublicKeyAlgorithm,
    #[debug("{}", hex::encode(values))]
    values: Bytes,
}

impl PublicKeyEncryptedSessionKey {
    /// Parses a `PublicKeyEncryptedSessionKey` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_header: PacketHeader, mut i: B) -> Result<Self> {
        ensure_eq!(
            packet_header.tag(),
            Tag::PublicKeyEncryptedSessionKey,
            "invalid tag"
        );

        let version = i.read_u8()?;
        ensure_eq!(version, 3, "invalid PKESK version");

        let id = KeyId::from(i.read_array::<8>()?);
        let pub_algorithm = PublicKeyAlgorithm::from(i.read_u8()?);

        Ok(PublicKeyEncryptedSessionKey {
            packet_header,
            id,
            pub_algorithm,
            values: i.rest(),
        })
    }

    /// Creates a packet from already encrypted, MPI encoded `values`.
    pub fn from_encrypted(
        id: KeyId,
        pub_algorithm: PublicKeyAlgorithm,
        values: impl Into<Bytes>,
    ) -> Result<Self> {
        let values = values.into();
        let packet_header =
            PacketHeader::for_body(Tag::PublicKeyEncryptedSessionKey, 10 + values.len())?;

        Ok(PublicKeyEncryptedSessionKey {
            packet_header,
            id,
            pub_algorithm,
            values,
        })
    }

    /// Encrypts `session_key` to `key`.
    pub fn encrypt(
        registry: &AlgorithmRegistry,
        key: &impl KeyDetails,
        session_key: &PlainSessionKey,
    ) -> AsyncResult<Self> {
        let pub_algorithm = key.algorithm();
        let prepared = registry
            .asymmetric
            .require(pub_algorithm, Some(&key.public_key_material()))
            .and_then(|cipher| Ok((cipher, key.key_id(registry)?)));
        let (cipher, id) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => return AsyncResult::err(err),
        };

        let mut plain = Zeroizing::new(Vec::with_capacity(session_key.key().len() + 3));
        plain.push(session_key.sym_alg().into());
        plain.extend_from_slice(session_key.key());
        plain.extend_from_slice(&checksum::calculate_simple(session_key.key()).to_be_bytes());
        debug!("encrypting session key to {:?} ({:?})", id, pub_algorithm);

        cipher
            .encrypt(&plain)
            .add_callback(move |mpis| Self::from_encrypted(id, pub_algorithm, mpis.to_bytes()?))
    }

    /// Decrypts the session key with the secret material of `key`.
    pub fn decrypt(
        &self,
        registry: &AlgorithmRegistry,
        key: &impl SecretKeyTrait,
    ) -> AsyncResult<PlainSessionKey> {
        if key.algorithm() != self.pub_algorithm {
            return AsyncResult::err(format_err!(
                "session key is encrypted with {:?}, the key is {:?}",
                self.pub_algorithm,
                key.algorithm()
            ));
        }
        let prepared = key
            .secret_key_material()
            .and_then(|material| registry.asymmetric.require(self.pub_algorithm, Some(&material)))
            .and_then(|cipher| Ok((cipher, read_mpis(self.values.clone())?)));
        let (cipher, mpis) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => return AsyncResult::err(err),
        };

        cipher
            .decrypt(&mpis)
            .add_callback(|decrypted| extract_session_key(&Zeroizing::new(decrypted)))
    }

    /// The key this session key was encrypted to.
    pub fn id(&self) -> &KeyId {
        &self.id
    }

    pub fn pub_algorithm(&self) -> PublicKeyAlgorithm {
        self.pub_algorithm
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }
}

/// Splits `sym_alg || key || checksum` and checks the checksum.
fn extract_session_key(data: &[u8]) -> Result<PlainSessionKey> {
    ensure!(data.len() > 3, "decrypted session key is too short");
    let sym_alg = SymmetricKeyAlgorithm::from(data[0]);
    let (key, sum) = data[1..].split_at(data.len() - 3);
    ensure_eq!(
        u16::from_be_bytes([sum[0], sum[1]]),
        checksum::calculate_simple(key),
        "Bad checksum for decrypted session key"
    );

    let session_key = PlainSessionKey::new(sym_alg, Zeroizing::new(key.to_vec()));
    ensure!(
        session_key.is_valid(),
        "session key of {} bytes does not fit {:?}",
        key.len(),
        sym_alg
    );
    Ok(session_key)
}

impl Serialize for PublicKeyEncryptedSessionKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[3])?;
        writer.write_all(self.id.as_ref())?;
        writer.write_all(&[self.pub_algorithm.into()])?;
        writer.write_all(&self.values)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + 8 + 1 + self.values.len()
    }
}

impl PacketTrait for PublicKeyEncryptedSessionKey {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}
