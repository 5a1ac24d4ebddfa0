use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Buf;

use crate::crypto::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::packet::{PacketHeader, PacketTrait};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{KeyDetails, KeyVersion, PublicParams, Tag};

/// The public part shared by all key packets.
/// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.5.2>
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PubKeyInner {
    version: KeyVersion,
    algorithm: PublicKeyAlgorithm,
    created_at: u32,
    public_params: PublicParams,
}

impl PubKeyInner {
    pub fn new(algorithm: PublicKeyAlgorithm, created_at: u32, public_params: PublicParams) -> Self {
        PubKeyInner {
            version: KeyVersion::V4,
            algorithm,
            created_at,
            public_params,
        }
    }

    pub(crate) fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let version = KeyVersion::from(i.read_u8()?);
        if version != KeyVersion::V4 {
            unsupported_err!("key version {:?}", version);
        }
        let created_at = i.read_be_u32()?;
        let algorithm = PublicKeyAlgorithm::from(i.read_u8()?);
        let public_params = PublicParams::from_buf(algorithm, &mut i)?;

        Ok(PubKeyInner {
            version,
            algorithm,
            created_at,
            public_params,
        })
    }
}

impl Serialize for PubKeyInner {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.version.into())?;
        writer.write_u32::<BigEndian>(self.created_at)?;
        writer.write_u8(self.algorithm.into())?;
        self.public_params.to_writer(writer)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + 4 + 1 + self.public_params.write_len()
    }
}

impl KeyDetails for PubKeyInner {
    fn version(&self) -> KeyVersion {
        self.version
    }

    fn algorithm(&self) -> PublicKeyAlgorithm {
        self.algorithm
    }

    fn created_at(&self) -> u32 {
        self.created_at
    }

    fn public_params(&self) -> &PublicParams {
        &self.public_params
    }

    fn serialize_for_hashing(&self, writer: &mut impl io::Write) -> Result<()> {
        let len = u16::try_from(self.write_len())?;
        writer.write_u8(0x99)?;
        writer.write_u16::<BigEndian>(len)?;
        self.to_writer(writer)
    }
}

macro_rules! impl_public_key {
    ($(#[$attr:meta])* $name:ident, $tag:expr) => {
        $(#[$attr])*
        #[derive(Debug, PartialEq, Eq, Clone)]
        pub struct $name {
            packet_header: PacketHeader,
            inner: PubKeyInner,
        }

        impl $name {
            /// Creates a v4 key packet.
            pub fn new(
                algorithm: PublicKeyAlgorithm,
                created_at: u32,
                public_params: PublicParams,
            ) -> Result<Self> {
                Self::from_inner(PubKeyInner::new(algorithm, created_at, public_params))
            }

            pub(crate) fn from_inner(inner: PubKeyInner) -> Result<Self> {
                let packet_header = PacketHeader::for_body($tag, inner.write_len())?;
                Ok($name {
                    packet_header,
                    inner,
                })
            }

            /// Parses the packet body. Only v4 keys are supported.
            pub fn from_buf<B: Buf>(packet_header: PacketHeader, i: B) -> Result<Self> {
                ensure_eq!(packet_header.tag(), $tag, "invalid tag");
                let inner = PubKeyInner::from_buf(i)?;

                Ok($name {
                    packet_header,
                    inner,
                })
            }

            pub(crate) fn inner(&self) -> &PubKeyInner {
                &self.inner
            }
        }

        impl Serialize for $name {
            fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
                self.inner.to_writer(writer)
            }

            fn write_len(&self) -> usize {
                self.inner.write_len()
            }
        }

        impl PacketTrait for $name {
            fn packet_header(&self) -> &PacketHeader {
                &self.packet_header
            }
        }

        impl KeyDetails for $name {
            fn version(&self) -> KeyVersion {
                self.inner.version()
            }

            fn algorithm(&self) -> PublicKeyAlgorithm {
                self.inner.algorithm()
            }

            fn created_at(&self) -> u32 {
                self.inner.created_at()
            }

            fn public_params(&self) -> &PublicParams {
                self.inner.public_params()
            }

            fn serialize_for_hashing(&self, writer: &mut impl io::Write) -> Result<()> {
                self.inner.serialize_for_hashing(writer)
            }
        }
    };
}

impl_public_key!(
    /// Public-Key Packet
    /// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.5.1.1>
    PublicKey,
    Tag::PublicKey
);

impl_public_key!(
    /// Public-Subkey Packet
    /// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.5.1.2>
    PublicSubkey,
    Tag::PublicSubkey
);

#[cfg(test)]
pub(crate) mod tests {
    use sha1::{Digest, Sha1};

    use super::*;
    use crate::registry::AlgorithmRegistry;
    use crate::types::Mpi;

    /// A v4 RSA key body with toy parameters.
    pub(crate) const RSA_BODY: [u8; 15] = [
        0x04, 0x5B, 0x00, 0x00, 0x00, 0x01, // version, created, algorithm
        0x00, 0x09, 0x01, 0xFF, // n
        0x00, 0x11, 0x01, 0x00, 0x01, // e
    ];

    pub(crate) fn rsa_params() -> PublicParams {
        PublicParams::RSA {
            n: Mpi::from_slice(&[0x01, 0xFF]),
            e: Mpi::from_slice(&[0x01, 0x00, 0x01]),
        }
    }

    #[test]
    fn test_parse_roundtrip() {
        let header = PacketHeader::new_fixed(Tag::PublicKey, RSA_BODY.len() as u32);
        let key = PublicKey::from_buf(header, &RSA_BODY[..]).unwrap();

        assert_eq!(key.version(), KeyVersion::V4);
        assert_eq!(key.algorithm(), PublicKeyAlgorithm::RSA);
        assert_eq!(key.created_at(), 0x5B00_0000);
        assert_eq!(key.public_params(), &rsa_params());
        assert_eq!(key.to_bytes().unwrap(), RSA_BODY);

        let built = PublicKey::new(PublicKeyAlgorithm::RSA, 0x5B00_0000, rsa_params()).unwrap();
        assert_eq!(built, key);
    }

    #[test]
    fn test_fingerprint() {
        let registry = AlgorithmRegistry::with_defaults();
        let key = PublicSubkey::new(PublicKeyAlgorithm::RSA, 0x5B00_0000, rsa_params()).unwrap();

        let mut framed = vec![0x99, 0x00, RSA_BODY.len() as u8];
        framed.extend_from_slice(&RSA_BODY);
        let expected = Sha1::digest(&framed);

        let fp = key.fingerprint(&registry).unwrap();
        assert_eq!(fp.as_bytes(), expected.as_slice());
        assert_eq!(key.key_id(&registry).unwrap().as_ref(), &expected[12..]);
    }

    #[test]
    fn test_fingerprint_needs_sha1() {
        let registry = AlgorithmRegistry::empty();
        let key = PublicKey::new(PublicKeyAlgorithm::RSA, 0, rsa_params()).unwrap();
        assert!(key.fingerprint(&registry).is_err());
    }

    #[test]
    fn test_unsupported_version() {
        let mut body = RSA_BODY;
        body[0] = 3;
        let header = PacketHeader::new_fixed(Tag::PublicKey, body.len() as u32);
        assert!(PublicKey::from_buf(header, &body[..]).is_err());

        // wrong tag
        let header = PacketHeader::new_fixed(Tag::UserId, RSA_BODY.len() as u32);
        assert!(PublicKey::from_buf(header, &RSA_BODY[..]).is_err());
    }
}
