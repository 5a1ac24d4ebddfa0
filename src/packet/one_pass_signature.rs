use std::io;

use bytes::Buf;

use crate::crypto::{HashAlgorithm, PublicKeyAlgorithm};
use crate::errors::Result;
use crate::packet::{PacketHeader, PacketTrait, SignatureType};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{KeyId, Tag};

/// One-Pass Signature Packet
/// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.4>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnePassSignature {
    packet_header: PacketHeader,
    version: u8,
    typ: SignatureType,
    hash_algorithm: HashAlgorithm,
    pub_algorithm: PublicKeyAlgorithm,
    key_id: KeyId,
    /// Zero if another one-pass signature over the same data follows.
    last: u8,
}

impl OnePassSignature {
    /// Parses a `OnePassSignature` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_header: PacketHeader, mut i: B) -> Result<Self> {
        ensure_eq!(packet_header.tag(), Tag::OnePassSignature, "invalid tag");

        let version = i.read_u8()?;
        if version != 3 {
            unsupported_err!("one pass signature version {}", version);
        }
        let typ = SignatureType::from(i.read_u8()?);
        let hash_algorithm = HashAlgorithm::from(i.read_u8()?);
        let pub_algorithm = PublicKeyAlgorithm::from(i.read_u8()?);
        let key_id = KeyId::from(i.read_array::<8>()?);
        let last = i.read_u8()?;

        Ok(OnePassSignature {
            packet_header,
            version,
            typ,
            hash_algorithm,
            pub_algorithm,
            key_id,
            last,
        })
    }

    pub fn new(
        typ: SignatureType,
        hash_algorithm: HashAlgorithm,
        pub_algorithm: PublicKeyAlgorithm,
        key_id: KeyId,
        nested: bool,
    ) -> Self {
        OnePassSignature {
            packet_header: PacketHeader::new_fixed(Tag::OnePassSignature, 13),
            version: 3,
            typ,
            hash_algorithm,
            pub_algorithm,
            key_id,
            last: u8::from(!nested),
        }
    }

    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn pub_algorithm(&self) -> PublicKeyAlgorithm {
        self.pub_algorithm
    }

    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    /// True if the next packet is another one-pass signature over the same data.
    pub fn is_nested(&self) -> bool {
        self.last == 0
    }
}

impl Serialize for OnePassSignature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[
            self.version,
            self.typ.into(),
            self.hash_algorithm.into(),
            self.pub_algorithm.into(),
        ])?;
        writer.write_all(self.key_id.as_ref())?;
        writer.write_all(&[self.last])?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        4 + 8 + 1
    }
}

impl PacketTrait for OnePassSignature {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}
