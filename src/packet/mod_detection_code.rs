use std::io;

use bytes::Buf;

use crate::errors::Result;
use crate::packet::{PacketHeader, PacketTrait};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

/// Modification Detection Code Packet
/// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.14>
///
/// Only ever found inside the plaintext of integrity protected data, where
/// [`SymEncryptedProtectedData`](super::SymEncryptedProtectedData) checks it.
#[derive(derive_more::Debug, Clone, PartialEq, Eq)]
pub struct ModDetectionCode {
    packet_header: PacketHeader,
    /// 20 byte SHA1 hash of the preceeding plaintext data.
    #[debug("{}", hex::encode(hash))]
    hash: [u8; 20],
}

impl ModDetectionCode {
    /// Parses a `ModDetectionCode` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_header: PacketHeader, mut input: B) -> Result<Self> {
        ensure_eq!(packet_header.tag(), Tag::ModDetectionCode, "invalid tag");
        let hash = input.read_array::<20>()?;
        ensure!(!input.has_remaining(), "trailing bytes after MDC");

        Ok(ModDetectionCode {
            packet_header,
            hash,
        })
    }

    pub fn new(hash: [u8; 20]) -> Self {
        ModDetectionCode {
            packet_header: PacketHeader::new_fixed(Tag::ModDetectionCode, 20),
            hash,
        }
    }

    pub fn hash(&self) -> &[u8; 20] {
        &self.hash
    }
}

impl Serialize for ModDetectionCode {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.hash)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.hash.len()
    }
}

impl PacketTrait for ModDetectionCode {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_must_be_20() {
        let header = PacketHeader::new_fixed(Tag::ModDetectionCode, 20);
        let packet = ModDetectionCode::from_buf(header, &[7u8; 20][..]).unwrap();
        assert_eq!(packet, ModDetectionCode::new([7u8; 20]));
        assert_eq!(packet.to_bytes().unwrap(), vec![7u8; 20]);

        assert!(ModDetectionCode::from_buf(header, &[7u8; 19][..]).is_err());
        assert!(ModDetectionCode::from_buf(header, &[7u8; 21][..]).is_err());
    }
}
