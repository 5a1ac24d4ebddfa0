use std::io;

use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::packet::{PacketHeader, PacketTrait};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;
use crate::util::display_bytes;

/// User ID Packet
/// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.11>
///
/// The id is kept as raw bytes, it is meant to be UTF-8 but that is not enforced.
#[derive(derive_more::Debug, PartialEq, Eq, Clone)]
pub struct UserId {
    packet_header: PacketHeader,
    #[debug("{}", display_bytes(id))]
    id: Bytes,
}

impl UserId {
    /// Parses a `UserId` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_header: PacketHeader, mut input: B) -> Result<Self> {
        ensure_eq!(packet_header.tag(), Tag::UserId, "invalid tag");

        Ok(UserId {
            packet_header,
            id: input.rest(),
        })
    }

    pub fn new(input: &str) -> Result<Self> {
        let id = Bytes::copy_from_slice(input.as_bytes());
        let packet_header = PacketHeader::for_body(Tag::UserId, id.len())?;
        Ok(UserId { packet_header, id })
    }

    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// The id as a string, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.id).ok()
    }
}

impl Serialize for UserId {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.id)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.id.len()
    }
}

impl PacketTrait for UserId {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id() {
        let uid = UserId::new("Alice <alice@example.org>").unwrap();
        assert_eq!(uid.as_str(), Some("Alice <alice@example.org>"));
        let bytes = uid.to_bytes().unwrap();
        let back = UserId::from_buf(*uid.packet_header(), &bytes[..]).unwrap();
        assert_eq!(uid, back);
    }

    #[test]
    fn test_non_utf8_is_kept() {
        let header = PacketHeader::new_fixed(Tag::UserId, 2);
        let uid = UserId::from_buf(header, &[0xFF, 0xFE][..]).unwrap();
        assert_eq!(uid.as_str(), None);
        assert_eq!(uid.id(), &[0xFF, 0xFE]);
    }
}
