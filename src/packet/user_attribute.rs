use std::io;

use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::packet::{PacketHeader, PacketTrait};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

/// User Attribute Packet
/// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.12>
///
/// The subpackets (usually a JPEG image) are kept opaque.
#[derive(derive_more::Debug, PartialEq, Eq, Clone)]
pub struct UserAttribute {
    packet_header: PacketHeader,
    #[debug("{} bytes", data.len())]
    data: Bytes,
}

impl UserAttribute {
    /// Parses a `UserAttribute` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_header: PacketHeader, mut input: B) -> Result<Self> {
        ensure_eq!(packet_header.tag(), Tag::UserAttribute, "invalid tag");

        Ok(UserAttribute {
            packet_header,
            data: input.rest(),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Serialize for UserAttribute {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.data.len()
    }
}

impl PacketTrait for UserAttribute {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}
