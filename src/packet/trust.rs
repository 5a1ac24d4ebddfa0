use std::io;

use bytes::{Buf, Bytes};
use log::debug;

use crate::errors::Result;
use crate::packet::{PacketHeader, PacketTrait};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

/// Trust Packet
/// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.10>
/// Trust packets SHOULD NOT be emitted to output streams that are
/// transferred to other users, and they SHOULD be ignored on any input
/// other than local keyring files.
#[derive(derive_more::Debug, Clone, PartialEq, Eq)]
pub struct Trust {
    packet_header: PacketHeader,
    #[debug("{}", hex::encode(data))]
    data: Bytes,
}

impl Trust {
    /// Parses a `Trust` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_header: PacketHeader, mut input: B) -> Result<Self> {
        ensure_eq!(packet_header.tag(), Tag::Trust, "invalid tag");
        debug!("trust packet detected");

        Ok(Trust {
            packet_header,
            data: input.rest(),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Serialize for Trust {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.data.len()
    }
}

impl PacketTrait for Trust {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}
