use byteorder::{BigEndian, WriteBytesExt};
use bytes::Buf;
use log::debug;

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, PacketLength, Tag};

/// Largest body a packet may carry.
pub const MAXIMUM_PACKET_SIZE: u32 = u32::MAX;

/// Length of every header this crate writes: the tag octet, `0xFF` and four length octets.
pub const HEADER_LEN: usize = 6;

/// Represents a packet header.
///
/// Both header formats are read. Headers are always written in the new
/// format with a five octet length.
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-4.2>
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    version: PacketHeaderVersion,
    tag: Tag,
    length: PacketLength,
}

impl PacketHeader {
    /// Parse a single packet header from the given buffer.
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let header = i.read_u8()?;

        match header & 0b1100_0000 {
            0b1100_0000 => {
                // new starts with 0b11
                let tag = Tag::from(header & 0b0011_1111);
                let olen = i.read_u8()?;
                let length = match olen {
                    // One-Octet Lengths
                    0..=191 => PacketLength::Fixed(olen.into()),
                    // Two-Octet Lengths
                    192..=223 => {
                        let a = i.read_u8()?;
                        let l = ((u32::from(olen) - 192) << 8) + 192 + u32::from(a);
                        PacketLength::Fixed(l)
                    }
                    // Partial Body Lengths
                    224..=254 => PacketLength::Partial(1 << (olen & 0x1F)),
                    // Five-Octet Lengths
                    255 => PacketLength::Fixed(i.read_be_u32()?),
                };
                Ok(PacketHeader {
                    version: PacketHeaderVersion::New,
                    tag,
                    length,
                })
            }
            0b1000_0000 => {
                // old starts with 0b10
                let tag = Tag::from((header >> 2) & 0b0000_1111);
                let length = match header & 0b0000_0011 {
                    // One-Octet Lengths
                    0 => PacketLength::Fixed(i.read_u8()?.into()),
                    // Two-Octet Lengths
                    1 => PacketLength::Fixed(i.read_be_u16()?.into()),
                    // Four-Octet Lengths
                    2 => PacketLength::Fixed(i.read_be_u32()?),
                    _ => PacketLength::Indeterminate,
                };
                Ok(PacketHeader {
                    version: PacketHeaderVersion::Old,
                    tag,
                    length,
                })
            }
            _ => {
                bail!("unknown packet header version {:b}", header);
            }
        }
    }

    pub fn from_parts(
        version: PacketHeaderVersion,
        tag: Tag,
        length: PacketLength,
    ) -> Result<Self> {
        let id = u8::from(tag);
        match version {
            PacketHeaderVersion::Old => {
                ensure!(
                    id < 16,
                    "tag is not compatible with old packet headers: {:?}",
                    tag
                );
                ensure!(
                    !matches!(length, PacketLength::Partial(_)),
                    "partial lengths are only supported in new style headers"
                );
            }
            PacketHeaderVersion::New => {
                ensure!(id < 64, "tag is not compatible with packet headers: {:?}", tag);
                ensure!(
                    !matches!(length, PacketLength::Indeterminate),
                    "indeterminate packet length is only supported in old style headers"
                );
            }
        }

        Ok(PacketHeader {
            version,
            tag,
            length,
        })
    }

    /// Creates a `New` style packet header.
    pub fn new_fixed(tag: Tag, length: u32) -> Self {
        PacketHeader {
            version: PacketHeaderVersion::New,
            tag,
            length: PacketLength::Fixed(length),
        }
    }

    /// Creates a `New` style header for a body of `len` bytes.
    ///
    /// Fails if the body is larger than [`MAXIMUM_PACKET_SIZE`].
    pub fn for_body(tag: Tag, len: usize) -> Result<Self> {
        let length = u32::try_from(len).map_err(|_| {
            format_err!(
                "packet body of {} bytes exceeds the maximum packet size of {} bytes",
                len,
                MAXIMUM_PACKET_SIZE
            )
        })?;
        Ok(Self::new_fixed(tag, length))
    }

    /// Returns the packet header version.
    pub const fn version(&self) -> PacketHeaderVersion {
        self.version
    }

    /// Returns the packet length.
    pub fn packet_length(&self) -> PacketLength {
        self.length
    }

    /// Returns the packet tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }
}

impl Serialize for PacketHeader {
    fn to_writer<W: std::io::Write>(&self, writer: &mut W) -> Result<()> {
        let PacketLength::Fixed(len) = self.length else {
            unsupported_err!("writing {:?} packet lengths", self.length);
        };
        let id = u8::from(self.tag);
        ensure!(id < 64, "invalid packet tag {}", id);

        debug!("writing packet header {:?} {}", self.tag, len);
        writer.write_u8(0b1100_0000 | id)?;
        writer.write_u8(0xFF)?;
        writer.write_u32::<BigEndian>(len)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        HEADER_LEN
    }
}
