use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, Bytes};
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::errors::Result;
use crate::packet::{PacketHeader, PacketTrait};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;
use crate::util::display_bytes;

/// Longest file name a literal data packet can carry.
pub const MAX_FILE_NAME_LEN: usize = 0xFF;

/// Literal Data Packet
/// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.9>
#[derive(derive_more::Debug, Clone, PartialEq, Eq)]
pub struct LiteralData {
    packet_header: PacketHeader,
    mode: DataMode,
    #[debug("{}", display_bytes(file_name))]
    file_name: Bytes,
    created: u32,
    #[debug("{}", hex::encode(data))]
    data: Bytes,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum DataMode {
    Binary = b'b',
    Text = b't',
    Utf8 = b'u',

    #[num_enum(catch_all)]
    Other(u8),
}

impl LiteralData {
    /// Creates a literal data packet from the given string. Line endings are kept as is.
    pub fn from_str(file_name: &str, raw_data: &str) -> Result<Self> {
        Self::new(
            DataMode::Utf8,
            file_name.as_bytes(),
            Bytes::copy_from_slice(raw_data.as_bytes()),
        )
    }

    /// Creates a binary literal data packet from the given bytes.
    pub fn from_bytes(file_name: &str, data: impl Into<Bytes>) -> Result<Self> {
        Self::new(DataMode::Binary, file_name.as_bytes(), data.into())
    }

    /// Creates a packet stamped with the current time.
    ///
    /// File names longer than [`MAX_FILE_NAME_LEN`] are truncated.
    pub fn new(mode: DataMode, file_name: &[u8], data: Bytes) -> Result<Self> {
        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
            .unwrap_or_default();
        Self::with_date(mode, file_name, created, data)
    }

    pub fn with_date(mode: DataMode, file_name: &[u8], created: u32, data: Bytes) -> Result<Self> {
        let file_name =
            Bytes::copy_from_slice(&file_name[..file_name.len().min(MAX_FILE_NAME_LEN)]);
        let len = 1 + 1 + file_name.len() + 4 + data.len();
        let packet_header = PacketHeader::for_body(Tag::LiteralData, len)?;

        Ok(LiteralData {
            packet_header,
            mode,
            file_name,
            created,
            data,
        })
    }

    /// Parses a `LiteralData` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_header: PacketHeader, mut i: B) -> Result<Self> {
        ensure_eq!(packet_header.tag(), Tag::LiteralData, "invalid tag");

        let mode = DataMode::from(i.read_u8()?);
        if let DataMode::Other(m) = mode {
            bail!("invalid data format {:#04x}", m);
        }
        let name_len = i.read_u8()?;
        let file_name = i.read_take(name_len.into())?;
        let created = i.read_be_u32()?;
        let data = i.rest();

        Ok(LiteralData {
            packet_header,
            mode,
            file_name,
            created,
            data,
        })
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn file_name(&self) -> &[u8] {
        &self.file_name
    }

    /// Creation time, seconds since the unix epoch.
    pub fn created(&self) -> u32 {
        self.created
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the data as a string if it is valid utf8.
    pub fn to_string(&self) -> Option<String> {
        std::str::from_utf8(&self.data).ok().map(str::to_owned)
    }
}

impl AsRef<[u8]> for LiteralData {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Serialize for LiteralData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.mode.into())?;
        writer.write_u8(self.file_name.len().try_into()?)?;
        writer.write_all(&self.file_name)?;
        writer.write_u32::<BigEndian>(self.created)?;
        writer.write_all(&self.data)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + 1 + self.file_name.len() + 4 + self.data.len()
    }
}

impl PacketTrait for LiteralData {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_parse() {
        let body = [b't', 3, b'f', b'o', b'o', 0, 0, 0, 42, b'h', b'i'];
        let header = PacketHeader::new_fixed(Tag::LiteralData, body.len() as u32);
        let packet = LiteralData::from_buf(header, &body[..]).unwrap();
        assert_eq!(packet.mode(), DataMode::Text);
        assert_eq!(packet.file_name(), b"foo");
        assert_eq!(packet.created(), 42);
        assert_eq!(packet.data(), b"hi");
        assert_eq!(packet.to_bytes().unwrap(), body);
    }

    #[test]
    fn test_invalid_mode() {
        let body = [b'x', 0, 0, 0, 0, 0];
        let header = PacketHeader::new_fixed(Tag::LiteralData, body.len() as u32);
        assert!(LiteralData::from_buf(header, &body[..]).is_err());
    }

    #[test]
    fn test_truncated() {
        // name longer than the body
        let body = [b'b', 10, b'a', 0, 0];
        let header = PacketHeader::new_fixed(Tag::LiteralData, body.len() as u32);
        assert!(LiteralData::from_buf(header, &body[..]).is_err());

        // missing date
        let body = [b'b', 1, b'a', 0, 0];
        let header = PacketHeader::new_fixed(Tag::LiteralData, body.len() as u32);
        assert!(LiteralData::from_buf(header, &body[..]).is_err());
    }

    #[test]
    fn test_long_file_name_truncated() {
        let name = "n".repeat(300);
        let packet = LiteralData::from_bytes(&name, &b"data"[..]).unwrap();
        assert_eq!(packet.file_name().len(), MAX_FILE_NAME_LEN);
        assert_eq!(
            packet.packet_header().packet_length().maybe_len(),
            Some(packet.write_len() as u32)
        );
    }

    #[test]
    fn test_from_str() {
        let packet = LiteralData::from_str("", "hello\n").unwrap();
        assert_eq!(packet.mode(), DataMode::Utf8);
        assert_eq!(packet.to_string().as_deref(), Some("hello\n"));
    }

    proptest! {
        #[test]
        fn write_len(name in "[a-z]{0,20}", data: Vec<u8>, created: u32) {
            let packet = LiteralData::with_date(DataMode::Binary, name.as_bytes(), created, data.into())?;
            let buf = packet.to_bytes()?;
            prop_assert_eq!(buf.len(), packet.write_len());
        }

        #[test]
        fn packet_roundtrip(name in "[a-z]{0,20}", data: Vec<u8>, created: u32) {
            let packet = LiteralData::with_date(DataMode::Binary, name.as_bytes(), created, data.into())?;
            let buf = packet.to_bytes()?;
            let back = LiteralData::from_buf(*packet.packet_header(), &buf[..])?;
            prop_assert_eq!(packet, back);
        }
    }
}
