use bytes::{Buf, Bytes};
use log::{debug, warn};

use crate::errors::Result;
use crate::packet::{body_parser, Packet, PacketHeader};
use crate::parsing::BufParsing;
use crate::types::PacketLength;

/// Splits a buffer into packets.
///
/// Marker and private packets are skipped. A malformed header or a body
/// shorter than its declared length ends the iteration after yielding the
/// error, a malformed body only fails that one packet.
#[derive(Debug)]
pub struct PacketParser {
    buffer: Bytes,
    done: bool,
}

impl PacketParser {
    pub fn new(buffer: impl Into<Bytes>) -> Self {
        PacketParser {
            buffer: buffer.into(),
            done: false,
        }
    }

    /// The bytes that have not been consumed yet.
    pub fn into_inner(self) -> Bytes {
        self.buffer
    }

    /// Reads one header and the body it frames.
    fn next_frame(&mut self) -> Result<(PacketHeader, Bytes)> {
        let header = PacketHeader::from_buf(&mut self.buffer)?;
        let body = match header.packet_length() {
            PacketLength::Fixed(len) => self.buffer.read_take(usize::try_from(len)?)?,
            PacketLength::Indeterminate => self.buffer.rest(),
            PacketLength::Partial(_) => {
                unsupported_err!("partial body lengths ({:?})", header.tag())
            }
        };

        Ok((header, body))
    }
}

impl Iterator for PacketParser {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done || !self.buffer.has_remaining() {
                return None;
            }

            let (header, body) = match self.next_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    warn!("packet framing failed: {}", err);
                    self.done = true;
                    return Some(Err(err));
                }
            };

            if header.tag().is_ignored() {
                debug!("skipping {:?} packet", header.tag());
                continue;
            }

            return Some(body_parser(header, body));
        }
    }
}

/// Parses all packets in `input`, failing on the first error.
pub fn parse_packets(input: impl Into<Bytes>) -> Result<Vec<Packet>> {
    PacketParser::new(input).collect()
}
