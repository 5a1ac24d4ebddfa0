use std::iter::Peekable;

use bytes::Bytes;
use log::debug;

use crate::errors::{Error, Result};
use crate::packet::{Packet, PacketParser, PacketTrait};
use crate::types::Tag;

pub trait Deserializable: Sized {
    /// Parses one composition from the front of `packets`.
    ///
    /// Packets following the composition are left in `packets`.
    fn from_packets<I: Iterator<Item = Result<Packet>>>(packets: &mut Peekable<I>) -> Result<Self>;

    /// Parse a single byte encoded composition.
    ///
    /// Fails if any packets follow the composition.
    fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self> {
        let mut packets = PacketParser::new(bytes).peekable();
        let el = Self::from_packets(&mut packets)?;
        if let Some(next) = packets.next() {
            let tag = next?.tag();
            bail!("Unexpected packets following block: {:?}", tag);
        }

        Ok(el)
    }

    /// Parse a list of compositions in raw byte format.
    fn from_bytes_many<'a>(bytes: impl Into<Bytes>) -> Box<dyn Iterator<Item = Result<Self>> + 'a>
    where
        Self: 'a,
    {
        Self::from_packets_many(PacketParser::new(bytes).peekable())
    }

    /// Turn a list of packets into a sequence of compositions.
    ///
    /// The iteration ends after the first error.
    fn from_packets_many<'a, I: Iterator<Item = Result<Packet>> + 'a>(
        mut packets: Peekable<I>,
    ) -> Box<dyn Iterator<Item = Result<Self>> + 'a>
    where
        Self: 'a,
    {
        let mut done = false;
        Box::new(std::iter::from_fn(move || {
            if done {
                return None;
            }
            packets.peek()?;

            let res = Self::from_packets(&mut packets);
            if let Err(ref err) = res {
                debug!("stopping after composition error: {}", err);
                done = true;
            }
            Some(res)
        }))
    }
}

/// The tag of the next packet, `None` at the end or if the next entry is an error.
pub(crate) fn peek_tag<I: Iterator<Item = Result<Packet>>>(packets: &mut Peekable<I>) -> Option<Tag> {
    match packets.peek() {
        Some(Ok(packet)) => Some(packet.tag()),
        _ => None,
    }
}

/// Takes the next packet, which must exist.
pub(crate) fn next_packet<I: Iterator<Item = Result<Packet>>>(
    packets: &mut Peekable<I>,
) -> Result<Packet> {
    packets
        .next()
        .unwrap_or_else(|| Err(format_err!("no matching packet found")))
}

/// Takes the next packet if its tag is `tag` and converts it.
///
/// A pending parse error is taken and returned as well.
pub(crate) fn next_if_tag<T, I>(packets: &mut Peekable<I>, tag: Tag) -> Result<Option<T>>
where
    I: Iterator<Item = Result<Packet>>,
    T: TryFrom<Packet, Error = Error>,
{
    match packets.next_if(|res| res.as_ref().map_or(true, |p| p.tag() == tag)) {
        Some(res) => res?.try_into().map(Some),
        None => Ok(None),
    }
}
