use std::io;
use std::iter::Peekable;

use bytes::Bytes;
use log::warn;

use crate::composed::key::{TransferablePublicKey, TransferableSecretKey};
use crate::composed::shared::{next_packet, peek_tag, Deserializable};
use crate::errors::Result;
use crate::packet::{Packet, PacketParser, PacketTrait};
use crate::ser::Serialize;
use crate::types::Tag;

/// A public or secret key block, as found in a key ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicOrSecret {
    Public(TransferablePublicKey),
    Secret(TransferableSecretKey),
}

impl PublicOrSecret {
    pub fn is_public(&self) -> bool {
        matches!(self, PublicOrSecret::Public(_))
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, PublicOrSecret::Secret(_))
    }

    pub fn into_public(self) -> Option<TransferablePublicKey> {
        match self {
            PublicOrSecret::Public(k) => Some(k),
            PublicOrSecret::Secret(_) => None,
        }
    }

    pub fn into_secret(self) -> Option<TransferableSecretKey> {
        match self {
            PublicOrSecret::Public(_) => None,
            PublicOrSecret::Secret(k) => Some(k),
        }
    }
}

impl Deserializable for PublicOrSecret {
    fn from_packets<I: Iterator<Item = Result<Packet>>>(packets: &mut Peekable<I>) -> Result<Self> {
        match peek_tag(packets) {
            Some(Tag::PublicKey) => TransferablePublicKey::from_packets(packets).map(Self::Public),
            Some(Tag::SecretKey) => TransferableSecretKey::from_packets(packets).map(Self::Secret),
            _ => {
                let tag = next_packet(packets)?.tag();
                bail!("Missing primary key packet, found {:?}", tag)
            }
        }
    }
}

impl Serialize for PublicOrSecret {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PublicOrSecret::Public(k) => k.to_writer(writer),
            PublicOrSecret::Secret(k) => k.to_writer(writer),
        }
    }

    fn write_len(&self) -> usize {
        match self {
            PublicOrSecret::Public(k) => k.write_len(),
            PublicOrSecret::Secret(k) => k.write_len(),
        }
    }
}

/// Parses every key block in `input`.
///
/// With `skip_on_error`, a malformed block is logged and parsing resumes at
/// the next primary key packet. Otherwise the first error is returned.
pub fn parse_all_transferable_keys(
    input: impl Into<Bytes>,
    skip_on_error: bool,
) -> Result<Vec<PublicOrSecret>> {
    let mut packets = PacketParser::new(input).peekable();
    let mut keys = Vec::new();

    while packets.peek().is_some() {
        match PublicOrSecret::from_packets(&mut packets) {
            Ok(key) => keys.push(key),
            Err(err) if skip_on_error => {
                warn!("skipping malformed key block: {}", err);
                skip_to_primary_key(&mut packets);
            }
            Err(err) => return Err(err),
        }
    }

    Ok(keys)
}

fn skip_to_primary_key<I: Iterator<Item = Result<Packet>>>(packets: &mut Peekable<I>) {
    while packets
        .next_if(|res| !matches!(res, Ok(p) if matches!(p.tag(), Tag::PublicKey | Tag::SecretKey)))
        .is_some()
    {}
}
