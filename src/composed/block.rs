use std::io;
use std::iter::Peekable;

use crate::composed::message::is_message_start;
use crate::composed::shared::{next_packet, peek_tag, Deserializable};
use crate::composed::{Message, TransferablePublicKey, TransferableSecretKey};
use crate::errors::Result;
use crate::packet::{Packet, PacketTrait};
use crate::ser::Serialize;
use crate::types::Tag;

/// Any top level composition, picked by the first packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Message(Message),
    PublicKey(TransferablePublicKey),
    SecretKey(TransferableSecretKey),
}

impl Deserializable for Block {
    fn from_packets<I: Iterator<Item = Result<Packet>>>(packets: &mut Peekable<I>) -> Result<Self> {
        match peek_tag(packets) {
            Some(Tag::PublicKey) => TransferablePublicKey::from_packets(packets).map(Block::PublicKey),
            Some(Tag::SecretKey) => TransferableSecretKey::from_packets(packets).map(Block::SecretKey),
            Some(tag) if is_message_start(tag) => Message::from_packets(packets).map(Block::Message),
            _ => {
                let tag = next_packet(packets)?.tag();
                bail!("unexpected packet at start of block: {:?}", tag)
            }
        }
    }
}

impl Serialize for Block {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Block::Message(m) => m.to_writer(writer),
            Block::PublicKey(k) => k.to_writer(writer),
            Block::SecretKey(k) => k.to_writer(writer),
        }
    }

    fn write_len(&self) -> usize {
        match self {
            Block::Message(m) => m.write_len(),
            Block::PublicKey(k) => k.write_len(),
            Block::SecretKey(k) => k.write_len(),
        }
    }
}

impl From<Message> for Block {
    fn from(msg: Message) -> Self {
        Block::Message(msg)
    }
}

impl From<TransferablePublicKey> for Block {
    fn from(key: TransferablePublicKey) -> Self {
        Block::PublicKey(key)
    }
}

impl From<TransferableSecretKey> for Block {
    fn from(key: TransferableSecretKey) -> Self {
        Block::SecretKey(key)
    }
}
