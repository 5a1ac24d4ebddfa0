use bytes::Bytes;
use log::debug;

use crate::errors::Result;
use crate::packet::{
    CompressedData, LiteralData, ModDetectionCode, OnePassSignature, Packet, PacketHeader,
    PublicKey, PublicKeyEncryptedSessionKey, PublicSubkey, SecretKey, SecretSubkey, Signature,
    SymEncryptedData, SymEncryptedProtectedData, SymKeyEncryptedSessionKey, Trust, UserAttribute,
    UserId,
};
use crate::types::Tag;

/// Parses the body of a single packet, dispatching on the tag in `packet_header`.
///
/// Marker and private packets have no typed representation, the caller is
/// expected to skip them before getting here.
pub fn body_parser(packet_header: PacketHeader, body: Bytes) -> Result<Packet> {
    debug!("parsing {:?} body ({} bytes)", packet_header.tag(), body.len());

    match packet_header.tag() {
        Tag::PublicKeyEncryptedSessionKey => {
            PublicKeyEncryptedSessionKey::from_buf(packet_header, body).map(Into::into)
        }
        Tag::Signature => Signature::from_buf(packet_header, body).map(Into::into),
        Tag::SymKeyEncryptedSessionKey => {
            SymKeyEncryptedSessionKey::from_buf(packet_header, body).map(Into::into)
        }
        Tag::OnePassSignature => OnePassSignature::from_buf(packet_header, body).map(Into::into),
        Tag::SecretKey => SecretKey::from_buf(packet_header, body).map(Into::into),
        Tag::PublicKey => PublicKey::from_buf(packet_header, body).map(Into::into),
        Tag::SecretSubkey => SecretSubkey::from_buf(packet_header, body).map(Into::into),
        Tag::CompressedData => CompressedData::from_buf(packet_header, body).map(Into::into),
        Tag::SymEncryptedData => SymEncryptedData::from_buf(packet_header, body).map(Into::into),
        Tag::LiteralData => LiteralData::from_buf(packet_header, body).map(Into::into),
        Tag::Trust => Trust::from_buf(packet_header, body).map(Into::into),
        Tag::UserId => UserId::from_buf(packet_header, body).map(Into::into),
        Tag::PublicSubkey => PublicSubkey::from_buf(packet_header, body).map(Into::into),
        Tag::UserAttribute => UserAttribute::from_buf(packet_header, body).map(Into::into),
        Tag::SymEncryptedProtectedData => {
            SymEncryptedProtectedData::from_buf(packet_header, body).map(Into::into)
        }
        Tag::ModDetectionCode => ModDetectionCode::from_buf(packet_header, body).map(Into::into),
        Tag::Marker | Tag::Other(_) => {
            bail!("unknown packet type {:?}", packet_header.tag())
        }
    }
}
