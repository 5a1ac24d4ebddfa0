use std::iter::Peekable;

use log::debug;

use crate::composed::message::{Edata, Esk, Message, MAX_NESTING_LEVEL};
use crate::composed::shared::{next_if_tag, next_packet, peek_tag, Deserializable};
use crate::errors::{Error, Result};
use crate::packet::{Packet, PacketTrait, Signature};
use crate::types::Tag;

impl Deserializable for Message {
    /// Parses a single message.
    ///
    /// ```text
    /// Message :- Signature Message
    ///          | One-Pass Signature Message Signature
    ///          | Literal Data
    ///          | Compressed Data
    ///          | ESK* (Symmetrically Encrypted Data | Integrity Protected Data)
    /// ```
    fn from_packets<I: Iterator<Item = Result<Packet>>>(packets: &mut Peekable<I>) -> Result<Self> {
        next(packets, 0)
    }
}

/// Tags that can start a message.
pub(crate) fn is_message_start(tag: Tag) -> bool {
    matches!(
        tag,
        Tag::Signature
            | Tag::OnePassSignature
            | Tag::LiteralData
            | Tag::CompressedData
            | Tag::PublicKeyEncryptedSessionKey
            | Tag::SymKeyEncryptedSessionKey
            | Tag::SymEncryptedData
            | Tag::SymEncryptedProtectedData
    )
}

fn next<I: Iterator<Item = Result<Packet>>>(packets: &mut Peekable<I>, level: usize) -> Result<Message> {
    let packet = next_packet(packets)?;
    let tag = packet.tag();
    debug!("message level {}: {:?}", level, tag);

    match packet {
        Packet::LiteralData(data) => Ok(Message::Literal(data)),
        Packet::CompressedData(data) => Ok(Message::Compressed(data)),
        Packet::Signature(signature) => {
            let message = nested(packets, level)?;
            Ok(Message::Signed {
                message: Box::new(message),
                one_pass_signature: None,
                signature,
            })
        }
        Packet::OnePassSignature(ops) => {
            let message = nested(packets, level)?;
            let Some(signature) = next_if_tag::<Signature, _>(packets, Tag::Signature)? else {
                bail!("Missing signature for one pass signature");
            };
            Ok(Message::Signed {
                message: Box::new(message),
                one_pass_signature: Some(ops),
                signature,
            })
        }
        Packet::PublicKeyEncryptedSessionKey(_) | Packet::SymKeyEncryptedSessionKey(_) => {
            let mut esk = vec![Esk::try_from(packet)?];
            while let Some(Tag::PublicKeyEncryptedSessionKey | Tag::SymKeyEncryptedSessionKey) =
                peek_tag(packets)
            {
                esk.push(next_packet(packets)?.try_into()?);
            }

            let edata: Edata = match peek_tag(packets) {
                Some(Tag::SymEncryptedData | Tag::SymEncryptedProtectedData) => {
                    next_packet(packets)?.try_into()?
                }
                _ => bail!("Missing encrypted data block"),
            };

            Ok(Message::Encrypted { esk, edata })
        }
        Packet::SymEncryptedData(_) | Packet::SymEncryptedProtectedData(_) => {
            Ok(Message::Encrypted {
                esk: Vec::new(),
                edata: packet.try_into()?,
            })
        }
        _ => bail!("unexpected packet type in message: {:?}", tag),
    }
}

/// The message a signature applies to.
fn nested<I: Iterator<Item = Result<Packet>>>(packets: &mut Peekable<I>, level: usize) -> Result<Message> {
    if level >= MAX_NESTING_LEVEL {
        return Err(Error::NestingTooDeep {
            max: MAX_NESTING_LEVEL,
        });
    }
    if packets.peek().is_none() {
        bail!("Missing message after signature");
    }
    next(packets, level + 1)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::packet::signature_tests::v4_signature;
    use crate::packet::{LiteralData, SignatureType, SymEncryptedProtectedData, UserId};
    use crate::ser::Serialize;

    fn to_bytes(packets: Vec<Packet>) -> Vec<u8> {
        packets
            .iter()
            .flat_map(|p| p.to_bytes().unwrap())
            .collect()
    }

    fn literal() -> Packet {
        LiteralData::from_str("a.txt", "abc").unwrap().into()
    }

    #[test]
    fn test_signature_first() {
        let sig = v4_signature(SignatureType::Binary);
        let msg = Message::from_bytes(to_bytes(vec![sig.clone().into(), literal()])).unwrap();
        let Message::Signed {
            one_pass_signature,
            signature,
            message,
        } = msg
        else {
            panic!("expected signed message");
        };
        assert!(one_pass_signature.is_none());
        assert_eq!(signature, sig);
        assert!(message.is_literal());
    }

    #[test]
    fn test_missing_closing_signature() {
        let ops = crate::packet::OnePassSignature::new(
            SignatureType::Binary,
            crate::crypto::HashAlgorithm::Sha256,
            crate::crypto::PublicKeyAlgorithm::RSA,
            [0u8; 8].into(),
            false,
        );
        let err = Message::from_bytes(to_bytes(vec![ops.into(), literal()])).unwrap_err();
        assert!(err.to_string().contains("Missing signature"));
    }

    #[test]
    fn test_missing_encrypted_data() {
        let skesk = crate::packet::SymKeyEncryptedSessionKey::new(
            crate::types::StringToKey::new_iterated(
                &mut ChaCha8Rng::seed_from_u64(0),
                crate::crypto::HashAlgorithm::Sha256,
                96,
            ),
            crate::crypto::SymmetricKeyAlgorithm::AES128,
        )
        .unwrap();
        let err = Message::from_bytes(to_bytes(vec![skesk.clone().into()])).unwrap_err();
        assert!(err.to_string().contains("Missing encrypted data block"));

        let err = Message::from_bytes(to_bytes(vec![skesk.into(), literal()])).unwrap_err();
        assert!(err.to_string().contains("Missing encrypted data block"));
    }

    #[test]
    fn test_bare_encrypted_data() {
        let edata = SymEncryptedProtectedData::from_encrypted(vec![1u8; 40]).unwrap();
        let msg = Message::from_bytes(to_bytes(vec![edata.into()])).unwrap();
        assert!(matches!(msg, Message::Encrypted { ref esk, .. } if esk.is_empty()));
    }

    #[test]
    fn test_trailing_packets() {
        let err = Message::from_bytes(to_bytes(vec![literal(), literal()])).unwrap_err();
        assert!(err.to_string().contains("Unexpected packets following block"));

        let many: Vec<_> = Message::from_bytes_many(to_bytes(vec![literal(), literal()]))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(many.len(), 2);
    }

    #[test]
    fn test_not_a_message() {
        let user_id: Packet = UserId::new("bob").unwrap().into();
        assert!(Message::from_bytes(to_bytes(vec![user_id])).is_err());
        assert!(Message::from_bytes(Vec::new()).is_err());
    }

    #[test]
    fn test_signature_nesting_limit() {
        let sig: Packet = v4_signature(SignatureType::Binary).into();
        let mut packets = vec![sig; MAX_NESTING_LEVEL];
        packets.push(literal());
        assert!(Message::from_bytes(to_bytes(packets.clone())).is_ok());

        packets.insert(0, v4_signature(SignatureType::Binary).into());
        let err = Message::from_bytes(to_bytes(packets)).unwrap_err();
        assert!(matches!(err, Error::NestingTooDeep { .. }));
    }
}
