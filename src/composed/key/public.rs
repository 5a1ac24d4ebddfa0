use std::io;
use std::iter::Peekable;

use crate::composed::key::{SignedKeyDetails, SignedSubkey};
use crate::composed::shared::{next_if_tag, next_packet, peek_tag, Deserializable};
use crate::errors::Result;
use crate::packet::{Packet, PacketTrait, PublicKey, PublicSubkey, UserId};
use crate::registry::AlgorithmRegistry;
use crate::ser::Serialize;
use crate::types::{Fingerprint, KeyDetails, KeyId, Tag};

pub type SignedPublicSubkey = SignedSubkey<PublicSubkey>;

/// A transferable public key: primary key, users and subkeys with their signatures.
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-11.1>
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TransferablePublicKey {
    pub primary_key: PublicKey,
    pub details: SignedKeyDetails,
    pub public_subkeys: Vec<SignedPublicSubkey>,
}

impl TransferablePublicKey {
    pub fn new(
        primary_key: PublicKey,
        details: SignedKeyDetails,
        public_subkeys: Vec<SignedPublicSubkey>,
    ) -> Self {
        TransferablePublicKey {
            primary_key,
            details,
            public_subkeys,
        }
    }

    pub fn fingerprint(&self, registry: &AlgorithmRegistry) -> Result<Fingerprint> {
        self.primary_key.fingerprint(registry)
    }

    pub fn key_id(&self, registry: &AlgorithmRegistry) -> Result<KeyId> {
        self.primary_key.key_id(registry)
    }

    pub fn user_ids(&self) -> impl Iterator<Item = &UserId> {
        self.details.user_ids()
    }
}

impl Deserializable for TransferablePublicKey {
    fn from_packets<I: Iterator<Item = Result<Packet>>>(packets: &mut Peekable<I>) -> Result<Self> {
        let Some(primary_key) = next_if_tag::<PublicKey, _>(packets, Tag::PublicKey)? else {
            bail!("Missing primary key packet");
        };
        let details = SignedKeyDetails::from_packets(packets)?;

        let mut public_subkeys = Vec::new();
        loop {
            match peek_tag(packets) {
                Some(Tag::Trust) => {
                    next_packet(packets)?;
                }
                Some(Tag::PublicSubkey) => {
                    let key = PublicSubkey::try_from(next_packet(packets)?)?;
                    public_subkeys.push(SignedSubkey::from_packets(key, packets)?);
                }
                _ => break,
            }
        }

        Ok(TransferablePublicKey::new(
            primary_key,
            details,
            public_subkeys,
        ))
    }
}

impl Serialize for TransferablePublicKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.primary_key.to_writer_with_header(writer)?;
        self.details.to_writer(writer)?;
        self.public_subkeys.to_writer(writer)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        self.primary_key.write_len_with_header()
            + self.details.write_len()
            + self.public_subkeys.write_len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypto::PublicKeyAlgorithm;
    use crate::packet::signature_tests::v4_signature;
    use crate::packet::test_keys::rsa_params;
    use crate::packet::{PacketHeader, SignatureType, Trust};

    pub(crate) fn packets_to_bytes(packets: &[Packet]) -> Vec<u8> {
        packets
            .iter()
            .flat_map(|p| p.to_bytes().unwrap())
            .collect()
    }

    pub(crate) fn sig(typ: SignatureType) -> Packet {
        v4_signature(typ).into()
    }

    pub(crate) fn user_id(id: &str) -> Packet {
        UserId::new(id).unwrap().into()
    }

    pub(crate) fn trust() -> Packet {
        Trust::from_buf(PacketHeader::new_fixed(Tag::Trust, 2), &[0x78, 0x00][..])
            .unwrap()
            .into()
    }

    fn primary() -> Packet {
        PublicKey::new(PublicKeyAlgorithm::RSA, 0x5B00_0000, rsa_params())
            .unwrap()
            .into()
    }

    fn subkey() -> Packet {
        PublicSubkey::new(PublicKeyAlgorithm::RSA, 0x5B00_0001, rsa_params())
            .unwrap()
            .into()
    }

    #[test]
    fn test_full_key() {
        let input = packets_to_bytes(&[
            primary(),
            sig(SignatureType::KeyRevocation),
            user_id("alice <alice@example.org>"),
            sig(SignatureType::CertPositive),
            trust(),
            sig(SignatureType::CertRevocation),
            sig(SignatureType::Binary),
            user_id("alice <alice@example.com>"),
            sig(SignatureType::CertGeneric),
            subkey(),
            sig(SignatureType::SubkeyBinding),
            sig(SignatureType::SubkeyRevocation),
        ]);

        let key = TransferablePublicKey::from_bytes(input).unwrap();
        assert_eq!(key.details.revocation_signatures.len(), 1);
        assert!(key.details.is_revoked());
        assert_eq!(key.details.users.len(), 2);

        let first = &key.details.users[0];
        assert_eq!(first.certifications.len(), 1);
        assert_eq!(first.revocations.len(), 1);
        assert!(first.is_revoked());

        let ids: Vec<_> = key.user_ids().map(|id| id.as_str().unwrap()).collect();
        assert_eq!(
            ids,
            ["alice <alice@example.org>", "alice <alice@example.com>"]
        );

        assert_eq!(key.public_subkeys.len(), 1);
        assert_eq!(key.public_subkeys[0].bindings.len(), 1);
        assert!(key.public_subkeys[0].is_revoked());

        // the dropped binary signature and trust packet do not come back
        let bytes = key.to_bytes().unwrap();
        assert_eq!(bytes.len(), key.write_len());
        assert_eq!(TransferablePublicKey::from_bytes(bytes).unwrap(), key);
    }

    #[test]
    fn test_missing_user_id() {
        let err = TransferablePublicKey::from_bytes(packets_to_bytes(&[primary(), subkey()]))
            .unwrap_err();
        assert!(err.to_string().contains("Missing User ID"));
    }

    #[test]
    fn test_missing_primary_key() {
        let err = TransferablePublicKey::from_bytes(packets_to_bytes(&[user_id("bob")]))
            .unwrap_err();
        assert!(err.to_string().contains("Missing primary key packet"));
    }

    #[test]
    fn test_unexpected_primary_signature() {
        let input = packets_to_bytes(&[
            primary(),
            sig(SignatureType::CertGeneric),
            user_id("bob"),
        ]);
        assert!(TransferablePublicKey::from_bytes(input).is_err());
    }

    #[test]
    fn test_unknown_subkey_signature_ends_block() {
        let input = packets_to_bytes(&[
            primary(),
            user_id("bob"),
            subkey(),
            sig(SignatureType::SubkeyBinding),
            sig(SignatureType::Binary),
        ]);
        let mut packets = crate::packet::PacketParser::new(input).peekable();
        let key = TransferablePublicKey::from_packets(&mut packets).unwrap();
        assert_eq!(key.public_subkeys[0].bindings.len(), 1);
        assert_eq!(peek_tag(&mut packets), Some(Tag::Signature));
    }

    #[test]
    fn test_fingerprint() {
        let registry = AlgorithmRegistry::with_defaults();
        let key =
            TransferablePublicKey::from_bytes(packets_to_bytes(&[primary(), user_id("bob")]))
                .unwrap();
        assert_eq!(
            key.fingerprint(&registry).unwrap(),
            key.primary_key.fingerprint(&registry).unwrap()
        );
        assert_eq!(
            key.key_id(&registry).unwrap(),
            key.fingerprint(&registry).unwrap().key_id()
        );
    }
}
