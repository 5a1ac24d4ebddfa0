use std::io;
use std::iter::Peekable;

use log::{debug, warn};

use crate::composed::shared::{next_packet, peek_tag};
use crate::errors::Result;
use crate::packet::{Packet, PacketTrait, Signature, SignatureType, UserAttribute, UserId};
use crate::ser::Serialize;
use crate::types::Tag;

/// A User ID or User Attribute packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum User {
    Id(UserId),
    Attribute(UserAttribute),
}

impl Serialize for User {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            User::Id(id) => id.to_writer_with_header(writer),
            User::Attribute(attr) => attr.to_writer_with_header(writer),
        }
    }

    fn write_len(&self) -> usize {
        match self {
            User::Id(id) => id.write_len_with_header(),
            User::Attribute(attr) => attr.write_len_with_header(),
        }
    }
}

/// A user together with the signatures made over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUser {
    pub user: User,
    /// Certifications, types 0x10 to 0x13.
    pub certifications: Vec<Signature>,
    /// Certification revocations, type 0x30.
    pub revocations: Vec<Signature>,
}

impl SignedUser {
    pub fn new(user: User) -> Self {
        SignedUser {
            user,
            certifications: Vec::new(),
            revocations: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<&UserId> {
        match &self.user {
            User::Id(id) => Some(id),
            User::Attribute(_) => None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        !self.revocations.is_empty()
    }
}

impl Serialize for SignedUser {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.user.to_writer(writer)?;
        for sig in self.certifications.iter().chain(&self.revocations) {
            sig.to_writer_with_header(writer)?;
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.user.write_len()
            + self
                .certifications
                .iter()
                .chain(&self.revocations)
                .map(PacketTrait::write_len_with_header)
                .sum::<usize>()
    }
}

/// Shared details between secret and public keys.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SignedKeyDetails {
    /// Key revocations, type 0x20.
    pub revocation_signatures: Vec<Signature>,
    /// Signatures directly on the key, type 0x1F.
    pub direct_signatures: Vec<Signature>,
    pub users: Vec<SignedUser>,
}

impl SignedKeyDetails {
    pub fn new(
        revocation_signatures: Vec<Signature>,
        direct_signatures: Vec<Signature>,
        users: Vec<SignedUser>,
    ) -> Self {
        SignedKeyDetails {
            revocation_signatures,
            direct_signatures,
            users,
        }
    }

    pub fn user_ids(&self) -> impl Iterator<Item = &UserId> {
        self.users.iter().filter_map(SignedUser::id)
    }

    pub fn is_revoked(&self) -> bool {
        !self.revocation_signatures.is_empty()
    }

    /// Parses everything between the primary key and the first subkey.
    ///
    /// Only key revocations and direct key signatures may follow the primary
    /// key. Signatures on a user other than certifications and their
    /// revocations are dropped, trust packets are skipped.
    pub(crate) fn from_packets<I: Iterator<Item = Result<Packet>>>(
        packets: &mut Peekable<I>,
    ) -> Result<Self> {
        let mut revocation_signatures = Vec::new();
        let mut direct_signatures = Vec::new();

        while let Some(tag @ (Tag::Signature | Tag::Trust)) = peek_tag(packets) {
            let packet = next_packet(packets)?;
            if tag == Tag::Trust {
                continue;
            }
            let sig = Signature::try_from(packet)?;
            match sig.typ() {
                SignatureType::KeyRevocation => revocation_signatures.push(sig),
                SignatureType::Key => direct_signatures.push(sig),
                typ => bail!("Unexpected signature following primary key: {:?}", typ),
            }
        }

        let mut users = Vec::new();
        loop {
            let user = match peek_tag(packets) {
                Some(Tag::Trust) => {
                    next_packet(packets)?;
                    continue;
                }
                Some(Tag::UserId) => User::Id(next_packet(packets)?.try_into()?),
                Some(Tag::UserAttribute) => User::Attribute(next_packet(packets)?.try_into()?),
                _ => break,
            };

            let mut signed = SignedUser::new(user);
            while let Some(tag @ (Tag::Signature | Tag::Trust)) = peek_tag(packets) {
                let packet = next_packet(packets)?;
                if tag == Tag::Trust {
                    continue;
                }
                let sig = Signature::try_from(packet)?;
                match sig.typ() {
                    typ if typ.is_certification() => signed.certifications.push(sig),
                    SignatureType::CertRevocation => signed.revocations.push(sig),
                    typ => debug!("dropping {:?} signature on user", typ),
                }
            }
            if signed.certifications.is_empty() {
                warn!("user without certifications");
            }
            users.push(signed);
        }

        if !users.iter().any(|user| user.id().is_some()) {
            bail!("Missing User ID");
        }

        Ok(SignedKeyDetails::new(
            revocation_signatures,
            direct_signatures,
            users,
        ))
    }
}

impl Serialize for SignedKeyDetails {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        for sig in self
            .revocation_signatures
            .iter()
            .chain(&self.direct_signatures)
        {
            sig.to_writer_with_header(writer)?;
        }
        for user in &self.users {
            user.to_writer(writer)?;
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        let sigs: usize = self
            .revocation_signatures
            .iter()
            .chain(&self.direct_signatures)
            .map(PacketTrait::write_len_with_header)
            .sum();
        sigs + self.users.iter().map(Serialize::write_len).sum::<usize>()
    }
}

/// A subkey together with its binding and revocation signatures.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SignedSubkey<K> {
    pub key: K,
    /// Subkey bindings, type 0x18.
    pub bindings: Vec<Signature>,
    /// Subkey revocations, type 0x28.
    pub revocations: Vec<Signature>,
}

impl<K> SignedSubkey<K> {
    pub fn new(key: K, bindings: Vec<Signature>, revocations: Vec<Signature>) -> Self {
        SignedSubkey {
            key,
            bindings,
            revocations,
        }
    }

    pub fn is_revoked(&self) -> bool {
        !self.revocations.is_empty()
    }

    /// Parses the signatures following `key`.
    ///
    /// Stops at the first signature that is neither a binding nor a
    /// revocation, leaving it for the caller.
    pub(crate) fn from_packets<I: Iterator<Item = Result<Packet>>>(
        key: K,
        packets: &mut Peekable<I>,
    ) -> Result<Self> {
        let mut subkey = SignedSubkey::new(key, Vec::new(), Vec::new());
        loop {
            // None for trust packets
            let typ = match packets.peek() {
                Some(Ok(Packet::Trust(_))) => None,
                Some(Ok(Packet::Signature(sig))) => Some(sig.typ()),
                _ => break,
            };
            match typ {
                None => {
                    next_packet(packets)?;
                }
                Some(SignatureType::SubkeyBinding) => {
                    subkey.bindings.push(next_packet(packets)?.try_into()?)
                }
                Some(SignatureType::SubkeyRevocation) => {
                    subkey.revocations.push(next_packet(packets)?.try_into()?)
                }
                Some(_) => break,
            }
        }
        Ok(subkey)
    }
}

impl<K: PacketTrait> Serialize for SignedSubkey<K> {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.key.to_writer_with_header(writer)?;
        for sig in self.bindings.iter().chain(&self.revocations) {
            sig.to_writer_with_header(writer)?;
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.key.write_len_with_header()
            + self
                .bindings
                .iter()
                .chain(&self.revocations)
                .map(PacketTrait::write_len_with_header)
                .sum::<usize>()
    }
}
