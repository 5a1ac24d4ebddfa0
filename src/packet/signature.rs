use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, Bytes};
use log::debug;
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::async_result::AsyncResult;
use crate::crypto::{HashAlgorithm, PublicKeyAlgorithm};
use crate::errors::Result;
use crate::packet::{PacketHeader, PacketTrait};
use crate::parsing::BufParsing;
use crate::registry::AlgorithmRegistry;
use crate::ser::Serialize;
use crate::types::mpi::read_mpis;
use crate::types::{KeyDetails, KeyId, Mpi, SecretKeyTrait, Tag};

/// Signature types.
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.2.1>
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SignatureType {
    /// Signature of a binary document.
    Binary = 0x00,
    /// Signature of a canonical text document.
    Text = 0x01,
    /// Standalone signature.
    Standalone = 0x02,
    /// Generic certification of a User ID and Public-Key packet.
    CertGeneric = 0x10,
    /// Persona certification of a User ID and Public-Key packet.
    CertPersona = 0x11,
    /// Casual certification of a User ID and Public-Key packet.
    CertCasual = 0x12,
    /// Positive certification of a User ID and Public-Key packet.
    CertPositive = 0x13,
    /// Subkey Binding Signature
    SubkeyBinding = 0x18,
    /// Primary Key Binding Signature
    KeyBinding = 0x19,
    /// Signature directly on a key
    Key = 0x1F,
    /// Key revocation signature
    KeyRevocation = 0x20,
    /// Subkey revocation signature
    SubkeyRevocation = 0x28,
    /// Certification revocation signature
    CertRevocation = 0x30,
    /// Timestamp signature.
    Timestamp = 0x40,
    /// Third-Party Confirmation signature.
    ThirdParty = 0x50,

    #[num_enum(catch_all)]
    Other(u8),
}

impl SignatureType {
    /// Certifications of a user id or attribute.
    pub fn is_certification(self) -> bool {
        matches!(
            self,
            SignatureType::CertGeneric
                | SignatureType::CertPersona
                | SignatureType::CertCasual
                | SignatureType::CertPositive
        )
    }
}

/// Signature subpacket types the engine looks at.
const SUBPACKET_CREATION_TIME: u8 = 2;
const SUBPACKET_ISSUER: u8 = 16;

/// Version specific fields.
#[derive(derive_more::Debug, Clone, PartialEq, Eq)]
pub enum SignatureFields {
    /// Versions 2 and 3.
    V3 {
        version: u8,
        created: u32,
        issuer: KeyId,
    },
    V4 {
        #[debug("{}", hex::encode(hashed_subpackets))]
        hashed_subpackets: Bytes,
        #[debug("{}", hex::encode(unhashed_subpackets))]
        unhashed_subpackets: Bytes,
    },
}

/// Signature Packet
/// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.2>
///
/// The header fields are decoded, subpackets and the algorithm specific
/// signature MPIs are kept as they were read. Creating and checking the
/// signature values is left to the [`Signer`](crate::registry::Signer)
/// registered for the public key algorithm.
#[derive(derive_more::Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    packet_header: PacketHeader,
    typ: SignatureType,
    pub_alg: PublicKeyAlgorithm,
    hash_alg: HashAlgorithm,
    fields: SignatureFields,
    #[debug("{}", hex::encode(signed_hash_value))]
    signed_hash_value: [u8; 2],
    #[debug("{}", hex::encode(signature))]
    signature: Bytes,
}

impl Signature {
    /// Parses a `Signature` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_header: PacketHeader, mut i: B) -> Result<Self> {
        ensure_eq!(packet_header.tag(), Tag::Signature, "invalid tag");

        let version = i.read_u8()?;
        debug!("signature packet version {}", version);

        let (typ, pub_alg, hash_alg, fields) = match version {
            2 | 3 => {
                let hashed_len = i.read_u8()?;
                ensure_eq!(hashed_len, 5, "invalid material length");
                let typ = SignatureType::from(i.read_u8()?);
                let created = i.read_be_u32()?;
                let issuer = KeyId::from(i.read_array::<8>()?);
                let pub_alg = PublicKeyAlgorithm::from(i.read_u8()?);
                let hash_alg = HashAlgorithm::from(i.read_u8()?);
                (
                    typ,
                    pub_alg,
                    hash_alg,
                    SignatureFields::V3 {
                        version,
                        created,
                        issuer,
                    },
                )
            }
            4 => {
                let typ = SignatureType::from(i.read_u8()?);
                let pub_alg = PublicKeyAlgorithm::from(i.read_u8()?);
                let hash_alg = HashAlgorithm::from(i.read_u8()?);
                let hashed_len = i.read_be_u16()?;
                let hashed_subpackets = i.read_take(hashed_len.into())?;
                let unhashed_len = i.read_be_u16()?;
                let unhashed_subpackets = i.read_take(unhashed_len.into())?;
                (
                    typ,
                    pub_alg,
                    hash_alg,
                    SignatureFields::V4 {
                        hashed_subpackets,
                        unhashed_subpackets,
                    },
                )
            }
            _ => unsupported_err!("signature version {}", version),
        };
        debug!("  type {:?}, {:?}, {:?}", typ, pub_alg, hash_alg);

        let signed_hash_value = i.read_array::<2>()?;
        let signature = i.rest();

        Ok(Signature {
            packet_header,
            typ,
            pub_alg,
            hash_alg,
            fields,
            signed_hash_value,
            signature,
        })
    }

    /// Creates a v4 signature of type `typ` over `data`.
    ///
    /// The signer registered for the key's algorithm picks the hash. The
    /// hashed area carries the creation time and the issuer key id.
    pub fn sign(
        registry: &AlgorithmRegistry,
        key: &impl SecretKeyTrait,
        typ: SignatureType,
        created: u32,
        data: &[u8],
    ) -> AsyncResult<Signature> {
        let pub_alg = key.algorithm();
        let prepared = key.secret_key_material().and_then(|material| {
            let signer = registry.signers.require(pub_alg, Some(&material))?;
            let hash_alg = signer.hash_algorithm();
            let fields = SignatureFields::V4 {
                hashed_subpackets: v4_hashed_subpackets(created, &key.key_id(registry)?),
                unhashed_subpackets: Bytes::new(),
            };
            let input = hash_input(typ, pub_alg, hash_alg, &fields, data)?;
            let digest = registry.digest(hash_alg, &input)?;
            let signed_hash_value = left_16(&digest)?;
            Ok((signer, hash_alg, fields, digest, signed_hash_value))
        });
        let (signer, hash_alg, fields, digest, signed_hash_value) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => return AsyncResult::err(err),
        };
        debug!("signing {:?} with {:?}/{:?}", typ, pub_alg, hash_alg);

        signer.sign(&digest).add_callback(move |mpis| {
            let mut sig = Signature {
                packet_header: PacketHeader::new_fixed(Tag::Signature, 0),
                typ,
                pub_alg,
                hash_alg,
                fields,
                signed_hash_value,
                signature: mpis.to_bytes()?.into(),
            };
            sig.packet_header = PacketHeader::for_body(Tag::Signature, sig.write_len())?;
            Ok(sig)
        })
    }

    /// Checks the signature over `data` against `key`.
    ///
    /// Resolves to `false` if the signature does not match. Errors mean the
    /// signature could not be checked, e.g. no signer is registered.
    pub fn verify(
        &self,
        registry: &AlgorithmRegistry,
        key: &impl KeyDetails,
        data: &[u8],
    ) -> AsyncResult<bool> {
        if key.algorithm() != self.pub_alg {
            debug!(
                "key algorithm {:?} does not match {:?}",
                key.algorithm(),
                self.pub_alg
            );
            return AsyncResult::ok(false);
        }
        let prepared = registry
            .signers
            .require(self.pub_alg, Some(&key.public_key_material()))
            .and_then(|signer| {
                let digest = registry.digest(self.hash_alg, &self.hash_input(data)?)?;
                Ok((signer, digest, self.signature_mpis()?))
            });
        let (signer, digest, mpis) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => return AsyncResult::err(err),
        };
        if digest.get(..2) != Some(&self.signed_hash_value[..]) {
            debug!("signed hash value mismatch");
            return AsyncResult::ok(false);
        }

        signer.verify(&digest, &mpis)
    }

    /// The bytes hashed for this signature: `data` followed by the
    /// version specific trailer.
    pub fn hash_input(&self, data: &[u8]) -> Result<Vec<u8>> {
        hash_input(self.typ, self.pub_alg, self.hash_alg, &self.fields, data)
    }

    pub fn version(&self) -> u8 {
        match self.fields {
            SignatureFields::V3 { version, .. } => version,
            SignatureFields::V4 { .. } => 4,
        }
    }

    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    pub fn pub_alg(&self) -> PublicKeyAlgorithm {
        self.pub_alg
    }

    pub fn hash_alg(&self) -> HashAlgorithm {
        self.hash_alg
    }

    pub fn fields(&self) -> &SignatureFields {
        &self.fields
    }

    /// The left 16 bits of the signed hash.
    pub fn signed_hash_value(&self) -> [u8; 2] {
        self.signed_hash_value
    }

    /// The algorithm specific signature MPIs, still encoded.
    pub fn signature_data(&self) -> &[u8] {
        &self.signature
    }

    pub fn signature_mpis(&self) -> Result<Vec<Mpi>> {
        read_mpis(self.signature.clone())
    }

    pub fn is_certification(&self) -> bool {
        self.typ.is_certification()
    }

    /// Key id of the signer: the v3 field, or the issuer subpacket of a v4 signature.
    pub fn issuer(&self) -> Option<KeyId> {
        match &self.fields {
            SignatureFields::V3 { issuer, .. } => Some(*issuer),
            SignatureFields::V4 {
                hashed_subpackets,
                unhashed_subpackets,
            } => find_subpacket(hashed_subpackets, SUBPACKET_ISSUER)
                .or_else(|| find_subpacket(unhashed_subpackets, SUBPACKET_ISSUER))
                .and_then(|data| KeyId::from_slice(&data).ok()),
        }
    }

    /// Creation time, seconds since the unix epoch.
    pub fn created(&self) -> Option<u32> {
        match &self.fields {
            SignatureFields::V3 { created, .. } => Some(*created),
            SignatureFields::V4 {
                hashed_subpackets, ..
            } => find_subpacket(hashed_subpackets, SUBPACKET_CREATION_TIME)
                .and_then(|mut data| data.read_be_u32().ok()),
        }
    }
}

/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.2.4>
fn hash_input(
    typ: SignatureType,
    pub_alg: PublicKeyAlgorithm,
    hash_alg: HashAlgorithm,
    fields: &SignatureFields,
    data: &[u8],
) -> Result<Vec<u8>> {
    let mut out = data.to_vec();
    match fields {
        SignatureFields::V3 { created, .. } => {
            out.push(typ.into());
            out.write_u32::<BigEndian>(*created)?;
        }
        SignatureFields::V4 {
            hashed_subpackets, ..
        } => {
            let start = out.len();
            out.extend_from_slice(&[4, typ.into(), pub_alg.into(), hash_alg.into()]);
            out.write_u16::<BigEndian>(hashed_subpackets.len().try_into()?)?;
            out.extend_from_slice(hashed_subpackets);
            let hashed_len = u32::try_from(out.len() - start)?;
            out.extend_from_slice(&[4, 0xFF]);
            out.write_u32::<BigEndian>(hashed_len)?;
        }
    }
    Ok(out)
}

fn v4_hashed_subpackets(created: u32, issuer: &KeyId) -> Bytes {
    let mut area = Vec::with_capacity(16);
    area.extend_from_slice(&[5, SUBPACKET_CREATION_TIME]);
    area.extend_from_slice(&created.to_be_bytes());
    area.extend_from_slice(&[9, SUBPACKET_ISSUER]);
    area.extend_from_slice(issuer.as_ref());
    area.into()
}

fn left_16(digest: &[u8]) -> Result<[u8; 2]> {
    match digest {
        [a, b, ..] => Ok([*a, *b]),
        _ => bail!("digest of {} bytes is too short", digest.len()),
    }
}

/// Returns the body of the first well formed subpacket of type `typ`.
/// The critical bit is ignored.
fn find_subpacket(area: &Bytes, typ: u8) -> Option<Bytes> {
    let mut i = area.clone();
    while i.has_remaining() {
        let len = subpacket_length(&mut i).ok()?;
        let mut body = i.read_take(len).ok()?;
        if len == 0 {
            continue;
        }
        let current = body.read_u8().ok()? & 0x7F;
        if current == typ {
            return Some(body);
        }
    }
    None
}

/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.2.3.1>
fn subpacket_length<B: Buf>(i: &mut B) -> Result<usize> {
    let olen = i.read_u8()?;
    let len = match olen {
        0..=191 => usize::from(olen),
        192..=254 => ((usize::from(olen) - 192) << 8) + usize::from(i.read_u8()?) + 192,
        255 => i.read_be_u32()?.try_into()?,
    };
    Ok(len)
}

impl Serialize for Signature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match &self.fields {
            SignatureFields::V3 {
                version,
                created,
                issuer,
            } => {
                writer.write_all(&[*version, 5, self.typ.into()])?;
                writer.write_u32::<BigEndian>(*created)?;
                writer.write_all(issuer.as_ref())?;
                writer.write_all(&[self.pub_alg.into(), self.hash_alg.into()])?;
            }
            SignatureFields::V4 {
                hashed_subpackets,
                unhashed_subpackets,
            } => {
                writer.write_all(&[
                    4,
                    self.typ.into(),
                    self.pub_alg.into(),
                    self.hash_alg.into(),
                ])?;
                writer.write_u16::<BigEndian>(hashed_subpackets.len().try_into()?)?;
                writer.write_all(hashed_subpackets)?;
                writer.write_u16::<BigEndian>(unhashed_subpackets.len().try_into()?)?;
                writer.write_all(unhashed_subpackets)?;
            }
        }
        writer.write_all(&self.signed_hash_value)?;
        writer.write_all(&self.signature)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        let fields = match &self.fields {
            SignatureFields::V3 { .. } => 3 + 4 + 8 + 2,
            SignatureFields::V4 {
                hashed_subpackets,
                unhashed_subpackets,
            } => 4 + 2 + hashed_subpackets.len() + 2 + unhashed_subpackets.len(),
        };
        fields + 2 + self.signature.len()
    }
}

impl PacketTrait for Signature {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}
