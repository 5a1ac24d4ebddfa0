use std::io;
use std::rc::Rc;

use bytes::{Buf, Bytes};
use log::debug;
use rand::{CryptoRng, Rng};

use crate::async_result::AsyncResult;
use crate::crypto::mode::{CipherMode, Ocfb};
use crate::errors::Result;
use crate::packet::{PacketHeader, PacketTrait};
use crate::parsing::BufParsing;
use crate::registry::AlgorithmRegistry;
use crate::ser::Serialize;
use crate::types::{PlainSessionKey, Tag};

/// Symmetrically Encrypted Data Packet
/// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.7>
///
/// Data without integrity protection, encrypted with OpenPGP CFB including
/// the resynchronization step. Only 64 bit block ciphers are accepted.
#[derive(derive_more::Debug, Clone, PartialEq, Eq)]
pub struct SymEncryptedData {
    packet_header: PacketHeader,
    #[debug("{}", hex::encode(data))]
    data: Bytes,
}

impl SymEncryptedData {
    /// Parses a `SymEncryptedData` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_header: PacketHeader, mut input: B) -> Result<Self> {
        ensure_eq!(packet_header.tag(), Tag::SymEncryptedData, "invalid tag");

        Ok(SymEncryptedData {
            packet_header,
            data: input.rest(),
        })
    }

    pub fn from_encrypted(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let packet_header = PacketHeader::for_body(Tag::SymEncryptedData, data.len())?;
        Ok(SymEncryptedData {
            packet_header,
            data,
        })
    }

    /// Encrypts `plaintext` under `session_key` behind a random prefix.
    pub fn encrypt_with_rng<R: CryptoRng + Rng>(
        rng: &mut R,
        registry: &AlgorithmRegistry,
        session_key: &PlainSessionKey,
        plaintext: &[u8],
    ) -> AsyncResult<Self> {
        match mode(registry, session_key) {
            Ok(ocfb) => ocfb
                .encrypt_with_rng(rng, plaintext, &[])
                .add_callback(Self::from_encrypted),
            Err(err) => AsyncResult::err(err),
        }
    }

    /// Decrypts the packet, returning the plaintext without the prefix.
    pub fn decrypt(
        &self,
        registry: &AlgorithmRegistry,
        session_key: &PlainSessionKey,
    ) -> AsyncResult<Vec<u8>> {
        debug!("decrypting SED packet with {:?}", session_key.sym_alg());
        match mode(registry, session_key) {
            Ok(ocfb) => ocfb.decrypt(&self.data, &[]),
            Err(err) => AsyncResult::err(err),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

fn mode(registry: &AlgorithmRegistry, session_key: &PlainSessionKey) -> Result<Ocfb> {
    let alg = session_key.sym_alg();
    if !alg.is_legacy() {
        unsupported_err!(
            "only legacy ciphers can be used without integrity protection, got {:?}",
            alg
        );
    }
    let cipher = registry.symmetric_cipher(alg, session_key.key())?;
    Ok(Ocfb::new(Rc::from(cipher), true))
}

impl Serialize for SymEncryptedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        self.data.len()
    }
}

impl PacketTrait for SymEncryptedData {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}
