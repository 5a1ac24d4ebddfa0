use std::io;

use bytes::Buf;
use rand::{CryptoRng, Rng};

use crate::crypto::{checksum, PublicKeyAlgorithm};
use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::registry::AlgorithmRegistry;
use crate::ser::Serialize;
use crate::types::{EncryptedSecretParams, LockOptions, PlainSecretParams};

/// The secret part of a secret key packet, either in the clear or passphrase protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretParams {
    Plain(PlainSecretParams),
    Encrypted(EncryptedSecretParams),
}

impl SecretParams {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, SecretParams::Encrypted(_))
    }

    /// The usage octet this is stored with.
    pub fn string_to_key_id(&self) -> u8 {
        match self {
            SecretParams::Plain(_) => 0,
            SecretParams::Encrypted(k) => k.string_to_key_id(),
        }
    }

    pub fn from_buf<B: Buf>(alg: PublicKeyAlgorithm, mut i: B) -> Result<Self> {
        let usage = i.read_u8()?;
        if usage != 0 {
            return Ok(SecretParams::Encrypted(EncryptedSecretParams::from_buf(
                usage, i,
            )?));
        }

        let params = PlainSecretParams::from_buf(alg, &mut i)?;
        let sum = i.read_array::<2>()?;
        checksum::simple(sum, &params.to_raw()?)?;

        Ok(SecretParams::Plain(params))
    }

    /// Decrypts protected material, plain material is returned as is.
    pub fn unlock(
        &self,
        registry: &AlgorithmRegistry,
        alg: PublicKeyAlgorithm,
        passphrase: &[u8],
    ) -> Result<PlainSecretParams> {
        match self {
            SecretParams::Plain(k) => Ok(k.clone()),
            SecretParams::Encrypted(k) => k.decrypt(registry, alg, passphrase),
        }
    }

    /// Stores `plain` in the form selected by `passphrase`: protected with `options`,
    /// or in the clear if the passphrase is empty.
    pub fn lock<R: CryptoRng + Rng>(
        registry: &AlgorithmRegistry,
        rng: R,
        plain: &PlainSecretParams,
        passphrase: &[u8],
        options: &LockOptions,
    ) -> Result<Self> {
        if passphrase.is_empty() {
            return Ok(SecretParams::Plain(plain.clone()));
        }
        let enc = EncryptedSecretParams::encrypt(registry, rng, plain, passphrase, options)?;
        Ok(SecretParams::Encrypted(enc))
    }
}

impl Serialize for SecretParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            SecretParams::Plain(k) => {
                writer.write_all(&[0])?;
                k.to_writer(writer)?;
                writer.write_all(&k.checksum_simple()?)?;
                Ok(())
            }
            SecretParams::Encrypted(k) => k.to_writer(writer),
        }
    }

    fn write_len(&self) -> usize {
        match self {
            SecretParams::Plain(k) => 1 + k.write_len() + 2,
            SecretParams::Encrypted(k) => k.write_len(),
        }
    }
}
