use std::io;

use crate::crypto::{HashAlgorithm, PublicKeyAlgorithm};
use crate::errors::Result;
use crate::registry::{AlgorithmRegistry, Key};
use crate::types::{Fingerprint, KeyId, KeyVersion, PlainSecretParams, PublicParams};

/// Metadata of a key packet
pub trait KeyDetails: std::fmt::Debug {
    /// Returns the [`KeyVersion`] of this key.
    fn version(&self) -> KeyVersion;

    /// Returns the algorithm for this key.
    fn algorithm(&self) -> PublicKeyAlgorithm;

    /// Creation time, seconds since the unix epoch.
    fn created_at(&self) -> u32;

    /// Returns the parameters for the public portion of this key.
    fn public_params(&self) -> &PublicParams;

    /// Writes the public key body framed the way it is hashed:
    /// `0x99 || len16 || body`.
    fn serialize_for_hashing(&self, writer: &mut impl io::Write) -> Result<()>;

    /// Returns the [`Fingerprint`] for this key.
    ///
    /// <https://www.rfc-editor.org/rfc/rfc4880.html#section-12.2>
    fn fingerprint(&self, registry: &AlgorithmRegistry) -> Result<Fingerprint> {
        let mut buf = Vec::new();
        self.serialize_for_hashing(&mut buf)?;
        let digest = registry.digest(HashAlgorithm::Sha1, &buf)?;
        let fp: [u8; 20] = digest
            .as_slice()
            .try_into()
            .map_err(|_| format_err!("invalid SHA1 digest length {}", digest.len()))?;

        Ok(Fingerprint::new(fp))
    }

    /// Returns the [`KeyId`] for this key, the low 64 bits of the fingerprint.
    fn key_id(&self, registry: &AlgorithmRegistry) -> Result<KeyId> {
        Ok(self.fingerprint(registry)?.key_id())
    }

    /// The public material in the form algorithm constructors take it.
    fn public_key_material(&self) -> Key {
        Key::Asymmetric {
            public: self.public_params().clone(),
            secret: None,
        }
    }
}

/// A key packet that carries secret material.
pub trait SecretKeyTrait: KeyDetails {
    /// The usable secret material, fails with `KeyLocked` while locked.
    fn secret_material(&self) -> Result<&PlainSecretParams>;

    /// Public and secret material in the form algorithm constructors take it.
    fn secret_key_material(&self) -> Result<Key> {
        Ok(Key::Asymmetric {
            public: self.public_params().clone(),
            secret: Some(self.secret_material()?.clone()),
        })
    }
}
