use std::io;

use bytes::Buf;
use log::debug;
use rand::{CryptoRng, Rng};

use super::public::{PubKeyInner, PublicKey, PublicSubkey};
use crate::crypto::PublicKeyAlgorithm;
use crate::errors::{Error, Result};
use crate::packet::{PacketHeader, PacketTrait};
use crate::registry::AlgorithmRegistry;
use crate::ser::Serialize;
use crate::types::{
    KeyDetails, KeyVersion, LockOptions, Password, PlainSecretParams, PublicParams, SecretKeyTrait,
    SecretParams, Tag,
};

macro_rules! impl_secret_key {
    ($(#[$attr:meta])* $name:ident, $tag:expr, $public:ident) => {
        $(#[$attr])*
        ///
        /// The secret material is kept in its stored form. Unlocking decrypts it
        /// into a zeroize-on-drop copy held next to it, locking re-encrypts it
        /// and drops that copy.
        #[derive(Debug, PartialEq, Eq, Clone)]
        pub struct $name {
            packet_header: PacketHeader,
            details: PubKeyInner,
            secret_params: SecretParams,
            unlocked: Option<PlainSecretParams>,
        }

        impl $name {
            /// Creates an unprotected secret key from its public part.
            pub fn new(details: $public, secret_params: PlainSecretParams) -> Result<Self> {
                Self::from_parts(details.inner().clone(), SecretParams::Plain(secret_params))
            }

            fn from_parts(details: PubKeyInner, secret_params: SecretParams) -> Result<Self> {
                let packet_header =
                    PacketHeader::for_body($tag, details.write_len() + secret_params.write_len())?;

                Ok($name {
                    packet_header,
                    details,
                    secret_params,
                    unlocked: None,
                })
            }

            /// Parses the packet body. Only v4 keys are supported.
            pub fn from_buf<B: Buf>(packet_header: PacketHeader, mut i: B) -> Result<Self> {
                ensure_eq!(packet_header.tag(), $tag, "invalid tag");
                let details = PubKeyInner::from_buf(&mut i)?;
                let secret_params = SecretParams::from_buf(details.algorithm(), &mut i)?;

                Ok($name {
                    packet_header,
                    details,
                    secret_params,
                    unlocked: None,
                })
            }

            /// The public part of this key as a public key packet.
            pub fn public_key(&self) -> Result<$public> {
                $public::from_inner(self.details.clone())
            }

            /// The secret material in its stored form.
            pub fn secret_params(&self) -> &SecretParams {
                &self.secret_params
            }

            /// True if the secret material is stored passphrase protected.
            pub fn is_encrypted(&self) -> bool {
                self.secret_params.is_encrypted()
            }

            /// True if the secret material is protected and not unlocked.
            pub fn is_locked(&self) -> bool {
                self.is_encrypted() && self.unlocked.is_none()
            }

            /// The usable secret material, fails with [`Error::KeyLocked`] while locked.
            pub fn secret_material(&self) -> Result<&PlainSecretParams> {
                match (&self.secret_params, &self.unlocked) {
                    (SecretParams::Plain(plain), _) => Ok(plain),
                    (SecretParams::Encrypted(_), Some(plain)) => Ok(plain),
                    (SecretParams::Encrypted(_), None) => Err(Error::KeyLocked),
                }
            }

            /// Decrypts the secret material.
            ///
            /// Does nothing for unprotected or already unlocked keys, the
            /// passphrase is not read in that case.
            pub fn unlock(&mut self, registry: &AlgorithmRegistry, password: &Password) -> Result<()> {
                if !self.is_locked() {
                    return Ok(());
                }
                let passphrase = password.read_non_empty().ok_or(Error::MissingPassphrase)?;
                let plain =
                    self.secret_params
                        .unlock(registry, self.details.algorithm(), &passphrase)?;
                debug!("unlocked {:?} {:?}", $tag, self.details.algorithm());
                self.unlocked = Some(plain);

                Ok(())
            }

            /// Stores the secret material protected by `password`, or in the
            /// clear if the password is empty, and forgets the unlocked copy.
            pub fn lock<R: CryptoRng + Rng>(
                &mut self,
                registry: &AlgorithmRegistry,
                rng: R,
                password: &Password,
                options: &LockOptions,
            ) -> Result<()> {
                if self.is_locked() {
                    return Err(Error::KeyAlreadyLocked);
                }
                let plain = self.secret_material()?.clone();
                let secret_params =
                    SecretParams::lock(registry, rng, &plain, &password.read(), options)?;
                let packet_header = PacketHeader::for_body(
                    $tag,
                    self.details.write_len() + secret_params.write_len(),
                )?;
                debug!(
                    "locked {:?} {:?}, protected: {}",
                    $tag,
                    self.details.algorithm(),
                    secret_params.is_encrypted()
                );

                self.secret_params = secret_params;
                self.packet_header = packet_header;
                self.unlocked = None;

                Ok(())
            }
        }

        impl Serialize for $name {
            fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
                self.details.to_writer(writer)?;
                self.secret_params.to_writer(writer)
            }

            fn write_len(&self) -> usize {
                self.details.write_len() + self.secret_params.write_len()
            }
        }

        impl PacketTrait for $name {
            fn packet_header(&self) -> &PacketHeader {
                &self.packet_header
            }
        }

        impl KeyDetails for $name {
            fn version(&self) -> KeyVersion {
                self.details.version()
            }

            fn algorithm(&self) -> PublicKeyAlgorithm {
                self.details.algorithm()
            }

            fn created_at(&self) -> u32 {
                self.details.created_at()
            }

            fn public_params(&self) -> &PublicParams {
                self.details.public_params()
            }

            fn serialize_for_hashing(&self, writer: &mut impl io::Write) -> Result<()> {
                self.details.serialize_for_hashing(writer)
            }
        }

        impl SecretKeyTrait for $name {
            fn secret_material(&self) -> Result<&PlainSecretParams> {
                $name::secret_material(self)
            }
        }
    };
}

impl_secret_key!(
    /// Secret-Key Packet
    /// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.5.1.3>
    SecretKey,
    Tag::SecretKey,
    PublicKey
);

impl_secret_key!(
    /// Secret-Subkey Packet
    /// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.5.1.4>
    SecretSubkey,
    Tag::SecretSubkey,
    PublicSubkey
);
