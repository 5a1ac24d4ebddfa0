use std::io;
use std::iter::Peekable;

use log::{debug, warn};
use rand::{CryptoRng, Rng};

use crate::composed::key::{SignedKeyDetails, SignedPublicSubkey, SignedSubkey, TransferablePublicKey};
use crate::composed::shared::{next_if_tag, next_packet, peek_tag, Deserializable};
use crate::errors::Result;
use crate::packet::{Packet, PacketTrait, PublicSubkey, SecretKey, SecretSubkey, UserId};
use crate::registry::AlgorithmRegistry;
use crate::ser::Serialize;
use crate::types::{Fingerprint, KeyDetails, KeyId, LockOptions, Password, Tag};

pub type SignedSecretSubkey = SignedSubkey<SecretSubkey>;

/// A transferable secret key.
///
/// Secret key blocks may carry subkeys without their secret part, those are
/// kept as public subkeys.
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-11.2>
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TransferableSecretKey {
    pub primary_key: SecretKey,
    pub details: SignedKeyDetails,
    pub secret_subkeys: Vec<SignedSecretSubkey>,
    pub public_subkeys: Vec<SignedPublicSubkey>,
}

impl TransferableSecretKey {
    pub fn new(
        primary_key: SecretKey,
        details: SignedKeyDetails,
        secret_subkeys: Vec<SignedSecretSubkey>,
        public_subkeys: Vec<SignedPublicSubkey>,
    ) -> Self {
        TransferableSecretKey {
            primary_key,
            details,
            secret_subkeys,
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

    /// The public key block: secret subkeys become public subkeys, followed
    /// by the subkeys that were public already.
    pub fn public_key(&self) -> Result<TransferablePublicKey> {
        let mut public_subkeys = Vec::with_capacity(
            self.secret_subkeys.len() + self.public_subkeys.len(),
        );
        for subkey in &self.secret_subkeys {
            public_subkeys.push(SignedSubkey::new(
                subkey.key.public_key()?,
                subkey.bindings.clone(),
                subkey.revocations.clone(),
            ));
        }
        public_subkeys.extend(self.public_subkeys.iter().cloned());

        Ok(TransferablePublicKey::new(
            self.primary_key.public_key()?,
            self.details.clone(),
            public_subkeys,
        ))
    }

    /// True if the primary key or any secret subkey is locked.
    pub fn is_locked(&self) -> bool {
        self.primary_key.is_locked() || self.secret_subkeys.iter().any(|k| k.key.is_locked())
    }

    /// Unlocks the primary key and all secret subkeys.
    ///
    /// Stops at the first key that fails, keys unlocked before it stay unlocked.
    pub fn try_unlock(&mut self, registry: &AlgorithmRegistry, password: &Password) -> Result<()> {
        self.primary_key.unlock(registry, password)?;
        for subkey in &mut self.secret_subkeys {
            subkey.key.unlock(registry, password)?;
        }
        debug!("unlocked {} secret subkeys", self.secret_subkeys.len());

        Ok(())
    }

    /// Like [`try_unlock`](Self::try_unlock), reporting success as a flag.
    pub fn unlock(&mut self, registry: &AlgorithmRegistry, password: &Password) -> bool {
        match self.try_unlock(registry, password) {
            Ok(()) => true,
            Err(err) => {
                warn!("unlocking failed: {}", err);
                false
            }
        }
    }

    /// Locks the primary key and all secret subkeys with `password`.
    ///
    /// An empty password stores the keys without protection. Stops at the
    /// first key that fails, keys locked before it stay locked.
    pub fn try_lock<R: CryptoRng + Rng>(
        &mut self,
        registry: &AlgorithmRegistry,
        rng: &mut R,
        password: &Password,
        options: &LockOptions,
    ) -> Result<()> {
        self.primary_key
            .lock(registry, &mut *rng, password, options)?;
        for subkey in &mut self.secret_subkeys {
            subkey.key.lock(registry, &mut *rng, password, options)?;
        }

        Ok(())
    }

    /// Like [`try_lock`](Self::try_lock), reporting success as a flag.
    pub fn lock<R: CryptoRng + Rng>(
        &mut self,
        registry: &AlgorithmRegistry,
        rng: &mut R,
        password: &Password,
        options: &LockOptions,
    ) -> bool {
        match self.try_lock(registry, rng, password, options) {
            Ok(()) => true,
            Err(err) => {
                warn!("locking failed: {}", err);
                false
            }
        }
    }
}

impl Deserializable for TransferableSecretKey {
    fn from_packets<I: Iterator<Item = Result<Packet>>>(packets: &mut Peekable<I>) -> Result<Self> {
        let Some(primary_key) = next_if_tag::<SecretKey, _>(packets, Tag::SecretKey)? else {
            bail!("Missing primary key packet");
        };
        let details = SignedKeyDetails::from_packets(packets)?;

        let mut secret_subkeys = Vec::new();
        let mut public_subkeys = Vec::new();
        loop {
            match peek_tag(packets) {
                Some(Tag::Trust) => {
                    next_packet(packets)?;
                }
                Some(Tag::SecretSubkey) => {
                    let key = SecretSubkey::try_from(next_packet(packets)?)?;
                    secret_subkeys.push(SignedSubkey::from_packets(key, packets)?);
                }
                Some(Tag::PublicSubkey) => {
                    let key = PublicSubkey::try_from(next_packet(packets)?)?;
                    public_subkeys.push(SignedSubkey::from_packets(key, packets)?);
                }
                _ => break,
            }
        }

        Ok(TransferableSecretKey::new(
            primary_key,
            details,
            secret_subkeys,
            public_subkeys,
        ))
    }
}

impl Serialize for TransferableSecretKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.primary_key.to_writer_with_header(writer)?;
        self.details.to_writer(writer)?;
        self.secret_subkeys.to_writer(writer)?;
        self.public_subkeys.to_writer(writer)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        self.primary_key.write_len_with_header()
            + self.details.write_len()
            + self.secret_subkeys.write_len()
            + self.public_subkeys.write_len()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::composed::key::public::tests::{packets_to_bytes, sig, user_id};
    use crate::errors::Error;
    use crate::packet::test_keys::{rsa_secret, secret_key};
    use crate::packet::SignatureType;

    fn secret_subkey() -> SecretSubkey {
        let public = secret_key().public_key().unwrap();
        let public = PublicSubkey::new(
            public.algorithm(),
            public.created_at() + 1,
            public.public_params().clone(),
        )
        .unwrap();
        SecretSubkey::new(public, rsa_secret()).unwrap()
    }

    fn key_block() -> TransferableSecretKey {
        let input = packets_to_bytes(&[
            secret_key().into(),
            user_id("carol"),
            sig(SignatureType::CertPositive),
            secret_subkey().into(),
            sig(SignatureType::SubkeyBinding),
            secret_subkey().public_key().unwrap().into(),
            sig(SignatureType::SubkeyBinding),
        ]);
        TransferableSecretKey::from_bytes(input).unwrap()
    }

    #[test]
    fn test_parse() {
        let key = key_block();
        assert_eq!(key.secret_subkeys.len(), 1);
        assert_eq!(key.public_subkeys.len(), 1);
        assert!(!key.is_locked());
        assert_eq!(
            TransferableSecretKey::from_bytes(key.to_bytes().unwrap()).unwrap(),
            key
        );
    }

    #[test]
    fn test_public_key() {
        let registry = AlgorithmRegistry::with_defaults();
        let key = key_block();
        let public = key.public_key().unwrap();

        assert_eq!(public.public_subkeys.len(), 2);
        assert_eq!(public.public_subkeys[0].key, public.public_subkeys[1].key);
        assert_eq!(
            public.fingerprint(&registry).unwrap(),
            key.fingerprint(&registry).unwrap()
        );
        assert_eq!(public.details, key.details);
    }

    #[test]
    fn test_lock_unlock_all() {
        let _ = pretty_env_logger::try_init();
        let registry = AlgorithmRegistry::with_defaults();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut key = key_block();

        assert!(key.lock(&registry, &mut rng, &"pw".into(), &LockOptions::default()));
        assert!(key.is_locked());
        assert!(key.primary_key.is_locked());
        assert!(key.secret_subkeys[0].key.is_locked());

        // a second lock fails on the primary key
        let err = key
            .try_lock(&registry, &mut rng, &"pw".into(), &LockOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::KeyAlreadyLocked));

        let mut parsed = TransferableSecretKey::from_bytes(key.to_bytes().unwrap()).unwrap();
        assert!(parsed.is_locked());
        assert!(!parsed.unlock(&registry, &"nope".into()));
        assert!(matches!(
            parsed.try_unlock(&registry, &"nope".into()),
            Err(Error::WrongPassphrase)
        ));

        assert!(parsed.unlock(&registry, &"pw".into()));
        assert!(!parsed.is_locked());
        assert_eq!(
            parsed.secret_subkeys[0].key.secret_material().unwrap(),
            &rsa_secret()
        );
    }

    #[test]
    fn test_public_block_is_not_secret() {
        let key = key_block();
        let public_bytes = key.public_key().unwrap().to_bytes().unwrap();
        assert!(TransferableSecretKey::from_bytes(public_bytes).is_err());
    }
}
