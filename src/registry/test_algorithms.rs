//! Deterministic stand-ins for the asymmetric registries, keyed by toy RSA params.

use crate::async_result::AsyncResult;
use crate::crypto::{HashAlgorithm, PublicKeyAlgorithm};
use crate::errors::Result;
use crate::types::{Mpi, PublicParams};

use super::{Algorithm, AlgorithmRegistry, AsymmetricCipher, Constructor, Key, Signer};

/// Signs by appending the digest to the modulus.
pub(crate) struct ToySigner {
    id: PublicKeyAlgorithm,
    key: Key,
}

/// Encrypts by xoring with the modulus, behind a marker byte.
pub(crate) struct ToyCipher {
    id: PublicKeyAlgorithm,
    key: Key,
}

fn modulus(key: &Key) -> Result<Vec<u8>> {
    match key {
        Key::Asymmetric {
            public: PublicParams::RSA { n, .. },
            ..
        } if !n.is_empty() => Ok(n.as_minimal().to_vec()),
        _ => invalid_args_err!("toy algorithms need an RSA key"),
    }
}

fn has_secret(key: &Key) -> bool {
    matches!(key, Key::Asymmetric { secret: Some(_), .. })
}

fn xor_with(data: &[u8], n: &[u8]) -> Vec<u8> {
    data.iter().zip(n.iter().cycle()).map(|(a, b)| a ^ b).collect()
}

macro_rules! impl_toy_algorithm {
    ($name:ident) => {
        impl Algorithm<PublicKeyAlgorithm> for $name {
            fn algorithm(&self) -> PublicKeyAlgorithm {
                self.id
            }

            fn key_size(&self) -> usize {
                modulus(&self.key).map_or(0, |n| n.len())
            }

            fn key(&self) -> Option<&Key> {
                Some(&self.key)
            }

            fn set_key(&mut self, key: Key) -> Result<()> {
                modulus(&key)?;
                self.key = key;
                Ok(())
            }
        }
    };
}

impl_toy_algorithm!(ToySigner);
impl_toy_algorithm!(ToyCipher);

impl Signer for ToySigner {
    fn hash_algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }

    fn sign(&self, digest: &[u8]) -> AsyncResult<Vec<Mpi>> {
        if !has_secret(&self.key) {
            return AsyncResult::err(format_err!("signing needs the secret key"));
        }
        AsyncResult::from_result(modulus(&self.key).map(|mut value| {
            value.extend_from_slice(digest);
            vec![Mpi::from_slice(&value)]
        }))
    }

    fn verify(&self, digest: &[u8], signature: &[Mpi]) -> AsyncResult<bool> {
        AsyncResult::from_result(modulus(&self.key).map(|mut expected| {
            expected.extend_from_slice(digest);
            matches!(signature, [value] if value.as_minimal() == &expected[..])
        }))
    }
}

impl AsymmetricCipher for ToyCipher {
    fn encrypt(&self, data: &[u8]) -> AsyncResult<Vec<Mpi>> {
        AsyncResult::from_result(modulus(&self.key).map(|n| {
            let mut value = vec![0x01];
            value.extend(xor_with(data, &n));
            vec![Mpi::from_slice(&value)]
        }))
    }

    fn decrypt(&self, ciphertext: &[Mpi]) -> AsyncResult<Vec<u8>> {
        if !has_secret(&self.key) {
            return AsyncResult::err(format_err!("decryption needs the secret key"));
        }
        let n = match modulus(&self.key) {
            Ok(n) => n,
            Err(err) => return AsyncResult::err(err),
        };
        match ciphertext {
            [value] if value.as_minimal().first() == Some(&0x01) => {
                AsyncResult::ok(xor_with(&value.as_minimal()[1..], &n))
            }
            _ => AsyncResult::err(format_err!("malformed toy ciphertext")),
        }
    }
}

fn toy_signer(id: PublicKeyAlgorithm, key: Option<&Key>) -> Result<Box<dyn Signer>> {
    let Some(key) = key else {
        invalid_args_err!("{:?} needs a key", id);
    };
    modulus(key)?;
    Ok(Box::new(ToySigner {
        id,
        key: key.clone(),
    }))
}

fn toy_cipher(id: PublicKeyAlgorithm, key: Option<&Key>) -> Result<Box<dyn AsymmetricCipher>> {
    let Some(key) = key else {
        invalid_args_err!("{:?} needs a key", id);
    };
    modulus(key)?;
    Ok(Box::new(ToyCipher {
        id,
        key: key.clone(),
    }))
}

/// The default registries plus the toy RSA signer and cipher.
pub(crate) fn toy_registry() -> AlgorithmRegistry {
    let mut registry = AlgorithmRegistry::with_defaults();
    registry
        .signers
        .add(Constructor::new(PublicKeyAlgorithm::RSA, toy_signer), None);
    registry
        .asymmetric
        .add(Constructor::new(PublicKeyAlgorithm::RSA, toy_cipher), None);
    registry
}
