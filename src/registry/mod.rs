//! Pluggable algorithm implementations.
//!
//! A [`Registry`] maps an algorithm id to a [`Constructor`]. The first constructor
//! added for an id wins, later additions for the same id are ignored. An
//! [`AlgorithmRegistry`] bundles one registry per capability and is built once at
//! process start, then passed by reference to everything that needs an algorithm.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash as StdHash;

use log::debug;

use crate::crypto::{
    compression, hash, public_key::PublicKeyAlgorithm, sym, HashAlgorithm, SymmetricKeyAlgorithm,
};
use crate::errors::{Error, Result};
use crate::types::CompressionAlgorithm;

mod algorithm;
mod key;
#[cfg(test)]
pub(crate) mod test_algorithms;

pub use self::algorithm::{
    Algorithm, AsymmetricCipher, Compression, Hash, Signer, SymmetricCipher,
};
pub use self::key::Key;

/// Builds an instance for the given id, optionally configured with a key.
pub type BuildFn<T, Id> = fn(Id, Option<&Key>) -> Result<Box<T>>;

/// A constructor together with the algorithm it declares.
pub struct Constructor<T: ?Sized, Id> {
    algorithm: Id,
    build: BuildFn<T, Id>,
}

impl<T: ?Sized, Id: Copy> Constructor<T, Id> {
    pub const fn new(algorithm: Id, build: BuildFn<T, Id>) -> Self {
        Self { algorithm, build }
    }

    /// The algorithm this constructor declares.
    pub fn algorithm(&self) -> Id {
        self.algorithm
    }

    /// Creates a new instance.
    pub fn build(&self, id: Id, key: Option<&Key>) -> Result<Box<T>> {
        (self.build)(id, key)
    }
}

impl<T: ?Sized, Id: Copy> Clone for Constructor<T, Id> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized, Id: Copy> Copy for Constructor<T, Id> {}

impl<T: ?Sized, Id: fmt::Debug> fmt::Debug for Constructor<T, Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Id keyed table of constructors for one capability.
pub struct Registry<T: ?Sized, Id> {
    name: &'static str,
    constructors: HashMap<Id, Constructor<T, Id>>,
    order: Vec<Id>,
}

// Only the constructor table is copied, no instances exist at this level.
impl<T: ?Sized, Id: Copy> Clone for Registry<T, Id> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            constructors: self.constructors.clone(),
            order: self.order.clone(),
        }
    }
}

impl<T: ?Sized, Id: fmt::Debug> fmt::Debug for Registry<T, Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name)
            .field("algorithms", &self.order)
            .finish()
    }
}

impl<T: ?Sized, Id> Registry<T, Id>
where
    Id: Copy + Eq + StdHash + fmt::Debug,
{
    /// Creates an empty registry. `name` is used in errors and logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            constructors: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Registers `constructor` under `id`, or under the algorithm the constructor declares.
    ///
    /// Returns `false` if the id was already taken, the existing entry is kept.
    pub fn add(&mut self, constructor: Constructor<T, Id>, id: Option<Id>) -> bool {
        let id = id.unwrap_or(constructor.algorithm);
        if self.constructors.contains_key(&id) {
            debug!("{}: {:?} already registered, ignoring", self.name, id);
            return false;
        }

        debug!("{}: registering {:?}", self.name, id);
        self.constructors.insert(id, constructor);
        self.order.push(id);
        true
    }

    pub fn has(&self, id: Id) -> bool {
        self.constructors.contains_key(&id)
    }

    /// Ids in registration order.
    pub fn available(&self) -> &[Id] {
        &self.order
    }

    /// Instantiates the algorithm registered for `id`.
    ///
    /// Returns `Ok(None)` if nothing is registered, and an error if the
    /// constructor rejects the key.
    pub fn get(&self, id: Id, key: Option<&Key>) -> Result<Option<Box<T>>> {
        match self.constructors.get(&id) {
            Some(constructor) => constructor.build(id, key).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`get`](Self::get), but an unregistered id is an error.
    pub fn require(&self, id: Id, key: Option<&Key>) -> Result<Box<T>> {
        self.get(id, key)?.ok_or_else(|| Error::AlgorithmNotAvailable {
            registry: self.name,
            algorithm: format!("{:?}", id),
        })
    }
}

/// The set of registries consulted by the engine.
///
/// Cloning is cheap, it copies the constructor tables. Operations that need
/// algorithms after an asynchronous step hold such a copy.
#[derive(Debug, Clone)]
pub struct AlgorithmRegistry {
    pub symmetric: Registry<dyn SymmetricCipher, SymmetricKeyAlgorithm>,
    pub asymmetric: Registry<dyn AsymmetricCipher, PublicKeyAlgorithm>,
    pub signers: Registry<dyn Signer, PublicKeyAlgorithm>,
    pub hashes: Registry<dyn Hash, HashAlgorithm>,
    pub compression: Registry<dyn Compression, CompressionAlgorithm>,
}

impl AlgorithmRegistry {
    /// Registries without any algorithms.
    pub fn empty() -> Self {
        Self {
            symmetric: Registry::new("symmetric cipher"),
            asymmetric: Registry::new("asymmetric cipher"),
            signers: Registry::new("signer"),
            hashes: Registry::new("hash"),
            compression: Registry::new("compression"),
        }
    }

    /// Registries populated with the built in software implementations.
    ///
    /// Asymmetric ciphers and signers are left empty, they are provided by the caller.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        sym::register_defaults(&mut registry.symmetric);
        hash::register_defaults(&mut registry.hashes);
        compression::register_defaults(&mut registry.compression);
        registry
    }

    /// Creates a keyed block cipher.
    pub fn symmetric_cipher(
        &self,
        alg: SymmetricKeyAlgorithm,
        key: &[u8],
    ) -> Result<Box<dyn SymmetricCipher>> {
        let key = Key::symmetric(key);
        self.symmetric.require(alg, Some(&key))
    }

    /// Creates a fresh hasher.
    pub fn hasher(&self, alg: HashAlgorithm) -> Result<Box<dyn Hash>> {
        self.hashes.require(alg, None)
    }

    /// Hashes `data` in one go.
    pub fn digest(&self, alg: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        Ok(self.hasher(alg)?.hash(data))
    }

    pub fn compressor(&self, alg: CompressionAlgorithm) -> Result<Box<dyn Compression>> {
        self.compression.require(alg, None)
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::async_result::AsyncResult;

    struct Fake {
        id: CompressionAlgorithm,
        marker: u8,
    }

    impl Algorithm<CompressionAlgorithm> for Fake {
        fn algorithm(&self) -> CompressionAlgorithm {
            self.id
        }
        fn key_size(&self) -> usize {
            0
        }
        fn key(&self) -> Option<&Key> {
            None
        }
        fn set_key(&mut self, _key: Key) -> Result<()> {
            invalid_args_err!("compression takes no key")
        }
    }

    impl Compression for Fake {
        fn compress(&self, data: &[u8]) -> AsyncResult<Vec<u8>> {
            let mut out = vec![self.marker];
            out.extend_from_slice(data);
            AsyncResult::ok(out)
        }
        fn decompress(&self, data: &[u8]) -> AsyncResult<Vec<u8>> {
            AsyncResult::ok(data[1..].to_vec())
        }
    }

    fn fake_a(id: CompressionAlgorithm, _: Option<&Key>) -> Result<Box<dyn Compression>> {
        Ok(Box::new(Fake { id, marker: 0xA }))
    }

    fn fake_b(id: CompressionAlgorithm, _: Option<&Key>) -> Result<Box<dyn Compression>> {
        Ok(Box::new(Fake { id, marker: 0xB }))
    }

    #[test]
    fn test_unregistered() {
        let registry: Registry<dyn Compression, CompressionAlgorithm> = Registry::new("compression");
        assert!(registry.get(CompressionAlgorithm::ZIP, None).unwrap().is_none());
        let err = registry
            .require(CompressionAlgorithm::ZIP, None)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::AlgorithmNotAvailable {
                registry: "compression",
                ..
            }
        ));
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry: Registry<dyn Compression, CompressionAlgorithm> =
            Registry::new("compression");
        let id = CompressionAlgorithm::Other(100);

        assert!(registry.add(Constructor::new(id, fake_a), None));
        assert!(!registry.add(Constructor::new(id, fake_b), None));

        let c = registry.get(id, None).unwrap().unwrap();
        assert_eq!(c.algorithm(), id);
        assert_eq!(c.compress(b"x").value().unwrap(), vec![0xA, b'x']);
        assert_eq!(registry.available(), &[id]);
    }

    #[test]
    fn test_add_under_explicit_id() {
        let mut registry: Registry<dyn Compression, CompressionAlgorithm> =
            Registry::new("compression");
        let declared = CompressionAlgorithm::Other(100);
        let alias = CompressionAlgorithm::Other(101);

        assert!(registry.add(Constructor::new(declared, fake_b), Some(alias)));
        assert!(!registry.has(declared));

        // the instance reports the id it was registered under
        let c = registry.require(alias, None).unwrap();
        assert_eq!(c.algorithm(), alias);
    }

    #[test]
    fn test_defaults() {
        let registry = AlgorithmRegistry::with_defaults();
        assert!(registry.symmetric.has(SymmetricKeyAlgorithm::AES128));
        assert!(registry.hashes.has(HashAlgorithm::Sha1));
        assert!(registry.compression.has(CompressionAlgorithm::ZLIB));
        assert!(registry.signers.available().is_empty());
        assert!(registry
            .asymmetric
            .require(PublicKeyAlgorithm::RSA, None)
            .is_err());
    }
}
