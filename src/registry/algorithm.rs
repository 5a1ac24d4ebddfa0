use crate::async_result::AsyncResult;
use crate::crypto::{public_key::PublicKeyAlgorithm, HashAlgorithm, SymmetricKeyAlgorithm};
use crate::errors::Result;
use crate::types::{CompressionAlgorithm, Mpi};

use super::Key;

/// Capabilities shared by every registered implementation.
pub trait Algorithm<Id: Copy> {
    /// The id this instance was created for.
    fn algorithm(&self) -> Id;

    /// Key size in bytes, `0` for algorithms without a key.
    fn key_size(&self) -> usize;

    fn key(&self) -> Option<&Key>;

    /// Replaces the key. Fails with `InvalidArguments` if the key does not fit the algorithm.
    fn set_key(&mut self, key: Key) -> Result<()>;
}

/// A block cipher. `encrypt` and `decrypt` operate on exactly one block.
pub trait SymmetricCipher: Algorithm<SymmetricKeyAlgorithm> {
    fn block_size(&self) -> usize;
    fn encrypt(&self, block: &[u8]) -> AsyncResult<Vec<u8>>;
    fn decrypt(&self, block: &[u8]) -> AsyncResult<Vec<u8>>;
}

pub trait AsymmetricCipher: Algorithm<PublicKeyAlgorithm> {
    fn encrypt(&self, data: &[u8]) -> AsyncResult<Vec<Mpi>>;
    fn decrypt(&self, ciphertext: &[Mpi]) -> AsyncResult<Vec<u8>>;
}

pub trait Signer: Algorithm<PublicKeyAlgorithm> {
    /// The hash the signer expects digests to be computed with.
    fn hash_algorithm(&self) -> HashAlgorithm;
    fn sign(&self, digest: &[u8]) -> AsyncResult<Vec<Mpi>>;
    fn verify(&self, digest: &[u8], signature: &[Mpi]) -> AsyncResult<bool>;
}

/// Hashes are always computed synchronously.
pub trait Hash: Algorithm<HashAlgorithm> {
    fn block_size(&self) -> usize;
    fn output_size(&self) -> usize;
    fn update(&mut self, data: &[u8]);

    /// Returns the digest and resets the state.
    fn finalize_reset(&mut self) -> Vec<u8>;

    fn hash(&mut self, data: &[u8]) -> Vec<u8> {
        self.update(data);
        self.finalize_reset()
    }
}

pub trait Compression: Algorithm<CompressionAlgorithm> {
    fn compress(&self, data: &[u8]) -> AsyncResult<Vec<u8>>;
    fn decompress(&self, data: &[u8]) -> AsyncResult<Vec<u8>>;
}
