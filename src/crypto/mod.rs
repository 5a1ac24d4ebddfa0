//! Algorithm ids, the built in software implementations, and the cipher mode engine.

pub mod checksum;
pub mod compression;
pub mod hash;
pub mod mode;
pub mod public_key;
pub mod sym;

pub use self::hash::HashAlgorithm;
pub use self::public_key::PublicKeyAlgorithm;
pub use self::sym::SymmetricKeyAlgorithm;
