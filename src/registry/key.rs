use zeroize::Zeroizing;

use crate::types::{PlainSecretParams, PublicParams};

/// Key material handed to an algorithm constructor or `set_key`.
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub enum Key {
    Symmetric(#[debug("..")] Zeroizing<Vec<u8>>),
    Asymmetric {
        public: PublicParams,
        secret: Option<PlainSecretParams>,
    },
}

impl Key {
    pub fn symmetric(key: &[u8]) -> Self {
        Key::Symmetric(Zeroizing::new(key.to_vec()))
    }

    /// The raw bytes of a symmetric key.
    pub fn as_symmetric(&self) -> Option<&[u8]> {
        match self {
            Key::Symmetric(k) => Some(k),
            Key::Asymmetric { .. } => None,
        }
    }
}
