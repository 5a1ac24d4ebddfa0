use std::fmt;

use crate::errors::Result;

/// Represents a Key ID, the low 64 bits of a v4 fingerprint.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct KeyId([u8; 8]);

impl AsRef<[u8]> for KeyId {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

impl KeyId {
    pub fn from_slice(input: &[u8]) -> Result<KeyId> {
        ensure_eq!(input.len(), 8, "invalid input length");
        let mut r = [0u8; 8];
        r.copy_from_slice(input);

        Ok(KeyId(r))
    }
}

impl From<[u8; 8]> for KeyId {
    fn from(value: [u8; 8]) -> Self {
        KeyId(value)
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", hex::encode(self.as_ref()))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.as_ref()))
    }
}

/// A v4 key fingerprint: SHA1 over the framed public key body.
#[derive(Clone, Copy, Eq, PartialEq, Hash, derive_more::Debug)]
#[debug("Fingerprint({})", hex::encode(_0))]
pub struct Fingerprint([u8; 20]);

impl Fingerprint {
    pub fn new(fp: [u8; 20]) -> Self {
        Self(fp)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }

    /// The key id derived from this fingerprint.
    pub fn key_id(&self) -> KeyId {
        let mut id = [0u8; 8];
        id.copy_from_slice(&self.0[12..]);
        KeyId(id)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_id_from_fingerprint() {
        let mut raw = [0u8; 20];
        raw[12..].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let fp = Fingerprint::new(raw);
        assert_eq!(fp.key_id(), KeyId::from([1, 2, 3, 4, 5, 6, 7, 8]));
        assert_eq!(fp.key_id().to_string(), "0102030405060708");
    }

    #[test]
    fn test_key_id_from_slice() {
        assert!(KeyId::from_slice(&[0u8; 7]).is_err());
        assert!(KeyId::from_slice(&[0u8; 8]).is_ok());
    }
}
