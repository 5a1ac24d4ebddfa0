use sha1::{Digest, Sha1};

use crate::errors::Result;

/// Two octet checksum: sum of all octets mod 65536.
#[inline]
pub fn calculate_simple(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u16, |acc, v| acc.wrapping_add(u16::from(*v)))
}

/// Checks a two octet checksum.
pub fn simple(expected: [u8; 2], data: &[u8]) -> Result<()> {
    ensure_eq!(
        u16::from_be_bytes(expected),
        calculate_simple(data),
        "invalid simple checksum"
    );

    Ok(())
}

/// SHA1 checksum, 20 octets.
#[inline]
pub fn calculate_sha1(data: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&Sha1::digest(data));
    out
}
