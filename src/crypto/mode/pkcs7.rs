//! PKCS#7 padding, as used by CBC.

use crate::errors::{Error, Result};

/// Largest block size a single pad byte can describe.
pub const MAX_BLOCK_SIZE: usize = 255;

/// Fails unless `block_size` is in `1..=255`.
pub fn check_block_size(block_size: usize) -> Result<()> {
    if block_size == 0 || block_size > MAX_BLOCK_SIZE {
        return Err(Error::InvalidArguments {
            message: format!("PKCS#7 needs a block size of 1 to 255, got {}", block_size),
        });
    }
    Ok(())
}

/// Pads `data` to a multiple of `block_size`. A full block of padding is added
/// when `data` is already aligned.
pub fn encode(block_size: usize, data: &[u8]) -> Result<Vec<u8>> {
    check_block_size(block_size)?;
    let pad = block_size - data.len() % block_size;
    let pad_byte = u8::try_from(pad)?;
    let mut out = Vec::with_capacity(data.len() + pad);
    out.extend_from_slice(data);
    out.resize(data.len() + pad, pad_byte);
    Ok(out)
}

/// Strips the padding added by [`encode`].
///
/// Returns `None` if the padding is malformed. All checks are evaluated before
/// deciding, the result does not reveal which one failed.
pub fn decode(block_size: usize, data: &[u8]) -> Option<Vec<u8>> {
    if block_size == 0 {
        return None;
    }
    let last = *data.last()?;
    let pad = usize::from(last);

    let mut invalid = pad > data.len();
    invalid |= pad > block_size;
    invalid |= pad == 0;
    invalid |= data.len() % block_size != 0;

    let start = data.len().saturating_sub(pad);
    invalid |= data[start..].iter().fold(0u8, |acc, b| acc | (b ^ last)) != 0;

    if invalid {
        None
    } else {
        Some(data[..start].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode(4, b"abc").unwrap(), b"abc\x01");
        assert_eq!(encode(4, b"abcd").unwrap(), b"abcd\x04\x04\x04\x04");
        assert_eq!(encode(4, b"").unwrap(), b"\x04\x04\x04\x04");
    }

    #[test]
    fn test_block_size_limits() {
        let padded = encode(255, b"x").unwrap();
        assert_eq!(padded.len(), 255);
        assert!(padded[1..].iter().all(|b| *b == 254));
        assert_eq!(decode(255, &padded).unwrap(), b"x");

        assert!(matches!(encode(256, b"x"), Err(Error::InvalidArguments { .. })));
        assert!(matches!(encode(0, b"x"), Err(Error::InvalidArguments { .. })));
    }

    #[test]
    fn test_decode_rejects() {
        // zero pad byte
        assert_eq!(decode(4, b"abc\x00"), None);
        // pad longer than a block
        assert_eq!(decode(4, b"abcdefg\x05"), None);
        // pad longer than the data
        assert_eq!(decode(8, b"ab\x03"), None);
        // not block aligned
        assert_eq!(decode(4, b"abcde\x01"), None);
        // inconsistent pad bytes
        assert_eq!(decode(4, b"ab\x01\x02"), None);
        assert_eq!(decode(4, b""), None);
    }

    #[test]
    fn test_decode_full_pad_block() {
        assert_eq!(decode(4, b"abcd\x04\x04\x04\x04").unwrap(), b"abcd");
    }

    proptest! {
        #[test]
        fn pad_unpad(data: Vec<u8>, block_size in 1usize..=MAX_BLOCK_SIZE) {
            let padded = encode(block_size, &data)?;
            prop_assert_eq!(padded.len() % block_size, 0);
            prop_assert!(padded.len() > data.len());
            prop_assert_eq!(decode(block_size, &padded).unwrap(), data);
        }
    }
}
