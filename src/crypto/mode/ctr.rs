use std::fmt;
use std::rc::Rc;

use super::{check_iv, run, xor, Chain, CipherMode, Direction};
use crate::async_result::AsyncResult;
use crate::errors::{Error, Result};
use crate::registry::SymmetricCipher;

/// Counter mode. The iv is the initial counter block, incremented as a
/// big-endian integer after every block.
///
/// A counter of `w` bytes can produce `2^(8w) - 1` keystream blocks before it
/// would come back around to the iv, longer inputs fail with `CounterOverflow`.
pub struct Ctr {
    cipher: Rc<dyn SymmetricCipher>,
}

impl fmt::Debug for Ctr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctr")
            .field("cipher", &self.cipher.algorithm())
            .finish()
    }
}

impl Ctr {
    pub fn new(cipher: impl Into<Rc<dyn SymmetricCipher>>) -> Self {
        Self {
            cipher: cipher.into(),
        }
    }

    fn apply(&self, data: &[u8], iv: &[u8]) -> AsyncResult<Vec<u8>> {
        if let Err(err) = check_iv(&*self.cipher, iv) {
            return AsyncResult::err(err);
        }
        let block_size = self.cipher.block_size();
        let blocks = data.len().div_ceil(block_size) as u128;
        if block_size < 16 && blocks >= 1u128 << (8 * block_size) {
            return AsyncResult::err(Error::CounterOverflow);
        }

        let chain = CtrChain {
            block_size,
            data: data.to_vec(),
            pos: 0,
            counter: iv.to_vec(),
            out: Vec::with_capacity(data.len()),
        };
        run(self.cipher.clone(), chain)
    }
}

impl CipherMode for Ctr {
    fn cipher(&self) -> &Rc<dyn SymmetricCipher> {
        &self.cipher
    }

    fn encrypt(&self, data: &[u8], iv: &[u8]) -> AsyncResult<Vec<u8>> {
        self.apply(data, iv)
    }

    fn decrypt(&self, data: &[u8], iv: &[u8]) -> AsyncResult<Vec<u8>> {
        self.apply(data, iv)
    }
}

struct CtrChain {
    block_size: usize,
    data: Vec<u8>,
    pos: usize,
    counter: Vec<u8>,
    out: Vec<u8>,
}

impl Chain for CtrChain {
    fn next_block(&mut self) -> Option<(Direction, Vec<u8>)> {
        if self.pos >= self.data.len() {
            return None;
        }
        Some((Direction::Encrypt, self.counter.clone()))
    }

    fn absorb(&mut self, keystream: Vec<u8>) -> Result<()> {
        let end = (self.pos + self.block_size).min(self.data.len());
        self.out.extend(xor(&self.data[self.pos..end], &keystream));
        self.pos = end;
        increment(&mut self.counter);
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        Ok(self.out)
    }
}

/// Big-endian increment, wrapping on overflow.
fn increment(counter: &mut [u8]) {
    for byte in counter.iter_mut().rev() {
        let (next, carry) = byte.overflowing_add(1);
        *byte = next;
        if !carry {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;

    use super::*;
    use crate::crypto::mode::tests::{aes128, ByteCipher};

    const KEY: [u8; 16] = hex!("2b7e151628aed2a6abf7158809cf4f3c");

    #[test]
    fn test_increment() {
        let mut c = [0x00, 0xff, 0xff];
        increment(&mut c);
        assert_eq!(c, [0x01, 0x00, 0x00]);

        let mut c = [0xff, 0xff];
        increment(&mut c);
        assert_eq!(c, [0x00, 0x00]);
    }

    #[test]
    fn test_sp800_38a_ctr() {
        let ctr = Ctr::new(aes128(&KEY));
        let iv = hex!("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff");
        let plaintext = hex!(
            "6bc1bee22e409f96e93d7e117393172a"
            "ae2d8a571e03ac9c9eb76fac45af8e51"
        );
        let expected = hex!(
            "874d6191b620e3261bef6864990db6ce"
            "9806f66b7970fdff8617187bb9fffdff"
        );
        let out = ctr.encrypt(&plaintext, &iv).value().unwrap();
        assert_eq!(out, expected);
        assert_eq!(ctr.decrypt(&out, &iv).value().unwrap(), plaintext);
    }

    #[test]
    fn test_counter_exhaustion() {
        let ctr = Ctr::new(Rc::new(ByteCipher(0x5a)) as Rc<dyn SymmetricCipher>);
        let iv = [0x10];

        let max = vec![0u8; 255];
        let out = ctr.encrypt(&max, &iv).value().unwrap();
        assert_eq!(ctr.decrypt(&out, &iv).value().unwrap(), max);

        let too_long = vec![0u8; 256];
        assert!(matches!(
            ctr.encrypt(&too_long, &iv).value(),
            Err(Error::CounterOverflow)
        ));
    }

    #[test]
    fn test_iv_must_match_block_size() {
        let ctr = Ctr::new(aes128(&KEY));
        assert!(matches!(
            ctr.encrypt(b"abc", &[0u8; 15]).value(),
            Err(Error::InvalidArguments { .. })
        ));
    }

    proptest! {
        #[test]
        fn roundtrip(data: Vec<u8>, iv: [u8; 16]) {
            let ctr = Ctr::new(aes128(&KEY));
            let out = ctr.encrypt(&data, &iv).value()?;
            prop_assert_eq!(out.len(), data.len());
            prop_assert_eq!(ctr.decrypt(&out, &iv).value()?, data);
        }
    }
}
