use std::fmt;
use std::rc::Rc;

use super::{check_iv, pkcs7, run, xor, Chain, CipherMode, Direction};
use crate::async_result::AsyncResult;
use crate::errors::{Error, Result};
use crate::registry::SymmetricCipher;

/// Cipher block chaining with PKCS#7 padding.
///
/// Only ciphers with a block size up to 255 bytes can be used, the pad byte
/// has to encode the padding length.
pub struct Cbc {
    cipher: Rc<dyn SymmetricCipher>,
}

impl fmt::Debug for Cbc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cbc")
            .field("cipher", &self.cipher.algorithm())
            .finish()
    }
}

impl Cbc {
    pub fn new(cipher: impl Into<Rc<dyn SymmetricCipher>>) -> Result<Self> {
        let cipher = cipher.into();
        pkcs7::check_block_size(cipher.block_size())?;
        Ok(Self { cipher })
    }
}

impl CipherMode for Cbc {
    fn cipher(&self) -> &Rc<dyn SymmetricCipher> {
        &self.cipher
    }

    fn encrypt(&self, data: &[u8], iv: &[u8]) -> AsyncResult<Vec<u8>> {
        if let Err(err) = check_iv(&*self.cipher, iv) {
            return AsyncResult::err(err);
        }
        let block_size = self.cipher.block_size();
        let data = match pkcs7::encode(block_size, data) {
            Ok(data) => data,
            Err(err) => return AsyncResult::err(err),
        };
        let chain = CbcEncrypt {
            block_size,
            data,
            pos: 0,
            vector: iv.to_vec(),
            out: Vec::new(),
        };
        run(self.cipher.clone(), chain)
    }

    fn decrypt(&self, data: &[u8], iv: &[u8]) -> AsyncResult<Vec<u8>> {
        if let Err(err) = check_iv(&*self.cipher, iv) {
            return AsyncResult::err(err);
        }
        let block_size = self.cipher.block_size();
        if data.is_empty() || data.len() % block_size != 0 {
            return AsyncResult::err(Error::UnpadError);
        }
        let chain = CbcDecrypt {
            block_size,
            data: data.to_vec(),
            pos: 0,
            vector: iv.to_vec(),
            out: Vec::with_capacity(data.len()),
        };
        run(self.cipher.clone(), chain)
    }
}

struct CbcEncrypt {
    block_size: usize,
    data: Vec<u8>,
    pos: usize,
    vector: Vec<u8>,
    out: Vec<u8>,
}

impl Chain for CbcEncrypt {
    fn next_block(&mut self) -> Option<(Direction, Vec<u8>)> {
        let block = self.data.get(self.pos..self.pos + self.block_size)?;
        Some((Direction::Encrypt, xor(block, &self.vector)))
    }

    fn absorb(&mut self, output: Vec<u8>) -> Result<()> {
        self.out.extend_from_slice(&output);
        self.vector = output;
        self.pos += self.block_size;
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        Ok(self.out)
    }
}

struct CbcDecrypt {
    block_size: usize,
    data: Vec<u8>,
    pos: usize,
    vector: Vec<u8>,
    out: Vec<u8>,
}

impl Chain for CbcDecrypt {
    fn next_block(&mut self) -> Option<(Direction, Vec<u8>)> {
        let block = self.data.get(self.pos..self.pos + self.block_size)?;
        Some((Direction::Decrypt, block.to_vec()))
    }

    fn absorb(&mut self, output: Vec<u8>) -> Result<()> {
        let end = self.pos + self.block_size;
        self.out.extend(xor(&output, &self.vector));
        self.vector = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        pkcs7::decode(self.block_size, &self.out).ok_or(Error::UnpadError)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use hex_literal::hex;
    use proptest::prelude::*;

    use super::*;
    use crate::crypto::mode::tests::{aes128, DeferredCipher};
    use crate::crypto::SymmetricKeyAlgorithm;
    use crate::registry::{Algorithm, Key};

    const KEY: [u8; 16] = hex!("2b7e151628aed2a6abf7158809cf4f3c");
    const IV: [u8; 16] = hex!("000102030405060708090a0b0c0d0e0f");

    #[test]
    fn test_sp800_38a_first_block() {
        // F.2.1, the padded second block differs from the vector.
        let cbc = Cbc::new(aes128(&KEY)).unwrap();
        let plaintext = hex!("6bc1bee22e409f96e93d7e117393172a");
        let out = cbc.encrypt(&plaintext, &IV).value().unwrap();
        assert_eq!(out.len(), 32);
        assert_eq!(&out[..16], hex!("7649abac8119b246cee98e9b12e9197d"));
        assert_eq!(cbc.decrypt(&out, &IV).value().unwrap(), plaintext);
    }

    #[test]
    fn test_hi_is_one_block() {
        let cbc = Cbc::new(aes128(&KEY)).unwrap();
        let out = cbc.encrypt(b"hi", &IV).value().unwrap();
        assert_eq!(out.len(), 16);
        assert_eq!(cbc.decrypt(&out, &IV).value().unwrap(), b"hi");
    }

    #[test]
    fn test_bad_iv() {
        let cbc = Cbc::new(aes128(&KEY)).unwrap();
        let res = cbc.encrypt(b"hi", &IV[..8]).value();
        assert!(matches!(res, Err(Error::InvalidArguments { .. })));
    }

    #[test]
    fn test_wrong_key_fails_unpad_or_garbles() {
        let out = Cbc::new(aes128(&KEY)).unwrap().encrypt(b"hi", &IV).value().unwrap();
        let other = Cbc::new(aes128(&[7u8; 16])).unwrap();
        match other.decrypt(&out, &IV).value() {
            Err(err) => assert!(matches!(err, Error::UnpadError)),
            Ok(plain) => assert_ne!(plain, b"hi"),
        }
    }

    #[test]
    fn test_unaligned_ciphertext() {
        let cbc = Cbc::new(aes128(&KEY)).unwrap();
        assert!(matches!(
            cbc.decrypt(&[0u8; 17], &IV).value(),
            Err(Error::UnpadError)
        ));
        assert!(matches!(cbc.decrypt(&[], &IV).value(), Err(Error::UnpadError)));
    }

    #[test]
    fn test_deferred_cipher() {
        let deferred = Rc::new(DeferredCipher {
            inner: aes128(&KEY),
            queue: RefCell::new(Vec::new()),
        });
        let cbc = Cbc::new(deferred.clone() as Rc<dyn SymmetricCipher>).unwrap();
        let data = vec![3u8; 40];

        let res = cbc.encrypt(&data, &IV);
        assert!(res.is_pending());
        assert_eq!(deferred.flush(), 3);

        let expected = Cbc::new(aes128(&KEY)).unwrap().encrypt(&data, &IV).value().unwrap();
        assert_eq!(res.value().unwrap(), expected);
    }

    #[test]
    fn test_oversized_block_rejected() {
        struct Wide;

        impl Algorithm<SymmetricKeyAlgorithm> for Wide {
            fn algorithm(&self) -> SymmetricKeyAlgorithm {
                SymmetricKeyAlgorithm::Other(101)
            }
            fn key_size(&self) -> usize {
                0
            }
            fn key(&self) -> Option<&Key> {
                None
            }
            fn set_key(&mut self, _key: Key) -> Result<()> {
                Ok(())
            }
        }

        impl SymmetricCipher for Wide {
            fn block_size(&self) -> usize {
                256
            }
            fn encrypt(&self, block: &[u8]) -> AsyncResult<Vec<u8>> {
                AsyncResult::ok(block.to_vec())
            }
            fn decrypt(&self, block: &[u8]) -> AsyncResult<Vec<u8>> {
                AsyncResult::ok(block.to_vec())
            }
        }

        let err = Cbc::new(Rc::new(Wide) as Rc<dyn SymmetricCipher>)
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidArguments { .. }));
    }

    proptest! {
        #[test]
        fn roundtrip(data: Vec<u8>, iv: [u8; 16]) {
            let cbc = Cbc::new(aes128(&KEY)).unwrap();
            let out = cbc.encrypt(&data, &iv).value()?;
            prop_assert_eq!(out.len(), (data.len() / 16 + 1) * 16);
            prop_assert_eq!(cbc.decrypt(&out, &iv).value()?, data);
        }
    }
}
