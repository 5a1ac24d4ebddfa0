//! Block cipher modes on top of registry supplied [`SymmetricCipher`]s.
//!
//! Every mode call owns its chaining state (previous ciphertext block or counter)
//! for the duration of that one call. Mode objects only hold the cipher, so they
//! can be reused, but a single call is strictly sequential block by block.
//!
//! The driver asks the cipher for one block at a time. As long as the cipher
//! settles synchronously it loops, a pending block suspends the session until
//! the cipher settles it.

use std::rc::Rc;

use crate::async_result::AsyncResult;
use crate::errors::{Error, Result};
use crate::registry::SymmetricCipher;

mod cbc;
mod cfb;
mod ctr;
mod ocfb;
pub mod pkcs7;

pub use self::cbc::Cbc;
pub use self::cfb::Cfb;
pub use self::ctr::Ctr;
pub use self::ocfb::Ocfb;

pub trait CipherMode {
    /// The underlying block cipher.
    fn cipher(&self) -> &Rc<dyn SymmetricCipher>;

    fn encrypt(&self, data: &[u8], iv: &[u8]) -> AsyncResult<Vec<u8>>;

    fn decrypt(&self, data: &[u8], iv: &[u8]) -> AsyncResult<Vec<u8>>;

    fn block_size(&self) -> usize {
        self.cipher().block_size()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Encrypt,
    Decrypt,
}

/// State of one encrypt or decrypt call.
pub(crate) trait Chain: 'static {
    /// The next input for the block cipher, `None` once all input is consumed.
    fn next_block(&mut self) -> Option<(Direction, Vec<u8>)>;

    /// Consumes the cipher output for the block returned by `next_block`.
    fn absorb(&mut self, output: Vec<u8>) -> Result<()>;

    fn finish(self) -> Result<Vec<u8>>;
}

/// Runs `chain` to completion.
pub(crate) fn run<C: Chain>(cipher: Rc<dyn SymmetricCipher>, chain: C) -> AsyncResult<Vec<u8>> {
    let out = AsyncResult::new();
    drive(cipher, chain, out.clone());
    out
}

fn drive<C: Chain>(cipher: Rc<dyn SymmetricCipher>, mut chain: C, out: AsyncResult<Vec<u8>>) {
    loop {
        let Some((direction, input)) = chain.next_block() else {
            match chain.finish() {
                Ok(output) => out.fulfil(output),
                Err(err) => out.reject(err),
            };
            return;
        };

        let block = match direction {
            Direction::Encrypt => cipher.encrypt(&input),
            Direction::Decrypt => cipher.decrypt(&input),
        };

        match block.try_value() {
            Some(Ok(output)) => {
                let absorbed = check_output(&*cipher, &output).and_then(|_| chain.absorb(output));
                if let Err(err) = absorbed {
                    out.reject(err);
                    return;
                }
            }
            Some(Err(err)) => {
                out.reject(err);
                return;
            }
            None => {
                block.on_settled(move |outcome| {
                    let mut chain = chain;
                    let absorbed = outcome.and_then(|output| {
                        check_output(&*cipher, &output)?;
                        chain.absorb(output)
                    });
                    match absorbed {
                        Ok(()) => drive(cipher, chain, out),
                        Err(err) => {
                            out.reject(err);
                        }
                    }
                });
                return;
            }
        }
    }
}

/// A cipher must answer every block with exactly one block.
fn check_output(cipher: &dyn SymmetricCipher, output: &[u8]) -> Result<()> {
    let block_size = cipher.block_size();
    if output.len() != block_size {
        bail!(
            "{:?} returned {} bytes for a block of {}",
            cipher.algorithm(),
            output.len(),
            block_size
        );
    }
    Ok(())
}

/// Checks the iv against the block size of the cipher.
pub(crate) fn check_iv(cipher: &dyn SymmetricCipher, iv: &[u8]) -> Result<()> {
    let block_size = cipher.block_size();
    if block_size == 0 {
        invalid_args_err!("{:?} has no block size", cipher.algorithm());
    }
    if iv.len() != block_size {
        return Err(Error::InvalidArguments {
            message: format!(
                "IV does not match block size: {} != {}",
                iv.len(),
                block_size
            ),
        });
    }
    Ok(())
}

#[inline]
pub(crate) fn xor(data: &[u8], keystream: &[u8]) -> Vec<u8> {
    data.iter().zip(keystream).map(|(a, b)| a ^ b).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::crypto::SymmetricKeyAlgorithm;
    use crate::registry::{Algorithm, AlgorithmRegistry, Key};

    pub(crate) fn aes128(key: &[u8; 16]) -> Rc<dyn SymmetricCipher> {
        AlgorithmRegistry::with_defaults()
            .symmetric_cipher(SymmetricKeyAlgorithm::AES128, key)
            .unwrap()
            .into()
    }

    /// Tiny one byte block "cipher", for exercising counter widths.
    pub(crate) struct ByteCipher(pub(crate) u8);

    impl Algorithm<SymmetricKeyAlgorithm> for ByteCipher {
        fn algorithm(&self) -> SymmetricKeyAlgorithm {
            SymmetricKeyAlgorithm::Other(100)
        }
        fn key_size(&self) -> usize {
            1
        }
        fn key(&self) -> Option<&Key> {
            None
        }
        fn set_key(&mut self, _key: Key) -> Result<()> {
            Ok(())
        }
    }

    impl SymmetricCipher for ByteCipher {
        fn block_size(&self) -> usize {
            1
        }
        fn encrypt(&self, block: &[u8]) -> AsyncResult<Vec<u8>> {
            AsyncResult::ok(vec![block[0].rotate_left(3) ^ self.0])
        }
        fn decrypt(&self, block: &[u8]) -> AsyncResult<Vec<u8>> {
            AsyncResult::ok(vec![(block[0] ^ self.0).rotate_right(3)])
        }
    }

    /// Wraps a cipher and settles every block only when `flush` is called,
    /// like a hardware backed implementation would.
    pub(crate) struct DeferredCipher {
        pub(crate) inner: Rc<dyn SymmetricCipher>,
        pub(crate) queue: RefCell<Vec<(AsyncResult<Vec<u8>>, AsyncResult<Vec<u8>>)>>,
    }

    impl DeferredCipher {
        pub(crate) fn flush(&self) -> usize {
            let mut count = 0;
            loop {
                let batch: Vec<_> = self.queue.borrow_mut().drain(..).collect();
                if batch.is_empty() {
                    return count;
                }
                for (source, target) in batch {
                    count += 1;
                    match source.value() {
                        Ok(v) => target.fulfil(v),
                        Err(e) => target.reject(e),
                    };
                }
            }
        }

        fn defer(&self, source: AsyncResult<Vec<u8>>) -> AsyncResult<Vec<u8>> {
            let target = AsyncResult::new();
            self.queue.borrow_mut().push((source, target.clone()));
            target
        }
    }

    impl Algorithm<SymmetricKeyAlgorithm> for DeferredCipher {
        fn algorithm(&self) -> SymmetricKeyAlgorithm {
            self.inner.algorithm()
        }
        fn key_size(&self) -> usize {
            self.inner.key_size()
        }
        fn key(&self) -> Option<&Key> {
            self.inner.key()
        }
        fn set_key(&mut self, _key: Key) -> Result<()> {
            unimplemented_err!("deferred cipher")
        }
    }

    impl SymmetricCipher for DeferredCipher {
        fn block_size(&self) -> usize {
            self.inner.block_size()
        }
        fn encrypt(&self, block: &[u8]) -> AsyncResult<Vec<u8>> {
            self.defer(self.inner.encrypt(block))
        }
        fn decrypt(&self, block: &[u8]) -> AsyncResult<Vec<u8>> {
            self.defer(self.inner.decrypt(block))
        }
    }

    /// Answers every block with one byte too few.
    struct ShortCipher;

    impl Algorithm<SymmetricKeyAlgorithm> for ShortCipher {
        fn algorithm(&self) -> SymmetricKeyAlgorithm {
            SymmetricKeyAlgorithm::Other(102)
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

    impl SymmetricCipher for ShortCipher {
        fn block_size(&self) -> usize {
            8
        }
        fn encrypt(&self, block: &[u8]) -> AsyncResult<Vec<u8>> {
            AsyncResult::ok(block[1..].to_vec())
        }
        fn decrypt(&self, block: &[u8]) -> AsyncResult<Vec<u8>> {
            AsyncResult::ok(block[1..].to_vec())
        }
    }

    #[test]
    fn test_short_cipher_output_rejected() {
        let iv = [0u8; 8];
        let data = [1u8; 20];
        let modes: [Box<dyn CipherMode>; 4] = [
            Box::new(Cbc::new(Rc::new(ShortCipher) as Rc<dyn SymmetricCipher>).unwrap()),
            Box::new(Cfb::new(Rc::new(ShortCipher) as Rc<dyn SymmetricCipher>)),
            Box::new(Ctr::new(Rc::new(ShortCipher) as Rc<dyn SymmetricCipher>)),
            Box::new(Ocfb::new(Rc::new(ShortCipher) as Rc<dyn SymmetricCipher>, true)),
        ];
        for mode in modes {
            let err = mode.encrypt(&data, &iv).value().unwrap_err();
            assert!(err.to_string().contains("returned 7 bytes"), "{}", err);
        }
    }

    #[test]
    fn test_short_deferred_output_rejected() {
        let deferred = Rc::new(DeferredCipher {
            inner: Rc::new(ShortCipher),
            queue: RefCell::new(Vec::new()),
        });
        let res = Cfb::new(deferred.clone() as Rc<dyn SymmetricCipher>).encrypt(&[1u8; 20], &[0u8; 8]);
        assert!(res.is_pending());
        deferred.flush();
        assert!(res.value().is_err());
    }

    #[test]
    fn test_xor_truncates_to_data() {
        assert_eq!(xor(&[1, 2], &[3, 3, 3]), vec![2, 1]);
    }

    #[test]
    fn test_check_iv() {
        let cipher = aes128(&[0u8; 16]);
        assert!(check_iv(&*cipher, &[0u8; 16]).is_ok());
        assert!(matches!(
            check_iv(&*cipher, &[0u8; 8]),
            Err(Error::InvalidArguments { .. })
        ));
    }
}
