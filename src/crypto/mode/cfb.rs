use std::fmt;
use std::rc::Rc;

use super::{check_iv, run, xor, Chain, CipherMode, Direction};
use crate::async_result::AsyncResult;
use crate::errors::Result;
use crate::registry::SymmetricCipher;

/// Full block cipher feedback. The last block may be partial, no padding is applied.
pub struct Cfb {
    cipher: Rc<dyn SymmetricCipher>,
}

impl fmt::Debug for Cfb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cfb")
            .field("cipher", &self.cipher.algorithm())
            .finish()
    }
}

impl Cfb {
    pub fn new(cipher: impl Into<Rc<dyn SymmetricCipher>>) -> Self {
        Self {
            cipher: cipher.into(),
        }
    }

    fn start(&self, data: &[u8], iv: &[u8], decrypt: bool) -> AsyncResult<Vec<u8>> {
        if let Err(err) = check_iv(&*self.cipher, iv) {
            return AsyncResult::err(err);
        }
        let chain = CfbChain {
            block_size: self.cipher.block_size(),
            decrypt,
            data: data.to_vec(),
            pos: 0,
            feedback: iv.to_vec(),
            out: Vec::with_capacity(data.len()),
        };
        run(self.cipher.clone(), chain)
    }
}

impl CipherMode for Cfb {
    fn cipher(&self) -> &Rc<dyn SymmetricCipher> {
        &self.cipher
    }

    fn encrypt(&self, data: &[u8], iv: &[u8]) -> AsyncResult<Vec<u8>> {
        self.start(data, iv, false)
    }

    fn decrypt(&self, data: &[u8], iv: &[u8]) -> AsyncResult<Vec<u8>> {
        self.start(data, iv, true)
    }
}

struct CfbChain {
    block_size: usize,
    decrypt: bool,
    data: Vec<u8>,
    pos: usize,
    /// Next register content: the iv, then the previous ciphertext block.
    feedback: Vec<u8>,
    out: Vec<u8>,
}

impl Chain for CfbChain {
    fn next_block(&mut self) -> Option<(Direction, Vec<u8>)> {
        if self.pos >= self.data.len() {
            return None;
        }
        // Both directions run the cipher forwards.
        Some((Direction::Encrypt, std::mem::take(&mut self.feedback)))
    }

    fn absorb(&mut self, keystream: Vec<u8>) -> Result<()> {
        let end = (self.pos + self.block_size).min(self.data.len());
        let chunk = &self.data[self.pos..end];
        let processed = xor(chunk, &keystream);

        self.feedback = if self.decrypt {
            chunk.to_vec()
        } else {
            processed.clone()
        };
        self.out.extend(processed);
        self.pos = end;
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        Ok(self.out)
    }
}
