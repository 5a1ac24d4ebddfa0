use std::fmt;
use std::rc::Rc;

use rand::{CryptoRng, Rng};

use super::{CipherMode, Cfb};
use crate::async_result::AsyncResult;
use crate::errors::{Error, Result};
use crate::registry::SymmetricCipher;

/// OpenPGP's CFB variant.
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-13.9>
///
/// The plaintext is preceded by one block of random bytes plus a repeat of
/// its last two bytes. With `resync` the feedback register is reloaded from
/// the ciphertext after that prefix, as Symmetrically Encrypted Data packets
/// do. Without it the whole stream is plain CFB, as used inside integrity
/// protected packets.
///
/// The `iv` given to [`CipherMode`] methods must be empty or a full block, an
/// empty iv stands for the all zero block OpenPGP mandates.
pub struct Ocfb {
    cfb: Cfb,
    resync: bool,
}

impl fmt::Debug for Ocfb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ocfb")
            .field("cipher", &self.cfb.cipher().algorithm())
            .field("resync", &self.resync)
            .finish()
    }
}

impl Ocfb {
    pub fn new(cipher: impl Into<Rc<dyn SymmetricCipher>>, resync: bool) -> Self {
        Self {
            cfb: Cfb::new(cipher),
            resync,
        }
    }

    pub fn resync(&self) -> bool {
        self.resync
    }

    fn initial_vector(&self, iv: &[u8]) -> Vec<u8> {
        if iv.is_empty() {
            vec![0u8; self.block_size()]
        } else {
            iv.to_vec()
        }
    }

    /// Length of the prefix including the two check bytes.
    pub fn prefix_len(&self) -> usize {
        self.block_size() + 2
    }

    /// Encrypts `data` behind a fresh random prefix.
    pub fn encrypt_with_rng<R: CryptoRng + Rng>(
        &self,
        rng: &mut R,
        data: &[u8],
        iv: &[u8],
    ) -> AsyncResult<Vec<u8>> {
        let mut prefix = vec![0u8; self.block_size()];
        rng.fill(&mut prefix[..]);
        self.encrypt_with_prefix(&prefix, data, iv)
    }

    /// Encrypts `data` behind the given one block `prefix`.
    pub fn encrypt_with_prefix(&self, prefix: &[u8], data: &[u8], iv: &[u8]) -> AsyncResult<Vec<u8>> {
        let bs = self.block_size();
        if prefix.len() != bs || bs < 2 {
            return AsyncResult::err(Error::InvalidArguments {
                message: format!("prefix must be one block of {} bytes", bs),
            });
        }
        let mut full_prefix = Vec::with_capacity(bs + 2 + data.len());
        full_prefix.extend_from_slice(prefix);
        full_prefix.extend_from_slice(&prefix[bs - 2..]);

        let iv = self.initial_vector(iv);
        if !self.resync {
            full_prefix.extend_from_slice(data);
            return self.cfb.encrypt(&full_prefix, &iv);
        }

        let cfb = Cfb::new(self.cfb.cipher().clone());
        let data = data.to_vec();
        self.cfb
            .encrypt(&full_prefix, &iv)
            .add_async_callback(move |encrypted_prefix| {
                let resync_iv = encrypted_prefix[2..].to_vec();
                cfb.encrypt(&data, &resync_iv)
                    .add_callback(move |body| Ok([encrypted_prefix, body].concat()))
            })
    }

    /// Decrypts `data`, returning the prefix followed by the plaintext.
    ///
    /// The check bytes are not verified.
    pub fn decrypt_with_prefix(&self, data: &[u8], iv: &[u8]) -> AsyncResult<Vec<u8>> {
        if let Err(err) = self.check_len(data) {
            return AsyncResult::err(err);
        }
        let iv = self.initial_vector(iv);
        if !self.resync {
            return self.cfb.decrypt(data, &iv);
        }

        let split = self.prefix_len();
        let body = self.decrypt(data, &iv);
        self.cfb
            .decrypt(&data[..split], &iv)
            .add_async_callback(move |prefix| {
                body.add_callback(move |body| Ok([prefix, body].concat()))
            })
    }

    fn check_len(&self, data: &[u8]) -> Result<()> {
        ensure!(
            data.len() >= self.prefix_len(),
            "ciphertext too short: {} < {}",
            data.len(),
            self.prefix_len()
        );
        Ok(())
    }
}

impl CipherMode for Ocfb {
    fn cipher(&self) -> &Rc<dyn SymmetricCipher> {
        self.cfb.cipher()
    }

    /// Encrypts with a random prefix from the thread rng.
    fn encrypt(&self, data: &[u8], iv: &[u8]) -> AsyncResult<Vec<u8>> {
        self.encrypt_with_rng(&mut rand::thread_rng(), data, iv)
    }

    /// Decrypts and strips the prefix.
    fn decrypt(&self, data: &[u8], iv: &[u8]) -> AsyncResult<Vec<u8>> {
        if let Err(err) = self.check_len(data) {
            return AsyncResult::err(err);
        }
        let split = self.prefix_len();
        if self.resync {
            return self.cfb.decrypt(&data[split..], &data[2..split]);
        }
        self.cfb
            .decrypt(data, &self.initial_vector(iv))
            .add_callback(move |mut plain| Ok(plain.split_off(split)))
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::mode::tests::aes128;

    const KEY: [u8; 16] = hex!("000102030405060708090a0b0c0d0e0f");

    #[test]
    fn test_prefix_repeats_last_two_bytes() {
        let ocfb = Ocfb::new(aes128(&KEY), true);
        let prefix: Vec<u8> = (0..16).collect();
        let out = ocfb.encrypt_with_prefix(&prefix, b"hello", &[]).value().unwrap();
        assert_eq!(out.len(), 18 + 5);

        let full = ocfb.decrypt_with_prefix(&out, &[]).value().unwrap();
        assert_eq!(&full[..16], &prefix[..]);
        assert_eq!(&full[16..18], &[14, 15]);
        assert_eq!(&full[18..], b"hello");
    }

    #[test]
    fn test_resync_differs_from_plain_cfb() {
        let prefix = [9u8; 16];
        let data = [1u8; 40];
        let resync = Ocfb::new(aes128(&KEY), true)
            .encrypt_with_prefix(&prefix, &data, &[])
            .value()
            .unwrap();
        let plain = Ocfb::new(aes128(&KEY), false)
            .encrypt_with_prefix(&prefix, &data, &[])
            .value()
            .unwrap();

        // identical prefix encryption, different body
        assert_eq!(resync[..18], plain[..18]);
        assert_ne!(resync[18..], plain[18..]);
    }

    #[test]
    fn test_non_resync_is_cfb_with_zero_iv() {
        let prefix = [3u8; 16];
        let ocfb = Ocfb::new(aes128(&KEY), false);
        let out = ocfb.encrypt_with_prefix(&prefix, b"data", &[]).value().unwrap();

        let mut expected_plain = prefix.to_vec();
        expected_plain.extend_from_slice(&[3, 3]);
        expected_plain.extend_from_slice(b"data");
        let expected = Cfb::new(aes128(&KEY))
            .encrypt(&expected_plain, &[0u8; 16])
            .value()
            .unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_too_short() {
        let ocfb = Ocfb::new(aes128(&KEY), true);
        assert!(ocfb.decrypt(&[0u8; 17], &[]).value().is_err());
    }

    #[test]
    fn test_bad_prefix() {
        let ocfb = Ocfb::new(aes128(&KEY), true);
        assert!(matches!(
            ocfb.encrypt_with_prefix(&[0u8; 8], b"x", &[]).value(),
            Err(Error::InvalidArguments { .. })
        ));
    }

    proptest! {
        #[test]
        fn roundtrip(data: Vec<u8>, resync: bool, seed: u64) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let ocfb = Ocfb::new(aes128(&KEY), resync);
            let out = ocfb.encrypt_with_rng(&mut rng, &data, &[]).value()?;
            prop_assert_eq!(out.len(), data.len() + 18);
            prop_assert_eq!(ocfb.decrypt(&out, &[]).value()?, data);
        }
    }
}
