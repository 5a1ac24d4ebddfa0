use std::{fmt, io};

use bytes::Buf;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::{checksum, PublicKeyAlgorithm};
use crate::errors::Result;
use crate::ser::Serialize;
use crate::types::mpi::{mpi_write_len, write_mpi};
use crate::types::Mpi;

/// One secret MPI value, without the length prefix.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretMpi(Vec<u8>);

impl SecretMpi {
    pub fn new(value: &[u8]) -> Self {
        SecretMpi(value.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretMpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretMpi(..)")
    }
}

/// Decrypted secret key material: the algorithm specific MPIs
/// (RSA `d, p, q, u`, DSA and Elgamal `x`, EC curves one scalar).
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PlainSecretParams {
    mpis: Vec<SecretMpi>,
}

impl PlainSecretParams {
    pub fn new(mpis: Vec<SecretMpi>) -> Self {
        PlainSecretParams { mpis }
    }

    /// Parses the secret MPIs of a key using `alg`.
    pub fn from_buf<B: Buf>(alg: PublicKeyAlgorithm, mut i: B) -> Result<Self> {
        let Some(count) = alg.secret_mpi_count() else {
            unsupported_err!("secret key material for {:?}", alg);
        };

        let mut mpis = Vec::with_capacity(count);
        for _ in 0..count {
            let mpi = Mpi::from_buf(&mut i)?;
            mpis.push(SecretMpi::new(mpi.as_ref()));
        }

        Ok(PlainSecretParams { mpis })
    }

    pub fn mpis(&self) -> &[SecretMpi] {
        &self.mpis
    }

    /// The serialized MPIs, without any checksum.
    pub fn to_raw(&self) -> Result<Zeroizing<Vec<u8>>> {
        let mut buf = Zeroizing::new(Vec::with_capacity(self.write_len()));
        self.to_writer(&mut *buf)?;
        Ok(buf)
    }

    pub fn checksum_simple(&self) -> Result<[u8; 2]> {
        let raw = self.to_raw()?;
        Ok(checksum::calculate_simple(&raw).to_be_bytes())
    }

    pub fn checksum_sha1(&self) -> Result<[u8; 20]> {
        let raw = self.to_raw()?;
        Ok(checksum::calculate_sha1(&raw))
    }
}

impl Serialize for PlainSecretParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        for mpi in &self.mpis {
            write_mpi(mpi.as_bytes(), writer)?;
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.mpis.iter().map(|m| mpi_write_len(m.as_bytes())).sum()
    }
}

impl fmt::Debug for PlainSecretParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlainSecretParams({} mpis)", self.mpis.len())
    }
}
