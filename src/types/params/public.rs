use std::io;

use bytes::{Buf, Bytes};

use crate::crypto::PublicKeyAlgorithm;
use crate::errors::{Error, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Mpi;

/// Algorithm specific public key material.
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.5.2>
#[derive(derive_more::Debug, PartialEq, Eq, Clone)]
pub enum PublicParams {
    RSA {
        n: Mpi,
        e: Mpi,
    },
    DSA {
        p: Mpi,
        q: Mpi,
        g: Mpi,
        y: Mpi,
    },
    Elgamal {
        p: Mpi,
        g: Mpi,
        y: Mpi,
    },
    ECDSA {
        #[debug("{}", hex::encode(oid))]
        oid: Bytes,
        q: Mpi,
    },
    EdDSALegacy {
        #[debug("{}", hex::encode(oid))]
        oid: Bytes,
        q: Mpi,
    },
    ECDH {
        #[debug("{}", hex::encode(oid))]
        oid: Bytes,
        p: Mpi,
        /// KDF parameters: reserved octet, hash id, symmetric algorithm id.
        #[debug("{}", hex::encode(kdf))]
        kdf: Bytes,
    },
    /// Algorithms we do not know the layout of, kept verbatim.
    Unknown {
        #[debug("{}", hex::encode(data))]
        data: Bytes,
    },
}

impl PublicParams {
    /// Parses the public parameters for `alg`.
    ///
    /// For unknown algorithms this consumes the rest of the buffer.
    pub fn from_buf<B: Buf>(alg: PublicKeyAlgorithm, mut i: B) -> Result<Self> {
        let params = match alg {
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt | PublicKeyAlgorithm::RSASign => {
                let n = Mpi::from_buf(&mut i)?;
                let e = Mpi::from_buf(&mut i)?;
                PublicParams::RSA { n, e }
            }
            PublicKeyAlgorithm::DSA => {
                let p = Mpi::from_buf(&mut i)?;
                let q = Mpi::from_buf(&mut i)?;
                let g = Mpi::from_buf(&mut i)?;
                let y = Mpi::from_buf(&mut i)?;
                PublicParams::DSA { p, q, g, y }
            }
            PublicKeyAlgorithm::Elgamal | PublicKeyAlgorithm::ElgamalEncrypt => {
                let p = Mpi::from_buf(&mut i)?;
                let g = Mpi::from_buf(&mut i)?;
                let y = Mpi::from_buf(&mut i)?;
                PublicParams::Elgamal { p, g, y }
            }
            PublicKeyAlgorithm::ECDSA => {
                let oid = read_oid(&mut i)?;
                let q = Mpi::from_buf(&mut i)?;
                PublicParams::ECDSA { oid, q }
            }
            PublicKeyAlgorithm::EdDSALegacy => {
                let oid = read_oid(&mut i)?;
                let q = Mpi::from_buf(&mut i)?;
                PublicParams::EdDSALegacy { oid, q }
            }
            PublicKeyAlgorithm::ECDH => {
                let oid = read_oid(&mut i)?;
                let p = Mpi::from_buf(&mut i)?;
                let kdf_len = i.read_u8()?;
                ensure!(kdf_len >= 3, "invalid ECDH KDF parameter length {}", kdf_len);
                let kdf = i.read_take(kdf_len.into())?;
                PublicParams::ECDH { oid, p, kdf }
            }
            PublicKeyAlgorithm::DiffieHellman | PublicKeyAlgorithm::Unknown(_) => {
                PublicParams::Unknown { data: i.rest() }
            }
        };

        Ok(params)
    }

    /// The MPIs of these params, in wire order.
    pub fn mpis(&self) -> Vec<&Mpi> {
        match self {
            PublicParams::RSA { n, e } => vec![n, e],
            PublicParams::DSA { p, q, g, y } => vec![p, q, g, y],
            PublicParams::Elgamal { p, g, y } => vec![p, g, y],
            PublicParams::ECDSA { q, .. } | PublicParams::EdDSALegacy { q, .. } => vec![q],
            PublicParams::ECDH { p, .. } => vec![p],
            PublicParams::Unknown { .. } => Vec::new(),
        }
    }
}

fn read_oid<B: Buf>(i: &mut B) -> Result<Bytes> {
    let len = i.read_u8()?;
    // 0 and 0xFF are reserved for future extensions
    ensure!(len != 0 && len != 0xFF, "invalid curve OID length {}", len);
    Ok(i.read_take(len.into())?)
}

/// Writes a one octet length followed by `data`.
fn write_short_field<W: io::Write>(writer: &mut W, data: &[u8]) -> Result<()> {
    let len = u8::try_from(data.len()).map_err(|_| Error::InvalidInput)?;
    writer.write_all(&[len])?;
    writer.write_all(data)?;
    Ok(())
}

impl Serialize for PublicParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PublicParams::ECDSA { oid, q } | PublicParams::EdDSALegacy { oid, q } => {
                write_short_field(writer, oid)?;
                q.to_writer(writer)?;
            }
            PublicParams::ECDH { oid, p, kdf } => {
                write_short_field(writer, oid)?;
                p.to_writer(writer)?;
                write_short_field(writer, kdf)?;
            }
            PublicParams::Unknown { data } => writer.write_all(data)?,
            _ => {
                for mpi in self.mpis() {
                    mpi.to_writer(writer)?;
                }
            }
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        let mpis: usize = self.mpis().iter().map(|m| m.write_len()).sum();
        match self {
            PublicParams::ECDSA { oid, .. } | PublicParams::EdDSALegacy { oid, .. } => {
                1 + oid.len() + mpis
            }
            PublicParams::ECDH { oid, kdf, .. } => 1 + oid.len() + mpis + 1 + kdf.len(),
            PublicParams::Unknown { data } => data.len(),
            _ => mpis,
        }
    }
}
