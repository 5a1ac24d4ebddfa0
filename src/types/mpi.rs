use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, Bytes};

use crate::errors::{Error, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;

/// Number of bits we accept when reading or writing MPIs.
/// The value is the same as gnupgs.
pub const MAX_EXTERN_MPI_BITS: u16 = 16384;

/// A multiprecision integer: a big-endian unsigned integer, prefixed on the
/// wire with its length in bits.
///
/// Parsing keeps the bytes exactly as declared, including any leading zero
/// bytes of a non-minimal encoding. Serialization always writes the minimal
/// encoding.
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-3.2>
#[derive(Default, Clone, PartialEq, Eq, derive_more::Debug)]
pub struct Mpi(#[debug("{}", hex::encode(_0))] Bytes);

impl Mpi {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses the given buffer as an MPI.
    ///
    /// The buffer is expected to be length-prefixed.
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let len_bits = i.read_be_u16()?;

        if len_bits > MAX_EXTERN_MPI_BITS {
            return Err(Error::InvalidInput);
        }

        let len_bytes = (usize::from(len_bits) + 7) >> 3;
        let n = i.read_take(len_bytes)?;

        Ok(Mpi(n))
    }

    /// Represent the data in `raw` as an Mpi.
    /// Note that `raw` is not expected to be length-prefixed!
    ///
    /// Strips leading zeros.
    pub fn from_slice(raw: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(strip_leading_zeros(raw)))
    }

    /// The minimal big-endian encoding of the value.
    pub fn as_minimal(&self) -> &[u8] {
        strip_leading_zeros(&self.0)
    }

    /// Returns true if the stored bytes carry no leading zero byte.
    pub fn is_minimal(&self) -> bool {
        self.0.first() != Some(&0)
    }

    /// Number of significant bits in the value.
    pub fn bit_size(&self) -> usize {
        bit_size(self.as_minimal())
    }
}

/// Returns the bit length of a given slice.
#[inline]
fn bit_size(val: &[u8]) -> usize {
    if val.is_empty() {
        0
    } else {
        (val.len() * 8) - val[0].leading_zeros() as usize
    }
}

#[inline]
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    bytes
        .iter()
        .position(|b| b != &0)
        .map_or(&[], |offset| &bytes[offset..])
}

impl AsRef<[u8]> for Mpi {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl From<&[u8]> for Mpi {
    fn from(raw: &[u8]) -> Self {
        Mpi::from_slice(raw)
    }
}

impl Serialize for Mpi {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        write_mpi(self.as_minimal(), w)
    }

    fn write_len(&self) -> usize {
        2 + self.as_minimal().len()
    }
}

/// Writes `bytes` as an MPI, dropping leading zeros.
///
/// Used for values that must not be copied into an [`Mpi`], like secret key material.
pub(crate) fn write_mpi<W: io::Write>(bytes: &[u8], w: &mut W) -> Result<()> {
    let bytes = strip_leading_zeros(bytes);
    let size = bit_size(bytes);
    ensure!(
        size <= usize::from(MAX_EXTERN_MPI_BITS),
        "mpi of {} bits is too large",
        size
    );
    w.write_u16::<BigEndian>(size as u16)?;
    w.write_all(bytes)?;

    Ok(())
}

/// Reads MPIs until the buffer is exhausted.
pub(crate) fn read_mpis<B: Buf>(mut i: B) -> Result<Vec<Mpi>> {
    let mut mpis = Vec::new();
    while i.has_remaining() {
        mpis.push(Mpi::from_buf(&mut i)?);
    }
    Ok(mpis)
}

pub(crate) fn mpi_write_len(bytes: &[u8]) -> usize {
    2 + strip_leading_zeros(bytes).len()
}
