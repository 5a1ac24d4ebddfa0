//! Binary serialization.
//!
//! Everything that ends up on the wire implements [`Serialize`]. Packets write
//! their body only, [`PacketTrait::to_writer_with_header`](crate::packet::PacketTrait::to_writer_with_header)
//! adds the framing. Blocks write whole packet sequences.

use std::io;

use crate::errors::Result;

pub trait Serialize {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()>;

    /// Exact number of bytes `to_writer` produces.
    fn write_len(&self) -> usize;

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.write_len());
        self.to_writer(&mut buf)?;

        Ok(buf)
    }
}

impl<T: Serialize> Serialize for &T {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        (*self).to_writer(writer)
    }

    fn write_len(&self) -> usize {
        (*self).write_len()
    }
}

/// Elements are written back to back.
impl<T: Serialize> Serialize for [T] {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.iter().try_for_each(|x| x.to_writer(writer))
    }

    fn write_len(&self) -> usize {
        self.iter().map(Serialize::write_len).sum()
    }
}

impl<T: Serialize> Serialize for Vec<T> {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.as_slice().to_writer(writer)
    }

    fn write_len(&self) -> usize {
        self.as_slice().write_len()
    }
}
