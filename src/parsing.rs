//! Parsing functions to parse data using [Buf].

use bytes::{Buf, Bytes};
use snafu::Snafu;

/// Parsing errors
#[derive(Debug, Clone, Snafu)]
pub enum Error {
    #[snafu(display("{}: reading {:?}", context, typ))]
    TooShort {
        typ: Typ,
        context: &'static str,
        source: RemainingError,
    },
}

impl Error {
    /// Returns true if the error indictates that the input was too short.
    pub fn is_incomplete(&self) -> bool {
        match self {
            Self::TooShort { .. } => true,
        }
    }
}

#[derive(Debug, Clone, Snafu)]
#[snafu(display("needed {}, remaining {}", needed, remaining))]
pub struct RemainingError {
    pub needed: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone, Copy)]
pub enum Typ {
    U8,
    U16Be,
    U32Be,
    Array(usize),
    Take(usize),
}

pub trait BufParsing: Buf + Sized {
    fn read_u8(&mut self) -> Result<u8, Error> {
        self.ensure_remaining(1).map_err(|e| Error::TooShort {
            typ: Typ::U8,
            source: e,
            context: "u8",
        })?;
        Ok(self.get_u8())
    }

    fn read_be_u16(&mut self) -> Result<u16, Error> {
        self.ensure_remaining(2).map_err(|e| Error::TooShort {
            typ: Typ::U16Be,
            source: e,
            context: "u16 (be)",
        })?;
        Ok(self.get_u16())
    }

    fn read_be_u32(&mut self) -> Result<u32, Error> {
        self.ensure_remaining(4).map_err(|e| Error::TooShort {
            typ: Typ::U32Be,
            source: e,
            context: "u32 (be)",
        })?;
        Ok(self.get_u32())
    }

    fn read_array<const C: usize>(&mut self) -> Result<[u8; C], Error> {
        self.ensure_remaining(C).map_err(|e| Error::TooShort {
            typ: Typ::Array(C),
            source: e,
            context: "array",
        })?;
        let mut arr = [0u8; C];
        self.copy_to_slice(&mut arr);
        Ok(arr)
    }

    fn read_take(&mut self, size: usize) -> Result<Bytes, Error> {
        self.ensure_remaining(size).map_err(|e| Error::TooShort {
            typ: Typ::Take(size),
            source: e,
            context: "take",
        })?;
        Ok(self.copy_to_bytes(size))
    }

    fn rest(&mut self) -> Bytes {
        let len = self.remaining();
        self.copy_to_bytes(len)
    }

    fn ensure_remaining(&self, size: usize) -> Result<(), RemainingError> {
        if self.remaining() < size {
            return Err(RemainingError {
                needed: size,
                remaining: self.remaining(),
            });
        }

        Ok(())
    }
}

impl<B: Buf> BufParsing for B {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_be() {
        let mut buf = &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07][..];
        assert_eq!(buf.read_u8().unwrap(), 0x01);
        assert_eq!(buf.read_be_u16().unwrap(), 0x0203);
        assert_eq!(buf.read_be_u32().unwrap(), 0x0405_0607);
        assert!(!buf.has_remaining());
    }

    #[test]
    fn test_too_short() {
        let mut buf = &[0x01, 0x02][..];
        let err = buf.read_be_u32().unwrap_err();
        assert!(err.is_incomplete());
        assert_eq!(err.to_string(), "u32 (be): reading U32Be");

        // nothing was consumed
        assert_eq!(buf.remaining(), 2);
        assert!(buf.read_take(3).is_err());
        assert_eq!(&buf.read_take(2).unwrap()[..], &[0x01, 0x02]);
    }
}
