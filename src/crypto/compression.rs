use std::io::{Read, Write};

use flate2::{
    read::{DeflateDecoder, ZlibDecoder},
    write::{DeflateEncoder, ZlibEncoder},
    Compression as Level,
};
use log::debug;

use crate::async_result::AsyncResult;
use crate::errors::{Error, Result};
use crate::registry::{Algorithm, Compression, Constructor, Key, Registry};
use crate::types::CompressionAlgorithm;

/// Adds the built in compression algorithms to `registry`.
pub fn register_defaults(registry: &mut Registry<dyn Compression, CompressionAlgorithm>) {
    registry.add(Constructor::new(CompressionAlgorithm::Uncompressed, build), None);
    registry.add(Constructor::new(CompressionAlgorithm::ZIP, build), None);
    registry.add(Constructor::new(CompressionAlgorithm::ZLIB, build), None);
    #[cfg(feature = "bzip2")]
    registry.add(Constructor::new(CompressionAlgorithm::BZip2, build), None);
}

fn build(alg: CompressionAlgorithm, key: Option<&Key>) -> Result<Box<dyn Compression>> {
    if key.is_some() {
        invalid_args_err!("compression {:?} takes no key", alg);
    }
    match alg {
        CompressionAlgorithm::Uncompressed | CompressionAlgorithm::ZIP | CompressionAlgorithm::ZLIB => {
            Ok(Box::new(Codec { alg }))
        }
        #[cfg(feature = "bzip2")]
        CompressionAlgorithm::BZip2 => Ok(Box::new(Codec { alg })),
        _ => unsupported_err!("compression algorithm {:?}", alg),
    }
}

struct Codec {
    alg: CompressionAlgorithm,
}

impl Codec {
    fn compress_sync(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        match self.alg {
            CompressionAlgorithm::ZIP => {
                let mut enc = DeflateEncoder::new(Vec::new(), Level::default());
                enc.write_all(data)?;
                enc.finish()
            }
            CompressionAlgorithm::ZLIB => {
                let mut enc = ZlibEncoder::new(Vec::new(), Level::default());
                enc.write_all(data)?;
                enc.finish()
            }
            #[cfg(feature = "bzip2")]
            CompressionAlgorithm::BZip2 => {
                let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
                enc.write_all(data)?;
                enc.finish()
            }
            _ => Ok(data.to_vec()),
        }
    }

    fn decompress_sync(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut out = Vec::new();
        match self.alg {
            CompressionAlgorithm::ZIP => {
                DeflateDecoder::new(data).read_to_end(&mut out)?;
            }
            CompressionAlgorithm::ZLIB => {
                ZlibDecoder::new(data).read_to_end(&mut out)?;
            }
            #[cfg(feature = "bzip2")]
            CompressionAlgorithm::BZip2 => {
                bzip2::read::BzDecoder::new(data).read_to_end(&mut out)?;
            }
            _ => out.extend_from_slice(data),
        }
        Ok(out)
    }
}

fn compression_error(alg: CompressionAlgorithm, err: std::io::Error) -> Error {
    Error::Compression {
        message: format!("{:?}: {}", alg, err),
    }
}

impl Algorithm<CompressionAlgorithm> for Codec {
    fn algorithm(&self) -> CompressionAlgorithm {
        self.alg
    }

    fn key_size(&self) -> usize {
        0
    }

    fn key(&self) -> Option<&Key> {
        None
    }

    fn set_key(&mut self, _key: Key) -> Result<()> {
        invalid_args_err!("compression {:?} takes no key", self.alg)
    }
}

impl Compression for Codec {
    fn compress(&self, data: &[u8]) -> AsyncResult<Vec<u8>> {
        debug!("compressing {} bytes with {:?}", data.len(), self.alg);
        self.compress_sync(data)
            .map_err(|err| compression_error(self.alg, err))
            .into()
    }

    fn decompress(&self, data: &[u8]) -> AsyncResult<Vec<u8>> {
        debug!("decompressing {} bytes with {:?}", data.len(), self.alg);
        self.decompress_sync(data)
            .map_err(|err| compression_error(self.alg, err))
            .into()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::registry::AlgorithmRegistry;

    fn algorithms() -> Vec<CompressionAlgorithm> {
        AlgorithmRegistry::with_defaults()
            .compression
            .available()
            .to_vec()
    }

    #[test]
    fn test_uncompressed_is_identity() {
        let registry = AlgorithmRegistry::with_defaults();
        let c = registry.compressor(CompressionAlgorithm::Uncompressed).unwrap();
        assert_eq!(c.compress(b"hello").value().unwrap(), b"hello");
        assert_eq!(c.decompress(b"hello").value().unwrap(), b"hello");
    }

    #[test]
    fn test_garbage_is_rejected() {
        let registry = AlgorithmRegistry::with_defaults();
        let c = registry.compressor(CompressionAlgorithm::ZLIB).unwrap();
        let err = c.decompress(&[0xFF, 0xFF, 0xFF, 0xFF]).value().unwrap_err();
        assert!(matches!(err, Error::Compression { .. }));
    }

    #[test]
    fn test_unknown_algorithm() {
        let registry = AlgorithmRegistry::with_defaults();
        assert!(registry.compressor(CompressionAlgorithm::Other(42)).is_err());
    }

    proptest! {
        #[test]
        fn compress_roundtrip(
            alg in prop::sample::select(algorithms()),
            data in prop::collection::vec(any::<u8>(), 0..2048),
        ) {
            let registry = AlgorithmRegistry::with_defaults();
            let c = registry.compressor(alg)?;
            let packed = c.compress(&data).value()?;
            prop_assert_eq!(c.decompress(&packed).value()?, data);
        }
    }
}
