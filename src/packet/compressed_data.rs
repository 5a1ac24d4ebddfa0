use std::io;

use bytes::{Buf, Bytes};
use log::debug;

use crate::async_result::AsyncResult;
use crate::errors::Result;
use crate::packet::{PacketHeader, PacketTrait};
use crate::parsing::BufParsing;
use crate::registry::AlgorithmRegistry;
use crate::ser::Serialize;
use crate::types::{CompressionAlgorithm, Tag};

/// Compressed Data Packet
/// <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.6>
#[derive(derive_more::Debug, Clone, PartialEq, Eq)]
pub struct CompressedData {
    packet_header: PacketHeader,
    compression_algorithm: CompressionAlgorithm,
    #[debug("{}", hex::encode(compressed_data))]
    compressed_data: Bytes,
}

impl CompressedData {
    /// Parses a `CompressedData` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_header: PacketHeader, mut input: B) -> Result<Self> {
        ensure_eq!(packet_header.tag(), Tag::CompressedData, "invalid tag");

        let alg = input.read_u8()?.into();
        Ok(CompressedData {
            packet_header,
            compression_algorithm: alg,
            compressed_data: input.rest(),
        })
    }

    /// Wraps already compressed data.
    pub fn from_compressed(alg: CompressionAlgorithm, data: impl Into<Bytes>) -> Result<Self> {
        let compressed_data = data.into();
        let packet_header = PacketHeader::for_body(Tag::CompressedData, 1 + compressed_data.len())?;
        Ok(CompressedData {
            packet_header,
            compression_algorithm: alg,
            compressed_data,
        })
    }

    /// Compresses `data` with the registered implementation of `alg`.
    pub fn compress(
        registry: &AlgorithmRegistry,
        alg: CompressionAlgorithm,
        data: &[u8],
    ) -> AsyncResult<Self> {
        let compressor = match registry.compressor(alg) {
            Ok(c) => c,
            Err(err) => return AsyncResult::err(err),
        };
        compressor
            .compress(data)
            .add_callback(move |compressed| Self::from_compressed(alg, compressed))
    }

    /// Decompresses the payload with the registered implementation.
    pub fn decompress(&self, registry: &AlgorithmRegistry) -> AsyncResult<Vec<u8>> {
        debug!(
            "decompressing {} bytes ({:?})",
            self.compressed_data.len(),
            self.compression_algorithm
        );
        match registry.compressor(self.compression_algorithm) {
            Ok(c) => c.decompress(&self.compressed_data),
            Err(err) => AsyncResult::err(err),
        }
    }

    pub fn compression_algorithm(&self) -> CompressionAlgorithm {
        self.compression_algorithm
    }

    pub fn compressed_data(&self) -> &Bytes {
        &self.compressed_data
    }
}

impl Serialize for CompressedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.compression_algorithm.into()])?;
        writer.write_all(&self.compressed_data)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + self.compressed_data.len()
    }
}

impl PacketTrait for CompressedData {
    fn packet_header(&self) -> &PacketHeader {
        &self.packet_header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_decompress() {
        let registry = AlgorithmRegistry::with_defaults();
        let data = b"hello hello hello hello hello".to_vec();

        for alg in [
            CompressionAlgorithm::Uncompressed,
            CompressionAlgorithm::ZIP,
            CompressionAlgorithm::ZLIB,
        ] {
            let packet = CompressedData::compress(&registry, alg, &data).value().unwrap();
            assert_eq!(packet.compression_algorithm(), alg);

            let bytes = packet.to_bytes().unwrap();
            assert_eq!(bytes[0], u8::from(alg));
            let back = CompressedData::from_buf(*packet.packet_header(), &bytes[..]).unwrap();
            assert_eq!(back, packet);
            assert_eq!(back.decompress(&registry).value().unwrap(), data);
        }
    }

    #[test]
    fn test_unknown_algorithm() {
        let registry = AlgorithmRegistry::with_defaults();
        let packet = CompressedData::from_compressed(CompressionAlgorithm::Other(42), &b"x"[..])
            .unwrap();
        let err = packet.decompress(&registry).value().unwrap_err();
        assert!(matches!(
            err,
            crate::errors::Error::AlgorithmNotAvailable { .. }
        ));
    }

    #[test]
    fn test_empty_body() {
        let header = PacketHeader::new_fixed(Tag::CompressedData, 0);
        assert!(CompressedData::from_buf(header, &[][..]).is_err());
    }
}
