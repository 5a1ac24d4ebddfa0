use num_enum::{FromPrimitive, IntoPrimitive};

/// Available compression algorithms.
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-9.3>
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, FromPrimitive, IntoPrimitive)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum CompressionAlgorithm {
    Uncompressed = 0,
    /// Raw deflate, RFC 1951
    ZIP = 1,
    /// Deflate with zlib framing, RFC 1950
    ZLIB = 2,
    BZip2 = 3,

    #[num_enum(catch_all)]
    Other(#[cfg_attr(test, proptest(strategy = "4u8.."))] u8),
}

impl Default for CompressionAlgorithm {
    fn default() -> Self {
        Self::Uncompressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_catch_all() {
        assert_eq!(CompressionAlgorithm::default(), CompressionAlgorithm::Uncompressed);
        assert_eq!(CompressionAlgorithm::from(2), CompressionAlgorithm::ZLIB);
        assert_eq!(CompressionAlgorithm::from(110), CompressionAlgorithm::Other(110));
        assert_eq!(u8::from(CompressionAlgorithm::Other(110)), 110);
    }
}
