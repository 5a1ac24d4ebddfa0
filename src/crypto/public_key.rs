use num_enum::{FromPrimitive, IntoPrimitive};

/// Available public key algorithms.
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-9.1>
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, FromPrimitive, IntoPrimitive)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum PublicKeyAlgorithm {
    /// RSA (Encrypt and Sign)
    RSA = 1,
    /// DEPRECATED: RSA (Encrypt-Only)
    RSAEncrypt = 2,
    /// DEPRECATED: RSA (Sign-Only)
    RSASign = 3,
    /// Elgamal (Encrypt-Only)
    ElgamalEncrypt = 16,
    /// DSA (Digital Signature Algorithm)
    DSA = 17,
    /// Elliptic Curve: RFC-6637
    ECDH = 18,
    /// ECDSA: RFC-6637
    ECDSA = 19,
    /// DEPRECATED: Elgamal (Encrypt and Sign)
    Elgamal = 20,
    /// Reserved for Diffie-Hellman (X9.42, as defined for IETF-S/MIME)
    DiffieHellman = 21,
    /// EdDSA legacy format
    EdDSALegacy = 22,

    #[num_enum(catch_all)]
    Unknown(#[cfg_attr(test, proptest(strategy = "100u8.."))] u8),
}

impl PublicKeyAlgorithm {
    /// Number of MPIs holding the secret part of a key for this algorithm.
    pub fn secret_mpi_count(self) -> Option<usize> {
        match self {
            Self::RSA | Self::RSAEncrypt | Self::RSASign => Some(4),
            Self::DSA | Self::ElgamalEncrypt | Self::Elgamal => Some(1),
            Self::ECDH | Self::ECDSA | Self::EdDSALegacy => Some(1),
            Self::DiffieHellman | Self::Unknown(_) => None,
        }
    }

    pub fn can_sign(self) -> bool {
        matches!(
            self,
            Self::RSA | Self::RSASign | Self::DSA | Self::ECDSA | Self::EdDSALegacy | Self::Elgamal
        )
    }

    pub fn can_encrypt(self) -> bool {
        matches!(
            self,
            Self::RSA | Self::RSAEncrypt | Self::ElgamalEncrypt | Self::Elgamal | Self::ECDH
        )
    }
}
