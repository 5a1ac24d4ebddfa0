use num_enum::{FromPrimitive, IntoPrimitive};

/// Represents the packet length.
#[derive(derive_more::Debug, PartialEq, Eq, Clone, Copy)]
pub enum PacketLength {
    Fixed(u32),
    /// Old format length type 3: the packet extends to the end of the input.
    Indeterminate,
    Partial(u32),
}

impl PacketLength {
    /// Returns the length in bytes, if it is specified.
    pub fn maybe_len(&self) -> Option<u32> {
        match self {
            Self::Fixed(len) => Some(*len),
            Self::Indeterminate => None,
            Self::Partial(len) => Some(*len),
        }
    }
}

/// Packet tag, see <https://www.rfc-editor.org/rfc/rfc4880.html#section-4.3>
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, FromPrimitive, IntoPrimitive)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[repr(u8)]
#[non_exhaustive]
pub enum Tag {
    /// Public-Key Encrypted Session Key Packet
    PublicKeyEncryptedSessionKey = 1,
    /// Signature Packet
    Signature = 2,
    /// Symmetric-Key Encrypted Session Key Packet
    SymKeyEncryptedSessionKey = 3,
    /// One-Pass Signature Packet
    OnePassSignature = 4,
    /// Secret-Key Packet
    SecretKey = 5,
    /// Public-Key Packet
    PublicKey = 6,
    /// Secret-Subkey Packet
    SecretSubkey = 7,
    /// Compressed Data Packet
    CompressedData = 8,
    /// Symmetrically Encrypted Data Packet
    SymEncryptedData = 9,
    /// Marker Packet
    Marker = 10,
    /// Literal Data Packet
    LiteralData = 11,
    /// Trust Packet
    Trust = 12,
    /// User ID Packet
    UserId = 13,
    /// Public-Subkey Packet
    PublicSubkey = 14,
    /// User Attribute Packet
    UserAttribute = 17,
    /// Sym. Encrypted and Integrity Protected Data Packet
    SymEncryptedProtectedData = 18,
    /// Modification Detection Code Packet
    ModDetectionCode = 19,

    #[num_enum(catch_all)]
    #[cfg_attr(test, proptest(skip))]
    Other(u8),
}

impl Tag {
    /// Tags 60 to 63 are reserved for private or experimental use.
    pub fn is_private(self) -> bool {
        matches!(self, Tag::Other(60..=63))
    }

    /// Packets that carry no semantics for the engine and are dropped while packetizing.
    pub fn is_ignored(self) -> bool {
        self == Tag::Marker || self.is_private()
    }
}

/// The version of the packet format.
///
/// There are two packet formats
/// (see <https://www.rfc-editor.org/rfc/rfc4880.html#section-4.2>):
/// the (current) OpenPGP packet format and the Legacy packet format.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum PacketHeaderVersion {
    /// Old Packet Format ("Legacy packet format")
    Old,
    /// New Packet Format ("OpenPGP packet format")
    #[default]
    New,
}

/// Key packet versions.
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum KeyVersion {
    V2 = 2,
    V3 = 3,
    V4 = 4,

    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for KeyVersion {
    fn default() -> Self {
        Self::V4
    }
}
