//! Semantic blocks built from packet sequences.

mod block;
pub mod key;
pub mod message;
mod shared;

pub use self::block::Block;
pub use self::key::{
    parse_all_transferable_keys, PublicOrSecret, SignedKeyDetails, SignedPublicSubkey,
    SignedSecretSubkey, SignedSubkey, SignedUser, TransferablePublicKey, TransferableSecretKey,
    User,
};
pub use self::message::{
    Edata, Esk, Message, MessageEncryptionOptions, MessageEncryptionOptionsBuilder,
    VerifyResult, MAX_NESTING_LEVEL,
};
pub use self::shared::Deserializable;
