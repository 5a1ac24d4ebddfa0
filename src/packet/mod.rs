//! # Packet module
//!
//! Framing and typed bodies of the individual OpenPGP packets.
//!
//! ```rust
//! use pgp_engine::packet::{parse_packets, write_packet, Packet, UserId};
//!
//! let user_id = UserId::new("Me <me@example.com>").unwrap();
//! let mut bytes = Vec::new();
//! write_packet(&mut bytes, &user_id).unwrap();
//!
//! let packets = parse_packets(bytes).unwrap();
//! assert_eq!(packets, vec![Packet::UserId(user_id)]);
//! ```

mod header;
mod many;
mod packet_sum;
mod single;

mod compressed_data;
mod key;
mod literal_data;
mod mod_detection_code;
mod one_pass_signature;
mod public_key_encrypted_session_key;
mod signature;
mod sym_encrypted_data;
mod sym_encrypted_protected_data;
mod sym_key_encrypted_session_key;
mod trust;
mod user_attribute;
mod user_id;

pub use self::compressed_data::*;
pub use self::header::*;
pub use self::key::*;
pub use self::literal_data::*;
pub use self::many::*;
pub use self::mod_detection_code::*;
pub use self::one_pass_signature::*;
pub use self::packet_sum::*;
pub use self::public_key_encrypted_session_key::*;
pub use self::signature::*;
pub use self::single::*;
pub use self::sym_encrypted_data::*;
pub use self::sym_encrypted_protected_data::*;
pub use self::sym_key_encrypted_session_key::*;
pub use self::trust::*;
pub use self::user_attribute::*;
pub use self::user_id::*;

#[cfg(test)]
pub(crate) use self::key::test_keys;
#[cfg(test)]
pub(crate) use self::signature::tests as signature_tests;
