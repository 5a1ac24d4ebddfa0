//! # pgp-engine
//!
//! The core of an OpenPGP message engine.
//!
//! - [`packet`] frames and parses binary packets, built on the [`types::Mpi`] codec.
//! - [`composed`] assembles packets into semantic blocks: messages and transferable keys.
//! - [`registry`] maps algorithm ids to pluggable cipher, signer, hash and compression implementations.
//! - [`async_result`] is the single-assignment result every crypto operation returns.
//! - [`crypto::mode`] implements CBC, CFB, CTR and OpenPGP's OCFB on top of registry ciphers.
//!
//! Armor, keyring storage and the asymmetric mathematics are not part of this crate.
//!
//! ```
//! use pgp_engine::composed::{Block, Deserializable, Message};
//! use pgp_engine::ser::Serialize;
//!
//! let msg = Message::new_literal_bytes("hello.txt", &b"hi"[..]).unwrap();
//! let bytes = msg.to_bytes().unwrap();
//! let parsed = Block::from_bytes(bytes).unwrap();
//! assert_eq!(parsed, Block::Message(msg));
//! ```

#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::style,
    clippy::perf,
    clippy::complexity,
    clippy::correctness,
    rust_2018_idioms
)]
#![allow(clippy::missing_const_for_fn, clippy::type_complexity)]

#[macro_use]
pub mod errors;
#[macro_use]
mod util;

pub mod async_result;
pub mod composed;
pub mod crypto;
pub mod packet;
pub mod parsing;
pub mod registry;
pub mod ser;
pub mod types;

pub use async_result::AsyncResult;
pub use composed::{
    Block, Deserializable, Message, PublicOrSecret, TransferablePublicKey, TransferableSecretKey,
};
pub use registry::AlgorithmRegistry;
