mod builder;
mod decrypt;
mod parser;
mod types;

pub use self::builder::{MessageEncryptionOptions, MessageEncryptionOptionsBuilder};
pub(crate) use self::parser::is_message_start;
pub use self::types::*;
