use std::num::TryFromIntError;
use std::sync::Arc;

use snafu::Snafu;

pub type Result<T, E = Error> = ::std::result::Result<T, E>;

pub use crate::parsing::{Error as ParsingError, RemainingError};

/// Error types
///
/// Errors are `Clone`, so that a rejected [`AsyncResult`](crate::AsyncResult)
/// can hand the same error to every listener.
#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("invalid input"))]
    InvalidInput,
    #[snafu(display("{message}"))]
    Message { message: String },
    #[snafu(display("Not yet implemented: {message}"))]
    Unimplemented { message: String },
    /// Signals packet versions and parameters we recognize, but don't support.
    #[snafu(display("Unsupported: {message}"))]
    Unsupported { message: String },
    /// Malformed parameters supplied by the caller, e.g. a wrong iv length.
    #[snafu(display("Invalid arguments: {message}"))]
    InvalidArguments { message: String },
    #[snafu(display("Required algorithm not available: {algorithm} ({registry})"))]
    AlgorithmNotAvailable {
        registry: &'static str,
        algorithm: String,
    },
    #[snafu(transparent)]
    PacketParsing { source: ParsingError },
    #[snafu(display("Unpadding failed"))]
    UnpadError,
    #[snafu(display("counter overflow: input is longer than the counter can address"))]
    CounterOverflow,
    #[snafu(display("input data with too deeply nested packets (max {max})"))]
    NestingTooDeep { max: usize },
    #[snafu(display("Modification Detection Code error"))]
    MdcError,
    #[snafu(display("missing passphrase"))]
    MissingPassphrase,
    #[snafu(display("wrong passphrase"))]
    WrongPassphrase,
    #[snafu(display("secret key is already locked"))]
    KeyAlreadyLocked,
    #[snafu(display("secret key material is locked"))]
    KeyLocked,
    #[snafu(display("result is still pending"))]
    Pending,
    #[snafu(display("compression error: {message}"))]
    Compression { message: String },
    #[snafu(display("invalid key length"))]
    InvalidKeyLength,
    #[snafu(display("io error: {source}"))]
    IO { source: Arc<std::io::Error> },
    #[snafu(transparent)]
    TryFromInt { source: TryFromIntError },
}

impl Error {
    /// Returns true for errors caused by malformed input data.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput
                | Self::Message { .. }
                | Self::PacketParsing { .. }
                | Self::UnpadError
                | Self::NestingTooDeep { .. }
                | Self::MdcError
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IO {
            source: Arc::new(err),
        }
    }
}

impl From<cipher::InvalidLength> for Error {
    fn from(_: cipher::InvalidLength) -> Error {
        Error::InvalidKeyLength
    }
}

impl From<String> for Error {
    fn from(err: String) -> Error {
        Error::Message { message: err }
    }
}

impl From<derive_builder::UninitializedFieldError> for Error {
    fn from(err: derive_builder::UninitializedFieldError) -> Error {
        Error::Message {
            message: err.to_string(),
        }
    }
}

#[macro_export]
macro_rules! unimplemented_err {
    ($e:expr) => {
        return Err($crate::errors::Error::Unimplemented { message: $e.to_string() })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Unimplemented { message: format!($fmt, $($arg)+)})
    };
}

#[macro_export]
macro_rules! unsupported_err {
    ($e:expr) => {
        return Err($crate::errors::Error::Unsupported { message: $e.to_string()})
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Unsupported { message: format!($fmt, $($arg)+) })
    };
}

#[macro_export]
macro_rules! invalid_args_err {
    ($e:expr) => {
        return Err($crate::errors::Error::InvalidArguments { message: $e.to_string()})
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::InvalidArguments { message: format!($fmt, $($arg)+) })
    };
}

#[macro_export]
macro_rules! bail {
    ($e:expr) => {
        return Err($crate::errors::Error::Message { message: $e.to_string() })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Message { message: format!($fmt, $($arg)+) })
    };
}

#[macro_export]
macro_rules! format_err {
    ($e:expr) => {
        $crate::errors::Error::Message { message: $e.to_string() }
    };
    ($fmt:expr, $($arg:tt)+) => {
        $crate::errors::Error::Message { message: format!($fmt, $($arg)+) }
    };
}

#[macro_export(local_inner_macros)]
macro_rules! ensure {
    ($cond:expr, $e:expr) => {
        if !($cond) {
            bail!($e);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)+) => {
        if !($cond) {
            bail!($fmt, $($arg)+);
        }
    };
}

#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr) => ({
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    bail!(r#"assertion failed: `(left == right)`
  left: `{:?}`,
 right: `{:?}`"#, left_val, right_val)
                }
            }
        }
    });
    ($left:expr, $right:expr,) => ({
        ensure_eq!($left, $right)
    });
    ($left:expr, $right:expr, $($arg:tt)+) => ({
        match (&($left), &($right)) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    bail!(r#"assertion failed: `(left == right)`
  left: `{:?}`,
 right: `{:?}`: {}"#, left_val, right_val,
                           format_args!($($arg)+))
                }
            }
        }
    });
}

#[macro_export]
macro_rules! err_opt {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(err) => return Some(Err(err)),
        }
    };
}
