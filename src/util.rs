//! Small helpers shared across modules.

/// Generates `From<Variant>` for an enum wrapping one type per variant, and
/// `TryFrom<Enum>` for each variant type.
macro_rules! impl_try_from_into {
    ($enum_name:ident, $( $name:ident => $variant_type:ty ),*) => {
       $(
           impl ::std::convert::TryFrom<$enum_name> for $variant_type {
               type Error = $crate::errors::Error;

               fn try_from(other: $enum_name) -> ::std::result::Result<$variant_type, Self::Error> {
                   if let $enum_name::$name(value) = other {
                       Ok(value)
                   } else {
                      Err(format_err!("invalid packet type: {:?}", other.tag()))
                   }
               }
           }

           impl From<$variant_type> for $enum_name {
               fn from(other: $variant_type) -> $enum_name {
                   $enum_name::$name(other)
               }
           }
       )*
    }
}

/// Formats a byte string lossily, for logs and `Debug` output.
pub(crate) fn display_bytes(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}
