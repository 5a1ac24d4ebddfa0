mod public;
mod secret;

pub use self::public::*;
pub use self::secret::*;

#[cfg(test)]
pub(crate) mod test_keys {
    pub(crate) use super::public::tests::{rsa_params, RSA_BODY};
    pub(crate) use super::secret::tests::{rsa_secret, secret_key};
}
