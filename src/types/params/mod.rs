mod encrypted_secret;
mod plain_secret;
mod public;
mod secret;

pub use self::encrypted_secret::*;
pub use self::plain_secret::*;
pub use self::public::*;
pub use self::secret::*;
