mod compression;
mod key_id;
mod key_traits;
pub(crate) mod mpi;
mod packet;
mod params;
mod password;
mod s2k;
mod session_key;

pub use self::compression::*;
pub use self::key_id::*;
pub use self::key_traits::*;
pub use self::mpi::{Mpi, MAX_EXTERN_MPI_BITS};
pub use self::packet::*;
pub use self::params::*;
pub use self::password::*;
pub use self::s2k::*;
pub use self::session_key::*;
