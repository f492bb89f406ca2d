//! `eventide-users`: the user directory.
//!
//! Events reference users through a foreign key with `ON DELETE CASCADE`, so
//! deleting a user here also removes every event it owns. The cascade only
//! fires on connections opened with `PRAGMA foreign_keys=ON`.

pub mod db;
pub mod directory;
pub mod error;
pub mod store;
pub mod types;

pub use directory::UserDirectory;
pub use error::{Result, UserError};
pub use types::{User, UserPatch};
