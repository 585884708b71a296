//! Account creation: password hashing, the transactional bulk writer and
//! spreadsheet-row import built on top of it.

pub mod import;
pub mod password;
pub mod writer;

pub use import::{import_users, ImportUsersInput};
pub use writer::{create_accounts, NewAccount};
