//! Domain managers
//!
//! Typed views over one table of a [`MemoryStore`](crate::storage::MemoryStore).

pub mod tokens;
pub mod users;
pub mod vms;

use serde_json::Value;

use crate::errors::StorageError;
use crate::storage::Row;

pub use tokens::{Token, TokensManager};
pub use users::{Permission, User, UsersManager};
pub use vms::VmsManager;

pub const TOKENS_TABLE: &str = "tokens";
pub const USERS_TABLE: &str = "users";
pub const VMS_TABLE: &str = "vms";

fn field<'r>(table: &str, row: &'r Row, column: &str) -> Result<&'r Value, StorageError> {
    row.get(column).ok_or_else(|| StorageError::InvalidRow {
        table: table.to_string(),
        reason: format!("missing column '{}'", column),
    })
}

fn string_field(table: &str, row: &Row, column: &str) -> Result<String, StorageError> {
    field(table, row, column)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| StorageError::InvalidRow {
            table: table.to_string(),
            reason: format!("'{}' is not a string", column),
        })
}

fn integer_field(table: &str, row: &Row, column: &str) -> Result<i64, StorageError> {
    field(table, row, column)?
        .as_i64()
        .ok_or_else(|| StorageError::InvalidRow {
            table: table.to_string(),
            reason: format!("'{}' is not an integer", column),
        })
}
