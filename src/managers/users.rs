use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{integer_field, string_field, USERS_TABLE};
use crate::errors::StorageError;
use crate::storage::{row, MemoryStore, Row};

/// Permission levels, stored as integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    None = 0,
    Read = 1,
    Write = 2,
    Admin = 3,
}

impl Permission {
    pub fn level(self) -> i64 {
        self as i64
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            0 => Some(Permission::None),
            1 => Some(Permission::Read),
            2 => Some(Permission::Write),
            3 => Some(Permission::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub password: Option<String>,
    pub permission: Permission,
}

impl User {
    fn from_row(row: &Row) -> Result<Self, StorageError> {
        let level = match row.get("permission") {
            Some(Value::Null) | None => 0,
            Some(_) => integer_field(USERS_TABLE, row, "permission")?,
        };
        let permission = Permission::from_level(level).ok_or_else(|| StorageError::InvalidRow {
            table: USERS_TABLE.to_string(),
            reason: format!("unknown permission level {}", level),
        })?;

        Ok(Self {
            id: integer_field(USERS_TABLE, row, "id")?,
            name: string_field(USERS_TABLE, row, "name")?,
            password: row.get("password").and_then(Value::as_str).map(str::to_string),
            permission,
        })
    }
}

/// Users stored in the `users` table.
pub struct UsersManager {
    store: Arc<MemoryStore>,
}

impl UsersManager {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Add a user; `password` is an already hashed secret.
    pub fn create(&self, name: &str, password: &str, permission: Permission) -> Result<User, StorageError> {
        let created = self.store.create(
            USERS_TABLE,
            vec![row([
                ("name", json!(name)),
                ("password", json!(password)),
                ("permission", json!(permission.level())),
            ])],
        )?;
        tracing::info!(user = name, ?permission, "user created");
        User::from_row(&created[0])
    }

    pub fn get(&self, id: i64) -> Result<Option<User>, StorageError> {
        self.first(&[("id", json!(id))])
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<User>, StorageError> {
        self.first(&[("name", json!(name))])
    }

    pub fn all(&self) -> Result<Vec<User>, StorageError> {
        self.store
            .all(USERS_TABLE)?
            .iter()
            .map(User::from_row)
            .collect()
    }

    /// Returns whether a user was changed.
    pub fn set_permission(&self, id: i64, permission: Permission) -> Result<bool, StorageError> {
        let changed = self.store.update(
            USERS_TABLE,
            &[("id", json!(id))],
            row([("permission", permission.level())]),
        )?;
        Ok(changed > 0)
    }

    pub fn delete(&self, id: i64) -> Result<bool, StorageError> {
        Ok(self.store.delete(USERS_TABLE, &[("id", json!(id))])? > 0)
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        self.store.count(USERS_TABLE)
    }

    fn first(&self, filter: &[(&str, Value)]) -> Result<Option<User>, StorageError> {
        self.store
            .find_one(USERS_TABLE, filter)?
            .as_ref()
            .map(User::from_row)
            .transpose()
    }
}
