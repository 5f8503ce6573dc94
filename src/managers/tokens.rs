use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use serde_json::json;

use super::{integer_field, string_field, TOKENS_TABLE};
use crate::errors::StorageError;
use crate::storage::{row, MemoryStore, Row};

/// Authentication token; `expiration` is a unix timestamp in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub id: String,
    pub expiration: i64,
    pub user_id: String,
}

impl Token {
    fn from_row(row: &Row) -> Result<Self, StorageError> {
        Ok(Self {
            id: string_field(TOKENS_TABLE, row, "id")?,
            expiration: integer_field(TOKENS_TABLE, row, "expiration")?,
            user_id: string_field(TOKENS_TABLE, row, "user_id")?,
        })
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.expiration, 0).single()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration <= now.timestamp()
    }
}

pub struct TokensManager {
    store: Arc<MemoryStore>,
}

impl TokensManager {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Issue a fresh token for `user_id`, valid for `ttl`.
    pub fn create(&self, user_id: &str, ttl: Duration) -> Result<Token, StorageError> {
        let token = Token {
            id: uuid::Uuid::new_v4().simple().to_string(),
            expiration: (Utc::now() + ttl).timestamp(),
            user_id: user_id.to_string(),
        };
        self.store.create(
            TOKENS_TABLE,
            vec![row([
                ("id", json!(token.id)),
                ("expiration", json!(token.expiration)),
                ("user_id", json!(token.user_id)),
            ])],
        )?;
        tracing::debug!(user_id, expiration = token.expiration, "token issued");
        Ok(token)
    }

    /// Look a token up; expired tokens count as absent.
    pub fn get(&self, id: &str) -> Result<Option<Token>, StorageError> {
        let found = self
            .store
            .find_one(TOKENS_TABLE, &[("id", json!(id))])?
            .as_ref()
            .map(Token::from_row)
            .transpose()?;
        Ok(found.filter(|token| !token.is_expired_at(Utc::now())))
    }

    pub fn for_user(&self, user_id: &str) -> Result<Vec<Token>, StorageError> {
        self.store
            .find(TOKENS_TABLE, &[("user_id", json!(user_id))])?
            .iter()
            .map(Token::from_row)
            .collect()
    }

    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.store.delete(TOKENS_TABLE, &[("id", json!(id))])? > 0)
    }

    /// Drop every token expired at `now`; returns how many went.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let cutoff = now.timestamp();
        let purged = self.store.delete_where(TOKENS_TABLE, |row| {
            row.get("expiration")
                .and_then(|v| v.as_i64())
                .map_or(false, |expiration| expiration <= cutoff)
        })?;
        if purged > 0 {
            tracing::info!(purged, "expired tokens removed");
        }
        Ok(purged)
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        self.store.count(TOKENS_TABLE)
    }
}
