//! In-memory, schema-aware table store
//!
//! The whole store serializes to a single JSON document ([`StoreState`]) and
//! can be rebuilt from it.

pub mod schema;
mod table;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::StorageError;

pub use schema::{Column, ColumnType, TableBuilder};
pub use table::TableState;
use table::Table;

/// One stored row, column name to value.
pub type Row = serde_json::Map<String, Value>;

/// Equality filter: every `(column, value)` pair must match.
pub type Filter<'a> = &'a [(&'a str, Value)];

/// Serialized state of a whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub tables: BTreeMap<String, TableState>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a previously serialized state.
    pub fn from_state(state: StoreState) -> Result<Self, StorageError> {
        let mut tables = BTreeMap::new();
        for (name, table) in state.tables {
            let table = Table::from_state(&name, table)?;
            tables.insert(name, table);
        }
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    pub fn state(&self) -> StoreState {
        let tables = self.tables.read();
        StoreState {
            tables: tables
                .iter()
                .map(|(name, table)| (name.clone(), table.state()))
                .collect(),
        }
    }

    /// Define a table through a column builder.
    pub fn create_table<F>(&self, name: &str, describe: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut TableBuilder),
    {
        let mut builder = TableBuilder::default();
        describe(&mut builder);

        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(StorageError::TableExists(name.to_string()));
        }
        tables.insert(name.to_string(), Table::new(name, builder.into_columns()));
        tracing::debug!(table = name, "table created");
        Ok(())
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    /// Bulk insert; returns the rows as stored (auto-incremented ids filled).
    pub fn create(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, StorageError> {
        self.write_table(table, |t| t.insert(rows))?
    }

    pub fn all(&self, table: &str) -> Result<Vec<Row>, StorageError> {
        self.read_table(table, |t| t.rows().to_vec())
    }

    pub fn find(&self, table: &str, filter: Filter<'_>) -> Result<Vec<Row>, StorageError> {
        self.check_filter(table, filter)?;
        self.read_table(table, |t| {
            t.rows()
                .iter()
                .filter(|row| matches(row, filter))
                .cloned()
                .collect()
        })
    }

    pub fn find_one(&self, table: &str, filter: Filter<'_>) -> Result<Option<Row>, StorageError> {
        Ok(self.find(table, filter)?.into_iter().next())
    }

    pub fn count(&self, table: &str) -> Result<usize, StorageError> {
        self.read_table(table, |t| t.rows().len())
    }

    /// Apply `changes` to every matching row; returns how many were changed.
    pub fn update(&self, table: &str, filter: Filter<'_>, changes: Row) -> Result<usize, StorageError> {
        self.check_filter(table, filter)?;
        self.write_table(table, |t| t.update(|row| matches(row, filter), &changes))?
    }

    pub fn delete(&self, table: &str, filter: Filter<'_>) -> Result<usize, StorageError> {
        self.check_filter(table, filter)?;
        self.write_table(table, |t| t.delete(|row| matches(row, filter)))
    }

    /// Delete every row for which `predicate` holds.
    pub fn delete_where<P>(&self, table: &str, predicate: P) -> Result<usize, StorageError>
    where
        P: Fn(&Row) -> bool,
    {
        self.write_table(table, |t| t.delete(predicate))
    }

    /// Write the state as JSON, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let shown = path.display().to_string();
        let encoded = serde_json::to_vec_pretty(&self.state()).map_err(StorageError::Encode)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| StorageError::Write(shown.clone(), e))?;

        let mut file =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| StorageError::Write(shown.clone(), e))?;
        file.write_all(&encoded)
            .and_then(|_| file.flush())
            .map_err(|e| StorageError::Write(shown.clone(), e))?;
        file.persist(path)
            .map_err(|e| StorageError::Write(shown.clone(), e.error))?;

        tracing::debug!(path = %shown, "store saved");
        Ok(())
    }

    fn read_table<R>(&self, name: &str, f: impl FnOnce(&Table) -> R) -> Result<R, StorageError> {
        let tables = self.tables.read();
        let table = tables
            .get(name)
            .ok_or_else(|| StorageError::NoSuchTable(name.to_string()))?;
        Ok(f(table))
    }

    fn write_table<R>(&self, name: &str, f: impl FnOnce(&mut Table) -> R) -> Result<R, StorageError> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(name)
            .ok_or_else(|| StorageError::NoSuchTable(name.to_string()))?;
        Ok(f(table))
    }

    fn check_filter(&self, name: &str, filter: Filter<'_>) -> Result<(), StorageError> {
        self.read_table(name, |t| {
            filter
                .iter()
                .find(|(column, _)| !t.has_column(column))
                .map(|(column, _)| StorageError::UnknownColumn {
                    table: name.to_string(),
                    column: column.to_string(),
                })
        })?
        .map_or(Ok(()), Err)
    }
}

fn matches(row: &Row, filter: Filter<'_>) -> bool {
    filter
        .iter()
        .all(|(column, value)| row.get(*column).unwrap_or(&Value::Null) == value)
}

/// Build a [`Row`] from `(column, value)` pairs.
pub fn row<I, K, V>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
