use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::Column;
use super::Row;
use crate::errors::StorageError;

/// Serialized form of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableState {
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default = "first_id")]
    pub next_id: i64,
}

fn first_id() -> i64 {
    1
}

#[derive(Debug, Clone)]
pub(crate) struct Table {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
    next_id: i64,
}

impl Table {
    pub(crate) fn new(name: &str, columns: Vec<Column>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
            next_id: first_id(),
        }
    }

    /// Rebuild a table from its state, checking every row against the schema.
    pub(crate) fn from_state(name: &str, state: TableState) -> Result<Self, StorageError> {
        let mut table = Self::new(name, state.columns);
        let max_id = table
            .auto_column()
            .map(|column| {
                state
                    .rows
                    .iter()
                    .filter_map(|row| row.get(&column.name).and_then(Value::as_i64))
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);

        for row in &state.rows {
            table.check_row(row)?;
            table.check_unique(row, &table.rows, None)?;
            table.rows.push(row.clone());
        }
        table.next_id = state.next_id.max(max_id + 1);
        Ok(table)
    }

    pub(crate) fn state(&self) -> TableState {
        TableState {
            columns: self.columns.clone(),
            rows: self.rows.clone(),
            next_id: self.next_id,
        }
    }

    pub(crate) fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Insert rows atomically, filling auto-incremented and absent columns.
    pub(crate) fn insert(&mut self, rows: Vec<Row>) -> Result<Vec<Row>, StorageError> {
        let mut next_id = self.next_id;
        let mut prepared: Vec<Row> = Vec::with_capacity(rows.len());

        for mut row in rows {
            for column in &self.columns {
                let slot = row.entry(column.name.clone()).or_insert(Value::Null);
                if column.auto_incremented && slot.is_null() {
                    *slot = Value::from(next_id);
                }
            }
            self.check_row(&row)?;
            self.check_unique(&row, &self.rows, None)?;
            self.check_unique(&row, &prepared, None)?;

            if let Some(column) = self.auto_column() {
                if let Some(id) = row.get(&column.name).and_then(Value::as_i64) {
                    next_id = next_id.max(id + 1);
                }
            }
            prepared.push(row);
        }

        self.next_id = next_id;
        self.rows.extend(prepared.iter().cloned());
        Ok(prepared)
    }

    /// Apply `changes` to every row matching `predicate`; all-or-nothing.
    pub(crate) fn update<P>(&mut self, predicate: P, changes: &Row) -> Result<usize, StorageError>
    where
        P: Fn(&Row) -> bool,
    {
        let mut updated = self.rows.clone();
        let mut touched = Vec::new();
        for (index, row) in updated.iter_mut().enumerate() {
            if predicate(row) {
                for (key, value) in changes {
                    row.insert(key.clone(), value.clone());
                }
                touched.push(index);
            }
        }

        for &index in &touched {
            let row = &updated[index];
            self.check_row(row)?;
            self.check_unique(row, &updated, Some(index))?;
        }

        self.rows = updated;
        Ok(touched.len())
    }

    pub(crate) fn delete<P>(&mut self, predicate: P) -> usize
    where
        P: Fn(&Row) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| !predicate(row));
        before - self.rows.len()
    }

    pub(crate) fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    fn auto_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.auto_incremented)
    }

    fn check_row(&self, row: &Row) -> Result<(), StorageError> {
        for (key, value) in row {
            let column = self
                .columns
                .iter()
                .find(|c| &c.name == key)
                .ok_or_else(|| StorageError::UnknownColumn {
                    table: self.name.clone(),
                    column: key.clone(),
                })?;
            if !column.kind.accepts(value) {
                return Err(StorageError::TypeMismatch {
                    table: self.name.clone(),
                    column: column.name.clone(),
                    expected: column.kind.name(),
                    actual: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Unique columns must not repeat a non-null value found in `others`
    /// (skipping the row at `skip`).
    fn check_unique(&self, row: &Row, others: &[Row], skip: Option<usize>) -> Result<(), StorageError> {
        for column in self.columns.iter().filter(|c| c.unique) {
            let Some(value) = row.get(&column.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = others
                .iter()
                .enumerate()
                .filter(|(index, _)| Some(*index) != skip)
                .any(|(_, other)| other.get(&column.name) == Some(value));
            if clash {
                return Err(StorageError::UniqueViolation {
                    table: self.name.clone(),
                    column: column.name.clone(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}
