use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Primitive column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::String => "a string",
            ColumnType::Integer => "an integer",
        }
    }

    /// Null is accepted by every type.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ColumnType::String, Value::String(_)) => true,
            (ColumnType::Integer, Value::Number(n)) => n.is_i64(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub auto_incremented: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
            unique: false,
            auto_incremented: false,
        }
    }
}

/// Fluent description of a table's columns.
///
/// ```
/// # use xo_server::storage::TableBuilder;
/// let mut table = TableBuilder::default();
/// table
///     .integer("id").auto_incremented()
///     .string("name").unique()
///     .string("password");
/// assert_eq!(table.columns().len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct TableBuilder {
    columns: Vec<Column>,
}

impl TableBuilder {
    pub fn string(&mut self, name: &str) -> &mut Self {
        self.columns.push(Column::new(name, ColumnType::String));
        self
    }

    pub fn integer(&mut self, name: &str) -> &mut Self {
        self.columns.push(Column::new(name, ColumnType::Integer));
        self
    }

    /// Mark the last declared column unique.
    pub fn unique(&mut self) -> &mut Self {
        if let Some(column) = self.columns.last_mut() {
            column.unique = true;
        }
        self
    }

    /// Mark the last declared column auto-incremented. Auto-incremented
    /// columns are unique as well.
    pub fn auto_incremented(&mut self) -> &mut Self {
        if let Some(column) = self.columns.last_mut() {
            column.auto_incremented = true;
            column.unique = true;
        }
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub(crate) fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_modifiers_apply_to_last_column() {
        let mut table = TableBuilder::default();
        table
            .string("id")
            .unique()
            .integer("expiration")
            .string("user_id");

        let columns = table.columns();
        assert!(columns[0].unique);
        assert!(!columns[1].unique);
        assert_eq!(columns[1].kind, ColumnType::Integer);
        assert!(!columns[2].auto_incremented);
    }

    #[test]
    fn test_type_acceptance() {
        assert!(ColumnType::String.accepts(&json!("x")));
        assert!(ColumnType::String.accepts(&Value::Null));
        assert!(!ColumnType::String.accepts(&json!(1)));
        assert!(ColumnType::Integer.accepts(&json!(-3)));
        assert!(!ColumnType::Integer.accepts(&json!(1.5)));
        assert!(!ColumnType::Integer.accepts(&json!("1")));
    }
}
