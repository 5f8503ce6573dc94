use std::sync::Arc;

use serde_json::{json, Value};

use super::VMS_TABLE;
use crate::errors::StorageError;
use crate::storage::{row, MemoryStore};

/// Known virtual machines, kept in a store of their own.
pub struct VmsManager {
    store: Arc<MemoryStore>,
}

impl VmsManager {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn add(&self, id: &str) -> Result<(), StorageError> {
        self.store.create(VMS_TABLE, vec![row([("id", id)])])?;
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.store.delete(VMS_TABLE, &[("id", json!(id))])? > 0)
    }

    pub fn contains(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.store.find_one(VMS_TABLE, &[("id", json!(id))])?.is_some())
    }

    pub fn ids(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .store
            .all(VMS_TABLE)?
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        self.store.count(VMS_TABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> VmsManager {
        let store = MemoryStore::new();
        store
            .create_table(VMS_TABLE, |t| {
                t.string("id").unique();
            })
            .unwrap();
        VmsManager::new(Arc::new(store))
    }

    #[test]
    fn test_add_remove() {
        let vms = manager();
        vms.add("vm-1").unwrap();
        vms.add("vm-2").unwrap();

        assert!(vms.add("vm-1").is_err());
        assert!(vms.contains("vm-2").unwrap());
        assert_eq!(vms.ids().unwrap(), vec!["vm-1", "vm-2"]);

        assert!(vms.remove("vm-1").unwrap());
        assert!(!vms.remove("vm-1").unwrap());
        assert_eq!(vms.count().unwrap(), 1);
    }
}
