//! In-memory ledger store.
//!
//! Clones share the same state, so one store can back many concurrent transactions. Keys are kept
//! in byte-wise lexicographic order.
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::store::{KeyValue, LedgerStore, StoreError};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend(String::from("in-memory ledger lock poisoned")))
    }
}

impl LedgerStore for MemoryStore {
    fn read(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn insert_if_absent(&mut self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        match state.get(key) {
            Some(existing) if !existing.is_empty() => Ok(false),
            _ => {
                state.insert(key.to_string(), value.to_string());
                Ok(true)
            }
        }
    }

    fn scan_all(&mut self) -> Result<Vec<KeyValue>, StoreError> {
        Ok(self
            .lock()?
            .iter()
            .map(|(key, value)| KeyValue::new(key.as_str(), value.as_str()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_back_written_values() {
        let mut store = MemoryStore::new();
        store.write("1", "one").unwrap();

        assert_eq!(store.read("1").unwrap(), Some(String::from("one")));
        assert_eq!(store.read("2").unwrap(), None);
    }

    #[test]
    fn insert_if_absent_keeps_first_value() {
        let mut store = MemoryStore::new();

        assert!(store.insert_if_absent("1", "first").unwrap());
        assert!(!store.insert_if_absent("1", "second").unwrap());
        assert_eq!(store.read("1").unwrap(), Some(String::from("first")));
    }

    #[test]
    fn insert_if_absent_fills_empty_slot() {
        let mut store = MemoryStore::new();
        store.write("1", "").unwrap();

        assert!(store.insert_if_absent("1", "value").unwrap());
        assert_eq!(store.read("1").unwrap(), Some(String::from("value")));
    }

    #[test]
    fn scan_is_lexicographic() {
        let mut store = MemoryStore::new();
        for key in ["2", "10", "1", "-5"].iter() {
            store.write(key, "v").unwrap();
        }

        let keys: Vec<String> = store.scan_all().unwrap().into_iter().map(|kv| kv.key).collect();

        assert_eq!(keys, vec!["-5", "1", "10", "2"]);
    }

    #[test]
    fn clones_share_state() {
        let mut writer = MemoryStore::new();
        let reader = writer.clone();
        writer.write("1", "one").unwrap();

        assert_eq!(reader.len().unwrap(), 1);
        assert!(!reader.is_empty().unwrap());
    }
}
