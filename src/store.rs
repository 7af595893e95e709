//! Key-value store capability the reading contract runs against.
//!
//! The hosting runtime hands the contract one store handle per transaction, wrapped in a
//! [`TransactionContext`]. Ordering, replication and durability belong to the store.
use thiserror::Error;

#[derive(Error, Debug)]
/// Failure reported by a store backend.
pub enum StoreError {
    #[error("Ledger store backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single ledger entry as delivered by a range scan.
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Point read, point write and full range scan over string keys and values.
///
/// Implementations used by concurrent writers must make [`LedgerStore::insert_if_absent`] atomic
/// per key. The reading contract depends on it to keep at most one value per key.
pub trait LedgerStore {
    /// Returns the value stored under `key`, or `None` if the key is absent.
    fn read(&mut self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Stores `value` under `key` only if no non-empty value is present.
    ///
    /// Returns `true` if the value was written.
    fn insert_if_absent(&mut self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// Returns every entry in store native order.
    ///
    /// The scan is materialized once; any cursor backing it is released before this returns.
    fn scan_all(&mut self) -> Result<Vec<KeyValue>, StoreError>;
}

/// Per invocation handle through which a contract operation reaches the ledger store.
pub struct TransactionContext<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> TransactionContext<S> {
    pub fn new(store: S) -> Self {
        TransactionContext { store }
    }

    pub fn store(&mut self) -> &mut S {
        &mut self.store
    }

    /// Releases the store handle, e.g. so the host can commit the transaction.
    pub fn into_store(self) -> S {
        self.store
    }
}
