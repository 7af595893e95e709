//! Append-only ledger of temperature and humidity readings.
//!
//! The [`ReadingContract`] stores each [`Reading`] under its timestamp in a [`LedgerStore`]
//! supplied per transaction by the host. [`MemoryStore`] backs tests and embedding, the
//! [`database`] module a PostgreSQL table.
pub mod contract;
pub mod database;
pub mod error;
pub mod memory;
pub mod record;
pub mod store;

pub use contract::{ledger_key, ReadingContract};
pub use error::ContractError;
pub use memory::MemoryStore;
pub use record::Reading;
pub use store::{KeyValue, LedgerStore, StoreError, TransactionContext};
