//! Errors reported by the reading contract to the transaction submitter.
use thiserror::Error;

use crate::record::format_timestamp;
use crate::store::StoreError;

#[derive(Error, Debug)]
/// Failure of a single contract operation.
///
/// Every variant aborts the transaction it occurred in. None of them are retried internally.
pub enum ContractError {
    /// A reading already occupies the timestamp.
    #[error("Reading at {} already exists", readable_time(.timestamp))]
    AlreadyExists { timestamp: i64 },

    /// No reading occupies the timestamp.
    #[error("Reading at {} is not found", readable_time(.timestamp))]
    NotFound { timestamp: i64 },

    /// A stored value could not be parsed into a reading.
    #[error("Reading stored under key '{key}' cannot be decoded: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A reading could not be put into its canonical encoding.
    #[error("Reading at {} cannot be encoded: {source}", readable_time(.timestamp))]
    Encode {
        timestamp: i64,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn readable_time(timestamp: &i64) -> String {
    format_timestamp(*timestamp)
}

impl ContractError {
    /// Machine readable error code, equal to the error kind name.
    pub fn code(&self) -> &'static str {
        match self {
            ContractError::AlreadyExists { .. } => "AlreadyExists",
            ContractError::NotFound { .. } => "NotFound",
            ContractError::Decode { .. } => "DecodeError",
            ContractError::Encode { .. } => "EncodeError",
            ContractError::Store(_) => "StoreError",
        }
    }
}
