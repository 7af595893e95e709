//! Contract for recording temperature and humidity readings to the ledger.
//!
//! Every reading is stored under the decimal string of its timestamp, so there is at most one
//! reading per second. Readings are never updated or deleted once written.
use crate::error::ContractError;
use crate::record::{format_timestamp, Reading};
use crate::store::{LedgerStore, TransactionContext};

/// Name the contract is registered under with the hosting runtime.
pub const CONTRACT_NAME: &str = "blocc-temp-humidity-reading";

/// Human readable title of the contract.
pub const CONTRACT_TITLE: &str = "BLOCC Temperature and Humidity Sensor Reading Contract";

/// Derives the ledger key of a reading taken at `timestamp`.
///
/// Keys are not zero padded, so a full range scan delivers them in string order, e.g. `"10"`
/// before `"2"`.
pub fn ledger_key(timestamp: i64) -> String {
    timestamp.to_string()
}

#[derive(Debug, Default, Clone, Copy)]
/// Stateless accessor for readings. All state lives in the store of the transaction context.
pub struct ReadingContract;

impl ReadingContract {
    pub fn new() -> Self {
        ReadingContract
    }

    /// Checks whether a reading is recorded at `timestamp`.
    ///
    /// An empty stored value counts as absent.
    pub fn reading_exists<S: LedgerStore>(
        &self,
        ctx: &mut TransactionContext<S>,
        timestamp: i64,
    ) -> Result<bool, ContractError> {
        let value = ctx.store().read(&ledger_key(timestamp))?;
        Ok(is_present(&value))
    }

    /// Records a temperature and humidity reading to the ledger.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The transaction context holding the ledger store.
    ///
    /// * `temperature` - The temperature reading in degree celsius.
    ///
    /// * `relative_humidity` - The relative humidity reading in percent.
    ///
    /// * `timestamp` - Seconds since the unix epoch the reading was taken at.
    ///
    /// # Returns
    ///
    /// * `Ok(reading)` - The reading added to the ledger.
    ///
    /// * `Err(ContractError::AlreadyExists)` - A reading at the same timestamp exists already.
    ///     Nothing is written.
    ///
    /// * `Err(ContractError::Encode)` - Temperature or humidity is not a finite number.
    ///
    pub fn add_reading<S: LedgerStore>(
        &self,
        ctx: &mut TransactionContext<S>,
        temperature: f32,
        relative_humidity: f32,
        timestamp: i64,
    ) -> Result<Reading, ContractError> {
        if self.reading_exists(ctx, timestamp)? {
            log::warn!(target: "reading_ledger::contract", "Reading at {} already exists", format_timestamp(timestamp));
            return Err(ContractError::AlreadyExists { timestamp });
        }

        let reading = Reading::new(temperature, relative_humidity, timestamp);
        let json = reading
            .to_json()
            .map_err(|source| ContractError::Encode { timestamp, source })?;

        // A concurrent writer may have taken the key since the existence check.
        if !ctx.store().insert_if_absent(&ledger_key(timestamp), &json)? {
            log::warn!(target: "reading_ledger::contract", "Reading at {} was added concurrently", format_timestamp(timestamp));
            return Err(ContractError::AlreadyExists { timestamp });
        }

        log::info!(target: "reading_ledger::contract", "Added {}", reading);
        Ok(reading)
    }

    /// Retrieves the reading recorded at `timestamp`.
    ///
    /// # Errors
    ///
    /// * `ContractError::NotFound` - No reading is recorded at the timestamp.
    ///
    /// * `ContractError::Decode` - The stored value is not a valid reading.
    pub fn get_reading<S: LedgerStore>(
        &self,
        ctx: &mut TransactionContext<S>,
        timestamp: i64,
    ) -> Result<Reading, ContractError> {
        let key = ledger_key(timestamp);
        let json = match ctx.store().read(&key)? {
            Some(json) if !json.is_empty() => json,
            _ => {
                log::warn!(target: "reading_ledger::contract", "Reading at {} is not found", format_timestamp(timestamp));
                return Err(ContractError::NotFound { timestamp });
            }
        };

        decode(key, &json)
    }

    /// Retrieves every reading on the ledger in the order the store scans its keys.
    ///
    /// The whole call fails on the first entry that cannot be decoded.
    pub fn get_all_readings<S: LedgerStore>(
        &self,
        ctx: &mut TransactionContext<S>,
    ) -> Result<Vec<Reading>, ContractError> {
        let entries = ctx.store().scan_all()?;
        let mut readings = Vec::with_capacity(entries.len());

        for entry in entries {
            let reading = decode(entry.key, &entry.value)?;
            log::trace!(target: "reading_ledger::contract", "Scanned {}", reading);
            readings.push(reading);
        }

        log::debug!(target: "reading_ledger::contract", "Scanned {} readings", readings.len());
        Ok(readings)
    }
}

fn is_present(value: &Option<String>) -> bool {
    match value {
        Some(value) => !value.is_empty(),
        None => false,
    }
}

fn decode(key: String, json: &str) -> Result<Reading, ContractError> {
    Reading::from_json(json).map_err(|source| {
        log::error!(target: "reading_ledger::contract", "Value under key '{}' cannot be decoded: '{}'", key, source);
        ContractError::Decode { key, source }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyValue, StoreError};

    /// Store stub that answers from fixed values and records every write.
    #[derive(Default)]
    struct StubStore {
        state: Option<String>,
        entries: Vec<KeyValue>,
        writes: Vec<(String, String)>,
    }

    impl LedgerStore for StubStore {
        fn read(&mut self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(self.state.clone())
        }

        fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.writes.push((key.to_string(), value.to_string()));
            Ok(())
        }

        fn insert_if_absent(&mut self, key: &str, value: &str) -> Result<bool, StoreError> {
            if is_present(&self.state) {
                return Ok(false);
            }
            self.write(key, value)?;
            Ok(true)
        }

        fn scan_all(&mut self) -> Result<Vec<KeyValue>, StoreError> {
            Ok(self.entries.clone())
        }
    }

    const EXISTING_READING: &str =
        r#"{ "temperature": 0.100000, "time": "1", "relativeHumidity": 0.900000 }"#;

    fn context(state: Option<&str>) -> TransactionContext<StubStore> {
        TransactionContext::new(StubStore {
            state: state.map(String::from),
            ..StubStore::default()
        })
    }

    #[test]
    fn keys_are_unpadded_decimal_strings() {
        assert_eq!(ledger_key(1), "1");
        assert_eq!(ledger_key(100), "100");
        assert_eq!(ledger_key(-42), "-42");
    }

    #[test]
    fn empty_value_does_not_count_as_existing() {
        let contract = ReadingContract::new();

        assert!(!contract.reading_exists(&mut context(None), 1).unwrap());
        assert!(!contract.reading_exists(&mut context(Some("")), 1).unwrap());
        assert!(contract.reading_exists(&mut context(Some(EXISTING_READING)), 1).unwrap());
    }

    #[test]
    fn adds_new_reading_to_ledger() {
        let contract = ReadingContract::new();
        let mut ctx = context(Some(""));

        let reading = contract.add_reading(&mut ctx, 1.0, 0.9, 1).unwrap();

        assert_eq!(reading, Reading::new(1.0, 0.9, 1));
        assert_eq!(
            ctx.into_store().writes,
            vec![(
                String::from("1"),
                String::from(r#"{"relativeHumidity":0.9,"temperature":1.0,"timestamp":1}"#)
            )]
        );
    }

    #[test]
    fn rejects_duplicated_reading_without_writing() {
        let contract = ReadingContract::new();
        let mut ctx = context(Some(EXISTING_READING));

        let err = contract.add_reading(&mut ctx, 1.0, 0.9, 1).unwrap_err();

        assert_eq!(err.code(), "AlreadyExists");
        assert_eq!(err.to_string(), "Reading at 1970-01-01T00:00:01Z already exists");
        assert!(ctx.into_store().writes.is_empty());
    }

    #[test]
    fn rejects_non_finite_reading_without_writing() {
        let contract = ReadingContract::new();
        let mut ctx = context(None);

        let err = contract.add_reading(&mut ctx, f32::NAN, 0.9, 1).unwrap_err();

        assert_eq!(err.code(), "EncodeError");
        assert!(ctx.into_store().writes.is_empty());
    }

    #[test]
    fn fails_when_reading_not_found() {
        let contract = ReadingContract::new();

        let err = contract.get_reading(&mut context(Some("")), 1).unwrap_err();

        assert_eq!(err.code(), "NotFound");
        assert_eq!(err.to_string(), "Reading at 1970-01-01T00:00:01Z is not found");
    }

    #[test]
    fn retrieves_existing_reading() {
        let contract = ReadingContract::new();

        let reading = contract.get_reading(&mut context(Some(EXISTING_READING)), 1).unwrap();

        assert_eq!(reading, Reading::new(0.1, 0.9, 1));
    }

    #[test]
    fn malformed_value_is_a_decode_error() {
        let contract = ReadingContract::new();

        let err = contract.get_reading(&mut context(Some("not json")), 1).unwrap_err();

        assert_eq!(err.code(), "DecodeError");
    }

    #[test]
    fn returns_empty_list_when_no_reading_available() {
        let contract = ReadingContract::new();

        assert!(contract.get_all_readings(&mut context(None)).unwrap().is_empty());
    }

    #[test]
    fn retrieves_all_readings_in_scan_order() {
        let contract = ReadingContract::new();
        let mut ctx = context(None);
        ctx.store().entries = vec![
            KeyValue::new("1", EXISTING_READING),
            KeyValue::new(
                "100",
                r#"{ "temperature": 20.000000, "time": "100", "relativeHumidity": 4.000000 }"#,
            ),
        ];

        let readings = contract.get_all_readings(&mut ctx).unwrap();

        assert_eq!(readings, vec![Reading::new(0.1, 0.9, 1), Reading::new(20.0, 4.0, 100)]);
    }

    #[test]
    fn scan_aborts_on_undecodable_entry() {
        let contract = ReadingContract::new();
        let mut ctx = context(None);
        ctx.store().entries = vec![KeyValue::new("1", EXISTING_READING), KeyValue::new("2", "{}")];

        match contract.get_all_readings(&mut ctx) {
            Err(ContractError::Decode { key, .. }) => assert_eq!(key, "2"),
            other => panic!("expected decode error, got {:?}", other),
        }
    }
}
