//! Module that contains the reading record stored in the ledger.
use std::fmt;

use chrono::{SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Struct representing a temperature and humidity reading taken by a sensor node at a specific
/// second.
///
/// The serialized field names are consumed by clients of the ledger and must not change. Fields
/// are declared in alphabetical order so the canonical encoding is stable.
pub struct Reading
{
    /// Relative humidity value in percent.
    relative_humidity: f32,
    /// Temperature value in celsius.
    temperature: f32,
    /// Seconds since the unix epoch the reading was taken at.
    #[serde(alias = "time", deserialize_with = "deserialize_epoch_seconds")]
    timestamp: i64,
}

impl Reading {
    /// Creates a new reading. No range checks are applied to any of the values.
    pub fn new(temperature: f32, relative_humidity: f32, timestamp: i64) -> Self {
        Reading {
            relative_humidity,
            temperature,
            timestamp,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn relative_humidity(&self) -> f32 {
        self.relative_humidity
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Serializes the reading into its canonical JSON form.
    ///
    /// # Errors
    ///
    /// Fails if temperature or humidity are not finite, since JSON has no representation for them.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        if !self.temperature.is_finite() || !self.relative_humidity.is_finite() {
            return Err(serde::ser::Error::custom(format!(
                "reading at {} holds a non finite value",
                format_timestamp(self.timestamp)
            )));
        }
        serde_json::to_string(self)
    }

    /// Parses a reading from its canonical JSON form. Unknown fields are ignored.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Reading>(json)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reading [time={}, temperature={:.6}, relativeHumidity={:.6}]",
            format_timestamp(self.timestamp),
            self.temperature,
            self.relative_humidity
        )
    }
}

/// Formats epoch seconds as an RFC 3339 UTC timestamp, e.g. `1970-01-01T00:00:01Z`.
///
/// Values chrono cannot represent are rendered as `@<seconds>`.
pub fn format_timestamp(timestamp: i64) -> String {
    match Utc.timestamp_opt(timestamp, 0).single() {
        Some(datetime) => datetime.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => format!("@{}", timestamp),
    }
}

/// Older ledger entries carry the timestamp as a quoted decimal string.
fn deserialize_epoch_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum EpochSeconds {
        Number(i64),
        Text(String),
    }

    match EpochSeconds::deserialize(deserializer)? {
        EpochSeconds::Number(seconds) => Ok(seconds),
        EpochSeconds::Text(raw) => raw.trim().parse::<i64>().map_err(|e| {
            serde::de::Error::invalid_value(
                serde::de::Unexpected::Str(&raw),
                &format!("a decimal integer of epoch seconds: {}", e).as_str(),
            )
        }),
    }
}
