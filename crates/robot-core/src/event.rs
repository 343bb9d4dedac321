//! Realtime event frame pushed by the backend.
//!
//! Every frame on the realtime channel is `{type, symbol?, timestamp, data}`.
//! The backend has emitted timestamps as epoch milliseconds, epoch seconds
//! and RFC 3339 strings, so all three are accepted. Integers below
//! [`EPOCH_SECONDS_CUTOFF`] are read as seconds, larger ones as milliseconds;
//! floats are always seconds.

use crate::error::{CoreError, Result};
use crate::topic::Topic;
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Integer timestamps below this are epoch seconds.
///
/// As milliseconds it is March 1973; as seconds it is past the year 5000.
pub const EPOCH_SECONDS_CUTOFF: i64 = 100_000_000_000;

/// A typed push event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    /// Topic the event belongs to (wire field `type`).
    #[serde(rename = "type")]
    pub topic: Topic,
    /// Trading pair the event concerns, when it concerns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Server-side event time.
    #[serde(
        default = "Utc::now",
        serialize_with = "serialize_millis",
        deserialize_with = "deserialize_flexible"
    )]
    pub timestamp: DateTime<Utc>,
    /// Topic-specific payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl RealtimeEvent {
    pub fn new(topic: Topic, symbol: Option<String>, data: serde_json::Value) -> Self {
        Self {
            topic,
            symbol,
            timestamp: Utc::now(),
            data,
        }
    }

    /// Parse a raw text frame.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode the payload into a concrete model.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone()).map_err(CoreError::from)
    }
}

fn serialize_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_i64(ts.timestamp_millis())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Integer(i64),
    Seconds(f64),
    Text(String),
}

fn deserialize_flexible<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<DateTime<Utc>, D::Error> {
    let raw = WireTimestamp::deserialize(deserializer)?;
    parse_timestamp(raw).map_err(serde::de::Error::custom)
}

fn parse_timestamp(raw: WireTimestamp) -> Result<DateTime<Utc>> {
    match raw {
        WireTimestamp::Integer(value) => {
            let ms = if value.abs() < EPOCH_SECONDS_CUTOFF {
                value.saturating_mul(1000)
            } else {
                value
            };
            Utc.timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| CoreError::InvalidTimestamp(value.to_string()))
        }
        // Python backends emit `time.time()` floats in seconds.
        WireTimestamp::Seconds(secs) => Utc
            .timestamp_millis_opt((secs * 1000.0) as i64)
            .single()
            .ok_or_else(|| CoreError::InvalidTimestamp(secs.to_string())),
        WireTimestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                chrono::NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
                    .map(|naive| naive.and_utc())
            })
            .map_err(|_| CoreError::InvalidTimestamp(text)),
    }
}
