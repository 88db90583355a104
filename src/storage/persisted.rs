//! Typed view over the durable store
//!
//! Layout: `nextSwitchMode` (mode name), `lastCommandExecutedAt` (epoch
//! milliseconds) and `batterySnapshot` (last displayed battery record).

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::kv::{KeyValueStore, StoreError};
use crate::bluetooth::CanonicalBatteryRecord;
use crate::mode::Mode;

pub const NEXT_SWITCH_MODE_KEY: &str = "nextSwitchMode";
pub const LAST_COMMAND_EXECUTED_AT_KEY: &str = "lastCommandExecutedAt";
pub const BATTERY_SNAPSHOT_KEY: &str = "batterySnapshot";

/// Persisted toggle pointer, cooldown marker and battery snapshot
#[derive(Clone)]
pub struct PersistentModeState {
    store: Arc<dyn KeyValueStore>,
}

impl PersistentModeState {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Mode the next toggle should activate
    pub async fn next_mode(&self) -> Result<Option<Mode>, StoreError> {
        Ok(self
            .store
            .get(NEXT_SWITCH_MODE_KEY)
            .await?
            .and_then(|value| decode(NEXT_SWITCH_MODE_KEY, value)))
    }

    pub async fn set_next_mode(&self, mode: Mode) -> Result<(), StoreError> {
        self.store
            .set(NEXT_SWITCH_MODE_KEY, Value::String(mode.as_str().to_string()))
            .await
    }

    /// Epoch milliseconds of the last successfully dispatched command
    pub async fn last_executed_at(&self) -> Result<Option<i64>, StoreError> {
        Ok(self
            .store
            .get(LAST_COMMAND_EXECUTED_AT_KEY)
            .await?
            .and_then(|value| decode(LAST_COMMAND_EXECUTED_AT_KEY, value)))
    }

    pub async fn set_last_executed_at(&self, timestamp_ms: i64) -> Result<(), StoreError> {
        self.store
            .set(LAST_COMMAND_EXECUTED_AT_KEY, Value::from(timestamp_ms))
            .await
    }

    /// Last battery record shown to the user, if any
    pub async fn battery_snapshot(&self) -> Result<Option<CanonicalBatteryRecord>, StoreError> {
        Ok(self
            .store
            .get(BATTERY_SNAPSHOT_KEY)
            .await?
            .and_then(|value| decode(BATTERY_SNAPSHOT_KEY, value)))
    }

    pub async fn set_battery_snapshot(&self, record: &CanonicalBatteryRecord) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(record).map_err(|source| StoreError::Encode {
            key: BATTERY_SNAPSHOT_KEY.to_string(),
            source,
        })?;
        self.store.set(BATTERY_SNAPSHOT_KEY, Value::String(encoded)).await
    }
}

/// Decode a stored value, treating unreadable values as absent
///
/// JSON-serialized strings (the snapshot) are unwrapped before decoding.
fn decode<T: serde::de::DeserializeOwned>(key: &str, value: Value) -> Option<T> {
    let decoded = match value {
        Value::String(ref s) if s.starts_with('{') => serde_json::from_str(s),
        other => serde_json::from_value(other),
    };

    match decoded {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(key, ?e, "ignoring unreadable persisted value");
            None
        }
    }
}
