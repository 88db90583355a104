//! Raw Bluetooth device inventory sources
//!
//! The live source shells out to `system_profiler`; the mock source serves a
//! bundled fixture for development without a paired accessory.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::{debug, info};

const SYSTEM_PROFILER: &str = "/usr/sbin/system_profiler";
const MOCK_FIXTURE: &str = include_str!("../../assets/mock-bluetooth-devices.json");

/// Artificial latency of the mock source, close to a real profiler run
pub const MOCK_DELAY: Duration = Duration::from_millis(1000);

/// One device record as reported by the system, keyed by display name
///
/// `{"AirPods Pro": {"device_vendorID": "0x004C", ...}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawDeviceEntry(Map<String, Value>);

impl RawDeviceEntry {
    /// Build an entry from a display name and its string fields
    pub fn new<'a>(name: &str, fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let props: Map<String, Value> = fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        let mut entry = Map::new();
        entry.insert(name.to_string(), Value::Object(props));
        Self(entry)
    }

    /// Display name of the device (the entry's single key)
    pub fn name(&self) -> Option<&str> {
        self.0.keys().next().map(String::as_str)
    }

    /// String value of a property, `None` when absent or not a string
    pub fn field(&self, key: &str) -> Option<&str> {
        self.0
            .values()
            .next()
            .and_then(Value::as_object)
            .and_then(|props| props.get(key))
            .and_then(Value::as_str)
    }
}

/// Connected and not-connected device lists, in source order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInventory {
    #[serde(default)]
    pub device_connected: Vec<RawDeviceEntry>,
    #[serde(default)]
    pub device_not_connected: Vec<RawDeviceEntry>,
}

#[derive(Debug, Deserialize)]
struct ProfilerOutput {
    #[serde(rename = "SPBluetoothDataType")]
    data_type: Vec<RawInventory>,
}

/// Errors raised while fetching the raw inventory
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("failed to run system_profiler: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("system_profiler exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("malformed Bluetooth inventory: {0}")]
    Json(#[from] serde_json::Error),
}

/// Opaque provider of the raw Bluetooth inventory
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// Fetch the current inventory; called once per query, never cached
    async fn fetch(&self) -> Result<RawInventory, InventoryError>;
}

/// Parse `system_profiler SPBluetoothDataType -json` output
pub fn parse_profiler_output(raw: &str) -> Result<RawInventory, InventoryError> {
    let output: ProfilerOutput = serde_json::from_str(raw)?;
    Ok(output.data_type.into_iter().next().unwrap_or_default())
}

/// Live source backed by `system_profiler`
#[derive(Debug, Clone, Default)]
pub struct SystemProfilerSource;

#[async_trait]
impl DeviceSource for SystemProfilerSource {
    async fn fetch(&self) -> Result<RawInventory, InventoryError> {
        let output = Command::new(SYSTEM_PROFILER)
            .args(["SPBluetoothDataType", "-json"])
            .output()
            .await?;

        if !output.status.success() {
            return Err(InventoryError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let inventory = parse_profiler_output(&stdout)?;
        debug!(
            connected = inventory.device_connected.len(),
            not_connected = inventory.device_not_connected.len(),
            "bluetooth inventory fetched"
        );
        Ok(inventory)
    }
}

/// Development source returning the bundled fixture after a fixed delay
#[derive(Debug, Clone, Default)]
pub struct MockDeviceSource;

impl MockDeviceSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeviceSource for MockDeviceSource {
    async fn fetch(&self) -> Result<RawInventory, InventoryError> {
        info!("development mode: using mocked Bluetooth data");
        tokio::time::sleep(MOCK_DELAY).await;
        parse_profiler_output(MOCK_FIXTURE)
    }
}
