//! AirPods discovery on top of a raw device source

use std::sync::Arc;

use tracing::debug;

use super::battery::{self, CanonicalBatteryRecord};
use super::source::{DeviceSource, InventoryError, RawDeviceEntry};

/// Apple's Bluetooth vendor identifier
pub const APPLE_VENDOR_ID: &str = "0x004C";
/// Minor device class reported for headphones
pub const HEADPHONES_MINOR_TYPE: &str = "Headphones";
/// Case-insensitive name keyword identifying the AirPods family
pub const FAMILY_KEYWORD: &str = "airpods";

const FIELD_VENDOR_ID: &str = "device_vendorID";
const FIELD_MINOR_TYPE: &str = "device_minorType";

/// Result of one inventory fetch, unfiltered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSets {
    /// Devices currently connected
    pub connected: Vec<RawDeviceEntry>,
    /// Connected devices first, then paired devices in range
    pub available: Vec<RawDeviceEntry>,
}

/// Heuristic AirPods check: Apple vendor, headphone class, and a name that
/// mentions the family keyword
///
/// Renamed devices can slip past this in either direction.
pub fn is_accessory(entry: &RawDeviceEntry) -> bool {
    let Some(name) = entry.name() else {
        return false;
    };

    entry.field(FIELD_VENDOR_ID) == Some(APPLE_VENDOR_ID)
        && entry.field(FIELD_MINOR_TYPE) == Some(HEADPHONES_MINOR_TYPE)
        && name.to_lowercase().contains(FAMILY_KEYWORD)
}

fn accessories(entries: &[RawDeviceEntry]) -> Vec<RawDeviceEntry> {
    entries.iter().filter(|e| is_accessory(e)).cloned().collect()
}

/// Queries the device source and narrows it down to AirPods
#[derive(Clone)]
pub struct DeviceInventory {
    source: Arc<dyn DeviceSource>,
}

impl DeviceInventory {
    pub fn new(source: Arc<dyn DeviceSource>) -> Self {
        Self { source }
    }

    /// Fetch the inventory once and split it into connected/available sets
    pub async fn fetch_devices(&self) -> Result<DeviceSets, InventoryError> {
        let raw = self.source.fetch().await?;
        let mut available = raw.device_connected.clone();
        available.extend(raw.device_not_connected);
        Ok(DeviceSets {
            connected: raw.device_connected,
            available,
        })
    }

    /// Battery records of every paired AirPods in range, connected ones first
    pub async fn available_accessories(&self) -> Result<Vec<CanonicalBatteryRecord>, InventoryError> {
        let raw = self.source.fetch().await?;
        let mut records = battery::parse(&accessories(&raw.device_connected), true);
        records.extend(battery::parse(&accessories(&raw.device_not_connected), false));
        debug!(count = records.len(), "available AirPods");
        Ok(records)
    }

    /// Whether at least one AirPods device is connected right now
    pub async fn is_any_device_connected(&self) -> Result<bool, InventoryError> {
        let sets = self.fetch_devices().await?;
        Ok(sets.connected.iter().any(is_accessory))
    }
}
