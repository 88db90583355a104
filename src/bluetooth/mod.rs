//! Bluetooth device inventory and battery normalization
//!
//! Reads the system's Bluetooth inventory (live or mocked), keeps only
//! AirPods, and turns their loosely typed records into canonical battery
//! records.

pub mod battery;
mod inventory;
mod source;

pub use battery::{BatteryLevel, CanonicalBatteryRecord, FormFactor};
pub use inventory::{is_accessory, DeviceInventory, DeviceSets};
pub use source::{
    parse_profiler_output, DeviceSource, InventoryError, MockDeviceSource, RawDeviceEntry,
    RawInventory, SystemProfilerSource,
};
