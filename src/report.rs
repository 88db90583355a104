//! Battery status view
//!
//! Shows the cached snapshot first, then refreshes it from the live
//! inventory. A failed refresh degrades to the cached snapshot.

use std::fmt::Write as _;

use tracing::{debug, warn};

use crate::bluetooth::{BatteryLevel, CanonicalBatteryRecord, DeviceInventory, FormFactor};
use crate::storage::PersistentModeState;

/// Coarse battery health bucket used for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryTier {
    High,
    Medium,
    Low,
    Critical,
    Unknown,
}

impl BatteryTier {
    pub fn from_level(level: Option<u8>) -> Self {
        match level {
            None => BatteryTier::Unknown,
            Some(l) if l >= 60 => BatteryTier::High,
            Some(l) if l >= 40 => BatteryTier::Medium,
            Some(l) if l >= 20 => BatteryTier::Low,
            Some(_) => BatteryTier::Critical,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            BatteryTier::High => "▮▮▮▮",
            BatteryTier::Medium => "▮▮▮▯",
            BatteryTier::Low => "▮▮▯▯",
            BatteryTier::Critical => "▮▯▯▯",
            BatteryTier::Unknown => "?",
        }
    }
}

/// What the battery command should display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatteryView {
    pub record: Option<CanonicalBatteryRecord>,
    /// The record comes from the cache and could not be refreshed
    pub stale: bool,
    pub error: Option<String>,
}

/// Refresh the battery view, updating the cached snapshot on success
pub async fn refresh_battery(inventory: &DeviceInventory, state: &PersistentModeState) -> BatteryView {
    let cached = match state.battery_snapshot().await {
        Ok(cached) => cached,
        Err(e) => {
            warn!(?e, "failed to read cached battery snapshot");
            None
        }
    };

    match inventory.available_accessories().await {
        Ok(records) => match records.into_iter().next() {
            Some(record) => {
                if let Err(e) = state.set_battery_snapshot(&record).await {
                    warn!(?e, "failed to cache battery snapshot");
                }
                debug!(name = %record.name, "battery snapshot refreshed");
                BatteryView {
                    record: Some(record),
                    stale: false,
                    error: None,
                }
            }
            None => BatteryView {
                record: None,
                stale: false,
                error: Some("No AirPods found".to_string()),
            },
        },
        Err(e) => {
            warn!(?e, "failed to refresh battery state");
            BatteryView {
                stale: cached.is_some(),
                record: cached,
                error: Some(e.to_string()),
            }
        }
    }
}

fn level_line(out: &mut String, label: &str, level: Option<u8>) {
    let tier = BatteryTier::from_level(level);
    let text = level.map_or_else(|| "N/A".to_string(), |l| format!("{l}%"));
    let _ = writeln!(out, "  {label:<13} {text:>4}  {}", tier.marker());
}

/// Render a record as terminal text
pub fn render_record(record: &CanonicalBatteryRecord) -> String {
    let mut out = String::new();
    let form = match record.form_factor {
        FormFactor::InEar => "in-ear",
        FormFactor::OverEar => "over-ear",
    };
    let connection = if record.is_connected { "connected" } else { "in range" };
    let _ = writeln!(out, "{} ({form}, {connection})", record.name);

    match record.battery_level {
        BatteryLevel::Single { level } => level_line(&mut out, "Battery", Some(level)),
        BatteryLevel::Split { left, right, case } => {
            level_line(&mut out, "Left AirPod", left);
            level_line(&mut out, "Right AirPod", right);
            level_line(&mut out, "Charging Case", case);
        }
    }
    out
}

/// Render the whole view, including errors and staleness
pub fn render_view(view: &BatteryView) -> String {
    let mut out = String::new();
    if let Some(error) = &view.error {
        let _ = writeln!(out, "⚠️ {error}");
    }
    if let Some(record) = &view.record {
        if view.stale {
            let _ = writeln!(out, "Showing last known state:");
        }
        out.push_str(&render_record(record));
    }
    out
}
