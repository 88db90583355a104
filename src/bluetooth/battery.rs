//! Normalization of raw device records into canonical battery records
//!
//! Accessory generations report battery in different shapes: over-ear models
//! expose a single `device_batteryLevelMain`, in-ear models a left/right/case
//! triple where any member may be missing. Everything funnels into
//! [`CanonicalBatteryRecord`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::source::RawDeviceEntry;

pub const FIELD_ADDRESS: &str = "device_address";
pub const FIELD_BATTERY_MAIN: &str = "device_batteryLevelMain";
pub const FIELD_BATTERY_LEFT: &str = "device_batteryLevelLeft";
pub const FIELD_BATTERY_RIGHT: &str = "device_batteryLevelRight";
pub const FIELD_BATTERY_CASE: &str = "device_batteryLevelCase";
pub const FIELD_CASE_VERSION: &str = "device_caseVersion";

/// Physical shape of the accessory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormFactor {
    OverEar,
    InEar,
}

/// Battery state in one of the two reported shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatteryLevel {
    /// One battery for the whole accessory
    Single { level: u8 },
    /// Separate buds plus charging case; `None` means unknown
    Split {
        left: Option<u8>,
        right: Option<u8>,
        case: Option<u8>,
    },
}

impl BatteryLevel {
    /// Split level with every member unknown
    pub const UNKNOWN: BatteryLevel = BatteryLevel::Split {
        left: None,
        right: None,
        case: None,
    };
}

/// Normalized battery view of one accessory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalBatteryRecord {
    pub name: String,
    pub address: String,
    pub is_connected: bool,
    pub form_factor: FormFactor,
    pub battery_level: BatteryLevel,
}

/// Parse a percentage such as `"55%"` or `"55"`, clamped to 0..=100
///
/// The `%` form takes one to three digits; the bare form any run of digits.
/// Anything else (empty, signed, decorated, non-numeric) is unknown.
pub fn parse_percent(raw: &str) -> Option<u8> {
    let raw = raw.trim();
    let (digits, max_len) = match raw.strip_suffix('%') {
        Some(digits) => (digits, 3),
        None => (raw, usize::MAX),
    };
    if digits.is_empty() || digits.len() > max_len || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Only digits remain, so a failed parse means the value overflowed
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    Some(value.min(100) as u8)
}

fn percent_field(entry: &RawDeviceEntry, key: &str) -> Option<u8> {
    entry.field(key).and_then(parse_percent)
}

/// Normalize a single entry; `None` when the entry carries no display name
pub fn parse_entry(entry: &RawDeviceEntry, connected: bool) -> Option<CanonicalBatteryRecord> {
    let name = entry.name()?;

    let battery_level = match percent_field(entry, FIELD_BATTERY_MAIN) {
        Some(level) => BatteryLevel::Single { level },
        None => {
            let level = BatteryLevel::Split {
                left: percent_field(entry, FIELD_BATTERY_LEFT),
                right: percent_field(entry, FIELD_BATTERY_RIGHT),
                case: percent_field(entry, FIELD_BATTERY_CASE),
            };
            if level == BatteryLevel::UNKNOWN {
                debug!(device = name, "no usable battery fields, reporting unknown levels");
            }
            level
        }
    };

    let has_case = entry.field(FIELD_CASE_VERSION).is_some_and(|v| !v.is_empty());
    let form_factor = if has_case {
        FormFactor::InEar
    } else {
        FormFactor::OverEar
    };

    Some(CanonicalBatteryRecord {
        name: name.to_string(),
        address: entry.field(FIELD_ADDRESS).unwrap_or_default().to_string(),
        is_connected: connected,
        form_factor,
        battery_level,
    })
}

/// Normalize a batch of accepted entries, preserving their order
pub fn parse(entries: &[RawDeviceEntry], connected: bool) -> Vec<CanonicalBatteryRecord> {
    entries
        .iter()
        .filter_map(|entry| parse_entry(entry, connected))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_percent_accepted_forms() {
        assert_eq!(parse_percent("55%"), Some(55));
        assert_eq!(parse_percent("55"), Some(55));
        assert_eq!(parse_percent("0%"), Some(0));
        assert_eq!(parse_percent("100%"), Some(100));
        assert_eq!(parse_percent(" 7% "), Some(7));
    }

    #[test]
    fn test_parse_percent_clamps() {
        assert_eq!(parse_percent("150%"), Some(100));
        assert_eq!(parse_percent("999%"), Some(100));
        assert_eq!(parse_percent("250"), Some(100));
        assert_eq!(parse_percent("99999999999999999999"), Some(100));
        assert_eq!(parse_percent("007"), Some(7));
    }

    #[test]
    fn test_parse_percent_every_three_digit_value() {
        for value in 0..=999u32 {
            let expected = Some(value.min(100) as u8);
            assert_eq!(parse_percent(&format!("{value}%")), expected, "{value}%");
            assert_eq!(parse_percent(&value.to_string()), expected, "{value}");
        }
    }

    #[test]
    fn test_parse_percent_rejects_garbage() {
        for raw in [
            "", "%", "abc", "55 %", "1000%", "5.5%", "5.5", "-5%", "-5", "+55", "+55%", "about 40%",
            "NaN", "0x10",
        ] {
            assert_eq!(parse_percent(raw), None, "{raw:?} should be unknown");
        }
    }

    #[test]
    fn test_split_levels_without_case() {
        let entry = RawDeviceEntry::new(
            "MyPods",
            [
                ("device_vendorID", "0x004C"),
                ("device_minorType", "Headphones"),
                ("device_batteryLevelLeft", "55%"),
                ("device_batteryLevelRight", "60%"),
            ],
        );

        let record = parse_entry(&entry, true).unwrap();
        assert_eq!(record.name, "MyPods");
        assert_eq!(record.address, "");
        assert!(record.is_connected);
        assert_eq!(record.form_factor, FormFactor::OverEar);
        assert_eq!(
            record.battery_level,
            BatteryLevel::Split {
                left: Some(55),
                right: Some(60),
                case: None,
            }
        );
    }

    #[test]
    fn test_main_level_wins_over_split() {
        let entry = RawDeviceEntry::new(
            "AirPods Max",
            [
                ("device_address", "90:9C:4A:5E:6F:70"),
                ("device_batteryLevelMain", "0%"),
                ("device_batteryLevelLeft", "40%"),
            ],
        );

        let record = parse_entry(&entry, false).unwrap();
        assert_eq!(record.battery_level, BatteryLevel::Single { level: 0 });
        assert_eq!(record.address, "90:9C:4A:5E:6F:70");
        assert!(!record.is_connected);
    }

    #[test]
    fn test_unparsable_main_level_falls_back_to_split() {
        let entry = RawDeviceEntry::new(
            "AirPods Pro",
            [
                ("device_batteryLevelMain", "n/a"),
                ("device_batteryLevelCase", "30%"),
                ("device_caseVersion", "1.0.4"),
            ],
        );

        let record = parse_entry(&entry, true).unwrap();
        assert_eq!(record.form_factor, FormFactor::InEar);
        assert_eq!(
            record.battery_level,
            BatteryLevel::Split {
                left: None,
                right: None,
                case: Some(30),
            }
        );
    }

    #[test]
    fn test_empty_case_version_is_over_ear() {
        let entry = RawDeviceEntry::new(
            "AirPods Max",
            [("device_caseVersion", ""), ("device_batteryLevelMain", "45%")],
        );
        assert_eq!(parse_entry(&entry, true).unwrap().form_factor, FormFactor::OverEar);

        let entry = RawDeviceEntry::new("AirPods Pro", [("device_caseVersion", "1.0.4")]);
        assert_eq!(parse_entry(&entry, true).unwrap().form_factor, FormFactor::InEar);
    }

    #[test]
    fn test_no_battery_fields_is_all_unknown() {
        let entry = RawDeviceEntry::new("AirPods", [("device_address", "AA:BB")]);
        let record = parse_entry(&entry, true).unwrap();
        assert_eq!(record.battery_level, BatteryLevel::UNKNOWN);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let entries = vec![
            RawDeviceEntry::new("AirPods Pro", [("device_batteryLevelLeft", "12%")]),
            RawDeviceEntry::new("AirPods Max", [("device_batteryLevelMain", "80")]),
        ];

        let first = parse(&entries, true);
        let second = parse(&entries, true);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_parse_skips_nameless_entries() {
        let entries = vec![RawDeviceEntry::default()];
        assert!(parse(&entries, true).is_empty());
    }

    #[test]
    fn test_record_json_shape() {
        let record = CanonicalBatteryRecord {
            name: "AirPods Max".into(),
            address: "90:9C".into(),
            is_connected: true,
            form_factor: FormFactor::OverEar,
            battery_level: BatteryLevel::Single { level: 45 },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["formFactor"], "over-ear");
        assert_eq!(json["batteryLevel"]["kind"], "single");
        assert_eq!(json["batteryLevel"]["level"], 45);

        let back: CanonicalBatteryRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
