//! Durable state shared across runs

mod kv;
mod persisted;

pub use kv::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};
pub use persisted::{
    PersistentModeState, BATTERY_SNAPSHOT_KEY, LAST_COMMAND_EXECUTED_AT_KEY, NEXT_SWITCH_MODE_KEY,
};
