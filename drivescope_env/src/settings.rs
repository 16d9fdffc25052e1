//! Settings store abstraction.
//!
//! The pipeline never touches storage itself: whoever owns the session
//! loads values through a `SettingsStore` and injects them.

use crate::error::SensorError;
use std::collections::HashMap;

/// Key under which the braking thresholds are persisted.
pub const THRESHOLDS_KEY: &str = "drivescope.braking_thresholds";

/// Get/set of serialized settings values by key.
pub trait SettingsStore {
    /// Returns the stored value, or `None` if the key was never written.
    fn load(&self, key: &str) -> Result<Option<String>, SensorError>;

    /// Writes a value, replacing any previous one.
    fn store(&mut self, key: &str, value: &str) -> Result<(), SensorError>;
}

/// In-memory store, mostly useful for tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    values: HashMap<String, String>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self, key: &str) -> Result<Option<String>, SensorError> {
        Ok(self.values.get(key).cloned())
    }

    fn store(&mut self, key: &str, value: &str) -> Result<(), SensorError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
