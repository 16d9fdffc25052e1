//! Settings store backed by a JSON object file.

use drivescope_env::{SensorError, SettingsStore};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Keeps every setting as one member of a top-level JSON object.
///
/// Values that are themselves JSON are stored inline so the file stays
/// hand-editable. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, SensorError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(SensorError::settings(err)),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&raw).map_err(SensorError::settings)? {
            Value::Object(map) => Ok(map),
            _ => Err(SensorError::settings(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn load(&self, key: &str) -> Result<Option<String>, SensorError> {
        Ok(self.read_all()?.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    fn store(&mut self, key: &str, value: &str) -> Result<(), SensorError> {
        let mut all = self.read_all()?;
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        all.insert(key.to_string(), value);

        let json = serde_json::to_string_pretty(&Value::Object(all)).map_err(SensorError::settings)?;
        fs::write(&self.path, json).map_err(SensorError::settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivescope_core::BrakingThresholds;
    use drivescope_env::THRESHOLDS_KEY;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("drivescope-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let store = JsonFileSettingsStore::new(temp_path("missing"));
        assert_eq!(store.load(THRESHOLDS_KEY).unwrap(), None);
        assert_eq!(BrakingThresholds::load_from(&store).unwrap(), None);
    }

    #[test]
    fn test_thresholds_roundtrip_through_file() {
        let path = temp_path("roundtrip");
        let mut store = JsonFileSettingsStore::new(&path);
        BrakingThresholds::product().save_to(&mut store).unwrap();
        store.store("drivescope.theme", "night").unwrap();

        let reopened = JsonFileSettingsStore::new(&path);
        assert_eq!(
            BrakingThresholds::load_from(&reopened).unwrap(),
            Some(BrakingThresholds::product())
        );
        assert_eq!(reopened.load("drivescope.theme").unwrap().as_deref(), Some("night"));

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"speed_threshold_mps\": 1.4"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_non_object_file_is_an_error() {
        let path = temp_path("array");
        fs::write(&path, "[1, 2]").unwrap();
        let store = JsonFileSettingsStore::new(&path);
        assert!(matches!(store.load(THRESHOLDS_KEY), Err(SensorError::Settings(_))));
        fs::remove_file(&path).unwrap();
    }
}
