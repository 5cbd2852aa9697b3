use crate::series::Sample;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const AVERAGES_SLOT: &str = "averages";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create persistence directory {path}: {source}")]
    Create {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write slot {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to encode slot {name}: {source}")]
    Encode {
        name: String,
        source: serde_json::Error,
    },
}

/// Durable slot-based storage: one JSON file per metric series plus one for
/// the derived averages snapshot. Every write is a whole-file replacement;
/// the loaders tolerate missing, empty, and corrupt slots, which is the only
/// defense against a crash mid-write.
#[derive(Debug)]
pub struct TrendStore {
    dir: PathBuf,
}

impl TrendStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Create {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    pub fn save_series(&self, name: &str, samples: &[Sample]) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(samples).map_err(|source| StoreError::Encode {
            name: name.to_string(),
            source,
        })?;
        self.write_slot(name, &encoded)
    }

    /// Empty result, not an error, when the slot is missing, blank, or
    /// corrupt. Corruption is logged and swallowed.
    pub fn load_series(&self, name: &str) -> Vec<Sample> {
        match self.read_slot(name) {
            Some(text) => match serde_json::from_str(&text) {
                Ok(samples) => samples,
                Err(err) => {
                    warn!(slot = name, error = %err, "discarding corrupt series slot");
                    Vec::new()
                }
            },
            None => Vec::new(),
        }
    }

    pub fn save_averages(&self, averages: &BTreeMap<String, i64>) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(averages).map_err(|source| StoreError::Encode {
            name: AVERAGES_SLOT.to_string(),
            source,
        })?;
        self.write_slot(AVERAGES_SLOT, &encoded)
    }

    pub fn load_averages(&self) -> BTreeMap<String, i64> {
        match self.read_slot(AVERAGES_SLOT) {
            Some(text) => match serde_json::from_str(&text) {
                Ok(map) => map,
                Err(err) => {
                    warn!(slot = AVERAGES_SLOT, error = %err, "discarding corrupt averages slot");
                    BTreeMap::new()
                }
            },
            None => BTreeMap::new(),
        }
    }

    /// Removes every slot this store knows about. Used on graceful shutdown
    /// when history is session-scoped.
    pub fn purge(&self, slots: &[&str]) {
        for name in slots.iter().copied().chain(std::iter::once(AVERAGES_SLOT)) {
            let path = self.slot_path(name);
            match fs::remove_file(&path) {
                Ok(()) => debug!(slot = name, "slot removed"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!(slot = name, error = %err, "failed to remove slot"),
            }
        }
    }

    fn write_slot(&self, name: &str, encoded: &[u8]) -> Result<(), StoreError> {
        let path = self.slot_path(name);
        fs::write(&path, encoded).map_err(|source| StoreError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    fn read_slot(&self, name: &str) -> Option<String> {
        let path = self.slot_path(name);
        match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => None,
            Ok(text) => Some(text),
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(slot = name, error = %err, "failed to read slot");
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Metric;

    fn samples() -> Vec<Sample> {
        vec![
            Sample::new("10:00:01", 41.0),
            Sample::new("10:00:03", 43.5),
            Sample::new("10:00:05", 40.0),
        ]
    }

    #[test]
    fn series_round_trip_is_elementwise_equal() {
        let dir = tempfile::tempdir().unwrap();
        let store = TrendStore::open(dir.path()).unwrap();

        store.save_series("cpu_temp", &samples()).unwrap();
        assert_eq!(store.load_series("cpu_temp"), samples());
    }

    #[test]
    fn missing_slot_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TrendStore::open(dir.path()).unwrap();

        assert!(store.load_series("gpu_temp").is_empty());
        assert!(store.load_averages().is_empty());
    }

    #[test]
    fn corrupt_slot_loads_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TrendStore::open(dir.path()).unwrap();

        fs::write(dir.path().join("cpu_load.json"), b"{not json").unwrap();
        fs::write(dir.path().join("averages.json"), b"[truncat").unwrap();

        assert!(store.load_series("cpu_load").is_empty());
        assert!(store.load_averages().is_empty());
    }

    #[test]
    fn blank_slot_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TrendStore::open(dir.path()).unwrap();

        fs::write(dir.path().join("averages.json"), b"  \n").unwrap();
        assert!(store.load_averages().is_empty());
    }

    #[test]
    fn save_overwrites_whole_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = TrendStore::open(dir.path()).unwrap();

        store.save_series("gpu_load", &samples()).unwrap();
        let shorter = vec![Sample::new("10:00:07", 7.0)];
        store.save_series("gpu_load", &shorter).unwrap();

        assert_eq!(store.load_series("gpu_load"), shorter);
    }

    #[test]
    fn averages_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TrendStore::open(dir.path()).unwrap();

        let mut averages = BTreeMap::new();
        averages.insert("cpu_temp".to_string(), 52_i64);
        averages.insert("gpu_load".to_string(), 0_i64);
        store.save_averages(&averages).unwrap();

        assert_eq!(store.load_averages(), averages);
    }

    #[test]
    fn purge_removes_all_slots() {
        let dir = tempfile::tempdir().unwrap();
        let store = TrendStore::open(dir.path()).unwrap();

        let slot_names: Vec<&str> = Metric::ALL.iter().map(|m| m.slot()).collect();
        for name in &slot_names {
            store.save_series(name, &samples()).unwrap();
        }
        store.save_averages(&BTreeMap::new()).unwrap();

        store.purge(&slot_names);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        // Purging again is harmless.
        store.purge(&slot_names);
    }
}
