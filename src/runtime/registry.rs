//! Persisted process registry
//!
//! `processes.json` maps node id to the process started for it. Its presence
//! means the spawn phase completed and the nodes are believed running; it is
//! the only record a later invocation has of what to stop.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to access registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize registry: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Registry {path} is corrupt: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One spawned node process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Filled from the registry key on load
    #[serde(skip)]
    pub node_id: u16,
    pub pid: u32,
    #[serde(rename = "conf")]
    pub config_path: PathBuf,
    #[serde(rename = "log")]
    pub log_path: PathBuf,
    /// Process start time (seconds since epoch) as seen right after spawn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
}

/// All processes started for one cluster, keyed by node id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessRegistry {
    records: BTreeMap<u16, ProcessRecord>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: ProcessRecord) {
        self.records.insert(record.node_id, record);
    }

    pub fn get(&self, node_id: u16) -> Option<&ProcessRecord> {
        self.records.get(&node_id)
    }

    /// Records in ascending node id order
    pub fn records(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_json(&self) -> Result<String, RegistryError> {
        serde_json::to_string_pretty(self).map_err(RegistryError::Serialize)
    }

    /// Load the registry; `Ok(None)` if the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>, RegistryError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(RegistryError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut registry: Self =
            serde_json::from_str(&content).map_err(|source| RegistryError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        for (id, record) in registry.records.iter_mut() {
            record.node_id = *id;
        }
        Ok(Some(registry))
    }

    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        let body = self.to_json()?;
        std::fs::write(path, body).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Delete the registry file; a missing file is not an error
    pub fn remove(path: &Path) -> Result<(), RegistryError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(RegistryError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(node_id: u16, pid: u32) -> ProcessRecord {
        ProcessRecord {
            node_id,
            pid,
            config_path: PathBuf::from(format!("/ws/config/broker-{}.properties", node_id)),
            log_path: PathBuf::from(format!("/ws/logs/broker-{}.log", node_id)),
            started_at: None,
        }
    }

    #[test]
    fn test_file_format_is_keyed_by_node_id() {
        let mut registry = ProcessRegistry::new();
        registry.insert(record(2, 200));
        registry.insert(record(1, 100));

        let json: serde_json::Value = serde_json::from_str(&registry.to_json().unwrap()).unwrap();
        assert_eq!(json["1"]["pid"], 100);
        assert_eq!(json["2"]["conf"], "/ws/config/broker-2.properties");
        assert_eq!(json["2"]["log"], "/ws/logs/broker-2.log");
        assert!(json["1"].get("started_at").is_none());
    }

    #[test]
    fn test_load_restores_node_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("processes.json");
        let mut registry = ProcessRegistry::new();
        registry.insert(record(1, 100));
        registry.insert(record(3, 300));
        registry.save(&path).unwrap();

        let loaded = ProcessRegistry::load(&path).unwrap().unwrap();
        assert_eq!(loaded, registry);
        let ids: Vec<u16> = loaded.records().map(|r| r.node_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unserializable_record_writes_nothing() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("processes.json");
        let mut bad = record(1, 100);
        bad.log_path = PathBuf::from(OsStr::from_bytes(b"/ws/logs/\xff.log"));
        let mut registry = ProcessRegistry::new();
        registry.insert(bad);

        assert!(matches!(
            registry.save(&path),
            Err(RegistryError::Serialize(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("processes.json");
        assert!(ProcessRegistry::load(&path).unwrap().is_none());
        assert!(ProcessRegistry::remove(&path).is_ok());
    }

    #[test]
    fn test_corrupt_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("processes.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            ProcessRegistry::load(&path),
            Err(RegistryError::Parse { .. })
        ));
    }
}
