use crate::config::ConfigSnapshot;
use crate::domain::model::Status;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Declared state carried from one pass to the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateRecord {
    pub status: Status,
    /// Configuration seen at the end of the last successful pass.
    pub previous_config: Option<ConfigSnapshot>,
    /// SHA-256 of watched files, keyed by path.
    pub file_hashes: BTreeMap<String, String>,
    pub last_pass_at: Option<DateTime<Utc>>,
}

impl StateRecord {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No state at {}, starting fresh", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write-then-rename so a crash never leaves half a record behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn stored_hash(&self, path: &Path) -> Option<&str> {
        self.file_hashes
            .get(&path.to_string_lossy().into_owned())
            .map(String::as_str)
    }

    pub fn remember_hash(&mut self, path: &Path, hash: Option<String>) {
        let key = path.to_string_lossy().into_owned();
        match hash {
            Some(h) => {
                self.file_hashes.insert(key, h);
            }
            None => {
                self.file_hashes.remove(&key);
            }
        }
    }
}

/// Content hash of a file, `None` when it does not exist.
pub fn file_hash(path: &Path) -> Result<Option<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(format!("{:x}", Sha256::digest(&bytes)))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
