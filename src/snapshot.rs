//! Single-slot safety snapshot store.
//!
//! Before the first mutation of a session the engine captures the
//! pre-change value of every config key the tweak catalog can touch, plus a
//! timestamp and the hardware profile, into one JSON file. Revert restores
//! the captured keys through the executor and deletes the file; the slot is
//! single-use. There is no snapshot history: creating a new snapshot
//! overwrites the old one at the storage level.
//!
//! The store has no internal locking; callers serialize create/revert (see
//! the concurrency notes on [`DecisionEngine`](crate::engine::DecisionEngine)).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TunemarkError};
use crate::hardware::HardwareProfile;
use crate::tweaks::executor::ActionExecutor;

/// Default snapshot file name, placed next to the binary's working
/// directory unless configured otherwise.
pub const DEFAULT_SNAPSHOT_FILE: &str = "tunemark_snapshot.json";

/// The persisted snapshot record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetySnapshot {
    /// Capture time (ISO-8601 in the file)
    pub timestamp: DateTime<Utc>,
    /// Hardware profile at capture time
    pub profile: HardwareProfile,
    /// Config key to pre-change value
    pub backed_up_state: BTreeMap<String, String>,
}

/// Non-mutating view of the stored snapshot for status display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotInfo {
    pub timestamp: DateTime<Utc>,
    pub profile: HardwareProfile,
}

/// File-backed single-slot store.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the slot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Capture a snapshot, overwriting any existing one. Returns the
    /// capture timestamp. Fails only on storage I/O or serialization.
    pub fn create(
        &self,
        profile: &HardwareProfile,
        backed_up_state: BTreeMap<String, String>,
    ) -> Result<DateTime<Utc>> {
        let snapshot = SafetySnapshot {
            timestamp: Utc::now(),
            profile: profile.clone(),
            backed_up_state,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| TunemarkError::SnapshotStorage(e.to_string()))?;
            }
        }

        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(&self.path, json).map_err(|e| TunemarkError::SnapshotStorage(e.to_string()))?;

        log::info!(
            "Safety snapshot created at {} ({} keys)",
            snapshot.timestamp,
            snapshot.backed_up_state.len()
        );
        Ok(snapshot.timestamp)
    }

    /// Whether a snapshot currently exists. Non-mutating and idempotent.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Timestamp and profile of the stored snapshot. `Ok(None)` means the
    /// slot is empty; an unreadable or corrupt slot file is an error, never
    /// silently reported as absent.
    pub fn describe(&self) -> Result<Option<SnapshotInfo>> {
        if !self.exists() {
            return Ok(None);
        }
        let snapshot = self.load()?;
        Ok(Some(SnapshotInfo {
            timestamp: snapshot.timestamp,
            profile: snapshot.profile,
        }))
    }

    /// Restore every backed-up config key through `executor`, then delete
    /// the snapshot. Single-use: a second revert without an intervening
    /// create fails with `SnapshotNotFound`.
    ///
    /// A restore failure aborts before deletion so the slot stays available
    /// for a retry.
    pub fn revert(&self, executor: &mut dyn ActionExecutor) -> Result<()> {
        if !self.exists() {
            return Err(TunemarkError::SnapshotNotFound);
        }
        let snapshot = self.load()?;

        for (key, value) in &snapshot.backed_up_state {
            executor.restore_key(key, value)?;
        }

        fs::remove_file(&self.path).map_err(|e| TunemarkError::SnapshotStorage(e.to_string()))?;
        log::info!(
            "Reverted {} config keys from snapshot taken at {}",
            snapshot.backed_up_state.len(),
            snapshot.timestamp
        );
        Ok(())
    }

    fn load(&self) -> Result<SafetySnapshot> {
        let json =
            fs::read_to_string(&self.path).map_err(|e| TunemarkError::SnapshotStorage(e.to_string()))?;
        Ok(serde_json::from_str(&json)?)
    }
}
