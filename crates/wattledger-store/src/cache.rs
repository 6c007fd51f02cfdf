// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

//! Account snapshot cache, one JSON file per account

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;
use wattledger_core::SnapshotCache;
use wattledger_types::AccountSnapshot;

pub const DEFAULT_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct JsonSnapshotCache {
    dir: PathBuf,
    ttl: TimeDelta,
}

impl JsonSnapshotCache {
    pub fn new<P: AsRef<Path>>(dir: P, ttl: TimeDelta) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            ttl,
        }
    }

    pub fn with_default_ttl<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir, TimeDelta::hours(DEFAULT_TTL_HOURS))
    }

    pub fn path_for(&self, account_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", account_id.to_uppercase()))
    }
}

impl SnapshotCache for JsonSnapshotCache {
    fn load(&self, account_id: &str) -> Result<Option<AccountSnapshot>> {
        let path = self.path_for(account_id);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse account snapshot {}", path.display()))?;
        Ok(Some(snapshot))
    }

    fn store(&self, snapshot: &AccountSnapshot) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.path_for(&snapshot.account_id);
        let temp_path = path.with_extension("tmp");
        let content = serde_json::to_string_pretty(snapshot)?;

        // Atomic write
        std::fs::write(&temp_path, content)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!(account_id = %snapshot.account_id, path = %path.display(), "Saved account snapshot");
        Ok(())
    }

    /// A TTL reaching past the last representable instant never expires
    fn is_stale(&self, snapshot: &AccountSnapshot, now: DateTime<Utc>) -> bool {
        snapshot
            .updated
            .checked_add_signed(self.ttl)
            .is_some_and(|expires| expires < now)
    }
}
