// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use wattledger_core::AccountSource;
use wattledger_types::{AccountDocument, AccountSnapshot};

/// Account source reading a saved supplier account document
#[derive(Debug, Clone)]
pub struct FileAccountSource {
    path: PathBuf,
}

impl FileAccountSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl AccountSource for FileAccountSource {
    fn fetch_account(&self, account_id: &str) -> Result<AccountSnapshot> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read account document {}", self.path.display()))?;
        let document: AccountDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse account document {}", self.path.display()))?;

        Ok(AccountSnapshot::from_document(account_id, &document, Utc::now()))
    }
}
