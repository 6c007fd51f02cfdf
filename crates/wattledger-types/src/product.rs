// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry of the supplier's tariff product catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product code, e.g. `AGILE-23-12-06`
    pub code: String,
    pub display_name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub brand: String,
    pub available_from: DateTime<Utc>,
    #[serde(default)]
    pub available_to: Option<DateTime<Utc>>,
}

impl ProductRecord {
    /// Tariff code for the single-register variant of this product in the given supply region
    #[must_use]
    pub fn tariff_code(&self, prefix: &str, gsp: &str) -> String {
        format!("{prefix}{}-{gsp}", self.code)
    }
}
