// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;
use wattledger_types::TimeSpan;

use crate::error::{BillingError, DateSpan, Result};

/// Range and row count gate run after each retrieval and join step
#[derive(Debug, Clone, Copy)]
pub struct CoverageValidator {
    pub tz: Tz,
}

impl CoverageValidator {
    #[must_use]
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Rows must start on or before `from`, end on or after `to` and number exactly
    /// `expected_count`.
    pub fn validate<T: TimeSpan>(
        &self,
        rows: &[T],
        name: &str,
        expected_count: usize,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<()> {
        let first = rows.iter().map(TimeSpan::start).min();
        let last = rows.iter().map(TimeSpan::end).max();

        let (Some(first), Some(last)) = (first, last) else {
            return Err(BillingError::MissingData {
                name: name.to_owned(),
                available: None,
                required: DateSpan::closed(from, to, self.tz),
                missing_days: (to - from).num_days(),
                rows: 0,
                expected_rows: expected_count,
            });
        };

        if first <= from && last >= to && rows.len() == expected_count {
            debug!(name, rows = rows.len(), "Coverage check passed");
            return Ok(());
        }

        Err(BillingError::MissingData {
            name: name.to_owned(),
            available: Some(DateSpan::closed(first, last, self.tz)),
            required: DateSpan::closed(from, to, self.tz),
            missing_days: (first - from).num_days().abs() + (last - to).num_days().abs(),
            rows: rows.len(),
            expected_rows: expected_count,
        })
    }
}
