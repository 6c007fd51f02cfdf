// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

//! Local calendar handling.
//!
//! Instants are always `DateTime<Utc>`. Calendar dates supplied by users and dates shown in
//! messages are interpreted in the billing timezone.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{BillingError, Result};

/// Default number of days held back from "today" when no end date is given
pub const DEFAULT_SAFETY_MARGIN_DAYS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingCalendar {
    pub tz: Tz,
    /// Rate and consumption data lag behind real time, so the default window ends this many
    /// days before today
    pub safety_margin_days: i64,
}

impl Default for BillingCalendar {
    fn default() -> Self {
        Self {
            tz: chrono_tz::Europe::London,
            safety_margin_days: DEFAULT_SAFETY_MARGIN_DAYS,
        }
    }
}

impl BillingCalendar {
    #[must_use]
    pub fn new(tz: Tz, safety_margin_days: i64) -> Self {
        Self {
            tz,
            safety_margin_days,
        }
    }

    /// Start of the given local day as a UTC instant
    #[must_use]
    pub fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(NaiveTime::MIN);
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .map_or_else(|| naive.and_utc(), |local| local.with_timezone(&Utc))
    }

    #[must_use]
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Local midnight `safety_margin_days` before the current local day
    pub fn default_to(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let date = TimeDelta::try_days(self.safety_margin_days)
            .and_then(|margin| self.local_date(now).checked_sub_signed(margin))
            .ok_or_else(|| {
                BillingError::MissingConfiguration(format!(
                    "a safety margin of {} days is out of range",
                    self.safety_margin_days
                ))
            })?;
        Ok(self.local_midnight(date))
    }

    #[must_use]
    pub fn format_day(&self, instant: DateTime<Utc>) -> String {
        format_day(instant, self.tz)
    }
}

/// `YYYY-MM-DD` of the instant in the given timezone
#[must_use]
pub fn format_day(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

/// Like [`format_day`] with `None` rendered as an open bound
#[must_use]
pub fn format_bound(instant: Option<DateTime<Utc>>, tz: Tz) -> String {
    instant.map_or_else(|| "Infinity".to_owned(), |i| format_day(i, tz))
}
