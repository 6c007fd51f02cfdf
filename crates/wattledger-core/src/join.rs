// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

//! Interval join between consumption readings and rate series.
//!
//! Every consumption interval must be covered by exactly one rate interval. The rate series
//! is sorted once by `valid_from`; for each consumption interval a binary search finds the
//! last rate starting before the interval ends, and a running maximum of `valid_to` bounds
//! how far back overlapping candidates can be.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;
use wattledger_types::{ConsumptionInterval, RateInterval, TimeSpan};

use crate::error::{BillingError, DateSpan, Result};

/// A consumption interval and the rate applying to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    pub consumption: ConsumptionInterval,
    pub rate: RateInterval,
}

impl TimeSpan for Matched {
    fn start(&self) -> DateTime<Utc> {
        self.consumption.start
    }

    fn end(&self) -> DateTime<Utc> {
        self.consumption.end
    }
}

/// Join `consumption` against `rates`.
///
/// Fails with `AmbiguousRate` as soon as an interval is covered by more than one rate, and with
/// `MissingData` describing the uncovered range when any interval has no rate at all.
pub fn join(
    name: &str,
    rates: &[RateInterval],
    consumption: &[ConsumptionInterval],
    tz: Tz,
) -> Result<Vec<Matched>> {
    let mut sorted: Vec<&RateInterval> = rates.iter().collect();
    sorted.sort_by_key(|rate| rate.valid_from);

    let reach: Vec<DateTime<Utc>> = sorted
        .iter()
        .scan(DateTime::<Utc>::MIN_UTC, |max, rate| {
            *max = (*max).max(rate.valid_until());
            Some(*max)
        })
        .collect();

    let mut matched = Vec::with_capacity(consumption.len());
    let mut unmatched: Vec<&ConsumptionInterval> = Vec::new();

    for interval in consumption {
        let upper = sorted.partition_point(|rate| rate.valid_from < interval.end);

        let mut found = None;
        let mut matches = 0;
        for (rate, reaches) in sorted[..upper].iter().zip(&reach[..upper]).rev() {
            if *reaches <= interval.start {
                break;
            }
            if rate.valid_until() > interval.start {
                matches += 1;
                found = Some(*rate);
            }
        }

        match found {
            Some(rate) if matches == 1 => matched.push(Matched {
                consumption: interval.clone(),
                rate: rate.clone(),
            }),
            Some(_) => {
                return Err(BillingError::AmbiguousRate {
                    name: name.to_owned(),
                    start: interval.start,
                    end: interval.end,
                    matches,
                });
            }
            None => unmatched.push(interval),
        }
    }

    if !unmatched.is_empty() {
        return Err(uncovered(name, &sorted, &unmatched, consumption.len(), tz));
    }

    debug!(name, rows = matched.len(), rates = rates.len(), "Joined rates");

    Ok(matched)
}

fn uncovered(
    name: &str,
    sorted: &[&RateInterval],
    unmatched: &[&ConsumptionInterval],
    expected_rows: usize,
    tz: Tz,
) -> BillingError {
    let available = sorted.first().map(|first| {
        let end = if sorted.iter().any(|rate| rate.valid_to.is_none()) {
            None
        } else {
            sorted.iter().filter_map(|rate| rate.valid_to).max()
        };
        DateSpan::new(first.valid_from, end, tz)
    });

    let start = unmatched.iter().map(|c| c.start).min();
    let end = unmatched.iter().map(|c| c.end).max();
    let missing = unmatched
        .iter()
        .fold(chrono::TimeDelta::zero(), |acc, c| acc + c.duration());

    BillingError::MissingData {
        name: name.to_owned(),
        available,
        required: DateSpan::new(start.unwrap_or_default(), end, tz),
        missing_days: missing.num_days(),
        rows: expected_rows - unmatched.len(),
        expected_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use rust_decimal_macros::dec;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn half_hours(from: DateTime<Utc>, count: usize) -> Vec<ConsumptionInterval> {
        (0..count)
            .map(|i| {
                let start = from + TimeDelta::minutes(30) * i32::try_from(i).unwrap();
                ConsumptionInterval::new(start, start + TimeDelta::minutes(30), dec!(0.5))
            })
            .collect()
    }

    #[test]
    fn test_each_interval_gets_exactly_one_rate() {
        let rates = vec![
            RateInterval::new(at(1, 12), None, dec!(25)),
            RateInterval::new(at(1, 0), Some(at(1, 12)), dec!(20)),
        ];
        let consumption = half_hours(at(1, 0), 48);

        let matched = join("unit rates", &rates, &consumption, chrono_tz::UTC).unwrap();

        assert_eq!(matched.len(), 48);
        assert!(matched.iter().take(24).all(|m| m.rate.value == dec!(20)));
        assert!(matched.iter().skip(24).all(|m| m.rate.value == dec!(25)));
    }

    #[test]
    fn test_long_rate_reaches_past_later_short_ones() {
        // The daily rate starts first but must still be seen behind the later, shorter rate
        let rates = vec![
            RateInterval::new(at(1, 0), Some(at(2, 0)), dec!(45)),
            RateInterval::new(at(2, 0), Some(at(2, 1)), dec!(46)),
        ];
        let consumption = half_hours(at(1, 22), 2);

        let matched = join("standing charges", &rates, &consumption, chrono_tz::UTC).unwrap();
        assert!(matched.iter().all(|m| m.rate.value == dec!(45)));
    }

    #[test]
    fn test_overlapping_rates_are_ambiguous() {
        let rates = vec![
            RateInterval::new(at(1, 0), None, dec!(20)),
            RateInterval::new(at(1, 6), Some(at(1, 8)), dec!(30)),
        ];
        let consumption = half_hours(at(1, 7), 1);

        let err = join("unit rates", &rates, &consumption, chrono_tz::UTC).unwrap_err();
        assert!(matches!(err, BillingError::AmbiguousRate { matches: 2, .. }));
    }

    #[test]
    fn test_gap_reports_uncovered_range() {
        let rates = vec![
            RateInterval::new(at(1, 0), Some(at(2, 0)), dec!(20)),
            RateInterval::new(at(3, 0), None, dec!(20)),
        ];
        let consumption = half_hours(at(1, 0), 96);

        let err = join("unit rates", &rates, &consumption, chrono_tz::UTC).unwrap_err();
        match err {
            BillingError::MissingData {
                available,
                required,
                missing_days,
                rows,
                expected_rows,
                ..
            } => {
                assert_eq!(available.map(|a| a.end), Some(None));
                assert_eq!(required.start, at(2, 0));
                assert_eq!(required.end, Some(at(3, 0)));
                assert_eq!(missing_days, 1);
                assert_eq!(rows, 48);
                assert_eq!(expected_rows, 96);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_rates_at_all() {
        let consumption = half_hours(at(1, 0), 4);

        let err = join("unit rates", &[], &consumption, chrono_tz::UTC).unwrap_err();
        assert!(matches!(
            err,
            BillingError::MissingData {
                available: None,
                rows: 0,
                ..
            }
        ));
    }
}
