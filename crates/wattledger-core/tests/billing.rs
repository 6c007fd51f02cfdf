// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! End-to-end billing tests
//!
//! Runs `BillingSession` against in-memory providers: calculate -> report -> compare.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wattledger_core::{
    BillingCalendar, BillingError, BillingSession, CONSUMPTION_CHECK, CalorificProvider,
    ConsumptionProvider, DateRangeError, RateProvider,
};
use wattledger_types::{
    AccountSnapshot, Agreement, CalorificRecord, ConsumptionInterval, CostType, EnergyType, Meter,
    PaymentMethod, RateInterval,
};

#[derive(Debug, Default)]
struct MemoryProviders {
    consumption: HashMap<String, Vec<ConsumptionInterval>>,
    rates: HashMap<(String, CostType), Vec<RateInterval>>,
    calorific: Vec<CalorificRecord>,
}

impl MemoryProviders {
    fn with_rate(
        mut self,
        tariff_code: &str,
        cost_type: CostType,
        rate: RateInterval,
    ) -> Self {
        self.rates
            .entry((tariff_code.to_owned(), cost_type))
            .or_default()
            .push(rate);
        self
    }
}

impl ConsumptionProvider for MemoryProviders {
    fn fetch_consumption(
        &self,
        meter_ref: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ConsumptionInterval>> {
        Ok(self
            .consumption
            .get(meter_ref)
            .into_iter()
            .flatten()
            .filter(|c| c.start >= from && c.start < to)
            .cloned()
            .collect())
    }
}

impl RateProvider for MemoryProviders {
    fn fetch_rates(
        &self,
        tariff_code: &str,
        cost_type: CostType,
        payment_method: PaymentMethod,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<RateInterval>> {
        Ok(self
            .rates
            .get(&(tariff_code.to_owned(), cost_type))
            .into_iter()
            .flatten()
            .filter(|r| r.payment_method.is_none_or(|m| m == payment_method))
            .filter(|r| r.overlaps(from, to))
            .cloned()
            .collect())
    }
}

impl CalorificProvider for MemoryProviders {
    fn fetch_calorific_values(
        &self,
        exit_zone: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<CalorificRecord>> {
        Ok(self
            .calorific
            .iter()
            .filter(|r| r.exit_zone == exit_zone)
            .filter(|r| r.to_rate_interval().overlaps(from, to))
            .cloned()
            .collect())
    }
}

const ACCOUNT: &str = "A-TEST";

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
}

fn meter(energy_type: EnergyType) -> Meter {
    Meter {
        mpan_or_mprn: "1900000000001".to_owned(),
        serial_number: "SER1".to_owned(),
        energy_type,
    }
}

fn account(energy_type: EnergyType, tariff_code: &str) -> AccountSnapshot {
    AccountSnapshot {
        account_id: ACCOUNT.to_owned(),
        updated: day(1),
        meters: vec![meter(energy_type)],
        agreements: vec![Agreement::tariff(tariff_code, energy_type, day(1), None)],
        gsp: Some("C".to_owned()),
        distribution_zone: None,
    }
}

/// Readings of `quantity` every 12 hours over `days` days from 1 January
fn twelve_hourly(days: i32, quantity: Decimal) -> Vec<ConsumptionInterval> {
    (0..days * 2)
        .map(|i| {
            let start = day(1) + TimeDelta::hours(12) * i;
            ConsumptionInterval::new(start, start + TimeDelta::hours(12), quantity)
        })
        .collect()
}

fn flat_providers(energy_type: EnergyType, quantity: Decimal) -> MemoryProviders {
    let mut providers = MemoryProviders::default()
        .with_rate(
            "E-1R-FLAT-C",
            CostType::UnitRate,
            RateInterval::new(day(1), None, dec!(20)),
        )
        .with_rate(
            "E-1R-FLAT-C",
            CostType::StandingCharge,
            RateInterval::new(day(1), None, dec!(45)),
        );
    providers.consumption.insert(
        meter(energy_type).meter_ref(ACCOUNT),
        twelve_hourly(5, quantity),
    );
    providers
}

fn session(providers: MemoryProviders, account: AccountSnapshot) -> BillingSession<MemoryProviders> {
    BillingSession::new(providers, account).with_calendar(BillingCalendar::new(chrono_tz::UTC, 2))
}

#[test]
fn test_flat_tariff_bill() {
    let mut session = session(
        flat_providers(EnergyType::Electricity, dec!(0.5)),
        account(EnergyType::Electricity, "E-1R-FLAT-C"),
    );
    session.add_bill(EnergyType::Electricity).unwrap();

    session
        .calculate(EnergyType::Electricity, None, Some(day(6)))
        .unwrap();
    let summary = session
        .report(EnergyType::Electricity, "Bill", None, None)
        .unwrap();

    assert_eq!(summary.unit_cost, dec!(1.00));
    assert_eq!(summary.standing_cost, dec!(2.25));
    assert_eq!(summary.subtotal, dec!(3.25));
    assert_eq!(summary.vat, dec!(0.16));
    assert_eq!(summary.total, dec!(3.41));
    assert_eq!(summary.standing_days, 5);

    // Recalculating yields identical rows
    let first = session
        .find_method(EnergyType::Electricity, "Bill")
        .and_then(|m| m.calculation())
        .cloned()
        .unwrap();
    session
        .calculate(EnergyType::Electricity, None, Some(day(6)))
        .unwrap();
    let second = session
        .find_method(EnergyType::Electricity, "Bill")
        .and_then(|m| m.calculation())
        .unwrap();
    assert_eq!(&first, second);
}

#[test]
fn test_custom_agreement_matches_tariff() {
    let mut session = session(
        flat_providers(EnergyType::Electricity, dec!(0.5)),
        account(EnergyType::Electricity, "E-1R-FLAT-C"),
    );
    session.add_bill(EnergyType::Electricity).unwrap();
    session
        .add_method(
            EnergyType::Electricity,
            "Fixed",
            vec![Agreement::custom(
                "Fixed",
                EnergyType::Electricity,
                day(1),
                None,
                Some(dec!(20)),
                Some(dec!(45)),
            )],
            BTreeSet::new(),
            false,
        )
        .unwrap();

    session
        .calculate(EnergyType::Electricity, None, Some(day(6)))
        .unwrap();
    let comparison = session
        .compare(EnergyType::Electricity, None, None)
        .unwrap();

    assert_eq!(comparison.names, ["Bill", "Fixed"]);
    assert_eq!(comparison.totals, [dec!(3.41), dec!(3.41)]);
    assert_eq!(comparison.matrix[0][1], Some(Decimal::ZERO));
}

#[test]
fn test_compare_two_tariffs() {
    let providers = flat_providers(EnergyType::Electricity, dec!(0.5))
        .with_rate(
            "E-1R-DEAR-C",
            CostType::UnitRate,
            RateInterval::new(day(1), None, dec!(40)),
        )
        .with_rate(
            "E-1R-DEAR-C",
            CostType::StandingCharge,
            RateInterval::new(day(1), None, dec!(60)),
        );
    let mut session = session(providers, account(EnergyType::Electricity, "E-1R-FLAT-C"));
    session.add_bill(EnergyType::Electricity).unwrap();
    session
        .add_method(
            EnergyType::Electricity,
            "Dear",
            vec![Agreement::tariff(
                "E-1R-DEAR-C",
                EnergyType::Electricity,
                day(1),
                None,
            )],
            BTreeSet::new(),
            false,
        )
        .unwrap();

    session
        .calculate(EnergyType::Electricity, Some(day(1)), Some(day(6)))
        .unwrap();
    let comparison = session
        .compare(EnergyType::Electricity, None, None)
        .unwrap();

    // Dear: (200 + 300) pence = £5.00, VAT £0.25
    assert_eq!(comparison.totals, [dec!(3.41), dec!(5.25)]);
    // (3.41 - 5.25) / 5.25 * 100
    assert_eq!(comparison.matrix[0][1], Some(dec!(-35.0)));
    assert_eq!(comparison.matrix[1][0], Some(dec!(35.0)));
}

#[test]
fn test_gas_bill_uses_calorific_values() {
    let mut providers = MemoryProviders::default()
        .with_rate(
            "G-1R-FLAT-C",
            CostType::UnitRate,
            RateInterval::new(day(1), None, dec!(6)),
        )
        .with_rate(
            "G-1R-FLAT-C",
            CostType::StandingCharge,
            RateInterval::new(day(1), None, dec!(30)),
        );
    providers.consumption.insert(
        meter(EnergyType::Gas).meter_ref(ACCOUNT),
        twelve_hourly(2, dec!(1)),
    );
    providers.calorific = (1..=2)
        .map(|d| CalorificRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
            exit_zone: "NW".to_owned(),
            value: dec!(39.2),
        })
        .collect();

    let mut session = session(providers, account(EnergyType::Gas, "G-1R-FLAT-C"))
        .with_distribution_zone("NW");
    session.add_bill(EnergyType::Gas).unwrap();
    session
        .calculate(EnergyType::Gas, Some(day(1)), Some(day(3)))
        .unwrap();

    let calculation = session
        .find_method(EnergyType::Gas, "Bill")
        .and_then(|m| m.calculation())
        .unwrap();
    assert!(
        calculation
            .rows
            .iter()
            .all(|row| row.consumption_converted.round_dp(6) == dec!(11.135413))
    );

    let summary = session.report(EnergyType::Gas, "Bill", None, None).unwrap();
    assert_eq!(summary.consumption_total, dec!(44.5));
    assert_eq!(summary.standing_cost, dec!(0.60));
}

#[test]
fn test_missing_calorific_day_is_fatal() {
    let mut providers = MemoryProviders::default().with_rate(
        "G-1R-FLAT-C",
        CostType::UnitRate,
        RateInterval::new(day(1), None, dec!(6)),
    );
    providers.consumption.insert(
        meter(EnergyType::Gas).meter_ref(ACCOUNT),
        twelve_hourly(2, dec!(1)),
    );
    providers.calorific = vec![CalorificRecord {
        date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        exit_zone: "NW".to_owned(),
        value: dec!(39.2),
    }];

    let mut session = session(providers, account(EnergyType::Gas, "G-1R-FLAT-C"))
        .with_distribution_zone("NW");
    session.add_bill(EnergyType::Gas).unwrap();

    let err = session
        .calculate(EnergyType::Gas, Some(day(1)), Some(day(3)))
        .unwrap_err();

    assert!(matches!(
        err,
        BillingError::MissingData { ref name, missing_days: 1, .. } if name == "calorific values"
    ));
}

#[test]
fn test_partial_rate_gap_is_fatal_and_keeps_previous_results() {
    let mut session = session(
        flat_providers(EnergyType::Electricity, dec!(0.5)),
        account(EnergyType::Electricity, "E-1R-FLAT-C"),
    );
    session.add_bill(EnergyType::Electricity).unwrap();
    session
        .calculate(EnergyType::Electricity, Some(day(1)), Some(day(6)))
        .unwrap();

    // Second agreement has no rate data at all, leaving days 3 to 6 uncovered
    session
        .add_method(
            EnergyType::Electricity,
            "Switched",
            vec![
                Agreement::tariff("E-1R-FLAT-C", EnergyType::Electricity, day(1), Some(day(3))),
                Agreement::tariff("E-1R-GONE-C", EnergyType::Electricity, day(3), None),
            ],
            BTreeSet::new(),
            false,
        )
        .unwrap();

    let err = session
        .calculate(EnergyType::Electricity, Some(day(1)), Some(day(4)))
        .unwrap_err();
    assert!(matches!(
        err,
        BillingError::MissingData { ref name, missing_days: 1, rows: 4, expected_rows: 6, .. }
            if name == "Switched unit rates"
    ));

    let bill = session
        .find_method(EnergyType::Electricity, "Bill")
        .and_then(|m| m.calculation())
        .unwrap();
    assert_eq!(bill.to, day(6));
    assert!(
        session
            .find_method(EnergyType::Electricity, "Switched")
            .and_then(|m| m.calculation())
            .is_none()
    );
}

#[test]
fn test_window_outside_every_method_is_reported_at_once() {
    let mut session = session(
        flat_providers(EnergyType::Electricity, dec!(0.5)),
        account(EnergyType::Electricity, "E-1R-FLAT-C"),
    );
    for (name, from) in [("Late", 3), ("Later", 4)] {
        session
            .add_method(
                EnergyType::Electricity,
                name,
                vec![Agreement::tariff(
                    "E-1R-FLAT-C",
                    EnergyType::Electricity,
                    day(from),
                    None,
                )],
                BTreeSet::new(),
                false,
            )
            .unwrap();
    }

    let err = session
        .calculate(EnergyType::Electricity, Some(day(1)), Some(day(6)))
        .unwrap_err();

    match err {
        BillingError::DateRange(DateRangeError::OutsideMethods {
            violations,
            earliest,
            ..
        }) => {
            assert_eq!(violations.len(), 2);
            assert_eq!(earliest, day(4));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_duplicate_readings_fail_coverage() {
    let mut providers = flat_providers(EnergyType::Electricity, dec!(0.5));
    let meter_ref = meter(EnergyType::Electricity).meter_ref(ACCOUNT);
    if let Some(rows) = providers.consumption.get_mut(&meter_ref) {
        let repeated = rows[3].clone();
        rows.push(repeated);
    }

    let mut session = session(providers, account(EnergyType::Electricity, "E-1R-FLAT-C"));
    session.add_bill(EnergyType::Electricity).unwrap();

    let err = session
        .calculate(EnergyType::Electricity, Some(day(1)), Some(day(6)))
        .unwrap_err();
    assert!(matches!(
        err,
        BillingError::MissingData { rows: 11, expected_rows: 10, .. }
    ));
}

#[test]
fn test_report_requires_known_method() {
    let session = session(
        flat_providers(EnergyType::Electricity, dec!(0.5)),
        account(EnergyType::Electricity, "E-1R-FLAT-C"),
    );

    let err = session
        .report(EnergyType::Electricity, "Nope", None, None)
        .unwrap_err();
    assert!(matches!(err, BillingError::UnknownMethod { .. }));
}

#[test]
fn test_checks_list_repeated_readings_that_block_calculation() {
    let mut providers = flat_providers(EnergyType::Electricity, dec!(0.5));
    let meter_ref = meter(EnergyType::Electricity).meter_ref(ACCOUNT);
    if let Some(rows) = providers.consumption.get_mut(&meter_ref) {
        let repeated = rows[3].clone();
        rows.push(repeated);
    }

    let mut session = session(providers, account(EnergyType::Electricity, "E-1R-FLAT-C"));
    session.add_bill(EnergyType::Electricity).unwrap();
    assert!(
        session
            .calculate(EnergyType::Electricity, Some(day(1)), Some(day(6)))
            .is_err()
    );

    let checks = session
        .checks(EnergyType::Electricity, Some(day(1)), Some(day(6)))
        .unwrap();

    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].name, CONSUMPTION_CHECK);
    assert_eq!(checks[0].rows, 11);
    assert_eq!(
        checks[0].duplicate_starts,
        vec![day(2) + TimeDelta::hours(12)]
    );
}

#[test]
fn test_checks_and_remove_method() {
    let mut session = session(
        flat_providers(EnergyType::Electricity, dec!(0.5)),
        account(EnergyType::Electricity, "E-1R-FLAT-C"),
    );
    session.add_bill(EnergyType::Electricity).unwrap();

    let checks = session
        .checks(EnergyType::Electricity, None, Some(day(6)))
        .unwrap();
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].rows, 10);

    session
        .calculate(EnergyType::Electricity, None, Some(day(6)))
        .unwrap();
    let checks = session
        .checks(EnergyType::Electricity, None, Some(day(6)))
        .unwrap();
    assert_eq!(checks.len(), 2);
    assert_eq!(checks[1].name, "Bill");
    assert_eq!(checks[1].rows, 10);
    assert!(checks.iter().all(|check| check.duplicate_starts.is_empty()));

    assert!(session.remove_method(EnergyType::Electricity, "bill"));
    assert!(!session.remove_method(EnergyType::Electricity, "bill"));
    let checks = session
        .checks(EnergyType::Electricity, None, Some(day(6)))
        .unwrap();
    assert_eq!(checks.len(), 1);
}
