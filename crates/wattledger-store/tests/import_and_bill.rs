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

//! Import CSV exports into SQLite, then bill from the store

use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rust_decimal_macros::dec;
use tempfile::TempDir;
use wattledger_core::{BillingCalendar, BillingSession, resolve_account};
use wattledger_store::{FileAccountSource, JsonSnapshotCache, SqliteStore, import};
use wattledger_types::{CostType, EnergyType};

const ACCOUNT_DOCUMENT: &str = r#"{
    "number": "A-TEST",
    "properties": [{
        "electricity_meter_points": [{
            "mpan": "1900000000001",
            "meters": [{"serial_number": "S1"}],
            "agreements": [{
                "tariff_code": "E-1R-FLAT-C",
                "valid_from": "2024-01-01T00:00:00Z",
                "valid_to": null
            }]
        }]
    }]
}"#;

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
}

fn consumption_csv() -> String {
    let mut csv = String::from("Consumption (kWh),Start,End\n");
    for i in 0..10 {
        let start = day(1) + TimeDelta::hours(12) * i;
        let end = start + TimeDelta::hours(12);
        writeln!(csv, "0.5,{},{}", start.to_rfc3339(), end.to_rfc3339()).unwrap();
    }
    csv
}

fn rates_csv(value: &str) -> String {
    format!(
        "value_exc_vat,value_inc_vat,valid_from,valid_to,payment_method\n\
         {value},0,2023-12-01T00:00:00Z,,\n"
    )
}

struct Fixture {
    _dir: TempDir,
    store: SqliteStore,
    cache: JsonSnapshotCache,
    source: FileAccountSource,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(dir.path().join("wattledger.db")).unwrap();

    let document = dir.path().join("account.json");
    std::fs::write(&document, ACCOUNT_DOCUMENT).unwrap();

    store
        .insert_consumption(
            "A-TEST_1900000000001_S1",
            &import::parse_consumption(consumption_csv().as_bytes()).unwrap(),
        )
        .unwrap();
    for (tariff_code, unit_rate) in [("E-1R-FLAT-C", "20"), ("E-1R-FIX-12M-C", "16")] {
        store
            .insert_rates(
                tariff_code,
                CostType::UnitRate,
                &import::parse_rates(rates_csv(unit_rate).as_bytes()).unwrap(),
            )
            .unwrap();
        store
            .insert_rates(
                tariff_code,
                CostType::StandingCharge,
                &import::parse_rates(rates_csv("45").as_bytes()).unwrap(),
            )
            .unwrap();
    }
    store
        .insert_products(
            &import::parse_products(
                "code,display_name,full_name,brand,available_from,available_to\n\
                 FIX-12M,Fixed 12M,Fixed 12 Month,OCTOPUS_ENERGY,2023-12-01T00:00:00Z,\n"
                    .as_bytes(),
            )
            .unwrap(),
        )
        .unwrap();

    Fixture {
        cache: JsonSnapshotCache::with_default_ttl(dir.path().join("accounts")),
        source: FileAccountSource::new(&document),
        store,
        _dir: dir,
    }
}

#[test]
fn test_bill_and_compare_from_store() {
    let fixture = fixture();
    let account = resolve_account(&fixture.cache, &fixture.source, "a-test", Utc::now()).unwrap();
    assert!(fixture.cache.path_for("A-TEST").exists());

    let mut session = BillingSession::new(fixture.store.clone(), account)
        .with_calendar(BillingCalendar::new(chrono_tz::UTC, 2));
    session.add_bill(EnergyType::Electricity).unwrap();
    session
        .add_method_by_product_family(EnergyType::Electricity, "Fixed 12M", BTreeSet::new(), false)
        .unwrap();

    session
        .calculate(EnergyType::Electricity, None, Some(day(6)))
        .unwrap();

    let bill = session
        .report(EnergyType::Electricity, "Bill", None, None)
        .unwrap();
    assert_eq!(bill.consumption_total, dec!(5.0));
    assert_eq!(bill.total, dec!(3.41));

    let fixed = session
        .report(EnergyType::Electricity, "fixed 12m", None, None)
        .unwrap();
    assert_eq!(fixed.unit_cost, dec!(0.80));
    assert_eq!(fixed.total, dec!(3.20));

    let comparison = session.compare(EnergyType::Electricity, None, None).unwrap();
    assert_eq!(comparison.names, ["Bill", "Fixed 12M"]);
    assert_eq!(comparison.matrix[0][1], Some(dec!(6.6)));
    assert_eq!(comparison.matrix[1][0], Some(dec!(-6.6)));
}

#[test]
fn test_missing_rates_in_store_fail_the_calculation() {
    let fixture = fixture();
    let account = resolve_account(&fixture.cache, &fixture.source, "A-TEST", Utc::now()).unwrap();

    let mut session = BillingSession::new(fixture.store.clone(), account)
        .with_calendar(BillingCalendar::new(chrono_tz::UTC, 2));
    session
        .add_method(
            EnergyType::Electricity,
            "Unknown",
            vec![wattledger_types::Agreement::tariff(
                "E-1R-UNKNOWN-C",
                EnergyType::Electricity,
                day(1),
                None,
            )],
            BTreeSet::from([CostType::UnitRate]),
            false,
        )
        .unwrap();

    let err = session
        .calculate(EnergyType::Electricity, None, Some(day(6)))
        .unwrap_err();
    assert!(err.to_string().contains("Unknown"));
}
