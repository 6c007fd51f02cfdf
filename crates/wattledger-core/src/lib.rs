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

//! WattLedger billing engine
//!
//! Joins consumption readings to the tariff rates in force at each point in time, converts
//! them into costs and aggregates those costs into bills.
//!
//! ## Pipeline
//!
//! 1. **Providers** supply consumption, rate and calorific value series ([`provider`])
//! 2. **Join** assigns exactly one rate to every consumption interval ([`join`])
//! 3. **Conversion** turns metered quantities into billable kWh ([`conversion`])
//! 4. **Cost** prices each interval ([`cost`])
//! 5. **Coverage** rejects any gap between steps ([`coverage`])
//! 6. **Report** and **compare** aggregate the cost rows over a window ([`report`], [`compare`])
//!
//! [`BillingSession`] ties these together for one account and its [`MethodRegistry`].

pub mod calendar;
pub mod compare;
pub mod conversion;
pub mod cost;
pub mod coverage;
pub mod error;
pub mod join;
pub mod method;
pub mod products;
pub mod provider;
pub mod registry;
pub mod report;
pub mod session;

pub use calendar::BillingCalendar;
pub use compare::Comparison;
pub use cost::CostRow;
pub use coverage::CoverageValidator;
pub use error::{BillingError, DateRangeError, DateSpan, Result};
pub use method::{Method, MethodCalculation};
pub use provider::{
    AccountSource, CalorificProvider, ConsumptionProvider, DataProviders, ProductProvider,
    RateProvider, SnapshotCache, resolve_account,
};
pub use registry::MethodRegistry;
pub use report::{BillLine, BillSummary};
pub use session::{BILL_METHOD, BillingSession, CONSUMPTION_CHECK, RowCheck};
