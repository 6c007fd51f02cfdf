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

//! WattLedger shared types
//!
//! Plain data shared between the billing engine, the storage adapters and the CLI:
//!
//! - **Intervals**: half-open consumption, rate and calorific value records
//! - **Agreements**: tariff agreements, either literal or referencing a tariff code
//! - **Accounts**: meters and agreements parsed from a supplier account document
//! - **Products**: tariff product catalogue entries

pub mod account;
pub mod agreement;
pub mod energy;
pub mod interval;
pub mod product;

pub use account::{AccountDocument, AccountSnapshot, Meter};
pub use agreement::Agreement;
pub use energy::{CostType, EnergyType, ParseError, PaymentMethod};
pub use interval::{CalorificRecord, ConsumptionInterval, RateInterval, TimeSpan};
pub use product::ProductRecord;
