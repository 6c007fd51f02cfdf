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

//! WattLedger storage adapters
//!
//! - [`SqliteStore`]: consumption, rates, calorific values and products in SQLite, implementing
//!   every data provider the billing engine reads from
//! - [`import`]: CSV parsers feeding the store
//! - [`JsonSnapshotCache`] and [`FileAccountSource`]: account snapshot handling

pub mod account;
pub mod cache;
pub mod db;
pub mod import;

pub use account::FileAccountSource;
pub use cache::JsonSnapshotCache;
pub use db::SqliteStore;
