// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use indexmap::IndexMap;
use tracing::debug;
use wattledger_types::{Agreement, CostType, EnergyType};

use crate::error::{BillingError, DateRangeError, DateSpan, MethodBounds, Result};
use crate::method::Method;

/// Registry key. Names are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub energy_type: EnergyType,
    folded_name: String,
}

impl MethodKey {
    #[must_use]
    pub fn new(energy_type: EnergyType, name: &str) -> Self {
        Self {
            energy_type,
            folded_name: name.to_lowercase(),
        }
    }
}

/// Billing methods per energy type, kept in insertion order
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    methods: IndexMap<MethodKey, Method>,
}

impl MethodRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method built from `agreements`.
    ///
    /// A replaced method keeps its position in the registry and loses any previous calculation.
    pub fn add_method(
        &mut self,
        energy_type: EnergyType,
        name: &str,
        agreements: Vec<Agreement>,
        required: BTreeSet<CostType>,
        replace: bool,
    ) -> Result<&Method> {
        let method = Method::new(energy_type, name, agreements, required)?;
        self.insert(method, replace)
    }

    pub fn insert(&mut self, method: Method, replace: bool) -> Result<&Method> {
        let key = MethodKey::new(method.energy_type(), method.name());

        if !replace && self.methods.contains_key(&key) {
            return Err(BillingError::DuplicateMethod {
                energy_type: method.energy_type(),
                name: method.name().to_owned(),
            });
        }

        debug!(
            energy_type = %method.energy_type(),
            name = method.name(),
            agreements = method.agreements().len(),
            "Registered method"
        );

        let (index, _) = self.methods.insert_full(key, method);
        Ok(&self.methods[index])
    }

    /// Returns `false` when no such method was registered
    pub fn remove_method(&mut self, energy_type: EnergyType, name: &str) -> bool {
        self.methods
            .shift_remove(&MethodKey::new(energy_type, name))
            .is_some()
    }

    #[must_use]
    pub fn find_method(&self, energy_type: EnergyType, name: &str) -> Option<&Method> {
        self.methods.get(&MethodKey::new(energy_type, name))
    }

    pub fn find_method_mut(&mut self, energy_type: EnergyType, name: &str) -> Option<&mut Method> {
        self.methods.get_mut(&MethodKey::new(energy_type, name))
    }

    pub fn methods(&self, energy_type: EnergyType) -> impl Iterator<Item = &Method> {
        self.methods
            .iter()
            .filter(move |(key, _)| key.energy_type == energy_type)
            .map(|(_, method)| method)
    }

    #[must_use]
    pub fn is_empty(&self, energy_type: EnergyType) -> bool {
        self.methods(energy_type).next().is_none()
    }

    /// Check `[from, to)` against the bounds of every method of the energy type.
    ///
    /// All offending methods are reported together, ordered by their start date.
    pub fn check_window(
        &self,
        energy_type: EnergyType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        tz: Tz,
    ) -> std::result::Result<(), DateRangeError> {
        let mut offenders: Vec<&Method> = self
            .methods(energy_type)
            .filter(|method| !method.contains(from, to))
            .collect();

        if offenders.is_empty() {
            return Ok(());
        }
        offenders.sort_by_key(|method| method.from_date());

        let earliest = self
            .methods(energy_type)
            .map(Method::from_date)
            .max()
            .unwrap_or(from);

        Err(DateRangeError::OutsideMethods {
            window: DateSpan::closed(from, to, tz),
            violations: offenders
                .into_iter()
                .map(|method| MethodBounds {
                    name: method.name().to_owned(),
                    bounds: DateSpan::new(method.from_date(), method.to_date(), tz),
                })
                .collect(),
            earliest,
        })
    }
}
