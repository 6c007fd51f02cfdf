// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of WattLedger.

//! Billing session: one account, its registered methods and the providers they read from.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use wattledger_types::{
    AccountSnapshot, Agreement, CalorificRecord, ConsumptionInterval, CostType, EnergyType,
    PaymentMethod, ProductRecord, RateInterval,
};

use crate::calendar::BillingCalendar;
use crate::compare::{self, Comparison};
use crate::cost::{self, CostRow, JoinedRates, RateLookup};
use crate::coverage::CoverageValidator;
use crate::error::{BillingError, DateRangeError, Result};
use crate::join::{Matched, join};
use crate::method::{Method, MethodCalculation};
use crate::products::agreements_from_products;
use crate::provider::{DataProviders, ProductProvider};
use crate::registry::MethodRegistry;
use crate::report::{self, BillSummary};

/// Name of the method built from the account's own agreements
pub const BILL_METHOD: &str = "Bill";

/// Label of the raw consumption entry returned by [`BillingSession::checks`]
pub const CONSUMPTION_CHECK: &str = "consumption";

/// Row count and repeated interval starts of one data set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCheck {
    pub name: String,
    pub rows: usize,
    pub duplicate_starts: Vec<DateTime<Utc>>,
}

impl RowCheck {
    fn from_starts(name: &str, starts: impl IntoIterator<Item = DateTime<Utc>>) -> Self {
        let mut seen = BTreeMap::<DateTime<Utc>, usize>::new();
        let mut rows = 0;
        for start in starts {
            *seen.entry(start).or_default() += 1;
            rows += 1;
        }

        Self {
            name: name.to_owned(),
            rows,
            duplicate_starts: seen
                .into_iter()
                .filter(|(_, count)| *count > 1)
                .map(|(start, _)| start)
                .collect(),
        }
    }
}

#[derive(Debug)]
pub struct BillingSession<P> {
    providers: P,
    account: AccountSnapshot,
    calendar: BillingCalendar,
    payment_method: PaymentMethod,
    distribution_zone: Option<String>,
    moved_in: BTreeMap<EnergyType, DateTime<Utc>>,
    registry: MethodRegistry,
}

impl<P> BillingSession<P> {
    pub fn new(providers: P, account: AccountSnapshot) -> Self {
        Self {
            providers,
            account,
            calendar: BillingCalendar::default(),
            payment_method: PaymentMethod::default(),
            distribution_zone: None,
            moved_in: BTreeMap::new(),
            registry: MethodRegistry::new(),
        }
    }

    #[must_use]
    pub fn with_calendar(mut self, calendar: BillingCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    #[must_use]
    pub fn with_payment_method(mut self, payment_method: PaymentMethod) -> Self {
        self.payment_method = payment_method;
        self
    }

    /// Overrides the zone found in the account snapshot
    #[must_use]
    pub fn with_distribution_zone(mut self, zone: impl Into<String>) -> Self {
        self.distribution_zone = Some(zone.into());
        self
    }

    /// Overrides the move-in date derived from the account agreements
    #[must_use]
    pub fn with_moved_in(mut self, energy_type: EnergyType, moved_in: DateTime<Utc>) -> Self {
        self.moved_in.insert(energy_type, moved_in);
        self
    }

    pub fn account(&self) -> &AccountSnapshot {
        &self.account
    }

    pub fn calendar(&self) -> &BillingCalendar {
        &self.calendar
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub fn providers(&self) -> &P {
        &self.providers
    }

    /// Default start of the billing window
    pub fn moved_in(&self, energy_type: EnergyType) -> Option<DateTime<Utc>> {
        self.moved_in
            .get(&energy_type)
            .copied()
            .or_else(|| self.account.moved_in_at(energy_type))
    }

    pub fn distribution_zone(&self) -> Option<&str> {
        self.distribution_zone
            .as_deref()
            .or(self.account.distribution_zone.as_deref())
    }

    pub fn add_method(
        &mut self,
        energy_type: EnergyType,
        name: &str,
        agreements: Vec<Agreement>,
        required: BTreeSet<CostType>,
        replace: bool,
    ) -> Result<()> {
        self.registry
            .add_method(energy_type, name, agreements, required, replace)?;
        Ok(())
    }

    /// Register the account's own agreements as the `Bill` method, replacing any previous one
    pub fn add_bill(&mut self, energy_type: EnergyType) -> Result<()> {
        let agreements = self.account.agreements_for(energy_type);
        if agreements.is_empty() {
            return Err(BillingError::MissingConfiguration(format!(
                "there were no agreements for {energy_type} found in the account information"
            )));
        }

        self.add_method(energy_type, BILL_METHOD, agreements, BTreeSet::new(), true)
    }

    pub fn remove_method(&mut self, energy_type: EnergyType, name: &str) -> bool {
        let removed = self.registry.remove_method(energy_type, name);
        if removed {
            info!(%energy_type, name, "Removed method");
        }
        removed
    }

    pub fn find_method(&self, energy_type: EnergyType, name: &str) -> Option<&Method> {
        self.registry.find_method(energy_type, name)
    }

    /// Fill in the default window bounds and reject empty or reversed windows
    pub fn resolve_window(
        &self,
        energy_type: EnergyType,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let from = match from {
            Some(from) => from,
            None => self.moved_in(energy_type).ok_or_else(|| {
                BillingError::MissingConfiguration(format!(
                    "no move-in date is known for {energy_type}"
                ))
            })?,
        };
        let to = match to {
            Some(to) => to,
            None => self.calendar.default_to(now)?,
        };
        DateRangeError::check_order(from, to, self.calendar.tz)?;

        Ok((from, to))
    }

    pub fn report(
        &self,
        energy_type: EnergyType,
        name: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<BillSummary> {
        let method = self.registry.find_method(energy_type, name).ok_or_else(|| {
            BillingError::UnknownMethod {
                energy_type,
                name: name.to_owned(),
            }
        })?;

        report::report(method, from, to, self.calendar.tz)
    }

    pub fn compare(
        &self,
        energy_type: EnergyType,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Comparison> {
        let methods: Vec<&Method> = self.registry.methods(energy_type).collect();
        compare::compare(&methods, from, to, self.calendar.tz)
    }
}

impl<P: ProductProvider> BillingSession<P> {
    /// Register a method chaining every product of a family, named after the family
    pub fn add_method_by_product_family(
        &mut self,
        energy_type: EnergyType,
        family: &str,
        required: BTreeSet<CostType>,
        replace: bool,
    ) -> Result<()> {
        let products = self.providers.products_by_family(family)?;
        self.add_product_method(energy_type, family, &products, required, replace)
    }

    /// Register a method for a single product, named after its code
    pub fn add_method_by_product_code(
        &mut self,
        energy_type: EnergyType,
        code: &str,
        required: BTreeSet<CostType>,
        replace: bool,
    ) -> Result<()> {
        let products = self.providers.products_by_code(code)?;
        self.add_product_method(energy_type, code, &products, required, replace)
    }

    fn add_product_method(
        &mut self,
        energy_type: EnergyType,
        name: &str,
        products: &[ProductRecord],
        required: BTreeSet<CostType>,
        replace: bool,
    ) -> Result<()> {
        if products.is_empty() {
            return Err(BillingError::MissingConfiguration(format!(
                "no products named {name} were found, import the product catalogue first"
            )));
        }
        let gsp = self.account.gsp.clone().ok_or_else(|| {
            BillingError::MissingConfiguration("the account has no GSP group".to_owned())
        })?;

        let agreements = agreements_from_products(products, energy_type, &gsp);
        self.add_method(energy_type, name, agreements, required, replace)
    }
}

impl<P: DataProviders> BillingSession<P> {
    /// Calculate every method of the energy type over the window, defaulting to the move-in
    /// date and the end of the safety margin
    pub fn calculate(
        &mut self,
        energy_type: EnergyType,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.calculate_at(energy_type, from, to, Utc::now())
    }

    /// [`Self::calculate`] with an explicit current time.
    ///
    /// Either every method gets new cost rows or none does.
    pub fn calculate_at(
        &mut self,
        energy_type: EnergyType,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.registry.is_empty(energy_type) {
            return Err(BillingError::MissingConfiguration(format!(
                "no {energy_type} methods are registered"
            )));
        }

        let (from, to) = self.resolve_window(energy_type, from, to, now)?;
        self.registry
            .check_window(energy_type, from, to, self.calendar.tz)?;

        info!(
            %energy_type,
            from = %self.calendar.format_day(from),
            to = %self.calendar.format_day(to),
            "Getting consumption figures"
        );

        let consumption = self.fetch_consumption(energy_type, from, to)?;
        let calorific_values = match energy_type {
            EnergyType::Gas => Some(self.join_calorific_values(&consumption, from, to)?),
            EnergyType::Electricity => None,
        };

        let calculations = self
            .registry
            .methods(energy_type)
            .map(|method| {
                let calculation =
                    self.calculate_method(method, &consumption, calorific_values.as_ref(), from, to)?;
                Ok((method.name().to_owned(), calculation))
            })
            .collect::<Result<Vec<_>>>()?;

        for (name, calculation) in calculations {
            if let Some(method) = self.registry.find_method_mut(energy_type, &name) {
                method.set_calculation(calculation);
            }
        }

        Ok(())
    }

    /// Row counts and repeated interval starts of the raw consumption over the window, followed
    /// by every method that has been calculated.
    ///
    /// Consumption is read without coverage validation, so repeated readings that make
    /// [`Self::calculate`] fail are still listed here.
    pub fn checks(
        &self,
        energy_type: EnergyType,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<RowCheck>> {
        self.checks_at(energy_type, from, to, Utc::now())
    }

    /// [`Self::checks`] with an explicit current time
    pub fn checks_at(
        &self,
        energy_type: EnergyType,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Vec<RowCheck>> {
        let (from, to) = self.resolve_window(energy_type, from, to, now)?;
        let consumption = self.fetch_raw_consumption(energy_type, from, to)?;

        let mut checks = vec![RowCheck::from_starts(
            CONSUMPTION_CHECK,
            consumption.iter().map(|c| c.start),
        )];
        for method in self.registry.methods(energy_type) {
            let Some(calculation) = method.calculation() else {
                debug!(method = method.name(), "Not calculated, skipped in checks");
                continue;
            };
            checks.push(RowCheck::from_starts(
                method.name(),
                calculation.rows.iter().map(|row| row.start),
            ));
        }

        let duplicates = checks[0].duplicate_starts.len();
        if duplicates > 0 {
            warn!(%energy_type, duplicates, "Consumption has repeated interval starts");
        }
        Ok(checks)
    }

    fn validator(&self) -> CoverageValidator {
        CoverageValidator::new(self.calendar.tz)
    }

    fn fetch_consumption(
        &self,
        energy_type: EnergyType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ConsumptionInterval>> {
        let consumption = self.fetch_raw_consumption(energy_type, from, to)?;

        let distinct = consumption
            .iter()
            .map(|c| c.start)
            .collect::<BTreeSet<_>>()
            .len();
        self.validator()
            .validate(&consumption, "consumption", distinct, from, to)?;

        Ok(consumption)
    }

    /// Readings of every meter of the energy type, sorted by start
    fn fetch_raw_consumption(
        &self,
        energy_type: EnergyType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ConsumptionInterval>> {
        let meters: Vec<_> = self.account.meters_for(energy_type).collect();
        if meters.is_empty() {
            return Err(BillingError::MissingConfiguration(format!(
                "the account has no {energy_type} meters"
            )));
        }

        let mut consumption = Vec::new();
        for meter in meters {
            let meter_ref = meter.meter_ref(&self.account.account_id);
            let rows = self.providers.fetch_consumption(&meter_ref, from, to)?;
            debug!(meter_ref = %meter_ref, rows = rows.len(), "Fetched consumption");
            consumption.extend(rows);
        }
        consumption.sort_by_key(|c| c.start);

        Ok(consumption)
    }

    fn join_calorific_values(
        &self,
        consumption: &[ConsumptionInterval],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<RateLookup> {
        let zone = self.distribution_zone().ok_or_else(|| {
            BillingError::MissingConfiguration(
                "a distribution zone (LDZ) is needed for gas calculations".to_owned(),
            )
        })?;

        let rates: Vec<RateInterval> = self
            .providers
            .fetch_calorific_values(zone, from, to)?
            .iter()
            .map(CalorificRecord::to_rate_interval)
            .collect();

        let matched = join("calorific values", &rates, consumption, self.calendar.tz)?;
        self.validator().validate(
            &matched,
            "calorific values",
            consumption.len(),
            from,
            to,
        )?;

        Ok(cost::lookup(&matched))
    }

    fn calculate_method(
        &self,
        method: &Method,
        consumption: &[ConsumptionInterval],
        calorific_values: Option<&RateLookup>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<MethodCalculation> {
        let mut joined = JoinedRates {
            calorific_values: calorific_values.cloned(),
            ..JoinedRates::default()
        };
        let mut cost_types = BTreeSet::new();

        for cost_type in CostType::ALL {
            let name = format!("{} {}", method.name(), cost_type.label());
            let Some(matched) = self.join_cost_type(method, cost_type, &name, consumption, from, to)?
            else {
                if method.requires(cost_type) {
                    self.validator()
                        .validate::<Matched>(&[], &name, consumption.len(), from, to)?;
                }
                debug!(method = method.name(), %cost_type, "No rate data, cost type omitted");
                continue;
            };

            self.validator()
                .validate(&matched, &name, consumption.len(), from, to)?;

            let series = Some(cost::lookup(&matched));
            match cost_type {
                CostType::UnitRate => joined.unit_rates = series,
                CostType::StandingCharge => joined.standing_charges = series,
            }
            cost_types.insert(cost_type);
        }

        if cost_types.is_empty() {
            let name = format!("{} rates", method.name());
            self.validator()
                .validate::<Matched>(&[], &name, consumption.len(), from, to)?;
        }

        let rows = cost::compute(
            method.name(),
            method.energy_type(),
            consumption,
            &joined,
            self.calendar.tz,
        )?;

        let total: Decimal = rows.iter().map(CostRow::total).sum();
        info!(
            method = method.name(),
            rows = rows.len(),
            total_pence = %total,
            "Method calculated"
        );

        Ok(MethodCalculation {
            from,
            to,
            rows,
            cost_types,
        })
    }

    /// Join one cost type across the method's agreements.
    ///
    /// Returns `None` when no agreement produced any rate data over the window.
    fn join_cost_type(
        &self,
        method: &Method,
        cost_type: CostType,
        name: &str,
        consumption: &[ConsumptionInterval],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<Vec<Matched>>> {
        let mut matched = Vec::with_capacity(consumption.len());
        let mut found_rates = false;

        for agreement in method.active_agreements() {
            let start = agreement.valid_from.max(from);
            let end = agreement.valid_until().min(to);
            if start >= end {
                continue;
            }

            let subset: Vec<ConsumptionInterval> = consumption
                .iter()
                .filter(|c| c.start >= start && c.start < end)
                .cloned()
                .collect();
            if subset.is_empty() {
                continue;
            }

            let rates = if agreement.is_custom() {
                let Some(value) = agreement.literal_rate(cost_type) else {
                    continue;
                };
                vec![RateInterval::new(
                    agreement.valid_from,
                    agreement.valid_to,
                    value,
                )]
            } else {
                self.providers.fetch_rates(
                    &agreement.tariff_code,
                    cost_type,
                    self.payment_method,
                    start,
                    end,
                )?
            };

            if rates.is_empty() {
                warn!(
                    method = method.name(),
                    tariff_code = %agreement.tariff_code,
                    %cost_type,
                    "No rate data for agreement"
                );
                continue;
            }

            found_rates = true;
            matched.extend(join(name, &rates, &subset, self.calendar.tz)?);
        }

        Ok(found_rates.then_some(matched))
    }
}
