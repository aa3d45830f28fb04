// 🧮 Expense Calculator - versioned aggregation rules
//
// Which fields count as expenses and how the balance is formed are data,
// not code. Every derived record is tagged with the configuration version
// that produced it so older records stay interpretable after the rules move.

use crate::error::ConfigError;
use crate::trip::{from_decimal, round2, round_money, to_decimal, MonetaryField, TripRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

// ============================================================================
// BALANCE FORMULA
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceFormula {
    /// balance = totalExpense − advance
    #[default]
    ExpensesMinusAdvance,

    /// balance = freight − totalExpense − advance.
    /// Only for records that were derived this way; never the default.
    FreightMinusExpensesAndAdvance,
}

impl BalanceFormula {
    pub fn apply(&self, trip: &TripRecord, total_expense: f64) -> f64 {
        let amounts = (
            to_decimal(total_expense),
            to_decimal(trip.advance_amount),
            to_decimal(trip.freight_amount),
        );
        if let (Some(total), Some(advance), Some(freight)) = amounts {
            let balance = match self {
                BalanceFormula::ExpensesMinusAdvance => total.checked_sub(advance),
                BalanceFormula::FreightMinusExpensesAndAdvance => freight
                    .checked_sub(total)
                    .and_then(|rest| rest.checked_sub(advance)),
            };
            if let Some(value) = balance.and_then(from_decimal) {
                return value;
            }
        }

        // Out of Decimal range: plain float arithmetic
        match self {
            BalanceFormula::ExpensesMinusAdvance => total_expense - trip.advance_amount,
            BalanceFormula::FreightMinusExpensesAndAdvance => {
                trip.freight_amount - total_expense - trip.advance_amount
            }
        }
    }
}

// ============================================================================
// EXPENSE CONFIG
// ============================================================================

/// One version of the aggregation rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseConfig {
    pub version: u32,
    pub components: Vec<MonetaryField>,
    #[serde(default)]
    pub formula: BalanceFormula,
}

impl ExpenseConfig {
    pub fn new(
        version: u32,
        components: Vec<MonetaryField>,
        formula: BalanceFormula,
    ) -> Result<Self, ConfigError> {
        let config = ExpenseConfig {
            version,
            components,
            formula,
        };
        config.check()?;
        Ok(config)
    }

    /// Version 1: loading, unloading, driver beta, diesel, oil, fast tag, tax
    pub fn standard() -> Self {
        ExpenseConfig {
            version: 1,
            components: vec![
                MonetaryField::LoadingAmount,
                MonetaryField::UnloadingAmount,
                MonetaryField::DriverBeta,
                MonetaryField::DieselAmount,
                MonetaryField::OilAmount,
                MonetaryField::FastTagAmount,
                MonetaryField::TaxAmount,
            ],
            formula: BalanceFormula::ExpensesMinusAdvance,
        }
    }

    /// Validate a config that may have come from a file
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.components.is_empty() {
            return Err(ConfigError::EmptyComponents {
                version: self.version,
            });
        }

        let mut seen = HashSet::new();
        for field in &self.components {
            if !field.is_expense_component() {
                return Err(ConfigError::NotAnExpenseComponent {
                    version: self.version,
                    field: field.name().to_string(),
                });
            }
            if !seen.insert(*field) {
                return Err(ConfigError::DuplicateComponent {
                    version: self.version,
                    field: field.name().to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Default for ExpenseConfig {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// CALCULATOR
// ============================================================================

/// Pure calculator bound to one configuration.
#[derive(Debug, Clone)]
pub struct ExpenseCalculator {
    config: ExpenseConfig,
}

impl ExpenseCalculator {
    pub fn new(config: ExpenseConfig) -> Result<Self, ConfigError> {
        config.check()?;
        Ok(ExpenseCalculator { config })
    }

    pub fn config(&self) -> &ExpenseConfig {
        &self.config
    }

    /// Sum of the configured components, rounded to 2 places.
    /// Summed in `Decimal` so the result does not depend on component order.
    pub fn total_expense(&self, trip: &TripRecord) -> f64 {
        let amounts = self.config.components.iter().map(|field| trip.amount(*field));

        let exact = amounts
            .clone()
            .try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(to_decimal(amount)?))
            .and_then(|sum| from_decimal(round_money(sum)));

        match exact {
            Some(total) => total,
            // Only unvalidated records get here; validated amounts are bounded
            None => round2(amounts.sum()),
        }
    }

    /// Returns a copy of `trip` with totalExpense, balanceAmount and
    /// formulaVersion set. The input is untouched.
    pub fn derive(&self, trip: &TripRecord) -> TripRecord {
        let total_expense = self.total_expense(trip);
        let balance_amount = round2(self.config.formula.apply(trip, total_expense));

        let mut derived = trip.clone();
        derived.total_expense = total_expense;
        derived.balance_amount = balance_amount;
        derived.formula_version = Some(self.config.version);

        debug!(
            version = self.config.version,
            total_expense, balance_amount, "trip totals derived"
        );
        derived
    }

    pub fn derive_all(&self, trips: &[TripRecord]) -> Vec<TripRecord> {
        trips.iter().map(|trip| self.derive(trip)).collect()
    }
}

impl Default for ExpenseCalculator {
    fn default() -> Self {
        ExpenseCalculator {
            config: ExpenseConfig::standard(),
        }
    }
}

// ============================================================================
// FORMULA REGISTRY
// ============================================================================

/// Every known configuration version, plus the one used for new records.
#[derive(Debug, Clone)]
pub struct FormulaRegistry {
    versions: BTreeMap<u32, ExpenseCalculator>,
    active: u32,
}

impl FormulaRegistry {
    /// Registry holding a single active configuration
    pub fn new(active: ExpenseConfig) -> Result<Self, ConfigError> {
        let version = active.version;
        let mut versions = BTreeMap::new();
        versions.insert(version, ExpenseCalculator::new(active)?);

        Ok(FormulaRegistry {
            versions,
            active: version,
        })
    }

    /// Build from a list of configurations and the version to activate
    pub fn from_configs(configs: Vec<ExpenseConfig>, active: u32) -> Result<Self, ConfigError> {
        let mut versions = BTreeMap::new();
        for config in configs {
            let version = config.version;
            if versions.contains_key(&version) {
                return Err(ConfigError::DuplicateVersion { version });
            }
            versions.insert(version, ExpenseCalculator::new(config)?);
        }

        if !versions.contains_key(&active) {
            return Err(ConfigError::UnknownVersion { version: active });
        }

        Ok(FormulaRegistry { versions, active })
    }

    pub fn register(&mut self, config: ExpenseConfig) -> Result<(), ConfigError> {
        let version = config.version;
        if self.versions.contains_key(&version) {
            return Err(ConfigError::DuplicateVersion { version });
        }
        self.versions.insert(version, ExpenseCalculator::new(config)?);
        Ok(())
    }

    pub fn activate(&mut self, version: u32) -> Result<(), ConfigError> {
        if !self.versions.contains_key(&version) {
            return Err(ConfigError::UnknownVersion { version });
        }
        self.active = version;
        Ok(())
    }

    pub fn active_version(&self) -> u32 {
        self.active
    }

    pub fn versions(&self) -> Vec<u32> {
        self.versions.keys().copied().collect()
    }

    pub fn calculator(&self, version: u32) -> Result<&ExpenseCalculator, ConfigError> {
        self.versions
            .get(&version)
            .ok_or(ConfigError::UnknownVersion { version })
    }

    pub fn active_calculator(&self) -> &ExpenseCalculator {
        // `active` is only ever set to a registered version
        &self.versions[&self.active]
    }

    /// Derive with the active configuration (create/edit flows)
    pub fn derive_current(&self, trip: &TripRecord) -> TripRecord {
        self.active_calculator().derive(trip)
    }

    /// Re-derive with the version the record was tagged with.
    /// Untagged records use the active version.
    pub fn rederive_recorded(&self, trip: &TripRecord) -> Result<TripRecord, ConfigError> {
        match trip.formula_version {
            Some(version) => Ok(self.calculator(version)?.derive(trip)),
            None => Ok(self.derive_current(trip)),
        }
    }
}

impl Default for FormulaRegistry {
    fn default() -> Self {
        let calculator = ExpenseCalculator::default();
        let active = calculator.config().version;
        FormulaRegistry {
            versions: BTreeMap::from([(active, calculator)]),
            active,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
