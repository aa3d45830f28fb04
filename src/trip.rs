// 🚚 Trip Record - the data model every component works on
//
// Monetary components are stored as plain f64 fields (the persisted JSON
// shape) but addressed through `MonetaryField` so configuration can name
// them by value.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// MONETARY FIELDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MonetaryField {
    FreightAmount,
    FreightPerTon,
    LoadingAmount,
    UnloadingAmount,
    DriverBeta,
    DieselAmount,
    OilAmount,
    FastTagAmount,
    TaxAmount,
    TollAmount,
    OtherExpense,
    AdvanceAmount,
}

impl MonetaryField {
    /// Canonical order. The validator evaluates fields in this order.
    pub const ALL: [MonetaryField; 12] = [
        MonetaryField::FreightAmount,
        MonetaryField::FreightPerTon,
        MonetaryField::LoadingAmount,
        MonetaryField::UnloadingAmount,
        MonetaryField::DriverBeta,
        MonetaryField::DieselAmount,
        MonetaryField::OilAmount,
        MonetaryField::FastTagAmount,
        MonetaryField::TaxAmount,
        MonetaryField::TollAmount,
        MonetaryField::OtherExpense,
        MonetaryField::AdvanceAmount,
    ];

    /// Field name as it appears in raw input and persisted records
    pub fn name(&self) -> &'static str {
        match self {
            MonetaryField::FreightAmount => "freightAmount",
            MonetaryField::FreightPerTon => "freightPerTon",
            MonetaryField::LoadingAmount => "loadingAmount",
            MonetaryField::UnloadingAmount => "unloadingAmount",
            MonetaryField::DriverBeta => "driverBeta",
            MonetaryField::DieselAmount => "dieselAmount",
            MonetaryField::OilAmount => "oilAmount",
            MonetaryField::FastTagAmount => "fastTagAmount",
            MonetaryField::TaxAmount => "taxAmount",
            MonetaryField::TollAmount => "tollAmount",
            MonetaryField::OtherExpense => "otherExpense",
            MonetaryField::AdvanceAmount => "advanceAmount",
        }
    }

    /// Whether this field may be summed into `totalExpense`.
    /// Freight and advance are income/prepayment, never expenses.
    pub fn is_expense_component(&self) -> bool {
        !matches!(
            self,
            MonetaryField::FreightAmount | MonetaryField::FreightPerTon | MonetaryField::AdvanceAmount
        )
    }
}

impl fmt::Display for MonetaryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MonetaryField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MonetaryField::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| format!("unknown monetary field '{}'", s))
    }
}

// ============================================================================
// ROUNDING
// ============================================================================

/// Round to 2 decimal places, half away from zero.
///
/// Rounds the shortest decimal form of `value` (what it prints as), so
/// 1.005 → 1.01 and 2.344999999 → 2.34. Values too large for `Decimal`
/// are already whole numbers and come back unchanged.
pub fn round2(value: f64) -> f64 {
    match to_decimal(value) {
        Some(amount) => from_decimal(round_money(amount)).unwrap_or(value),
        None if value.abs() < 0.005 => 0.0,
        None => value,
    }
}

/// Shortest decimal form of a finite f64; None when it does not fit
pub fn to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Nearest f64, with -0 folded to 0
pub fn from_decimal(amount: Decimal) -> Option<f64> {
    let value = amount.to_string().parse::<f64>().ok()?;
    Some(if value == 0.0 { 0.0 } else { value })
}

// ============================================================================
// TRIP RECORD
// ============================================================================

/// One truck journey and its money.
///
/// `id` is assigned by the store. `truck_ref` is a weak reference to a
/// `TruckRecord` id and implies no ownership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub date: NaiveDate,

    #[serde(default)]
    pub truck_ref: Option<String>,

    pub destination: String,

    // ========================================================================
    // MONETARY COMPONENTS (default 0, never negative)
    // ========================================================================
    #[serde(default)]
    pub freight_amount: f64,
    #[serde(default)]
    pub freight_per_ton: f64,
    #[serde(default)]
    pub loading_amount: f64,
    #[serde(default)]
    pub unloading_amount: f64,
    #[serde(default)]
    pub driver_beta: f64,
    #[serde(default)]
    pub diesel_amount: f64,
    #[serde(default)]
    pub oil_amount: f64,
    #[serde(default)]
    pub fast_tag_amount: f64,
    #[serde(default)]
    pub tax_amount: f64,
    #[serde(default)]
    pub toll_amount: f64,
    #[serde(default)]
    pub other_expense: f64,
    #[serde(default)]
    pub advance_amount: f64,

    // ========================================================================
    // DERIVED (written only by the expense calculator)
    // ========================================================================
    #[serde(default)]
    pub total_expense: f64,
    #[serde(default)]
    pub balance_amount: f64,

    /// Version of the expense configuration that produced the derived fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula_version: Option<u32>,
}

impl TripRecord {
    /// New underived trip with every amount at zero
    pub fn new(date: NaiveDate, truck_ref: impl Into<String>, destination: impl Into<String>) -> Self {
        TripRecord {
            id: None,
            date,
            truck_ref: Some(truck_ref.into()),
            destination: destination.into(),
            freight_amount: 0.0,
            freight_per_ton: 0.0,
            loading_amount: 0.0,
            unloading_amount: 0.0,
            driver_beta: 0.0,
            diesel_amount: 0.0,
            oil_amount: 0.0,
            fast_tag_amount: 0.0,
            tax_amount: 0.0,
            toll_amount: 0.0,
            other_expense: 0.0,
            advance_amount: 0.0,
            total_expense: 0.0,
            balance_amount: 0.0,
            formula_version: None,
        }
    }

    /// Builder: set one monetary component
    pub fn with_amount(mut self, field: MonetaryField, value: f64) -> Self {
        self.set_amount(field, value);
        self
    }

    pub fn amount(&self, field: MonetaryField) -> f64 {
        match field {
            MonetaryField::FreightAmount => self.freight_amount,
            MonetaryField::FreightPerTon => self.freight_per_ton,
            MonetaryField::LoadingAmount => self.loading_amount,
            MonetaryField::UnloadingAmount => self.unloading_amount,
            MonetaryField::DriverBeta => self.driver_beta,
            MonetaryField::DieselAmount => self.diesel_amount,
            MonetaryField::OilAmount => self.oil_amount,
            MonetaryField::FastTagAmount => self.fast_tag_amount,
            MonetaryField::TaxAmount => self.tax_amount,
            MonetaryField::TollAmount => self.toll_amount,
            MonetaryField::OtherExpense => self.other_expense,
            MonetaryField::AdvanceAmount => self.advance_amount,
        }
    }

    pub fn set_amount(&mut self, field: MonetaryField, value: f64) {
        let slot = match field {
            MonetaryField::FreightAmount => &mut self.freight_amount,
            MonetaryField::FreightPerTon => &mut self.freight_per_ton,
            MonetaryField::LoadingAmount => &mut self.loading_amount,
            MonetaryField::UnloadingAmount => &mut self.unloading_amount,
            MonetaryField::DriverBeta => &mut self.driver_beta,
            MonetaryField::DieselAmount => &mut self.diesel_amount,
            MonetaryField::OilAmount => &mut self.oil_amount,
            MonetaryField::FastTagAmount => &mut self.fast_tag_amount,
            MonetaryField::TaxAmount => &mut self.tax_amount,
            MonetaryField::TollAmount => &mut self.toll_amount,
            MonetaryField::OtherExpense => &mut self.other_expense,
            MonetaryField::AdvanceAmount => &mut self.advance_amount,
        };
        *slot = value;
    }

    /// True once an expense configuration has derived the totals
    pub fn is_derived(&self) -> bool {
        self.formula_version.is_some()
    }

    /// Content hash for idempotent imports.
    /// Covers the user-supplied fields only; id and derived fields are excluded
    /// so re-deriving a trip never changes its hash.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.date.format("%Y-%m-%d").to_string());
        hasher.update([0u8]);
        hasher.update(self.truck_ref.as_deref().unwrap_or(""));
        hasher.update([0u8]);
        hasher.update(self.destination.as_bytes());
        for field in MonetaryField::ALL {
            hasher.update([0u8]);
            hasher.update(self.amount(field).to_string());
        }
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trip() -> TripRecord {
        TripRecord::new(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(), "truck-1", "Chennai")
            .with_amount(MonetaryField::LoadingAmount, 300.0)
            .with_amount(MonetaryField::AdvanceAmount, 5000.0)
    }

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(1.005), 1.01);
        assert_eq!(round2(2.675), 2.68);
        assert_eq!(round2(-2.345), -2.35);
        assert_eq!(round2(0.1 + 0.2), 0.3);
        assert_eq!(round2(5750.0), 5750.0);
        assert_eq!(round2(-0.001), 0.0);
    }

    #[test]
    fn test_round2_just_below_half_rounds_down() {
        assert_eq!(round2(2.344999999), 2.34);
        assert_eq!(round2(0.004999996), 0.0);
        assert_eq!(round2(1.0049999), 1.0);
        assert_eq!(round2(0.125), 0.13);
    }

    #[test]
    fn test_round2_large_values_stay_finite() {
        assert_eq!(round2(1e301), 1e301);
        assert_eq!(round2(f64::MAX), f64::MAX);
        assert_eq!(round2(123_456_789_012.345), 123_456_789_012.35);
        assert!(round2(1e-40) == 0.0);
    }

    #[test]
    fn test_decimal_helpers() {
        assert_eq!(to_decimal(f64::NAN), None);
        assert_eq!(to_decimal(0.1).unwrap().to_string(), "0.1");
        assert_eq!(round_money(to_decimal(2.675).unwrap()).to_string(), "2.68");
        assert_eq!(from_decimal(round_money(to_decimal(-0.004).unwrap())), Some(0.0));
    }

    #[test]
    fn test_field_name_round_trip() {
        for field in MonetaryField::ALL {
            assert_eq!(field.name().parse::<MonetaryField>().unwrap(), field);
        }
        assert!("totalExpense".parse::<MonetaryField>().is_err());
    }

    #[test]
    fn test_expense_components_exclude_income() {
        assert!(!MonetaryField::FreightAmount.is_expense_component());
        assert!(!MonetaryField::FreightPerTon.is_expense_component());
        assert!(!MonetaryField::AdvanceAmount.is_expense_component());
        assert!(MonetaryField::TollAmount.is_expense_component());
        assert_eq!(
            MonetaryField::ALL.iter().filter(|f| f.is_expense_component()).count(),
            9
        );
    }

    #[test]
    fn test_amount_accessors() {
        let mut trip = sample_trip();
        assert_eq!(trip.amount(MonetaryField::LoadingAmount), 300.0);
        trip.set_amount(MonetaryField::OtherExpense, 12.5);
        assert_eq!(trip.other_expense, 12.5);
    }

    #[test]
    fn test_serde_camel_case_shape() {
        let trip = sample_trip();
        let json = serde_json::to_value(&trip).unwrap();

        assert_eq!(json["date"], "2024-03-15");
        assert_eq!(json["truckRef"], "truck-1");
        assert_eq!(json["loadingAmount"], 300.0);
        assert!(json.get("id").is_none());
        assert!(json.get("formulaVersion").is_none());

        let back: TripRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, trip);
    }

    #[test]
    fn test_missing_amounts_default_to_zero() {
        let trip: TripRecord = serde_json::from_str(
            r#"{"date":"2024-01-02","truckRef":"t1","destination":"Salem"}"#,
        )
        .unwrap();
        assert_eq!(trip.diesel_amount, 0.0);
        assert!(!trip.is_derived());
    }

    #[test]
    fn test_content_hash_ignores_derived_fields() {
        let trip = sample_trip();
        let mut derived = trip.clone();
        derived.total_expense = 300.0;
        derived.balance_amount = -4700.0;
        derived.formula_version = Some(1);
        derived.id = Some("abc".to_string());

        assert_eq!(trip.content_hash(), derived.content_hash());
        assert_eq!(trip.content_hash().len(), 64);

        let other = sample_trip().with_amount(MonetaryField::OilAmount, 1.0);
        assert_ne!(trip.content_hash(), other.content_hash());

        // amounts differing past the second decimal are different trips
        let finer = sample_trip().with_amount(MonetaryField::LoadingAmount, 300.001);
        assert_ne!(trip.content_hash(), finer.content_hash());
    }
}
