// 📐 Input Validator - raw field map → typed TripRecord
//
// Fail fast: fields are checked in a fixed order and the first failure
// rejects the whole record. The input map is never modified.

use crate::error::ValidationError;
use crate::fleet::Fleet;
use crate::trip::{MonetaryField, TripRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

pub const DATE_FIELD: &str = "date";
pub const TRUCK_REF_FIELD: &str = "truckRef";
pub const DESTINATION_FIELD: &str = "destination";

/// Largest accepted monetary amount. Nine components at this size still sum
/// to a whole number of paise in an f64.
pub const MAX_AMOUNT: f64 = 1_000_000_000_000.0;

/// Historical form field name for the truck reference
const TRUCK_REF_ALIAS: &str = "truckId";

// ============================================================================
// RAW INPUT
// ============================================================================

/// Field name → raw value, as submitted by a form, a CSV row or a JSON body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTripInput {
    fields: HashMap<String, Value>,
}

impl RawTripInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from string pairs (form posts, CSV rows)
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        RawTripInput {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        }
    }

    /// Raw view of a typed record, the starting point of an edit
    pub fn from_record(trip: &TripRecord) -> Self {
        let mut fields = HashMap::new();
        fields.insert(
            DATE_FIELD.to_string(),
            Value::String(trip.date.format("%Y-%m-%d").to_string()),
        );
        if let Some(truck_ref) = &trip.truck_ref {
            fields.insert(TRUCK_REF_FIELD.to_string(), Value::String(truck_ref.clone()));
        }
        fields.insert(
            DESTINATION_FIELD.to_string(),
            Value::String(trip.destination.clone()),
        );
        for field in MonetaryField::ALL {
            fields.insert(field.name().to_string(), Value::from(trip.amount(field)));
        }
        RawTripInput { fields }
    }

    /// Builder: set one field
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<HashMap<String, Value>> for RawTripInput {
    fn from(fields: HashMap<String, Value>) -> Self {
        RawTripInput { fields }
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct InputValidator;

impl InputValidator {
    pub fn new() -> Self {
        InputValidator
    }

    /// Validate a raw record and produce an underived `TripRecord`.
    ///
    /// Order: date, truckRef, destination, then monetary fields in
    /// `MonetaryField::ALL` order. Absent or blank amounts become 0.
    pub fn validate(&self, raw: &RawTripInput) -> Result<TripRecord, ValidationError> {
        let date = parse_date(raw.get(DATE_FIELD))?;

        let truck_ref = raw
            .get(TRUCK_REF_FIELD)
            .or_else(|| raw.get(TRUCK_REF_ALIAS));
        let truck_ref = required_text(TRUCK_REF_FIELD, truck_ref)?;

        let destination = required_text(DESTINATION_FIELD, raw.get(DESTINATION_FIELD))?;

        let mut trip = TripRecord::new(date, truck_ref, destination);
        for field in MonetaryField::ALL {
            let amount = parse_amount(field.name(), raw.get(field.name()))?;
            trip.set_amount(field, amount);
        }

        debug!(date = %trip.date, destination = %trip.destination, "trip input validated");
        Ok(trip)
    }

    /// Overlay `changes` on a stored trip and validate the result. A changed
    /// truck reference (truckRef or truckId) may be a vehicle number and is
    /// resolved through `fleet`. The stored id is kept; derived fields are
    /// left for the calculator.
    pub fn validate_edit(
        &self,
        existing: &TripRecord,
        changes: &RawTripInput,
        fleet: &Fleet,
    ) -> Result<TripRecord, ValidationError> {
        let mut raw = RawTripInput::from_record(existing);
        for (field, value) in &changes.fields {
            if field == TRUCK_REF_FIELD || field == TRUCK_REF_ALIAS {
                let resolved = match value {
                    Value::String(typed) => Value::String(fleet.reference_for(typed)),
                    other => other.clone(),
                };
                raw.fields.insert(TRUCK_REF_FIELD.to_string(), resolved);
            } else {
                raw.fields.insert(field.clone(), value.clone());
            }
        }

        let mut trip = self.validate(&raw)?;
        trip.id = existing.id.clone();
        Ok(trip)
    }

    /// Re-check an already typed record (stored trips before re-deriving)
    /// with the same rules and the same evaluation order.
    pub fn validate_existing(&self, trip: &TripRecord) -> Result<(), ValidationError> {
        match trip.truck_ref.as_deref().map(str::trim) {
            Some(r) if !r.is_empty() => {}
            _ => return Err(ValidationError::required(TRUCK_REF_FIELD)),
        }

        if trip.destination.trim().is_empty() {
            return Err(ValidationError::required(DESTINATION_FIELD));
        }

        for field in MonetaryField::ALL {
            check_amount(field.name(), trip.amount(field))?;
        }

        Ok(())
    }
}

// ============================================================================
// FIELD PARSERS
// ============================================================================

/// Non-blank string value, trimmed
fn required_text(field: &str, value: Option<&Value>) -> Result<String, ValidationError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        // Numeric ids from a JSON body
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(_)) | Some(Value::Null) | None => Err(ValidationError::required(field)),
        Some(_) => Err(ValidationError::new(field, "must be text")),
    }
}

fn parse_date(value: Option<&Value>) -> Result<NaiveDate, ValidationError> {
    let text = match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim(),
        Some(Value::String(_)) | Some(Value::Null) | None => {
            return Err(ValidationError::required(DATE_FIELD))
        }
        Some(_) => return Err(invalid_date()),
    };

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }

    // Stores hand back timestamps like "2024-03-15T00:00:00.000Z"
    let is_timestamp = text.len() > 10 && matches!(text.as_bytes()[10], b'T' | b' ');
    if is_timestamp {
        if let Some(prefix) = text.get(..10) {
            if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
                return Ok(date);
            }
        }
    }

    Err(invalid_date())
}

fn invalid_date() -> ValidationError {
    ValidationError::new(DATE_FIELD, "must be a calendar date (YYYY-MM-DD)")
}

fn parse_amount(field: &str, value: Option<&Value>) -> Result<f64, ValidationError> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(0.0),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(0.0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::not_non_negative(field))?,
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ValidationError::not_non_negative(field))?,
        Some(_) => return Err(ValidationError::not_non_negative(field)),
    };

    check_amount(field, parsed)?;

    // -0 → 0
    Ok(if parsed == 0.0 { 0.0 } else { parsed })
}

fn check_amount(field: &str, amount: f64) -> Result<(), ValidationError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ValidationError::not_non_negative(field));
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationError::too_large(field, MAX_AMOUNT));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
