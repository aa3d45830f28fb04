// 🔎 Record Filter - truck + inclusive date range selection
//
// Selection preserves input order. The read path additionally resolves
// truck references and flags (never drops) trips whose truck is gone.

use crate::error::UnresolvedReferenceError;
use crate::fleet::Fleet;
use crate::trip::{round2, TripRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// CRITERIA
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub truck_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_truck(mut self, truck_id: impl Into<String>) -> Self {
        self.truck_id = Some(truck_id.into());
        self
    }

    pub fn since(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self
    }

    pub fn until(mut self, date: NaiveDate) -> Self {
        self.date_to = Some(date);
        self
    }

    /// Truck criterion, with blank ids treated as "not supplied"
    pub fn truck(&self) -> Option<&str> {
        self.truck_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.truck().is_none() && self.date_from.is_none() && self.date_to.is_none()
    }

    fn matches_date(&self, date: NaiveDate) -> bool {
        let after_from = self.date_from.map_or(true, |from| date >= from);
        let before_to = self.date_to.map_or(true, |to| date <= to);
        after_from && before_to
    }

    /// Pure match on the raw reference
    pub fn matches(&self, trip: &TripRecord) -> bool {
        let truck_ok = match self.truck() {
            Some(wanted) => trip.truck_ref.as_deref() == Some(wanted),
            None => true,
        };
        truck_ok && self.matches_date(trip.date)
    }
}

// ============================================================================
// READ-PATH RESULT TYPES
// ============================================================================

/// A trip paired with its resolved vehicle number (None = unresolved).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTrip {
    pub trip: TripRecord,
    pub vehicle_number: Option<String>,
}

impl ResolvedTrip {
    pub fn is_resolved(&self) -> bool {
        self.vehicle_number.is_some()
    }
}

/// Aggregates over the selected rows
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TripTotals {
    pub trip_count: usize,
    pub freight_amount: f64,
    pub total_expense: f64,
    pub advance_amount: f64,
    pub balance_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripView {
    pub rows: Vec<ResolvedTrip>,
    pub unresolved: Vec<UnresolvedReferenceError>,
}

impl TripView {
    pub fn trips(&self) -> impl Iterator<Item = &TripRecord> {
        self.rows.iter().map(|row| &row.trip)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn totals(&self) -> TripTotals {
        let mut totals = TripTotals {
            trip_count: self.rows.len(),
            ..TripTotals::default()
        };
        for trip in self.trips() {
            totals.freight_amount += trip.freight_amount;
            totals.total_expense += trip.total_expense;
            totals.advance_amount += trip.advance_amount;
            totals.balance_amount += trip.balance_amount;
        }
        totals.freight_amount = round2(totals.freight_amount);
        totals.total_expense = round2(totals.total_expense);
        totals.advance_amount = round2(totals.advance_amount);
        totals.balance_amount = round2(totals.balance_amount);
        totals
    }
}

// ============================================================================
// FILTER
// ============================================================================

pub struct RecordFilter;

impl RecordFilter {
    /// Subsequence of `trips` matching every supplied criterion.
    /// No criteria → the input, unchanged.
    pub fn apply(trips: &[TripRecord], criteria: &FilterCriteria) -> Vec<TripRecord> {
        if criteria.is_empty() {
            return trips.to_vec();
        }

        let selected: Vec<TripRecord> = trips
            .iter()
            .filter(|trip| criteria.matches(trip))
            .cloned()
            .collect();

        debug!(input = trips.len(), selected = selected.len(), "trips filtered");
        selected
    }

    /// Read path: resolve references, filter, flag unresolved trips.
    ///
    /// A trip whose reference does not resolve never matches a truck
    /// criterion, even when the raw ids are equal.
    pub fn read(trips: &[TripRecord], fleet: &Fleet, criteria: &FilterCriteria) -> TripView {
        let mut view = TripView::default();

        for trip in trips {
            let vehicle_number = trip
                .truck_ref
                .as_deref()
                .and_then(|truck_ref| fleet.vehicle_number(truck_ref))
                .map(str::to_string);

            if criteria.truck().is_some() && vehicle_number.is_none() {
                continue;
            }
            if !criteria.matches(trip) {
                continue;
            }

            if vehicle_number.is_none() {
                let err = UnresolvedReferenceError {
                    trip_id: trip.id.clone(),
                    truck_ref: trip.truck_ref.clone().unwrap_or_default(),
                };
                warn!("{}", err);
                view.unresolved.push(err);
            }

            view.rows.push(ResolvedTrip {
                trip: trip.clone(),
                vehicle_number,
            });
        }

        debug!(
            input = trips.len(),
            selected = view.rows.len(),
            unresolved = view.unresolved.len(),
            "trip view built"
        );
        view
    }
}

// ============================================================================
// TESTS
// ============================================================================
