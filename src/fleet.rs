// 🚛 Fleet - Truck identity + weak-reference resolution
//
// Trucks are owned by the external store. The core only reads them to turn
// a trip's `truckRef` into a vehicle number.

use crate::error::TruckError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// TRUCK RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckRecord {
    /// Opaque identifier assigned by the store
    pub id: String,

    /// Registration number, e.g. "TN45AB1234"
    pub vehicle_number: String,
}

impl TruckRecord {
    pub fn new(id: impl Into<String>, vehicle_number: impl Into<String>) -> Self {
        TruckRecord {
            id: id.into(),
            vehicle_number: vehicle_number.into(),
        }
    }
}

/// Normalize a vehicle number for comparison: trimmed, uppercase, inner
/// whitespace removed. "tn 45 ab 1234" and "TN45AB1234" are the same truck.
pub fn normalize_vehicle_number(raw: &str) -> String {
    raw.split_whitespace().collect::<String>().to_uppercase()
}

// ============================================================================
// FLEET (read-only lookup over an already-fetched truck list)
// ============================================================================

/// Lookup table built from the store's `TruckRecord` list.
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    trucks: Vec<TruckRecord>,
    by_id: HashMap<String, usize>,
}

impl Fleet {
    pub fn new(trucks: Vec<TruckRecord>) -> Self {
        let by_id = trucks
            .iter()
            .enumerate()
            .map(|(idx, truck)| (truck.id.clone(), idx))
            .collect();

        Fleet { trucks, by_id }
    }

    /// Resolve a weak reference. `None` means the truck no longer exists
    /// (or never did).
    pub fn resolve(&self, truck_ref: &str) -> Option<&TruckRecord> {
        self.by_id.get(truck_ref).map(|&idx| &self.trucks[idx])
    }

    pub fn vehicle_number(&self, truck_ref: &str) -> Option<&str> {
        self.resolve(truck_ref).map(|t| t.vehicle_number.as_str())
    }

    /// Find a truck by vehicle number (normalized comparison)
    pub fn find_by_vehicle_number(&self, vehicle_number: &str) -> Option<&TruckRecord> {
        let wanted = normalize_vehicle_number(vehicle_number);
        self.trucks
            .iter()
            .find(|t| normalize_vehicle_number(&t.vehicle_number) == wanted)
    }

    /// Truck id for a typed reference: a known vehicle number maps to its
    /// truck id, anything else is kept as typed (trimmed).
    pub fn reference_for(&self, typed: &str) -> String {
        self.find_by_vehicle_number(typed)
            .map(|truck| truck.id.clone())
            .unwrap_or_else(|| typed.trim().to_string())
    }

    /// Check a vehicle number before it is handed to the store.
    /// Returns the normalized number to persist.
    pub fn validate_new_truck(&self, vehicle_number: &str) -> Result<String, TruckError> {
        let normalized = normalize_vehicle_number(vehicle_number);
        if normalized.is_empty() {
            return Err(TruckError::EmptyVehicleNumber);
        }

        if self.find_by_vehicle_number(&normalized).is_some() {
            return Err(TruckError::DuplicateVehicleNumber(normalized));
        }

        Ok(normalized)
    }

    pub fn trucks(&self) -> &[TruckRecord] {
        &self.trucks
    }

    pub fn len(&self) -> usize {
        self.trucks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trucks.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
