// ❗ Error taxonomy
// Typed errors for the pure core. I/O edges wrap these in anyhow.

use thiserror::Error;

/// Raised by the validator. The whole record is rejected; `field` names the
/// first offending field in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn required(field: &str) -> Self {
        ValidationError::new(field, "is required")
    }

    pub fn not_non_negative(field: &str) -> Self {
        ValidationError::new(field, "must be a non-negative number")
    }

    pub fn too_large(field: &str, limit: f64) -> Self {
        ValidationError::new(field, format!("must not exceed {}", limit))
    }
}

/// Reported (never thrown) by the read path when a trip's truck reference
/// does not resolve. The trip is still returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("trip {} references unknown truck '{}'", .trip_id.as_deref().unwrap_or("<unsaved>"), .truck_ref)]
pub struct UnresolvedReferenceError {
    pub trip_id: Option<String>,
    pub truck_ref: String,
}

/// Surfaced verbatim from the encoder used by the export serializer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{format} export failed: {message}")]
pub struct SerializationError {
    pub format: String,
    pub message: String,
}

impl SerializationError {
    pub fn new(format: &str, message: impl ToString) -> Self {
        SerializationError {
            format: format.to_string(),
            message: message.to_string(),
        }
    }
}

/// Invalid expense configuration or formula registry state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("formula version {version} has no expense components")]
    EmptyComponents { version: u32 },

    #[error("formula version {version} lists '{field}' more than once")]
    DuplicateComponent { version: u32, field: String },

    #[error("formula version {version}: '{field}' is not an expense component")]
    NotAnExpenseComponent { version: u32, field: String },

    #[error("formula version {version} is not registered")]
    UnknownVersion { version: u32 },

    #[error("formula version {version} is already registered")]
    DuplicateVersion { version: u32 },
}

/// Rejected truck registrations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TruckError {
    #[error("vehicle number is required")]
    EmptyVehicleNumber,

    #[error("vehicle number '{0}' is already registered")]
    DuplicateVehicleNumber(String),
}
