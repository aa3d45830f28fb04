// ⚙️ Settings - aggregation rules as data
// Loaded from a JSON file; defaults work without one.

use crate::expense::{ExpenseConfig, FormulaRegistry};
use crate::export::ExportFormat;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable pointing at a settings file
pub const CONFIG_ENV: &str = "TRIP_LEDGER_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite file used by the local store
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Version applied to new and edited trips
    #[serde(default = "default_active_version")]
    pub active_formula_version: u32,

    /// Every formula version that may appear on a stored trip
    #[serde(default = "default_formulas")]
    pub formulas: Vec<ExpenseConfig>,

    #[serde(default)]
    pub export_format: ExportFormat,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("trip-ledger.db")
}

fn default_active_version() -> u32 {
    ExpenseConfig::standard().version
}

fn default_formulas() -> Vec<ExpenseConfig> {
    vec![ExpenseConfig::standard()]
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_path: default_database_path(),
            active_formula_version: default_active_version(),
            formulas: default_formulas(),
            export_format: ExportFormat::default(),
        }
    }
}

impl Settings {
    /// Load settings from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read settings file: {:?}", path.as_ref()))?;

        let settings: Settings =
            serde_json::from_str(&content).context("Failed to parse settings JSON")?;

        // Fail at load time rather than on the first trip
        settings.formula_registry()?;

        Ok(settings)
    }

    /// Explicit path, else $TRIP_LEDGER_CONFIG, else defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!(path = %path.display(), "loading settings");
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.trim().is_empty() {
                info!(path = %path, "loading settings from {}", CONFIG_ENV);
                return Self::from_file(path);
            }
        }

        Ok(Settings::default())
    }

    /// Build the formula registry described by these settings
    pub fn formula_registry(&self) -> Result<FormulaRegistry> {
        FormulaRegistry::from_configs(self.formulas.clone(), self.active_formula_version)
            .context("Invalid formula configuration")
    }
}

// ============================================================================
// TESTS
// ============================================================================
