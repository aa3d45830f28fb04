// 📤 Export Serializer - fixed 15-column table
//
// Spreadsheets downstream depend on the column order and on every numeric
// cell carrying exactly two decimals. Change EXPORT_COLUMNS only together
// with the consumers.

use crate::error::SerializationError;
use crate::filter::{FilterCriteria, RecordFilter, ResolvedTrip};
use crate::fleet::Fleet;
use crate::trip::{round2, TripRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const EXPORT_COLUMNS: [&str; 15] = [
    "Date",
    "Truck",
    "Destination",
    "FreightPerTon",
    "FreightAmount",
    "LoadingAmount",
    "UnloadingAmount",
    "DriverBeta",
    "DieselAmount",
    "OilAmount",
    "FastTagAmount",
    "TaxAmount",
    "AdvanceAmount",
    "TotalExpense",
    "BalanceAmount",
];

pub type ExportRow = [String; 15];

// ============================================================================
// FORMAT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn default_file_name(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "TripRecords.csv",
            ExportFormat::Xlsx => "TripRecords.xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

// ============================================================================
// SERIALIZER
// ============================================================================

pub struct ExportSerializer;

impl ExportSerializer {
    /// One formatted row per trip, in input order
    pub fn rows(trips: &[ResolvedTrip]) -> Vec<ExportRow> {
        trips.iter().map(format_row).collect()
    }

    /// Resolve vehicle numbers for unfiltered trips, then build rows
    pub fn rows_for(trips: &[TripRecord], fleet: &Fleet) -> Vec<ExportRow> {
        let view = RecordFilter::read(trips, fleet, &FilterCriteria::new());
        Self::rows(&view.rows)
    }

    /// CSV bytes: header row, then one row per trip
    pub fn to_csv(trips: &[ResolvedTrip]) -> Result<Vec<u8>, SerializationError> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer
            .write_record(EXPORT_COLUMNS)
            .map_err(|e| SerializationError::new("csv", e))?;

        for row in Self::rows(trips) {
            writer
                .write_record(&row)
                .map_err(|e| SerializationError::new("csv", e))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| SerializationError::new("csv", e))?;

        debug!(rows = trips.len(), bytes = bytes.len(), "csv export built");
        Ok(bytes)
    }

    /// XLSX workbook bytes with a single "Trips" sheet. Cells are written as
    /// text so the two-decimal contract holds in every spreadsheet.
    #[cfg(feature = "xlsx")]
    pub fn to_xlsx(trips: &[ResolvedTrip]) -> Result<Vec<u8>, SerializationError> {
        use rust_xlsxwriter::{Format, Workbook};

        let xlsx_err = |e: rust_xlsxwriter::XlsxError| SerializationError::new("xlsx", e);

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Trips").map_err(xlsx_err)?;

        let header_format = Format::new().set_bold();
        for (col, header) in EXPORT_COLUMNS.iter().enumerate() {
            sheet
                .write_string_with_format(0, col as u16, *header, &header_format)
                .map_err(xlsx_err)?;
        }

        for (row_idx, row) in Self::rows(trips).iter().enumerate() {
            let row_num = (row_idx + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                sheet
                    .write_string(row_num, col as u16, cell.as_str())
                    .map_err(xlsx_err)?;
            }
        }

        let bytes = workbook.save_to_buffer().map_err(xlsx_err)?;
        debug!(rows = trips.len(), bytes = bytes.len(), "xlsx export built");
        Ok(bytes)
    }

    /// Encode in the requested format
    pub fn encode(trips: &[ResolvedTrip], format: ExportFormat) -> Result<Vec<u8>, SerializationError> {
        match format {
            ExportFormat::Csv => Self::to_csv(trips),
            #[cfg(feature = "xlsx")]
            ExportFormat::Xlsx => Self::to_xlsx(trips),
            #[cfg(not(feature = "xlsx"))]
            ExportFormat::Xlsx => Err(SerializationError::new(
                "xlsx",
                "xlsx support not compiled in (enable the `xlsx` feature)",
            )),
        }
    }
}

fn money(value: f64) -> String {
    format!("{:.2}", round2(value))
}

fn format_row(row: &ResolvedTrip) -> ExportRow {
    let trip = &row.trip;
    [
        trip.date.format("%Y-%m-%d").to_string(),
        row.vehicle_number.clone().unwrap_or_default(),
        trip.destination.clone(),
        money(trip.freight_per_ton),
        money(trip.freight_amount),
        money(trip.loading_amount),
        money(trip.unloading_amount),
        money(trip.driver_beta),
        money(trip.diesel_amount),
        money(trip.oil_amount),
        money(trip.fast_tag_amount),
        money(trip.tax_amount),
        money(trip.advance_amount),
        money(trip.total_expense),
        money(trip.balance_amount),
    ]
}

// ============================================================================
// TESTS
// ============================================================================
