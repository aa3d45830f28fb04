// 🗄️ Local store - SQLite + WAL
//
// The persistence collaborator the core hands records to. It owns identity
// (UUID v4 ids) and uniqueness; the core never calls it.

use crate::fleet::{Fleet, TruckRecord};
use crate::trip::{MonetaryField, TripRecord};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Persistence operations the CLI (or any other front end) relies on.
pub trait TripStore {
    fn add_truck(&self, vehicle_number: &str) -> Result<TruckRecord>;
    fn list_trucks(&self) -> Result<Vec<TruckRecord>>;
    fn delete_truck(&self, id: &str) -> Result<bool>;

    /// Stores the trip under a new id. Identical trips on the same day are
    /// separate runs and are all kept.
    fn insert_trip(&self, trip: &TripRecord) -> Result<TripRecord>;

    /// Import path: returns the stored trip, or None when a trip with the
    /// same content hash is already stored.
    fn import_trip(&self, trip: &TripRecord) -> Result<Option<TripRecord>>;
    fn update_trip(&self, trip: &TripRecord) -> Result<()>;
    fn delete_trip(&self, id: &str) -> Result<bool>;
    fn get_trip(&self, id: &str) -> Result<Option<TripRecord>>;
    fn list_trips(&self) -> Result<Vec<TripRecord>>;

    /// Convenience: current fleet as a lookup table
    fn fleet(&self) -> Result<Fleet> {
        Ok(Fleet::new(self.list_trucks()?))
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;
        // Enable WAL mode for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    /// Insert a batch; returns how many were new
    pub fn insert_trips(&self, trips: &[TripRecord]) -> Result<usize> {
        let mut inserted = 0;
        let mut duplicates = 0;

        for trip in trips {
            match self.import_trip(trip)? {
                Some(_) => inserted += 1,
                None => duplicates += 1,
            }
        }

        info!(inserted, duplicates, "trip batch stored");
        Ok(inserted)
    }

    pub fn count_trips(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM trips", [], |row| row.get(0))?;
        Ok(count)
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS trucks (
            id TEXT PRIMARY KEY,
            vehicle_number TEXT UNIQUE NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // Monetary components live in a JSON column so new expense categories
    // need no migration.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS trips (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            content_hash TEXT NOT NULL,
            date TEXT NOT NULL,
            truck_ref TEXT,
            destination TEXT NOT NULL,
            amounts TEXT NOT NULL,
            total_expense REAL NOT NULL DEFAULT 0,
            balance_amount REAL NOT NULL DEFAULT 0,
            formula_version INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute("CREATE INDEX IF NOT EXISTS idx_trips_date ON trips(date)", [])?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_trips_hash ON trips(content_hash)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_trips_truck ON trips(truck_ref)",
        [],
    )?;

    Ok(())
}

fn amounts_json(trip: &TripRecord) -> Result<String> {
    let amounts: HashMap<&str, f64> = MonetaryField::ALL
        .iter()
        .map(|field| (field.name(), trip.amount(*field)))
        .collect();
    Ok(serde_json::to_string(&amounts)?)
}

const TRIP_COLUMNS: &str =
    "id, date, truck_ref, destination, amounts, total_expense, balance_amount, formula_version";

fn row_to_trip(row: &Row<'_>) -> rusqlite::Result<TripRecord> {
    let date_str: String = row.get(1)?;
    let amounts_str: String = row.get(4)?;

    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let amounts: HashMap<String, f64> = serde_json::from_str(&amounts_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let mut trip = TripRecord {
        id: Some(row.get(0)?),
        truck_ref: row.get(2)?,
        total_expense: row.get(5)?,
        balance_amount: row.get(6)?,
        formula_version: row.get(7)?,
        ..TripRecord::new(date, String::new(), row.get::<_, String>(3)?)
    };
    for field in MonetaryField::ALL {
        trip.set_amount(field, amounts.get(field.name()).copied().unwrap_or(0.0));
    }

    Ok(trip)
}

impl TripStore for SqliteStore {
    fn add_truck(&self, vehicle_number: &str) -> Result<TruckRecord> {
        let vehicle_number = self.fleet()?.validate_new_truck(vehicle_number)?;
        let truck = TruckRecord::new(uuid::Uuid::new_v4().to_string(), vehicle_number);

        self.conn.execute(
            "INSERT INTO trucks (id, vehicle_number) VALUES (?1, ?2)",
            params![truck.id, truck.vehicle_number],
        )?;

        info!(id = %truck.id, vehicle = %truck.vehicle_number, "truck added");
        Ok(truck)
    }

    fn list_trucks(&self) -> Result<Vec<TruckRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, vehicle_number FROM trucks ORDER BY vehicle_number")?;

        let trucks = stmt
            .query_map([], |row| Ok(TruckRecord::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(trucks)
    }

    fn delete_truck(&self, id: &str) -> Result<bool> {
        // Trips keep their reference; reads will flag it as unresolved
        let deleted = self.conn.execute("DELETE FROM trucks WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    fn insert_trip(&self, trip: &TripRecord) -> Result<TripRecord> {
        let mut stored = trip.clone();
        stored.id = Some(uuid::Uuid::new_v4().to_string());

        self.conn.execute(
            "INSERT INTO trips (
                id, content_hash, date, truck_ref, destination, amounts,
                total_expense, balance_amount, formula_version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                stored.id,
                stored.content_hash(),
                stored.date.format("%Y-%m-%d").to_string(),
                stored.truck_ref,
                stored.destination,
                amounts_json(&stored)?,
                stored.total_expense,
                stored.balance_amount,
                stored.formula_version,
            ],
        )?;

        debug!(id = ?stored.id, "trip stored");
        Ok(stored)
    }

    fn import_trip(&self, trip: &TripRecord) -> Result<Option<TripRecord>> {
        let hash = trip.content_hash();
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM trips WHERE content_hash = ?1)",
            [&hash],
            |row| row.get(0),
        )?;

        if exists {
            debug!(hash = %hash, "duplicate trip skipped");
            return Ok(None);
        }
        self.insert_trip(trip).map(Some)
    }

    fn update_trip(&self, trip: &TripRecord) -> Result<()> {
        let id = trip
            .id
            .as_deref()
            .ok_or_else(|| anyhow!("Cannot update a trip without an id"))?;

        let updated = self
            .conn
            .execute(
                "UPDATE trips SET
                    content_hash = ?2, date = ?3, truck_ref = ?4, destination = ?5,
                    amounts = ?6, total_expense = ?7, balance_amount = ?8, formula_version = ?9
                 WHERE id = ?1",
                params![
                    id,
                    trip.content_hash(),
                    trip.date.format("%Y-%m-%d").to_string(),
                    trip.truck_ref,
                    trip.destination,
                    amounts_json(trip)?,
                    trip.total_expense,
                    trip.balance_amount,
                    trip.formula_version,
                ],
            )
            .with_context(|| format!("Failed to update trip {}", id))?;

        if updated == 0 {
            return Err(anyhow!("Trip not found: {}", id));
        }
        Ok(())
    }

    fn delete_trip(&self, id: &str) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM trips WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    fn get_trip(&self, id: &str) -> Result<Option<TripRecord>> {
        let sql = format!("SELECT {} FROM trips WHERE id = ?1", TRIP_COLUMNS);
        let trip = self
            .conn
            .query_row(&sql, [id], row_to_trip)
            .optional()?;
        Ok(trip)
    }

    fn list_trips(&self) -> Result<Vec<TripRecord>> {
        let sql = format!("SELECT {} FROM trips ORDER BY date ASC, row_id ASC", TRIP_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;

        let trips = stmt
            .query_map([], row_to_trip)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(trips)
    }
}
