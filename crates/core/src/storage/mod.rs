//! SQLite storage layer for Bookline

mod appointments;
mod migrations;
mod parse;
mod traits;

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use tracing::instrument;
use uuid::Uuid;

use crate::codes::BookingCode;
use crate::error::Result;
use crate::models::{Appointment, BookingStats};
use crate::slots::Slot;

pub use appointments::{insert_conflict, AppointmentStore, InsertConflict};
pub use traits::AppointmentRepository;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Get appointment store
    pub fn appointments(&self) -> AppointmentStore<'_> {
        AppointmentStore::new(&self.conn)
    }
}

// Implement the repository trait for Database.
// This enables using Database through the trait interface.

impl AppointmentRepository for Database {
    fn create_appointment(&self, appointment: &Appointment) -> Result<()> {
        self.appointments().create(appointment)
    }

    fn find_by_code(&self, code: &BookingCode) -> Result<Option<Appointment>> {
        self.appointments().find_by_code(code)
    }

    fn find_active_by_code(&self, code: &BookingCode) -> Result<Option<Appointment>> {
        self.appointments().find_active_by_code(code)
    }

    fn code_exists(&self, code: &BookingCode) -> Result<bool> {
        self.appointments().code_exists(code)
    }

    fn active_slot_taken(&self, date: NaiveDate, time: Slot) -> Result<bool> {
        self.appointments().active_slot_taken(date, time)
    }

    fn active_times_for_date(&self, date: NaiveDate) -> Result<Vec<Slot>> {
        self.appointments().active_times_for_date(date)
    }

    fn cancel_appointment(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.appointments().cancel(id, at)
    }

    fn fully_booked_dates(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        capacity: u32,
    ) -> Result<Vec<NaiveDate>> {
        self.appointments().fully_booked_dates(from, to, capacity)
    }

    fn stats_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<BookingStats> {
        self.appointments().stats_between(from, to)
    }
}
