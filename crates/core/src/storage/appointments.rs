//! Appointment ledger storage operations

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    parse_code, parse_date, parse_datetime, parse_slot, parse_status, parse_uuid, OptionalExt,
};
use crate::codes::BookingCode;
use crate::error::{Error, Result};
use crate::models::{Appointment, BookingStats};
use crate::slots::Slot;

const APPOINTMENT_COLUMNS: &str = "id, code, name, phone, email, preferred_date, \
     preferred_time, message, status, created_at, cancelled_at";

/// Which unique constraint an insert collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertConflict {
    /// Another record already holds this booking code
    Code,
    /// Another active record already holds this (date, time) slot
    Slot,
}

/// Classify a failed insert as a code or slot conflict, if it is one
pub fn insert_conflict(err: &Error) -> Option<InsertConflict> {
    let Error::Database(rusqlite::Error::SqliteFailure(sqlite_err, Some(msg))) = err else {
        return None;
    };
    if sqlite_err.code != rusqlite::ErrorCode::ConstraintViolation {
        return None;
    }

    // SQLite names the violated columns ("appointments.preferred_date,
    // appointments.preferred_time") or, in some builds, the index itself
    if msg.contains("preferred_date") || msg.contains("idx_appointments_active_slot") {
        Some(InsertConflict::Slot)
    } else if msg.contains("appointments.code") || msg.contains("idx_appointments_code") {
        Some(InsertConflict::Code)
    } else {
        None
    }
}

pub struct AppointmentStore<'a> {
    conn: &'a Connection,
}

impl<'a> AppointmentStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a new appointment row
    ///
    /// The unique indexes on code and on the active slot fire here; the
    /// caller classifies the failure with [`insert_conflict`].
    #[instrument(skip(self, appointment), fields(code = %appointment.code, date = %appointment.date, time = %appointment.time))]
    pub fn create(&self, appointment: &Appointment) -> Result<()> {
        self.conn.execute(
            "INSERT INTO appointments (id, code, name, phone, email, preferred_date,
                 preferred_time, message, status, created_at, cancelled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                appointment.id.to_string(),
                appointment.code.as_str(),
                appointment.name,
                appointment.phone,
                appointment.email,
                appointment.date.format("%Y-%m-%d").to_string(),
                appointment.time.to_string(),
                appointment.message,
                appointment.status.as_str(),
                appointment.created_at.to_rfc3339(),
                appointment.status.cancelled_at().map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Find an appointment by code, regardless of status
    #[instrument(skip(self))]
    pub fn find_by_code(&self, code: &BookingCode) -> Result<Option<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE code = ?1"
        ))?;

        let appointment = stmt
            .query_row(params![code.as_str()], row_to_appointment)
            .optional()?;

        Ok(appointment)
    }

    /// Find the active appointment holding a code, if any
    #[instrument(skip(self))]
    pub fn find_active_by_code(&self, code: &BookingCode) -> Result<Option<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments
             WHERE code = ?1 AND status = 'active'"
        ))?;

        let appointment = stmt
            .query_row(params![code.as_str()], row_to_appointment)
            .optional()?;

        Ok(appointment)
    }

    /// Whether any record (active or cancelled) holds this code
    pub fn code_exists(&self, code: &BookingCode) -> Result<bool> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM appointments WHERE code = ?1",
            params![code.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Whether an active appointment already occupies the slot
    pub fn active_slot_taken(&self, date: NaiveDate, time: Slot) -> Result<bool> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM appointments
             WHERE preferred_date = ?1 AND preferred_time = ?2 AND status = 'active'",
            params![date.format("%Y-%m-%d").to_string(), time.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Times taken by active appointments on a calendar day
    #[instrument(skip(self))]
    pub fn active_times_for_date(&self, date: NaiveDate) -> Result<Vec<Slot>> {
        let mut stmt = self.conn.prepare(
            "SELECT preferred_time FROM appointments
             WHERE preferred_date = ?1 AND status = 'active'
             ORDER BY preferred_time",
        )?;

        let times = stmt
            .query_map(params![date.format("%Y-%m-%d").to_string()], |row| {
                parse_slot(&row.get::<_, String>(0)?)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(times)
    }

    /// Transition an active appointment to cancelled
    ///
    /// Guarded on status so a concurrent cancel cannot double-transition;
    /// returns whether this call performed the transition.
    #[instrument(skip(self))]
    pub fn cancel(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE appointments SET status = 'cancelled', cancelled_at = ?1
             WHERE id = ?2 AND status = 'active'",
            params![at.to_rfc3339(), id.to_string()],
        )?;
        Ok(updated > 0)
    }

    /// Dates in [from, to] whose active appointment count reaches capacity
    #[instrument(skip(self))]
    pub fn fully_booked_dates(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        capacity: u32,
    ) -> Result<Vec<NaiveDate>> {
        let mut stmt = self.conn.prepare(
            "SELECT preferred_date FROM appointments
             WHERE status = 'active' AND preferred_date >= ?1 AND preferred_date <= ?2
             GROUP BY preferred_date
             HAVING COUNT(*) >= ?3
             ORDER BY preferred_date",
        )?;

        let dates = stmt
            .query_map(
                params![
                    from.format("%Y-%m-%d").to_string(),
                    to.format("%Y-%m-%d").to_string(),
                    capacity,
                ],
                |row| parse_date(&row.get::<_, String>(0)?),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(dates)
    }

    /// Ledger counts over records created in [from, to)
    pub fn stats_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<BookingStats> {
        let stats = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END), 0),
                    COUNT(DISTINCT phone)
             FROM appointments
             WHERE created_at >= ?1 AND created_at < ?2",
            params![from.to_rfc3339(), to.to_rfc3339()],
            |row| {
                Ok(BookingStats {
                    total: row.get::<_, i64>(0)? as u64,
                    active: row.get::<_, i64>(1)? as u64,
                    cancelled: row.get::<_, i64>(2)? as u64,
                    unique_clients: row.get::<_, i64>(3)? as u64,
                })
            },
        )?;

        Ok(stats)
    }
}

fn row_to_appointment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        code: parse_code(&row.get::<_, String>(1)?)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        date: parse_date(&row.get::<_, String>(5)?)?,
        time: parse_slot(&row.get::<_, String>(6)?)?,
        message: row.get(7)?,
        status: parse_status(
            &row.get::<_, String>(8)?,
            row.get::<_, Option<String>>(10)?,
        )?,
        created_at: parse_datetime(&row.get::<_, String>(9)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingRequest;
    use crate::storage::Database;

    fn make_appointment(code: &str, date: &str, time: &str) -> Appointment {
        let request = BookingRequest {
            name: "Alice Example".to_string(),
            phone: "+79001234567".to_string(),
            email: Some("alice@example.com".to_string()),
            date: date.parse().unwrap(),
            time: time.parse().unwrap(),
            message: None,
        };
        Appointment::new(request, code.parse().unwrap())
    }

    #[test]
    fn test_create_and_find_by_code() {
        let db = Database::open_in_memory().unwrap();
        let appointment = make_appointment("QWERT", "2030-06-01", "10:00");
        db.appointments().create(&appointment).unwrap();

        let found = db
            .appointments()
            .find_by_code(&"QWERT".parse().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(found.id, appointment.id);
        assert_eq!(found.name, "Alice Example");
        assert_eq!(found.date, appointment.date);
        assert_eq!(found.time, appointment.time);
        assert!(found.is_active());
    }

    #[test]
    fn test_code_uniqueness_is_enforced() {
        let db = Database::open_in_memory().unwrap();
        db.appointments()
            .create(&make_appointment("AAAAA", "2030-06-01", "10:00"))
            .unwrap();

        let err = db
            .appointments()
            .create(&make_appointment("AAAAA", "2030-06-02", "11:00"))
            .unwrap_err();
        assert_eq!(insert_conflict(&err), Some(InsertConflict::Code));
    }

    #[test]
    fn test_active_slot_uniqueness_is_enforced() {
        let db = Database::open_in_memory().unwrap();
        db.appointments()
            .create(&make_appointment("AAAAA", "2030-06-01", "10:00"))
            .unwrap();

        let err = db
            .appointments()
            .create(&make_appointment("BBBBB", "2030-06-01", "10:00"))
            .unwrap_err();
        assert_eq!(insert_conflict(&err), Some(InsertConflict::Slot));
    }

    #[test]
    fn test_cancelled_slot_can_be_rebooked() {
        let db = Database::open_in_memory().unwrap();
        let first = make_appointment("AAAAA", "2030-06-01", "10:00");
        db.appointments().create(&first).unwrap();

        assert!(db.appointments().cancel(first.id, Utc::now()).unwrap());

        // The partial index no longer covers the cancelled row
        db.appointments()
            .create(&make_appointment("BBBBB", "2030-06-01", "10:00"))
            .unwrap();
    }

    #[test]
    fn test_cancel_is_guarded() {
        let db = Database::open_in_memory().unwrap();
        let appointment = make_appointment("AAAAA", "2030-06-01", "10:00");
        db.appointments().create(&appointment).unwrap();

        assert!(db.appointments().cancel(appointment.id, Utc::now()).unwrap());
        // Second transition finds no active row
        assert!(!db.appointments().cancel(appointment.id, Utc::now()).unwrap());
    }

    #[test]
    fn test_active_times_for_date() {
        let db = Database::open_in_memory().unwrap();
        db.appointments()
            .create(&make_appointment("AAAAA", "2030-06-01", "14:00"))
            .unwrap();
        db.appointments()
            .create(&make_appointment("BBBBB", "2030-06-01", "09:30"))
            .unwrap();
        db.appointments()
            .create(&make_appointment("CCCCC", "2030-06-02", "10:00"))
            .unwrap();

        let times = db.appointments().active_times_for_date("2030-06-01".parse().unwrap()).unwrap();
        let rendered: Vec<String> = times.iter().map(Slot::to_string).collect();
        assert_eq!(rendered, ["09:30", "14:00"]);
    }

    #[test]
    fn test_stats_between() {
        let db = Database::open_in_memory().unwrap();
        let a = make_appointment("AAAAA", "2030-06-01", "10:00");
        let b = make_appointment("BBBBB", "2030-06-01", "11:00");
        // Same client as `a`, different code
        let mut c = make_appointment("CCCCC", "2030-06-02", "10:00");
        c.phone = a.phone.clone();
        for appt in [&a, &b, &c] {
            db.appointments().create(appt).unwrap();
        }
        db.appointments().cancel(b.id, Utc::now()).unwrap();

        let from = Utc::now() - chrono::Duration::hours(1);
        let to = Utc::now() + chrono::Duration::hours(1);
        let stats = db.appointments().stats_between(from, to).unwrap();
        assert_eq!(
            stats,
            BookingStats {
                total: 3,
                active: 2,
                cancelled: 1,
                unique_clients: 2,
            }
        );
    }
}
