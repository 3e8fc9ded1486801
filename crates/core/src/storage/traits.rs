//! Storage repository traits
//!
//! The engines work against this interface, allowing for different
//! implementations (SQLite, mock, future network backend).

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::codes::BookingCode;
use crate::error::Result;
use crate::models::{Appointment, BookingStats};
use crate::slots::Slot;

/// Appointment ledger operations
pub trait AppointmentRepository {
    /// Insert a new appointment; unique-constraint violations surface as
    /// database errors for the caller to classify
    fn create_appointment(&self, appointment: &Appointment) -> Result<()>;

    /// Find an appointment by code, regardless of status
    fn find_by_code(&self, code: &BookingCode) -> Result<Option<Appointment>>;

    /// Find the active appointment holding a code, if any
    fn find_active_by_code(&self, code: &BookingCode) -> Result<Option<Appointment>>;

    /// Whether any record holds this code
    fn code_exists(&self, code: &BookingCode) -> Result<bool>;

    /// Whether an active appointment already occupies the slot
    fn active_slot_taken(&self, date: NaiveDate, time: Slot) -> Result<bool>;

    /// Times taken by active appointments on a calendar day
    fn active_times_for_date(&self, date: NaiveDate) -> Result<Vec<Slot>>;

    /// Transition an active appointment to cancelled; false if it was
    /// not active anymore
    fn cancel_appointment(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    /// Dates in [from, to] whose active count reaches capacity
    fn fully_booked_dates(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        capacity: u32,
    ) -> Result<Vec<NaiveDate>>;

    /// Ledger counts over records created in [from, to)
    fn stats_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<BookingStats>;
}
