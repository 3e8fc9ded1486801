//! Appointment model

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codes::BookingCode;
use crate::slots::Slot;

/// Appointment lifecycle state
///
/// Cancelled carries its timestamp so "cancelled but nobody knows when"
/// cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AppointmentStatus {
    Active,
    Cancelled { at: DateTime<Utc> },
}

impl AppointmentStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Active)
    }

    /// The status label as stored and shown to clients
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Active => "active",
            AppointmentStatus::Cancelled { .. } => "cancelled",
        }
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        match self {
            AppointmentStatus::Active => None,
            AppointmentStatus::Cancelled { at } => Some(*at),
        }
    }
}

/// A validated booking request, ready for the booking engine
///
/// Field constraints (name length, phone shape, email, horizon) are the
/// form boundary's responsibility; the engine re-checks only the temporal
/// slot constraints before writing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub date: NaiveDate,
    pub time: Slot,
    pub message: Option<String>,
}

/// A booked appointment as persisted in the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub code: BookingCode,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub date: NaiveDate,
    pub time: Slot,
    pub message: Option<String>,
    #[serde(flatten)]
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Create a fresh active appointment from a validated request
    pub fn new(request: BookingRequest, code: BookingCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            name: request.name,
            phone: request.phone,
            email: request.email,
            date: request.date,
            time: request.time,
            message: request.message,
            status: AppointmentStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// The wall-clock instant the appointment is scheduled for
    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time.to_time())
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Ledger counts for the statistics view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingStats {
    pub total: u64,
    pub active: u64,
    pub cancelled: u64,
    pub unique_clients: u64,
}
