//! Booking protocol message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire.
//! Responses carry a uniform success flag and optional human-readable
//! message, so no failure mode crosses the wire as a transport error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw booking form as submitted by a client
///
/// Deliberately stringly typed: this is pre-validation input. The server
/// side parses and validates before anything reaches the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingForm {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    /// Slot time, `HH:MM`
    pub time: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Appointment fields echoed back to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSummary {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDate,
    pub time: String,
    pub code: String,
    pub status: String,
}

/// Monthly ledger counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total: u64,
    pub active: u64,
    pub cancelled: u64,
    pub unique_clients: u64,
}

/// Requests a client may send
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Free slots for a date
    AvailableSlots { date: NaiveDate },

    /// Dates with no free slots over the booking horizon
    FullyBookedDates,

    /// Look up an appointment by its booking code
    AppointmentByCode { code: String },

    /// Book an appointment
    CreateAppointment { form: BookingForm },

    /// Cancel an appointment by its booking code
    CancelAppointment { code: String },

    /// Monthly booking statistics
    BookingStats,

    /// Ping to keep connection alive
    Ping,
}

/// Responses the server sends
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    AvailableSlots {
        success: bool,
        message: Option<String>,
        slots: Vec<String>,
        total_slots: u32,
        booked_slots: u32,
    },

    FullyBookedDates {
        success: bool,
        message: Option<String>,
        dates: Vec<NaiveDate>,
    },

    Appointment {
        success: bool,
        message: Option<String>,
        appointment: Option<AppointmentSummary>,
    },

    Created {
        success: bool,
        message: Option<String>,
        appointment_id: Option<Uuid>,
        code: Option<String>,
        appointment: Option<AppointmentSummary>,
    },

    Cancelled {
        success: bool,
        message: Option<String>,
    },

    BookingStats {
        success: bool,
        message: Option<String>,
        stats: Option<StatsSummary>,
    },

    /// Pong response to ping
    Pong,
}

impl Response {
    /// The uniform success flag (pong counts as success)
    pub fn success(&self) -> bool {
        match self {
            Response::AvailableSlots { success, .. }
            | Response::FullyBookedDates { success, .. }
            | Response::Appointment { success, .. }
            | Response::Created { success, .. }
            | Response::Cancelled { success, .. }
            | Response::BookingStats { success, .. } => *success,
            Response::Pong => true,
        }
    }

    /// The human-readable message, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            Response::AvailableSlots { message, .. }
            | Response::FullyBookedDates { message, .. }
            | Response::Appointment { message, .. }
            | Response::Created { message, .. }
            | Response::Cancelled { message, .. }
            | Response::BookingStats { message, .. } => message.as_deref(),
            Response::Pong => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let msg = Request::CreateAppointment {
            form: BookingForm {
                name: "Alice".to_string(),
                phone: "+79001234567".to_string(),
                email: None,
                date: "2030-06-01".to_string(),
                time: "10:00".to_string(),
                message: Some("hello".to_string()),
            },
        };

        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: Request = serde_json::from_slice(&bytes).unwrap();

        match decoded {
            Request::CreateAppointment { form } => {
                assert_eq!(form.name, "Alice");
                assert_eq!(form.time, "10:00");
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_response_envelope_accessors() {
        let ok = Response::Cancelled {
            success: true,
            message: Some("done".into()),
        };
        assert!(ok.success());
        assert_eq!(ok.message(), Some("done"));

        let failed = Response::Created {
            success: false,
            message: Some("slot taken".into()),
            appointment_id: None,
            code: None,
            appointment: None,
        };
        assert!(!failed.success());
    }

    #[test]
    fn test_form_optional_fields_default() {
        let decoded: Request = serde_json::from_str(
            r#"{"type":"CreateAppointment","form":{"name":"A","phone":"+7",
                "date":"2030-06-01","time":"10:00"}}"#,
        )
        .unwrap();

        match decoded {
            Request::CreateAppointment { form } => {
                assert!(form.email.is_none());
                assert!(form.message.is_none());
            }
            _ => panic!("Wrong message type"),
        }
    }
}
