//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Error as SqlError;
use uuid::Uuid;

use crate::codes::BookingCode;
use crate::models::AppointmentStatus;
use crate::slots::Slot;

fn conversion_failure<E>(err: E) -> SqlError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
}

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(conversion_failure)
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_failure)
}

/// Parse a calendar date from a `%Y-%m-%d` string
pub fn parse_date(s: &str) -> Result<NaiveDate, SqlError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(conversion_failure)
}

/// Parse a slot from an `HH:MM` string
pub fn parse_slot(s: &str) -> Result<Slot, SqlError> {
    s.parse().map_err(conversion_failure)
}

/// Parse a booking code column
pub fn parse_code(s: &str) -> Result<BookingCode, SqlError> {
    s.parse().map_err(conversion_failure)
}

/// Reassemble the status enum from its two stored columns
///
/// The schema CHECK keeps these in lockstep; a mismatch read back from
/// disk is reported as a conversion failure rather than silently patched.
pub fn parse_status(
    status: &str,
    cancelled_at: Option<String>,
) -> Result<AppointmentStatus, SqlError> {
    match (status, cancelled_at) {
        ("active", None) => Ok(AppointmentStatus::Active),
        ("cancelled", Some(at)) => Ok(AppointmentStatus::Cancelled {
            at: parse_datetime(&at)?,
        }),
        (status, cancelled_at) => Err(conversion_failure(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("inconsistent status columns: {status:?} / {cancelled_at:?}"),
        ))),
    }
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_active() {
        assert_eq!(
            parse_status("active", None).unwrap(),
            AppointmentStatus::Active
        );
    }

    #[test]
    fn test_parse_status_cancelled() {
        let status =
            parse_status("cancelled", Some("2026-03-01T10:00:00+00:00".to_string())).unwrap();
        assert!(!status.is_active());
    }

    #[test]
    fn test_parse_status_rejects_mismatch() {
        assert!(parse_status("cancelled", None).is_err());
        assert!(parse_status("active", Some("2026-03-01T10:00:00+00:00".into())).is_err());
        assert!(parse_status("deleted", None).is_err());
    }
}
