//! Booking and cancellation engine
//!
//! The write side of the ledger. The pre-checks here give friendly
//! answers in the common case; the unique indexes catch the races the
//! pre-checks cannot, and a constraint violation at insert time is
//! treated as the authoritative conflict signal.

use chrono::{Months, NaiveDateTime, Utc};
use rand::Rng;
use tracing::{info, instrument, warn};

use crate::codes::{generate_unique_code, BookingCode};
use crate::config::ScheduleConfig;
use crate::error::{Error, Result};
use crate::models::{Appointment, BookingRequest};
use crate::slots::SlotCatalog;
use crate::storage::{insert_conflict, AppointmentRepository, InsertConflict};

/// How many times a conflicted insert is retried with a fresh code
const WRITE_RETRIES: u32 = 2;

pub struct BookingEngine {
    catalog: SlotCatalog,
    horizon_months: u32,
}

impl BookingEngine {
    pub fn new(config: &ScheduleConfig) -> Self {
        Self {
            catalog: SlotCatalog::from_config(config),
            horizon_months: config.horizon_months,
        }
    }

    /// Book an appointment for a validated request
    #[instrument(skip(self, repo, request), fields(date = %request.date, time = %request.time))]
    pub fn book<R>(&self, repo: &R, request: BookingRequest, now: NaiveDateTime) -> Result<Appointment>
    where
        R: AppointmentRepository + ?Sized,
    {
        self.book_with_rng(repo, request, now, &mut rand::thread_rng())
    }

    /// Book with an explicit randomness source (deterministic in tests)
    pub fn book_with_rng<R, G>(
        &self,
        repo: &R,
        request: BookingRequest,
        now: NaiveDateTime,
        rng: &mut G,
    ) -> Result<Appointment>
    where
        R: AppointmentRepository + ?Sized,
        G: Rng + ?Sized,
    {
        self.check_bookable(&request, now)?;

        // Friendly pre-check; the slot index below is the actual gate
        if repo.active_slot_taken(request.date, request.time)? {
            return Err(Error::SlotTaken);
        }

        let code = generate_unique_code(repo, rng)?;
        let mut appointment = Appointment::new(request, code);
        crate::invariants::assert_appointment_invariants(&appointment);
        crate::invariants::assert_slot_in_catalog(&appointment, &self.catalog);

        let mut retries = 0;
        loop {
            match repo.create_appointment(&appointment) {
                Ok(()) => {
                    info!(code = %appointment.code, "Appointment booked");
                    return Ok(appointment);
                }
                Err(err) => match insert_conflict(&err) {
                    // Another booker won the slot between check and insert
                    Some(InsertConflict::Slot) => return Err(Error::SlotTaken),
                    Some(InsertConflict::Code) if retries < WRITE_RETRIES => {
                        retries += 1;
                        warn!(
                            code = %appointment.code,
                            retries, "Code collided at insert, regenerating"
                        );
                        appointment.code = generate_unique_code(repo, rng)?;
                    }
                    Some(InsertConflict::Code) => return Err(Error::CodeGenerationExhausted),
                    None => return Err(err),
                },
            }
        }
    }

    /// Cancel an active appointment by its code
    ///
    /// Refused once the scheduled instant has passed. The record stays in
    /// the ledger with its cancellation timestamp.
    #[instrument(skip(self, repo))]
    pub fn cancel<R>(&self, repo: &R, code: &BookingCode, now: NaiveDateTime) -> Result<Appointment>
    where
        R: AppointmentRepository + ?Sized,
    {
        let Some(appointment) = repo.find_active_by_code(code)? else {
            return Err(Error::NotFound);
        };

        if appointment.scheduled_at() <= now {
            return Err(Error::AlreadyOccurred);
        }

        let at = Utc::now();
        if !repo.cancel_appointment(appointment.id, at)? {
            // Lost a race against a concurrent cancel
            return Err(Error::NotFound);
        }

        info!(code = %code, "Appointment cancelled");
        Ok(Appointment {
            status: crate::models::AppointmentStatus::Cancelled { at },
            ..appointment
        })
    }

    /// Defensive temporal re-validation before writing
    ///
    /// The form boundary validates the full field set; the engine still
    /// refuses slots outside the catalog and dates outside the horizon.
    fn check_bookable(&self, request: &BookingRequest, now: NaiveDateTime) -> Result<()> {
        if !self.catalog.contains(request.time) {
            return Err(Error::Validation(format!(
                "{} is not a bookable time",
                request.time
            )));
        }

        let scheduled = request.date.and_time(request.time.to_time());
        if scheduled <= now {
            return Err(Error::Validation(
                "the requested time is already in the past".into(),
            ));
        }

        let horizon_end = now.date() + Months::new(self.horizon_months);
        if request.date > horizon_end {
            return Err(Error::Validation(format!(
                "bookings are only accepted up to {} months ahead",
                self.horizon_months
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use chrono::NaiveDate;
    use rand::rngs::mock::StepRng;

    fn request(date: &str, time: &str) -> BookingRequest {
        BookingRequest {
            name: "Alice Example".to_string(),
            phone: "+79001234567".to_string(),
            email: None,
            date: date.parse().unwrap(),
            time: time.parse().unwrap(),
            message: Some("first visit".to_string()),
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn engine() -> BookingEngine {
        BookingEngine::new(&ScheduleConfig::default())
    }

    #[test]
    fn test_book_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let booked = engine().book(&db, request("2030-06-01", "10:00"), now()).unwrap();

        assert_eq!(booked.code.as_str().len(), 5);
        assert!(booked.is_active());

        let fetched = db.appointments().find_by_code(&booked.code).unwrap().unwrap();
        assert_eq!(fetched.name, "Alice Example");
        assert_eq!(fetched.date, booked.date);
        assert_eq!(fetched.time, booked.time);
        assert!(fetched.is_active());
    }

    #[test]
    fn test_double_booking_same_slot() {
        let db = Database::open_in_memory().unwrap();
        let engine = engine();

        engine.book(&db, request("2030-06-01", "10:00"), now()).unwrap();
        let err = engine
            .book(&db, request("2030-06-01", "10:00"), now())
            .unwrap_err();
        assert!(matches!(err, Error::SlotTaken));

        // Another slot on the same day is still fine
        engine.book(&db, request("2030-06-01", "10:30"), now()).unwrap();
    }

    #[test]
    fn test_codes_are_distinct() {
        let db = Database::open_in_memory().unwrap();
        let engine = engine();

        let mut codes = std::collections::HashSet::new();
        for (i, time) in ["09:00", "09:30", "10:00", "10:30", "11:00"].iter().enumerate() {
            let date = format!("2030-06-0{}", i + 1);
            let booked = engine.book(&db, request(&date, time), now()).unwrap();
            assert!(codes.insert(booked.code.clone()), "duplicate code issued");
        }
    }

    #[test]
    fn test_exhausted_code_space() {
        let db = Database::open_in_memory().unwrap();
        let engine = engine();

        // A constant rng can only ever produce one code; once that code
        // is in the ledger, generation must give up.
        engine
            .book_with_rng(&db, request("2030-06-01", "10:00"), now(), &mut StepRng::new(0, 0))
            .unwrap();

        let err = engine
            .book_with_rng(&db, request("2030-06-02", "10:00"), now(), &mut StepRng::new(0, 0))
            .unwrap_err();
        assert!(matches!(err, Error::CodeGenerationExhausted));
    }

    #[test]
    fn test_rejects_time_outside_catalog() {
        let db = Database::open_in_memory().unwrap();
        let err = engine()
            .book(&db, request("2030-06-01", "18:00"), now())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_rejects_past_instant() {
        let db = Database::open_in_memory().unwrap();
        let err = engine()
            .book(&db, request("2030-04-01", "10:00"), now())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_rejects_beyond_horizon() {
        let db = Database::open_in_memory().unwrap();
        let err = engine()
            .book(&db, request("2030-12-01", "10:00"), now())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_same_day_later_slot_is_bookable() {
        let db = Database::open_in_memory().unwrap();
        let booked = engine().book(&db, request("2030-05-01", "15:00"), now()).unwrap();
        assert!(booked.is_active());
    }

    #[test]
    fn test_cancel_then_rebook() {
        let db = Database::open_in_memory().unwrap();
        let engine = engine();

        let booked = engine.book(&db, request("2030-06-01", "10:00"), now()).unwrap();
        let cancelled = engine.cancel(&db, &booked.code, now()).unwrap();
        assert!(!cancelled.is_active());
        assert!(cancelled.status.cancelled_at().is_some());

        // The freed slot is bookable again; the old code stays burned
        let rebooked = engine.book(&db, request("2030-06-01", "10:00"), now()).unwrap();
        assert_ne!(rebooked.code, booked.code);
    }

    #[test]
    fn test_cancel_twice() {
        let db = Database::open_in_memory().unwrap();
        let engine = engine();

        let booked = engine.book(&db, request("2030-06-01", "10:00"), now()).unwrap();
        engine.cancel(&db, &booked.code, now()).unwrap();

        let err = engine.cancel(&db, &booked.code, now()).unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn test_cancel_unknown_code() {
        let db = Database::open_in_memory().unwrap();
        let err = engine()
            .cancel(&db, &"ZZZZZ".parse().unwrap(), now())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn test_cancel_elapsed_appointment() {
        let db = Database::open_in_memory().unwrap();
        let engine = engine();

        let booked = engine.book(&db, request("2030-06-01", "10:00"), now()).unwrap();

        // Attempt the cancel after the scheduled instant
        let late = NaiveDate::from_ymd_opt(2030, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let err = engine.cancel(&db, &booked.code, late).unwrap_err();
        assert!(matches!(err, Error::AlreadyOccurred));

        // The record is untouched
        let kept = db.appointments().find_by_code(&booked.code).unwrap().unwrap();
        assert!(kept.is_active());
    }

    #[test]
    fn test_concurrent_bookers_one_wins() {
        use std::sync::{Arc, Mutex};

        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let engine = Arc::new(engine());

        let mut handles = Vec::new();
        for _ in 0..2 {
            let db = db.clone();
            let engine = engine.clone();
            handles.push(std::thread::spawn(move || {
                let db = db.lock().unwrap();
                engine.book(&*db, request("2030-06-01", "10:00"), now())
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let losses = results
            .iter()
            .filter(|r| matches!(r, Err(Error::SlotTaken)))
            .count();
        assert_eq!((wins, losses), (1, 1));
    }
}
