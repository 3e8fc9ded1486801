//! Day-level exhaustion over the booking horizon
//!
//! Advisory aggregate for presentation: which upcoming dates have every
//! slot taken, plus ledger statistics for the current month. Nothing
//! here gates a booking; the insert constraints do.

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use tracing::instrument;

use crate::config::ScheduleConfig;
use crate::error::Result;
use crate::models::BookingStats;
use crate::slots::SlotCatalog;
use crate::storage::AppointmentRepository;

pub struct HorizonAggregator {
    capacity: u32,
    horizon_months: u32,
}

impl HorizonAggregator {
    pub fn new(config: &ScheduleConfig) -> Self {
        Self {
            capacity: SlotCatalog::from_config(config).len() as u32,
            horizon_months: config.horizon_months,
        }
    }

    /// Dates in [today, today + horizon] with every slot actively booked
    #[instrument(skip(self, repo))]
    pub fn fully_booked_dates<R>(&self, repo: &R, today: NaiveDate) -> Result<Vec<NaiveDate>>
    where
        R: AppointmentRepository + ?Sized,
    {
        let end = today + Months::new(self.horizon_months);
        repo.fully_booked_dates(today, end, self.capacity)
    }

    /// Ledger counts for the calendar month containing `today`
    #[instrument(skip(self, repo))]
    pub fn booking_stats<R>(&self, repo: &R, today: NaiveDate) -> Result<BookingStats>
    where
        R: AppointmentRepository + ?Sized,
    {
        let start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
            .expect("first of month is a valid date");
        let end = start + Months::new(1);
        repo.stats_between(month_start_utc(start), month_start_utc(end))
    }
}

fn month_start_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is a valid time"))
}
