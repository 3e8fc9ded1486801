//! Slot availability computation
//!
//! Answers "which slots are still free on this date". Reads only active
//! appointments, so cancelled bookings free their slot immediately. The
//! result can legitimately be stale by the time a client books: the
//! ledger's insert constraints are the authoritative gate, not this view.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tracing::instrument;

use crate::config::ScheduleConfig;
use crate::error::Result;
use crate::slots::{Slot, SlotCatalog};
use crate::storage::AppointmentRepository;

pub struct AvailabilityEngine {
    catalog: SlotCatalog,
    lead_time_minutes: u32,
}

impl AvailabilityEngine {
    pub fn new(config: &ScheduleConfig) -> Self {
        Self {
            catalog: SlotCatalog::from_config(config),
            lead_time_minutes: config.lead_time_minutes,
        }
    }

    pub fn catalog(&self) -> &SlotCatalog {
        &self.catalog
    }

    /// Free slots for a calendar day, in catalog order
    ///
    /// For today, slots starting within the lead-time buffer of `now` are
    /// dropped as well. An empty result is a normal answer, not an error.
    #[instrument(skip(self, repo))]
    pub fn available_slots<R>(
        &self,
        repo: &R,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<Slot>>
    where
        R: AppointmentRepository + ?Sized,
    {
        let taken = repo.active_times_for_date(date)?;

        let mut free: Vec<Slot> = self
            .catalog
            .slots()
            .iter()
            .copied()
            .filter(|slot| !taken.contains(slot))
            .collect();

        if date == now.date() {
            let cutoff = now.time().hour() * 60 + now.time().minute() + self.lead_time_minutes;
            free.retain(|slot| slot.minutes() > cutoff);
        }

        crate::invariants::assert_availability_disjoint(&free, &taken);
        Ok(free)
    }
}
