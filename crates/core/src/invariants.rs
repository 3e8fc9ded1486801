//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use uuid::Uuid;

use crate::models::Appointment;
use crate::slots::SlotCatalog;

/// Validate that an appointment record is internally consistent
pub fn assert_appointment_invariants(appointment: &Appointment) {
    debug_assert!(
        appointment.id != Uuid::nil(),
        "Appointment {} has nil id",
        appointment.code
    );

    debug_assert!(
        appointment.code.as_str().len() == 5
            && appointment.code.as_str().bytes().all(|b| b.is_ascii_uppercase()),
        "Appointment {} has malformed code {:?}",
        appointment.id,
        appointment.code.as_str()
    );

    // Name must not be empty
    debug_assert!(
        !appointment.name.trim().is_empty(),
        "Appointment {} has empty name",
        appointment.id
    );
}

/// Validate that an appointment's slot belongs to the catalog
pub fn assert_slot_in_catalog(appointment: &Appointment, catalog: &SlotCatalog) {
    debug_assert!(
        catalog.contains(appointment.time),
        "Appointment {} holds off-catalog time {}",
        appointment.id,
        appointment.time
    );
}

/// Validate an availability answer against the taken set
pub fn assert_availability_disjoint(free: &[crate::slots::Slot], taken: &[crate::slots::Slot]) {
    debug_assert!(
        free.iter().all(|slot| !taken.contains(slot)),
        "Availability result overlaps the taken set"
    );
}
