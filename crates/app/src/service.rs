//! The booking query surface
//!
//! One method per presentation-facing operation, each returning the
//! uniform wire envelope. Expected conditions become user-facing
//! messages; store failures are logged and collapse to a generic one.
//! No error type crosses this boundary.

use std::sync::Arc;

use bookline_core::{
    AvailabilityEngine, BookingCode, BookingEngine, Error, HorizonAggregator,
};
use bookline_net::{
    AppointmentSummary, BookingForm, Request, RequestHandler, Response, StatsSummary,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use tracing::{error, instrument};

use crate::notifier::{NotifierEvent, NotifierHandle};
use crate::state::AppState;
use crate::validation::validate_form;

const GENERIC_FAILURE: &str =
    "An unexpected error occurred. Please try again or contact us by phone.";
const SLOT_TAKEN: &str =
    "Unfortunately, this time is already taken. Please choose another time.";
const NOT_FOUND: &str = "No active appointment was found for this code.";
const ALREADY_OCCURRED: &str = "An appointment that has already passed cannot be cancelled.";

pub struct BookingService {
    state: Arc<AppState>,
    availability: AvailabilityEngine,
    booking: BookingEngine,
    horizon: HorizonAggregator,
    notifier: NotifierHandle,
}

impl BookingService {
    pub fn new(state: Arc<AppState>, notifier: NotifierHandle) -> Self {
        let schedule = &state.config.schedule;
        Self {
            availability: AvailabilityEngine::new(schedule),
            booking: BookingEngine::new(schedule),
            horizon: HorizonAggregator::new(schedule),
            state,
            notifier,
        }
    }

    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    /// Free slots for a date
    #[instrument(skip(self))]
    pub fn available_slots(&self, date: NaiveDate) -> Response {
        let db = self.state.db.lock().unwrap();

        let booked = match db.appointments().active_times_for_date(date) {
            Ok(taken) => taken.len() as u32,
            Err(e) => {
                error!(error = %e, "Failed to read taken slots");
                return Response::AvailableSlots {
                    success: false,
                    message: Some(GENERIC_FAILURE.to_string()),
                    slots: Vec::new(),
                    total_slots: self.availability.catalog().len() as u32,
                    booked_slots: 0,
                };
            }
        };

        match self.availability.available_slots(&*db, date, self.now()) {
            Ok(slots) => Response::AvailableSlots {
                success: true,
                message: None,
                slots: slots.iter().map(|s| s.to_string()).collect(),
                total_slots: self.availability.catalog().len() as u32,
                booked_slots: booked,
            },
            Err(e) => {
                error!(error = %e, "Failed to compute availability");
                Response::AvailableSlots {
                    success: false,
                    message: Some(GENERIC_FAILURE.to_string()),
                    slots: Vec::new(),
                    total_slots: self.availability.catalog().len() as u32,
                    booked_slots: booked,
                }
            }
        }
    }

    /// Dates with every slot taken over the booking horizon
    #[instrument(skip(self))]
    pub fn fully_booked_dates(&self) -> Response {
        let db = self.state.db.lock().unwrap();
        match self.horizon.fully_booked_dates(&*db, self.now().date()) {
            Ok(dates) => Response::FullyBookedDates {
                success: true,
                message: None,
                dates,
            },
            Err(e) => {
                error!(error = %e, "Failed to aggregate fully booked dates");
                Response::FullyBookedDates {
                    success: false,
                    message: Some(GENERIC_FAILURE.to_string()),
                    dates: Vec::new(),
                }
            }
        }
    }

    /// Look up an appointment by code, any status
    #[instrument(skip(self))]
    pub fn appointment_by_code(&self, code: &str) -> Response {
        let Ok(code) = code.parse::<BookingCode>() else {
            return Response::Appointment {
                success: false,
                message: Some("No appointment was found with this code.".to_string()),
                appointment: None,
            };
        };

        let db = self.state.db.lock().unwrap();
        match db.appointments().find_by_code(&code) {
            Ok(Some(appointment)) => Response::Appointment {
                success: true,
                message: None,
                appointment: Some(summarize(&appointment)),
            },
            Ok(None) => Response::Appointment {
                success: false,
                message: Some("No appointment was found with this code.".to_string()),
                appointment: None,
            },
            Err(e) => {
                error!(error = %e, "Failed to look up appointment");
                Response::Appointment {
                    success: false,
                    message: Some(GENERIC_FAILURE.to_string()),
                    appointment: None,
                }
            }
        }
    }

    /// Validate a form and book the appointment
    #[instrument(skip(self, form), fields(date = %form.date, time = %form.time))]
    pub fn create_appointment(&self, form: &BookingForm) -> Response {
        let now = self.now();
        let request = match validate_form(
            form,
            self.availability.catalog(),
            self.state.config.schedule.horizon_months,
            now,
        ) {
            Ok(request) => request,
            Err(message) => {
                return Response::Created {
                    success: false,
                    message: Some(message),
                    appointment_id: None,
                    code: None,
                    appointment: None,
                }
            }
        };

        let booked = {
            let db = self.state.db.lock().unwrap();
            self.booking.book(&*db, request, now)
        };

        match booked {
            Ok(appointment) => {
                self.notifier.send(NotifierEvent::created(&appointment));
                Response::Created {
                    success: true,
                    message: Some(
                        "Your appointment has been booked. We will be in touch shortly."
                            .to_string(),
                    ),
                    appointment_id: Some(appointment.id),
                    code: Some(appointment.code.to_string()),
                    appointment: Some(summarize(&appointment)),
                }
            }
            Err(Error::SlotTaken) => Response::Created {
                success: false,
                message: Some(SLOT_TAKEN.to_string()),
                appointment_id: None,
                code: None,
                appointment: None,
            },
            Err(Error::Validation(message)) => Response::Created {
                success: false,
                message: Some(message),
                appointment_id: None,
                code: None,
                appointment: None,
            },
            Err(e) => {
                error!(error = %e, "Booking failed");
                Response::Created {
                    success: false,
                    message: Some(GENERIC_FAILURE.to_string()),
                    appointment_id: None,
                    code: None,
                    appointment: None,
                }
            }
        }
    }

    /// Cancel an active appointment by code
    #[instrument(skip(self))]
    pub fn cancel_appointment(&self, code: &str) -> Response {
        let Ok(code) = code.parse::<BookingCode>() else {
            return Response::Cancelled {
                success: false,
                message: Some(NOT_FOUND.to_string()),
            };
        };

        let cancelled = {
            let db = self.state.db.lock().unwrap();
            self.booking.cancel(&*db, &code, self.now())
        };

        match cancelled {
            Ok(appointment) => {
                self.notifier.send(NotifierEvent::cancelled(&appointment));
                Response::Cancelled {
                    success: true,
                    message: Some("Your appointment has been cancelled.".to_string()),
                }
            }
            Err(Error::NotFound) => Response::Cancelled {
                success: false,
                message: Some(NOT_FOUND.to_string()),
            },
            Err(Error::AlreadyOccurred) => Response::Cancelled {
                success: false,
                message: Some(ALREADY_OCCURRED.to_string()),
            },
            Err(e) => {
                error!(error = %e, "Cancellation failed");
                Response::Cancelled {
                    success: false,
                    message: Some(GENERIC_FAILURE.to_string()),
                }
            }
        }
    }

    /// Monthly ledger statistics
    #[instrument(skip(self))]
    pub fn booking_stats(&self) -> Response {
        let db = self.state.db.lock().unwrap();
        match self.horizon.booking_stats(&*db, self.now().date()) {
            Ok(stats) => Response::BookingStats {
                success: true,
                message: None,
                stats: Some(StatsSummary {
                    total: stats.total,
                    active: stats.active,
                    cancelled: stats.cancelled,
                    unique_clients: stats.unique_clients,
                }),
            },
            Err(e) => {
                error!(error = %e, "Failed to compute statistics");
                Response::BookingStats {
                    success: false,
                    message: Some(GENERIC_FAILURE.to_string()),
                    stats: None,
                }
            }
        }
    }
}

impl RequestHandler for BookingService {
    fn handle(&self, request: Request) -> Response {
        match request {
            Request::AvailableSlots { date } => self.available_slots(date),
            Request::FullyBookedDates => self.fully_booked_dates(),
            Request::AppointmentByCode { code } => self.appointment_by_code(&code),
            Request::CreateAppointment { form } => self.create_appointment(&form),
            Request::CancelAppointment { code } => self.cancel_appointment(&code),
            Request::BookingStats => self.booking_stats(),
            Request::Ping => Response::Pong,
        }
    }
}

fn summarize(appointment: &bookline_core::Appointment) -> AppointmentSummary {
    AppointmentSummary {
        id: appointment.id,
        name: appointment.name.clone(),
        date: appointment.date,
        time: appointment.time.to_string(),
        code: appointment.code.to_string(),
        status: appointment.status.as_str().to_string(),
    }
}
