//! Booking form validation
//!
//! The boundary between raw client input and the core engines. Everything
//! the engines assume about a [`BookingRequest`] is established here;
//! failures are user-facing messages, never errors.

use std::sync::OnceLock;

use bookline_core::{BookingRequest, Slot, SlotCatalog};
use chrono::{Months, NaiveDate, NaiveDateTime};
use regex::Regex;

use bookline_net::BookingForm;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 50;
const MESSAGE_MAX: usize = 500;

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\+?[1-9]\d{1,14}$").expect("phone pattern compiles")
    })
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
            .expect("email pattern compiles")
    })
}

/// Validate a raw form into a booking request
///
/// `now` is the local wall-clock instant of the attempt.
pub fn validate_form(
    form: &BookingForm,
    catalog: &SlotCatalog,
    horizon_months: u32,
    now: NaiveDateTime,
) -> Result<BookingRequest, String> {
    let name = form.name.trim();
    let name_len = name.chars().count();
    if name_len < NAME_MIN || name_len > NAME_MAX {
        return Err(format!(
            "Name must be between {NAME_MIN} and {NAME_MAX} characters"
        ));
    }

    let phone = normalize_phone(&form.phone);
    if !phone_pattern().is_match(&phone) {
        return Err("Invalid phone number format".to_string());
    }

    let email = match form.email.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            if !email_pattern().is_match(raw) {
                return Err("Invalid email format".to_string());
            }
            Some(raw.to_lowercase())
        }
    };

    let date: NaiveDate = form
        .date
        .trim()
        .parse()
        .map_err(|_| "Please choose a valid date".to_string())?;

    let time: Slot = form
        .time
        .trim()
        .parse()
        .map_err(|_| "Please choose a valid time".to_string())?;
    if !catalog.contains(time) {
        return Err("Please choose one of the offered times".to_string());
    }

    if date.and_time(time.to_time()) <= now {
        return Err("Please choose a time in the future".to_string());
    }
    if date > now.date() + Months::new(horizon_months) {
        return Err(format!(
            "Bookings are accepted no more than {horizon_months} months ahead"
        ));
    }

    let message = match form.message.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            if raw.chars().count() > MESSAGE_MAX {
                return Err(format!(
                    "Message must be no longer than {MESSAGE_MAX} characters"
                ));
            }
            Some(raw.to_string())
        }
    };

    Ok(BookingRequest {
        name: name.to_string(),
        phone,
        email,
        date,
        time,
        message,
    })
}

/// Strip the punctuation people type into phone numbers
fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect()
}
