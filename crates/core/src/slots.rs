//! Bookable time-of-day slots and the slot catalog
//!
//! A `Slot` is a wall-clock time in the single configured business zone.
//! The catalog is the fixed ordered set of slots a business day offers,
//! built once from [`ScheduleConfig`] and injected into the engines.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::config::ScheduleConfig;
use crate::error::{Error, Result};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A bookable time of day, stored as minutes since midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(u32);

impl Slot {
    /// Construct from minutes since midnight; `None` if out of range
    pub const fn from_minutes(minutes: u32) -> Option<Self> {
        if minutes < MINUTES_PER_DAY {
            Some(Slot(minutes))
        } else {
            None
        }
    }

    /// Minutes since midnight
    pub fn minutes(&self) -> u32 {
        self.0
    }

    pub fn hour(&self) -> u32 {
        self.0 / 60
    }

    pub fn minute(&self) -> u32 {
        self.0 % 60
    }

    /// The slot as a chrono time value
    pub fn to_time(&self) -> NaiveTime {
        // Minutes are validated < 1440 at construction
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0)
            .expect("slot minutes are within a day")
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for Slot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Validation(format!("invalid time {s:?}, expected HH:MM"));

        let (hours, minutes) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hours: u32 = hours.parse().map_err(|_| invalid())?;
        let minutes: u32 = minutes.parse().map_err(|_| invalid())?;

        if hours > 23 || minutes > 59 {
            return Err(invalid());
        }

        Slot::from_minutes(hours * 60 + minutes).ok_or_else(invalid)
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// The fixed ordered set of bookable slots for a business day
///
/// Pure configuration data: no date awareness, no side effects.
#[derive(Debug, Clone)]
pub struct SlotCatalog {
    slots: Vec<Slot>,
}

impl SlotCatalog {
    /// Enumerate slots from the configured opening mark to the last mark,
    /// stepping by the configured slot length.
    pub fn from_config(config: &ScheduleConfig) -> Self {
        let step = config.slot_minutes.max(1);
        let mut slots = Vec::new();
        let mut minutes = config.first_slot.minutes();

        while minutes <= config.last_slot.minutes() {
            if let Some(slot) = Slot::from_minutes(minutes) {
                slots.push(slot);
            }
            minutes += step;
        }

        Self { slots }
    }

    /// All slots in catalog order
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.slots.contains(&slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_parse_and_display() {
        let slot: Slot = "09:30".parse().unwrap();
        assert_eq!(slot.minutes(), 9 * 60 + 30);
        assert_eq!(slot.to_string(), "09:30");

        // Single-digit hour is accepted, display is always padded
        let slot: Slot = "9:00".parse().unwrap();
        assert_eq!(slot.to_string(), "09:00");
    }

    #[test]
    fn test_slot_parse_rejects_garbage() {
        assert!("".parse::<Slot>().is_err());
        assert!("0930".parse::<Slot>().is_err());
        assert!("24:00".parse::<Slot>().is_err());
        assert!("12:60".parse::<Slot>().is_err());
        assert!("aa:bb".parse::<Slot>().is_err());
    }

    #[test]
    fn test_standard_catalog() {
        let catalog = SlotCatalog::from_config(&ScheduleConfig::default());
        assert_eq!(catalog.len(), 18);
        assert_eq!(catalog.slots()[0].to_string(), "09:00");
        assert_eq!(catalog.slots()[17].to_string(), "17:30");

        // Catalog order is chronological
        let mut sorted = catalog.slots().to_vec();
        sorted.sort();
        assert_eq!(sorted, catalog.slots());
    }

    #[test]
    fn test_catalog_contains() {
        let catalog = SlotCatalog::from_config(&ScheduleConfig::default());
        assert!(catalog.contains("10:00".parse().unwrap()));
        assert!(!catalog.contains("10:15".parse().unwrap()));
        assert!(!catalog.contains("18:00".parse().unwrap()));
    }
}
