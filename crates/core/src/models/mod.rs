//! Data models for Bookline

mod appointment;

pub use appointment::*;
