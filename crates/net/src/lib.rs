//! Bookline network layer
//!
//! Length-prefixed JSON protocol for the booking query surface. The wire
//! types here are deliberately decoupled from the core domain types; the
//! application crate bridges the two through [`server::RequestHandler`].

pub mod client;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use error::{Error, Result};
pub use protocol::{AppointmentSummary, BookingForm, Request, Response, StatsSummary};
pub use server::{RequestHandler, Server};
