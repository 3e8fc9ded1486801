//! Error types for Bookline Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("This time slot is already taken")]
    SlotTaken,

    #[error("No active appointment found for this code")]
    NotFound,

    #[error("This appointment has already taken place")]
    AlreadyOccurred,

    #[error("Could not generate a unique booking code")]
    CodeGenerationExhausted,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
