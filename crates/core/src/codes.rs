//! Booking code generation
//!
//! Codes are the client-facing identity of an appointment: five uppercase
//! Latin letters (26^5 possible values). The pre-check against the ledger
//! here is only an optimization; the unique index on the code column is
//! what actually guarantees uniqueness under concurrent bookings.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::{Error, Result};
use crate::storage::AppointmentRepository;

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Code length in characters
pub const CODE_LEN: usize = 5;

/// Maximum generation attempts before the booking fails
pub const MAX_CODE_ATTEMPTS: u32 = 10;

/// A five-letter uppercase booking code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookingCode(String);

impl BookingCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BookingCode {
    type Err = Error;

    /// Parse a client-supplied code, normalizing case
    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_ascii_uppercase();
        if code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(BookingCode(code))
        } else {
            Err(Error::Validation(format!(
                "invalid booking code {s:?}, expected {CODE_LEN} letters"
            )))
        }
    }
}

impl Serialize for BookingCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BookingCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Draw a random code, uniform per character
pub fn random_code<R: Rng + ?Sized>(rng: &mut R) -> BookingCode {
    let code: String = (0..CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    BookingCode(code)
}

/// Generate a code not currently present in the ledger
///
/// Retries a bounded number of times; exhaustion means either a saturated
/// code space or a misbehaving ledger read, and fails the whole booking.
pub fn generate_unique_code<S, R>(store: &S, rng: &mut R) -> Result<BookingCode>
where
    S: AppointmentRepository + ?Sized,
    R: Rng + ?Sized,
{
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = random_code(rng);
        if !store.code_exists(&code)? {
            return Ok(code);
        }
    }

    warn!(
        attempts = MAX_CODE_ATTEMPTS,
        "Booking code generation exhausted"
    );
    Err(Error::CodeGenerationExhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_random_code_shape() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let code = random_code(&mut rng);
            assert_eq!(code.as_str().len(), CODE_LEN);
            assert!(code.as_str().bytes().all(|b| b.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_parse_normalizes_case() {
        let code: BookingCode = "abcde".parse().unwrap();
        assert_eq!(code.as_str(), "ABCDE");

        let code: BookingCode = "  QWERT ".parse().unwrap();
        assert_eq!(code.as_str(), "QWERT");
    }

    #[test]
    fn test_parse_rejects_bad_codes() {
        assert!("ABC".parse::<BookingCode>().is_err());
        assert!("ABCDEF".parse::<BookingCode>().is_err());
        assert!("AB1DE".parse::<BookingCode>().is_err());
        assert!("".parse::<BookingCode>().is_err());
    }

    #[test]
    fn test_constant_rng_is_deterministic() {
        // StepRng with increment 0 always yields the same draw
        let a = random_code(&mut StepRng::new(0, 0));
        let b = random_code(&mut StepRng::new(0, 0));
        assert_eq!(a, b);
    }
}
