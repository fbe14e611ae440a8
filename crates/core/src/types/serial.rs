//! Device serial numbers.
//!
//! A serial is an alphabetic model prefix followed by a decimal unit number,
//! e.g. `ABC100` is unit 100 of the `ABC` passport.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SerialNumberError {
    #[error("serial number cannot be empty")]
    Empty,
    #[error("serial number must be at most {max} characters")]
    TooLong { max: usize },
    #[error("serial number must start with a letter prefix")]
    MissingPrefix,
    #[error("serial number must end with a unit number")]
    MissingNumber,
    #[error("serial number may only contain letters followed by digits")]
    InvalidCharacter,
}

/// A validated device serial number.
///
/// ```
/// use device_warranty_core::SerialNumber;
///
/// let serial = SerialNumber::parse("abc100").unwrap();
/// assert_eq!(serial.as_str(), "ABC100");
/// assert_eq!(serial.prefix(), "ABC");
/// assert_eq!(serial.number(), 100);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct SerialNumber {
    value: String,
    prefix_len: usize,
    number: i64,
}

impl SerialNumber {
    pub const MAX_LENGTH: usize = 64;

    /// Parse a serial number into canonical form: upper-case prefix, unit
    /// number without leading zeros.
    ///
    /// # Errors
    ///
    /// Returns [`SerialNumberError`] when the input is not `<letters><digits>`.
    pub fn parse(s: &str) -> Result<Self, SerialNumberError> {
        let value = s.trim().to_ascii_uppercase();
        if value.is_empty() {
            return Err(SerialNumberError::Empty);
        }
        if value.len() > Self::MAX_LENGTH {
            return Err(SerialNumberError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let prefix_len = value
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(value.len());
        if prefix_len == 0 {
            return Err(SerialNumberError::MissingPrefix);
        }

        let digits = value.get(prefix_len..).unwrap_or_default();
        if digits.is_empty() {
            return Err(SerialNumberError::MissingNumber);
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(SerialNumberError::InvalidCharacter);
        }
        let number = digits
            .parse::<i64>()
            .map_err(|_| SerialNumberError::TooLong {
                max: Self::MAX_LENGTH,
            })?;

        let value = format!("{}{number}", value.get(..prefix_len).unwrap_or_default());

        Ok(Self {
            value,
            prefix_len,
            number,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The alphabetic model prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.value.get(..self.prefix_len).unwrap_or_default()
    }

    /// The numeric unit part.
    #[must_use]
    pub const fn number(&self) -> i64 {
        self.number
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl std::str::FromStr for SerialNumber {
    type Err = SerialNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SerialNumber {
    type Error = SerialNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SerialNumber> for String {
    fn from(serial: SerialNumber) -> Self {
        serial.value
    }
}
