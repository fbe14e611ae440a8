//! Warranty passports.
//!
//! A passport describes one device model: the serial prefix it owns, the
//! inclusive range of unit numbers sold under it and the warranty length.

use serde::{Deserialize, Serialize};

use device_warranty_core::{PassportId, SerialNumber};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Passport {
    pub id: PassportId,
    pub name: String,
    pub model: String,
    pub serial_prefix: String,
    pub from_serial_number: i64,
    pub to_serial_number: i64,
    pub warranty_months: i32,
}

impl Passport {
    /// Whether `serial` falls inside this passport's prefix and range.
    #[must_use]
    pub fn covers(&self, serial: &SerialNumber) -> bool {
        serial.prefix() == self.serial_prefix
            && (self.from_serial_number..=self.to_serial_number).contains(&serial.number())
    }

    /// Whether the two passports could both claim some serial number.
    #[must_use]
    pub fn overlaps(&self, draft: &PassportDraft) -> bool {
        self.serial_prefix == draft.serial_prefix
            && self.from_serial_number <= draft.to_serial_number
            && draft.from_serial_number <= self.to_serial_number
    }
}

/// Create/update body for passports.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassportDraft {
    pub name: String,
    pub model: String,
    pub serial_prefix: String,
    pub from_serial_number: i64,
    pub to_serial_number: i64,
    pub warranty_months: i32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn passport() -> Passport {
        Passport {
            id: PassportId::new(1),
            name: "TestPassport".to_owned(),
            model: "M1".to_owned(),
            serial_prefix: "ABC".to_owned(),
            from_serial_number: 1,
            to_serial_number: 9999,
            warranty_months: 24,
        }
    }

    #[test]
    fn test_covers() {
        let p = passport();
        assert!(p.covers(&SerialNumber::parse("ABC100").unwrap()));
        assert!(p.covers(&SerialNumber::parse("abc9999").unwrap()));
        assert!(!p.covers(&SerialNumber::parse("ABC10000").unwrap()));
        assert!(!p.covers(&SerialNumber::parse("ABD100").unwrap()));
    }

    #[test]
    fn test_overlaps() {
        let p = passport();
        let mut draft = PassportDraft {
            name: "Other".to_owned(),
            model: "M2".to_owned(),
            serial_prefix: "ABC".to_owned(),
            from_serial_number: 9999,
            to_serial_number: 20000,
            warranty_months: 12,
        };
        assert!(p.overlaps(&draft));

        draft.from_serial_number = 10000;
        assert!(!p.overlaps(&draft));

        draft.from_serial_number = 1;
        draft.serial_prefix = "XYZ".to_owned();
        assert!(!p.overlaps(&draft));
    }
}
