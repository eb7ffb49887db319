//! Field validation for values entered in maintenance mode.
//!
//! The two format rules that matter to the business are the service number
//! (`NNNNN-S`, suffix 1 through 20) and the apartment/unit designator (no
//! spaces, no slashes). Both treat the empty string as valid, since the
//! fields are optional everywhere they appear.
//!
//! The `validate_*` functions are plain predicates. The `check_*` functions
//! return a [`ValidationError`] naming the field and the rule, which is what
//! the data-access layer surfaces to its callers.
//!
//! # Examples
//!
//! ```
//! use tower_inventory_core::{validate_apartment, validate_service_number};
//!
//! assert!(validate_service_number("12345-1"));
//! assert!(validate_service_number(""));
//! assert!(!validate_service_number("12345-21"));
//!
//! assert!(validate_apartment("123-A"));
//! assert!(!validate_apartment("123/A"));
//! ```

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static SERVICE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{5}-(?:[1-9]|1[0-9]|20)$").expect("static regex must compile")
});

/// Input validation errors.
///
/// Every variant names the offending field; [`rule`](Self::rule) gives the
/// violated rule as a short phrase suitable for display next to the field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Service number is not five digits, a dash, and a suffix in 1..=20.
    #[error("{field}: '{value}' must be five digits, a dash, and a number from 1 to 20")]
    ServiceNumberFormat { field: &'static str, value: String },
    /// Apartment/unit contains a space or a slash.
    #[error("{field}: '{value}' must not contain spaces or '/'")]
    ApartmentFormat { field: &'static str, value: String },
    /// Required text field is empty or whitespace-only.
    #[error("{field}: cannot be empty")]
    Empty { field: &'static str },
    /// Action type is not Install, Remove, or Repair.
    #[error("{field}: '{value}' is not one of Install, Remove, Repair")]
    UnknownActionType { field: &'static str, value: String },
    /// Quantity must be strictly positive.
    #[error("{field}: {value} must be a positive integer")]
    NonPositive { field: &'static str, value: i64 },
    /// Amount must be zero or greater (and finite, for prices).
    #[error("{field}: {value} must not be negative")]
    Negative { field: &'static str, value: String },
    /// Value would overflow the stored integer range.
    #[error("{field}: {value} is out of range")]
    OutOfRange { field: &'static str, value: i64 },
}

impl ValidationError {
    /// Name of the field that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            Self::ServiceNumberFormat { field, .. }
            | Self::ApartmentFormat { field, .. }
            | Self::Empty { field }
            | Self::UnknownActionType { field, .. }
            | Self::NonPositive { field, .. }
            | Self::Negative { field, .. }
            | Self::OutOfRange { field, .. } => field,
        }
    }

    /// Short description of the violated rule.
    pub fn rule(&self) -> &'static str {
        match self {
            Self::ServiceNumberFormat { .. } => "service number format NNNNN-S (S in 1..=20)",
            Self::ApartmentFormat { .. } => "no spaces or slashes",
            Self::Empty { .. } => "required",
            Self::UnknownActionType { .. } => "one of Install, Remove, Repair",
            Self::NonPositive { .. } => "positive integer",
            Self::Negative { .. } => "zero or greater",
            Self::OutOfRange { .. } => "within the stock range",
        }
    }
}

/// Returns `true` if `s` is empty or a well-formed service number.
///
/// A service number is exactly five ASCII digits, a `-`, and an integer from
/// 1 to 20 written without leading zeros.
///
/// ```
/// use tower_inventory_core::validate_service_number;
///
/// assert!(validate_service_number("98765-10"));
/// assert!(validate_service_number("00001-20"));
/// assert!(!validate_service_number("1234-1"));
/// assert!(!validate_service_number("12345"));
/// ```
pub fn validate_service_number(s: &str) -> bool {
    s.is_empty() || SERVICE_NUMBER_RE.is_match(s)
}

/// Returns `true` if `s` is empty or contains neither a space nor a `/`.
pub fn validate_apartment(s: &str) -> bool {
    !s.contains(' ') && !s.contains('/')
}

/// Checks a service number, reporting it against `field`.
pub fn check_service_number(field: &'static str, s: &str) -> Result<(), ValidationError> {
    if validate_service_number(s) {
        Ok(())
    } else {
        Err(ValidationError::ServiceNumberFormat {
            field,
            value: s.to_string(),
        })
    }
}

/// Checks an apartment/unit designator, reporting it against `field`.
pub fn check_apartment(field: &'static str, s: &str) -> Result<(), ValidationError> {
    if validate_apartment(s) {
        Ok(())
    } else {
        Err(ValidationError::ApartmentFormat {
            field,
            value: s.to_string(),
        })
    }
}

/// Checks that a required text field has non-whitespace content.
pub fn check_not_empty(field: &'static str, s: &str) -> Result<(), ValidationError> {
    if s.trim().is_empty() {
        Err(ValidationError::Empty { field })
    } else {
        Ok(())
    }
}

/// Checks that a quantity is strictly positive.
pub fn check_quantity(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ValidationError::NonPositive { field, value })
    }
}

/// Checks that a count is zero or greater.
pub fn check_non_negative(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value < 0 {
        Err(ValidationError::Negative {
            field,
            value: value.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Checks that a price is finite and zero or greater.
pub fn check_price(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::Negative {
            field,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_number_accepts_documented_examples() {
        assert!(validate_service_number("12345-1"));
        assert!(validate_service_number("98765-10"));
        assert!(validate_service_number("00001-20"));
        assert!(validate_service_number("55555-19"));
        assert!(validate_service_number(""));
    }

    #[test]
    fn test_service_number_rejects_bad_shapes() {
        assert!(!validate_service_number("1234-1"));
        assert!(!validate_service_number("123456-1"));
        assert!(!validate_service_number("12345-21"));
        assert!(!validate_service_number("12345-0"));
        assert!(!validate_service_number("12345-01"));
        assert!(!validate_service_number("12345"));
        assert!(!validate_service_number("12345-"));
        assert!(!validate_service_number("abcde-1"));
        assert!(!validate_service_number(" 12345-1"));
        assert!(!validate_service_number("12345-1 "));
        assert!(!validate_service_number("12345-1\n"));
    }

    #[test]
    fn test_service_number_rejects_non_ascii_digits() {
        // Arabic-Indic digits are `\d` in Unicode regex but not valid here.
        assert!(!validate_service_number("١٢٣٤٥-1"));
    }

    #[test]
    fn test_apartment_rules() {
        for ok in ["", "123", "A", "123-A", "A-1", "B2"] {
            assert!(validate_apartment(ok), "{ok:?} should be valid");
        }
        for bad in ["123 A", "123/A", " ", "/"] {
            assert!(!validate_apartment(bad), "{bad:?} should be invalid");
        }
    }

    #[test]
    fn test_check_functions_name_field_and_rule() {
        let err = check_service_number("service_number", "99").unwrap_err();
        assert_eq!(err.field(), "service_number");
        assert!(err.rule().contains("NNNNN-S"));

        let err = check_apartment("apartment", "1 B").unwrap_err();
        assert_eq!(err.field(), "apartment");
        assert_eq!(err.rule(), "no spaces or slashes");

        let err = check_not_empty("name", "   ").unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "name" });
    }

    #[test]
    fn test_check_quantity_and_amounts() {
        assert!(check_quantity("quantity", 1).is_ok());
        assert!(check_quantity("quantity", 0).is_err());
        assert!(check_quantity("quantity", -3).is_err());

        assert!(check_non_negative("stock", 0).is_ok());
        assert!(check_non_negative("stock", -1).is_err());

        assert!(check_price("unit_price", 0.0).is_ok());
        assert!(check_price("unit_price", 12.5).is_ok());
        assert!(check_price("unit_price", -0.01).is_err());
        assert!(check_price("unit_price", f64::NAN).is_err());
    }
}
