//! Fail-safe amounts: unit-checked, non-negative arithmetic.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_core::ValueObject;

/// Unit of measure a quantity is expressed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitOfMeasure {
    /// Discrete items (radios, cases).
    Each,
    /// Weight (bulk material).
    Kilogram,
    /// Length (cabling).
    Meter,
    /// Volume (fluids).
    Liter,
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOfMeasure::Each => "EACH",
            UnitOfMeasure::Kilogram => "KILOGRAM",
            UnitOfMeasure::Meter => "METER",
            UnitOfMeasure::Liter => "LITER",
        }
    }
}

impl core::fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for UnitOfMeasure {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EACH" => Ok(UnitOfMeasure::Each),
            "KILOGRAM" => Ok(UnitOfMeasure::Kilogram),
            "METER" => Ok(UnitOfMeasure::Meter),
            "LITER" => Ok(UnitOfMeasure::Liter),
            other => Err(QuantityError::UnknownUnit(other.to_string())),
        }
    }
}

/// Value-level quantity failure.
///
/// These are local programming/input errors, never expected from valid
/// domain paths.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuantityError {
    #[error("quantity cannot be negative: {0}")]
    NegativeQuantity(i64),

    #[error("unit mismatch: cannot mix {left} with {right}")]
    UnitMismatch {
        left: UnitOfMeasure,
        right: UnitOfMeasure,
    },

    #[error("subtraction results in negative quantity ({minuend} - {subtrahend})")]
    NegativeResult { minuend: u64, subtrahend: u64 },

    #[error("unknown unit of measure: {0}")]
    UnknownUnit(String),
}

/// An amount tagged with its unit of measure.
///
/// Immutable value: every operation returns a new instance. Arithmetic and
/// comparison between mismatched units is rejected rather than coerced, and
/// a result can never go negative (non-negativity is structural — the
/// amount is unsigned; [`Quantity::new`] guards the signed boundary input).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity {
    amount: u64,
    unit: UnitOfMeasure,
}

impl Quantity {
    /// Construct from a possibly-negative boundary value.
    pub fn new(amount: i64, unit: UnitOfMeasure) -> Result<Self, QuantityError> {
        if amount < 0 {
            return Err(QuantityError::NegativeQuantity(amount));
        }
        Ok(Self {
            amount: amount as u64,
            unit,
        })
    }

    /// Construct from an amount that is non-negative by type.
    pub fn of(amount: u64, unit: UnitOfMeasure) -> Self {
        Self { amount, unit }
    }

    pub fn zero(unit: UnitOfMeasure) -> Self {
        Self { amount: 0, unit }
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn unit(&self) -> UnitOfMeasure {
        self.unit
    }

    pub fn add(self, other: Quantity) -> Result<Quantity, QuantityError> {
        self.check_unit(other)?;
        Ok(Self {
            amount: self.amount + other.amount,
            unit: self.unit,
        })
    }

    pub fn subtract(self, other: Quantity) -> Result<Quantity, QuantityError> {
        self.check_unit(other)?;
        let amount = self.amount.checked_sub(other.amount).ok_or(
            QuantityError::NegativeResult {
                minuend: self.amount,
                subtrahend: other.amount,
            },
        )?;
        Ok(Self {
            amount,
            unit: self.unit,
        })
    }

    /// Unit-checked total ordering between two quantities.
    pub fn compare(self, other: Quantity) -> Result<Ordering, QuantityError> {
        self.check_unit(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    pub fn is_greater_than(self, other: Quantity) -> Result<bool, QuantityError> {
        Ok(self.compare(other)? == Ordering::Greater)
    }

    pub fn is_less_than(self, other: Quantity) -> Result<bool, QuantityError> {
        Ok(self.compare(other)? == Ordering::Less)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    fn check_unit(self, other: Quantity) -> Result<(), QuantityError> {
        if self.unit != other.unit {
            return Err(QuantityError::UnitMismatch {
                left: self.unit,
                right: other.unit,
            });
        }
        Ok(())
    }
}

impl ValueObject for Quantity {}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.amount, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_negative_amounts() {
        let err = Quantity::new(-1, UnitOfMeasure::Each).unwrap_err();
        assert_eq!(err, QuantityError::NegativeQuantity(-1));
    }

    #[test]
    fn add_sums_amounts_of_equal_units() {
        let a = Quantity::of(30, UnitOfMeasure::Each);
        let b = Quantity::of(12, UnitOfMeasure::Each);
        assert_eq!(a.add(b).unwrap(), Quantity::of(42, UnitOfMeasure::Each));
    }

    #[test]
    fn add_rejects_mismatched_units() {
        let a = Quantity::of(1, UnitOfMeasure::Each);
        let b = Quantity::of(1, UnitOfMeasure::Liter);
        match a.add(b).unwrap_err() {
            QuantityError::UnitMismatch { left, right } => {
                assert_eq!(left, UnitOfMeasure::Each);
                assert_eq!(right, UnitOfMeasure::Liter);
            }
            other => panic!("expected UnitMismatch, got {other:?}"),
        }
    }

    #[test]
    fn subtract_rejects_negative_results() {
        let a = Quantity::of(5, UnitOfMeasure::Kilogram);
        let b = Quantity::of(8, UnitOfMeasure::Kilogram);
        assert_eq!(
            a.subtract(b).unwrap_err(),
            QuantityError::NegativeResult {
                minuend: 5,
                subtrahend: 8
            }
        );
    }

    #[test]
    fn subtract_returns_new_value_and_leaves_operands_alone() {
        let a = Quantity::of(10, UnitOfMeasure::Meter);
        let b = Quantity::of(4, UnitOfMeasure::Meter);
        let c = a.subtract(b).unwrap();
        assert_eq!(c.amount(), 6);
        assert_eq!(a.amount(), 10);
        assert_eq!(b.amount(), 4);
    }

    #[test]
    fn compare_is_unit_checked() {
        let a = Quantity::of(1, UnitOfMeasure::Each);
        let b = Quantity::of(2, UnitOfMeasure::Each);
        assert_eq!(a.compare(b).unwrap(), Ordering::Less);
        assert!(b.is_greater_than(a).unwrap());

        let c = Quantity::of(2, UnitOfMeasure::Liter);
        assert!(a.compare(c).is_err());
    }

    #[test]
    fn zero_is_zero() {
        assert!(Quantity::zero(UnitOfMeasure::Each).is_zero());
        assert!(!Quantity::of(1, UnitOfMeasure::Each).is_zero());
    }

    #[test]
    fn display_includes_unit() {
        assert_eq!(
            Quantity::of(15, UnitOfMeasure::Each).to_string(),
            "15 EACH"
        );
    }

    #[test]
    fn unit_parses_case_insensitively() {
        assert_eq!("each".parse::<UnitOfMeasure>().unwrap(), UnitOfMeasure::Each);
        assert_eq!(
            "KILOGRAM".parse::<UnitOfMeasure>().unwrap(),
            UnitOfMeasure::Kilogram
        );
        assert!("BUSHEL".parse::<UnitOfMeasure>().is_err());
    }
}
