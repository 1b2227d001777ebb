//! Whole-number percentages.
//!
//! Generator confidence and the composite priority score both use this
//! type. Deserialization rejects values above 100.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// A whole number between 0 and 100 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Percentage(u8);

impl Percentage {
    pub const ZERO: Self = Self(0);

    pub const HUNDRED: Self = Self(100);

    /// Clamps to 100.
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    pub fn try_new(value: u8) -> Result<Self, ValidationError> {
        if value > 100 {
            return Err(ValidationError::out_of_range("percentage", 0, 100, i64::from(value)));
        }
        Ok(Self(value))
    }

    /// Clamps a raw floating value into [0, 100] and rounds to the nearest integer.
    ///
    /// NaN maps to zero.
    pub fn from_f64_rounded(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 100.0).round() as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// 0.0 to 1.0
    pub fn as_fraction(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl TryFrom<u8> for Percentage {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Percentage> for u8 {
    fn from(pct: Percentage) -> Self {
        pct.0
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
