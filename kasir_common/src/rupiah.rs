use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const IDR_CURRENCY_CODE: &str = "IDR";
pub const IDR_CURRENCY_CODE_LOWER: &str = "idr";

//--------------------------------------      Rupiah        ---------------------------------------------------------
/// A whole-rupiah amount. The payment gateway only deals in integer rupiah, so fractional amounts are never
/// represented; percentage calculations round to the nearest rupiah.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Rupiah(i64);

op!(binary Rupiah, Add, add);
op!(binary Rupiah, Sub, sub);
op!(inplace Rupiah, SubAssign, sub_assign);
op!(unary Rupiah, Neg, neg);

impl Mul<i64> for Rupiah {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Rupiah {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in rupiah: {0}")]
pub struct RupiahConversionError(String);

impl From<i64> for Rupiah {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Rupiah {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Rupiah {}

impl TryFrom<u64> for Rupiah {
    type Error = RupiahConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(RupiahConversionError(format!("Value {} is too large to convert to Rupiah", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Rupiah {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rp {}", self.0)
    }
}

impl Rupiah {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Applies a fractional rate (e.g. a 0.11 tax rate) to this amount, rounding to the nearest rupiah.
    pub fn apply_rate(&self, rate: f64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self((self.0 as f64 * rate).round() as i64)
    }

    /// `max(0, self - other)`, used for change calculation.
    pub fn saturating_change(&self, total: Rupiah) -> Self {
        Self((self.0 - total.0).max(0))
    }
}
