//! Native decimal values.
//!
//! Decimal columns are stored with Arrow's `Decimal128` semantics: a scaled
//! 128-bit integer plus a fixed scale taken from the column descriptor.
//! [`DecimalValue`] is the native side of that mapping.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use arrow::datatypes::DECIMAL128_MAX_PRECISION;

/// Maximum precision supported by `DecimalValue` (aligns with Arrow's Decimal128).
pub const MAX_DECIMAL_PRECISION: u8 = DECIMAL128_MAX_PRECISION;

/// Errors that can occur while manipulating decimal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecimalError {
    /// Requested scale falls outside the supported range.
    ScaleOutOfRange { scale: i8 },
    /// Value has more digits than the requested precision allows.
    PrecisionOverflow { value: i128, precision: u8 },
    /// Rescaling overflowed the Decimal128 range.
    Overflow,
    /// Rescale would have to drop fractional digits.
    InexactRescale { from: i8, to: i8 },
    /// Text could not be parsed as a decimal number.
    Parse(String),
}

impl fmt::Display for DecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecimalError::ScaleOutOfRange { scale } => {
                write!(f, "decimal scale {scale} outside supported range")
            }
            DecimalError::PrecisionOverflow { value, precision } => {
                write!(f, "decimal value {value} exceeds precision {precision}")
            }
            DecimalError::Overflow => write!(f, "decimal rescale overflow"),
            DecimalError::InexactRescale { from, to } => {
                write!(
                    f,
                    "cannot rescale decimal from scale {from} to {to} without losing digits"
                )
            }
            DecimalError::Parse(input) => write!(f, "invalid decimal literal '{input}'"),
        }
    }
}

impl std::error::Error for DecimalError {}

/// Native representation of a Decimal128 value.
///
/// Equality and ordering are numeric: `1.50` equals `1.5`. This matters on
/// round trip, because a value read back carries the column's scale rather
/// than the scale it was written with.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecimalValue {
    value: i128,
    scale: i8,
}

impl DecimalValue {
    /// Create a decimal from its raw parts.
    pub fn new(value: i128, scale: i8) -> Result<Self, DecimalError> {
        if !scale_within_bounds(scale) {
            return Err(DecimalError::ScaleOutOfRange { scale });
        }
        Ok(Self { value, scale })
    }

    /// Construct a decimal from an integer with zero scale.
    pub fn from_i64(value: i64) -> Self {
        Self {
            value: value as i128,
            scale: 0,
        }
    }

    /// Return the scaled integer backing this decimal.
    #[inline]
    pub fn raw_value(self) -> i128 {
        self.value
    }

    /// Return the scale (number of fractional digits).
    #[inline]
    pub fn scale(self) -> i8 {
        self.scale
    }

    /// Return the decimal precision (total digit count).
    #[inline]
    pub fn precision(self) -> u8 {
        digit_count(self.value)
    }

    /// Re-express the value with a larger or equal scale.
    ///
    /// This never changes the numeric value: lowering the scale fails with
    /// [`DecimalError::InexactRescale`] instead of dropping digits.
    pub fn rescale_up(self, to: i8) -> Result<Self, DecimalError> {
        if !scale_within_bounds(to) {
            return Err(DecimalError::ScaleOutOfRange { scale: to });
        }
        if to < self.scale {
            return Err(DecimalError::InexactRescale {
                from: self.scale,
                to,
            });
        }
        let factor = pow10((to - self.scale) as u32).ok_or(DecimalError::Overflow)?;
        let value = self
            .value
            .checked_mul(factor)
            .ok_or(DecimalError::Overflow)?;
        Ok(Self { value, scale: to })
    }

    /// Fail when the value needs more than `precision` digits.
    pub fn check_precision(self, precision: u8) -> Result<Self, DecimalError> {
        if self.precision() > precision {
            return Err(DecimalError::PrecisionOverflow {
                value: self.value,
                precision,
            });
        }
        Ok(self)
    }

    /// Convert the decimal into an `f64` (lossy for high precision inputs).
    pub fn to_f64(self) -> f64 {
        if self.value == 0 {
            return 0.0;
        }
        (self.value as f64) / 10_f64.powi(self.scale as i32)
    }
}

impl From<i64> for DecimalValue {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale <= 0 {
            let factor = pow10(self.scale.unsigned_abs() as u32).unwrap_or(1);
            return write!(f, "{}", self.value.saturating_mul(factor));
        }
        let digits = self.value.unsigned_abs().to_string();
        let scale = self.scale as usize;
        if self.value < 0 {
            f.write_str("-")?;
        }
        if digits.len() <= scale {
            f.write_str("0.")?;
            for _ in digits.len()..scale {
                f.write_str("0")?;
            }
            return f.write_str(&digits);
        }
        let split = digits.len() - scale;
        f.write_str(&digits[..split])?;
        f.write_str(".")?;
        f.write_str(&digits[split..])
    }
}

impl FromStr for DecimalValue {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));

        let scale = frac_part.len();
        if scale > MAX_DECIMAL_PRECISION as usize {
            return Err(DecimalError::ScaleOutOfRange { scale: scale as i8 });
        }
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DecimalError::Parse(s.to_owned()));
        }

        let value = format!("{int_part}{frac_part}")
            .parse::<i128>()
            .map_err(|_| DecimalError::Parse(s.to_owned()))?;

        Self::new(value, scale as i8)
    }
}

impl PartialEq for DecimalValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DecimalValue {}

impl PartialOrd for DecimalValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DecimalValue {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.scale == other.scale {
            return self.value.cmp(&other.value);
        }
        let target = self.scale.max(other.scale);
        match (self.rescale_up(target), other.rescale_up(target)) {
            (Ok(l), Ok(r)) => l.value.cmp(&r.value),
            // Overflow only happens for magnitudes beyond either side's range;
            // fall back to the float approximation.
            _ => self
                .to_f64()
                .partial_cmp(&other.to_f64())
                .unwrap_or(Ordering::Equal),
        }
    }
}

fn pow10(exp: u32) -> Option<i128> {
    10_i128.checked_pow(exp)
}

fn digit_count(value: i128) -> u8 {
    let mut magnitude = value.unsigned_abs();
    if magnitude == 0 {
        return 1;
    }
    let mut count = 0;
    while magnitude != 0 {
        magnitude /= 10;
        count += 1;
    }
    count
}

fn scale_within_bounds(scale: i8) -> bool {
    let max = MAX_DECIMAL_PRECISION as i8;
    (-max..=max).contains(&scale)
}
