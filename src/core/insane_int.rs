//! Extended-Precision Score
//!
//! Scores in late antes overflow every machine integer, so they travel as
//! an "insane int": a tower of exponentials on top of a normalised
//! scientific-notation number.
//!
//! ```text
//! e e 1.5 e 300
//! └┬┘ └┬┘   └┬┘
//!  │   │     └── exponent
//!  │   └──────── coefficient, normalised into [1, 10)
//!  └──────────── starting e-count (tower height)
//! ```
//!
//! The text form is canonical and is only produced at the wire boundary.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Exponent gap past which the smaller addend no longer changes the sum.
const ADD_PRECISION_LIMIT: i64 = 17;

/// Arbitrary-magnitude score counter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InsaneInt {
    starting_e_count: u32,
    coefficient: f64,
    exponent: i64,
}

impl Default for InsaneInt {
    fn default() -> Self {
        Self::ZERO
    }
}

impl InsaneInt {
    /// The zero score every client starts with.
    pub const ZERO: Self = Self {
        starting_e_count: 0,
        coefficient: 0.0,
        exponent: 0,
    };

    /// Build from raw components, normalising the coefficient.
    pub fn new(starting_e_count: u32, coefficient: f64, exponent: i64) -> Self {
        let mut value = Self {
            starting_e_count,
            coefficient,
            exponent,
        };
        value.normalize();
        value
    }

    /// Build from a plain number.
    pub fn from_f64(value: f64) -> Self {
        Self::new(0, value, 0)
    }

    /// Tower height (number of leading `e`s).
    pub fn starting_e_count(&self) -> u32 {
        self.starting_e_count
    }

    /// Normalised coefficient.
    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    /// Base-10 exponent.
    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    /// Check for zero.
    pub fn is_zero(&self) -> bool {
        self.starting_e_count == 0 && self.coefficient == 0.0
    }

    fn normalize(&mut self) {
        if !self.coefficient.is_finite() || self.coefficient == 0.0 {
            if self.coefficient == 0.0 || self.coefficient.is_nan() {
                self.coefficient = 0.0;
                if self.starting_e_count == 0 {
                    self.exponent = 0;
                }
            }
            return;
        }

        let shift = self.coefficient.abs().log10().floor() as i32;
        if shift > 0 {
            self.coefficient /= 10f64.powi(shift);
        } else if shift < 0 {
            self.coefficient *= 10f64.powi(-shift);
        }
        self.exponent = self.exponent.saturating_add(shift as i64);

        // log10 rounding can leave 10.0 or 0.999..
        if self.coefficient.abs() >= 10.0 {
            self.coefficient /= 10.0;
            self.exponent = self.exponent.saturating_add(1);
        } else if self.coefficient.abs() < 1.0 {
            self.coefficient *= 10.0;
            self.exponent = self.exponent.saturating_sub(1);
        }
    }
}

impl Add for InsaneInt {
    type Output = InsaneInt;

    fn add(self, rhs: InsaneInt) -> InsaneInt {
        // Towers are so large that adding anything smaller is a no-op.
        if self.starting_e_count > 0 || rhs.starting_e_count > 0 {
            return match self.partial_cmp(&rhs) {
                Some(Ordering::Less) => rhs,
                _ => self,
            };
        }
        if self.is_zero() {
            return rhs;
        }
        if rhs.is_zero() {
            return self;
        }

        let (big, small) = if self.exponent >= rhs.exponent {
            (self, rhs)
        } else {
            (rhs, self)
        };
        let gap = big.exponent.saturating_sub(small.exponent);
        if gap > ADD_PRECISION_LIMIT {
            return big;
        }

        let coefficient = big.coefficient + small.coefficient / 10f64.powi(gap as i32);
        InsaneInt::new(0, coefficient, big.exponent)
    }
}

impl PartialOrd for InsaneInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let sign = |v: &Self| {
            if v.coefficient < 0.0 {
                -1
            } else if v.is_zero() {
                0
            } else {
                1
            }
        };
        match sign(self).cmp(&sign(other)) {
            Ordering::Equal => {}
            ord => return Some(ord),
        }

        let magnitude = self
            .starting_e_count
            .cmp(&other.starting_e_count)
            .then(self.exponent.cmp(&other.exponent));
        let ord = match magnitude {
            Ordering::Equal => self.coefficient.partial_cmp(&other.coefficient)?,
            ord if sign(self) < 0 => ord.reverse(),
            ord => ord,
        };
        Some(ord)
    }
}

impl fmt::Display for InsaneInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.starting_e_count {
            f.write_str("e")?;
        }
        write!(f, "{}e{}", self.coefficient, self.exponent)
    }
}

/// Failure to parse a score string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseInsaneIntError {
    /// Input was empty (or only `e`s).
    #[error("empty score string")]
    Empty,

    /// Coefficient part was not a number.
    #[error("invalid coefficient: {0}")]
    Coefficient(String),

    /// Exponent part was not an integer.
    #[error("invalid exponent: {0}")]
    Exponent(String),
}

impl FromStr for InsaneInt {
    type Err = ParseInsaneIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.trim_start_matches('e');
        let starting_e_count = (trimmed.len() - body.len()) as u32;
        if body.is_empty() {
            return Err(ParseInsaneIntError::Empty);
        }

        let (coefficient, exponent) = match body.split_once(['e', 'E']) {
            Some((coefficient, exponent)) => (coefficient, Some(exponent)),
            None => (body, None),
        };

        let coefficient: f64 = coefficient
            .parse()
            .map_err(|_| ParseInsaneIntError::Coefficient(coefficient.to_string()))?;
        if !coefficient.is_finite() {
            return Err(ParseInsaneIntError::Coefficient(body.to_string()));
        }
        let exponent: i64 = match exponent {
            Some(exponent) => exponent
                .parse()
                .map_err(|_| ParseInsaneIntError::Exponent(exponent.to_string()))?,
            None => 0,
        };

        Ok(InsaneInt::new(starting_e_count, coefficient, exponent))
    }
}

impl Serialize for InsaneInt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InsaneInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
