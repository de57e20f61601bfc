//! The integer-valued signal that flows through every pipeline stage.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// An opaque, signed integer quantity shared by every gatherer, arranger,
/// solver, filterer and scaler. No identity, no invariants beyond the range
/// of `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity(pub i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub fn new(q: i64) -> Self {
        Quantity(q)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Clamps this quantity into `[min, max]`.
    pub fn clamp(self, min: Quantity, max: Quantity) -> Quantity {
        Quantity(self.0.clamp(min.0, max.0))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q", self.0)
    }
}

impl From<i64> for Quantity {
    fn from(value: i64) -> Self {
        Quantity(value)
    }
}

impl Add for Quantity {
    type Output = Quantity;
    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;
    fn sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 - rhs.0)
    }
}

/// Direction implied by a scaling decision, derived from `sign(new - current)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalingMode {
    ScalingUp,
    ScalingDown,
    NotScaling,
}

impl ScalingMode {
    /// Computes the mode implied by moving from `current` to `new`.
    pub fn from_transition(current: Quantity, new: Quantity) -> ScalingMode {
        match new.0.cmp(&current.0) {
            Ordering::Greater => ScalingMode::ScalingUp,
            Ordering::Less => ScalingMode::ScalingDown,
            Ordering::Equal => ScalingMode::NotScaling,
        }
    }

    pub fn is_scaling(self) -> bool {
        !matches!(self, ScalingMode::NotScaling)
    }
}

impl fmt::Display for ScalingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScalingMode::ScalingUp => "scaling up",
            ScalingMode::ScalingDown => "scaling down",
            ScalingMode::NotScaling => "not scaling",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quantity() {
        assert_eq!(Quantity(42).to_string(), "42Q");
        assert_eq!(Quantity(-3).to_string(), "-3Q");
    }

    #[test]
    fn mode_from_transition() {
        assert_eq!(
            ScalingMode::from_transition(Quantity(10), Quantity(20)),
            ScalingMode::ScalingUp
        );
        assert_eq!(
            ScalingMode::from_transition(Quantity(20), Quantity(10)),
            ScalingMode::ScalingDown
        );
        assert_eq!(
            ScalingMode::from_transition(Quantity(10), Quantity(10)),
            ScalingMode::NotScaling
        );
    }

    #[test]
    fn display_mode() {
        assert_eq!(ScalingMode::ScalingUp.to_string(), "scaling up");
        assert_eq!(ScalingMode::ScalingDown.to_string(), "scaling down");
        assert_eq!(ScalingMode::NotScaling.to_string(), "not scaling");
    }
}
