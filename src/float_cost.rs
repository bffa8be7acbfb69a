use std::fmt::Debug;

use derive_more::Display;
use num_traits::One;
use num_traits::SaturatingAdd;
use num_traits::Zero;
use num_traits::bounds::UpperBounded;
use ordered_float::OrderedFloat;

/// Tolerance used when comparing path lengths computed along different routes.
pub const COST_EPSILON: f64 = 1e-9;

/// A totally ordered path cost.
///
/// Grid costs are sums of `1` and `√2`, so they can't be integers without
/// losing precision. `OrderedFloat` gives us `Ord` so they can rank heap
/// entries, and infinity doubles as "unreachable".
#[derive(Copy, Clone, Default, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
#[display("${_0:.3}")]
pub struct FloatCost(pub OrderedFloat<f64>);

impl FloatCost {
    #[inline(always)]
    pub fn new(f: f64) -> Self {
        debug_assert!(!f.is_nan(), "Costs can't be NaN");
        Self(OrderedFloat(f))
    }

    #[inline(always)]
    pub fn get(self) -> f64 {
        self.0.0
    }

    #[inline(always)]
    pub fn infinity() -> Self {
        Self(OrderedFloat(f64::INFINITY))
    }

    #[inline(always)]
    pub fn is_finite(self) -> bool {
        self.0.0.is_finite()
    }

    /// Whether both costs are the same up to rounding errors.
    pub fn approx_eq(self, other: Self) -> bool {
        if !self.is_finite() || !other.is_finite() {
            return self == other;
        }
        let scale = f64::max(1.0, f64::max(self.get().abs(), other.get().abs()));
        (self.get() - other.get()).abs() <= COST_EPSILON * scale
    }
}

impl From<f64> for FloatCost {
    fn from(f: f64) -> Self {
        Self::new(f)
    }
}

impl std::ops::Add for FloatCost {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}
impl std::ops::Sub for FloatCost {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}
impl std::ops::Mul<f64> for FloatCost {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}
impl std::ops::Mul for FloatCost {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        Self(self.0 * rhs.0)
    }
}
impl std::ops::AddAssign for FloatCost {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}
impl SaturatingAdd for FloatCost {
    /// Infinity absorbs everything, so floats saturate on their own.
    fn saturating_add(&self, rhs: &Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Zero for FloatCost {
    #[inline(always)]
    fn is_zero(&self) -> bool {
        self.0 == OrderedFloat::zero()
    }
    #[inline(always)]
    fn zero() -> Self {
        Self(OrderedFloat::zero())
    }
}
impl One for FloatCost {
    #[inline(always)]
    fn one() -> Self {
        Self(OrderedFloat::one())
    }
}
impl UpperBounded for FloatCost {
    fn max_value() -> Self {
        Self::infinity()
    }
}
