//! Rational number arithmetic for frame rates and time bases.

use std::cmp::Ordering;
use std::fmt;

/// A rational number with a 32-bit numerator and denominator.
///
/// Used for exact frame rates (e.g. 30000/1001) and time bases where
/// floating point would accumulate error over long streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// Numerator.
    pub num: i32,
    /// Denominator.
    pub den: i32,
}

impl Rational {
    /// Create a new rational number, reduced to lowest terms.
    #[must_use]
    pub fn new(num: i32, den: i32) -> Self {
        let mut r = Self { num, den };
        r.reduce();
        r
    }

    /// The zero rational (0/1).
    pub const ZERO: Self = Self { num: 0, den: 1 };

    /// Whether this rational is valid (non-zero denominator).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.den != 0
    }

    /// Convert to a floating point value.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            f64::from(self.num) / f64::from(self.den)
        }
    }

    /// The multiplicative inverse.
    #[must_use]
    pub fn invert(&self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }

    fn reduce(&mut self) {
        if self.den < 0 {
            self.num = -self.num;
            self.den = -self.den;
        }
        let g = gcd(self.num.unsigned_abs(), self.den.unsigned_abs());
        if g > 1 {
            self.num /= g as i32;
            self.den /= g as i32;
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if !self.is_valid() || !other.is_valid() {
            return None;
        }
        let lhs = i64::from(self.num) * i64::from(other.den);
        let rhs = i64::from(other.num) * i64::from(self.den);
        lhs.partial_cmp(&rhs)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a.max(1)
}
