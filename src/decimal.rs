// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An arbitrary-precision decimal scalar.
//!
//! Every geometric quantity in this crate is a [`Decimal`].
//! The working precision is a thread-local setting, so two runs with
//! different precisions must not be interleaved on the same thread.
//!
//! This module is the only place where outside numbers enter the crate:
//! [`Decimal::from_f64`] rejects NaN and infinities and [`Decimal::parse`]
//! rejects malformed literals. Everything past this boundary is total,
//! except division by an exact zero and the square root of a negative.

use std::cell::Cell;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_traits::{FromPrimitive, One, ToPrimitive, Zero};
use once_cell::sync::Lazy;

use crate::Error;

/// The lowest allowed working precision, in significant digits.
pub const MIN_PRECISION: u64 = 50;

/// The highest allowed working precision, in significant digits.
///
/// The backing arithmetic carries 100 digits through division and roots;
/// 90 plus the internal guard digits stays inside that.
pub const MAX_PRECISION: u64 = 90;

/// The default working precision, in significant digits.
pub const DEFAULT_PRECISION: u64 = 80;

// Extra digits carried by the transcendental functions before the final
// rounding back to the working precision.
const GUARD_DIGITS: u64 = 10;

thread_local! {
    static PRECISION: Cell<u64> = Cell::new(DEFAULT_PRECISION);
}

// 160 fractional digits; enough for MAX_PRECISION plus guard digits.
static PI: Lazy<BigDecimal> = Lazy::new(|| {
    BigDecimal::from_str(
        "3.1415926535897932384626433832795028841971693993751058209749445923078164062862\
         0899862803482534211706798214808651328230664709384460955058223172535940812848111\
         74502",
    )
    .unwrap()
});

/// Sets the working precision for the current thread.
///
/// The value is clamped to `MIN_PRECISION..=MAX_PRECISION`.
pub fn set_precision(digits: u64) {
    let digits = digits.max(MIN_PRECISION).min(MAX_PRECISION);
    PRECISION.with(|p| p.set(digits));
}

/// Returns the working precision of the current thread.
pub fn precision() -> u64 {
    PRECISION.with(|p| p.get())
}

/// An arbitrary-precision decimal number.
///
/// Always finite. Equality and ordering are exact;
/// use [`Decimal::approx_eq`] for tolerance-based comparisons.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Decimal(BigDecimal);

impl Decimal {
    /// Returns 0.
    #[inline]
    pub fn zero() -> Self {
        Decimal(BigDecimal::zero())
    }

    /// Returns 1.
    #[inline]
    pub fn one() -> Self {
        Decimal(BigDecimal::one())
    }

    /// Returns π at the working precision.
    pub fn pi() -> Self {
        Decimal::rounded(PI.clone())
    }

    /// The determinant/pivot magnitude below which a matrix is treated as singular.
    pub fn singular_threshold() -> Self {
        Decimal::lit("1e-40")
    }

    /// Converts a finite binary float.
    ///
    /// The conversion is exact: the float's full binary expansion is taken.
    /// NaN and infinities are an error.
    pub fn from_f64(value: f64) -> Result<Self, Error> {
        if !value.is_finite() {
            return Err(Error::InvalidNumber(value.to_string()));
        }

        BigDecimal::from_f64(value)
            .map(Decimal::rounded)
            .ok_or_else(|| Error::InvalidNumber(value.to_string()))
    }

    /// Parses a decimal literal like `-1.25e-3`.
    ///
    /// The compact forms `.5` and `5.` are accepted.
    pub fn parse(text: &str) -> Result<Self, Error> {
        BigDecimal::from_str(&normalize_literal(text.trim()))
            .map(Decimal::rounded)
            .map_err(|_| Error::InvalidNumber(text.to_string()))
    }

    // Parses a literal that is known to be valid.
    pub(crate) fn lit(text: &'static str) -> Self {
        // Can't fail: the caller passes a checked literal.
        Decimal(BigDecimal::from_str(text).unwrap())
    }

    /// Converts to a binary float, losing precision.
    #[inline]
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    /// Returns `true` if the number is exactly zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns −1, 0 or +1.
    #[inline]
    pub fn sign(&self) -> i32 {
        match self.0.cmp(&BigDecimal::zero()) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        }
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// Returns `true` if `|self − other| ≤ tolerance`.
    #[inline]
    pub fn approx_eq(&self, other: &Decimal, tolerance: &Decimal) -> bool {
        (self - other).abs() <= *tolerance
    }

    /// Returns `true` if `|self| ≤ tolerance`.
    #[inline]
    pub fn approx_zero(&self, tolerance: &Decimal) -> bool {
        self.abs() <= *tolerance
    }

    /// Divides, failing on an exactly-zero divisor.
    pub fn checked_div(&self, rhs: &Decimal) -> Result<Self, Error> {
        if rhs.is_zero() {
            return Err(Error::DivisionByZero);
        }

        Ok(Decimal::rounded(&self.0 / &rhs.0))
    }

    /// Returns the square root, failing on a negative number.
    pub fn sqrt(&self) -> Result<Self, Error> {
        if self.sign() < 0 {
            return Err(Error::NegativeSqrt);
        }

        // Can't fail: the number is non-negative.
        Ok(Decimal::rounded(self.0.sqrt().unwrap()))
    }

    /// Raises to an integer power.
    ///
    /// A negative exponent with a zero base is a division by zero.
    pub fn pow(&self, exp: i64) -> Result<Self, Error> {
        if exp == 0 {
            return Ok(Decimal::one());
        }

        let mut result = BigDecimal::one();
        let mut base = self.0.clone();
        let mut n = exp.unsigned_abs();
        while n > 0 {
            if n & 1 == 1 {
                result = (&result * &base).with_prec(precision());
            }
            base = (&base * &base).with_prec(precision());
            n >>= 1;
        }

        if exp < 0 {
            Decimal::one().checked_div(&Decimal(result))
        } else {
            Ok(Decimal::rounded(result))
        }
    }

    /// Returns the sine of an angle in radians.
    pub fn sin(&self) -> Self {
        let wp = precision() + GUARD_DIGITS;
        let x = reduce_angle(&self.0, wp);
        Decimal::rounded(sin_series(&x, wp))
    }

    /// Returns the cosine of an angle in radians.
    pub fn cos(&self) -> Self {
        let wp = precision() + GUARD_DIGITS;
        let half_pi = PI.with_prec(wp + 5) / BigDecimal::from(2);
        let x = reduce_angle(&(half_pi - &self.0), wp);
        Decimal::rounded(sin_series(&x, wp))
    }

    /// Returns the arc tangent, in `(−π/2, π/2)`.
    pub fn atan(&self) -> Self {
        let wp = precision() + GUARD_DIGITS;
        Decimal::rounded(atan_raw(&self.0, wp))
    }

    /// Returns the arc cosine, failing outside `[−1, 1]`.
    pub fn acos(&self) -> Result<Self, Error> {
        let one = Decimal::one();
        if self.abs() > one {
            return Err(Error::OutOfDomain("acos"));
        }

        if *self == one {
            return Ok(Decimal::zero());
        }
        if *self == -&one {
            return Ok(Decimal::pi());
        }

        // Can't fail: 1 − x² ≥ 0 inside the domain.
        let s = (&one - &(self * self)).sqrt().unwrap();
        Ok(Decimal::atan2(&s, self))
    }

    /// Returns the four-quadrant arc tangent of `y / x`, in `(−π, π]`.
    ///
    /// `atan2(0, 0)` is 0.
    pub fn atan2(y: &Decimal, x: &Decimal) -> Self {
        let wp = precision() + GUARD_DIGITS;

        if x.is_zero() {
            if y.is_zero() {
                return Decimal::zero();
            }
            let half_pi = PI.with_prec(wp) / BigDecimal::from(2);
            return if y.sign() > 0 {
                Decimal::rounded(half_pi)
            } else {
                Decimal::rounded(-half_pi)
            };
        }

        let q = (&y.0 / &x.0).with_prec(wp);
        let a = atan_raw(&q, wp);
        if x.sign() > 0 {
            Decimal::rounded(a)
        } else if y.sign() >= 0 {
            Decimal::rounded(a + PI.with_prec(wp))
        } else {
            Decimal::rounded(a - PI.with_prec(wp))
        }
    }

    /// Converts an angle in degrees to radians.
    pub fn to_radians(&self) -> Self {
        let wp = precision() + GUARD_DIGITS;
        Decimal::rounded((&self.0 * PI.with_prec(wp)).with_prec(wp) / BigDecimal::from(180))
    }

    /// Rounds to the given number of decimal places.
    pub fn rounded_to(&self, decimals: i64) -> Self {
        Decimal(self.0.round(decimals))
    }

    /// Formats as a plain decimal string without an exponent,
    /// with trailing fractional zeros stripped.
    pub fn plain_string(&self) -> String {
        let (int, scale) = self.0.as_bigint_and_exponent();
        let mut digits = int.to_string();

        let neg = digits.starts_with('-');
        if neg {
            digits.remove(0);
        }

        if digits.bytes().all(|b| b == b'0') {
            return "0".to_string();
        }

        let mut out = if scale <= 0 {
            let mut s = digits;
            s.extend(std::iter::repeat('0').take((-scale) as usize));
            s
        } else {
            let scale = scale as usize;
            if digits.len() <= scale {
                let mut s = String::from("0.");
                s.extend(std::iter::repeat('0').take(scale - digits.len()));
                s.push_str(&digits);
                s
            } else {
                let mut s = digits;
                s.insert(s.len() - scale, '.');
                s
            }
        };

        if out.contains('.') {
            while out.ends_with('0') {
                out.pop();
            }
            if out.ends_with('.') {
                out.pop();
            }
        }

        if neg {
            out.insert(0, '-');
        }

        out
    }

    #[inline]
    fn rounded(value: BigDecimal) -> Self {
        Decimal(value.with_prec(precision()))
    }
}

// Gives bare-dot forms an explicit zero digit: `.5` → `0.5`, `5.` → `5`.
fn normalize_literal(text: &str) -> String {
    let (sign, body) = match text.strip_prefix('-') {
        Some(body) => ("-", body),
        None => match text.strip_prefix('+') {
            Some(body) => ("", body),
            None => ("", text),
        },
    };

    let mut body = body.to_string();
    if body.starts_with('.') {
        body.insert(0, '0');
    }
    if body.ends_with('.') {
        body.pop();
    }

    format!("{}{}", sign, body)
}

fn eps_at(wp: u64) -> BigDecimal {
    // Can't fail: the literal is well-formed.
    BigDecimal::from_str(&format!("1e-{}", wp)).unwrap()
}

// Reduces an angle to [−π, π].
fn reduce_angle(x: &BigDecimal, wp: u64) -> BigDecimal {
    let two_pi = (PI.with_prec(wp + 5) * BigDecimal::from(2)).with_prec(wp + 5);

    // A float approximation of the quotient is enough:
    // the loops below fix an off-by-one.
    let q = (x / &two_pi).with_prec(20);
    let k = q.to_f64().unwrap_or(0.0).round();

    let mut r = if k == 0.0 {
        x.clone()
    } else {
        let k = BigDecimal::from_f64(k).unwrap_or_else(BigDecimal::zero);
        (x - (k * &two_pi).with_prec(wp + 5)).with_prec(wp + 5)
    };

    let pi_wp = PI.with_prec(wp + 5);
    let neg_pi = -pi_wp.clone();
    while r > pi_wp {
        r = (&r - &two_pi).with_prec(wp + 5);
    }
    while r < neg_pi {
        r = (&r + &two_pi).with_prec(wp + 5);
    }

    r.with_prec(wp)
}

// Maclaurin series for sin; the argument must be reduced to [−π, π].
fn sin_series(x: &BigDecimal, wp: u64) -> BigDecimal {
    let eps = eps_at(wp);
    let x2 = (x * x).with_prec(wp);
    let mut term = x.clone();
    let mut sum = x.clone();

    for k in 1..1000i64 {
        term = ((&term * &x2).with_prec(wp) / BigDecimal::from((2 * k) * (2 * k + 1)))
            .with_prec(wp);
        term = -term;
        sum = (&sum + &term).with_prec(wp);
        if term.abs() < eps {
            break;
        }
    }

    sum
}

fn atan_raw(x: &BigDecimal, wp: u64) -> BigDecimal {
    if x.is_zero() {
        return BigDecimal::zero();
    }

    let one = BigDecimal::one();
    if x.abs() > one {
        // atan(x) = ±π/2 − atan(1/x)
        let half_pi = PI.with_prec(wp + 5) / BigDecimal::from(2);
        let inv = (&one / x).with_prec(wp);
        let a = atan_raw(&inv, wp);
        return if x > &BigDecimal::zero() {
            (half_pi - a).with_prec(wp)
        } else {
            (-half_pi - a).with_prec(wp)
        };
    }

    // Halve the argument three times so the series converges quickly:
    // atan(x) = 2·atan(x / (1 + √(1 + x²)))
    let mut y = x.clone();
    for _ in 0..3 {
        let y2 = (&y * &y).with_prec(wp);
        // Can't fail: 1 + y² > 0.
        let s = (BigDecimal::one() + y2).sqrt().unwrap();
        y = (&y / &(BigDecimal::one() + s)).with_prec(wp);
    }

    let eps = eps_at(wp);
    let y2 = (&y * &y).with_prec(wp);
    let mut power = y.clone();
    let mut sum = y;

    for k in 1..2000i64 {
        power = (&power * &y2).with_prec(wp);
        let term = (&power / BigDecimal::from(2 * k + 1)).with_prec(wp);
        if k % 2 == 1 {
            sum = (&sum - &term).with_prec(wp);
        } else {
            sum = (&sum + &term).with_prec(wp);
        }
        if term.abs() < eps {
            break;
        }
    }

    (sum * BigDecimal::from(8)).with_prec(wp)
}

macro_rules! impl_bin_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl std::ops::$trait for Decimal {
            type Output = Decimal;
            #[inline]
            fn $method(self, rhs: Decimal) -> Decimal {
                Decimal::rounded(&self.0 $op &rhs.0)
            }
        }

        impl std::ops::$trait for &Decimal {
            type Output = Decimal;
            #[inline]
            fn $method(self, rhs: &Decimal) -> Decimal {
                Decimal::rounded(&self.0 $op &rhs.0)
            }
        }

        impl std::ops::$trait<&Decimal> for Decimal {
            type Output = Decimal;
            #[inline]
            fn $method(self, rhs: &Decimal) -> Decimal {
                Decimal::rounded(&self.0 $op &rhs.0)
            }
        }

        impl std::ops::$trait<Decimal> for &Decimal {
            type Output = Decimal;
            #[inline]
            fn $method(self, rhs: Decimal) -> Decimal {
                Decimal::rounded(&self.0 $op &rhs.0)
            }
        }
    };
}

impl_bin_op!(Add, add, +);
impl_bin_op!(Sub, sub, -);
impl_bin_op!(Mul, mul, *);

impl std::ops::Div for Decimal {
    type Output = Decimal;

    /// Divides two numbers.
    ///
    /// # Panics
    ///
    /// Panics when `rhs` is exactly zero.
    /// Use [`Decimal::checked_div`] when the divisor is data-dependent.
    fn div(self, rhs: Decimal) -> Decimal {
        &self / &rhs
    }
}

impl std::ops::Div for &Decimal {
    type Output = Decimal;

    fn div(self, rhs: &Decimal) -> Decimal {
        if rhs.is_zero() {
            panic!("division by zero");
        }

        Decimal::rounded(&self.0 / &rhs.0)
    }
}

impl std::ops::Div<&Decimal> for Decimal {
    type Output = Decimal;
    #[inline]
    fn div(self, rhs: &Decimal) -> Decimal {
        &self / rhs
    }
}

impl std::ops::Div<Decimal> for &Decimal {
    type Output = Decimal;
    #[inline]
    fn div(self, rhs: Decimal) -> Decimal {
        self / &rhs
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;
    #[inline]
    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl std::ops::Neg for &Decimal {
    type Output = Decimal;
    #[inline]
    fn neg(self) -> Decimal {
        Decimal(-self.0.clone())
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::zero(), |acc, v| acc + v)
    }
}

impl From<i64> for Decimal {
    #[inline]
    fn from(v: i64) -> Self {
        Decimal(BigDecimal::from(v))
    }
}

impl From<i32> for Decimal {
    #[inline]
    fn from(v: i32) -> Self {
        Decimal(BigDecimal::from(v))
    }
}

impl From<u32> for Decimal {
    #[inline]
    fn from(v: u32) -> Self {
        Decimal(BigDecimal::from(v))
    }
}

impl From<usize> for Decimal {
    #[inline]
    fn from(v: usize) -> Self {
        Decimal(BigDecimal::from(v as u64))
    }
}

impl std::fmt::Debug for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Decimal({})", self.plain_string())
    }
}

impl std::fmt::Display for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.plain_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &Decimal, b: f64) {
        assert!(
            (a.to_f64() - b).abs() < 1e-12,
            "{} != {}",
            a.plain_string(),
            b
        );
    }

    #[test]
    fn parse_and_format() {
        assert_eq!(Decimal::parse("1.500").unwrap().plain_string(), "1.5");
        assert_eq!(Decimal::parse("-0.25e1").unwrap().plain_string(), "-2.5");
        assert_eq!(Decimal::parse("0.000").unwrap().plain_string(), "0");
        assert_eq!(Decimal::parse(".5").unwrap().plain_string(), "0.5");
        assert_eq!(Decimal::parse("-.5").unwrap().plain_string(), "-0.5");
        assert_eq!(Decimal::parse("5.").unwrap().plain_string(), "5");
        assert_eq!(Decimal::from(1500).plain_string(), "1500");
        assert!(Decimal::parse("abc").is_err());
        assert!(Decimal::from_f64(f64::NAN).is_err());
        assert!(Decimal::from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn arithmetic() {
        let a = Decimal::from(10);
        let b = Decimal::from(4);
        assert_eq!((&a + &b).plain_string(), "14");
        assert_eq!((&a - &b).plain_string(), "6");
        assert_eq!((&a * &b).plain_string(), "40");
        assert_eq!(a.checked_div(&b).unwrap().plain_string(), "2.5");
        assert!(a.checked_div(&Decimal::zero()).is_err());
    }

    #[test]
    fn sqrt_and_pow() {
        close(&Decimal::from(2).sqrt().unwrap(), std::f64::consts::SQRT_2);
        assert!(Decimal::from(-1).sqrt().is_err());
        assert_eq!(Decimal::from(3).pow(4).unwrap().plain_string(), "81");
        close(&Decimal::from(2).pow(-2).unwrap(), 0.25);
        assert!(Decimal::zero().pow(-1).is_err());
    }

    #[test]
    fn trig() {
        let pi = Decimal::pi();
        close(&pi, std::f64::consts::PI);
        close(&Decimal::zero().sin(), 0.0);
        close(&(pi.clone() / Decimal::from(2)).sin(), 1.0);
        close(&pi.cos(), -1.0);
        close(&Decimal::one().atan(), std::f64::consts::FRAC_PI_4);
        close(&Decimal::one().acos().unwrap(), 0.0);
        close(&(-Decimal::one()).acos().unwrap(), std::f64::consts::PI);
        assert!(Decimal::from(2).acos().is_err());
    }

    #[test]
    fn atan2_quadrants() {
        let one = Decimal::one();
        close(
            &Decimal::atan2(&one, &one),
            std::f64::consts::FRAC_PI_4,
        );
        close(
            &Decimal::atan2(&one, &-&one),
            3.0 * std::f64::consts::FRAC_PI_4,
        );
        close(
            &Decimal::atan2(&-&one, &-&one),
            -3.0 * std::f64::consts::FRAC_PI_4,
        );
        close(
            &Decimal::atan2(&-&one, &one),
            -std::f64::consts::FRAC_PI_4,
        );
        close(&Decimal::atan2(&one, &Decimal::zero()), std::f64::consts::FRAC_PI_2);
        close(&Decimal::atan2(&Decimal::zero(), &Decimal::zero()), 0.0);
    }

    #[test]
    fn precision_is_clamped() {
        set_precision(10);
        assert_eq!(precision(), MIN_PRECISION);
        set_precision(1000);
        assert_eq!(precision(), MAX_PRECISION);
        set_precision(DEFAULT_PRECISION);
    }

    #[test]
    fn high_precision_sqrt2() {
        // First 50 digits of √2.
        let s = Decimal::from(2).sqrt().unwrap().plain_string();
        assert!(s.starts_with("1.4142135623730950488016887242096980785696718753769"));
    }
}
