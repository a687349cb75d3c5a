// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Points, vectors and rectangles over decimal coordinates.

use crate::decimal::Decimal;
use crate::matrix::Matrix;
use crate::Error;

/// A trait for tolerance-based equality comparisons.
pub trait ApproxEq<Rhs: ?Sized = Self> {
    /// Returns `true` if values are equal within `tolerance`.
    fn approx_eq(&self, other: &Rhs, tolerance: &Decimal) -> bool;

    /// Returns `true` if values are not equal within `tolerance`.
    #[inline]
    fn approx_ne(&self, other: &Rhs, tolerance: &Decimal) -> bool {
        !self.approx_eq(other, tolerance)
    }
}

impl ApproxEq for Decimal {
    #[inline]
    fn approx_eq(&self, other: &Decimal, tolerance: &Decimal) -> bool {
        Decimal::approx_eq(self, other, tolerance)
    }
}

impl<T: ApproxEq> ApproxEq for Vec<T> {
    fn approx_eq(&self, other: &Self, tolerance: &Decimal) -> bool {
        if self.len() != other.len() {
            return false;
        }

        self.iter()
            .zip(other.iter())
            .all(|(a, b)| a.approx_eq(b, tolerance))
    }
}

/// A 2D point representation.
///
/// Equality is exact; use [`ApproxEq`] for tolerance-based comparisons.
#[derive(Clone, PartialEq, Eq)]
pub struct Point {
    /// Position along the X-axis.
    pub x: Decimal,

    /// Position along the Y-axis.
    pub y: Decimal,
}

impl Point {
    /// Creates a new point.
    #[inline]
    pub fn new(x: Decimal, y: Decimal) -> Self {
        Point { x, y }
    }

    /// Creates the origin point.
    #[inline]
    pub fn zero() -> Self {
        Point::new(Decimal::zero(), Decimal::zero())
    }

    /// Creates a point from binary floats.
    pub fn from_f64(x: f64, y: f64) -> Result<Self, Error> {
        Ok(Point::new(Decimal::from_f64(x)?, Decimal::from_f64(y)?))
    }

    /// Returns the Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> Decimal {
        let dx = &self.x - &other.x;
        let dy = &self.y - &other.y;
        // Can't fail: the sum of squares is non-negative.
        (&dx * &dx + &dy * &dy).sqrt().unwrap()
    }

    /// Returns the midpoint between `self` and `other`.
    pub fn midpoint(&self, other: &Point) -> Point {
        let two = Decimal::from(2);
        Point::new(
            (&self.x + &other.x) / &two,
            (&self.y + &other.y) / &two,
        )
    }

    /// Converts into a 2D [`Vector`].
    pub fn to_vector(&self) -> Vector {
        Vector(vec![self.x.clone(), self.y.clone()])
    }
}

impl ApproxEq for Point {
    fn approx_eq(&self, other: &Point, tolerance: &Decimal) -> bool {
        self.x.approx_eq(&other.x, tolerance) && self.y.approx_eq(&other.y, tolerance)
    }
}

impl std::fmt::Debug for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Point({} {})", self.x, self.y)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A rect representation.
///
/// Width and height are guaranteed to be ≥ 0.
#[derive(Clone, PartialEq, Debug)]
pub struct Rect {
    x: Decimal,
    y: Decimal,
    width: Decimal,
    height: Decimal,
}

impl Rect {
    /// Creates a new `Rect` from values.
    ///
    /// Returns `None` when width or height is negative.
    pub fn new(x: Decimal, y: Decimal, width: Decimal, height: Decimal) -> Option<Self> {
        if width.sign() < 0 || height.sign() < 0 {
            return None;
        }

        Some(Rect { x, y, width, height })
    }

    /// Creates the tightest rect around a set of points.
    ///
    /// Returns `None` for an empty set.
    pub fn from_points<'a, I: IntoIterator<Item = &'a Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;

        let mut min_x = first.x.clone();
        let mut min_y = first.y.clone();
        let mut max_x = first.x.clone();
        let mut max_y = first.y.clone();

        for p in iter {
            if p.x < min_x {
                min_x = p.x.clone();
            } else if p.x > max_x {
                max_x = p.x.clone();
            }

            if p.y < min_y {
                min_y = p.y.clone();
            } else if p.y > max_y {
                max_y = p.y.clone();
            }
        }

        let width = &max_x - &min_x;
        let height = &max_y - &min_y;
        Some(Rect { x: min_x, y: min_y, width, height })
    }

    /// Returns rect's X position.
    #[inline]
    pub fn x(&self) -> &Decimal {
        &self.x
    }

    /// Returns rect's Y position.
    #[inline]
    pub fn y(&self) -> &Decimal {
        &self.y
    }

    /// Returns rect's width.
    #[inline]
    pub fn width(&self) -> &Decimal {
        &self.width
    }

    /// Returns rect's height.
    #[inline]
    pub fn height(&self) -> &Decimal {
        &self.height
    }

    /// Returns rect's right edge position.
    #[inline]
    pub fn right(&self) -> Decimal {
        &self.x + &self.width
    }

    /// Returns rect's bottom edge position.
    #[inline]
    pub fn bottom(&self) -> Decimal {
        &self.y + &self.height
    }

    /// Expands the rect to include `other`.
    pub fn expand(&self, other: &Rect) -> Rect {
        let x = std::cmp::min(self.x.clone(), other.x.clone());
        let y = std::cmp::min(self.y.clone(), other.y.clone());
        let right = std::cmp::max(self.right(), other.right());
        let bottom = std::cmp::max(self.bottom(), other.bottom());
        let width = &right - &x;
        let height = &bottom - &y;
        Rect { x, y, width, height }
    }

    /// Checks that the rect contains a point, with boundary tolerance.
    pub fn contains(&self, p: &Point, tolerance: &Decimal) -> bool {
        p.x >= &self.x - tolerance
            && p.x <= self.right() + tolerance
            && p.y >= &self.y - tolerance
            && p.y <= self.bottom() + tolerance
    }
}

impl ApproxEq for Rect {
    fn approx_eq(&self, other: &Rect, tolerance: &Decimal) -> bool {
        self.x.approx_eq(&other.x, tolerance)
            && self.y.approx_eq(&other.y, tolerance)
            && self.width.approx_eq(&other.width, tolerance)
            && self.height.approx_eq(&other.height, tolerance)
    }
}

/// An N-dimensional vector of decimals, N ≥ 1.
#[derive(Clone, PartialEq, Debug)]
pub struct Vector(Vec<Decimal>);

impl Vector {
    /// Creates a new vector.
    ///
    /// At least one component is required.
    pub fn new(components: Vec<Decimal>) -> Result<Self, Error> {
        if components.is_empty() {
            return Err(Error::DimensionMismatch { expected: 1, actual: 0 });
        }

        Ok(Vector(components))
    }

    /// Creates a vector from binary floats, reporting the index of the
    /// first non-finite component.
    pub fn from_f64s(components: &[f64]) -> Result<Self, Error> {
        let mut list = Vec::with_capacity(components.len());
        for (i, &v) in components.iter().enumerate() {
            list.push(Decimal::from_f64(v).map_err(|_| Error::InvalidComponent(i))?);
        }

        Vector::new(list)
    }

    /// Creates a 2D vector.
    #[inline]
    pub fn vec2(x: Decimal, y: Decimal) -> Self {
        Vector(vec![x, y])
    }

    /// Returns the number of components.
    #[inline]
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    /// Returns a component by index.
    #[inline]
    pub fn component(&self, index: usize) -> Option<&Decimal> {
        self.0.get(index)
    }

    /// Returns a slice of the components.
    #[inline]
    pub fn components(&self) -> &[Decimal] {
        &self.0
    }

    fn check_dim(&self, other: &Vector) -> Result<(), Error> {
        if self.dim() != other.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                actual: other.dim(),
            });
        }

        Ok(())
    }

    /// Adds two vectors of the same dimension.
    pub fn add(&self, other: &Vector) -> Result<Vector, Error> {
        self.check_dim(other)?;
        Ok(Vector(
            self.0.iter().zip(&other.0).map(|(a, b)| a + b).collect(),
        ))
    }

    /// Subtracts two vectors of the same dimension.
    pub fn sub(&self, other: &Vector) -> Result<Vector, Error> {
        self.check_dim(other)?;
        Ok(Vector(
            self.0.iter().zip(&other.0).map(|(a, b)| a - b).collect(),
        ))
    }

    /// Multiplies every component by a scalar.
    pub fn scale(&self, factor: &Decimal) -> Vector {
        Vector(self.0.iter().map(|a| a * factor).collect())
    }

    /// Negates every component.
    pub fn negate(&self) -> Vector {
        Vector(self.0.iter().map(|a| -a).collect())
    }

    /// Returns the dot product of two vectors of the same dimension.
    pub fn dot(&self, other: &Vector) -> Result<Decimal, Error> {
        self.check_dim(other)?;
        Ok(self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum())
    }

    /// Returns the cross product. 3D vectors only.
    pub fn cross(&self, other: &Vector) -> Result<Vector, Error> {
        if self.dim() != 3 {
            return Err(Error::DimensionMismatch { expected: 3, actual: self.dim() });
        }
        if other.dim() != 3 {
            return Err(Error::DimensionMismatch { expected: 3, actual: other.dim() });
        }

        let a = &self.0;
        let b = &other.0;
        Ok(Vector(vec![
            &a[1] * &b[2] - &a[2] * &b[1],
            &a[2] * &b[0] - &a[0] * &b[2],
            &a[0] * &b[1] - &a[1] * &b[0],
        ]))
    }

    /// Returns the outer product `self · otherᵀ` as a row-major matrix.
    pub fn outer(&self, other: &Vector) -> Matrix {
        let mut rows = Vec::with_capacity(self.dim());
        for a in &self.0 {
            rows.push(other.0.iter().map(|b| a * b).collect());
        }

        // Can't fail: every row has `other.dim()` components.
        Matrix::from_rows(rows).unwrap()
    }

    /// Returns the Euclidean norm.
    pub fn norm(&self) -> Decimal {
        let sum: Decimal = self.0.iter().map(|a| a * a).sum();
        // Can't fail: the sum of squares is non-negative.
        sum.sqrt().unwrap()
    }

    /// Returns the unit vector in the same direction.
    ///
    /// A vector with a norm below the singular threshold
    /// normalizes to the zero vector.
    pub fn normalize(&self) -> Vector {
        let norm = self.norm();
        if norm < Decimal::singular_threshold() {
            return Vector(vec![Decimal::zero(); self.dim()]);
        }

        Vector(self.0.iter().map(|a| a / &norm).collect())
    }

    /// Returns the angle between two vectors, in radians.
    ///
    /// A zero vector is an error.
    pub fn angle_between(&self, other: &Vector) -> Result<Decimal, Error> {
        self.check_dim(other)?;

        let na = self.norm();
        let nb = other.norm();
        let threshold = Decimal::singular_threshold();
        if na < threshold || nb < threshold {
            return Err(Error::ZeroVector("angle"));
        }

        let mut cos = self.dot(other)?.checked_div(&(na * nb))?;

        // Rounding can push the ratio just outside [−1, 1].
        let one = Decimal::one();
        if cos > one {
            cos = one;
        } else if cos < -Decimal::one() {
            cos = -Decimal::one();
        }

        cos.acos()
    }

    /// Projects `self` onto `other`.
    ///
    /// Projection onto a zero vector is an error.
    pub fn project_onto(&self, other: &Vector) -> Result<Vector, Error> {
        self.check_dim(other)?;

        let denom = other.dot(other)?;
        if denom < Decimal::singular_threshold() {
            return Err(Error::ZeroVector("projection"));
        }

        let factor = self.dot(other)?.checked_div(&denom)?;
        Ok(other.scale(&factor))
    }

    /// Returns the counter-clockwise perpendicular. 2D vectors only.
    pub fn orthogonal(&self) -> Result<Vector, Error> {
        if self.dim() != 2 {
            return Err(Error::DimensionMismatch { expected: 2, actual: self.dim() });
        }

        Ok(Vector(vec![-&self.0[1], self.0[0].clone()]))
    }
}

impl ApproxEq for Vector {
    fn approx_eq(&self, other: &Vector, tolerance: &Decimal) -> bool {
        self.0.approx_eq(&other.0, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn vector_ctor() {
        assert!(Vector::new(vec![]).is_err());
        assert!(matches!(
            Vector::from_f64s(&[1.0, f64::NAN]),
            Err(Error::InvalidComponent(1))
        ));
    }

    #[test]
    fn vector_algebra() {
        let a = Vector::vec2(dec(3), dec(4));
        let b = Vector::vec2(dec(1), dec(2));

        assert_eq!(a.add(&b).unwrap(), Vector::vec2(dec(4), dec(6)));
        assert_eq!(a.sub(&b).unwrap(), Vector::vec2(dec(2), dec(2)));
        assert_eq!(a.dot(&b).unwrap(), dec(11));
        assert_eq!(a.norm(), dec(5));

        let c = Vector::new(vec![dec(1), dec(0), dec(0)]).unwrap();
        let d = Vector::new(vec![dec(0), dec(1), dec(0)]).unwrap();
        assert_eq!(
            c.cross(&d).unwrap(),
            Vector::new(vec![dec(0), dec(0), dec(1)]).unwrap()
        );

        assert!(a.dot(&c).is_err());
    }

    #[test]
    fn normalize_zero_vector() {
        let z = Vector::vec2(Decimal::zero(), Decimal::zero());
        assert_eq!(z.normalize(), z);
        assert!(z.angle_between(&z).is_err());
        assert!(Vector::vec2(dec(1), dec(1)).project_onto(&z).is_err());
    }

    #[test]
    fn angle_between_orthogonal() {
        let a = Vector::vec2(dec(1), dec(0));
        let b = Vector::vec2(dec(0), dec(5));
        let angle = a.angle_between(&b).unwrap();
        assert!((angle.to_f64() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn orthogonal_is_ccw() {
        let a = Vector::vec2(dec(1), dec(0));
        assert_eq!(a.orthogonal().unwrap(), Vector::vec2(dec(0), dec(1)));
    }

    #[test]
    fn rect_from_points() {
        let points = vec![
            Point::new(dec(2), dec(5)),
            Point::new(dec(-1), dec(3)),
            Point::new(dec(4), dec(0)),
        ];
        let r = Rect::from_points(points.iter()).unwrap();
        assert_eq!(*r.x(), dec(-1));
        assert_eq!(*r.y(), dec(0));
        assert_eq!(*r.width(), dec(5));
        assert_eq!(*r.height(), dec(5));
    }

    #[test]
    fn outer_product_shape() {
        let a = Vector::vec2(dec(1), dec(2));
        let b = Vector::new(vec![dec(3), dec(4), dec(5)]).unwrap();
        let m = a.outer(&b);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(*m.get(1, 2).unwrap(), dec(10));
    }
}
