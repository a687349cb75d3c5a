// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Dense row-major matrices of decimals.
//!
//! 3×3 homogeneous matrices with the bottom row `[0, 0, 1]` represent
//! 2D affine transforms and are the workhorse of the whole pipeline:
//! clip spaces, transform flattening, patterns and gradients all compose
//! through [`Matrix::mul`].

use crate::decimal::Decimal;
use crate::geom::{ApproxEq, Point};
use crate::Error;

/// An axis of reflection for [`Matrix::reflection`].
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ReflectionAxis {
    /// Across the X-axis: `(x, y) → (x, −y)`.
    X,
    /// Across the Y-axis: `(x, y) → (−x, y)`.
    Y,
    /// Through the origin: `(x, y) → (−x, −y)`.
    Origin,
}

/// A dense row-major matrix of decimals.
#[derive(Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Decimal>,
}

impl Matrix {
    /// Creates an N×N identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut data = vec![Decimal::zero(); n * n];
        for i in 0..n {
            data[i * n + i] = Decimal::one();
        }

        Matrix { rows: n, cols: n, data }
    }

    /// Creates a matrix from a list of rows.
    ///
    /// All rows must have the same, non-zero length.
    pub fn from_rows(rows: Vec<Vec<Decimal>>) -> Result<Self, Error> {
        let height = rows.len();
        if height == 0 {
            return Err(Error::DimensionMismatch { expected: 1, actual: 0 });
        }

        let width = rows[0].len();
        if width == 0 {
            return Err(Error::DimensionMismatch { expected: 1, actual: 0 });
        }

        let mut data = Vec::with_capacity(height * width);
        for row in rows {
            if row.len() != width {
                return Err(Error::DimensionMismatch { expected: width, actual: row.len() });
            }
            data.extend(row);
        }

        Ok(Matrix { rows: height, cols: width, data })
    }

    /// Returns the number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns an element by position.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<&Decimal> {
        if row < self.rows && col < self.cols {
            Some(&self.data[row * self.cols + col])
        } else {
            None
        }
    }

    #[inline]
    fn at(&self, row: usize, col: usize) -> &Decimal {
        &self.data[row * self.cols + col]
    }

    #[inline]
    fn set(&mut self, row: usize, col: usize, value: Decimal) {
        let cols = self.cols;
        self.data[row * cols + col] = value;
    }

    /// Multiplies `self · other`, composing transforms right-to-left.
    pub fn mul(&self, other: &Matrix) -> Result<Matrix, Error> {
        if self.cols != other.rows {
            return Err(Error::DimensionMismatch {
                expected: self.cols,
                actual: other.rows,
            });
        }

        let mut out = Matrix {
            rows: self.rows,
            cols: other.cols,
            data: vec![Decimal::zero(); self.rows * other.cols],
        };

        for r in 0..self.rows {
            for c in 0..other.cols {
                let sum: Decimal = (0..self.cols)
                    .map(|k| self.at(r, k) * other.at(k, c))
                    .sum();
                out.set(r, c, sum);
            }
        }

        Ok(out)
    }

    /// Subtracts another matrix of the same shape.
    pub fn sub(&self, other: &Matrix) -> Result<Matrix, Error> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(Error::DimensionMismatch {
                expected: self.rows * self.cols,
                actual: other.rows * other.cols,
            });
        }

        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a - b)
            .collect();

        Ok(Matrix { rows: self.rows, cols: self.cols, data })
    }

    /// Returns the largest absolute element. Zero for an empty matrix.
    pub fn max_abs(&self) -> Decimal {
        let mut max = Decimal::zero();
        for v in &self.data {
            let a = v.abs();
            if a > max {
                max = a;
            }
        }

        max
    }

    /// Returns the determinant of a square matrix.
    ///
    /// Computed by Gaussian elimination with partial pivoting;
    /// a fully degenerate column yields an exact zero.
    pub fn determinant(&self) -> Result<Decimal, Error> {
        if self.rows != self.cols {
            return Err(Error::DimensionMismatch { expected: self.rows, actual: self.cols });
        }

        let n = self.rows;
        let mut m = self.data.clone();
        let mut det = Decimal::one();

        for col in 0..n {
            let mut pivot_row = col;
            let mut pivot_abs = m[col * n + col].abs();
            for r in (col + 1)..n {
                let a = m[r * n + col].abs();
                if a > pivot_abs {
                    pivot_abs = a;
                    pivot_row = r;
                }
            }

            if pivot_abs.is_zero() {
                return Ok(Decimal::zero());
            }

            if pivot_row != col {
                for c in 0..n {
                    m.swap(pivot_row * n + c, col * n + c);
                }
                det = -det;
            }

            let pivot = m[col * n + col].clone();
            det = det * &pivot;

            for r in (col + 1)..n {
                let factor = &m[r * n + col] / &pivot;
                for c in col..n {
                    m[r * n + c] = &m[r * n + c] - &(&factor * &m[col * n + c]);
                }
            }
        }

        Ok(det)
    }

    /// Inverts a square matrix by Gauss–Jordan elimination on `[M | I]`.
    ///
    /// Fails with [`Error::SingularMatrix`] when the largest available
    /// pivot magnitude falls below the singular threshold.
    pub fn invert(&self) -> Result<Matrix, Error> {
        if self.rows != self.cols {
            return Err(Error::DimensionMismatch { expected: self.rows, actual: self.cols });
        }

        let n = self.rows;
        let w = 2 * n;
        let threshold = Decimal::singular_threshold();

        // The augmented matrix [M | I].
        let mut aug = vec![Decimal::zero(); n * w];
        for r in 0..n {
            for c in 0..n {
                aug[r * w + c] = self.at(r, c).clone();
            }
            aug[r * w + n + r] = Decimal::one();
        }

        for col in 0..n {
            let mut pivot_row = col;
            let mut pivot_abs = aug[col * w + col].abs();
            for r in (col + 1)..n {
                let a = aug[r * w + col].abs();
                if a > pivot_abs {
                    pivot_abs = a;
                    pivot_row = r;
                }
            }

            if pivot_abs < threshold {
                return Err(Error::SingularMatrix);
            }

            if pivot_row != col {
                for c in 0..w {
                    aug.swap(pivot_row * w + c, col * w + c);
                }
            }

            let pivot = aug[col * w + col].clone();
            for c in 0..w {
                aug[col * w + c] = &aug[col * w + c] / &pivot;
            }

            for r in 0..n {
                if r == col {
                    continue;
                }

                let factor = aug[r * w + col].clone();
                if factor.is_zero() {
                    continue;
                }

                for c in 0..w {
                    aug[r * w + c] = &aug[r * w + c] - &(&factor * &aug[col * w + c]);
                }
            }
        }

        let mut data = Vec::with_capacity(n * n);
        for r in 0..n {
            for c in 0..n {
                data.push(aug[r * w + n + c].clone());
            }
        }

        Ok(Matrix { rows: n, cols: n, data })
    }

    /// Constructs a 2D translation.
    pub fn translation(tx: Decimal, ty: Decimal) -> Self {
        Matrix::from_affine(
            Decimal::one(),
            Decimal::zero(),
            Decimal::zero(),
            Decimal::one(),
            tx,
            ty,
        )
    }

    /// Constructs a 2D scale.
    pub fn scale(sx: Decimal, sy: Decimal) -> Self {
        Matrix::from_affine(
            sx,
            Decimal::zero(),
            Decimal::zero(),
            sy,
            Decimal::zero(),
            Decimal::zero(),
        )
    }

    /// Constructs a 2D rotation around the origin.
    ///
    /// The angle is in degrees, matching the SVG `rotate()` function.
    pub fn rotation(degrees: &Decimal) -> Self {
        let rad = degrees.to_radians();
        let cos = rad.cos();
        let sin = rad.sin();
        Matrix::from_affine(
            cos.clone(),
            sin.clone(),
            -sin,
            cos,
            Decimal::zero(),
            Decimal::zero(),
        )
    }

    /// Constructs a 2D rotation around a point.
    pub fn rotation_at(degrees: &Decimal, cx: Decimal, cy: Decimal) -> Self {
        let t1 = Matrix::translation(cx.clone(), cy.clone());
        let r = Matrix::rotation(degrees);
        let t2 = Matrix::translation(-cx, -cy);
        // Can't fail: all operands are 3×3.
        t1.mul(&r).unwrap().mul(&t2).unwrap()
    }

    /// Constructs a skew along the X-axis. The angle is in degrees.
    pub fn skew_x(degrees: &Decimal) -> Self {
        let rad = degrees.to_radians();
        let tan = rad.sin() / rad.cos();
        Matrix::from_affine(
            Decimal::one(),
            Decimal::zero(),
            tan,
            Decimal::one(),
            Decimal::zero(),
            Decimal::zero(),
        )
    }

    /// Constructs a skew along the Y-axis. The angle is in degrees.
    pub fn skew_y(degrees: &Decimal) -> Self {
        let rad = degrees.to_radians();
        let tan = rad.sin() / rad.cos();
        Matrix::from_affine(
            Decimal::one(),
            tan,
            Decimal::zero(),
            Decimal::one(),
            Decimal::zero(),
            Decimal::zero(),
        )
    }

    /// Constructs a reflection.
    pub fn reflection(axis: ReflectionAxis) -> Self {
        let (sx, sy) = match axis {
            ReflectionAxis::X => (Decimal::one(), -Decimal::one()),
            ReflectionAxis::Y => (-Decimal::one(), Decimal::one()),
            ReflectionAxis::Origin => (-Decimal::one(), -Decimal::one()),
        };

        Matrix::scale(sx, sy)
    }

    /// Constructs a 3×3 matrix from SVG `matrix(a, b, c, d, e, f)` parameters.
    pub fn from_affine(
        a: Decimal,
        b: Decimal,
        c: Decimal,
        d: Decimal,
        e: Decimal,
        f: Decimal,
    ) -> Self {
        Matrix {
            rows: 3,
            cols: 3,
            data: vec![
                a,
                c,
                e,
                b,
                d,
                f,
                Decimal::zero(),
                Decimal::zero(),
                Decimal::one(),
            ],
        }
    }

    /// Returns `true` for a 3×3 matrix with the bottom row `[0, 0, 1]`.
    pub fn is_affine_2d(&self) -> bool {
        self.rows == 3
            && self.cols == 3
            && self.at(2, 0).is_zero()
            && self.at(2, 1).is_zero()
            && *self.at(2, 2) == Decimal::one()
    }

    /// Returns `true` if the matrix is an identity.
    pub fn is_identity(&self) -> bool {
        if self.rows != self.cols {
            return false;
        }

        for r in 0..self.rows {
            for c in 0..self.cols {
                let expected = if r == c { Decimal::one() } else { Decimal::zero() };
                if *self.at(r, c) != expected {
                    return false;
                }
            }
        }

        true
    }

    /// Returns the determinant of the affine 2×2 part of a 3×3 matrix.
    pub fn affine_determinant(&self) -> Result<Decimal, Error> {
        if self.rows != 3 || self.cols != 3 {
            return Err(Error::DimensionMismatch { expected: 3, actual: self.rows });
        }

        Ok(self.at(0, 0) * self.at(1, 1) - self.at(0, 1) * self.at(1, 0))
    }

    /// Applies a 3×3 transform to a 2D point: `M · (x, y, 1)`
    /// projected back to 2D.
    pub fn apply(&self, p: &Point) -> Result<Point, Error> {
        if self.rows != 3 || self.cols != 3 {
            return Err(Error::DimensionMismatch { expected: 3, actual: self.rows });
        }

        let x = self.at(0, 0) * &p.x + self.at(0, 1) * &p.y + self.at(0, 2);
        let y = self.at(1, 0) * &p.x + self.at(1, 1) * &p.y + self.at(1, 2);
        let w = self.at(2, 0) * &p.x + self.at(2, 1) * &p.y + self.at(2, 2);

        if w == Decimal::one() {
            return Ok(Point::new(x, y));
        }

        Ok(Point::new(x.checked_div(&w)?, y.checked_div(&w)?))
    }

    /// Parses an SVG `transform` attribute value.
    ///
    /// Functions compose left-to-right in source order:
    /// the result is `M₁ · M₂ · … · Mₙ`.
    pub fn parse(text: &str) -> Result<Matrix, Error> {
        let mut matrix = Matrix::identity(3);
        let mut chars = text.char_indices().peekable();

        loop {
            // Skip separators.
            while let Some(&(_, c)) = chars.peek() {
                if c.is_whitespace() || c == ',' {
                    chars.next();
                } else {
                    break;
                }
            }

            let start = match chars.peek() {
                Some(&(i, c)) if c.is_ascii_alphabetic() => i,
                Some(&(i, _)) => {
                    return Err(Error::MalformedTransform(format!(
                        "unexpected character at offset {}",
                        i
                    )));
                }
                None => break,
            };

            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if c.is_ascii_alphabetic() {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let name = &text[start..end];

            while let Some(&(_, c)) = chars.peek() {
                if c.is_whitespace() {
                    chars.next();
                } else {
                    break;
                }
            }

            match chars.next() {
                Some((_, '(')) => {}
                _ => {
                    return Err(Error::MalformedTransform(format!(
                        "expected '(' after '{}'",
                        name
                    )));
                }
            }

            let mut args = Vec::new();
            let mut token = String::new();
            let mut closed = false;
            for (_, c) in &mut chars {
                match c {
                    ')' => {
                        closed = true;
                        break;
                    }
                    c if c.is_whitespace() || c == ',' => {
                        if !token.is_empty() {
                            args.push(Decimal::parse(&token).map_err(|_| {
                                Error::MalformedTransform(format!("bad number '{}'", token))
                            })?);
                            token.clear();
                        }
                    }
                    c => token.push(c),
                }
            }

            if !closed {
                return Err(Error::MalformedTransform(format!(
                    "unterminated '{}' function",
                    name
                )));
            }

            if !token.is_empty() {
                args.push(Decimal::parse(&token).map_err(|_| {
                    Error::MalformedTransform(format!("bad number '{}'", token))
                })?);
            }

            let t = Matrix::from_function(name, args)?;
            matrix = matrix.mul(&t)?;
        }

        Ok(matrix)
    }

    fn from_function(name: &str, mut args: Vec<Decimal>) -> Result<Matrix, Error> {
        let bad_arity = || {
            Error::MalformedTransform(format!("wrong number of arguments for '{}'", name))
        };

        match name {
            "translate" => match args.len() {
                1 => Ok(Matrix::translation(args.remove(0), Decimal::zero())),
                2 => {
                    let ty = args.pop().unwrap();
                    Ok(Matrix::translation(args.pop().unwrap(), ty))
                }
                _ => Err(bad_arity()),
            },
            "scale" => match args.len() {
                1 => {
                    let s = args.pop().unwrap();
                    Ok(Matrix::scale(s.clone(), s))
                }
                2 => {
                    let sy = args.pop().unwrap();
                    Ok(Matrix::scale(args.pop().unwrap(), sy))
                }
                _ => Err(bad_arity()),
            },
            "rotate" => match args.len() {
                1 => Ok(Matrix::rotation(&args[0])),
                3 => {
                    let cy = args.pop().unwrap();
                    let cx = args.pop().unwrap();
                    Ok(Matrix::rotation_at(&args[0], cx, cy))
                }
                _ => Err(bad_arity()),
            },
            "skewX" => match args.len() {
                1 => Ok(Matrix::skew_x(&args[0])),
                _ => Err(bad_arity()),
            },
            "skewY" => match args.len() {
                1 => Ok(Matrix::skew_y(&args[0])),
                _ => Err(bad_arity()),
            },
            "matrix" => {
                if args.len() != 6 {
                    return Err(bad_arity());
                }

                let f = args.pop().unwrap();
                let e = args.pop().unwrap();
                let d = args.pop().unwrap();
                let c = args.pop().unwrap();
                let b = args.pop().unwrap();
                let a = args.pop().unwrap();
                Ok(Matrix::from_affine(a, b, c, d, e, f))
            }
            _ => Err(Error::MalformedTransform(format!(
                "unknown function '{}'",
                name
            ))),
        }
    }

    /// Serializes a 3×3 affine matrix as an SVG `matrix(…)` value.
    pub fn to_svg_transform(&self, precision: i64) -> String {
        let fmt = |r: usize, c: usize| {
            self.at(r, c).rounded_to(precision).plain_string()
        };

        format!(
            "matrix({} {} {} {} {} {})",
            fmt(0, 0),
            fmt(1, 0),
            fmt(0, 1),
            fmt(1, 1),
            fmt(0, 2),
            fmt(1, 2),
        )
    }
}

impl ApproxEq for Matrix {
    fn approx_eq(&self, other: &Matrix, tolerance: &Decimal) -> bool {
        if self.rows != other.rows || self.cols != other.cols {
            return false;
        }

        self.data
            .iter()
            .zip(&other.data)
            .all(|(a, b)| a.approx_eq(b, tolerance))
    }
}

impl std::fmt::Debug for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Matrix{}x{}[", self.rows, self.cols)?;
        for r in 0..self.rows {
            if r > 0 {
                write!(f, "; ")?;
            }
            for c in 0..self.cols {
                if c > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", self.at(r, c))?;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn point(x: i64, y: i64) -> Point {
        Point::new(dec(x), dec(y))
    }

    #[test]
    fn translation_apply() {
        let m = Matrix::translation(dec(10), dec(20));
        assert_eq!(m.apply(&point(3, 4)).unwrap(), point(13, 24));
    }

    #[test]
    fn invert_round_trip() {
        let m = Matrix::parse("translate(10 20) rotate(30) scale(2 3)").unwrap();
        let inv = m.invert().unwrap();
        let residual = m.mul(&inv).unwrap().sub(&Matrix::identity(3)).unwrap();
        assert!(residual.max_abs() < Decimal::lit("1e-50"));
    }

    #[test]
    fn invert_singular() {
        let m = Matrix::scale(Decimal::zero(), dec(1));
        assert!(matches!(m.invert(), Err(Error::SingularMatrix)));
    }

    #[test]
    fn determinant_of_scale() {
        let m = Matrix::scale(dec(2), dec(3));
        assert_eq!(m.determinant().unwrap(), dec(6));
        assert_eq!(m.affine_determinant().unwrap(), dec(6));
    }

    #[test]
    fn rotation_is_orthogonal() {
        let m = Matrix::rotation(&dec(90));
        let p = m.apply(&point(1, 0)).unwrap();
        let tol = Decimal::lit("1e-50");
        assert!(p.x.approx_zero(&tol));
        assert!(p.y.approx_eq(&dec(1), &tol));
    }

    #[test]
    fn parse_composes_left_to_right() {
        // translate then scale: p → translate(scale(p))
        let m = Matrix::parse("translate(10, 0) scale(2)").unwrap();
        assert_eq!(m.apply(&point(1, 1)).unwrap(), point(12, 2));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Matrix::parse("rotate(1 2)").is_err());
        assert!(Matrix::parse("frobnicate(1)").is_err());
        assert!(Matrix::parse("scale(1").is_err());
        assert!(Matrix::parse("scale(a)").is_err());
    }

    #[test]
    fn reflection_axes() {
        let m = Matrix::reflection(ReflectionAxis::X);
        assert_eq!(m.apply(&point(2, 3)).unwrap(), point(2, -3));

        let m = Matrix::reflection(ReflectionAxis::Y);
        assert_eq!(m.apply(&point(2, 3)).unwrap(), point(-2, 3));
    }

    #[test]
    fn svg_transform_serialization() {
        let m = Matrix::translation(dec(10), dec(20));
        assert_eq!(m.to_svg_transform(6), "matrix(1 0 0 1 10 20)");
    }
}
