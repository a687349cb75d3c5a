// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Bezier curve evaluation and analysis over decimal coordinates.

use crate::decimal::Decimal;
use crate::geom::{Point, Vector};
use crate::Error;

// Below this first-derivative norm the point is treated as a cusp.
const CUSP_THRESHOLD: &str = "1e-50";

// Root isolation stops once the parameter interval is this narrow.
const ROOT_INTERVAL: &str = "1e-15";

// Maximum bisection depth for root isolation on high-degree curves.
const ROOT_MAX_DEPTH: u32 = 50;

/// A Bezier curve represented by its control polygon.
///
/// Degrees 1 (line), 2 (quadratic) and 3 (cubic) have closed-form
/// shortcuts; higher degrees are evaluated with de Casteljau only.
#[derive(Clone, PartialEq, Debug)]
pub struct Bezier {
    points: Vec<Point>,
}

impl Bezier {
    /// Creates a curve from a control polygon of at least 2 points.
    pub fn new(points: Vec<Point>) -> Result<Self, Error> {
        if points.len() < 2 {
            return Err(Error::DimensionMismatch { expected: 2, actual: points.len() });
        }

        Ok(Bezier { points })
    }

    /// Creates a line segment.
    pub fn line(p0: Point, p1: Point) -> Self {
        Bezier { points: vec![p0, p1] }
    }

    /// Creates a quadratic curve.
    pub fn quadratic(p0: Point, p1: Point, p2: Point) -> Self {
        Bezier { points: vec![p0, p1, p2] }
    }

    /// Creates a cubic curve.
    pub fn cubic(p0: Point, p1: Point, p2: Point, p3: Point) -> Self {
        Bezier { points: vec![p0, p1, p2, p3] }
    }

    /// Returns the control polygon.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Returns the curve degree.
    #[inline]
    pub fn degree(&self) -> usize {
        self.points.len() - 1
    }

    /// Returns the curve start point.
    #[inline]
    pub fn start(&self) -> &Point {
        &self.points[0]
    }

    /// Returns the curve end point.
    #[inline]
    pub fn end(&self) -> &Point {
        // Can't fail: the control polygon has at least 2 points.
        self.points.last().unwrap()
    }

    /// Evaluates the curve at `t` with de Casteljau's algorithm.
    ///
    /// Works for any degree.
    pub fn point_at(&self, t: &Decimal) -> Point {
        de_casteljau(&self.points, t)
    }

    /// Evaluates the curve at `t` with Horner's scheme on the power basis.
    ///
    /// Degrees 1–3 only; must agree with [`Bezier::point_at`] to well
    /// below the working precision.
    pub fn point_at_horner(&self, t: &Decimal) -> Result<Point, Error> {
        let coeffs = self.polynomial_coefficients()?;

        let mut x = Decimal::zero();
        let mut y = Decimal::zero();
        for c in coeffs.iter().rev() {
            x = x * t + &c.x;
            y = y * t + &c.y;
        }

        Ok(Point::new(x, y))
    }

    /// Returns the control points of the order-`k` derivative curve.
    ///
    /// The derivative of a degree-n curve is a degree-(n−k) curve whose
    /// control points are k-fold forward differences scaled by the
    /// falling factorial `n·(n−1)·…·(n−k+1)`. An order above the degree
    /// yields a single zero point.
    pub fn derivative_points(&self, order: u32) -> Vec<Point> {
        if order as usize > self.degree() {
            return vec![Point::zero()];
        }

        let mut points = self.points.clone();
        let mut n = self.degree();
        for _ in 0..order {
            let factor = Decimal::from(n);
            let mut next = Vec::with_capacity(points.len() - 1);
            for pair in points.windows(2) {
                next.push(Point::new(
                    (&pair[1].x - &pair[0].x) * &factor,
                    (&pair[1].y - &pair[0].y) * &factor,
                ));
            }
            points = next;
            n -= 1;
        }

        points
    }

    /// Evaluates the order-`k` derivative at `t`.
    pub fn derivative_at(&self, t: &Decimal, order: u32) -> Point {
        de_casteljau(&self.derivative_points(order), t)
    }

    /// Returns the unit tangent at `t`.
    ///
    /// At a cusp the first derivative vanishes; the fallback chain is
    /// the second derivative, then the start-to-end chord, then `(1, 0)`.
    pub fn tangent_at(&self, t: &Decimal) -> Vector {
        let cusp = Decimal::lit(CUSP_THRESHOLD);

        let d1 = self.derivative_at(t, 1);
        let v = Vector::vec2(d1.x, d1.y);
        if v.norm() >= cusp {
            return v.normalize();
        }

        let d2 = self.derivative_at(t, 2);
        let v = Vector::vec2(d2.x, d2.y);
        if v.norm() >= cusp {
            return v.normalize();
        }

        let chord = Vector::vec2(
            &self.end().x - &self.start().x,
            &self.end().y - &self.start().y,
        );
        if chord.norm() >= cusp {
            return chord.normalize();
        }

        Vector::vec2(Decimal::one(), Decimal::zero())
    }

    /// Returns the unit normal at `t`: the tangent rotated 90°
    /// counter-clockwise.
    pub fn normal_at(&self, t: &Decimal) -> Vector {
        // Can't fail: the tangent is always 2D.
        self.tangent_at(t).orthogonal().unwrap()
    }

    /// Returns the signed curvature at `t`:
    /// `κ = (x'y'' − y'x'') / (x'² + y'²)^(3/2)`.
    ///
    /// Returns zero at a cusp, where the curvature is undefined.
    pub fn curvature_at(&self, t: &Decimal) -> Decimal {
        let d1 = self.derivative_at(t, 1);
        let d2 = self.derivative_at(t, 2);

        let speed2 = &d1.x * &d1.x + &d1.y * &d1.y;
        // Can't fail: the sum of squares is non-negative.
        let speed = speed2.sqrt().unwrap();
        let denom = &speed2 * &speed;
        if denom < Decimal::lit(CUSP_THRESHOLD) {
            return Decimal::zero();
        }

        let num = &d1.x * &d2.y - &d1.y * &d2.x;
        num / denom
    }

    /// Returns the radius of curvature at `t`: `1 / |κ|`.
    ///
    /// `None` means the radius is infinite (a straight region).
    pub fn radius_of_curvature_at(&self, t: &Decimal) -> Option<Decimal> {
        let k = self.curvature_at(t).abs();
        if k < Decimal::singular_threshold() {
            return None;
        }

        Some(Decimal::one() / k)
    }

    /// Splits the curve at `t` into two curves sharing the split point.
    pub fn split(&self, t: &Decimal) -> (Bezier, Bezier) {
        let one_minus_t = Decimal::one() - t;

        let mut level = self.points.clone();
        let mut left = vec![level[0].clone()];
        let mut right = vec![level[level.len() - 1].clone()];

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len() - 1);
            for pair in level.windows(2) {
                next.push(Point::new(
                    &pair[0].x * &one_minus_t + &pair[1].x * t,
                    &pair[0].y * &one_minus_t + &pair[1].y * t,
                ));
            }
            left.push(next[0].clone());
            right.push(next[next.len() - 1].clone());
            level = next;
        }

        right.reverse();
        (Bezier { points: left }, Bezier { points: right })
    }

    /// Returns the sub-curve over `[t0, t1]`.
    ///
    /// Splits at `t0`, then re-splits the right piece at the rescaled
    /// parameter `(t1 − t0) / (1 − t0)`.
    pub fn crop(&self, t0: &Decimal, t1: &Decimal) -> Result<Bezier, Error> {
        let (_, right) = self.split(t0);
        let rescaled = (t1 - t0).checked_div(&(Decimal::one() - t0))?;
        Ok(right.split(&rescaled).0)
    }

    /// Returns the tight bounding box of the curve.
    ///
    /// Exact for degrees ≤ 3 via closed-form derivative roots;
    /// bisection with sign-pattern pruning above.
    pub fn bounding_box(&self) -> crate::geom::Rect {
        let mut candidates = vec![self.points[0].clone(), self.end().clone()];

        let xs: Vec<Decimal> = self.points.iter().map(|p| p.x.clone()).collect();
        let ys: Vec<Decimal> = self.points.iter().map(|p| p.y.clone()).collect();

        for axis in &[xs, ys] {
            for t in extrema_parameters(axis) {
                candidates.push(self.point_at(&t));
            }
        }

        // Can't fail: the candidate list always has the endpoints.
        crate::geom::Rect::from_points(candidates.iter()).unwrap()
    }

    /// Returns the power-basis coefficients `(c₀, c₁, …)` per axis,
    /// ascending, packed as points. Degrees 1–3 only.
    pub fn polynomial_coefficients(&self) -> Result<Vec<Point>, Error> {
        let p = &self.points;
        let two = Decimal::from(2);
        let three = Decimal::from(3);

        match self.degree() {
            1 => Ok(vec![
                p[0].clone(),
                Point::new(&p[1].x - &p[0].x, &p[1].y - &p[0].y),
            ]),
            2 => Ok(vec![
                p[0].clone(),
                Point::new(
                    (&p[1].x - &p[0].x) * &two,
                    (&p[1].y - &p[0].y) * &two,
                ),
                Point::new(
                    &p[0].x - &(&p[1].x * &two) + &p[2].x,
                    &p[0].y - &(&p[1].y * &two) + &p[2].y,
                ),
            ]),
            3 => Ok(vec![
                p[0].clone(),
                Point::new(
                    (&p[1].x - &p[0].x) * &three,
                    (&p[1].y - &p[0].y) * &three,
                ),
                Point::new(
                    (&p[2].x - &(&p[1].x * &two) + &p[0].x) * &three,
                    (&p[2].y - &(&p[1].y * &two) + &p[0].y) * &three,
                ),
                Point::new(
                    &p[3].x - &(&p[2].x * &three) + &(&p[1].x * &three) - &p[0].x,
                    &p[3].y - &(&p[2].y * &three) + &(&p[1].y * &three) - &p[0].y,
                ),
            ]),
            d => Err(Error::DimensionMismatch { expected: 3, actual: d }),
        }
    }

    /// Reconstructs a curve from power-basis coefficients.
    ///
    /// Accepts 2–4 coefficients (degrees 1–3). Inverse of
    /// [`Bezier::polynomial_coefficients`].
    pub fn from_polynomial(coeffs: &[Point]) -> Result<Bezier, Error> {
        let two = Decimal::from(2);
        let three = Decimal::from(3);

        match coeffs.len() {
            2 => {
                let p0 = coeffs[0].clone();
                let p1 = Point::new(&p0.x + &coeffs[1].x, &p0.y + &coeffs[1].y);
                Ok(Bezier::line(p0, p1))
            }
            3 => {
                let p0 = coeffs[0].clone();
                let p1 = Point::new(
                    &p0.x + &(&coeffs[1].x / &two),
                    &p0.y + &(&coeffs[1].y / &two),
                );
                let p2 = Point::new(
                    &p0.x + &coeffs[1].x + &coeffs[2].x,
                    &p0.y + &coeffs[1].y + &coeffs[2].y,
                );
                Ok(Bezier::quadratic(p0, p1, p2))
            }
            4 => {
                let p0 = coeffs[0].clone();
                let p1 = Point::new(
                    &p0.x + &(&coeffs[1].x / &three),
                    &p0.y + &(&coeffs[1].y / &three),
                );
                let p2 = Point::new(
                    &p0.x + &(&(&coeffs[1].x * &two) / &three) + &(&coeffs[2].x / &three),
                    &p0.y + &(&(&coeffs[1].y * &two) / &three) + &(&coeffs[2].y / &three),
                );
                let p3 = Point::new(
                    &p0.x + &coeffs[1].x + &coeffs[2].x + &coeffs[3].x,
                    &p0.y + &coeffs[1].y + &coeffs[2].y + &coeffs[3].y,
                );
                Ok(Bezier::cubic(p0, p1, p2, p3))
            }
            n => Err(Error::DimensionMismatch { expected: 4, actual: n }),
        }
    }

    /// Samples `n` points along the curve at `t = i/n` for `i = 1…n`.
    ///
    /// The start point is not included.
    pub fn sample(&self, n: usize) -> Vec<Point> {
        let n = n.max(1);
        let step = Decimal::one() / Decimal::from(n);

        let mut out = Vec::with_capacity(n);
        for i in 1..=n {
            let t = &step * Decimal::from(i);
            out.push(self.point_at(&t));
        }

        out
    }
}

fn de_casteljau(points: &[Point], t: &Decimal) -> Point {
    if points.len() == 1 {
        return points[0].clone();
    }

    let one_minus_t = Decimal::one() - t;
    let mut level = points.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len() - 1);
        for pair in level.windows(2) {
            next.push(Point::new(
                &pair[0].x * &one_minus_t + &pair[1].x * t,
                &pair[0].y * &one_minus_t + &pair[1].y * t,
            ));
        }
        level = next;
    }

    level.pop().unwrap()
}

fn de_casteljau_scalar(values: &[Decimal], t: &Decimal) -> Decimal {
    let one_minus_t = Decimal::one() - t;
    let mut level = values.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len() - 1);
        for pair in level.windows(2) {
            next.push(&pair[0] * &one_minus_t + &pair[1] * t);
        }
        level = next;
    }

    level.pop().unwrap_or_else(Decimal::zero)
}

// Parameters in (0, 1) where the 1D derivative of the given
// scalar Bernstein polynomial vanishes.
fn extrema_parameters(values: &[Decimal]) -> Vec<Decimal> {
    if values.len() < 2 {
        return Vec::new();
    }

    let n = Decimal::from(values.len() - 1);
    let deriv: Vec<Decimal> = values
        .windows(2)
        .map(|pair| (&pair[1] - &pair[0]) * &n)
        .collect();

    let mut roots = Vec::new();
    match deriv.len() {
        1 => {}
        2 => {
            // Linear derivative a(1−t) + b·t = 0.
            let a = &deriv[0];
            let b = &deriv[1];
            let denom = a - b;
            if !denom.is_zero() {
                push_root(&mut roots, a / denom);
            }
        }
        3 => {
            // Quadratic derivative in the power basis: At² + Bt + C.
            let two = Decimal::from(2);
            let a = &deriv[0] - &(&deriv[1] * &two) + &deriv[2];
            let b = (&deriv[1] - &deriv[0]) * &two;
            let c = deriv[0].clone();

            if a.approx_zero(&Decimal::singular_threshold()) {
                if !b.is_zero() {
                    push_root(&mut roots, -&c / &b);
                }
            } else {
                let disc = &b * &b - Decimal::from(4) * &a * &c;
                if disc.sign() >= 0 {
                    // Can't fail: the discriminant is non-negative.
                    let sq = disc.sqrt().unwrap();
                    let two_a = &a * &two;
                    push_root(&mut roots, (-&b + &sq) / &two_a);
                    push_root(&mut roots, (-&b - &sq) / &two_a);
                }
            }
        }
        _ => {
            bisect_roots(
                &deriv,
                Decimal::zero(),
                Decimal::one(),
                0,
                &mut roots,
            );
        }
    }

    roots
}

fn push_root(roots: &mut Vec<Decimal>, t: Decimal) {
    if t > Decimal::zero() && t < Decimal::one() {
        roots.push(t);
    }
}

// Bisection on the control values of a scalar Bernstein polynomial.
// An interval whose control values all share one sign is root-free.
fn bisect_roots(
    values: &[Decimal],
    lo: Decimal,
    hi: Decimal,
    depth: u32,
    roots: &mut Vec<Decimal>,
) {
    let has_positive = values.iter().any(|v| v.sign() > 0);
    let has_negative = values.iter().any(|v| v.sign() < 0);
    let has_zero = values.iter().any(|v| v.is_zero());

    // A constant-zero polynomial is extremal everywhere;
    // the endpoints already cover it.
    if !has_positive && !has_negative {
        return;
    }
    if !(has_positive && has_negative) && !has_zero {
        return;
    }

    let width = &hi - &lo;
    if width < Decimal::lit(ROOT_INTERVAL) || depth >= ROOT_MAX_DEPTH {
        let two = Decimal::from(2);
        push_root(roots, (&lo + &hi) / &two);
        return;
    }

    // Subdivide the control polygon at t = 1/2.
    let half = Decimal::one() / Decimal::from(2);
    let mut level = values.to_vec();
    let mut left = vec![level[0].clone()];
    let mut right = vec![level[level.len() - 1].clone()];
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len() - 1);
        for pair in level.windows(2) {
            next.push((&pair[0] + &pair[1]) * &half);
        }
        left.push(next[0].clone());
        right.push(next[next.len() - 1].clone());
        level = next;
    }
    right.reverse();

    let mid = (&lo + &hi) * &half;
    bisect_roots(&left, lo, mid.clone(), depth + 1, roots);
    bisect_roots(&right, mid, hi, depth + 1, roots);
}

/// An elliptical arc in SVG endpoint parameterization.
#[derive(Clone, PartialEq, Debug)]
pub struct SvgArc {
    /// Arc start point.
    pub from: Point,
    /// Arc end point.
    pub to: Point,
    /// X-axis radius.
    pub rx: Decimal,
    /// Y-axis radius.
    pub ry: Decimal,
    /// Ellipse rotation, in degrees.
    pub x_axis_rotation: Decimal,
    /// The large-arc flag.
    pub large_arc: bool,
    /// The sweep flag.
    pub sweep: bool,
}

/// An elliptical arc in center parameterization.
#[derive(Clone, PartialEq, Debug)]
pub struct CenterArc {
    /// Ellipse center.
    pub center: Point,
    /// X-axis radius, after the λ rescale.
    pub rx: Decimal,
    /// Y-axis radius, after the λ rescale.
    pub ry: Decimal,
    /// Ellipse rotation, in radians.
    pub x_rotation: Decimal,
    /// Start angle θ₁, in radians.
    pub start_angle: Decimal,
    /// Sweep Δθ, in radians. Negative for a counter-sweep.
    pub sweep_angle: Decimal,
}

impl SvgArc {
    /// Returns `true` when the arc degenerates to a line:
    /// a zero radius or coincident endpoints.
    pub fn is_degenerate(&self) -> bool {
        self.rx.is_zero() || self.ry.is_zero() || self.from == self.to
    }

    /// Converts the endpoint parameterization to the center one,
    /// following the SVG F.6.5 algorithm.
    ///
    /// Returns `None` for a degenerate arc.
    pub fn to_center(&self) -> Option<CenterArc> {
        if self.is_degenerate() {
            return None;
        }

        let two = Decimal::from(2);
        let phi = self.x_axis_rotation.to_radians();
        let cos_phi = phi.cos();
        let sin_phi = phi.sin();

        let hd_x = (&self.from.x - &self.to.x) / &two;
        let hd_y = (&self.from.y - &self.to.y) / &two;
        let hs_x = (&self.from.x + &self.to.x) / &two;
        let hs_y = (&self.from.y + &self.to.y) / &two;

        // F.6.5.1
        let x1p = &cos_phi * &hd_x + &sin_phi * &hd_y;
        let y1p = -&sin_phi * &hd_x + &cos_phi * &hd_y;

        let mut rx = self.rx.abs();
        let mut ry = self.ry.abs();

        // F.6.6: rescale radii that cannot reach the endpoint.
        let lambda = (&x1p * &x1p).checked_div(&(&rx * &rx)).ok()?
            + (&y1p * &y1p).checked_div(&(&ry * &ry)).ok()?;
        if lambda > Decimal::one() {
            // Can't fail: λ > 1 > 0.
            let s = lambda.sqrt().unwrap();
            rx = rx * &s;
            ry = ry * &s;
        }

        // F.6.5.2
        let rx2 = &rx * &rx;
        let ry2 = &ry * &ry;
        let x1p2 = &x1p * &x1p;
        let y1p2 = &y1p * &y1p;

        let denom = &rx2 * &y1p2 + &ry2 * &x1p2;
        let mut radicand = (&rx2 * &ry2 - &rx2 * &y1p2 - &ry2 * &x1p2)
            .checked_div(&denom)
            .ok()?;
        // Rounding can leave a tiny negative radicand when λ == 1.
        if radicand.sign() < 0 {
            radicand = Decimal::zero();
        }
        // Can't fail: the radicand was clamped to non-negative.
        let mut coef = radicand.sqrt().unwrap();
        if self.large_arc == self.sweep {
            coef = -coef;
        }

        let cxp = &coef * &(&rx * &y1p).checked_div(&ry).ok()?;
        let cyp = -&coef * &(&ry * &x1p).checked_div(&rx).ok()?;

        // F.6.5.3
        let cx = &cos_phi * &cxp - &sin_phi * &cyp + &hs_x;
        let cy = &sin_phi * &cxp + &cos_phi * &cyp + &hs_y;

        // F.6.5.5 and F.6.5.6
        let ux = (&x1p - &cxp).checked_div(&rx).ok()?;
        let uy = (&y1p - &cyp).checked_div(&ry).ok()?;
        let vx = (-&x1p - &cxp).checked_div(&rx).ok()?;
        let vy = (-&y1p - &cyp).checked_div(&ry).ok()?;

        let start_angle = Decimal::atan2(&uy, &ux);
        let mut sweep_angle = Decimal::atan2(&vy, &vx) - &start_angle;

        let two_pi = Decimal::pi() * &two;
        if !self.sweep && sweep_angle.sign() > 0 {
            sweep_angle = sweep_angle - &two_pi;
        } else if self.sweep && sweep_angle.sign() < 0 {
            sweep_angle = sweep_angle + &two_pi;
        }

        Some(CenterArc {
            center: Point::new(cx, cy),
            rx,
            ry,
            x_rotation: phi,
            start_angle,
            sweep_angle,
        })
    }

    /// Samples `n` points along the arc at `θ = θ₁ + (i/n)·Δθ`, `i = 1…n`.
    ///
    /// A degenerate arc reduces to a line to the endpoint.
    pub fn sample(&self, n: usize) -> Vec<Point> {
        let arc = match self.to_center() {
            Some(arc) => arc,
            None => return vec![self.to.clone()],
        };

        let n = n.max(1);
        let step = &arc.sweep_angle / Decimal::from(n);
        let mut out = Vec::with_capacity(n);
        for i in 1..=n {
            let theta = &arc.start_angle + &(&step * Decimal::from(i));
            out.push(arc.point_at_angle(&theta));
        }

        out
    }
}

impl CenterArc {
    /// Evaluates the ellipse at angle `theta`, in radians.
    pub fn point_at_angle(&self, theta: &Decimal) -> Point {
        let cos_phi = self.x_rotation.cos();
        let sin_phi = self.x_rotation.sin();
        let cos_t = theta.cos();
        let sin_t = theta.sin();

        let ax = &self.rx * &cos_t;
        let ay = &self.ry * &sin_t;

        Point::new(
            &self.center.x + &(&ax * &cos_phi) - &(&ay * &sin_phi),
            &self.center.y + &(&ax * &sin_phi) + &(&ay * &cos_phi),
        )
    }

    // The derivative of the ellipse sweep at angle `theta`.
    fn derivative_at_angle(&self, theta: &Decimal) -> (Decimal, Decimal) {
        let cos_phi = self.x_rotation.cos();
        let sin_phi = self.x_rotation.sin();
        let cos_t = theta.cos();
        let sin_t = theta.sin();

        let dx = -&self.rx * &sin_t;
        let dy = &self.ry * &cos_t;

        (
            &dx * &cos_phi - &dy * &sin_phi,
            &dx * &sin_phi + &dy * &cos_phi,
        )
    }

    /// Approximates the arc as a chain of cubic segments,
    /// each spanning at most `max_segment_angle` radians.
    ///
    /// Returns `(ctrl1, ctrl2, end)` triplets starting from the
    /// arc start point, using the analytically optimal control
    /// distance `4/3 · tan(α/4)` per segment.
    pub fn to_cubics(&self, max_segment_angle: &Decimal) -> Vec<(Point, Point, Point)> {
        let ratio = self
            .sweep_angle
            .abs()
            .checked_div(max_segment_angle)
            .unwrap_or_else(|_| Decimal::one());
        let segments = ratio.to_f64().ceil().max(1.0) as usize;

        let step = &self.sweep_angle / Decimal::from(segments);
        let four = Decimal::from(4);
        let three = Decimal::from(3);
        // 4/3 · tan(α/4)
        let quarter = &step / &four;
        let alpha = &four / &three * &(quarter.sin() / quarter.cos());

        let mut out = Vec::with_capacity(segments);
        let mut theta = self.start_angle.clone();
        for _ in 0..segments {
            let theta_next = &theta + &step;

            let p0 = self.point_at_angle(&theta);
            let p3 = self.point_at_angle(&theta_next);
            let (d0x, d0y) = self.derivative_at_angle(&theta);
            let (d3x, d3y) = self.derivative_at_angle(&theta_next);

            let p1 = Point::new(&p0.x + &(&alpha * &d0x), &p0.y + &(&alpha * &d0y));
            let p2 = Point::new(&p3.x - &(&alpha * &d3x), &p3.y - &(&alpha * &d3y));

            out.push((p1, p2, p3));
            theta = theta_next;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::ApproxEq;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn point(x: i64, y: i64) -> Point {
        Point::new(dec(x), dec(y))
    }

    fn half() -> Decimal {
        Decimal::lit("0.5")
    }

    fn sample_cubic() -> Bezier {
        Bezier::cubic(point(0, 0), point(1, 2), point(3, 2), point(4, 0))
    }

    #[test]
    fn horner_matches_de_casteljau() {
        let curve = sample_cubic();
        let tol = Decimal::lit("1e-60");
        for i in 0..=10 {
            let t = dec(i) / dec(10);
            let a = curve.point_at(&t);
            let b = curve.point_at_horner(&t).unwrap();
            assert!(a.approx_eq(&b, &tol), "mismatch at t={}", i);
        }
    }

    #[test]
    fn derivative_order_above_degree_is_zero() {
        let curve = Bezier::line(point(0, 0), point(2, 2));
        assert_eq!(curve.derivative_points(2), vec![Point::zero()]);
    }

    #[test]
    fn split_shares_the_split_point() {
        let curve = sample_cubic();
        let t = Decimal::lit("0.3");
        let (left, right) = curve.split(&t);
        let tol = Decimal::lit("1e-60");

        let at_t = curve.point_at(&t);
        assert!(left.point_at(&Decimal::one()).approx_eq(&at_t, &tol));
        assert!(right.point_at(&Decimal::zero()).approx_eq(&at_t, &tol));

        // L(s) == P(t·s)
        let s = Decimal::lit("0.5");
        let expected = curve.point_at(&(&t * &s));
        assert!(left.point_at(&s).approx_eq(&expected, &tol));

        // R(s) == P(t + s·(1−t))
        let expected = curve.point_at(&(&t + &(&s * &(Decimal::one() - &t))));
        assert!(right.point_at(&s).approx_eq(&expected, &tol));
    }

    #[test]
    fn crop_matches_split() {
        let curve = sample_cubic();
        let t0 = Decimal::lit("0.25");
        let t1 = Decimal::lit("0.75");
        let cropped = curve.crop(&t0, &t1).unwrap();

        let tol = Decimal::lit("1e-50");
        let mid = curve.point_at(&half());
        assert!(cropped.point_at(&half()).approx_eq(&mid, &tol));
        assert!(cropped.point_at(&Decimal::zero()).approx_eq(&curve.point_at(&t0), &tol));
        assert!(cropped.point_at(&Decimal::one()).approx_eq(&curve.point_at(&t1), &tol));
    }

    #[test]
    fn polynomial_round_trip() {
        let curve = sample_cubic();
        let coeffs = curve.polynomial_coefficients().unwrap();
        let back = Bezier::from_polynomial(&coeffs).unwrap();

        let tol = Decimal::lit("1e-50");
        for (a, b) in curve.points().iter().zip(back.points()) {
            assert!(a.approx_eq(b, &tol));
        }
    }

    #[test]
    fn bounding_box_contains_samples() {
        let curve = sample_cubic();
        let bbox = curve.bounding_box();
        let tol = Decimal::lit("1e-40");

        for p in curve.sample(50) {
            assert!(bbox.contains(&p, &tol), "{:?} outside {:?}", p, bbox);
        }

        // The y extremum of this symmetric cubic is at t = 0.5.
        let apex = curve.point_at(&half());
        assert!(bbox.bottom().approx_eq(&apex.y, &Decimal::lit("1e-40")));
    }

    #[test]
    fn tangent_and_normal_are_orthonormal() {
        let curve = sample_cubic();
        let t = Decimal::lit("0.4");
        let tangent = curve.tangent_at(&t);
        let normal = curve.normal_at(&t);

        let tol = Decimal::lit("1e-40");
        assert!(tangent.norm().approx_eq(&Decimal::one(), &tol));
        assert!(normal.norm().approx_eq(&Decimal::one(), &tol));
        assert!(tangent.dot(&normal).unwrap().approx_zero(&tol));
    }

    #[test]
    fn tangent_of_degenerate_curve_falls_back() {
        let curve = Bezier::line(point(1, 1), point(1, 1));
        let tangent = curve.tangent_at(&half());
        assert_eq!(tangent, Vector::vec2(Decimal::one(), Decimal::zero()));
    }

    #[test]
    fn curvature_of_line_is_zero() {
        let curve = Bezier::line(point(0, 0), point(10, 10));
        assert!(curve.curvature_at(&half()).is_zero());
        assert!(curve.radius_of_curvature_at(&half()).is_none());
    }

    #[test]
    fn arc_center_parameterization() {
        // Half of the unit circle: from (1, 0) to (−1, 0), sweeping up.
        let arc = SvgArc {
            from: point(1, 0),
            to: point(-1, 0),
            rx: dec(1),
            ry: dec(1),
            x_axis_rotation: dec(0),
            large_arc: false,
            sweep: true,
        };

        let center = arc.to_center().unwrap();
        let tol = Decimal::lit("1e-40");
        assert!(center.center.approx_eq(&point(0, 0), &tol));
        assert!(center.sweep_angle.approx_eq(&Decimal::pi(), &tol));

        // The top of the circle is on the sampled polyline.
        let samples = arc.sample(2);
        assert!(samples[0].approx_eq(&point(0, 1), &tol));
        assert!(samples[1].approx_eq(&point(-1, 0), &tol));
    }

    #[test]
    fn degenerate_arc_is_a_line() {
        let arc = SvgArc {
            from: point(0, 0),
            to: point(5, 5),
            rx: dec(0),
            ry: dec(10),
            x_axis_rotation: dec(0),
            large_arc: false,
            sweep: false,
        };

        assert!(arc.to_center().is_none());
        assert_eq!(arc.sample(8), vec![point(5, 5)]);
    }

    #[test]
    fn arc_to_cubics_stays_on_the_circle() {
        let arc = SvgArc {
            from: point(1, 0),
            to: point(-1, 0),
            rx: dec(1),
            ry: dec(1),
            x_axis_rotation: dec(0),
            large_arc: false,
            sweep: true,
        };

        let center = arc.to_center().unwrap();
        let cubics = center.to_cubics(&(Decimal::pi() / dec(2)));
        assert_eq!(cubics.len(), 2);

        // Segment endpoints are exactly on the unit circle.
        let tol = Decimal::lit("1e-40");
        for (_, _, end) in &cubics {
            let r = (&end.x * &end.x + &end.y * &end.y).sqrt().unwrap();
            assert!(r.approx_eq(&Decimal::one(), &tol));
        }

        // The interior of each cubic stays within the known
        // approximation error of a 90° Bezier arc (< 3e-4).
        let b = Bezier::cubic(
            point(1, 0),
            cubics[0].0.clone(),
            cubics[0].1.clone(),
            cubics[0].2.clone(),
        );
        let mid = b.point_at(&half());
        let r = (&mid.x * &mid.x + &mid.y * &mid.y).sqrt().unwrap();
        assert!((r - Decimal::one()).abs() < Decimal::lit("3e-4"));
    }
}
