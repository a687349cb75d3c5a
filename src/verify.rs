// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Numerical verification checks and the append-only ledger
//! the pipeline records them in.
//!
//! Every non-trivial transformation in the pipeline is paired with one
//! of these checks so that precision loss becomes an observable event
//! instead of silent corruption.

use crate::bezier::Bezier;
use crate::decimal::Decimal;
use crate::geom::Point;
use crate::matrix::Matrix;
use crate::polygon::{FillRule, Polygon, RingSet};

/// The kind of a verification check.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum CheckKind {
    /// `‖M⁻¹·M·p − p‖ ≤ tol`.
    TransformRoundTrip,
    /// `max|(M·M⁻¹ − I)ᵢⱼ| ≤ tol`.
    MatrixInversion,
    /// Intersection area bound and vertex containment.
    PolygonIntersection,
    /// `|area(original) − area(clipped) − area(outside)| ≤ tol`.
    ClipAreaConservation,
    /// Rewritten gradient endpoints equal the transformed originals.
    GradientTransform,
    /// A lossy path rewrite reproduced the original within tolerance.
    PathRewrite,
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match *self {
            CheckKind::TransformRoundTrip => "transform-round-trip",
            CheckKind::MatrixInversion => "matrix-inversion",
            CheckKind::PolygonIntersection => "polygon-intersection",
            CheckKind::ClipAreaConservation => "clip-area-conservation",
            CheckKind::GradientTransform => "gradient-transform",
            CheckKind::PathRewrite => "path-rewrite",
        };
        write!(f, "{}", name)
    }
}

/// The outcome of a single check.
#[derive(Clone, PartialEq, Debug)]
pub struct Check {
    /// Whether the check passed.
    pub valid: bool,
    /// The measured error.
    pub error: Decimal,
}

impl Check {
    fn from_error(error: Decimal, tolerance: &Decimal) -> Self {
        Check { valid: error <= *tolerance, error }
    }

    fn failed() -> Self {
        Check { valid: false, error: Decimal::zero() }
    }
}

/// One entry of the verification ledger.
#[derive(Clone, PartialEq, Debug)]
pub struct VerificationRecord {
    /// The pipeline stage that performed the check.
    pub stage: String,
    /// The element id or tag name the check applies to.
    pub entity: String,
    /// What was checked.
    pub kind: CheckKind,
    /// The measured error.
    pub error: Decimal,
    /// Whether the check passed.
    pub valid: bool,
}

/// An append-only sequence of verification records.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    records: Vec<VerificationRecord>,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Ledger::default()
    }

    /// Appends a check outcome.
    pub fn record(&mut self, stage: &str, entity: &str, kind: CheckKind, check: Check) {
        if !check.valid {
            log::warn!(
                "verification '{}' failed for '{}' in stage '{}' (error {})",
                kind,
                entity,
                stage,
                check.error
            );
        }

        self.records.push(VerificationRecord {
            stage: stage.to_string(),
            entity: entity.to_string(),
            kind,
            error: check.error,
            valid: check.valid,
        });
    }

    /// Returns all records.
    pub fn records(&self) -> &[VerificationRecord] {
        &self.records
    }

    /// Returns the number of passed checks.
    pub fn passed(&self) -> usize {
        self.records.iter().filter(|r| r.valid).count()
    }

    /// Returns the number of failed checks.
    pub fn failed(&self) -> usize {
        self.records.iter().filter(|r| !r.valid).count()
    }

    /// Returns `true` when every recorded check passed.
    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

/// Checks `M⁻¹·(M·p) == p` within `tolerance`.
///
/// A singular matrix fails the check outright.
pub fn transform_round_trip(m: &Matrix, p: &Point, tolerance: &Decimal) -> Check {
    let inverse = match m.invert() {
        Ok(inv) => inv,
        Err(_) => return Check::failed(),
    };

    let forward = match m.apply(p) {
        Ok(q) => q,
        Err(_) => return Check::failed(),
    };
    let back = match inverse.apply(&forward) {
        Ok(q) => q,
        Err(_) => return Check::failed(),
    };

    Check::from_error(p.distance(&back), tolerance)
}

/// Checks `max|(M·M⁻¹ − I)ᵢⱼ| ≤ tolerance`.
pub fn matrix_inversion(m: &Matrix, tolerance: &Decimal) -> Check {
    let inverse = match m.invert() {
        Ok(inv) => inv,
        Err(_) => return Check::failed(),
    };

    // Can't fail: the shapes match by construction.
    let product = m.mul(&inverse).unwrap();
    let residual = product.sub(&Matrix::identity(m.rows())).unwrap();
    Check::from_error(residual.max_abs(), tolerance)
}

/// Checks an intersection result against its inputs:
/// the area must not exceed either input, and every result vertex
/// must lie inside or on both inputs under the winding rule.
pub fn polygon_intersection(a: &Polygon, b: &Polygon, result: &RingSet) -> Check {
    let bound = std::cmp::min(a.area(), b.area());
    let area = result.area();

    let excess = &area - &bound;
    if excess > Decimal::lit("1e-20") {
        return Check { valid: false, error: excess };
    }

    for ring in result.rings() {
        for p in ring.points() {
            if a.contains_point(p, FillRule::NonZero) < 0
                || b.contains_point(p, FillRule::NonZero) < 0
            {
                return Check { valid: false, error: Decimal::zero() };
            }
        }
    }

    Check {
        valid: true,
        error: if excess.sign() > 0 { excess } else { Decimal::zero() },
    }
}

/// Checks end-to-end area conservation of a clip:
/// `|area(original) − area(clipped) − area(outside)| ≤ tolerance`.
pub fn clip_area_conservation(
    original: &Decimal,
    clipped: &Decimal,
    outside: &Decimal,
    tolerance: &Decimal,
) -> Check {
    let error = (original - clipped - outside).abs();
    Check::from_error(error, tolerance)
}

/// Checks that rewritten gradient endpoints equal `M·original`
/// within `tolerance`.
pub fn gradient_endpoints(
    m: &Matrix,
    originals: &[Point],
    rewritten: &[Point],
    tolerance: &Decimal,
) -> Check {
    if originals.len() != rewritten.len() {
        return Check::failed();
    }

    let mut max = Decimal::zero();
    for (original, new) in originals.iter().zip(rewritten) {
        let expected = match m.apply(original) {
            Ok(p) => p,
            Err(_) => return Check::failed(),
        };
        let d = expected.distance(new);
        if d > max {
            max = d;
        }
    }

    Check::from_error(max, tolerance)
}

/// Checks a split reconstruction: the pieces must share the split point
/// and reproduce the original curve at sampled parameters.
pub fn bezier_split(curve: &Bezier, t: &Decimal, tolerance: &Decimal) -> Check {
    let (left, right) = curve.split(t);
    let at_t = curve.point_at(t);

    let mut max = left.point_at(&Decimal::one()).distance(&at_t);
    let d = right.point_at(&Decimal::zero()).distance(&at_t);
    if d > max {
        max = d;
    }

    let samples = 8usize;
    let step = Decimal::one() / Decimal::from(samples);
    for i in 0..=samples {
        let s = &step * Decimal::from(i);

        let expected = curve.point_at(&(t * &s));
        let d = left.point_at(&s).distance(&expected);
        if d > max {
            max = d;
        }

        let expected = curve.point_at(&(t + &(&s * &(Decimal::one() - t))));
        let d = right.point_at(&s).distance(&expected);
        if d > max {
            max = d;
        }
    }

    Check::from_error(max, tolerance)
}

/// Checks the polynomial ↔ control-point round-trip of a curve
/// of degree ≤ 3.
pub fn bezier_polynomial_round_trip(curve: &Bezier, tolerance: &Decimal) -> Check {
    let coeffs = match curve.polynomial_coefficients() {
        Ok(c) => c,
        Err(_) => return Check::failed(),
    };
    let back = match Bezier::from_polynomial(&coeffs) {
        Ok(b) => b,
        Err(_) => return Check::failed(),
    };

    let mut max = Decimal::zero();
    for (a, b) in curve.points().iter().zip(back.points()) {
        let d = a.distance(b);
        if d > max {
            max = d;
        }
    }

    Check::from_error(max, tolerance)
}

/// Checks that the tangent and normal at `t` are unit length,
/// orthogonal, and that the tangent aligns with the derivative.
pub fn bezier_frame(curve: &Bezier, t: &Decimal, tolerance: &Decimal) -> Check {
    let tangent = curve.tangent_at(t);
    let normal = curve.normal_at(t);

    let one = Decimal::one();
    let mut max = (tangent.norm() - &one).abs();

    let d = (normal.norm() - &one).abs();
    if d > max {
        max = d;
    }

    // Can't fail: both vectors are 2D.
    let d = tangent.dot(&normal).unwrap().abs();
    if d > max {
        max = d;
    }

    // The tangent must point along the derivative, not against it.
    let d1 = curve.derivative_at(t, 1);
    let d1v = crate::geom::Vector::vec2(d1.x, d1.y);
    if d1v.norm() > Decimal::singular_threshold()
        && tangent.dot(&d1v).unwrap().sign() < 0
    {
        return Check { valid: false, error: max };
    }

    Check::from_error(max, tolerance)
}

/// Cross-checks the analytic curvature at `t` against the
/// finite-difference angle change over arc length.
pub fn bezier_curvature(curve: &Bezier, t: &Decimal, tolerance: &Decimal) -> Check {
    let h = Decimal::lit("1e-6");

    let t0 = t - &h;
    let t1 = t + &h;
    if t0.sign() < 0 || t1 > Decimal::one() {
        return Check::failed();
    }

    let tan0 = curve.tangent_at(&t0);
    let tan1 = curve.tangent_at(&t1);
    let angle = match tan0.angle_between(&tan1) {
        Ok(a) => a,
        Err(_) => return Check::failed(),
    };

    // Arc length over [t−h, t+h], approximated by the speed at t.
    let d1 = curve.derivative_at(t, 1);
    // Can't fail: the sum of squares is non-negative.
    let speed = (&d1.x * &d1.x + &d1.y * &d1.y).sqrt().unwrap();
    let arc = speed * Decimal::from(2) * &h;
    if arc < Decimal::singular_threshold() {
        return Check::failed();
    }

    let estimate = angle / arc;
    let actual = curve.curvature_at(t).abs();
    Check::from_error((estimate - actual).abs(), tolerance)
}

/// Checks that the bounding box contains sampled curve points and that
/// each of its four edges is achieved by some sample.
pub fn bezier_bounding_box(curve: &Bezier, samples: usize) -> Check {
    let bbox = curve.bounding_box();
    let tol = Decimal::lit("1e-30");

    let mut points = vec![curve.point_at(&Decimal::zero())];
    points.extend(curve.sample(samples.max(8)));

    for p in &points {
        if !bbox.contains(p, &tol) {
            let dx = std::cmp::max(bbox.x() - &p.x, &p.x - &bbox.right());
            let dy = std::cmp::max(bbox.y() - &p.y, &p.y - &bbox.bottom());
            return Check { valid: false, error: std::cmp::max(dx, dy) };
        }
    }

    // Extrema must be achieved; sampling is coarse, so allow slack
    // proportional to the box size.
    let slack = std::cmp::max(bbox.width().clone(), bbox.height().clone())
        / Decimal::from(10);
    let achieved = |edge: &Decimal, pick: &dyn Fn(&Point) -> Decimal| {
        points.iter().any(|p| (pick(p) - edge).abs() <= slack)
    };

    let ok = achieved(bbox.x(), &|p: &Point| p.x.clone())
        && achieved(&bbox.right(), &|p: &Point| p.x.clone())
        && achieved(bbox.y(), &|p: &Point| p.y.clone())
        && achieved(&bbox.bottom(), &|p: &Point| p.y.clone());

    Check { valid: ok, error: Decimal::zero() }
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
    fn round_trip_translate() {
        let m = Matrix::translation(dec(10), dec(20));
        let check = transform_round_trip(&m, &point(3, 4), &Decimal::lit("1e-50"));
        assert!(check.valid);
    }

    #[test]
    fn round_trip_singular_fails() {
        let m = Matrix::scale(Decimal::zero(), dec(1));
        let check = transform_round_trip(&m, &point(3, 4), &Decimal::lit("1e-50"));
        assert!(!check.valid);
    }

    #[test]
    fn inversion_residual() {
        let m = Matrix::parse("rotate(37) scale(3 0.5) translate(-4 9)").unwrap();
        let check = matrix_inversion(&m, &Decimal::lit("1e-50"));
        assert!(check.valid);
    }

    #[test]
    fn intersection_check_accepts_valid_result() {
        let a = Polygon::new(vec![point(0, 0), point(10, 0), point(10, 10), point(0, 10)])
            .unwrap();
        let b = Polygon::new(vec![point(5, 5), point(15, 5), point(15, 15), point(5, 15)])
            .unwrap();
        let result = crate::polygon::intersection(&a, &b);
        assert!(polygon_intersection(&a, &b, &result).valid);
    }

    #[test]
    fn area_conservation() {
        let check = clip_area_conservation(
            &dec(10000),
            &dec(2500),
            &dec(7500),
            &Decimal::lit("1e-10"),
        );
        assert!(check.valid);

        let check = clip_area_conservation(
            &dec(10000),
            &dec(2500),
            &dec(7000),
            &Decimal::lit("1e-10"),
        );
        assert!(!check.valid);
        assert_eq!(check.error, dec(500));
    }

    #[test]
    fn bezier_checks_pass_for_a_plain_cubic() {
        let curve = Bezier::cubic(point(0, 0), point(1, 2), point(3, 2), point(4, 0));
        let t = Decimal::lit("0.3");

        assert!(bezier_split(&curve, &t, &Decimal::lit("1e-50")).valid);
        assert!(bezier_polynomial_round_trip(&curve, &Decimal::lit("1e-50")).valid);
        assert!(bezier_frame(&curve, &t, &Decimal::lit("1e-40")).valid);
        assert!(bezier_bounding_box(&curve, 32).valid);

        // Finite differences carry O(h²) error.
        assert!(bezier_curvature(&curve, &t, &Decimal::lit("1e-6")).valid);
    }

    #[test]
    fn ledger_aggregates() {
        let mut ledger = Ledger::new();
        ledger.record(
            "clip",
            "rect1",
            CheckKind::ClipAreaConservation,
            Check { valid: true, error: Decimal::zero() },
        );
        ledger.record(
            "clip",
            "rect2",
            CheckKind::ClipAreaConservation,
            Check { valid: false, error: dec(1) },
        );

        assert_eq!(ledger.passed(), 1);
        assert_eq!(ledger.failed(), 1);
        assert!(!ledger.all_passed());
    }
}
