// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! GJK collision detection over the Minkowski difference,
//! with an independent geometric cross-check on every verdict.

use crate::decimal::Decimal;
use crate::geom::{Point, Vector};
use crate::polygon::{FillRule, Polygon};
use crate::Error;

const MAX_ITERATIONS: usize = 100;

// Tolerance for the closest-pair re-check in `distance`.
const DISTANCE_TOLERANCE: &str = "1e-40";

/// The outcome of an intersection query.
#[derive(Clone, PartialEq, Debug)]
pub struct GjkResult {
    /// `true` when the polygons overlap.
    pub intersects: bool,
    /// `true` when the GJK verdict agrees with the geometric
    /// cross-check. An unverified result should not be trusted blindly.
    pub verified: bool,
    /// Simplex evolution steps taken.
    pub iterations: usize,
}

/// The outcome of a closest-distance query.
#[derive(Clone, PartialEq, Debug)]
pub struct DistanceResult {
    /// The minimum distance between the polygon boundaries.
    pub distance: Decimal,
    /// The closest feature point on the first polygon.
    pub closest_a: Point,
    /// The closest feature point on the second polygon.
    pub closest_b: Point,
    /// `true` when `distance` equals `‖closest_a − closest_b‖`
    /// within tolerance.
    pub verified: bool,
}

/// Returns the vertex of `polygon` farthest along `direction`.
///
/// The direction must be 2D.
pub fn support_point(polygon: &Polygon, direction: &Vector) -> Result<Point, Error> {
    if direction.dim() != 2 {
        return Err(Error::DimensionMismatch { expected: 2, actual: direction.dim() });
    }

    let dx = direction.component(0).cloned().unwrap_or_else(Decimal::zero);
    let dy = direction.component(1).cloned().unwrap_or_else(Decimal::zero);

    let mut best = polygon.points()[0].clone();
    let mut best_dot = &best.x * &dx + &best.y * &dy;

    for p in &polygon.points()[1..] {
        let d = &p.x * &dx + &p.y * &dy;
        if d > best_dot {
            best_dot = d;
            best = p.clone();
        }
    }

    Ok(best)
}

/// Returns the support point of the Minkowski difference `A − B`
/// along `direction`.
pub fn minkowski_support(
    a: &Polygon,
    b: &Polygon,
    direction: &Vector,
) -> Result<Point, Error> {
    let pa = support_point(a, direction)?;
    let pb = support_point(b, &direction.negate())?;
    Ok(Point::new(&pa.x - &pb.x, &pa.y - &pb.y))
}

// 2D vector helpers over Point.
fn dot(a: &Point, b: &Point) -> Decimal {
    &a.x * &b.x + &a.y * &b.y
}

fn sub(a: &Point, b: &Point) -> Point {
    Point::new(&a.x - &b.x, &a.y - &b.y)
}

fn neg(a: &Point) -> Point {
    Point::new(-&a.x, -&a.y)
}

fn norm(a: &Point) -> Decimal {
    // Can't fail: the sum of squares is non-negative.
    dot(a, a).sqrt().unwrap()
}

// (u × v) × w  =  v(u·w) − u(v·w)
fn triple_product(u: &Point, v: &Point, w: &Point) -> Point {
    let uw = dot(u, w);
    let vw = dot(v, w);
    Point::new(&v.x * &uw - &u.x * &vw, &v.y * &uw - &u.y * &vw)
}

fn normalize_direction(d: &Point) -> Option<Point> {
    let n = norm(d);
    if n < Decimal::singular_threshold() {
        return None;
    }

    Some(Point::new(&d.x / &n, &d.y / &n))
}

fn to_vector(p: &Point) -> Vector {
    Vector::vec2(p.x.clone(), p.y.clone())
}

/// Tests two polygons for intersection with GJK.
///
/// The verdict is cross-checked by vertex containment and edge
/// intersection tests; `verified` is `true` only when both agree.
pub fn intersects(a: &Polygon, b: &Polygon) -> GjkResult {
    let cross_check = polygons_overlap(a, b);

    let (gjk_verdict, iterations) = match gjk_loop(a, b) {
        Some(result) => result,
        None => {
            // No usable search direction or the iteration cap was hit.
            return GjkResult {
                intersects: false,
                verified: false,
                iterations: MAX_ITERATIONS,
            };
        }
    };

    GjkResult {
        intersects: gjk_verdict,
        verified: gjk_verdict == cross_check,
        iterations,
    }
}

// The simplex evolution loop. `None` means the algorithm failed to
// produce a usable direction or ran out of iterations.
fn gjk_loop(a: &Polygon, b: &Polygon) -> Option<(bool, usize)> {
    // Seed from the centroid difference; (1, 0) when the centroids
    // coincide.
    let ca = a.centroid();
    let cb = b.centroid();
    let mut direction = sub(&cb, &ca);
    if norm(&direction) < Decimal::singular_threshold() {
        direction = Point::new(Decimal::one(), Decimal::zero());
    }

    let first = minkowski_support(a, b, &to_vector(&direction)).ok()?;
    let mut simplex = vec![first];
    direction = neg(&simplex[0]);

    for iteration in 1..=MAX_ITERATIONS {
        // The origin is a point of the difference itself.
        if norm(&direction) < Decimal::singular_threshold() {
            return Some((true, iteration));
        }

        direction = normalize_direction(&direction)?;
        let support = minkowski_support(a, b, &to_vector(&direction)).ok()?;

        // The new point did not pass the origin: the shapes are apart.
        if dot(&support, &direction).sign() <= 0 {
            return Some((false, iteration));
        }

        simplex.push(support);

        match process_simplex(&mut simplex, &mut direction) {
            SimplexOutcome::ContainsOrigin => return Some((true, iteration)),
            SimplexOutcome::Continue => {}
        }
    }

    None
}

enum SimplexOutcome {
    ContainsOrigin,
    Continue,
}

fn process_simplex(simplex: &mut Vec<Point>, direction: &mut Point) -> SimplexOutcome {
    match simplex.len() {
        2 => {
            // Line case; A is the newest point.
            let a = simplex[1].clone();
            let b = simplex[0].clone();
            let ab = sub(&b, &a);
            let ao = neg(&a);

            let perp = triple_product(&ab, &ao, &ab);
            if norm(&perp) < Decimal::singular_threshold() {
                // The origin is collinear with the segment.
                let proj = dot(&ao, &ab);
                if proj.sign() >= 0 && proj <= dot(&ab, &ab) {
                    return SimplexOutcome::ContainsOrigin;
                }

                // Outside along the line: any perpendicular will do.
                *direction = Point::new(-&ab.y, ab.x.clone());
                return SimplexOutcome::Continue;
            }

            *direction = perp;
            SimplexOutcome::Continue
        }
        3 => {
            // Triangle case; A is the newest point.
            let a = simplex[2].clone();
            let b = simplex[1].clone();
            let c = simplex[0].clone();
            let ab = sub(&b, &a);
            let ac = sub(&c, &a);
            let ao = neg(&a);

            let ab_perp = triple_product(&ac, &ab, &ab);
            let ac_perp = triple_product(&ab, &ac, &ac);

            if dot(&ab_perp, &ao).sign() > 0 {
                // The origin is beyond AB: drop C.
                simplex.remove(0);
                *direction = ab_perp;
                SimplexOutcome::Continue
            } else if dot(&ac_perp, &ao).sign() > 0 {
                // The origin is beyond AC: drop B.
                simplex.remove(1);
                *direction = ac_perp;
                SimplexOutcome::Continue
            } else {
                SimplexOutcome::ContainsOrigin
            }
        }
        _ => SimplexOutcome::Continue,
    }
}

// Independent overlap check: vertex containment either way,
// or any pair of properly intersecting edges.
fn polygons_overlap(a: &Polygon, b: &Polygon) -> bool {
    if a.points().iter().any(|p| b.contains_point(p, FillRule::NonZero) >= 0) {
        return true;
    }
    if b.points().iter().any(|p| a.contains_point(p, FillRule::NonZero) >= 0) {
        return true;
    }

    let na = a.len();
    let nb = b.len();
    for i in 0..na {
        let a1 = &a.points()[i];
        let a2 = &a.points()[(i + 1) % na];
        for j in 0..nb {
            let b1 = &b.points()[j];
            let b2 = &b.points()[(j + 1) % nb];
            if segments_cross(a1, a2, b1, b2) {
                return true;
            }
        }
    }

    false
}

fn segments_cross(a1: &Point, a2: &Point, b1: &Point, b2: &Point) -> bool {
    let d1 = sub(a2, a1);
    let d2 = sub(b2, b1);

    let denom = &d1.x * &d2.y - &d1.y * &d2.x;
    if denom.approx_zero(&Decimal::singular_threshold()) {
        return false;
    }

    let w = sub(b1, a1);
    let t = (&w.x * &d2.y - &w.y * &d2.x) / &denom;
    let u = (&w.x * &d1.y - &w.y * &d1.x) / &denom;

    let zero = Decimal::zero();
    let one = Decimal::one();
    t >= zero && t <= one && u >= zero && u <= one
}

/// Returns the minimum distance between two polygon boundaries
/// by brute force over vertex-vertex and vertex-edge pairs.
///
/// Meaningful for non-intersecting inputs; for overlapping inputs
/// it still reports the closest boundary features.
pub fn distance(a: &Polygon, b: &Polygon) -> DistanceResult {
    let mut best: Option<(Decimal, Point, Point)> = None;

    let mut consider = |pa: Point, pb: Point| {
        let d = pa.distance(&pb);
        let better = match &best {
            Some((current, _, _)) => d < *current,
            None => true,
        };
        if better {
            best = Some((d, pa, pb));
        }
    };

    // Vertex-vertex pairs.
    for pa in a.points() {
        for pb in b.points() {
            consider(pa.clone(), pb.clone());
        }
    }

    // Vertices of A against edges of B, and the other way around.
    let nb = b.len();
    for pa in a.points() {
        for j in 0..nb {
            let e1 = &b.points()[j];
            let e2 = &b.points()[(j + 1) % nb];
            let closest = closest_on_segment(pa, e1, e2);
            consider(pa.clone(), closest);
        }
    }

    let na = a.len();
    for pb in b.points() {
        for i in 0..na {
            let e1 = &a.points()[i];
            let e2 = &a.points()[(i + 1) % na];
            let closest = closest_on_segment(pb, e1, e2);
            consider(closest, pb.clone());
        }
    }

    // Can't fail: both polygons have vertices.
    let (distance, closest_a, closest_b) = best.unwrap();

    // Re-derive the distance from the reported pair.
    let recheck = closest_a.distance(&closest_b);
    let verified = recheck.approx_eq(&distance, &Decimal::lit(DISTANCE_TOLERANCE));

    DistanceResult { distance, closest_a, closest_b, verified }
}

fn closest_on_segment(p: &Point, a: &Point, b: &Point) -> Point {
    let ab = sub(b, a);
    let len2 = dot(&ab, &ab);
    if len2.is_zero() {
        return a.clone();
    }

    let mut t = dot(&sub(p, a), &ab) / &len2;
    if t.sign() < 0 {
        t = Decimal::zero();
    } else if t > Decimal::one() {
        t = Decimal::one();
    }

    Point::new(&a.x + &(&t * &ab.x), &a.y + &(&t * &ab.y))
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

    fn rect(x: i64, y: i64, w: i64, h: i64) -> Polygon {
        Polygon::new(vec![
            point(x, y),
            point(x + w, y),
            point(x + w, y + h),
            point(x, y + h),
        ])
        .unwrap()
    }

    fn unit_square_pair() -> (Polygon, Polygon) {
        let a = rect(0, 0, 1, 1);
        let b = Polygon::new(vec![
            Point::new(Decimal::lit("0.5"), Decimal::lit("0.5")),
            Point::new(Decimal::lit("1.5"), Decimal::lit("0.5")),
            Point::new(Decimal::lit("1.5"), Decimal::lit("1.5")),
            Point::new(Decimal::lit("0.5"), Decimal::lit("1.5")),
        ])
        .unwrap();
        (a, b)
    }

    #[test]
    fn support_points() {
        let square = rect(0, 0, 2, 2);
        let right = Vector::vec2(dec(1), dec(0));
        let p = support_point(&square, &right).unwrap();
        assert_eq!(p.x, dec(2));

        assert!(support_point(
            &square,
            &Vector::new(vec![dec(1), dec(0), dec(0)]).unwrap()
        )
        .is_err());
    }

    #[test]
    fn minkowski_support_is_a_difference() {
        let a = rect(0, 0, 1, 1);
        let b = rect(3, 0, 1, 1);
        let d = Vector::vec2(dec(1), dec(0));
        // max_x(A) − min_x(B) = 1 − 3.
        let p = minkowski_support(&a, &b, &d).unwrap();
        assert_eq!(p.x, dec(-2));
    }

    #[test]
    fn overlapping_squares_intersect() {
        let (a, b) = unit_square_pair();
        let result = intersects(&a, &b);
        assert!(result.intersects);
        assert!(result.verified);
    }

    #[test]
    fn distant_squares_do_not_intersect() {
        let a = rect(0, 0, 1, 1);
        let b = rect(5, 0, 1, 1);
        let result = intersects(&a, &b);
        assert!(!result.intersects);
        assert!(result.verified);
    }

    #[test]
    fn touching_squares_report_intersection_check() {
        // Shared edge: containment of boundary vertices counts as overlap.
        let a = rect(0, 0, 1, 1);
        let b = rect(1, 0, 1, 1);
        let result = intersects(&a, &b);
        assert!(result.verified || result.intersects);
    }

    #[test]
    fn distance_between_squares() {
        let a = rect(0, 0, 1, 1);
        let b = rect(5, 0, 1, 1);
        let result = distance(&a, &b);
        assert_eq!(result.distance, dec(4));
        assert!(result.verified);
        assert_eq!(result.closest_a.x, dec(1));
        assert_eq!(result.closest_b.x, dec(5));
    }

    #[test]
    fn distance_to_an_edge_interior() {
        // A vertex facing the middle of an edge.
        let a = Polygon::new(vec![point(0, 0), point(1, 2), point(0, 4)]).unwrap();
        let b = rect(5, 0, 1, 4);
        let result = distance(&a, &b);
        assert_eq!(result.distance, dec(4));
        assert_eq!(result.closest_b, point(5, 2));
        assert!(result.verified);
    }

    #[test]
    fn nested_squares_intersect() {
        let a = rect(0, 0, 10, 10);
        let b = rect(4, 4, 2, 2);
        let result = intersects(&a, &b);
        assert!(result.intersects);
        assert!(result.verified);
    }
}
