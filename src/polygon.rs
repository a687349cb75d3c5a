// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Polygon geometry and boolean clipping.
//!
//! The general operator is a Greiner–Hormann-style traversal over
//! rings augmented with edge intersections. Intersections are detected
//! in edge interiors only; inputs with long collinear overlaps or
//! crossings exactly through vertices are outside its contract.
//! Fully nested or disjoint inputs short-circuit through containment
//! tests and never reach the traversal.

use crate::decimal::Decimal;
use crate::geom::{Point, Rect};
use crate::Error;

// Distance below which a point counts as lying on a boundary.
const BOUNDARY_EPS: &str = "1e-30";

/// The rule deciding what is inside a (possibly self-intersecting) ring.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FillRule {
    /// Sum of winding contributions is non-zero.
    NonZero,
    /// A ray to infinity crosses an odd number of edges.
    EvenOdd,
}

impl Default for FillRule {
    #[inline]
    fn default() -> Self {
        FillRule::NonZero
    }
}

/// A closed polygon of at least 3 points.
///
/// The closing edge from the last point to the first is implicit.
/// Consecutive duplicate points are removed at construction.
/// Self-intersection is permitted; no orientation is assumed.
#[derive(Clone, PartialEq, Debug)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Creates a new polygon.
    ///
    /// Returns `None` when fewer than 3 distinct consecutive points remain.
    pub fn new(points: Vec<Point>) -> Option<Self> {
        let mut cleaned: Vec<Point> = Vec::with_capacity(points.len());
        for p in points {
            if cleaned.last() != Some(&p) {
                cleaned.push(p);
            }
        }

        // The implicit closing edge makes an explicit one redundant.
        while cleaned.len() > 1 && cleaned.first() == cleaned.last() {
            cleaned.pop();
        }

        if cleaned.len() < 3 {
            return None;
        }

        Some(Polygon { points: cleaned })
    }

    /// Creates an axis-aligned rectangle polygon.
    pub fn from_rect(rect: &Rect) -> Option<Self> {
        Polygon::new(vec![
            Point::new(rect.x().clone(), rect.y().clone()),
            Point::new(rect.right(), rect.y().clone()),
            Point::new(rect.right(), rect.bottom()),
            Point::new(rect.x().clone(), rect.bottom()),
        ])
    }

    /// Returns the vertices.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `false`; a constructed polygon always has vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the signed area via the shoelace formula.
    ///
    /// Positive for counter-clockwise orientation in a Y-up space.
    pub fn signed_area(&self) -> Decimal {
        let mut sum = Decimal::zero();
        for (a, b) in self.edges() {
            sum = sum + (&a.x * &b.y - &b.x * &a.y);
        }

        sum / Decimal::from(2)
    }

    /// Returns the unsigned area.
    #[inline]
    pub fn area(&self) -> Decimal {
        self.signed_area().abs()
    }

    /// Returns the bounding box.
    pub fn bounding_box(&self) -> Rect {
        // Can't fail: a polygon has at least 3 points.
        Rect::from_points(self.points.iter()).unwrap()
    }

    /// Returns the area centroid.
    ///
    /// Falls back to the vertex average for a zero-area polygon.
    pub fn centroid(&self) -> Point {
        let area = self.signed_area();
        if area.approx_zero(&Decimal::singular_threshold()) {
            let n = Decimal::from(self.points.len());
            let sx: Decimal = self.points.iter().map(|p| p.x.clone()).sum();
            let sy: Decimal = self.points.iter().map(|p| p.y.clone()).sum();
            return Point::new(sx / &n, sy / &n);
        }

        let mut cx = Decimal::zero();
        let mut cy = Decimal::zero();
        for (a, b) in self.edges() {
            let cross = &a.x * &b.y - &b.x * &a.y;
            cx = cx + (&a.x + &b.x) * &cross;
            cy = cy + (&a.y + &b.y) * &cross;
        }

        let denom = Decimal::from(6) * area;
        Point::new(cx / &denom, cy / &denom)
    }

    /// Returns the polygon with reversed orientation.
    pub fn reversed(&self) -> Polygon {
        let mut points = self.points.clone();
        points.reverse();
        Polygon { points }
    }

    /// Checks convexity: every pair of consecutive edges must turn
    /// the same way (zero cross products are tolerated).
    pub fn is_convex(&self) -> bool {
        let n = self.points.len();
        let mut sign = 0;

        for i in 0..n {
            let a = &self.points[i];
            let b = &self.points[(i + 1) % n];
            let c = &self.points[(i + 2) % n];

            let cross = (&b.x - &a.x) * (&c.y - &b.y) - (&b.y - &a.y) * (&c.x - &b.x);
            let s = cross.sign();
            if s == 0 {
                continue;
            }
            if sign == 0 {
                sign = s;
            } else if s != sign {
                return false;
            }
        }

        true
    }

    /// Locates a point relative to the polygon under the given rule.
    ///
    /// Returns `+1` inside, `0` on the boundary (within tolerance),
    /// `−1` outside.
    pub fn contains_point(&self, p: &Point, rule: FillRule) -> i8 {
        let eps = Decimal::lit(BOUNDARY_EPS);

        for (a, b) in self.edges() {
            if point_on_segment(p, a, b, &eps) {
                return 0;
            }
        }

        let inside = match rule {
            FillRule::EvenOdd => self.crossings(p) % 2 == 1,
            FillRule::NonZero => self.winding(p) != 0,
        };

        if inside {
            1
        } else {
            -1
        }
    }

    // Edge crossings of a ray from `p` to +∞ in x.
    fn crossings(&self, p: &Point) -> usize {
        let mut count = 0;
        for (a, b) in self.edges() {
            let (lower, upper) = if a.y <= b.y { (a, b) } else { (b, a) };
            if p.y < lower.y || p.y >= upper.y {
                continue;
            }

            let dy = &upper.y - &lower.y;
            if dy.is_zero() {
                continue;
            }

            let t = (&p.y - &lower.y) / &dy;
            let x = &lower.x + &(&t * &(&upper.x - &lower.x));
            if x > p.x {
                count += 1;
            }
        }

        count
    }

    // Winding number around `p`.
    fn winding(&self, p: &Point) -> i64 {
        let mut wn = 0i64;
        for (a, b) in self.edges() {
            if a.y <= p.y {
                if b.y > p.y && is_left(a, b, p).sign() > 0 {
                    wn += 1;
                }
            } else if b.y <= p.y && is_left(a, b, p).sign() < 0 {
                wn -= 1;
            }
        }

        wn
    }

    fn edges(&self) -> impl Iterator<Item = (&Point, &Point)> {
        let n = self.points.len();
        (0..n).map(move |i| (&self.points[i], &self.points[(i + 1) % n]))
    }
}

fn is_left(a: &Point, b: &Point, p: &Point) -> Decimal {
    (&b.x - &a.x) * (&p.y - &a.y) - (&p.x - &a.x) * (&b.y - &a.y)
}

fn point_on_segment(p: &Point, a: &Point, b: &Point, eps: &Decimal) -> bool {
    let abx = &b.x - &a.x;
    let aby = &b.y - &a.y;
    let apx = &p.x - &a.x;
    let apy = &p.y - &a.y;

    let len2 = &abx * &abx + &aby * &aby;
    let closest = if len2.is_zero() {
        a.clone()
    } else {
        let mut t = (&apx * &abx + &apy * &aby) / &len2;
        if t.sign() < 0 {
            t = Decimal::zero();
        } else if t > Decimal::one() {
            t = Decimal::one();
        }
        Point::new(&a.x + &(&t * &abx), &a.y + &(&t * &aby))
    };

    p.distance(&closest) <= *eps
}

/// The rings produced by a boolean operation.
///
/// A difference may contain a hole ring with orientation opposite
/// to the outer ring; [`RingSet::area`] accounts for that by summing
/// signed areas.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct RingSet {
    rings: Vec<Polygon>,
}

impl RingSet {
    /// Creates an empty ring set.
    #[inline]
    pub fn empty() -> Self {
        RingSet { rings: Vec::new() }
    }

    /// Creates a ring set with a single ring.
    #[inline]
    pub fn from_ring(ring: Polygon) -> Self {
        RingSet { rings: vec![ring] }
    }

    /// Creates a ring set from a list of rings.
    #[inline]
    pub fn from_rings(rings: Vec<Polygon>) -> Self {
        RingSet { rings }
    }

    /// Returns `true` when no ring survived the operation.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Returns the rings.
    #[inline]
    pub fn rings(&self) -> &[Polygon] {
        &self.rings
    }

    /// Consumes the set, returning the rings.
    #[inline]
    pub fn into_rings(self) -> Vec<Polygon> {
        self.rings
    }

    /// Returns the total enclosed area: `|Σ signed area|`,
    /// so holes subtract from their outer ring.
    pub fn area(&self) -> Decimal {
        let sum: Decimal = self.rings.iter().map(|r| r.signed_area()).sum();
        sum.abs()
    }

    /// Collapses the set to its largest ring.
    ///
    /// When more than one ring survived, the rest are dropped
    /// and the loss is reported.
    pub fn primary(&self) -> Option<&Polygon> {
        if self.rings.len() > 1 {
            log::warn!(
                "a boolean result with {} rings was collapsed to its largest ring",
                self.rings.len()
            );
        }

        self.rings.iter().max_by(|a, b| a.area().cmp(&b.area()))
    }
}

fn degenerate(p: &Polygon) -> bool {
    p.area().approx_zero(&Decimal::singular_threshold())
}

// Locates a whole ring relative to another polygon: +1 inside,
// −1 outside, 0 undecided (every vertex on the boundary).
fn ring_position(ring: &Polygon, other: &Polygon) -> i8 {
    for p in ring.points() {
        match other.contains_point(p, FillRule::NonZero) {
            1 => return 1,
            -1 => return -1,
            _ => {}
        }
    }

    0
}

/// Returns the boolean intersection of two polygons: points in both.
///
/// Degenerate inputs produce an empty result.
pub fn intersection(a: &Polygon, b: &Polygon) -> RingSet {
    if degenerate(a) || degenerate(b) {
        return RingSet::empty();
    }

    match clip(a, b, false, false) {
        Some(rings) => rings,
        None => {
            // No crossings: one polygon contains the other, or they
            // are disjoint.
            if ring_position(a, b) >= 0 {
                RingSet::from_ring(a.clone())
            } else if ring_position(b, a) >= 0 {
                RingSet::from_ring(b.clone())
            } else {
                RingSet::empty()
            }
        }
    }
}

/// Returns the boolean union of two polygons: points in either.
pub fn union(a: &Polygon, b: &Polygon) -> RingSet {
    if degenerate(a) {
        if degenerate(b) {
            return RingSet::empty();
        }
        return RingSet::from_ring(b.clone());
    }
    if degenerate(b) {
        return RingSet::from_ring(a.clone());
    }

    match clip(a, b, true, true) {
        Some(rings) => rings,
        None => {
            if ring_position(a, b) >= 0 {
                RingSet::from_ring(b.clone())
            } else if ring_position(b, a) >= 0 {
                RingSet::from_ring(a.clone())
            } else {
                RingSet::from_rings(vec![a.clone(), b.clone()])
            }
        }
    }
}

/// Returns the boolean difference `a − b`: points in `a` and not in `b`.
///
/// A degenerate `b` returns `a` unchanged. When `b` is strictly inside
/// `a` the result is `a` plus a hole ring with opposite orientation.
pub fn difference(a: &Polygon, b: &Polygon) -> RingSet {
    if degenerate(a) {
        return RingSet::empty();
    }
    if degenerate(b) {
        return RingSet::from_ring(a.clone());
    }

    match clip(a, b, true, false) {
        Some(rings) => rings,
        None => {
            if ring_position(a, b) >= 0 {
                RingSet::empty()
            } else if ring_position(b, a) >= 0 {
                // A hole: carry `b` with the opposite orientation of `a`.
                let hole = if b.signed_area().sign() == a.signed_area().sign() {
                    b.reversed()
                } else {
                    b.clone()
                };
                RingSet::from_rings(vec![a.clone(), hole])
            } else {
                RingSet::from_ring(a.clone())
            }
        }
    }
}

// A vertex in the augmented ring lists of the clipping traversal.
struct ClipNode {
    point: Point,
    next: usize,
    prev: usize,
    // Index of the twin node in the other list.
    neighbor: usize,
    is_intersection: bool,
    // `true` when the stretch from this node to the next lies inside
    // the other polygon (possibly inverted per operation).
    entry: bool,
    visited: bool,
}

// The shared Greiner–Hormann-style traversal.
//
// Returns `None` when the polygons have no edge crossings; the caller
// falls back to containment logic.
fn clip(a: &Polygon, b: &Polygon, invert_a: bool, invert_b: bool) -> Option<RingSet> {
    let mut cuts_a: Vec<Vec<(Decimal, Point, usize)>> = vec![Vec::new(); a.len()];
    let mut cuts_b: Vec<Vec<(Decimal, Point, usize)>> = vec![Vec::new(); b.len()];
    let mut count = 0usize;

    for i in 0..a.len() {
        let a1 = &a.points()[i];
        let a2 = &a.points()[(i + 1) % a.len()];
        for j in 0..b.len() {
            let b1 = &b.points()[j];
            let b2 = &b.points()[(j + 1) % b.len()];

            if let Some((t, u, p)) = segment_intersection(a1, a2, b1, b2) {
                cuts_a[i].push((t, p.clone(), count));
                cuts_b[j].push((u, p, count));
                count += 1;
            }
        }
    }

    if count == 0 {
        return None;
    }

    let mut list_a = build_list(a, &mut cuts_a, count);
    let mut list_b = build_list(b, &mut cuts_b, count);
    link_neighbors(&mut list_a, &mut list_b, count);

    mark_entries(&mut list_a, b, invert_a);
    mark_entries(&mut list_b, a, invert_b);

    let rings = traverse(&mut list_a, &mut list_b, count);
    Some(RingSet::from_rings(rings))
}

fn segment_intersection(
    a1: &Point,
    a2: &Point,
    b1: &Point,
    b2: &Point,
) -> Option<(Decimal, Decimal, Point)> {
    let d1x = &a2.x - &a1.x;
    let d1y = &a2.y - &a1.y;
    let d2x = &b2.x - &b1.x;
    let d2y = &b2.y - &b1.y;

    let denom = &d1x * &d2y - &d1y * &d2x;
    if denom.approx_zero(&Decimal::singular_threshold()) {
        return None;
    }

    let wx = &b1.x - &a1.x;
    let wy = &b1.y - &a1.y;

    let t = (&wx * &d2y - &wy * &d2x) / &denom;
    let u = (&wx * &d1y - &wy * &d1x) / &denom;

    let eps = Decimal::lit(BOUNDARY_EPS);
    let hi = Decimal::one() - &eps;
    if t <= eps || t >= hi || u <= eps || u >= hi {
        return None;
    }

    let p = Point::new(&a1.x + &(&t * &d1x), &a1.y + &(&t * &d1y));
    Some((t, u, p))
}

// Builds a doubly-linked augmented ring: original vertices with
// intersections inserted into their edges sorted by parameter.
// `twin[id]` receives the node index of intersection `id`.
fn build_list(
    polygon: &Polygon,
    cuts: &mut [Vec<(Decimal, Point, usize)>],
    count: usize,
) -> (Vec<ClipNode>, Vec<usize>) {
    let mut nodes: Vec<ClipNode> = Vec::new();
    let mut twin = vec![usize::MAX; count];

    for (i, vertex) in polygon.points().iter().enumerate() {
        nodes.push(ClipNode {
            point: vertex.clone(),
            next: 0,
            prev: 0,
            neighbor: usize::MAX,
            is_intersection: false,
            entry: false,
            visited: false,
        });

        cuts[i].sort_by(|x, y| x.0.cmp(&y.0));
        for (_, point, id) in cuts[i].drain(..) {
            twin[id] = nodes.len();
            nodes.push(ClipNode {
                point,
                next: 0,
                prev: 0,
                neighbor: usize::MAX,
                is_intersection: true,
                entry: false,
                visited: false,
            });
        }
    }

    let n = nodes.len();
    for i in 0..n {
        nodes[i].next = (i + 1) % n;
        nodes[i].prev = (i + n - 1) % n;
    }

    (nodes, twin)
}

fn link_neighbors(
    list_a: &mut (Vec<ClipNode>, Vec<usize>),
    list_b: &mut (Vec<ClipNode>, Vec<usize>),
    count: usize,
) {
    for id in 0..count {
        let ia = list_a.1[id];
        let ib = list_b.1[id];
        list_a.0[ia].neighbor = ib;
        list_b.0[ib].neighbor = ia;
    }
}

// Sets the entry flag of every intersection node from a midpoint test
// against the other polygon, optionally inverted for union/difference.
fn mark_entries(list: &mut (Vec<ClipNode>, Vec<usize>), other: &Polygon, invert: bool) {
    let nodes = &mut list.0;
    for i in 0..nodes.len() {
        if !nodes[i].is_intersection {
            continue;
        }

        let mid = nodes[i].point.midpoint(&nodes[nodes[i].next].point);
        let inside = other.contains_point(&mid, FillRule::NonZero) >= 0;
        nodes[i].entry = inside != invert;
    }
}

fn traverse(
    list_a: &mut (Vec<ClipNode>, Vec<usize>),
    list_b: &mut (Vec<ClipNode>, Vec<usize>),
    count: usize,
) -> Vec<Polygon> {
    let mut rings = Vec::new();
    let limit = (list_a.0.len() + list_b.0.len() + count) * 4;

    for id in 0..count {
        let start = list_a.1[id];
        if list_a.0[start].visited {
            continue;
        }

        let mut ring = vec![list_a.0[start].point.clone()];
        let mut on_a = true;
        let mut index = start;
        let mut steps = 0usize;

        loop {
            let list = if on_a { &mut list_a.0 } else { &mut list_b.0 };
            list[index].visited = true;

            let forward = list[index].entry;
            loop {
                index = if forward {
                    list[index].next
                } else {
                    list[index].prev
                };
                list[index].visited = true;
                ring.push(list[index].point.clone());

                steps += 1;
                if list[index].is_intersection || steps > limit {
                    break;
                }
            }

            if steps > limit {
                log::warn!("polygon clipping did not converge; the result is partial");
                break;
            }

            // Switch to the twin node in the other polygon.
            index = list[index].neighbor;
            on_a = !on_a;

            let back_on_a = on_a && index == start;
            let back_via_twin = !on_a && list_b.0[index].neighbor == start;
            if back_on_a || back_via_twin {
                break;
            }
        }

        if let Some(polygon) = Polygon::new(ring) {
            rings.push(polygon);
        }
    }

    rings
}

/// Sutherland–Hodgman intersection for verified-convex inputs.
///
/// Both polygons must pass [`Polygon::is_convex`]; a non-convex
/// input is an error, never silently accepted. Returns `None` when
/// the polygons do not overlap.
pub fn intersect_convex(subject: &Polygon, clip: &Polygon) -> Result<Option<Polygon>, Error> {
    if !subject.is_convex() {
        return Err(Error::OutOfDomain("convex clipping"));
    }
    if !clip.is_convex() {
        return Err(Error::OutOfDomain("convex clipping"));
    }

    // Sweep with a counter-clockwise clip polygon.
    let clip = if clip.signed_area().sign() < 0 {
        clip.reversed()
    } else {
        clip.clone()
    };

    let mut output: Vec<Point> = subject.points().to_vec();

    let n = clip.len();
    for i in 0..n {
        if output.is_empty() {
            return Ok(None);
        }

        let edge_a = &clip.points()[i];
        let edge_b = &clip.points()[(i + 1) % n];

        let input = std::mem::take(&mut output);
        let m = input.len();

        for j in 0..m {
            let current = &input[j];
            let next = &input[(j + 1) % m];

            let current_in = is_left(edge_a, edge_b, current).sign() >= 0;
            let next_in = is_left(edge_a, edge_b, next).sign() >= 0;

            match (current_in, next_in) {
                (true, true) => output.push(next.clone()),
                (true, false) => {
                    if let Some(p) = line_intersection(current, next, edge_a, edge_b) {
                        output.push(p);
                    }
                }
                (false, true) => {
                    if let Some(p) = line_intersection(current, next, edge_a, edge_b) {
                        output.push(p);
                    }
                    output.push(next.clone());
                }
                (false, false) => {}
            }
        }
    }

    Ok(Polygon::new(output))
}

// Intersection of the infinite lines through two segments.
fn line_intersection(a1: &Point, a2: &Point, b1: &Point, b2: &Point) -> Option<Point> {
    let d1x = &a2.x - &a1.x;
    let d1y = &a2.y - &a1.y;
    let d2x = &b2.x - &b1.x;
    let d2y = &b2.y - &b1.y;

    let denom = &d1x * &d2y - &d1y * &d2x;
    if denom.approx_zero(&Decimal::singular_threshold()) {
        return None;
    }

    let wx = &b1.x - &a1.x;
    let wy = &b1.y - &a1.y;
    let t = (&wx * &d2y - &wy * &d2x) / &denom;

    Some(Point::new(&a1.x + &(&t * &d1x), &a1.y + &(&t * &d1y)))
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

    #[test]
    fn ctor_removes_duplicates() {
        let p = Polygon::new(vec![
            point(0, 0),
            point(0, 0),
            point(1, 0),
            point(1, 1),
            point(0, 0),
        ])
        .unwrap();
        assert_eq!(p.len(), 3);

        assert!(Polygon::new(vec![point(0, 0), point(1, 1)]).is_none());
    }

    #[test]
    fn area_and_orientation() {
        let ccw = rect(0, 0, 10, 10);
        assert_eq!(ccw.signed_area(), dec(100));
        assert_eq!(ccw.reversed().signed_area(), dec(-100));
        assert_eq!(ccw.area(), dec(100));
    }

    #[test]
    fn convexity() {
        assert!(rect(0, 0, 10, 10).is_convex());

        let concave = Polygon::new(vec![
            point(0, 0),
            point(10, 0),
            point(10, 10),
            point(5, 2),
            point(0, 10),
        ])
        .unwrap();
        assert!(!concave.is_convex());
    }

    #[test]
    fn point_location_both_rules() {
        let square = rect(0, 0, 10, 10);
        let inside = point(5, 5);
        let outside = point(15, 5);
        let boundary = point(0, 5);

        for rule in &[FillRule::NonZero, FillRule::EvenOdd] {
            assert_eq!(square.contains_point(&inside, *rule), 1);
            assert_eq!(square.contains_point(&outside, *rule), -1);
            assert_eq!(square.contains_point(&boundary, *rule), 0);
        }
    }

    #[test]
    fn self_intersecting_rules_disagree() {
        // A five-pointed star path; the pentagon core differs per rule.
        let star = Polygon::new(vec![
            point(0, 30),
            point(100, 30),
            point(20, 90),
            point(50, 0),
            point(80, 90),
        ])
        .unwrap();

        let core = point(50, 40);
        assert_eq!(star.contains_point(&core, FillRule::NonZero), 1);
        assert_eq!(star.contains_point(&core, FillRule::EvenOdd), -1);
    }

    #[test]
    fn sutherland_hodgman_clips_a_corner() {
        let subject = rect(0, 0, 10, 10);
        let clip = rect(5, 5, 10, 10);

        let result = intersect_convex(&subject, &clip).unwrap().unwrap();
        assert_eq!(result.area(), dec(25));
    }

    #[test]
    fn sutherland_hodgman_rejects_concave_input() {
        let concave = Polygon::new(vec![
            point(0, 0),
            point(10, 0),
            point(10, 10),
            point(5, 2),
            point(0, 10),
        ])
        .unwrap();
        assert!(intersect_convex(&concave, &rect(0, 0, 4, 4)).is_err());
    }

    #[test]
    fn intersection_of_overlapping_squares() {
        let a = rect(0, 0, 2, 2);
        let b = rect(1, 1, 2, 2);

        let result = intersection(&a, &b);
        assert_eq!(result.rings().len(), 1);
        assert_eq!(result.area(), dec(1));

        // Every result vertex lies inside or on both inputs.
        for p in result.rings()[0].points() {
            assert!(a.contains_point(p, FillRule::NonZero) >= 0);
            assert!(b.contains_point(p, FillRule::NonZero) >= 0);
        }
    }

    #[test]
    fn intersection_of_nested_rects() {
        let outer = rect(0, 0, 100, 100);
        let inner = rect(25, 25, 50, 50);

        let result = intersection(&outer, &inner);
        assert_eq!(result.rings().len(), 1);
        assert_eq!(result.area(), dec(2500));
    }

    #[test]
    fn intersection_of_disjoint_rects_is_empty() {
        let a = rect(0, 0, 50, 50);
        let b = rect(100, 100, 50, 50);
        assert!(intersection(&a, &b).is_empty());
    }

    #[test]
    fn union_of_overlapping_squares() {
        let a = rect(0, 0, 2, 2);
        let b = rect(1, 1, 2, 2);

        let result = union(&a, &b);
        assert_eq!(result.rings().len(), 1);
        assert_eq!(result.area(), dec(7));
    }

    #[test]
    fn union_of_disjoint_rects_keeps_both() {
        let a = rect(0, 0, 2, 2);
        let b = rect(10, 10, 2, 2);

        let result = union(&a, &b);
        assert_eq!(result.rings().len(), 2);
        assert_eq!(result.area(), dec(8));
    }

    #[test]
    fn difference_of_overlapping_squares() {
        let a = rect(0, 0, 2, 2);
        let b = rect(1, 1, 2, 2);

        let result = difference(&a, &b);
        assert_eq!(result.rings().len(), 1);
        assert_eq!(result.area(), dec(3));
    }

    #[test]
    fn difference_with_hole_conserves_area() {
        let outer = rect(0, 0, 100, 100);
        let inner = rect(25, 25, 50, 50);

        let result = difference(&outer, &inner);
        assert_eq!(result.rings().len(), 2);
        assert_eq!(result.area(), dec(7500));
    }

    #[test]
    fn difference_from_degenerate_clip_returns_input() {
        let a = rect(0, 0, 10, 10);
        let line = Polygon::new(vec![point(0, 0), point(5, 0), point(9, 0)]);
        // A zero-area "polygon" of collinear points.
        if let Some(line) = line {
            let result = difference(&a, &line);
            assert_eq!(result.area(), dec(100));
        }
    }

    #[test]
    fn intersection_area_is_bounded() {
        let a = rect(0, 0, 30, 30);
        let b = rect(10, 10, 50, 50);

        let result = intersection(&a, &b);
        assert!(result.area() <= a.area());
        assert!(result.area() <= b.area());
        assert_eq!(result.area(), dec(400));
    }

    #[test]
    fn intersection_of_convex_inputs_is_convex() {
        let a = rect(0, 0, 30, 30);
        let b = Polygon::new(vec![
            point(15, -5),
            point(45, 15),
            point(15, 35),
        ])
        .unwrap();

        let result = intersection(&a, &b);
        assert_eq!(result.rings().len(), 1);
        assert!(result.rings()[0].is_convex());
    }

    #[test]
    fn primary_collapses_to_largest_ring() {
        let set = RingSet::from_rings(vec![rect(0, 0, 1, 1), rect(5, 5, 10, 10)]);
        assert_eq!(set.primary().unwrap().area(), dec(100));
    }
}
