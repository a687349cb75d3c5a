// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::{HashMap, HashSet};

use svgflat::{
    clip_polygon_with_rule, flatten, gjk, matrix::Matrix, outside_fragments, path,
    polygon, resolve_clip_node, Decimal, Document, FillRule, Node, Options, Point, Polygon,
    ResolvedClip,
};

fn dec(v: i64) -> Decimal {
    Decimal::from(v)
}

fn point(x: i64, y: i64) -> Point {
    Point::new(dec(x), dec(y))
}

fn rect_poly(x: i64, y: i64, w: i64, h: i64) -> Polygon {
    Polygon::new(vec![
        point(x, y),
        point(x + w, y),
        point(x + w, y + h),
        point(x, y + h),
    ])
    .unwrap()
}

fn rect_node(x: &str, y: &str, w: &str, h: &str) -> Node {
    let rect = Node::new("rect");
    rect.set_attribute("x", x);
    rect.set_attribute("y", y);
    rect.set_attribute("width", w);
    rect.set_attribute("height", h);
    rect
}

fn assert_area(actual: &Decimal, expected: i64, tolerance: &str) {
    let diff = (actual - &dec(expected)).abs();
    assert!(
        diff <= Decimal::parse(tolerance).unwrap(),
        "area {} != {} (tolerance {})",
        actual,
        expected,
        tolerance
    );
}

// Scenario 1: a rect clipped by a fully interior rect.
#[test]
fn rect_clipped_by_interior_rect() {
    let target = rect_poly(0, 0, 100, 100);
    let clip = rect_poly(25, 25, 50, 50);

    let clipped = clip_polygon_with_rule(&target, &[clip], FillRule::NonZero);
    assert_area(&clipped.area(), 2500, "1e-6");

    let outside = outside_fragments(&target, &clipped);
    assert_area(&outside.area(), 7500, "1e-6");
}

// Scenario 2: target and clip do not overlap at all.
#[test]
fn disjoint_shapes_clip_to_nothing() {
    let target = rect_poly(0, 0, 50, 50);
    let clip = rect_poly(100, 100, 50, 50);

    let clipped = clip_polygon_with_rule(&target, &[clip], FillRule::NonZero);
    assert!(clipped.is_empty());

    let outside = outside_fragments(&target, &clipped);
    assert_area(&outside.area(), 2500, "1e-6");
}

// Scenario 3: objectBoundingBox clip units rescale [0,1]² to the
// target's bounding box.
#[test]
fn object_bounding_box_clip() {
    let clip_def = Node::new("clipPath");
    clip_def.set_attribute("id", "c");
    clip_def.set_attribute("clipPathUnits", "objectBoundingBox");
    clip_def.append(rect_node("0.25", "0.25", "0.5", "0.5"));

    let target = rect_poly(100, 100, 200, 200);
    let resolved = resolve_clip_node(
        &clip_def,
        &Matrix::identity(3),
        Some(&target.bounding_box()),
        &HashMap::new(),
        &Options::default(),
        &mut HashSet::new(),
    )
    .unwrap();

    let ring = match resolved {
        ResolvedClip::Ring(ring) => ring,
        r => panic!("unexpected clip result {:?}", r),
    };
    assert_area(&ring.area(), 10000, "1e-6");

    let expected = rect_poly(150, 150, 100, 100);
    for p in ring.points() {
        assert!(
            expected.contains_point(p, FillRule::NonZero) >= 0,
            "{:?} is outside the expected rect",
            p
        );
    }

    let clipped = clip_polygon_with_rule(&target, &[ring], FillRule::NonZero);
    assert_area(&clipped.area(), 10000, "1e-6");
}

// Scenario 4: GJK on overlapping and on distant unit squares.
#[test]
fn gjk_unit_squares() {
    let a = rect_poly(0, 0, 1, 1);
    let b = Polygon::new(vec![
        Point::new(Decimal::parse("0.5").unwrap(), Decimal::parse("0.5").unwrap()),
        Point::new(Decimal::parse("1.5").unwrap(), Decimal::parse("0.5").unwrap()),
        Point::new(Decimal::parse("1.5").unwrap(), Decimal::parse("1.5").unwrap()),
        Point::new(Decimal::parse("0.5").unwrap(), Decimal::parse("1.5").unwrap()),
    ])
    .unwrap();

    let result = gjk::intersects(&a, &b);
    assert!(result.intersects);
    assert!(result.verified);

    let far = rect_poly(5, 0, 1, 1);
    let result = gjk::intersects(&a, &far);
    assert!(!result.intersects);
    assert!(result.verified);

    let distance = gjk::distance(&a, &far);
    assert_area(&distance.distance, 4, "1e-6");
    assert!(distance.verified);
}

// Scenario 5: arcs keep their command letter and unambiguous flags.
#[test]
fn arc_serialization_rules() {
    let d = "M0 0 A10 10 0 0 1 20 20 A10 10 0 1 0 40 40";
    let segments = path::parse_path(d).unwrap();
    let out = path::write_path(&segments, 6);

    assert!(out.contains("A10 10 0 1 0 40 40"), "{}", out);
    assert!(!out.contains(".5.5"), "{}", out);

    // Flags are literal 0/1 in every arc parameter stream.
    for window in out.split('A').skip(1) {
        let flags: Vec<&str> = window.split_whitespace().skip(3).take(2).collect();
        for flag in flags {
            assert!(flag == "0" || flag == "1", "{}", out);
        }
    }
}

// Scenario 6: transform round-trip with a residual far below the
// working precision.
#[test]
fn transform_round_trip() {
    let m = Matrix::translation(dec(10), dec(20));
    let p = point(3, 4);

    let q = m.apply(&p).unwrap();
    assert_eq!(q, point(13, 24));

    let back = m.invert().unwrap().apply(&q).unwrap();
    let residual = back.distance(&p);
    assert!(residual <= Decimal::parse("1e-50").unwrap(), "{}", residual);
}

// Universal invariant: the intersection of convex polygons is convex
// and its area is bounded by both inputs.
#[test]
fn convex_intersection_invariants() {
    let a = rect_poly(0, 0, 40, 40);
    let b = Polygon::new(vec![point(20, -10), point(60, 20), point(20, 50)]).unwrap();

    let result = polygon::intersection(&a, &b);
    assert!(!result.is_empty());
    assert!(result.area() <= a.area());
    assert!(result.area() <= b.area());

    for ring in result.rings() {
        assert!(ring.is_convex());
        for p in ring.points() {
            assert!(a.contains_point(p, FillRule::NonZero) >= 0);
            assert!(b.contains_point(p, FillRule::NonZero) >= 0);
        }
    }
}

// A full pipeline run over a document with a clip, a use and a
// transform: every flattenable construct must be gone afterwards.
#[test]
fn full_pipeline_run() {
    let root = Node::new("svg");

    let defs = Node::new("defs");
    let clip = Node::new("clipPath");
    clip.set_attribute("id", "clip");
    clip.append(rect_node("25", "25", "50", "50"));
    defs.append(clip);
    root.append(defs);

    let target = rect_node("0", "0", "100", "100");
    target.set_attribute("id", "target");
    target.set_attribute("clip-path", "url(#clip)");
    root.append(target);

    let source = rect_node("0", "0", "5", "5");
    source.set_attribute("id", "source");
    root.append(source);

    let use_node = Node::new("use");
    use_node.set_attribute("href", "#source");
    use_node.set_attribute("x", "10");
    use_node.set_attribute("transform", "scale(2)");
    root.append(use_node);

    let mut doc = Document::new(root);
    let report = flatten(&mut doc, &Options::default());

    assert_eq!(report.use_resolved, 1);
    assert_eq!(report.clips_applied, 1);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert!(report.ledger.all_passed());

    assert!(doc.elements_by_tag_name("use").is_empty());
    for node in doc.root().descendants() {
        assert!(!node.has_attribute("transform"), "{:?}", node);
        assert!(!node.has_attribute("clip-path"), "{:?}", node);
    }

    // The clipped target is now a plain path enclosing area 2500.
    let clipped = doc
        .root()
        .descendants()
        .into_iter()
        .find(|n| n.id() == Some("target".to_string()))
        .expect("the clipped element survives under its id");
    let d = clipped.attribute("d").unwrap();
    let points = path::path_to_points(&path::parse_path(&d).unwrap(), 4);
    let polygon = Polygon::new(points).unwrap();
    assert_area(&polygon.area(), 2500, "1e-6");

    // The unreferenced clip definition was collected.
    assert!(doc.elements_by_tag_name("clippath").is_empty());
}

// The mask stage reduces mask content to clip geometry at the
// opacity threshold.
#[test]
fn mask_to_clip_reduction() {
    let root = Node::new("svg");

    let mask = Node::new("mask");
    mask.set_attribute("id", "m");
    let keep = rect_node("0", "0", "50", "100");
    keep.set_attribute("fill", "white");
    mask.append(keep);
    root.append(mask);

    let target = rect_node("0", "0", "100", "100");
    target.set_attribute("id", "target");
    target.set_attribute("mask", "url(#m)");
    root.append(target);

    let mut doc = Document::new(root);
    let report = flatten(&mut doc, &Options::default());
    assert_eq!(report.masks_resolved, 1);

    let masked = doc
        .root()
        .descendants()
        .into_iter()
        .find(|n| n.id() == Some("target".to_string()))
        .unwrap();
    assert!(!masked.has_attribute("mask"));

    let d = masked.attribute("d").unwrap();
    let points = path::path_to_points(&path::parse_path(&d).unwrap(), 4);
    let polygon = Polygon::new(points).unwrap();
    assert_area(&polygon.area(), 5000, "1e-6");
}

// Gradient baking rewrites endpoints and passes the fidelity check.
#[test]
fn gradient_transform_baking() {
    let root = Node::new("svg");

    let gradient = Node::new("linearGradient");
    gradient.set_attribute("id", "g");
    gradient.set_attribute("x1", "0");
    gradient.set_attribute("y1", "0");
    gradient.set_attribute("x2", "1");
    gradient.set_attribute("y2", "0");
    gradient.set_attribute("gradientTransform", "rotate(90)");
    root.append(gradient);

    let rect = rect_node("0", "0", "10", "10");
    rect.set_attribute("fill", "url(#g)");
    root.append(rect);

    let mut doc = Document::new(root);
    let report = flatten(&mut doc, &Options::default());

    assert_eq!(report.gradients_baked, 1);
    assert!(report.ledger.all_passed());

    let gradient = &doc.elements_by_tag_name("lineargradient")[0];
    assert!(!gradient.has_attribute("gradientTransform"));
    assert_eq!(gradient.attribute("x2"), Some("0".to_string()));
    assert_eq!(gradient.attribute("y2"), Some("1".to_string()));
}
