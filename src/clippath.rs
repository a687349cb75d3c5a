// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! ClipPath resolution: converting `clipPath` definitions into clip
//! polygons and applying them as boolean intersections.

use std::collections::{HashMap, HashSet};

use crate::geom::Rect;
use crate::matrix::Matrix;
use crate::options::Options;
use crate::path::path_to_points;
use crate::pipeline::RunReport;
use crate::polygon::{self, FillRule, Polygon, RingSet};
use crate::tree::{parse_func_iri, Document, Node, Units};
use crate::verify::{self, CheckKind};
use crate::Error;

/// A clip-path definition.
///
/// `clipPath` element in SVG.
#[derive(Clone, Debug)]
pub struct ClipPath {
    /// Element's ID.
    ///
    /// Taken from the SVG itself.
    pub id: String,

    /// Coordinate system units.
    ///
    /// `clipPathUnits` in SVG.
    pub units: Units,

    /// Clip path transform.
    ///
    /// `transform` in SVG.
    pub transform: Matrix,

    /// Additional clip path.
    ///
    /// `clip-path` in SVG.
    pub clip_path: Option<String>,
}

impl ClipPath {
    /// Reads a definition from a `clipPath` element.
    ///
    /// Returns `None` for other elements or an invalid transform.
    pub fn from_node(node: &Node) -> Option<Self> {
        // A `clip-path` attribute must reference a `clipPath` element.
        if !node.has_tag_name("clippath") {
            return None;
        }

        let transform = match node.parse_transform() {
            Ok(m) => m,
            Err(_) => {
                log::warn!(
                    "ClipPath '{}' has an invalid transform. Skipped.",
                    node.id().unwrap_or_default()
                );
                return None;
            }
        };

        let units = node
            .attribute("clipPathUnits")
            .and_then(|v| Units::from_str(&v))
            .unwrap_or_default();

        let clip_path = node
            .attribute("clip-path")
            .and_then(|v| parse_func_iri(&v));

        Some(ClipPath {
            id: node.id().unwrap_or_default(),
            units,
            transform,
            clip_path,
        })
    }
}

/// The geometry a clip-path resolves to.
#[derive(Clone, PartialEq, Debug)]
pub enum ResolvedClip {
    /// Nothing survives the clip.
    Empty,
    /// A single clip ring.
    Ring(Polygon),
    /// Several disjoint clip rings.
    Rings(Vec<Polygon>),
}

impl ResolvedClip {
    /// Returns the rings as a list.
    pub fn into_rings(self) -> Vec<Polygon> {
        match self {
            ResolvedClip::Empty => Vec::new(),
            ResolvedClip::Ring(ring) => vec![ring],
            ResolvedClip::Rings(rings) => rings,
        }
    }

    fn from_rings(mut rings: Vec<Polygon>) -> Self {
        match rings.len() {
            0 => ResolvedClip::Empty,
            1 => ResolvedClip::Ring(rings.pop().unwrap()),
            _ => ResolvedClip::Rings(rings),
        }
    }
}

/// Resolves a `clipPath` element into clip rings in target space.
///
/// The coordinate system starts from `ctm`, composed with the clip
/// path's own transform, and, under `objectBoundingBox` units, with
/// `translate(bbox.x, bbox.y) · scale(bbox.width, bbox.height)`.
/// Children are sampled, transformed and folded under union; a nested
/// `clip-path` reference is resolved recursively and intersected.
/// Reference cycles are reported and cut.
pub fn resolve_clip_node(
    node: &Node,
    ctm: &Matrix,
    bbox: Option<&Rect>,
    ids: &HashMap<String, Node>,
    opts: &Options,
    visited: &mut HashSet<String>,
) -> Result<ResolvedClip, Error> {
    let clip = match ClipPath::from_node(node) {
        Some(clip) => clip,
        None => return Ok(ResolvedClip::Empty),
    };

    if !clip.id.is_empty() && !visited.insert(clip.id.clone()) {
        log::warn!("Cyclic clip-path reference to '{}' was ignored.", clip.id);
        return Ok(ResolvedClip::Empty);
    }

    let mut matrix = ctm.mul(&clip.transform)?;
    if clip.units == Units::ObjectBoundingBox {
        let bbox = match bbox {
            Some(b) => b,
            None => {
                log::warn!(
                    "ClipPath '{}' uses objectBoundingBox without a target box. Skipped.",
                    clip.id
                );
                return Ok(ResolvedClip::Empty);
            }
        };

        let to_bbox = Matrix::translation(bbox.x().clone(), bbox.y().clone())
            .mul(&Matrix::scale(bbox.width().clone(), bbox.height().clone()))?;
        matrix = matrix.mul(&to_bbox)?;
    }

    // Fold the children under union. A single child short-circuits.
    let mut rings: Vec<Polygon> = Vec::new();
    for child in node.children() {
        let shape = match child.shape() {
            Some(shape) => shape,
            None => continue,
        };

        let segments = match shape.to_path(opts.bezier_arcs) {
            Some(segments) => segments,
            None => {
                log::warn!(
                    "ClipPath '{}' has a child with invalid geometry. Skipped.",
                    clip.id
                );
                continue;
            }
        };

        let child_matrix = match child.parse_transform() {
            Ok(m) => matrix.mul(&m)?,
            Err(_) => {
                log::warn!(
                    "ClipPath '{}' has a child with an invalid transform. Skipped.",
                    clip.id
                );
                continue;
            }
        };

        let mut points = Vec::new();
        for p in path_to_points(&segments, opts.clip_segments) {
            points.push(child_matrix.apply(&p)?);
        }

        if let Some(polygon) = Polygon::new(points) {
            add_to_union(&mut rings, polygon);
        }
    }

    // A nested clip-path intersects the result.
    if let Some(linked_id) = &clip.clip_path {
        match ids.get(linked_id) {
            Some(linked) => {
                let nested =
                    resolve_clip_node(linked, ctm, bbox, ids, opts, visited)?.into_rings();
                rings = intersect_ring_lists(&rings, &nested);
            }
            None => {
                log::warn!(
                    "ClipPath '{}' links to missing clip-path '{}'. The link is ignored.",
                    clip.id,
                    linked_id
                );
            }
        }
    }

    Ok(ResolvedClip::from_rings(rings))
}

// Folds a polygon into a list of disjoint union rings.
pub(crate) fn add_to_union(rings: &mut Vec<Polygon>, polygon: Polygon) {
    let mut current = polygon;

    loop {
        let mut merged = false;
        for i in 0..rings.len() {
            let result = polygon::union(&rings[i], &current);
            if result.rings().len() == 1 {
                // Can't fail: exactly one ring.
                current = result.into_rings().pop().unwrap();
                rings.remove(i);
                merged = true;
                break;
            }
        }

        if !merged {
            break;
        }
    }

    rings.push(current);
}

fn intersect_ring_lists(a: &[Polygon], b: &[Polygon]) -> Vec<Polygon> {
    let mut out = Vec::new();
    for ra in a {
        for rb in b {
            out.extend(polygon::intersection(ra, rb).into_rings());
        }
    }

    out
}

/// Intersects an element polygon with clip rings under `clip-rule`.
///
/// Under `evenodd`, each intersection ring is retained only if its
/// centroid lies inside the originating clip ring under the even-odd
/// rule; this is how self-intersecting clip paths produce holes.
/// Pathological C-shaped clips can misclassify; their behavior is
/// undefined.
pub fn clip_polygon_with_rule(
    element: &Polygon,
    clip_rings: &[Polygon],
    rule: FillRule,
) -> RingSet {
    let mut out = Vec::new();

    for ring in clip_rings {
        let result = polygon::intersection(element, ring);
        match rule {
            FillRule::NonZero => out.extend(result.into_rings()),
            FillRule::EvenOdd => {
                for r in result.into_rings() {
                    let centroid = r.centroid();
                    if ring.contains_point(&centroid, FillRule::EvenOdd) >= 0 {
                        out.push(r);
                    }
                }
            }
        }
    }

    RingSet::from_rings(out)
}

/// Computes the outside fragments `original − clipped` for the
/// end-to-end area-conservation audit.
pub fn outside_fragments(element: &Polygon, clipped: &RingSet) -> RingSet {
    let mut fragments = vec![element.clone()];

    for ring in clipped.rings() {
        let mut next = Vec::new();
        for fragment in &fragments {
            next.extend(polygon::difference(fragment, ring).into_rings());
        }
        fragments = next;
    }

    RingSet::from_rings(fragments)
}

// Geometry attributes that become meaningless once an element is
// rewritten as a path.
const GEOMETRY_ATTRIBUTES: &[&str] = &[
    "x", "y", "width", "height", "rx", "ry", "cx", "cy", "r", "x1", "y1", "x2", "y2",
    "points", "d",
];

// Rewrites `node` as a sibling `path` with the given data, carrying
// over the presentation attributes, and removes the original.
pub(crate) fn replace_with_path(node: &Node, d: &str) -> Node {
    let path = Node::new("path");
    for name in node.attribute_names() {
        if GEOMETRY_ATTRIBUTES.contains(&name.as_str()) {
            continue;
        }
        if let Some(value) = node.attribute(&name) {
            path.set_attribute(&name, &value);
        }
    }
    path.set_attribute("d", d);

    node.insert_after(path.clone());
    node.detach();
    path
}

pub(crate) fn rings_to_path_data(rings: &[Polygon], precision: i64) -> String {
    use crate::path::{write_path, PathSegment};

    let mut segments = Vec::new();
    for ring in rings {
        for (i, p) in ring.points().iter().enumerate() {
            if i == 0 {
                segments.push(PathSegment::MoveTo {
                    abs: true,
                    x: p.x.clone(),
                    y: p.y.clone(),
                });
            } else {
                segments.push(PathSegment::LineTo {
                    abs: true,
                    x: p.x.clone(),
                    y: p.y.clone(),
                });
            }
        }
        segments.push(PathSegment::ClosePath { abs: true });
    }

    write_path(&segments, precision)
}

// Samples an element's geometry into a polygon in its local space.
pub(crate) fn element_polygon(node: &Node, samples: usize, arcs: usize) -> Option<Polygon> {
    let shape = node.shape()?;
    let segments = shape.to_path(arcs)?;
    Polygon::new(path_to_points(&segments, samples))
}

/// The clip-path pipeline stage: applies every `clip-path` reference
/// as a boolean intersection and records verification results.
pub(crate) fn resolve_clip_paths(doc: &Document, opts: &Options, report: &mut RunReport) {
    let ids = doc.ids();

    for node in doc.root().descendants() {
        // Skip clip-path definitions themselves.
        if node.has_tag_name("clippath")
            || node
                .parent()
                .map(|p| p.has_tag_name("clippath"))
                .unwrap_or(false)
        {
            continue;
        }

        let clip_attr = match node.attribute("clip-path") {
            Some(value) => value,
            None => continue,
        };

        let entity = node.id().unwrap_or_else(|| node.tag_name());

        // Push a group's clip down to its shape descendants.
        if !node.is_shape_element() {
            for descendant in node.descendants() {
                if descendant.is_shape_element() && !descendant.has_attribute("clip-path") {
                    descendant.set_attribute("clip-path", &clip_attr);
                }
            }
            node.remove_attribute("clip-path");
            continue;
        }

        let clip_id = match parse_func_iri(&clip_attr) {
            Some(id) => id,
            None => {
                log::warn!("Element '{}' has an unparsable clip-path value.", entity);
                node.remove_attribute("clip-path");
                continue;
            }
        };

        let def = match ids.get(&clip_id) {
            Some(def) => def.clone(),
            None => {
                log::warn!(
                    "Element '{}' references missing clip-path '{}'.",
                    entity,
                    clip_id
                );
                node.remove_attribute("clip-path");
                continue;
            }
        };

        let element_poly = match element_polygon(&node, opts.clip_segments, opts.bezier_arcs)
        {
            Some(polygon) => polygon,
            None => {
                log::warn!("Element '{}' has no clippable geometry. Skipped.", entity);
                node.remove_attribute("clip-path");
                continue;
            }
        };
        let bbox = element_poly.bounding_box();

        let mut visited = HashSet::new();
        let resolved = match resolve_clip_node(
            &def,
            &Matrix::identity(3),
            Some(&bbox),
            &ids,
            opts,
            &mut visited,
        ) {
            Ok(resolved) => resolved,
            Err(e) => {
                report
                    .errors
                    .push(format!("clipPath '{}' failed for '{}': {}", clip_id, entity, e));
                continue;
            }
        };
        let clip_rings = resolved.into_rings();

        let rule = node
            .attribute("clip-rule")
            .or_else(|| def.attribute("clip-rule"))
            .and_then(|v| match v.as_str() {
                "evenodd" => Some(FillRule::EvenOdd),
                "nonzero" => Some(FillRule::NonZero),
                _ => None,
            })
            .unwrap_or(opts.clip_rule);

        let clipped = clip_polygon_with_rule(&element_poly, &clip_rings, rule);
        let outside = outside_fragments(&element_poly, &clipped);

        // (i) intersection validity against the primary clip ring.
        if let Some(primary) = RingSet::from_rings(clip_rings.clone()).primary() {
            report.ledger.record(
                "clipPath",
                &entity,
                CheckKind::PolygonIntersection,
                verify::polygon_intersection(&element_poly, primary, &clipped),
            );
        }

        // (ii) end-to-end area conservation.
        report.ledger.record(
            "clipPath",
            &entity,
            CheckKind::ClipAreaConservation,
            verify::clip_area_conservation(
                &element_poly.area(),
                &clipped.area(),
                &outside.area(),
                &opts.e2e_tolerance,
            ),
        );

        // Keep the invisible outside fragments for external re-audit.
        if !outside.is_empty() {
            let ghost = Node::new("path");
            ghost.set_attribute("d", &rings_to_path_data(outside.rings(), opts.precision));
            ghost.set_attribute("visibility", "hidden");
            ghost.set_attribute("fill", "none");
            node.insert_after(ghost);
        }

        if clipped.is_empty() {
            // Everything was clipped away.
            node.detach();
        } else {
            let d = rings_to_path_data(clipped.rings(), opts.precision);
            let path = replace_with_path(&node, &d);
            path.remove_attribute("clip-path");
            path.remove_attribute("clip-rule");
        }

        report.clips_applied += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;
    use crate::geom::Point;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn rect_poly(x: i64, y: i64, w: i64, h: i64) -> Polygon {
        Polygon::new(vec![
            Point::new(dec(x), dec(y)),
            Point::new(dec(x + w), dec(y)),
            Point::new(dec(x + w), dec(y + h)),
            Point::new(dec(x), dec(y + h)),
        ])
        .unwrap()
    }

    fn clip_def(id: &str) -> Node {
        let clip = Node::new("clipPath");
        clip.set_attribute("id", id);
        clip
    }

    fn rect_node(x: &str, y: &str, w: &str, h: &str) -> Node {
        let rect = Node::new("rect");
        rect.set_attribute("x", x);
        rect.set_attribute("y", y);
        rect.set_attribute("width", w);
        rect.set_attribute("height", h);
        rect
    }

    #[test]
    fn resolve_single_rect_child() {
        let clip = clip_def("c");
        clip.append(rect_node("25", "25", "50", "50"));

        let resolved = resolve_clip_node(
            &clip,
            &Matrix::identity(3),
            None,
            &HashMap::new(),
            &Options::default(),
            &mut HashSet::new(),
        )
        .unwrap();

        match resolved {
            ResolvedClip::Ring(ring) => assert_eq!(ring.area(), dec(2500)),
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn object_bounding_box_units() {
        let clip = clip_def("c");
        clip.set_attribute("clipPathUnits", "objectBoundingBox");
        clip.append(rect_node("0.25", "0.25", "0.5", "0.5"));

        let bbox = Rect::new(dec(100), dec(100), dec(200), dec(200)).unwrap();
        let resolved = resolve_clip_node(
            &clip,
            &Matrix::identity(3),
            Some(&bbox),
            &HashMap::new(),
            &Options::default(),
            &mut HashSet::new(),
        )
        .unwrap();

        match resolved {
            ResolvedClip::Ring(ring) => {
                assert_eq!(ring.area(), dec(10000));
                let expected = rect_poly(150, 150, 100, 100);
                for p in ring.points() {
                    assert!(expected.contains_point(p, FillRule::NonZero) >= 0, "{:?}", p);
                }
            }
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn disjoint_children_stay_separate_rings() {
        let clip = clip_def("c");
        clip.append(rect_node("0", "0", "10", "10"));
        clip.append(rect_node("50", "50", "10", "10"));

        let resolved = resolve_clip_node(
            &clip,
            &Matrix::identity(3),
            None,
            &HashMap::new(),
            &Options::default(),
            &mut HashSet::new(),
        )
        .unwrap();

        assert!(matches!(resolved, ResolvedClip::Rings(ref r) if r.len() == 2));
    }

    #[test]
    fn cyclic_reference_is_cut() {
        let clip = clip_def("self");
        clip.set_attribute("clip-path", "url(#self)");
        clip.append(rect_node("0", "0", "10", "10"));

        let mut ids = HashMap::new();
        ids.insert("self".to_string(), clip.clone());

        let resolved = resolve_clip_node(
            &clip,
            &Matrix::identity(3),
            None,
            &ids,
            &Options::default(),
            &mut HashSet::new(),
        )
        .unwrap();

        // The cycle is cut; the clip's own geometry survives.
        assert!(matches!(resolved, ResolvedClip::Ring(_)));
    }

    #[test]
    fn clip_with_rule_nonzero() {
        let element = rect_poly(0, 0, 100, 100);
        let clip = rect_poly(25, 25, 50, 50);

        let clipped = clip_polygon_with_rule(&element, &[clip], FillRule::NonZero);
        assert_eq!(clipped.area(), dec(2500));

        let outside = outside_fragments(&element, &clipped);
        assert_eq!(outside.area(), dec(7500));
    }

    #[test]
    fn disjoint_clip_produces_empty_result() {
        let element = rect_poly(0, 0, 50, 50);
        let clip = rect_poly(100, 100, 50, 50);

        let clipped = clip_polygon_with_rule(&element, &[clip], FillRule::NonZero);
        assert!(clipped.is_empty());

        let outside = outside_fragments(&element, &clipped);
        assert_eq!(outside.area(), dec(2500));
    }
}
