// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Marker instantiation at path vertices.

use crate::decimal::Decimal;
use crate::matrix::Matrix;
use crate::options::Options;
use crate::path::path_vertices;
use crate::pipeline::RunReport;
use crate::tree::{parse_func_iri, Document, Node};
use crate::utils;

#[derive(Clone, Copy, PartialEq)]
enum MarkerKind {
    Start,
    Middle,
    End,
}

enum MarkerOrientation {
    Auto,
    Angle(Decimal),
}

/// The marker pipeline stage: instantiates `marker-start`, `marker-mid`
/// and `marker-end` geometry as sibling groups and strips the marker
/// attributes from their hosts.
pub(crate) fn resolve_markers(doc: &Document, _opts: &Options, report: &mut RunReport) {
    let ids = doc.ids();

    let list = [
        ("marker-start", MarkerKind::Start),
        ("marker-mid", MarkerKind::Middle),
        ("marker-end", MarkerKind::End),
    ];

    for node in doc.root().descendants() {
        if !node.is_shape_element() {
            continue;
        }

        // `marker` is the shorthand for all three positions.
        let generic = node.attribute("marker");

        let mut instantiated = false;
        for (attr, kind) in &list {
            let reference = match node.attribute(attr).or_else(|| generic.clone()) {
                Some(value) => value,
                None => continue,
            };

            let marker_id = match parse_func_iri(&reference) {
                Some(id) => id,
                None => continue,
            };

            let marker = match ids.get(&marker_id) {
                Some(m) if m.has_tag_name("marker") => m.clone(),
                _ => {
                    log::warn!(
                        "Element '{}' references missing marker '{}'.",
                        node.id().unwrap_or_else(|| node.tag_name()),
                        marker_id
                    );
                    continue;
                }
            };

            if instantiate(&node, &marker, *kind) {
                instantiated = true;
            }
        }

        if instantiated {
            for (attr, _) in &list {
                node.remove_attribute(attr);
            }
            node.remove_attribute("marker");
            report.markers_resolved += 1;
        }
    }
}

fn instantiate(node: &Node, marker: &Node, kind: MarkerKind) -> bool {
    let shape = match node.shape() {
        Some(shape) => shape,
        None => return false,
    };
    let segments = match shape.to_path(8) {
        Some(segments) => segments,
        None => return false,
    };
    let vertices = path_vertices(&segments);
    if vertices.is_empty() {
        return false;
    }

    let positions: Vec<usize> = match kind {
        MarkerKind::Start => vec![0],
        MarkerKind::End => vec![vertices.len() - 1],
        MarkerKind::Middle => {
            if vertices.len() < 3 {
                Vec::new()
            } else {
                (1..vertices.len() - 1).collect()
            }
        }
    };
    if positions.is_empty() {
        return false;
    }

    let ref_x = marker.decimal_attribute("refX", Decimal::zero());
    let ref_y = marker.decimal_attribute("refY", Decimal::zero());
    let marker_width = marker.decimal_attribute("markerWidth", Decimal::from(3));
    let marker_height = marker.decimal_attribute("markerHeight", Decimal::from(3));

    // `strokeWidth` units scale the marker by the host's stroke width.
    let stroke_scale = match marker.attribute("markerUnits").as_deref() {
        Some("userSpaceOnUse") => Decimal::one(),
        _ => node.decimal_attribute("stroke-width", Decimal::one()),
    };

    let orientation = match marker.attribute("orient").as_deref() {
        Some("auto") | Some("auto-start-reverse") => MarkerOrientation::Auto,
        Some(text) => match Decimal::parse(text) {
            Ok(angle) => MarkerOrientation::Angle(angle),
            Err(_) => MarkerOrientation::Angle(Decimal::zero()),
        },
        None => MarkerOrientation::Angle(Decimal::zero()),
    };

    let content_transform = marker
        .attribute("viewBox")
        .and_then(|v| utils::parse_view_box(&v))
        .map(|vb| utils::view_box_to_transform(&vb, &marker_width, &marker_height));

    let mut placed = false;
    let mut anchor = node.clone();

    for index in positions {
        let vertex = &vertices[index];

        let angle = match orientation {
            MarkerOrientation::Auto => vertex_angle(&vertices, index),
            MarkerOrientation::Angle(ref angle) => angle.clone(),
        };

        // translate(vertex) · rotate(angle) · scale(strokeWidth)
        // · viewBox fit · translate(−refX, −refY)
        let mut matrix = Matrix::translation(vertex.x.clone(), vertex.y.clone());
        if !angle.is_zero() {
            // Can't fail: both operands are 3×3.
            matrix = matrix.mul(&Matrix::rotation(&angle)).unwrap();
        }
        matrix = matrix
            .mul(&Matrix::scale(stroke_scale.clone(), stroke_scale.clone()))
            .unwrap();
        if let Some(content) = &content_transform {
            matrix = matrix.mul(content).unwrap();
        }
        matrix = matrix
            .mul(&Matrix::translation(-&ref_x, -&ref_y))
            .unwrap();

        let group = Node::new("g");
        group.set_attribute("transform", &matrix.to_svg_transform(50));
        for child in marker.children() {
            group.append(child.deep_copy());
        }

        if group.has_children() {
            anchor.insert_after(group.clone());
            anchor = group;
            placed = true;
        }
    }

    placed
}

// The marker angle at a vertex, in degrees: the outgoing direction at
// the start, the incoming one at the end, their bisector in between.
fn vertex_angle(vertices: &[crate::geom::Point], index: usize) -> Decimal {
    let direction = |from: usize, to: usize| -> Option<(Decimal, Decimal)> {
        let dx = &vertices[to].x - &vertices[from].x;
        let dy = &vertices[to].y - &vertices[from].y;
        if dx.is_zero() && dy.is_zero() {
            return None;
        }
        Some((dx, dy))
    };

    let incoming = if index > 0 {
        direction(index - 1, index)
    } else {
        None
    };
    let outgoing = if index + 1 < vertices.len() {
        direction(index, index + 1)
    } else {
        None
    };

    let (dx, dy) = match (incoming, outgoing) {
        (Some((ix, iy)), Some((ox, oy))) => (ix + ox, iy + oy),
        (Some(d), None) | (None, Some(d)) => d,
        (None, None) => return Decimal::zero(),
    };

    let radians = Decimal::atan2(&dy, &dx);
    radians * Decimal::from(180) / Decimal::pi()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_def(id: &str) -> Node {
        let marker = Node::new("marker");
        marker.set_attribute("id", id);
        let dot = Node::new("circle");
        dot.set_attribute("r", "1");
        marker.append(dot);
        marker
    }

    fn doc_with(children: Vec<Node>) -> Document {
        let root = Node::new("svg");
        for child in children {
            root.append(child);
        }
        Document::new(root)
    }

    #[test]
    fn start_and_end_markers() {
        let path = Node::new("path");
        path.set_attribute("d", "M0 0 L10 0 L10 10");
        path.set_attribute("marker-start", "url(#m)");
        path.set_attribute("marker-end", "url(#m)");

        let doc = doc_with(vec![marker_def("m"), path]);
        let mut report = RunReport::default();
        resolve_markers(&doc, &Options::default(), &mut report);

        assert_eq!(report.markers_resolved, 1);
        // One group per instantiated position.
        assert_eq!(doc.elements_by_tag_name("g").len(), 2);

        let path = &doc.elements_by_tag_name("path")[0];
        assert!(!path.has_attribute("marker-start"));
        assert!(!path.has_attribute("marker-end"));
    }

    #[test]
    fn mid_markers_cover_interior_vertices() {
        let path = Node::new("path");
        path.set_attribute("d", "M0 0 L10 0 L20 0 L30 0");
        path.set_attribute("marker-mid", "url(#m)");

        let doc = doc_with(vec![marker_def("m"), path]);
        let mut report = RunReport::default();
        resolve_markers(&doc, &Options::default(), &mut report);

        assert_eq!(doc.elements_by_tag_name("g").len(), 2);
    }

    #[test]
    fn missing_marker_is_ignored() {
        let path = Node::new("path");
        path.set_attribute("d", "M0 0 L10 0");
        path.set_attribute("marker-start", "url(#missing)");

        let doc = doc_with(vec![path]);
        let mut report = RunReport::default();
        resolve_markers(&doc, &Options::default(), &mut report);

        assert_eq!(report.markers_resolved, 0);
        assert!(doc.elements_by_tag_name("g").is_empty());
    }

    #[test]
    fn marker_translation_lands_on_the_vertex() {
        let marker = marker_def("m");
        let path = Node::new("path");
        path.set_attribute("d", "M5 7 L10 7");
        path.set_attribute("marker-start", "url(#m)");

        let doc = doc_with(vec![marker, path]);
        resolve_markers(&doc, &Options::default(), &mut RunReport::default());

        let group = &doc.elements_by_tag_name("g")[0];
        let transform = group.attribute("transform").unwrap();
        assert!(transform.contains("5 7"), "{}", transform);
    }
}
