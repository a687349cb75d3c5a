// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Paint servers: pattern tiling and gradient-transform baking.

use crate::clippath::element_polygon;
use crate::decimal::Decimal;
use crate::geom::{Point, Rect};
use crate::matrix::Matrix;
use crate::options::Options;
use crate::path::format_number;
use crate::pipeline::RunReport;
use crate::tree::{parse_func_iri, Document, Node, Units};
use crate::utils;
use crate::verify::{self, CheckKind};

// Hard cap on instantiated pattern tiles; exceeding it is reported.
const MAX_TILES: usize = 4096;

/// The pattern pipeline stage: tiles referenced patterns over their
/// hosts' bounding boxes and sets the hosts' fill to `none`.
pub(crate) fn resolve_patterns(doc: &Document, opts: &Options, report: &mut RunReport) {
    let ids = doc.ids();

    for node in doc.root().descendants() {
        if !node.is_shape_element() {
            continue;
        }

        let fill = match node.attribute("fill") {
            Some(fill) => fill,
            None => continue,
        };
        let pattern_id = match parse_func_iri(&fill) {
            Some(id) => id,
            None => continue,
        };

        let entity = node.id().unwrap_or_else(|| node.tag_name());

        let pattern = match ids.get(&pattern_id) {
            Some(def) if def.has_tag_name("pattern") => def.clone(),
            Some(_) => continue, // a gradient reference; not ours
            None => {
                log::warn!(
                    "Element '{}' references missing paint server '{}'.",
                    entity,
                    pattern_id
                );
                node.set_attribute("fill", "none");
                continue;
            }
        };

        let host_poly =
            match element_polygon(&node, opts.curve_segments, opts.bezier_arcs) {
                Some(polygon) => polygon,
                None => continue,
            };
        let bbox = host_poly.bounding_box();

        match tile_pattern(&pattern, &bbox, opts) {
            Some(tiled) => {
                node.insert_after(tiled);
                node.set_attribute("fill", "none");
                report.patterns_resolved += 1;
            }
            None => {
                log::warn!("Pattern '{}' has an invalid tile. Ignored.", pattern_id);
                node.set_attribute("fill", "none");
            }
        }
    }
}

// Builds the group of tile instances covering `bbox`.
fn tile_pattern(pattern: &Node, bbox: &Rect, opts: &Options) -> Option<Node> {
    let pattern_units = pattern
        .attribute("patternUnits")
        .and_then(|v| Units::from_str(&v))
        .unwrap_or(Units::ObjectBoundingBox);
    let content_units = pattern
        .attribute("patternContentUnits")
        .and_then(|v| Units::from_str(&v))
        .unwrap_or(Units::UserSpaceOnUse);

    let zero = Decimal::zero;
    let raw_x = pattern.decimal_attribute("x", zero());
    let raw_y = pattern.decimal_attribute("y", zero());
    let raw_w = pattern.decimal_attribute("width", zero());
    let raw_h = pattern.decimal_attribute("height", zero());

    let (tile_x, tile_y, tile_w, tile_h) = match pattern_units {
        Units::UserSpaceOnUse => (raw_x, raw_y, raw_w, raw_h),
        Units::ObjectBoundingBox => (
            bbox.x() + &(&raw_x * bbox.width()),
            bbox.y() + &(&raw_y * bbox.height()),
            &raw_w * bbox.width(),
            &raw_h * bbox.height(),
        ),
    };

    if tile_w.sign() <= 0 || tile_h.sign() <= 0 {
        return None;
    }

    let pattern_transform = match pattern.attribute("patternTransform") {
        Some(value) => Matrix::parse(&value).ok()?,
        None => Matrix::identity(3),
    };

    // Content space: a viewBox maps into the tile with xMidYMid meet
    // semantics (the only supported mode); objectBoundingBox content
    // scales by the host box instead.
    let content_transform = if let Some(vb) = pattern
        .attribute("viewBox")
        .and_then(|v| utils::parse_view_box(&v))
    {
        if let Some(aspect) = pattern.attribute("preserveAspectRatio") {
            if aspect != "xMidYMid meet" && aspect != "xMidYMid" {
                log::warn!(
                    "Pattern '{}': preserveAspectRatio '{}' is not supported; \
                     using xMidYMid meet.",
                    pattern.id().unwrap_or_default(),
                    aspect
                );
            }
        }
        utils::view_box_to_transform(&vb, &tile_w, &tile_h)
    } else if content_units == Units::ObjectBoundingBox {
        Matrix::scale(bbox.width().clone(), bbox.height().clone())
    } else {
        Matrix::identity(3)
    };

    // Tile index ranges covering the host box.
    let span = |from: &Decimal, size: &Decimal, origin: &Decimal, step: &Decimal| {
        let lo = ((from - origin) / step).to_f64().floor() as i64;
        let hi = ((&(from + size) - origin) / step).to_f64().ceil() as i64;
        (lo, hi)
    };
    let (i0, i1) = span(bbox.x(), bbox.width(), &tile_x, &tile_w);
    let (j0, j1) = span(bbox.y(), bbox.height(), &tile_y, &tile_h);

    let tiles = ((i1 - i0).max(0) as usize).saturating_mul((j1 - j0).max(0) as usize);
    if tiles > MAX_TILES {
        log::warn!(
            "Pattern '{}' would need {} tiles; capped at {}.",
            pattern.id().unwrap_or_default(),
            tiles,
            MAX_TILES
        );
    }

    let group = Node::new("g");
    let mut placed = 0usize;

    'tiles: for j in j0..j1 {
        for i in i0..i1 {
            if placed >= MAX_TILES {
                break 'tiles;
            }

            let offset = Matrix::translation(
                &tile_x + &(&tile_w * Decimal::from(i)),
                &tile_y + &(&tile_h * Decimal::from(j)),
            );
            // Can't fail: all operands are 3×3.
            let matrix = pattern_transform
                .mul(&offset)
                .unwrap()
                .mul(&content_transform)
                .unwrap();

            let tile = Node::new("g");
            if !matrix.is_identity() {
                tile.set_attribute("transform", &matrix.to_svg_transform(50));
            }
            for child in pattern.children() {
                tile.append(child.deep_copy());
            }

            if tile.has_children() {
                group.append(tile);
                placed += 1;
            }
        }
    }

    if placed == 0 {
        return None;
    }

    Some(group)
}

/// The gradient pipeline stage: applies `gradientTransform` to the
/// gradient geometry attributes and strips it, recording a fidelity
/// check per gradient.
pub(crate) fn bake_gradient_transforms(
    doc: &Document,
    opts: &Options,
    report: &mut RunReport,
) {
    bake_linear_gradients(doc, opts, report);
    bake_radial_gradients(doc, opts, report);
}

fn bake_linear_gradients(doc: &Document, opts: &Options, report: &mut RunReport) {
    for node in doc.elements_by_tag_name("lineargradient") {
        let transform = match node.attribute("gradientTransform") {
            Some(value) => value,
            None => continue,
        };

        let entity = node.id().unwrap_or_else(|| "linearGradient".to_string());
        let matrix = match Matrix::parse(&transform) {
            Ok(m) => m,
            Err(e) => {
                report.errors.push(format!(
                    "linearGradient '{}' has an invalid gradientTransform: {}",
                    entity, e
                ));
                continue;
            }
        };

        // SVG defaults: the gradient vector spans the unit box.
        let p1 = Point::new(
            node.decimal_attribute("x1", Decimal::zero()),
            node.decimal_attribute("y1", Decimal::zero()),
        );
        let p2 = Point::new(
            node.decimal_attribute("x2", Decimal::one()),
            node.decimal_attribute("y2", Decimal::zero()),
        );

        let (q1, q2) = match (matrix.apply(&p1), matrix.apply(&p2)) {
            (Ok(q1), Ok(q2)) => (q1, q2),
            _ => {
                report.errors.push(format!(
                    "linearGradient '{}': transform application failed",
                    entity
                ));
                continue;
            }
        };

        node.set_attribute("x1", &format_number(&q1.x, opts.precision));
        node.set_attribute("y1", &format_number(&q1.y, opts.precision));
        node.set_attribute("x2", &format_number(&q2.x, opts.precision));
        node.set_attribute("y2", &format_number(&q2.y, opts.precision));
        node.remove_attribute("gradientTransform");

        // Fidelity: the rewritten endpoints must equal M applied to the
        // originals, up to the output precision.
        let rewritten = vec![
            Point::new(
                node.decimal_attribute("x1", Decimal::zero()),
                node.decimal_attribute("y1", Decimal::zero()),
            ),
            Point::new(
                node.decimal_attribute("x2", Decimal::zero()),
                node.decimal_attribute("y2", Decimal::zero()),
            ),
        ];
        let tolerance = precision_tolerance(opts.precision);
        report.ledger.record(
            "gradientTransform",
            &entity,
            CheckKind::GradientTransform,
            verify::gradient_endpoints(&matrix, &[p1, p2], &rewritten, &tolerance),
        );

        report.gradients_baked += 1;
    }
}

fn bake_radial_gradients(doc: &Document, opts: &Options, report: &mut RunReport) {
    for node in doc.elements_by_tag_name("radialgradient") {
        let transform = match node.attribute("gradientTransform") {
            Some(value) => value,
            None => continue,
        };

        let entity = node.id().unwrap_or_else(|| "radialGradient".to_string());
        let matrix = match Matrix::parse(&transform) {
            Ok(m) => m,
            Err(e) => {
                report.errors.push(format!(
                    "radialGradient '{}' has an invalid gradientTransform: {}",
                    entity, e
                ));
                continue;
            }
        };

        let half = Decimal::lit("0.5");
        let cx = node.decimal_attribute("cx", half.clone());
        let cy = node.decimal_attribute("cy", half.clone());
        let r = node.decimal_attribute("r", half.clone());
        let fx = node.decimal_attribute("fx", cx.clone());
        let fy = node.decimal_attribute("fy", cy.clone());

        let center = Point::new(cx, cy);
        let focal = Point::new(fx, fy);

        let (new_center, new_focal) = match (matrix.apply(&center), matrix.apply(&focal)) {
            (Ok(c), Ok(f)) => (c, f),
            _ => {
                report.errors.push(format!(
                    "radialGradient '{}': transform application failed",
                    entity
                ));
                continue;
            }
        };

        // The radius scales by √|det| of the affine 2×2 part.
        let det = match matrix.affine_determinant() {
            Ok(det) => det,
            Err(e) => {
                report
                    .errors
                    .push(format!("radialGradient '{}': {}", entity, e));
                continue;
            }
        };
        // Can't fail: |det| is non-negative.
        let new_r = r * det.abs().sqrt().unwrap();

        node.set_attribute("cx", &format_number(&new_center.x, opts.precision));
        node.set_attribute("cy", &format_number(&new_center.y, opts.precision));
        node.set_attribute("fx", &format_number(&new_focal.x, opts.precision));
        node.set_attribute("fy", &format_number(&new_focal.y, opts.precision));
        node.set_attribute("r", &format_number(&new_r, opts.precision));
        node.remove_attribute("gradientTransform");

        let rewritten = vec![
            Point::new(
                node.decimal_attribute("cx", Decimal::zero()),
                node.decimal_attribute("cy", Decimal::zero()),
            ),
            Point::new(
                node.decimal_attribute("fx", Decimal::zero()),
                node.decimal_attribute("fy", Decimal::zero()),
            ),
        ];
        let tolerance = precision_tolerance(opts.precision);
        report.ledger.record(
            "gradientTransform",
            &entity,
            CheckKind::GradientTransform,
            verify::gradient_endpoints(&matrix, &[center, focal], &rewritten, &tolerance),
        );

        report.gradients_baked += 1;
    }
}

// The worst-case rounding error of attribute formatting:
// half a unit in the last written decimal place.
fn precision_tolerance(precision: i64) -> Decimal {
    // Can't fail: the literal is well-formed.
    Decimal::parse(&format!("1e-{}", precision.max(0))).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(children: Vec<Node>) -> Document {
        let root = Node::new("svg");
        for child in children {
            root.append(child);
        }
        Document::new(root)
    }

    #[test]
    fn linear_gradient_baking() {
        let gradient = Node::new("linearGradient");
        gradient.set_attribute("id", "g");
        gradient.set_attribute("x1", "0");
        gradient.set_attribute("y1", "0");
        gradient.set_attribute("x2", "10");
        gradient.set_attribute("y2", "0");
        gradient.set_attribute("gradientTransform", "translate(5 5)");

        let doc = doc_with(vec![gradient]);
        let mut report = RunReport::default();
        bake_gradient_transforms(&doc, &Options::default(), &mut report);

        assert_eq!(report.gradients_baked, 1);
        assert!(report.ledger.all_passed());

        let gradient = &doc.elements_by_tag_name("lineargradient")[0];
        assert!(!gradient.has_attribute("gradientTransform"));
        assert_eq!(gradient.attribute("x1"), Some("5".to_string()));
        assert_eq!(gradient.attribute("x2"), Some("15".to_string()));
        assert_eq!(gradient.attribute("y2"), Some("5".to_string()));
    }

    #[test]
    fn radial_gradient_radius_scaling() {
        let gradient = Node::new("radialGradient");
        gradient.set_attribute("id", "g");
        gradient.set_attribute("cx", "10");
        gradient.set_attribute("cy", "10");
        gradient.set_attribute("r", "5");
        gradient.set_attribute("gradientTransform", "scale(2 8)");

        let doc = doc_with(vec![gradient]);
        let mut report = RunReport::default();
        bake_gradient_transforms(&doc, &Options::default(), &mut report);

        let gradient = &doc.elements_by_tag_name("radialgradient")[0];
        assert_eq!(gradient.attribute("cx"), Some("20".to_string()));
        assert_eq!(gradient.attribute("cy"), Some("80".to_string()));
        // √|det scale(2, 8)| = 4.
        assert_eq!(gradient.attribute("r"), Some("20".to_string()));
    }

    #[test]
    fn pattern_tiling_covers_the_host() {
        let pattern = Node::new("pattern");
        pattern.set_attribute("id", "p");
        pattern.set_attribute("patternUnits", "userSpaceOnUse");
        pattern.set_attribute("width", "10");
        pattern.set_attribute("height", "10");
        let dot = Node::new("circle");
        dot.set_attribute("r", "1");
        pattern.append(dot);

        let rect = Node::new("rect");
        rect.set_attribute("width", "20");
        rect.set_attribute("height", "20");
        rect.set_attribute("fill", "url(#p)");

        let doc = doc_with(vec![pattern, rect]);
        let mut report = RunReport::default();
        resolve_patterns(&doc, &Options::default(), &mut report);

        assert_eq!(report.patterns_resolved, 1);

        let rect = &doc.elements_by_tag_name("rect")[0];
        assert_eq!(rect.attribute("fill"), Some("none".to_string()));

        // 2×2 tiles, one instance group each, inside one container.
        let groups = doc.elements_by_tag_name("g");
        assert_eq!(groups.len(), 5);
    }

    #[test]
    fn pattern_with_zero_tile_is_ignored() {
        let pattern = Node::new("pattern");
        pattern.set_attribute("id", "p");
        pattern.set_attribute("patternUnits", "userSpaceOnUse");
        pattern.set_attribute("width", "0");
        pattern.set_attribute("height", "10");
        pattern.append(Node::new("circle"));

        let rect = Node::new("rect");
        rect.set_attribute("width", "20");
        rect.set_attribute("height", "20");
        rect.set_attribute("fill", "url(#p)");

        let doc = doc_with(vec![pattern, rect]);
        let mut report = RunReport::default();
        resolve_patterns(&doc, &Options::default(), &mut report);

        assert_eq!(report.patterns_resolved, 0);
        let rect = &doc.elements_by_tag_name("rect")[0];
        assert_eq!(rect.attribute("fill"), Some("none".to_string()));
    }
}
