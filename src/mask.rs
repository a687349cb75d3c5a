// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mask resolution: collapsing luminance/opacity mask content into
//! clip geometry.
//!
//! A mask pixel either keeps or removes content here; the luminance of
//! each mask child is multiplied with its opacity and compared against
//! a single threshold. Anti-aliased masks lose their partial coverage
//! by design of this reduction.

use crate::clippath::{
    add_to_union, clip_polygon_with_rule, element_polygon, replace_with_path,
    rings_to_path_data,
};
use crate::decimal::Decimal;
use crate::matrix::Matrix;
use crate::options::Options;
use crate::pipeline::RunReport;
use crate::polygon::{FillRule, Polygon};
use crate::tree::{parse_func_iri, Document, Node, Units};
use crate::utils;

/// A mask definition.
///
/// `mask` element in SVG.
#[derive(Clone, Debug)]
pub struct Mask {
    /// Element's ID.
    ///
    /// Taken from the SVG itself.
    pub id: String,

    /// Content coordinate system units.
    ///
    /// `maskContentUnits` in SVG.
    pub content_units: Units,
}

impl Mask {
    /// Reads a definition from a `mask` element.
    pub fn from_node(node: &Node) -> Option<Self> {
        // A `mask` attribute must reference a `mask` element.
        if !node.has_tag_name("mask") {
            return None;
        }

        let content_units = node
            .attribute("maskContentUnits")
            .and_then(|v| Units::from_str(&v))
            .unwrap_or_default();

        Some(Mask {
            id: node.id().unwrap_or_default(),
            content_units,
        })
    }
}

// The luminance of a mask child times its opacity attributes.
fn effective_opacity(node: &Node) -> Option<Decimal> {
    // The SVG default fill is black, which keeps nothing.
    let fill = node.attribute("fill").unwrap_or_else(|| "black".to_string());
    let luminance = utils::color_luminance(&fill)?;

    let fill_opacity = node.decimal_attribute("fill-opacity", Decimal::one());
    let opacity = node.decimal_attribute("opacity", Decimal::one());

    Some(luminance * fill_opacity * opacity)
}

// Converts mask content to clip rings in the element's user space.
fn mask_rings(
    mask_node: &Node,
    mask: &Mask,
    bbox: &crate::geom::Rect,
    opts: &Options,
) -> Vec<Polygon> {
    let mut matrix = Matrix::identity(3);
    if mask.content_units == Units::ObjectBoundingBox {
        // Can't fail: both operands are 3×3.
        matrix = Matrix::translation(bbox.x().clone(), bbox.y().clone())
            .mul(&Matrix::scale(bbox.width().clone(), bbox.height().clone()))
            .unwrap();
    }

    let mut rings: Vec<Polygon> = Vec::new();
    for child in mask_node.children() {
        let opacity = match effective_opacity(&child) {
            Some(opacity) => opacity,
            None => continue,
        };
        if opacity < opts.mask_threshold {
            continue;
        }

        let polygon = match element_polygon(&child, opts.clip_segments, opts.bezier_arcs) {
            Some(polygon) => polygon,
            None => continue,
        };

        let child_matrix = match child.parse_transform() {
            // Can't fail: both operands are 3×3.
            Ok(m) => matrix.mul(&m).unwrap(),
            Err(_) => {
                log::warn!(
                    "Mask '{}' has a child with an invalid transform. Skipped.",
                    mask.id
                );
                continue;
            }
        };

        if child_matrix.is_identity() {
            add_to_union(&mut rings, polygon);
        } else {
            let mut points = Vec::new();
            let mut valid = true;
            for p in polygon.points() {
                match child_matrix.apply(p) {
                    Ok(p) => points.push(p),
                    Err(_) => {
                        valid = false;
                        break;
                    }
                }
            }
            if valid {
                if let Some(polygon) = Polygon::new(points) {
                    add_to_union(&mut rings, polygon);
                }
            }
        }
    }

    rings
}

/// The mask pipeline stage: intersects every masked element with the
/// clip geometry its mask collapses to, then strips the `mask`
/// attribute.
pub(crate) fn resolve_masks(doc: &Document, opts: &Options, report: &mut RunReport) {
    let ids = doc.ids();

    for node in doc.root().descendants() {
        let mask_attr = match node.attribute("mask") {
            Some(value) => value,
            None => continue,
        };

        let entity = node.id().unwrap_or_else(|| node.tag_name());

        // Push a group's mask down to its shape descendants.
        if !node.is_shape_element() {
            for descendant in node.descendants() {
                if descendant.is_shape_element() && !descendant.has_attribute("mask") {
                    descendant.set_attribute("mask", &mask_attr);
                }
            }
            node.remove_attribute("mask");
            continue;
        }

        let mask_id = match parse_func_iri(&mask_attr) {
            Some(id) => id,
            None => {
                log::warn!("Element '{}' has an unparsable mask value.", entity);
                node.remove_attribute("mask");
                continue;
            }
        };

        let def = match ids.get(&mask_id) {
            Some(def) => def.clone(),
            None => {
                log::warn!(
                    "Element '{}' references missing mask '{}'.",
                    entity,
                    mask_id
                );
                node.remove_attribute("mask");
                continue;
            }
        };

        let mask = match Mask::from_node(&def) {
            Some(mask) => mask,
            None => {
                log::warn!("'{}' is not a mask element.", mask_id);
                node.remove_attribute("mask");
                continue;
            }
        };

        let element_poly = match element_polygon(&node, opts.clip_segments, opts.bezier_arcs)
        {
            Some(polygon) => polygon,
            None => {
                log::warn!("Element '{}' has no maskable geometry. Skipped.", entity);
                node.remove_attribute("mask");
                continue;
            }
        };

        let rings = mask_rings(&def, &mask, &element_poly.bounding_box(), opts);
        let clipped = clip_polygon_with_rule(&element_poly, &rings, FillRule::NonZero);

        if clipped.is_empty() {
            // The mask keeps nothing of this element.
            node.detach();
        } else {
            let d = rings_to_path_data(clipped.rings(), opts.precision);
            let path = replace_with_path(&node, &d);
            path.remove_attribute("mask");
        }

        report.masks_resolved += 1;
    }
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

    fn mask_def(id: &str, fill: &str) -> Node {
        let mask = Node::new("mask");
        mask.set_attribute("id", id);
        let rect = Node::new("rect");
        rect.set_attribute("x", "25");
        rect.set_attribute("y", "25");
        rect.set_attribute("width", "50");
        rect.set_attribute("height", "50");
        rect.set_attribute("fill", fill);
        mask.append(rect);
        mask
    }

    fn target_rect() -> Node {
        let rect = Node::new("rect");
        rect.set_attribute("id", "target");
        rect.set_attribute("width", "100");
        rect.set_attribute("height", "100");
        rect.set_attribute("mask", "url(#m)");
        rect
    }

    #[test]
    fn white_mask_content_keeps_geometry() {
        let doc = doc_with(vec![mask_def("m", "white"), target_rect()]);
        let mut report = RunReport::default();
        resolve_masks(&doc, &Options::default(), &mut report);

        assert_eq!(report.masks_resolved, 1);

        let paths = doc.elements_by_tag_name("path");
        assert_eq!(paths.len(), 1);
        assert!(!paths[0].has_attribute("mask"));
        assert_eq!(paths[0].attribute("id"), Some("target".to_string()));
    }

    #[test]
    fn black_mask_content_removes_geometry() {
        let doc = doc_with(vec![mask_def("m", "black"), target_rect()]);
        let mut report = RunReport::default();
        resolve_masks(&doc, &Options::default(), &mut report);

        assert_eq!(report.masks_resolved, 1);
        // The target was fully masked away; only the def remains.
        assert!(doc.elements_by_tag_name("path").is_empty());
        assert_eq!(doc.elements_by_tag_name("rect").len(), 1);
    }

    #[test]
    fn opacity_threshold_is_respected() {
        let mask = mask_def("m", "white");
        mask.children()[0].set_attribute("opacity", "0.3");

        let doc = doc_with(vec![mask, target_rect()]);
        let mut report = RunReport::default();
        resolve_masks(&doc, &Options::default(), &mut report);

        // 0.3 < 0.5: the content does not pass the threshold.
        assert!(doc.elements_by_tag_name("path").is_empty());
    }

    #[test]
    fn dangling_mask_reference_is_stripped() {
        let doc = doc_with(vec![target_rect()]);
        let mut report = RunReport::default();
        resolve_masks(&doc, &Options::default(), &mut report);

        assert_eq!(report.masks_resolved, 0);
        let rect = &doc.elements_by_tag_name("rect")[0];
        assert!(!rect.has_attribute("mask"));
    }
}
