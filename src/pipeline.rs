// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The flattening pipeline: an ordered composition of resolvers over
//! one mutable document tree.
//!
//! Stages run in a fixed order (use, markers, patterns, masks, clip
//! paths, transforms, gradient transforms, defs GC), and each one
//! rebuilds the `id → element` index it needs, since the previous
//! stage may have invalidated it. No error in a single element halts
//! the run: stages trap failures at element granularity, append them
//! to the report and continue. The contract is best-effort flattening
//! with a full audit trail.

use crate::decimal::Decimal;
use crate::matrix::Matrix;
use crate::options::Options;
use crate::path::{normalize, path_to_points, transform_path, write_path};
use crate::tree::{Document, Node};
use crate::verify::{self, Check, CheckKind, Ledger};
use crate::{clippath, marker, mask, paint_server, use_node};

// Tolerance of the transform round-trip and inversion-residual checks.
const TRANSFORM_TOLERANCE: &str = "1e-50";

// How many polyline points the round-trip verification samples.
const ROUND_TRIP_SAMPLES: usize = 8;

// Definition containers whose descendants keep their transforms:
// resolvers consume those at instantiation time.
const DEFINITION_TAGS: &[&str] = &[
    "defs",
    "clippath",
    "mask",
    "marker",
    "pattern",
    "symbol",
    "lineargradient",
    "radialgradient",
];

/// The outcome of a flattening run: per-stage counts, the errors that
/// were trapped, and the verification ledger.
#[derive(Debug, Default)]
pub struct RunReport {
    /// `use` elements expanded.
    pub use_resolved: usize,
    /// Elements whose markers were instantiated.
    pub markers_resolved: usize,
    /// Pattern fills tiled into geometry.
    pub patterns_resolved: usize,
    /// Masked elements converted to clipped geometry.
    pub masks_resolved: usize,
    /// Elements clipped by a `clip-path`.
    pub clips_applied: usize,
    /// `transform` attributes baked or pushed down.
    pub transforms_flattened: usize,
    /// Gradients whose `gradientTransform` was baked.
    pub gradients_baked: usize,
    /// Unreferenced `defs` children removed.
    pub defs_removed: usize,
    /// Human-readable errors trapped during the run.
    pub errors: Vec<String>,
    /// The verification ledger.
    pub ledger: Ledger,
}

impl RunReport {
    /// Returns `true` when every verification check passed
    /// and no error was trapped.
    pub fn all_passed(&self) -> bool {
        self.errors.is_empty() && self.ledger.all_passed()
    }
}

/// Runs the flattening pipeline over a document.
pub fn flatten(doc: &mut Document, opts: &Options) -> RunReport {
    let mut report = RunReport::default();

    if opts.resolve_use {
        use_node::resolve_use(doc, opts, &mut report);
    }
    if opts.resolve_markers {
        marker::resolve_markers(doc, opts, &mut report);
    }
    if opts.resolve_patterns {
        paint_server::resolve_patterns(doc, opts, &mut report);
    }
    if opts.resolve_masks {
        mask::resolve_masks(doc, opts, &mut report);
    }
    if opts.resolve_clip_paths {
        clippath::resolve_clip_paths(doc, opts, &mut report);
    }
    if opts.flatten_transforms {
        flatten_transforms(doc, opts, &mut report);
    }
    if opts.bake_gradients {
        paint_server::bake_gradient_transforms(doc, opts, &mut report);
    }
    if opts.remove_unused_defs {
        remove_unused_defs(doc, &mut report);
    }

    report
}

// Returns `true` for nodes living inside a definition container.
fn inside_definition(node: &Node) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        let tag = parent.tag_name();
        if DEFINITION_TAGS.contains(&tag.as_str()) {
            return true;
        }
        current = parent.parent();
    }

    false
}

// Stage 6: bake leaf transforms into path data, push group transforms
// down to children. Descendants are visited in document order, so a
// group always runs before the children it rewrites.
fn flatten_transforms(doc: &Document, opts: &Options, report: &mut RunReport) {
    for node in doc.root().descendants() {
        let transform_attr = match node.attribute("transform") {
            Some(value) => value,
            None => continue,
        };

        if inside_definition(&node) {
            continue;
        }

        let entity = node.id().unwrap_or_else(|| node.tag_name());

        let matrix = match Matrix::parse(&transform_attr) {
            Ok(m) => m,
            Err(e) => {
                report
                    .errors
                    .push(format!("element '{}' has an invalid transform: {}", entity, e));
                node.remove_attribute("transform");
                continue;
            }
        };

        if matrix.is_identity() {
            node.remove_attribute("transform");
            report.transforms_flattened += 1;
            continue;
        }

        if node.is_shape_element() {
            if let Err(e) = bake_shape_transform(&node, &entity, &matrix, opts, report) {
                report
                    .errors
                    .push(format!("transform baking failed for '{}': {}", entity, e));
            }
        } else {
            // Compose into each child's transform, then strip.
            for child in node.children() {
                let combined = match child.parse_transform() {
                    // Can't fail: both operands are 3×3.
                    Ok(own) => matrix.mul(&own).unwrap(),
                    Err(e) => {
                        report.errors.push(format!(
                            "child of '{}' has an invalid transform: {}",
                            entity, e
                        ));
                        matrix.clone()
                    }
                };
                // Full precision here; the children bake later.
                child.set_attribute("transform", &combined.to_svg_transform(50));
            }
            node.remove_attribute("transform");
            report.transforms_flattened += 1;
        }
    }
}

fn bake_shape_transform(
    node: &Node,
    entity: &str,
    matrix: &Matrix,
    opts: &Options,
    report: &mut RunReport,
) -> Result<(), crate::Error> {
    let tolerance = Decimal::lit(TRANSFORM_TOLERANCE);

    // (i) invertibility and the inversion residual.
    report.ledger.record(
        "transform",
        entity,
        CheckKind::MatrixInversion,
        verify::matrix_inversion(matrix, &tolerance),
    );

    let shape = match node.shape() {
        Some(shape) => shape,
        None => {
            // No geometry to bake into; the attribute must still go.
            node.remove_attribute("transform");
            return Ok(());
        }
    };
    let segments = match shape.to_path(opts.bezier_arcs) {
        Some(segments) => segments,
        None => {
            log::warn!("Element '{}' has invalid geometry. Skipped.", entity);
            node.remove_attribute("transform");
            return Ok(());
        }
    };

    // (ii) round-trip verification over sampled polyline points.
    let samples = path_to_points(&segments, opts.curve_segments);
    let step = (samples.len() / ROUND_TRIP_SAMPLES).max(1);
    let mut worst = Check { valid: true, error: Decimal::zero() };
    for point in samples.iter().step_by(step) {
        let check = verify::transform_round_trip(matrix, point, &tolerance);
        if !check.valid || check.error > worst.error {
            worst = check;
            if !worst.valid {
                break;
            }
        }
    }
    report
        .ledger
        .record("transform", entity, CheckKind::TransformRoundTrip, worst);

    // Bake: normalize so every coordinate transforms exactly, then
    // rewrite the element as a plain path.
    let mut normalized = normalize(&segments);
    transform_path(&mut normalized, matrix)?;

    let d = write_path(&normalized, opts.precision);
    let path = clippath::replace_with_path(node, &d);
    path.remove_attribute("transform");

    report.transforms_flattened += 1;
    Ok(())
}

// Stage 8: drop `defs` children that nothing references anymore.
fn remove_unused_defs(doc: &Document, report: &mut RunReport) {
    let referenced = doc.referenced_ids();

    for defs in doc.elements_by_tag_name("defs") {
        for child in defs.children() {
            let keep = match child.id() {
                Some(id) => referenced.contains(&id),
                None => false,
            };

            if !keep {
                child.detach();
                report.defs_removed += 1;
            }
        }
    }
}
