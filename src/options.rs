// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::decimal::Decimal;
use crate::polygon::FillRule;

/// Processing options.
#[derive(Clone, Debug)]
pub struct Options {
    /// Decimal places in output coordinates.
    ///
    /// Default: 6
    pub precision: i64,

    /// Samples per curve segment for visual output.
    ///
    /// Default: 20
    pub curve_segments: usize,

    /// Samples per curve segment when building clip polygons.
    ///
    /// Higher than `curve_segments` so that curve approximation error
    /// stays below the end-to-end area tolerance.
    ///
    /// Default: 64
    pub clip_segments: usize,

    /// Number of cubic arcs used for circles and ellipses.
    ///
    /// Must be a multiple of 4; other values fall back to 8.
    ///
    /// Default: 8
    pub bezier_arcs: usize,

    /// Resolve and expand `use` elements.
    ///
    /// Default: true
    pub resolve_use: bool,

    /// Instantiate markers as sibling geometry.
    ///
    /// Default: true
    pub resolve_markers: bool,

    /// Tile patterns into explicit geometry.
    ///
    /// Default: true
    pub resolve_patterns: bool,

    /// Convert masks into clip geometry.
    ///
    /// Default: true
    pub resolve_masks: bool,

    /// Apply clip paths as boolean intersections.
    ///
    /// Default: true
    pub resolve_clip_paths: bool,

    /// Bake `transform` attributes into path coordinates.
    ///
    /// Default: true
    pub flatten_transforms: bool,

    /// Bake `gradientTransform` into gradient coordinates.
    ///
    /// Default: true
    pub bake_gradients: bool,

    /// Remove unreferenced `defs` children after all other stages.
    ///
    /// Default: true
    pub remove_unused_defs: bool,

    /// Tolerance for the end-to-end clip area conservation check.
    ///
    /// Default: 1e-10
    pub e2e_tolerance: Decimal,

    /// The clip rule used when an element does not specify `clip-rule`.
    ///
    /// Default: nonzero
    pub clip_rule: FillRule,

    /// Opacity threshold when collapsing a mask to clip geometry.
    ///
    /// Default: 0.5
    pub mask_threshold: Decimal,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            precision: 6,
            curve_segments: 20,
            clip_segments: 64,
            bezier_arcs: 8,
            resolve_use: true,
            resolve_markers: true,
            resolve_patterns: true,
            resolve_masks: true,
            resolve_clip_paths: true,
            flatten_transforms: true,
            bake_gradients: true,
            remove_unused_defs: true,
            e2e_tolerance: Decimal::lit("1e-10"),
            clip_rule: FillRule::NonZero,
            mask_threshold: Decimal::lit("0.5"),
        }
    }
}
