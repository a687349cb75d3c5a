// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Lossless and precision-bounded path rewrites.
//!
//! Every lossy conversion is verified before it is accepted: smooth
//! shorthands by sampling both curves, line shorthands by their
//! post-condition, absolute/relative conversion by an exact inverse
//! round-trip. A rewrite that fails its check keeps the original
//! command.

use crate::bezier::Bezier;
use crate::decimal::Decimal;
use crate::geom::Point;
use crate::path::{format_number, parse_path, PathSegment};
use crate::Error;

// Sample count for smooth-shorthand verification.
const SMOOTH_SAMPLES: usize = 20;

// Tolerance of the absolute/relative inverse round-trip.
const ROUND_TRIP_TOLERANCE: &str = "1e-40";

/// A path optimizer with configurable tolerances.
#[derive(Clone, Debug)]
pub struct PathOptimizer {
    /// Maximum geometric deviation accepted from a lossy rewrite.
    ///
    /// Default: 1e-6
    pub tolerance: Decimal,

    /// Decimal places in the formatted output.
    ///
    /// Default: 6
    pub precision: i64,
}

impl Default for PathOptimizer {
    fn default() -> Self {
        PathOptimizer {
            tolerance: Decimal::lit("1e-6"),
            precision: 6,
        }
    }
}

impl PathOptimizer {
    /// Optimizes a path data string.
    ///
    /// Applies, in order: trailing L→Z, L→H/V, C→S, Q→T, per-command
    /// absolute/relative shorter-form selection, and collapse of
    /// repeated commands.
    pub fn optimize(&self, d: &str) -> Result<String, Error> {
        let segments = parse_path(d)?;
        let mut segments = to_absolute(&segments);

        self.convert_line_to_close(&mut segments);
        self.convert_lines(&mut segments);
        self.convert_smooth(&mut segments);

        let chosen = self.choose_shorter_forms(&segments);
        let collapsed = collapse_repeated(&chosen);

        Ok(write_raw(&collapsed, self.precision))
    }

    // L → H/V when one coordinate matches the pen within tolerance.
    fn convert_lines(&self, segments: &mut [PathSegment]) {
        let mut pen = Point::zero();
        let mut start = Point::zero();

        for segment in segments.iter_mut() {
            let replacement = match &*segment {
                PathSegment::LineTo { abs: true, x, y } => {
                    if y.approx_eq(&pen.y, &self.tolerance)
                        && !x.approx_eq(&pen.x, &self.tolerance)
                    {
                        // Post-condition: the shorthand ends at (x, pen.y).
                        Some(PathSegment::HorizontalLineTo { abs: true, x: x.clone() })
                    } else if x.approx_eq(&pen.x, &self.tolerance)
                        && !y.approx_eq(&pen.y, &self.tolerance)
                    {
                        Some(PathSegment::VerticalLineTo { abs: true, y: y.clone() })
                    } else {
                        None
                    }
                }
                _ => None,
            };

            if let Some(new_segment) = replacement {
                *segment = new_segment;
            }

            advance_pen(segment, &mut pen, &mut start);
        }
    }

    // C → S and Q → T when the first control point is the reflection
    // of the previous one; accepted only if sampling agrees.
    fn convert_smooth(&self, segments: &mut [PathSegment]) {
        let mut pen = Point::zero();
        let mut start = Point::zero();
        let mut prev_cubic_ctrl: Option<Point> = None;
        let mut prev_quad_ctrl: Option<Point> = None;

        for segment in segments.iter_mut() {
            let from = pen.clone();

            let mut new_cubic_ctrl = None;
            let mut new_quad_ctrl = None;
            let mut replacement = None;

            match &*segment {
                PathSegment::CurveTo { abs: true, x1, y1, x2, y2, x, y } => {
                    new_cubic_ctrl = Some(Point::new(x2.clone(), y2.clone()));

                    if let Some(prev) = &prev_cubic_ctrl {
                        let reflected = reflect(&from, prev);
                        let original = Bezier::cubic(
                            from.clone(),
                            Point::new(x1.clone(), y1.clone()),
                            Point::new(x2.clone(), y2.clone()),
                            Point::new(x.clone(), y.clone()),
                        );
                        let smooth = Bezier::cubic(
                            from.clone(),
                            reflected,
                            Point::new(x2.clone(), y2.clone()),
                            Point::new(x.clone(), y.clone()),
                        );

                        if self.curves_agree(&original, &smooth) {
                            replacement = Some(PathSegment::SmoothCurveTo {
                                abs: true,
                                x2: x2.clone(),
                                y2: y2.clone(),
                                x: x.clone(),
                                y: y.clone(),
                            });
                        }
                    }
                }
                PathSegment::Quadratic { abs: true, x1, y1, x, y } => {
                    new_quad_ctrl = Some(Point::new(x1.clone(), y1.clone()));

                    if let Some(prev) = &prev_quad_ctrl {
                        let reflected = reflect(&from, prev);
                        let original = Bezier::quadratic(
                            from.clone(),
                            Point::new(x1.clone(), y1.clone()),
                            Point::new(x.clone(), y.clone()),
                        );
                        let smooth = Bezier::quadratic(
                            from.clone(),
                            reflected.clone(),
                            Point::new(x.clone(), y.clone()),
                        );

                        if self.curves_agree(&original, &smooth) {
                            new_quad_ctrl = Some(reflected);
                            replacement = Some(PathSegment::SmoothQuadratic {
                                abs: true,
                                x: x.clone(),
                                y: y.clone(),
                            });
                        }
                    }
                }
                _ => {}
            }

            if let Some(new_segment) = replacement {
                *segment = new_segment;
            }

            advance_pen(segment, &mut pen, &mut start);
            prev_cubic_ctrl = new_cubic_ctrl;
            prev_quad_ctrl = new_quad_ctrl;
        }
    }

    // Samples both curves at uniform parameters; the rewrite is
    // accepted only if the worst deviation is within tolerance.
    fn curves_agree(&self, original: &Bezier, candidate: &Bezier) -> bool {
        let step = Decimal::one() / Decimal::from(SMOOTH_SAMPLES);
        for i in 0..=SMOOTH_SAMPLES {
            let t = &step * Decimal::from(i);
            let d = original.point_at(&t).distance(&candidate.point_at(&t));
            if d > self.tolerance {
                return false;
            }
        }

        true
    }

    // A final L that lands on the subpath start becomes Z.
    fn convert_line_to_close(&self, segments: &mut [PathSegment]) {
        let mut pen = Point::zero();
        let mut start = Point::zero();
        let n = segments.len();

        for i in 0..n {
            let at_subpath_end = match segments.get(i + 1) {
                None => true,
                Some(PathSegment::MoveTo { .. }) => true,
                _ => false,
            };

            if at_subpath_end {
                if let PathSegment::LineTo { abs: true, x, y } = &segments[i] {
                    if x.approx_eq(&start.x, &self.tolerance)
                        && y.approx_eq(&start.y, &self.tolerance)
                    {
                        segments[i] = PathSegment::ClosePath { abs: true };
                    }
                }
            }

            let current = segments[i].clone();
            advance_pen(&current, &mut pen, &mut start);
        }
    }

    // Formats both the absolute and the relative form of each command
    // and keeps the shorter one. The forms must carry equal argument
    // counts; equality of meaning is guaranteed by the conversion
    // round-trip.
    fn choose_shorter_forms(&self, segments: &[PathSegment]) -> Vec<(char, Vec<Decimal>)> {
        let relative = to_relative(segments);
        let mut out = Vec::with_capacity(segments.len());

        for (abs_seg, rel_seg) in segments.iter().zip(&relative) {
            let abs_args = abs_seg.args();
            let rel_args = rel_seg.args();
            if abs_args.len() != rel_args.len() {
                // Never happens by construction; keep the absolute form.
                out.push((abs_seg.letter(), abs_args));
                continue;
            }

            let abs_len: usize = abs_args
                .iter()
                .map(|a| format_number(a, self.precision).len())
                .sum();
            let rel_len: usize = rel_args
                .iter()
                .map(|a| format_number(a, self.precision).len())
                .sum();

            if rel_len < abs_len {
                out.push((rel_seg.letter(), rel_args));
            } else {
                out.push((abs_seg.letter(), abs_args));
            }
        }

        out
    }
}

fn reflect(pen: &Point, ctrl: &Point) -> Point {
    let two = Decimal::from(2);
    Point::new(&two * &pen.x - &ctrl.x, &two * &pen.y - &ctrl.y)
}

// Advances the pen over one segment, tracking the subpath start.
fn advance_pen(segment: &PathSegment, pen: &mut Point, start: &mut Point) {
    match segment {
        PathSegment::MoveTo { abs, x, y } => {
            *pen = endpoint(pen, *abs, x, y);
            *start = pen.clone();
        }
        PathSegment::LineTo { abs, x, y }
        | PathSegment::CurveTo { abs, x, y, .. }
        | PathSegment::SmoothCurveTo { abs, x, y, .. }
        | PathSegment::Quadratic { abs, x, y, .. }
        | PathSegment::SmoothQuadratic { abs, x, y }
        | PathSegment::EllipticalArc { abs, x, y, .. } => {
            *pen = endpoint(pen, *abs, x, y);
        }
        PathSegment::HorizontalLineTo { abs, x } => {
            pen.x = if *abs { x.clone() } else { &pen.x + x };
        }
        PathSegment::VerticalLineTo { abs, y } => {
            pen.y = if *abs { y.clone() } else { &pen.y + y };
        }
        PathSegment::ClosePath { .. } => {
            *pen = start.clone();
        }
    }
}

fn endpoint(pen: &Point, abs: bool, x: &Decimal, y: &Decimal) -> Point {
    if abs {
        Point::new(x.clone(), y.clone())
    } else {
        Point::new(&pen.x + x, &pen.y + y)
    }
}

/// Converts every segment to its absolute form.
///
/// Arc radii, rotation and flags are position-independent and stay
/// unchanged; only the endpoint converts.
pub fn to_absolute(segments: &[PathSegment]) -> Vec<PathSegment> {
    let mut out = Vec::with_capacity(segments.len());
    let mut pen = Point::zero();
    let mut start = Point::zero();

    for segment in segments {
        let converted = if segment.is_abs() {
            segment.clone()
        } else {
            match segment {
                PathSegment::MoveTo { x, y, .. } => PathSegment::MoveTo {
                    abs: true,
                    x: &pen.x + x,
                    y: &pen.y + y,
                },
                PathSegment::LineTo { x, y, .. } => PathSegment::LineTo {
                    abs: true,
                    x: &pen.x + x,
                    y: &pen.y + y,
                },
                PathSegment::HorizontalLineTo { x, .. } => {
                    PathSegment::HorizontalLineTo { abs: true, x: &pen.x + x }
                }
                PathSegment::VerticalLineTo { y, .. } => {
                    PathSegment::VerticalLineTo { abs: true, y: &pen.y + y }
                }
                PathSegment::CurveTo { x1, y1, x2, y2, x, y, .. } => PathSegment::CurveTo {
                    abs: true,
                    x1: &pen.x + x1,
                    y1: &pen.y + y1,
                    x2: &pen.x + x2,
                    y2: &pen.y + y2,
                    x: &pen.x + x,
                    y: &pen.y + y,
                },
                PathSegment::SmoothCurveTo { x2, y2, x, y, .. } => {
                    PathSegment::SmoothCurveTo {
                        abs: true,
                        x2: &pen.x + x2,
                        y2: &pen.y + y2,
                        x: &pen.x + x,
                        y: &pen.y + y,
                    }
                }
                PathSegment::Quadratic { x1, y1, x, y, .. } => PathSegment::Quadratic {
                    abs: true,
                    x1: &pen.x + x1,
                    y1: &pen.y + y1,
                    x: &pen.x + x,
                    y: &pen.y + y,
                },
                PathSegment::SmoothQuadratic { x, y, .. } => PathSegment::SmoothQuadratic {
                    abs: true,
                    x: &pen.x + x,
                    y: &pen.y + y,
                },
                PathSegment::EllipticalArc {
                    rx,
                    ry,
                    x_axis_rotation,
                    large_arc,
                    sweep,
                    x,
                    y,
                    ..
                } => PathSegment::EllipticalArc {
                    abs: true,
                    rx: rx.clone(),
                    ry: ry.clone(),
                    x_axis_rotation: x_axis_rotation.clone(),
                    large_arc: *large_arc,
                    sweep: *sweep,
                    x: &pen.x + x,
                    y: &pen.y + y,
                },
                PathSegment::ClosePath { .. } => PathSegment::ClosePath { abs: true },
            }
        };

        advance_pen(&converted, &mut pen, &mut start);
        out.push(converted);
    }

    out
}

/// Converts every segment to its relative form.
///
/// The exact inverse of [`to_absolute`] up to the round-trip tolerance.
pub fn to_relative(segments: &[PathSegment]) -> Vec<PathSegment> {
    let absolute = to_absolute(segments);
    let mut out = Vec::with_capacity(absolute.len());
    let mut pen = Point::zero();
    let mut start = Point::zero();

    for segment in &absolute {
        let converted = match segment {
            PathSegment::MoveTo { x, y, .. } => PathSegment::MoveTo {
                abs: false,
                x: x - &pen.x,
                y: y - &pen.y,
            },
            PathSegment::LineTo { x, y, .. } => PathSegment::LineTo {
                abs: false,
                x: x - &pen.x,
                y: y - &pen.y,
            },
            PathSegment::HorizontalLineTo { x, .. } => {
                PathSegment::HorizontalLineTo { abs: false, x: x - &pen.x }
            }
            PathSegment::VerticalLineTo { y, .. } => {
                PathSegment::VerticalLineTo { abs: false, y: y - &pen.y }
            }
            PathSegment::CurveTo { x1, y1, x2, y2, x, y, .. } => PathSegment::CurveTo {
                abs: false,
                x1: x1 - &pen.x,
                y1: y1 - &pen.y,
                x2: x2 - &pen.x,
                y2: y2 - &pen.y,
                x: x - &pen.x,
                y: y - &pen.y,
            },
            PathSegment::SmoothCurveTo { x2, y2, x, y, .. } => PathSegment::SmoothCurveTo {
                abs: false,
                x2: x2 - &pen.x,
                y2: y2 - &pen.y,
                x: x - &pen.x,
                y: y - &pen.y,
            },
            PathSegment::Quadratic { x1, y1, x, y, .. } => PathSegment::Quadratic {
                abs: false,
                x1: x1 - &pen.x,
                y1: y1 - &pen.y,
                x: x - &pen.x,
                y: y - &pen.y,
            },
            PathSegment::SmoothQuadratic { x, y, .. } => PathSegment::SmoothQuadratic {
                abs: false,
                x: x - &pen.x,
                y: y - &pen.y,
            },
            // Radii, rotation and flags stay; only the endpoint converts.
            PathSegment::EllipticalArc {
                rx,
                ry,
                x_axis_rotation,
                large_arc,
                sweep,
                x,
                y,
                ..
            } => PathSegment::EllipticalArc {
                abs: false,
                rx: rx.clone(),
                ry: ry.clone(),
                x_axis_rotation: x_axis_rotation.clone(),
                large_arc: *large_arc,
                sweep: *sweep,
                x: x - &pen.x,
                y: y - &pen.y,
            },
            PathSegment::ClosePath { .. } => PathSegment::ClosePath { abs: false },
        };

        advance_pen(segment, &mut pen, &mut start);
        out.push(converted);
    }

    out
}

/// Checks that `to_relative` and `to_absolute` are inverses on the
/// given path, within the round-trip tolerance.
pub fn verify_round_trip(segments: &[PathSegment]) -> bool {
    let tolerance = Decimal::lit(ROUND_TRIP_TOLERANCE);
    let forward = to_absolute(segments);
    let back = to_absolute(&to_relative(&forward));

    if forward.len() != back.len() {
        return false;
    }

    forward.iter().zip(&back).all(|(a, b)| {
        let aa = a.args();
        let ba = b.args();
        aa.len() == ba.len()
            && aa.iter().zip(&ba).all(|(x, y)| x.approx_eq(y, &tolerance))
    })
}

/// Merges consecutive commands of the same letter into one command
/// with a concatenated argument list.
///
/// MoveTo, arcs and ClosePath are never merged. The total argument
/// count is preserved.
pub fn collapse_repeated(commands: &[(char, Vec<Decimal>)]) -> Vec<(char, Vec<Decimal>)> {
    let mut out: Vec<(char, Vec<Decimal>)> = Vec::with_capacity(commands.len());

    for (letter, args) in commands {
        let mergeable = !matches!(letter, 'M' | 'm' | 'A' | 'a' | 'Z' | 'z');
        match out.last_mut() {
            Some((last, list)) if mergeable && last == letter => {
                list.extend(args.iter().cloned());
            }
            _ => out.push((*letter, args.clone())),
        }
    }

    out
}

// Serializes raw commands; arcs always keep their letter by
// construction, since they are never collapsed.
fn write_raw(commands: &[(char, Vec<Decimal>)], precision: i64) -> String {
    let mut out = String::new();
    for (letter, args) in commands {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push(*letter);
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&format_number(arg, precision));
        }
    }

    out
}
