// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! SVG path data: lexing, serialization, sampling and shape synthesis.
//!
//! The lexer is liberal about whitespace and commas and accepts the
//! compact signed-number form (`.5.5`, `1-2`). Implicit command
//! repetition is supported per the SVG grammar, except for arcs:
//! arc flags make an implicitly repeated `A` ambiguous, so both the
//! lexer and the serializer require an explicit letter on every arc.

use crate::bezier::{Bezier, SvgArc};
use crate::decimal::Decimal;
use crate::geom::Point;
use crate::matrix::Matrix;
use crate::Error;

/// The classical control distance for a quarter-circle Bezier arc:
/// `4/3 · tan(π/8)`.
pub const KAPPA: &str = "0.5522847498307933984022516322795974381536788934142";

/// A path segment with its natural argument tuple.
///
/// `abs` distinguishes `M` from `m` and so on. Arc flags are booleans
/// and serialize as literal `0`/`1`.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub enum PathSegment {
    MoveTo {
        abs: bool,
        x: Decimal,
        y: Decimal,
    },
    LineTo {
        abs: bool,
        x: Decimal,
        y: Decimal,
    },
    HorizontalLineTo {
        abs: bool,
        x: Decimal,
    },
    VerticalLineTo {
        abs: bool,
        y: Decimal,
    },
    CurveTo {
        abs: bool,
        x1: Decimal,
        y1: Decimal,
        x2: Decimal,
        y2: Decimal,
        x: Decimal,
        y: Decimal,
    },
    SmoothCurveTo {
        abs: bool,
        x2: Decimal,
        y2: Decimal,
        x: Decimal,
        y: Decimal,
    },
    Quadratic {
        abs: bool,
        x1: Decimal,
        y1: Decimal,
        x: Decimal,
        y: Decimal,
    },
    SmoothQuadratic {
        abs: bool,
        x: Decimal,
        y: Decimal,
    },
    EllipticalArc {
        abs: bool,
        rx: Decimal,
        ry: Decimal,
        x_axis_rotation: Decimal,
        large_arc: bool,
        sweep: bool,
        x: Decimal,
        y: Decimal,
    },
    ClosePath {
        abs: bool,
    },
}

impl PathSegment {
    /// Returns the command letter, honoring case.
    pub fn letter(&self) -> char {
        let (upper, abs) = match *self {
            PathSegment::MoveTo { abs, .. } => ('M', abs),
            PathSegment::LineTo { abs, .. } => ('L', abs),
            PathSegment::HorizontalLineTo { abs, .. } => ('H', abs),
            PathSegment::VerticalLineTo { abs, .. } => ('V', abs),
            PathSegment::CurveTo { abs, .. } => ('C', abs),
            PathSegment::SmoothCurveTo { abs, .. } => ('S', abs),
            PathSegment::Quadratic { abs, .. } => ('Q', abs),
            PathSegment::SmoothQuadratic { abs, .. } => ('T', abs),
            PathSegment::EllipticalArc { abs, .. } => ('A', abs),
            PathSegment::ClosePath { abs } => ('Z', abs),
        };

        if abs {
            upper
        } else {
            upper.to_ascii_lowercase()
        }
    }

    /// Returns `true` for an absolute segment.
    pub fn is_abs(&self) -> bool {
        match *self {
            PathSegment::MoveTo { abs, .. }
            | PathSegment::LineTo { abs, .. }
            | PathSegment::HorizontalLineTo { abs, .. }
            | PathSegment::VerticalLineTo { abs, .. }
            | PathSegment::CurveTo { abs, .. }
            | PathSegment::SmoothCurveTo { abs, .. }
            | PathSegment::Quadratic { abs, .. }
            | PathSegment::SmoothQuadratic { abs, .. }
            | PathSegment::EllipticalArc { abs, .. }
            | PathSegment::ClosePath { abs } => abs,
        }
    }

    /// Returns the segment arguments in grammar order.
    ///
    /// Arc flags are rendered as 0/1.
    pub fn args(&self) -> Vec<Decimal> {
        match *self {
            PathSegment::MoveTo { ref x, ref y, .. }
            | PathSegment::LineTo { ref x, ref y, .. }
            | PathSegment::SmoothQuadratic { ref x, ref y, .. } => {
                vec![x.clone(), y.clone()]
            }
            PathSegment::HorizontalLineTo { ref x, .. } => vec![x.clone()],
            PathSegment::VerticalLineTo { ref y, .. } => vec![y.clone()],
            PathSegment::CurveTo {
                ref x1,
                ref y1,
                ref x2,
                ref y2,
                ref x,
                ref y,
                ..
            } => vec![
                x1.clone(),
                y1.clone(),
                x2.clone(),
                y2.clone(),
                x.clone(),
                y.clone(),
            ],
            PathSegment::SmoothCurveTo {
                ref x2,
                ref y2,
                ref x,
                ref y,
                ..
            } => vec![x2.clone(), y2.clone(), x.clone(), y.clone()],
            PathSegment::Quadratic {
                ref x1,
                ref y1,
                ref x,
                ref y,
                ..
            } => vec![x1.clone(), y1.clone(), x.clone(), y.clone()],
            PathSegment::EllipticalArc {
                ref rx,
                ref ry,
                ref x_axis_rotation,
                large_arc,
                sweep,
                ref x,
                ref y,
                ..
            } => vec![
                rx.clone(),
                ry.clone(),
                x_axis_rotation.clone(),
                flag_to_decimal(large_arc),
                flag_to_decimal(sweep),
                x.clone(),
                y.clone(),
            ],
            PathSegment::ClosePath { .. } => Vec::new(),
        }
    }
}

fn flag_to_decimal(flag: bool) -> Decimal {
    if flag {
        Decimal::one()
    } else {
        Decimal::zero()
    }
}

struct Lexer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Lexer { text, pos: 0 }
    }

    fn skip_separators(&mut self) {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b' ' | b'\t' | b'\r' | b'\n' | b',' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn number(&mut self) -> Result<Decimal, Error> {
        self.skip_separators();
        let start = self.pos;

        if let Some(b'+') | Some(b'-') = self.peek() {
            self.pos += 1;
        }

        let mut has_digits = false;
        let mut has_dot = false;
        while let Some(c) = self.peek() {
            match c {
                b'0'..=b'9' => {
                    has_digits = true;
                    self.pos += 1;
                }
                b'.' if !has_dot => {
                    has_dot = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }

        if !has_digits {
            return Err(Error::MalformedPath(format!(
                "expected a number at offset {}",
                start
            )));
        }

        // An optional exponent; 'e' only counts when digits follow.
        if let Some(b'e') | Some(b'E') = self.peek() {
            let saved = self.pos;
            self.pos += 1;
            if let Some(b'+') | Some(b'-') = self.peek() {
                self.pos += 1;
            }
            if matches!(self.peek(), Some(b'0'..=b'9')) {
                while matches!(self.peek(), Some(b'0'..=b'9')) {
                    self.pos += 1;
                }
            } else {
                self.pos = saved;
            }
        }

        Decimal::parse(&self.text[start..self.pos])
            .map_err(|_| Error::MalformedPath(format!("bad number at offset {}", start)))
    }

    fn flag(&mut self) -> Result<bool, Error> {
        self.skip_separators();
        match self.peek() {
            Some(b'0') => {
                self.pos += 1;
                Ok(false)
            }
            Some(b'1') => {
                self.pos += 1;
                Ok(true)
            }
            _ => Err(Error::MalformedPath(format!(
                "expected an arc flag at offset {}",
                self.pos
            ))),
        }
    }
}

/// Parses an SVG path data string into a command sequence.
pub fn parse_path(text: &str) -> Result<Vec<PathSegment>, Error> {
    let mut lexer = Lexer::new(text);
    let mut segments: Vec<PathSegment> = Vec::new();
    // The command an argument stream without a letter belongs to.
    let mut implicit: Option<char> = None;

    loop {
        lexer.skip_separators();
        let next = match lexer.peek() {
            Some(c) => c,
            None => break,
        };

        let cmd = if next.is_ascii_alphabetic() {
            lexer.pos += 1;
            next as char
        } else {
            match implicit {
                Some('A') | Some('a') => {
                    return Err(Error::MalformedPath(
                        "arc commands cannot be implicitly repeated".to_string(),
                    ));
                }
                Some(c) => c,
                None => {
                    return Err(Error::MalformedPath(
                        "a path must start with a command letter".to_string(),
                    ));
                }
            }
        };

        let abs = cmd.is_ascii_uppercase();
        let segment = match cmd.to_ascii_uppercase() {
            'M' => {
                let x = lexer.number()?;
                let y = lexer.number()?;
                PathSegment::MoveTo { abs, x, y }
            }
            'L' => {
                let x = lexer.number()?;
                let y = lexer.number()?;
                PathSegment::LineTo { abs, x, y }
            }
            'H' => PathSegment::HorizontalLineTo { abs, x: lexer.number()? },
            'V' => PathSegment::VerticalLineTo { abs, y: lexer.number()? },
            'C' => {
                let x1 = lexer.number()?;
                let y1 = lexer.number()?;
                let x2 = lexer.number()?;
                let y2 = lexer.number()?;
                let x = lexer.number()?;
                let y = lexer.number()?;
                PathSegment::CurveTo { abs, x1, y1, x2, y2, x, y }
            }
            'S' => {
                let x2 = lexer.number()?;
                let y2 = lexer.number()?;
                let x = lexer.number()?;
                let y = lexer.number()?;
                PathSegment::SmoothCurveTo { abs, x2, y2, x, y }
            }
            'Q' => {
                let x1 = lexer.number()?;
                let y1 = lexer.number()?;
                let x = lexer.number()?;
                let y = lexer.number()?;
                PathSegment::Quadratic { abs, x1, y1, x, y }
            }
            'T' => {
                let x = lexer.number()?;
                let y = lexer.number()?;
                PathSegment::SmoothQuadratic { abs, x, y }
            }
            'A' => {
                let rx = lexer.number()?;
                let ry = lexer.number()?;
                let x_axis_rotation = lexer.number()?;
                let large_arc = lexer.flag()?;
                let sweep = lexer.flag()?;
                let x = lexer.number()?;
                let y = lexer.number()?;
                PathSegment::EllipticalArc {
                    abs,
                    rx,
                    ry,
                    x_axis_rotation,
                    large_arc,
                    sweep,
                    x,
                    y,
                }
            }
            'Z' => PathSegment::ClosePath { abs },
            _ => {
                return Err(Error::MalformedPath(format!(
                    "unknown command '{}'",
                    cmd
                )));
            }
        };

        if segments.is_empty() && !matches!(segment, PathSegment::MoveTo { .. }) {
            return Err(Error::MalformedPath(
                "a path must start with a MoveTo".to_string(),
            ));
        }

        // A MoveTo's extra coordinate pairs are implicit LineTos;
        // ClosePath takes no implicit arguments at all.
        implicit = match cmd {
            'M' => Some('L'),
            'm' => Some('l'),
            'Z' | 'z' => None,
            c => Some(c),
        };

        segments.push(segment);
    }

    Ok(segments)
}

/// Formats a number with the given output precision
/// and trailing zeros stripped.
pub fn format_number(value: &Decimal, precision: i64) -> String {
    value.rounded_to(precision).plain_string()
}

/// Serializes a command sequence.
///
/// The command letter is written immediately before its first argument.
/// Every segment keeps its letter, so the output never relies on
/// implicit repetition; arc flags emit as literal `0`/`1` with
/// whitespace separators.
pub fn write_path(segments: &[PathSegment], precision: i64) -> String {
    let mut out = String::new();
    for segment in segments {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push(segment.letter());

        let args = segment.args();
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&format_number(arg, precision));
        }
    }

    out
}

/// Normalizes a path to absolute `M`/`L`/`C`/`Q`/`Z` segments.
///
/// Relative segments are made absolute, `H`/`V` become lines, smooth
/// segments get explicit control points and arcs are approximated by
/// cubic chains. The result transforms exactly under any affine matrix.
pub fn normalize(segments: &[PathSegment]) -> Vec<PathSegment> {
    let mut out = Vec::with_capacity(segments.len());
    let mut walker = PathWalker::new();

    for segment in segments {
        let step = walker.step(segment);

        match step {
            WalkedSegment::MoveTo { to } => {
                out.push(PathSegment::MoveTo { abs: true, x: to.x, y: to.y });
            }
            WalkedSegment::LineTo { to } => {
                out.push(PathSegment::LineTo { abs: true, x: to.x, y: to.y });
            }
            WalkedSegment::CurveTo { ctrl1, ctrl2, to } => {
                out.push(PathSegment::CurveTo {
                    abs: true,
                    x1: ctrl1.x,
                    y1: ctrl1.y,
                    x2: ctrl2.x,
                    y2: ctrl2.y,
                    x: to.x,
                    y: to.y,
                });
            }
            WalkedSegment::Quadratic { ctrl, to } => {
                out.push(PathSegment::Quadratic {
                    abs: true,
                    x1: ctrl.x,
                    y1: ctrl.y,
                    x: to.x,
                    y: to.y,
                });
            }
            WalkedSegment::Arc { arc } => {
                // A quarter turn per cubic keeps the approximation error
                // far below the output precision.
                let quarter = Decimal::pi() / Decimal::from(2);
                match arc.to_center() {
                    Some(center) => {
                        for (p1, p2, p) in center.to_cubics(&quarter) {
                            out.push(PathSegment::CurveTo {
                                abs: true,
                                x1: p1.x,
                                y1: p1.y,
                                x2: p2.x,
                                y2: p2.y,
                                x: p.x,
                                y: p.y,
                            });
                        }
                    }
                    None => {
                        out.push(PathSegment::LineTo {
                            abs: true,
                            x: arc.to.x,
                            y: arc.to.y,
                        });
                    }
                }
            }
            WalkedSegment::ClosePath => {
                out.push(PathSegment::ClosePath { abs: true });
            }
        }
    }

    out
}

/// Applies an affine transform to a normalized path in place.
///
/// The path must contain only absolute `M`/`L`/`C`/`Q`/`Z` segments
/// (see [`normalize`]); any other segment is an error.
pub fn transform_path(segments: &mut [PathSegment], matrix: &Matrix) -> Result<(), Error> {
    let mut apply = |x: &mut Decimal, y: &mut Decimal| -> Result<(), Error> {
        let p = matrix.apply(&Point::new(x.clone(), y.clone()))?;
        *x = p.x;
        *y = p.y;
        Ok(())
    };

    for segment in segments.iter_mut() {
        match segment {
            PathSegment::MoveTo { abs: true, x, y }
            | PathSegment::LineTo { abs: true, x, y } => apply(x, y)?,
            PathSegment::CurveTo { abs: true, x1, y1, x2, y2, x, y } => {
                apply(x1, y1)?;
                apply(x2, y2)?;
                apply(x, y)?;
            }
            PathSegment::Quadratic { abs: true, x1, y1, x, y } => {
                apply(x1, y1)?;
                apply(x, y)?;
            }
            PathSegment::ClosePath { .. } => {}
            _ => {
                return Err(Error::MalformedPath(
                    "transform requires a normalized path".to_string(),
                ));
            }
        }
    }

    Ok(())
}

// A resolved path step in absolute coordinates.
enum WalkedSegment {
    MoveTo { to: Point },
    LineTo { to: Point },
    CurveTo { ctrl1: Point, ctrl2: Point, to: Point },
    Quadratic { ctrl: Point, to: Point },
    Arc { arc: SvgArc },
    ClosePath,
}

// Tracks the pen, the subpath start and the control points needed
// by smooth segments while walking a command sequence.
struct PathWalker {
    current: Point,
    subpath_start: Point,
    prev_cubic_ctrl: Option<Point>,
    prev_quad_ctrl: Option<Point>,
}

impl PathWalker {
    fn new() -> Self {
        PathWalker {
            current: Point::zero(),
            subpath_start: Point::zero(),
            prev_cubic_ctrl: None,
            prev_quad_ctrl: None,
        }
    }

    fn absolute(&self, abs: bool, x: &Decimal, y: &Decimal) -> Point {
        if abs {
            Point::new(x.clone(), y.clone())
        } else {
            Point::new(&self.current.x + x, &self.current.y + y)
        }
    }

    // The first control point of a smooth segment is the previous
    // control point reflected about the pen; without a preceding curve
    // it collapses onto the pen.
    fn reflect(&self, prev: &Option<Point>) -> Point {
        match prev {
            Some(ctrl) => Point::new(
                Decimal::from(2) * &self.current.x - &ctrl.x,
                Decimal::from(2) * &self.current.y - &ctrl.y,
            ),
            None => self.current.clone(),
        }
    }

    fn step(&mut self, segment: &PathSegment) -> WalkedSegment {
        let mut new_cubic_ctrl = None;
        let mut new_quad_ctrl = None;

        let walked = match segment {
            PathSegment::MoveTo { abs, x, y } => {
                let to = self.absolute(*abs, x, y);
                self.subpath_start = to.clone();
                self.current = to.clone();
                WalkedSegment::MoveTo { to }
            }
            PathSegment::LineTo { abs, x, y } => {
                let to = self.absolute(*abs, x, y);
                self.current = to.clone();
                WalkedSegment::LineTo { to }
            }
            PathSegment::HorizontalLineTo { abs, x } => {
                let to = if *abs {
                    Point::new(x.clone(), self.current.y.clone())
                } else {
                    Point::new(&self.current.x + x, self.current.y.clone())
                };
                self.current = to.clone();
                WalkedSegment::LineTo { to }
            }
            PathSegment::VerticalLineTo { abs, y } => {
                let to = if *abs {
                    Point::new(self.current.x.clone(), y.clone())
                } else {
                    Point::new(self.current.x.clone(), &self.current.y + y)
                };
                self.current = to.clone();
                WalkedSegment::LineTo { to }
            }
            PathSegment::CurveTo { abs, x1, y1, x2, y2, x, y } => {
                let ctrl1 = self.absolute(*abs, x1, y1);
                let ctrl2 = self.absolute(*abs, x2, y2);
                let to = self.absolute(*abs, x, y);
                new_cubic_ctrl = Some(ctrl2.clone());
                self.current = to.clone();
                WalkedSegment::CurveTo { ctrl1, ctrl2, to }
            }
            PathSegment::SmoothCurveTo { abs, x2, y2, x, y } => {
                let ctrl1 = self.reflect(&self.prev_cubic_ctrl);
                let ctrl2 = self.absolute(*abs, x2, y2);
                let to = self.absolute(*abs, x, y);
                new_cubic_ctrl = Some(ctrl2.clone());
                self.current = to.clone();
                WalkedSegment::CurveTo { ctrl1, ctrl2, to }
            }
            PathSegment::Quadratic { abs, x1, y1, x, y } => {
                let ctrl = self.absolute(*abs, x1, y1);
                let to = self.absolute(*abs, x, y);
                new_quad_ctrl = Some(ctrl.clone());
                self.current = to.clone();
                WalkedSegment::Quadratic { ctrl, to }
            }
            PathSegment::SmoothQuadratic { abs, x, y } => {
                let ctrl = self.reflect(&self.prev_quad_ctrl);
                let to = self.absolute(*abs, x, y);
                new_quad_ctrl = Some(ctrl.clone());
                self.current = to.clone();
                WalkedSegment::Quadratic { ctrl, to }
            }
            PathSegment::EllipticalArc {
                abs,
                rx,
                ry,
                x_axis_rotation,
                large_arc,
                sweep,
                x,
                y,
            } => {
                let to = self.absolute(*abs, x, y);
                let arc = SvgArc {
                    from: self.current.clone(),
                    to: to.clone(),
                    rx: rx.clone(),
                    ry: ry.clone(),
                    x_axis_rotation: x_axis_rotation.clone(),
                    large_arc: *large_arc,
                    sweep: *sweep,
                };
                self.current = to;
                WalkedSegment::Arc { arc }
            }
            PathSegment::ClosePath { .. } => {
                self.current = self.subpath_start.clone();
                WalkedSegment::ClosePath
            }
        };

        self.prev_cubic_ctrl = new_cubic_ctrl;
        self.prev_quad_ctrl = new_quad_ctrl;
        walked
    }
}

/// Samples a command sequence into a vertex list.
///
/// Straight segments contribute one vertex, curve and arc segments
/// contribute `samples_per_curve` vertices, `Z` resets the pen to the
/// subpath start without emitting one. Consecutive duplicates are
/// removed; coordinates keep full decimal precision.
pub fn path_to_points(segments: &[PathSegment], samples_per_curve: usize) -> Vec<Point> {
    let mut points: Vec<Point> = Vec::new();
    let mut walker = PathWalker::new();

    let mut push = |points: &mut Vec<Point>, p: Point| {
        if points.last() != Some(&p) {
            points.push(p);
        }
    };

    for segment in segments {
        let from = walker.current.clone();
        match walker.step(segment) {
            WalkedSegment::MoveTo { to } | WalkedSegment::LineTo { to } => {
                push(&mut points, to);
            }
            WalkedSegment::CurveTo { ctrl1, ctrl2, to } => {
                let curve = Bezier::cubic(from, ctrl1, ctrl2, to);
                for p in curve.sample(samples_per_curve) {
                    push(&mut points, p);
                }
            }
            WalkedSegment::Quadratic { ctrl, to } => {
                let curve = Bezier::quadratic(from, ctrl, to);
                for p in curve.sample(samples_per_curve) {
                    push(&mut points, p);
                }
            }
            WalkedSegment::Arc { arc } => {
                for p in arc.sample(samples_per_curve) {
                    push(&mut points, p);
                }
            }
            WalkedSegment::ClosePath => {}
        }
    }

    points
}

/// Returns the absolute end point of every command.
///
/// This is the vertex list markers attach to.
pub fn path_vertices(segments: &[PathSegment]) -> Vec<Point> {
    let mut points = Vec::new();
    let mut walker = PathWalker::new();

    for segment in segments {
        match walker.step(segment) {
            WalkedSegment::MoveTo { to }
            | WalkedSegment::LineTo { to }
            | WalkedSegment::CurveTo { to, .. }
            | WalkedSegment::Quadratic { to, .. } => points.push(to),
            WalkedSegment::Arc { arc } => points.push(arc.to),
            WalkedSegment::ClosePath => {}
        }
    }

    points
}

/// A basic shape descriptor.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub enum Shape {
    Rect {
        x: Decimal,
        y: Decimal,
        width: Decimal,
        height: Decimal,
        rx: Option<Decimal>,
        ry: Option<Decimal>,
    },
    Circle {
        cx: Decimal,
        cy: Decimal,
        r: Decimal,
    },
    Ellipse {
        cx: Decimal,
        cy: Decimal,
        rx: Decimal,
        ry: Decimal,
    },
    Line {
        x1: Decimal,
        y1: Decimal,
        x2: Decimal,
        y2: Decimal,
    },
    Polygon {
        points: Vec<Point>,
    },
    Polyline {
        points: Vec<Point>,
    },
    Path {
        d: String,
    },
}

impl Shape {
    /// Converts the shape to its canonical path representation.
    ///
    /// `bezier_arcs` selects the number of cubic arcs used for circles
    /// and ellipses: 4 gives the classical magic-constant form, 8/16/
    /// 32/64 give the high-precision form. Returns `None` for shapes
    /// with invalid geometry (the caller reports them).
    pub fn to_path(&self, bezier_arcs: usize) -> Option<Vec<PathSegment>> {
        match *self {
            Shape::Rect {
                ref x,
                ref y,
                ref width,
                ref height,
                ref rx,
                ref ry,
            } => rect_to_path(x, y, width, height, rx, ry),
            Shape::Circle { ref cx, ref cy, ref r } => {
                if r.sign() <= 0 {
                    return None;
                }
                Some(ellipse_to_path(cx, cy, r, r, bezier_arcs))
            }
            Shape::Ellipse {
                ref cx,
                ref cy,
                ref rx,
                ref ry,
            } => {
                if rx.sign() <= 0 || ry.sign() <= 0 {
                    return None;
                }
                Some(ellipse_to_path(cx, cy, rx, ry, bezier_arcs))
            }
            Shape::Line {
                ref x1,
                ref y1,
                ref x2,
                ref y2,
            } => Some(vec![
                PathSegment::MoveTo { abs: true, x: x1.clone(), y: y1.clone() },
                PathSegment::LineTo { abs: true, x: x2.clone(), y: y2.clone() },
            ]),
            Shape::Polygon { ref points } => {
                let mut segments = points_to_segments(points)?;
                segments.push(PathSegment::ClosePath { abs: true });
                Some(segments)
            }
            Shape::Polyline { ref points } => points_to_segments(points),
            Shape::Path { ref d } => parse_path(d).ok(),
        }
    }
}

fn points_to_segments(points: &[Point]) -> Option<Vec<PathSegment>> {
    // 'polyline' and 'polygon' must contain at least 2 points.
    if points.len() < 2 {
        return None;
    }

    let mut segments = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        if i == 0 {
            segments.push(PathSegment::MoveTo { abs: true, x: p.x.clone(), y: p.y.clone() });
        } else {
            segments.push(PathSegment::LineTo { abs: true, x: p.x.clone(), y: p.y.clone() });
        }
    }

    Some(segments)
}

fn rect_to_path(
    x: &Decimal,
    y: &Decimal,
    width: &Decimal,
    height: &Decimal,
    rx: &Option<Decimal>,
    ry: &Option<Decimal>,
) -> Option<Vec<PathSegment>> {
    // 'width' and 'height' must be positive and non-zero.
    if width.sign() <= 0 || height.sign() <= 0 {
        return None;
    }

    let (rx, ry) = resolve_rx_ry(rx, ry, width, height);

    let right = x + width;
    let bottom = y + height;

    if rx.is_zero() {
        return Some(vec![
            PathSegment::MoveTo { abs: true, x: x.clone(), y: y.clone() },
            PathSegment::LineTo { abs: true, x: right.clone(), y: y.clone() },
            PathSegment::LineTo { abs: true, x: right, y: bottom.clone() },
            PathSegment::LineTo { abs: true, x: x.clone(), y: bottom },
            PathSegment::ClosePath { abs: true },
        ]);
    }

    // Conversion according to https://www.w3.org/TR/SVG11/shapes.html#RectElement
    let arc = |x: Decimal, y: Decimal| PathSegment::EllipticalArc {
        abs: true,
        rx: rx.clone(),
        ry: ry.clone(),
        x_axis_rotation: Decimal::zero(),
        large_arc: false,
        sweep: true,
        x,
        y,
    };

    Some(vec![
        PathSegment::MoveTo { abs: true, x: x + &rx, y: y.clone() },
        PathSegment::LineTo { abs: true, x: &right - &rx, y: y.clone() },
        arc(right.clone(), y + &ry),
        PathSegment::LineTo { abs: true, x: right.clone(), y: &bottom - &ry },
        arc(&right - &rx, bottom.clone()),
        PathSegment::LineTo { abs: true, x: x + &rx, y: bottom.clone() },
        arc(x.clone(), &bottom - &ry),
        PathSegment::LineTo { abs: true, x: x.clone(), y: y + &ry },
        arc(x + &rx, y.clone()),
        PathSegment::ClosePath { abs: true },
    ])
}

fn resolve_rx_ry(
    rx: &Option<Decimal>,
    ry: &Option<Decimal>,
    width: &Decimal,
    height: &Decimal,
) -> (Decimal, Decimal) {
    // Remove negative values first.
    let rx_opt = rx.clone().filter(|v| v.sign() >= 0);
    let ry_opt = ry.clone().filter(|v| v.sign() >= 0);

    // Resolve.
    let (mut rx, mut ry) = match (rx_opt, ry_opt) {
        (None, None) => (Decimal::zero(), Decimal::zero()),
        (Some(rx), None) => (rx.clone(), rx),
        (None, Some(ry)) => (ry.clone(), ry),
        (Some(rx), Some(ry)) => (rx, ry),
    };

    // Clamp rx/ry to the half of the width/height.
    //
    // Should be done only after resolving.
    let two = Decimal::from(2);
    let half_width = width / &two;
    let half_height = height / &two;
    if rx > half_width {
        rx = half_width;
    }
    if ry > half_height {
        ry = half_height;
    }

    (rx, ry)
}

/// Converts an ellipse to a counter-clockwise closed cubic path.
///
/// `arcs == 4` uses the classical magic constant; larger counts fit
/// each cubic to a span of `2π/N` with the analytically optimal
/// control distance `4/3 · tan(π/(2N))`.
pub fn ellipse_to_path(
    cx: &Decimal,
    cy: &Decimal,
    rx: &Decimal,
    ry: &Decimal,
    arcs: usize,
) -> Vec<PathSegment> {
    let arcs = if arcs >= 4 && arcs % 4 == 0 { arcs } else { 8 };

    // 4/3 · tan(π/(2N)); for N = 4 this is the classical constant.
    let alpha = if arcs == 4 {
        Decimal::lit(KAPPA)
    } else {
        let angle = Decimal::pi() / Decimal::from(2 * arcs);
        Decimal::from(4) / Decimal::from(3) * (angle.sin() / angle.cos())
    };

    let two_pi = Decimal::pi() * Decimal::from(2);
    let step = &two_pi / Decimal::from(arcs);

    let point_at = |theta: &Decimal| {
        Point::new(cx + &(rx * &theta.cos()), cy + &(ry * &theta.sin()))
    };
    let derivative_at = |theta: &Decimal| {
        (-(rx * &theta.sin()), ry * &theta.cos())
    };

    let start = point_at(&Decimal::zero());
    let mut segments = vec![PathSegment::MoveTo {
        abs: true,
        x: start.x,
        y: start.y,
    }];

    let mut theta = Decimal::zero();
    for _ in 0..arcs {
        let theta_next = &theta + &step;

        let p0 = point_at(&theta);
        let p3 = point_at(&theta_next);
        let (d0x, d0y) = derivative_at(&theta);
        let (d3x, d3y) = derivative_at(&theta_next);

        segments.push(PathSegment::CurveTo {
            abs: true,
            x1: &p0.x + &(&alpha * &d0x),
            y1: &p0.y + &(&alpha * &d0y),
            x2: &p3.x - &(&alpha * &d3x),
            y2: &p3.y - &(&alpha * &d3y),
            x: p3.x,
            y: p3.y,
        });

        theta = theta_next;
    }

    segments.push(PathSegment::ClosePath { abs: true });
    segments
}

/// Parses a `points` attribute value into a point list.
///
/// Liberal about whitespace and commas, like the path lexer.
pub fn parse_points(text: &str) -> Result<Vec<Point>, Error> {
    let mut lexer = Lexer::new(text);
    let mut points = Vec::new();

    loop {
        lexer.skip_separators();
        if lexer.peek().is_none() {
            break;
        }

        let x = lexer.number()?;
        let y = lexer.number()?;
        points.push(Point::new(x, y));
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::ApproxEq;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn lex_basic_path() {
        let segments = parse_path("M 10 20 L30,40z").unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], PathSegment::MoveTo { abs: true, x: dec(10), y: dec(20) });
        assert_eq!(segments[1], PathSegment::LineTo { abs: true, x: dec(30), y: dec(40) });
        assert_eq!(segments[2], PathSegment::ClosePath { abs: false });
    }

    #[test]
    fn lex_compact_numbers() {
        let segments = parse_path("M.5.5L1-2").unwrap();
        assert_eq!(
            segments[0],
            PathSegment::MoveTo {
                abs: true,
                x: Decimal::lit("0.5"),
                y: Decimal::lit("0.5")
            }
        );
        assert_eq!(segments[1], PathSegment::LineTo { abs: true, x: dec(1), y: dec(-2) });
    }

    #[test]
    fn lex_implicit_repeat() {
        // Implicit pairs after M are LineTos.
        let segments = parse_path("M0 0 10 10 20 20").unwrap();
        assert_eq!(segments.len(), 3);
        assert!(matches!(segments[1], PathSegment::LineTo { abs: true, .. }));

        let segments = parse_path("m0 0 10 10").unwrap();
        assert!(matches!(segments[1], PathSegment::LineTo { abs: false, .. }));
    }

    #[test]
    fn lex_rejects_implicit_arcs() {
        let err = parse_path("M0 0 A10 10 0 0 1 20 20 10 10 0 1 0 40 40");
        assert!(err.is_err());
    }

    #[test]
    fn lex_arc_flags() {
        // Flags may run together with the following number.
        let segments = parse_path("M0 0 A10 10 0 1 0 40 40").unwrap();
        match &segments[1] {
            PathSegment::EllipticalArc { large_arc, sweep, .. } => {
                assert!(*large_arc);
                assert!(!*sweep);
            }
            s => panic!("unexpected segment {:?}", s),
        }

        assert!(parse_path("M0 0 A10 10 0 2 0 40 40").is_err());
    }

    #[test]
    fn serialize_keeps_arc_letters() {
        let segments = parse_path("M0 0 A10 10 0 0 1 20 20 A10 10 0 1 0 40 40").unwrap();
        let out = write_path(&segments, 6);
        assert!(out.contains("A10 10 0 1 0 40 40"), "{}", out);
        assert!(!out.contains(".5.5"));
    }

    #[test]
    fn serialize_strips_trailing_zeros() {
        let segments = parse_path("M1.500 2.000").unwrap();
        assert_eq!(write_path(&segments, 6), "M1.5 2");
    }

    #[test]
    fn round_trip_is_a_fixed_point() {
        let d = "M0 0 L10.5 0 C1 2 3 4 5 6 Z";
        let segments = parse_path(d).unwrap();
        let out = write_path(&segments, 6);
        let reparsed = parse_path(&out).unwrap();
        assert_eq!(segments, reparsed);
        assert_eq!(out, write_path(&reparsed, 6));
    }

    #[test]
    fn sampling_straight_commands() {
        let segments = parse_path("M0 0 L10 0 L10 10 Z").unwrap();
        let points = path_to_points(&segments, 20);
        assert_eq!(points.len(), 3);
        assert_eq!(points[2], Point::new(dec(10), dec(10)));
    }

    #[test]
    fn sampling_curves() {
        let segments = parse_path("M0 0 C0 10 10 10 10 0").unwrap();
        let points = path_to_points(&segments, 16);
        // The MoveTo vertex plus 16 curve samples.
        assert_eq!(points.len(), 17);
    }

    #[test]
    fn sampling_removes_duplicates() {
        let segments = parse_path("M0 0 L0 0 L10 0").unwrap();
        let points = path_to_points(&segments, 20);
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn sampling_tracks_relative_and_smooth() {
        // A smooth curve after a cubic reflects the control point.
        let segments = parse_path("M0 0 C0 5 5 5 5 0 S10 -5 10 0").unwrap();
        let points = path_to_points(&segments, 8);
        assert_eq!(points.len(), 17);

        // The reflected midpoint dips below the axis.
        let below = points.iter().filter(|p| p.y.sign() < 0).count();
        assert!(below > 0);
    }

    #[test]
    fn rect_shape_round_corners_clamped() {
        let shape = Shape::Rect {
            x: dec(0),
            y: dec(0),
            width: dec(10),
            height: dec(10),
            rx: Some(dec(20)),
            ry: None,
        };
        let segments = shape.to_path(8).unwrap();
        match &segments[0] {
            PathSegment::MoveTo { x, .. } => assert_eq!(*x, dec(5)),
            s => panic!("unexpected segment {:?}", s),
        }
    }

    #[test]
    fn degenerate_shapes_are_rejected() {
        assert!(Shape::Circle { cx: dec(0), cy: dec(0), r: dec(0) }.to_path(8).is_none());
        assert!(Shape::Rect {
            x: dec(0),
            y: dec(0),
            width: dec(0),
            height: dec(5),
            rx: None,
            ry: None
        }
        .to_path(8)
        .is_none());
        assert!(Shape::Polygon { points: vec![Point::zero()] }.to_path(8).is_none());
    }

    #[test]
    fn circle_path_stays_near_the_circle() {
        let shape = Shape::Circle { cx: dec(0), cy: dec(0), r: dec(10) };
        let segments = shape.to_path(8).unwrap();
        let points = path_to_points(&segments, 8);

        let tol = Decimal::lit("1e-3");
        for p in &points {
            let r = (&p.x * &p.x + &p.y * &p.y).sqrt().unwrap();
            assert!(r.approx_eq(&dec(10), &tol), "off-circle point {:?}", p);
        }
    }

    #[test]
    fn normalize_removes_relative_and_arcs() {
        let segments = parse_path("m10 10 h5 v5 a5 5 0 0 1 -5 5 z").unwrap();
        let normalized = normalize(&segments);
        for segment in &normalized {
            assert!(segment.is_abs());
            assert!(!matches!(
                segment,
                PathSegment::EllipticalArc { .. }
                    | PathSegment::HorizontalLineTo { .. }
                    | PathSegment::VerticalLineTo { .. }
            ));
        }
    }

    #[test]
    fn transform_translates_coordinates() {
        let segments = parse_path("M0 0 L10 0").unwrap();
        let mut normalized = normalize(&segments);
        let m = Matrix::translation(dec(5), dec(7));
        transform_path(&mut normalized, &m).unwrap();
        assert_eq!(
            normalized[1],
            PathSegment::LineTo { abs: true, x: dec(15), y: dec(7) }
        );
    }

    #[test]
    fn parse_points_list() {
        let points = parse_points("0,0 10 0 10,10").unwrap();
        assert_eq!(points.len(), 3);
        assert!(parse_points("1 2 3").is_err());
    }
}
