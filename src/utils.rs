// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Shared helpers for viewport and paint handling.

use crate::decimal::Decimal;
use crate::geom::Rect;
use crate::matrix::Matrix;

/// Parses a `viewBox` attribute value.
pub fn parse_view_box(text: &str) -> Option<Rect> {
    let mut parts = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty());

    let x = Decimal::parse(parts.next()?).ok()?;
    let y = Decimal::parse(parts.next()?).ok()?;
    let width = Decimal::parse(parts.next()?).ok()?;
    let height = Decimal::parse(parts.next()?).ok()?;
    if parts.next().is_some() {
        return None;
    }

    if width.sign() <= 0 || height.sign() <= 0 {
        return None;
    }

    Rect::new(x, y, width, height)
}

/// Converts a `viewBox` into a viewport transform.
///
/// Only `xMidYMid meet` semantics are implemented: uniform scale to
/// fit, centered in the viewport. Other `preserveAspectRatio` modes
/// fall back to this one.
pub fn view_box_to_transform(
    view_box: &Rect,
    width: &Decimal,
    height: &Decimal,
) -> Matrix {
    let sx = width / view_box.width();
    let sy = height / view_box.height();
    let scale = std::cmp::min(sx, sy);

    let two = Decimal::from(2);
    let tx = (width - &(view_box.width() * &scale)) / &two - view_box.x() * &scale;
    let ty = (height - &(view_box.height() * &scale)) / &two - view_box.y() * &scale;

    // Can't fail: both operands are 3×3.
    Matrix::translation(tx, ty)
        .mul(&Matrix::scale(scale.clone(), scale))
        .unwrap()
}

/// Returns the relative luminance of a paint value in `[0, 1]`.
///
/// `None` stands for `none`/`transparent`. Colors outside the
/// supported forms are treated as full luminance with a warning.
pub fn color_luminance(value: &str) -> Option<Decimal> {
    let value = value.trim();

    match value {
        "none" | "transparent" => return None,
        "white" => return Some(Decimal::one()),
        "black" => return Some(Decimal::zero()),
        _ => {}
    }

    if let Some(hex) = value.strip_prefix('#') {
        let (r, g, b) = match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
                (r * 17, g * 17, b * 17)
            }
            6 => (
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            ),
            _ => return Some(Decimal::one()),
        };

        return Some(rgb_luminance(r, g, b));
    }

    if let Some(args) = value.strip_prefix("rgb(").and_then(|v| v.strip_suffix(')')) {
        let mut channels = args.split(',').map(|s| s.trim().parse::<u16>().ok());
        if let (Some(Some(r)), Some(Some(g)), Some(Some(b))) =
            (channels.next(), channels.next(), channels.next())
        {
            return Some(rgb_luminance(
                r.min(255) as u8,
                g.min(255) as u8,
                b.min(255) as u8,
            ));
        }
    }

    log::warn!("unsupported paint value '{}'; assuming full luminance", value);
    Some(Decimal::one())
}

// ITU-R BT.709 relative luminance.
fn rgb_luminance(r: u8, g: u8, b: u8) -> Decimal {
    let scale = Decimal::from(255);
    let r = Decimal::from(u32::from(r)) / &scale;
    let g = Decimal::from(u32::from(g)) / &scale;
    let b = Decimal::from(u32::from(b)) / &scale;

    Decimal::lit("0.2126") * r + Decimal::lit("0.7152") * g + Decimal::lit("0.0722") * b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_box_parsing() {
        let vb = parse_view_box("0 0 100 50").unwrap();
        assert_eq!(*vb.width(), Decimal::from(100));
        assert!(parse_view_box("0 0 -1 50").is_none());
        assert!(parse_view_box("0 0 100").is_none());
    }

    #[test]
    fn view_box_transform_is_centered() {
        let vb = parse_view_box("0 0 10 10").unwrap();
        let m = view_box_to_transform(&vb, &Decimal::from(20), &Decimal::from(40));

        // Uniform scale 2, centered vertically: (5, 5) → (10, 20).
        let p = m
            .apply(&crate::geom::Point::new(Decimal::from(5), Decimal::from(5)))
            .unwrap();
        assert_eq!(p.x, Decimal::from(10));
        assert_eq!(p.y, Decimal::from(20));
    }

    #[test]
    fn luminance_values() {
        assert_eq!(color_luminance("white").unwrap(), Decimal::one());
        assert_eq!(color_luminance("black").unwrap(), Decimal::zero());
        assert!(color_luminance("none").is_none());
        assert_eq!(color_luminance("#fff").unwrap(), Decimal::one());

        let grey = color_luminance("#808080").unwrap();
        assert!(grey > Decimal::lit("0.49") && grey < Decimal::lit("0.51"));

        let red = color_luminance("rgb(255, 0, 0)").unwrap();
        assert_eq!(red, Decimal::lit("0.2126"));
    }
}
