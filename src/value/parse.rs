//! Literal parsing dispatcher and the scalar/list shapes
//!
//! `parse_literal` is the single entry point the binder and the primitive
//! namespace use. It is pure and infallible in the panic sense; anything
//! it cannot read comes back as `None` so the caller can retry another
//! resolution path.

use super::cache;
use super::color::parse_color;
use super::path::parse_path;
use super::time::{parse_duration, parse_repeat_count, parse_timespan};
use super::{CornerRadius, EnumTable, GridLength, Matrix, Point, Rect, Thickness, Value, ValueKind};

/// Parse an attribute literal against a declared kind.
///
/// `property_name` feeds the one name-sensitive rule: the literal `Auto`
/// reads as NaN for properties named `Width` or `Height` and nowhere
/// else. `enums` is the declared property's enum table, used when an
/// Int32 literal starts with a letter.
///
/// The empty string is always NoMatch; it must never overwrite a default
/// with a zero value.
pub fn parse_literal(
    kind: ValueKind,
    property_name: Option<&str>,
    enums: Option<&EnumTable>,
    literal: &str,
) -> Option<Value> {
    let trimmed = literal.trim();
    if trimmed.is_empty() {
        return None;
    }

    match kind {
        ValueKind::Bool => parse_bool(trimmed).map(Value::Bool),
        ValueKind::Int32 => parse_int32(trimmed, enums).map(Value::Int32),
        ValueKind::Double => parse_double(trimmed, property_name).map(Value::Double),
        ValueKind::String => Some(Value::String(literal.to_string())),
        ValueKind::Color => parse_color(trimmed).map(Value::Color),
        ValueKind::Point => parse_point(trimmed).map(Value::Point),
        ValueKind::Rect => parse_rect(trimmed).map(Value::Rect),
        ValueKind::Thickness => parse_thickness(trimmed).map(Value::Thickness),
        ValueKind::CornerRadius => parse_corner_radius(trimmed).map(Value::CornerRadius),
        ValueKind::DoubleList => split_doubles(trimmed).map(Value::DoubleList),
        ValueKind::PointList => {
            cache::cached(ValueKind::PointList, trimmed, |s| {
                parse_point_list(s).map(Value::PointList)
            })
        }
        ValueKind::PathGeometry => cache::cached(ValueKind::PathGeometry, trimmed, |s| {
            parse_path(s).map(Value::PathGeometry)
        }),
        ValueKind::Matrix => parse_matrix(trimmed).map(Value::Matrix),
        ValueKind::GridLength => parse_grid_length(trimmed).map(Value::GridLength),
        ValueKind::Duration => parse_duration(trimmed).map(Value::Duration),
        ValueKind::TimeSpan => parse_timespan(trimmed).map(Value::TimeSpan),
        ValueKind::RepeatCount => parse_repeat_count(trimmed).map(Value::RepeatCount),
        // Object-typed properties are satisfied by elements, not literals
        ValueKind::Object => None,
    }
}

/// `true`/`false` case-insensitive, or an i32 literal read as truthiness
fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        return Some(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Some(false);
    }
    s.parse::<i32>().ok().map(|n| n != 0)
}

/// Decimal i32, or an enum-variant name when the literal starts with a
/// letter and the property declares an enum type. Out-of-range integers
/// and unknown variants are NoMatch.
fn parse_int32(s: &str, enums: Option<&EnumTable>) -> Option<i32> {
    let first = s.chars().next()?;
    if first.is_ascii_alphabetic() {
        return enums?.lookup(s);
    }
    s.parse::<i32>().ok()
}

/// Locale-invariant double. `NaN` parses as NaN; `Auto` maps to NaN only
/// for the two layout property names that define it.
fn parse_double(s: &str, property_name: Option<&str>) -> Option<f64> {
    if s.eq_ignore_ascii_case("Auto") {
        return match property_name {
            Some("Width") | Some("Height") => Some(f64::NAN),
            _ => None,
        };
    }
    s.parse::<f64>().ok()
}

/// Split a comma/whitespace-delimited run of doubles. Commas may carry
/// surrounding whitespace; an empty field is NoMatch.
pub fn split_doubles(s: &str) -> Option<Vec<f64>> {
    let mut values = Vec::new();
    for field in s.split(',') {
        for token in field.split_ascii_whitespace() {
            values.push(token.parse::<f64>().ok()?);
        }
        if field.trim().is_empty() {
            return None;
        }
    }
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn parse_point(s: &str) -> Option<Point> {
    match split_doubles(s)?.as_slice() {
        &[x, y] => Some(Point::new(x, y)),
        _ => None,
    }
}

fn parse_rect(s: &str) -> Option<Rect> {
    match split_doubles(s)?.as_slice() {
        &[x, y, width, height] => Some(Rect {
            x,
            y,
            width,
            height,
        }),
        _ => None,
    }
}

/// 1/2/4-value box shorthand: one value fills all four edges, two fill
/// the left/right pair then the top/bottom pair, four are given in
/// left, top, right, bottom order.
fn parse_thickness(s: &str) -> Option<Thickness> {
    match split_doubles(s)?.as_slice() {
        &[v] => Some(Thickness::uniform(v)),
        &[h, v] => Some(Thickness {
            left: h,
            top: v,
            right: h,
            bottom: v,
        }),
        &[left, top, right, bottom] => Some(Thickness {
            left,
            top,
            right,
            bottom,
        }),
        _ => None,
    }
}

/// 1/2/4-value corner shorthand: two values fill the top-left/bottom-right
/// diagonal then the top-right/bottom-left diagonal.
fn parse_corner_radius(s: &str) -> Option<CornerRadius> {
    match split_doubles(s)?.as_slice() {
        &[v] => Some(CornerRadius {
            top_left: v,
            top_right: v,
            bottom_right: v,
            bottom_left: v,
        }),
        &[d1, d2] => Some(CornerRadius {
            top_left: d1,
            top_right: d2,
            bottom_right: d1,
            bottom_left: d2,
        }),
        &[top_left, top_right, bottom_right, bottom_left] => Some(CornerRadius {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }),
        _ => None,
    }
}

fn parse_point_list(s: &str) -> Option<Vec<Point>> {
    let values = split_doubles(s)?;
    if values.len() % 2 != 0 {
        return None;
    }
    Some(
        values
            .chunks_exact(2)
            .map(|pair| Point::new(pair[0], pair[1]))
            .collect(),
    )
}

/// `Identity`, 6 affine values, or a 16-value 3D matrix folded down to
/// its affine components
fn parse_matrix(s: &str) -> Option<Matrix> {
    if s.eq_ignore_ascii_case("Identity") {
        return Some(Matrix::IDENTITY);
    }
    let v = split_doubles(s)?;
    match v.len() {
        6 => Some(Matrix {
            m11: v[0],
            m12: v[1],
            m21: v[2],
            m22: v[3],
            offset_x: v[4],
            offset_y: v[5],
        }),
        16 => Some(Matrix {
            m11: v[0],
            m12: v[1],
            m21: v[4],
            m22: v[5],
            offset_x: v[12],
            offset_y: v[13],
        }),
        _ => None,
    }
}

/// `Auto`, `*`, `N*`, or a bare pixel double
fn parse_grid_length(s: &str) -> Option<GridLength> {
    if s.eq_ignore_ascii_case("Auto") {
        return Some(GridLength::Auto);
    }
    if let Some(weight) = s.strip_suffix('*') {
        let weight = weight.trim();
        if weight.is_empty() {
            return Some(GridLength::Star(1.0));
        }
        return weight.parse::<f64>().ok().map(GridLength::Star);
    }
    s.parse::<f64>().ok().map(GridLength::Pixel)
}
