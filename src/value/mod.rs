//! Value Mini-Language
//!
//! Typed values flowing through the compiler, plus the grammar that turns
//! attribute literals into them. Parsing is a pure function from
//! `(declared kind, optional property name, literal)` to `Option<Value>`;
//! an unrecognized leaf is a NoMatch (`None`), never an error, so callers
//! can retry other resolution paths.
//!
//! The submodules split the grammar by family:
//! - `parse`: dispatcher plus the scalar and list shapes
//! - `color`: hex, scRGB, bare-integer and named colors
//! - `path`: the compact path-geometry grammar
//! - `time`: TimeSpan, Duration and RepeatCount
//! - `cache`: LRU front for the expensive property-independent shapes

pub mod cache;
pub mod color;
pub mod parse;
pub mod path;
pub mod time;

pub use parse::parse_literal;

use crate::model::ObjectRef;
use std::fmt;
use std::rc::Rc;

/// An ARGB color with float channels in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Color { r, g, b, a }
    }

    /// Build from a packed 0xAARRGGBB word
    pub fn from_argb(argb: u32) -> Self {
        Color {
            a: ((argb >> 24) & 0xff) as f64 / 255.0,
            r: ((argb >> 16) & 0xff) as f64 / 255.0,
            g: ((argb >> 8) & 0xff) as f64 / 255.0,
            b: (argb & 0xff) as f64 / 255.0,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02X}{:02X}{:02X}{:02X}",
            (self.a * 255.0).round() as u8,
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

/// Box-model edge shorthand (margins, padding, border thickness)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Thickness {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Thickness {
    pub fn uniform(v: f64) -> Self {
        Thickness {
            left: v,
            top: v,
            right: v,
            bottom: v,
        }
    }
}

impl fmt::Display for Thickness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.left, self.top, self.right, self.bottom
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CornerRadius {
    pub top_left: f64,
    pub top_right: f64,
    pub bottom_right: f64,
    pub bottom_left: f64,
}

impl fmt::Display for CornerRadius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.top_left, self.top_right, self.bottom_right, self.bottom_left
        )
    }
}

/// A 2D affine transform. The 16-value form of the grammar folds the
/// 3D matrix down to its affine components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub m11: f64,
    pub m12: f64,
    pub m21: f64,
    pub m22: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        m11: 1.0,
        m12: 0.0,
        m21: 0.0,
        m22: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{}",
            self.m11, self.m12, self.m21, self.m22, self.offset_x, self.offset_y
        )
    }
}

/// Grid track sizing: fixed pixels, content-sized, or weighted star units
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridLength {
    Auto,
    Pixel(f64),
    Star(f64),
}

impl fmt::Display for GridLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridLength::Auto => write!(f, "Auto"),
            GridLength::Pixel(v) => write!(f, "{}", v),
            GridLength::Star(v) if *v == 1.0 => write!(f, "*"),
            GridLength::Star(v) => write!(f, "{}*", v),
        }
    }
}

/// A span of time in 100-nanosecond ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TimeSpan {
    pub ticks: i64,
}

impl TimeSpan {
    pub const TICKS_PER_SECOND: i64 = 10_000_000;

    pub fn from_seconds(seconds: f64) -> Self {
        TimeSpan {
            ticks: (seconds * Self::TICKS_PER_SECOND as f64) as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Duration {
    Automatic,
    Forever,
    Time(TimeSpan),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RepeatCount {
    /// `Nx`: repeat N times (fractional counts allowed)
    Count(f64),
    /// A timespan literal: repeat for that long
    Duration(TimeSpan),
    Forever,
}

/// One normalized segment of a path geometry. Relative commands and the
/// horizontal/vertical/smooth shorthands are resolved during parsing, so
/// every coordinate here is absolute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    Move(Point),
    Line(Point),
    Cubic(Point, Point, Point),
    Quadratic(Point, Point),
    Arc {
        radii: Point,
        rotation: f64,
        large_arc: bool,
        sweep: bool,
        end: Point,
    },
    Close,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathGeometry {
    pub segments: Vec<PathSegment>,
}

/// A compiled enum type: name plus its (variant, value) entries.
/// Lookup is case-insensitive, matching the markup convention.
#[derive(Debug, Clone, Copy)]
pub struct EnumTable {
    pub name: &'static str,
    pub entries: &'static [(&'static str, i32)],
}

impl EnumTable {
    pub fn lookup(&self, variant: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(variant))
            .map(|&(_, value)| value)
    }
}

/// The kind a property declares, driving literal parsing and the binder's
/// type check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int32,
    Double,
    String,
    Color,
    Point,
    Rect,
    Thickness,
    CornerRadius,
    DoubleList,
    PointList,
    PathGeometry,
    Matrix,
    GridLength,
    Duration,
    TimeSpan,
    RepeatCount,
    /// Object-typed: satisfied only by an element, never a literal
    Object,
}

/// A value in the output graph: an object handle, a primitive, or null
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Double(f64),
    String(String),
    Color(Color),
    Point(Point),
    Rect(Rect),
    Thickness(Thickness),
    CornerRadius(CornerRadius),
    DoubleList(Vec<f64>),
    PointList(Vec<Point>),
    PathGeometry(PathGeometry),
    Matrix(Matrix),
    GridLength(GridLength),
    Duration(Duration),
    TimeSpan(TimeSpan),
    RepeatCount(RepeatCount),
    Object(ObjectRef),
}

impl Value {
    /// The kind this value satisfies when the binder type-checks it
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Int32(_) => Some(ValueKind::Int32),
            Value::Double(_) => Some(ValueKind::Double),
            Value::String(_) => Some(ValueKind::String),
            Value::Color(_) => Some(ValueKind::Color),
            Value::Point(_) => Some(ValueKind::Point),
            Value::Rect(_) => Some(ValueKind::Rect),
            Value::Thickness(_) => Some(ValueKind::Thickness),
            Value::CornerRadius(_) => Some(ValueKind::CornerRadius),
            Value::DoubleList(_) => Some(ValueKind::DoubleList),
            Value::PointList(_) => Some(ValueKind::PointList),
            Value::PathGeometry(_) => Some(ValueKind::PathGeometry),
            Value::Matrix(_) => Some(ValueKind::Matrix),
            Value::GridLength(_) => Some(ValueKind::GridLength),
            Value::Duration(_) => Some(ValueKind::Duration),
            Value::TimeSpan(_) => Some(ValueKind::TimeSpan),
            Value::RepeatCount(_) => Some(ValueKind::RepeatCount),
            Value::Object(_) => Some(ValueKind::Object),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Color(a), Value::Color(b)) => a == b,
            (Value::Point(a), Value::Point(b)) => a == b,
            (Value::Rect(a), Value::Rect(b)) => a == b,
            (Value::Thickness(a), Value::Thickness(b)) => a == b,
            (Value::CornerRadius(a), Value::CornerRadius(b)) => a == b,
            (Value::DoubleList(a), Value::DoubleList(b)) => a == b,
            (Value::PointList(a), Value::PointList(b)) => a == b,
            (Value::PathGeometry(a), Value::PathGeometry(b)) => a == b,
            (Value::Matrix(a), Value::Matrix(b)) => a == b,
            (Value::GridLength(a), Value::GridLength(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::TimeSpan(a), Value::TimeSpan(b)) => a == b,
            (Value::RepeatCount(a), Value::RepeatCount(b)) => a == b,
            // Handle identity, not structural equality
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_argb() {
        let c = Color::from_argb(0xFF6495ED); // cornflowerblue
        assert!((c.a - 1.0).abs() < 1e-9);
        assert!((c.r - 100.0 / 255.0).abs() < 1e-9);
        assert_eq!(c.to_string(), "#FF6495ED");
    }

    #[test]
    fn test_gridlength_display() {
        assert_eq!(GridLength::Auto.to_string(), "Auto");
        assert_eq!(GridLength::Pixel(24.0).to_string(), "24");
        assert_eq!(GridLength::Star(1.0).to_string(), "*");
        assert_eq!(GridLength::Star(2.5).to_string(), "2.5*");
    }

    #[test]
    fn test_enum_table_lookup_is_case_insensitive() {
        static TABLE: EnumTable = EnumTable {
            name: "Visibility",
            entries: &[("Visible", 0), ("Collapsed", 1)],
        };
        assert_eq!(TABLE.lookup("collapsed"), Some(1));
        assert_eq!(TABLE.lookup("Hidden"), None);
    }

    #[test]
    fn test_nan_doubles_compare_equal() {
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Double(1.0), Value::Double(2.0));
    }
}
