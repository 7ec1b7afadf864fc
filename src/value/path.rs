//! Path-geometry mini-grammar
//!
//! `M/L/H/V/C/S/Q/T/A/Z` commands with upper-case absolute and lower-case
//! relative forms. Output segments are normalized: relative coordinates,
//! the horizontal/vertical shorthands and the smooth control-point
//! mirrors are all resolved to absolute `Move`/`Line`/`Cubic`/
//! `Quadratic`/`Arc`/`Close` segments.
//!
//! Smooth variants (`S`/`T`) reflect the previous control point across the
//! current point, but only across consecutive commands of the same family;
//! after any other command the reflected point collapses to the current
//! point.

use super::{PathGeometry, PathSegment, Point};

struct PathScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PathScanner<'a> {
    fn new(data: &'a str) -> Self {
        PathScanner {
            bytes: data.as_bytes(),
            pos: 0,
        }
    }

    fn skip_separators(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b',' || b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Next command letter, if the next token is one
    fn next_command(&mut self) -> Option<u8> {
        self.skip_separators();
        let b = *self.bytes.get(self.pos)?;
        if b.is_ascii_alphabetic() {
            self.pos += 1;
            Some(b)
        } else {
            None
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_separators();
        self.pos >= self.bytes.len()
    }

    /// Whether a number token (not a command letter) comes next
    fn number_follows(&mut self) -> bool {
        self.skip_separators();
        matches!(
            self.bytes.get(self.pos),
            Some(b'0'..=b'9' | b'-' | b'+' | b'.')
        )
    }

    fn read_number(&mut self) -> Option<f64> {
        self.skip_separators();
        let start = self.pos;
        if matches!(self.bytes.get(self.pos), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        while matches!(self.bytes.get(self.pos), Some(b'0'..=b'9' | b'.')) {
            self.pos += 1;
        }
        if matches!(self.bytes.get(self.pos), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.bytes.get(self.pos), Some(b'-' | b'+')) {
                self.pos += 1;
            }
            while matches!(self.bytes.get(self.pos), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if self.pos == start {
            return None;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }

    /// Arc flags are single `0`/`1` digits and may run together with the
    /// following number
    fn read_flag(&mut self) -> Option<bool> {
        self.skip_separators();
        match self.bytes.get(self.pos) {
            Some(b'0') => {
                self.pos += 1;
                Some(false)
            }
            Some(b'1') => {
                self.pos += 1;
                Some(true)
            }
            _ => None,
        }
    }
}

/// Which command family produced the previous segment, for smooth
/// control-point mirroring
#[derive(PartialEq, Clone, Copy)]
enum Family {
    Cubic,
    Quadratic,
    Other,
}

/// Parse a path-data literal into normalized absolute segments.
/// Returns None for an unknown command letter or a malformed number.
pub fn parse_path(data: &str) -> Option<PathGeometry> {
    let mut scanner = PathScanner::new(data);
    let mut segments = Vec::new();

    let mut current = Point::default();
    let mut subpath_start = Point::default();
    let mut last_family = Family::Other;
    // Second control point of the last cubic / control point of the last
    // quadratic, for the smooth variants
    let mut last_control = Point::default();

    while !scanner.at_end() {
        let command = scanner.next_command()?;
        let relative = command.is_ascii_lowercase();

        // Resolve a coordinate pair against the current point
        macro_rules! point {
            () => {{
                let x = scanner.read_number()?;
                let y = scanner.read_number()?;
                if relative {
                    Point::new(current.x + x, current.y + y)
                } else {
                    Point::new(x, y)
                }
            }};
        }

        match command.to_ascii_uppercase() {
            b'M' => {
                let p = point!();
                segments.push(PathSegment::Move(p));
                current = p;
                subpath_start = p;
                // Extra pairs after a move are implicit line-tos
                while scanner.number_follows() {
                    let p = point!();
                    segments.push(PathSegment::Line(p));
                    current = p;
                }
                last_family = Family::Other;
            }
            b'L' => {
                loop {
                    let p = point!();
                    segments.push(PathSegment::Line(p));
                    current = p;
                    if !scanner.number_follows() {
                        break;
                    }
                }
                last_family = Family::Other;
            }
            b'H' => {
                loop {
                    let x = scanner.read_number()?;
                    let p = if relative {
                        Point::new(current.x + x, current.y)
                    } else {
                        Point::new(x, current.y)
                    };
                    segments.push(PathSegment::Line(p));
                    current = p;
                    if !scanner.number_follows() {
                        break;
                    }
                }
                last_family = Family::Other;
            }
            b'V' => {
                loop {
                    let y = scanner.read_number()?;
                    let p = if relative {
                        Point::new(current.x, current.y + y)
                    } else {
                        Point::new(current.x, y)
                    };
                    segments.push(PathSegment::Line(p));
                    current = p;
                    if !scanner.number_follows() {
                        break;
                    }
                }
                last_family = Family::Other;
            }
            b'C' => {
                loop {
                    let c1 = point!();
                    let c2 = point!();
                    let end = point!();
                    segments.push(PathSegment::Cubic(c1, c2, end));
                    last_control = c2;
                    current = end;
                    if !scanner.number_follows() {
                        break;
                    }
                }
                last_family = Family::Cubic;
            }
            b'S' => {
                loop {
                    let c1 = if last_family == Family::Cubic {
                        reflect(last_control, current)
                    } else {
                        current
                    };
                    let c2 = point!();
                    let end = point!();
                    segments.push(PathSegment::Cubic(c1, c2, end));
                    last_control = c2;
                    current = end;
                    // Consecutive smooth segments keep mirroring
                    last_family = Family::Cubic;
                    if !scanner.number_follows() {
                        break;
                    }
                }
            }
            b'Q' => {
                loop {
                    let c = point!();
                    let end = point!();
                    segments.push(PathSegment::Quadratic(c, end));
                    last_control = c;
                    current = end;
                    if !scanner.number_follows() {
                        break;
                    }
                }
                last_family = Family::Quadratic;
            }
            b'T' => {
                loop {
                    let c = if last_family == Family::Quadratic {
                        reflect(last_control, current)
                    } else {
                        current
                    };
                    let end = point!();
                    segments.push(PathSegment::Quadratic(c, end));
                    last_control = c;
                    current = end;
                    last_family = Family::Quadratic;
                    if !scanner.number_follows() {
                        break;
                    }
                }
            }
            b'A' => {
                loop {
                    let rx = scanner.read_number()?;
                    let ry = scanner.read_number()?;
                    let rotation = scanner.read_number()?;
                    let large_arc = scanner.read_flag()?;
                    let sweep = scanner.read_flag()?;
                    let end = point!();
                    segments.push(PathSegment::Arc {
                        radii: Point::new(rx, ry),
                        rotation,
                        large_arc,
                        sweep,
                        end,
                    });
                    current = end;
                    if !scanner.number_follows() {
                        break;
                    }
                }
                last_family = Family::Other;
            }
            b'Z' => {
                segments.push(PathSegment::Close);
                current = subpath_start;
                last_family = Family::Other;
            }
            _ => return None,
        }
    }

    if segments.is_empty() {
        return None;
    }
    Some(PathGeometry { segments })
}

/// Reflect `control` across `origin`
#[inline]
fn reflect(control: Point, origin: Point) -> Point {
    Point::new(2.0 * origin.x - control.x, 2.0 * origin.y - control.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_line_close() {
        let g = parse_path("M 10,10 L 90,10 90,90 Z").unwrap();
        assert_eq!(
            g.segments,
            vec![
                PathSegment::Move(Point::new(10.0, 10.0)),
                PathSegment::Line(Point::new(90.0, 10.0)),
                PathSegment::Line(Point::new(90.0, 90.0)),
                PathSegment::Close,
            ]
        );
    }

    #[test]
    fn test_relative_commands() {
        let g = parse_path("m 10,10 l 5,0 v 5 h -5").unwrap();
        assert_eq!(
            g.segments,
            vec![
                PathSegment::Move(Point::new(10.0, 10.0)),
                PathSegment::Line(Point::new(15.0, 10.0)),
                PathSegment::Line(Point::new(15.0, 15.0)),
                PathSegment::Line(Point::new(10.0, 15.0)),
            ]
        );
    }

    #[test]
    fn test_horizontal_vertical_absolute() {
        let g = parse_path("M 1,2 H 10 V 20").unwrap();
        assert_eq!(g.segments[1], PathSegment::Line(Point::new(10.0, 2.0)));
        assert_eq!(g.segments[2], PathSegment::Line(Point::new(10.0, 20.0)));
    }

    #[test]
    fn test_smooth_cubic_mirrors_previous_control() {
        let g = parse_path("M 0,0 C 10,20 30,20 40,0 S 70,-20 80,0").unwrap();
        // Mirror of (30,20) across (40,0) is (50,-20)
        assert_eq!(
            g.segments[2],
            PathSegment::Cubic(
                Point::new(50.0, -20.0),
                Point::new(70.0, -20.0),
                Point::new(80.0, 0.0)
            )
        );
    }

    #[test]
    fn test_smooth_after_other_family_collapses() {
        // S after a line has no cubic to mirror; control is the current point
        let g = parse_path("M 0,0 L 40,0 S 70,20 80,0").unwrap();
        assert_eq!(
            g.segments[2],
            PathSegment::Cubic(
                Point::new(40.0, 0.0),
                Point::new(70.0, 20.0),
                Point::new(80.0, 0.0)
            )
        );
    }

    #[test]
    fn test_smooth_quadratic_chain() {
        let g = parse_path("M 0,0 Q 10,20 20,0 T 40,0").unwrap();
        // Mirror of (10,20) across (20,0) is (30,-20)
        assert_eq!(
            g.segments[2],
            PathSegment::Quadratic(Point::new(30.0, -20.0), Point::new(40.0, 0.0))
        );
    }

    #[test]
    fn test_arc_flags() {
        let g = parse_path("M 0,0 A 25,25 0 1 0 50,0").unwrap();
        assert_eq!(
            g.segments[1],
            PathSegment::Arc {
                radii: Point::new(25.0, 25.0),
                rotation: 0.0,
                large_arc: true,
                sweep: false,
                end: Point::new(50.0, 0.0),
            }
        );
    }

    #[test]
    fn test_implicit_lineto_after_move() {
        let g = parse_path("M 0,0 10,10 20,20").unwrap();
        assert_eq!(g.segments.len(), 3);
        assert_eq!(g.segments[1], PathSegment::Line(Point::new(10.0, 10.0)));
    }

    #[test]
    fn test_unknown_command_is_nomatch() {
        assert_eq!(parse_path("M 0,0 X 1,1"), None);
        assert_eq!(parse_path(""), None);
        assert_eq!(parse_path("M 0"), None);
    }
}
