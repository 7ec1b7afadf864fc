//! Color literal grammar
//!
//! Four forms, tried in order:
//! - `#rgb`, `#argb`, `#rrggbb`, `#aarrggbb` hex, with relaxed web-style
//!   tolerance for malformed digits (they read as zero)
//! - `sc#[a,]r,g,b` scRGB float channels, clamped to [0,1] and folded
//!   through an approximate gamma curve to sRGB
//! - a bare decimal integer, read as a packed 0xAARRGGBB word
//! - a named color from the standard palette, case-insensitive

use super::parse::split_doubles;
use super::Color;

/// Parse a color literal. Returns None if no form matches.
pub fn parse_color(literal: &str) -> Option<Color> {
    let bytes = literal.as_bytes();

    if bytes.first() == Some(&b'#') {
        return Some(parse_hex(&literal[1..]));
    }

    if let Some(channels) = literal.strip_prefix("sc#") {
        return Some(parse_scrgb(channels));
    }

    if bytes.first().is_some_and(|b| b.is_ascii_digit()) {
        let packed = literal.parse::<u32>().ok()?;
        return Some(Color::from_argb(packed));
    }

    lookup_named(literal)
}

/// Relaxed hex parsing: missing channels default to FF, malformed hex
/// digits read as zero
fn parse_hex(hex: &str) -> Color {
    let b = hex.as_bytes();
    let pair = |i: usize| -> f64 {
        let hi = b.get(i).copied().map_or(0, hex_digit);
        let lo = b.get(i + 1).copied().map_or(0, hex_digit);
        (hi * 16 + lo) as f64 / 255.0
    };
    let single = |i: usize| -> f64 {
        let d = b.get(i).copied().map_or(0, hex_digit);
        (d * 16 + d) as f64 / 255.0
    };

    if b.len() >= 8 {
        Color::new(pair(2), pair(4), pair(6), pair(0))
    } else if b.len() >= 6 {
        Color::new(pair(0), pair(2), pair(4), 1.0)
    } else if b.len() >= 4 {
        Color::new(single(1), single(2), single(3), single(0))
    } else if b.len() == 3 {
        Color::new(single(0), single(1), single(2), 1.0)
    } else {
        Color::new(1.0, 1.0, 1.0, 1.0)
    }
}

fn hex_digit(b: u8) -> u32 {
    (b as char).to_digit(16).unwrap_or(0)
}

/// scRGB channels: 3 values are r,g,b with alpha 1; 4 or more are a,r,g,b.
/// Negative channels ("darker than black") clamp to zero. The gamma fold
/// approximates the scRGB to sRGB band shaping.
fn parse_scrgb(channels: &str) -> Color {
    let mut a = 1.0;
    let mut r = 1.0;
    let mut g = 1.0;
    let mut b = 1.0;

    if let Some(values) = split_doubles(channels) {
        let offset = if values.len() >= 4 {
            a = values[0];
            1
        } else {
            0
        };
        if values.len() >= 3 {
            r = values[offset];
            g = values[offset + 1];
            b = values[offset + 2];
        }
    }

    let clamp = |v: f64| v.clamp(0.0, 1.0);
    Color::new(
        clamp(r).powf(0.4545),
        clamp(g).powf(0.46),
        clamp(b).powf(0.4545),
        clamp(a),
    )
}

fn lookup_named(name: &str) -> Option<Color> {
    let lowered = name.to_ascii_lowercase();
    NAMED_COLORS
        .binary_search_by_key(&lowered.as_str(), |&(n, _)| n)
        .ok()
        .map(|i| Color::from_argb(NAMED_COLORS[i].1))
}

/// The standard named palette, sorted for binary search
static NAMED_COLORS: &[(&str, u32)] = &[
    ("aliceblue", 0xFFF7FBFF),
    ("antiquewhite", 0xFFFAEBD7),
    ("aqua", 0xFF00FFFF),
    ("aquamarine", 0xFF7FFFD4),
    ("azure", 0xFFF7FFFF),
    ("beige", 0xFFF5F5DC),
    ("bisque", 0xFFFFE4C4),
    ("black", 0xFF000000),
    ("blanchedalmond", 0xFFFFEBCD),
    ("blue", 0xFF0000FF),
    ("blueviolet", 0xFF8A2BE2),
    ("brown", 0xFFA52A2A),
    ("burlywood", 0xFFDEB887),
    ("cadetblue", 0xFF5F9EA0),
    ("chartreuse", 0xFF7FFF00),
    ("chocolate", 0xFFD2691E),
    ("coral", 0xFFFF7F50),
    ("cornflowerblue", 0xFF6495ED),
    ("cornsilk", 0xFFFFF8DC),
    ("crimson", 0xFFDC143C),
    ("cyan", 0xFF00FFFF),
    ("darkblue", 0xFF00008B),
    ("darkcyan", 0xFF008B8B),
    ("darkgoldenrod", 0xFFB8860B),
    ("darkgray", 0xFFA9A9A9),
    ("darkgreen", 0xFF006400),
    ("darkkhaki", 0xFFBDB76B),
    ("darkmagenta", 0xFF8B008B),
    ("darkolivegreen", 0xFF556B2F),
    ("darkorange", 0xFFFF8C00),
    ("darkorchid", 0xFF9932CC),
    ("darkred", 0xFF8B0000),
    ("darksalmon", 0xFFE9967A),
    ("darkseagreen", 0xFF8FBC8B),
    ("darkslateblue", 0xFF483D8B),
    ("darkslategray", 0xFF2F4F4F),
    ("darkturquoise", 0xFF00CED1),
    ("darkviolet", 0xFF9400D3),
    ("deeppink", 0xFFFF1493),
    ("deepskyblue", 0xFF00BFFF),
    ("dimgray", 0xFF696969),
    ("dodgerblue", 0xFF1E90FF),
    ("firebrick", 0xFFB22222),
    ("floralwhite", 0xFFFFFBF7),
    ("forestgreen", 0xFF228B22),
    ("fuchsia", 0xFFFF00FF),
    ("gainsboro", 0xFFDCDCDC),
    ("ghostwhite", 0xFFF8F8FF),
    ("gold", 0xFFFFD700),
    ("goldenrod", 0xFFDAA520),
    ("gray", 0xFF808080),
    ("green", 0xFF008000),
    ("greenyellow", 0xFFADFF2F),
    ("honeydew", 0xFFF0FFF0),
    ("hotpink", 0xFFFF69B4),
    ("indianred", 0xFFCD5C5C),
    ("indigo", 0xFF4B0082),
    ("ivory", 0xFFFFFFF7),
    ("khaki", 0xFFF0E68C),
    ("lavender", 0xFFE6E6FA),
    ("lavenderblush", 0xFFFFF0F5),
    ("lawngreen", 0xFF7CFC00),
    ("lemonchiffon", 0xFFFFFACD),
    ("lightblue", 0xFFADD8E6),
    ("lightcoral", 0xFFF08080),
    ("lightcyan", 0xFFE0FFFF),
    ("lightgoldenrodyellow", 0xFFFAFAD2),
    ("lightgray", 0xFFD3D3D3),
    ("lightgreen", 0xFF90EE90),
    ("lightpink", 0xFFFFB6C1),
    ("lightsalmon", 0xFFFFA07A),
    ("lightseagreen", 0xFF20B2AA),
    ("lightskyblue", 0xFF87CEFA),
    ("lightslategray", 0xFF778899),
    ("lightsteelblue", 0xFFB0C4DE),
    ("lightyellow", 0xFFFFFFE0),
    ("lime", 0xFF00FF00),
    ("limegreen", 0xFF32CD32),
    ("linen", 0xFFFAF0E6),
    ("magenta", 0xFFFF00FF),
    ("maroon", 0xFF800000),
    ("mediumaquamarine", 0xFF66CDAA),
    ("mediumblue", 0xFF0000CD),
    ("mediumorchid", 0xFFBA55D3),
    ("mediumpurple", 0xFF9370DB),
    ("mediumseagreen", 0xFF3CB371),
    ("mediumslateblue", 0xFF7B68EE),
    ("mediumspringgreen", 0xFF00FA9A),
    ("mediumturquoise", 0xFF48D1CC),
    ("mediumvioletred", 0xFFC71585),
    ("midnightblue", 0xFF191970),
    ("mintcream", 0xFFF7FFFF),
    ("mistyrose", 0xFFFFE4E1),
    ("moccasin", 0xFFFFE4B5),
    ("navajowhite", 0xFFFFDEAD),
    ("navy", 0xFF000080),
    ("oldlace", 0xFFFDF5E6),
    ("olive", 0xFF808000),
    ("olivedrab", 0xFF6B8E23),
    ("orange", 0xFFFFA500),
    ("orangered", 0xFFFF4500),
    ("orchid", 0xFFDA70D6),
    ("palegoldenrod", 0xFFEEE8AA),
    ("palegreen", 0xFF98FB98),
    ("paleturquoise", 0xFFAFEEEE),
    ("palevioletred", 0xFFDB7093),
    ("papayawhip", 0xFFFFEFD5),
    ("peachpuff", 0xFFFFDAB9),
    ("peru", 0xFFCD853F),
    ("pink", 0xFFFFC0CB),
    ("plum", 0xFFDDA0DD),
    ("powderblue", 0xFFB0E0E6),
    ("purple", 0xFF800080),
    ("red", 0xFFFF0000),
    ("rosybrown", 0xFFBC8F8F),
    ("royalblue", 0xFF4169E1),
    ("saddlebrown", 0xFF8B4513),
    ("salmon", 0xFFFA8072),
    ("sandybrown", 0xFFF4A460),
    ("seagreen", 0xFF2E8B57),
    ("seashell", 0xFFFFF5EE),
    ("sienna", 0xFFA0522D),
    ("silver", 0xFFC0C0C0),
    ("skyblue", 0xFF87CEEB),
    ("slateblue", 0xFF6A5ACD),
    ("slategray", 0xFF708090),
    ("snow", 0xFFFFFAFA),
    ("springgreen", 0xFF00FF7F),
    ("steelblue", 0xFF4682B4),
    ("tan", 0xFFD2B48C),
    ("teal", 0xFF008080),
    ("thistle", 0xFFD8BFD8),
    ("tomato", 0xFFFF6347),
    ("transparent", 0x00FFFFFF),
    ("turquoise", 0xFF40E0D0),
    ("violet", 0xFFEE82EE),
    ("wheat", 0xFFF5DEB3),
    ("white", 0xFFFFFFFF),
    ("whitesmoke", 0xFFF5F5F5),
    ("yellow", 0xFFFFFF00),
    ("yellowgreen", 0xFF9ACD32),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_colors_sorted() {
        for pair in NAMED_COLORS.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} out of order", pair[1].0);
        }
    }

    #[test]
    fn test_named_lookup() {
        assert_eq!(
            parse_color("CornflowerBlue"),
            Some(Color::from_argb(0xFF6495ED))
        );
        assert_eq!(parse_color("transparent"), Some(Color::from_argb(0x00FFFFFF)));
        assert_eq!(parse_color("notacolor"), None);
    }

    #[test]
    fn test_hex_full_forms() {
        assert_eq!(parse_color("#FF0000"), Some(Color::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(
            parse_color("#80FF0000"),
            Some(Color::new(1.0, 0.0, 0.0, 128.0 / 255.0))
        );
    }

    #[test]
    fn test_hex_short_forms() {
        // #rgb doubles each digit
        assert_eq!(parse_color("#F00"), Some(Color::new(1.0, 0.0, 0.0, 1.0)));
        // #argb
        let c = parse_color("#8F00").unwrap();
        assert!((c.a - 136.0 / 255.0).abs() < 1e-9);
        assert!((c.r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_hex_tolerates_garbage() {
        // Bad digits read as zero rather than failing
        let c = parse_color("#GG0000").unwrap();
        assert_eq!(c, Color::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_scrgb_clamps_and_folds() {
        let c = parse_color("sc# 1.0, 0.0, 0.0").unwrap();
        assert!((c.r - 1.0).abs() < 1e-9);
        assert!((c.g - 0.0).abs() < 1e-9);
        assert!((c.a - 1.0).abs() < 1e-9);

        // Negative channels clamp to black
        let c = parse_color("sc# -0.5, -0.5, -0.5").unwrap();
        assert_eq!((c.r, c.g, c.b), (0.0, 0.0, 0.0));

        // Four channels lead with alpha
        let c = parse_color("sc#0.5,1,1,1").unwrap();
        assert!((c.a - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_bare_integer() {
        assert_eq!(
            parse_color("4294901760"), // 0xFFFF0000
            Some(Color::new(1.0, 0.0, 0.0, 1.0))
        );
    }
}
