//! Entity Decoding
//!
//! Decodes the five predefined entities (&lt; &gt; &amp; &quot; &apos;)
//! and numeric character references (&#123; &#x7B;) in text and attribute
//! values. Uses Cow for zero-copy when no entities are present.
//!
//! DTD-declared entities are out of scope; an unrecognized reference is
//! left in place verbatim.

use memchr::memchr;
use std::borrow::Cow;

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities are present (zero-copy),
/// Owned if entities were decoded.
#[inline]
pub fn decode_text(input: &[u8]) -> Cow<'_, [u8]> {
    if memchr(b'&', input).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

/// Decode all entity references in the input
pub fn decode_entities(input: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;

    while pos < input.len() {
        if let Some(amp_pos) = memchr(b'&', &input[pos..]) {
            // Copy everything before the entity
            result.extend_from_slice(&input[pos..pos + amp_pos]);
            pos += amp_pos;

            // Find the semicolon
            if let Some(semi_offset) = memchr(b';', &input[pos..]) {
                let entity = &input[pos + 1..pos + semi_offset];

                if let Some(decoded) = decode_entity(entity) {
                    result.extend_from_slice(decoded.as_bytes());
                    pos += semi_offset + 1;
                } else {
                    // Unknown entity, keep as-is
                    result.push(b'&');
                    pos += 1;
                }
            } else {
                // No semicolon found, keep the ampersand
                result.push(b'&');
                pos += 1;
            }
        } else {
            // No more entities, copy the rest
            result.extend_from_slice(&input[pos..]);
            break;
        }
    }

    result
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &[u8]) -> Option<String> {
    if entity.is_empty() {
        return None;
    }

    if entity[0] == b'#' {
        return decode_numeric_entity(&entity[1..]);
    }

    match entity {
        b"lt" => Some("<".to_string()),
        b"gt" => Some(">".to_string()),
        b"amp" => Some("&".to_string()),
        b"quot" => Some("\"".to_string()),
        b"apos" => Some("'".to_string()),
        _ => None,
    }
}

/// Decode a numeric character reference (after the '#')
fn decode_numeric_entity(digits: &[u8]) -> Option<String> {
    if digits.is_empty() {
        return None;
    }

    let value = if digits[0] == b'x' || digits[0] == b'X' {
        let hex = std::str::from_utf8(&digits[1..]).ok()?;
        u32::from_str_radix(hex, 16).ok()?
    } else {
        let dec = std::str::from_utf8(digits).ok()?;
        dec.parse::<u32>().ok()?
    };

    char::from_u32(value).map(|c| c.to_string())
}
