//! Markup Tokenizer - callback-based tokenization for the parse driver
//!
//! Walks the byte stream once and dispatches to a `MarkupHandler`:
//! start-namespace, start-element, character-data, end-element. Namespace
//! declarations (`xmlns`, `xmlns:p`) are stripped from the attribute list
//! and reported before their element. A self-closing tag produces a
//! start-element immediately followed by an end-element with the same
//! span.
//!
//! Each callback returns a continue flag; returning `false` halts the
//! scan. The handler side uses this to stop the tokenizer the moment its
//! error latch is set. The tokenizer also exposes `position()` so the
//! handler can translate callback spans into line/column.
//!
//! Comments, processing instructions and the XML declaration are skipped.
//! CDATA sections are reported as verbatim character data.

use super::entities::decode_text;
use super::scanner::Scanner;
use std::borrow::Cow;

/// A prefixed markup name, split at the colon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QName<'a> {
    pub prefix: Option<&'a str>,
    pub local: &'a str,
}

impl<'a> QName<'a> {
    fn split(name: &'a str) -> Self {
        match name.split_once(':') {
            Some((prefix, local)) => QName {
                prefix: Some(prefix),
                local,
            },
            None => QName {
                prefix: None,
                local: name,
            },
        }
    }
}

/// An attribute as it appears in the source, entities decoded
#[derive(Debug, Clone)]
pub struct RawAttribute<'a> {
    pub prefix: Option<&'a str>,
    pub local: &'a str,
    pub value: Cow<'a, str>,
    /// Byte offset of the attribute name, for error attribution
    pub offset: usize,
}

/// Receiver for tokenizer callbacks
///
/// All methods return `true` to continue the scan and `false` to halt it.
pub trait MarkupHandler {
    /// A namespace declaration on the upcoming element. `prefix` is None
    /// for the default namespace.
    fn start_namespace(&mut self, prefix: Option<&str>, uri: &str, offset: usize) -> bool;

    /// An element open tag. `tag_span` covers `<` through `>` inclusive.
    fn start_element(
        &mut self,
        name: &QName<'_>,
        attrs: &[RawAttribute<'_>],
        tag_span: (usize, usize),
    ) -> bool;

    /// Character data. `verbatim` is true for CDATA sections.
    fn characters(&mut self, text: &str, verbatim: bool, offset: usize) -> bool;

    /// An element close tag. `tag_span` covers `</` through `>` inclusive;
    /// for a self-closing tag it equals the start-element span.
    fn end_element(&mut self, name: &QName<'_>, tag_span: (usize, usize)) -> bool;

    /// The byte stream is not well-formed. The scan halts after this call.
    fn malformed(&mut self, message: &'static str, offset: usize);
}

/// Single-pass markup tokenizer
pub struct MarkupTokenizer<'a> {
    input: &'a [u8],
    scanner: Scanner<'a>,
}

impl<'a> MarkupTokenizer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        MarkupTokenizer {
            input,
            scanner: Scanner::new(input),
        }
    }

    /// Current byte offset into the input
    #[inline]
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Scan the whole input, dispatching to the handler. Returns early if
    /// any callback asks to halt or the input is malformed.
    pub fn run<H: MarkupHandler>(&mut self, handler: &mut H) {
        while !self.scanner.is_eof() {
            let keep_going = match self.scanner.peek() {
                Some(b'<') => self.scan_markup(handler),
                Some(_) => self.scan_text(handler),
                None => break,
            };
            if !keep_going {
                return;
            }
        }
    }

    /// Dispatch markup starting with '<'
    fn scan_markup<H: MarkupHandler>(&mut self, handler: &mut H) -> bool {
        let start = self.scanner.position();
        self.scanner.advance(1); // Skip '<'

        match self.scanner.peek() {
            Some(b'/') => {
                self.scanner.advance(1);
                self.scan_end_tag(handler, start)
            }
            Some(b'!') => {
                self.scanner.advance(1);
                if self.scanner.starts_with(b"--") {
                    self.scanner.advance(2);
                    self.skip_comment(handler, start)
                } else if self.scanner.starts_with(b"[CDATA[") {
                    self.scanner.advance(7);
                    self.scan_cdata(handler, start)
                } else {
                    // DOCTYPE or other declaration: skip to tag end
                    self.skip_to_tag_end(handler, start)
                }
            }
            Some(b'?') => {
                self.scanner.advance(1);
                self.skip_pi(handler, start)
            }
            Some(_) => self.scan_start_tag(handler, start),
            None => {
                handler.malformed("unexpected end of input after '<'", start);
                false
            }
        }
    }

    /// Scan a start tag (or self-closing tag), reporting namespace
    /// declarations first, then the element with its remaining attributes.
    fn scan_start_tag<H: MarkupHandler>(&mut self, handler: &mut H, start: usize) -> bool {
        let name = match self.read_name_str(handler) {
            Some(n) => n,
            None => return false,
        };

        let mut attrs: Vec<RawAttribute<'a>> = Vec::new();
        let mut is_empty = false;

        loop {
            self.scanner.skip_whitespace();
            match self.scanner.peek() {
                Some(b'>') => {
                    self.scanner.advance(1);
                    break;
                }
                Some(b'/') => {
                    self.scanner.advance(1);
                    if self.scanner.peek() == Some(b'>') {
                        self.scanner.advance(1);
                        is_empty = true;
                        break;
                    }
                    handler.malformed("expected '>' after '/'", self.scanner.position());
                    return false;
                }
                Some(_) => match self.scan_attribute(handler) {
                    Some(attr) => attrs.push(attr),
                    None => return false,
                },
                None => {
                    handler.malformed("unexpected end of input in tag", start);
                    return false;
                }
            }
        }

        let tag_span = (start, self.scanner.position());

        // Namespace declarations go out first, stripped from the list
        let mut element_attrs = Vec::with_capacity(attrs.len());
        for attr in attrs {
            let is_default_decl = attr.prefix.is_none() && attr.local == "xmlns";
            let is_prefixed_decl = attr.prefix == Some("xmlns");
            if is_default_decl || is_prefixed_decl {
                let prefix = if is_prefixed_decl {
                    Some(attr.local)
                } else {
                    None
                };
                if !handler.start_namespace(prefix, attr.value.as_ref(), attr.offset) {
                    return false;
                }
            } else {
                element_attrs.push(attr);
            }
        }

        let qname = QName::split(name);
        if !handler.start_element(&qname, &element_attrs, tag_span) {
            return false;
        }
        if is_empty && !handler.end_element(&qname, tag_span) {
            return false;
        }
        true
    }

    /// Scan one attribute: `name = "value"` with mandatory quotes
    fn scan_attribute<H: MarkupHandler>(&mut self, handler: &mut H) -> Option<RawAttribute<'a>> {
        let name_offset = self.scanner.position();
        let name = self.read_name_str(handler)?;

        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'=') {
            handler.malformed("expected '=' after attribute name", self.scanner.position());
            return None;
        }
        self.scanner.advance(1);
        self.scanner.skip_whitespace();

        let quote = match self.scanner.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => {
                handler.malformed("attribute value must be quoted", self.scanner.position());
                return None;
            }
        };
        self.scanner.advance(1);

        let value_start = self.scanner.position();
        let value_end = match self.scanner.find_byte(quote) {
            Some(pos) => pos,
            None => {
                handler.malformed("unterminated attribute value", value_start);
                return None;
            }
        };
        self.scanner.set_position(value_end + 1);

        let raw = self.scanner.slice(value_start, value_end);
        let value = match bytes_to_str(decode_text(raw)) {
            Some(v) => v,
            None => {
                handler.malformed("attribute value is not valid UTF-8", value_start);
                return None;
            }
        };

        let qname = QName::split(name);
        Some(RawAttribute {
            prefix: qname.prefix,
            local: qname.local,
            value,
            offset: name_offset,
        })
    }

    /// Scan an end tag
    fn scan_end_tag<H: MarkupHandler>(&mut self, handler: &mut H, start: usize) -> bool {
        let name = match self.read_name_str(handler) {
            Some(n) => n,
            None => return false,
        };
        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'>') {
            handler.malformed("expected '>' in end tag", self.scanner.position());
            return false;
        }
        self.scanner.advance(1);

        let qname = QName::split(name);
        handler.end_element(&qname, (start, self.scanner.position()))
    }

    /// Scan text content up to the next '<'
    fn scan_text<H: MarkupHandler>(&mut self, handler: &mut H) -> bool {
        let start = self.scanner.position();
        let end = self.scanner.find_tag_start().unwrap_or(self.input.len());
        self.scanner.set_position(end);

        let raw = self.scanner.slice(start, end);
        match bytes_to_str(decode_text(raw)) {
            Some(text) => handler.characters(text.as_ref(), false, start),
            None => {
                handler.malformed("text content is not valid UTF-8", start);
                false
            }
        }
    }

    /// Scan a CDATA section, reported as verbatim character data
    fn scan_cdata<H: MarkupHandler>(&mut self, handler: &mut H, start: usize) -> bool {
        let content_start = self.scanner.position();

        loop {
            match self.scanner.find_byte(b']') {
                Some(pos) => {
                    self.scanner.set_position(pos);
                    if self.scanner.starts_with(b"]]>") {
                        let raw = self.scanner.slice(content_start, pos);
                        self.scanner.advance(3);
                        return match std::str::from_utf8(raw) {
                            Ok(text) => handler.characters(text, true, content_start),
                            Err(_) => {
                                handler
                                    .malformed("CDATA content is not valid UTF-8", content_start);
                                false
                            }
                        };
                    }
                    self.scanner.advance(1);
                }
                None => {
                    handler.malformed("unterminated CDATA section", start);
                    return false;
                }
            }
        }
    }

    /// Skip a comment
    fn skip_comment<H: MarkupHandler>(&mut self, handler: &mut H, start: usize) -> bool {
        loop {
            match self.scanner.find_byte(b'-') {
                Some(pos) => {
                    self.scanner.set_position(pos);
                    if self.scanner.starts_with(b"-->") {
                        self.scanner.advance(3);
                        return true;
                    }
                    self.scanner.advance(1);
                }
                None => {
                    handler.malformed("unterminated comment", start);
                    return false;
                }
            }
        }
    }

    /// Skip a processing instruction or XML declaration
    fn skip_pi<H: MarkupHandler>(&mut self, handler: &mut H, start: usize) -> bool {
        loop {
            match self.scanner.find_byte(b'?') {
                Some(pos) => {
                    self.scanner.set_position(pos);
                    if self.scanner.peek_at(1) == Some(b'>') {
                        self.scanner.advance(2);
                        return true;
                    }
                    self.scanner.advance(1);
                }
                None => {
                    handler.malformed("unterminated processing instruction", start);
                    return false;
                }
            }
        }
    }

    /// Skip an uninteresting declaration to its closing '>'
    fn skip_to_tag_end<H: MarkupHandler>(&mut self, handler: &mut H, start: usize) -> bool {
        match self.scanner.find_tag_end_quoted() {
            Some(pos) => {
                self.scanner.set_position(pos + 1);
                true
            }
            None => {
                handler.malformed("unterminated markup declaration", start);
                false
            }
        }
    }

    /// Read a name and convert to &str, reporting malformed input
    fn read_name_str<H: MarkupHandler>(&mut self, handler: &mut H) -> Option<&'a str> {
        let offset = self.scanner.position();
        let raw = match self.scanner.read_name() {
            Some(r) => r,
            None => {
                handler.malformed("invalid name", offset);
                return None;
            }
        };
        match std::str::from_utf8(raw) {
            Ok(name) => Some(name),
            Err(_) => {
                handler.malformed("name is not valid UTF-8", offset);
                None
            }
        }
    }
}

/// Convert a possibly-owned byte Cow into a str Cow
fn bytes_to_str(bytes: Cow<'_, [u8]>) -> Option<Cow<'_, str>> {
    match bytes {
        Cow::Borrowed(b) => std::str::from_utf8(b).ok().map(Cow::Borrowed),
        Cow::Owned(v) => String::from_utf8(v).ok().map(Cow::Owned),
    }
}
