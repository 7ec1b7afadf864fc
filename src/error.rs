//! Parse Error Reporting
//!
//! Structured errors for the markup compiler. The driver latches the first
//! error it sees into the parse context; every later callback is a no-op.
//! A compile therefore produces either a rooted value or exactly one error,
//! never both.

use std::fmt;

/// Error taxonomy for the compiler core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The tokenizer could not make sense of the byte stream
    MalformedMarkup,
    /// A prefix was used without a namespace binding in scope
    UnresolvedNamespace,
    /// No catalog entry or bridge object for a tag
    UnknownElement,
    /// No property of that name on the target type (or via the bridge)
    UnknownProperty,
    /// The same property was assigned twice on one element
    DuplicateAssignment,
    /// Attempted write to a read-only property
    ReadOnlyPropertyWrite,
    /// A literal did not parse as the declared property type
    InvalidAttributeValue,
    /// Two elements registered the same name in one scope
    DuplicateName,
    /// A reserved directive (Name/Key/Class) used where it is not legal
    IllegalDirectivePlacement,
    /// A deferred template body failed structural validation
    TemplateValidationFailure,
}

impl ErrorCode {
    /// Stable identifier string, used in Display output
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MalformedMarkup => "MalformedMarkup",
            ErrorCode::UnresolvedNamespace => "UnresolvedNamespace",
            ErrorCode::UnknownElement => "UnknownElement",
            ErrorCode::UnknownProperty => "UnknownProperty",
            ErrorCode::DuplicateAssignment => "DuplicateAssignment",
            ErrorCode::ReadOnlyPropertyWrite => "ReadOnlyPropertyWrite",
            ErrorCode::InvalidAttributeValue => "InvalidAttributeValue",
            ErrorCode::DuplicateName => "DuplicateName",
            ErrorCode::IllegalDirectivePlacement => "IllegalDirectivePlacement",
            ErrorCode::TemplateValidationFailure => "TemplateValidationFailure",
        }
    }
}

/// A structured compile error with source position.
///
/// Line and column are 1-based. `element` and `attribute` name the markup
/// construct being processed when the error latched, when known.
#[derive(Debug, Clone, PartialEq)]
pub struct XamlError {
    pub code: ErrorCode,
    pub message: String,
    /// 1-based source line number where the error occurred.
    pub line: usize,
    /// 1-based source column number where the error occurred.
    pub column: usize,
    /// Local name of the offending element, if known
    pub element: Option<String>,
    /// Name of the offending attribute, if known
    pub attribute: Option<String>,
}

impl XamlError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        XamlError {
            code,
            message: message.into(),
            line: 0,
            column: 0,
            element: None,
            attribute: None,
        }
    }

    /// Attach a source position derived from a byte offset
    pub fn at_offset(mut self, input: &[u8], offset: usize) -> Self {
        let (line, column) = line_column(input, offset);
        self.line = line;
        self.column = column;
        self
    }

    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

impl fmt::Display for XamlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}: {}",
            self.code.as_str(),
            self.line,
            self.column,
            self.message
        )?;
        if let Some(ref el) = self.element {
            write!(f, " (element {})", el)?;
        }
        if let Some(ref attr) = self.attribute {
            write!(f, " (attribute {})", attr)?;
        }
        Ok(())
    }
}

impl std::error::Error for XamlError {}

/// Compute 1-based (line, column) for a byte offset into the input.
///
/// Columns count bytes, not grapheme clusters; good enough for editor
/// jump-to-error on the ASCII-heavy markup this compiler sees.
pub fn line_column(input: &[u8], offset: usize) -> (usize, usize) {
    let offset = offset.min(input.len());
    let mut line = 1;
    let mut line_start = 0;
    for (i, &b) in input[..offset].iter().enumerate() {
        if b == b'\n' {
            line += 1;
            line_start = i + 1;
        }
    }
    (line, offset - line_start + 1)
}
