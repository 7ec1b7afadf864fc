//! Core tokenization primitives for the markup compiler
//!
//! The compiler proper (`crate::parser`) never touches raw bytes; it is
//! driven by callbacks from the tokenizer in this module:
//!
//! ```text
//! MarkupTokenizer ---> MarkupHandler (parse driver) ---> object graph
//! ```
//!
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: callback-based markup tokenizer with byte-offset query
//! - Entities: predefined entity decoding with Cow (zero-copy when possible)
//!
//! Every handler callback returns a continue flag so the driver can halt
//! the scan as soon as its error latch is set.

pub mod entities;
pub mod scanner;
pub mod tokenizer;

pub use scanner::Scanner;
pub use tokenizer::{MarkupHandler, MarkupTokenizer, QName, RawAttribute};
