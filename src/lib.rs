//! xaml-core - Streaming XAML-style markup compiler
//!
//! Compiles XML-shaped declarative UI markup into a strongly-typed object
//! graph in a single pass:
//! - SAX-style tokenizer over raw bytes (memchr-accelerated, zero-copy
//!   where the input allows)
//! - Namespace classification against a closed set of behaviors, with an
//!   open host-bridge escape hatch
//! - A type catalog driving element creation and property binding
//! - A value mini-language for attribute literals (colors, geometry,
//!   timing, grid lengths)
//! - Deferred capture of template bodies for later compilation
//!
//! The first error latches and halts the parse; a compile produces either
//! one rooted value or exactly one structured error.
//!
//! ```
//! use xaml_core::{compile_str, Value};
//!
//! let markup = r#"<Rectangle
//!     xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation"
//!     Width="10" Height="20"/>"#;
//! let root = compile_str(markup).unwrap();
//! assert!(matches!(root, Value::Object(_)));
//! ```

pub mod bridge;
pub mod catalog;
pub mod core;
pub mod error;
pub mod model;
pub mod parser;
pub mod value;

pub use bridge::{NullBridge, RuntimeBridge};
pub use catalog::{TypeCatalog, TypeId};
pub use error::{ErrorCode, XamlError};
pub use model::{Object, ObjectRef};
pub use parser::{Compiler, KeyedLookup};
pub use value::Value;

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Entry Points
// ============================================================================

/// Compile a markup document with default options
pub fn compile_str(input: &str) -> Result<Value, XamlError> {
    Compiler::new().compile_str(input)
}

/// Byte-slice variant of [`compile_str`]
pub fn compile_bytes(input: &[u8]) -> Result<Value, XamlError> {
    Compiler::new().compile_bytes(input)
}
