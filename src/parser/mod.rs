//! Markup Compilation
//!
//! Everything between the tokenizer callbacks and the finished object
//! graph: namespace classification, name and resource scoping, element
//! instances, property binding, deferred-region capture and the driver
//! that ties them together.

pub mod binder;
pub mod deferred;
pub mod driver;
pub mod element;
pub mod namespace;
pub mod scope;

pub use driver::Compiler;
pub use namespace::NamespaceKind;
pub use scope::KeyedLookup;
