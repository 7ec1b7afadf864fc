//! Namespace resolution
//!
//! Two halves: classifying a URI into one of the closed set of namespace
//! kinds, and a stack-based prefix table tracking which prefixes are bound
//! at the current element depth. Built-in kinds are zero-state; everything
//! a parse mutates lives in the per-parse `PrefixTable`.

use std::collections::HashSet;

/// Default presentation namespaces accepted for the built-in catalog
pub const PRESENTATION_2006: &str = "http://schemas.microsoft.com/winfx/2006/xaml/presentation";
pub const PRESENTATION_CLIENT_2007: &str = "http://schemas.microsoft.com/client/2007";
/// Directive namespace carrying Name/Key/Class
pub const DIRECTIVE: &str = "http://schemas.microsoft.com/winfx/2006/xaml";
/// The reserved xml: namespace (only `lang` is recognized)
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
/// Primitive wrapper tags: String, Int32, Double, Boolean, TimeSpan
pub const PRIMITIVE: &str = "clr-namespace:System;assembly=mscorlib";
/// Markup compatibility, carrying Ignorable
pub const COMPATIBILITY: &str =
    "http://schemas.openxmlformats.org/markup-compatibility/2006";

/// The closed set of namespace behaviors. Only Bridge is open-ended; it
/// delegates to the host runtime trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    /// Native catalog, enum heuristic, then the bridge
    Default,
    /// Reserved directive attributes (Name, Key, Class)
    Directive,
    /// xml: reserved namespace
    Xml,
    /// Literal wrapper tags for primitive values
    Primitive,
    /// Markup compatibility (Ignorable)
    Compatibility,
    /// Anything unrecognized; resolved through the host bridge
    Bridge,
}

impl NamespaceKind {
    pub fn classify(uri: &str) -> NamespaceKind {
        match uri {
            PRESENTATION_2006 | PRESENTATION_CLIENT_2007 => NamespaceKind::Default,
            DIRECTIVE => NamespaceKind::Directive,
            XML => NamespaceKind::Xml,
            PRIMITIVE => NamespaceKind::Primitive,
            COMPATIBILITY => NamespaceKind::Compatibility,
            _ => NamespaceKind::Bridge,
        }
    }
}

struct PrefixBinding {
    prefix: Option<String>,
    uri: String,
    depth: usize,
}

/// Prefix bindings tagged with the element depth that declared them.
/// Declarations arrive before their element's start event, so they are
/// recorded at `depth + 1` and popped when that element closes.
#[derive(Default)]
pub struct PrefixTable {
    bindings: Vec<PrefixBinding>,
    depth: usize,
    /// URIs marked Ignorable for the remainder of the document
    ignored: HashSet<String>,
}

impl PrefixTable {
    pub fn new() -> Self {
        PrefixTable::default()
    }

    /// Record a declaration for the element about to open
    pub fn declare(&mut self, prefix: Option<&str>, uri: &str) {
        self.bindings.push(PrefixBinding {
            prefix: prefix.map(str::to_string),
            uri: uri.to_string(),
            depth: self.depth + 1,
        });
    }

    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    pub fn pop_scope(&mut self) {
        let depth = self.depth;
        self.bindings.retain(|b| b.depth < depth);
        self.depth = self.depth.saturating_sub(1);
    }

    /// Resolve a prefix to its URI, innermost binding first. `None`
    /// resolves the default namespace. The `xml` prefix is bound by
    /// definition and needs no declaration.
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix.as_deref() == prefix)
            .map(|b| b.uri.as_str())
            .or(if prefix == Some("xml") { Some(XML) } else { None })
    }

    /// The URI a prefix is bound to, or `None` if unbound. Unprefixed
    /// names with no default declaration fall back to the catalog's
    /// default namespace.
    pub fn resolve_or_default(&self, prefix: Option<&str>) -> Option<&str> {
        match self.resolve(prefix) {
            Some(uri) => Some(uri),
            None if prefix.is_none() => Some(PRESENTATION_2006),
            None => None,
        }
    }

    pub fn mark_ignored(&mut self, uri: &str) {
        self.ignored.insert(uri.to_string());
    }

    pub fn is_ignored(&self, uri: &str) -> bool {
        self.ignored.contains(uri)
    }

    /// Bindings visible right now, for deferred-region capture
    pub fn snapshot(&self) -> Vec<(Option<String>, String)> {
        self.bindings
            .iter()
            .map(|b| (b.prefix.clone(), b.uri.clone()))
            .collect()
    }
}
