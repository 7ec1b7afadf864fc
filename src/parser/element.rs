//! Element instances
//!
//! The per-element parse state: what the tag resolved to, the object under
//! construction, the already-assigned property set, directive values and
//! accumulated text. Instances live on the driver's ownership stack; on
//! error the stack drops and every unrooted object is released with it.

use crate::catalog::TypeId;
use crate::model::ObjectRef;
use crate::value::{EnumTable, Value, ValueKind};
use std::collections::HashSet;

/// What a tag resolved to
#[derive(Debug, Clone, Copy)]
pub enum ResolvedKind {
    /// Primitive wrapper; the instance is built from flushed text
    ValueType(ValueKind),
    /// Ordinary catalog type
    GraphType(TypeId),
    /// Enum tag; flushed text resolves against the name table
    Enum(&'static EnumTable),
    /// Host-bridge object; the core never introspects past the handle
    Bridge,
}

#[derive(Debug)]
pub struct ElementInfo {
    /// Local tag name, without prefix
    pub local: String,
    pub kind: ResolvedKind,
    /// Text content is kept verbatim (primitive String)
    pub verbatim: bool,
}

/// Element vs `Owner.Property` property-element syntax
#[derive(Debug)]
pub enum InstanceKind {
    Element,
    PropertyElement {
        /// Resolved property token; None when the owner is bridge-typed
        token: Option<u16>,
        name: String,
    },
}

/// Tracks which property tokens have been assigned on one instance.
/// Tokens are catalog-global, so one bitset covers the inheritance chain.
#[derive(Debug, Default)]
pub struct AssignedSet {
    bits: Vec<u64>,
}

impl AssignedSet {
    pub fn with_capacity(tokens: usize) -> Self {
        AssignedSet {
            bits: vec![0; tokens.div_ceil(64)],
        }
    }

    /// Mark a token assigned. Returns false if it already was.
    pub fn insert(&mut self, token: u16) -> bool {
        let (word, bit) = (token as usize / 64, token as usize % 64);
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        if self.bits[word] & mask != 0 {
            return false;
        }
        self.bits[word] |= mask;
        true
    }

    pub fn contains(&self, token: u16) -> bool {
        let (word, bit) = (token as usize / 64, token as usize % 64);
        self.bits.get(word).is_some_and(|w| w & (1u64 << bit) != 0)
    }
}

pub struct ElementInstance {
    pub info: ElementInfo,
    pub kind: InstanceKind,
    /// The constructed object. None for value types and enums until text
    /// flush, and for property elements holding a single pending value.
    pub object: Option<ObjectRef>,
    pub assigned: AssignedSet,
    /// Names claimed through the bridge, for duplicate detection there
    pub bridge_assigned: HashSet<String>,
    pub name: Option<String>,
    pub key: Option<String>,
    /// Accumulated character data, flushed at close
    pub text: String,
    /// This property element holds the parent's spliced collection
    pub holds_spliced: bool,
    /// Dictionaries this element pushed onto the scope manager and must
    /// pop (or hand to its owner) when it closes
    pub pushed_dictionaries: usize,
    /// Pending single value for a non-collection property element
    pub pending_value: Option<Value>,
    /// Bridge-only assignments applied when the element closes
    pub delayed: Vec<(String, Value)>,
    /// Byte offset of the open tag, for error attribution
    pub open_offset: usize,
}

impl ElementInstance {
    /// `tokens` is the catalog's property count; the assigned bitset is
    /// sized to it up front.
    pub fn new(info: ElementInfo, kind: InstanceKind, open_offset: usize, tokens: usize) -> Self {
        ElementInstance {
            info,
            kind,
            object: None,
            assigned: AssignedSet::with_capacity(tokens),
            bridge_assigned: HashSet::new(),
            name: None,
            key: None,
            text: String::new(),
            holds_spliced: false,
            pushed_dictionaries: 0,
            pending_value: None,
            delayed: Vec::new(),
            open_offset,
        }
    }

    pub fn is_property_element(&self) -> bool {
        matches!(self.kind, InstanceKind::PropertyElement { .. })
    }

    pub fn is_value_type(&self) -> bool {
        matches!(self.info.kind, ResolvedKind::ValueType(_) | ResolvedKind::Enum(_))
    }

    pub fn type_id(&self) -> Option<TypeId> {
        match self.info.kind {
            ResolvedKind::GraphType(id) => Some(id),
            _ => None,
        }
    }
}
