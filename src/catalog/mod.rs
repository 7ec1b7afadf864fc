//! Type/Element Catalog
//!
//! Maps tag names to type descriptors and property names to property
//! tokens. Each property registered anywhere in the catalog gets a unique
//! u16 token; object property bags and the binder's already-assigned
//! bitset are both keyed by token, so lookup never needs the inheritance
//! chain at assignment time.
//!
//! The built-in catalog is process-wide and read-only after first use
//! (`TypeCatalog::builtin`). Everything mutable is per-parse.

pub mod builtin;

use crate::model::{Object, ObjectRef};
use crate::value::{EnumTable, ValueKind};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Index into the catalog's type table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TypeId(pub u16);

/// Structural role of a type, driving the driver's content handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Ordinary element with properties and optional content
    Element,
    /// Ordered collection; child elements become items
    Collection,
    /// Keyed dictionary; child elements need a Key directive
    Dictionary,
    /// Template; content is captured as a deferred region, not built
    Template,
}

#[derive(Debug)]
pub struct TypeDescriptor {
    pub name: &'static str,
    pub id: TypeId,
    pub parent: Option<TypeId>,
    pub kind: TypeKind,
    /// Property receiving text/element content when no property element
    /// names one
    pub content_property: Option<&'static str>,
    /// Tokens of the properties this type declares itself
    property_tokens: Vec<u16>,
}

impl TypeDescriptor {
    #[inline]
    pub fn is_collection(&self) -> bool {
        self.kind == TypeKind::Collection
    }

    #[inline]
    pub fn is_dictionary(&self) -> bool {
        self.kind == TypeKind::Dictionary
    }

    /// Whether content under this element is buffered instead of built
    #[inline]
    pub fn defers_content(&self) -> bool {
        self.kind == TypeKind::Template
    }

    pub fn create_instance(&self) -> ObjectRef {
        Object::new(self.id)
    }
}

#[derive(Debug)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub owner: TypeId,
    pub kind: ValueKind,
    /// For Object-kind properties, the element type the slot accepts
    pub object_type: Option<TypeId>,
    pub read_only: bool,
    /// Enum type backing an Int32 property, for variant-name literals
    pub enum_table: Option<&'static EnumTable>,
}

#[derive(Debug, Default)]
pub struct TypeCatalog {
    types: Vec<TypeDescriptor>,
    by_name: HashMap<&'static str, TypeId>,
    properties: Vec<PropertyDescriptor>,
    enums: HashMap<&'static str, &'static EnumTable>,
}

impl TypeCatalog {
    /// The process-wide built-in catalog, initialized once
    pub fn builtin() -> &'static Arc<TypeCatalog> {
        static BUILTIN: OnceLock<Arc<TypeCatalog>> = OnceLock::new();
        BUILTIN.get_or_init(|| Arc::new(builtin::build()))
    }

    pub fn resolve_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.by_name.get(name).map(|&id| &self.types[id.0 as usize])
    }

    pub fn type_by_id(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.types.get(id.0 as usize)
    }

    pub fn property(&self, token: u16) -> Option<&PropertyDescriptor> {
        self.properties.get(token as usize)
    }

    /// Resolve a property name against a type, walking the inheritance
    /// chain from the type itself up
    pub fn property_by_name(&self, type_id: TypeId, name: &str) -> Option<u16> {
        let mut cursor = Some(type_id);
        while let Some(id) = cursor {
            let ty = self.type_by_id(id)?;
            for &token in &ty.property_tokens {
                if self.properties[token as usize].name == name {
                    return Some(token);
                }
            }
            cursor = ty.parent;
        }
        None
    }

    /// The token of the type's content property, inherited if not
    /// declared locally
    pub fn content_property(&self, type_id: TypeId) -> Option<u16> {
        let mut cursor = Some(type_id);
        while let Some(id) = cursor {
            let ty = self.type_by_id(id)?;
            if let Some(name) = ty.content_property {
                return self.property_by_name(id, name);
            }
            cursor = ty.parent;
        }
        None
    }

    pub fn is_subtype_of(&self, type_id: TypeId, ancestor: TypeId) -> bool {
        let mut cursor = Some(type_id);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.type_by_id(id).and_then(|ty| ty.parent);
        }
        false
    }

    pub fn enum_table(&self, name: &str) -> Option<&'static EnumTable> {
        self.enums.get(name).copied()
    }

    /// Total registered properties; sizes the binder's assigned bitset
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    // Registration, used by the built-in table (and tests)

    pub fn register_type(
        &mut self,
        name: &'static str,
        parent: Option<TypeId>,
        kind: TypeKind,
        content_property: Option<&'static str>,
    ) -> TypeId {
        let id = TypeId(self.types.len() as u16);
        self.types.push(TypeDescriptor {
            name,
            id,
            parent,
            kind,
            content_property,
            property_tokens: Vec::new(),
        });
        self.by_name.insert(name, id);
        id
    }

    pub fn register_property(
        &mut self,
        owner: TypeId,
        name: &'static str,
        kind: ValueKind,
    ) -> u16 {
        self.register_property_full(owner, name, kind, None, false, None)
    }

    pub fn register_property_full(
        &mut self,
        owner: TypeId,
        name: &'static str,
        kind: ValueKind,
        object_type: Option<TypeId>,
        read_only: bool,
        enum_table: Option<&'static EnumTable>,
    ) -> u16 {
        let token = self.properties.len() as u16;
        self.properties.push(PropertyDescriptor {
            name,
            owner,
            kind,
            object_type,
            read_only,
            enum_table,
        });
        self.types[owner.0 as usize].property_tokens.push(token);
        token
    }

    pub fn register_enum(&mut self, table: &'static EnumTable) {
        self.enums.insert(table.name, table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TypeCatalog {
        let mut catalog = TypeCatalog::default();
        let base = catalog.register_type("Base", None, TypeKind::Element, None);
        let derived = catalog.register_type("Derived", Some(base), TypeKind::Element, None);
        catalog.register_property(base, "Width", ValueKind::Double);
        catalog.register_property(derived, "Extra", ValueKind::Int32);
        catalog
    }

    #[test]
    fn test_property_lookup_walks_inheritance() {
        let catalog = sample();
        let derived = catalog.resolve_type("Derived").unwrap().id;
        let token = catalog.property_by_name(derived, "Width").unwrap();
        assert_eq!(catalog.property(token).unwrap().owner, TypeId(0));
        assert!(catalog.property_by_name(derived, "Extra").is_some());

        let base = catalog.resolve_type("Base").unwrap().id;
        // Subtype properties are not visible from the base
        assert_eq!(catalog.property_by_name(base, "Extra"), None);
    }

    #[test]
    fn test_subtype_check() {
        let catalog = sample();
        let base = catalog.resolve_type("Base").unwrap().id;
        let derived = catalog.resolve_type("Derived").unwrap().id;
        assert!(catalog.is_subtype_of(derived, base));
        assert!(catalog.is_subtype_of(base, base));
        assert!(!catalog.is_subtype_of(base, derived));
    }

    #[test]
    fn test_builtin_is_shared() {
        let a = TypeCatalog::builtin();
        let b = TypeCatalog::builtin();
        assert!(Arc::ptr_eq(a, b));
    }
}
