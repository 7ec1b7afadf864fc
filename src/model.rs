//! Reflective object model
//!
//! The output side of the compiler: property-bag objects addressed by the
//! catalog's property indices, with ordered collection content and keyed
//! dictionary entries. Handles are `Rc<RefCell<_>>`; parent links are weak
//! so a dropped root releases its whole subtree.
//!
//! Only the handle operations the parse driver and binder need are here.
//! Rendering, layout and change notification live in the host runtime,
//! behind the bridge.

use crate::catalog::TypeId;
use crate::parser::deferred::DeferredBody;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Shared handle to an object in the output graph
pub type ObjectRef = Rc<RefCell<Object>>;

#[derive(Debug, Default)]
pub struct Object {
    type_id: TypeId,
    /// Property slots keyed by the owning type's property index
    properties: HashMap<u16, Value>,
    /// Ordered collection content
    items: Vec<Value>,
    /// Keyed dictionary entries
    entries: HashMap<String, Value>,
    /// Registered markup name, if any
    name: Option<String>,
    /// `xml:lang` tag, if one was declared on the element
    language: Option<String>,
    /// Captured template body awaiting independent compilation
    deferred: Option<Rc<DeferredBody>>,
    parent: Weak<RefCell<Object>>,
}

impl Object {
    pub fn new(type_id: TypeId) -> ObjectRef {
        Rc::new(RefCell::new(Object {
            type_id,
            ..Default::default()
        }))
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn get_value(&self, property: u16) -> Option<Value> {
        self.properties.get(&property).cloned()
    }

    pub fn set_value(&mut self, property: u16, value: Value) {
        self.properties.insert(property, value);
    }

    /// Append to the ordered collection content
    pub fn add_item(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Insert a keyed entry. Returns false if the key is already present;
    /// the existing entry is left untouched.
    pub fn insert_entry(&mut self, key: &str, value: Value) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.to_string(), value);
        true
    }

    pub fn entry(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn set_language(&mut self, language: &str) {
        self.language = Some(language.to_string());
    }

    pub fn set_deferred_body(&mut self, body: DeferredBody) {
        self.deferred = Some(Rc::new(body));
    }

    pub fn deferred_body(&self) -> Option<Rc<DeferredBody>> {
        self.deferred.clone()
    }

    pub fn parent(&self) -> Option<ObjectRef> {
        self.parent.upgrade()
    }

    pub fn set_parent(&mut self, parent: &ObjectRef) {
        self.parent = Rc::downgrade(parent);
    }

    pub fn clear_parent(&mut self) {
        self.parent = Weak::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_roundtrip() {
        let obj = Object::new(TypeId(3));
        obj.borrow_mut().set_value(0, Value::Double(4.5));
        assert_eq!(obj.borrow().get_value(0), Some(Value::Double(4.5)));
        assert_eq!(obj.borrow().get_value(1), None);
    }

    #[test]
    fn test_collection_items_keep_order() {
        let obj = Object::new(TypeId(0));
        obj.borrow_mut().add_item(Value::Int32(1));
        obj.borrow_mut().add_item(Value::Int32(2));
        assert_eq!(
            obj.borrow().items(),
            &[Value::Int32(1), Value::Int32(2)]
        );
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let obj = Object::new(TypeId(0));
        assert!(obj.borrow_mut().insert_entry("k", Value::Int32(1)));
        assert!(!obj.borrow_mut().insert_entry("k", Value::Int32(2)));
        assert_eq!(obj.borrow().entry("k"), Some(Value::Int32(1)));
    }

    #[test]
    fn test_parent_is_weak() {
        let child = Object::new(TypeId(1));
        {
            let parent = Object::new(TypeId(0));
            child.borrow_mut().set_parent(&parent);
            assert!(child.borrow().parent().is_some());
        }
        // Parent dropped; the weak link does not keep it alive
        assert!(child.borrow().parent().is_none());
    }
}
