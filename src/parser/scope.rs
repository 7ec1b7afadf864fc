//! Name and resource scopes
//!
//! Name scopes guarantee unique element names for later lookup. One scope
//! exists per document; provisional scopes (`push_provisional` /
//! `merge_provisional` / `discard_provisional`) cover subtrees whose
//! logical parent is not yet known and are merged (atomically) or
//! discarded when it is. The main parse never opens one: a template body
//! is captured verbatim, not compiled, so its names only exist when a
//! host recompiles the captured [`DeferredBody`](crate::parser::deferred::DeferredBody)
//! and merges the resulting scope into the instantiation site's document
//! scope. Keyed resource lookup walks the open dictionaries innermost to
//! outermost, then the caller's resource chain, then a global dictionary.

use crate::model::ObjectRef;
use crate::value::Value;
use std::collections::HashMap;

/// External keyed dictionaries (resource chain, global resources)
pub trait KeyedLookup {
    fn lookup(&self, key: &str) -> Option<Value>;
}

#[derive(Default)]
pub struct NameScope {
    names: HashMap<String, ObjectRef>,
}

impl NameScope {
    pub fn new() -> Self {
        NameScope::default()
    }

    /// Register a name. Fails on collision, leaving the scope unchanged.
    pub fn register(&mut self, name: &str, object: ObjectRef) -> Result<(), ()> {
        if self.names.contains_key(name) {
            return Err(());
        }
        self.names.insert(name.to_string(), object);
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<ObjectRef> {
        self.names.get(name).cloned()
    }

    /// Merge a provisional child scope into this one. Atomic: on any
    /// collision nothing is copied and the colliding name is returned.
    pub fn merge_temporary(&mut self, child: NameScope) -> Result<(), String> {
        if let Some(collision) = child.names.keys().find(|k| self.names.contains_key(*k)) {
            return Err(collision.clone());
        }
        self.names.extend(child.names);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Per-parse scope state: the name-scope stack plus the stack of open
/// resource dictionaries for keyed lookup.
#[derive(Default)]
pub struct ScopeManager {
    scopes: Vec<NameScope>,
    dictionaries: Vec<ObjectRef>,
}

impl ScopeManager {
    pub fn new() -> Self {
        ScopeManager {
            scopes: vec![NameScope::new()],
            dictionaries: Vec::new(),
        }
    }

    /// Register into the innermost scope
    pub fn register(&mut self, name: &str, object: ObjectRef) -> Result<(), ()> {
        match self.scopes.last_mut() {
            Some(scope) => scope.register(name, object),
            None => Err(()),
        }
    }

    pub fn find_name(&self, name: &str) -> Option<ObjectRef> {
        self.scopes.iter().rev().find_map(|s| s.find(name))
    }

    /// Open a provisional scope for a subtree with an unknown parent
    pub fn push_provisional(&mut self) {
        self.scopes.push(NameScope::new());
    }

    /// Merge the innermost provisional scope into its parent. Returns the
    /// colliding name on failure; the provisional scope is consumed either
    /// way.
    pub fn merge_provisional(&mut self) -> Result<(), String> {
        if self.scopes.len() < 2 {
            return Ok(());
        }
        let child = match self.scopes.pop() {
            Some(scope) => scope,
            None => return Ok(()),
        };
        match self.scopes.last_mut() {
            Some(parent) => parent.merge_temporary(child),
            None => Ok(()),
        }
    }

    /// Discard the innermost provisional scope
    pub fn discard_provisional(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn push_dictionary(&mut self, dictionary: ObjectRef) {
        self.dictionaries.push(dictionary);
    }

    pub fn pop_dictionary(&mut self) {
        self.dictionaries.pop();
    }

    /// Keyed lookup: open dictionaries innermost first, then the resource
    /// chain, then the global dictionary.
    pub fn find_key(
        &self,
        key: &str,
        chain: Option<&dyn KeyedLookup>,
        global: Option<&dyn KeyedLookup>,
    ) -> Option<Value> {
        for dictionary in self.dictionaries.iter().rev() {
            if let Some(value) = dictionary.borrow().entry(key) {
                return Some(value);
            }
        }
        if let Some(found) = chain.and_then(|c| c.lookup(key)) {
            return Some(found);
        }
        global.and_then(|g| g.lookup(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TypeId;
    use crate::model::Object;

    #[test]
    fn test_duplicate_name_rejected() {
        let mut scope = NameScope::new();
        assert!(scope.register("a", Object::new(TypeId(0))).is_ok());
        assert!(scope.register("a", Object::new(TypeId(0))).is_err());
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn test_merge_collision_is_atomic() {
        let mut parent = NameScope::new();
        parent.register("shared", Object::new(TypeId(0))).unwrap();

        let mut child = NameScope::new();
        child.register("fresh", Object::new(TypeId(0))).unwrap();
        child.register("shared", Object::new(TypeId(0))).unwrap();

        let err = parent.merge_temporary(child).unwrap_err();
        assert_eq!(err, "shared");
        // Nothing from the child landed
        assert!(parent.find("fresh").is_none());
        assert_eq!(parent.len(), 1);
    }

    #[test]
    fn test_merge_success_copies_all() {
        let mut parent = NameScope::new();
        let mut child = NameScope::new();
        child.register("a", Object::new(TypeId(0))).unwrap();
        child.register("b", Object::new(TypeId(0))).unwrap();
        parent.merge_temporary(child).unwrap();
        assert!(parent.find("a").is_some());
        assert!(parent.find("b").is_some());
    }

    #[test]
    fn test_keyed_lookup_order() {
        struct Chain;
        impl KeyedLookup for Chain {
            fn lookup(&self, key: &str) -> Option<Value> {
                (key == "k").then(|| Value::Int32(2))
            }
        }

        let mut scopes = ScopeManager::new();
        let dict = Object::new(TypeId(0));
        dict.borrow_mut().insert_entry("k", Value::Int32(1));
        scopes.push_dictionary(dict);

        // Innermost dictionary wins over the chain
        assert_eq!(
            scopes.find_key("k", Some(&Chain), None),
            Some(Value::Int32(1))
        );
        scopes.pop_dictionary();
        assert_eq!(
            scopes.find_key("k", Some(&Chain), None),
            Some(Value::Int32(2))
        );
        assert_eq!(scopes.find_key("missing", Some(&Chain), None), None);
    }
}
