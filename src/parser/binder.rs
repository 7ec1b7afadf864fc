//! Property binder
//!
//! Applies one resolved value to one target instance: resolve the property
//! name (including `Owner.Property` attached syntax), enforce at-most-once
//! assignment and read-only protection, coerce literals through the value
//! mini-language, and store into the object's property bag. Unresolved
//! names fall through to the host bridge before failing.
//!
//! Outcomes are data; the driver decides which ones latch an error.

use super::element::{ElementInstance, InstanceKind, ResolvedKind};
use crate::bridge::RuntimeBridge;
use crate::catalog::{PropertyDescriptor, TypeCatalog, TypeId};
use crate::value::{parse_literal, Value};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    Ok,
    DuplicateAssignment,
    ReadOnlyProperty,
    TypeMismatch,
    /// Claimed by (or queued for) the host bridge
    RequiresHostBridge,
    UnknownProperty,
}

/// The value side of a bind: a raw attribute literal, or a value already
/// built (element content, spliced collections)
pub enum BindSource<'v> {
    Literal(&'v str),
    Computed(Value),
}

pub struct Binder<'a> {
    pub catalog: &'a TypeCatalog,
    pub bridge: &'a dyn RuntimeBridge,
}

impl<'a> Binder<'a> {
    pub fn new(catalog: &'a TypeCatalog, bridge: &'a dyn RuntimeBridge) -> Self {
        Binder { catalog, bridge }
    }

    /// Resolve a property name against a type, handling attached syntax
    pub fn resolve_token(&self, target: TypeId, property: &str) -> Option<u16> {
        match property.split_once('.') {
            Some((owner_name, prop_name)) => {
                let owner = self.catalog.resolve_type(owner_name)?;
                self.catalog.property_by_name(owner.id, prop_name)
            }
            None => self.catalog.property_by_name(target, property),
        }
    }

    /// Bind a value to a named property of the instance
    pub fn bind(
        &self,
        instance: &mut ElementInstance,
        property: &str,
        source: BindSource<'_>,
    ) -> BindOutcome {
        let target_type = match instance.info.kind {
            ResolvedKind::GraphType(id) => id,
            ResolvedKind::Bridge => return self.queue_for_bridge(instance, property, source),
            // Value types and enums carry no settable properties
            ResolvedKind::ValueType(_) | ResolvedKind::Enum(_) => {
                return BindOutcome::UnknownProperty
            }
        };

        let token = match self.resolve_token(target_type, property) {
            Some(token) => token,
            None => return self.try_bridge_direct(instance, property, source),
        };
        self.bind_token(instance, token, source)
    }

    /// Bind through an already-resolved token (property-element close,
    /// where resolution happened at the open tag)
    pub fn bind_token(
        &self,
        instance: &mut ElementInstance,
        token: u16,
        source: BindSource<'_>,
    ) -> BindOutcome {
        // Token resolution only fails for unregistered tokens
        let descriptor = match self.catalog.property(token) {
            Some(d) => d,
            None => return BindOutcome::UnknownProperty,
        };

        if instance.assigned.contains(token) {
            return BindOutcome::DuplicateAssignment;
        }

        let object = match instance.object.clone() {
            Some(object) => object,
            None => return BindOutcome::UnknownProperty,
        };

        if descriptor.read_only {
            // Re-assigning the already-spliced collection is a no-op
            // success; anything else is a write to a read-only slot
            if let BindSource::Computed(Value::Object(ref incoming)) = source {
                let existing = object.borrow().get_value(token);
                if let Some(Value::Object(current)) = existing {
                    if Rc::ptr_eq(&current, incoming) {
                        instance.assigned.insert(token);
                        return BindOutcome::Ok;
                    }
                }
            }
            return BindOutcome::ReadOnlyProperty;
        }

        let value = match self.coerce(descriptor, source) {
            Some(value) => value,
            None => return BindOutcome::TypeMismatch,
        };

        object.borrow_mut().set_value(token, value);
        instance.assigned.insert(token);
        BindOutcome::Ok
    }

    /// Coerce the source to the declared kind, retrying string content
    /// through the literal parser
    fn coerce(&self, descriptor: &PropertyDescriptor, source: BindSource<'_>) -> Option<Value> {
        match source {
            BindSource::Literal(literal) => parse_literal(
                descriptor.kind,
                Some(descriptor.name),
                descriptor.enum_table,
                literal,
            ),
            BindSource::Computed(value) => {
                if value.kind() == Some(descriptor.kind) {
                    if let (Value::Object(ref object), Some(expected)) =
                        (&value, descriptor.object_type)
                    {
                        let actual = object.borrow().type_id();
                        if !self.catalog.is_subtype_of(actual, expected) {
                            return None;
                        }
                    }
                    return Some(value);
                }
                // Element content arriving as a string gets one retry
                // through the literal grammar
                match value {
                    Value::String(ref literal) => parse_literal(
                        descriptor.kind,
                        Some(descriptor.name),
                        descriptor.enum_table,
                        literal,
                    ),
                    _ => None,
                }
            }
        }
    }

    /// Bridge-typed target: queue the assignment; the driver applies the
    /// queue when the element closes
    fn queue_for_bridge(
        &self,
        instance: &mut ElementInstance,
        property: &str,
        source: BindSource<'_>,
    ) -> BindOutcome {
        if instance.bridge_assigned.contains(property) {
            return BindOutcome::DuplicateAssignment;
        }
        let value = match source {
            BindSource::Literal(literal) => Value::String(literal.to_string()),
            BindSource::Computed(value) => value,
        };
        instance.bridge_assigned.insert(property.to_string());
        instance.delayed.push((property.to_string(), value));
        BindOutcome::RequiresHostBridge
    }

    /// Catalog-typed target, name unresolved: offer it to the bridge once
    fn try_bridge_direct(
        &self,
        instance: &mut ElementInstance,
        property: &str,
        source: BindSource<'_>,
    ) -> BindOutcome {
        let object = match instance.object.clone() {
            Some(object) => object,
            None => return BindOutcome::UnknownProperty,
        };
        if instance.bridge_assigned.contains(property) {
            return BindOutcome::DuplicateAssignment;
        }
        let value = match source {
            BindSource::Literal(literal) => Value::String(literal.to_string()),
            BindSource::Computed(value) => value,
        };
        if self.bridge.set_property(&object, property, &value) {
            instance.bridge_assigned.insert(property.to_string());
            BindOutcome::RequiresHostBridge
        } else {
            BindOutcome::UnknownProperty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::NullBridge;
    use crate::catalog::TypeCatalog;
    use crate::parser::element::ElementInfo;

    fn instance_of(catalog: &TypeCatalog, tag: &str) -> ElementInstance {
        let descriptor = catalog.resolve_type(tag).unwrap();
        let mut instance = ElementInstance::new(
            ElementInfo {
                local: tag.to_string(),
                kind: ResolvedKind::GraphType(descriptor.id),
                verbatim: false,
            },
            InstanceKind::Element,
            0,
            catalog.property_count(),
        );
        instance.object = Some(descriptor.create_instance());
        instance
    }

    #[test]
    fn test_literal_bind_sets_value() {
        let catalog = TypeCatalog::builtin();
        let binder = Binder::new(catalog, &NullBridge);
        let mut rect = instance_of(catalog, "Rectangle");

        assert_eq!(
            binder.bind(&mut rect, "Width", BindSource::Literal("10")),
            BindOutcome::Ok
        );
        let rect_type = rect.type_id().unwrap();
        let token = catalog.property_by_name(rect_type, "Width").unwrap();
        let object = rect.object.unwrap();
        assert_eq!(object.borrow().get_value(token), Some(Value::Double(10.0)));
    }

    #[test]
    fn test_duplicate_assignment() {
        let catalog = TypeCatalog::builtin();
        let binder = Binder::new(catalog, &NullBridge);
        let mut rect = instance_of(catalog, "Rectangle");

        assert_eq!(
            binder.bind(&mut rect, "Width", BindSource::Literal("10")),
            BindOutcome::Ok
        );
        assert_eq!(
            binder.bind(&mut rect, "Width", BindSource::Literal("20")),
            BindOutcome::DuplicateAssignment
        );
    }

    #[test]
    fn test_read_only_rejected() {
        let catalog = TypeCatalog::builtin();
        let binder = Binder::new(catalog, &NullBridge);
        let mut rect = instance_of(catalog, "Rectangle");
        assert_eq!(
            binder.bind(&mut rect, "ActualWidth", BindSource::Literal("5")),
            BindOutcome::ReadOnlyProperty
        );
    }

    #[test]
    fn test_spliced_reassignment_is_noop() {
        let catalog = TypeCatalog::builtin();
        let binder = Binder::new(catalog, &NullBridge);
        let mut canvas = instance_of(catalog, "Canvas");

        let canvas_type = canvas.type_id().unwrap();
        let token = catalog.property_by_name(canvas_type, "Children").unwrap();
        let collection = catalog
            .resolve_type("UIElementCollection")
            .unwrap()
            .create_instance();
        canvas
            .object
            .as_ref()
            .unwrap()
            .borrow_mut()
            .set_value(token, Value::Object(collection.clone()));

        // Same handle back: no-op success, and the slot is now marked
        assert_eq!(
            binder.bind(
                &mut canvas,
                "Children",
                BindSource::Computed(Value::Object(collection.clone()))
            ),
            BindOutcome::Ok
        );
        assert_eq!(
            binder.bind(
                &mut canvas,
                "Children",
                BindSource::Computed(Value::Object(collection))
            ),
            BindOutcome::DuplicateAssignment
        );
    }

    #[test]
    fn test_bad_literal_is_type_mismatch() {
        let catalog = TypeCatalog::builtin();
        let binder = Binder::new(catalog, &NullBridge);
        let mut rect = instance_of(catalog, "Rectangle");
        assert_eq!(
            binder.bind(&mut rect, "Width", BindSource::Literal("wide")),
            BindOutcome::TypeMismatch
        );
    }

    #[test]
    fn test_attached_property_resolves_via_owner() {
        let catalog = TypeCatalog::builtin();
        let binder = Binder::new(catalog, &NullBridge);
        let mut rect = instance_of(catalog, "Rectangle");

        assert_eq!(
            binder.bind(&mut rect, "Canvas.Left", BindSource::Literal("12")),
            BindOutcome::Ok
        );
        let canvas = catalog.resolve_type("Canvas").unwrap().id;
        let token = catalog.property_by_name(canvas, "Left").unwrap();
        let object = rect.object.unwrap();
        assert_eq!(object.borrow().get_value(token), Some(Value::Double(12.0)));
    }

    #[test]
    fn test_enum_literal_through_declared_table() {
        let catalog = TypeCatalog::builtin();
        let binder = Binder::new(catalog, &NullBridge);
        let mut rect = instance_of(catalog, "Rectangle");
        assert_eq!(
            binder.bind(&mut rect, "Visibility", BindSource::Literal("Collapsed")),
            BindOutcome::Ok
        );
    }

    #[test]
    fn test_bind_token_shares_the_assigned_set() {
        let catalog = TypeCatalog::builtin();
        let binder = Binder::new(catalog, &NullBridge);
        let mut rect = instance_of(catalog, "Rectangle");
        let rect_type = rect.type_id().unwrap();
        let token = catalog.property_by_name(rect_type, "Width").unwrap();

        assert_eq!(
            binder.bind_token(&mut rect, token, BindSource::Literal("8")),
            BindOutcome::Ok
        );
        // The same slot through the by-name entry is a duplicate
        assert_eq!(
            binder.bind(&mut rect, "Width", BindSource::Literal("9")),
            BindOutcome::DuplicateAssignment
        );
    }

    #[test]
    fn test_unknown_property_without_bridge() {
        let catalog = TypeCatalog::builtin();
        let binder = Binder::new(catalog, &NullBridge);
        let mut rect = instance_of(catalog, "Rectangle");
        assert_eq!(
            binder.bind(&mut rect, "Frobnicate", BindSource::Literal("1")),
            BindOutcome::UnknownProperty
        );
    }
}
