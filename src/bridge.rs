//! Host runtime bridge
//!
//! Tags in a namespace the compiler does not recognize, and properties the
//! catalog cannot resolve, are offered to the embedding runtime through
//! this trait. Without a bridge (or when the bridge declines) resolution
//! degrades to UnknownElement / UnknownProperty.

use crate::model::ObjectRef;
use crate::value::Value;

pub trait RuntimeBridge {
    /// Resolve a tag in a bridge namespace. With `create` false this is a
    /// probe and must not allocate; with `create` true the returned handle
    /// becomes the element's instance. None means the tag is unknown to
    /// the host too.
    fn lookup_object(&self, namespace_uri: &str, tag: &str, create: bool) -> Option<ObjectRef>;

    /// Apply a property the catalog could not resolve. Returning true
    /// claims the assignment; false degrades to UnknownProperty.
    fn set_property(&self, target: &ObjectRef, property: &str, value: &Value) -> bool;

    /// Attach a child the compiler could not place. Returning false
    /// degrades to UnknownProperty on the parent.
    fn add_child(&self, parent: &ObjectRef, child: &ObjectRef) -> bool;

    /// Content property name for a bridge-created object, if it has one
    fn content_property_name(&self, object: &ObjectRef) -> Option<String>;
}

/// The no-host default: declines everything
pub struct NullBridge;

impl RuntimeBridge for NullBridge {
    fn lookup_object(&self, _namespace_uri: &str, _tag: &str, _create: bool) -> Option<ObjectRef> {
        None
    }

    fn set_property(&self, _target: &ObjectRef, _property: &str, _value: &Value) -> bool {
        false
    }

    fn add_child(&self, _parent: &ObjectRef, _child: &ObjectRef) -> bool {
        false
    }

    fn content_property_name(&self, _object: &ObjectRef) -> Option<String> {
        None
    }
}
