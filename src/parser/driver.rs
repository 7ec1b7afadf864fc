//! Streaming parse driver
//!
//! The state machine orchestrating everything else over tokenizer
//! callbacks: namespace classification, element creation, attribute
//! binding, content linking, deferred-region buffering and the
//! first-error latch. One `Driver` exists per compile and is driven by
//! `MarkupTokenizer::run`.
//!
//! States: Idle -> InDocument -> {Buffering} -> Errored (terminal) /
//! Done. Once the latch is set every callback returns false, which halts
//! the tokenizer; a few late callbacks are tolerated without touching
//! state.

use super::binder::{BindOutcome, BindSource, Binder};
use super::deferred::{CaptureMode, DeferredRegion};
use super::element::{ElementInfo, ElementInstance, InstanceKind, ResolvedKind};
use super::namespace::{NamespaceKind, PrefixTable};
use super::scope::{KeyedLookup, ScopeManager};
use crate::bridge::{NullBridge, RuntimeBridge};
use crate::catalog::TypeCatalog;
use crate::core::{MarkupHandler, MarkupTokenizer, QName, RawAttribute};
use crate::error::{ErrorCode, XamlError};
use crate::model::ObjectRef;
use crate::value::{parse_literal, Value, ValueKind};
use log::{debug, warn};

static NULL_BRIDGE: NullBridge = NullBridge;

/// Compile options: host bridge, resource lookup chain, and a
/// caller-supplied root for Class rehydration.
#[derive(Default)]
pub struct Compiler<'a> {
    bridge: Option<&'a dyn RuntimeBridge>,
    resource_chain: Option<&'a dyn KeyedLookup>,
    global_resources: Option<&'a dyn KeyedLookup>,
    root: Option<ObjectRef>,
}

impl<'a> Compiler<'a> {
    pub fn new() -> Self {
        Compiler::default()
    }

    pub fn with_bridge(mut self, bridge: &'a dyn RuntimeBridge) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn with_resource_chain(mut self, chain: &'a dyn KeyedLookup) -> Self {
        self.resource_chain = Some(chain);
        self
    }

    pub fn with_global_resources(mut self, global: &'a dyn KeyedLookup) -> Self {
        self.global_resources = Some(global);
        self
    }

    /// Supply the object a root `Class` directive rehydrates into
    pub fn with_root(mut self, root: ObjectRef) -> Self {
        self.root = Some(root);
        self
    }

    pub fn compile_str(&self, input: &str) -> Result<Value, XamlError> {
        self.compile_bytes(input.as_bytes())
    }

    pub fn compile_bytes(&self, input: &[u8]) -> Result<Value, XamlError> {
        let mut driver = Driver::new(
            input,
            TypeCatalog::builtin(),
            self.bridge.unwrap_or(&NULL_BRIDGE),
            self.resource_chain,
            self.global_resources,
            self.root.clone(),
        );
        MarkupTokenizer::new(input).run(&mut driver);
        driver.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Idle,
    InDocument,
    Buffering,
    Errored,
    Done,
}

struct Driver<'a> {
    input: &'a [u8],
    catalog: &'a TypeCatalog,
    bridge: &'a dyn RuntimeBridge,
    resource_chain: Option<&'a dyn KeyedLookup>,
    global_resources: Option<&'a dyn KeyedLookup>,
    state: DriverState,
    prefixes: PrefixTable,
    stack: Vec<ElementInstance>,
    scopes: ScopeManager,
    region: Option<DeferredRegion>,
    root: Option<Value>,
    /// Caller-supplied object a root Class directive rehydrates
    rehydrate: Option<ObjectRef>,
    error: Option<XamlError>,
}

fn err_at(
    input: &[u8],
    code: ErrorCode,
    message: impl Into<String>,
    offset: usize,
) -> XamlError {
    XamlError::new(code, message).at_offset(input, offset)
}

/// `{StaticResource key}` attribute syntax
fn static_resource_key(literal: &str) -> Option<&str> {
    let inner = literal.strip_prefix('{')?.strip_suffix('}')?;
    let key = inner.trim().strip_prefix("StaticResource")?.trim();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Primitive wrapper tags in the clr-namespace:System namespace.
/// String content is verbatim.
fn primitive_kind(local: &str) -> Option<(ValueKind, bool)> {
    match local {
        "String" => Some((ValueKind::String, true)),
        "Int32" => Some((ValueKind::Int32, false)),
        "Double" => Some((ValueKind::Double, false)),
        "Boolean" => Some((ValueKind::Bool, false)),
        "TimeSpan" => Some((ValueKind::TimeSpan, false)),
        _ => None,
    }
}

/// Collapse every whitespace run (leading and trailing included) to one
/// space; verbatim text only trims its outer whitespace. None means the
/// text was whitespace-only noise between elements.
fn flush_text(raw: &str, verbatim: bool) -> Option<String> {
    if verbatim {
        return Some(raw.trim().to_string());
    }
    if raw.trim().is_empty() {
        return None;
    }
    let mut out = String::with_capacity(raw.len());
    let mut in_run = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    Some(out)
}

impl<'a> Driver<'a> {
    fn new(
        input: &'a [u8],
        catalog: &'a TypeCatalog,
        bridge: &'a dyn RuntimeBridge,
        resource_chain: Option<&'a dyn KeyedLookup>,
        global_resources: Option<&'a dyn KeyedLookup>,
        rehydrate: Option<ObjectRef>,
    ) -> Self {
        Driver {
            input,
            catalog,
            bridge,
            resource_chain,
            global_resources,
            state: DriverState::Idle,
            prefixes: PrefixTable::new(),
            stack: Vec::new(),
            scopes: ScopeManager::new(),
            region: None,
            root: None,
            rehydrate,
            error: None,
        }
    }

    fn finish(mut self) -> Result<Value, XamlError> {
        if let Some(error) = self.error.take() {
            // Interim instances on the stack drop here, releasing every
            // unrooted object
            return Err(error);
        }
        if !self.stack.is_empty() {
            return Err(err_at(
                self.input,
                ErrorCode::MalformedMarkup,
                "unexpected end of input",
                self.input.len(),
            ));
        }
        self.root.take().ok_or_else(|| {
            err_at(
                self.input,
                ErrorCode::MalformedMarkup,
                "document has no root element",
                0,
            )
        })
    }

    /// First error wins. Always returns false so callers can hand the
    /// halt request straight back to the tokenizer.
    fn latch(&mut self, error: XamlError) -> bool {
        if self.error.is_none() {
            warn!("compile error latched: {}", error);
            self.error = Some(error);
            self.state = DriverState::Errored;
        }
        false
    }

    fn binder(&self) -> Binder<'a> {
        Binder::new(self.catalog, self.bridge)
    }

    /// Map a binder outcome onto the error taxonomy. `element` and
    /// `property` feed the citation fields.
    fn check_bind(
        &mut self,
        outcome: BindOutcome,
        element: &str,
        property: &str,
        offset: usize,
    ) -> bool {
        let (code, message) = match outcome {
            BindOutcome::Ok | BindOutcome::RequiresHostBridge => return true,
            BindOutcome::DuplicateAssignment => (
                ErrorCode::DuplicateAssignment,
                format!("property '{}' assigned more than once", property),
            ),
            BindOutcome::ReadOnlyProperty => (
                ErrorCode::ReadOnlyPropertyWrite,
                format!("property '{}' is read-only", property),
            ),
            BindOutcome::TypeMismatch => (
                ErrorCode::InvalidAttributeValue,
                format!("value does not match the type of '{}'", property),
            ),
            BindOutcome::UnknownProperty => (
                ErrorCode::UnknownProperty,
                format!("unknown property '{}'", property),
            ),
        };
        let error = err_at(self.input, code, message, offset)
            .with_element(element)
            .with_attribute(property);
        self.latch(error)
    }

    /// Resolve an element tag against its namespace kind
    fn resolve_element(
        &mut self,
        kind: NamespaceKind,
        uri: &str,
        local: &str,
        offset: usize,
    ) -> Option<ElementInfo> {
        let resolved = match kind {
            NamespaceKind::Default => {
                if let Some(descriptor) = self.catalog.resolve_type(local) {
                    debug!("resolved <{}> to catalog type {:?}", local, descriptor.id);
                    ResolvedKind::GraphType(descriptor.id)
                } else if let Some(table) = self.catalog.enum_table(local) {
                    ResolvedKind::Enum(table)
                } else if self.bridge.lookup_object(uri, local, false).is_some() {
                    ResolvedKind::Bridge
                } else {
                    self.latch(
                        err_at(
                            self.input,
                            ErrorCode::UnknownElement,
                            format!("unknown element '{}'", local),
                            offset,
                        )
                        .with_element(local),
                    );
                    return None;
                }
            }
            NamespaceKind::Primitive => match primitive_kind(local) {
                Some((value_kind, verbatim)) => {
                    return Some(ElementInfo {
                        local: local.to_string(),
                        kind: ResolvedKind::ValueType(value_kind),
                        verbatim,
                    });
                }
                None => {
                    self.latch(
                        err_at(
                            self.input,
                            ErrorCode::UnknownElement,
                            format!("unknown primitive tag '{}'", local),
                            offset,
                        )
                        .with_element(local),
                    );
                    return None;
                }
            },
            NamespaceKind::Bridge => {
                if self.bridge.lookup_object(uri, local, false).is_some() {
                    ResolvedKind::Bridge
                } else {
                    self.latch(
                        err_at(
                            self.input,
                            ErrorCode::UnknownElement,
                            format!("no bridge object for '{}' in '{}'", local, uri),
                            offset,
                        )
                        .with_element(local),
                    );
                    return None;
                }
            }
            NamespaceKind::Directive | NamespaceKind::Xml | NamespaceKind::Compatibility => {
                self.latch(
                    err_at(
                        self.input,
                        ErrorCode::UnknownElement,
                        format!("namespace '{}' cannot supply elements", uri),
                        offset,
                    )
                    .with_element(local),
                );
                return None;
            }
        };
        Some(ElementInfo {
            local: local.to_string(),
            kind: resolved,
            verbatim: false,
        })
    }

    /// Handle one attribute on an ordinary element. Compatibility and
    /// Class directives are handled in the pre-pass, not here.
    fn bind_attribute(&mut self, instance: &mut ElementInstance, attr: &RawAttribute<'_>) -> bool {
        let element = instance.info.local.clone();

        if let Some(prefix) = attr.prefix {
            let uri = match self.prefixes.resolve(Some(prefix)) {
                Some(uri) => uri.to_string(),
                None => {
                    return self.latch(
                        err_at(
                            self.input,
                            ErrorCode::UnresolvedNamespace,
                            format!("prefix '{}' is not bound", prefix),
                            attr.offset,
                        )
                        .with_element(&element)
                        .with_attribute(attr.local),
                    );
                }
            };
            if self.prefixes.is_ignored(&uri) {
                return true;
            }
            match NamespaceKind::classify(&uri) {
                NamespaceKind::Directive => {
                    return self.apply_directive(instance, attr, &element)
                }
                NamespaceKind::Xml => {
                    if attr.local == "lang" {
                        // Recorded on the object; value-typed elements
                        // have no object for the tag to stick to
                        if let Some(ref object) = instance.object {
                            object.borrow_mut().set_language(&attr.value);
                        }
                        return true;
                    }
                    return self.latch(
                        err_at(
                            self.input,
                            ErrorCode::UnknownProperty,
                            format!("unknown xml attribute '{}'", attr.local),
                            attr.offset,
                        )
                        .with_element(&element)
                        .with_attribute(attr.local),
                    );
                }
                // Compatibility handled in the pre-pass; anything else
                // binds as an ordinary (possibly bridged) property
                NamespaceKind::Compatibility => return true,
                _ => {}
            }
        }

        let source = match static_resource_key(&attr.value) {
            Some(key) => {
                match self
                    .scopes
                    .find_key(key, self.resource_chain, self.global_resources)
                {
                    Some(found) => BindSource::Computed(found),
                    None => {
                        return self.latch(
                            err_at(
                                self.input,
                                ErrorCode::InvalidAttributeValue,
                                format!("resource '{}' not found", key),
                                attr.offset,
                            )
                            .with_element(&element)
                            .with_attribute(attr.local),
                        );
                    }
                }
            }
            None => BindSource::Literal(&attr.value),
        };

        let outcome = self.binder().bind(instance, attr.local, source);
        self.check_bind(outcome, &element, attr.local, attr.offset)
    }

    /// Name, Key and (already-validated) Class directives
    fn apply_directive(
        &mut self,
        instance: &mut ElementInstance,
        attr: &RawAttribute<'_>,
        element: &str,
    ) -> bool {
        match attr.local {
            "Name" => {
                let object = match instance.object.clone() {
                    Some(object) => object,
                    None => {
                        return self.latch(
                            err_at(
                                self.input,
                                ErrorCode::IllegalDirectivePlacement,
                                "Name is not legal on a value-typed element",
                                attr.offset,
                            )
                            .with_element(element)
                            .with_attribute("Name"),
                        );
                    }
                };
                if self.scopes.register(&attr.value, object.clone()).is_err() {
                    return self.latch(
                        err_at(
                            self.input,
                            ErrorCode::DuplicateName,
                            format!("name '{}' is already registered", attr.value),
                            attr.offset,
                        )
                        .with_element(element)
                        .with_attribute("Name"),
                    );
                }
                object.borrow_mut().set_name(&attr.value);
                instance.name = Some(attr.value.to_string());
                true
            }
            "Key" => {
                instance.key = Some(attr.value.to_string());
                true
            }
            // Legality was checked before instance creation
            "Class" => true,
            other => self.latch(
                err_at(
                    self.input,
                    ErrorCode::UnknownProperty,
                    format!("unknown directive '{}'", other),
                    attr.offset,
                )
                .with_element(element)
                .with_attribute(other),
            ),
        }
    }

    /// Pre-pass over attributes: process Ignorable declarations and
    /// validate any Class directive before the element is created.
    /// Returns Some(rehydrate) when a legal Class directive asks for the
    /// caller-supplied root.
    fn attribute_prepass(
        &mut self,
        local: &str,
        attrs: &[RawAttribute<'_>],
        is_value_type: bool,
    ) -> Result<Option<ObjectRef>, ()> {
        let mut rehydrated = None;
        for attr in attrs {
            let Some(prefix) = attr.prefix else { continue };
            let Some(uri) = self.prefixes.resolve(Some(prefix)).map(str::to_string) else {
                continue; // unbound prefixes are reported in the main pass
            };
            match NamespaceKind::classify(&uri) {
                NamespaceKind::Compatibility if attr.local == "Ignorable" => {
                    for ignorable in attr.value.split_ascii_whitespace() {
                        match self.prefixes.resolve(Some(ignorable)).map(str::to_string) {
                            Some(ignored_uri) => self.prefixes.mark_ignored(&ignored_uri),
                            None => {
                                self.latch(
                                    err_at(
                                        self.input,
                                        ErrorCode::UnresolvedNamespace,
                                        format!("Ignorable prefix '{}' is not bound", ignorable),
                                        attr.offset,
                                    )
                                    .with_element(local),
                                );
                                return Err(());
                            }
                        }
                    }
                }
                NamespaceKind::Directive if attr.local == "Class" => {
                    let legal =
                        self.stack.is_empty() && self.rehydrate.is_some() && !is_value_type;
                    if !legal {
                        self.latch(
                            err_at(
                                self.input,
                                ErrorCode::IllegalDirectivePlacement,
                                "Class is only legal on a rehydrated document root",
                                attr.offset,
                            )
                            .with_element(local)
                            .with_attribute("Class"),
                        );
                        return Err(());
                    }
                    rehydrated = self.rehydrate.clone();
                }
                _ => {}
            }
        }
        Ok(rehydrated)
    }

    /// Open an `Owner.Property` property element under the current
    /// element, splicing collection/dictionary handles where the slot
    /// already exposes one.
    fn open_property_element(
        &mut self,
        local: &str,
        attrs: &[RawAttribute<'_>],
        span: (usize, usize),
    ) -> bool {
        if let Some(attr) = attrs.first() {
            return self.latch(
                err_at(
                    self.input,
                    ErrorCode::UnknownProperty,
                    "property elements do not take attributes",
                    attr.offset,
                )
                .with_element(local)
                .with_attribute(attr.local),
            );
        }

        let Some(parent) = self.stack.last() else {
            return self.latch(
                err_at(
                    self.input,
                    ErrorCode::MalformedMarkup,
                    "property element without an enclosing element",
                    span.0,
                )
                .with_element(local),
            );
        };
        if parent.is_property_element() {
            return self.latch(
                err_at(
                    self.input,
                    ErrorCode::MalformedMarkup,
                    "property elements cannot nest directly",
                    span.0,
                )
                .with_element(local),
            );
        }

        let parent_kind = parent.info.kind;
        let parent_object = parent.object.clone();

        let mut instance = ElementInstance::new(
            ElementInfo {
                local: local.to_string(),
                kind: parent_kind,
                verbatim: false,
            },
            InstanceKind::PropertyElement {
                token: None,
                name: local.to_string(),
            },
            span.0,
            self.catalog.property_count(),
        );

        match parent_kind {
            ResolvedKind::GraphType(parent_type) => {
                let Some(token) = self.binder().resolve_token(parent_type, local) else {
                    return self.latch(
                        err_at(
                            self.input,
                            ErrorCode::UnknownProperty,
                            format!("unknown property element '{}'", local),
                            span.0,
                        )
                        .with_element(local),
                    );
                };
                instance.kind = InstanceKind::PropertyElement {
                    token: Some(token),
                    name: local.to_string(),
                };

                // Collection/dictionary slots splice: reuse the handle the
                // parent already exposes, or create and store it once
                let descriptor = self.catalog.property(token);
                let container_type = descriptor.and_then(|d| d.object_type).filter(|&ty| {
                    self.catalog
                        .type_by_id(ty)
                        .map(|t| t.is_collection() || t.is_dictionary())
                        .unwrap_or(false)
                });
                if let (Some(container_type), Some(parent_object)) =
                    (container_type, parent_object)
                {
                    let existing = parent_object.borrow().get_value(token);
                    let container = match existing {
                        Some(Value::Object(handle)) => handle,
                        _ => {
                            let created = match self.catalog.type_by_id(container_type) {
                                Some(descriptor) => descriptor.create_instance(),
                                None => {
                                    return self.latch(err_at(
                                        self.input,
                                        ErrorCode::UnknownElement,
                                        "container type missing from catalog",
                                        span.0,
                                    ));
                                }
                            };
                            // Stored read-before-write; binding back at
                            // close is the no-op splice success
                            parent_object
                                .borrow_mut()
                                .set_value(token, Value::Object(created.clone()));
                            created
                        }
                    };
                    let is_dictionary = self
                        .catalog
                        .type_by_id(container_type)
                        .is_some_and(|t| t.is_dictionary());
                    if is_dictionary {
                        self.scopes.push_dictionary(container.clone());
                        instance.pushed_dictionaries += 1;
                    }
                    instance.object = Some(container);
                    instance.holds_spliced = true;
                }
            }
            ResolvedKind::Bridge => {
                // Bridge property elements carry their value to the
                // bridge when they close; nothing to resolve here
            }
            ResolvedKind::ValueType(_) | ResolvedKind::Enum(_) => {
                return self.latch(
                    err_at(
                        self.input,
                        ErrorCode::MalformedMarkup,
                        "value-typed elements have no properties",
                        span.0,
                    )
                    .with_element(local),
                );
            }
        }

        self.prefixes.push_scope();
        self.stack.push(instance);
        self.state = DriverState::InDocument;
        true
    }

    /// Close a property element: bind what it collected to the parent
    fn close_property_element(&mut self, instance: ElementInstance, span: (usize, usize)) -> bool {
        let (token, property) = match &instance.kind {
            InstanceKind::PropertyElement { token, name } => (*token, name.clone()),
            InstanceKind::Element => return true,
        };

        let Some(parent) = self.stack.last() else {
            return self.latch(err_at(
                self.input,
                ErrorCode::MalformedMarkup,
                "property element closed without a parent",
                span.0,
            ));
        };
        let element = parent.info.local.clone();

        let flushed;
        let source = if instance.holds_spliced {
            match instance.object {
                Some(container) => BindSource::Computed(Value::Object(container)),
                None => return true,
            }
        } else if let Some(value) = instance.pending_value {
            BindSource::Computed(value)
        } else if let Some(text) = flush_text(&instance.text, instance.info.verbatim) {
            flushed = text;
            BindSource::Literal(&flushed)
        } else {
            // Empty property element assigns nothing
            return true;
        };

        // The token was resolved at the open tag; None means the owner is
        // bridge-typed and the bind routes through its queue by name
        let outcome = match token {
            Some(token) => self.binder().bind_token(self.stack_top_mut(), token, source),
            None => self.binder().bind(self.stack_top_mut(), &property, source),
        };
        self.check_bind(outcome, &element, &property, span.0)
    }

    // Helper keeping the borrow checker happy around binder calls
    fn stack_top_mut(&mut self) -> &mut ElementInstance {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Close an ordinary element: flush its text, apply queued bridge
    /// bindings, produce its value and link it under the parent.
    fn close_element(&mut self, mut instance: ElementInstance, span: (usize, usize)) -> bool {
        let element = instance.info.local.clone();
        let flushed = flush_text(&instance.text, instance.info.verbatim);

        // Produce the instance's final value
        let value = match instance.info.kind {
            ResolvedKind::ValueType(ValueKind::String) => {
                Value::String(flushed.unwrap_or_default())
            }
            ResolvedKind::ValueType(value_kind) => {
                let Some(ref text) = flushed else {
                    return self.latch(
                        err_at(
                            self.input,
                            ErrorCode::InvalidAttributeValue,
                            format!("empty literal for '{}'", element),
                            span.0,
                        )
                        .with_element(&element),
                    );
                };
                match parse_literal(value_kind, None, None, text) {
                    Some(value) => value,
                    None => {
                        return self.latch(
                            err_at(
                                self.input,
                                ErrorCode::InvalidAttributeValue,
                                format!("'{}' is not a valid {}", text.trim(), element),
                                span.0,
                            )
                            .with_element(&element),
                        );
                    }
                }
            }
            ResolvedKind::Enum(table) => {
                let resolved = flushed
                    .as_deref()
                    .map(str::trim)
                    .and_then(|name| table.lookup(name));
                match resolved {
                    Some(ordinal) => Value::Int32(ordinal),
                    None => {
                        return self.latch(
                            err_at(
                                self.input,
                                ErrorCode::InvalidAttributeValue,
                                format!("unknown {} value", table.name),
                                span.0,
                            )
                            .with_element(&element),
                        );
                    }
                }
            }
            ResolvedKind::GraphType(type_id) => {
                let Some(object) = instance.object.clone() else {
                    return self.latch(err_at(
                        self.input,
                        ErrorCode::UnknownElement,
                        "element closed without an instance",
                        span.0,
                    ));
                };
                if let Some(text) = flushed {
                    let Some(token) = self.catalog.content_property(type_id) else {
                        return self.latch(
                            err_at(
                                self.input,
                                ErrorCode::UnknownProperty,
                                format!("'{}' does not accept text content", element),
                                instance.open_offset,
                            )
                            .with_element(&element),
                        );
                    };
                    let property = self
                        .catalog
                        .property(token)
                        .map(|d| d.name)
                        .unwrap_or_default();
                    let outcome =
                        self.binder()
                            .bind(&mut instance, property, BindSource::Literal(&text));
                    if !self.check_bind(outcome, &element, property, span.0) {
                        return false;
                    }
                }
                Value::Object(object)
            }
            ResolvedKind::Bridge => {
                let Some(object) = instance.object.clone() else {
                    return self.latch(err_at(
                        self.input,
                        ErrorCode::UnknownElement,
                        "bridge element closed without an object",
                        span.0,
                    ));
                };
                if let Some(text) = flushed {
                    match self.bridge.content_property_name(&object) {
                        Some(content) => instance.delayed.push((content, Value::String(text))),
                        None => {
                            return self.latch(
                                err_at(
                                    self.input,
                                    ErrorCode::UnknownProperty,
                                    format!("'{}' does not accept text content", element),
                                    instance.open_offset,
                                )
                                .with_element(&element),
                            );
                        }
                    }
                }
                // Queued bridge-only assignments apply at close
                for (property, delayed_value) in instance.delayed.drain(..) {
                    if !self.bridge.set_property(&object, &property, &delayed_value) {
                        return self.latch(
                            err_at(
                                self.input,
                                ErrorCode::UnknownProperty,
                                format!("bridge rejected property '{}'", property),
                                span.0,
                            )
                            .with_element(&element)
                            .with_attribute(&property),
                        );
                    }
                }
                Value::Object(object)
            }
        };

        self.attach(instance, value, span)
    }

    /// Link a closed element's value under its parent, or make it the
    /// document root
    fn attach(&mut self, instance: ElementInstance, value: Value, span: (usize, usize)) -> bool {
        let element = instance.info.local.clone();
        let key = instance.key.clone();

        if self.stack.is_empty() {
            self.root = Some(value);
            self.state = DriverState::Done;
            debug!("document root <{}> complete", element);
            return true;
        }

        // The logical parent object, for weak back-references
        let owner_object: Option<ObjectRef> = self
            .stack
            .iter()
            .rev()
            .find(|entry| !entry.is_property_element())
            .and_then(|entry| entry.object.clone());
        if let (Value::Object(ref child), Some(ref owner)) = (&value, &owner_object) {
            child.borrow_mut().set_parent(owner);
        }

        let parent_is_property = self
            .stack
            .last()
            .map(|p| p.is_property_element())
            .unwrap_or(false);

        if parent_is_property {
            return self.attach_into_property_element(element, value, key, span);
        }

        let (parent_kind, parent_object, parent_type) = match self.stack.last() {
            Some(parent) => (
                parent.info.kind,
                parent.object.clone(),
                parent.type_id(),
            ),
            None => return true,
        };

        match parent_kind {
            ResolvedKind::Bridge => {
                let attached = match (&value, &parent_object) {
                    (Value::Object(child), Some(parent)) => self.bridge.add_child(parent, child),
                    _ => false,
                };
                if !attached {
                    return self.latch(
                        err_at(
                            self.input,
                            ErrorCode::UnknownProperty,
                            format!("bridge rejected child '{}'", element),
                            span.0,
                        )
                        .with_element(&element),
                    );
                }
                true
            }
            ResolvedKind::ValueType(_) | ResolvedKind::Enum(_) => self.latch(
                err_at(
                    self.input,
                    ErrorCode::MalformedMarkup,
                    "value-typed elements cannot contain children",
                    span.0,
                )
                .with_element(&element),
            ),
            ResolvedKind::GraphType(_) => {
                let parent_descriptor = parent_type.and_then(|id| self.catalog.type_by_id(id));
                let (is_dictionary, is_collection) = parent_descriptor
                    .map(|d| (d.is_dictionary(), d.is_collection()))
                    .unwrap_or((false, false));

                let Some(parent_object) = parent_object else {
                    return true;
                };

                if is_dictionary {
                    return self.insert_keyed(&parent_object, element, key, value, span);
                }
                if is_collection {
                    parent_object.borrow_mut().add_item(value);
                    return true;
                }
                self.attach_via_content_property(element, value, key, span)
            }
        }
    }

    /// Child closed inside an `Owner.Property` element
    fn attach_into_property_element(
        &mut self,
        element: String,
        value: Value,
        key: Option<String>,
        span: (usize, usize),
    ) -> bool {
        let (holds_spliced, container, is_dictionary) = match self.stack.last() {
            Some(parent) => {
                let container = parent.object.clone();
                let is_dictionary = container
                    .as_ref()
                    .map(|c| {
                        self.catalog
                            .type_by_id(c.borrow().type_id())
                            .is_some_and(|t| t.is_dictionary())
                    })
                    .unwrap_or(false);
                (parent.holds_spliced, container, is_dictionary)
            }
            None => return true,
        };

        if holds_spliced {
            let Some(container) = container else {
                return true;
            };
            if is_dictionary {
                return self.insert_keyed(&container, element, key, value, span);
            }
            container.borrow_mut().add_item(value);
            return true;
        }

        // Single-valued slot: a second child is a duplicate assignment
        let Some(parent) = self.stack.last_mut() else {
            return true;
        };
        if parent.pending_value.is_some() {
            let property = match &parent.kind {
                InstanceKind::PropertyElement { name, .. } => name.clone(),
                InstanceKind::Element => String::new(),
            };
            return self.latch(
                err_at(
                    self.input,
                    ErrorCode::DuplicateAssignment,
                    format!("property '{}' given more than one value", property),
                    span.0,
                )
                .with_element(&element)
                .with_attribute(&property),
            );
        }
        parent.pending_value = Some(value);
        true
    }

    /// Keyed insertion into a dictionary container
    fn insert_keyed(
        &mut self,
        container: &ObjectRef,
        element: String,
        key: Option<String>,
        value: Value,
        span: (usize, usize),
    ) -> bool {
        let Some(key) = key else {
            return self.latch(
                err_at(
                    self.input,
                    ErrorCode::IllegalDirectivePlacement,
                    "dictionary entries require a Key directive",
                    span.0,
                )
                .with_element(&element),
            );
        };
        if !container.borrow_mut().insert_entry(&key, value) {
            return self.latch(
                err_at(
                    self.input,
                    ErrorCode::DuplicateName,
                    format!("key '{}' is already present", key),
                    span.0,
                )
                .with_element(&element)
                .with_attribute("Key"),
            );
        }
        true
    }

    /// Attach through the parent's content property, splicing the
    /// content collection if that is what the slot holds
    fn attach_via_content_property(
        &mut self,
        element: String,
        value: Value,
        key: Option<String>,
        span: (usize, usize),
    ) -> bool {
        let Some(parent) = self.stack.last() else {
            return true;
        };
        let parent_element = parent.info.local.clone();
        let Some(parent_type) = parent.type_id() else {
            return true;
        };
        let parent_object = parent.object.clone();

        let Some(token) = self.catalog.content_property(parent_type) else {
            return self.latch(
                err_at(
                    self.input,
                    ErrorCode::UnknownProperty,
                    format!("'{}' does not accept element content", parent_element),
                    span.0,
                )
                .with_element(&element),
            );
        };

        let descriptor = self.catalog.property(token);
        let container_type = descriptor.and_then(|d| d.object_type).filter(|&ty| {
            self.catalog
                .type_by_id(ty)
                .map(|t| t.is_collection() || t.is_dictionary())
                .unwrap_or(false)
        });

        if let (Some(container_type), Some(parent_object)) = (container_type, parent_object) {
            // Implicit content collection; created once, then reused
            let existing = parent_object.borrow().get_value(token);
            let container = match existing {
                Some(Value::Object(handle)) => handle,
                _ => {
                    let created = match self.catalog.type_by_id(container_type) {
                        Some(descriptor) => descriptor.create_instance(),
                        None => {
                            return self.latch(err_at(
                                self.input,
                                ErrorCode::UnknownElement,
                                "container type missing from catalog",
                                span.0,
                            ));
                        }
                    };
                    parent_object
                        .borrow_mut()
                        .set_value(token, Value::Object(created.clone()));
                    created
                }
            };
            let is_dictionary = self
                .catalog
                .type_by_id(container_type)
                .is_some_and(|t| t.is_dictionary());
            if is_dictionary {
                return self.insert_keyed(&container, element, key, value, span);
            }
            container.borrow_mut().add_item(value);
            return true;
        }

        // Single-valued content property
        let property = descriptor.map(|d| d.name).unwrap_or_default();
        let outcome = self
            .binder()
            .bind(self.stack_top_mut(), property, BindSource::Computed(value));
        self.check_bind(outcome, &parent_element, property, span.0)
    }
}

impl MarkupHandler for Driver<'_> {
    fn start_namespace(&mut self, prefix: Option<&str>, uri: &str, _offset: usize) -> bool {
        if self.error.is_some() {
            return false;
        }
        if self.region.is_some() {
            return true;
        }
        debug!("declare xmlns{}{}=\"{}\"", if prefix.is_some() { ":" } else { "" }, prefix.unwrap_or(""), uri);
        self.prefixes.declare(prefix, uri);
        true
    }

    fn start_element(
        &mut self,
        name: &QName<'_>,
        attrs: &[RawAttribute<'_>],
        tag_span: (usize, usize),
    ) -> bool {
        if self.error.is_some() {
            return false;
        }
        if let Some(region) = self.region.as_mut() {
            region.on_start(name.local);
            return true;
        }
        if self.state == DriverState::Done {
            return self.latch(err_at(
                self.input,
                ErrorCode::MalformedMarkup,
                "content after the document root",
                tag_span.0,
            ));
        }

        let Some(uri) = self
            .prefixes
            .resolve_or_default(name.prefix)
            .map(str::to_string)
        else {
            return self.latch(
                err_at(
                    self.input,
                    ErrorCode::UnresolvedNamespace,
                    format!("prefix '{}' is not bound", name.prefix.unwrap_or_default()),
                    tag_span.0,
                )
                .with_element(name.local),
            );
        };

        // Ignored-namespace subtrees balance structurally but build
        // nothing: discard-mode capture
        if self.prefixes.is_ignored(&uri) {
            self.prefixes.push_scope();
            self.region = Some(DeferredRegion::new(
                name.local,
                CaptureMode::Discard,
                tag_span.1,
                Vec::new(),
            ));
            self.state = DriverState::Buffering;
            return true;
        }

        if name.local.contains('.') {
            return self.open_property_element(name.local, attrs, tag_span);
        }

        let kind = NamespaceKind::classify(&uri);
        let Some(info) = self.resolve_element(kind, &uri, name.local, tag_span.0) else {
            return false;
        };

        let is_value_type =
            matches!(info.kind, ResolvedKind::ValueType(_) | ResolvedKind::Enum(_));
        let rehydrated = match self.attribute_prepass(name.local, attrs, is_value_type) {
            Ok(rehydrated) => rehydrated,
            Err(()) => return false,
        };

        let mut instance = ElementInstance::new(
            info,
            InstanceKind::Element,
            tag_span.0,
            self.catalog.property_count(),
        );
        match instance.info.kind {
            ResolvedKind::GraphType(type_id) => {
                instance.object = match rehydrated {
                    Some(root) => Some(root),
                    None => self
                        .catalog
                        .type_by_id(type_id)
                        .map(|descriptor| descriptor.create_instance()),
                };
            }
            ResolvedKind::Bridge => {
                // Probe succeeded during resolution; this call allocates
                let Some(object) = self.bridge.lookup_object(&uri, name.local, true) else {
                    return self.latch(
                        err_at(
                            self.input,
                            ErrorCode::UnknownElement,
                            format!("no bridge object for '{}' in '{}'", name.local, uri),
                            tag_span.0,
                        )
                        .with_element(name.local),
                    );
                };
                instance.object = Some(object);
            }
            ResolvedKind::ValueType(_) | ResolvedKind::Enum(_) => {}
        }

        self.prefixes.push_scope();

        for attr in attrs {
            if !self.bind_attribute(&mut instance, attr) {
                return false;
            }
        }

        // Dictionaries opened as elements join the keyed-lookup stack
        let defers = match instance.info.kind {
            ResolvedKind::GraphType(type_id) => {
                if let Some(descriptor) = self.catalog.type_by_id(type_id) {
                    if descriptor.is_dictionary() {
                        if let Some(object) = instance.object.clone() {
                            self.scopes.push_dictionary(object);
                            instance.pushed_dictionaries += 1;
                        }
                    }
                    descriptor.defers_content()
                } else {
                    false
                }
            }
            _ => false,
        };

        self.stack.push(instance);
        self.state = DriverState::InDocument;

        if defers {
            self.region = Some(DeferredRegion::new(
                name.local,
                CaptureMode::Retain,
                tag_span.1,
                self.prefixes.snapshot(),
            ));
            self.state = DriverState::Buffering;
        }
        true
    }

    fn characters(&mut self, text: &str, _verbatim: bool, offset: usize) -> bool {
        if self.error.is_some() {
            return false;
        }
        if self.region.is_some() {
            return true;
        }
        match self.stack.last_mut() {
            Some(top) => {
                top.text.push_str(text);
                true
            }
            None => {
                if text.trim().is_empty() {
                    return true;
                }
                self.latch(err_at(
                    self.input,
                    ErrorCode::MalformedMarkup,
                    "text outside the document root",
                    offset,
                ))
            }
        }
    }

    fn end_element(&mut self, name: &QName<'_>, tag_span: (usize, usize)) -> bool {
        if self.error.is_some() {
            return false;
        }

        if let Some(region) = self.region.as_mut() {
            if !region.on_end(name.local) {
                return true;
            }
            let Some(region) = self.region.take() else {
                return true;
            };
            self.state = DriverState::InDocument;
            match region.mode() {
                CaptureMode::Discard => {
                    self.prefixes.pop_scope();
                    return true;
                }
                CaptureMode::Retain => {
                    if region.root_count() > 1 {
                        return self.latch(
                            err_at(
                                self.input,
                                ErrorCode::TemplateValidationFailure,
                                "template body must have a single root",
                                tag_span.0,
                            )
                            .with_element(name.local),
                        );
                    }
                    if let Some(body) = region.capture(self.input, tag_span.0) {
                        if let Some(object) =
                            self.stack.last().and_then(|owner| owner.object.clone())
                        {
                            object.borrow_mut().set_deferred_body(body);
                        }
                    }
                    // Fall through: this close tag also closes the
                    // template element itself
                }
            }
        }

        let Some(instance) = self.stack.pop() else {
            return self.latch(err_at(
                self.input,
                ErrorCode::MalformedMarkup,
                format!("unmatched end tag '{}'", name.local),
                tag_span.0,
            ));
        };
        if instance.info.local != name.local {
            return self.latch(
                err_at(
                    self.input,
                    ErrorCode::MalformedMarkup,
                    format!(
                        "end tag '{}' does not match open tag '{}'",
                        name.local, instance.info.local
                    ),
                    tag_span.0,
                )
                .with_element(&instance.info.local),
            );
        }

        self.prefixes.pop_scope();
        if instance.pushed_dictionaries > 0 {
            if instance.is_property_element() {
                // A spliced Resources dictionary stays visible to the
                // owner's later children; the owner pops it at its close
                match self.stack.last_mut() {
                    Some(owner) => owner.pushed_dictionaries += instance.pushed_dictionaries,
                    None => {
                        for _ in 0..instance.pushed_dictionaries {
                            self.scopes.pop_dictionary();
                        }
                    }
                }
            } else {
                for _ in 0..instance.pushed_dictionaries {
                    self.scopes.pop_dictionary();
                }
            }
        }

        if instance.is_property_element() {
            self.close_property_element(instance, tag_span)
        } else {
            self.close_element(instance, tag_span)
        }
    }

    fn malformed(&mut self, message: &'static str, offset: usize) {
        if self.error.is_some() {
            return;
        }
        self.latch(err_at(
            self.input,
            ErrorCode::MalformedMarkup,
            message,
            offset,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::namespace::{COMPATIBILITY, DIRECTIVE, PRESENTATION_2006, PRIMITIVE};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn compile(input: &str) -> Result<Value, XamlError> {
        Compiler::new().compile_str(input)
    }

    fn expect_error(input: &str) -> XamlError {
        compile(input).unwrap_err()
    }

    fn as_object(value: Value) -> ObjectRef {
        match value {
            Value::Object(object) => object,
            other => panic!("expected an object, got {:?}", other),
        }
    }

    fn get(object: &ObjectRef, property: &str) -> Option<Value> {
        let catalog = TypeCatalog::builtin();
        let token = catalog.property_by_name(object.borrow().type_id(), property)?;
        object.borrow().get_value(token)
    }

    fn get_attached(object: &ObjectRef, owner: &str, property: &str) -> Option<Value> {
        let catalog = TypeCatalog::builtin();
        let owner_id = catalog.resolve_type(owner)?.id;
        let token = catalog.property_by_name(owner_id, property)?;
        object.borrow().get_value(token)
    }

    fn children(object: &ObjectRef) -> Vec<Value> {
        match get(object, "Children") {
            Some(Value::Object(collection)) => collection.borrow().items().to_vec(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_minimal_root() {
        let root = as_object(
            compile(&format!("<Rectangle xmlns=\"{}\"/>", PRESENTATION_2006)).unwrap(),
        );
        assert_eq!(get(&root, "Width"), None);
        assert!(children(&root).is_empty());
    }

    #[test]
    fn test_attribute_binding() {
        let root = as_object(
            compile(&format!(
                "<Rectangle xmlns=\"{}\" Width=\"10\" Height=\"20.5\"/>",
                PRESENTATION_2006
            ))
            .unwrap(),
        );
        assert_eq!(get(&root, "Width"), Some(Value::Double(10.0)));
        assert_eq!(get(&root, "Height"), Some(Value::Double(20.5)));
    }

    #[test]
    fn test_auto_is_nan_for_width() {
        let root = as_object(
            compile(&format!(
                "<Rectangle xmlns=\"{}\" Width=\"Auto\"/>",
                PRESENTATION_2006
            ))
            .unwrap(),
        );
        match get(&root, "Width") {
            Some(Value::Double(w)) => assert!(w.is_nan()),
            other => panic!("expected a double, got {:?}", other),
        }
    }

    #[test]
    fn test_enum_attribute() {
        let root = as_object(
            compile(&format!(
                "<Rectangle xmlns=\"{}\" Visibility=\"Collapsed\"/>",
                PRESENTATION_2006
            ))
            .unwrap(),
        );
        assert_eq!(get(&root, "Visibility"), Some(Value::Int32(1)));
    }

    #[test]
    fn test_attached_property() {
        let root = as_object(
            compile(&format!(
                "<Canvas xmlns=\"{}\"><Rectangle Canvas.Left=\"12\"/></Canvas>",
                PRESENTATION_2006
            ))
            .unwrap(),
        );
        let rect = as_object(children(&root).remove(0));
        assert_eq!(
            get_attached(&rect, "Canvas", "Left"),
            Some(Value::Double(12.0))
        );
    }

    #[test]
    fn test_duplicate_attribute() {
        let err = expect_error(&format!(
            "<Rectangle xmlns=\"{}\" Width=\"1\" Width=\"2\"/>",
            PRESENTATION_2006
        ));
        assert_eq!(err.code, ErrorCode::DuplicateAssignment);
        assert_eq!(err.element.as_deref(), Some("Rectangle"));
        assert_eq!(err.attribute.as_deref(), Some("Width"));
        assert!(err.line >= 1);
    }

    #[test]
    fn test_attribute_then_property_element_is_duplicate() {
        let err = expect_error(&format!(
            "<Rectangle xmlns=\"{}\" Width=\"1\">\
             <Rectangle.Width>2</Rectangle.Width></Rectangle>",
            PRESENTATION_2006
        ));
        assert_eq!(err.code, ErrorCode::DuplicateAssignment);
        assert_eq!(err.attribute.as_deref(), Some("Rectangle.Width"));
    }

    #[test]
    fn test_bad_literal_latches() {
        let err = expect_error(&format!(
            "<Rectangle xmlns=\"{}\" Width=\"wide\"/>",
            PRESENTATION_2006
        ));
        assert_eq!(err.code, ErrorCode::InvalidAttributeValue);
    }

    #[test]
    fn test_text_content_collapses_whitespace() {
        let root = as_object(
            compile(&format!(
                "<TextBlock xmlns=\"{}\">  a \n  b  </TextBlock>",
                PRESENTATION_2006
            ))
            .unwrap(),
        );
        assert_eq!(
            get(&root, "Text"),
            Some(Value::String(" a b ".to_string()))
        );
    }

    #[test]
    fn test_verbatim_string_keeps_inner_whitespace() {
        let value = compile(&format!(
            "<s:String xmlns:s=\"{}\">  a   b  </s:String>",
            PRIMITIVE
        ))
        .unwrap();
        assert_eq!(value, Value::String("a   b".to_string()));
    }

    #[test]
    fn test_primitive_double_root() {
        let value = compile(&format!(
            "<s:Double xmlns:s=\"{}\">1.5</s:Double>",
            PRIMITIVE
        ))
        .unwrap();
        assert_eq!(value, Value::Double(1.5));
    }

    #[test]
    fn test_implicit_content_collection() {
        let root = as_object(
            compile(&format!(
                "<Canvas xmlns=\"{}\"><Rectangle/><Ellipse/></Canvas>",
                PRESENTATION_2006
            ))
            .unwrap(),
        );
        let items = children(&root);
        assert_eq!(items.len(), 2);
        // Children carry a weak link back to the canvas
        let rect = as_object(items[0].clone());
        assert!(rect.borrow().parent().is_some());
    }

    #[test]
    fn test_property_element_splices_content_collection() {
        let root = as_object(
            compile(&format!(
                "<Canvas xmlns=\"{}\"><Canvas.Children><Rectangle/>\
                 </Canvas.Children><Ellipse/></Canvas>",
                PRESENTATION_2006
            ))
            .unwrap(),
        );
        // Both children land in the one spliced collection
        assert_eq!(children(&root).len(), 2);
    }

    #[test]
    fn test_second_children_property_element_is_duplicate() {
        let err = expect_error(&format!(
            "<Canvas xmlns=\"{}\"><Canvas.Children/><Canvas.Children/></Canvas>",
            PRESENTATION_2006
        ));
        assert_eq!(err.code, ErrorCode::DuplicateAssignment);
    }

    #[test]
    fn test_name_registration_and_collision() {
        let root = as_object(
            compile(&format!(
                "<Canvas xmlns=\"{}\" xmlns:x=\"{}\"><Rectangle x:Name=\"r\"/></Canvas>",
                PRESENTATION_2006, DIRECTIVE
            ))
            .unwrap(),
        );
        let rect = as_object(children(&root).remove(0));
        assert_eq!(rect.borrow().name(), Some("r"));

        let err = expect_error(&format!(
            "<Canvas xmlns=\"{}\" xmlns:x=\"{}\">\
             <Rectangle x:Name=\"r\"/><Ellipse x:Name=\"r\"/></Canvas>",
            PRESENTATION_2006, DIRECTIVE
        ));
        assert_eq!(err.code, ErrorCode::DuplicateName);
    }

    #[test]
    fn test_ignorable_subtree_builds_nothing() {
        let root = as_object(
            compile(&format!(
                "<Canvas xmlns=\"{}\" xmlns:mc=\"{}\" \
                 xmlns:d=\"http://example.com/design\" mc:Ignorable=\"d\">\
                 <d:Hint Advice=\"none\"><d:Inner/></d:Hint><Rectangle/></Canvas>",
                PRESENTATION_2006, COMPATIBILITY
            ))
            .unwrap(),
        );
        assert_eq!(children(&root).len(), 1);
    }

    #[test]
    fn test_unknown_element() {
        let err = expect_error(&format!("<Bogus xmlns=\"{}\"/>", PRESENTATION_2006));
        assert_eq!(err.code, ErrorCode::UnknownElement);
        assert_eq!(err.element.as_deref(), Some("Bogus"));
    }

    #[test]
    fn test_unbound_prefix() {
        let err = expect_error(&format!(
            "<Canvas xmlns=\"{}\"><q:Thing/></Canvas>",
            PRESENTATION_2006
        ));
        assert_eq!(err.code, ErrorCode::UnresolvedNamespace);
    }

    #[test]
    fn test_unclosed_document() {
        let err = expect_error(&format!("<Canvas xmlns=\"{}\">", PRESENTATION_2006));
        assert_eq!(err.code, ErrorCode::MalformedMarkup);
    }

    #[test]
    fn test_empty_input_has_no_root() {
        let err = expect_error("");
        assert_eq!(err.code, ErrorCode::MalformedMarkup);
    }

    #[test]
    fn test_content_after_root() {
        let err = expect_error(&format!(
            "<Rectangle xmlns=\"{}\"/><Rectangle/>",
            PRESENTATION_2006
        ));
        assert_eq!(err.code, ErrorCode::MalformedMarkup);
    }

    #[test]
    fn test_template_body_is_deferred() {
        let root = as_object(
            compile(&format!(
                "<ControlTemplate xmlns=\"{}\"><Canvas><Rectangle Width=\"5\"/>\
                 </Canvas></ControlTemplate>",
                PRESENTATION_2006
            ))
            .unwrap(),
        );
        let body = root.borrow().deferred_body().unwrap();
        assert_eq!(
            body.markup,
            "<Canvas><Rectangle Width=\"5\"/></Canvas>"
        );
        // The body was captured, not instantiated
        assert!(children(&root).is_empty());
    }

    #[test]
    fn test_template_with_nested_same_name() {
        let root = as_object(
            compile(&format!(
                "<ControlTemplate xmlns=\"{}\"><ControlTemplate>\
                 <Rectangle/></ControlTemplate></ControlTemplate>",
                PRESENTATION_2006
            ))
            .unwrap(),
        );
        let body = root.borrow().deferred_body().unwrap();
        assert_eq!(
            body.markup,
            "<ControlTemplate><Rectangle/></ControlTemplate>"
        );
    }

    #[test]
    fn test_template_two_roots_rejected() {
        let err = expect_error(&format!(
            "<ControlTemplate xmlns=\"{}\"><Rectangle/><Ellipse/></ControlTemplate>",
            PRESENTATION_2006
        ));
        assert_eq!(err.code, ErrorCode::TemplateValidationFailure);
    }

    #[test]
    fn test_template_prefix_snapshot() {
        let root = as_object(
            compile(&format!(
                "<ControlTemplate xmlns=\"{}\" xmlns:x=\"{}\"><Rectangle/></ControlTemplate>",
                PRESENTATION_2006, DIRECTIVE
            ))
            .unwrap(),
        );
        let body = root.borrow().deferred_body().unwrap();
        assert!(body
            .prefixes
            .iter()
            .any(|(p, uri)| p.as_deref() == Some("x") && uri == DIRECTIVE));
    }

    #[test]
    fn test_static_resource_from_enclosing_dictionary() {
        let root = as_object(
            compile(&format!(
                "<Canvas xmlns=\"{}\" xmlns:x=\"{}\" xmlns:s=\"{}\">\
                 <Canvas.Resources><s:Double x:Key=\"W\">42</s:Double></Canvas.Resources>\
                 <Rectangle Width=\"{{StaticResource W}}\"/></Canvas>",
                PRESENTATION_2006, DIRECTIVE, PRIMITIVE
            ))
            .unwrap(),
        );
        let rect = as_object(children(&root).remove(0));
        assert_eq!(get(&rect, "Width"), Some(Value::Double(42.0)));
    }

    #[test]
    fn test_missing_static_resource() {
        let err = expect_error(&format!(
            "<Rectangle xmlns=\"{}\" Width=\"{{StaticResource nope}}\"/>",
            PRESENTATION_2006
        ));
        assert_eq!(err.code, ErrorCode::InvalidAttributeValue);
    }

    #[test]
    fn test_dictionary_duplicate_key() {
        let err = expect_error(&format!(
            "<Canvas xmlns=\"{}\" xmlns:x=\"{}\" xmlns:s=\"{}\"><Canvas.Resources>\
             <s:Double x:Key=\"W\">1</s:Double><s:Double x:Key=\"W\">2</s:Double>\
             </Canvas.Resources></Canvas>",
            PRESENTATION_2006, DIRECTIVE, PRIMITIVE
        ));
        assert_eq!(err.code, ErrorCode::DuplicateName);
    }

    #[test]
    fn test_dictionary_entry_requires_key() {
        let err = expect_error(&format!(
            "<Canvas xmlns=\"{}\" xmlns:s=\"{}\"><Canvas.Resources>\
             <s:Double>1</s:Double></Canvas.Resources></Canvas>",
            PRESENTATION_2006, PRIMITIVE
        ));
        assert_eq!(err.code, ErrorCode::IllegalDirectivePlacement);
    }

    #[test]
    fn test_global_resources_fallback() {
        struct Global;
        impl KeyedLookup for Global {
            fn lookup(&self, key: &str) -> Option<Value> {
                (key == "W").then(|| Value::Double(7.0))
            }
        }
        let root = as_object(
            Compiler::new()
                .with_global_resources(&Global)
                .compile_str(&format!(
                    "<Rectangle xmlns=\"{}\" Width=\"{{StaticResource W}}\"/>",
                    PRESENTATION_2006
                ))
                .unwrap(),
        );
        assert_eq!(get(&root, "Width"), Some(Value::Double(7.0)));
    }

    #[test]
    fn test_xml_lang_recorded_on_object() {
        let root = as_object(
            compile(&format!(
                "<Canvas xmlns=\"{}\" xml:lang=\"en-US\"/>",
                PRESENTATION_2006
            ))
            .unwrap(),
        );
        assert_eq!(root.borrow().language(), Some("en-US"));
    }

    #[test]
    fn test_bridge_element_and_property() {
        #[derive(Default)]
        struct RecordingBridge {
            sets: RefCell<Vec<(String, Value)>>,
        }
        impl RuntimeBridge for RecordingBridge {
            fn lookup_object(&self, _uri: &str, tag: &str, _create: bool) -> Option<ObjectRef> {
                (tag == "Widget").then(|| crate::model::Object::new(crate::catalog::TypeId(900)))
            }
            fn set_property(&self, _object: &ObjectRef, name: &str, value: &Value) -> bool {
                self.sets.borrow_mut().push((name.to_string(), value.clone()));
                true
            }
            fn add_child(&self, _parent: &ObjectRef, _child: &ObjectRef) -> bool {
                true
            }
            fn content_property_name(&self, _object: &ObjectRef) -> Option<String> {
                None
            }
        }

        let bridge = RecordingBridge::default();
        let root = Compiler::new()
            .with_bridge(&bridge)
            .compile_str(&format!(
                "<Canvas xmlns=\"{}\" xmlns:c=\"clr-namespace:MyApp\">\
                 <c:Widget Label=\"hi\"/></Canvas>",
                PRESENTATION_2006
            ))
            .unwrap();
        let items = children(&as_object(root));
        assert_eq!(items.len(), 1);
        let sets = bridge.sets.borrow();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].0, "Label");
        assert_eq!(sets[0].1, Value::String("hi".to_string()));
    }

    #[test]
    fn test_bridge_allocates_once_per_element() {
        #[derive(Default)]
        struct CountingBridge {
            creates: RefCell<usize>,
        }
        impl RuntimeBridge for CountingBridge {
            fn lookup_object(&self, _uri: &str, tag: &str, create: bool) -> Option<ObjectRef> {
                if tag != "Widget" {
                    return None;
                }
                if create {
                    *self.creates.borrow_mut() += 1;
                }
                Some(crate::model::Object::new(crate::catalog::TypeId(901)))
            }
            fn set_property(&self, _object: &ObjectRef, _name: &str, _value: &Value) -> bool {
                true
            }
            fn add_child(&self, _parent: &ObjectRef, _child: &ObjectRef) -> bool {
                true
            }
            fn content_property_name(&self, _object: &ObjectRef) -> Option<String> {
                None
            }
        }

        let bridge = CountingBridge::default();
        Compiler::new()
            .with_bridge(&bridge)
            .compile_str(&format!(
                "<c:Widget xmlns:c=\"clr-namespace:MyApp\" xmlns=\"{}\"/>",
                PRESENTATION_2006
            ))
            .unwrap();
        assert_eq!(*bridge.creates.borrow(), 1);
    }

    #[test]
    fn test_unknown_element_degrades_without_bridge() {
        let err = expect_error(&format!(
            "<c:Widget xmlns:c=\"clr-namespace:MyApp\" xmlns=\"{}\"/>",
            PRESENTATION_2006
        ));
        assert_eq!(err.code, ErrorCode::UnknownElement);
    }

    #[test]
    fn test_class_rehydrates_supplied_root() {
        let catalog = TypeCatalog::builtin();
        let supplied = catalog.resolve_type("Canvas").unwrap().create_instance();
        let root = as_object(
            Compiler::new()
                .with_root(supplied.clone())
                .compile_str(&format!(
                    "<Canvas xmlns=\"{}\" xmlns:x=\"{}\" x:Class=\"App.Main\">\
                     <Rectangle/></Canvas>",
                    PRESENTATION_2006, DIRECTIVE
                ))
                .unwrap(),
        );
        assert!(Rc::ptr_eq(&root, &supplied));
        assert_eq!(children(&supplied).len(), 1);
    }

    #[test]
    fn test_class_illegal_off_root() {
        let err = expect_error(&format!(
            "<Canvas xmlns=\"{}\" xmlns:x=\"{}\"><Rectangle x:Class=\"App.R\"/></Canvas>",
            PRESENTATION_2006, DIRECTIVE
        ));
        assert_eq!(err.code, ErrorCode::IllegalDirectivePlacement);
    }

    #[test]
    fn test_border_single_child() {
        let root = as_object(
            compile(&format!(
                "<Border xmlns=\"{}\" CornerRadius=\"2\"><Rectangle/></Border>",
                PRESENTATION_2006
            ))
            .unwrap(),
        );
        assert!(matches!(get(&root, "Child"), Some(Value::Object(_))));
        let err = expect_error(&format!(
            "<Border xmlns=\"{}\"><Rectangle/><Ellipse/></Border>",
            PRESENTATION_2006
        ));
        assert_eq!(err.code, ErrorCode::DuplicateAssignment);
    }

    #[test]
    fn test_mismatched_end_tag() {
        let err = expect_error(&format!(
            "<Canvas xmlns=\"{}\"><Rectangle></Canvas></Canvas>",
            PRESENTATION_2006
        ));
        assert_eq!(err.code, ErrorCode::MalformedMarkup);
    }
}
