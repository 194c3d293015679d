//! Value type registry.
//!
//! Holds the registered handlers in descending priority order and routes a
//! runtime [`Value`] to the first handler that supports it. Registration
//! re-sorts with a stable sort, so equal priorities keep registration order.

use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::crypto::EncryptionKey;
use crate::error::{RegistryError, ValueTypeError};
use crate::handlers::{self, ValueHandler};
use crate::value::Value;

/// Ordered set of value type handlers.
#[derive(Clone, Default)]
pub struct ValueTypeRegistry {
    handlers: Vec<Arc<dyn ValueHandler>>,
}

impl ValueTypeRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the four built-in handlers.
    #[must_use]
    pub fn with_defaults() -> Self {
        let handlers = handlers::BUILTIN_TAGS
            .into_iter()
            .filter_map(handlers::builtin)
            .collect();
        let mut registry = Self { handlers };
        registry.sort();
        registry
    }

    /// Build a registry from a list of built-in tags, in order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidHandlerRegistration`] for an unknown,
    /// empty, or repeated tag.
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for tag in tags {
            registry.register_named(tag.as_ref())?;
        }
        Ok(registry)
    }

    /// Register a handler and re-sort by priority.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidHandlerRegistration`] if the handler
    /// has an empty tag or its tag is already registered.
    pub fn register(&mut self, handler: Arc<dyn ValueHandler>) -> Result<(), RegistryError> {
        let tag = handler.tag();
        if tag.trim().is_empty() {
            return Err(invalid(tag, "handler tag is empty"));
        }
        if self.handler(tag).is_some() {
            return Err(invalid(tag, "a handler with this tag is already registered"));
        }
        debug!(tag, priority = handler.priority(), "registered value type handler");
        self.handlers.push(handler);
        self.sort();
        Ok(())
    }

    /// Register a built-in handler by its tag.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidHandlerRegistration`] if the tag names
    /// no built-in handler or is already registered.
    pub fn register_named(&mut self, tag: &str) -> Result<(), RegistryError> {
        let handler = handlers::builtin(tag.trim())
            .ok_or_else(|| invalid(tag, "no built-in value type with this tag"))?;
        self.register(handler)
    }

    /// Route `value` to the highest-priority handler that supports it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoHandlerFound`] if no handler matches.
    pub fn resolve(&self, value: Value) -> Result<ResolvedValue, RegistryError> {
        let handler = Arc::clone(self.find(&value)?);
        Ok(ResolvedValue { handler, value })
    }

    /// Tag of the handler [`resolve`](Self::resolve) would pick, without
    /// taking the value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoHandlerFound`] if no handler matches.
    pub fn find_type(&self, value: &Value) -> Result<&'static str, RegistryError> {
        self.find(value).map(|handler| handler.tag())
    }

    /// Look up a registered handler by tag.
    pub fn handler(&self, tag: &str) -> Option<&Arc<dyn ValueHandler>> {
        self.handlers.iter().find(|handler| handler.tag() == tag)
    }

    /// Registered tags in resolution order.
    pub fn tags(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|handler| handler.tag()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn find(&self, value: &Value) -> Result<&Arc<dyn ValueHandler>, RegistryError> {
        self.handlers
            .iter()
            .find(|handler| handler.supports(value))
            .ok_or(RegistryError::NoHandlerFound { kind: value.kind() })
    }

    fn sort(&mut self) {
        // Stable: ties keep registration order.
        self.handlers.sort_by_key(|handler| Reverse(handler.priority()));
    }
}

impl fmt::Debug for ValueTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueTypeRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

/// A value paired with the handler that will encode it.
#[derive(Debug, Clone)]
pub struct ResolvedValue {
    handler: Arc<dyn ValueHandler>,
    value: Value,
}

impl ResolvedValue {
    pub fn tag(&self) -> &'static str {
        self.handler.tag()
    }

    pub fn priority(&self) -> i32 {
        self.handler.priority()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn handler(&self) -> &Arc<dyn ValueHandler> {
        &self.handler
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Seal the loaded value with `key`.
    ///
    /// # Errors
    ///
    /// Propagates the handler's [`ValueTypeError`].
    pub fn encrypt(&self, key: &EncryptionKey) -> Result<String, ValueTypeError> {
        self.handler.encrypt(&self.value, key)
    }

    /// Plain serialization of the loaded value.
    ///
    /// # Errors
    ///
    /// Propagates the handler's [`ValueTypeError`].
    pub fn serialize(&self) -> Result<Vec<u8>, ValueTypeError> {
        self.handler.serialize(&self.value)
    }
}

fn invalid(tag: &str, reason: &str) -> RegistryError {
    RegistryError::InvalidHandlerRegistration {
        tag: tag.to_owned(),
        reason: reason.to_owned(),
    }
}
