//! OID and syntax handler registry
//!
//! Protocol modules register their handlers once, before any decode call;
//! afterwards the registry is only read, so one instance can be shared by
//! every decode running on any thread.

use std::collections::HashMap;
use std::sync::Arc;

use berwalk_core::{BerResult, NodeId, ObjectIdentifier, Tvb};

use super::context::DecodeContext;

/// Decoder for the value identified by an OID or syntax name
///
/// The view starts at the value. Returning 0 declines the value, letting
/// dispatch fall back to the next lookup.
pub trait OidHandler: Send + Sync {
    fn dissect(
        &self,
        ctx: &mut DecodeContext<'_>,
        tvb: Tvb<'_>,
        parent: Option<NodeId>,
    ) -> BerResult<usize>;
}

/// Plain function usable as an [`OidHandler`]
pub type HandlerFn =
    fn(ctx: &mut DecodeContext<'_>, tvb: Tvb<'_>, parent: Option<NodeId>) -> BerResult<usize>;

struct FnHandler(HandlerFn);

impl OidHandler for FnHandler {
    fn dissect(
        &self,
        ctx: &mut DecodeContext<'_>,
        tvb: Tvb<'_>,
        parent: Option<NodeId>,
    ) -> BerResult<usize> {
        (self.0)(ctx, tvb, parent)
    }
}

/// Handler that accepts a value without decoding it
pub struct ConsumeAll;

impl OidHandler for ConsumeAll {
    fn dissect(
        &self,
        _ctx: &mut DecodeContext<'_>,
        tvb: Tvb<'_>,
        _parent: Option<NodeId>,
    ) -> BerResult<usize> {
        Ok(tvb.captured_len())
    }
}

/// Registered handlers, OID names and OID-to-syntax associations
#[derive(Default)]
pub struct Registry {
    oids: HashMap<String, Arc<dyn OidHandler>>,
    syntaxes: HashMap<String, Arc<dyn OidHandler>>,
    oid_names: HashMap<String, String>,
    oid_syntax: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for values identified by `oid`
    ///
    /// `name` also becomes the display name of the OID.
    ///
    /// # Errors
    /// `InvalidOid` when `oid` is not in dotted form.
    pub fn register_oid_dissector(
        &mut self,
        oid: &str,
        handler: Arc<dyn OidHandler>,
        name: &str,
    ) -> BerResult<()> {
        ObjectIdentifier::parse(oid)?;
        log::debug!("Registering OID handler {} ({})", oid, name);
        self.oids.insert(oid.to_string(), handler);
        if !name.is_empty() {
            self.oid_names.insert(oid.to_string(), name.to_string());
        }
        Ok(())
    }

    /// Register a plain function for values identified by `oid`
    pub fn register_oid_fn(&mut self, oid: &str, handler: HandlerFn, name: &str) -> BerResult<()> {
        self.register_oid_dissector(oid, Arc::new(FnHandler(handler)), name)
    }

    /// Register a handler under a syntax name, e.g. `"X.509 Certificate"`
    pub fn register_syntax_dissector(&mut self, syntax: &str, handler: Arc<dyn OidHandler>) {
        log::debug!("Registering syntax handler {}", syntax);
        self.syntaxes.insert(syntax.to_string(), handler);
    }

    pub fn register_syntax_fn(&mut self, syntax: &str, handler: HandlerFn) {
        self.register_syntax_dissector(syntax, Arc::new(FnHandler(handler)));
    }

    /// Associate `oid` with a syntax and, when non-empty, a display name
    ///
    /// A syntax association takes precedence over a handler registered for
    /// the OID itself.
    pub fn register_oid_syntax(&mut self, oid: &str, name: &str, syntax: &str) -> BerResult<()> {
        ObjectIdentifier::parse(oid)?;
        if !syntax.is_empty() {
            self.oid_syntax.insert(oid.to_string(), syntax.to_string());
        }
        if !name.is_empty() {
            self.oid_names.insert(oid.to_string(), name.to_string());
        }
        Ok(())
    }

    /// Give `oid` a display name
    pub fn register_oid_name(&mut self, oid: &str, name: &str) -> BerResult<()> {
        ObjectIdentifier::parse(oid)?;
        self.oid_names.insert(oid.to_string(), name.to_string());
        Ok(())
    }

    pub fn oid_name(&self, oid: &str) -> Option<&str> {
        self.oid_names.get(oid).map(String::as_str)
    }

    pub fn oid_syntax(&self, oid: &str) -> Option<&str> {
        self.oid_syntax.get(oid).map(String::as_str)
    }

    pub fn has_oid_handler(&self, oid: &str) -> bool {
        self.oids.contains_key(oid)
    }

    pub fn has_syntax_handler(&self, syntax: &str) -> bool {
        self.syntaxes.contains_key(syntax)
    }

    pub(crate) fn oid_handler(&self, oid: &str) -> Option<Arc<dyn OidHandler>> {
        self.oids.get(oid).cloned()
    }

    pub(crate) fn syntax_handler(&self, syntax: &str) -> Option<Arc<dyn OidHandler>> {
        self.syntaxes.get(syntax).cloned()
    }

    /// Registered syntax names in sorted order
    pub fn syntax_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.syntaxes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("oids", &self.oids.len())
            .field("syntaxes", &self.syntax_names())
            .field("oid_names", &self.oid_names.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nothing(_ctx: &mut DecodeContext<'_>, _tvb: Tvb<'_>, _parent: Option<NodeId>) -> BerResult<usize> {
        Ok(0)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry.register_oid_fn("1.2.3", nothing, "test-oid").unwrap();
        registry.register_syntax_fn("Zeta", nothing);
        registry.register_syntax_fn("Alpha", nothing);
        registry
            .register_oid_syntax("2.5.4.3", "id-at-commonName", "DirectoryString")
            .unwrap();

        assert!(registry.has_oid_handler("1.2.3"));
        assert!(!registry.has_oid_handler("1.2.4"));
        assert_eq!(registry.oid_name("1.2.3"), Some("test-oid"));
        assert_eq!(registry.oid_name("2.5.4.3"), Some("id-at-commonName"));
        assert_eq!(registry.oid_syntax("2.5.4.3"), Some("DirectoryString"));
        assert_eq!(registry.syntax_names(), vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn test_rejects_malformed_oid() {
        let mut registry = Registry::new();
        assert!(registry.register_oid_fn("1..2", nothing, "bad").is_err());
        assert!(registry.register_oid_name("not an oid", "bad").is_err());
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
