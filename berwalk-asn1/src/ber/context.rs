//! Per-call decode state

use berwalk_core::{
    BerError, BerResult, DecodeConfig, Diagnostic, DiagnosticKind, FieldRef, FieldTree,
    FieldValue, NodeId, TreeCheckpoint, Tvb,
};

use super::reassembly::ReassemblyTable;
use super::registry::Registry;
use super::schema::FieldDecoder;
use super::types::TlvHeader;

/// Bound on nesting across indefinite-length lookahead, constructed
/// resolvers and fragment reassembly
pub const MAX_NESTING: usize = 500;

/// Branch taken by the `encoding` CHOICE of an EXTERNAL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalEncoding {
    SingleAsn1Type,
    OctetAligned,
    Arbitrary,
}

/// Values collected while decoding one EXTERNAL or EMBEDDED PDV
#[derive(Debug, Clone, Default)]
pub struct ExternalScratch {
    pub direct_reference: Option<String>,
    pub indirect_reference: Option<i64>,
    pub data_value_descriptor: Option<String>,
    pub encoding: Option<ExternalEncoding>,
    /// Caller-supplied decoder for the encoded value
    pub callback: Option<FieldDecoder>,
}

/// Mark to return the tree and diagnostics to after a failed attempt
#[derive(Debug, Clone, Copy)]
pub struct ContextCheckpoint {
    tree: TreeCheckpoint,
    diagnostics: usize,
}

/// State of one top-level decode call
///
/// Created fresh for every buffer and consumed at the end; nothing in it is
/// shared between calls. The registry and configuration are borrowed
/// read-only.
pub struct DecodeContext<'r> {
    registry: &'r Registry,
    config: &'r DecodeConfig,
    tree: FieldTree,
    diagnostics: Vec<Diagnostic>,
    depth: usize,
    last_header: Option<TlvHeader>,
    created_item: Option<NodeId>,
    reassembly: ReassemblyTable,
    pub external: ExternalScratch,
}

impl<'r> DecodeContext<'r> {
    pub fn new(registry: &'r Registry, config: &'r DecodeConfig) -> Self {
        Self {
            registry,
            config,
            tree: FieldTree::new(),
            diagnostics: Vec::new(),
            depth: 0,
            last_header: None,
            created_item: None,
            reassembly: ReassemblyTable::default(),
            external: ExternalScratch::default(),
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn config(&self) -> &'r DecodeConfig {
        self.config
    }

    pub fn tree(&self) -> &FieldTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut FieldTree {
        &mut self.tree
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_parts(self) -> (FieldTree, Vec<Diagnostic>) {
        (self.tree, self.diagnostics)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Run `f` one nesting level deeper
    ///
    /// # Errors
    /// `NestingTooDeep` once the depth would pass [`MAX_NESTING`].
    pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> BerResult<T>) -> BerResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(BerError::NestingTooDeep {
                depth: self.depth + 1,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Header most recently read by a decoder
    ///
    /// Decoders invoked with `implicit_tag` take their class, form and length
    /// from here, the caller having consumed the header already.
    pub fn last_header(&self) -> Option<TlvHeader> {
        self.last_header
    }

    pub fn set_last_header(&mut self, header: TlvHeader) {
        self.last_header = Some(header);
    }

    /// Node most recently created through [`add_item`](Self::add_item)
    pub fn created_item(&self) -> Option<NodeId> {
        self.created_item
    }

    pub fn reassembly(&mut self) -> &mut ReassemblyTable {
        &mut self.reassembly
    }

    /// Add a node for `field` covering `length` bytes at `offset` of `tvb`
    pub fn add_item(
        &mut self,
        parent: Option<NodeId>,
        field: FieldRef,
        tvb: &Tvb<'_>,
        offset: usize,
        length: usize,
        value: FieldValue,
    ) -> NodeId {
        let id = self
            .tree
            .add_field(parent, field, tvb.absolute(offset), length, value);
        self.created_item = Some(id);
        id
    }

    /// Add a node that has no registered field
    pub fn add_text(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        abbrev: impl Into<String>,
        tvb: &Tvb<'_>,
        offset: usize,
        length: usize,
        value: FieldValue,
    ) -> NodeId {
        let id = self
            .tree
            .add(parent, name, abbrev, tvb.absolute(offset), length, value);
        self.created_item = Some(id);
        id
    }

    /// Record a diagnostic about `length` bytes at `offset` of `tvb`
    pub fn report(
        &mut self,
        kind: DiagnosticKind,
        node: Option<NodeId>,
        tvb: &Tvb<'_>,
        offset: usize,
        length: usize,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic::new(kind, tvb.absolute(offset), length, message).with_node(node);
        log::debug!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn checkpoint(&self) -> ContextCheckpoint {
        ContextCheckpoint {
            tree: self.tree.checkpoint(),
            diagnostics: self.diagnostics.len(),
        }
    }

    /// Discard nodes and diagnostics added since `checkpoint`
    pub fn rollback(&mut self, checkpoint: ContextCheckpoint) {
        self.tree.rollback(checkpoint.tree);
        self.diagnostics.truncate(checkpoint.diagnostics);
        if self
            .created_item
            .is_some_and(|id| id.index() >= self.tree.len())
        {
            self.created_item = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_limit() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);

        fn descend(ctx: &mut DecodeContext<'_>, levels: usize) -> BerResult<usize> {
            if levels == 0 {
                return Ok(ctx.depth());
            }
            ctx.nested(|ctx| descend(ctx, levels - 1))
        }

        assert_eq!(descend(&mut ctx, MAX_NESTING).unwrap(), MAX_NESTING);
        assert_eq!(ctx.depth(), 0);
        assert!(matches!(
            descend(&mut ctx, MAX_NESTING + 1),
            Err(BerError::NestingTooDeep { .. })
        ));
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_rollback_drops_diagnostics() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0u8; 4];
        let tvb = Tvb::new(&data);

        let cp = ctx.checkpoint();
        let node = ctx.add_text(None, "x", "x", &tvb, 0, 1, FieldValue::None);
        ctx.report(DiagnosticKind::WrongField, Some(node), &tvb, 0, 1, "wrong");
        assert_eq!(ctx.diagnostics().len(), 1);

        ctx.rollback(cp);
        assert!(ctx.diagnostics().is_empty());
        assert!(ctx.tree().is_empty());
        assert_eq!(ctx.created_item(), None);
    }
}
