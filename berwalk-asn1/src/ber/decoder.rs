//! Top-level decode entry points
//!
//! # Usage Example
//!
//! ```rust
//! use berwalk_asn1::ber::{BerDecoder, Registry};
//!
//! let registry = Registry::new();
//! let decoder = BerDecoder::new(&registry);
//! let decoded = decoder.decode(&[0x30, 0x03, 0x02, 0x01, 0x05]);
//! assert!(!decoded.is_malformed());
//! print!("{}", decoded.tree.render());
//! ```

use berwalk_core::{
    BerError, BerResult, DecodeConfig, Diagnostic, DiagnosticKind, FieldTree, Tvb,
};

use super::context::{DecodeContext, MAX_NESTING};
use super::dispatch::call_syntax_callback;
use super::registry::Registry;
use super::unknown::dissect_unknown_ber;

/// Stack reserved for each nesting level on the decode worker
const STACK_PER_LEVEL: usize = 64 * 1024;

/// Result of one top-level decode
#[derive(Debug)]
pub struct Decoded {
    pub tree: FieldTree,
    pub diagnostics: Vec<Diagnostic>,
    /// Offset decoding stopped at
    pub offset: usize,
    /// Structural error that stopped the decode
    pub malformed: Option<BerError>,
}

impl Decoded {
    pub fn is_malformed(&self) -> bool {
        self.malformed.is_some()
    }
}

/// Decoder for whole buffers
///
/// Holds the frozen registry and the configuration; every decode call runs
/// in a fresh [`DecodeContext`], so one decoder can serve any number of
/// buffers.
///
/// # Error Handling
///
/// Recoverable problems end up in [`Decoded::diagnostics`]. A structural
/// error (see [`BerError`]) stops the decode: it is recorded as a
/// `Malformed` diagnostic spanning the whole buffer, `ShortFrame` when the
/// capture was cut short, and returned in [`Decoded::malformed`] next to the
/// partial tree.
///
/// Each decode runs on a scoped worker thread whose stack is sized for
/// [`MAX_NESTING`] levels, so the nesting bound is what stops deep input
/// rather than the caller's stack.
pub struct BerDecoder<'r> {
    registry: &'r Registry,
    config: DecodeConfig,
}

impl<'r> BerDecoder<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self::with_config(registry, DecodeConfig::default())
    }

    pub fn with_config(registry: &'r Registry, config: DecodeConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decode every TLV in `data`
    ///
    /// With `decode_as_syntax` configured the buffer goes to that syntax's
    /// handler; otherwise consecutive TLVs are walked without a schema.
    pub fn decode(&self, data: &[u8]) -> Decoded {
        self.decode_payload(data, 0, self.config.decode_as_syntax.as_deref())
    }

    /// Decode `data` from `offset`, handing it to the handler of `hint`
    /// when given
    pub fn decode_payload(&self, data: &[u8], offset: usize, hint: Option<&str>) -> Decoded {
        self.run(Tvb::new(data), |ctx, tvb| payload(ctx, tvb, offset, hint))
    }

    /// Decode a capture holding the first `data.len()` of `reported_len`
    /// bytes
    ///
    /// Reads past the captured bytes stop the decode as a short frame.
    pub fn decode_capture(&self, data: &[u8], reported_len: usize) -> Decoded {
        let hint = self.config.decode_as_syntax.as_deref();
        self.run(Tvb::with_reported_length(data, reported_len), |ctx, tvb| {
            payload(ctx, tvb, 0, hint)
        })
    }

    /// Decode `data` with an arbitrary decoder
    ///
    /// `f` receives a fresh context and a view of the whole buffer and
    /// returns the offset it stopped at.
    pub fn decode_with<F>(&self, data: &[u8], f: F) -> Decoded
    where
        F: FnOnce(&mut DecodeContext<'_>, Tvb<'_>) -> BerResult<usize> + Send,
    {
        self.run(Tvb::new(data), f)
    }

    fn run<F>(&self, tvb: Tvb<'_>, f: F) -> Decoded
    where
        F: FnOnce(&mut DecodeContext<'_>, Tvb<'_>) -> BerResult<usize> + Send,
    {
        let worker = std::thread::Builder::new()
            .name("berwalk-decode".to_string())
            .stack_size(MAX_NESTING * STACK_PER_LEVEL);
        std::thread::scope(|scope| {
            let spawned = worker.spawn_scoped(scope, || self.run_on_worker(tvb, f));
            match spawned {
                Ok(handle) => handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
                Err(err) => {
                    log::warn!("Cannot start decode worker: {}", err);
                    let diagnostic = Diagnostic::new(
                        DiagnosticKind::Malformed,
                        tvb.origin(),
                        tvb.len(),
                        format!("decode worker not started: {}", err),
                    );
                    Decoded {
                        tree: FieldTree::new(),
                        diagnostics: vec![diagnostic],
                        offset: 0,
                        malformed: Some(BerError::Io(err)),
                    }
                }
            }
        })
    }

    fn run_on_worker<F>(&self, tvb: Tvb<'_>, f: F) -> Decoded
    where
        F: FnOnce(&mut DecodeContext<'_>, Tvb<'_>) -> BerResult<usize>,
    {
        let mut ctx = DecodeContext::new(self.registry, &self.config);
        let (offset, malformed) = match f(&mut ctx, tvb) {
            Ok(offset) => (offset, None),
            Err(err) => {
                log::warn!("Decode stopped, {} byte buffer is malformed: {}", tvb.len(), err);
                let kind = if err.is_truncation() {
                    DiagnosticKind::ShortFrame
                } else {
                    DiagnosticKind::Malformed
                };
                ctx.push_diagnostic(Diagnostic::new(kind, tvb.origin(), tvb.len(), err.to_string()));
                (tvb.len(), Some(err))
            }
        };

        let (tree, diagnostics) = ctx.into_parts();
        Decoded {
            tree,
            diagnostics,
            offset,
            malformed,
        }
    }
}

fn payload(ctx: &mut DecodeContext<'_>, tvb: Tvb<'_>, offset: usize, hint: Option<&str>) -> BerResult<usize> {
    if let Some(syntax) = hint {
        return call_syntax_callback(Some(syntax), tvb, offset, ctx, None);
    }

    let mut offset = offset;
    while offset < tvb.len() {
        let next = dissect_unknown_ber(ctx, tvb, offset, None)?;
        if next <= offset {
            return Err(BerError::NoProgress {
                offset: tvb.absolute(offset),
            });
        }
        offset = next;
    }
    Ok(offset)
}
