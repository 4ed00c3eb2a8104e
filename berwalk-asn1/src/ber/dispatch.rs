//! Handing values to the decoder registered for their OID or syntax

use berwalk_core::{BerResult, DiagnosticKind, FieldValue, NodeId, Tvb};

use super::context::DecodeContext;
use super::fields;
use super::reader::read_header;
use super::registry::OidHandler;
use super::unknown::dissect_unknown_ber;

/// Decode the value at `offset` with the handler for `oid`
///
/// A syntax associated with the OID is tried first, then a handler
/// registered for the OID itself. Without either the rest of the view is
/// reported as not implemented and, with `decode_unexpected`, rendered
/// generically. The NULL placeholder `05 00` is skipped silently.
///
/// # Returns
/// `offset` plus the bytes the handler consumed, or the end of the view
/// when nothing handled the value.
pub fn call_oid_callback(
    oid: Option<&str>,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
) -> BerResult<usize> {
    let next = tvb.subset_remaining(offset)?;
    let registry = ctx.registry();
    let syntax = oid.and_then(|oid| registry.oid_syntax(oid));

    if let Some(syntax) = syntax {
        if let Some(handler) = registry.syntax_handler(syntax) {
            let len = run(handler.as_ref(), ctx, next, parent)?;
            if len != 0 {
                return Ok(offset + len);
            }
        }
    }
    if let Some(handler) = oid.and_then(|oid| registry.oid_handler(oid)) {
        let len = run(handler.as_ref(), ctx, next, parent)?;
        if len != 0 {
            return Ok(offset + len);
        }
    }

    let remaining = tvb.remaining(offset);
    match (oid, syntax) {
        (None, _) => {
            ctx.report(
                DiagnosticKind::NoOid,
                parent,
                &next,
                0,
                remaining,
                "BER: No OID supplied to call_oid_callback",
            );
        }
        _ if next.rest(0).starts_with(&[0x05, 0x00]) => {}
        (Some(_), Some(syntax)) => {
            log::debug!("No handler for syntax {}", syntax);
            ctx.report(
                DiagnosticKind::SyntaxNotImplemented,
                parent,
                &next,
                0,
                remaining,
                format!("BER: Dissector for syntax:{} not implemented.", syntax),
            );
        }
        (Some(oid), None) => {
            log::debug!("No handler for OID {}", oid);
            ctx.report(
                DiagnosticKind::OidNotImplemented,
                parent,
                &next,
                0,
                remaining,
                format!("BER: Dissector for OID:{} not implemented.", oid),
            );
        }
    }

    if ctx.config().decode_unexpected {
        let whole_tlv = read_header(&next, 0, ctx.depth())
            .map(|h| h.header_len + h.length == remaining)
            .unwrap_or(false);
        if whole_tlv {
            dissect_unknown_ber(ctx, next, 0, parent)?;
        } else {
            let data = next.rest(0).to_vec();
            ctx.add_item(
                parent,
                &fields::UNKNOWN_DATA,
                &next,
                0,
                remaining,
                FieldValue::Bytes(data),
            );
        }
    }

    Ok(offset + remaining)
}

/// Decode the value at `offset` with the handler registered for `syntax`
///
/// # Returns
/// `offset` plus the bytes the handler consumed, or the end of the view
/// when no handler took the value.
pub fn call_syntax_callback(
    syntax: Option<&str>,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
) -> BerResult<usize> {
    let next = tvb.subset_remaining(offset)?;
    if let Some(handler) = syntax.and_then(|s| ctx.registry().syntax_handler(s)) {
        let len = run(handler.as_ref(), ctx, next, parent)?;
        if len != 0 {
            return Ok(offset + len);
        }
    }

    let remaining = tvb.remaining(offset);
    match syntax {
        None => ctx.report(
            DiagnosticKind::NoSyntax,
            parent,
            &next,
            0,
            remaining,
            "BER: No syntax supplied to call_syntax_callback",
        ),
        Some(syntax) => {
            log::debug!("No handler for syntax {}", syntax);
            ctx.report(
                DiagnosticKind::SyntaxNotImplemented,
                parent,
                &next,
                0,
                remaining,
                format!("BER: Dissector for syntax:{} not implemented.", syntax),
            );
        }
    }

    if ctx.config().decode_unexpected {
        dissect_unknown_ber(ctx, next, 0, parent)?;
    }
    Ok(offset + remaining)
}

fn run(
    handler: &dyn OidHandler,
    ctx: &mut DecodeContext<'_>,
    tvb: Tvb<'_>,
    parent: Option<NodeId>,
) -> BerResult<usize> {
    ctx.nested(|ctx| handler.dissect(ctx, tvb, parent))
}
