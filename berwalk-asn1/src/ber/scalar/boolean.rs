//! BOOLEAN and NULL

use berwalk_core::{BerResult, DiagnosticKind, FieldKind, FieldRef, FieldValue, NodeId, Tvb};

use crate::ber::context::DecodeContext;
use crate::ber::reader::dissect_header;
use crate::ber::types::{universal, BerTagClass};

use super::unexpected_type;

/// Decode a BOOLEAN
///
/// Any nonzero octet is true. Fields that are not of boolean kind receive
/// 0 or 1.
pub fn dissect_boolean(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<bool>)> {
    let (offset, len) = if !implicit_tag {
        let header = dissect_header(ctx, parent, &tvb, offset)?;
        if header.class() == BerTagClass::Universal
            && (header.is_constructed() || header.number() != universal::BOOLEAN)
        {
            unexpected_type(ctx, parent, &tvb, &header, "Boolean")?;
        }
        (header.content_offset(), header.content_len())
    } else {
        (offset, tvb.remaining(offset))
    };

    if len != 1 {
        ctx.report(
            DiagnosticKind::BooleanLength,
            parent,
            &tvb,
            offset,
            len,
            format!("BOOLEAN expect 1 byte length but Length={}", len),
        );
        if len == 0 {
            return Ok((offset, None));
        }
    }

    let value = tvb.byte(offset)? != 0;
    if let Some(f) = field {
        let field_value = if f.kind == FieldKind::Boolean {
            FieldValue::Boolean(value)
        } else {
            FieldValue::Unsigned(u64::from(value))
        };
        ctx.add_item(parent, f, &tvb, offset, 1, field_value);
    }

    // Bytes past the first are skipped along with the value.
    tvb.bytes(offset, len)?;
    Ok((offset + len, Some(value)))
}

/// Decode a NULL
///
/// Content octets, which a NULL must not have, are reported and skipped.
pub fn dissect_null(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    let mut end = offset;
    let mut node_offset = offset;

    if !implicit_tag {
        let header = dissect_header(ctx, parent, &tvb, offset)?;
        if header.is_constructed() || !header.tag.is_universal(universal::NULL) {
            unexpected_type(ctx, parent, &tvb, &header, "NULL")?;
        }
        node_offset = header.content_offset();
        end = node_offset;
        let len = header.content_len();
        if len > 0 {
            ctx.report(
                DiagnosticKind::NullLength,
                parent,
                &tvb,
                node_offset,
                len,
                format!("NULL expect zero length but Length={}", len),
            );
            tvb.bytes(node_offset, len)?;
            end = header.end_offset();
        }
    }

    if let Some(f) = field {
        ctx.add_item(parent, f, &tvb, node_offset, 0, FieldValue::None);
    }

    Ok(end)
}
