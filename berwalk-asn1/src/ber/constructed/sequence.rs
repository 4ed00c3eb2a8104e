//! SEQUENCE

use berwalk_core::{BerResult, DiagnosticKind, FieldRef, FieldValue, NodeId, Tvb};

use crate::ber::context::DecodeContext;
use crate::ber::schema::FieldDescriptor;
use crate::ber::types::{universal, TlvHeader};

use super::{
    attach, element_eoc, element_view, enter, leave, next_element, tag_fits, walk_unexpected,
    wrong_field_message, Entry,
};

/// Outcome of matching one element against the schema cursor
enum FieldMatch<'s> {
    Matched(&'s FieldDescriptor),
    Mismatch(&'s FieldDescriptor),
    /// The schema has no entries left
    Exhausted,
}

/// Find the entry for `header`, skipping OPTIONAL entries that do not fit
fn resolve<'s>(fields: &'s [FieldDescriptor], cursor: &mut usize, header: &TlvHeader) -> FieldMatch<'s> {
    while let Some(spec) = fields.get(*cursor) {
        if tag_fits(spec, header) {
            return FieldMatch::Matched(spec);
        }
        if !spec.flags.is_optional() {
            return FieldMatch::Mismatch(spec);
        }
        *cursor += 1;
    }
    FieldMatch::Exhausted
}

/// Decode a SEQUENCE against `fields`, in order
///
/// OPTIONAL entries whose tag does not fit the next element are skipped.
/// A mandatory entry that does not fit is reported and the element skipped;
/// elements past the end of the schema are reported as unknown. Neither
/// stops the walk.
///
/// # Returns
/// The offset after the SEQUENCE, end-of-contents included.
pub fn dissect_sequence(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    fields: &[FieldDescriptor],
    field: Option<FieldRef>,
) -> BerResult<usize> {
    log::trace!("SEQUENCE entered implicit_tag:{} offset:{}", implicit_tag, offset);

    ctx.nested(|ctx| {
        let frame = match enter(implicit_tag, &tvb, offset, ctx, parent, universal::SEQUENCE, "Sequence")? {
            Entry::Frame(frame) => frame,
            Entry::Skip(end) => return Ok(end),
        };
        let (node, tree) = attach(ctx, &tvb, &frame, parent, field, FieldValue::None)?;
        if frame.start == frame.end {
            if let Some(node) = node {
                ctx.tree_mut().append_text(node, " [0 length]");
            }
        }

        let mut cursor = frame.start;
        let mut next_field = 0;
        while cursor < frame.end {
            if tvb.is_eoc(cursor) {
                if let Some(node) = node {
                    ctx.tree_mut().append_text(node, " 0 items");
                }
                cursor += 2;
                break;
            }
            let header = next_element(ctx, &tvb, cursor)?;

            'retry: loop {
                match resolve(fields, &mut next_field, &header) {
                    FieldMatch::Matched(spec) => {
                        let checkpoint = ctx.checkpoint();
                        let view = element_view(ctx, &tvb, &header, spec.flags, tree)?;
                        let count = (spec.decoder)(spec.flags.is_implicit(), view, 0, ctx, tree, spec.field)?;
                        next_field += 1;
                        if count == 0 && header.length != 0 && spec.flags.is_optional() {
                            ctx.rollback(checkpoint);
                            continue 'retry;
                        }
                        element_eoc(ctx, &tvb, &header, spec.flags, tree);
                    }
                    FieldMatch::Mismatch(spec) => {
                        let message = wrong_field_message("SEQUENCE", spec, &header);
                        ctx.report(
                            DiagnosticKind::WrongField,
                            tree,
                            &tvb,
                            cursor,
                            header.header_len + header.length,
                            message,
                        );
                        walk_unexpected(ctx, &tvb, &header, tree)?;
                        next_field += 1;
                    }
                    FieldMatch::Exhausted => {
                        ctx.report(
                            DiagnosticKind::UnknownField,
                            tree,
                            &tvb,
                            cursor,
                            header.header_len + header.length,
                            "This field lies beyond the end of the known sequence definition.",
                        );
                        walk_unexpected(ctx, &tvb, &header, tree)?;
                    }
                }
                break;
            }
            cursor = header.end_offset();
        }

        Ok(leave(ctx, &tvb, &frame, cursor, tree, "SEQUENCE"))
    })
}
