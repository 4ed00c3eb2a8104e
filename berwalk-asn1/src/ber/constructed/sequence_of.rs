//! SEQUENCE OF and SET OF

use berwalk_core::{BerResult, DiagnosticKind, FieldKind, FieldRef, FieldValue, NodeId, Tvb};

use crate::ber::context::DecodeContext;
use crate::ber::reader::read_header;
use crate::ber::schema::{BoundCheck, Bounds, FieldDescriptor};
use crate::ber::types::universal;

use super::{
    attach, element_eoc, element_view, enter, leave, next_element, tag_fits, walk_unexpected,
    wrong_field_message, Entry, Frame,
};

struct Repeated {
    tag: u32,
    what: &'static str,
    short: &'static str,
}

const SEQUENCE_OF: Repeated = Repeated {
    tag: universal::SEQUENCE,
    what: "Sequence Of",
    short: "SQ OF",
};

const SET_OF: Repeated = Repeated {
    tag: universal::SET,
    what: "Set Of",
    short: "SET OF",
};

/// Decode a SEQUENCE OF, applying `element` to every element
pub fn dissect_sequence_of(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    element: &FieldDescriptor,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    repeated(implicit_tag, tvb, offset, ctx, parent, Bounds::NONE, element, field, &SEQUENCE_OF)
}

/// Decode a SEQUENCE OF whose item count must lie within `bounds`
#[allow(clippy::too_many_arguments)]
pub fn dissect_constrained_sequence_of(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    bounds: Bounds,
    element: &FieldDescriptor,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    repeated(implicit_tag, tvb, offset, ctx, parent, bounds, element, field, &SEQUENCE_OF)
}

pub fn dissect_set_of(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    element: &FieldDescriptor,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    repeated(implicit_tag, tvb, offset, ctx, parent, Bounds::NONE, element, field, &SET_OF)
}

#[allow(clippy::too_many_arguments)]
pub fn dissect_constrained_set_of(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    bounds: Bounds,
    element: &FieldDescriptor,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    repeated(implicit_tag, tvb, offset, ctx, parent, bounds, element, field, &SET_OF)
}

#[allow(clippy::too_many_arguments)]
fn repeated(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    bounds: Bounds,
    element: &FieldDescriptor,
    field: Option<FieldRef>,
    kind: &Repeated,
) -> BerResult<usize> {
    log::trace!("{} entered implicit_tag:{} offset:{}", kind.short, implicit_tag, offset);

    ctx.nested(|ctx| {
        let frame = match enter(implicit_tag, &tvb, offset, ctx, parent, kind.tag, kind.what)? {
            Entry::Frame(frame) => frame,
            Entry::Skip(end) => return Ok(end),
        };

        let count = count_items(ctx, &tvb, &frame);
        let value = match (field.map(|f| f.kind), count) {
            (Some(FieldKind::None) | None, _) | (_, None) => FieldValue::None,
            (_, Some(n)) => FieldValue::Unsigned(n as u64),
        };
        let (node, tree) = attach(ctx, &tvb, &frame, parent, field, value)?;
        if let (Some(node), Some(f)) = (node, field) {
            let tree_mut = ctx.tree_mut();
            match count {
                _ if f.kind == FieldKind::None => tree_mut.append_text(node, ":"),
                Some(1) => tree_mut.append_text(node, " item"),
                Some(_) => tree_mut.append_text(node, " items"),
                None => tree_mut.set_text(node, "unknown number of items"),
            }
        }
        if let Some(count) = count {
            check_items(ctx, node.or(parent), &tvb, &frame, count, bounds);
        }

        let mut cursor = frame.start;
        while cursor < frame.end {
            if tvb.is_eoc(cursor) {
                cursor += 2;
                break;
            }
            let header = next_element(ctx, &tvb, cursor)?;

            if element.flags.checks_tag() && !tag_fits(element, &header) {
                let message = wrong_field_message(kind.short, element, &header);
                ctx.report(
                    DiagnosticKind::WrongField,
                    tree,
                    &tvb,
                    cursor,
                    header.header_len + header.length,
                    message,
                );
                walk_unexpected(ctx, &tvb, &header, tree)?;
                cursor = header.end_offset();
                continue;
            }

            let view = element_view(ctx, &tvb, &header, element.flags, tree)?;
            (element.decoder)(element.flags.is_implicit(), view, 0, ctx, tree, element.field)?;
            element_eoc(ctx, &tvb, &header, element.flags, tree);
            cursor = header.end_offset();
        }

        Ok(leave(ctx, &tvb, &frame, cursor, tree, kind.short))
    })
}

/// Count the elements of a frame
///
/// `None` when part of the frame was not captured or its elements cannot be
/// walked; the main loop reports the latter.
fn count_items(ctx: &DecodeContext<'_>, tvb: &Tvb<'_>, frame: &Frame) -> Option<usize> {
    if tvb.captured_remaining(frame.start) != tvb.remaining(frame.start) {
        return None;
    }
    let mut count = 0;
    let mut cursor = frame.start;
    while cursor < frame.end {
        if tvb.is_eoc(cursor) {
            break;
        }
        let end = read_header(tvb, cursor, ctx.depth()).ok()?.end_offset();
        if end <= cursor {
            return None;
        }
        cursor = end;
        count += 1;
    }
    Some(count)
}

fn check_items(
    ctx: &mut DecodeContext<'_>,
    node: Option<NodeId>,
    tvb: &Tvb<'_>,
    frame: &Frame,
    count: usize,
    bounds: Bounds,
) {
    let verdict = match bounds.check(count as i64) {
        BoundCheck::Within => return,
        BoundCheck::Below => "too few",
        BoundCheck::Above => "too many",
    };
    ctx.report(
        DiagnosticKind::ItemCountConstraint,
        node,
        tvb,
        frame.offset,
        frame.total_len(),
        format!("Size constraint: {} items: {} ({})", verdict, count, bounds.describe()),
    );
}
