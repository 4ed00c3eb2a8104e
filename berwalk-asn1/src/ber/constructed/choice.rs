//! CHOICE

use berwalk_core::{BerResult, DiagnosticKind, FieldRef, FieldValue, NodeId, Tvb};

use crate::ber::context::DecodeContext;
use crate::ber::schema::ChoiceAlternative;

use super::{accepts, element_eoc, element_view, next_element, offers, MatchPass};

/// Decode the single element at `offset` with the matching alternative
///
/// Alternatives naming the element's class and tag are tried first, then
/// untagged ones. An alternative whose decoder consumes nothing is passed
/// over unless it matched an exact tag.
///
/// # Returns
/// The offset after the element and the `value` of the alternative taken.
/// When none matched, `offset` itself and `None`.
pub fn dissect_choice(
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    alternatives: &[ChoiceAlternative],
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<u32>)> {
    log::trace!("CHOICE entered offset:{}", offset);

    if tvb.remaining(offset) == 0 {
        ctx.report(
            DiagnosticKind::EmptyChoice,
            parent,
            &tvb,
            offset,
            0,
            "Empty choice was found",
        );
        return Ok((offset, None));
    }

    ctx.nested(|ctx| {
        let header = next_element(ctx, &tvb, offset)?;

        for pass in [MatchPass::Exact, MatchPass::Wildcard] {
            for alt in alternatives.iter().filter(|alt| offers(*alt, &header, pass)) {
                let checkpoint = ctx.checkpoint();
                let node = field.map(|f| {
                    let node = ctx.add_item(
                        parent,
                        f,
                        &tvb,
                        offset,
                        header.header_len + header.length,
                        FieldValue::Unsigned(u64::from(alt.value)),
                    );
                    if let Some(branch) = alt.field {
                        ctx.tree_mut().set_text(node, format!("{} ({})", branch.name, alt.value));
                    }
                    node
                });
                let tree = node.or(parent);

                let view = element_view(ctx, &tvb, &header, alt.flags, tree)?;
                let count = (alt.decoder)(alt.flags.is_implicit(), view, 0, ctx, tree, alt.field)?;
                if accepts(alt, pass, count) {
                    element_eoc(ctx, &tvb, &header, alt.flags, tree);
                    return Ok((header.end_offset(), Some(alt.value)));
                }
                ctx.rollback(checkpoint);
            }
        }

        ctx.report(
            DiagnosticKind::ChoiceNotFound,
            parent,
            &tvb,
            offset,
            header.header_len + header.length,
            "This choice field was not found.",
        );
        Ok((offset, None))
    })
}
