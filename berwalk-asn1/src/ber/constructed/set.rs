//! SET

use berwalk_core::{BerResult, DiagnosticKind, FieldRef, FieldValue, NodeId, Tvb};

use crate::ber::context::DecodeContext;
use crate::ber::schema::{FieldDescriptor, TagSpec};
use crate::ber::types::{universal, TlvHeader};

use super::{
    accepts, attach, describe_expected, describe_found, element_eoc, element_view, enter, leave,
    next_element, offers, walk_unexpected, Entry, MatchPass,
};

/// Schema entries whose presence is tracked for missing-field reports
pub const MAX_SET_ELEMENTS: usize = 32;

/// Decode a SET against `fields`, in any order
///
/// Each element goes to the first entry naming its class and tag; failing
/// that, to the first untagged entry that accepts it. Mandatory entries
/// among the first [`MAX_SET_ELEMENTS`] that never matched are reported at
/// the end.
pub fn dissect_set(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    fields: &[FieldDescriptor],
    field: Option<FieldRef>,
) -> BerResult<usize> {
    log::trace!("SET entered implicit_tag:{} offset:{}", implicit_tag, offset);

    ctx.nested(|ctx| {
        let frame = match enter(implicit_tag, &tvb, offset, ctx, parent, universal::SET, "SET")? {
            Entry::Frame(frame) => frame,
            Entry::Skip(end) => return Ok(end),
        };
        let (_, tree) = attach(ctx, &tvb, &frame, parent, field, FieldValue::None)?;

        let mut missing = fields
            .iter()
            .take(MAX_SET_ELEMENTS)
            .enumerate()
            .filter(|(_, spec)| !spec.flags.is_optional())
            .fold(0u32, |mask, (i, _)| mask | (1 << i));

        let mut cursor = frame.start;
        while cursor < frame.end {
            if tvb.is_eoc(cursor) {
                cursor += 2;
                break;
            }
            let header = next_element(ctx, &tvb, cursor)?;

            match match_element(ctx, &tvb, fields, &header, tree)? {
                Some(index) if index < MAX_SET_ELEMENTS => missing &= !(1 << index),
                Some(_) => {}
                None => {
                    ctx.report(
                        DiagnosticKind::UnknownField,
                        tree,
                        &tvb,
                        cursor,
                        header.header_len + header.length,
                        format!("Unknown field in SET {}", describe_found(&header)),
                    );
                    walk_unexpected(ctx, &tvb, &header, tree)?;
                }
            }
            cursor = header.end_offset();
        }

        for (i, spec) in fields.iter().take(MAX_SET_ELEMENTS).enumerate() {
            if missing & (1 << i) != 0 {
                ctx.report(
                    DiagnosticKind::MissingField,
                    tree,
                    &tvb,
                    frame.offset,
                    frame.total_len(),
                    format!("Missing field in SET {} expected", describe_expected(spec.class, spec.tag)),
                );
            }
        }

        Ok(leave(ctx, &tvb, &frame, cursor, tree, "SET"))
    })
}

/// Offer an element to the schema, exact tags first, then untagged entries
///
/// # Returns
/// Index of the entry that took the element.
fn match_element(
    ctx: &mut DecodeContext<'_>,
    tvb: &Tvb<'_>,
    fields: &[FieldDescriptor],
    header: &TlvHeader,
    tree: Option<NodeId>,
) -> BerResult<Option<usize>> {
    for pass in [MatchPass::Exact, MatchPass::Wildcard] {
        let candidates: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, spec)| offers(*spec, header, pass))
            .map(|(i, _)| i)
            .collect();

        if pass == MatchPass::Exact && candidates.len() > 1 {
            ctx.report(
                DiagnosticKind::AmbiguousSetElement,
                tree,
                tvb,
                header.offset,
                header.header_len + header.length,
                format!("Ambiguous field in SET {}: {} entries match", describe_found(header), candidates.len()),
            );
        }

        for index in candidates {
            let spec = &fields[index];
            let checkpoint = ctx.checkpoint();
            let view = element_view(ctx, tvb, header, spec.flags(), tree)?;
            let count = (spec.decoder)(spec.flags.is_implicit(), view, 0, ctx, tree, spec.field)?;
            if accepts(spec, pass, count) {
                element_eoc(ctx, tvb, header, spec.flags, tree);
                return Ok(Some(index));
            }
            ctx.rollback(checkpoint);
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::registry::Registry;
    use crate::ber::scalar::dissect_integer;
    use crate::ber::schema::FieldFlags;
    use crate::ber::types::BerTagClass;
    use berwalk_core::{DecodeConfig, FieldInfo, FieldKind};

    static ATTRS: FieldInfo = FieldInfo::new("attributes", "test.attributes", FieldKind::None);
    static A: FieldInfo = FieldInfo::new("a", "test.a", FieldKind::Int32);
    static B: FieldInfo = FieldInfo::new("b", "test.b", FieldKind::Int32);
    static C: FieldInfo = FieldInfo::new("c", "test.c", FieldKind::Int32);
    static OTHER: FieldInfo = FieldInfo::new("other", "test.other", FieldKind::Int32);

    fn integer(
        implicit_tag: bool,
        tvb: Tvb<'_>,
        offset: usize,
        ctx: &mut DecodeContext<'_>,
        parent: Option<NodeId>,
        field: Option<FieldRef>,
    ) -> BerResult<usize> {
        dissect_integer(implicit_tag, tvb, offset, ctx, parent, field).map(|(end, _)| end)
    }

    const fn tagged(field: FieldRef, tag: u32, flags: FieldFlags) -> FieldDescriptor {
        FieldDescriptor::new(
            Some(field),
            Some(BerTagClass::ContextSpecific),
            Some(tag),
            flags.union(FieldFlags::IMPLICIT_TAG),
            integer,
        )
    }

    static THREE_MANDATORY: [FieldDescriptor; 3] = [
        tagged(&A, 0, FieldFlags::NONE),
        tagged(&B, 1, FieldFlags::NONE),
        tagged(&C, 2, FieldFlags::NONE),
    ];

    static WITH_ANY: [FieldDescriptor; 2] = [
        tagged(&A, 0, FieldFlags::NONE),
        FieldDescriptor::new(Some(&OTHER), None, None, FieldFlags::NO_OWN_TAG.union(FieldFlags::OPTIONAL), integer),
    ];

    static DUPLICATE: [FieldDescriptor; 2] = [
        tagged(&A, 0, FieldFlags::OPTIONAL),
        tagged(&B, 0, FieldFlags::OPTIONAL),
    ];

    fn decode(data: &[u8], fields: &[FieldDescriptor]) -> (usize, DecodeContext<'static>) {
        let registry: &'static Registry = Box::leak(Box::new(Registry::new()));
        let config: &'static DecodeConfig = Box::leak(Box::new(DecodeConfig::default()));
        let mut ctx = DecodeContext::new(registry, config);
        let offset = dissect_set(false, Tvb::new(data), 0, &mut ctx, None, fields, Some(&ATTRS)).unwrap();
        (offset, ctx)
    }

    #[test]
    fn test_any_order() {
        let data = [0x31, 0x09, 0x82, 0x01, 0x03, 0x80, 0x01, 0x01, 0x81, 0x01, 0x02];
        let (offset, ctx) = decode(&data, &THREE_MANDATORY);
        assert_eq!(offset, 11);
        assert!(ctx.diagnostics().is_empty());
        let c = ctx.tree().find_by_abbrev("test.c").unwrap();
        assert_eq!(ctx.tree().node(c).value, FieldValue::Signed(3));
    }

    #[test]
    fn test_missing_mandatory_field() {
        let data = [0x31, 0x06, 0x82, 0x01, 0x03, 0x80, 0x01, 0x01];
        let (offset, ctx) = decode(&data, &THREE_MANDATORY);
        assert_eq!(offset, 8);
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::MissingField);
        assert_eq!(
            ctx.diagnostics()[0].message,
            "Missing field in SET class:CONTEXT(2) tag:1 expected"
        );
    }

    #[test]
    fn test_untagged_entry_takes_leftover() {
        let data = [0x31, 0x06, 0x02, 0x01, 0x09, 0x80, 0x01, 0x01];
        let (offset, ctx) = decode(&data, &WITH_ANY);
        assert_eq!(offset, 8);
        assert!(ctx.diagnostics().is_empty());
        let other = ctx.tree().find_by_abbrev("test.other").unwrap();
        assert_eq!(ctx.tree().node(other).value, FieldValue::Signed(9));
    }

    #[test]
    fn test_unknown_field() {
        let data = [0x31, 0x06, 0x80, 0x01, 0x01, 0x85, 0x01, 0x01];
        let (_, ctx) = decode(&data, &THREE_MANDATORY);
        let kinds: Vec<DiagnosticKind> = ctx.diagnostics().iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::UnknownField,
                DiagnosticKind::MissingField,
                DiagnosticKind::MissingField
            ]
        );
        assert_eq!(ctx.diagnostics()[0].message, "Unknown field in SET class:CONTEXT(2) tag:5");
    }

    #[test]
    fn test_ambiguous_element() {
        let data = [0x31, 0x03, 0x80, 0x01, 0x04];
        let (_, ctx) = decode(&data, &DUPLICATE);
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::AmbiguousSetElement);
        assert!(ctx.tree().find_by_abbrev("test.a").is_some());
        assert!(ctx.tree().find_by_abbrev("test.b").is_none());
    }

    #[test]
    fn test_indefinite_set() {
        let data = [0x31, 0x80, 0x80, 0x01, 0x01, 0x81, 0x01, 0x02, 0x82, 0x01, 0x03, 0x00, 0x00];
        let (offset, ctx) = decode(&data, &THREE_MANDATORY);
        assert_eq!(offset, 13);
        assert!(ctx.diagnostics().is_empty());
    }
}
