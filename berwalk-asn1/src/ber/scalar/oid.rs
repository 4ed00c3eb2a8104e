//! OBJECT IDENTIFIER and RELATIVE-OID

use berwalk_core::{
    BerResult, DiagnosticKind, FieldKind, FieldRef, FieldValue, NodeId, ObjectIdentifier, Tvb,
};

use crate::ber::context::DecodeContext;
use crate::ber::reader::dissect_header;
use crate::ber::types::{universal, BerTagClass};

use super::unexpected_type;

/// Decode an OBJECT IDENTIFIER, discarding its value
pub fn dissect_object_identifier(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    dissect_any_oid(implicit_tag, false, tvb, offset, ctx, parent, field).map(|(end, _)| end)
}

/// Decode an OBJECT IDENTIFIER
///
/// # Returns
/// The offset after the value and the dotted form, `None` when the encoding
/// is invalid or the identifier did not match.
pub fn dissect_object_identifier_str(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<String>)> {
    dissect_any_oid(implicit_tag, false, tvb, offset, ctx, parent, field)
}

/// Decode a RELATIVE-OID, discarding its value
pub fn dissect_relative_oid(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    dissect_any_oid(implicit_tag, true, tvb, offset, ctx, parent, field).map(|(end, _)| end)
}

/// Decode a RELATIVE-OID
pub fn dissect_relative_oid_str(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<String>)> {
    dissect_any_oid(implicit_tag, true, tvb, offset, ctx, parent, field)
}

fn dissect_any_oid(
    implicit_tag: bool,
    relative: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<String>)> {
    let expected_tag = if relative {
        universal::RELATIVE_OID
    } else {
        universal::OBJECT_IDENTIFIER
    };

    let (offset, len) = if !implicit_tag {
        let header = dissect_header(ctx, parent, &tvb, offset)?;
        if header.class() != BerTagClass::Universal
            || header.is_constructed()
            || header.number() != expected_tag
        {
            let expected = if relative {
                "Relative Object Identifier"
            } else {
                "Object Identifier"
            };
            unexpected_type(ctx, parent, &tvb, &header, expected)?;
            return Ok((header.end_offset(), None));
        }
        (header.content_offset(), header.content_len())
    } else {
        (offset, tvb.remaining(offset))
    };

    let content = tvb.bytes(offset, len)?;
    let decoded = if relative {
        ObjectIdentifier::relative_from_ber(content)
    } else {
        ObjectIdentifier::from_ber(content)
    };

    let oid = match decoded {
        Ok(oid) => oid,
        Err(err) => {
            let node = field.map(|f| {
                ctx.add_item(parent, f, &tvb, offset, len, FieldValue::Bytes(content.to_vec()))
            });
            ctx.report(
                DiagnosticKind::InvalidOidEncoding,
                node.or(parent),
                &tvb,
                offset,
                len,
                err.to_string(),
            );
            return Ok((offset + len, None));
        }
    };

    let dotted = oid.to_string();
    if let Some(f) = field {
        let value = match f.kind {
            FieldKind::Bytes => FieldValue::Bytes(content.to_vec()),
            FieldKind::String => FieldValue::String(dotted.clone()),
            FieldKind::RelativeOid => FieldValue::RelativeOid(dotted.clone()),
            _ if relative => FieldValue::RelativeOid(dotted.clone()),
            _ => FieldValue::Oid(dotted.clone()),
        };
        let node = ctx.add_item(parent, f, &tvb, offset, len, value);
        if !relative {
            if let Some(name) = ctx.registry().oid_name(&dotted) {
                ctx.tree_mut().append_text(node, &format!(" ({})", name));
            }
        }
    }

    Ok((offset + len, Some(dotted)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::registry::Registry;
    use berwalk_core::{DecodeConfig, FieldInfo};

    static OID: FieldInfo = FieldInfo::new("oid", "test.oid", FieldKind::Oid);
    static REL: FieldInfo = FieldInfo::new("rel", "test.rel", FieldKind::RelativeOid);

    #[test]
    fn test_oid_with_registered_name() {
        let mut registry = Registry::new();
        registry.register_oid_name("2.1.1", "basic-encoding").unwrap();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x06, 0x02, 0x51, 0x01];
        let (offset, oid) =
            dissect_object_identifier_str(false, Tvb::new(&data), 0, &mut ctx, None, Some(&OID))
                .unwrap();
        assert_eq!(offset, 4);
        assert_eq!(oid.as_deref(), Some("2.1.1"));
        let node = ctx.tree().node(ctx.tree().roots()[0]);
        assert_eq!(node.value, FieldValue::Oid("2.1.1".to_string()));
        assert_eq!(node.label(), "oid: 2.1.1 (basic-encoding)");
    }

    #[test]
    fn test_relative_oid() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x0D, 0x03, 0x81, 0x00, 0x05];
        let (offset, oid) =
            dissect_relative_oid_str(false, Tvb::new(&data), 0, &mut ctx, None, Some(&REL)).unwrap();
        assert_eq!(offset, 5);
        assert_eq!(oid.as_deref(), Some("128.5"));
    }

    #[test]
    fn test_unterminated_oid() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x06, 0x02, 0x2B, 0x86];
        let (offset, oid) =
            dissect_object_identifier_str(false, Tvb::new(&data), 0, &mut ctx, None, Some(&OID))
                .unwrap();
        assert_eq!(offset, 4);
        assert_eq!(oid, None);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::InvalidOidEncoding);
        let node = ctx.tree().node(ctx.tree().roots()[0]);
        assert_eq!(node.value, FieldValue::Bytes(vec![0x2B, 0x86]));
    }

    #[test]
    fn test_wrong_tag_skips_tlv() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x04, 0x02, 0x2B, 0x06];
        let offset =
            dissect_object_identifier(false, Tvb::new(&data), 0, &mut ctx, None, Some(&OID)).unwrap();
        assert_eq!(offset, 4);
        assert!(ctx.tree().is_empty());
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::UnexpectedType);
    }
}
