//! Schema-less BER walker
//!
//! Renders whatever BER it is given: UNIVERSAL primitives through the
//! matching scalar decoder, everything else as labelled bytes, constructed
//! values as subtrees walked recursively.

use berwalk_core::{BerResult, DiagnosticKind, FieldRef, FieldValue, NodeId, Tvb};

use super::context::DecodeContext;
use super::fields;
use super::reader::{dissect_header, read_header};
use super::scalar::{
    dissect_bitstring, dissect_boolean, dissect_integer, dissect_null, dissect_object_identifier_str,
    dissect_octet_string, dissect_real, dissect_relative_oid_str,
};
use super::types::{universal, BerTagClass, TlvHeader};

/// Walk one TLV at `offset` without a schema
///
/// # Returns
/// The offset after the TLV. A length running past the view is reported
/// and the whole view is taken as consumed.
///
/// # Errors
/// Structural errors only: nesting past the bound, truncated headers, or an
/// indefinite length without its end-of-contents marker.
pub fn dissect_unknown_ber(
    ctx: &mut DecodeContext<'_>,
    tvb: Tvb<'_>,
    offset: usize,
    parent: Option<NodeId>,
) -> BerResult<usize> {
    ctx.nested(|ctx| walk(ctx, tvb, offset, parent))
}

fn walk(
    ctx: &mut DecodeContext<'_>,
    tvb: Tvb<'_>,
    start: usize,
    parent: Option<NodeId>,
) -> BerResult<usize> {
    let header = read_header(&tvb, start, ctx.depth())?;
    let offset = header.content_offset();
    let len = header.length;

    let remaining = tvb.remaining(offset);
    if len > remaining {
        dissect_header(ctx, parent, &tvb, start)?;
        ctx.report(
            DiagnosticKind::IllegalLength,
            parent,
            &tvb,
            offset,
            remaining,
            format!(
                "length:{} longer than tvb_reported_length_remaining:{}",
                len, remaining
            ),
        );
        return Ok(tvb.len());
    }

    if header.is_constructed() {
        return walk_constructed(ctx, tvb, &header, parent);
    }

    if header.class() != BerTagClass::Universal {
        return walk_tagged_primitive(ctx, tvb, &header, parent);
    }

    walk_universal_primitive(ctx, tvb, &header, parent)
}

// Kept out of `walk` so the frame on the constructed recursion path stays
// small.
#[inline(never)]
fn walk_universal_primitive(
    ctx: &mut DecodeContext<'_>,
    tvb: Tvb<'_>,
    header: &TlvHeader,
    parent: Option<NodeId>,
) -> BerResult<usize> {
    let start = header.offset;
    let offset = header.content_offset();
    let len = header.length;
    let number = header.number();
    let end = match number {
        universal::EOC => offset,
        universal::BOOLEAN => {
            dissect_boolean(false, tvb, start, ctx, parent, Some(&fields::UNKNOWN_BOOLEAN))?.0
        }
        universal::INTEGER => {
            dissect_integer(false, tvb, start, ctx, parent, Some(&fields::UNKNOWN_INTEGER))?.0
        }
        universal::ENUMERATED => {
            dissect_integer(false, tvb, start, ctx, parent, Some(&fields::UNKNOWN_ENUMERATED))?.0
        }
        universal::BIT_STRING => {
            dissect_bitstring(false, tvb, start, ctx, parent, &[], Some(&fields::UNKNOWN_BITSTRING))?
                .0
        }
        universal::OCTET_STRING => match nested_ber(ctx, &tvb, header, ctx.config().decode_octetstring_as_ber)? {
            Some(inner) => {
                dissect_header(ctx, parent, &tvb, start)?;
                let node = ctx.add_item(
                    parent,
                    &fields::UNKNOWN_BER_OCTETSTRING,
                    &tvb,
                    offset,
                    len,
                    FieldValue::None,
                );
                offset + dissect_unknown_ber(ctx, inner, 0, Some(node))?
            }
            None => {
                dissect_octet_string(false, tvb, start, ctx, parent, Some(&fields::UNKNOWN_OCTETSTRING))?
                    .0
            }
        },
        universal::NULL => dissect_null(false, tvb, start, ctx, parent, Some(&fields::UNKNOWN_NULL))?,
        universal::OBJECT_IDENTIFIER => {
            dissect_object_identifier_str(false, tvb, start, ctx, parent, Some(&fields::UNKNOWN_OID))?
                .0
        }
        universal::RELATIVE_OID => {
            dissect_relative_oid_str(
                false,
                tvb,
                start,
                ctx,
                parent,
                Some(&fields::UNKNOWN_RELATIVE_OID),
            )?
            .0
        }
        universal::REAL => dissect_real(false, tvb, start, ctx, parent, Some(&fields::UNKNOWN_REAL))?.0,
        _ => match string_field(number) {
            Some(field) => dissect_octet_string(false, tvb, start, ctx, parent, Some(field))?.0,
            None => {
                dissect_header(ctx, parent, &tvb, start)?;
                ctx.report(
                    DiagnosticKind::UnknownUniversalTag,
                    parent,
                    &tvb,
                    offset,
                    len,
                    format!("can not handle universal tag:{}", number),
                );
                offset + len
            }
        },
    };
    Ok(end)
}

fn string_field(number: u32) -> Option<FieldRef> {
    let field = match number {
        universal::OBJECT_DESCRIPTOR => &fields::UNKNOWN_OBJECT_DESCRIPTOR,
        universal::UTF8_STRING => &fields::UNKNOWN_UTF8_STRING,
        universal::NUMERIC_STRING => &fields::UNKNOWN_NUMERIC_STRING,
        universal::PRINTABLE_STRING => &fields::UNKNOWN_PRINTABLE_STRING,
        universal::TELETEX_STRING => &fields::UNKNOWN_TELETEX_STRING,
        universal::VIDEOTEX_STRING => &fields::UNKNOWN_VIDEOTEX_STRING,
        universal::IA5_STRING => &fields::UNKNOWN_IA5_STRING,
        universal::UTC_TIME => &fields::UNKNOWN_UTC_TIME,
        universal::GENERALIZED_TIME => &fields::UNKNOWN_GENERALIZED_TIME,
        universal::GRAPHIC_STRING => &fields::UNKNOWN_GRAPHIC_STRING,
        universal::VISIBLE_STRING => &fields::UNKNOWN_VISIBLE_STRING,
        universal::GENERAL_STRING => &fields::UNKNOWN_GENERAL_STRING,
        universal::UNIVERSAL_STRING => &fields::UNKNOWN_UNIVERSAL_STRING,
        universal::BMP_STRING => &fields::UNKNOWN_BMP_STRING,
        _ => return None,
    };
    Some(field)
}

/// View over the content of `header` when `enabled` and the content is
/// exactly one non-empty constructed TLV
fn nested_ber<'a>(
    ctx: &DecodeContext<'_>,
    tvb: &Tvb<'a>,
    header: &TlvHeader,
    enabled: bool,
) -> BerResult<Option<Tvb<'a>>> {
    if !enabled || header.length < 2 {
        return Ok(None);
    }
    let content = tvb.subset(header.content_offset(), header.length)?;
    let fits = match read_header(&content, 0, ctx.depth() + 1) {
        Ok(inner) => {
            inner.is_constructed() && inner.length > 0 && inner.header_len + inner.length == header.length
        }
        Err(_) => false,
    };
    Ok(fits.then_some(content))
}

#[inline(never)]
fn walk_tagged_primitive(
    ctx: &mut DecodeContext<'_>,
    tvb: Tvb<'_>,
    header: &TlvHeader,
    parent: Option<NodeId>,
) -> BerResult<usize> {
    dissect_header(ctx, parent, &tvb, header.offset)?;
    let offset = header.content_offset();
    let len = header.length;

    let node = ctx.add_text(
        parent,
        format!("[{} {}] ", header.class().name(), header.number()),
        fields::UNKNOWN_BER_PRIMITIVE.abbrev,
        &tvb,
        offset,
        len,
        FieldValue::None,
    );

    if let Some(inner) = nested_ber(ctx, &tvb, header, ctx.config().decode_primitive_as_ber)? {
        ctx.tree_mut().append_text(node, "[BER encoded]");
        return Ok(offset + dissect_unknown_ber(ctx, inner, 0, Some(node))?);
    }

    if len > 0 {
        let data = tvb.bytes(offset, len)?;
        let mut text = hex::encode(data);
        if data.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            text.push_str(&format!(" ({})", String::from_utf8_lossy(data)));
        }
        ctx.tree_mut().append_text(node, &text);
    }
    Ok(offset + len)
}

fn walk_constructed(
    ctx: &mut DecodeContext<'_>,
    tvb: Tvb<'_>,
    header: &TlvHeader,
    parent: Option<NodeId>,
) -> BerResult<usize> {
    dissect_header(ctx, parent, &tvb, header.offset)?;
    let mut offset = header.content_offset();
    let end = header.end_offset();

    let (name, abbrev) = if header.class() == BerTagClass::Universal {
        let name = universal::name(header.number()).unwrap_or("Unknown");
        let short = name.split(',').next().unwrap_or(name).replace(' ', "_");
        (name.to_string(), format!("ber.unknown.{}", short))
    } else {
        (
            format!("[{} {}]", header.class().name(), header.number()),
            "ber.unknown.constructed".to_string(),
        )
    };
    let node = ctx.add_text(parent, name, abbrev, &tvb, offset, header.length, FieldValue::None);

    while offset < end {
        let next = dissect_unknown_ber(ctx, tvb, offset, Some(node))?;
        if next <= offset {
            return Err(berwalk_core::BerError::NoProgress {
                offset: tvb.absolute(offset),
            });
        }
        offset = next;
    }
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::registry::Registry;
    use berwalk_core::DecodeConfig;

    fn walk_all(config: &DecodeConfig, data: &[u8]) -> (usize, DecodeContext<'static>) {
        let registry: &'static Registry = Box::leak(Box::new(Registry::new()));
        let config: &'static DecodeConfig = Box::leak(Box::new(config.clone()));
        let mut ctx = DecodeContext::new(registry, config);
        let offset = dissect_unknown_ber(&mut ctx, Tvb::new(data), 0, None).unwrap();
        (offset, ctx)
    }

    #[test]
    fn test_sequence_of_primitives() {
        // SEQUENCE { INTEGER 5, BOOLEAN TRUE, UTF8String "hi", NULL }
        let data = [
            0x30, 0x0C, 0x02, 0x01, 0x05, 0x01, 0x01, 0xFF, 0x0C, 0x02, b'h', b'i', 0x05, 0x00,
        ];
        let (offset, ctx) = walk_all(&DecodeConfig::default(), &data[..]);
        assert_eq!(offset, 14);
        let tree = ctx.tree();
        let seq = tree.find_by_abbrev("ber.unknown.SEQUENCE").unwrap();
        assert_eq!(tree.children(seq).len(), 4);
        let int = tree.find_by_abbrev("ber.unknown.INTEGER").unwrap();
        assert_eq!(tree.node(int).value, FieldValue::Signed(5));
        let text = tree.find_by_abbrev("ber.unknown.UTF8String").unwrap();
        assert_eq!(tree.node(text).value, FieldValue::String("hi".to_string()));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_indefinite_constructed() {
        let data = [0x30, 0x80, 0x02, 0x01, 0x07, 0x00, 0x00];
        let (offset, ctx) = walk_all(&DecodeConfig::default(), &data);
        assert_eq!(offset, 7);
        let seq = ctx.tree().find_by_abbrev("ber.unknown.SEQUENCE").unwrap();
        assert_eq!(ctx.tree().children(seq).len(), 1);
    }

    #[test]
    fn test_context_primitive_shows_bytes() {
        let data = [0x81, 0x03, b'a', b'b', b'c'];
        let (offset, ctx) = walk_all(&DecodeConfig::default(), &data);
        assert_eq!(offset, 5);
        let node = ctx.tree().node(ctx.tree().roots()[0]);
        assert_eq!(node.abbrev, "ber.unknown.BER_primitive");
        assert_eq!(node.label(), "[CONTEXT 1] 616263 (abc)");
    }

    #[test]
    fn test_primitive_as_ber() {
        // [1] holding SEQUENCE { INTEGER 1 }
        let data = [0x81, 0x05, 0x30, 0x03, 0x02, 0x01, 0x01];
        let config = DecodeConfig::default().with_primitive_as_ber(true);
        let (offset, ctx) = walk_all(&config, &data);
        assert_eq!(offset, 7);
        let node = ctx.tree().roots()[0];
        assert_eq!(ctx.tree().node(node).label(), "[CONTEXT 1] [BER encoded]");
        let seq = ctx.tree().children(node)[0];
        assert_eq!(ctx.tree().node(seq).abbrev, "ber.unknown.SEQUENCE");
        assert_eq!(ctx.tree().node(seq).offset, 4);
    }

    #[test]
    fn test_octet_string_as_ber() {
        let data = [0x04, 0x05, 0x30, 0x03, 0x02, 0x01, 0x01];
        let (_, plain) = walk_all(&DecodeConfig::default(), &data);
        assert!(plain.tree().find_by_abbrev("ber.unknown.OCTETSTRING").is_some());

        let config = DecodeConfig::default().with_octetstring_as_ber(true);
        let (offset, ctx) = walk_all(&config, &data);
        assert_eq!(offset, 7);
        assert!(ctx.tree().find_by_abbrev("ber.unknown.BER_OCTETSTRING").is_some());
        assert!(ctx.tree().find_by_abbrev("ber.unknown.INTEGER").is_some());
    }

    #[test]
    fn test_illegal_length_consumes_rest() {
        let data = [0x02, 0x09, 0x01];
        let (offset, ctx) = walk_all(&DecodeConfig::default(), &data);
        assert_eq!(offset, 3);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::IllegalLength);
        assert_eq!(
            ctx.diagnostics()[0].message,
            "length:9 longer than tvb_reported_length_remaining:1"
        );
    }

    #[test]
    fn test_unknown_universal_tag() {
        let data = [0x0E, 0x01, 0x00];
        let (offset, ctx) = walk_all(&DecodeConfig::default(), &data);
        assert_eq!(offset, 3);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::UnknownUniversalTag);
        assert_eq!(ctx.diagnostics()[0].message, "can not handle universal tag:14");
    }

    #[test]
    fn test_nesting_bound() {
        let depth = crate::ber::context::MAX_NESTING + 10;
        let mut data = Vec::new();
        for _ in 0..depth {
            data.extend_from_slice(&[0x30, 0x80]);
        }
        for _ in 0..depth {
            data.extend_from_slice(&[0x00, 0x00]);
        }
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let result = dissect_unknown_ber(&mut ctx, Tvb::new(&data), 0, None);
        assert!(matches!(
            result,
            Err(berwalk_core::BerError::NestingTooDeep { .. })
        ));
    }
}
