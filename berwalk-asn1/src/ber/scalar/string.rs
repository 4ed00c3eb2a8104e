//! OCTET STRING and the restricted character string types

use berwalk_core::{BerResult, DiagnosticKind, FieldKind, FieldRef, FieldValue, NodeId, Tvb};
use bytes::Bytes;

use crate::ber::context::DecodeContext;
use crate::ber::fields;
use crate::ber::reader::{dissect_header, peek_header};
use crate::ber::reassembly::reassemble_octet_string;
use crate::ber::schema::{Bounds, FieldDecoder};
use crate::ber::types::{universal, BerTagClass};

use super::{check_size, unexpected_type};

/// How an OCTET STRING body is interpreted and reported
#[derive(Debug, Clone, Copy)]
pub(crate) struct StringSpec {
    /// Restricted string type the caller expects, selects the text encoding
    pub type_tag: Option<u32>,
    pub bounds: Bounds,
    /// Add nodes; fragments read during reassembly add none
    pub emit: bool,
}

impl StringSpec {
    pub(crate) const PLAIN: StringSpec = StringSpec {
        type_tag: None,
        bounds: Bounds::NONE,
        emit: true,
    };
}

/// Decode an OCTET STRING
///
/// # Returns
/// The offset after the value and its bytes, reassembled when the
/// encoding is constructed. `None` when the identifier did not fit.
pub fn dissect_octet_string(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<Bytes>)> {
    octet_string_impl(implicit_tag, tvb, offset, ctx, parent, field, StringSpec::PLAIN)
}

/// Decode an OCTET STRING whose length must lie within `bounds`
pub fn dissect_constrained_octet_string(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    bounds: Bounds,
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<Bytes>)> {
    let spec = StringSpec {
        bounds,
        ..StringSpec::PLAIN
    };
    octet_string_impl(implicit_tag, tvb, offset, ctx, parent, field, spec)
}

/// Decode an OCTET STRING and hand its bytes to `callback`
///
/// The callback sees a view over the value alone, starting at offset 0,
/// with its nodes placed under the field node. Empty values are not passed
/// on.
pub fn dissect_octet_string_with_callback(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
    callback: Option<FieldDecoder>,
) -> BerResult<usize> {
    let (end, value) = dissect_octet_string(implicit_tag, tvb, offset, ctx, parent, field)?;
    if let (Some(callback), Some(value)) = (callback, value) {
        if !value.is_empty() {
            let origin = match field {
                Some(_) => ctx.created_item(),
                None => None,
            };
            let anchor = origin
                .map(|id| ctx.tree().node(id).offset)
                .unwrap_or_else(|| tvb.absolute(offset));
            let inner_parent = origin.or(parent);
            callback(false, Tvb::detached(&value, anchor), 0, ctx, inner_parent, None)?;
        }
    }
    Ok(end)
}

/// Decode a restricted character string of UNIVERSAL type `type_tag`
pub fn dissect_restricted_string(
    implicit_tag: bool,
    type_tag: u32,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<Bytes>)> {
    dissect_constrained_restricted_string(
        implicit_tag,
        type_tag,
        tvb,
        offset,
        ctx,
        parent,
        Bounds::NONE,
        field,
    )
}

/// Decode a restricted character string whose length must lie within `bounds`
#[allow(clippy::too_many_arguments)]
pub fn dissect_constrained_restricted_string(
    implicit_tag: bool,
    type_tag: u32,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    bounds: Bounds,
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<Bytes>)> {
    if !implicit_tag {
        let header = peek_header(ctx, &tvb, offset)?;
        if header.class() != BerTagClass::Universal || header.number() != type_tag {
            unexpected_type(ctx, parent, &tvb, &header, &format!("String with tag={}", type_tag))?;
            return Ok((header.end_offset(), None));
        }
    }

    let spec = StringSpec {
        type_tag: Some(type_tag),
        bounds,
        emit: true,
    };
    octet_string_impl(implicit_tag, tvb, offset, ctx, parent, field, spec)
}

pub(crate) fn octet_string_impl(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
    spec: StringSpec,
) -> BerResult<(usize, Option<Bytes>)> {
    log::trace!("OCTET STRING entered implicit_tag:{} offset:{}", implicit_tag, offset);

    let (offset, mut len, mut indefinite, constructed, text_tag) = if !implicit_tag {
        let header = if spec.emit {
            dissect_header(ctx, parent, &tvb, offset)?
        } else {
            peek_header(ctx, &tvb, offset)?
        };
        let class = header.class();
        let number = header.number();
        if class != BerTagClass::Application
            && class != BerTagClass::Private
            && (class != BerTagClass::Universal
                || (number < universal::NUMERIC_STRING
                    && number != universal::OCTET_STRING
                    && number != universal::OBJECT_DESCRIPTOR
                    && number != universal::UTF8_STRING))
        {
            unexpected_type(ctx, parent, &tvb, &header, "OctetString")?;
            return Ok((header.end_offset(), None));
        }
        let text_tag = if class == BerTagClass::Universal {
            Some(number)
        } else {
            spec.type_tag
        };
        (
            header.content_offset(),
            header.length,
            header.indefinite,
            header.is_constructed(),
            text_tag,
        )
    } else {
        let (len, indefinite, constructed, text_tag) = match ctx.last_header() {
            Some(h) => {
                let tag = if h.class() == BerTagClass::Universal {
                    Some(h.number())
                } else {
                    None
                };
                (h.length, h.indefinite, h.is_constructed(), spec.type_tag.or(tag))
            }
            None => (tvb.remaining(offset), false, false, spec.type_tag),
        };
        (offset, len, indefinite, constructed, text_tag)
    };

    if implicit_tag {
        // The caller may have handed over a view of the content alone.
        let remaining = tvb.remaining(offset);
        if indefinite && remaining + 2 == len {
            len -= 2;
            indefinite = false;
        } else if remaining < len {
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
            return Ok((offset + len, None));
        }
    }

    if constructed {
        let spec = StringSpec {
            type_tag: text_tag,
            ..spec
        };
        let (end, value) =
            reassemble_octet_string(ctx, tvb, offset, len, indefinite, parent, field, spec)?;
        return Ok((end, Some(value)));
    }

    let data = tvb.bytes(offset, len)?;
    if spec.emit {
        match field {
            Some(f) => {
                let value = string_value(f, text_tag, data);
                let node = ctx.add_item(parent, f, &tvb, offset, len, value);
                check_size(ctx, Some(node), &tvb, offset, len, len, spec.bounds, false);
            }
            None => {
                ctx.add_item(
                    parent,
                    &fields::UNKNOWN_OCTETSTRING,
                    &tvb,
                    offset,
                    len,
                    FieldValue::Bytes(data.to_vec()),
                );
            }
        }
    }

    Ok((offset + len, Some(Bytes::copy_from_slice(data))))
}

/// Node value for string content reported into `field`
pub(crate) fn string_value(field: FieldRef, type_tag: Option<u32>, data: &[u8]) -> FieldValue {
    match field.kind {
        FieldKind::String => FieldValue::String(decode_text(type_tag, data)),
        _ => FieldValue::Bytes(data.to_vec()),
    }
}

/// Decode string content according to its UNIVERSAL string type
///
/// UTF8String is UTF-8, UniversalString UCS-4 and BMPString UCS-2, both
/// big-endian. Every other type is read as ASCII. Invalid sequences become
/// U+FFFD.
pub fn decode_text(type_tag: Option<u32>, data: &[u8]) -> String {
    match type_tag {
        Some(universal::UTF8_STRING) => String::from_utf8_lossy(data).into_owned(),
        Some(universal::UNIVERSAL_STRING) => data
            .chunks(4)
            .map(|c| {
                if c.len() == 4 {
                    char::from_u32(u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                        .unwrap_or(char::REPLACEMENT_CHARACTER)
                } else {
                    char::REPLACEMENT_CHARACTER
                }
            })
            .collect(),
        Some(universal::BMP_STRING) => data
            .chunks(2)
            .map(|c| {
                if c.len() == 2 {
                    char::from_u32(u32::from(u16::from_be_bytes([c[0], c[1]])))
                        .unwrap_or(char::REPLACEMENT_CHARACTER)
                } else {
                    char::REPLACEMENT_CHARACTER
                }
            })
            .collect(),
        _ => data
            .iter()
            .map(|&b| {
                if b.is_ascii() {
                    char::from(b)
                } else {
                    char::REPLACEMENT_CHARACTER
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::registry::Registry;
    use berwalk_core::{DecodeConfig, FieldInfo};

    static NAME: FieldInfo = FieldInfo::new("name", "test.name", FieldKind::String);
    static BLOB: FieldInfo = FieldInfo::new("blob", "test.blob", FieldKind::Bytes);
    static INNER: FieldInfo = FieldInfo::new("inner", "test.inner", FieldKind::Int64);

    #[test]
    fn test_text_encodings() {
        assert_eq!(decode_text(Some(universal::UTF8_STRING), "héllo".as_bytes()), "héllo");
        assert_eq!(decode_text(Some(universal::BMP_STRING), &[0x00, 0x41, 0x04, 0x16]), "AЖ");
        assert_eq!(
            decode_text(Some(universal::UNIVERSAL_STRING), &[0, 0, 0, 0x41, 0, 1, 0xF6, 0x00]),
            "A\u{1F600}"
        );
        assert_eq!(decode_text(Some(universal::IA5_STRING), b"ab\xFF"), "ab\u{FFFD}");
        assert_eq!(decode_text(None, b"x"), "x");
    }

    #[test]
    fn test_restricted_string() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x1E, 0x04, 0x00, 0x48, 0x00, 0x69];
        let (offset, value) = dissect_restricted_string(
            false,
            universal::BMP_STRING,
            Tvb::new(&data),
            0,
            &mut ctx,
            None,
            Some(&NAME),
        )
        .unwrap();
        assert_eq!(offset, 6);
        assert_eq!(value.as_deref(), Some(&[0x00, 0x48, 0x00, 0x69][..]));
        let node = ctx.tree().node(ctx.tree().roots()[0]);
        assert_eq!(node.value, FieldValue::String("Hi".to_string()));
    }

    #[test]
    fn test_restricted_string_wrong_type() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x16, 0x01, b'a'];
        let (offset, value) = dissect_restricted_string(
            false,
            universal::PRINTABLE_STRING,
            Tvb::new(&data),
            0,
            &mut ctx,
            None,
            Some(&NAME),
        )
        .unwrap();
        assert_eq!(offset, 3);
        assert_eq!(value, None);
        assert_eq!(
            ctx.diagnostics()[0].message,
            "String with tag=19 expected but class:UNIVERSAL(0) primitive tag:22 was unexpected"
        );
    }

    #[test]
    fn test_octet_string_wrong_class() {
        let registry = Registry::new();
        let config = DecodeConfig::default().with_decode_unexpected(true);
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x02, 0x01, 0x07];
        let (offset, value) =
            dissect_octet_string(false, Tvb::new(&data), 0, &mut ctx, None, Some(&BLOB)).unwrap();
        assert_eq!(offset, 3);
        assert_eq!(value, None);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::UnexpectedType);
        assert!(ctx.tree().find_by_abbrev("ber.unknown.INTEGER").is_some());
    }

    #[test]
    fn test_unnamed_octet_string() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x04, 0x02, 0xCA, 0xFE];
        dissect_octet_string(false, Tvb::new(&data), 0, &mut ctx, None, None).unwrap();
        let node = ctx.tree().node(ctx.tree().roots()[0]);
        assert_eq!(node.abbrev, "ber.unknown.OCTETSTRING");
        assert_eq!(node.offset, 2);
    }

    #[test]
    fn test_size_constraint() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x04, 0x03, 1, 2, 3];
        let (_, value) = dissect_constrained_octet_string(
            false,
            Tvb::new(&data),
            0,
            &mut ctx,
            None,
            Bounds::new(1, 2),
            Some(&BLOB),
        )
        .unwrap();
        assert_eq!(value.as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(
            ctx.diagnostics()[0].message,
            "Size constraint: string too long: 3 (1..2)"
        );
    }

    fn decode_inner(
        implicit_tag: bool,
        tvb: Tvb<'_>,
        offset: usize,
        ctx: &mut DecodeContext<'_>,
        parent: Option<NodeId>,
        _field: Option<FieldRef>,
    ) -> BerResult<usize> {
        crate::ber::scalar::dissect_integer(implicit_tag, tvb, offset, ctx, parent, Some(&INNER))
            .map(|(end, _)| end)
    }

    #[test]
    fn test_callback_decodes_content() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x04, 0x03, 0x02, 0x01, 0x2A];
        let offset = dissect_octet_string_with_callback(
            false,
            Tvb::new(&data),
            0,
            &mut ctx,
            None,
            Some(&BLOB),
            Some(decode_inner),
        )
        .unwrap();
        assert_eq!(offset, 5);
        let blob = ctx.tree().find_by_abbrev("test.blob").unwrap();
        let inner = ctx.tree().find_by_abbrev("test.inner").unwrap();
        assert_eq!(ctx.tree().node(inner).parent, Some(blob));
        assert_eq!(ctx.tree().node(inner).value, FieldValue::Signed(42));
        assert_eq!(ctx.tree().node(inner).offset, 4);
    }
}
