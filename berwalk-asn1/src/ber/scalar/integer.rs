//! INTEGER and ENUMERATED

use berwalk_core::{BerResult, DiagnosticKind, FieldKind, FieldRef, FieldValue, NodeId, Tvb};

use crate::ber::context::DecodeContext;
use crate::ber::fields;
use crate::ber::reader::dissect_header;
use crate::ber::schema::{BoundCheck, Bounds};
use crate::ber::types::{universal, BerTagClass};

use super::unexpected_type;

/// Largest content accepted as a number: eight value octets plus one
/// leading zero for unsigned 64-bit values with the top bit set
const MAX_INTEGER_OCTETS: usize = 9;

/// Decode an INTEGER or ENUMERATED
///
/// # Returns
/// The offset after the value and the decoded number. Sign extension only
/// happens for signed fields (and when no field is given); an unsigned
/// 64-bit value above `i64::MAX` is returned as its two's-complement bit
/// pattern, the node carries the exact value. `None` when the encoding is
/// empty or too wide to represent, in which case the node holds the raw
/// bytes instead.
pub fn dissect_integer(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<i64>)> {
    dissect_constrained_integer(implicit_tag, tvb, offset, ctx, parent, Bounds::NONE, field)
}

/// Decode an INTEGER whose value must lie within `bounds`
pub fn dissect_constrained_integer(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    bounds: Bounds,
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<i64>)> {
    log::trace!("INTEGER entered implicit_tag:{} offset:{}", implicit_tag, offset);

    let (offset, len) = if !implicit_tag {
        let header = dissect_header(ctx, parent, &tvb, offset)?;
        let expected = header.class() == BerTagClass::Universal
            && !header.is_constructed()
            && (header.number() == universal::INTEGER || header.number() == universal::ENUMERATED);
        if !expected && header.class() == BerTagClass::Universal {
            unexpected_type(ctx, parent, &tvb, &header, "Integer")?;
        }
        (header.content_offset(), header.content_len())
    } else {
        (offset, tvb.remaining(offset))
    };

    let content = tvb.bytes(offset, len)?;

    if len == 0 {
        ctx.report(
            DiagnosticKind::IntegerLength,
            parent,
            &tvb,
            offset,
            0,
            "Can't handle integer length: 0",
        );
        return Ok((offset, None));
    }

    if len > MAX_INTEGER_OCTETS || (len == MAX_INTEGER_OCTETS && content[0] != 0) {
        let target = match field {
            Some(f) if f.kind == FieldKind::Bytes => f,
            _ => &fields::INTEGER_AS_BYTES,
        };
        ctx.add_item(parent, target, &tvb, offset, len, FieldValue::Bytes(content.to_vec()));
        return Ok((offset + len, None));
    }

    let kind = field.map_or(FieldKind::Int64, |f| f.kind);
    let mut value: i64 = 0;
    if content[0] & 0x80 != 0 && !kind.is_unsigned() {
        value = -1;
    }
    for &byte in content {
        value = (value << 8) | i64::from(byte);
    }

    let node = field.map(|f| {
        let field_value = match f.kind {
            FieldKind::Boolean => FieldValue::Boolean(value != 0),
            k if k.is_unsigned() => FieldValue::Unsigned(value as u64),
            FieldKind::Bytes => FieldValue::Bytes(content.to_vec()),
            _ => FieldValue::Signed(value),
        };
        ctx.add_item(parent, f, &tvb, offset, len, field_value)
    });

    if ctx.config().warn_on_excess_integer_bytes
        && len > 1
        && ((content[0] == 0x00 && content[1] & 0x80 == 0)
            || (content[0] == 0xFF && content[1] & 0x80 != 0))
    {
        ctx.report(
            DiagnosticKind::IntegerTooManyBytes,
            node.or(parent),
            &tvb,
            offset,
            len,
            "Value is encoded with too many bytes (9 leading zero or one bits)",
        );
    }

    let exact = if kind.is_unsigned() {
        i128::from(value as u64)
    } else {
        i128::from(value)
    };
    let verdict = match bounds.check(exact) {
        BoundCheck::Within => None,
        BoundCheck::Below => Some("value too small"),
        BoundCheck::Above => Some("value too big"),
    };
    if let Some(verdict) = verdict {
        ctx.report(
            DiagnosticKind::ValueConstraint,
            node.or(parent),
            &tvb,
            offset,
            len,
            format!("Size constraint: {}: {} ({})", verdict, exact, bounds.describe()),
        );
    }

    Ok((offset + len, Some(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::encoder::BerEncoder;
    use crate::ber::registry::Registry;
    use berwalk_core::{DecodeConfig, FieldInfo};

    static SIGNED: FieldInfo = FieldInfo::new("signed", "test.signed", FieldKind::Int64);
    static UNSIGNED: FieldInfo = FieldInfo::new("unsigned", "test.unsigned", FieldKind::Uint64);
    static RAW: FieldInfo = FieldInfo::new("raw", "test.raw", FieldKind::Bytes);

    fn decode(data: &[u8], field: FieldRef, config: &DecodeConfig) -> (usize, Option<i64>, DecodeContext<'static>) {
        let registry: &'static Registry = Box::leak(Box::new(Registry::new()));
        let config: &'static DecodeConfig = Box::leak(Box::new(config.clone()));
        let mut ctx = DecodeContext::new(registry, config);
        let (offset, value) =
            dissect_integer(false, Tvb::new(data), 0, &mut ctx, None, Some(field)).unwrap();
        (offset, value, ctx)
    }

    #[test]
    fn test_signed_round_trip_all_widths() {
        let config = DecodeConfig::default();
        let samples = [
            0i64,
            1,
            -1,
            127,
            -128,
            128,
            -129,
            32767,
            -32768,
            0x7F_FFFF,
            -0x80_0000,
            i32::MAX as i64,
            i32::MIN as i64,
            0x7F_FFFF_FFFF,
            -0x80_0000_0000,
            0x7FFF_FFFF_FFFF,
            0x7F_FFFF_FFFF_FFFF,
            i64::MAX,
            i64::MIN,
        ];
        for value in samples {
            let mut encoder = BerEncoder::new();
            encoder.encode_integer(value).unwrap();
            let bytes = encoder.into_bytes();
            let (offset, decoded, ctx) = decode(&bytes, &SIGNED, &config);
            assert_eq!(offset, bytes.len(), "value {}", value);
            assert_eq!(decoded, Some(value), "value {}", value);
            let node = ctx.tree().roots()[0];
            assert_eq!(ctx.tree().node(node).value, FieldValue::Signed(value));
        }
    }

    #[test]
    fn test_nine_byte_unsigned() {
        let config = DecodeConfig::default();
        let data = [0x02, 0x09, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let (offset, value, ctx) = decode(&data, &UNSIGNED, &config);
        assert_eq!(offset, 11);
        assert_eq!(value.map(|v| v as u64), Some(u64::MAX));
        let node = ctx.tree().roots()[0];
        assert_eq!(ctx.tree().node(node).value, FieldValue::Unsigned(u64::MAX));
    }

    #[test]
    fn test_unsigned_field_skips_sign_extension() {
        let config = DecodeConfig::default();
        let (_, value, ctx) = decode(&[0x02, 0x01, 0xFF], &UNSIGNED, &config);
        assert_eq!(value, Some(255));
        assert_eq!(ctx.tree().node(ctx.tree().roots()[0]).value, FieldValue::Unsigned(255));
    }

    #[test]
    fn test_too_wide_is_raw_bytes() {
        let config = DecodeConfig::default();
        let data = [0x02, 0x09, 0x01, 0, 0, 0, 0, 0, 0, 0, 0];
        let (offset, value, ctx) = decode(&data, &SIGNED, &config);
        assert_eq!(offset, 11);
        assert_eq!(value, None);
        let node = ctx.tree().node(ctx.tree().roots()[0]);
        assert_eq!(node.abbrev, "ber.64bit_uint_as_bytes");

        let (_, _, ctx) = decode(&data, &RAW, &config);
        assert_eq!(ctx.tree().node(ctx.tree().roots()[0]).abbrev, "test.raw");
    }

    #[test]
    fn test_excess_bytes_warning() {
        let config = DecodeConfig::default().with_excess_integer_warning(true);
        let (_, value, ctx) = decode(&[0x02, 0x02, 0x00, 0x05], &SIGNED, &config);
        assert_eq!(value, Some(5));
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::IntegerTooManyBytes);

        let (_, _, ctx) = decode(&[0x02, 0x02, 0x00, 0x80], &SIGNED, &config);
        assert!(ctx.diagnostics().is_empty());

        let quiet = DecodeConfig::default();
        let (_, _, ctx) = decode(&[0x02, 0x02, 0xFF, 0x80], &SIGNED, &quiet);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_zero_length() {
        let config = DecodeConfig::default();
        let (offset, value, ctx) = decode(&[0x02, 0x00], &SIGNED, &config);
        assert_eq!(offset, 2);
        assert_eq!(value, None);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::IntegerLength);
    }

    #[test]
    fn test_value_constraint() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x02, 0x01, 0x09];
        let (_, value) = dissect_constrained_integer(
            false,
            Tvb::new(&data),
            0,
            &mut ctx,
            None,
            Bounds::new(0, 7),
            Some(&SIGNED),
        )
        .unwrap();
        assert_eq!(value, Some(9));
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::ValueConstraint);
        assert_eq!(ctx.diagnostics()[0].message, "Size constraint: value too big: 9 (0..7)");
    }

    #[test]
    fn test_unsigned_constraint_above_i64() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x02, 0x09, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let (offset, _) = dissect_constrained_integer(
            false,
            Tvb::new(&data),
            0,
            &mut ctx,
            None,
            Bounds::at_least(0),
            Some(&UNSIGNED),
        )
        .unwrap();
        assert_eq!(offset, 11);
        assert!(ctx.diagnostics().is_empty());

        let mut ctx = DecodeContext::new(&registry, &config);
        dissect_constrained_integer(
            false,
            Tvb::new(&data),
            0,
            &mut ctx,
            None,
            Bounds::new(0, 10),
            Some(&UNSIGNED),
        )
        .unwrap();
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(
            ctx.diagnostics()[0].message,
            "Size constraint: value too big: 18446744073709551615 (0..10)"
        );
    }

    #[test]
    fn test_truncated_content_is_structural() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x02, 0x04, 0x01];
        assert!(dissect_integer(false, Tvb::new(&data), 0, &mut ctx, None, Some(&SIGNED)).is_err());
    }
}
