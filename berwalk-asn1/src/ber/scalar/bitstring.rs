//! BIT STRING

use berwalk_core::{BerResult, DiagnosticKind, FieldRef, FieldValue, NodeId, Tvb};

use crate::ber::context::DecodeContext;
use crate::ber::fields;
use crate::ber::reader::dissect_header;
use crate::ber::schema::{Bounds, NamedBit};
use crate::ber::types::{universal, BerTagClass};

use super::{check_size, unexpected_type};

/// Decode a BIT STRING without a size constraint
pub fn dissect_bitstring(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    named_bits: &[NamedBit],
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<Vec<u8>>)> {
    dissect_constrained_bitstring(
        implicit_tag,
        tvb,
        offset,
        ctx,
        parent,
        Bounds::NONE,
        named_bits,
        field,
    )
}

/// Decode a BIT STRING whose bit count must lie within `bounds`
///
/// The first content octet gives the number of unused bits in the last
/// octet. Each named bit gets a child node under the field node; bits set
/// in the value that no named bit covers are reported once.
///
/// # Returns
/// The offset after the value and the data octets (unused-bits octet
/// excluded).
#[allow(clippy::too_many_arguments)]
pub fn dissect_constrained_bitstring(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    bounds: Bounds,
    named_bits: &[NamedBit],
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<Vec<u8>>)> {
    let (offset, len, constructed, end) = if !implicit_tag {
        let header = dissect_header(ctx, parent, &tvb, offset)?;
        // APPLICATION tags reach here with their own tag still present.
        if header.class() != BerTagClass::Application
            && (header.class() != BerTagClass::Universal
                || header.number() != universal::BIT_STRING)
        {
            unexpected_type(ctx, parent, &tvb, &header, "BitString")?;
            return Ok((header.end_offset(), None));
        }
        (
            header.content_offset(),
            header.content_len(),
            header.is_constructed(),
            header.end_offset(),
        )
    } else {
        let len = tvb.remaining(offset);
        (offset, len, false, offset + len)
    };

    if len == 0 {
        ctx.report(
            DiagnosticKind::IllegalLength,
            parent,
            &tvb,
            offset,
            0,
            "BIT STRING was passed an illegal length of 0",
        );
        return Ok((offset, None));
    }

    if constructed {
        ctx.report(
            DiagnosticKind::ConstructedBitString,
            parent,
            &tvb,
            offset,
            len,
            "Constructed BIT STRING is not supported",
        );
        return Ok((end, None));
    }

    let pad = tvb.byte(offset)?;
    if pad == 0 && len == 1 {
        ctx.add_item(parent, &fields::BITSTRING_EMPTY, &tvb, offset, 1, FieldValue::Unsigned(0));
    } else {
        let node = ctx.add_item(
            parent,
            &fields::BITSTRING_PADDING,
            &tvb,
            offset,
            1,
            FieldValue::Unsigned(u64::from(pad)),
        );
        if pad > 7 {
            ctx.report(
                DiagnosticKind::IllegalPadding,
                Some(node),
                &tvb,
                offset,
                1,
                format!("Illegal padding (0 .. 7): {}", pad),
            );
        }
    }

    let offset = offset + 1;
    let len = len - 1;
    let data = tvb.bytes(offset, len)?;
    let pad = usize::from(pad);

    let item = field.map(|f| ctx.add_item(parent, f, &tvb, offset, len, FieldValue::Bytes(data.to_vec())));

    if !named_bits.is_empty() {
        let mut residual = data.to_vec();
        let mut summary = Vec::new();
        let bit_count = (8 * len).saturating_sub(pad);

        for named in named_bits {
            let bit = named.bit as usize;
            let set = if bit < bit_count {
                let mask = 0x80u8 >> (bit % 8);
                residual[bit / 8] &= !mask;
                let set = data[bit / 8] & mask != 0;
                if let Some(item) = item {
                    ctx.add_item(Some(item), named.field, &tvb, offset + bit / 8, 1, FieldValue::Boolean(set));
                }
                set
            } else {
                // Trailing zero bits may be omitted from the encoding.
                if let Some(item) = item {
                    ctx.add_item(Some(item), named.field, &tvb, offset + len, 0, FieldValue::Boolean(false));
                }
                false
            };
            let text = if set { named.set_text } else { named.clear_text };
            summary.extend(text);
        }

        if let Some(item) = item {
            if !summary.is_empty() {
                ctx.tree_mut()
                    .append_text(item, &format!(" ({})", summary.join(", ")));
            }
        }

        if residual.iter().any(|&b| b != 0) {
            ctx.report(
                DiagnosticKind::UnknownBits,
                item.or(parent),
                &tvb,
                offset,
                len,
                format!("Unknown bit(s): 0x{}", hex::encode(&residual)),
            );
        }
    }

    if pad > 0 && pad < 8 && len > 0 {
        let bits_in_pad = data[len - 1] & (0xFF >> (8 - pad));
        if bits_in_pad != 0 {
            ctx.report(
                DiagnosticKind::PaddingBitsSet,
                item.or(parent),
                &tvb,
                offset + len - 1,
                1,
                format!("Bits set in padded area: 0x{:02x}", bits_in_pad),
            );
        }
    }

    check_size(
        ctx,
        item.or(parent),
        &tvb,
        offset,
        len,
        (8 * len).saturating_sub(pad),
        bounds,
        true,
    );

    Ok((end, Some(data.to_vec())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::registry::Registry;
    use berwalk_core::{DecodeConfig, FieldInfo, FieldKind};

    static FLAGS: FieldInfo = FieldInfo::new("flags", "test.flags", FieldKind::Bytes);
    static READ: FieldInfo = FieldInfo::new("read", "test.flags.read", FieldKind::Boolean);
    static WRITE: FieldInfo = FieldInfo::new("write", "test.flags.write", FieldKind::Boolean);
    static EXEC: FieldInfo = FieldInfo::new("exec", "test.flags.exec", FieldKind::Boolean);

    static NAMED: [NamedBit; 3] = [
        NamedBit {
            bit: 0,
            field: &READ,
            set_text: Some("read"),
            clear_text: None,
        },
        NamedBit {
            bit: 1,
            field: &WRITE,
            set_text: Some("write"),
            clear_text: Some("no-write"),
        },
        NamedBit {
            bit: 12,
            field: &EXEC,
            set_text: Some("exec"),
            clear_text: None,
        },
    ];

    #[test]
    fn test_named_bits() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        // 6 bits used: 1 0 0 0 0 0
        let data = [0x03, 0x02, 0x02, 0x80];
        let (offset, bits) =
            dissect_bitstring(false, Tvb::new(&data), 0, &mut ctx, None, &NAMED, Some(&FLAGS)).unwrap();
        assert_eq!(offset, 4);
        assert_eq!(bits, Some(vec![0x80]));
        assert!(ctx.diagnostics().is_empty());

        let item = ctx.tree().find_by_abbrev("test.flags").unwrap();
        assert_eq!(ctx.tree().node(item).label(), "flags: 80 (read, no-write)");
        let children = ctx.tree().children(item);
        assert_eq!(children.len(), 3);
        let exec = ctx.tree().node(children[2]);
        assert_eq!(exec.value, FieldValue::Boolean(false));
        assert_eq!(exec.length, 0);
    }

    #[test]
    fn test_unknown_and_padding_bits() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x03, 0x02, 0x04, 0x21];
        dissect_bitstring(false, Tvb::new(&data), 0, &mut ctx, None, &NAMED, Some(&FLAGS)).unwrap();
        let kinds: Vec<_> = ctx.diagnostics().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::UnknownBits, DiagnosticKind::PaddingBitsSet]);
        assert_eq!(ctx.diagnostics()[0].message, "Unknown bit(s): 0x21");
        assert_eq!(ctx.diagnostics()[1].message, "Bits set in padded area: 0x01");
    }

    #[test]
    fn test_empty_and_illegal_padding() {
        let registry = Registry::new();
        let config = DecodeConfig::default();

        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x03, 0x01, 0x00];
        let (offset, bits) =
            dissect_bitstring(false, Tvb::new(&data), 0, &mut ctx, None, &[], Some(&FLAGS)).unwrap();
        assert_eq!(offset, 3);
        assert_eq!(bits, Some(Vec::new()));
        assert!(ctx.tree().find_by_abbrev("ber.bitstring.empty").is_some());

        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x03, 0x02, 0x09, 0x00];
        dissect_bitstring(false, Tvb::new(&data), 0, &mut ctx, None, &[], Some(&FLAGS)).unwrap();
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::IllegalPadding);
    }

    #[test]
    fn test_size_constraint_counts_bits() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x03, 0x02, 0x04, 0xF0];
        dissect_constrained_bitstring(
            false,
            Tvb::new(&data),
            0,
            &mut ctx,
            None,
            Bounds::new(8, 16),
            &[],
            Some(&FLAGS),
        )
        .unwrap();
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(
            ctx.diagnostics()[0].message,
            "Size constraint: bit string too short: 4 (8..16)"
        );
    }

    #[test]
    fn test_zero_length() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x03, 0x00];
        let (offset, bits) =
            dissect_bitstring(false, Tvb::new(&data), 0, &mut ctx, None, &[], Some(&FLAGS)).unwrap();
        assert_eq!(offset, 2);
        assert_eq!(bits, None);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::IllegalLength);
    }
}
