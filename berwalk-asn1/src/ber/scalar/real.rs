//! REAL (X.690 clause 8.5)

use berwalk_core::{BerResult, DiagnosticKind, FieldRef, FieldValue, NodeId, Tvb};

use crate::ber::context::DecodeContext;
use crate::ber::reader::dissect_header;

/// Decode the content octets of a REAL
///
/// # Errors
/// A description of the problem when the encoding uses a reserved form or
/// the decimal text does not parse.
pub fn decode_real(content: &[u8]) -> Result<f64, String> {
    let Some(&first) = content.first() else {
        return Ok(0.0);
    };

    if first & 0x80 != 0 {
        return decode_binary(first, &content[1..]);
    }

    if first & 0x40 != 0 {
        return match first {
            0x40 => Ok(f64::INFINITY),
            0x41 => Ok(f64::NEG_INFINITY),
            0x42 => Ok(f64::NAN),
            0x43 => Ok(-0.0),
            other => Err(format!("reserved special real value 0x{:02x}", other)),
        };
    }

    match first & 0x3F {
        1..=3 => {
            let text = std::str::from_utf8(&content[1..])
                .map_err(|_| "decimal real is not ASCII".to_string())?;
            let text = text.trim_start_matches(' ').replace(',', ".");
            text.parse::<f64>()
                .map_err(|_| format!("invalid decimal real '{}'", text))
        }
        nr => Err(format!("unknown decimal real form NR{}", nr)),
    }
}

fn decode_binary(first: u8, rest: &[u8]) -> Result<f64, String> {
    let negative = first & 0x40 != 0;
    let base: f64 = match (first >> 4) & 0x03 {
        0 => 2.0,
        1 => 8.0,
        2 => 16.0,
        _ => return Err("reserved real base".to_string()),
    };
    let scale = i32::from((first >> 2) & 0x03);

    let (exp_len, exp_start) = match first & 0x03 {
        3 => {
            let count = *rest.first().ok_or("missing exponent length")?;
            (usize::from(count), 1)
        }
        n => (usize::from(n) + 1, 0),
    };
    if exp_len == 0 || exp_len > 4 || rest.len() < exp_start + exp_len {
        return Err("invalid real exponent".to_string());
    }

    let exp_octets = &rest[exp_start..exp_start + exp_len];
    let mut exponent: i64 = if exp_octets[0] & 0x80 != 0 { -1 } else { 0 };
    for &octet in exp_octets {
        exponent = (exponent << 8) | i64::from(octet);
    }

    let mut mantissa: f64 = 0.0;
    for &octet in &rest[exp_start + exp_len..] {
        mantissa = mantissa * 256.0 + f64::from(octet);
    }

    let value = mantissa * 2f64.powi(scale) * base.powf(exponent as f64);
    Ok(if negative { -value } else { value })
}

/// Decode a REAL
pub fn dissect_real(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<f64>)> {
    let (offset, len, constructed) = if !implicit_tag {
        let header = dissect_header(ctx, parent, &tvb, offset)?;
        (header.content_offset(), header.content_len(), header.is_constructed())
    } else {
        let (len, constructed) = ctx
            .last_header()
            .map_or((tvb.remaining(offset), false), |h| (h.content_len(), h.is_constructed()));
        let remaining = tvb.remaining(offset);
        if remaining < len {
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
        (offset, len, constructed)
    };

    if constructed {
        ctx.report(
            DiagnosticKind::RealConstructed,
            parent,
            &tvb,
            offset,
            len,
            "REAL class must be encoded as primitive",
        );
    }

    let content = tvb.bytes(offset, len)?;
    match decode_real(content) {
        Ok(value) => {
            if let Some(f) = field {
                ctx.add_item(parent, f, &tvb, offset, len, FieldValue::Double(value));
            }
            Ok((offset + len, Some(value)))
        }
        Err(reason) => {
            ctx.report(DiagnosticKind::RealInvalid, parent, &tvb, offset, len, reason);
            Ok((offset + len, None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::registry::Registry;
    use berwalk_core::{DecodeConfig, FieldInfo, FieldKind};

    static VALUE: FieldInfo = FieldInfo::new("value", "test.value", FieldKind::Double);

    #[test]
    fn test_binary_forms() {
        // 0.5 = 1 * 2^-1
        assert_eq!(decode_real(&[0x80, 0xFF, 0x01]), Ok(0.5));
        // -3 * 2^2
        assert_eq!(decode_real(&[0xC0, 0x02, 0x03]), Ok(-12.0));
        // base 16: 1 * 16^1
        assert_eq!(decode_real(&[0xA0, 0x01, 0x01]), Ok(16.0));
        // scale factor 1: 3 * 2^1 * 2^0
        assert_eq!(decode_real(&[0x84, 0x00, 0x03]), Ok(6.0));
        // explicit exponent length octet
        assert_eq!(decode_real(&[0x83, 0x01, 0x04, 0x01]), Ok(16.0));
    }

    #[test]
    fn test_special_values() {
        assert_eq!(decode_real(&[]), Ok(0.0));
        assert_eq!(decode_real(&[0x40]), Ok(f64::INFINITY));
        assert_eq!(decode_real(&[0x41]), Ok(f64::NEG_INFINITY));
        assert!(decode_real(&[0x42]).unwrap().is_nan());
        let negative_zero = decode_real(&[0x43]).unwrap();
        assert!(negative_zero == 0.0 && negative_zero.is_sign_negative());
        assert!(decode_real(&[0x44]).is_err());
    }

    #[test]
    fn test_decimal_forms() {
        assert_eq!(decode_real(b"\x01  123"), Ok(123.0));
        assert_eq!(decode_real(b"\x02-1,5"), Ok(-1.5));
        assert_eq!(decode_real(b"\x031.25E2"), Ok(125.0));
        assert!(decode_real(b"\x04 1").is_err());
        assert!(decode_real(b"\x01abc").is_err());
    }

    #[test]
    fn test_constructed_real_is_reported() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x29, 0x01, 0x40];
        let (offset, value) =
            dissect_real(false, Tvb::new(&data), 0, &mut ctx, None, Some(&VALUE)).unwrap();
        assert_eq!(offset, 3);
        assert_eq!(value, Some(f64::INFINITY));
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::RealConstructed);
    }
}
