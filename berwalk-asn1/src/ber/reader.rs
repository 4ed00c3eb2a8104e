//! Primitive TLV reader
//!
//! Reads identifier and length octets at an offset. Indefinite lengths are
//! resolved up front by scanning ahead for the matching end-of-contents
//! marker, so every caller works with an effective definite length (which,
//! for the indefinite form, includes the two EOC octets).

use berwalk_core::{BerError, BerResult, FieldValue, NodeId, Tvb};

use super::context::{DecodeContext, MAX_NESTING};
use super::fields;
use super::types::{universal, BerTag, BerTagClass, TlvHeader};

/// Read the identifier octet(s) at `offset`
///
/// # Returns
/// The tag and the offset of the first length octet.
///
/// # Errors
/// `TagOverflow` when a high tag number does not fit in 32 bits; bounds
/// errors when the identifier runs off the buffer.
pub fn read_identifier(tvb: &Tvb<'_>, offset: usize) -> BerResult<(BerTag, usize)> {
    let first = tvb.byte(offset)?;
    let class = BerTagClass::from_bits(first);
    let constructed = first & 0x20 != 0;
    let mut number = u32::from(first & 0x1F);
    let mut pos = offset + 1;

    if number == 0x1F {
        number = 0;
        loop {
            let octet = tvb.byte(pos)?;
            pos += 1;
            if number > (u32::MAX >> 7) {
                return Err(BerError::TagOverflow {
                    offset: tvb.absolute(offset),
                });
            }
            number = (number << 7) | u32::from(octet & 0x7F);
            if octet & 0x80 == 0 {
                break;
            }
        }
    }

    Ok((BerTag::new(class, constructed, number), pos))
}

/// Read the length octet(s) at `offset`
///
/// # Arguments
/// * `depth` - Current nesting depth; the indefinite-length scan recurses
///   from here and fails once it passes [`MAX_NESTING`]
///
/// # Returns
/// `(length, indefinite, offset_after_length)`. For the indefinite form the
/// length covers everything up to and including the end-of-contents marker.
pub fn read_length(tvb: &Tvb<'_>, offset: usize, depth: usize) -> BerResult<(usize, bool, usize)> {
    if depth > MAX_NESTING {
        return Err(BerError::NestingTooDeep { depth });
    }

    let first = tvb.byte(offset)?;
    let pos = offset + 1;

    if first & 0x80 == 0 {
        return Ok((usize::from(first), false, pos));
    }

    let octets = usize::from(first & 0x7F);
    if octets > 0 {
        let mut length: u64 = 0;
        for i in 0..octets {
            length = (length << 8) | u64::from(tvb.byte(pos + i)?);
            if length > u64::from(u32::MAX) {
                return Err(BerError::LengthOverflow {
                    offset: tvb.absolute(offset),
                    octets,
                });
            }
        }
        return Ok((length as usize, false, pos + octets));
    }

    // Indefinite form: walk the enclosed TLVs until the end-of-contents marker.
    let mut scan = pos;
    while !tvb.is_eoc(scan) {
        if tvb.remaining(scan) == 0 {
            return Err(BerError::MissingEndOfContents {
                offset: tvb.absolute(offset),
            });
        }
        let start = scan;
        let (_, after_id) = read_identifier(tvb, scan)?;
        let (len, _, after_len) = read_length(tvb, after_id, depth + 1)?;
        scan = after_len + len;
        if scan <= start {
            return Err(BerError::NoProgress {
                offset: tvb.absolute(start),
            });
        }
    }

    Ok((scan - pos + 2, true, pos))
}

/// Read identifier and length at `offset`
pub fn read_header(tvb: &Tvb<'_>, offset: usize, depth: usize) -> BerResult<TlvHeader> {
    let (tag, after_id) = read_identifier(tvb, offset)?;
    let (length, indefinite, after_len) = read_length(tvb, after_id, depth)?;
    Ok(TlvHeader {
        tag,
        length,
        indefinite,
        offset,
        header_len: after_len - offset,
    })
}

/// Read a header without adding nodes, recording it as the last header seen
pub fn peek_header(ctx: &mut DecodeContext<'_>, tvb: &Tvb<'_>, offset: usize) -> BerResult<TlvHeader> {
    let header = read_header(tvb, offset, ctx.depth())?;
    ctx.set_last_header(header);
    Ok(header)
}

/// Read the identifier and, with `show_internal_fields`, add nodes for it
pub fn dissect_identifier(
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    tvb: &Tvb<'_>,
    offset: usize,
) -> BerResult<(BerTag, usize)> {
    let (tag, end) = read_identifier(tvb, offset)?;

    if ctx.config().show_internal_fields {
        let class = tag.class();
        let node = ctx.add_item(
            parent,
            &fields::ID_CLASS,
            tvb,
            offset,
            1,
            FieldValue::Unsigned(class as u64),
        );
        ctx.tree_mut()
            .set_text(node, format!("{} ({})", class.name(), class as u8));

        let node = ctx.add_item(
            parent,
            &fields::ID_PC,
            tvb,
            offset,
            1,
            FieldValue::Boolean(tag.is_constructed()),
        );
        let pc = if tag.is_constructed() {
            "Constructed Encoding"
        } else {
            "Primitive Encoding"
        };
        ctx.tree_mut().set_text(node, pc);

        if class == BerTagClass::Universal {
            let node = ctx.add_item(
                parent,
                &fields::ID_UNI_TAG,
                tvb,
                offset,
                end - offset,
                FieldValue::Unsigned(u64::from(tag.number())),
            );
            let name = universal::name(tag.number()).unwrap_or("Unknown");
            ctx.tree_mut()
                .set_text(node, format!("{} ({})", name, tag.number()));
        } else {
            ctx.add_item(
                parent,
                &fields::ID_TAG,
                tvb,
                offset,
                end - offset,
                FieldValue::Unsigned(u64::from(tag.number())),
            );
        }
    }

    Ok((tag, end))
}

/// Read the length and, with `show_internal_fields`, add a node for it
pub fn dissect_length(
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    tvb: &Tvb<'_>,
    offset: usize,
) -> BerResult<(usize, bool, usize)> {
    let (length, indefinite, end) = read_length(tvb, offset, ctx.depth())?;

    if ctx.config().show_internal_fields {
        let value = if indefinite { 0 } else { length as u64 };
        let node = ctx.add_item(
            parent,
            &fields::LENGTH,
            tvb,
            offset,
            end - offset,
            FieldValue::Unsigned(value),
        );
        if indefinite {
            ctx.tree_mut().set_text(node, "Indefinite length");
        }
    }

    Ok((length, indefinite, end))
}

/// Read a full header, adding internal-field nodes when configured and
/// recording it as the last header seen
pub fn dissect_header(
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    tvb: &Tvb<'_>,
    offset: usize,
) -> BerResult<TlvHeader> {
    let (tag, after_id) = dissect_identifier(ctx, parent, tvb, offset)?;
    let (length, indefinite, after_len) = dissect_length(ctx, parent, tvb, after_id)?;
    let header = TlvHeader {
        tag,
        length,
        indefinite,
        offset,
        header_len: after_len - offset,
    };
    ctx.set_last_header(header);
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_identifier() {
        let data = [0xA1, 0x00];
        let (tag, next) = read_identifier(&Tvb::new(&data), 0).unwrap();
        assert_eq!(tag.class(), BerTagClass::ContextSpecific);
        assert!(tag.is_constructed());
        assert_eq!(tag.number(), 1);
        assert_eq!(next, 1);
    }

    #[test]
    fn test_high_tag_number() {
        let data = [0x5F, 0x81, 0x49, 0x00];
        let (tag, next) = read_identifier(&Tvb::new(&data), 0).unwrap();
        assert_eq!(tag.class(), BerTagClass::Application);
        assert_eq!(tag.number(), 201);
        assert_eq!(next, 3);
    }

    #[test]
    fn test_tag_overflow_is_malformed() {
        let data = [0x1F, 0x8F, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        assert!(matches!(
            read_identifier(&Tvb::new(&data), 0),
            Err(BerError::TagOverflow { offset: 0 })
        ));
    }

    #[test]
    fn test_definite_lengths() {
        let data = [0x05, 0x82, 0x01, 0x00];
        let tvb = Tvb::new(&data);
        assert_eq!(read_length(&tvb, 0, 0).unwrap(), (5, false, 1));
        assert_eq!(read_length(&tvb, 1, 0).unwrap(), (256, false, 4));
    }

    #[test]
    fn test_length_overflow() {
        let data = [0x85, 0x01, 0x00, 0x00, 0x00, 0x00];
        assert!(matches!(
            read_length(&Tvb::new(&data), 0, 0),
            Err(BerError::LengthOverflow { octets: 5, .. })
        ));
    }

    #[test]
    fn test_indefinite_length_lookahead() {
        // 30 80 | 02 01 05 | 30 80 01 01 ff 00 00 | 00 00
        let data = [
            0x30, 0x80, 0x02, 0x01, 0x05, 0x30, 0x80, 0x01, 0x01, 0xFF, 0x00, 0x00, 0x00, 0x00,
        ];
        let header = read_header(&Tvb::new(&data), 0, 0).unwrap();
        assert!(header.indefinite);
        assert_eq!(header.header_len, 2);
        assert_eq!(header.length, 12);
        assert_eq!(header.end_offset(), data.len());
        assert_eq!(header.content_len(), 10);
    }

    #[test]
    fn test_indefinite_without_eoc() {
        let data = [0x30, 0x80, 0x02, 0x01, 0x05];
        assert!(matches!(
            read_header(&Tvb::new(&data), 0, 0),
            Err(BerError::MissingEndOfContents { .. })
        ));
    }

    #[test]
    fn test_indefinite_nesting_bound() {
        let mut data = Vec::new();
        for _ in 0..(MAX_NESTING + 10) {
            data.extend_from_slice(&[0x30, 0x80]);
        }
        for _ in 0..(MAX_NESTING + 10) {
            data.extend_from_slice(&[0x00, 0x00]);
        }
        assert!(matches!(
            read_header(&Tvb::new(&data), 0, 0),
            Err(BerError::NestingTooDeep { .. })
        ));
    }
}
