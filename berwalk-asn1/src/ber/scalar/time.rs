//! UTCTime and GeneralizedTime

use std::sync::LazyLock;

use berwalk_core::{BerResult, DiagnosticKind, FieldKind, FieldRef, FieldValue, NodeId, Tvb};
use regex::Regex;

use crate::ber::context::DecodeContext;
use crate::ber::reader::dissect_header;
use crate::ber::types::{universal, BerTagClass};
use crate::ber::unknown::dissect_unknown_ber;

use super::unexpected_type;

static GENERALIZED_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4})(\d{2})(\d{2})(\d{2})(\d{2})(\d{2})(?:([.,])(\d{1,4}))?(?:(Z)|([+-])(\d{1,4}))?$",
    )
    .expect("valid regex")
});

/// Render a UTCTime value, `YYMMDDhhmm[ss](Z|±hhmm)`
///
/// # Returns
/// `YY-MM-DD hh:mm[:ss] (UTC)` or `... (UTC±hhmm)`.
///
/// # Errors
/// A description of the first character that breaks the grammar.
pub fn format_utc_time(raw: &[u8]) -> Result<String, String> {
    let len = raw.len();
    if !(10..=19).contains(&len) {
        return Err(format!("UTCTime invalid length: {}", len));
    }
    if !raw[..10].iter().all(u8::is_ascii_digit) {
        return Err(
            "malformed UTCTime encoding, first 10 octets have to contain YYMMDDhhmm in digits"
                .to_string(),
        );
    }

    let text = |range: std::ops::Range<usize>| String::from_utf8_lossy(&raw[range]).into_owned();
    let mut out = format!(
        "{}-{}-{} {}:{}",
        text(0..2),
        text(2..4),
        text(4..6),
        text(6..8),
        text(8..10)
    );

    let mut i = 10;
    if len >= 12 && raw[i].is_ascii_digit() {
        if !raw[i + 1].is_ascii_digit() {
            return Err("malformed UTCTime encoding, if 11th octet is a digit for seconds, \
                        the 12th octet has to be a digit, too"
                .to_string());
        }
        out.push(':');
        out.push_str(&text(10..12));
        i = 12;
    }

    match raw.get(i) {
        Some(b'Z') => {
            if len != i + 1 {
                return Err(
                    "malformed UTCTime encoding, there must be no further octets after 'Z'"
                        .to_string(),
                );
            }
            out.push_str(" (UTC)");
        }
        Some(&sign @ (b'+' | b'-')) => {
            if len != i + 5 || !raw[i + 1..i + 5].iter().all(u8::is_ascii_digit) {
                return Err(
                    "malformed UTCTime encoding, 4 digits must follow on '+' resp. '-'".to_string(),
                );
            }
            out.push_str(&format!(" (UTC{}{})", char::from(sign), text(i + 1..i + 5)));
        }
        _ => {
            return Err(format!(
                "malformed UTCTime encoding, unexpected character in {}th octet, \
                 must be 'Z', '+' or '-'",
                i + 1
            ));
        }
    }

    Ok(out)
}

/// Render a GeneralizedTime value, `YYYYMMDDhhmmss[.f](Z|±hhmm)?`
///
/// # Errors
/// The diagnostic text for a length outside 14..=23 or a value that does
/// not follow the grammar.
pub fn format_generalized_time(raw: &[u8]) -> Result<String, String> {
    if !(14..=23).contains(&raw.len()) {
        return Err(format!("GeneralizedTime invalid length: {}", raw.len()));
    }
    let text = String::from_utf8_lossy(raw);
    let invalid = || format!("GeneralizedTime invalid format: {}", text);
    let caps = GENERALIZED_TIME.captures(&text).ok_or_else(invalid)?;
    let group = |n: usize| caps.get(n).map_or("", |m| m.as_str());

    let mut out = format!(
        "{}-{}-{} {}:{}:{}",
        group(1),
        group(2),
        group(3),
        group(4),
        group(5),
        group(6)
    );
    if caps.get(7).is_some() {
        out.push_str(group(7));
        out.push_str(group(8));
    }
    if caps.get(9).is_some() {
        out.push_str(" (UTC)");
    } else if caps.get(10).is_some() {
        out.push_str(&format!(" (UTC{}{:0>4})", group(10), group(11)));
    }
    Ok(out)
}

/// Decode a UTCTime
///
/// A value breaking the grammar is still added to the tree as the raw
/// text, with a diagnostic.
///
/// # Returns
/// The offset after the value and its rendered (or, if malformed, raw)
/// text. `None` when the identifier did not fit.
pub fn dissect_utc_time(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<String>)> {
    let (offset, len) = if !implicit_tag {
        let header = dissect_header(ctx, parent, &tvb, offset)?;
        if header.class() != BerTagClass::Universal || header.number() != universal::UTC_TIME {
            unexpected_type(ctx, parent, &tvb, &header, "UTCTime")?;
            return Ok((header.end_offset(), None));
        }
        (header.content_offset(), header.content_len())
    } else {
        (offset, tvb.remaining(offset))
    };

    let raw = tvb.bytes(offset, len)?;
    match format_utc_time(raw) {
        Ok(display) => {
            add_time(ctx, parent, field, &tvb, offset, raw, &display);
            Ok((offset + len, Some(display)))
        }
        Err(reason) => {
            let shown = String::from_utf8_lossy(&raw[..len.min(19)]).into_owned();
            let node = add_time(ctx, parent, field, &tvb, offset, raw, &shown);
            ctx.report(
                DiagnosticKind::InvalidUtcTime,
                node.or(parent),
                &tvb,
                offset,
                len,
                reason,
            );
            Ok((offset + len, Some(shown)))
        }
    }
}

/// Decode a GeneralizedTime
pub fn dissect_generalized_time(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<(usize, Option<String>)> {
    let (offset, len) = if !implicit_tag {
        let header = dissect_header(ctx, parent, &tvb, offset)?;
        if header.class() != BerTagClass::Universal
            || header.number() != universal::GENERALIZED_TIME
        {
            unexpected_type(ctx, parent, &tvb, &header, "GeneralizedTime")?;
            return Ok((header.end_offset(), None));
        }
        (header.content_offset(), header.content_len())
    } else {
        (offset, tvb.remaining(offset))
    };

    let raw = tvb.bytes(offset, len)?;
    match format_generalized_time(raw) {
        Ok(display) => {
            add_time(ctx, parent, field, &tvb, offset, raw, &display);
            Ok((offset + len, Some(display)))
        }
        Err(reason) => {
            let shown = String::from_utf8_lossy(raw).into_owned();
            let node = add_time(ctx, parent, field, &tvb, offset, raw, &shown);
            ctx.report(
                DiagnosticKind::InvalidGeneralizedTime,
                node.or(parent),
                &tvb,
                offset,
                len,
                reason,
            );
            if ctx.config().decode_unexpected {
                let content = tvb.subset(offset, len)?;
                dissect_unknown_ber(ctx, content, 0, node.or(parent))?;
            }
            Ok((offset + len, Some(shown)))
        }
    }
}

fn add_time(
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
    tvb: &Tvb<'_>,
    offset: usize,
    raw: &[u8],
    text: &str,
) -> Option<NodeId> {
    let field = field?;
    let value = match field.kind {
        FieldKind::Bytes => FieldValue::Bytes(raw.to_vec()),
        _ => FieldValue::String(text.to_string()),
    };
    Some(ctx.add_item(parent, field, tvb, offset, raw.len(), value))
}
