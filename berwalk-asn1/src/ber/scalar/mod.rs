//! Decoders for primitive values
//!
//! Every decoder takes the same leading arguments as a [`FieldDecoder`]:
//! `implicit_tag`, the view, the offset, the context, the parent node and
//! (last, for the typed variants) the field. With `implicit_tag` false the
//! decoder reads and checks its own identifier and length; a mismatching
//! identifier is reported and, where the content cannot be interpreted, the
//! whole TLV is skipped.
//!
//! [`FieldDecoder`]: super::schema::FieldDecoder

pub mod bitstring;
pub mod boolean;
pub mod integer;
pub mod oid;
pub mod real;
pub mod string;
pub mod time;

pub use bitstring::{dissect_bitstring, dissect_constrained_bitstring};
pub use boolean::{dissect_boolean, dissect_null};
pub use integer::{dissect_constrained_integer, dissect_integer};
pub use oid::{
    dissect_object_identifier, dissect_object_identifier_str, dissect_relative_oid,
    dissect_relative_oid_str,
};
pub use real::{decode_real, dissect_real};
pub use string::{
    decode_text, dissect_constrained_octet_string, dissect_constrained_restricted_string,
    dissect_octet_string, dissect_octet_string_with_callback, dissect_restricted_string,
};
pub use time::{
    dissect_generalized_time, dissect_utc_time, format_generalized_time, format_utc_time,
};

use berwalk_core::{BerResult, DiagnosticKind, NodeId, Tvb};

use super::context::DecodeContext;
use super::schema::{BoundCheck, Bounds};
use super::types::TlvHeader;
use super::unknown::dissect_unknown_ber;

/// Report an identifier that does not fit the type being decoded
///
/// With `decode_unexpected` the offending TLV is also walked as unknown BER.
pub(crate) fn unexpected_type(
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    tvb: &Tvb<'_>,
    header: &TlvHeader,
    expected: &str,
) -> BerResult<()> {
    let class = header.class();
    let message = format!(
        "{} expected but class:{}({}) {} tag:{} was unexpected",
        expected,
        class.name(),
        class as u8,
        if header.is_constructed() {
            "constructed"
        } else {
            "primitive"
        },
        header.number()
    );
    ctx.report(
        DiagnosticKind::UnexpectedType,
        parent,
        tvb,
        header.offset,
        header.header_len + header.length,
        message,
    );
    if ctx.config().decode_unexpected {
        dissect_unknown_ber(ctx, *tvb, header.offset, parent)?;
    }
    Ok(())
}

/// Report a string length or bit count outside `bounds`
///
/// `bits` selects the wording for BIT STRING sizes, which count bits.
#[allow(clippy::too_many_arguments)]
pub(crate) fn check_size(
    ctx: &mut DecodeContext<'_>,
    node: Option<NodeId>,
    tvb: &Tvb<'_>,
    offset: usize,
    length: usize,
    size: usize,
    bounds: Bounds,
    bits: bool,
) {
    let verdict = match bounds.check(size as i64) {
        BoundCheck::Within => return,
        BoundCheck::Below => "too short",
        BoundCheck::Above => "too long",
    };
    ctx.report(
        DiagnosticKind::SizeConstraint,
        node,
        tvb,
        offset,
        length,
        format!(
            "Size constraint: {}string {}: {} ({})",
            if bits { "bit " } else { "" },
            verdict,
            size,
            bounds.describe()
        ),
    );
}
