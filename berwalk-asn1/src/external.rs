//! EXTERNAL and EMBEDDED PDV
//!
//! Both are IMPLICIT SEQUENCEs carrying a value of some other abstract
//! syntax, identified by an object identifier or a presentation context:
//!
//! ```text
//! EXTERNAL ::= [UNIVERSAL 8] IMPLICIT SEQUENCE {
//!     direct-reference      OBJECT IDENTIFIER OPTIONAL,
//!     indirect-reference    INTEGER OPTIONAL,
//!     data-value-descriptor ObjectDescriptor OPTIONAL,
//!     encoding CHOICE {
//!         single-ASN1-type [0] ABSTRACT-SYNTAX.&Type,
//!         octet-aligned    [1] IMPLICIT OCTET STRING,
//!         arbitrary        [2] IMPLICIT BIT STRING
//!     }
//! }
//! ```
//!
//! EMBEDDED PDV shares the layout under `[UNIVERSAL 11]`.
//!
//! The references and the chosen encoding are collected in
//! [`DecodeContext::external`] while the sequence is walked. The scratch is
//! reset when an EXTERNAL is entered and left in place afterwards, so the
//! caller can inspect what was decoded.

use berwalk_core::{BerResult, FieldInfo, FieldKind, FieldRef, NodeId, Tvb};

use crate::ber::constructed::{dissect_choice, dissect_sequence, dissect_tagged_type};
use crate::ber::context::{DecodeContext, ExternalEncoding, ExternalScratch};
use crate::ber::dispatch::call_oid_callback;
use crate::ber::registry::Registry;
use crate::ber::scalar::{
    dissect_bitstring, dissect_integer, dissect_object_identifier_str, dissect_octet_string,
    dissect_restricted_string,
};
use crate::ber::schema::{ChoiceAlternative, FieldDecoder, FieldDescriptor, FieldFlags};
use crate::ber::types::{universal, BerTagClass};

/// Syntax name the EXTERNAL handler is registered under
pub const EXTERNAL_SYNTAX: &str = "EXTERNAL";
/// Syntax name the EMBEDDED PDV handler is registered under
pub const EMBEDDED_PDV_SYNTAX: &str = "EMBEDDED PDV";

pub static EXTERNAL: FieldInfo = FieldInfo::new("EXTERNAL", "ber.external", FieldKind::None);
pub static EMBEDDED_PDV: FieldInfo =
    FieldInfo::new("EMBEDDED PDV", "ber.embedded_pdv", FieldKind::None);
pub static DIRECT_REFERENCE: FieldInfo =
    FieldInfo::new("direct-reference", "ber.direct_reference", FieldKind::Oid);
pub static INDIRECT_REFERENCE: FieldInfo =
    FieldInfo::new("indirect-reference", "ber.indirect_reference", FieldKind::Int32);
pub static DATA_VALUE_DESCRIPTOR: FieldInfo = FieldInfo::new(
    "data-value-descriptor",
    "ber.data_value_descriptor",
    FieldKind::String,
);
pub static ENCODING: FieldInfo = FieldInfo::new("encoding", "ber.encoding", FieldKind::Uint32);
pub static SINGLE_ASN1_TYPE: FieldInfo =
    FieldInfo::new("single-ASN1-type", "ber.single_ASN1_type", FieldKind::None);
pub static OCTET_ALIGNED: FieldInfo =
    FieldInfo::new("octet-aligned", "ber.octet_aligned", FieldKind::Bytes);
pub static ARBITRARY: FieldInfo = FieldInfo::new("arbitrary", "ber.arbitrary", FieldKind::Bytes);

static ENCODING_ALTERNATIVES: [ChoiceAlternative; 3] = [
    ChoiceAlternative::new(
        0,
        Some(&SINGLE_ASN1_TYPE),
        Some(BerTagClass::ContextSpecific),
        Some(0),
        FieldFlags::NONE,
        single_asn1_type,
    ),
    ChoiceAlternative::new(
        1,
        Some(&OCTET_ALIGNED),
        Some(BerTagClass::ContextSpecific),
        Some(1),
        FieldFlags::IMPLICIT_TAG,
        octet_aligned,
    ),
    ChoiceAlternative::new(
        2,
        Some(&ARBITRARY),
        Some(BerTagClass::ContextSpecific),
        Some(2),
        FieldFlags::IMPLICIT_TAG,
        arbitrary,
    ),
];

const OPTIONAL_UNIVERSAL: FieldFlags = FieldFlags::OPTIONAL.union(FieldFlags::NO_OWN_TAG);

static EXTERNAL_FIELDS: [FieldDescriptor; 4] = [
    FieldDescriptor::new(
        Some(&DIRECT_REFERENCE),
        Some(BerTagClass::Universal),
        Some(universal::OBJECT_IDENTIFIER),
        OPTIONAL_UNIVERSAL,
        direct_reference,
    ),
    FieldDescriptor::new(
        Some(&INDIRECT_REFERENCE),
        Some(BerTagClass::Universal),
        Some(universal::INTEGER),
        OPTIONAL_UNIVERSAL,
        indirect_reference,
    ),
    FieldDescriptor::new(
        Some(&DATA_VALUE_DESCRIPTOR),
        Some(BerTagClass::Universal),
        Some(universal::OBJECT_DESCRIPTOR),
        OPTIONAL_UNIVERSAL,
        data_value_descriptor,
    ),
    FieldDescriptor::new(
        Some(&ENCODING),
        None,
        None,
        FieldFlags::NO_OWN_TAG.union(FieldFlags::NO_CHECK_TAG),
        encoding,
    ),
];

fn direct_reference(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    let (end, oid) = dissect_object_identifier_str(implicit_tag, tvb, offset, ctx, parent, field)?;
    ctx.external.direct_reference = oid;
    Ok(end)
}

fn indirect_reference(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    let (end, value) = dissect_integer(implicit_tag, tvb, offset, ctx, parent, field)?;
    ctx.external.indirect_reference = value;
    Ok(end)
}

fn data_value_descriptor(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    let (end, text) = dissect_restricted_string(
        implicit_tag,
        universal::OBJECT_DESCRIPTOR,
        tvb,
        offset,
        ctx,
        parent,
        field,
    )?;
    ctx.external.data_value_descriptor =
        text.map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
    Ok(end)
}

fn encoding(
    _implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    dissect_choice(tvb, offset, ctx, parent, &ENCODING_ALTERNATIVES, field).map(|(end, _)| end)
}

fn single_asn1_type(
    _implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    ctx.external.encoding = Some(ExternalEncoding::SingleAsn1Type);
    if let Some(callback) = ctx.external.callback {
        return callback(false, tvb, offset, ctx, parent, field);
    }
    let oid = ctx.external.direct_reference.clone();
    call_oid_callback(oid.as_deref(), tvb, offset, ctx, parent)
}

fn octet_aligned(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    ctx.external.encoding = Some(ExternalEncoding::OctetAligned);
    if let Some(callback) = ctx.external.callback {
        return callback(false, tvb, offset, ctx, parent, field);
    }
    let handled = ctx
        .external
        .direct_reference
        .clone()
        .filter(|oid| has_handler(ctx.registry(), oid));
    match handled {
        Some(oid) => call_oid_callback(Some(&oid), tvb, offset, ctx, parent),
        None => dissect_octet_string(implicit_tag, tvb, offset, ctx, parent, field).map(|(end, _)| end),
    }
}

fn arbitrary(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    ctx.external.encoding = Some(ExternalEncoding::Arbitrary);
    if let Some(callback) = ctx.external.callback {
        return callback(false, tvb, offset, ctx, parent, field);
    }
    dissect_bitstring(implicit_tag, tvb, offset, ctx, parent, &[], field).map(|(end, _)| end)
}

fn has_handler(registry: &Registry, oid: &str) -> bool {
    registry.has_oid_handler(oid)
        || registry
            .oid_syntax(oid)
            .is_some_and(|syntax| registry.has_syntax_handler(syntax))
}

fn external_sequence(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    dissect_sequence(implicit_tag, tvb, offset, ctx, parent, &EXTERNAL_FIELDS, field)
}

/// Decode an EXTERNAL
///
/// `callback`, when given, decodes the value carried by any of the three
/// encodings instead of OID dispatch on the direct reference. It receives
/// the content of the `[0]`, `[1]` or `[2]` wrapper.
pub fn dissect_external_type(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
    callback: Option<FieldDecoder>,
) -> BerResult<usize> {
    ctx.external = ExternalScratch {
        callback,
        ..ExternalScratch::default()
    };
    dissect_tagged_type(
        implicit_tag,
        tvb,
        offset,
        ctx,
        parent,
        field,
        BerTagClass::Universal,
        universal::EXTERNAL,
        true,
        external_sequence,
    )
}

/// Decode an EMBEDDED PDV
///
/// The carried value always goes through OID dispatch on the direct
/// reference.
pub fn dissect_embedded_pdv_type(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<usize> {
    ctx.external = ExternalScratch::default();
    dissect_tagged_type(
        implicit_tag,
        tvb,
        offset,
        ctx,
        parent,
        field,
        BerTagClass::Universal,
        universal::EMBEDDED_PDV,
        true,
        external_sequence,
    )
}

fn external_syntax(ctx: &mut DecodeContext<'_>, tvb: Tvb<'_>, parent: Option<NodeId>) -> BerResult<usize> {
    dissect_external_type(false, tvb, 0, ctx, parent, Some(&EXTERNAL), None)
}

fn embedded_pdv_syntax(
    ctx: &mut DecodeContext<'_>,
    tvb: Tvb<'_>,
    parent: Option<NodeId>,
) -> BerResult<usize> {
    dissect_embedded_pdv_type(false, tvb, 0, ctx, parent, Some(&EMBEDDED_PDV))
}

/// Register the EXTERNAL and EMBEDDED PDV syntaxes
pub fn register_syntaxes(registry: &mut Registry) {
    registry.register_syntax_fn(EXTERNAL_SYNTAX, external_syntax);
    registry.register_syntax_fn(EMBEDDED_PDV_SYNTAX, embedded_pdv_syntax);
}
