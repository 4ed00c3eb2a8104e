//! Fields the engine itself attaches values to
//!
//! Schema-driven decoders report into the caller's fields. These are used for
//! header internals, the generic unknown-BER walker and reassembly bookkeeping.

use berwalk_core::{FieldInfo, FieldKind};

pub static ID_CLASS: FieldInfo = FieldInfo::new("Class", "ber.id.class", FieldKind::Uint8);
pub static ID_PC: FieldInfo = FieldInfo::new("P/C", "ber.id.pc", FieldKind::Boolean);
pub static ID_UNI_TAG: FieldInfo = FieldInfo::new("Tag", "ber.id.uni_tag", FieldKind::Uint8);
pub static ID_TAG: FieldInfo = FieldInfo::new("Tag", "ber.id.tag", FieldKind::Uint32);
pub static LENGTH: FieldInfo = FieldInfo::new("Length", "ber.length", FieldKind::Uint32);
pub static EOC: FieldInfo = FieldInfo::new("EOC", "ber.eoc", FieldKind::None);
pub static FIELD_EOC: FieldInfo = FieldInfo::new("Field EOC", "ber.field_eoc", FieldKind::None);

pub static BITSTRING_PADDING: FieldInfo =
    FieldInfo::new("Padding", "ber.bitstring.padding", FieldKind::Uint8);
pub static BITSTRING_EMPTY: FieldInfo =
    FieldInfo::new("Empty", "ber.bitstring.empty", FieldKind::Uint8);

pub static INTEGER_AS_BYTES: FieldInfo =
    FieldInfo::new("64bits", "ber.64bit_uint_as_bytes", FieldKind::Bytes);

pub static UNKNOWN_BOOLEAN: FieldInfo =
    FieldInfo::new("BOOLEAN", "ber.unknown.BOOLEAN", FieldKind::Boolean);
pub static UNKNOWN_INTEGER: FieldInfo =
    FieldInfo::new("INTEGER", "ber.unknown.INTEGER", FieldKind::Int64);
pub static UNKNOWN_ENUMERATED: FieldInfo =
    FieldInfo::new("ENUMERATED", "ber.unknown.ENUMERATED", FieldKind::Int64);
pub static UNKNOWN_BITSTRING: FieldInfo =
    FieldInfo::new("BITSTRING", "ber.unknown.BITSTRING", FieldKind::Bytes);
pub static UNKNOWN_OCTETSTRING: FieldInfo =
    FieldInfo::new("OCTETSTRING", "ber.unknown.OCTETSTRING", FieldKind::Bytes);
pub static UNKNOWN_BER_OCTETSTRING: FieldInfo =
    FieldInfo::new("OCTETSTRING [BER encoded]", "ber.unknown.BER_OCTETSTRING", FieldKind::None);
pub static UNKNOWN_BER_PRIMITIVE: FieldInfo =
    FieldInfo::new("Primitive [BER encoded]", "ber.unknown.BER_primitive", FieldKind::None);
pub static UNKNOWN_NULL: FieldInfo = FieldInfo::new("NULL", "ber.unknown.NULL", FieldKind::None);
pub static UNKNOWN_OID: FieldInfo = FieldInfo::new("OID", "ber.unknown.OID", FieldKind::Oid);
pub static UNKNOWN_RELATIVE_OID: FieldInfo =
    FieldInfo::new("RELATIVE_OID", "ber.unknown.relative_OID", FieldKind::RelativeOid);
pub static UNKNOWN_REAL: FieldInfo = FieldInfo::new("REAL", "ber.unknown.REAL", FieldKind::Double);
pub static UNKNOWN_OBJECT_DESCRIPTOR: FieldInfo =
    FieldInfo::new("ObjectDescriptor", "ber.unknown.ObjectDescriptor", FieldKind::String);
pub static UNKNOWN_UTF8_STRING: FieldInfo =
    FieldInfo::new("UTF8String", "ber.unknown.UTF8String", FieldKind::String);
pub static UNKNOWN_NUMERIC_STRING: FieldInfo =
    FieldInfo::new("NumericString", "ber.unknown.NumericString", FieldKind::String);
pub static UNKNOWN_PRINTABLE_STRING: FieldInfo =
    FieldInfo::new("PrintableString", "ber.unknown.PrintableString", FieldKind::String);
pub static UNKNOWN_TELETEX_STRING: FieldInfo =
    FieldInfo::new("TeletexString", "ber.unknown.TeletexString", FieldKind::String);
pub static UNKNOWN_VIDEOTEX_STRING: FieldInfo =
    FieldInfo::new("VideotexString", "ber.unknown.VideotexString", FieldKind::String);
pub static UNKNOWN_IA5_STRING: FieldInfo =
    FieldInfo::new("IA5String", "ber.unknown.IA5String", FieldKind::String);
pub static UNKNOWN_UTC_TIME: FieldInfo =
    FieldInfo::new("UTCTime", "ber.unknown.UTCTime", FieldKind::String);
pub static UNKNOWN_GENERALIZED_TIME: FieldInfo =
    FieldInfo::new("GeneralizedTime", "ber.unknown.GeneralizedTime", FieldKind::String);
pub static UNKNOWN_GRAPHIC_STRING: FieldInfo =
    FieldInfo::new("GraphicString", "ber.unknown.GraphicString", FieldKind::String);
pub static UNKNOWN_VISIBLE_STRING: FieldInfo =
    FieldInfo::new("VisibleString", "ber.unknown.VisibleString", FieldKind::String);
pub static UNKNOWN_GENERAL_STRING: FieldInfo =
    FieldInfo::new("GeneralString", "ber.unknown.GeneralString", FieldKind::String);
pub static UNKNOWN_UNIVERSAL_STRING: FieldInfo =
    FieldInfo::new("UniversalString", "ber.unknown.UniversalString", FieldKind::String);
pub static UNKNOWN_BMP_STRING: FieldInfo =
    FieldInfo::new("BMPString", "ber.unknown.BMPString", FieldKind::String);
pub static UNKNOWN_DATA: FieldInfo = FieldInfo::new("Unknown Data", "ber.unknown.data", FieldKind::Bytes);

pub static OCTET_STRING_FRAGMENTS: FieldInfo =
    FieldInfo::new("OCTET STRING fragments", "ber.octet_string.fragments", FieldKind::None);
pub static OCTET_STRING_FRAGMENT: FieldInfo =
    FieldInfo::new("OCTET STRING fragment", "ber.octet_string.fragment", FieldKind::Uint32);
pub static OCTET_STRING_REASSEMBLED_LENGTH: FieldInfo = FieldInfo::new(
    "Reassembled OCTET STRING length",
    "ber.octet_string.reassembled.length",
    FieldKind::Uint32,
);
