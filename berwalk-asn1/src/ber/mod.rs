//! BER (Basic Encoding Rules) decoding engine for ASN.1
//!
//! Decodes X.690 BER, and therefore CER and DER, into a [`FieldTree`] plus a
//! list of diagnostics. Protocols describe their productions as static
//! schema tables and register handlers for the OIDs and syntaxes they
//! implement; anything without a schema can still be walked generically.
//!
//! # ASN.1 BER Encoding Overview
//!
//! Each ASN.1 value is encoded as a TLV (Tag-Length-Value) triplet:
//!
//! ```text
//! [Identifier] [Length] [Contents]
//! ```
//!
//! ## Identifier
//!
//! ```text
//! Bits: 8 7 6 5 4 3 2 1
//!       C C P T T T T T
//! ```
//! - CC = Class (00=Universal, 01=Application, 10=Context, 11=Private)
//! - P = Primitive (0) or Constructed (1)
//! - TTTTT = Tag number (0-30), or 11111 followed by base-128 octets
//!
//! ## Length
//!
//! - **Short form**: one octet, 0-127
//! - **Long form**: `0x80 | n` followed by `n` big-endian octets
//! - **Indefinite form**: `0x80`, contents closed by an end-of-contents
//!   marker `00 00`; constructed values only
//!
//! # Module Layout
//!
//! - [`reader`]: identifier and length octets, indefinite-length lookahead
//! - [`scalar`]: primitive types (INTEGER, BOOLEAN, REAL, strings, times, ...)
//! - [`constructed`]: SEQUENCE, SET, SEQUENCE OF / SET OF, CHOICE, tagged types
//! - [`reassembly`]: constructed OCTET STRING fragments
//! - [`registry`] and [`dispatch`]: OID- and syntax-keyed handlers
//! - [`unknown`]: schema-less walker
//! - [`decoder`]: top-level entry points catching structural errors
//! - [`encoder`]: TLV builder for fixtures
//!
//! # Error Handling
//!
//! Structural failures (reads past the buffer, runaway nesting, offsets that
//! stop advancing) are `Err(BerError)` and unwind to [`BerDecoder`]. All
//! other anomalies are recorded as diagnostics in the [`DecodeContext`] and
//! decoding carries on.
//!
//! [`FieldTree`]: berwalk_core::FieldTree

pub mod constructed;
pub mod context;
pub mod decoder;
pub mod dispatch;
pub mod encoder;
pub mod fields;
pub mod reader;
pub mod reassembly;
pub mod registry;
pub mod scalar;
pub mod schema;
pub mod types;
pub mod unknown;

pub use constructed::{
    dissect_choice, dissect_constrained_sequence_of, dissect_constrained_set_of, dissect_sequence,
    dissect_sequence_of, dissect_set, dissect_set_of, dissect_tagged_type, MAX_SET_ELEMENTS,
};
pub use context::{DecodeContext, ExternalEncoding, ExternalScratch, MAX_NESTING};
pub use decoder::{BerDecoder, Decoded};
pub use dispatch::{call_oid_callback, call_syntax_callback};
pub use encoder::BerEncoder;
pub use reader::{dissect_header, peek_header, read_header, read_identifier, read_length};
pub use registry::{ConsumeAll, HandlerFn, OidHandler, Registry};
pub use scalar::{
    decode_real, decode_text, dissect_bitstring, dissect_boolean, dissect_constrained_bitstring,
    dissect_constrained_integer, dissect_constrained_octet_string,
    dissect_constrained_restricted_string, dissect_generalized_time, dissect_integer, dissect_null,
    dissect_object_identifier, dissect_object_identifier_str, dissect_octet_string,
    dissect_octet_string_with_callback, dissect_real, dissect_relative_oid,
    dissect_relative_oid_str, dissect_restricted_string, dissect_utc_time, format_generalized_time,
    format_utc_time,
};
pub use schema::{Bounds, ChoiceAlternative, FieldDecoder, FieldDescriptor, FieldFlags, NamedBit, TagSpec};
pub use types::{universal, BerLength, BerTag, BerTagClass, TlvHeader};
pub use unknown::dissect_unknown_ber;
