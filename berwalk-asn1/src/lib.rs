//! Schema-driven ASN.1 BER/CER/DER decoding engine
//!
//! The [`ber`] module decodes BER into a field tree: primitive values,
//! SEQUENCE/SET/CHOICE productions described by static schema tables,
//! constructed OCTET STRING reassembly, and OID- or syntax-keyed dispatch
//! into registered handlers. The [`external`] module builds the EXTERNAL and
//! EMBEDDED PDV productions on top of it.
//!
//! # Usage
//!
//! ```rust
//! use berwalk_asn1::ber::{BerDecoder, BerEncoder, Registry};
//!
//! let mut encoder = BerEncoder::new();
//! encoder.encode_object_identifier("2.5.4.3").unwrap();
//!
//! let mut registry = Registry::new();
//! registry.register_oid_name("2.5.4.3", "id-at-commonName").unwrap();
//!
//! let decoded = BerDecoder::new(&registry).decode(encoder.as_bytes());
//! assert!(decoded.tree.render().contains("2.5.4.3 (id-at-commonName)"));
//! ```

pub mod ber;
pub mod external;

pub use ber::{
    BerDecoder, BerEncoder, BerLength, BerTag, BerTagClass, ChoiceAlternative, DecodeContext,
    Decoded, FieldDecoder, FieldDescriptor, FieldFlags, Registry, TlvHeader,
};
pub use external::{dissect_embedded_pdv_type, dissect_external_type};
