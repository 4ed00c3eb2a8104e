//! berwalk - generic ASN.1 BER decoder
//!
//! Decodes BER, CER and DER encoded data into a tree of named fields and a
//! list of diagnostics, either generically or driven by static schema
//! tables.
//!
//! # Architecture
//!
//! - `berwalk-core`: byte views, field tree, values, diagnostics,
//!   configuration and the structural error type
//! - `berwalk-asn1`: the BER engine and the EXTERNAL / EMBEDDED PDV
//!   productions
//! - `berwalk`: this facade and the `berwalk` command-line dumper
//!
//! # Usage
//!
//! ```rust
//! use berwalk::{builtin_registry, BerDecoder};
//!
//! let registry = builtin_registry();
//! let decoded = BerDecoder::new(&registry).decode(&[0x06, 0x03, 0x55, 0x04, 0x03]);
//! assert!(decoded.tree.render().contains("2.5.4.3 (id-at-commonName)"));
//! ```

pub use berwalk_core::{
    BerError, BerResult, DecodeConfig, Diagnostic, DiagnosticKind, FieldInfo, FieldKind,
    FieldNode, FieldRef, FieldTree, FieldValue, NodeId, ObjectIdentifier, Severity, Tvb,
};

pub use berwalk_asn1::ber::{BerDecoder, BerEncoder, Decoded, DecodeContext, Registry};

/// The BER engine
pub mod ber {
    pub use berwalk_asn1::ber::*;
}

/// EXTERNAL and EMBEDDED PDV
pub mod external {
    pub use berwalk_asn1::external::*;
}

/// Well-known OIDs named by [`builtin_registry`]
const WELL_KNOWN_OIDS: &[(&str, &str)] = &[
    ("2.1", "asn1"),
    ("2.1.1", "basic-encoding"),
    ("2.1.2.0", "ber-derived"),
    ("2.1.2.1", "der-derived"),
    ("1.2.840.113549", "rsadsi"),
    ("1.2.840.113549.1.1.1", "rsaEncryption"),
    ("1.2.840.113549.1.1.11", "sha256WithRSAEncryption"),
    ("1.3.6.1", "internet"),
    ("2.5.4.3", "id-at-commonName"),
    ("2.5.4.6", "id-at-countryName"),
    ("2.5.4.10", "id-at-organizationName"),
];

/// Registry with the handlers and names this workspace ships
///
/// Registers the `EXTERNAL` and `EMBEDDED PDV` syntaxes and names a few
/// well-known OIDs.
pub fn builtin_registry() -> Registry {
    let mut registry = Registry::new();
    external::register_syntaxes(&mut registry);
    for (oid, name) in WELL_KNOWN_OIDS {
        if let Err(err) = registry.register_oid_name(oid, name) {
            log::warn!("Skipping built-in OID {}: {}", oid, err);
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = builtin_registry();
        assert_eq!(registry.syntax_names(), vec!["EMBEDDED PDV", "EXTERNAL"]);
        assert_eq!(registry.oid_name("1.2.840.113549"), Some("rsadsi"));
        assert_eq!(registry.oid_name("2.5.4.3"), Some("id-at-commonName"));
    }

    #[test]
    fn test_external_syntax_through_decoder() {
        let registry = builtin_registry();
        let config = DecodeConfig::default().with_syntax("EXTERNAL");
        let decoded = BerDecoder::with_config(&registry, config)
            .decode(&[0x28, 0x03, 0x81, 0x01, 0xAB]);
        assert!(decoded.tree.find_by_abbrev("ber.external").is_some());
        assert_eq!(decoded.offset, 5);
        assert!(decoded.diagnostics.is_empty());
    }
}
