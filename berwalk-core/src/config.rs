//! Decoder configuration

use serde::{Deserialize, Serialize};

/// Toggles that change how the engine renders what it decodes
///
/// Every flag defaults to off. Missing keys in a serialized configuration
/// take their default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Emit nodes for the identifier and length octets themselves
    pub show_internal_fields: bool,
    /// Try to decode OCTET STRING content as nested BER
    pub decode_octetstring_as_ber: bool,
    /// Try to decode unrecognized primitive content as nested BER
    pub decode_primitive_as_ber: bool,
    /// Walk content that has no registered handler as generic BER
    pub decode_unexpected: bool,
    /// Warn about INTEGER encodings longer than necessary
    pub warn_on_excess_integer_bytes: bool,
    /// Syntax applied to a whole buffer by the top-level decoder
    pub decode_as_syntax: Option<String>,
}

impl DecodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_internal_fields(mut self, on: bool) -> Self {
        self.show_internal_fields = on;
        self
    }

    pub fn with_octetstring_as_ber(mut self, on: bool) -> Self {
        self.decode_octetstring_as_ber = on;
        self
    }

    pub fn with_primitive_as_ber(mut self, on: bool) -> Self {
        self.decode_primitive_as_ber = on;
        self
    }

    pub fn with_decode_unexpected(mut self, on: bool) -> Self {
        self.decode_unexpected = on;
        self
    }

    pub fn with_excess_integer_warning(mut self, on: bool) -> Self {
        self.warn_on_excess_integer_bytes = on;
        self
    }

    pub fn with_syntax(mut self, syntax: impl Into<String>) -> Self {
        self.decode_as_syntax = Some(syntax.into());
        self
    }
}
