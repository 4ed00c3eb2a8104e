//! BER encoder
//!
//! Builds definite and indefinite TLVs. Used to produce test fixtures and
//! indefinite-length re-encodings of definite values.
//!
//! # Usage Example
//!
//! ```rust
//! use berwalk_asn1::ber::BerEncoder;
//!
//! let mut inner = BerEncoder::new();
//! inner.encode_integer(5).unwrap();
//! inner.encode_boolean(true).unwrap();
//!
//! let mut encoder = BerEncoder::new();
//! encoder.encode_sequence(inner.as_bytes()).unwrap();
//! assert_eq!(encoder.into_bytes(), vec![0x30, 0x06, 0x02, 0x01, 0x05, 0x01, 0x01, 0xFF]);
//! ```

use berwalk_core::{BerResult, ObjectIdentifier};

use super::types::{universal, BerLength, BerTag};

/// BER encoder accumulating TLVs into one buffer
///
/// Every value is appended after the previous one; constructed values take
/// their already encoded elements as bytes.
pub struct BerEncoder {
    buffer: Vec<u8>,
}

impl BerEncoder {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encode a definite-length TLV
    pub fn encode_tlv(&mut self, tag: &BerTag, value: &[u8]) -> BerResult<()> {
        self.buffer.extend_from_slice(&tag.encode());
        self.buffer
            .extend_from_slice(&BerLength::Definite(value.len()).encode());
        self.buffer.extend_from_slice(value);
        Ok(())
    }

    /// Encode a constructed value in the indefinite form
    ///
    /// Writes the identifier, the `0x80` length octet, `elements` and the
    /// closing end-of-contents marker.
    pub fn encode_indefinite(&mut self, tag: &BerTag, elements: &[u8]) -> BerResult<()> {
        let tag = BerTag::new(tag.class(), true, tag.number());
        self.buffer.extend_from_slice(&tag.encode());
        self.buffer.extend_from_slice(&BerLength::Indefinite.encode());
        self.buffer.extend_from_slice(elements);
        self.buffer.extend_from_slice(&[0x00, 0x00]);
        Ok(())
    }

    /// Encode an INTEGER in minimal two's complement
    pub fn encode_integer(&mut self, value: i64) -> BerResult<()> {
        self.encode_tlv(
            &BerTag::universal(false, universal::INTEGER),
            &integer_content(value),
        )
    }

    /// Encode a BOOLEAN, `true` as `0xFF`
    pub fn encode_boolean(&mut self, value: bool) -> BerResult<()> {
        self.encode_tlv(
            &BerTag::universal(false, universal::BOOLEAN),
            &[if value { 0xFF } else { 0x00 }],
        )
    }

    pub fn encode_null(&mut self) -> BerResult<()> {
        self.encode_tlv(&BerTag::universal(false, universal::NULL), &[])
    }

    pub fn encode_octet_string(&mut self, value: &[u8]) -> BerResult<()> {
        self.encode_tlv(&BerTag::universal(false, universal::OCTET_STRING), value)
    }

    /// Encode a BIT STRING with `unused_bits` padding bits in the last octet
    ///
    /// Only the low three bits of `unused_bits` are used.
    pub fn encode_bit_string(&mut self, value: &[u8], unused_bits: u8) -> BerResult<()> {
        let mut content = Vec::with_capacity(value.len() + 1);
        content.push(unused_bits & 0x07);
        content.extend_from_slice(value);
        self.encode_tlv(&BerTag::universal(false, universal::BIT_STRING), &content)
    }

    /// Encode an OBJECT IDENTIFIER given in dotted form
    ///
    /// # Errors
    /// `InvalidOid` when `oid` is not a dotted object identifier.
    pub fn encode_object_identifier(&mut self, oid: &str) -> BerResult<()> {
        let oid = ObjectIdentifier::parse(oid)?;
        self.encode_tlv(
            &BerTag::universal(false, universal::OBJECT_IDENTIFIER),
            &oid.to_ber()?,
        )
    }

    pub fn encode_sequence(&mut self, elements: &[u8]) -> BerResult<()> {
        self.encode_tlv(&BerTag::universal(true, universal::SEQUENCE), elements)
    }

    pub fn encode_set(&mut self, elements: &[u8]) -> BerResult<()> {
        self.encode_tlv(&BerTag::universal(true, universal::SET), elements)
    }

    /// Encode a context-specific TLV, `[n]` in a schema
    pub fn encode_context_specific(
        &mut self,
        tag_number: u32,
        value: &[u8],
        constructed: bool,
    ) -> BerResult<()> {
        self.encode_tlv(&BerTag::context_specific(constructed, tag_number), value)
    }

    pub fn encode_application(
        &mut self,
        tag_number: u32,
        value: &[u8],
        constructed: bool,
    ) -> BerResult<()> {
        self.encode_tlv(&BerTag::application(constructed, tag_number), value)
    }

    /// Append bytes that are already encoded
    pub fn encode_raw(&mut self, bytes: &[u8]) -> BerResult<()> {
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for BerEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal two's-complement content octets of `value`
pub fn integer_content(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    // A leading octet is redundant when it only repeats the sign of the next.
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}
