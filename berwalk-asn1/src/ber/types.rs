//! BER identifier and length types

use berwalk_core::Tvb;

/// Class of an identifier, the top two bits of its first octet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BerTagClass {
    Universal = 0,
    Application = 1,
    ContextSpecific = 2,
    Private = 3,
}

impl BerTagClass {
    /// Class of the identifier octet `bits`
    pub fn from_bits(bits: u8) -> Self {
        match (bits >> 6) & 0x03 {
            0 => BerTagClass::Universal,
            1 => BerTagClass::Application,
            2 => BerTagClass::ContextSpecific,
            _ => BerTagClass::Private,
        }
    }

    /// Class bits in identifier position
    pub fn to_bits(self) -> u8 {
        (self as u8) << 6
    }

    /// Name used in labels and diagnostics
    pub fn name(self) -> &'static str {
        match self {
            BerTagClass::Universal => "UNIVERSAL",
            BerTagClass::Application => "APPLICATION",
            BerTagClass::ContextSpecific => "CONTEXT",
            BerTagClass::Private => "PRIVATE",
        }
    }
}

/// Identifier octets of a TLV: class, primitive/constructed and tag number
///
/// Numbers above 30 use the high-tag-number form: the low five bits of the
/// first octet are all set and the number follows in base-128 octets, the
/// high bit marking continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BerTag {
    class: BerTagClass,
    constructed: bool,
    number: u32,
}

impl BerTag {
    pub fn new(class: BerTagClass, constructed: bool, number: u32) -> Self {
        Self {
            class,
            constructed,
            number,
        }
    }

    pub fn universal(constructed: bool, number: u32) -> Self {
        Self::new(BerTagClass::Universal, constructed, number)
    }

    pub fn application(constructed: bool, number: u32) -> Self {
        Self::new(BerTagClass::Application, constructed, number)
    }

    pub fn context_specific(constructed: bool, number: u32) -> Self {
        Self::new(BerTagClass::ContextSpecific, constructed, number)
    }

    pub fn private(constructed: bool, number: u32) -> Self {
        Self::new(BerTagClass::Private, constructed, number)
    }

    pub fn class(&self) -> BerTagClass {
        self.class
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Whether this is the given UNIVERSAL tag, in either form
    pub fn is_universal(&self, number: u32) -> bool {
        self.class == BerTagClass::Universal && self.number == number
    }

    /// Encode tag to bytes
    ///
    /// Tag numbers up to 30 use the single-octet form, larger ones the
    /// extended form with base-128 continuation octets.
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::new();

        let class_bits = self.class.to_bits();
        let constructed_bit = if self.constructed { 0x20 } else { 0x00 };

        if self.number <= 30 {
            result.push(class_bits | constructed_bit | (self.number as u8 & 0x1F));
        } else {
            result.push(class_bits | constructed_bit | 0x1F);

            let mut remaining = self.number;
            let mut groups = Vec::new();
            while remaining > 0 {
                groups.push((remaining & 0x7F) as u8);
                remaining >>= 7;
            }

            for (i, &group) in groups.iter().rev().enumerate() {
                if i < groups.len() - 1 {
                    result.push(group | 0x80);
                } else {
                    result.push(group);
                }
            }
        }

        result
    }
}

/// BER Length encoding
///
/// - **Definite**: short form for 0-127, long form (length-of-length octet
///   followed by big-endian octets) above that
/// - **Indefinite**: the single octet `0x80`; the content is closed by an
///   end-of-contents marker `00 00`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BerLength {
    Definite(usize),
    Indefinite,
}

impl BerLength {
    /// Encode length to bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            BerLength::Indefinite => vec![0x80],
            BerLength::Definite(length) if length < 128 => vec![length as u8],
            BerLength::Definite(length) => {
                let mut num_bytes = 0;
                let mut temp = length;
                while temp > 0 {
                    num_bytes += 1;
                    temp >>= 8;
                }

                let mut result = vec![0x80 | (num_bytes as u8)];
                for i in (0..num_bytes).rev() {
                    result.push(((length >> (i * 8)) & 0xFF) as u8);
                }
                result
            }
        }
    }
}

/// UNIVERSAL tag numbers (X.680 clause 8.4)
pub mod universal {
    pub const EOC: u32 = 0;
    pub const BOOLEAN: u32 = 1;
    pub const INTEGER: u32 = 2;
    pub const BIT_STRING: u32 = 3;
    pub const OCTET_STRING: u32 = 4;
    pub const NULL: u32 = 5;
    pub const OBJECT_IDENTIFIER: u32 = 6;
    pub const OBJECT_DESCRIPTOR: u32 = 7;
    pub const EXTERNAL: u32 = 8;
    pub const REAL: u32 = 9;
    pub const ENUMERATED: u32 = 10;
    pub const EMBEDDED_PDV: u32 = 11;
    pub const UTF8_STRING: u32 = 12;
    pub const RELATIVE_OID: u32 = 13;
    pub const SEQUENCE: u32 = 16;
    pub const SET: u32 = 17;
    pub const NUMERIC_STRING: u32 = 18;
    pub const PRINTABLE_STRING: u32 = 19;
    pub const TELETEX_STRING: u32 = 20;
    pub const VIDEOTEX_STRING: u32 = 21;
    pub const IA5_STRING: u32 = 22;
    pub const UTC_TIME: u32 = 23;
    pub const GENERALIZED_TIME: u32 = 24;
    pub const GRAPHIC_STRING: u32 = 25;
    pub const VISIBLE_STRING: u32 = 26;
    pub const GENERAL_STRING: u32 = 27;
    pub const UNIVERSAL_STRING: u32 = 28;
    pub const CHARACTER_STRING: u32 = 29;
    pub const BMP_STRING: u32 = 30;

    /// Display name of a UNIVERSAL tag
    pub fn name(tag: u32) -> Option<&'static str> {
        let name = match tag {
            EOC => "EOC",
            BOOLEAN => "BOOLEAN",
            INTEGER => "INTEGER",
            BIT_STRING => "BIT STRING",
            OCTET_STRING => "OCTET STRING",
            NULL => "NULL",
            OBJECT_IDENTIFIER => "OBJECT IDENTIFIER",
            OBJECT_DESCRIPTOR => "ObjectDescriptor",
            EXTERNAL => "EXTERNAL",
            REAL => "REAL",
            ENUMERATED => "ENUMERATED",
            EMBEDDED_PDV => "EMBEDDED PDV",
            UTF8_STRING => "UTF8String",
            RELATIVE_OID => "RELATIVE-OID",
            14 | 15 => "Reserved for future use",
            SEQUENCE => "SEQUENCE",
            SET => "SET",
            NUMERIC_STRING => "NumericString",
            PRINTABLE_STRING => "PrintableString",
            TELETEX_STRING => "TeletexString, T61String",
            VIDEOTEX_STRING => "VideotexString",
            IA5_STRING => "IA5String",
            UTC_TIME => "UTCTime",
            GENERALIZED_TIME => "GeneralizedTime",
            GRAPHIC_STRING => "GraphicString",
            VISIBLE_STRING => "VisibleString, ISO64String",
            GENERAL_STRING => "GeneralString",
            UNIVERSAL_STRING => "UniversalString",
            CHARACTER_STRING => "CHARACTER STRING",
            BMP_STRING => "BMPString",
            _ => return None,
        };
        Some(name)
    }
}

/// Identifier and length of one TLV, as read at `offset` of some view
///
/// `length` is the effective content length. For an indefinite encoding it
/// includes the trailing end-of-contents marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvHeader {
    pub tag: BerTag,
    pub length: usize,
    pub indefinite: bool,
    /// Offset of the identifier octet
    pub offset: usize,
    /// Octets taken by identifier and length
    pub header_len: usize,
}

impl TlvHeader {
    pub fn class(&self) -> BerTagClass {
        self.tag.class()
    }

    pub fn is_constructed(&self) -> bool {
        self.tag.is_constructed()
    }

    pub fn number(&self) -> u32 {
        self.tag.number()
    }

    /// First content octet
    pub fn content_offset(&self) -> usize {
        self.offset + self.header_len
    }

    /// First octet after the value, end-of-contents included
    pub fn end_offset(&self) -> usize {
        self.content_offset() + self.length
    }

    /// Content length without the end-of-contents marker
    pub fn content_len(&self) -> usize {
        if self.indefinite {
            self.length.saturating_sub(2)
        } else {
            self.length
        }
    }

    /// Whether the value fits in `tvb`
    pub fn fits(&self, tvb: &Tvb<'_>) -> bool {
        self.end_offset() <= tvb.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ber_tag_short_form() {
        let tag = BerTag::universal(false, 2);
        assert_eq!(tag.encode(), vec![0x02]);
    }

    #[test]
    fn test_ber_tag_constructed() {
        let tag = BerTag::application(true, 0);
        assert_eq!(tag.encode(), vec![0x60]);
    }

    #[test]
    fn test_ber_tag_extended_form() {
        let tag = BerTag::context_specific(false, 201);
        assert_eq!(tag.encode(), vec![0x9F, 0x81, 0x49]);
    }

    #[test]
    fn test_ber_length_forms() {
        assert_eq!(BerLength::Definite(100).encode(), vec![100]);
        assert_eq!(BerLength::Definite(1000).encode(), vec![0x82, 0x03, 0xE8]);
        assert_eq!(BerLength::Indefinite.encode(), vec![0x80]);
    }

    #[test]
    fn test_universal_names() {
        assert_eq!(universal::name(universal::SEQUENCE), Some("SEQUENCE"));
        assert_eq!(universal::name(universal::BMP_STRING), Some("BMPString"));
        assert_eq!(universal::name(31), None);
    }

    #[test]
    fn test_header_offsets() {
        let header = TlvHeader {
            tag: BerTag::universal(true, universal::SEQUENCE),
            length: 7,
            indefinite: true,
            offset: 3,
            header_len: 2,
        };
        assert_eq!(header.content_offset(), 5);
        assert_eq!(header.end_offset(), 12);
        assert_eq!(header.content_len(), 5);
    }
}
