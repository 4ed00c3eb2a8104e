use crate::error::{BerError, BerResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static ABSOLUTE_OID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-2](\.(0|[1-9][0-9]*))+$").expect("valid regex"));
static RELATIVE_OID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0|[1-9][0-9]*)(\.(0|[1-9][0-9]*))*$").expect("valid regex"));

/// OBJECT IDENTIFIER or RELATIVE-OID value
///
/// Arcs are kept as they appear in dotted notation. For an absolute OID the
/// first two arcs share one encoded sub-identifier (`40 * a + b`); a relative
/// OID encodes every arc on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectIdentifier {
    arcs: Vec<u64>,
    relative: bool,
}

impl ObjectIdentifier {
    /// Decode the content octets of an OBJECT IDENTIFIER
    ///
    /// # Errors
    /// Returns `InvalidOid` if the content is empty, a sub-identifier is not
    /// terminated, or an arc does not fit in 64 bits.
    pub fn from_ber(content: &[u8]) -> BerResult<Self> {
        let subids = Self::sub_identifiers(content)?;
        let mut arcs = Vec::with_capacity(subids.len() + 1);
        let first = subids[0];
        let (a, b) = match first {
            0..=39 => (0, first),
            40..=79 => (1, first - 40),
            _ => (2, first - 80),
        };
        arcs.push(a);
        arcs.push(b);
        arcs.extend_from_slice(&subids[1..]);
        Ok(Self {
            arcs,
            relative: false,
        })
    }

    /// Decode the content octets of a RELATIVE-OID
    pub fn relative_from_ber(content: &[u8]) -> BerResult<Self> {
        Ok(Self {
            arcs: Self::sub_identifiers(content)?,
            relative: true,
        })
    }

    fn sub_identifiers(content: &[u8]) -> BerResult<Vec<u64>> {
        if content.is_empty() {
            return Err(BerError::InvalidOid("empty encoding".to_string()));
        }
        let mut subids = Vec::new();
        let mut value: u64 = 0;
        let mut pending = false;
        for &byte in content {
            if value > (u64::MAX >> 7) {
                return Err(BerError::InvalidOid("sub-identifier exceeds 64 bits".to_string()));
            }
            value = (value << 7) | u64::from(byte & 0x7F);
            pending = byte & 0x80 != 0;
            if !pending {
                subids.push(value);
                value = 0;
            }
        }
        if pending {
            return Err(BerError::InvalidOid("last sub-identifier is not terminated".to_string()));
        }
        Ok(subids)
    }

    /// Parse dotted notation, e.g. `"2.1.1"`
    pub fn parse(s: &str) -> BerResult<Self> {
        if !ABSOLUTE_OID.is_match(s) {
            return Err(BerError::InvalidOid(format!("'{}' is not a dotted object identifier", s)));
        }
        let arcs = Self::parse_arcs(s)?;
        if arcs[0] < 2 && arcs[1] >= 40 {
            return Err(BerError::InvalidOid(format!(
                "'{}': second arc must be below 40 under arc {}",
                s, arcs[0]
            )));
        }
        first_sub_identifier(arcs[0], arcs[1]).ok_or_else(|| {
            BerError::InvalidOid(format!("'{}': first sub-identifier exceeds 64 bits", s))
        })?;
        Ok(Self {
            arcs,
            relative: false,
        })
    }

    /// Parse dotted notation of a relative OID
    pub fn parse_relative(s: &str) -> BerResult<Self> {
        if !RELATIVE_OID.is_match(s) {
            return Err(BerError::InvalidOid(format!("'{}' is not a dotted relative OID", s)));
        }
        Ok(Self {
            arcs: Self::parse_arcs(s)?,
            relative: true,
        })
    }

    fn parse_arcs(s: &str) -> BerResult<Vec<u64>> {
        s.split('.')
            .map(|arc| {
                arc.parse::<u64>()
                    .map_err(|_| BerError::InvalidOid(format!("arc '{}' out of range", arc)))
            })
            .collect()
    }

    /// Whether `s` is a well-formed dotted absolute OID
    pub fn is_valid(s: &str) -> bool {
        Self::parse(s).is_ok()
    }

    pub fn arcs(&self) -> &[u64] {
        &self.arcs
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }

    /// Encode to content octets (no identifier or length)
    ///
    /// # Errors
    /// Returns `InvalidOid` if an absolute OID has no arcs or its first two
    /// arcs do not combine into a 64-bit sub-identifier.
    pub fn to_ber(&self) -> BerResult<Vec<u8>> {
        let mut out = Vec::new();
        let rest = if self.relative {
            &self.arcs[..]
        } else {
            let first = self
                .arcs
                .first()
                .and_then(|&a| first_sub_identifier(a, self.arcs.get(1).copied().unwrap_or(0)))
                .ok_or_else(|| BerError::InvalidOid(format!("'{}' cannot be encoded", self)))?;
            push_base128(&mut out, first);
            self.arcs.get(2..).unwrap_or(&[])
        };
        for &arc in rest {
            push_base128(&mut out, arc);
        }
        Ok(out)
    }
}

/// `40 * a + b`, or `None` on overflow
fn first_sub_identifier(a: u64, b: u64) -> Option<u64> {
    a.checked_mul(40)?.checked_add(b)
}

fn push_base128(out: &mut Vec<u8>, mut value: u64) {
    let mut groups = [0u8; 10];
    let mut n = 0;
    loop {
        groups[n] = (value & 0x7F) as u8;
        n += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        out.push(if i > 0 { groups[i] | 0x80 } else { groups[i] });
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arc) in self.arcs.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", arc)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_absolute() {
        // 1.2.840.113549
        let oid = ObjectIdentifier::from_ber(&[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D]).unwrap();
        assert_eq!(oid.to_string(), "1.2.840.113549");
        assert!(!oid.is_relative());
    }

    #[test]
    fn test_first_arc_two() {
        // 2.999.3
        let oid = ObjectIdentifier::from_ber(&[0x88, 0x37, 0x03]).unwrap();
        assert_eq!(oid.to_string(), "2.999.3");
    }

    #[test]
    fn test_relative_keeps_every_arc() {
        let oid = ObjectIdentifier::relative_from_ber(&[0x2A, 0x03]).unwrap();
        assert_eq!(oid.to_string(), "42.3");
    }

    #[test]
    fn test_unterminated_subidentifier() {
        assert!(ObjectIdentifier::from_ber(&[0x2A, 0x86]).is_err());
        assert!(ObjectIdentifier::from_ber(&[]).is_err());
    }

    #[test]
    fn test_parse_and_encode() {
        let oid = ObjectIdentifier::parse("2.1.1").unwrap();
        assert_eq!(oid.to_ber().unwrap(), vec![0x51, 0x01]);
        let oid = ObjectIdentifier::parse("1.2.840.113549").unwrap();
        assert_eq!(oid.to_ber().unwrap(), vec![0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D]);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(!ObjectIdentifier::is_valid("3.1"));
        assert!(!ObjectIdentifier::is_valid("1"));
        assert!(!ObjectIdentifier::is_valid("1..2"));
        assert!(!ObjectIdentifier::is_valid("0.40"));
        assert!(!ObjectIdentifier::is_valid("1.02"));
        assert!(ObjectIdentifier::is_valid("2.100.3"));
        assert!(ObjectIdentifier::parse_relative("5.6").is_ok());
    }

    #[test]
    fn test_first_sub_identifier_overflow() {
        assert!(matches!(
            ObjectIdentifier::parse("2.18446744073709551615"),
            Err(BerError::InvalidOid(_))
        ));
        let largest = format!("2.{}", u64::MAX - 80);
        let oid = ObjectIdentifier::parse(&largest).unwrap();
        let decoded = ObjectIdentifier::from_ber(&oid.to_ber().unwrap()).unwrap();
        assert_eq!(decoded.to_string(), largest);
    }
}
