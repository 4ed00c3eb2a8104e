//! Typed values carried by field tree nodes

use serde::Serialize;
use std::fmt;

/// Value decoded into a field node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Structural node without a value of its own
    None,
    Boolean(bool),
    Unsigned(u64),
    Signed(i64),
    Double(f64),
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    String(String),
    /// Dotted object identifier
    Oid(String),
    /// Dotted relative object identifier
    RelativeOid(String),
}

impl FieldValue {
    pub fn is_none(&self) -> bool {
        matches!(self, FieldValue::None)
    }

    /// Right-hand side of a `field == value` filter expression
    ///
    /// # Returns
    /// `None` for value-less nodes, which are matched by presence alone.
    pub fn filter_literal(&self) -> Option<String> {
        match self {
            FieldValue::None => None,
            FieldValue::Boolean(b) => Some(if *b { "True" } else { "False" }.to_string()),
            FieldValue::Unsigned(v) => Some(v.to_string()),
            FieldValue::Signed(v) => Some(v.to_string()),
            FieldValue::Double(v) => Some(v.to_string()),
            FieldValue::Bytes(b) => Some(colon_hex(b)),
            FieldValue::String(s) => Some(quote(s)),
            FieldValue::Oid(s) | FieldValue::RelativeOid(s) => Some(s.clone()),
        }
    }

    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            FieldValue::Unsigned(v) => Some(*v),
            FieldValue::Signed(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_signed(&self) -> Option<i64> {
        match self {
            FieldValue::Signed(v) => Some(*v),
            FieldValue::Unsigned(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) | FieldValue::Oid(s) | FieldValue::RelativeOid(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::None => Ok(()),
            FieldValue::Boolean(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            FieldValue::Unsigned(v) => write!(f, "{}", v),
            FieldValue::Signed(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            FieldValue::String(s) | FieldValue::Oid(s) | FieldValue::RelativeOid(s) => {
                f.write_str(s)
            }
        }
    }
}

fn colon_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_literals() {
        assert_eq!(FieldValue::None.filter_literal(), None);
        assert_eq!(FieldValue::Signed(-5).filter_literal().unwrap(), "-5");
        assert_eq!(
            FieldValue::Bytes(vec![0xde, 0xad, 0x01]).filter_literal().unwrap(),
            "de:ad:01"
        );
        assert_eq!(
            FieldValue::String("a\"b".to_string()).filter_literal().unwrap(),
            "\"a\\\"b\""
        );
        assert_eq!(
            FieldValue::Oid("2.5.4.3".to_string()).filter_literal().unwrap(),
            "2.5.4.3"
        );
    }

    #[test]
    fn test_display_bytes_as_hex() {
        assert_eq!(FieldValue::Bytes(vec![0x0a, 0xff]).to_string(), "0aff");
        assert_eq!(FieldValue::Boolean(true).to_string(), "True");
    }
}
