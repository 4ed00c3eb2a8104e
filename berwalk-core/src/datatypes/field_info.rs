//! Static field registrations

use serde::Serialize;

/// Storage kind of a registered field
///
/// The kind drives interpretation: an INTEGER decoded into an `Int*` field is
/// sign-extended, into a `Uint*` field it is not, and an OCTET STRING decoded
/// into a `String` field is rendered as text instead of hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldKind {
    None,
    Boolean,
    Uint8,
    Uint16,
    Uint24,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int24,
    Int32,
    Int64,
    Double,
    Bytes,
    String,
    Oid,
    RelativeOid,
}

impl FieldKind {
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            FieldKind::Boolean
                | FieldKind::Uint8
                | FieldKind::Uint16
                | FieldKind::Uint24
                | FieldKind::Uint32
                | FieldKind::Uint64
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            FieldKind::Int8 | FieldKind::Int16 | FieldKind::Int24 | FieldKind::Int32 | FieldKind::Int64
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_unsigned() || self.is_signed()
    }

    /// Width in bits of an integer kind, `None` for everything else
    pub fn bit_width(self) -> Option<u32> {
        match self {
            FieldKind::Boolean => Some(1),
            FieldKind::Uint8 | FieldKind::Int8 => Some(8),
            FieldKind::Uint16 | FieldKind::Int16 => Some(16),
            FieldKind::Uint24 | FieldKind::Int24 => Some(24),
            FieldKind::Uint32 | FieldKind::Int32 => Some(32),
            FieldKind::Uint64 | FieldKind::Int64 => Some(64),
            _ => None,
        }
    }
}

/// A field a decoder can attach values to
///
/// Fields are declared as `static` items by whoever writes a schema and are
/// referenced from schema tables by address.
///
/// ```
/// use berwalk_core::{FieldInfo, FieldKind};
///
/// static INVOKE_ID: FieldInfo = FieldInfo::new("invokeID", "rose.invokeID", FieldKind::Int32);
/// assert!(INVOKE_ID.kind.is_signed());
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Serialize)]
pub struct FieldInfo {
    /// Human readable name
    pub name: &'static str,
    /// Dotted filter name
    pub abbrev: &'static str,
    pub kind: FieldKind,
}

impl FieldInfo {
    pub const fn new(name: &'static str, abbrev: &'static str, kind: FieldKind) -> Self {
        Self { name, abbrev, kind }
    }
}

/// Reference to a static field registration
pub type FieldRef = &'static FieldInfo;
