//! Diagnostics collected while decoding
//!
//! A decode never fails because of a local anomaly. Wrong tags, missing
//! fields, out-of-range values and the like are recorded here and returned
//! next to the tree, each pointing at the node it concerns.

use crate::tree::NodeId;
use serde::Serialize;
use std::fmt;

/// Broad class of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    /// The buffer could not be decoded any further
    Malformed,
    /// The encoding does not fit the schema it was decoded with
    SchemaMismatch,
    /// A value was decoded but violates a declared constraint or format
    Constraint,
    /// No decoder is registered for the content
    Unimplemented,
    /// Legal but suspicious encoding
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Malformed => "malformed",
            Severity::SchemaMismatch => "schema",
            Severity::Constraint => "constraint",
            Severity::Unimplemented => "unimplemented",
            Severity::Warning => "warning",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// Structural failure that stopped the decode
    Malformed,
    /// The capture ended before the encoding did
    ShortFrame,
    /// Declared length does not fit the remaining bytes
    IllegalLength,
    /// Identifier does not match the type being decoded
    UnexpectedType,
    /// Mandatory SEQUENCE field absent or out of order
    WrongField,
    /// Element beyond the end of a SEQUENCE schema or not in a SET schema
    UnknownField,
    /// Mandatory SET field never seen
    MissingField,
    EmptyChoice,
    ChoiceNotFound,
    /// More than one SET field matches the same tag
    AmbiguousSetElement,
    /// Explicit wrapper of a tagged type does not match
    WrongTag,
    /// Constructed value's elements ran past its end
    ExcessBytes,
    NullLength,
    IntegerLength,
    IntegerTooManyBytes,
    BooleanLength,
    RealConstructed,
    RealInvalid,
    IllegalPadding,
    PaddingBitsSet,
    UnknownBits,
    ConstructedBitString,
    InvalidUtcTime,
    InvalidGeneralizedTime,
    InvalidOidEncoding,
    SizeConstraint,
    ValueConstraint,
    ItemCountConstraint,
    NoOid,
    NoSyntax,
    OidNotImplemented,
    SyntaxNotImplemented,
    UnknownUniversalTag,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        use DiagnosticKind::*;
        match self {
            Malformed | ShortFrame | IllegalLength => Severity::Malformed,
            UnexpectedType | WrongField | UnknownField | MissingField | EmptyChoice
            | ChoiceNotFound | AmbiguousSetElement | WrongTag | ExcessBytes => {
                Severity::SchemaMismatch
            }
            NullLength | IntegerLength | BooleanLength | RealConstructed | RealInvalid
            | IllegalPadding | PaddingBitsSet | UnknownBits | ConstructedBitString
            | InvalidUtcTime | InvalidGeneralizedTime | InvalidOidEncoding | SizeConstraint
            | ValueConstraint | ItemCountConstraint => Severity::Constraint,
            NoOid | NoSyntax | OidNotImplemented | SyntaxNotImplemented | UnknownUniversalTag => {
                Severity::Unimplemented
            }
            IntegerTooManyBytes => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Node the diagnostic is attached to, if one was created
    pub node: Option<NodeId>,
    /// Absolute offset of the offending bytes
    pub offset: usize,
    pub length: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, offset: usize, length: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            node: None,
            offset,
            length,
            message: message.into(),
        }
    }

    pub fn with_node(mut self, node: Option<NodeId>) -> Self {
        self.node = node;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (offset {}, {} bytes)",
            self.severity, self.message, self.offset, self.length
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_kind() {
        let d = Diagnostic::new(DiagnosticKind::MissingField, 4, 0, "Missing field in SET");
        assert_eq!(d.severity, Severity::SchemaMismatch);
        assert_eq!(
            Diagnostic::new(DiagnosticKind::IntegerTooManyBytes, 0, 3, "x").severity,
            Severity::Warning
        );
        assert_eq!(d.to_string(), "[schema] Missing field in SET (offset 4, 0 bytes)");
    }
}
