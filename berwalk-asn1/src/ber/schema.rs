//! Declarative schema elements
//!
//! A protocol describes its ASN.1 productions as static tables of
//! [`FieldDescriptor`]s (SEQUENCE, SET, SEQUENCE OF) or
//! [`ChoiceAlternative`]s (CHOICE), each naming the tag it expects and the
//! decoder to run on a match.

use berwalk_core::{BerResult, FieldRef, NodeId, Tvb};
use std::ops::BitOr;

use super::context::DecodeContext;
use super::types::BerTagClass;

/// Decoder invoked for one schema element
///
/// # Arguments
/// * `implicit_tag` - The caller already consumed the identifier and length;
///   the view holds only the content
/// * `tvb` / `offset` - Where the element starts
/// * `ctx` - Per-call decode state
/// * `parent` - Node to attach results under
/// * `field` - Field to report the value into
///
/// # Returns
/// Offset just past what was consumed.
pub type FieldDecoder = fn(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
) -> BerResult<usize>;

/// Tagging flags of a schema element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FieldFlags(u8);

impl FieldFlags {
    pub const NONE: FieldFlags = FieldFlags(0);
    /// The element may be absent
    pub const OPTIONAL: FieldFlags = FieldFlags(0x01);
    /// The element's tag replaces the tag of its type
    pub const IMPLICIT_TAG: FieldFlags = FieldFlags(0x02);
    /// The element adds no tag of its own; its decoder reads the header
    pub const NO_OWN_TAG: FieldFlags = FieldFlags(0x04);
    /// Accept any tag
    pub const NO_CHECK_TAG: FieldFlags = FieldFlags(0x08);

    pub const fn union(self, other: FieldFlags) -> FieldFlags {
        FieldFlags(self.0 | other.0)
    }

    pub const fn contains(self, other: FieldFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_optional(self) -> bool {
        self.contains(Self::OPTIONAL)
    }

    pub fn is_implicit(self) -> bool {
        self.contains(Self::IMPLICIT_TAG)
    }

    pub fn has_own_tag(self) -> bool {
        !self.contains(Self::NO_OWN_TAG)
    }

    pub fn checks_tag(self) -> bool {
        !self.contains(Self::NO_CHECK_TAG)
    }
}

impl BitOr for FieldFlags {
    type Output = FieldFlags;

    fn bitor(self, rhs: FieldFlags) -> FieldFlags {
        self.union(rhs)
    }
}

/// Tag an element expects and how it is wrapped
///
/// `None` for class or tag means ANY.
pub trait TagSpec {
    fn class(&self) -> Option<BerTagClass>;
    fn tag(&self) -> Option<u32>;
    fn flags(&self) -> FieldFlags;
    fn decoder(&self) -> FieldDecoder;
    fn field(&self) -> Option<FieldRef>;
}

/// Element of a SEQUENCE, SET or SEQUENCE OF schema
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub field: Option<FieldRef>,
    pub class: Option<BerTagClass>,
    pub tag: Option<u32>,
    pub flags: FieldFlags,
    pub decoder: FieldDecoder,
}

impl FieldDescriptor {
    pub const fn new(
        field: Option<FieldRef>,
        class: Option<BerTagClass>,
        tag: Option<u32>,
        flags: FieldFlags,
        decoder: FieldDecoder,
    ) -> Self {
        Self {
            field,
            class,
            tag,
            flags,
            decoder,
        }
    }
}

impl TagSpec for FieldDescriptor {
    fn class(&self) -> Option<BerTagClass> {
        self.class
    }
    fn tag(&self) -> Option<u32> {
        self.tag
    }
    fn flags(&self) -> FieldFlags {
        self.flags
    }
    fn decoder(&self) -> FieldDecoder {
        self.decoder
    }
    fn field(&self) -> Option<FieldRef> {
        self.field
    }
}

/// Alternative of a CHOICE schema
///
/// `value` identifies the branch to the caller once decoded.
#[derive(Debug, Clone, Copy)]
pub struct ChoiceAlternative {
    pub value: u32,
    pub field: Option<FieldRef>,
    pub class: Option<BerTagClass>,
    pub tag: Option<u32>,
    pub flags: FieldFlags,
    pub decoder: FieldDecoder,
}

impl ChoiceAlternative {
    pub const fn new(
        value: u32,
        field: Option<FieldRef>,
        class: Option<BerTagClass>,
        tag: Option<u32>,
        flags: FieldFlags,
        decoder: FieldDecoder,
    ) -> Self {
        Self {
            value,
            field,
            class,
            tag,
            flags,
            decoder,
        }
    }
}

impl TagSpec for ChoiceAlternative {
    fn class(&self) -> Option<BerTagClass> {
        self.class
    }
    fn tag(&self) -> Option<u32> {
        self.tag
    }
    fn flags(&self) -> FieldFlags {
        self.flags
    }
    fn decoder(&self) -> FieldDecoder {
        self.decoder
    }
    fn field(&self) -> Option<FieldRef> {
        self.field
    }
}

/// Named bit of a BIT STRING
///
/// Bit 0 is the most significant bit of the first data octet.
#[derive(Debug, Clone, Copy)]
pub struct NamedBit {
    pub bit: u32,
    pub field: FieldRef,
    /// Appended to the summary when the bit is set
    pub set_text: Option<&'static str>,
    /// Appended to the summary when the bit is clear
    pub clear_text: Option<&'static str>,
}

/// Inclusive size or value range; `None` leaves a side open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Bounds {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// Where a value falls relative to its [`Bounds`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundCheck {
    Within,
    Below,
    Above,
}

impl Bounds {
    pub const NONE: Bounds = Bounds {
        min: None,
        max: None,
    };

    pub const fn new(min: i64, max: i64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub const fn at_least(min: i64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub const fn at_most(max: i64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Compare `value` against the bounds, widened so that unsigned 64-bit
    /// values above `i64::MAX` are not mistaken for negatives
    pub fn check(&self, value: impl Into<i128>) -> BoundCheck {
        let value = value.into();
        match (self.min, self.max) {
            (Some(min), _) if value < i128::from(min) => BoundCheck::Below,
            (_, Some(max)) if value > i128::from(max) => BoundCheck::Above,
            _ => BoundCheck::Within,
        }
    }

    /// Human readable range, e.g. `1..16` or `0..MAX`
    pub fn describe(&self) -> String {
        let side = |v: Option<i64>, open: &str| v.map_or(open.to_string(), |v| v.to_string());
        format!("{}..{}", side(self.min, "MIN"), side(self.max, "MAX"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let flags = FieldFlags::OPTIONAL | FieldFlags::IMPLICIT_TAG;
        assert!(flags.is_optional());
        assert!(flags.is_implicit());
        assert!(flags.has_own_tag());
        assert!(flags.checks_tag());
        assert!(!FieldFlags::NO_OWN_TAG.has_own_tag());
        assert_eq!(FieldFlags::default(), FieldFlags::NONE);
    }

    #[test]
    fn test_bounds() {
        let bounds = Bounds::new(1, 4);
        assert_eq!(bounds.check(0), BoundCheck::Below);
        assert_eq!(bounds.check(4), BoundCheck::Within);
        assert_eq!(bounds.check(5), BoundCheck::Above);
        assert_eq!(Bounds::at_least(0).check(u64::MAX), BoundCheck::Within);
        assert_eq!(Bounds::at_most(i64::MAX).check(u64::MAX), BoundCheck::Above);
        assert_eq!(Bounds::at_least(2).describe(), "2..MAX");
        assert!(Bounds::NONE.is_unbounded());
    }
}
