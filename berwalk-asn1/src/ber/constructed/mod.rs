//! Schema-driven decoding of constructed values
//!
//! SEQUENCE walks its schema in order, SET matches each element against the
//! whole schema, SEQUENCE OF / SET OF apply one element descriptor to every
//! element, and CHOICE decodes exactly one element. All of them hand each
//! element to the descriptor's decoder through a view that holds only that
//! element: its content when the descriptor has its own tag (the header is
//! consumed here and left in [`DecodeContext::last_header`]), the whole TLV
//! otherwise.

pub mod choice;
pub mod sequence;
pub mod sequence_of;
pub mod set;
pub mod tagged;

pub use choice::dissect_choice;
pub use sequence::dissect_sequence;
pub use sequence_of::{
    dissect_constrained_sequence_of, dissect_constrained_set_of, dissect_sequence_of,
    dissect_set_of,
};
pub use set::{dissect_set, MAX_SET_ELEMENTS};
pub use tagged::dissect_tagged_type;

use berwalk_core::{BerError, BerResult, DiagnosticKind, FieldRef, FieldValue, NodeId, Tvb};

use super::context::DecodeContext;
use super::fields;
use super::reader::{dissect_header, peek_header, read_header};
use super::scalar::unexpected_type;
use super::schema::{FieldFlags, TagSpec};
use super::types::{universal, BerTagClass, TlvHeader};

/// Pass over a schema when matching an element's tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatchPass {
    /// Entries naming the element's class and tag
    Exact,
    /// Entries with neither class nor tag, typically untagged CHOICEs
    Wildcard,
}

/// Whether a SET or CHOICE schema entry takes an element on `pass`
pub(crate) fn offers<S: TagSpec>(spec: &S, header: &TlvHeader, pass: MatchPass) -> bool {
    match pass {
        MatchPass::Exact => {
            spec.class() == Some(header.class())
                && match spec.tag() {
                    Some(tag) => tag == header.number(),
                    // An untagged CHOICE restricted to one class.
                    None => !spec.flags().has_own_tag(),
                }
        }
        MatchPass::Wildcard => spec.class().is_none() && spec.tag().is_none(),
    }
}

/// Whether a decoder that consumed `count` bytes took the element
///
/// An exact tag match is accepted even when nothing was consumed, so empty
/// values are not offered to later entries.
pub(crate) fn accepts<S: TagSpec>(spec: &S, pass: MatchPass, count: usize) -> bool {
    count > 0 || (pass == MatchPass::Exact && spec.tag().is_some())
}

/// Whether a SEQUENCE or SEQUENCE OF entry fits an element
///
/// Entries with an own tag of a non-UNIVERSAL class are always checked;
/// others unless `NO_CHECK_TAG` is set. A missing class or tag matches
/// anything.
pub(crate) fn tag_fits<S: TagSpec>(spec: &S, header: &TlvHeader) -> bool {
    let flags = spec.flags();
    let own_tagged = matches!(
        spec.class(),
        Some(BerTagClass::ContextSpecific | BerTagClass::Application | BerTagClass::Private)
    ) && flags.has_own_tag();
    if !own_tagged && !flags.checks_tag() {
        return true;
    }
    match (spec.class(), spec.tag()) {
        (Some(class), Some(tag)) => class == header.class() && tag == header.number(),
        _ => true,
    }
}

/// `class:NAME(n) tag:t` for an entry, with the UNIVERSAL type name when known
pub(crate) fn describe_expected(class: Option<BerTagClass>, tag: Option<u32>) -> String {
    let class = match class {
        Some(class) => format!("{}({})", class.name(), class as u8),
        None => "ANY".to_string(),
    };
    let tag = tag.map_or("ANY".to_string(), |t| t.to_string());
    format!("class:{} tag:{}", class, tag)
}

pub(crate) fn describe_found(header: &TlvHeader) -> String {
    format!(
        "class:{}({}) tag:{}",
        header.class().name(),
        header.class() as u8,
        header.number()
    )
}

/// Wrong-field message shared by SEQUENCE and SEQUENCE OF
pub(crate) fn wrong_field_message<S: TagSpec>(what: &str, spec: &S, header: &TlvHeader) -> String {
    let mut expected = describe_expected(spec.class(), spec.tag());
    if spec.class() == Some(BerTagClass::Universal) {
        if let Some(name) = spec.tag().and_then(universal::name) {
            expected.push_str(&format!(" ({})", name));
        }
    }
    format!(
        "Wrong field in {} expected {} but found {}",
        what,
        expected,
        describe_found(header)
    )
}

/// Extent of a constructed value being walked
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame {
    /// Identifier offset, or the content offset when implicitly tagged
    pub offset: usize,
    pub header: Option<TlvHeader>,
    /// First content octet
    pub start: usize,
    /// End of the content, end-of-contents marker excluded
    pub end: usize,
    pub indefinite: bool,
}

impl Frame {
    /// Octets from `offset` to the end of the value
    pub fn total_len(&self) -> usize {
        self.end + if self.indefinite { 2 } else { 0 } - self.offset
    }
}

pub(crate) enum Entry {
    Frame(Frame),
    /// The identifier did not fit; decoding continues at this offset
    Skip(usize),
}

/// Read and check the header of a constructed value
///
/// With `implicit_tag` the view holds the content alone. Otherwise the value
/// must be constructed and, unless APPLICATION or PRIVATE, carry the
/// UNIVERSAL tag `expected`; a mismatch is reported and skipped.
pub(crate) fn enter(
    implicit_tag: bool,
    tvb: &Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    expected: u32,
    what: &str,
) -> BerResult<Entry> {
    if implicit_tag {
        return Ok(Entry::Frame(Frame {
            offset,
            header: None,
            start: offset,
            end: tvb.len(),
            indefinite: false,
        }));
    }

    let header = peek_header(ctx, tvb, offset)?;
    if header.end_offset() > tvb.len() {
        return Err(BerError::LengthExceedsBuffer {
            offset: tvb.absolute(offset),
            length: header.length,
            available: tvb.remaining(header.content_offset()),
        });
    }

    let class = header.class();
    if class != BerTagClass::Application
        && class != BerTagClass::Private
        && (!header.is_constructed() || class != BerTagClass::Universal || header.number() != expected)
    {
        dissect_header(ctx, parent, tvb, offset)?;
        unexpected_type(ctx, parent, tvb, &header, what)?;
        return Ok(Entry::Skip(header.end_offset()));
    }

    Ok(Entry::Frame(Frame {
        offset,
        header: Some(header),
        start: header.content_offset(),
        end: header.content_offset() + header.content_len(),
        indefinite: header.indefinite,
    }))
}

/// Add the node for a frame and, when configured, its header internals
///
/// # Returns
/// The new node, if `field` was given, and the node children go under.
pub(crate) fn attach(
    ctx: &mut DecodeContext<'_>,
    tvb: &Tvb<'_>,
    frame: &Frame,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
    value: FieldValue,
) -> BerResult<(Option<NodeId>, Option<NodeId>)> {
    let node = field.map(|f| ctx.add_item(parent, f, tvb, frame.offset, frame.total_len(), value));
    let tree = node.or(parent);
    if frame.header.is_some() {
        dissect_header(ctx, tree, tvb, frame.offset)?;
    }
    Ok((node, tree))
}

/// Finish a frame walked up to `offset`
///
/// # Returns
/// The offset after the value, end-of-contents marker included.
pub(crate) fn leave(
    ctx: &mut DecodeContext<'_>,
    tvb: &Tvb<'_>,
    frame: &Frame,
    offset: usize,
    tree: Option<NodeId>,
    what: &str,
) -> usize {
    if offset > frame.end {
        ctx.report(
            DiagnosticKind::ExcessBytes,
            tree,
            tvb,
            offset.saturating_sub(2),
            2,
            format!("{} ate {} too many bytes", what, offset - frame.end),
        );
    }
    if frame.indefinite {
        if ctx.config().show_internal_fields {
            ctx.add_item(tree, &fields::EOC, tvb, frame.end, 2, FieldValue::None);
        }
        return frame.end + 2;
    }
    frame.end
}

/// Read the header of the element at `offset`
///
/// # Errors
/// `LengthExceedsBuffer` when the element runs past the view, `NoProgress`
/// when its extent would not move the offset forward.
pub(crate) fn next_element(ctx: &DecodeContext<'_>, tvb: &Tvb<'_>, offset: usize) -> BerResult<TlvHeader> {
    let header = read_header(tvb, offset, ctx.depth())?;
    let end = header.end_offset();
    if end <= offset {
        return Err(BerError::NoProgress {
            offset: tvb.absolute(offset),
        });
    }
    if end > tvb.len() {
        return Err(BerError::LengthExceedsBuffer {
            offset: tvb.absolute(offset),
            length: header.length,
            available: tvb.remaining(header.content_offset()),
        });
    }
    Ok(header)
}

/// View handed to an element's decoder
///
/// With an own tag the header is consumed (internals added under `tree`) and
/// the view holds the content without any end-of-contents marker. Without
/// one the view holds the whole TLV for the decoder to read itself.
pub(crate) fn element_view<'a>(
    ctx: &mut DecodeContext<'_>,
    tvb: &Tvb<'a>,
    header: &TlvHeader,
    flags: FieldFlags,
    tree: Option<NodeId>,
) -> BerResult<Tvb<'a>> {
    if flags.has_own_tag() {
        dissect_header(ctx, tree, tvb, header.offset)?;
        tvb.subset(header.content_offset(), header.content_len())
    } else {
        ctx.set_last_header(*header);
        tvb.subset(header.offset, header.header_len + header.length)
    }
}

/// Mark the end-of-contents octets of an element whose header was consumed
pub(crate) fn element_eoc(
    ctx: &mut DecodeContext<'_>,
    tvb: &Tvb<'_>,
    header: &TlvHeader,
    flags: FieldFlags,
    tree: Option<NodeId>,
) {
    if flags.has_own_tag()
        && header.indefinite
        && header.length > 2
        && ctx.config().show_internal_fields
    {
        ctx.add_item(
            tree,
            &fields::FIELD_EOC,
            tvb,
            header.end_offset() - 2,
            2,
            FieldValue::None,
        );
    }
}

/// Walk an unmatched element generically when `decode_unexpected` is set
pub(crate) fn walk_unexpected(
    ctx: &mut DecodeContext<'_>,
    tvb: &Tvb<'_>,
    header: &TlvHeader,
    tree: Option<NodeId>,
) -> BerResult<()> {
    if ctx.config().decode_unexpected {
        super::unknown::dissect_unknown_ber(ctx, *tvb, header.offset, tree)?;
    }
    Ok(())
}
