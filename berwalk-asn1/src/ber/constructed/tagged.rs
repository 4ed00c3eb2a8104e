//! Explicitly tagged wrappers

use berwalk_core::{BerResult, DiagnosticKind, FieldRef, NodeId, Tvb};

use crate::ber::context::DecodeContext;
use crate::ber::reader::dissect_header;
use crate::ber::schema::FieldDecoder;
use crate::ber::types::{universal, BerTagClass};

use super::{describe_expected, describe_found, walk_unexpected};

/// Decode a value wrapped in the tag `class`/`tag`
///
/// The wrapper's identifier is checked and a mismatch reported, after which
/// the content is decoded anyway. With `tag_impl` the decoder runs in
/// implicit mode over the wrapper's content; otherwise it reads the inner
/// TLV itself. With `implicit_tag` the wrapper was already consumed by the
/// caller and `decoder` runs directly.
#[allow(clippy::too_many_arguments)]
pub fn dissect_tagged_type(
    implicit_tag: bool,
    tvb: Tvb<'_>,
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
    class: BerTagClass,
    tag: u32,
    tag_impl: bool,
    decoder: FieldDecoder,
) -> BerResult<usize> {
    log::trace!("TAGGED entered implicit_tag:{} offset:{}", implicit_tag, offset);
    if implicit_tag {
        return decoder(tag_impl, tvb, offset, ctx, parent, field);
    }

    let header = dissect_header(ctx, parent, &tvb, offset)?;
    if header.class() != class || header.number() != tag {
        let mut expected = describe_expected(Some(class), Some(tag));
        if class == BerTagClass::Universal {
            if let Some(name) = universal::name(tag) {
                expected.push_str(&format!(" ({})", name));
            }
        }
        ctx.report(
            DiagnosticKind::WrongTag,
            parent,
            &tvb,
            offset,
            header.header_len,
            format!(
                "Wrong tag in tagged type - expected {} but found {}",
                expected,
                describe_found(&header)
            ),
        );
        walk_unexpected(ctx, &tvb, &header, parent)?;
    }

    if tag_impl {
        let content = tvb.subset(header.content_offset(), header.content_len())?;
        decoder(true, content, 0, ctx, parent, field)?;
        Ok(header.end_offset())
    } else {
        decoder(false, tvb, header.content_offset(), ctx, parent, field)
    }
}
