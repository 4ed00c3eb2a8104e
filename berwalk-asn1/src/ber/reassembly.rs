//! Constructed OCTET STRING reassembly
//!
//! A constructed OCTET STRING carries its value as a series of nested
//! OCTET STRING fragments, each of which may itself be constructed. The
//! fragments are decoded one by one and their bytes appended, in arrival
//! order, to a buffer owned by the current decode call.

use std::collections::HashMap;

use berwalk_core::{BerError, BerResult, FieldRef, FieldValue, NodeId, Tvb};
use bytes::{Bytes, BytesMut};

use super::context::DecodeContext;
use super::fields;
use super::scalar::string::{octet_string_impl, StringSpec};

/// Identifier of one in-progress reassembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReassemblyId(u32);

/// Byte range a fragment was read from, as absolute offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub offset: usize,
    pub length: usize,
    /// Number of value bytes the fragment contributed
    pub size: usize,
}

#[derive(Debug, Default)]
struct ReassemblyBuffer {
    fragments: Vec<Fragment>,
    data: BytesMut,
}

/// Reassembly buffers of one decode call
#[derive(Debug, Default)]
pub struct ReassemblyTable {
    next_id: u32,
    active: HashMap<ReassemblyId, ReassemblyBuffer>,
}

impl ReassemblyTable {
    /// Open a new, empty buffer
    pub fn begin(&mut self) -> ReassemblyId {
        let id = ReassemblyId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.active.insert(id, ReassemblyBuffer::default());
        id
    }

    /// Append a fragment to an open buffer
    pub fn add(&mut self, id: ReassemblyId, fragment: Fragment, data: &[u8]) {
        if let Some(buffer) = self.active.get_mut(&id) {
            buffer.fragments.push(fragment);
            buffer.data.extend_from_slice(data);
        }
    }

    /// Close a buffer, returning the concatenated bytes and the fragment list
    pub fn finish(&mut self, id: ReassemblyId) -> Option<(Bytes, Vec<Fragment>)> {
        self.active
            .remove(&id)
            .map(|buffer| (buffer.data.freeze(), buffer.fragments))
    }

    /// Drop a buffer without using it
    pub fn discard(&mut self, id: ReassemblyId) {
        self.active.remove(&id);
    }

    /// Number of buffers still open
    pub fn pending(&self) -> usize {
        self.active.len()
    }
}

/// Reassemble the fragments of a constructed OCTET STRING
///
/// # Arguments
/// * `offset` - First content octet of the constructed encoding
/// * `con_len` - Content length; for an indefinite encoding this includes
///   the end-of-contents marker
/// * `indefinite` - Stop at the end-of-contents marker instead of after
///   `con_len` bytes
///
/// # Returns
/// The offset after the last fragment (and marker) and the value bytes.
///
/// # Errors
/// `InvalidFragment` when a fragment yields no value or an empty one in a
/// multi-fragment string; any structural error from decoding a fragment.
#[allow(clippy::too_many_arguments)]
pub(crate) fn reassemble_octet_string(
    ctx: &mut DecodeContext<'_>,
    tvb: Tvb<'_>,
    offset: usize,
    con_len: usize,
    indefinite: bool,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
    spec: StringSpec,
) -> BerResult<(usize, Bytes)> {
    if con_len == 0 {
        return Ok((offset, Bytes::new()));
    }

    ctx.nested(|ctx| {
        let id = ctx.reassembly().begin();
        let result = collect_fragments(ctx, id, tvb, offset, con_len, indefinite, parent, field, spec);
        if result.is_err() {
            ctx.reassembly().discard(id);
        }
        result
    })
}

#[allow(clippy::too_many_arguments)]
fn collect_fragments(
    ctx: &mut DecodeContext<'_>,
    id: ReassemblyId,
    tvb: Tvb<'_>,
    start: usize,
    con_len: usize,
    indefinite: bool,
    parent: Option<NodeId>,
    field: Option<FieldRef>,
    spec: StringSpec,
) -> BerResult<(usize, Bytes)> {
    let fragment_spec = StringSpec {
        emit: false,
        ..spec
    };
    let mut offset = start;
    let mut first = true;

    loop {
        let fragment_start = offset;
        let (next, value) = octet_string_impl(false, tvb, offset, ctx, None, None, fragment_spec)?;
        let value = value.ok_or(BerError::InvalidFragment {
            offset: tvb.absolute(fragment_start),
        })?;
        offset = next;

        let done = if indefinite {
            if tvb.is_eoc(offset) {
                offset += 2;
                true
            } else {
                false
            }
        } else {
            offset - start >= con_len
        };

        if done && first {
            // Only one fragment: its bytes are the value.
            ctx.reassembly().discard(id);
            let header = super::reader::read_header(&tvb, fragment_start, ctx.depth())?;
            if spec.emit && !header.is_constructed() {
                octet_string_impl(false, tvb, fragment_start, ctx, parent, field, spec)?;
            }
            log::trace!("single fragment OCTET STRING of {} bytes", value.len());
            return Ok((offset, value));
        }

        if value.is_empty() {
            return Err(BerError::InvalidFragment {
                offset: tvb.absolute(fragment_start),
            });
        }

        let fragment = Fragment {
            offset: tvb.absolute(fragment_start),
            length: next - fragment_start,
            size: value.len(),
        };
        ctx.reassembly().add(id, fragment, &value);
        first = false;

        if done {
            break;
        }
    }

    let (data, fragments) = ctx.reassembly().finish(id).unwrap_or_default();
    log::trace!(
        "reassembled OCTET STRING of {} bytes from {} fragments",
        data.len(),
        fragments.len()
    );

    if spec.emit {
        let target = field.unwrap_or(&fields::UNKNOWN_OCTETSTRING);
        let value = super::scalar::string::string_value(target, spec.type_tag, &data);
        let item = ctx.add_item(parent, target, &tvb, start, offset - start, value);
        let list = ctx.tree_mut().add_field(
            Some(item),
            &fields::OCTET_STRING_FRAGMENTS,
            tvb.absolute(start),
            offset - start,
            FieldValue::None,
        );
        ctx.tree_mut()
            .set_text(list, format!("{} fragments", fragments.len()));
        for (index, fragment) in fragments.iter().enumerate() {
            let node = ctx.tree_mut().add_field(
                Some(list),
                &fields::OCTET_STRING_FRAGMENT,
                fragment.offset,
                fragment.length,
                FieldValue::Unsigned(fragment.size as u64),
            );
            ctx.tree_mut().set_text(
                node,
                format!("#{} ({} bytes at offset {})", index + 1, fragment.size, fragment.offset),
            );
        }
        ctx.tree_mut().add_field(
            Some(item),
            &fields::OCTET_STRING_REASSEMBLED_LENGTH,
            tvb.absolute(start),
            offset - start,
            FieldValue::Unsigned(data.len() as u64),
        );
    }

    Ok((offset, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::registry::Registry;
    use crate::ber::scalar::dissect_octet_string;
    use berwalk_core::{DecodeConfig, FieldInfo, FieldKind};

    static DATA: FieldInfo = FieldInfo::new("data", "test.data", FieldKind::Bytes);

    #[test]
    fn test_table_keeps_buffers_apart() {
        let mut table = ReassemblyTable::default();
        let a = table.begin();
        let b = table.begin();
        let fragment = Fragment {
            offset: 0,
            length: 1,
            size: 1,
        };
        table.add(a, fragment, b"x");
        table.add(b, fragment, b"1");
        table.add(a, fragment, b"y");
        assert_eq!(table.pending(), 2);
        assert_eq!(table.finish(a).unwrap().0, Bytes::from_static(b"xy"));
        assert_eq!(table.finish(b).unwrap().0, Bytes::from_static(b"1"));
        assert_eq!(table.pending(), 0);
    }

    #[test]
    fn test_three_fragments_definite() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [
            0x24, 0x0B, 0x04, 0x02, b'A', b'a', 0x04, 0x01, b'B', 0x04, 0x02, b'C', b'c',
        ];
        let (offset, value) =
            dissect_octet_string(false, Tvb::new(&data), 0, &mut ctx, None, Some(&DATA)).unwrap();
        assert_eq!(offset, data.len());
        assert_eq!(value.as_deref(), Some(&b"AaBCc"[..]));
        assert_eq!(ctx.reassembly().pending(), 0);

        let item = ctx.tree().find_by_abbrev("test.data").unwrap();
        assert_eq!(ctx.created_item(), Some(item));
        let list = ctx.tree().find_by_abbrev("ber.octet_string.fragments").unwrap();
        assert_eq!(ctx.tree().children(list).len(), 3);
        let length = ctx
            .tree()
            .find_by_abbrev("ber.octet_string.reassembled.length")
            .unwrap();
        assert_eq!(ctx.tree().node(length).value, FieldValue::Unsigned(5));
    }

    #[test]
    fn test_three_fragments_indefinite() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [
            0x24, 0x80, 0x04, 0x01, b'A', 0x04, 0x01, b'B', 0x04, 0x01, b'C', 0x00, 0x00,
        ];
        let (offset, value) =
            dissect_octet_string(false, Tvb::new(&data), 0, &mut ctx, None, Some(&DATA)).unwrap();
        assert_eq!(offset, data.len());
        assert_eq!(value.as_deref(), Some(&b"ABC"[..]));
    }

    #[test]
    fn test_single_fragment_skips_reassembly() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x24, 0x05, 0x04, 0x03, b'x', b'y', b'z'];
        let (offset, value) =
            dissect_octet_string(false, Tvb::new(&data), 0, &mut ctx, None, Some(&DATA)).unwrap();
        assert_eq!(offset, data.len());
        assert_eq!(value.as_deref(), Some(&b"xyz"[..]));
        assert!(ctx.tree().find_by_abbrev("ber.octet_string.fragments").is_none());
        let item = ctx.tree().find_by_abbrev("test.data").unwrap();
        assert_eq!(ctx.tree().node(item).offset, 4);
    }

    #[test]
    fn test_nested_constructed_fragment() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [
            0x24, 0x0A, 0x24, 0x05, 0x04, 0x03, b'a', b'b', b'c', 0x04, 0x01, b'd',
        ];
        let (offset, value) =
            dissect_octet_string(false, Tvb::new(&data), 0, &mut ctx, None, Some(&DATA)).unwrap();
        assert_eq!(offset, data.len());
        assert_eq!(value.as_deref(), Some(&b"abcd"[..]));
    }

    #[test]
    fn test_zero_length_constructed() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x24, 0x00];
        let (offset, value) =
            dissect_octet_string(false, Tvb::new(&data), 0, &mut ctx, None, Some(&DATA)).unwrap();
        assert_eq!(offset, 2);
        assert_eq!(value.as_deref(), Some(&b""[..]));
    }

    #[test]
    fn test_empty_fragment_is_malformed() {
        let registry = Registry::new();
        let config = DecodeConfig::default();
        let mut ctx = DecodeContext::new(&registry, &config);
        let data = [0x24, 0x05, 0x04, 0x00, 0x04, 0x01, b'x'];
        let result = dissect_octet_string(false, Tvb::new(&data), 0, &mut ctx, None, Some(&DATA));
        assert!(matches!(result, Err(BerError::InvalidFragment { offset: 2 })));
        assert_eq!(ctx.reassembly().pending(), 0);
    }
}
