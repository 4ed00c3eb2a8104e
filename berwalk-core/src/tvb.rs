//! Borrowed byte view used by every decoder
//!
//! A `Tvb` is a window onto the top-level buffer. It remembers where it sits
//! in that buffer (`origin`) so nodes created from a nested view still carry
//! absolute offsets, and it separates the bytes actually captured from the
//! length the producer reported, so a cut-short capture can be told apart
//! from a malformed encoding.

use crate::error::{BerError, BerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tvb<'a> {
    data: &'a [u8],
    reported_len: usize,
    origin: usize,
}

impl<'a> Tvb<'a> {
    /// Create a view over a complete buffer
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            reported_len: data.len(),
            origin: 0,
        }
    }

    /// Create a view over a captured prefix of a longer buffer
    ///
    /// # Arguments
    /// * `data` - Bytes actually available
    /// * `reported_len` - Length the producer claims the buffer has; values
    ///   smaller than `data.len()` are raised to it
    pub fn with_reported_length(data: &'a [u8], reported_len: usize) -> Self {
        Self {
            data,
            reported_len: reported_len.max(data.len()),
            origin: 0,
        }
    }

    /// Create a view over bytes that do not live in the top-level buffer
    /// (a reassembled OCTET STRING), anchored at `origin` for display.
    pub fn detached(data: &'a [u8], origin: usize) -> Self {
        Self {
            data,
            reported_len: data.len(),
            origin,
        }
    }

    /// Reported length of this view
    pub fn len(&self) -> usize {
        self.reported_len
    }

    pub fn is_empty(&self) -> bool {
        self.reported_len == 0
    }

    /// Number of bytes actually captured
    pub fn captured_len(&self) -> usize {
        self.data.len()
    }

    /// Whether every reported byte was captured
    pub fn is_complete(&self) -> bool {
        self.data.len() == self.reported_len
    }

    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Translate a view-relative offset into a top-level buffer offset
    pub fn absolute(&self, offset: usize) -> usize {
        self.origin + offset
    }

    /// Reported bytes left from `offset` (0 past the end)
    pub fn remaining(&self, offset: usize) -> usize {
        self.reported_len.saturating_sub(offset)
    }

    /// Captured bytes left from `offset` (0 past the end)
    pub fn captured_remaining(&self, offset: usize) -> usize {
        self.data.len().saturating_sub(offset)
    }

    fn check(&self, offset: usize, len: usize) -> BerResult<()> {
        let end = offset.checked_add(len).ok_or(BerError::BoundsViolation {
            offset: self.absolute(offset),
            needed: len,
            available: self.remaining(offset),
        })?;
        if end <= self.data.len() {
            Ok(())
        } else if end <= self.reported_len {
            Err(BerError::Truncated {
                offset: self.absolute(offset),
                needed: len,
                available: self.captured_remaining(offset),
            })
        } else {
            Err(BerError::BoundsViolation {
                offset: self.absolute(offset),
                needed: len,
                available: self.remaining(offset),
            })
        }
    }

    /// Read one byte
    ///
    /// # Errors
    /// `Truncated` when the byte lies inside the reported length but was not
    /// captured, `BoundsViolation` when it lies past the reported length.
    pub fn byte(&self, offset: usize) -> BerResult<u8> {
        self.check(offset, 1)?;
        Ok(self.data[offset])
    }

    /// Read `len` bytes starting at `offset`
    pub fn bytes(&self, offset: usize, len: usize) -> BerResult<&'a [u8]> {
        self.check(offset, len)?;
        Ok(&self.data[offset..offset + len])
    }

    /// Captured bytes from `offset` to the end (empty past the end)
    pub fn rest(&self, offset: usize) -> &'a [u8] {
        &self.data[offset.min(self.data.len())..]
    }

    /// Whether the two bytes at `offset` form an end-of-contents marker
    pub fn is_eoc(&self, offset: usize) -> bool {
        matches!(self.data.get(offset..offset + 2), Some([0, 0]))
    }

    /// Create a view of `len` bytes starting at `offset`
    ///
    /// The new view is clamped to what this view holds, the way a
    /// length-limited sub-buffer is: asking for more than is left yields a
    /// shorter view rather than an error. Only an `offset` past the end fails.
    pub fn subset(&self, offset: usize, len: usize) -> BerResult<Tvb<'a>> {
        if offset > self.reported_len {
            return Err(BerError::BoundsViolation {
                offset: self.absolute(offset),
                needed: len,
                available: 0,
            });
        }
        let start = offset.min(self.data.len());
        let end = offset.saturating_add(len).min(self.data.len());
        Ok(Tvb {
            data: &self.data[start..end],
            reported_len: len.min(self.reported_len - offset),
            origin: self.absolute(offset),
        })
    }

    /// Create a view from `offset` to the end
    pub fn subset_remaining(&self, offset: usize) -> BerResult<Tvb<'a>> {
        self.subset(offset, self.remaining(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_tracks_origin() {
        let data = [0u8, 1, 2, 3, 4, 5];
        let tvb = Tvb::new(&data);
        let sub = tvb.subset(2, 3).unwrap();
        assert_eq!(sub.len(), 3);
        assert_eq!(sub.byte(0).unwrap(), 2);
        assert_eq!(sub.absolute(1), 3);

        let nested = sub.subset(1, 10).unwrap();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested.absolute(0), 3);
    }

    #[test]
    fn test_reads_past_end() {
        let data = [1u8, 2];
        let tvb = Tvb::new(&data);
        assert!(matches!(tvb.byte(2), Err(BerError::BoundsViolation { offset: 2, .. })));
        assert!(tvb.bytes(1, 1).is_ok());
        assert!(tvb.subset(3, 0).is_err());
    }

    #[test]
    fn test_short_capture_is_truncation() {
        let data = [1u8, 2];
        let tvb = Tvb::with_reported_length(&data, 4);
        assert!(!tvb.is_complete());
        let err = tvb.bytes(0, 3).unwrap_err();
        assert!(err.is_truncation());
        assert!(matches!(tvb.byte(4), Err(BerError::BoundsViolation { .. })));
    }

    #[test]
    fn test_is_eoc() {
        let data = [0x30, 0x80, 0x00, 0x00];
        let tvb = Tvb::new(&data);
        assert!(tvb.is_eoc(2));
        assert!(!tvb.is_eoc(1));
        assert!(!tvb.is_eoc(3));
    }
}
