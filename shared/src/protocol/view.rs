//! Bounds-checked read access to a payload
//!
//! A [`PayloadView`] borrows a sub-slice of an encoded payload. A
//! [`PayloadCursor`] walks a view front to back; every read checks the
//! requested length against what is left before touching the bytes, so a
//! length field taken from an untrusted buffer can never cause an
//! out-of-bounds read.

use std::str::from_utf8;

use crate::error::PayloadError;

/// Read-only window over encoded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadView<'a> {
    data: &'a [u8],
}

impl<'a> PayloadView<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn cursor(&self) -> PayloadCursor<'a> {
        PayloadCursor {
            data: self.data,
            offset: 0,
        }
    }
}

impl<'a> From<&'a [u8]> for PayloadView<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::new(data)
    }
}

/// Sequential reader over a [`PayloadView`].
#[derive(Debug, Clone)]
pub struct PayloadCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> PayloadCursor<'a> {
    /// Number of bytes read so far.
    pub fn consumed(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// View over everything not yet consumed. Does not advance the cursor.
    pub fn rest(&self) -> PayloadView<'a> {
        PayloadView::new(&self.data[self.offset..])
    }

    /// Mark `len` bytes as consumed, typically after a nested decoder
    /// worked on [`rest`](Self::rest).
    pub fn advance(&mut self, what: &'static str, len: usize) -> Result<(), PayloadError> {
        self.take(what, len).map(|_| ())
    }

    /// Borrow the next `len` bytes.
    pub fn take(&mut self, what: &'static str, len: usize) -> Result<&'a [u8], PayloadError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(PayloadError::Truncated {
                what,
                offset: self.offset,
                needed: len,
                available: remaining,
            });
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    /// Borrow the next `len` bytes as a view of their own.
    pub fn take_view(
        &mut self,
        what: &'static str,
        len: usize,
    ) -> Result<PayloadView<'a>, PayloadError> {
        self.take(what, len).map(PayloadView::new)
    }

    fn take_array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], PayloadError> {
        let bytes = self.take(what, N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    pub fn read_i8(&mut self, what: &'static str) -> Result<i8, PayloadError> {
        Ok(i8::from_ne_bytes(self.take_array(what)?))
    }

    pub fn read_i32(&mut self, what: &'static str) -> Result<i32, PayloadError> {
        Ok(i32::from_ne_bytes(self.take_array(what)?))
    }

    pub fn read_u32(&mut self, what: &'static str) -> Result<u32, PayloadError> {
        Ok(u32::from_ne_bytes(self.take_array(what)?))
    }

    /// Read a `u32` length field, widened for indexing.
    pub fn read_len(&mut self, what: &'static str) -> Result<usize, PayloadError> {
        self.read_u32(what).map(|len| len as usize)
    }

    pub fn read_u64(&mut self, what: &'static str) -> Result<u64, PayloadError> {
        Ok(u64::from_ne_bytes(self.take_array(what)?))
    }

    /// Read a NUL-terminated string occupying exactly `len` bytes.
    ///
    /// The first NUL must be the last byte of the field: a missing
    /// terminator or an embedded one are both rejected.
    pub fn read_cstr(&mut self, what: &'static str, len: usize) -> Result<&'a str, PayloadError> {
        let bytes = self.take(what, len)?;
        match bytes.iter().position(|b| *b == 0) {
            Some(nul) if nul + 1 == len => {}
            _ => return Err(PayloadError::MissingTerminator { what, len }),
        }
        from_utf8(&bytes[..len - 1]).map_err(|error| PayloadError::NotAString { what, error })
    }

    /// Like [`read_cstr`](Self::read_cstr), with a zero length meaning "absent".
    pub fn read_opt_cstr(
        &mut self,
        what: &'static str,
        len: usize,
    ) -> Result<Option<&'a str>, PayloadError> {
        if len == 0 {
            return Ok(None);
        }
        self.read_cstr(what, len).map(Some)
    }
}
