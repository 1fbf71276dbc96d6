//! Append-only encode buffer

use bytes::{BufMut, BytesMut};

use super::view::PayloadView;
use crate::error::PayloadError;

/// Append-only byte buffer that rules serialize themselves into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    buffer: BytesMut,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Read-only view over the whole buffer.
    pub fn view(&self) -> PayloadView<'_> {
        PayloadView::new(&self.buffer)
    }

    /// Run `write` against the buffer. If it fails, whatever it appended is
    /// dropped and the buffer is left as it was.
    pub(crate) fn append_with<T, E, F>(&mut self, write: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        let start = self.buffer.len();
        let result = write(self);
        if result.is_err() {
            self.buffer.truncate(start);
        }
        result
    }

    pub fn append_i8(&mut self, value: i8) {
        self.buffer.put_i8(value);
    }

    pub fn append_i32(&mut self, value: i32) {
        self.buffer.put_slice(&value.to_ne_bytes());
    }

    pub fn append_u32(&mut self, value: u32) {
        self.buffer.put_slice(&value.to_ne_bytes());
    }

    pub fn append_u64(&mut self, value: u64) {
        self.buffer.put_slice(&value.to_ne_bytes());
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.buffer.put_slice(bytes);
    }

    /// Append `s` followed by its NUL terminator.
    pub fn append_cstr(&mut self, s: &str) {
        self.buffer.put_slice(s.as_bytes());
        self.buffer.put_u8(0);
    }

    /// Append an optional string: nothing at all when `None`.
    pub fn append_opt_cstr(&mut self, s: Option<&str>) {
        if let Some(s) = s {
            self.append_cstr(s);
        }
    }

    pub fn append_payload(&mut self, other: &Payload) {
        self.append_bytes(other.as_bytes());
    }
}

/// Wire length of a NUL-terminated string, terminator included.
pub(crate) fn cstr_len(what: &'static str, s: &str) -> Result<u32, PayloadError> {
    wire_len(what, s.len() + 1)
}

/// Wire length of an optional string: zero when absent.
pub(crate) fn opt_cstr_len(what: &'static str, s: Option<&str>) -> Result<u32, PayloadError> {
    match s {
        Some(s) => cstr_len(what, s),
        None => Ok(0),
    }
}

/// Whether `s` can be carried as a non-empty NUL-terminated string.
pub(crate) fn is_wire_string(s: &str) -> bool {
    !s.is_empty() && !s.contains('\0')
}

pub(crate) fn wire_len(what: &'static str, len: usize) -> Result<u32, PayloadError> {
    u32::try_from(len).map_err(|_| PayloadError::FieldTooLarge { what, len })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_layout() {
        let mut payload = Payload::new();
        payload.append_i8(-1);
        payload.append_u32(7);
        payload.append_cstr("ab");

        let mut expected = vec![0xff];
        expected.extend_from_slice(&7u32.to_ne_bytes());
        expected.extend_from_slice(b"ab\0");
        assert_eq!(payload.as_bytes(), expected.as_slice());
        assert_eq!(payload.len(), 8);
    }

    #[test]
    fn test_optional_string_appends_nothing() {
        let mut payload = Payload::new();
        payload.append_opt_cstr(None);
        assert!(payload.is_empty());
        assert_eq!(opt_cstr_len("filter", None).unwrap(), 0);
        assert_eq!(opt_cstr_len("filter", Some("a")).unwrap(), 2);
    }

    #[test]
    fn test_append_payload() {
        let mut inner = Payload::new();
        inner.append_u64(0x1122_3344_5566_7788);
        let mut outer = Payload::new();
        outer.append_i8(3);
        outer.append_payload(&inner);
        assert_eq!(outer.len(), 9);
        assert_eq!(outer.as_bytes()[0], 3);
        assert_eq!(&outer.as_bytes()[1..], inner.as_bytes());
    }

    #[test]
    fn test_failed_append_leaves_buffer_untouched() {
        let mut payload = Payload::new();
        payload.append_cstr("kept");

        let result = payload.append_with(|payload| {
            payload.append_i8(1);
            payload.append_u32(2);
            wire_len("field", usize::MAX)
        });
        assert!(matches!(result, Err(PayloadError::FieldTooLarge { .. })));
        assert_eq!(payload.as_bytes(), b"kept\0");

        payload
            .append_with(|payload| {
                payload.append_i8(7);
                Ok::<_, PayloadError>(())
            })
            .unwrap();
        assert_eq!(payload.as_bytes(), b"kept\0\x07");
    }
}
