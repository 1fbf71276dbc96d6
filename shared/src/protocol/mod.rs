//! Payload buffer and bounds-checked views
//!
//! Rules are exchanged between the daemon and its clients as a flat,
//! length-prefixed byte layout. Encoders append to a [`Payload`]; decoders
//! walk a [`PayloadView`] with a [`PayloadCursor`], which never reads past
//! the end of the view and validates every declared length before use.
//!
//! Integers are written in host byte order: payloads only travel between
//! processes on the same machine.

pub mod payload;
pub mod view;

pub use payload::Payload;
pub use view::{PayloadCursor, PayloadView};

/// Maximum length of a symbol name, terminator included.
pub const SYMBOL_NAME_LEN: usize = 256;
