//! The unit of value exchange.

use std::fmt;

use bytes::Bytes;

/// One cache item, as passed to stores and returned from retrievals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    /// Key, at most 250 bytes. The text protocol additionally forbids
    /// bytes ≤ 0x20 and 0x7F.
    pub key: String,
    /// Opaque payload. The size limit is enforced server side and
    /// surfaces as [`crate::Error::ValueTooLarge`].
    pub value: Bytes,
    /// 32-bit opaque tag stored with the value and echoed back verbatim.
    pub flags: u32,
    /// Expiration in seconds. Zero means no expiration; values above
    /// 30 days are interpreted by the server as absolute unix timestamps.
    /// Passed through unchanged.
    pub expiration: i32,
    /// Version token assigned by the server on retrieval. Zero means
    /// "not yet retrieved". Only meaningful to CompareAndSwap.
    pub cas_id: u64,
}

impl Item {
    /// Convenience constructor for the common key/value case.
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Item {
            key: key.into(),
            value: value.into(),
            ..Item::default()
        }
    }
}

/// Store and counter verbs. Stores share one wire encoding; counters have
/// their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Set,
    Add,
    Replace,
    Cas,
    Incr,
    Decr,
}

impl Verb {
    /// The token this verb uses on the text protocol.
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Set => "set",
            Verb::Add => "add",
            Verb::Replace => "replace",
            Verb::Cas => "cas",
            Verb::Incr => "incr",
            Verb::Decr => "decr",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
