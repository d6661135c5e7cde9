//! Protocol drivers: one uniform command surface over two wire protocols.
//!
//! A driver owns protocol knowledge only; it is a stateless value selected
//! at client construction, and every call operates on a pooled connection
//! the dispatcher hands it. Framing differences, error-model differences,
//! and feature gaps (text has no Touch and no authentication) are visible
//! through the capability methods so callers can gate on them.

mod binary;
mod text;

pub(crate) use binary::BinaryDriver;
pub(crate) use text::TextDriver;

use crate::item::{Item, Verb};
use crate::pool::Entry;
use crate::Error;

pub(crate) trait Driver: Send + Sync {
    /// Wire protocol name: `"text"` or `"binary"`.
    fn proto_type(&self) -> &'static str;

    /// Whether Touch is available on this protocol.
    fn supports_touch(&self) -> bool;

    /// Whether SASL authentication is available on this protocol.
    fn is_auth_supported(&self) -> bool;

    /// SASL-PLAIN handshake. Runs on a freshly dialled connection before
    /// any data command.
    fn auth(&self, conn: &mut Entry, username: &str, password: &str) -> Result<(), Error>;

    /// Client-side key legality for this protocol. Empty keys are rejected
    /// by the dispatcher before this is consulted.
    fn legal_key(&self, key: &str) -> bool;

    /// Batched retrieval. Invokes `sink` once per item found; absent keys
    /// produce nothing.
    fn get(
        &self,
        conn: &mut Entry,
        keys: &[&str],
        sink: &mut dyn FnMut(Item),
    ) -> Result<(), Error>;

    /// Store `item` under a store verb (Set, Add, Replace, Cas).
    fn populate(&self, conn: &mut Entry, verb: Verb, item: &Item) -> Result<(), Error>;

    fn delete(&self, conn: &mut Entry, key: &str) -> Result<(), Error>;

    fn delete_all(&self, conn: &mut Entry) -> Result<(), Error>;

    fn flush_all(&self, conn: &mut Entry) -> Result<(), Error>;

    /// Update the expiration of each key, serially, aborting on the first
    /// failure.
    fn touch(&self, conn: &mut Entry, keys: &[&str], expiration: i32) -> Result<(), Error>;

    /// Increment or decrement a counter, returning the new value.
    fn incr_decr(&self, conn: &mut Entry, verb: Verb, key: &str, delta: u64)
        -> Result<u64, Error>;

    /// Liveness probe.
    fn ping(&self, conn: &mut Entry) -> Result<(), Error>;
}

/// A response line that is legal wire data but wrong for the command that
/// was sent.
fn unexpected_line(context: &str, line: &[u8]) -> Error {
    Error::Protocol(format!(
        "unexpected response line from {context}: {:?}",
        String::from_utf8_lossy(line)
    ))
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
