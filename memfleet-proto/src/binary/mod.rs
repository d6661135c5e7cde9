//! Memcached binary protocol.
//!
//! Every frame starts with a fixed 24-byte big-endian header; the body is
//! extras ∥ key ∥ value with the three lengths declared in the header.
//! [`Request`] encodes client-side packets, [`Response`] carves a received
//! body into its parts, and the header types serve both directions so a
//! test harness can speak the server side.

mod header;
mod request;
mod response;

pub use header::{
    Opcode, RequestHeader, ResponseHeader, Status, HEADER_SIZE, REQUEST_MAGIC, RESPONSE_MAGIC,
};
pub use request::Request;
pub use response::Response;
