//! Memcached wire codecs, sans I/O.
//!
//! This crate knows how to frame and classify memcached traffic for both
//! wire protocols; it never touches a socket. The text protocol is handled
//! one CRLF-terminated line at a time, the binary protocol as 24-byte
//! headers plus a length-prefixed body. The client crate layers buffered
//! blocking I/O on top; test harnesses use the same types to play the
//! server side.
//!
//! # Text protocol
//!
//! ```
//! use memfleet_proto::text::{parse_line, Line};
//!
//! let line = b"VALUE greeting 42 5 7\r\n";
//! match parse_line(line).unwrap() {
//!     Line::Value(header) => {
//!         assert_eq!(header.key, b"greeting");
//!         assert_eq!(header.flags, 42);
//!         assert_eq!(header.len, 5);
//!         assert_eq!(header.cas, Some(7));
//!     }
//!     _ => unreachable!(),
//! }
//! ```
//!
//! # Binary protocol
//!
//! ```
//! use memfleet_proto::binary::{Opcode, Request, RequestHeader, HEADER_SIZE};
//!
//! let mut request = Request::new(Opcode::Get);
//! request.key = b"greeting";
//!
//! let mut buf = Vec::new();
//! request.encode_into(&mut buf);
//! assert_eq!(buf.len(), HEADER_SIZE + 8);
//!
//! let header = RequestHeader::parse(&buf).unwrap();
//! assert_eq!(header.opcode, Opcode::Get);
//! assert_eq!(header.key_length, 8);
//! ```

pub mod binary;
pub mod text;

mod error;

pub use error::ParseError;
