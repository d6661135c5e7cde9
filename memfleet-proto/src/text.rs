//! Text (ASCII) protocol response lines.
//!
//! The text protocol is line oriented: every server reply is one
//! CRLF-terminated ASCII line, optionally followed by an opaque payload
//! whose length was declared in the line. This module classifies reply
//! lines. Reading the payload bytes that follow a `VALUE` header is the
//! caller's job: exactly `len + 2` bytes, and the trailing CRLF must be
//! verified.

use crate::ParseError;

/// Header of one `VALUE` reply line:
/// `VALUE <key> <flags> <bytes> [<cas>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueHeader<'a> {
    pub key: &'a [u8],
    pub flags: u32,
    /// Declared payload length in bytes, CRLF not included.
    pub len: usize,
    /// CAS token, present when the retrieval was a `gets`.
    pub cas: Option<u64>,
}

/// One classified response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    Stored,
    NotStored,
    Exists,
    NotFound,
    Deleted,
    Touched,
    Ok,
    End,
    Error,
    /// `VALUE …` header; the payload follows on the wire.
    Value(ValueHeader<'a>),
    /// `CLIENT_ERROR <msg>`.
    ClientError(&'a [u8]),
    /// `SERVER_ERROR <msg>`.
    ServerError(&'a [u8]),
    /// `VERSION <banner>`.
    Version(&'a [u8]),
    /// Counter reply from incr/decr: the new value.
    Numeric(u64),
}

/// Classify one reply line. `line` must include the trailing CRLF.
pub fn parse_line(line: &[u8]) -> Result<Line<'_>, ParseError> {
    let body = line
        .strip_suffix(b"\r\n")
        .ok_or(ParseError::Protocol("response line not CRLF terminated"))?;

    match body {
        b"STORED" => return Ok(Line::Stored),
        b"NOT_STORED" => return Ok(Line::NotStored),
        b"EXISTS" => return Ok(Line::Exists),
        b"NOT_FOUND" => return Ok(Line::NotFound),
        b"DELETED" => return Ok(Line::Deleted),
        b"TOUCHED" => return Ok(Line::Touched),
        b"OK" => return Ok(Line::Ok),
        b"END" => return Ok(Line::End),
        b"ERROR" => return Ok(Line::Error),
        _ => {}
    }

    if let Some(msg) = body.strip_prefix(b"CLIENT_ERROR ".as_slice()) {
        return Ok(Line::ClientError(msg));
    }
    if let Some(msg) = body.strip_prefix(b"SERVER_ERROR ".as_slice()) {
        return Ok(Line::ServerError(msg));
    }
    if let Some(banner) = body.strip_prefix(b"VERSION ".as_slice()) {
        return Ok(Line::Version(banner));
    }
    if let Some(rest) = body.strip_prefix(b"VALUE ".as_slice()) {
        return parse_value_header(rest).map(Line::Value);
    }
    if !body.is_empty() && body.iter().all(u8::is_ascii_digit) {
        return Ok(Line::Numeric(parse_u64(body)?));
    }

    Err(ParseError::UnexpectedLine(
        String::from_utf8_lossy(body).into_owned(),
    ))
}

/// Parse the fields after the `VALUE ` prefix.
fn parse_value_header(rest: &[u8]) -> Result<ValueHeader<'_>, ParseError> {
    let mut fields = rest.split(|&b| b == b' ');

    let key = fields
        .next()
        .filter(|key| !key.is_empty())
        .ok_or(ParseError::Protocol("VALUE line missing key"))?;
    let flags = fields
        .next()
        .ok_or(ParseError::Protocol("VALUE line missing flags"))
        .and_then(parse_u32)?;
    let len = fields
        .next()
        .ok_or(ParseError::Protocol("VALUE line missing length"))
        .and_then(parse_u64)? as usize;
    let cas = match fields.next() {
        Some(field) => Some(parse_u64(field)?),
        None => None,
    };
    if fields.next().is_some() {
        return Err(ParseError::Protocol("VALUE line has trailing fields"));
    }

    Ok(ValueHeader {
        key,
        flags,
        len,
        cas,
    })
}

fn parse_u64(field: &[u8]) -> Result<u64, ParseError> {
    if field.is_empty() {
        return Err(ParseError::InvalidNumber);
    }
    let mut value: u64 = 0;
    for &byte in field {
        if !byte.is_ascii_digit() {
            return Err(ParseError::InvalidNumber);
        }
        value = value
            .checked_mul(10)
            .and_then(|value| value.checked_add(u64::from(byte - b'0')))
            .ok_or(ParseError::InvalidNumber)?;
    }
    Ok(value)
}

fn parse_u32(field: &[u8]) -> Result<u32, ParseError> {
    parse_u64(field)?
        .try_into()
        .map_err(|_| ParseError::InvalidNumber)
}
