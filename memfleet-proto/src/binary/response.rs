//! Response body carving.

use super::header::ResponseHeader;
use crate::ParseError;

/// A received response: the parsed header plus the raw body, with
/// accessors that carve the body into extras, key, and value using the
/// header's declared lengths.
#[derive(Debug, Clone)]
pub struct Response {
    header: ResponseHeader,
    body: Vec<u8>,
}

impl Response {
    /// Assemble a response, validating the body against the header.
    pub fn from_parts(header: ResponseHeader, body: Vec<u8>) -> Result<Self, ParseError> {
        if body.len() != header.total_body_length as usize {
            return Err(ParseError::BadFrame(format!(
                "body length {} does not match declared {}",
                body.len(),
                header.total_body_length
            )));
        }
        if header.extras_length as usize + header.key_length as usize > body.len() {
            return Err(ParseError::BadFrame(format!(
                "extras {} + key {} exceed body {}",
                header.extras_length,
                header.key_length,
                body.len()
            )));
        }
        Ok(Self { header, body })
    }

    pub fn header(&self) -> &ResponseHeader {
        &self.header
    }

    pub fn status(&self) -> super::Status {
        self.header.status
    }

    pub fn cas(&self) -> u64 {
        self.header.cas
    }

    pub fn extras(&self) -> &[u8] {
        &self.body[..self.header.extras_length as usize]
    }

    pub fn key(&self) -> &[u8] {
        let start = self.header.extras_length as usize;
        &self.body[start..start + self.header.key_length as usize]
    }

    pub fn value(&self) -> &[u8] {
        &self.body[self.header.extras_length as usize + self.header.key_length as usize..]
    }

    /// The 4-byte flags extras of a GET response, when present.
    pub fn flags(&self) -> Option<u32> {
        let extras = self.extras();
        if extras.len() < 4 {
            return None;
        }
        Some(u32::from_be_bytes([extras[0], extras[1], extras[2], extras[3]]))
    }

    /// The 8-byte big-endian counter value of an incr/decr response.
    ///
    /// A value of any other length is a framing error, never a silent zero.
    pub fn counter_value(&self) -> Result<u64, ParseError> {
        let value = self.value();
        let bytes: [u8; 8] = value.try_into().map_err(|_| {
            ParseError::BadFrame(format!("counter value is {} bytes, want 8", value.len()))
        })?;
        Ok(u64::from_be_bytes(bytes))
    }
}
