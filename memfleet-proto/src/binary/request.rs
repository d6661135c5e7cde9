//! Client-side request packet encoding.

use super::header::{Opcode, RequestHeader, HEADER_SIZE};

/// One request packet: the header fields the client controls plus the
/// three body parts. Lengths are computed from the parts at encode time.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub opcode: Opcode,
    pub cas: u64,
    pub opaque: u32,
    pub extras: &'a [u8],
    pub key: &'a [u8],
    pub value: &'a [u8],
}

impl<'a> Request<'a> {
    /// A request with an empty body and zeroed CAS/opaque.
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            cas: 0,
            opaque: 0,
            extras: &[],
            key: &[],
            value: &[],
        }
    }

    /// Total size of the encoded packet.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.extras.len() + self.key.len() + self.value.len()
    }

    /// Append the packet (header ∥ extras ∥ key ∥ value) to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let mut header = RequestHeader::new(self.opcode);
        header.key_length = self.key.len() as u16;
        header.extras_length = self.extras.len() as u8;
        header.total_body_length =
            (self.extras.len() + self.key.len() + self.value.len()) as u32;
        header.opaque = self.opaque;
        header.cas = self.cas;

        let mut head = [0u8; HEADER_SIZE];
        header.encode(&mut head);
        buf.reserve(self.encoded_len());
        buf.extend_from_slice(&head);
        buf.extend_from_slice(self.extras);
        buf.extend_from_slice(self.key);
        buf.extend_from_slice(self.value);
    }
}
