//! The length-prefixed binary protocol driver.
//!
//! Every exchange is one request packet and one response packet. Status
//! codes map onto the public error taxonomy here; the conditional-store
//! quirk (KeyExists for a failed Add/Replace) is left for the dispatcher
//! to translate so protocol statuses never leak upward.

use std::io::{Read, Write};

use bytes::Bytes;
use memfleet_proto::binary::{Opcode, Request, Response, ResponseHeader, Status, HEADER_SIZE};
use tracing::debug;

use super::Driver;
use crate::item::{Item, Verb};
use crate::pool::Entry;
use crate::Error;

pub(crate) const PROTO_TYPE: &str = "binary";

/// Counter expiration sentinel: do not create the key if it is missing,
/// so a miss surfaces as KeyNotFound instead of a silent create.
const COUNTER_NO_CREATE: u32 = 0xFFFF_FFFF;

#[derive(Debug, Default)]
pub(crate) struct BinaryDriver;

impl BinaryDriver {
    /// One request/response exchange. Non-OK statuses come back as the
    /// mapped taxonomy error.
    fn send_recv(&self, conn: &mut Entry, request: &Request<'_>) -> Result<Response, Error> {
        let mut buf = Vec::with_capacity(request.encoded_len());
        request.encode_into(&mut buf);
        conn.writer.write_all(&buf)?;
        conn.writer.flush()?;

        let mut head = [0u8; HEADER_SIZE];
        conn.reader.read_exact(&mut head)?;
        let header = ResponseHeader::parse(&head)?;
        let mut body = vec![0u8; header.total_body_length as usize];
        conn.reader.read_exact(&mut body)?;
        let response = Response::from_parts(header, body)?;

        status_error(response.status())?;
        Ok(response)
    }

    fn get_one(&self, conn: &mut Entry, key: &str) -> Result<Item, Error> {
        let mut request = Request::new(Opcode::Get);
        request.key = key.as_bytes();
        let response = self.send_recv(conn, &request)?;
        Ok(Item {
            key: key.to_owned(),
            value: Bytes::copy_from_slice(response.value()),
            flags: response.flags().unwrap_or(0),
            expiration: 0,
            cas_id: response.cas(),
        })
    }

    fn auth_list(&self, conn: &mut Entry) -> Result<String, Error> {
        let request = Request::new(Opcode::AuthList);
        let response = self.send_recv(conn, &request)?;
        Ok(String::from_utf8_lossy(response.value()).into_owned())
    }
}

impl Driver for BinaryDriver {
    fn proto_type(&self) -> &'static str {
        PROTO_TYPE
    }

    fn supports_touch(&self) -> bool {
        true
    }

    fn is_auth_supported(&self) -> bool {
        true
    }

    fn auth(&self, conn: &mut Entry, username: &str, password: &str) -> Result<(), Error> {
        let mechanisms = self.auth_list(conn)?;
        if !mechanisms
            .split_ascii_whitespace()
            .any(|mechanism| mechanism == "PLAIN")
        {
            return Err(Error::Protocol(format!(
                "server offers no PLAIN authentication, only {mechanisms:?}"
            )));
        }

        debug!("starting SASL PLAIN handshake");
        let mut credential = Vec::with_capacity(username.len() + password.len() + 2);
        credential.push(0);
        credential.extend_from_slice(username.as_bytes());
        credential.push(0);
        credential.extend_from_slice(password.as_bytes());

        let mut request = Request::new(Opcode::AuthStart);
        request.key = b"PLAIN";
        request.value = &credential;
        self.send_recv(conn, &request).map(drop)
    }

    fn legal_key(&self, _key: &str) -> bool {
        // The binary protocol length-prefixes keys; no client-side
        // restriction beyond the dispatcher's empty-key check.
        true
    }

    fn get(
        &self,
        conn: &mut Entry,
        keys: &[&str],
        sink: &mut dyn FnMut(Item),
    ) -> Result<(), Error> {
        for key in keys {
            match self.get_one(conn, key) {
                Ok(item) => sink(item),
                Err(Error::CacheMiss) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn populate(&self, conn: &mut Entry, verb: Verb, item: &Item) -> Result<(), Error> {
        let opcode = match verb {
            // CAS rides the SET opcode with the token in the header.
            Verb::Set | Verb::Cas => Opcode::Set,
            Verb::Add => Opcode::Add,
            Verb::Replace => Opcode::Replace,
            Verb::Incr | Verb::Decr => return Err(Error::InvalidArgs),
        };

        let mut extras = [0u8; 8];
        extras[..4].copy_from_slice(&item.flags.to_be_bytes());
        extras[4..].copy_from_slice(&(item.expiration as u32).to_be_bytes());

        let mut request = Request::new(opcode);
        request.extras = &extras;
        request.key = item.key.as_bytes();
        request.value = &item.value;
        if verb == Verb::Cas {
            request.cas = item.cas_id;
        }
        self.send_recv(conn, &request).map(drop)
    }

    fn delete(&self, conn: &mut Entry, key: &str) -> Result<(), Error> {
        let mut request = Request::new(Opcode::Delete);
        request.key = key.as_bytes();
        self.send_recv(conn, &request).map(drop)
    }

    fn delete_all(&self, conn: &mut Entry) -> Result<(), Error> {
        self.flush_all(conn)
    }

    fn flush_all(&self, conn: &mut Entry) -> Result<(), Error> {
        self.send_recv(conn, &Request::new(Opcode::Flush)).map(drop)
    }

    fn touch(&self, conn: &mut Entry, keys: &[&str], expiration: i32) -> Result<(), Error> {
        let extras = (expiration as u32).to_be_bytes();
        for key in keys {
            let mut request = Request::new(Opcode::Touch);
            request.extras = &extras;
            request.key = key.as_bytes();
            self.send_recv(conn, &request)?;
        }
        Ok(())
    }

    fn incr_decr(
        &self,
        conn: &mut Entry,
        verb: Verb,
        key: &str,
        delta: u64,
    ) -> Result<u64, Error> {
        let opcode = match verb {
            Verb::Incr => Opcode::Increment,
            Verb::Decr => Opcode::Decrement,
            _ => return Err(Error::InvalidArgs),
        };

        // delta ∥ initial ∥ expiration; initial stays zero because the
        // expiration sentinel forbids creation anyway.
        let mut extras = [0u8; 20];
        extras[..8].copy_from_slice(&delta.to_be_bytes());
        extras[16..].copy_from_slice(&COUNTER_NO_CREATE.to_be_bytes());

        let mut request = Request::new(opcode);
        request.extras = &extras;
        request.key = key.as_bytes();
        let response = self.send_recv(conn, &request)?;
        Ok(response.counter_value()?)
    }

    fn ping(&self, conn: &mut Entry) -> Result<(), Error> {
        self.send_recv(conn, &Request::new(Opcode::Version)).map(drop)
    }
}

/// Map a response status onto the public taxonomy.
fn status_error(status: Status) -> Result<(), Error> {
    match status {
        Status::NoError => Ok(()),
        Status::KeyNotFound => Err(Error::CacheMiss),
        Status::KeyExists => Err(Error::CasConflict),
        Status::ValueTooLarge => Err(Error::ValueTooLarge),
        Status::InvalidArguments => Err(Error::InvalidArgs),
        Status::ItemNotStored => Err(Error::ValueNotStored),
        Status::NonNumericValue => Err(Error::NonNumeric),
        Status::AuthRequired => Err(Error::AuthRequired),
        Status::AuthContinue => Err(Error::AuthContinue),
        Status::UnknownCommand => Err(Error::UnknownCommand),
        Status::OutOfMemory => Err(Error::OutOfMemory),
        Status::Other(_) => Err(Error::UnknownError),
    }
}
