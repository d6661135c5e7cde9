//! The line-oriented text protocol driver.
//!
//! Retrieval always uses `gets` so every item comes back with a CAS token.
//! Touch and authentication are not part of this driver's surface; callers
//! gate on the capability probes.

use std::io::{Read, Write};

use bytes::Bytes;
use memfleet_proto::text::{parse_line, Line};

use super::{lossy, unexpected_line, Driver};
use crate::item::{Item, Verb};
use crate::pool::Entry;
use crate::Error;

pub(crate) const PROTO_TYPE: &str = "text";

#[derive(Debug, Default)]
pub(crate) struct TextDriver;

impl Driver for TextDriver {
    fn proto_type(&self) -> &'static str {
        PROTO_TYPE
    }

    fn supports_touch(&self) -> bool {
        false
    }

    fn is_auth_supported(&self) -> bool {
        false
    }

    fn auth(&self, _conn: &mut Entry, _username: &str, _password: &str) -> Result<(), Error> {
        Err(Error::Unsupported("authentication"))
    }

    fn legal_key(&self, key: &str) -> bool {
        legal_key(key)
    }

    fn get(
        &self,
        conn: &mut Entry,
        keys: &[&str],
        sink: &mut dyn FnMut(Item),
    ) -> Result<(), Error> {
        let mut command =
            String::with_capacity(6 + keys.iter().map(|key| key.len() + 1).sum::<usize>());
        command.push_str("gets");
        for key in keys {
            command.push(' ');
            command.push_str(key);
        }
        command.push_str("\r\n");
        conn.writer.write_all(command.as_bytes())?;
        conn.writer.flush()?;

        loop {
            let line = conn.read_line()?;
            match parse_line(&line)? {
                Line::End => return Ok(()),
                Line::Value(header) => {
                    let key = std::str::from_utf8(header.key)
                        .map_err(|_| Error::Protocol("non-UTF-8 key in VALUE line".into()))?
                        .to_owned();
                    let mut payload = vec![0u8; header.len + 2];
                    conn.reader.read_exact(&mut payload)?;
                    if !payload.ends_with(b"\r\n") {
                        return Err(Error::Protocol("corrupt get result read".into()));
                    }
                    payload.truncate(header.len);
                    sink(Item {
                        key,
                        value: Bytes::from(payload),
                        flags: header.flags,
                        expiration: 0,
                        cas_id: header.cas.unwrap_or(0),
                    });
                }
                Line::ServerError(msg) => return Err(Error::Server(lossy(msg))),
                _ => return Err(unexpected_line("gets", &line)),
            }
        }
    }

    fn populate(&self, conn: &mut Entry, verb: Verb, item: &Item) -> Result<(), Error> {
        if verb == Verb::Cas {
            write!(
                conn.writer,
                "{} {} {} {} {} {}\r\n",
                verb,
                item.key,
                item.flags,
                item.expiration,
                item.value.len(),
                item.cas_id,
            )?;
        } else {
            write!(
                conn.writer,
                "{} {} {} {} {}\r\n",
                verb,
                item.key,
                item.flags,
                item.expiration,
                item.value.len(),
            )?;
        }
        conn.writer.write_all(&item.value)?;
        conn.writer.write_all(b"\r\n")?;
        conn.writer.flush()?;

        let line = conn.read_line()?;
        match parse_line(&line)? {
            Line::Stored => Ok(()),
            Line::NotStored => Err(Error::NotStored),
            Line::Exists => Err(Error::CasConflict),
            Line::NotFound => Err(Error::CacheMiss),
            Line::ServerError(msg) => Err(Error::Server(lossy(msg))),
            _ => Err(unexpected_line(verb.as_str(), &line)),
        }
    }

    fn delete(&self, conn: &mut Entry, key: &str) -> Result<(), Error> {
        write_expect(conn, format!("delete {key}\r\n"), Line::Deleted)
    }

    fn delete_all(&self, conn: &mut Entry) -> Result<(), Error> {
        // Some servers answer flush with DELETED rather than OK; accept both.
        write_expect(conn, "flush_all\r\n".to_owned(), Line::Deleted)
    }

    fn flush_all(&self, conn: &mut Entry) -> Result<(), Error> {
        write_expect(conn, "flush_all\r\n".to_owned(), Line::Ok)
    }

    fn touch(&self, _conn: &mut Entry, _keys: &[&str], _expiration: i32) -> Result<(), Error> {
        Err(Error::Unsupported("touch"))
    }

    fn incr_decr(
        &self,
        conn: &mut Entry,
        verb: Verb,
        key: &str,
        delta: u64,
    ) -> Result<u64, Error> {
        write!(conn.writer, "{verb} {key} {delta}\r\n")?;
        conn.writer.flush()?;

        let line = conn.read_line()?;
        match parse_line(&line)? {
            Line::Numeric(value) => Ok(value),
            Line::NotFound => Err(Error::CacheMiss),
            Line::ClientError(msg) => Err(Error::Client(lossy(msg))),
            Line::ServerError(msg) => Err(Error::Server(lossy(msg))),
            _ => Err(unexpected_line(verb.as_str(), &line)),
        }
    }

    fn ping(&self, conn: &mut Entry) -> Result<(), Error> {
        conn.writer.write_all(b"version\r\n")?;
        conn.writer.flush()?;

        let line = conn.read_line()?;
        match parse_line(&line)? {
            Line::Version(_) => Ok(()),
            _ => Err(unexpected_line("version", &line)),
        }
    }
}

/// Send one command line and match the single-line reply: the expected
/// line or `OK` succeed, the conditional-store refusals map to their
/// semantic errors, anything else is a protocol error.
fn write_expect(conn: &mut Entry, command: String, expect: Line<'static>) -> Result<(), Error> {
    conn.writer.write_all(command.as_bytes())?;
    conn.writer.flush()?;

    let line = conn.read_line()?;
    let parsed = parse_line(&line)?;
    if parsed == expect {
        return Ok(());
    }
    match parsed {
        Line::Ok => Ok(()),
        Line::NotStored => Err(Error::NotStored),
        Line::Exists => Err(Error::CasConflict),
        Line::NotFound => Err(Error::CacheMiss),
        Line::ServerError(msg) => Err(Error::Server(lossy(msg))),
        _ => Err(unexpected_line(command.trim_end(), &line)),
    }
}

/// Text-protocol key legality: at most 250 bytes, no byte ≤ 0x20, no DEL.
pub(crate) fn legal_key(key: &str) -> bool {
    if key.is_empty() || key.len() > 250 {
        return false;
    }
    key.bytes().all(|byte| byte > 0x20 && byte != 0x7F)
}
