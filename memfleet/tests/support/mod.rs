//! In-process mock memcached servers.
//!
//! Each server binds `127.0.0.1:0`, serves one thread per connection over
//! a shared in-memory store, and counts accepted sockets so tests can
//! assert pool behavior. Expiry is not modelled; TTL semantics belong to
//! the live-server suite.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use memfleet_proto::binary::{Opcode, RequestHeader, ResponseHeader, Status, HEADER_SIZE};

#[derive(Clone)]
struct Stored {
    value: Vec<u8>,
    flags: u32,
    cas: u64,
}

#[derive(Default)]
struct Store {
    items: Mutex<HashMap<String, Stored>>,
    cas_counter: AtomicU64,
}

impl Store {
    fn next_cas(&self) -> u64 {
        self.cas_counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

pub struct MockServer {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
}

impl MockServer {
    pub fn target(&self) -> String {
        self.addr.to_string()
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

fn spawn<F>(handler: F) -> MockServer
where
    F: Fn(TcpStream) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    let handler = Arc::new(handler);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            counter.fetch_add(1, Ordering::SeqCst);
            let handler = handler.clone();
            thread::spawn(move || (*handler)(stream));
        }
    });
    MockServer { addr, accepted }
}

/// A server that accepts and reads but never responds, for timeout tests.
pub fn spawn_sink() -> MockServer {
    spawn(|mut stream| {
        let mut buf = [0u8; 1024];
        while matches!(stream.read(&mut buf), Ok(n) if n > 0) {}
    })
}

// ---------------------------------------------------------------------------
// Text protocol
// ---------------------------------------------------------------------------

pub fn spawn_text() -> MockServer {
    let store = Arc::new(Store::default());
    spawn(move |stream| text_conn(stream, store.clone()))
}

fn text_conn(stream: TcpStream, store: Arc<Store>) {
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(clone) => clone,
        Err(_) => return,
    });
    let mut writer = stream;

    loop {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let text = String::from_utf8_lossy(&line).into_owned();
        let text = text.trim_end_matches(['\r', '\n']).to_owned();
        let fields: Vec<&str> = text.split(' ').collect();

        let reply = match fields.as_slice() {
            ["gets", keys @ ..] => {
                let items = store.items.lock().unwrap();
                let mut out = Vec::new();
                for key in keys {
                    if let Some(stored) = items.get(*key) {
                        out.extend_from_slice(
                            format!(
                                "VALUE {} {} {} {}\r\n",
                                key,
                                stored.flags,
                                stored.value.len(),
                                stored.cas
                            )
                            .as_bytes(),
                        );
                        out.extend_from_slice(&stored.value);
                        out.extend_from_slice(b"\r\n");
                    }
                }
                out.extend_from_slice(b"END\r\n");
                out
            }
            [verb @ ("set" | "add" | "replace" | "cas"), key, flags, _exp, bytes, rest @ ..] => {
                let size: usize = match bytes.parse() {
                    Ok(size) => size,
                    Err(_) => return,
                };
                let mut payload = vec![0u8; size + 2];
                if reader.read_exact(&mut payload).is_err() {
                    return;
                }
                payload.truncate(size);
                let flags: u32 = flags.parse().unwrap_or(0);

                let mut items = store.items.lock().unwrap();
                let present = items.contains_key(*key);
                let stored = Stored {
                    value: payload,
                    flags,
                    cas: store.next_cas(),
                };
                match *verb {
                    "set" => {
                        items.insert((*key).to_owned(), stored);
                        b"STORED\r\n".to_vec()
                    }
                    "add" if present => b"NOT_STORED\r\n".to_vec(),
                    "add" => {
                        items.insert((*key).to_owned(), stored);
                        b"STORED\r\n".to_vec()
                    }
                    "replace" if !present => b"NOT_STORED\r\n".to_vec(),
                    "replace" => {
                        items.insert((*key).to_owned(), stored);
                        b"STORED\r\n".to_vec()
                    }
                    "cas" => {
                        let given: u64 =
                            rest.first().and_then(|token| token.parse().ok()).unwrap_or(0);
                        let current = items.get(*key).map(|stored| stored.cas);
                        match current {
                            None => b"NOT_FOUND\r\n".to_vec(),
                            Some(cas) if cas != given => b"EXISTS\r\n".to_vec(),
                            Some(_) => {
                                items.insert((*key).to_owned(), stored);
                                b"STORED\r\n".to_vec()
                            }
                        }
                    }
                    _ => b"ERROR\r\n".to_vec(),
                }
            }
            ["delete", key] => {
                if store.items.lock().unwrap().remove(*key).is_some() {
                    b"DELETED\r\n".to_vec()
                } else {
                    b"NOT_FOUND\r\n".to_vec()
                }
            }
            [verb @ ("incr" | "decr"), key, delta] => {
                let delta: u64 = delta.parse().unwrap_or(0);
                let mut items = store.items.lock().unwrap();
                match items.get_mut(*key) {
                    None => b"NOT_FOUND\r\n".to_vec(),
                    Some(stored) => {
                        let current = std::str::from_utf8(&stored.value)
                            .ok()
                            .and_then(|text| text.parse::<u64>().ok());
                        match current {
                            None => {
                                b"CLIENT_ERROR cannot increment or decrement non-numeric value\r\n"
                                    .to_vec()
                            }
                            Some(current) => {
                                let next = if *verb == "incr" {
                                    current.wrapping_add(delta)
                                } else {
                                    current.saturating_sub(delta)
                                };
                                stored.value = next.to_string().into_bytes();
                                format!("{next}\r\n").into_bytes()
                            }
                        }
                    }
                }
            }
            ["flush_all"] => {
                store.items.lock().unwrap().clear();
                b"OK\r\n".to_vec()
            }
            ["version"] => b"VERSION 1.6.0-mock\r\n".to_vec(),
            _ => b"ERROR\r\n".to_vec(),
        };

        if writer.write_all(&reply).is_err() {
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Binary protocol
// ---------------------------------------------------------------------------

pub struct BinaryOptions {
    /// Require SASL-PLAIN with these credentials before data commands.
    pub credentials: Option<(String, String)>,
    /// Mechanism list advertised by AUTH_LIST.
    pub mechanisms: &'static str,
    /// Answer counters with 4-byte values to provoke framing errors.
    pub four_byte_counters: bool,
}

impl Default for BinaryOptions {
    fn default() -> Self {
        BinaryOptions {
            credentials: None,
            mechanisms: "PLAIN",
            four_byte_counters: false,
        }
    }
}

pub fn spawn_binary() -> MockServer {
    spawn_binary_with(BinaryOptions::default())
}

pub fn spawn_binary_with(options: BinaryOptions) -> MockServer {
    let store = Arc::new(Store::default());
    let options = Arc::new(options);
    spawn(move |stream| binary_conn(stream, store.clone(), options.clone()))
}

fn respond(
    stream: &mut TcpStream,
    opcode: Opcode,
    status: Status,
    cas: u64,
    extras: &[u8],
    value: &[u8],
) -> std::io::Result<()> {
    let mut header = ResponseHeader::new(opcode, status);
    header.extras_length = extras.len() as u8;
    header.total_body_length = (extras.len() + value.len()) as u32;
    header.cas = cas;
    let mut head = [0u8; HEADER_SIZE];
    header.encode(&mut head);
    stream.write_all(&head)?;
    stream.write_all(extras)?;
    stream.write_all(value)
}

fn binary_conn(mut stream: TcpStream, store: Arc<Store>, options: Arc<BinaryOptions>) {
    let mut authed = options.credentials.is_none();

    loop {
        let mut head = [0u8; HEADER_SIZE];
        if stream.read_exact(&mut head).is_err() {
            return;
        }
        let Ok(header) = RequestHeader::parse(&head) else {
            return;
        };
        let mut body = vec![0u8; header.total_body_length as usize];
        if stream.read_exact(&mut body).is_err() {
            return;
        }
        let extras_len = header.extras_length as usize;
        let key_len = header.key_length as usize;
        let extras = body[..extras_len].to_vec();
        let key = String::from_utf8_lossy(&body[extras_len..extras_len + key_len]).into_owned();
        let value = body[extras_len + key_len..].to_vec();

        if !authed && !matches!(header.opcode, Opcode::AuthList | Opcode::AuthStart) {
            if respond(&mut stream, header.opcode, Status::AuthRequired, 0, &[], &[]).is_err() {
                return;
            }
            continue;
        }

        let outcome = match header.opcode {
            Opcode::Get => {
                let items = store.items.lock().unwrap();
                match items.get(&key) {
                    Some(stored) => {
                        let flags = stored.flags.to_be_bytes();
                        respond(
                            &mut stream,
                            header.opcode,
                            Status::NoError,
                            stored.cas,
                            &flags,
                            &stored.value,
                        )
                    }
                    None => respond(&mut stream, header.opcode, Status::KeyNotFound, 0, &[], &[]),
                }
            }
            Opcode::Set | Opcode::Add | Opcode::Replace => {
                let flags = u32::from_be_bytes(extras[..4].try_into().unwrap());
                let mut items = store.items.lock().unwrap();
                let current = items.get(&key).map(|stored| stored.cas);
                let status = match (header.opcode, current, header.cas) {
                    // Conditional-store failures signal via KeyExists.
                    (Opcode::Add, Some(_), _) => Status::KeyExists,
                    (Opcode::Replace, None, _) => Status::KeyExists,
                    (Opcode::Set, Some(cas), given) if given != 0 && given != cas => {
                        Status::KeyExists
                    }
                    (Opcode::Set, None, given) if given != 0 => Status::KeyNotFound,
                    _ => Status::NoError,
                };
                if status == Status::NoError {
                    let cas = store.next_cas();
                    items.insert(
                        key.clone(),
                        Stored {
                            value: value.clone(),
                            flags,
                            cas,
                        },
                    );
                    respond(&mut stream, header.opcode, Status::NoError, cas, &[], &[])
                } else {
                    respond(&mut stream, header.opcode, status, 0, &[], &[])
                }
            }
            Opcode::Delete => {
                let status = if store.items.lock().unwrap().remove(&key).is_some() {
                    Status::NoError
                } else {
                    Status::KeyNotFound
                };
                respond(&mut stream, header.opcode, status, 0, &[], &[])
            }
            Opcode::Flush => {
                store.items.lock().unwrap().clear();
                respond(&mut stream, header.opcode, Status::NoError, 0, &[], &[])
            }
            Opcode::Version => respond(
                &mut stream,
                header.opcode,
                Status::NoError,
                0,
                &[],
                b"1.6.0-mock",
            ),
            Opcode::Touch => {
                let status = if store.items.lock().unwrap().contains_key(&key) {
                    Status::NoError
                } else {
                    Status::KeyNotFound
                };
                respond(&mut stream, header.opcode, status, 0, &[], &[])
            }
            Opcode::Increment | Opcode::Decrement => {
                let delta = u64::from_be_bytes(extras[..8].try_into().unwrap());
                let initial = u64::from_be_bytes(extras[8..16].try_into().unwrap());
                let expiration = u32::from_be_bytes(extras[16..20].try_into().unwrap());
                let mut items = store.items.lock().unwrap();
                let current = items.get(&key).map(|stored| stored.value.clone());
                match current {
                    None if expiration == 0xFFFF_FFFF => {
                        respond(&mut stream, header.opcode, Status::KeyNotFound, 0, &[], &[])
                    }
                    None => {
                        let cas = store.next_cas();
                        items.insert(
                            key.clone(),
                            Stored {
                                value: initial.to_string().into_bytes(),
                                flags: 0,
                                cas,
                            },
                        );
                        respond(
                            &mut stream,
                            header.opcode,
                            Status::NoError,
                            cas,
                            &[],
                            &initial.to_be_bytes(),
                        )
                    }
                    Some(value) => {
                        let numeric = std::str::from_utf8(&value)
                            .ok()
                            .and_then(|text| text.parse::<u64>().ok());
                        match numeric {
                            None => respond(
                                &mut stream,
                                header.opcode,
                                Status::NonNumericValue,
                                0,
                                &[],
                                &[],
                            ),
                            Some(current) => {
                                let next = if header.opcode == Opcode::Increment {
                                    current.wrapping_add(delta)
                                } else {
                                    current.saturating_sub(delta)
                                };
                                let cas = store.next_cas();
                                items.insert(
                                    key.clone(),
                                    Stored {
                                        value: next.to_string().into_bytes(),
                                        flags: 0,
                                        cas,
                                    },
                                );
                                if options.four_byte_counters {
                                    respond(
                                        &mut stream,
                                        header.opcode,
                                        Status::NoError,
                                        cas,
                                        &[],
                                        &(next as u32).to_be_bytes(),
                                    )
                                } else {
                                    respond(
                                        &mut stream,
                                        header.opcode,
                                        Status::NoError,
                                        cas,
                                        &[],
                                        &next.to_be_bytes(),
                                    )
                                }
                            }
                        }
                    }
                }
            }
            Opcode::AuthList => respond(
                &mut stream,
                header.opcode,
                Status::NoError,
                0,
                &[],
                options.mechanisms.as_bytes(),
            ),
            Opcode::AuthStart => match &options.credentials {
                None => {
                    authed = true;
                    respond(&mut stream, header.opcode, Status::NoError, 0, &[], &[])
                }
                Some((username, password)) => {
                    let mut expected = Vec::new();
                    expected.push(0);
                    expected.extend_from_slice(username.as_bytes());
                    expected.push(0);
                    expected.extend_from_slice(password.as_bytes());
                    if key == "PLAIN" && value == expected {
                        authed = true;
                        respond(&mut stream, header.opcode, Status::NoError, 0, &[], &[])
                    } else {
                        respond(&mut stream, header.opcode, Status::AuthRequired, 0, &[], &[])
                    }
                }
            },
            _ => respond(&mut stream, header.opcode, Status::UnknownCommand, 0, &[], &[]),
        };

        if outcome.is_err() {
            return;
        }
    }
}
