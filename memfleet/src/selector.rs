//! Key → endpoint mapping.
//!
//! The selector holds an ordered, immutable endpoint list and routes each
//! key with `crc32(key) mod len`, so every client process with the same
//! server list converges on the same shard assignment. Callers that need
//! to rotate endpoints construct a fresh client.

use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
#[cfg(unix)]
use std::path::PathBuf;

use crate::Error;

/// A resolved server address. Equality and hashing follow the canonical
/// address, so one endpoint owns exactly one pool free list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Tcp(SocketAddr),
    #[cfg(unix)]
    Unix(PathBuf),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "{addr}"),
            #[cfg(unix)]
            Endpoint::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

/// An immutable list of endpoints with deterministic key routing.
#[derive(Debug, Clone)]
pub struct ServerList {
    endpoints: Vec<Endpoint>,
}

impl ServerList {
    /// Resolve the given server strings. Strings containing `/` are local
    /// stream-socket paths; everything else resolves as `host:port` (the
    /// first resolved address wins).
    pub fn new<S: AsRef<str>>(servers: &[S]) -> Result<Self, Error> {
        let mut endpoints = Vec::with_capacity(servers.len());
        for server in servers {
            endpoints.push(resolve(server.as_ref())?);
        }
        Ok(ServerList { endpoints })
    }

    /// The endpoint owning `key`. Returns [`Error::NoServers`] when the
    /// list is empty.
    pub fn pick_server(&self, key: &[u8]) -> Result<&Endpoint, Error> {
        match self.endpoints.len() {
            0 => Err(Error::NoServers),
            1 => Ok(&self.endpoints[0]),
            n => Ok(&self.endpoints[crc32fast::hash(key) as usize % n]),
        }
    }

    /// All endpoints, in configuration order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }
}

fn resolve(server: &str) -> Result<Endpoint, Error> {
    #[cfg(unix)]
    if server.contains('/') {
        return Ok(Endpoint::Unix(PathBuf::from(server)));
    }

    let addr = server
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no addresses resolved for {server:?}"),
            ))
        })?;
    Ok(Endpoint::Tcp(addr))
}
