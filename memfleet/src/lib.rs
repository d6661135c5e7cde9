//! Synchronous memcached client for a fleet of servers.
//!
//! Keys are routed to endpoints with CRC-32 hashing so every client
//! process with the same server list converges on the same shard
//! assignment. Connections are pooled per endpoint with a bounded idle
//! list, deadline-driven I/O, and transparent redial. Two interchangeable
//! wire drivers — the line-oriented text protocol and the 24-byte-header
//! binary protocol (with SASL-PLAIN) — sit behind one command surface.
//!
//! # Example
//!
//! ```no_run
//! use memfleet::{Client, Item};
//!
//! fn main() -> Result<(), memfleet::Error> {
//!     let client = Client::text(&["127.0.0.1:11211"])?;
//!
//!     client.set(&Item::new("greeting", "hello world"))?;
//!     let item = client.get("greeting")?;
//!     assert_eq!(&item.value[..], b"hello world");
//!     assert_ne!(item.cas_id, 0);
//!     Ok(())
//! }
//! ```
//!
//! Misses, conflicts, and the other semantic outcomes are [`Error`]
//! variants; match on them rather than treating every error as fatal:
//!
//! ```no_run
//! use memfleet::{Client, Error};
//!
//! fn lookup(client: &Client, key: &str) -> Result<Option<Vec<u8>>, Error> {
//!     match client.get(key) {
//!         Ok(item) => Ok(Some(item.value.to_vec())),
//!         Err(Error::CacheMiss) => Ok(None),
//!         Err(err) => Err(err),
//!     }
//! }
//! ```

mod client;
mod config;
mod driver;
mod error;
mod item;
mod pool;
mod selector;

pub use client::Client;
pub use config::{
    Config, Protocol, DEFAULT_AUTH_TIMEOUT, DEFAULT_DIAL_TIMEOUT, DEFAULT_MAX_IDLE_PER_ADDR,
    DEFAULT_TIMEOUT,
};
pub use error::Error;
pub use item::{Item, Verb};
pub use selector::{Endpoint, ServerList};
