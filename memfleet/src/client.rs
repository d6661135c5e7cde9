//! The client dispatcher.
//!
//! Every per-item operation runs the same pipeline: validate the key,
//! select the endpoint, acquire a pooled connection, authenticate if the
//! connection is fresh, arm the per-operation deadline, run the protocol
//! exchange, and hand the connection back — to the free list on a clean
//! outcome, to the closer on a transport or framing failure.

use std::collections::HashMap;
use std::time::Duration;

use crate::config::{Config, Protocol};
use crate::driver::{BinaryDriver, Driver, TextDriver};
use crate::item::{Item, Verb};
use crate::pool::{Entry, Pool};
use crate::selector::{Endpoint, ServerList};
use crate::Error;

/// A memcached client over a fixed fleet of servers.
///
/// All methods take `&self`; the client is safe to share across threads
/// (typically behind an `Arc`). Commands on one connection are strictly
/// serialised send-then-receive; concurrent callers proceed on separate
/// pooled connections.
pub struct Client {
    selector: ServerList,
    pool: Pool,
    driver: Box<dyn Driver>,
    timeout: Duration,
    auth_timeout: Duration,
    credentials: Option<(String, String)>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("timeout", &self.timeout)
            .field("auth_timeout", &self.auth_timeout)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Build a client from `config`. Fails with [`Error::NoServers`] when
    /// the server list is empty and with [`Error::Io`] when an address
    /// does not resolve.
    pub fn new(config: Config) -> Result<Self, Error> {
        if config.servers.is_empty() {
            return Err(Error::NoServers);
        }
        let selector = ServerList::new(&config.servers)?;
        let driver: Box<dyn Driver> = match config.protocol {
            Protocol::Text => Box::new(TextDriver),
            Protocol::Binary => Box::new(BinaryDriver),
        };
        let credentials = config
            .username
            .as_ref()
            .map(|username| (username.clone(), config.password.clone().unwrap_or_default()));

        Ok(Client {
            selector,
            pool: Pool::new(config.dial_timeout_or_default(), config.max_idle_or_default()),
            driver,
            timeout: config.timeout_or_default(),
            auth_timeout: config.auth_timeout_or_default(),
            credentials,
        })
    }

    /// Text-protocol client with default tunables.
    pub fn text<S: AsRef<str>>(servers: &[S]) -> Result<Self, Error> {
        Self::new(Config {
            protocol: Protocol::Text,
            ..Config::new(servers)
        })
    }

    /// Binary-protocol client with default tunables.
    pub fn binary<S: AsRef<str>>(servers: &[S]) -> Result<Self, Error> {
        Self::new(Config {
            protocol: Protocol::Binary,
            ..Config::new(servers)
        })
    }

    /// Wire protocol name: `"text"` or `"binary"`.
    pub fn proto_type(&self) -> &'static str {
        self.driver.proto_type()
    }

    /// Whether [`Client::touch`] works on the active protocol.
    pub fn supports_touch(&self) -> bool {
        self.driver.supports_touch()
    }

    /// Retrieve one item. Misses are [`Error::CacheMiss`].
    pub fn get(&self, key: &str) -> Result<Item, Error> {
        let mut found = None;
        self.with_key_conn(key, |driver, conn| {
            driver.get(conn, &[key], &mut |item| found = Some(item))
        })?;
        found.ok_or(Error::CacheMiss)
    }

    /// Retrieve many items with one batched exchange per endpoint. Absent
    /// keys are simply absent from the map; the call errors only when a
    /// partition hit a transport or protocol failure (every partition is
    /// still attempted first).
    pub fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Item>, Error> {
        for key in keys {
            self.check_key(key)?;
        }

        let mut partitions: HashMap<Endpoint, Vec<&str>> = HashMap::new();
        for &key in keys {
            let endpoint = self.selector.pick_server(key.as_bytes())?.clone();
            partitions.entry(endpoint).or_default().push(key);
        }

        let mut items = HashMap::with_capacity(keys.len());
        let mut first_err = None;
        for (endpoint, batch) in &partitions {
            let result = self.with_conn(endpoint, |driver, conn| {
                driver.get(conn, batch, &mut |item| {
                    items.insert(item.key.clone(), item);
                })
            });
            if let Err(err) = result {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            None => Ok(items),
            Some(err) => Err(err),
        }
    }

    /// Unconditionally store `item`.
    pub fn set(&self, item: &Item) -> Result<(), Error> {
        self.populate(Verb::Set, item)
    }

    /// Store `item` only if the key is absent; [`Error::NotStored`]
    /// otherwise.
    pub fn add(&self, item: &Item) -> Result<(), Error> {
        self.populate(Verb::Add, item)
    }

    /// Store `item` only if the key is present; [`Error::NotStored`]
    /// otherwise.
    pub fn replace(&self, item: &Item) -> Result<(), Error> {
        self.populate(Verb::Replace, item)
    }

    /// Store `item` only if its `cas_id` still matches the server's
    /// version: [`Error::CasConflict`] when the value was modified since
    /// the Get, [`Error::NotStored`] when it was evicted.
    pub fn compare_and_swap(&self, item: &Item) -> Result<(), Error> {
        self.populate(Verb::Cas, item)
    }

    /// Delete one key. Absent keys are [`Error::CacheMiss`].
    pub fn delete(&self, key: &str) -> Result<(), Error> {
        self.with_key_conn(key, |driver, conn| driver.delete(conn, key))
    }

    /// Flush every configured server.
    pub fn delete_all(&self) -> Result<(), Error> {
        self.each_endpoint(|driver, conn| driver.delete_all(conn))
    }

    /// Flush every configured server.
    pub fn flush_all(&self) -> Result<(), Error> {
        self.each_endpoint(|driver, conn| driver.flush_all(conn))
    }

    /// Increment the decimal counter under `key` by `delta` and return the
    /// new value. Absent keys are [`Error::CacheMiss`]; non-numeric values
    /// surface as [`Error::Client`] on the text protocol and
    /// [`Error::NonNumeric`] on the binary protocol.
    pub fn increment(&self, key: &str, delta: u64) -> Result<u64, Error> {
        self.with_key_conn(key, |driver, conn| {
            driver.incr_decr(conn, Verb::Incr, key, delta)
        })
    }

    /// Decrement the counter under `key` by `delta`, saturating at zero
    /// server side. Error shape matches [`Client::increment`].
    pub fn decrement(&self, key: &str, delta: u64) -> Result<u64, Error> {
        self.with_key_conn(key, |driver, conn| {
            driver.incr_decr(conn, Verb::Decr, key, delta)
        })
    }

    /// Reset the expiration of `key` to `seconds` from now. Binary
    /// protocol only; gate on [`Client::supports_touch`].
    pub fn touch(&self, key: &str, seconds: i32) -> Result<(), Error> {
        self.with_key_conn(key, |driver, conn| driver.touch(conn, &[key], seconds))
    }

    /// Probe liveness of every configured endpoint.
    pub fn ping(&self) -> Result<(), Error> {
        self.each_endpoint(|driver, conn| driver.ping(conn))
    }

    fn populate(&self, verb: Verb, item: &Item) -> Result<(), Error> {
        let result = self.with_key_conn(&item.key, |driver, conn| {
            driver.populate(conn, verb, item)
        });
        // Binary servers report a failed conditional store as KeyExists for
        // Add and Replace; translate to the text protocol's NotStored here
        // so no protocol status leaks upward. Cas keeps the conflict.
        match (verb, result) {
            (Verb::Add | Verb::Replace, Err(Error::CasConflict)) => Err(Error::NotStored),
            (_, result) => result,
        }
    }

    fn check_key(&self, key: &str) -> Result<(), Error> {
        if key.is_empty() || !self.driver.legal_key(key) {
            return Err(Error::MalformedKey);
        }
        Ok(())
    }

    fn with_key_conn<T>(
        &self,
        key: &str,
        op: impl FnOnce(&dyn Driver, &mut Entry) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.check_key(key)?;
        let endpoint = self.selector.pick_server(key.as_bytes())?.clone();
        self.with_conn(&endpoint, op)
    }

    /// Run one exchange on a pooled connection and classify the outcome
    /// for the pool.
    fn with_conn<T>(
        &self,
        endpoint: &Endpoint,
        op: impl FnOnce(&dyn Driver, &mut Entry) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut entry = self.checkout(endpoint)?;
        entry.set_deadline(self.timeout)?;

        let result = op(self.driver.as_ref(), &mut entry);
        let reusable = match &result {
            Ok(_) => true,
            Err(err) => err.is_resumable(),
        };
        self.pool.release(entry, reusable);
        result
    }

    /// Acquire a connection, running the SASL handshake when credentials
    /// are configured and the connection is freshly dialled. A failed
    /// handshake closes the connection.
    fn checkout(&self, endpoint: &Endpoint) -> Result<Entry, Error> {
        let mut entry = self.pool.acquire(endpoint)?;
        if entry.is_fresh() {
            if let Some((username, password)) = &self.credentials {
                self.authenticate(&mut entry, username, password)?;
            }
            entry.mark_used();
        }
        Ok(entry)
    }

    fn authenticate(&self, entry: &mut Entry, username: &str, password: &str) -> Result<(), Error> {
        if !self.driver.is_auth_supported() {
            return Err(Error::Unsupported("authentication"));
        }
        entry.set_deadline(self.auth_timeout)?;
        self.driver.auth(entry, username, password)
    }

    /// Run `op` once per configured endpoint, stopping at the first
    /// failure.
    fn each_endpoint(
        &self,
        op: impl Fn(&dyn Driver, &mut Entry) -> Result<(), Error>,
    ) -> Result<(), Error> {
        for endpoint in self.selector.endpoints() {
            self.with_conn(endpoint, |driver, conn| op(driver, conn))?;
        }
        Ok(())
    }
}
