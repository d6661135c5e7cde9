//! Per-endpoint connection pooling.
//!
//! Each endpoint owns a bounded free list of idle connections. Acquire
//! prefers an idle connection and dials otherwise; release returns the
//! connection iff the caller saw a clean outcome and the list is under
//! capacity. The free-list mutex is never held across I/O.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::selector::Endpoint;
use crate::Error;

/// One duplex byte stream to one endpoint.
#[derive(Debug)]
pub(crate) enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Stream {
    fn try_clone(&self) -> io::Result<Stream> {
        match self {
            Stream::Tcp(stream) => stream.try_clone().map(Stream::Tcp),
            #[cfg(unix)]
            Stream::Unix(stream) => stream.try_clone().map(Stream::Unix),
        }
    }

    /// Arm both read and write timeouts. The option is socket-wide, so the
    /// reader and writer halves see the same deadline.
    fn set_deadline(&self, timeout: Duration) -> io::Result<()> {
        match self {
            Stream::Tcp(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))
            }
            #[cfg(unix)]
            Stream::Unix(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))
            }
        }
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Stream::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Stream::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Stream::Unix(stream) => stream.flush(),
        }
    }
}

/// A pooled connection: one stream with buffered halves. Exclusively owned
/// by whoever holds it; dropping it closes the socket.
#[derive(Debug)]
pub(crate) struct Entry {
    endpoint: Endpoint,
    pub(crate) reader: BufReader<Stream>,
    pub(crate) writer: BufWriter<Stream>,
    fresh: bool,
}

impl Entry {
    fn new(endpoint: Endpoint, stream: Stream) -> io::Result<Self> {
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Entry {
            endpoint,
            reader,
            writer: BufWriter::new(stream),
            fresh: true,
        })
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// True until the first successful use; a fresh connection still needs
    /// authentication when credentials are configured.
    pub(crate) fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub(crate) fn mark_used(&mut self) {
        self.fresh = false;
    }

    /// Arm the per-operation deadline on the underlying socket.
    pub(crate) fn set_deadline(&self, timeout: Duration) -> io::Result<()> {
        self.reader.get_ref().set_deadline(timeout)
    }

    /// Read one CRLF-terminated line, including the terminator. A clean
    /// EOF is a short read and therefore an error.
    pub(crate) fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = Vec::new();
        let n = self.reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        Ok(line)
    }
}

/// Connection pool keyed by endpoint.
#[derive(Debug)]
pub(crate) struct Pool {
    dial_timeout: Duration,
    max_idle_per_addr: usize,
    free: Mutex<HashMap<Endpoint, Vec<Entry>>>,
}

impl Pool {
    pub(crate) fn new(dial_timeout: Duration, max_idle_per_addr: usize) -> Self {
        Pool {
            dial_timeout,
            max_idle_per_addr,
            free: Mutex::new(HashMap::new()),
        }
    }

    /// Pop an idle connection to `endpoint`, or dial a fresh one.
    pub(crate) fn acquire(&self, endpoint: &Endpoint) -> Result<Entry, Error> {
        if let Some(entry) = self.free.lock().get_mut(endpoint).and_then(Vec::pop) {
            return Ok(entry);
        }
        self.dial(endpoint)
    }

    fn dial(&self, endpoint: &Endpoint) -> Result<Entry, Error> {
        debug!(endpoint = %endpoint, "dialling");
        let stream = match endpoint {
            Endpoint::Tcp(addr) => {
                Stream::Tcp(TcpStream::connect_timeout(addr, self.dial_timeout)?)
            }
            // UnixStream has no timeout-aware connect; local dials either
            // complete immediately or fail.
            #[cfg(unix)]
            Endpoint::Unix(path) => Stream::Unix(UnixStream::connect(path)?),
        };
        Entry::new(endpoint.clone(), stream).map_err(Error::Io)
    }

    /// Return `entry` to its endpoint's free list, or close it. `reusable`
    /// is false whenever the command saw a transport or framing failure.
    pub(crate) fn release(&self, entry: Entry, reusable: bool) {
        if reusable {
            let mut free = self.free.lock();
            let list = free.entry(entry.endpoint().clone()).or_default();
            if list.len() < self.max_idle_per_addr {
                list.push(entry);
                return;
            }
        }
        debug!(endpoint = %entry.endpoint(), "discarding connection");
        // Dropping the entry closes the socket.
    }

    #[cfg(test)]
    pub(crate) fn idle_count(&self, endpoint: &Endpoint) -> usize {
        self.free.lock().get(endpoint).map_or(0, Vec::len)
    }
}
