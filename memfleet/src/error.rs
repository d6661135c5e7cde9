//! The public error taxonomy.
//!
//! Callers classify results by variant, never by message text. Three
//! families matter for connection health: semantic outcomes (misses,
//! conflicts) and server-reported conditions leave the connection usable;
//! transport and framing failures ([`Error::Io`], [`Error::Protocol`]) and
//! [`Error::Server`] poison it.

use memfleet_proto::ParseError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A Get failed because the item wasn't present.
    #[error("memcache: cache miss")]
    CacheMiss,

    /// A CompareAndSwap failed because the cached value was modified
    /// between the Get and the CompareAndSwap. If the value was simply
    /// evicted rather than replaced, [`Error::NotStored`] is returned
    /// instead.
    #[error("memcache: compare-and-swap conflict")]
    CasConflict,

    /// A conditional store (Add, Replace, CompareAndSwap) failed because
    /// the condition was not satisfied.
    #[error("memcache: item not stored")]
    NotStored,

    /// The server reported an internal error; the connection is discarded.
    #[error("memcache: server error: {0}")]
    Server(String),

    /// No statistics were available.
    #[error("memcache: no statistics available")]
    NoStats,

    /// The key is empty, longer than 250 bytes, or contains bytes the
    /// active protocol forbids.
    #[error("malformed: key is too long or contains invalid characters")]
    MalformedKey,

    /// No servers are configured or available.
    #[error("memcache: no servers configured or available")]
    NoServers,

    #[error("memcache: value too large")]
    ValueTooLarge,

    #[error("memcache: invalid arguments")]
    InvalidArgs,

    #[error("memcache: value not stored")]
    ValueNotStored,

    #[error("memcache: incr/decr called on non-numeric value")]
    NonNumeric,

    #[error("memcache: authentication required")]
    AuthRequired,

    /// The server asked for an additional SASL round, which only
    /// mechanisms beyond PLAIN need.
    #[error("memcache: authentication continue (unsupported)")]
    AuthContinue,

    #[error("memcache: unknown command")]
    UnknownCommand,

    #[error("memcache: out of memory")]
    OutOfMemory,

    #[error("memcache: unknown error from server")]
    UnknownError,

    /// A `CLIENT_ERROR` reply, with the server's message.
    #[error("memcache: client error: {0}")]
    Client(String),

    /// An operation the active protocol driver cannot perform.
    #[error("memcache: {0} is not supported by this protocol")]
    Unsupported(&'static str),

    /// Damaged framing: an unexpected response line, a bad header, or a
    /// truncated body. Carries a description of the offending frame.
    #[error("memcache: protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the connection that produced this error is still usable.
    ///
    /// Once framing is damaged or the transport failed, the stream position
    /// is unknown and the connection must be discarded.
    pub fn is_resumable(&self) -> bool {
        !matches!(self, Error::Io(_) | Error::Protocol(_) | Error::Server(_))
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Protocol(err.to_string())
    }
}
