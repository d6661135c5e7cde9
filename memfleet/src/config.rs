//! Client configuration.

use std::time::Duration;

/// Default per-operation I/O deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Default deadline for dialling a new connection.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for the SASL handshake.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(1);

/// Default idle-connection cap per endpoint.
pub const DEFAULT_MAX_IDLE_PER_ADDR: usize = 2;

/// Which wire protocol the client speaks. Fixed at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    /// The line-oriented ASCII protocol.
    #[default]
    Text,
    /// The 24-byte-header binary protocol.
    Binary,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Text => "text",
            Protocol::Binary => "binary",
        }
    }
}

/// Client configuration. Zero durations and a zero idle cap mean "use the
/// library default"; they are resolved once at client construction.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Server addresses: `host:port` for TCP, or a path (any string
    /// containing `/`) for a local stream socket. Must be non-empty.
    pub servers: Vec<String>,
    /// The wire protocol to speak.
    pub protocol: Protocol,
    /// Per-operation I/O deadline.
    pub timeout: Duration,
    /// New-connection deadline (TCP only).
    pub dial_timeout: Duration,
    /// Deadline for the SASL handshake (binary only).
    pub auth_timeout: Duration,
    /// Idle-connection cap per endpoint.
    pub max_idle_per_addr: usize,
    /// SASL-PLAIN username (binary only). Setting it enables
    /// authentication on every fresh connection.
    pub username: Option<String>,
    /// SASL-PLAIN password (binary only).
    pub password: Option<String>,
}

impl Config {
    /// A configuration with the given servers and everything else default.
    pub fn new<S: AsRef<str>>(servers: &[S]) -> Self {
        Config {
            servers: servers.iter().map(|s| s.as_ref().to_owned()).collect(),
            ..Config::default()
        }
    }

    pub(crate) fn timeout_or_default(&self) -> Duration {
        or_default(self.timeout, DEFAULT_TIMEOUT)
    }

    pub(crate) fn dial_timeout_or_default(&self) -> Duration {
        or_default(self.dial_timeout, DEFAULT_DIAL_TIMEOUT)
    }

    pub(crate) fn auth_timeout_or_default(&self) -> Duration {
        or_default(self.auth_timeout, DEFAULT_AUTH_TIMEOUT)
    }

    pub(crate) fn max_idle_or_default(&self) -> usize {
        if self.max_idle_per_addr == 0 {
            DEFAULT_MAX_IDLE_PER_ADDR
        } else {
            self.max_idle_per_addr
        }
    }
}

fn or_default(value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        default
    } else {
        value
    }
}
