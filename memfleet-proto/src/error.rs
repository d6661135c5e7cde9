//! Error types for memcached wire parsing.

/// Error type for wire-level parsing and framing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Need more data to complete parsing.
    #[error("incomplete data")]
    Incomplete,

    /// Invalid protocol format (static message).
    #[error("protocol error: {0}")]
    Protocol(&'static str),

    /// A response line that matches no known reply shape. Carries the
    /// offending line for diagnosis.
    #[error("unexpected response line: {0:?}")]
    UnexpectedLine(String),

    /// Invalid number format.
    #[error("invalid number")]
    InvalidNumber,

    /// Invalid magic byte in a binary header.
    #[error("invalid magic byte: {0:#04x}")]
    InvalidMagic(u8),

    /// Unknown opcode in a binary header.
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    /// A binary frame whose declared lengths are inconsistent.
    #[error("bad frame: {0}")]
    BadFrame(String),
}
