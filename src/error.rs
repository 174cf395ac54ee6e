//! Crate-wide error type.

use thiserror::Error;

/// Abbreviation of `Result<T, SiError>`.
pub type SiResult<T> = std::result::Result<T, SiError>;

/// A list specifying categories of [`SiError`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SiError {
    /// The connections string could not be parsed.
    #[error("malformed connections string at position {position}: {reason}")]
    ConnectionsParse { position: usize, reason: String },

    /// A protocol name in the connections string is not recognized.
    #[error("unknown protocol \"{0}\"")]
    UnknownProtocol(String),

    /// An option key is not recognized by the protocol it was given to.
    #[error("protocol \"{protocol}\" does not accept option \"{key}\"")]
    UnknownOption { protocol: String, key: String },

    /// Connecting to, or opening, the sink failed.
    #[error("connect failed for protocol \"{caption}\"")]
    Connect {
        caption: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred while writing to an already-open sink.
    #[error(transparent)]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// The protocol has been closed; the write was dropped.
    #[error("protocol \"{0}\" is closed")]
    Closed(String),

    /// A producer's write was dropped because the async backlog overflowed
    /// and `async.throttle` was disabled.
    #[error("protocol \"{protocol}\" dropped {dropped_bytes} queued bytes (backlog overflow)")]
    QueueOverflow { protocol: String, dropped_bytes: usize },

    /// A background mutex was poisoned by a panicking thread.
    #[error("internal lock was poisoned")]
    Poison,

    /// Something the caller asked for doesn't make sense for this protocol.
    #[error("invalid usage: {0}")]
    Usage(&'static str),
}

impl<G> From<std::sync::PoisonError<G>> for SiError {
    fn from(_err: std::sync::PoisonError<G>) -> Self {
        Self::Poison
    }
}

impl SiError {
    pub(crate) fn connect(caption: impl Into<String>, source: std::io::Error) -> Self {
        Self::Connect {
            caption: caption.into(),
            source,
        }
    }
}
