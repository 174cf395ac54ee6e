//! Sink backends (§4.2–§4.9): a common option set and trait, concrete
//! transports, and the async pipeline/reconnect/rotation machinery they
//! share.

pub mod crypto;
pub mod file_protocol;
pub mod memory_protocol;
pub mod pipe_protocol;
pub mod reconnect;
pub mod rotater;
pub mod scheduler;
pub mod tcp_protocol;
pub mod text_protocol;

pub use file_protocol::{BinaryFileFormat, FileFormat, FileProtocol};
pub use memory_protocol::MemoryProtocol;
pub use pipe_protocol::PipeProtocol;
pub use tcp_protocol::TcpProtocol;
pub use text_protocol::TextFileFormat;

use crate::error::SiResult;
use crate::level::Level;
use crate::options::LookupTable;
use crate::packet::Packet;

/// Option keys recognised by every protocol regardless of transport.
const BASE_OPTION_KEYS: &[&str] = &[
    "level",
    "reconnect",
    "reconnect.interval",
    "caption",
    "async.enabled",
    "async.queue",
    "async.throttle",
    "async.clearondisconnect",
    "backlog.enabled",
    "backlog.queue",
    "backlog.flushon",
    "backlog.keepopen",
];

#[must_use]
pub fn is_base_option(key: &str) -> bool {
    BASE_OPTION_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// A sink backend: connects, writes packets, disconnects, and validates its
/// own option keys against the base set (§4.2, §9 — a tagged operation
/// interface rather than an inheritance hierarchy).
pub trait Protocol: Send {
    /// Short protocol name as used in the connections string (e.g. `"file"`).
    fn name(&self) -> &str;

    /// Human label reported with errors; defaults to the `caption` option.
    fn caption(&self) -> &str;

    /// Whether `key` is recognised by this protocol, including base keys.
    fn is_valid_option(&self, key: &str) -> bool {
        is_base_option(key)
    }

    fn connect(&mut self) -> SiResult<()>;
    fn write_packet(&mut self, packet: &Packet) -> SiResult<()>;
    fn disconnect(&mut self) -> SiResult<()>;

    /// Serializes the current backlog to `state`; protocols without a
    /// meaningful dispatch target (most transports) no-op.
    fn dispatch(&mut self, state: &mut dyn std::io::Write) -> SiResult<()> {
        let _ = state;
        Ok(())
    }
}

/// Parsed `§4.2` option set shared by every protocol, loaded once from a
/// [`LookupTable`] at protocol construction time.
#[derive(Debug, Clone)]
pub struct BaseOptions {
    pub level: Level,
    pub reconnect: bool,
    pub reconnect_interval_ms: u64,
    pub caption: String,
    pub async_enabled: bool,
    pub async_queue: u64,
    pub async_throttle: bool,
    pub async_clearondisconnect: bool,
    pub backlog_enabled: bool,
    pub backlog_queue: u64,
    pub backlog_flushon: Level,
    pub backlog_keepopen: bool,
}

impl BaseOptions {
    #[must_use]
    pub fn from_table(protocol_name: &str, table: &LookupTable) -> Self {
        Self {
            level: table.get_level("level", Level::Debug),
            reconnect: table.get_bool("reconnect", false),
            reconnect_interval_ms: table.get_timespan_ms("reconnect.interval", 0),
            caption: table.get_string("caption", protocol_name),
            async_enabled: table.get_bool("async.enabled", false),
            async_queue: table.get_size("async.queue", 2 * 1024 * 1024),
            async_throttle: table.get_bool("async.throttle", true),
            async_clearondisconnect: table.get_bool("async.clearondisconnect", false),
            backlog_enabled: table.get_bool("backlog.enabled", false),
            backlog_queue: table.get_size("backlog.queue", 2 * 1024 * 1024),
            backlog_flushon: table.get_level("backlog.flushon", Level::Error),
            backlog_keepopen: table.get_bool("backlog.keepopen", true),
        }
    }

    /// Whether `packet` passes the level gate (§4.2, invariant 5).
    #[must_use]
    pub fn passes_level_gate(&self, packet: &Packet) -> bool {
        packet.level() >= self.level
    }
}

/// Best-effort local hostname for the LogHeader packet both TCP/pipe sinks
/// send right after handshake, and that the pipeline writes again after a
/// successful reconnect (§4.4, §4.8).
#[must_use]
pub fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

/// Client banner string both TCP and pipe sinks write after reading the
/// server's (§4.8, §6).
#[must_use]
pub fn client_banner() -> String {
    format!("SmartInspect Rust v{}\n", env!("CARGO_PKG_VERSION"))
}

/// Reads the server's `\n`-terminated banner, then writes and flushes the
/// client banner. Called once right after the transport connects.
pub fn handshake(stream: &mut (impl std::io::Read + std::io::Write), caption: &str) -> SiResult<()> {
    use std::io::BufRead;
    let mut reader = std::io::BufReader::new(&mut *stream);
    let mut banner = String::new();
    let n = std::io::BufRead::read_line(&mut reader, &mut banner)
        .map_err(|e| crate::error::SiError::connect(caption.to_string(), e))?;
    if n == 0 {
        return Err(crate::error::SiError::connect(
            caption.to_string(),
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "server banner closed unexpectedly"),
        ));
    }
    stream
        .write_all(client_banner().as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|e| crate::error::SiError::connect(caption.to_string(), e))
}
