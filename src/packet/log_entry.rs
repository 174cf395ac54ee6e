use crate::level::Level;
use crate::packet::viewer_id::ViewerId;

pub use crate::wire::color::DEFAULT_COLOR;

/// Sub-type of a [`LogEntry`] (message, warning, separator, ...). The wire id
/// is whatever the caller supplies; this crate only needs to move it, so it
/// is kept as a plain `i32` rather than a closed enum — the Console owns the
/// full, evolving list of entry types.
pub type LogEntryType = i32;

/// A single structured log line, the workhorse packet of the protocol.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub log_entry_type: LogEntryType,
    pub viewer_id: ViewerId,
    pub app_name: Option<String>,
    pub session_name: Option<String>,
    pub title: Option<String>,
    pub host_name: Option<String>,
    pub data: Vec<u8>,
    pub process_id: i32,
    pub thread_id: i32,
    /// Microseconds since the Unix epoch, UTC. See the wire formatter for
    /// how this is converted to the Console's day-fraction double.
    pub timestamp: i64,
    /// Packed as `R | G<<8 | B<<16 | A<<24` (the wire's native byte order,
    /// not conventional big-endian ARGB); `None` is wire-encoded as
    /// [`DEFAULT_COLOR`]. Use [`crate::wire::pack_color`] to build one from
    /// separate components.
    pub color: Option<u32>,
}

impl LogEntry {
    #[must_use]
    pub fn new(log_entry_type: LogEntryType, title: impl Into<String>) -> Self {
        Self {
            level: Level::Debug,
            log_entry_type,
            viewer_id: ViewerId::None,
            app_name: None,
            session_name: None,
            title: Some(title.into()),
            host_name: None,
            data: Vec::new(),
            process_id: 0,
            thread_id: 0,
            timestamp: 0,
            color: None,
        }
    }

    /// In-memory size: fixed header overhead plus the UTF-8 byte length of
    /// every string field plus the data payload. This is identical to the
    /// wire payload size (§4.5), since every string appears exactly once on
    /// the wire.
    #[must_use]
    pub fn size(&self) -> usize {
        const HEADER: usize = 4 // log_entry_type
            + 4 // viewer_id
            + 4 * 5 // five length prefixes
            + 4 // process_id
            + 4 // thread_id
            + 8 // timestamp (f64)
            + 4; // color
        HEADER
            + str_len(&self.app_name)
            + str_len(&self.session_name)
            + str_len(&self.title)
            + str_len(&self.host_name)
            + self.data.len()
    }
}

fn str_len(s: &Option<String>) -> usize {
    s.as_deref().map_or(0, str::len)
}
