use crate::level::Level;

/// Kind of value a [`Watch`] tracks. Purely descriptive metadata for the
/// Console; this crate never interprets `value` based on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum WatchType {
    Char = 0,
    String = 1,
    Integer = 2,
    Float = 3,
    Boolean = 4,
    Address = 5,
    Timestamp = 6,
    Object = 7,
}

/// A named value observed at a point in time ("watches" in the Console UI).
#[derive(Debug, Clone)]
pub struct Watch {
    pub level: Level,
    pub name: String,
    pub value: String,
    pub watch_type: WatchType,
    pub timestamp: i64,
}

impl Watch {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, watch_type: WatchType) -> Self {
        Self {
            level: Level::Debug,
            name: name.into(),
            value: value.into(),
            watch_type,
            timestamp: 0,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        const HEADER: usize = 4 // len name
            + 4 // len value
            + 4 // watch_type
            + 8; // timestamp
        HEADER + self.name.len() + self.value.len()
    }
}
