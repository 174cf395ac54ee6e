use crate::level::Level;

/// Kind of out-of-band instruction a [`ControlCommand`] carries (e.g. "clear
/// all log entries"). Like [`crate::packet::log_entry::LogEntryType`], the
/// Console owns the full list, so this crate keeps the tag opaque.
pub type ControlCommandType = i32;

/// An administrative instruction to the Console (clear log, clear watches, ...).
#[derive(Debug, Clone)]
pub struct ControlCommand {
    pub level: Level,
    pub control_command_type: ControlCommandType,
    pub data: Option<Vec<u8>>,
}

impl ControlCommand {
    #[must_use]
    pub fn new(control_command_type: ControlCommandType) -> Self {
        Self {
            level: Level::Control,
            control_command_type,
            data: None,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        const HEADER: usize = 4 // control_command_type
            + 4; // len data
        HEADER + self.data.as_ref().map_or(0, Vec::len)
    }
}
