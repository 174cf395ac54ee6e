//! Tagged-sum packet model (§3). Every packet carries a [`Level`] and has a
//! stable, computable [`Packet::size`] used by the scheduler's byte-accounted
//! backlog.

pub mod control_command;
pub mod log_entry;
pub mod log_header;
pub mod process_flow;
pub mod viewer_id;
pub mod watch;

pub use control_command::{ControlCommand, ControlCommandType};
pub use log_entry::{LogEntry, LogEntryType, DEFAULT_COLOR};
pub use log_header::LogHeader;
pub use process_flow::{ProcessFlow, ProcessFlowType};
pub use viewer_id::{GraphicKind, SourceCodeKind, ViewerId};
pub use watch::{Watch, WatchType};

use crate::level::Level;

/// The wire tag for a packet's variant (`uint16` on the wire, §4.5). Only
/// `LogEntry`'s value (`2`) is pinned by the spec's worked example (S2,
/// bytes `02 00`); the others are otherwise-unconstrained, stable
/// assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PacketType {
    LogEntry = 2,
    ProcessFlow = 3,
    Watch = 5,
    ControlCommand = 6,
    LogHeader = 8,
}

/// One packet flowing through the transport core: any of the concrete
/// variants below.
#[derive(Debug, Clone)]
pub enum Packet {
    LogEntry(LogEntry),
    Watch(Watch),
    ControlCommand(ControlCommand),
    ProcessFlow(ProcessFlow),
    LogHeader(LogHeader),
}

impl Packet {
    #[must_use]
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::LogEntry(_) => PacketType::LogEntry,
            Self::Watch(_) => PacketType::Watch,
            Self::ControlCommand(_) => PacketType::ControlCommand,
            Self::ProcessFlow(_) => PacketType::ProcessFlow,
            Self::LogHeader(_) => PacketType::LogHeader,
        }
    }

    #[must_use]
    pub fn level(&self) -> Level {
        match self {
            Self::LogEntry(p) => p.level,
            Self::Watch(p) => p.level,
            Self::ControlCommand(p) => p.level,
            Self::ProcessFlow(p) => p.level,
            Self::LogHeader(p) => p.level,
        }
    }

    /// In-memory size including per-type overhead and string byte lengths;
    /// equal to the wire payload size.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::LogEntry(p) => p.size(),
            Self::Watch(p) => p.size(),
            Self::ControlCommand(p) => p.size(),
            Self::ProcessFlow(p) => p.size(),
            Self::LogHeader(p) => p.size(),
        }
    }
}

impl From<LogEntry> for Packet {
    fn from(p: LogEntry) -> Self {
        Self::LogEntry(p)
    }
}
impl From<Watch> for Packet {
    fn from(p: Watch) -> Self {
        Self::Watch(p)
    }
}
impl From<ControlCommand> for Packet {
    fn from(p: ControlCommand) -> Self {
        Self::ControlCommand(p)
    }
}
impl From<ProcessFlow> for Packet {
    fn from(p: ProcessFlow) -> Self {
        Self::ProcessFlow(p)
    }
}
impl From<LogHeader> for Packet {
    fn from(p: LogHeader) -> Self {
        Self::LogHeader(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_wire_tag_matches_spec_example() {
        assert_eq!(PacketType::LogEntry as u16, 2);
    }

    #[test]
    fn size_accounts_for_strings_and_overhead() {
        let mut e = LogEntry::new(2, "T");
        e.app_name = Some("A".into());
        e.session_name = Some("S".into());
        e.host_name = Some("H".into());
        // header (48) + 4 one-byte strings
        assert_eq!(Packet::from(e).size(), 48 + 4);
    }
}
