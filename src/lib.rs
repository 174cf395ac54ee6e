//! Transport core for a SmartInspect-style structured logging client.
//!
//! Application code (or, more usually, an external session API layered on
//! top) produces [`packet::Packet`]s and hands them to a [`SmartInspect`]
//! instance, which ships them through a fan-out of [`protocol::Protocol`]
//! sinks described by a connections string (§4.1). Each sink is wired up
//! with the shared base-option machinery in [`pipeline`]: an optional
//! asynchronous queue with a dedicated writer thread, reconnect throttling,
//! and a secondary backlog flushed on (re)connect.
//!
//! This crate is the transport layer only: session management, object
//! rendering, configuration-file loading and event/listener plumbing are
//! left to callers. The two entry points a caller (or an external session
//! API) needs are [`SmartInspect::submit`] and [`SmartInspect::set_connections`].

#![warn(missing_debug_implementations)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod factory;
pub mod level;
pub mod options;
pub mod packet;
pub mod pipeline;
pub mod protocol;
mod smart_inspect;
pub mod text;
pub mod wire;

pub use crate::error::{SiError, SiResult};
pub use crate::level::Level;
pub use crate::packet::{
    ControlCommand, ControlCommandType, LogEntry, LogEntryType, LogHeader, Packet, PacketType,
    ProcessFlow, ProcessFlowType, Watch, WatchType,
};
pub use crate::pipeline::{ErrorCallback, ErrorEvent, Pipeline};
pub use crate::smart_inspect::{close_default, default, init_default, SmartInspect};
