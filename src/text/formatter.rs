//! Expands a `LogEntry` into a text line via the pattern compiled from a
//! `%token%` string (§4.6).

use time::OffsetDateTime;

use crate::packet::{LogEntry, Packet, ProcessFlowType};
use crate::text::datetime;
use crate::text::pattern::{self, Segment};
use crate::wire::color::unpack_color;

const DEFAULT_PATTERN: &str = "[%timestamp%] %level,8%: %title%";
const DEFAULT_DATETIME_PATTERN: &str = "yyyy-MM-dd HH:mm:ss.SSS";
const INDENT_STEP: usize = 3;

/// Compiles a pattern once and renders it repeatedly. Indent state (when
/// enabled) persists across calls, driven by `ProcessFlow` packets.
#[derive(Debug)]
pub struct TextFormatter {
    segments: Vec<Segment>,
    indent_enabled: bool,
    indent_level: usize,
}

impl TextFormatter {
    #[must_use]
    pub fn new(pattern: &str, indent_enabled: bool) -> Self {
        Self {
            segments: pattern::parse(pattern),
            indent_enabled,
            indent_level: 0,
        }
    }

    #[must_use]
    pub fn default_pattern() -> Self {
        Self::new(DEFAULT_PATTERN, false)
    }

    /// Renders `packet`. Only `LogEntry` produces non-empty text;
    /// `ProcessFlow` packets drive indent bookkeeping and otherwise compile
    /// to zero bytes, matching §4.6.
    pub fn format_packet(&mut self, packet: &Packet) -> String {
        match packet {
            Packet::LogEntry(entry) => self.format_entry(entry),
            Packet::ProcessFlow(flow) => {
                if self.indent_enabled {
                    if flow.process_flow_type.is_leave_method() {
                        self.indent_level = self.indent_level.saturating_sub(INDENT_STEP);
                    }
                    if flow.process_flow_type.is_enter_method() {
                        self.indent_level += INDENT_STEP;
                    }
                }
                String::new()
            }
            _ => String::new(),
        }
    }

    fn format_entry(&self, entry: &LogEntry) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    name,
                    options,
                    width,
                } => {
                    let value = render_field(entry, name, options.as_deref(), self.indent_level);
                    out.push_str(&pattern::apply_width(&value, *width));
                }
            }
        }
        out
    }
}

fn render_field(entry: &LogEntry, name: &str, options: Option<&str>, indent_level: usize) -> String {
    match name.to_ascii_lowercase().as_str() {
        "appname" => entry.app_name.clone().unwrap_or_default(),
        "session" => entry.session_name.clone().unwrap_or_default(),
        "hostname" => entry.host_name.clone().unwrap_or_default(),
        "title" => {
            let title = entry.title.clone().unwrap_or_default();
            format!("{}{}", " ".repeat(indent_level), title)
        }
        "level" => entry.level.to_string(),
        "logentrytype" => entry.log_entry_type.to_string(),
        "viewerid" => entry.viewer_id.as_i32().to_string(),
        "thread" => entry.thread_id.to_string(),
        "process" => entry.process_id.to_string(),
        "timestamp" => {
            let pattern = options.unwrap_or(DEFAULT_DATETIME_PATTERN);
            let dt = micros_to_datetime(entry.timestamp);
            datetime::format(dt, pattern)
        }
        "color" => match entry.color {
            None => "<default>".to_string(),
            Some(c) => {
                let (r, g, b, _a) = unpack_color(c);
                format!("0x{r:02X}{g:02X}{b:02X}")
            }
        },
        // Unknown token names are treated as literal text (§4.6, §9).
        unknown => format!("%{unknown}%"),
    }
}

fn micros_to_datetime(micros: i64) -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH + time::Duration::microseconds(micros)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::packet::{ProcessFlow, ProcessFlowType};

    #[test]
    fn s3_right_aligned_level_and_title() {
        let mut fmt = TextFormatter::new("[%level,8%] %title%", false);
        let mut entry = LogEntry::new(0, "hi");
        entry.level = Level::Warning;
        let line = fmt.format_packet(&Packet::LogEntry(entry));
        assert_eq!(line, "[ Warning] hi");
    }

    #[test]
    fn non_log_entry_packets_compile_to_empty() {
        let mut fmt = TextFormatter::default_pattern();
        let flow = ProcessFlow::new(ProcessFlowType::EnterThread, "t");
        assert_eq!(fmt.format_packet(&Packet::ProcessFlow(flow)), "");
    }

    #[test]
    fn indent_grows_after_enter_and_shrinks_before_leave() {
        let mut fmt = TextFormatter::new("%title%", true);
        let mut enter = LogEntry::new(0, "");
        enter.title = None;

        let before = fmt.format_packet(&Packet::LogEntry(LogEntry::new(0, "top")));
        assert_eq!(before, "top");

        fmt.format_packet(&Packet::ProcessFlow(ProcessFlow::new(
            ProcessFlowType::EnterMethod,
            "f",
        )));
        let nested = fmt.format_packet(&Packet::LogEntry(LogEntry::new(0, "nested")));
        assert_eq!(nested, "   nested");

        fmt.format_packet(&Packet::ProcessFlow(ProcessFlow::new(
            ProcessFlowType::LeaveMethod,
            "f",
        )));
        let back = fmt.format_packet(&Packet::LogEntry(LogEntry::new(0, "top-again")));
        assert_eq!(back, "top-again");
    }

    #[test]
    fn unknown_token_is_literal() {
        let mut fmt = TextFormatter::new("%bogus%", false);
        let line = fmt.format_packet(&Packet::LogEntry(LogEntry::new(0, "x")));
        assert_eq!(line, "%bogus%");
    }
}
