//! In-memory ring buffer sink (§4.9): caps total queued packet bytes,
//! evicting the oldest on overflow, and serializes its current contents to
//! a caller-provided stream on `dispatch`.

use std::collections::VecDeque;
use std::io::Write;

use crate::error::SiResult;
use crate::options::LookupTable;
use crate::packet::Packet;
use crate::protocol::{is_base_option, BaseOptions, Protocol};
use crate::text::TextFormatter;
use crate::wire::BinaryFormatter;

pub struct MemoryProtocol {
    base: BaseOptions,
    maxsize: u64,
    as_text: bool,
    text_formatter: TextFormatter,
    binary_formatter: BinaryFormatter,
    buffer: VecDeque<Packet>,
    size_bytes: u64,
}

impl MemoryProtocol {
    #[must_use]
    pub fn from_table(table: &LookupTable) -> Self {
        let pattern = table.get_string("pattern", "[%timestamp%] %level,8%: %title%");
        let indent = table.get_bool("indent", false);
        Self {
            base: BaseOptions::from_table("mem", table),
            maxsize: table.get_size("maxsize", 2 * 1024 * 1024),
            as_text: table.get_bool("astext", false),
            text_formatter: TextFormatter::new(&pattern, indent),
            binary_formatter: BinaryFormatter::new(),
            buffer: VecDeque::new(),
            size_bytes: 0,
        }
    }

    fn evict_to_fit(&mut self, incoming: u64) {
        while self.size_bytes + incoming > self.maxsize {
            let Some(oldest) = self.buffer.pop_front() else { break };
            self.size_bytes -= oldest.size() as u64;
        }
    }
}

impl Protocol for MemoryProtocol {
    fn name(&self) -> &str {
        "mem"
    }

    fn caption(&self) -> &str {
        &self.base.caption
    }

    fn is_valid_option(&self, key: &str) -> bool {
        is_base_option(key)
            || matches!(key.to_ascii_lowercase().as_str(), "maxsize" | "astext" | "pattern" | "indent")
    }

    fn connect(&mut self) -> SiResult<()> {
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet) -> SiResult<()> {
        if !self.base.passes_level_gate(packet) {
            return Ok(());
        }
        let size = packet.size() as u64;
        if size > self.maxsize {
            // a single packet larger than the whole ring can never fit.
            return Ok(());
        }
        self.evict_to_fit(size);
        self.size_bytes += size;
        self.buffer.push_back(packet.clone());
        Ok(())
    }

    fn disconnect(&mut self) -> SiResult<()> {
        self.buffer.clear();
        self.size_bytes = 0;
        Ok(())
    }

    fn dispatch(&mut self, state: &mut dyn Write) -> SiResult<()> {
        for packet in &self.buffer {
            if self.as_text {
                let line = self.text_formatter.format_packet(packet);
                if !line.is_empty() {
                    state.write_all(line.as_bytes())?;
                    state.write_all(b"\r\n")?;
                }
            } else {
                let bytes = self.binary_formatter.encode(packet).to_vec();
                state.write_all(&bytes)?;
            }
        }
        Ok(())
    }
}
