//! Byte-exact wire codec (§4.5). Little-endian throughout; every string
//! appears twice — a `u32` length in the fixed header, then the raw UTF-8
//! bytes in a trailing data block — so a reader can scan headers without
//! reading variable-length data.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{SiError, SiResult};
use crate::packet::{
    ControlCommand, LogEntry, LogHeader, Packet, PacketType, ProcessFlow, Watch,
};
use crate::wire::color::DEFAULT_COLOR;
use crate::wire::timestamp::{decode_timestamp, encode_timestamp};

/// Buffer is reallocated once a packet's encoding exceeds this, to shrink
/// the formatter's steady-state memory footprint back down (§4.5).
const SHRINK_THRESHOLD: usize = 1024 * 1024;

/// Encodes packets into a reused byte buffer. Reuse avoids an allocation per
/// packet on the hot write path; the buffer is only reallocated after an
/// outsized packet, matching the teacher's "shrink back down" pattern for
/// scratch buffers used on a busy write path.
#[derive(Debug, Default)]
pub struct BinaryFormatter {
    buf: Vec<u8>,
}

impl BinaryFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Encodes `packet` into the internal buffer and returns a view of it.
    /// The buffer is valid until the next call to `encode`.
    pub fn encode(&mut self, packet: &Packet) -> &[u8] {
        if self.buf.len() > SHRINK_THRESHOLD {
            self.buf = Vec::new();
        } else {
            self.buf.clear();
        }

        let mut payload = Vec::with_capacity(packet.size());
        write_payload(packet, &mut payload);

        self.buf.reserve(2 + 4 + payload.len());
        write_u16(&mut self.buf, packet.packet_type() as u16);
        write_u32(&mut self.buf, payload.len() as u32);
        self.buf.extend_from_slice(&payload);
        &self.buf
    }
}

fn write_u16(buf: &mut Vec<u8>, v: u16) {
    let mut tmp = [0u8; 2];
    LittleEndian::write_u16(&mut tmp, v);
    buf.extend_from_slice(&tmp);
}

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    let mut tmp = [0u8; 4];
    LittleEndian::write_u32(&mut tmp, v);
    buf.extend_from_slice(&tmp);
}

fn write_i32(buf: &mut Vec<u8>, v: i32) {
    write_u32(buf, v as u32);
}

fn write_f64(buf: &mut Vec<u8>, v: f64) {
    let mut tmp = [0u8; 8];
    LittleEndian::write_f64(&mut tmp, v);
    buf.extend_from_slice(&tmp);
}

fn str_bytes(s: &Option<String>) -> &[u8] {
    s.as_deref().map_or(&[], str::as_bytes)
}

fn write_payload(packet: &Packet, out: &mut Vec<u8>) {
    match packet {
        Packet::LogEntry(e) => write_log_entry(e, out),
        Packet::ControlCommand(c) => write_control_command(c, out),
        Packet::Watch(w) => write_watch(w, out),
        Packet::ProcessFlow(p) => write_process_flow(p, out),
        Packet::LogHeader(h) => write_log_header(h, out),
    }
}

fn write_log_entry(e: &LogEntry, out: &mut Vec<u8>) {
    let app_name = str_bytes(&e.app_name);
    let session = str_bytes(&e.session_name);
    let title = str_bytes(&e.title);
    let host = str_bytes(&e.host_name);

    write_i32(out, e.log_entry_type);
    write_i32(out, e.viewer_id.as_i32());
    write_u32(out, app_name.len() as u32);
    write_u32(out, session.len() as u32);
    write_u32(out, title.len() as u32);
    write_u32(out, host.len() as u32);
    write_u32(out, e.data.len() as u32);
    write_i32(out, e.process_id);
    write_i32(out, e.thread_id);
    write_f64(out, encode_timestamp(e.timestamp));
    write_u32(out, e.color.unwrap_or(DEFAULT_COLOR));
    out.extend_from_slice(app_name);
    out.extend_from_slice(session);
    out.extend_from_slice(title);
    out.extend_from_slice(host);
    out.extend_from_slice(&e.data);
}

fn write_control_command(c: &ControlCommand, out: &mut Vec<u8>) {
    let data = c.data.as_deref().unwrap_or(&[]);
    write_i32(out, c.control_command_type);
    write_u32(out, data.len() as u32);
    out.extend_from_slice(data);
}

fn write_watch(w: &Watch, out: &mut Vec<u8>) {
    write_u32(out, w.name.len() as u32);
    write_u32(out, w.value.len() as u32);
    write_i32(out, w.watch_type as i32);
    write_f64(out, encode_timestamp(w.timestamp));
    out.extend_from_slice(w.name.as_bytes());
    out.extend_from_slice(w.value.as_bytes());
}

fn write_process_flow(p: &ProcessFlow, out: &mut Vec<u8>) {
    let title = str_bytes(&p.title);
    let host = str_bytes(&p.host_name);
    write_i32(out, p.process_flow_type as i32);
    write_u32(out, title.len() as u32);
    write_u32(out, host.len() as u32);
    write_i32(out, p.process_id);
    write_i32(out, p.thread_id);
    write_f64(out, encode_timestamp(p.timestamp));
    out.extend_from_slice(title);
    out.extend_from_slice(host);
}

fn write_log_header(h: &LogHeader, out: &mut Vec<u8>) {
    write_u32(out, h.content.len() as u32);
    out.extend_from_slice(h.content.as_bytes());
}

/// Decodes one packet from `bytes`, returning the packet and the number of
/// bytes consumed (`6 + payload_size`). Used by tests and by any reader-side
/// consumer; the production write path never needs to decode its own output.
pub fn decode_packet(bytes: &[u8]) -> SiResult<(Packet, usize)> {
    if bytes.len() < 6 {
        return Err(truncated());
    }
    let packet_type = LittleEndian::read_u16(&bytes[0..2]);
    let payload_size = LittleEndian::read_u32(&bytes[2..6]) as usize;
    let total = 6 + payload_size;
    if bytes.len() < total {
        return Err(truncated());
    }
    let payload = &bytes[6..total];

    let packet = match packet_type {
        t if t == PacketType::LogEntry as u16 => Packet::LogEntry(decode_log_entry(payload)?),
        t if t == PacketType::ControlCommand as u16 => {
            Packet::ControlCommand(decode_control_command(payload)?)
        }
        t if t == PacketType::Watch as u16 => Packet::Watch(decode_watch(payload)?),
        t if t == PacketType::ProcessFlow as u16 => {
            Packet::ProcessFlow(decode_process_flow(payload)?)
        }
        t if t == PacketType::LogHeader as u16 => Packet::LogHeader(decode_log_header(payload)?),
        other => {
            return Err(SiError::ConnectionsParse {
                position: 0,
                reason: format!("unknown packet type tag {other}"),
            })
        }
    };
    Ok((packet, total))
}

fn truncated() -> SiError {
    SiError::ConnectionsParse {
        position: 0,
        reason: "truncated packet".to_string(),
    }
}

fn take_string(payload: &[u8], offset: &mut usize, len: usize) -> SiResult<Option<String>> {
    if payload.len() < *offset + len {
        return Err(truncated());
    }
    let bytes = &payload[*offset..*offset + len];
    *offset += len;
    if len == 0 {
        return Ok(None);
    }
    String::from_utf8(bytes.to_vec())
        .map(Some)
        .map_err(|_| truncated())
}

fn decode_log_entry(payload: &[u8]) -> SiResult<LogEntry> {
    if payload.len() < 48 {
        return Err(truncated());
    }
    let log_entry_type = LittleEndian::read_i32(&payload[0..4]);
    let viewer_id = crate::packet::ViewerId::from_i32(LittleEndian::read_i32(&payload[4..8]));
    let len_app = LittleEndian::read_u32(&payload[8..12]) as usize;
    let len_session = LittleEndian::read_u32(&payload[12..16]) as usize;
    let len_title = LittleEndian::read_u32(&payload[16..20]) as usize;
    let len_host = LittleEndian::read_u32(&payload[20..24]) as usize;
    let len_data = LittleEndian::read_u32(&payload[24..28]) as usize;
    let process_id = LittleEndian::read_i32(&payload[28..32]);
    let thread_id = LittleEndian::read_i32(&payload[32..36]);
    let timestamp = decode_timestamp(LittleEndian::read_f64(&payload[36..44]));
    let color_raw = LittleEndian::read_u32(&payload[44..48]);
    let color = if color_raw == DEFAULT_COLOR {
        None
    } else {
        Some(color_raw)
    };

    let mut offset = 48;
    let app_name = take_string(payload, &mut offset, len_app)?;
    let session_name = take_string(payload, &mut offset, len_session)?;
    let title = take_string(payload, &mut offset, len_title)?;
    let host_name = take_string(payload, &mut offset, len_host)?;
    if payload.len() < offset + len_data {
        return Err(truncated());
    }
    let data = payload[offset..offset + len_data].to_vec();

    Ok(LogEntry {
        level: crate::level::Level::Debug,
        log_entry_type,
        viewer_id,
        app_name,
        session_name,
        title,
        host_name,
        data,
        process_id,
        thread_id,
        timestamp,
        color,
    })
}

fn decode_control_command(payload: &[u8]) -> SiResult<ControlCommand> {
    if payload.len() < 8 {
        return Err(truncated());
    }
    let control_command_type = LittleEndian::read_i32(&payload[0..4]);
    let len_data = LittleEndian::read_u32(&payload[4..8]) as usize;
    if payload.len() < 8 + len_data {
        return Err(truncated());
    }
    let data = if len_data == 0 {
        None
    } else {
        Some(payload[8..8 + len_data].to_vec())
    };
    Ok(ControlCommand {
        level: crate::level::Level::Control,
        control_command_type,
        data,
    })
}

fn decode_watch(payload: &[u8]) -> SiResult<Watch> {
    if payload.len() < 20 {
        return Err(truncated());
    }
    let len_name = LittleEndian::read_u32(&payload[0..4]) as usize;
    let len_value = LittleEndian::read_u32(&payload[4..8]) as usize;
    let watch_type_raw = LittleEndian::read_i32(&payload[8..12]);
    let timestamp = decode_timestamp(LittleEndian::read_f64(&payload[12..20]));
    let watch_type = match watch_type_raw {
        0 => crate::packet::WatchType::Char,
        1 => crate::packet::WatchType::String,
        2 => crate::packet::WatchType::Integer,
        3 => crate::packet::WatchType::Float,
        4 => crate::packet::WatchType::Boolean,
        5 => crate::packet::WatchType::Address,
        6 => crate::packet::WatchType::Timestamp,
        _ => crate::packet::WatchType::Object,
    };
    let mut offset = 20;
    let name = take_string(payload, &mut offset, len_name)?.unwrap_or_default();
    let value = take_string(payload, &mut offset, len_value)?.unwrap_or_default();
    Ok(Watch {
        level: crate::level::Level::Debug,
        name,
        value,
        watch_type,
        timestamp,
    })
}

fn decode_process_flow(payload: &[u8]) -> SiResult<ProcessFlow> {
    if payload.len() < 28 {
        return Err(truncated());
    }
    let pft_raw = LittleEndian::read_i32(&payload[0..4]);
    let len_title = LittleEndian::read_u32(&payload[4..8]) as usize;
    let len_host = LittleEndian::read_u32(&payload[8..12]) as usize;
    let process_id = LittleEndian::read_i32(&payload[12..16]);
    let thread_id = LittleEndian::read_i32(&payload[16..20]);
    let timestamp = decode_timestamp(LittleEndian::read_f64(&payload[20..28]));
    let process_flow_type = match pft_raw {
        0 => crate::packet::ProcessFlowType::EnterMethod,
        1 => crate::packet::ProcessFlowType::LeaveMethod,
        2 => crate::packet::ProcessFlowType::EnterThread,
        3 => crate::packet::ProcessFlowType::LeaveThread,
        4 => crate::packet::ProcessFlowType::EnterProcess,
        _ => crate::packet::ProcessFlowType::LeaveProcess,
    };
    let mut offset = 28;
    let title = take_string(payload, &mut offset, len_title)?;
    let host_name = take_string(payload, &mut offset, len_host)?;
    Ok(ProcessFlow {
        level: crate::level::Level::Debug,
        process_flow_type,
        title,
        host_name,
        process_id,
        thread_id,
        timestamp,
    })
}

fn decode_log_header(payload: &[u8]) -> SiResult<LogHeader> {
    if payload.len() < 4 {
        return Err(truncated());
    }
    let len_content = LittleEndian::read_u32(&payload[0..4]) as usize;
    if payload.len() < 4 + len_content {
        return Err(truncated());
    }
    let content = String::from_utf8(payload[4..4 + len_content].to_vec()).map_err(|_| truncated())?;
    Ok(LogHeader {
        level: crate::level::Level::Control,
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::ViewerId;

    #[test]
    fn s2_log_entry_byte_exact_encoding() {
        let mut e = LogEntry::new(2, "T");
        e.app_name = Some("A".into());
        e.session_name = Some("S".into());
        e.host_name = Some("H".into());
        e.viewer_id = ViewerId::Title;
        e.process_id = 1;
        e.thread_id = 2;
        e.timestamp = 0;
        e.color = None;

        let mut fmt = BinaryFormatter::new();
        let bytes = fmt.encode(&Packet::LogEntry(e)).to_vec();

        assert_eq!(&bytes[0..2], &[0x02, 0x00], "packet type tag");
        let payload_size = LittleEndian::read_u32(&bytes[2..6]) as usize;
        assert_eq!(payload_size, bytes.len() - 6);
        assert_eq!(&bytes[6..10], &2_i32.to_le_bytes(), "log entry type = Message(2)");
        assert_eq!(&bytes[10..14], &0_i32.to_le_bytes(), "viewer id = Title(0)");
        assert_eq!(&bytes[14..18], &1_u32.to_le_bytes(), "len appname");
        assert_eq!(&bytes[18..22], &1_u32.to_le_bytes(), "len session");
        assert_eq!(&bytes[22..26], &1_u32.to_le_bytes(), "len title");
        assert_eq!(&bytes[26..30], &1_u32.to_le_bytes(), "len host");
        assert_eq!(&bytes[30..34], &0_u32.to_le_bytes(), "len data");
        assert_eq!(&bytes[34..38], &1_i32.to_le_bytes(), "pid");
        assert_eq!(&bytes[38..42], &2_i32.to_le_bytes(), "tid");
        assert_eq!(&bytes[50..54], &DEFAULT_COLOR.to_le_bytes(), "color sentinel");
        assert_eq!(&bytes[54..58], b"ASTH", "trailing string data block");
    }

    #[test]
    fn color_sentinel_bytes_match_property_3() {
        let mut e = LogEntry::new(0, "x");
        e.color = None;
        let mut fmt = BinaryFormatter::new();
        let bytes = fmt.encode(&Packet::LogEntry(e)).to_vec();
        assert_eq!(&bytes[50..54], &[0x05, 0x00, 0x00, 0xFF]);
    }

    #[test]
    fn round_trip_preserves_common_fields() {
        let mut e = LogEntry::new(7, "hello");
        e.app_name = Some("app".into());
        e.session_name = Some("sess".into());
        e.host_name = Some("host".into());
        e.data = vec![1, 2, 3, 4];
        e.process_id = 42;
        e.thread_id = 7;
        e.color = Some(crate::wire::color::pack_color(10, 20, 30, 255));

        let mut fmt = BinaryFormatter::new();
        let bytes = fmt.encode(&Packet::LogEntry(e.clone())).to_vec();
        let (decoded, consumed) = decode_packet(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        match decoded {
            Packet::LogEntry(d) => {
                assert_eq!(d.log_entry_type, e.log_entry_type);
                assert_eq!(d.app_name, e.app_name);
                assert_eq!(d.session_name, e.session_name);
                assert_eq!(d.title, e.title);
                assert_eq!(d.host_name, e.host_name);
                assert_eq!(d.data, e.data);
                assert_eq!(d.process_id, e.process_id);
                assert_eq!(d.thread_id, e.thread_id);
                assert_eq!(d.color, e.color);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn null_enum_decodes_as_none_viewer() {
        let mut e = LogEntry::new(0, "x");
        e.viewer_id = ViewerId::None;
        let mut fmt = BinaryFormatter::new();
        let bytes = fmt.encode(&Packet::LogEntry(e)).to_vec();
        assert_eq!(&bytes[10..14], &(-1_i32).to_le_bytes());
        let (decoded, _) = decode_packet(&bytes).unwrap();
        match decoded {
            Packet::LogEntry(d) => assert_eq!(d.viewer_id, ViewerId::None),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn header_length_sum_equals_data_block_len() {
        let mut e = LogEntry::new(0, "title");
        e.app_name = Some("app".into());
        e.session_name = Some("session".into());
        e.host_name = Some("host".into());
        e.data = vec![9; 12];
        let mut fmt = BinaryFormatter::new();
        let bytes = fmt.encode(&Packet::LogEntry(e)).to_vec();
        let len_app = LittleEndian::read_u32(&bytes[14..18]) as usize;
        let len_session = LittleEndian::read_u32(&bytes[18..22]) as usize;
        let len_title = LittleEndian::read_u32(&bytes[22..26]) as usize;
        let len_host = LittleEndian::read_u32(&bytes[26..30]) as usize;
        let len_data = LittleEndian::read_u32(&bytes[30..34]) as usize;
        let data_block_len = bytes.len() - 6 - 48;
        assert_eq!(len_app + len_session + len_title + len_host + len_data, data_block_len);
    }
}
