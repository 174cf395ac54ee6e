//! Text file sink: the generic [`FileProtocol`](super::file_protocol) wired
//! up with a line-oriented [`FileFormat`] (§4.7). Forbids `encrypt`/`key`.

use std::io::{self, Write};

use crate::error::SiResult;
use crate::options::LookupTable;
use crate::packet::Packet;
use crate::protocol::file_protocol::{FileFormat, FileProtocol};
use crate::text::TextFormatter;

pub struct TextFileFormat {
    formatter: TextFormatter,
}

impl TextFileFormat {
    #[must_use]
    pub fn new(pattern: &str, indent: bool) -> Self {
        Self {
            formatter: TextFormatter::new(pattern, indent),
        }
    }
}

impl FileFormat for TextFileFormat {
    fn default_filename(&self) -> &str {
        "log.txt"
    }

    fn write_header(&mut self, file: &mut dyn Write, current_size: u64) -> io::Result<()> {
        if current_size == 0 {
            file.write_all(&[0xEF, 0xBB, 0xBF])?; // UTF-8 BOM
        }
        Ok(())
    }

    fn write_footer(&mut self, _file: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }

    fn encode(&mut self, packet: &Packet) -> Vec<u8> {
        let mut line = self.formatter.format_packet(packet);
        if !line.is_empty() {
            line.push_str("\r\n");
        }
        line.into_bytes()
    }
}

/// Builds a text file protocol from a connections-string option table.
pub fn build(table: &LookupTable) -> SiResult<FileProtocol<TextFileFormat>> {
    let pattern = table.get_string("pattern", "[%timestamp%] %level,8%: %title%");
    let indent = table.get_bool("indent", false);
    FileProtocol::from_table(TextFileFormat::new(&pattern, indent), table, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::LogEntry;
    use crate::protocol::Protocol;
    use tempfile::tempdir;

    #[test]
    fn writes_bom_then_formatted_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let table = LookupTable::new(vec![("filename".to_string(), path.to_str().unwrap().to_string())]);
        let mut proto = build(&table).unwrap();
        proto.connect().unwrap();
        proto.write_packet(&Packet::from(LogEntry::new(0, "hi"))).unwrap();
        proto.disconnect().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert!(text.ends_with("hi\r\n"));
    }

    #[test]
    fn rejects_encrypt_option() {
        let table = LookupTable::new(vec![
            ("filename".to_string(), "log.txt".to_string()),
            ("encrypt".to_string(), "true".to_string()),
            ("key".to_string(), "0123456789abcdef".to_string()),
        ]);
        assert!(build(&table).is_err());
    }
}
