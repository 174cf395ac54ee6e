//! TCP transport (§4.8): banner handshake, then a LogHeader, then packets
//! through the binary formatter over an 8 KiB buffered writer flushed after
//! each write.

use std::io::{BufWriter, Write};
use std::net::TcpStream;
use std::time::Duration;

use log::{debug, trace};

use crate::error::{SiError, SiResult};
use crate::options::LookupTable;
use crate::packet::{LogHeader, Packet};
use crate::protocol::{handshake, hostname, is_base_option, BaseOptions, Protocol};
use crate::wire::BinaryFormatter;

const WRITE_BUFFER: usize = 8 * 1024;

pub struct TcpProtocol {
    base: BaseOptions,
    host: String,
    port: u16,
    timeout: Duration,
    stream: Option<BufWriter<TcpStream>>,
    formatter: BinaryFormatter,
}

impl TcpProtocol {
    #[must_use]
    pub fn from_table(table: &LookupTable) -> Self {
        let base = BaseOptions::from_table("tcp", table);
        Self {
            host: table.get_string("host", "127.0.0.1"),
            port: table.get_integer("port", 4228) as u16,
            timeout: Duration::from_millis(table.get_timespan_ms("timeout", 30_000)),
            base,
            stream: None,
            formatter: BinaryFormatter::new(),
        }
    }
}

impl Protocol for TcpProtocol {
    fn name(&self) -> &str {
        "tcp"
    }

    fn caption(&self) -> &str {
        &self.base.caption
    }

    fn is_valid_option(&self, key: &str) -> bool {
        is_base_option(key) || matches!(key.to_ascii_lowercase().as_str(), "host" | "port" | "timeout")
    }

    fn connect(&mut self) -> SiResult<()> {
        use std::net::ToSocketAddrs;
        trace!("connecting tcp sink {}:{}", self.host, self.port);
        let addr = format!("{}:{}", self.host, self.port);
        let sock_addr = addr
            .to_socket_addrs()
            .map_err(|e| SiError::connect(self.base.caption.clone(), e))?
            .next()
            .ok_or_else(|| {
                SiError::connect(
                    self.base.caption.clone(),
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid host/port"),
                )
            })?;

        let mut tcp = TcpStream::connect_timeout(&sock_addr, self.timeout)
            .map_err(|e| SiError::connect(self.base.caption.clone(), e))?;
        tcp.set_read_timeout(Some(self.timeout)).ok();
        tcp.set_write_timeout(Some(self.timeout)).ok();

        handshake(&mut tcp, &self.base.caption)?;

        let mut writer = BufWriter::with_capacity(WRITE_BUFFER, tcp);
        let header = LogHeader::new(&[
            ("hostname", &hostname()),
            ("appname", env!("CARGO_PKG_NAME")),
        ]);
        let bytes = self.formatter.encode(&Packet::from(header)).to_vec();
        writer
            .write_all(&bytes)
            .and_then(|()| writer.flush())
            .map_err(|e| SiError::connect(self.base.caption.clone(), e))?;

        self.stream = Some(writer);
        debug!("tcp sink {} connected", self.base.caption);
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet) -> SiResult<()> {
        if !self.base.passes_level_gate(packet) {
            return Ok(());
        }
        if self.stream.is_none() {
            self.connect()?;
        }
        let bytes = self.formatter.encode(packet).to_vec();
        let writer = self.stream.as_mut().ok_or_else(|| SiError::Closed(self.base.caption.clone()))?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    fn disconnect(&mut self) -> SiResult<()> {
        if let Some(mut w) = self.stream.take() {
            trace!("disconnecting tcp sink {}", self.base.caption);
            w.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_spec() {
        let table = LookupTable::new(vec![]);
        let proto = TcpProtocol::from_table(&table);
        assert_eq!(proto.host, "127.0.0.1");
        assert_eq!(proto.port, 4228);
        assert_eq!(proto.timeout, Duration::from_millis(30_000));
    }

    #[test]
    fn accepts_base_and_own_options() {
        let table = LookupTable::new(vec![]);
        let proto = TcpProtocol::from_table(&table);
        assert!(proto.is_valid_option("host"));
        assert!(proto.is_valid_option("reconnect"));
        assert!(!proto.is_valid_option("pipename"));
    }
}
