//! Local named-pipe transport (§4.8). Shares the banner handshake with
//! [`TcpProtocol`](super::tcp_protocol); the endpoint itself comes from
//! `interprocess`'s cross-platform local socket, which resolves to a real
//! Windows named pipe (`\\.\pipe\<name>`) or a Unix domain socket / abstract
//! namespace elsewhere.

use std::io::{BufWriter, Write};

use interprocess::local_socket::{LocalSocketStream, NameTypeSupport};
use log::{debug, trace};

use crate::error::{SiError, SiResult};
use crate::options::LookupTable;
use crate::packet::{LogHeader, Packet};
use crate::protocol::{handshake, hostname, is_base_option, BaseOptions, Protocol};
use crate::wire::BinaryFormatter;

const WRITE_BUFFER: usize = 8 * 1024;

pub struct PipeProtocol {
    base: BaseOptions,
    pipe_name: String,
    stream: Option<BufWriter<LocalSocketStream>>,
    formatter: BinaryFormatter,
}

impl PipeProtocol {
    #[must_use]
    pub fn from_table(table: &LookupTable) -> Self {
        Self {
            base: BaseOptions::from_table("pipe", table),
            pipe_name: table.get_string("pipename", "smartinspect"),
            stream: None,
            formatter: BinaryFormatter::new(),
        }
    }

    fn endpoint_name(&self) -> String {
        match NameTypeSupport::query() {
            NameTypeSupport::OnlyPaths => format!("/tmp/{}.sock", self.pipe_name),
            NameTypeSupport::OnlyNamespaced | NameTypeSupport::Both => format!("@{}", self.pipe_name),
        }
    }
}

impl Protocol for PipeProtocol {
    fn name(&self) -> &str {
        "pipe"
    }

    fn caption(&self) -> &str {
        &self.base.caption
    }

    fn is_valid_option(&self, key: &str) -> bool {
        is_base_option(key) || key.eq_ignore_ascii_case("pipename")
    }

    fn connect(&mut self) -> SiResult<()> {
        trace!("connecting pipe sink {}", self.endpoint_name());
        let mut socket = LocalSocketStream::connect(self.endpoint_name().as_str())
            .map_err(|e| SiError::connect(self.base.caption.clone(), e))?;

        handshake(&mut socket, &self.base.caption)?;

        let mut writer = BufWriter::with_capacity(WRITE_BUFFER, socket);
        let header = LogHeader::new(&[("hostname", &hostname()), ("appname", env!("CARGO_PKG_NAME"))]);
        let bytes = self.formatter.encode(&Packet::from(header)).to_vec();
        writer
            .write_all(&bytes)
            .and_then(|()| writer.flush())
            .map_err(|e| SiError::connect(self.base.caption.clone(), e))?;

        self.stream = Some(writer);
        debug!("pipe sink {} connected", self.base.caption);
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
            trace!("disconnecting pipe sink {}", self.base.caption);
            w.flush()?;
        }
        Ok(())
    }
}
