//! Turns a connections string into a fresh set of [`Pipeline`]s (§4.1, §6).
//! Building is pure: nothing here touches an existing `SmartInspect`'s
//! protocol list, so a caller can build the replacement first and only swap
//! it in once it's known to be valid.

use crate::error::{SiError, SiResult};
use crate::options::{connections_parser, LookupTable};
use crate::pipeline::{ErrorCallback, Pipeline};
use crate::protocol::{
    text_protocol, BaseOptions, BinaryFileFormat, FileProtocol, MemoryProtocol, PipeProtocol,
    Protocol, TcpProtocol,
};

fn build_protocol(name: &str, table: &LookupTable) -> SiResult<Box<dyn Protocol>> {
    match name.to_ascii_lowercase().as_str() {
        "file" => Ok(Box::new(FileProtocol::from_table(BinaryFileFormat::new(), table, true)?)),
        "text" => Ok(Box::new(text_protocol::build(table)?)),
        "tcp" => Ok(Box::new(TcpProtocol::from_table(table))),
        "pipe" => Ok(Box::new(PipeProtocol::from_table(table))),
        "mem" | "memory" => Ok(Box::new(MemoryProtocol::from_table(table))),
        other => Err(SiError::UnknownProtocol(other.to_string())),
    }
}

fn render_options_string(entries: &[(String, String)]) -> String {
    entries
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses `conns`, instantiates a protocol per entry, and rejects any
/// option key the chosen protocol doesn't recognise — a fatal configuration
/// error surfaced synchronously, never left for the error callback (§4.1,
/// §7). Every `Pipeline` in the returned list is independent and
/// unconnected; each protocol lazily connects on its first write.
pub fn build_pipelines(conns: &str, error_cb: ErrorCallback) -> SiResult<Vec<Pipeline>> {
    let entries = connections_parser::parse(conns)?;
    let mut pipelines = Vec::with_capacity(entries.len());

    for entry in entries {
        let table = LookupTable::new(entry.options.clone());
        let protocol = build_protocol(&entry.protocol, &table)?;

        for key in table.keys() {
            if !protocol.is_valid_option(key) {
                return Err(SiError::UnknownOption {
                    protocol: entry.protocol.clone(),
                    key: key.to_string(),
                });
            }
        }

        let base = BaseOptions::from_table(&entry.protocol, &table);
        let options_string = render_options_string(&entry.options);
        pipelines.push(Pipeline::new(
            entry.protocol,
            options_string,
            protocol,
            base,
            error_cb.clone(),
        ));
    }

    Ok(pipelines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn no_op_error_cb() -> ErrorCallback {
        Arc::new(|_event| {})
    }

    #[test]
    fn s1_builds_one_pipeline_per_entry() {
        let pipelines = build_pipelines("mem(),tcp(host=10.0.0.1,port=4228)", no_op_error_cb()).unwrap();
        assert_eq!(pipelines.len(), 2);
        assert_eq!(pipelines[0].name(), "mem");
        assert_eq!(pipelines[1].name(), "tcp");
    }

    #[test]
    fn unknown_protocol_is_fatal() {
        let err = build_pipelines("bogus()", no_op_error_cb()).unwrap_err();
        assert!(matches!(err, SiError::UnknownProtocol(name) if name == "bogus"));
    }

    #[test]
    fn unknown_option_is_fatal() {
        let err = build_pipelines("tcp(wat=1)", no_op_error_cb()).unwrap_err();
        assert!(matches!(err, SiError::UnknownOption { .. }));
    }

    #[test]
    fn text_protocol_rejects_encrypt() {
        let err = build_pipelines("text(encrypt=true,key=0123456789abcdef)", no_op_error_cb()).unwrap_err();
        assert!(matches!(err, SiError::Usage(_)));
    }
}
