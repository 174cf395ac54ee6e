//! Connections-string parsing and typed option access (§4.1).

pub mod connections_parser;
pub mod lookup_table;
pub mod value_parser;

pub use connections_parser::{parse as parse_connections, ConnectionEntry};
pub use lookup_table::LookupTable;
