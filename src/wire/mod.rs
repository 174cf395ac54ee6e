//! The binary wire codec (§4.5): fixed little-endian packet framing that
//! must reproduce the external Console reader's byte layout exactly.

pub mod binary_formatter;
pub mod color;
pub mod timestamp;

pub use binary_formatter::{decode_packet, BinaryFormatter};
pub use color::{pack_color, unpack_color, DEFAULT_COLOR};
pub use timestamp::{decode_timestamp, encode_timestamp};
