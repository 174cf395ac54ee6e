//! Typed parsing of option values (§4.1). Every parser here is
//! best-effort: an invalid value falls back to a caller-supplied default
//! rather than erroring, matching the spec's "invalid ⇒ default" rule.

use crate::level::Level;
use std::str::FromStr;

/// Parses `true|1|yes` (case-insensitive) as `true`, anything else as `false`.
#[must_use]
pub fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => true,
        "" => default,
        _ => false,
    }
}

/// Parses a non-negative decimal integer; invalid input ⇒ `default`.
#[must_use]
pub fn parse_integer(value: &str, default: i64) -> i64 {
    match value.trim().parse::<i64>() {
        Ok(n) if n >= 0 => n,
        _ => default,
    }
}

/// Parses a level name case-insensitively; invalid input ⇒ `default`.
#[must_use]
pub fn parse_level(value: &str, default: Level) -> Level {
    Level::from_str(value.trim()).unwrap_or(default)
}

/// Parses an integer with an optional binary-multiple suffix (`KB|MB|GB`)
/// into a byte count; invalid input ⇒ `default`.
#[must_use]
pub fn parse_size(value: &str, default: u64) -> u64 {
    let value = value.trim();
    let (digits, multiplier) = split_suffix(
        value,
        &[("GB", 1024 * 1024 * 1024), ("MB", 1024 * 1024), ("KB", 1024)],
    );
    match digits.trim().parse::<u64>() {
        Ok(n) => n.saturating_mul(multiplier),
        Err(_) => default,
    }
}

/// Parses an integer with an optional duration suffix (`s|m|h|d`) into
/// milliseconds; invalid input ⇒ `default`.
#[must_use]
pub fn parse_timespan_ms(value: &str, default: u64) -> u64 {
    let value = value.trim();
    let (digits, multiplier) = split_suffix(
        value,
        &[
            ("d", 86_400_000),
            ("h", 3_600_000),
            ("m", 60_000),
            ("s", 1_000),
        ],
    );
    match digits.trim().parse::<u64>() {
        Ok(n) => n.saturating_mul(multiplier),
        Err(_) => default,
    }
}

fn split_suffix<'a>(value: &'a str, suffixes: &[(&str, u64)]) -> (&'a str, u64) {
    for (suffix, multiplier) in suffixes {
        if value.len() > suffix.len() && value[value.len() - suffix.len()..].eq_ignore_ascii_case(suffix) {
            return (&value[..value.len() - suffix.len()], *multiplier);
        }
    }
    (value, 1)
}

/// Parses `0x`/`&H`/`$`-prefixed hex into an ARGB color (alpha defaults to
/// `0xFF` for 6 hex digits); invalid input ⇒ `default`.
#[must_use]
pub fn parse_color(value: &str, default: u32) -> u32 {
    let value = value.trim();
    let hex = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .or_else(|| value.strip_prefix("&H"))
        .or_else(|| value.strip_prefix("&h"))
        .or_else(|| value.strip_prefix('$'));
    let Some(hex) = hex else {
        return default;
    };
    if hex.len() % 2 == 1 {
        // odd-length is zero-padded on the left
        return parse_color(&format!("0x0{hex}"), default);
    }
    let owned;
    let hex = if hex.len() == 6 {
        owned = format!("FF{hex}");
        owned.as_str()
    } else {
        hex
    };
    if hex.len() != 8 {
        return default;
    }
    match u32::from_str_radix(hex, 16) {
        Ok(aarrggbb) => {
            let a = (aarrggbb >> 24) & 0xFF;
            let r = (aarrggbb >> 16) & 0xFF;
            let g = (aarrggbb >> 8) & 0xFF;
            let b = aarrggbb & 0xFF;
            crate::wire::color::pack_color(r as u8, g as u8, b as u8, a as u8)
        }
        Err(_) => default,
    }
}

/// UTF-8 bytes of `value`, left-padded with zero bytes or right-truncated to
/// exactly `len` bytes.
#[must_use]
pub fn parse_bytes(value: &str, len: usize) -> Vec<u8> {
    let mut bytes = value.as_bytes().to_vec();
    if bytes.len() > len {
        bytes.truncate(len);
    } else if bytes.len() < len {
        let mut padded = vec![0u8; len - bytes.len()];
        padded.extend_from_slice(&bytes);
        bytes = padded;
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_variants() {
        assert!(parse_bool("true", false));
        assert!(parse_bool("1", false));
        assert!(parse_bool("yes", false));
        assert!(parse_bool("YES", false));
        assert!(!parse_bool("false", true));
        assert!(!parse_bool("nonsense", true));
    }

    #[test]
    fn integer_rejects_negative() {
        assert_eq!(parse_integer("42", 0), 42);
        assert_eq!(parse_integer("-1", 7), 7);
        assert_eq!(parse_integer("nope", 7), 7);
    }

    #[test]
    fn size_suffixes() {
        assert_eq!(parse_size("2", 0), 2);
        assert_eq!(parse_size("2KB", 0), 2048);
        assert_eq!(parse_size("2MB", 0), 2 * 1024 * 1024);
        assert_eq!(parse_size("2GB", 0), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("bogus", 99), 99);
    }

    #[test]
    fn timespan_suffixes() {
        assert_eq!(parse_timespan_ms("5s", 0), 5_000);
        assert_eq!(parse_timespan_ms("2m", 0), 120_000);
        assert_eq!(parse_timespan_ms("1h", 0), 3_600_000);
        assert_eq!(parse_timespan_ms("1d", 0), 86_400_000);
        assert_eq!(parse_timespan_ms("100", 0), 100);
    }

    #[test]
    fn color_six_and_eight_digit() {
        let c = parse_color("0xFF0000", 0);
        let (r, g, b, a) = crate::wire::color::unpack_color(c);
        assert_eq!((r, g, b, a), (0xFF, 0, 0, 0xFF));

        let c2 = parse_color("0x80FF0000", 0);
        let (r2, g2, b2, a2) = crate::wire::color::unpack_color(c2);
        assert_eq!((r2, g2, b2, a2), (0xFF, 0, 0, 0x80));
    }

    #[test]
    fn color_invalid_falls_back_to_default() {
        assert_eq!(parse_color("not-a-color", 0xABCD), 0xABCD);
    }

    #[test]
    fn bytes_padding_and_truncation() {
        assert_eq!(parse_bytes("ab", 4), vec![0, 0, b'a', b'b']);
        assert_eq!(parse_bytes("abcdef", 4), vec![b'a', b'b', b'c', b'd']);
    }
}
