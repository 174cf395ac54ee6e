//! Typed accessor over a protocol's option list (§3, §10). Options are
//! kept in an insertion-ordered `Vec` rather than a `HashMap`, mirroring
//! how the teacher stores server-reported key/value pairs: option lists
//! here are tiny (a handful of entries per protocol), so linear lookup
//! costs nothing and preserves source order for diagnostics.

use crate::level::Level;
use crate::options::value_parser;

#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: Vec<(String, String)>,
}

impl LookupTable {
    #[must_use]
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.raw(key).is_some()
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.raw(key).map_or_else(|| default.to_string(), str::to_string)
    }

    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.raw(key).map_or(default, |v| value_parser::parse_bool(v, default))
    }

    #[must_use]
    pub fn get_integer(&self, key: &str, default: i64) -> i64 {
        self.raw(key).map_or(default, |v| value_parser::parse_integer(v, default))
    }

    #[must_use]
    pub fn get_level(&self, key: &str, default: Level) -> Level {
        self.raw(key).map_or(default, |v| value_parser::parse_level(v, default))
    }

    #[must_use]
    pub fn get_size(&self, key: &str, default: u64) -> u64 {
        self.raw(key).map_or(default, |v| value_parser::parse_size(v, default))
    }

    #[must_use]
    pub fn get_timespan_ms(&self, key: &str, default: u64) -> u64 {
        self.raw(key)
            .map_or(default, |v| value_parser::parse_timespan_ms(v, default))
    }

    #[must_use]
    pub fn get_color(&self, key: &str, default: u32) -> u32 {
        self.raw(key).map_or(default, |v| value_parser::parse_color(v, default))
    }

    #[must_use]
    pub fn get_bytes(&self, key: &str, len: usize) -> Vec<u8> {
        self.raw(key).map_or_else(|| vec![0u8; len], |v| value_parser::parse_bytes(v, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LookupTable {
        LookupTable::new(vec![
            ("filename".to_string(), "log.sil".to_string()),
            ("append".to_string(), "true".to_string()),
            ("maxsize".to_string(), "2MB".to_string()),
            ("level".to_string(), "warning".to_string()),
        ])
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let t = table();
        assert_eq!(t.get_string("FileName", ""), "log.sil");
    }

    #[test]
    fn typed_accessors_parse_values() {
        let t = table();
        assert!(t.get_bool("append", false));
        assert_eq!(t.get_size("maxsize", 0), 2 * 1024 * 1024);
        assert_eq!(t.get_level("level", Level::Debug), Level::Warning);
    }

    #[test]
    fn missing_key_returns_default() {
        let t = table();
        assert_eq!(t.get_integer("missing", 77), 77);
        assert!(!t.contains("missing"));
    }
}
