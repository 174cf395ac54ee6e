//! A tiny `yyyy-MM-dd HH:mm:ss.SSS`-style formatter, matching the pattern
//! language `%timestamp%` options use (.NET/Java style tokens), not
//! `time`'s own `format_description` syntax.

use time::OffsetDateTime;

/// Formats `dt` according to a `yyyy`/`MM`/`dd`/`HH`/`mm`/`ss`/`SSS` pattern.
/// Unrecognized characters pass through literally.
#[must_use]
pub fn format(dt: OffsetDateTime, pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let run_len = run_length(&chars, i);
        let token: String = chars[i..i + run_len].iter().collect();
        match token.as_str() {
            "yyyy" => out.push_str(&format!("{:04}", dt.year())),
            "yy" => out.push_str(&format!("{:02}", dt.year() % 100)),
            "MM" => out.push_str(&format!("{:02}", u8::from(dt.month()))),
            "dd" => out.push_str(&format!("{:02}", dt.day())),
            "HH" => out.push_str(&format!("{:02}", dt.hour())),
            "mm" => out.push_str(&format!("{:02}", dt.minute())),
            "ss" => out.push_str(&format!("{:02}", dt.second())),
            "SSS" => out.push_str(&format!("{:03}", dt.millisecond())),
            _ => out.push_str(&token),
        }
        i += run_len;
    }
    out
}

fn run_length(chars: &[char], start: usize) -> usize {
    let c = chars[start];
    if !c.is_ascii_alphabetic() {
        return 1;
    }
    let mut len = 1;
    while start + len < chars.len() && chars[start + len] == c {
        len += 1;
    }
    len
}
