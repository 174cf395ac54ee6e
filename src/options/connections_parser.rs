//! Parses a `name(k=v,...),name(k=v,...)` connections string (§4.1).

use crate::error::{SiError, SiResult};

/// One parsed `protocol(k=v,...)` entry, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEntry {
    pub protocol: String,
    pub options: Vec<(String, String)>,
}

/// Parses a whole connections string into its entries. Errors carry the
/// rune position of the problem (missing `(`/`)`), or name the offending
/// protocol (unterminated quote).
pub fn parse(conns: &str) -> SiResult<Vec<ConnectionEntry>> {
    let chars: Vec<char> = conns.chars().collect();
    let mut pos = 0;
    let mut entries = Vec::new();

    while pos < chars.len() {
        skip_ws(&chars, &mut pos);
        if pos >= chars.len() {
            break;
        }
        let entry = parse_entry(&chars, &mut pos)?;
        entries.push(entry);
        skip_ws(&chars, &mut pos);
        if pos < chars.len() && chars[pos] == ',' {
            pos += 1;
        } else if pos < chars.len() {
            return Err(SiError::ConnectionsParse {
                position: pos,
                reason: format!("expected ',' or end of string, found '{}'", chars[pos]),
            });
        }
    }
    Ok(entries)
}

fn skip_ws(chars: &[char], pos: &mut usize) {
    while *pos < chars.len() && chars[*pos].is_whitespace() {
        *pos += 1;
    }
}

fn parse_entry(chars: &[char], pos: &mut usize) -> SiResult<ConnectionEntry> {
    let name_start = *pos;
    while *pos < chars.len() && chars[*pos] != '(' {
        *pos += 1;
    }
    if *pos >= chars.len() {
        return Err(SiError::ConnectionsParse {
            position: name_start,
            reason: "missing '(' after protocol name".to_string(),
        });
    }
    let protocol: String = chars[name_start..*pos].iter().collect::<String>();
    let protocol = protocol.trim().to_string();
    *pos += 1; // consume '('

    let mut options = Vec::new();
    skip_ws(chars, pos);
    if *pos < chars.len() && chars[*pos] == ')' {
        *pos += 1;
        return Ok(ConnectionEntry { protocol, options });
    }

    loop {
        let pair = parse_pair(chars, pos, &protocol)?;
        options.push(pair);
        skip_ws(chars, pos);
        match chars.get(*pos) {
            Some(',') => {
                *pos += 1;
                skip_ws(chars, pos);
            }
            Some(')') => {
                *pos += 1;
                break;
            }
            _ => {
                return Err(SiError::ConnectionsParse {
                    position: *pos,
                    reason: "missing ')' to close option list".to_string(),
                })
            }
        }
    }
    Ok(ConnectionEntry { protocol, options })
}

fn parse_pair(chars: &[char], pos: &mut usize, protocol: &str) -> SiResult<(String, String)> {
    let key_start = *pos;
    while *pos < chars.len() && chars[*pos] != '=' {
        *pos += 1;
    }
    if *pos >= chars.len() {
        return Err(SiError::ConnectionsParse {
            position: key_start,
            reason: "missing '=' in option".to_string(),
        });
    }
    let key: String = chars[key_start..*pos].iter().collect::<String>();
    let key = key.trim().to_string();
    *pos += 1; // consume '='

    let value = if chars.get(*pos) == Some(&'"') {
        parse_quoted_value(chars, pos, protocol)?
    } else {
        parse_unquoted_value(chars, pos)
    };
    Ok((key, value))
}

fn parse_unquoted_value(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && chars[*pos] != ',' && chars[*pos] != ')' {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn parse_quoted_value(chars: &[char], pos: &mut usize, protocol: &str) -> SiResult<String> {
    *pos += 1; // consume opening quote
    let mut value = String::new();
    loop {
        match chars.get(*pos) {
            None => {
                return Err(SiError::ConnectionsParse {
                    position: *pos,
                    reason: format!("unterminated quoted value in protocol \"{protocol}\""),
                })
            }
            Some('"') => {
                if chars.get(*pos + 1) == Some(&'"') {
                    value.push('"');
                    *pos += 2;
                } else {
                    *pos += 1;
                    break;
                }
            }
            Some(c) => {
                value.push(*c);
                *pos += 1;
            }
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_two_protocol_entries() {
        let entries =
            parse(r#"file(filename="c:\a.sil", append=true), tcp(host=10.0.0.1,port=4228)"#)
                .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].protocol, "file");
        assert_eq!(
            entries[0].options,
            vec![
                ("filename".to_string(), r"c:\a.sil".to_string()),
                ("append".to_string(), "true".to_string()),
            ]
        );
        assert_eq!(entries[1].protocol, "tcp");
        assert_eq!(
            entries[1].options,
            vec![
                ("host".to_string(), "10.0.0.1".to_string()),
                ("port".to_string(), "4228".to_string()),
            ]
        );
    }

    #[test]
    fn missing_close_paren_reports_position() {
        let err = parse("file(filename=x").unwrap_err();
        match err {
            SiError::ConnectionsParse { position, .. } => assert_eq!(position, 15),
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn unterminated_quote_names_protocol() {
        let err = parse(r#"file(filename="unterminated)"#).unwrap_err();
        match err {
            SiError::ConnectionsParse { reason, .. } => assert!(reason.contains("file")),
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn doubled_quote_is_literal_quote() {
        let entries = parse(r#"file(title="a""b")"#).unwrap();
        assert_eq!(entries[0].options[0].1, "a\"b");
    }

    #[test]
    fn comma_and_paren_literal_inside_quotes() {
        let entries = parse(r#"file(title="a,b)c")"#).unwrap();
        assert_eq!(entries[0].options[0].1, "a,b)c");
    }

    #[test]
    fn empty_options_list() {
        let entries = parse("mem()").unwrap();
        assert_eq!(entries[0].protocol, "mem");
        assert!(entries[0].options.is_empty());
    }
}
