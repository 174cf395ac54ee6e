//! Parses a `%token%` pattern string into a sequence of literal and field
//! segments. Unknown token names degrade to literal text (§4.6, §9: a
//! name→constructor map with unknown names falling back to literal).

/// One parsed piece of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Field {
        name: String,
        options: Option<String>,
        width: Option<i32>,
    },
}

/// Parses `pattern` into segments. Never fails: anything that doesn't look
/// like a well-formed `%...%` token is literal text.
#[must_use]
pub fn parse(pattern: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let bytes: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == '%' {
            if let Some((segment, next)) = try_parse_field(&bytes, i) {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(segment);
                i = next;
                continue;
            }
        }
        literal.push(bytes[i]);
        i += 1;
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// Tries to parse a `%name%`, `%name,width%` or `%name{opts}%` field
/// starting at `start` (which must point at the opening `%`). Returns the
/// segment and the index just past the closing `%`.
fn try_parse_field(chars: &[char], start: usize) -> Option<(Segment, usize)> {
    let close = chars[start + 1..].iter().position(|&c| c == '%')?;
    let inner: String = chars[start + 1..start + 1 + close].iter().collect();
    if inner.is_empty() || inner.contains('%') {
        return None;
    }

    let (name_and_width, options) = if let Some(brace) = inner.find('{') {
        if !inner.ends_with('}') {
            return None;
        }
        (
            inner[..brace].to_string(),
            Some(inner[brace + 1..inner.len() - 1].to_string()),
        )
    } else {
        (inner, None)
    };

    let (name, width) = if let Some(comma) = name_and_width.find(',') {
        let width_str = &name_and_width[comma + 1..];
        match width_str.parse::<i32>() {
            Ok(w) => (name_and_width[..comma].to_string(), Some(w)),
            Err(_) => (name_and_width, None),
        }
    } else {
        (name_and_width, None)
    };

    Some((
        Segment::Field {
            name,
            options,
            width,
        },
        start + 2 + close,
    ))
}

/// Right/left-pads `text` per the `%name,width%` convention: positive width
/// right-aligns with leading spaces, negative width left-aligns with
/// trailing spaces to `|width|`.
#[must_use]
pub fn apply_width(text: &str, width: Option<i32>) -> String {
    let Some(width) = width else {
        return text.to_string();
    };
    let target = width.unsigned_abs() as usize;
    if text.chars().count() >= target {
        return text.to_string();
    }
    let pad = target - text.chars().count();
    if width < 0 {
        format!("{text}{}", " ".repeat(pad))
    } else {
        format!("{}{text}", " ".repeat(pad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_and_field() {
        let segs = parse("[%timestamp%] %level,8%: %title%");
        assert_eq!(
            segs,
            vec![
                Segment::Literal("[".into()),
                Segment::Field {
                    name: "timestamp".into(),
                    options: None,
                    width: None,
                },
                Segment::Literal("] ".into()),
                Segment::Field {
                    name: "level".into(),
                    options: None,
                    width: Some(8),
                },
                Segment::Literal(": ".into()),
                Segment::Field {
                    name: "title".into(),
                    options: None,
                    width: None,
                },
            ]
        );
    }

    #[test]
    fn unterminated_percent_is_literal() {
        let segs = parse("100% done");
        assert_eq!(segs, vec![Segment::Literal("100% done".into())]);
    }

    #[test]
    fn width_alignment() {
        assert_eq!(apply_width("hi", Some(5)), "   hi");
        assert_eq!(apply_width("hi", Some(-5)), "hi   ");
        assert_eq!(apply_width("toolong", Some(3)), "toolong");
    }

    #[test]
    fn options_syntax() {
        let segs = parse("%timestamp{yyyy-MM-dd}%");
        assert_eq!(
            segs,
            vec![Segment::Field {
                name: "timestamp".into(),
                options: Some("yyyy-MM-dd".into()),
                width: None,
            }]
        );
    }
}
