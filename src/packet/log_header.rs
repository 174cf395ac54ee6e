use crate::level::Level;

/// Metadata emitted automatically right after a (re)connect: key/value pairs
/// rendered as `k=v\r\n...`, carrying at least `hostname` and `appname`.
#[derive(Debug, Clone)]
pub struct LogHeader {
    pub level: Level,
    pub content: String,
}

impl LogHeader {
    #[must_use]
    pub fn new(fields: &[(&str, &str)]) -> Self {
        let mut content = String::new();
        for (key, value) in fields {
            content.push_str(key);
            content.push('=');
            content.push_str(value);
            content.push_str("\r\n");
        }
        Self {
            level: Level::Control,
            content,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        4 + self.content.len()
    }
}
