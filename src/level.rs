//! The severity level shared by every packet and by protocol level gating.

use std::str::FromStr;

/// Severity of a packet, from least to most severe. `Control` is reserved for
/// internal control commands and is above all application levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum Level {
    Debug = 0,
    Verbose = 1,
    Message = 2,
    Warning = 3,
    Error = 4,
    Fatal = 5,
    Control = 6,
}

impl Level {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::Debug
    }
}

impl FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "verbose" => Ok(Self::Verbose),
            "message" => Ok(Self::Message),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            "control" => Ok(Self::Control),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Debug => "Debug",
            Self::Verbose => "Verbose",
            Self::Message => "Message",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
            Self::Control => "Control",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_severity() {
        assert!(Level::Debug < Level::Verbose);
        assert!(Level::Verbose < Level::Message);
        assert!(Level::Message < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Fatal);
        assert!(Level::Fatal < Level::Control);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("warning".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warning);
        assert!("nonsense".parse::<Level>().is_err());
    }
}
