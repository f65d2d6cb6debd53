//! Log severity levels and their syslog priority mapping.

use std::{fmt, str::FromStr};

/// Severity of a log event, ordered from most to least severe.
///
/// The numeric value matches the position used to compute the syslog PRIVAL
/// (`facility * 8 + (level - 1)`, user-level facility): `Emergency = 1` through
/// `Debug = 8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[non_exhaustive]
pub enum Level {
    /// System is unusable.
    Emergency = 1,
    /// Action must be taken immediately.
    Alert = 2,
    /// Critical condition.
    Critical = 3,
    /// Error condition.
    Error = 4,
    /// Warning condition.
    Warning = 5,
    /// Normal but significant condition.
    Notice = 6,
    /// Informational message.
    Info = 7,
    /// Debug-level message.
    Debug = 8,
}

/// Error returned when a level name does not match any known variant.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("invalid message level {0:?}")]
pub struct ParseLevelError(pub String);

impl Level {
    /// Returns the 1-based ordinal used to compute the syslog PRIVAL.
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    /// Returns the syslog PRIVAL for this level under the user-level facility
    /// (facility 1): `(level - 1) + 8`.
    pub fn prival(&self) -> u8 {
        (self.ordinal() - 1) + 8
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EMERGENCY" => Ok(Level::Emergency),
            "ALERT" => Ok(Level::Alert),
            "CRITICAL" => Ok(Level::Critical),
            "ERROR" => Ok(Level::Error),
            "WARNING" | "WARN" => Ok(Level::Warning),
            "NOTICE" => Ok(Level::Notice),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            other => Err(ParseLevelError(other.to_string())),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Emergency => "EMERGENCY",
            Level::Alert => "ALERT",
            Level::Critical => "CRITICAL",
            Level::Error => "ERROR",
            Level::Warning => "WARNING",
            Level::Notice => "NOTICE",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ALL: [Level; 8] = [
        Level::Emergency,
        Level::Alert,
        Level::Critical,
        Level::Error,
        Level::Warning,
        Level::Notice,
        Level::Info,
        Level::Debug,
    ];

    #[test]
    fn round_trips_every_named_level() {
        for level in ALL {
            assert_eq!(level.to_string().parse::<Level>().unwrap(), level);
        }
    }

    #[test]
    fn prival_follows_user_facility() {
        assert_eq!(Level::Emergency.prival(), 8);
        assert_eq!(Level::Debug.prival(), 15);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("info".parse::<Level>().unwrap(), Level::Info);
        assert_eq!("Info".parse::<Level>().unwrap(), Level::Info);
    }

    #[test]
    fn parse_rejects_unknown_level() {
        assert!("verbose".parse::<Level>().is_err());
    }
}
