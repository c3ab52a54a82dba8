use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single check against a single region/resource. Ordered so
/// that aggregation is a plain `max`: an Unknown anywhere outranks a Fail,
/// which outranks a Warn, which outranks a Pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Warn,
    Fail,
    Unknown,
}

impl Default for Status {
    fn default() -> Self {
        Self::Pass
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "OK"),
            Self::Warn => write!(f, "WARN"),
            Self::Fail => write!(f, "FAIL"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl Status {
    /// Numeric code used on the wire and as the process exit signal.
    pub fn code(&self) -> u8 {
        match self {
            Self::Pass => 0,
            Self::Warn => 1,
            Self::Fail => 2,
            Self::Unknown => 3,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Pass,
            1 => Self::Warn,
            2 => Self::Fail,
            _ => Self::Unknown,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Pass => "green",
            Self::Warn => "yellow",
            Self::Fail => "red",
            Self::Unknown => "magenta",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_severity() {
        assert!(Status::Pass < Status::Warn);
        assert!(Status::Warn < Status::Fail);
        assert!(Status::Fail < Status::Unknown);
        assert_eq!(Status::Fail.max(Status::Warn), Status::Fail);
    }

    #[test]
    fn codes_round_trip() {
        for status in [Status::Pass, Status::Warn, Status::Fail, Status::Unknown] {
            assert_eq!(Status::from_code(status.code()), status);
        }
        assert_eq!(Status::from_code(200), Status::Unknown);
    }
}
