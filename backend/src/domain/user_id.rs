//! Opaque user identity used to correlate report requests and replies.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Chat user identifier.
///
/// The identifier doubles as the queue partition key and as the correlation
/// key for in-flight report requests.
///
/// # Examples
/// ```
/// use spendbot::domain::UserId;
///
/// let user: UserId = "42".parse().expect("numeric key");
/// assert_eq!(user.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw identifier.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw identifier.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_queue_keys() {
        assert_eq!("  7 ".parse::<UserId>().expect("parse"), UserId::new(7));
        assert!("user-7".parse::<UserId>().is_err());
    }
}
