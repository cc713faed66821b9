use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Synthetic end user placing stakes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub u32);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bet offer a stake is placed against. Also scopes a leaderboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BetOfferId(pub u32);

impl fmt::Display for BetOfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("session key is empty")]
pub struct EmptySessionKey;

/// Opaque token issued by the session endpoint.
///
/// The server may expire a key at any time; the only signal is a 401 on the
/// next stake submission.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Result<Self, EmptySessionKey> {
        let key = key.into();
        if key.is_empty() {
            return Err(EmptySessionKey);
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Keys are credentials; keep them out of logs.
impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey(len={})", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_rejects_empty() {
        assert_eq!(SessionKey::new(""), Err(EmptySessionKey));
        let key = SessionKey::new("abc123").unwrap();
        assert_eq!(key.as_str(), "abc123");
        assert_eq!(key.to_string(), "abc123");
    }

    #[test]
    fn test_session_key_debug_hides_value() {
        let key = SessionKey::new("abc123").unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains("abc123"));
        assert_eq!(debug, "SessionKey(len=6)");
    }
}
