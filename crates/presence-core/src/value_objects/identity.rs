//! Identity - normalized `user@domain` address string
//!
//! The unique key for everything the watcher tracks: the pending queue,
//! the subscription map, and the aggregate snapshot are all keyed by it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A normalized presence address (`user@domain`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(String);

impl Identity {
    /// Parse and normalize a raw address string.
    ///
    /// Normalization rules:
    /// - surrounding whitespace is trimmed
    /// - a `sip:` or `sips:` scheme prefix is stripped
    /// - a bare user part gets `default_domain` appended
    /// - the domain part is lowercased; the user part is kept as-is
    pub fn parse(raw: &str, default_domain: &str) -> Result<Self, IdentityParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentityParseError::Empty);
        }

        let stripped = trimmed
            .strip_prefix("sips:")
            .or_else(|| trimmed.strip_prefix("sip:"))
            .unwrap_or(trimmed);

        if let Some(c) = stripped.chars().find(|c| c.is_whitespace()) {
            return Err(IdentityParseError::InvalidCharacter(c));
        }

        let (user, domain) = match stripped.split_once('@') {
            Some((user, domain)) => (user, domain),
            None => (stripped, default_domain),
        };

        if user.is_empty() || user.contains('@') {
            return Err(IdentityParseError::MissingUser);
        }
        if domain.is_empty() {
            return Err(IdentityParseError::MissingDomain);
        }
        if domain.contains('@') {
            return Err(IdentityParseError::InvalidCharacter('@'));
        }

        Ok(Self(format!("{user}@{}", domain.to_lowercase())))
    }

    /// Get the full normalized address
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the user part (before the `@`)
    pub fn user(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }

    /// Get the domain part (after the `@`)
    pub fn domain(&self) -> &str {
        self.0.rsplit('@').next().unwrap_or(&self.0)
    }
}

/// Error when parsing an Identity from string
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdentityParseError {
    #[error("empty address")]
    Empty,

    #[error("address has no user part")]
    MissingUser,

    #[error("address has no domain part")]
    MissingDomain,

    #[error("invalid character {0:?} in address")]
    InvalidCharacter(char),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Serialize as a plain string so identities work as JSON map keys
impl Serialize for Identity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Identity::parse(&s, "").map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_address() {
        let id = Identity::parse("alice@Example.COM", "fallback.org").unwrap();
        assert_eq!(id.as_str(), "alice@example.com");
        assert_eq!(id.user(), "alice");
        assert_eq!(id.domain(), "example.com");
    }

    #[test]
    fn test_parse_bare_user_gets_default_domain() {
        let id = Identity::parse("1001", "pbx.example.com").unwrap();
        assert_eq!(id.as_str(), "1001@pbx.example.com");
    }

    #[test]
    fn test_parse_strips_scheme() {
        let id = Identity::parse("sip:bob@example.com", "x").unwrap();
        assert_eq!(id.as_str(), "bob@example.com");
        let id = Identity::parse("sips:bob@example.com", "x").unwrap();
        assert_eq!(id.as_str(), "bob@example.com");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert_eq!(
            Identity::parse("", "example.com"),
            Err(IdentityParseError::Empty)
        );
        assert_eq!(
            Identity::parse("   ", "example.com"),
            Err(IdentityParseError::Empty)
        );
        assert_eq!(
            Identity::parse("@example.com", "example.com"),
            Err(IdentityParseError::MissingUser)
        );
        assert_eq!(
            Identity::parse("alice@", "example.com"),
            Err(IdentityParseError::MissingDomain)
        );
        assert_eq!(
            Identity::parse("bare", ""),
            Err(IdentityParseError::MissingDomain)
        );
        assert!(matches!(
            Identity::parse("al ice@example.com", "x"),
            Err(IdentityParseError::InvalidCharacter(' '))
        ));
        assert!(matches!(
            Identity::parse("a@b@c", "x"),
            Err(IdentityParseError::InvalidCharacter('@'))
        ));
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let mut ids = vec![
            Identity::parse("carol@example.com", "x").unwrap(),
            Identity::parse("alice@example.com", "x").unwrap(),
            Identity::parse("bob@example.com", "x").unwrap(),
        ];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(Identity::user).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_json_round_trip() {
        let id = Identity::parse("alice@example.com", "x").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"alice@example.com\"");
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
