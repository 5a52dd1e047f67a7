//! Identifier Scheme
//!
//! Items are either local-only (created in memory, never persisted) or
//! persisted (id issued by the remote store). Local ids carry a reserved
//! `local:` prefix in their text form so the two spaces never collide.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Reserved prefix for client-generated ids
pub const LOCAL_PREFIX: &str = "local:";

/// Process-wide counter so no two stores hand out the same local id
static NEXT_LOCAL_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of an item held by a store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemId {
    /// Created client-side, not yet known to the remote store
    Local(u64),
    /// Issued by the remote store
    Remote(String),
}

impl ItemId {
    /// Allocate a fresh local id
    pub fn new_local() -> Self {
        ItemId::Local(NEXT_LOCAL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap an id issued by the remote store.
    ///
    /// Returns `None` when the value uses the reserved local prefix.
    pub fn remote(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() || value.starts_with(LOCAL_PREFIX) {
            None
        } else {
            Some(ItemId::Remote(value))
        }
    }

    /// True for ids that have never been persisted
    pub fn is_local(&self) -> bool {
        matches!(self, ItemId::Local(_))
    }

    /// The remote value, if persisted
    pub fn as_remote(&self) -> Option<&str> {
        match self {
            ItemId::Remote(value) => Some(value),
            ItemId::Local(_) => None,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Local(n) => write!(f, "{}{}", LOCAL_PREFIX, n),
            ItemId::Remote(value) => f.write_str(value),
        }
    }
}

/// Error for unparseable id strings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid item id: {0:?}")]
pub struct ParseIdError(String);

impl FromStr for ItemId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix(LOCAL_PREFIX) {
            return rest
                .parse::<u64>()
                .map(ItemId::Local)
                .map_err(|_| ParseIdError(s.to_string()));
        }
        ItemId::remote(s).ok_or_else(|| ParseIdError(s.to_string()))
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of the container that scopes one store (task, dashboard, member)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for OwnerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ids_are_unique_and_local() {
        let a = ItemId::new_local();
        let b = ItemId::new_local();
        assert_ne!(a, b);
        assert!(a.is_local());
        assert!(b.to_string().starts_with(LOCAL_PREFIX));
    }

    #[test]
    fn test_remote_rejects_reserved_prefix() {
        assert!(ItemId::remote("local:3").is_none());
        assert!(ItemId::remote("").is_none());
        let id = ItemId::remote("7f1c").unwrap();
        assert!(!id.is_local());
        assert_eq!(id.as_remote(), Some("7f1c"));
    }

    #[test]
    fn test_text_form_parses_back() {
        let local: ItemId = "local:42".parse().unwrap();
        assert_eq!(local, ItemId::Local(42));
        let remote: ItemId = "b3a9".parse().unwrap();
        assert_eq!(remote, ItemId::Remote("b3a9".into()));
        assert!("local:abc".parse::<ItemId>().is_err());
    }

    #[test]
    fn test_serde_uses_text_form() {
        let json = serde_json::to_string(&ItemId::Local(5)).unwrap();
        assert_eq!(json, "\"local:5\"");
        let back: ItemId = serde_json::from_str("\"p1\"").unwrap();
        assert_eq!(back, ItemId::Remote("p1".into()));
    }
}
