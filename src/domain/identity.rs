//! Identity and storage partitioning.

/// Prefix shared by every per-user history key.
pub const HISTORY_KEY_PREFIX: &str = "predictionHistory_";

/// Partition suffix used when nobody is signed in.
const GUEST_SUFFIX: &str = "guest";

/// Who the history belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// A signed-in user with a stable identifier
    User(String),
    /// No signed-in user
    Guest,
}

impl Identity {
    /// Identity from an optional user id. Blank ids are treated as guest.
    #[must_use]
    pub fn from_user_id(user_id: Option<&str>) -> Self {
        match user_id.map(str::trim) {
            Some(id) if !id.is_empty() => Self::User(id.to_string()),
            _ => Self::Guest,
        }
    }

    /// Storage partition for this identity.
    #[must_use]
    pub fn partition_key(&self) -> PartitionKey {
        match self {
            Self::User(id) => PartitionKey(format!("{HISTORY_KEY_PREFIX}{id}")),
            Self::Guest => PartitionKey(format!("{HISTORY_KEY_PREFIX}{GUEST_SUFFIX}")),
        }
    }
}

/// Durable storage key of one history partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// The guest partition.
    #[must_use]
    pub fn guest() -> Self {
        Identity::Guest.partition_key()
    }

    /// Wrap a raw storage key.
    #[must_use]
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_keys() {
        assert_eq!(
            Identity::User("42".to_string()).partition_key().as_str(),
            "predictionHistory_42"
        );
        assert_eq!(PartitionKey::guest().as_str(), "predictionHistory_guest");
    }

    #[test]
    fn test_blank_user_is_guest() {
        assert_eq!(Identity::from_user_id(None), Identity::Guest);
        assert_eq!(Identity::from_user_id(Some("  ")), Identity::Guest);
        assert_eq!(
            Identity::from_user_id(Some("u-1")),
            Identity::User("u-1".to_string())
        );
    }
}
