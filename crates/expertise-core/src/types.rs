use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{MAX_ACCOUNT_NAME_LENGTH, MIN_ACCOUNT_NAME_LENGTH};

/// Expertise and vote weight amounts. Signed: vote weights may be negative.
pub type Share = i64;

/// Basis points, 10000 = 100%.
pub type Percent = u16;

/// Unix timestamp (seconds, UTC), taken from the head block.
pub type Timestamp = i64;

// ── Object ids ───────────────────────────────────────────────────────────────

/// Stable integer ids assigned by the arena on insert. Never reused.
macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                Self(v)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

object_id!(
    /// Discipline id. `0` is the root "common" discipline.
    DisciplineId, "discipline"
);
object_id!(ExpertTokenId, "expert_token");
object_id!(ResearchId, "research");
object_id!(ResearchGroupId, "research_group");
object_id!(ResearchContentId, "research_content");
object_id!(ReviewId, "review");
object_id!(ReviewVoteId, "review_vote");
object_id!(TotalVotesId, "total_votes");
object_id!(RelationId, "research_discipline_relation");

// ── AccountName ──────────────────────────────────────────────────────────────

/// Account names are short lowercase handles (`[a-z0-9.-]`, 3–16 chars).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        let len = self.0.len();
        (MIN_ACCOUNT_NAME_LENGTH..=MAX_ACCOUNT_NAME_LENGTH).contains(&len)
            && self.0.starts_with(|c: char| c.is_ascii_lowercase())
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    }
}

impl From<&str> for AccountName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccountName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountName({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_name_validation() {
        assert!(AccountName::from("john").is_valid());
        assert!(AccountName::from("alice.lab-2").is_valid());
        assert!(!AccountName::from("jo").is_valid());
        assert!(!AccountName::from("John").is_valid());
        assert!(!AccountName::from("1john").is_valid());
        assert!(!AccountName::from("a-very-long-account-name").is_valid());
    }

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(ReviewId(7).to_string(), "review:7");
        assert_eq!(format!("{:?}", DisciplineId(3)), "DisciplineId(3)");
    }

    #[test]
    fn ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&ResearchId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
