//! Broker access levels and access-list entries.

use crate::ids::UserId;
use serde::{Deserialize, Serialize};

/// Access level a user holds on a broker.
///
/// Levels are strictly ordered: `Viewer < Manager < Owner`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AccessLevel {
    /// May inspect mirrored records but never sees connection credentials.
    Viewer,
    /// May operate on queues and messages; sees credentials.
    Manager,
    /// Full control, including the access list itself.
    Owner,
}

impl AccessLevel {
    /// Returns true if this level may receive raw connection credentials.
    #[must_use]
    pub fn sees_credentials(self) -> bool {
        matches!(self, AccessLevel::Owner | AccessLevel::Manager)
    }
}

/// One entry on a broker's access list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerAccess {
    /// The user this entry grants access to.
    pub user_id: UserId,
    /// The level granted.
    pub access_level: AccessLevel,
}

impl BrokerAccess {
    /// Creates an access-list entry.
    #[must_use]
    pub fn new(user_id: UserId, access_level: AccessLevel) -> Self {
        Self {
            user_id,
            access_level,
        }
    }
}
