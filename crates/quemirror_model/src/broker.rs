//! Broker endpoint records and their capability-gated projections.

use crate::access::{AccessLevel, BrokerAccess};
use crate::ids::{BrokerId, UserId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Connection settings for one broker endpoint.
///
/// Holds everything needed to open a protocol-level connection: host,
/// ports, TLS flags, credentials, and virtual host. These are the
/// sensitive fields that [`Broker::view_for`] withholds from viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Broker hostname or address.
    pub host: String,
    /// AMQP port.
    pub amqp_port: u16,
    /// Whether the AMQP connection uses TLS.
    pub amqp_tls: bool,
    /// Management API port (used only by out-of-scope diagnostics).
    pub management_port: u16,
    /// Whether the management API uses TLS.
    pub management_tls: bool,
    /// Username for authentication.
    pub username: String,
    /// Password for authentication.
    pub password: String,
    /// Virtual host to connect to.
    pub vhost: String,
}

impl ConnectionSettings {
    /// Creates settings with the standard AMQP and management ports.
    #[must_use]
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            amqp_port: 5672,
            amqp_tls: false,
            management_port: 15672,
            management_tls: false,
            username: username.into(),
            password: password.into(),
            vhost: "/".into(),
        }
    }
}

/// One broker endpoint known to the mirror.
///
/// Owned by whichever user created it; that user always holds an
/// `Owner` entry on the access list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Broker {
    /// Record identity.
    pub id: BrokerId,
    /// The creating user.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Users granted access and at which level.
    pub access_list: Vec<BrokerAccess>,
    /// Connection settings, if configured.
    pub connection: Option<ConnectionSettings>,
    /// Creation stamp.
    pub created_at: Timestamp,
    /// Last update stamp.
    pub updated_at: Timestamp,
    /// Last successful queue/exchange sync, if any.
    pub synced_at: Option<Timestamp>,
    /// Soft-delete stamp; a deleted broker is hidden from listings.
    pub deleted_at: Option<Timestamp>,
}

impl Broker {
    /// Creates a broker owned by `user_id`, who is granted `Owner` access.
    #[must_use]
    pub fn new(user_id: UserId, name: impl Into<String>, connection: Option<ConnectionSettings>) -> Self {
        let now = Timestamp::now();
        Self {
            id: BrokerId::new(),
            user_id,
            name: name.into(),
            access_list: vec![BrokerAccess::new(user_id, AccessLevel::Owner)],
            connection,
            created_at: now,
            updated_at: now,
            synced_at: None,
            deleted_at: None,
        }
    }

    /// Returns the access level `user_id` holds, if any.
    #[must_use]
    pub fn access_for(&self, user_id: UserId) -> Option<AccessLevel> {
        self.access_list
            .iter()
            .find(|entry| entry.user_id == user_id)
            .map(|entry| entry.access_level)
    }

    /// Grants `level` to `user_id`, replacing any existing entry.
    pub fn grant(&mut self, user_id: UserId, level: AccessLevel) {
        self.revoke(user_id);
        self.access_list.push(BrokerAccess::new(user_id, level));
        self.updated_at = Timestamp::now();
    }

    /// Removes `user_id` from the access list.
    pub fn revoke(&mut self, user_id: UserId) {
        self.access_list.retain(|entry| entry.user_id != user_id);
    }

    /// Returns true if the broker has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Projects this broker for `user_id` according to their access level.
    ///
    /// - `Owner`: the full record
    /// - `Manager`: access list narrowed to the caller's own entry
    /// - `Viewer`: narrowed access list and no connection settings
    ///
    /// Returns `None` when the user holds no access. The projection is
    /// computed explicitly at this boundary so credentials can never leak
    /// through serialization of the raw record.
    #[must_use]
    pub fn view_for(&self, user_id: UserId) -> Option<BrokerView> {
        let level = self.access_for(user_id)?;

        let access_list = match level {
            AccessLevel::Owner => self.access_list.clone(),
            _ => vec![BrokerAccess::new(user_id, level)],
        };

        let connection = if level.sees_credentials() {
            self.connection.clone()
        } else {
            None
        };

        Some(BrokerView {
            id: self.id,
            name: self.name.clone(),
            access_list,
            connection,
            created_at: self.created_at,
            updated_at: self.updated_at,
            synced_at: self.synced_at,
        })
    }
}

/// A broker record as presented to one caller.
///
/// Produced only by [`Broker::view_for`]; the `connection` field is
/// absent for viewer-level callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerView {
    /// Record identity.
    pub id: BrokerId,
    /// Display name.
    pub name: String,
    /// The access list as visible to this caller.
    pub access_list: Vec<BrokerAccess>,
    /// Connection settings; `None` for viewer-level callers.
    pub connection: Option<ConnectionSettings>,
    /// Creation stamp.
    pub created_at: Timestamp,
    /// Last update stamp.
    pub updated_at: Timestamp,
    /// Last successful sync, if any.
    pub synced_at: Option<Timestamp>,
}
