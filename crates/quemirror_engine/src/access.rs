//! Access checks and capability-gated projections.
//!
//! These checks run before any broker I/O: an unauthorized caller must
//! never cause so much as a connection attempt.

use crate::error::{EngineError, EngineResult};
use quemirror_model::{AccessLevel, Broker, BrokerView, ConnectionSettings, UserId};
use quemirror_store::MirrorStore;
use tracing::debug;

/// Requires that `user_id` appears on the broker's access list.
///
/// Returns the level held, for callers that gate further on it.
pub fn require_listed(broker: &Broker, user_id: UserId) -> EngineResult<AccessLevel> {
    match broker.access_for(user_id) {
        Some(level) => Ok(level),
        None => {
            debug!(broker = %broker.id, user = %user_id, "caller not on access list");
            Err(EngineError::access_denied(
                "caller is not on the broker's access list",
            ))
        }
    }
}

/// Returns the broker's connection settings, or an error when the record
/// was created without any.
pub fn connection_settings(broker: &Broker) -> EngineResult<&ConnectionSettings> {
    broker
        .connection
        .as_ref()
        .ok_or(EngineError::BrokerNotConfigured(broker.id))
}

/// Lists the brokers visible to `user_id`, each projected to what their
/// access level may see.
///
/// Owners get the full record, managers a narrowed access list, viewers
/// additionally lose the connection credentials. The projection happens
/// here, at the boundary, so raw records never reach the caller.
pub fn list_brokers<S: MirrorStore>(store: &S, user_id: UserId) -> EngineResult<Vec<BrokerView>> {
    let brokers = store.brokers_for_user(user_id)?;
    Ok(brokers
        .iter()
        .filter_map(|broker| broker.view_for(user_id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quemirror_model::ConnectionSettings;
    use quemirror_store::MemoryStore;

    #[test]
    fn unlisted_caller_is_denied() {
        let broker = Broker::new(UserId::new(), "b", None);
        let err = require_listed(&broker, UserId::new()).unwrap_err();
        assert!(matches!(err, EngineError::AccessDenied { .. }));
    }

    #[test]
    fn listed_caller_gets_their_level() {
        let owner = UserId::new();
        let broker = Broker::new(owner, "b", None);
        assert_eq!(require_listed(&broker, owner).unwrap(), AccessLevel::Owner);
    }

    #[test]
    fn missing_connection_settings_is_an_error() {
        let broker = Broker::new(UserId::new(), "b", None);
        assert!(matches!(
            connection_settings(&broker),
            Err(EngineError::BrokerNotConfigured(_))
        ));
    }

    #[test]
    fn listing_projects_per_access_level() {
        let store = MemoryStore::new();
        let owner = UserId::new();
        let viewer = UserId::new();

        let mut broker = Broker::new(
            owner,
            "prod",
            Some(ConnectionSettings::new("mq.prod", "svc", "secret")),
        );
        broker.grant(viewer, AccessLevel::Viewer);
        store.insert_broker(broker).unwrap();

        let owner_views = list_brokers(&store, owner).unwrap();
        assert_eq!(owner_views.len(), 1);
        assert!(owner_views[0].connection.is_some());
        assert_eq!(owner_views[0].access_list.len(), 2);

        let viewer_views = list_brokers(&store, viewer).unwrap();
        assert_eq!(viewer_views.len(), 1);
        assert!(viewer_views[0].connection.is_none());
        assert_eq!(viewer_views[0].access_list.len(), 1);
    }
}
