use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

pub mod events;
pub mod session;

/// Ephemeral map from account id to its live connection handle.
///
/// Entries are written on authenticated connect and removed on disconnect;
/// there is no TTL. A handle left behind by an ungraceful termination is
/// evicted the first time a push fails, so a stale entry never blocks a
/// sender's acknowledgement.
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    inner: Arc<DashMap<Uuid, UnboundedSender<String>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. A reconnect replaces the previous handle.
    pub fn register(&self, account_id: Uuid, sender: UnboundedSender<String>) {
        self.inner.insert(account_id, sender);
        tracing::debug!(account_id = %account_id, "presence registered");
    }

    /// Remove the entry, but only if it still belongs to this connection —
    /// a reconnect may already have replaced it.
    pub fn unregister(&self, account_id: Uuid, sender: &UnboundedSender<String>) {
        self.inner
            .remove_if(&account_id, |_, current| current.same_channel(sender));
        tracing::debug!(account_id = %account_id, "presence unregistered");
    }

    /// Deliver a payload to the account's connection if one is live.
    /// Returns false when the account is offline or its handle is dead;
    /// dead handles are evicted.
    pub fn push(&self, account_id: Uuid, payload: &str) -> bool {
        let delivered = match self.inner.get(&account_id) {
            Some(entry) => entry.value().send(payload.to_owned()).is_ok(),
            None => return false,
        };
        if !delivered {
            self.inner.remove(&account_id);
            tracing::debug!(account_id = %account_id, "evicted dead presence handle");
        }
        delivered
    }

    pub fn is_connected(&self, account_id: Uuid) -> bool {
        self.inner.contains_key(&account_id)
    }
}
