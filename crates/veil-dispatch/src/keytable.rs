//! Permissioning key table and event watchers
//!
//! The on-chain permissioning and key-rotation contracts emit events;
//! long-lived watcher tasks fold them, one at a time in arrival order,
//! into local tables. The dispatcher reads the tables to resolve an
//! organization id into exchange identifiers; the admission and voting
//! state machines themselves live on chain.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// An event delivered by a permissioning contract watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionEvent {
    NodeProposed { enode: String },
    NodeApproved { enode: String },
    NodeDeactivated { enode: String },
    NodeBlacklisted { enode: String },
    OrgKeyAdded { org_id: String, key: String },
    OrgKeyDeleted { org_id: String, key: String },
}

/// Admission status of a node as last reported on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Proposed,
    Approved,
    Deactivated,
    Blacklisted,
}

/// Process-lifetime tables maintained by the watchers.
///
/// Reads never block dispatch for longer than the table update itself;
/// watchers mutate, dispatch-side callers only read.
pub struct KeyTable {
    org_keys: RwLock<HashMap<String, Vec<String>>>,
    nodes: RwLock<HashMap<String, NodeStatus>>,
}

impl KeyTable {
    pub fn new() -> Self {
        Self {
            org_keys: RwLock::new(HashMap::new()),
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Exchange identifiers registered for an organization, in the
    /// order they were added. Empty when the organization is unknown.
    pub fn org_keys(&self, org_id: &str) -> Vec<String> {
        self.org_keys
            .read()
            .unwrap()
            .get(org_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn node_status(&self, enode: &str) -> Option<NodeStatus> {
        self.nodes.read().unwrap().get(enode).copied()
    }

    /// Privacy options addressing every key registered for an
    /// organization, or `None` when the organization has no keys.
    pub fn privacy_options_for_org(
        &self,
        org_id: &str,
        private_from: &str,
        use_privacy_marker: bool,
    ) -> Option<veil_core::PrivacyOptions> {
        let private_for = self.org_keys(org_id);
        if private_for.is_empty() {
            return None;
        }
        Some(veil_core::PrivacyOptions {
            private_from: private_from.to_string(),
            private_for,
            use_privacy_marker,
        })
    }

    /// Fold one event into the tables.
    pub fn apply(&self, event: &PermissionEvent) {
        match event {
            PermissionEvent::NodeProposed { enode } => self.set_node(enode, NodeStatus::Proposed),
            PermissionEvent::NodeApproved { enode } => self.set_node(enode, NodeStatus::Approved),
            PermissionEvent::NodeDeactivated { enode } => {
                self.set_node(enode, NodeStatus::Deactivated)
            }
            PermissionEvent::NodeBlacklisted { enode } => {
                self.set_node(enode, NodeStatus::Blacklisted)
            }
            PermissionEvent::OrgKeyAdded { org_id, key } => {
                let mut orgs = self.org_keys.write().unwrap();
                let keys = orgs.entry(org_id.clone()).or_default();
                if !keys.contains(key) {
                    keys.push(key.clone());
                    tracing::info!(%org_id, %key, "organization key added");
                }
            }
            PermissionEvent::OrgKeyDeleted { org_id, key } => {
                let mut orgs = self.org_keys.write().unwrap();
                if let Some(keys) = orgs.get_mut(org_id) {
                    keys.retain(|k| k != key);
                    if keys.is_empty() {
                        orgs.remove(org_id);
                    }
                    tracing::info!(%org_id, %key, "organization key deleted");
                }
            }
        }
    }

    fn set_node(&self, enode: &str, status: NodeStatus) {
        tracing::info!(%enode, ?status, "node status updated");
        self.nodes
            .write()
            .unwrap()
            .insert(enode.to_string(), status);
    }
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a watcher that folds one subscription channel into the table.
///
/// Events are processed strictly sequentially in arrival order. The
/// task ends when the channel closes, which happens at process
/// shutdown when the subscription side is dropped.
pub fn spawn_watcher(
    table: Arc<KeyTable>,
    mut events: mpsc::Receiver<PermissionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            table.apply(&event);
        }
        tracing::debug!("permission event channel closed, watcher stopping");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn org_keys_accumulate_without_duplicates() {
        let table = KeyTable::new();
        let add = |key: &str| PermissionEvent::OrgKeyAdded {
            org_id: "org1".to_string(),
            key: key.to_string(),
        };

        table.apply(&add("tm1"));
        table.apply(&add("tm2"));
        table.apply(&add("tm1"));

        assert_eq!(table.org_keys("org1"), vec!["tm1", "tm2"]);
        assert!(table.org_keys("org2").is_empty());
    }

    #[test]
    fn deleting_the_last_key_removes_the_org() {
        let table = KeyTable::new();
        table.apply(&PermissionEvent::OrgKeyAdded {
            org_id: "org1".to_string(),
            key: "tm1".to_string(),
        });
        table.apply(&PermissionEvent::OrgKeyDeleted {
            org_id: "org1".to_string(),
            key: "tm1".to_string(),
        });

        assert!(table.org_keys("org1").is_empty());
    }

    #[test]
    fn node_status_follows_the_latest_event() {
        let table = KeyTable::new();
        let enode = "enode://abc@10.0.0.1:30303";

        table.apply(&PermissionEvent::NodeProposed {
            enode: enode.to_string(),
        });
        assert_eq!(table.node_status(enode), Some(NodeStatus::Proposed));

        table.apply(&PermissionEvent::NodeApproved {
            enode: enode.to_string(),
        });
        assert_eq!(table.node_status(enode), Some(NodeStatus::Approved));

        table.apply(&PermissionEvent::NodeBlacklisted {
            enode: enode.to_string(),
        });
        assert_eq!(table.node_status(enode), Some(NodeStatus::Blacklisted));
        assert_eq!(table.node_status("enode://other"), None);
    }

    #[test]
    fn org_resolution_yields_dispatchable_privacy_options() {
        let table = KeyTable::new();
        assert!(table.privacy_options_for_org("org1", "tm0", false).is_none());

        table.apply(&PermissionEvent::OrgKeyAdded {
            org_id: "org1".to_string(),
            key: "tm1".to_string(),
        });
        let opts = table
            .privacy_options_for_org("org1", "tm0", true)
            .unwrap();
        assert_eq!(opts.private_for, vec!["tm1"]);
        assert!(opts.is_private());
        assert!(opts.validate().is_ok());
    }

    #[tokio::test]
    async fn watcher_folds_events_in_arrival_order() {
        let table = Arc::new(KeyTable::new());
        let (tx, rx) = mpsc::channel(8);
        let handle = spawn_watcher(table.clone(), rx);

        tx.send(PermissionEvent::OrgKeyAdded {
            org_id: "org1".to_string(),
            key: "tm1".to_string(),
        })
        .await
        .unwrap();
        tx.send(PermissionEvent::OrgKeyAdded {
            org_id: "org1".to_string(),
            key: "tm2".to_string(),
        })
        .await
        .unwrap();
        tx.send(PermissionEvent::OrgKeyDeleted {
            org_id: "org1".to_string(),
            key: "tm1".to_string(),
        })
        .await
        .unwrap();

        // Closing the channel stops the watcher after it drains.
        drop(tx);
        handle.await.unwrap();

        assert_eq!(table.org_keys("org1"), vec!["tm2"]);
    }
}
