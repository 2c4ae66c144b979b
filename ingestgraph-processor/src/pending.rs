use std::collections::HashMap;
use std::sync::Mutex;

use ingestgraph_types::{detect_cycle, ConnectorId, RecordId};

fn scoped(connector_id: ConnectorId, external_id: &str) -> String {
    format!("{connector_id}:{external_id}")
}

/// Tracks records already upserted but whose parent-child edge is deferred
/// because the parent hasn't been seen yet (spec §4.2 step 3: the record
/// itself and its permissions are written unconditionally; only the edge
/// waits). Also tracks the child->parent graph for cycle detection (Design
/// Notes: a connector can report a malformed or adversarial parent/child
/// graph; `detect_cycle` guards against linking into a cycle).
#[derive(Default)]
pub struct PendingChildren {
    by_parent: Mutex<HashMap<String, Vec<RecordId>>>,
    parent_of: Mutex<HashMap<String, String>>,
}

impl PendingChildren {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `child_record_id`'s parent-edge under `parent_external_id`.
    /// Returns `false` (and drops the queue entry) if linking would
    /// introduce a cycle.
    pub fn queue(
        &self,
        connector_id: ConnectorId,
        child_external_id: &str,
        parent_external_id: &str,
        child_record_id: RecordId,
    ) -> bool {
        let child_key = scoped(connector_id, child_external_id);
        let parent_key = scoped(connector_id, parent_external_id);

        {
            let mut parent_of = self.parent_of.lock().expect("parent_of mutex poisoned");
            parent_of.insert(child_key.clone(), parent_key.clone());
            if detect_cycle(&parent_of, &child_key) {
                parent_of.remove(&child_key);
                return false;
            }
        }

        let mut by_parent = self.by_parent.lock().expect("by_parent mutex poisoned");
        by_parent.entry(parent_key).or_default().push(child_record_id);
        true
    }

    /// Remove and return every child waiting on `parent_external_id`, if
    /// any. Called once the parent itself has been upserted.
    pub fn drain(&self, connector_id: ConnectorId, parent_external_id: &str) -> Vec<RecordId> {
        let parent_key = scoped(connector_id, parent_external_id);
        let mut by_parent = self.by_parent.lock().expect("by_parent mutex poisoned");
        by_parent.remove(&parent_key).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_then_drain_round_trips() {
        let pending = PendingChildren::new();
        let connector = ConnectorId::nil();
        let child_id = RecordId::from_u128(1);
        assert!(pending.queue(connector, "child1", "parent1", child_id));
        let drained = pending.drain(connector, "parent1");
        assert_eq!(drained, vec![child_id]);
        assert!(pending.drain(connector, "parent1").is_empty());
    }

    #[test]
    fn self_parenting_is_rejected_as_a_cycle() {
        let pending = PendingChildren::new();
        let connector = ConnectorId::nil();
        let accepted = pending.queue(connector, "a", "a", RecordId::from_u128(1));
        assert!(!accepted);
        assert!(pending.drain(connector, "a").is_empty());
    }

    #[test]
    fn unrelated_connectors_do_not_share_a_pending_queue() {
        let pending = PendingChildren::new();
        let c1 = ConnectorId::nil();
        let c2 = ConnectorId::from_u128(1);
        assert!(pending.queue(c1, "child", "parent", RecordId::from_u128(2)));
        assert!(pending.drain(c2, "parent").is_empty());
        assert_eq!(pending.drain(c1, "parent").len(), 1);
    }
}
