use crate::store::{Branches, NodeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// String form of every declared variable's value, in declared order.
pub type AssignmentKey = Vec<String>;

pub fn assignment_key(values: &[f64]) -> AssignmentKey {
    values.iter().map(|v| format!("{}", v)).collect()
}

/// Per-node memo of computed result tuples, keyed by assignment. Entries are
/// never invalidated: a compiled expression is immutable.
#[derive(Debug, Default)]
pub struct Ledger {
    slots: Vec<RwLock<HashMap<AssignmentKey, Arc<Branches>>>>,
}

impl Ledger {
    pub fn new(node_count: usize) -> Self {
        Self { slots: (0..node_count).map(|_| RwLock::new(HashMap::new())).collect() }
    }

    pub fn get(&self, node_id: NodeId, key: &AssignmentKey) -> Option<Arc<Branches>> {
        let slot = self.slots.get(node_id.index())?;
        let guard = slot.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.get(key).cloned()
    }

    pub fn contains(&self, node_id: NodeId, key: &AssignmentKey) -> bool {
        self.get(node_id, key).is_some()
    }

    pub fn insert(&self, node_id: NodeId, key: &AssignmentKey, value: Arc<Branches>) {
        if let Some(slot) = self.slots.get(node_id.index()) {
            let mut guard = slot.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.insert(key.clone(), value);
        }
    }

    /// Number of cached (node, assignment) entries.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .map(|slot| slot.read().unwrap_or_else(|poisoned| poisoned.into_inner()).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
