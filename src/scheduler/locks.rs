//! Per-concept serialization.
//!
//! Reviews of the same concept must not interleave their load → transform →
//! save sequence, or an answer can be lost. Different concepts never contend.
//! Batch operations take every key they touch in sorted order.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed async lock: one slot per concept id, created on demand.
#[derive(Debug, Default)]
pub struct ConceptLocks {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ConceptLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `concept_id`. Released when the guard drops.
    pub async fn lock(&self, concept_id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Drop slots nobody holds or waits on
            slots.retain(|key, slot| key == concept_id || Arc::strong_count(slot) > 1);
            slots.entry(concept_id.to_string()).or_default().clone()
        };
        slot.lock_owned().await
    }

    /// Lock several concepts, deduplicated and in sorted order so two batches
    /// can never wait on each other.
    pub async fn lock_many<I, K>(&self, concept_ids: I) -> Vec<OwnedMutexGuard<()>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let ordered: BTreeSet<String> = concept_ids.into_iter().map(|id| id.as_ref().to_string()).collect();
        let mut guards = Vec::with_capacity(ordered.len());
        for concept_id in &ordered {
            guards.push(self.lock(concept_id).await);
        }
        guards
    }

    /// Number of concepts currently tracked.
    pub fn len(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
