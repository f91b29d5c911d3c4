//! # Fairness Registry
//!
//! Per-actor turn counters used to decide who goes next.
//!
//! The registry is plain data. It performs no locking of its own: the
//! [`TurnGate`](crate::gate::TurnGate) owns it and only touches it while
//! holding the gate's mutex, which is what makes "check priority, increment"
//! atomic.
//!
//! ## Ordering
//! Entries are kept in registration order. `min_id` scans them front to
//! back and keeps the first smallest count, so equal counts are served in
//! registration order. The scan is O(n) per turn transition, O(n^2) per full
//! round; fine for pools of a few hundred actors, a known ceiling beyond.

use std::collections::HashMap;

use tracing::warn;

use fairturn_api::{ActorId, TurnSnapshot};

use crate::error::RegistryError;

#[derive(Debug)]
struct Entry {
    id: ActorId,
    count: u64,
    retired: bool,
}

/// Turn counts keyed by actor, in registration order.
#[derive(Debug, Default)]
pub struct FairnessRegistry {
    entries: Vec<Entry>,
    index: HashMap<ActorId, usize>,
}

impl FairnessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` with a count of zero.
    ///
    /// A duplicate is logged and left untouched.
    pub fn register(&mut self, id: ActorId) -> Result<(), RegistryError> {
        if self.index.contains_key(&id) {
            warn!(actor_id = %id, "Ignoring duplicate registration");
            return Err(RegistryError::AlreadyRegistered(id));
        }
        self.index.insert(id.clone(), self.entries.len());
        self.entries.push(Entry {
            id,
            count: 0,
            retired: false,
        });
        Ok(())
    }

    /// Count for `id`, or 0 when it was never registered.
    pub fn get(&self, id: &ActorId) -> u64 {
        self.entry(id).map(|entry| entry.count).unwrap_or(0)
    }

    pub fn contains(&self, id: &ActorId) -> bool {
        self.index.contains_key(id)
    }

    /// Record one completed turn for `id`, returning the new count.
    pub fn increment(&mut self, id: &ActorId) -> Result<u64, RegistryError> {
        let slot = *self
            .index
            .get(id)
            .ok_or_else(|| RegistryError::NotRegistered(id.clone()))?;
        let entry = &mut self.entries[slot];
        entry.count += 1;
        Ok(entry.count)
    }

    /// The eligible actor with the fewest turns; ties go to whoever
    /// registered first. Retired actors are skipped.
    pub fn min_id(&self) -> Result<&ActorId, RegistryError> {
        let mut best: Option<&Entry> = None;
        for entry in self.entries.iter().filter(|entry| !entry.retired) {
            match best {
                Some(current) if current.count <= entry.count => {}
                _ => best = Some(entry),
            }
        }
        best.map(|entry| &entry.id).ok_or(RegistryError::Empty)
    }

    /// True when every eligible actor has the same, non-zero count.
    pub fn all_balanced(&self) -> bool {
        let mut counts = self
            .entries
            .iter()
            .filter(|entry| !entry.retired)
            .map(|entry| entry.count);
        match counts.next() {
            Some(first) if first > 0 => counts.all(|count| count == first),
            _ => false,
        }
    }

    /// Take `id` out of the rotation. Its count stays in snapshots.
    ///
    /// Returns whether the actor was still eligible.
    pub fn retire(&mut self, id: &ActorId) -> Result<bool, RegistryError> {
        let slot = *self
            .index
            .get(id)
            .ok_or_else(|| RegistryError::NotRegistered(id.clone()))?;
        let entry = &mut self.entries[slot];
        let was_eligible = !entry.retired;
        entry.retired = true;
        Ok(was_eligible)
    }

    pub fn is_retired(&self, id: &ActorId) -> bool {
        self.entry(id).map(|entry| entry.retired).unwrap_or(false)
    }

    /// Smallest count among eligible actors.
    pub fn min_count(&self) -> Option<u64> {
        self.entries
            .iter()
            .filter(|entry| !entry.retired)
            .map(|entry| entry.count)
            .min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn eligible(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.retired).count()
    }

    pub fn snapshot(&self) -> TurnSnapshot {
        TurnSnapshot::new(
            self.entries
                .iter()
                .map(|entry| (entry.id.clone(), entry.count))
                .collect(),
        )
    }

    fn entry(&self, id: &ActorId) -> Option<&Entry> {
        self.index.get(id).and_then(|slot| self.entries.get(*slot))
    }
}
