use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of an actor contending for turns.
///
/// Assigned once at registration and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// A fresh random id, rendered as 32 lowercase hex digits.
    pub fn random() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ActorId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ActorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How a pool names the actors it spawns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdScheme {
    /// Random UUID v4 in simple (hex) form.
    Uuid,
    /// `"<prefix>-<index>"`, index counted from zero.
    Sequential { prefix: String },
}

impl Default for IdScheme {
    fn default() -> Self {
        IdScheme::Uuid
    }
}

impl IdScheme {
    /// Produce the id for the `index`-th spawned actor.
    pub fn generate(&self, index: usize) -> ActorId {
        match self {
            IdScheme::Uuid => ActorId::random(),
            IdScheme::Sequential { prefix } => ActorId(format!("{prefix}-{index}")),
        }
    }
}

/// Lifecycle of a pool run.
///
/// `Created -> Spawning -> Running -> Stopping -> Drained`, plus `Failed`
/// when startup could not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Created,
    Spawning,
    Running,
    Stopping,
    Drained,
    Failed,
}

impl PoolState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PoolState::Drained | PoolState::Failed)
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolState::Created => "created",
            PoolState::Spawning => "spawning",
            PoolState::Running => "running",
            PoolState::Stopping => "stopping",
            PoolState::Drained => "drained",
            PoolState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Point-in-time copy of every actor's completed turn count.
///
/// Entries keep registration order, so the first entry is the actor that
/// wins ties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TurnSnapshot {
    entries: Vec<(ActorId, u64)>,
}

impl TurnSnapshot {
    pub fn new(entries: Vec<(ActorId, u64)>) -> Self {
        Self { entries }
    }

    /// Count for `id`, or 0 when the id is unknown.
    pub fn get(&self, id: &ActorId) -> u64 {
        self.entries
            .iter()
            .find(|(entry, _)| entry == id)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ActorId, u64)> {
        self.entries.iter().map(|(id, count)| (id, *count))
    }

    pub fn ids(&self) -> impl Iterator<Item = &ActorId> {
        self.entries.iter().map(|(id, _)| id)
    }

    /// Sum of all counts, i.e. the number of turns granted so far.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| *count).sum()
    }

    pub fn min(&self) -> Option<u64> {
        self.entries.iter().map(|(_, count)| *count).min()
    }

    pub fn max(&self) -> Option<u64> {
        self.entries.iter().map(|(_, count)| *count).max()
    }

    /// Difference between the most and least serviced actors.
    pub fn spread(&self) -> u64 {
        match (self.min(), self.max()) {
            (Some(min), Some(max)) => max - min,
            _ => 0,
        }
    }

    pub fn to_map(&self) -> HashMap<ActorId, u64> {
        self.entries.iter().cloned().collect()
    }

    pub fn into_vec(self) -> Vec<(ActorId, u64)> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a TurnSnapshot {
    type Item = &'a (ActorId, u64);
    type IntoIter = std::slice::Iter<'a, (ActorId, u64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
