//! # Turn Gate
//!
//! One mutex and one condition variable guarding the fairness registry and
//! the two gate flags. Every turn transition goes through here.
//!
//! ## Protocol
//! - `acquire_turn`: wait until the gate is free *and* the caller is the
//!   least-serviced eligible actor, then count the turn and mark the gate
//!   held, all under one lock acquisition.
//! - `release_turn`: mark the gate free and wake every waiter. A single
//!   wake-up would not do, since only a recheck against the global minimum
//!   can tell which waiter is next.
//! - `request_shutdown`: clear `running` and wake every waiter so parked
//!   actors notice and leave.
//!
//! The gate starts *held*: nobody can claim a turn until the pool controller
//! calls [`TurnGate::open`] once all workers are up.
//!
//! Nothing is logged while the lock is held.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fairturn_api::{ActorId, TurnSnapshot};

use crate::error::{GateError, RegistryError};
use crate::registry::FairnessRegistry;

#[derive(Debug)]
struct GateState {
    /// Cleared exactly once, on shutdown
    running: bool,
    /// Set while a turn is claimed (and before the starting handshake)
    turn_held: bool,
    registry: FairnessRegistry,
}

/// Shared mutual-exclusion and wake-up point for all actors of a pool.
#[derive(Debug)]
pub struct TurnGate {
    state: Mutex<GateState>,
    signal: Condvar,
    detailed_logging: bool,
}

impl Default for TurnGate {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                running: true,
                turn_held: true,
                registry: FairnessRegistry::new(),
            }),
            signal: Condvar::new(),
            detailed_logging: false,
        }
    }

    pub fn with_detailed_logging(mut self, enabled: bool) -> Self {
        self.detailed_logging = enabled;
        self
    }

    // A panic never happens while the lock is held, and every mutation keeps
    // the state consistent, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, GateState>) -> MutexGuard<'a, GateState> {
        self.signal.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an actor to the rotation. Must happen before that actor's first
    /// `acquire_turn`.
    pub fn register(&self, id: ActorId) -> Result<(), RegistryError> {
        self.lock().registry.register(id)
    }

    /// Starting handshake: free the gate and wake everyone parked on it.
    pub fn open(&self) {
        let mut state = self.lock();
        state.turn_held = false;
        self.signal.notify_all();
    }

    /// Block until `id` may take the next turn, then claim it.
    ///
    /// Returns [`GateError::Closed`] once shutdown has been requested, and a
    /// registry error if `id` is unknown or retired.
    pub fn acquire_turn(&self, id: &ActorId) -> Result<TurnGuard<'_>, GateError> {
        let mut state = self.lock();
        loop {
            if !state.running {
                return Err(GateError::Closed);
            }
            if !state.registry.contains(id) || state.registry.is_retired(id) {
                return Err(RegistryError::NotRegistered(id.clone()).into());
            }
            let has_priority = state.registry.min_id()? == id;
            if !state.turn_held && has_priority {
                break;
            }
            state = self.wait(state);
        }

        let turn = state.registry.increment(id)?;
        // Re-arm before unlocking so the next claimant has to wait for an
        // explicit release.
        state.turn_held = true;
        drop(state);

        if self.detailed_logging {
            crate::log_turn!(id, "granted", turn = turn);
        }

        Ok(TurnGuard {
            gate: self,
            id: id.clone(),
            turn,
            released: false,
        })
    }

    /// Free the gate and wake every waiter.
    pub fn release_turn(&self, id: &ActorId) {
        {
            let mut state = self.lock();
            state.turn_held = false;
            self.signal.notify_all();
        }
        if self.detailed_logging {
            crate::log_turn!(id, "released");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Clear `running` and wake every waiter.
    ///
    /// Returns `true` only for the call that actually flipped the flag.
    pub fn request_shutdown(&self) -> bool {
        let mut state = self.lock();
        let was_running = state.running;
        state.running = false;
        self.signal.notify_all();
        was_running
    }

    /// Sleep for `delay` unless shutdown is requested first.
    ///
    /// Returns whether the pool is still running.
    pub fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return self.is_running();
        }
        let guard = self.lock();
        let (state, _) = self
            .signal
            .wait_timeout_while(guard, delay, |state| state.running)
            .unwrap_or_else(PoisonError::into_inner);
        state.running
    }

    /// Remove `id` from the rotation and wake waiters, since the minimum may
    /// have moved to someone else.
    pub fn retire(&self, id: &ActorId) -> Result<bool, RegistryError> {
        let mut state = self.lock();
        let was_eligible = state.registry.retire(id)?;
        self.signal.notify_all();
        Ok(was_eligible)
    }

    pub fn count(&self, id: &ActorId) -> u64 {
        self.lock().registry.get(id)
    }

    pub fn all_balanced(&self) -> bool {
        self.lock().registry.all_balanced()
    }

    /// Consistent copy of every counter; never shows a half-applied turn.
    pub fn snapshot(&self) -> TurnSnapshot {
        self.lock().registry.snapshot()
    }

    /// Block until every eligible actor has at least `min_each` turns,
    /// shutdown is requested, or `timeout` passes.
    ///
    /// Returns whether the target was reached.
    pub fn wait_for_turns(&self, min_each: u64, timeout: Duration) -> bool {
        let reached = |state: &GateState| {
            state
                .registry
                .min_count()
                .is_some_and(|min| min >= min_each)
        };
        let guard = self.lock();
        let (state, _) = self
            .signal
            .wait_timeout_while(guard, timeout, |state| {
                state.running && state.registry.eligible() > 0 && !reached(state)
            })
            .unwrap_or_else(PoisonError::into_inner);
        reached(&state)
    }
}

/// A claimed turn. Dropping it releases the gate, so a failing or panicking
/// task cannot leave the pool stuck.
#[derive(Debug)]
pub struct TurnGuard<'a> {
    gate: &'a TurnGate,
    id: ActorId,
    turn: u64,
    released: bool,
}

impl TurnGuard<'_> {
    /// The holder's count including this turn.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn id(&self) -> &ActorId {
        &self.id
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.gate.release_turn(&self.id);
        }
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.release_once();
    }
}
