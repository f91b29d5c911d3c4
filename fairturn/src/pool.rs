//! # Pool Controller
//!
//! Spawns the workers of one pool run against a shared [`TurnGate`], releases
//! the starting gate once every worker is up, and drains them on stop.
//!
//! ## Lifecycle
//! `Created -> Spawning -> Running -> Stopping -> Drained`
//!
//! 1. Spawning: each worker registers its id (on the controller thread) and
//!    gets its own OS thread. Workers report `Ready` over a channel.
//! 2. Running: after `pool_size` ready reports the controller opens the gate.
//! 3. Stopping: [`StopHandle::stop`] clears `running` and wakes every parked
//!    worker.
//! 4. Drained: [`PoolHandle::await_drained`] collects every worker's exit,
//!    joins the threads and snapshots the counters.
//!
//! The controller never spins: it blocks on the event channel or on joins.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use fairturn_api::{ActorId, PoolState, ToggleTask, TurnSnapshot, TurnTask};
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::gate::TurnGate;
use crate::worker::{Worker, WorkerEvent, WorkerExit, WorkerOutcome};

/// Builds the task each actor runs.
pub type TaskFactory = Box<dyn FnMut(&ActorId) -> Box<dyn TurnTask>>;

fn state_to_code(state: PoolState) -> usize {
    state as usize
}

fn code_to_state(code: usize) -> PoolState {
    match code {
        0 => PoolState::Created,
        1 => PoolState::Spawning,
        2 => PoolState::Running,
        3 => PoolState::Stopping,
        4 => PoolState::Drained,
        _ => PoolState::Failed,
    }
}

/// Configures and starts a pool run.
pub struct PoolBuilder {
    config: PoolConfig,
    ids: Option<Vec<ActorId>>,
    factory: TaskFactory,
}

impl fmt::Debug for PoolBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("config", &self.config)
            .field("ids", &self.ids)
            .finish()
    }
}

impl PoolBuilder {
    /// Every actor runs a [`ToggleTask`] unless a factory is supplied.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            ids: None,
            factory: Box::new(|_| Box::new(ToggleTask::new())),
        }
    }

    /// Use these ids, in this registration order, instead of generating
    /// them. The pool size becomes the number of ids.
    pub fn ids<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ActorId>,
    {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn task_factory<F>(mut self, factory: F) -> Self
    where
        F: FnMut(&ActorId) -> Box<dyn TurnTask> + 'static,
    {
        self.factory = Box::new(factory);
        self
    }

    /// Spawn every worker, wait for all of them to report ready, then open
    /// the starting gate.
    pub fn start(self) -> Result<PoolHandle, PoolError> {
        let PoolBuilder {
            mut config,
            ids,
            mut factory,
        } = self;

        let ids = match ids {
            Some(ids) => {
                config.pool_size = ids.len();
                ids
            }
            None => (0..config.pool_size)
                .map(|index| config.id_scheme.generate(index))
                .collect(),
        };
        config.validate()?;

        let status = Arc::new(AtomicUsize::new(state_to_code(PoolState::Created)));
        let gate = Arc::new(TurnGate::new().with_detailed_logging(config.enable_detailed_logging));
        let (events_tx, events_rx) = flume::unbounded();

        let mut handle = PoolHandle {
            gate,
            status,
            workers: Vec::with_capacity(ids.len()),
            events: events_rx,
            exits: Vec::new(),
            config,
        };

        handle.set_state(PoolState::Spawning);
        crate::log_pool!("start", "spawning", pool_size = handle.config.pool_size);

        for (index, id) in ids.into_iter().enumerate() {
            let task = factory(&id);
            let worker = match Worker::new(
                id.clone(),
                Arc::clone(&handle.gate),
                task,
                handle.config.turn_delay,
                events_tx.clone(),
            ) {
                Ok(worker) => worker,
                Err(err) => return Err(handle.abort_startup(err.into())),
            };

            let thread_name = format!("{}-{}", handle.config.thread_name_prefix, index);
            match worker.spawn(thread_name) {
                Ok(join) => handle.workers.push((id, join)),
                Err(source) => return Err(handle.abort_startup(PoolError::Spawn { id, source })),
            }
        }
        // Workers hold the only senders from here on.
        drop(events_tx);

        if let Err(err) = handle.await_ready() {
            return Err(handle.abort_startup(err));
        }

        handle.gate.open();
        handle.set_state(PoolState::Running);
        crate::log_pool!("start", "running", pool_size = handle.workers.len());
        Ok(handle)
    }
}

/// Final state of a drained pool.
#[derive(Debug, Clone)]
pub struct DrainReport {
    /// Per-actor turn counts at drain time, in registration order.
    pub counts: TurnSnapshot,
    /// How every worker ended, in the order the exits were observed.
    pub exits: Vec<WorkerExit>,
}

impl DrainReport {
    pub fn faults(&self) -> impl Iterator<Item = &WorkerExit> {
        self.exits.iter().filter(|exit| exit.outcome.is_fault())
    }

    /// True when every worker ended because of shutdown.
    pub fn is_clean(&self) -> bool {
        self.exits
            .iter()
            .all(|exit| exit.outcome == WorkerOutcome::Completed)
    }
}

/// Cloneable, thread-safe way to stop a pool, e.g. from an interrupt
/// listener.
#[derive(Debug, Clone)]
pub struct StopHandle {
    gate: Arc<TurnGate>,
    status: Arc<AtomicUsize>,
}

impl StopHandle {
    /// Ask every worker to finish. Idempotent and non-blocking apart from a
    /// short critical section on the gate.
    pub fn stop(&self) {
        if self.gate.request_shutdown() {
            let _ = self.status.compare_exchange(
                state_to_code(PoolState::Running),
                state_to_code(PoolState::Stopping),
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
            crate::log_pool!("stop", "stopping");
        }
    }

    pub fn is_stopped(&self) -> bool {
        !self.gate.is_running()
    }
}

/// A running pool.
///
/// Dropping the handle without draining still asks the workers to stop, but
/// does not wait for them.
pub struct PoolHandle {
    gate: Arc<TurnGate>,
    status: Arc<AtomicUsize>,
    workers: Vec<(ActorId, JoinHandle<()>)>,
    events: flume::Receiver<WorkerEvent>,
    exits: Vec<WorkerExit>,
    config: PoolConfig,
}

impl fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolHandle")
            .field("state", &self.state())
            .field("workers", &self.workers.len())
            .field("config", &self.config)
            .finish()
    }
}

impl PoolHandle {
    pub fn state(&self) -> PoolState {
        code_to_state(self.status.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: PoolState) {
        self.status.store(state_to_code(state), Ordering::SeqCst);
    }

    pub fn pool_size(&self) -> usize {
        self.workers.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ActorId> {
        self.workers.iter().map(|(id, _)| id)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            gate: Arc::clone(&self.gate),
            status: Arc::clone(&self.status),
        }
    }

    /// See [`StopHandle::stop`].
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    pub fn is_running(&self) -> bool {
        self.gate.is_running()
    }

    /// Live copy of the counters.
    pub fn counts(&self) -> TurnSnapshot {
        self.gate.snapshot()
    }

    /// True once every live actor has completed the same, non-zero number
    /// of turns, i.e. the pool sits exactly on a round boundary.
    pub fn is_balanced(&self) -> bool {
        self.gate.all_balanced()
    }

    /// Block until every live actor has at least `min_each` turns.
    pub fn wait_for_turns(&self, min_each: u64, timeout: Duration) -> bool {
        self.gate.wait_for_turns(min_each, timeout)
    }

    /// Block until every worker has exited, then report the final counters.
    ///
    /// Does not stop the pool by itself; call [`PoolHandle::stop`] first or
    /// from another thread. Honors `drain_timeout` when configured.
    pub fn await_drained(mut self) -> Result<DrainReport, PoolError> {
        let deadline = self.config.drain_timeout.map(|timeout| (Instant::now() + timeout, timeout));
        self.collect_exits(deadline)?;

        for (id, join) in std::mem::take(&mut self.workers) {
            if join.join().is_err() {
                warn!(actor_id = %id, "Worker thread panicked outside its task");
                if let Some(exit) = self.exits.iter_mut().find(|exit| exit.id == id) {
                    exit.outcome = WorkerOutcome::Faulted("worker thread panicked".to_string());
                }
            }
        }

        let counts = self.gate.snapshot();
        self.set_state(PoolState::Drained);
        crate::log_pool!("drain", "drained", total_turns = counts.total(), actors = counts.len());

        Ok(DrainReport {
            counts,
            exits: std::mem::take(&mut self.exits),
        })
    }

    /// Stop, then drain.
    pub fn shutdown(self) -> Result<DrainReport, PoolError> {
        self.stop();
        self.await_drained()
    }

    fn await_ready(&mut self) -> Result<(), PoolError> {
        let expected = self.workers.len();
        let timeout = self.config.ready_timeout;
        let deadline = Instant::now() + timeout;
        let mut ready = 0;

        while ready < expected {
            match self.events.recv_deadline(deadline) {
                Ok(WorkerEvent::Ready(id)) => {
                    ready += 1;
                    debug!(actor_id = %id, ready, expected, "Worker ready");
                }
                Ok(WorkerEvent::Exited(exit)) => self.exits.push(exit),
                Err(_) => {
                    return Err(PoolError::StartupTimeout {
                        ready,
                        expected,
                        timeout,
                    })
                }
            }
        }
        Ok(())
    }

    fn collect_exits(&mut self, deadline: Option<(Instant, Duration)>) -> Result<(), PoolError> {
        let mut exited: HashSet<ActorId> = self.exits.iter().map(|exit| exit.id.clone()).collect();

        while exited.len() < self.workers.len() {
            let event = match deadline {
                Some((at, timeout)) => match self.events.recv_deadline(at) {
                    Ok(event) => event,
                    Err(flume::RecvTimeoutError::Timeout) => {
                        return Err(PoolError::DrainTimeout {
                            pending: self.workers.len() - exited.len(),
                            timeout,
                        })
                    }
                    Err(flume::RecvTimeoutError::Disconnected) => break,
                },
                None => match self.events.recv() {
                    Ok(event) => event,
                    Err(flume::RecvError::Disconnected) => break,
                },
            };

            if let WorkerEvent::Exited(exit) = event {
                exited.insert(exit.id.clone());
                self.exits.push(exit);
            }
        }
        Ok(())
    }

    /// Tear down a half-started pool and hand back the error that caused it.
    fn abort_startup(&mut self, err: PoolError) -> PoolError {
        crate::log_error!(err, "Pool startup failed");
        self.gate.request_shutdown();
        for (id, join) in std::mem::take(&mut self.workers) {
            if join.join().is_err() {
                warn!(actor_id = %id, "Worker thread panicked during aborted startup");
            }
        }
        self.set_state(PoolState::Failed);
        err
    }
}

impl Drop for PoolHandle {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.gate.request_shutdown();
        }
    }
}

/// Start `pool_size` toggling actors that pause `turn_delay` between turns.
pub fn start(pool_size: usize, turn_delay: Duration) -> Result<PoolHandle, PoolError> {
    PoolBuilder::new(PoolConfig::new(pool_size, turn_delay)).start()
}

/// Ask the pool to stop. Safe to call any number of times.
pub fn stop(handle: &PoolHandle) {
    handle.stop();
}

/// Wait for every worker to exit and return the final counters.
pub fn await_drained(handle: PoolHandle) -> Result<DrainReport, PoolError> {
    handle.await_drained()
}
