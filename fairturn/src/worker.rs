//! # Worker Module
//!
//! One worker per actor, each on its own OS thread. A worker repeatedly asks
//! the [`TurnGate`] for a turn, runs its [`TurnTask`] while holding it,
//! releases it and pauses before asking again.
//!
//! ## Failure isolation
//! Errors and panics in the loop body end only the worker that raised them.
//! The held turn is released by the guard's `Drop`, the actor is retired from
//! the rotation so the others keep turning, and the exit is reported to the
//! controller over the event channel.

use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fairturn_api::{ActorId, TaskError, TurnContext, TurnTask};
use tracing::debug;

use crate::error::{GateError, RegistryError, WorkerFault};
use crate::gate::TurnGate;
use crate::logging;

/// Messages a worker sends to its controller.
#[derive(Debug)]
pub enum WorkerEvent {
    /// The thread is up and about to request its first turn.
    Ready(ActorId),
    /// The thread is about to return.
    Exited(WorkerExit),
}

/// How a worker's loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Shutdown was requested and observed.
    Completed,
    /// The task asked to leave the rotation.
    Retired,
    /// An error or panic ended the loop.
    Faulted(String),
}

impl WorkerOutcome {
    pub fn is_fault(&self) -> bool {
        matches!(self, WorkerOutcome::Faulted(_))
    }
}

/// Final report of one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerExit {
    pub id: ActorId,
    pub outcome: WorkerOutcome,
    /// Turns this worker completed, as seen from the worker itself.
    pub turns: u64,
}

/// Worker bound to one actor id.
pub struct Worker {
    id: ActorId,
    gate: Arc<TurnGate>,
    task: Box<dyn TurnTask>,
    turn_delay: Duration,
    events: flume::Sender<WorkerEvent>,
    turns: u64,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("turn_delay", &self.turn_delay)
            .field("turns", &self.turns)
            .finish()
    }
}

impl Worker {
    /// Create a worker and register its id with the gate.
    ///
    /// Registration happens here, on the caller's thread, so it is ordered
    /// before the worker's first turn request.
    pub fn new(
        id: ActorId,
        gate: Arc<TurnGate>,
        task: Box<dyn TurnTask>,
        turn_delay: Duration,
        events: flume::Sender<WorkerEvent>,
    ) -> Result<Self, RegistryError> {
        gate.register(id.clone())?;
        Ok(Self {
            id,
            gate,
            task,
            turn_delay,
            events,
            turns: 0,
        })
    }

    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Launch the worker on a named OS thread.
    pub fn spawn(self, thread_name: String) -> io::Result<JoinHandle<()>> {
        let dispatch = logging::dispatch_for_thread();
        thread::Builder::new().name(thread_name).spawn(move || {
            tracing::dispatcher::with_default(&dispatch, || self.run());
        })
    }

    fn run(mut self) {
        let span = crate::worker_span!(self.id);
        let _enter = span.enter();

        crate::log_lifecycle!(self.id, "started");
        if self.events.send(WorkerEvent::Ready(self.id.clone())).is_err() {
            debug!("Controller stopped listening before worker was ready");
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run_loop()));
        let outcome = match result {
            Ok(Ok(())) => WorkerOutcome::Completed,
            Ok(Err(WorkerFault::Task(TaskError::Retired))) => WorkerOutcome::Retired,
            Ok(Err(fault)) => WorkerOutcome::Faulted(fault.to_string()),
            Err(payload) => WorkerOutcome::Faulted(TaskError::Panicked(panic_message(payload)).to_string()),
        };

        if outcome != WorkerOutcome::Completed {
            if let Err(err) = self.gate.retire(&self.id) {
                crate::log_error!(err, actor_id = %self.id, "Failed to retire worker");
            }
        }

        if panic::catch_unwind(AssertUnwindSafe(|| self.task.on_stop(&self.id))).is_err() {
            tracing::warn!(actor_id = %self.id, "Task panicked in on_stop");
        }

        match &outcome {
            WorkerOutcome::Completed => crate::log_lifecycle!(self.id, "completed", turns = self.turns),
            WorkerOutcome::Retired => crate::log_lifecycle!(self.id, "retired", turns = self.turns),
            WorkerOutcome::Faulted(reason) => {
                crate::log_error!(reason, actor_id = %self.id, turns = self.turns, "Worker failure")
            }
        }

        let exit = WorkerExit {
            id: self.id.clone(),
            outcome,
            turns: self.turns,
        };
        if self.events.send(WorkerEvent::Exited(exit)).is_err() {
            debug!("Controller stopped listening before worker exit");
        }
    }

    fn run_loop(&mut self) -> Result<(), WorkerFault> {
        self.task.on_start(&self.id)?;

        while self.gate.is_running() {
            let turn = match self.gate.acquire_turn(&self.id) {
                Ok(turn) => turn,
                Err(GateError::Closed) => break,
                Err(err) => return Err(err.into()),
            };

            let ctx = TurnContext {
                id: &self.id,
                turn: turn.turn(),
            };
            self.task.on_turn(&ctx)?;
            turn.release();
            self.turns += 1;

            // Throttle outside the lock; cut short by shutdown.
            if !self.gate.pause(self.turn_delay) {
                break;
            }
        }
        Ok(())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use fairturn_api::ToggleTask;

    use super::*;

    fn spawn_worker(
        gate: &Arc<TurnGate>,
        id: &str,
        task: Box<dyn TurnTask>,
        events: &flume::Sender<WorkerEvent>,
    ) -> JoinHandle<()> {
        Worker::new(ActorId::from(id), Arc::clone(gate), task, Duration::ZERO, events.clone())
            .unwrap()
            .spawn(format!("test-{id}"))
            .unwrap()
    }

    fn next_exit(rx: &flume::Receiver<WorkerEvent>) -> WorkerExit {
        loop {
            match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
                WorkerEvent::Exited(exit) => return exit,
                WorkerEvent::Ready(_) => continue,
            }
        }
    }

    #[test]
    fn registration_happens_at_construction() {
        let gate = Arc::new(TurnGate::new());
        let (tx, _rx) = flume::unbounded();
        let worker = Worker::new(
            ActorId::from("a"),
            Arc::clone(&gate),
            Box::new(ToggleTask::new()),
            Duration::ZERO,
            tx.clone(),
        )
        .unwrap();
        assert_eq!(worker.id(), &ActorId::from("a"));
        assert_eq!(gate.snapshot().len(), 1);

        let duplicate = Worker::new(ActorId::from("a"), gate, Box::new(ToggleTask::new()), Duration::ZERO, tx);
        assert!(duplicate.is_err());
    }

    #[test]
    fn worker_stops_on_shutdown() {
        let gate = Arc::new(TurnGate::new());
        let (tx, rx) = flume::unbounded();
        let handle = spawn_worker(&gate, "a", Box::new(ToggleTask::new()), &tx);

        gate.open();
        assert!(gate.wait_for_turns(5, Duration::from_secs(5)));
        gate.request_shutdown();

        let exit = next_exit(&rx);
        handle.join().unwrap();
        assert_eq!(exit.outcome, WorkerOutcome::Completed);
        assert_eq!(exit.turns, gate.count(&ActorId::from("a")));
    }

    #[test]
    fn failing_task_is_retired_and_releases_its_turn() {
        let gate = Arc::new(TurnGate::new());
        let (tx, rx) = flume::unbounded();
        let failing = spawn_worker(
            &gate,
            "bad",
            Box::new(|_: &TurnContext<'_>| -> Result<(), TaskError> {
                Err(TaskError::Failed("sensor offline".to_string()))
            }),
            &tx,
        );
        let healthy = spawn_worker(&gate, "good", Box::new(ToggleTask::new()), &tx);

        gate.open();
        let exit = next_exit(&rx);
        assert_eq!(exit.id, ActorId::from("bad"));
        assert!(exit.outcome.is_fault());
        failing.join().unwrap();

        // The remaining actor keeps turning.
        assert!(gate.wait_for_turns(3, Duration::from_secs(5)));
        gate.request_shutdown();
        assert_eq!(next_exit(&rx).outcome, WorkerOutcome::Completed);
        healthy.join().unwrap();
    }

    #[test]
    fn panicking_task_is_contained() {
        let gate = Arc::new(TurnGate::new());
        let (tx, rx) = flume::unbounded();
        let handle = spawn_worker(
            &gate,
            "boom",
            Box::new(|_: &TurnContext<'_>| -> Result<(), TaskError> { panic!("wire cut") }),
            &tx,
        );

        gate.open();
        let exit = next_exit(&rx);
        handle.join().unwrap();
        assert_eq!(
            exit.outcome,
            WorkerOutcome::Faulted("Turn step panicked: wire cut".to_string())
        );
        assert_eq!(gate.count(&ActorId::from("boom")), 1);
    }

    #[test]
    fn on_stop_runs_after_loop() {
        struct Recorder(Arc<Mutex<Vec<&'static str>>>);

        impl TurnTask for Recorder {
            fn on_start(&mut self, _id: &ActorId) -> Result<(), TaskError> {
                self.0.lock().unwrap().push("start");
                Ok(())
            }
            fn on_turn(&mut self, _ctx: &TurnContext<'_>) -> Result<(), TaskError> {
                Err(TaskError::Retired)
            }
            fn on_stop(&mut self, _id: &ActorId) {
                self.0.lock().unwrap().push("stop");
            }
        }

        let gate = Arc::new(TurnGate::new());
        let (tx, rx) = flume::unbounded();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = spawn_worker(&gate, "a", Box::new(Recorder(Arc::clone(&log))), &tx);

        gate.open();
        assert_eq!(next_exit(&rx).outcome, WorkerOutcome::Retired);
        handle.join().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["start", "stop"]);
    }
}
