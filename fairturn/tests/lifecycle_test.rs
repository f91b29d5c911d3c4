// Integration tests for pool startup, fault isolation and draining

use std::time::Duration;

use fairturn::{
    ActorId, IdScheme, PoolBuilder, PoolConfig, PoolError, PoolState, TaskError, ToggleTask,
    TurnContext, TurnTask, WorkerOutcome,
};

const WAIT: Duration = Duration::from_secs(10);

struct FailsOnThirdTurn;

impl TurnTask for FailsOnThirdTurn {
    fn on_turn(&mut self, ctx: &TurnContext<'_>) -> Result<(), TaskError> {
        if ctx.turn == 3 {
            return Err(TaskError::Failed("sensor offline".to_string()));
        }
        Ok(())
    }
}

struct RefusesToStart;

impl TurnTask for RefusesToStart {
    fn on_start(&mut self, _id: &ActorId) -> Result<(), TaskError> {
        Err(TaskError::Failed("no device".to_string()))
    }

    fn on_turn(&mut self, _ctx: &TurnContext<'_>) -> Result<(), TaskError> {
        Ok(())
    }
}

fn outcome_of<'a>(report: &'a fairturn::DrainReport, id: &str) -> &'a WorkerOutcome {
    &report
        .exits
        .iter()
        .find(|exit| exit.id.as_str() == id)
        .unwrap()
        .outcome
}

#[test]
fn failing_actor_is_retired_and_the_rest_keep_rotating() {
    fairturn::logging::init_test();
    let handle = PoolBuilder::new(PoolConfig::new(3, Duration::ZERO))
        .ids(["a", "b", "c"])
        .task_factory(|id: &ActorId| -> Box<dyn TurnTask> {
            if id.as_str() == "b" {
                Box::new(FailsOnThirdTurn)
            } else {
                Box::new(ToggleTask::new())
            }
        })
        .start()
        .unwrap();

    assert!(handle.wait_for_turns(10, WAIT));
    let report = handle.shutdown().unwrap();

    assert_eq!(report.faults().count(), 1);
    assert!(matches!(outcome_of(&report, "b"), WorkerOutcome::Faulted(_)));
    assert_eq!(outcome_of(&report, "a"), &WorkerOutcome::Completed);
    assert_eq!(outcome_of(&report, "c"), &WorkerOutcome::Completed);
    assert_eq!(report.counts.get(&ActorId::from("b")), 3);
    assert!(report.counts.get(&ActorId::from("a")) >= 10);
    assert!(!report.is_clean());
}

#[test]
fn panicking_actor_does_not_take_the_pool_down() {
    fairturn::logging::init_test();
    let handle = PoolBuilder::new(PoolConfig::new(2, Duration::ZERO))
        .ids(["steady", "fragile"])
        .task_factory(|id: &ActorId| -> Box<dyn TurnTask> {
            if id.as_str() == "fragile" {
                Box::new(|_ctx: &TurnContext<'_>| -> Result<(), TaskError> {
                    panic!("wire cut");
                })
            } else {
                Box::new(ToggleTask::new())
            }
        })
        .start()
        .unwrap();

    assert!(handle.wait_for_turns(5, WAIT));
    let report = handle.shutdown().unwrap();

    match outcome_of(&report, "fragile") {
        WorkerOutcome::Faulted(message) => assert!(message.contains("wire cut"), "{message}"),
        other => panic!("expected a fault, got {other:?}"),
    }
    assert_eq!(report.counts.get(&ActorId::from("fragile")), 1);
}

#[test]
fn actor_failing_on_start_never_gets_a_turn() {
    let handle = PoolBuilder::new(PoolConfig::new(2, Duration::ZERO))
        .ids(["ok", "broken"])
        .task_factory(|id: &ActorId| -> Box<dyn TurnTask> {
            if id.as_str() == "broken" {
                Box::new(RefusesToStart)
            } else {
                Box::new(ToggleTask::new())
            }
        })
        .start()
        .unwrap();

    assert_eq!(handle.state(), PoolState::Running);
    assert!(handle.wait_for_turns(3, WAIT));
    let report = handle.shutdown().unwrap();

    assert_eq!(report.counts.get(&ActorId::from("broken")), 0);
    assert!(outcome_of(&report, "broken").is_fault());
    assert_eq!(report.exits.len(), 2);
}

#[test]
fn retiring_voluntarily_is_not_a_fault() {
    let handle = PoolBuilder::new(PoolConfig::new(2, Duration::ZERO))
        .ids(["short", "long"])
        .task_factory(|id: &ActorId| -> Box<dyn TurnTask> {
            let short_lived = id.as_str() == "short";
            Box::new(move |ctx: &TurnContext<'_>| -> Result<(), TaskError> {
                if short_lived && ctx.turn == 2 {
                    return Err(TaskError::Retired);
                }
                Ok(())
            })
        })
        .start()
        .unwrap();

    assert!(handle.wait_for_turns(6, WAIT));
    let report = handle.shutdown().unwrap();

    assert_eq!(outcome_of(&report, "short"), &WorkerOutcome::Retired);
    assert_eq!(report.faults().count(), 0);
    assert!(report.counts.get(&ActorId::from("long")) >= 6);
}

#[test]
fn sequential_ids_follow_registration_order() {
    let mut config = PoolConfig::new(3, Duration::from_millis(1));
    config.id_scheme = IdScheme::Sequential {
        prefix: "worker".to_string(),
    };
    let handle = PoolBuilder::new(config).start().unwrap();

    let ids: Vec<&str> = handle.ids().map(ActorId::as_str).collect();
    assert_eq!(ids, ["worker-0", "worker-1", "worker-2"]);

    let report = handle.shutdown().unwrap();
    let counted: Vec<&str> = report.counts.ids().map(ActorId::as_str).collect();
    assert_eq!(counted, ["worker-0", "worker-1", "worker-2"]);
}

#[test]
fn generated_ids_are_unique() {
    let handle = fairturn::start(16, Duration::from_millis(1)).unwrap();
    let mut ids: Vec<String> = handle.ids().map(|id| id.as_str().to_string()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
    handle.shutdown().unwrap();
}

#[test]
fn zero_pool_size_is_rejected() {
    let err = fairturn::start(0, Duration::ZERO).unwrap_err();
    assert!(matches!(err, PoolError::Config(_)));
}

#[test]
fn drain_without_stop_times_out() {
    let mut config = PoolConfig::new(2, Duration::from_millis(5));
    config.drain_timeout = Some(Duration::from_millis(50));
    let handle = PoolBuilder::new(config).start().unwrap();

    match handle.await_drained() {
        Err(PoolError::DrainTimeout { pending, timeout }) => {
            assert_eq!(pending, 2);
            assert_eq!(timeout, Duration::from_millis(50));
        }
        other => panic!("expected drain timeout, got {other:?}"),
    }
}

#[test]
fn stopping_before_any_turn_still_drains() {
    let handle = fairturn::start(4, Duration::from_secs(5)).unwrap();
    let stopper = handle.stop_handle();
    stopper.stop();
    assert!(stopper.is_stopped());

    let report = handle.await_drained().unwrap();
    assert_eq!(report.exits.len(), 4);
    assert!(report.counts.total() <= 4);
}
