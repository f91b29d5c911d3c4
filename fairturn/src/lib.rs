// fairturn
//
// Round-robin fairness scheduling for a pool of worker threads: exactly one
// worker runs its critical step at a time, and the worker with the fewest
// completed turns always goes next (ties go to the earliest registered).
//
// Leaves first: `registry` (turn counters) -> `gate` (mutex + condvar turn
// protocol) -> `worker` (per-actor thread loop) -> `pool` (lifecycle).

pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod pool;
pub mod registry;
pub mod report;
pub mod worker;

// Re-export commonly used types
pub use config::PoolConfig;
pub use error::{ConfigError, GateError, PoolError, RegistryError, WorkerFault};
pub use gate::{TurnGate, TurnGuard};
pub use pool::{await_drained, start, stop, DrainReport, PoolBuilder, PoolHandle, StopHandle};
pub use registry::FairnessRegistry;
pub use worker::{WorkerExit, WorkerOutcome};

pub use fairturn_api::{ActorId, IdScheme, PoolState, TaskError, ToggleTask, TurnContext, TurnSnapshot, TurnTask};
