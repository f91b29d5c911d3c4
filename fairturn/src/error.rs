use std::time::Duration;
use thiserror::Error;

use fairturn_api::{ActorId, TaskError};

/// Misuse of the fairness registry.
///
/// Every variant is a lifecycle-ordering bug in the caller, never an
/// expected runtime condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Actor already registered: {0}")]
    AlreadyRegistered(ActorId),
    #[error("Actor not registered: {0}")]
    NotRegistered(ActorId),
    #[error("Registry has no eligible actors")]
    Empty,
}

/// Errors returned by the turn gate protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Turn gate is closed for shutdown")]
    Closed,
    #[error("Registry misuse: {0}")]
    Registry(#[from] RegistryError),
}

/// Why a single worker's loop ended early.
///
/// Confined to that worker: it is logged and reported in the drain report,
/// never propagated to the controller or the other workers.
#[derive(Error, Debug)]
pub enum WorkerFault {
    #[error("Turn gate failure: {0}")]
    Gate(#[from] GateError),
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Errors related to loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors related to the pool lifecycle.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to spawn worker {id}: {source}")]
    Spawn {
        id: ActorId,
        #[source]
        source: std::io::Error,
    },
    #[error("Registration error: {0}")]
    Registration(#[from] RegistryError),
    #[error("Only {ready} of {expected} workers reported ready within {timeout:?}")]
    StartupTimeout {
        ready: usize,
        expected: usize,
        timeout: Duration,
    },
    #[error("{pending} workers still running after {timeout:?}")]
    DrainTimeout { pending: usize, timeout: Duration },
}
