//! # Task Error Types
//!
//! Errors a [`TurnTask`](crate::task::TurnTask) may return from its critical
//! step. Any of them ends the worker that raised it; the rest of the pool
//! keeps running.
//!
//! ## Usage Example
//!
//! ```rust
//! use fairturn_api::errors::TaskError;
//!
//! fn describe(error: &TaskError) -> String {
//!     match error {
//!         TaskError::Failed(msg) => format!("step failed: {}", msg),
//!         TaskError::Panicked(msg) => format!("step panicked: {}", msg),
//!         other => other.to_string(),
//!     }
//! }
//! ```

use thiserror::Error;

/// Failure raised while an actor holds its turn.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The step could not complete.
    ///
    /// # Parameters
    /// * String - what went wrong
    #[error("Turn step failed: {0}")]
    Failed(String),

    /// The step panicked; the payload message is preserved when it was a
    /// string.
    #[error("Turn step panicked: {0}")]
    Panicked(String),

    /// The task asked to leave the rotation voluntarily.
    #[error("Task retired itself")]
    Retired,

    /// Catch-all for errors from the task's own dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskError {
    /// Whether the worker should report this exit as a fault.
    pub fn is_fault(&self) -> bool {
        !matches!(self, TaskError::Retired)
    }
}
