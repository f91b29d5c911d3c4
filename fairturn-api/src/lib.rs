//! # Fairturn API
//!
//! Shared vocabulary for a cooperative, round-robin fairness scheduler:
//! a pool of actors on independent threads where exactly one actor runs its
//! critical step at a time and the actor with the fewest completed turns
//! always goes next.
//!
//! This crate holds only the types an embedding program touches. The
//! scheduling machinery itself lives in the `fairturn` crate.
//!
//! ## Core Components
//!
//! - **ActorId**: opaque identifier assigned at registration
//! - **TurnTask**: the unit of work an actor performs while it holds a turn
//! - **TurnSnapshot**: point-in-time per-actor turn counts
//! - **PoolState**: lifecycle of a pool run
//!
//! ## Usage Example
//!
//! ```rust
//! use fairturn_api::{ActorId, TurnContext, TurnTask, TaskError};
//!
//! struct Blink {
//!     lit: bool,
//! }
//!
//! impl TurnTask for Blink {
//!     fn on_turn(&mut self, _ctx: &TurnContext<'_>) -> Result<(), TaskError> {
//!         self.lit = !self.lit;
//!         Ok(())
//!     }
//! }
//!
//! let id = ActorId::from("blinker");
//! assert_eq!(id.as_str(), "blinker");
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: identifiers, snapshots and lifecycle states
//! - [`task`]: the `TurnTask` trait and the default toggle task
//! - [`errors`]: task-level error type

pub mod errors;
pub mod task;
pub mod types;

pub use errors::TaskError;
pub use task::{ToggleTask, TurnContext, TurnTask};
pub use types::{ActorId, IdScheme, PoolState, TurnSnapshot};
