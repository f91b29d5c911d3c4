use tracing::debug;

use crate::errors::TaskError;
use crate::types::ActorId;

/// What an actor knows while it holds a turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    /// Actor that was granted the turn
    pub id: &'a ActorId,
    /// This actor's turn count including the current turn
    pub turn: u64,
}

/// Unit of work run by an actor while it holds the exclusive turn.
///
/// `on_turn` runs outside the gate's lock but inside the turn, so no two
/// tasks of the same pool are ever in `on_turn` at once. Returning an error
/// ends the calling worker only.
pub trait TurnTask: Send + 'static {
    /// Called once on the worker thread before its first turn request.
    fn on_start(&mut self, _id: &ActorId) -> Result<(), TaskError> {
        Ok(())
    }

    /// The critical step.
    fn on_turn(&mut self, ctx: &TurnContext<'_>) -> Result<(), TaskError>;

    /// Called once on the worker thread after its loop ends, whatever the
    /// reason.
    fn on_stop(&mut self, _id: &ActorId) {}
}

impl<F> TurnTask for F
where
    F: FnMut(&TurnContext<'_>) -> Result<(), TaskError> + Send + 'static,
{
    fn on_turn(&mut self, ctx: &TurnContext<'_>) -> Result<(), TaskError> {
        self(ctx)
    }
}

/// Default task: flips a private on/off state every turn.
///
/// Stands in for driving an output such as a GPIO line; the state is never
/// shared with other actors and is only visible through logging.
#[derive(Debug, Default, Clone)]
pub struct ToggleTask {
    active: bool,
    toggles: u64,
}

impl ToggleTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn toggles(&self) -> u64 {
        self.toggles
    }
}

impl TurnTask for ToggleTask {
    fn on_turn(&mut self, ctx: &TurnContext<'_>) -> Result<(), TaskError> {
        self.active = !self.active;
        self.toggles += 1;
        debug!(actor_id = %ctx.id, active = self.active, turn = ctx.turn, "Task state update");
        Ok(())
    }
}
