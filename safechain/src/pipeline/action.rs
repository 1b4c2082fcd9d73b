//! Wire-safe entry point.

use super::Executor;
use crate::errors::{Escalation, WireError};
use crate::outcome::WireOutcome;
use crate::stages::Stage;
use serde_json::Value;

/// A stage entry point whose result can cross a serialization boundary.
///
/// Validation failures surface with their flattened causes, uncaught
/// exceptions with the configured generic message, and domain errors as-is.
/// Callbacks receive wire errors.
#[derive(Debug, Clone)]
pub struct Action {
    executor: Executor,
    stage: Stage,
}

impl Action {
    pub(crate) fn new(executor: Executor, stage: Stage) -> Self {
        Self { executor, stage }
    }

    /// Returns the stage this action runs.
    #[must_use]
    pub const fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Runs the chain and returns the wire outcome.
    pub async fn call(&self, input: Value) -> Result<WireOutcome<Value, WireError>, Escalation> {
        let outcome = self.executor.run_mode(&self.stage, input, true).await?;
        Ok(outcome.map_error(|error| error.to_wire()).into())
    }
}
