//! Plan execution
//!
//! Every step runs in its own transaction: the script body and the version
//! bump commit together or not at all. The first failing step rolls back and
//! stops the run, so the version store always names the last committed step.

use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

use super::context::{EnvironmentContext, MigrationContext};
use super::plan::{Direction, ExecutionPlan, PlanStep};
use crate::database::VersionStore;
use crate::error::{MigrationError, MigrationResult};

/// A step that was executed and committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct ExecutedStep {
    pub revision: String,
    pub direction: Direction,
    pub elapsed_ms: u64,
}

pub struct Executor<'c, 'a> {
    ctx: &'c EnvironmentContext<'a>,
}

impl<'c, 'a> Executor<'c, 'a> {
    pub fn new(ctx: &'c EnvironmentContext<'a>) -> Self {
        Self { ctx }
    }

    /// Run every step of `plan` in order, stopping at the first failure
    pub fn run(&self, plan: &ExecutionPlan<'_>) -> MigrationResult<Vec<ExecutedStep>> {
        let store = self.ctx.version_store()?;
        let mut executed = Vec::with_capacity(plan.len());
        for step in &plan.steps {
            executed.push(self.run_step(&store, step)?);
        }
        Ok(executed)
    }

    fn run_step(
        &self,
        store: &VersionStore<'_>,
        step: &PlanStep<'_>,
    ) -> MigrationResult<ExecutedStep> {
        let started = Instant::now();
        let revision = step.revision();
        info!(
            "{} {} {}",
            step.direction,
            revision,
            step.script.description()
        );

        let failed = |source: anyhow::Error| MigrationError::MigrationFailed {
            revision: revision.to_string(),
            direction: step.direction,
            source,
        };

        let tx = self.ctx.begin()?;
        let result = {
            let mctx = MigrationContext::new(&tx, self.ctx.schema());
            match step.direction {
                Direction::Apply => step.script.apply(&mctx),
                Direction::Revert => step.script.revert(&mctx),
            }
        };

        if let Err(source) = result {
            if let Err(e) = tx.rollback() {
                warn!("rollback of {} failed: {}", revision, e);
            }
            return Err(failed(source));
        }

        // dropping `tx` on error rolls the step back
        store
            .write(&tx, step.resulting_revision())
            .map_err(|e| failed(e.into()))?;
        tx.commit().map_err(|e| failed(e.into()))?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!("{} {} done in {} ms", step.direction, revision, elapsed_ms);
        Ok(ExecutedStep {
            revision: revision.to_string(),
            direction: step.direction,
            elapsed_ms,
        })
    }
}
