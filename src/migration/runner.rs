//! Migration runner
//!
//! The entry point used by the host at startup (`upgrade_to_head`) and by
//! operators (`downgrade_to`, `migrate_to`, `stamp`, ...). The runner reads
//! the current revision, asks the repository for a plan and hands it to the
//! executor. It never opens connections or chooses schemas itself.

use serde::Serialize;
use tracing::info;

use super::context::EnvironmentContext;
use super::executor::{ExecutedStep, Executor};
use super::loader::ScriptLoader;
use super::plan::{Direction, ExecutionPlan, Target};
use super::repository::MigrationRepository;
use super::script::MigrationScript;
use crate::database::VersionRecord;
use crate::error::{MigrationError, MigrationResult};

/// Outcome of a migration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub schema: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub steps: Vec<ExecutedStep>,
    pub version_table_created: bool,
}

impl MigrationReport {
    /// True when nothing had to be executed
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }
}

pub struct MigrationRunner {
    repository: MigrationRepository,
}

impl MigrationRunner {
    pub fn new(repository: MigrationRepository) -> Self {
        Self { repository }
    }

    /// Discover scripts and validate the revision graph
    pub fn from_loader(loader: &dyn ScriptLoader) -> MigrationResult<Self> {
        Ok(Self::new(MigrationRepository::from_loader(loader)?))
    }

    pub fn repository(&self) -> &MigrationRepository {
        &self.repository
    }

    /// Bring the schema up to the latest revision
    ///
    /// A schema that is already at head is left untouched.
    pub fn upgrade_to_head(&self, ctx: &EnvironmentContext<'_>) -> MigrationResult<MigrationReport> {
        self.upgrade_to(ctx, &Target::Head)
    }

    /// Apply scripts up to `target`; fails if `target` is below the current revision
    pub fn upgrade_to(
        &self,
        ctx: &EnvironmentContext<'_>,
        target: &Target,
    ) -> MigrationResult<MigrationReport> {
        self.run(ctx, target, Some(Direction::Apply))
    }

    /// Revert scripts down to `target` (`Target::Base` removes everything);
    /// fails if `target` is above the current revision
    pub fn downgrade_to(
        &self,
        ctx: &EnvironmentContext<'_>,
        target: &Target,
    ) -> MigrationResult<MigrationReport> {
        self.run(ctx, target, Some(Direction::Revert))
    }

    /// Move to `target` in whichever direction it lies
    pub fn migrate_to(
        &self,
        ctx: &EnvironmentContext<'_>,
        target: &Target,
    ) -> MigrationResult<MigrationReport> {
        self.run(ctx, target, None)
    }

    /// Compute the plan for `target` without executing or creating anything
    pub fn plan(
        &self,
        ctx: &EnvironmentContext<'_>,
        target: &Target,
    ) -> MigrationResult<ExecutionPlan<'_>> {
        let _guard = ctx.span().enter();
        let current = ctx.version_store()?.read()?;
        self.repository.resolve(current.as_deref(), target)
    }

    /// The schema's version record, `None` if nothing was ever recorded
    pub fn current(&self, ctx: &EnvironmentContext<'_>) -> MigrationResult<Option<VersionRecord>> {
        let _guard = ctx.span().enter();
        ctx.version_store()?.record()
    }

    /// Every known revision, base to head
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &dyn MigrationScript> + '_ {
        self.repository.history()
    }

    /// Record `target` as the current revision without running any script
    ///
    /// Used to adopt a schema whose objects were created by other means.
    pub fn stamp(
        &self,
        ctx: &EnvironmentContext<'_>,
        target: &Target,
    ) -> MigrationResult<Option<String>> {
        let _guard = ctx.span().enter();
        let store = ctx.version_store()?;
        let current = store.read()?;
        // a stored revision unknown to this repository must not block a stamp
        let anchor = match current.as_deref() {
            Some(rev) if self.repository.get(rev).is_some() => Some(rev),
            _ => None,
        };
        let revision = self.repository.resolve_target(anchor, target)?;

        store.ensure_table()?;
        let tx = ctx.begin()?;
        store.write(&tx, revision.as_deref())?;
        tx.commit()?;
        info!(
            "stamped schema {} at {}",
            ctx.schema(),
            revision.as_deref().unwrap_or("base")
        );
        Ok(revision)
    }

    fn run(
        &self,
        ctx: &EnvironmentContext<'_>,
        target: &Target,
        expected: Option<Direction>,
    ) -> MigrationResult<MigrationReport> {
        let _guard = ctx.span().enter();
        let store = ctx.version_store()?;
        let current = store.read()?;
        let plan = self.repository.resolve(current.as_deref(), target)?;

        if let (Some(expected), Some(actual)) = (expected, plan.direction()) {
            if expected != actual {
                return Err(MigrationError::WrongDirection {
                    from: plan.from.clone(),
                    to: plan.to.clone(),
                    expected,
                });
            }
        }

        let version_table_created = store.ensure_table()?;

        if plan.is_empty() {
            info!(
                "schema {} already at {}",
                ctx.schema(),
                plan.to.as_deref().unwrap_or("base")
            );
            return Ok(MigrationReport {
                schema: ctx.schema().to_string(),
                from: plan.from,
                to: plan.to,
                steps: vec![],
                version_table_created,
            });
        }

        info!(
            "migrating schema {} from {} to {} ({} steps)",
            ctx.schema(),
            plan.from.as_deref().unwrap_or("base"),
            plan.to.as_deref().unwrap_or("base"),
            plan.len()
        );
        let steps = Executor::new(ctx).run(&plan)?;

        Ok(MigrationReport {
            schema: ctx.schema().to_string(),
            from: plan.from,
            to: plan.to,
            steps,
            version_table_created,
        })
    }
}
